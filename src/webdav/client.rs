//! HTTP transport for one DAV account.
//!
//! Auth is a per-request concern: the configured credentials are turned into
//! headers and re-applied to every outgoing request, including manual
//! redirect follow-ups. Well-known discovery URLs commonly 301 to the real
//! DAV path, and an `Authorization` header attached as client-wide state is
//! lost on that hop.

use anyhow::{Result, anyhow};
use async_compression::tokio::bufread::{BrotliDecoder, GzipDecoder, ZstdDecoder};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use bytes::Bytes;
use futures_util::TryStreamExt;
use http_body_util::{BodyStream, Full};
use hyper::body::Incoming;
use hyper::header::{HeaderName, HeaderValue};
use hyper::{HeaderMap, Method, Request, Response, Uri, header};
use hyper_rustls::HttpsConnectorBuilder;
use hyper_util::client::legacy::{Client, connect::HttpConnector};
use hyper_util::rt::TokioExecutor;
use tokio::io::{AsyncReadExt, BufReader};
use tokio::time::{Duration, timeout};
use tokio_util::io::StreamReader;
use tracing::warn;

use crate::common::FANOUT_CONCURRENCY;
use crate::common::config::{AuthMethod, BridgeConfig};
use crate::webdav::types::{AccountType, Depth};

const MAX_REDIRECTS: usize = 5;

type Transport = Client<hyper_rustls::HttpsConnector<HttpConnector>, Full<Bytes>>;

/// DAV transport for a single account (CalDAV or CardDAV flavor).
///
/// Cloning is cheap and reuses the same connection pool.
#[derive(Clone)]
pub struct DavClient {
    base: Uri,
    client: Transport,
    auth: AuthMethod,
    account_type: AccountType,
    default_timeout: Duration,
}

/// Both accounts target the same host; the idle pool keeps one fan-out's
/// worth of connections warm for each of them.
fn build_transport() -> Result<Transport> {
    let https_builder = HttpsConnectorBuilder::new()
        .with_native_roots()
        .unwrap_or_else(|err| {
            warn!(error = %err, "native TLS roots unavailable, using bundled webpki roots");
            HttpsConnectorBuilder::new().with_webpki_roots()
        });

    let https = https_builder
        .https_or_http()
        .enable_http1()
        .enable_http2()
        .build();

    Ok(Client::builder(TokioExecutor::new())
        .http2_adaptive_window(true)
        .pool_max_idle_per_host(2 * FANOUT_CONCURRENCY)
        .build::<_, Full<Bytes>>(https))
}

/// Aggregate a response body, undoing whatever `Content-Encoding` it arrived
/// under. Multistatus bodies for full collections run to megabytes and DAV
/// servers habitually compress them.
async fn aggregate_response(resp: Response<Incoming>) -> Result<Response<Bytes>> {
    let (parts, body) = resp.into_parts();

    let encoding = parts
        .headers
        .get(header::CONTENT_ENCODING)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|token| token.trim().to_ascii_lowercase())
        .unwrap_or_default();

    let stream = BodyStream::new(body)
        .map_ok(|frame| frame.into_data().unwrap_or_default())
        .map_err(std::io::Error::other);
    let reader = BufReader::new(StreamReader::new(stream));

    let mut out = Vec::with_capacity(32 * 1024);
    match encoding.as_str() {
        "br" => {
            let mut dec = BrotliDecoder::new(reader);
            dec.read_to_end(&mut out).await?;
        }
        "gzip" => {
            let mut dec = GzipDecoder::new(reader);
            dec.read_to_end(&mut out).await?;
        }
        "zstd" | "zst" => {
            let mut dec = ZstdDecoder::new(reader);
            dec.read_to_end(&mut out).await?;
        }
        _ => {
            let mut plain = reader;
            plain.read_to_end(&mut out).await?;
        }
    }

    Ok(Response::from_parts(parts, Bytes::from(out)))
}

impl DavClient {
    pub fn new(config: &BridgeConfig, account_type: AccountType) -> Result<Self> {
        let client = build_transport()?;
        let base: Uri = config.server_url.parse()?;

        Ok(Self {
            base,
            client,
            auth: config.auth.clone(),
            account_type,
            default_timeout: Duration::from_secs(config.timeout_secs.max(1)),
        })
    }

    pub fn account_type(&self) -> AccountType {
        self.account_type
    }

    /// The headers the auth injector attaches to every request.
    ///
    /// Exposed so callers issuing standalone server operations (free/busy)
    /// authenticate identically.
    pub fn auth_headers(&self) -> Result<Vec<(HeaderName, HeaderValue)>> {
        let header = match &self.auth {
            AuthMethod::Basic { username, password } => {
                let token = format!("{username}:{password}");
                let value = format!("Basic {}", B64.encode(token));
                (header::AUTHORIZATION, HeaderValue::from_str(&value)?)
            }
            AuthMethod::Bearer { token } => (
                header::AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {token}"))?,
            ),
            AuthMethod::Header { name, value } => (
                HeaderName::from_bytes(name.as_bytes())?,
                HeaderValue::from_str(value)?,
            ),
        };
        Ok(vec![header])
    }

    fn inject_auth(&self, headers: &mut HeaderMap) -> Result<()> {
        for (name, value) in self.auth_headers()? {
            headers.insert(name, value);
        }
        Ok(())
    }

    pub fn build_uri(&self, path: &str) -> Result<Uri> {
        if path.starts_with("http://") || path.starts_with("https://") {
            return Ok(path.parse()?);
        }

        let mut parts = self.base.clone().into_parts();
        let existing_path = parts
            .path_and_query
            .as_ref()
            .map(|pq| pq.path())
            .unwrap_or("/");

        let (path_only, query) = match path.split_once('?') {
            Some((p, q)) => (p, Some(q)),
            None => (path, None),
        };

        let mut combined = if path_only.is_empty() {
            existing_path.to_string()
        } else if path_only.starts_with('/') {
            path_only.to_string()
        } else {
            let mut base = existing_path.trim_end_matches('/').to_string();
            base.push('/');
            base.push_str(path_only);
            base
        };

        if combined.is_empty() {
            combined.push('/');
        }

        let path_and_query = match query {
            Some(q) => format!("{combined}?{q}").parse()?,
            None => combined.parse()?,
        };

        parts.path_and_query = Some(path_and_query);
        Ok(Uri::from_parts(parts)?)
    }

    fn resolve_location(&self, location: &str) -> Result<Uri> {
        self.build_uri(location)
    }

    /// Aggregated send with automatic decompression and redirect following.
    ///
    /// Non-2xx statuses are returned, not raised; status policy lives with
    /// the caller (conditional-write conflicts must not look like transport
    /// failures).
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        headers: HeaderMap,
        body_bytes: Option<Bytes>,
    ) -> Result<Response<Bytes>> {
        let mut uri = self.build_uri(path)?;
        let mut hops = 0usize;

        loop {
            let mut req_headers = headers.clone();
            self.inject_auth(&mut req_headers)?;
            if !req_headers.contains_key(header::ACCEPT_ENCODING) {
                req_headers.insert(
                    header::ACCEPT_ENCODING,
                    HeaderValue::from_static("br, zstd, gzip"),
                );
            }
            if body_bytes.is_some() && !req_headers.contains_key(header::CONTENT_TYPE) {
                req_headers.insert(
                    header::CONTENT_TYPE,
                    HeaderValue::from_static("application/xml; charset=utf-8"),
                );
            }

            let mut builder = Request::builder().method(method.clone()).uri(uri.clone());
            for (k, v) in req_headers.iter() {
                builder = builder.header(k, v);
            }
            let req = builder.body(Full::new(body_bytes.clone().unwrap_or_default()))?;

            let fut = self.client.request(req);
            let resp = timeout(self.default_timeout, fut)
                .await
                .map_err(|_| anyhow!("request to {uri} timed out"))??;

            if resp.status().is_redirection() && hops < MAX_REDIRECTS {
                if let Some(location) = resp
                    .headers()
                    .get(header::LOCATION)
                    .and_then(|v| v.to_str().ok())
                {
                    uri = self.resolve_location(location)?;
                    hops += 1;
                    continue;
                }
            }

            return aggregate_response(resp).await;
        }
    }

    // ----------- HTTP/WebDAV verbs -----------

    pub async fn get(&self, path: &str) -> Result<Response<Bytes>> {
        self.send(Method::GET, path, HeaderMap::new(), None).await
    }

    /// Conditional `PUT` guarded by `If-Match`: only succeeds against the
    /// exact version the ETag names. The tag is echoed byte-for-byte.
    pub async fn put_if_match(
        &self,
        path: &str,
        body: Bytes,
        etag: &str,
    ) -> Result<Response<Bytes>> {
        if etag.is_empty() {
            return Err(anyhow!("ETag cannot be empty"));
        }
        let mut h = HeaderMap::new();
        h.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(self.account_type.object_content_type()),
        );
        h.insert(header::IF_MATCH, HeaderValue::from_str(etag)?);
        self.send(Method::PUT, path, h, Some(body)).await
    }

    /// Create-only `PUT` guarded by `If-None-Match: *`; fails with 412 if the
    /// resource already exists.
    pub async fn put_if_none_match(&self, path: &str, body: Bytes) -> Result<Response<Bytes>> {
        let mut h = HeaderMap::new();
        h.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(self.account_type.object_content_type()),
        );
        h.insert(header::IF_NONE_MATCH, HeaderValue::from_static("*"));
        self.send(Method::PUT, path, h, Some(body)).await
    }

    pub async fn delete_if_match(&self, path: &str, etag: &str) -> Result<Response<Bytes>> {
        if etag.is_empty() {
            return Err(anyhow!("ETag cannot be empty"));
        }
        let mut h = HeaderMap::new();
        h.insert(header::IF_MATCH, HeaderValue::from_str(etag)?);
        self.send(Method::DELETE, path, h, None).await
    }

    pub async fn propfind(&self, path: &str, depth: Depth, xml: &str) -> Result<Response<Bytes>> {
        let mut h = HeaderMap::new();
        h.insert("Depth", HeaderValue::from_str(depth.as_str())?);
        h.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/xml; charset=utf-8"),
        );
        self.send(
            Method::from_bytes(b"PROPFIND")?,
            path,
            h,
            Some(Bytes::from(xml.to_owned())),
        )
        .await
    }

    pub async fn report(&self, path: &str, depth: Depth, xml: &str) -> Result<Response<Bytes>> {
        let mut h = HeaderMap::new();
        h.insert("Depth", HeaderValue::from_str(depth.as_str())?);
        h.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/xml; charset=utf-8"),
        );
        self.send(
            Method::from_bytes(b"REPORT")?,
            path,
            h,
            Some(Bytes::from(xml.to_owned())),
        )
        .await
    }

    /// Extract the `ETag` from a response header map, if present.
    pub fn etag_from_headers(headers: &HeaderMap) -> Option<String> {
        headers
            .get(header::ETAG)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
    }

    // ----------- Discovery -----------

    /// Discover the current user's principal URL.
    ///
    /// Probes the account type's well-known path first (RFC 6764); servers
    /// answer it directly or redirect to the real context path. Falls back to
    /// the configured base when the well-known probe yields nothing.
    pub async fn discover_principal(&self) -> Result<Option<String>> {
        let body = r#"<D:propfind xmlns:D="DAV:">
  <D:prop>
    <D:current-user-principal/>
  </D:prop>
</D:propfind>"#;

        for path in [self.account_type.well_known_path(), ""] {
            let resp = self.propfind(path, Depth::Zero, body).await?;
            if !resp.status().is_success() {
                continue;
            }
            let items = crate::webdav::xml::parse_multistatus(resp.body())?;
            for item in items {
                if let Some(found) = item
                    .current_user_principal
                    .into_iter()
                    .find(|href| !href.is_empty())
                {
                    return Ok(Some(found));
                }
            }
        }
        Ok(None)
    }

    /// Discover the home-set collection(s) for the provided principal path.
    ///
    /// The property queried depends on the account flavor
    /// (`calendar-home-set` vs `addressbook-home-set`).
    pub async fn discover_home_set(&self, principal_path: &str) -> Result<Vec<String>> {
        let body = match self.account_type {
            AccountType::CalDav => {
                r#"<D:propfind xmlns:D="DAV:" xmlns:C="urn:ietf:params:xml:ns:caldav">
  <D:prop>
    <C:calendar-home-set/>
  </D:prop>
</D:propfind>"#
            }
            AccountType::CardDav => {
                r#"<D:propfind xmlns:D="DAV:" xmlns:A="urn:ietf:params:xml:ns:carddav">
  <D:prop>
    <A:addressbook-home-set/>
  </D:prop>
</D:propfind>"#
            }
        };

        let resp = self.propfind(principal_path, Depth::Zero, body).await?;
        if !resp.status().is_success() {
            return Err(anyhow!(
                "PROPFIND {}-home-set failed with {}",
                self.account_type.as_str(),
                resp.status()
            ));
        }

        let mut homes = Vec::new();
        for mut item in crate::webdav::xml::parse_multistatus(resp.body())? {
            match self.account_type {
                AccountType::CalDav => homes.append(&mut item.calendar_home_set),
                AccountType::CardDav => homes.append(&mut item.addressbook_home_set),
            }
        }
        homes.sort();
        homes.dedup();
        Ok(homes)
    }
}
