use dav_bridge_rs::{AuthMethod, BridgeConfig, Error};

fn base_config() -> BridgeConfig {
    BridgeConfig {
        server_url: "https://dav.example.com".to_string(),
        auth: AuthMethod::Basic {
            username: "user01".to_string(),
            password: "secret".to_string(),
        },
        default_calendar: None,
        default_address_book: None,
        timezone: None,
        timeout_secs: 20,
    }
}

#[test]
fn valid_config_passes() {
    assert!(base_config().validate().is_ok());
}

#[test]
fn empty_server_url_names_the_field() {
    let mut config = base_config();
    config.server_url = String::new();
    let err = config.validate().unwrap_err();
    assert!(matches!(err, Error::Config(_)));
    assert!(err.to_string().contains("server_url"));
}

#[test]
fn non_http_scheme_is_rejected() {
    let mut config = base_config();
    config.server_url = "ldap://dav.example.com".to_string();
    assert!(matches!(config.validate(), Err(Error::Config(_))));
}

#[test]
fn empty_credentials_are_rejected_per_mode() {
    let mut config = base_config();
    config.auth = AuthMethod::Basic {
        username: String::new(),
        password: "x".to_string(),
    };
    assert!(matches!(config.validate(), Err(Error::Config(_))));

    config.auth = AuthMethod::Bearer {
        token: String::new(),
    };
    assert!(matches!(config.validate(), Err(Error::Config(_))));

    config.auth = AuthMethod::Header {
        name: String::new(),
        value: "token".to_string(),
    };
    assert!(matches!(config.validate(), Err(Error::Config(_))));
}

#[test]
fn header_auth_with_name_passes() {
    let mut config = base_config();
    config.auth = AuthMethod::Header {
        name: "X-Session-Token".to_string(),
        value: "abc123".to_string(),
    };
    assert!(config.validate().is_ok());
}
