//! Content-line model for iCalendar (RFC 5545) and vCard (RFC 6350) bodies.
//!
//! The editors in this crate never rebuild an object from a typed model; the
//! authoritative shape is the raw body. This module parses that body into a
//! component tree that preserves property order, parameters (verbatim,
//! including quoting), group prefixes (`item1.EMAIL`), and unknown content,
//! so a parse → targeted mutation → serialize cycle keeps everything the
//! editor was not asked to touch stable through the parser.

use crate::common::error::{Error, Result};

/// A property parameter, e.g. `PARTSTAT=ACCEPTED` or a bare `RSVP`.
///
/// The value is stored exactly as it appeared on the wire, quotes included;
/// [`Param::unquoted`] strips them for comparisons.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub value: Option<String>,
}

impl Param {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
        }
    }

    pub fn unquoted(&self) -> Option<&str> {
        self.value
            .as_deref()
            .map(|v| v.trim_matches('"'))
    }
}

/// One content line: optional group, name, parameters, raw value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    pub group: Option<String>,
    pub name: String,
    pub params: Vec<Param>,
    pub value: String,
}

impl Property {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            group: None,
            name: name.into(),
            params: Vec::new(),
            value: value.into(),
        }
    }

    pub fn with_params(
        name: impl Into<String>,
        value: impl Into<String>,
        params: Vec<Param>,
    ) -> Self {
        Self {
            group: None,
            name: name.into(),
            params,
            value: value.into(),
        }
    }

    pub fn is_named(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    pub fn param(&self, name: &str) -> Option<&Param> {
        self.params.iter().find(|p| p.name.eq_ignore_ascii_case(name))
    }

    /// Unquoted value of a named parameter.
    pub fn param_value(&self, name: &str) -> Option<&str> {
        self.param(name).and_then(Param::unquoted)
    }

    pub fn set_param(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.params.iter_mut().find(|p| p.name.eq_ignore_ascii_case(name)) {
            Some(param) => param.value = Some(value),
            None => self.params.push(Param::new(name.to_uppercase(), value)),
        }
    }

    fn serialize_into(&self, out: &mut String) {
        let mut line = String::new();
        if let Some(group) = &self.group {
            line.push_str(group);
            line.push('.');
        }
        line.push_str(&self.name);
        for param in &self.params {
            line.push(';');
            line.push_str(&param.name);
            if let Some(value) = &param.value {
                line.push('=');
                line.push_str(value);
            }
        }
        line.push(':');
        line.push_str(&self.value);
        fold_line(&line, out);
    }
}

/// A component: `BEGIN:NAME` … `END:NAME` with properties and nested
/// components in original order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    pub name: String,
    pub properties: Vec<Property>,
    pub components: Vec<Component>,
}

impl Component {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: Vec::new(),
            components: Vec::new(),
        }
    }

    pub fn is_named(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    /// First property with the given name, group prefixes ignored.
    pub fn prop(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.is_named(name))
    }

    pub fn prop_mut(&mut self, name: &str) -> Option<&mut Property> {
        self.properties.iter_mut().find(|p| p.is_named(name))
    }

    /// All properties with the given name, in order.
    pub fn props<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Property> {
        self.properties.iter().filter(move |p| p.is_named(name))
    }

    /// Unescaped value of the first property with the given name.
    pub fn prop_value(&self, name: &str) -> Option<String> {
        self.prop(name).map(|p| unescape_text(&p.value))
    }

    pub fn push_property(&mut self, property: Property) {
        self.properties.push(property);
    }

    /// Replace the value of the first matching property, keeping its
    /// parameters; append a fresh property when none exists.
    pub fn upsert_value(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.prop_mut(name) {
            Some(prop) => prop.value = value,
            None => self.properties.push(Property::new(name.to_string(), value)),
        }
    }

    /// Replace value *and* parameters of the first matching property (or
    /// append). Used where the parameter set itself is part of the change,
    /// e.g. `DTSTART;VALUE=DATE`.
    pub fn upsert_with_params(&mut self, name: &str, value: impl Into<String>, params: Vec<Param>) {
        let value = value.into();
        match self.prop_mut(name) {
            Some(prop) => {
                prop.value = value;
                prop.params = params;
            }
            None => self
                .properties
                .push(Property::with_params(name.to_string(), value, params)),
        }
    }

    pub fn remove_properties(&mut self, name: &str) -> usize {
        let before = self.properties.len();
        self.properties.retain(|p| !p.is_named(name));
        before - self.properties.len()
    }

    /// First direct subcomponent with the given name.
    pub fn component(&self, name: &str) -> Option<&Component> {
        self.components.iter().find(|c| c.is_named(name))
    }

    pub fn component_mut(&mut self, name: &str) -> Option<&mut Component> {
        self.components.iter_mut().find(|c| c.is_named(name))
    }

    pub fn components_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Component> {
        self.components.iter().filter(move |c| c.is_named(name))
    }

    pub fn push_component(&mut self, component: Component) {
        self.components.push(component);
    }

    pub fn serialize(&self) -> String {
        let mut out = String::new();
        self.serialize_into(&mut out);
        out
    }

    fn serialize_into(&self, out: &mut String) {
        fold_line(&format!("BEGIN:{}", self.name), out);
        for property in &self.properties {
            property.serialize_into(out);
        }
        for component in &self.components {
            component.serialize_into(out);
        }
        fold_line(&format!("END:{}", self.name), out);
    }
}

/// Parse a raw body into its top-level components (usually exactly one
/// `VCALENDAR` or `VCARD`). Properties outside any component are ignored.
pub fn parse_components(raw: &str) -> Result<Vec<Component>> {
    let mut roots = Vec::new();
    let mut stack: Vec<Component> = Vec::new();

    for line in unfold_lines(raw) {
        if line.is_empty() {
            continue;
        }
        if let Some(name) = line.strip_prefix("BEGIN:").or(line.strip_prefix("begin:")) {
            stack.push(Component::new(name.trim().to_string()));
            continue;
        }
        if let Some(name) = line.strip_prefix("END:").or(line.strip_prefix("end:")) {
            let name = name.trim();
            let Some(finished) = stack.pop() else {
                return Err(Error::Parse(format!("END:{name} without matching BEGIN")));
            };
            if !finished.is_named(name) {
                return Err(Error::Parse(format!(
                    "END:{name} does not close BEGIN:{}",
                    finished.name
                )));
            }
            match stack.last_mut() {
                Some(parent) => parent.components.push(finished),
                None => roots.push(finished),
            }
            continue;
        }
        if let Some(component) = stack.last_mut() {
            component.properties.push(parse_content_line(&line)?);
        }
    }

    if let Some(open) = stack.last() {
        return Err(Error::Parse(format!("BEGIN:{} was never closed", open.name)));
    }
    if roots.is_empty() {
        return Err(Error::Parse("no component found".into()));
    }
    Ok(roots)
}

/// Parse a raw body expected to hold a single top-level component.
pub fn parse_component(raw: &str) -> Result<Component> {
    let mut roots = parse_components(raw)?;
    Ok(roots.swap_remove(0))
}

/// Logical lines after unfolding (RFC 5545 §3.1): a line starting with SPACE
/// or HTAB continues the previous one, minus that first octet.
fn unfold_lines(raw: &str) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    for line in raw.split('\n') {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if let Some(rest) = line.strip_prefix(' ').or(line.strip_prefix('\t')) {
            if let Some(last) = lines.last_mut() {
                last.push_str(rest);
                continue;
            }
        }
        lines.push(line.to_string());
    }
    lines
}

fn parse_content_line(line: &str) -> Result<Property> {
    // Split name+params from value at the first ':' outside double quotes.
    let mut in_quotes = false;
    let mut colon = None;
    for (idx, ch) in line.char_indices() {
        match ch {
            '"' => in_quotes = !in_quotes,
            ':' if !in_quotes => {
                colon = Some(idx);
                break;
            }
            _ => {}
        }
    }
    let Some(colon) = colon else {
        return Err(Error::Parse(format!("content line without ':': {line}")));
    };

    let (head, value) = (&line[..colon], &line[colon + 1..]);
    let mut segments = split_unquoted(head, ';');
    let name_token = segments.remove(0);

    let (group, name) = match name_token.split_once('.') {
        Some((group, name)) if !group.is_empty() && !name.is_empty() => {
            (Some(group.to_string()), name.to_string())
        }
        _ => (None, name_token.to_string()),
    };
    if name.is_empty() {
        return Err(Error::Parse(format!("content line without a name: {line}")));
    }

    let params = segments
        .into_iter()
        .map(|segment| match segment.split_once('=') {
            Some((key, value)) => Param {
                name: key.to_string(),
                value: Some(value.to_string()),
            },
            None => Param {
                name: segment.to_string(),
                value: None,
            },
        })
        .collect();

    Ok(Property {
        group,
        name,
        params,
        value: value.to_string(),
    })
}

fn split_unquoted(input: &str, separator: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    for ch in input.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                current.push(ch);
            }
            c if c == separator && !in_quotes => {
                parts.push(std::mem::take(&mut current));
            }
            c => current.push(c),
        }
    }
    parts.push(current);
    parts
}

/// Fold one logical line to 75 octets per physical line (RFC 5545 §3.1),
/// breaking on character boundaries.
fn fold_line(line: &str, out: &mut String) {
    const LIMIT: usize = 75;
    if line.len() <= LIMIT {
        out.push_str(line);
        out.push_str("\r\n");
        return;
    }

    let mut budget = LIMIT;
    let mut width = 0;
    let mut first = true;
    for ch in line.chars() {
        let len = ch.len_utf8();
        if width + len > budget {
            out.push_str("\r\n ");
            width = 0;
            if first {
                // Continuation lines lose one octet to the leading space.
                budget = LIMIT - 1;
                first = false;
            }
        }
        out.push(ch);
        width += len;
    }
    out.push_str("\r\n");
}

/// Escape a text value per RFC 5545 §3.3.11 / RFC 6350 §3.4.
pub fn escape_text(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            ';' => out.push_str("\\;"),
            ',' => out.push_str("\\,"),
            '\n' => out.push_str("\\n"),
            '\r' => {}
            _ => out.push(ch),
        }
    }
    out
}

/// Undo [`escape_text`].
pub fn unescape_text(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') | Some('N') => out.push('\n'),
            Some(escaped) => out.push(escaped),
            None => out.push('\\'),
        }
    }
    out
}
