// Query-parameter overrides (pdf, wm, email, token)

use std::collections::HashMap;

/// Values supplied through the viewer's query string.
///
/// Empty values are treated as absent, matching how the identity helpers
/// treat blank tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryOverrides {
    /// Document location replacing the configured source
    pub pdf: Option<String>,
    /// Literal watermark text
    pub wm: Option<String>,
    /// Preset identity
    pub email: Option<String>,
    /// Preset bearer token
    pub token: Option<String>,
}

/// Split a raw query string into decoded key/value pairs.
///
/// A leading `?` is ignored; `+` decodes to a space. Later keys win.
pub fn parse_query(query: &str) -> HashMap<String, String> {
    query
        .trim_start_matches('?')
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter_map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let key = decode_component(key)?;
            let value = decode_component(value)?;
            Some((key, value))
        })
        .collect()
}

fn decode_component(raw: &str) -> Option<String> {
    let spaced = raw.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(decoded) => Some(decoded.into_owned()),
        Err(e) => {
            tracing::warn!(component = raw, error = %e, "Ignoring undecodable query component");
            None
        }
    }
}

fn non_empty(params: &HashMap<String, String>, name: &str) -> Option<String> {
    params
        .get(name)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

impl QueryOverrides {
    pub fn from_query(query: &str) -> Self {
        Self::from_params(&parse_query(query))
    }

    pub fn from_params(params: &HashMap<String, String>) -> Self {
        Self {
            pdf: non_empty(params, "pdf"),
            wm: non_empty(params, "wm"),
            email: non_empty(params, "email"),
            token: non_empty(params, "token"),
        }
    }

    /// Fill fields still unset from `other`.
    pub fn or(self, other: QueryOverrides) -> Self {
        Self {
            pdf: self.pdf.or(other.pdf),
            wm: self.wm.or(other.wm),
            email: self.email.or(other.email),
            token: self.token.or(other.token),
        }
    }
}
