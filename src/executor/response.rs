//! Response descriptors and header folding.

use std::collections::BTreeMap;

use reqwest::header::HeaderMap;

use crate::error::{BridgeError, ErrorKind};

/// Separator used when folding repeated `Set-Cookie` headers.
pub const SET_COOKIE_SEPARATOR: &str = "/,/";

/// Normalized result of one upstream exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseDescriptor {
    pub request_id: String,
    pub status: u16,
    pub body: Vec<u8>,
    /// Canonical header name -> folded value.
    pub headers: BTreeMap<String, String>,
}

/// Failure report for a request, sent in place of a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorNotification {
    pub request_id: String,
    pub kind: ErrorKind,
    pub message: String,
}

impl ErrorNotification {
    pub fn new(request_id: impl Into<String>, error: &BridgeError) -> Self {
        Self {
            request_id: request_id.into(),
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

/// Canonical MIME form of a header name: `content-type` → `Content-Type`.
pub fn canonical_header_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper = true;
    for c in name.chars() {
        if upper {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c.to_ascii_lowercase());
        }
        upper = c == '-';
    }
    out
}

/// Fold response headers into one value per name.
///
/// `Set-Cookie` values are joined with [`SET_COOKIE_SEPARATOR`]; for every
/// other header the last value wins.
pub fn fold_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut folded: BTreeMap<String, String> = BTreeMap::new();

    for name in headers.keys() {
        let canonical = canonical_header_name(name.as_str());
        let mut values = headers
            .get_all(name)
            .iter()
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned());

        let value = if canonical == "Set-Cookie" {
            values.collect::<Vec<_>>().join(SET_COOKIE_SEPARATOR)
        } else {
            values.last().unwrap_or_default()
        };
        folded.insert(canonical, value);
    }

    folded
}
