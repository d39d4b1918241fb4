//! Request descriptors.
//!
//! # Responsibilities
//! - Hold one decoded HTTP instruction from the controller
//! - Normalize method case and drop the `host` header before dispatch
//! - Treat an empty proxy as no proxy

/// A decoded, normalized request instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    /// Controller-assigned id, echoed on the completion.
    pub request_id: String,
    pub url: String,
    /// Upper-cased HTTP method.
    pub method: String,
    /// Headers in the order they were received, without `host`.
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    /// Fingerprint identifier: profile alias, JA3 string, or empty for the default.
    pub fingerprint: String,
    pub proxy: Option<String>,
}

impl RequestDescriptor {
    /// Build a normalized descriptor.
    pub fn new(
        request_id: impl Into<String>,
        url: impl Into<String>,
        method: &str,
        headers: Vec<(String, String)>,
        body: impl Into<Vec<u8>>,
        fingerprint: impl Into<String>,
        proxy: Option<String>,
    ) -> Self {
        let method = method.trim();
        Self {
            request_id: request_id.into(),
            url: url.into(),
            method: if method.is_empty() {
                "GET".to_string()
            } else {
                method.to_ascii_uppercase()
            },
            headers: headers
                .into_iter()
                .filter(|(name, _)| !name.eq_ignore_ascii_case("host"))
                .collect(),
            body: body.into(),
            fingerprint: fingerprint.into(),
            proxy: proxy.filter(|p| !p.trim().is_empty()),
        }
    }

    /// Shorthand for a bodiless GET, mostly for tests and tooling.
    pub fn get(request_id: impl Into<String>, url: impl Into<String>, fingerprint: impl Into<String>) -> Self {
        Self::new(request_id, url, "GET", Vec::new(), Vec::new(), fingerprint, None)
    }
}
