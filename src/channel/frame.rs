//! Control channel wire format.
//!
//! Inbound:
//! ```text
//! { "requestId": string, "options": { "url": string, "method": string,
//!   "headers": {string:string}, "body": string, "ja3": string, "proxy": string } }
//! ```
//! Outbound:
//! ```text
//! { "RequestID": string, "Response": { "Status": int, "Body": string, "Headers": {string:string} } }
//! { "RequestID": string, "Error": { "Kind": string, "Message": string } }
//! ```

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{Deserializer, MapAccess, Visitor};
use serde::{Deserialize, Serialize};

use crate::dispatch::Completion;
use crate::error::{BridgeError, BridgeResult, ErrorKind};
use crate::executor::RequestDescriptor;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InboundFrame {
    request_id: String,
    options: InboundOptions,
}

#[derive(Debug, Deserialize)]
struct InboundOptions {
    url: String,
    #[serde(default)]
    method: String,
    #[serde(default, deserialize_with = "ordered_headers")]
    headers: Vec<(String, String)>,
    #[serde(default)]
    body: String,
    #[serde(default)]
    ja3: String,
    #[serde(default)]
    proxy: String,
}

/// Header object as (name, value) pairs in document order; `null` is empty.
fn ordered_headers<'de, D>(deserializer: D) -> Result<Vec<(String, String)>, D::Error>
where
    D: Deserializer<'de>,
{
    struct HeaderVisitor;

    impl<'de> Visitor<'de> for HeaderVisitor {
        type Value = Vec<(String, String)>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map of header names to string values")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
            let mut headers = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some(entry) = map.next_entry::<String, String>()? {
                headers.push(entry);
            }
            Ok(headers)
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E> {
            Ok(Vec::new())
        }
    }

    deserializer.deserialize_any(HeaderVisitor)
}

/// Decode one inbound frame into a normalized request descriptor.
pub fn decode_request(frame: &[u8]) -> BridgeResult<RequestDescriptor> {
    let inbound: InboundFrame =
        serde_json::from_slice(frame).map_err(|e| BridgeError::MalformedFrame(e.to_string()))?;

    if inbound.request_id.is_empty() {
        return Err(BridgeError::MalformedFrame("empty requestId".to_string()));
    }

    let options = inbound.options;
    Ok(RequestDescriptor::new(
        inbound.request_id,
        options.url,
        &options.method,
        options.headers,
        options.body,
        options.ja3,
        Some(options.proxy),
    ))
}

#[derive(Debug, Serialize)]
struct OutboundFrame<'a> {
    #[serde(rename = "RequestID")]
    request_id: &'a str,
    #[serde(rename = "Response", skip_serializing_if = "Option::is_none")]
    response: Option<WireResponse<'a>>,
    #[serde(rename = "Error", skip_serializing_if = "Option::is_none")]
    error: Option<WireError<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct WireResponse<'a> {
    status: u16,
    body: String,
    headers: &'a BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct WireError<'a> {
    kind: ErrorKind,
    message: &'a str,
}

/// Encode a completion as an outbound JSON frame.
pub fn encode_completion(completion: &Completion) -> Result<String, serde_json::Error> {
    let frame = match completion {
        Completion::Response(r) => OutboundFrame {
            request_id: &r.request_id,
            response: Some(WireResponse {
                status: r.status,
                body: String::from_utf8_lossy(&r.body).into_owned(),
                headers: &r.headers,
            }),
            error: None,
        },
        Completion::Failed(n) => OutboundFrame {
            request_id: &n.request_id,
            response: None,
            error: Some(WireError {
                kind: n.kind,
                message: &n.message,
            }),
        },
    };
    serde_json::to_string(&frame)
}
