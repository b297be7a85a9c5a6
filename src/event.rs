//! ALB <-> Lambda wire envelopes.
//!
//! See <https://docs.aws.amazon.com/elasticloadbalancing/latest/application/lambda-functions.html>.
//! Both directions are JSON documents capped by Lambda at roughly 1 MB. Binary response bodies are
//! base64-encoded, which costs about a third more of that budget.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};

/// ALB -> Lambda invocation event (single-value headers mode).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AlbRequestEvent {
    #[serde(rename = "httpMethod", default, deserialize_with = "de_null_as_default")]
    pub http_method: String,
    /// Percent-escaped request path.
    #[serde(default, deserialize_with = "de_null_as_default")]
    pub path: String,
    /// Percent-escaped query values, as forwarded by the load balancer.
    #[serde(
        rename = "queryStringParameters",
        default,
        deserialize_with = "de_null_as_default"
    )]
    pub query_string_parameters: HashMap<String, String>,
    #[serde(default, deserialize_with = "de_null_as_default")]
    pub headers: HashMap<String, String>,
    #[serde(default, deserialize_with = "de_null_as_default")]
    pub body: String,
    #[serde(rename = "isBase64Encoded", default, deserialize_with = "de_null_as_default")]
    pub is_base64_encoded: bool,
}

/// Lambda -> ALB response envelope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlbResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    /// Status line text, e.g. `200 OK`.
    #[serde(rename = "statusDescription")]
    pub status_description: String,
    /// Header values; repeated headers are joined with `,`.
    pub headers: HashMap<String, String>,
    pub body: String,
    #[serde(rename = "isBase64Encoded")]
    pub is_base64_encoded: bool,
}

/// ALB sends `null` instead of omitting fields (notably `queryStringParameters`).
fn de_null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
