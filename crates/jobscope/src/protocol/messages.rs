//! Wire shapes exchanged with the browser extension.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::DispatchError;
use crate::codec::MAX_OUTBOUND_FRAME;
use crate::sanitize::redact_secret;

/// Extension settings sent along with a posting.
#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExtractSettings {
    pub provider: String,
    pub ollama_model: String,
    pub perplexity_key: String,
    pub perplexity_model: String,
    pub source_url: String,
}

impl fmt::Debug for ExtractSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractSettings")
            .field("provider", &self.provider)
            .field("ollama_model", &self.ollama_model)
            .field("perplexity_key", &redact_secret(&self.perplexity_key))
            .field("perplexity_model", &self.perplexity_model)
            .field("source_url", &self.source_url)
            .finish()
    }
}

/// One-shot extraction job: the captured page text plus settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractRequest {
    pub text: String,
    #[serde(default)]
    pub settings: ExtractSettings,
}

/// Typed dashboard call.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiRequest {
    pub action: String,
    #[serde(default)]
    pub data: Map<String, Value>,
}

/// A decoded inbound frame.
#[derive(Debug, Clone)]
pub enum Inbound {
    Api(ApiRequest),
    Extract(ExtractRequest),
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum Tagged {
    Api(ApiRequest),
    Extract(ExtractRequest),
}

/// Decodes a frame body into an [`Inbound`] message.
///
/// Frames carrying a `"type"` of `"api"` or `"extract"` are decoded as that
/// shape and nothing else. Untagged frames from older extension builds are
/// probed: a non-empty string `action` makes an API call, otherwise a string
/// `text` makes an extraction job.
pub fn parse_inbound(body: &[u8]) -> Result<Inbound, DispatchError> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| DispatchError::UnrecognizedMessage(format!("invalid JSON: {}", e)))?;

    let Value::Object(map) = value else {
        return Err(DispatchError::UnrecognizedMessage(
            "message is not a JSON object".to_string(),
        ));
    };

    if map.contains_key("type") {
        return parse_tagged(map);
    }
    parse_untagged(map)
}

fn parse_tagged(map: Map<String, Value>) -> Result<Inbound, DispatchError> {
    let tagged: Tagged = serde_json::from_value(Value::Object(map))
        .map_err(|e| DispatchError::UnrecognizedMessage(e.to_string()))?;
    match tagged {
        Tagged::Api(req) if req.action.trim().is_empty() => Err(DispatchError::MissingField("action")),
        Tagged::Api(req) => Ok(Inbound::Api(req)),
        Tagged::Extract(req) => Ok(Inbound::Extract(req)),
    }
}

fn parse_untagged(map: Map<String, Value>) -> Result<Inbound, DispatchError> {
    let has_action = map
        .get("action")
        .and_then(Value::as_str)
        .is_some_and(|a| !a.trim().is_empty());
    let has_text = map.get("text").is_some_and(Value::is_string);

    let value = Value::Object(map);
    if has_action {
        log::debug!("Untagged frame routed as API request");
        return serde_json::from_value(value)
            .map(Inbound::Api)
            .map_err(|e| DispatchError::UnrecognizedMessage(e.to_string()));
    }
    if has_text {
        log::debug!("Untagged frame routed as extraction request");
        return serde_json::from_value(value)
            .map(Inbound::Extract)
            .map_err(|e| DispatchError::UnrecognizedMessage(e.to_string()));
    }

    Err(DispatchError::UnrecognizedMessage(
        "expected an 'action' or a 'text' field".to_string(),
    ))
}

/// Reply to an [`ApiRequest`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl ApiResponse {
    pub fn ok(payload: Value) -> Self {
        Self {
            ok: true,
            error: None,
            payload: Some(payload),
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: Some(message.into()),
            payload: None,
        }
    }
}

/// Reply to an [`ExtractRequest`], in the shape the extension popup reads.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractResponse {
    /// `"success"` or `"error"`.
    pub status: String,
    /// Path of the raw text artifact, empty when none was written.
    pub filename: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExtractResponse {
    pub fn success(filename: String, json_file: Option<String>) -> Self {
        Self {
            status: "success".to_string(),
            filename,
            json_file,
            error: None,
        }
    }

    pub fn failure(filename: String, json_file: Option<String>, error: String) -> Self {
        Self {
            status: "error".to_string(),
            filename,
            json_file,
            error: Some(error),
        }
    }
}

/// Any outbound frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Response {
    Api(ApiResponse),
    Extract(ExtractResponse),
}

impl From<ApiResponse> for Response {
    fn from(r: ApiResponse) -> Self {
        Self::Api(r)
    }
}

impl From<ExtractResponse> for Response {
    fn from(r: ExtractResponse) -> Self {
        Self::Extract(r)
    }
}

/// Serializes a reply for the channel.
///
/// A reply the browser would refuse (over [`MAX_OUTBOUND_FRAME`]) is
/// replaced by a small error reply.
pub fn encode_response(response: &Response) -> Vec<u8> {
    let reason = match serde_json::to_vec(response) {
        Ok(bytes) if bytes.len() <= MAX_OUTBOUND_FRAME => return bytes,
        Ok(bytes) => format!(
            "response of {} bytes exceeds the {} byte limit",
            bytes.len(),
            MAX_OUTBOUND_FRAME
        ),
        Err(e) => format!("failed to encode response: {}", e),
    };
    log::warn!("Replacing outbound frame: {}", reason);
    serde_json::json!({ "ok": false, "error": reason })
        .to_string()
        .into_bytes()
}
