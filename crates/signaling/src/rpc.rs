//! JSON-RPC 2.0 framing
//!
//! Outbound frames are calls (with an `id`) and notifications (without).
//! Inbound frames are either responses to our calls or unsolicited pushes.
//! The platform delivers pushes as plain JSON-RPC notifications, but the
//! `{"notification": ..., "params": ...}` event form used by some
//! websocket RPC servers is accepted too.

use crate::error::{Result, SignalingError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Protocol version tag carried by every frame
pub const JSONRPC_VERSION: &str = "2.0";

#[derive(Serialize)]
struct OutboundFrame<'a> {
    jsonrpc: &'static str,
    method: &'a str,
    params: &'a Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<u64>,
}

/// Error object of a failed call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl From<RpcError> for SignalingError {
    fn from(err: RpcError) -> Self {
        SignalingError::Rpc {
            code: err.code,
            message: err.message,
        }
    }
}

/// A decoded inbound frame
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    /// Response to a call we made
    Response {
        id: u64,
        result: std::result::Result<Value, RpcError>,
    },
    /// Unsolicited push from the platform
    Notification { method: String, params: Value },
}

/// Encode a call frame
pub fn encode_call(id: u64, method: &str, params: &Value) -> Result<String> {
    Ok(serde_json::to_string(&OutboundFrame {
        jsonrpc: JSONRPC_VERSION,
        method,
        params,
        id: Some(id),
    })?)
}

/// Encode a notification frame
pub fn encode_notification(method: &str, params: &Value) -> Result<String> {
    Ok(serde_json::to_string(&OutboundFrame {
        jsonrpc: JSONRPC_VERSION,
        method,
        params,
        id: None,
    })?)
}

/// Decode one inbound text frame
pub fn decode_message(text: &str) -> Result<InboundMessage> {
    let value: Value = serde_json::from_str(text)?;
    let Value::Object(mut frame) = value else {
        return Err(SignalingError::Serialization {
            reason: "frame is not a JSON object".to_string(),
        });
    };

    let has_outcome = frame.contains_key("result") || frame.contains_key("error");
    if has_outcome {
        let id = frame
            .get("id")
            .and_then(Value::as_u64)
            .ok_or_else(|| SignalingError::Serialization {
                reason: "response without a numeric id".to_string(),
            })?;

        let result = match frame.remove("error") {
            Some(error) if !error.is_null() => Err(serde_json::from_value::<RpcError>(error)?),
            _ => Ok(frame.remove("result").unwrap_or(Value::Null)),
        };
        return Ok(InboundMessage::Response { id, result });
    }

    if let Some(Value::String(method)) = frame.remove("method") {
        let params = frame.remove("params").unwrap_or(Value::Null);
        return Ok(InboundMessage::Notification { method, params });
    }

    if let Some(Value::String(method)) = frame.remove("notification") {
        let params = match frame.remove("params") {
            Some(Value::Array(mut items)) if items.len() == 1 => items.remove(0),
            Some(params) => params,
            None => Value::Null,
        };
        return Ok(InboundMessage::Notification { method, params });
    }

    Err(SignalingError::Serialization {
        reason: "frame is neither a response nor a notification".to_string(),
    })
}
