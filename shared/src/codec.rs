//! JSON codec for command payloads
//!
//! Outbound responses are compact JSON. Inbound request payloads are kept as
//! a [`serde_json::Value`] with no schema applied.

use bytes::Bytes;
use serde_json::Value;
use thiserror::Error;

use crate::ResponseMessage;

/// Maximum payload size (128 KB), the AWS IoT Core message limit
pub const MAX_PAYLOAD_SIZE: usize = 128 * 1024;

/// Errors that can occur during encoding/decoding
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Payload too large: {0} bytes (max: {MAX_PAYLOAD_SIZE})")]
    PayloadTooLarge(usize),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Encode a response message into bytes ready to publish
pub fn encode(message: &ResponseMessage) -> Result<Bytes, CodecError> {
    let buf = serde_json::to_vec(message)?;

    if buf.len() > MAX_PAYLOAD_SIZE {
        return Err(CodecError::PayloadTooLarge(buf.len()));
    }

    Ok(Bytes::from(buf))
}

/// Decode an inbound payload
pub fn decode_payload(buf: &[u8]) -> Result<Value, CodecError> {
    if buf.len() > MAX_PAYLOAD_SIZE {
        return Err(CodecError::PayloadTooLarge(buf.len()));
    }
    Ok(serde_json::from_slice(buf)?)
}

/// Render a payload for humans. Non-JSON bytes are shown as text.
pub fn pretty(buf: &[u8]) -> String {
    match serde_json::from_slice::<Value>(buf) {
        Ok(value) => pretty_value(&value),
        Err(_) => String::from_utf8_lossy(buf).into_owned(),
    }
}

pub fn pretty_value(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{message::ResultEncoding, reason, ExecutorStatus};
    use serde_json::json;

    #[test]
    fn test_encode_terminal_response() {
        let msg = ResponseMessage::terminal(
            ExecutorStatus::Succeeded,
            reason::OK,
            "done",
            ResultEncoding::Plain.result("message", "done"),
            1_700_000_000,
        );

        let encoded = encode(&msg).expect("encode failed");
        let text = std::str::from_utf8(&encoded).unwrap();

        // Field order follows the wire layout
        assert!(text.starts_with(r#"{"status":"SUCCEEDED","result":{"message":"done"},"statusReason":"#));
        assert!(text.ends_with(r#""timestamp":1700000000}"#));
    }

    #[test]
    fn test_encode_oversized_result() {
        let big = "x".repeat(MAX_PAYLOAD_SIZE);
        let msg = ResponseMessage::terminal(
            ExecutorStatus::Failed,
            reason::FAILED,
            "too big",
            json!({ "error": big }),
            0,
        );

        let result = encode(&msg);
        assert!(matches!(result, Err(CodecError::PayloadTooLarge(_))));
    }

    #[test]
    fn test_decode_payload() {
        let value = decode_payload(br#"{"action": "reboot", "delay": 5}"#).unwrap();
        assert_eq!(value["action"], "reboot");
        assert_eq!(value["delay"], 5);

        assert!(matches!(
            decode_payload(b"{not json"),
            Err(CodecError::Json(_))
        ));
    }

    #[test]
    fn test_pretty_falls_back_to_text() {
        assert_eq!(pretty(b"plain text"), "plain text");
        assert_eq!(pretty(br#"{"a":1}"#), "{\n  \"a\": 1\n}");
    }
}
