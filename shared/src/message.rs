//! Response messages published back to the command service

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::reason;

/// Execution status as reported by the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutorStatus {
    Idle,
    InProgress,
    Succeeded,
    Failed,
    Rejected,
}

impl ExecutorStatus {
    /// Terminal statuses end an execution
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ExecutorStatus::Succeeded | ExecutorStatus::Failed | ExecutorStatus::Rejected
        )
    }

    /// Wire name, identical to the serialized form
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutorStatus::Idle => "IDLE",
            ExecutorStatus::InProgress => "IN_PROGRESS",
            ExecutorStatus::Succeeded => "SUCCEEDED",
            ExecutorStatus::Failed => "FAILED",
            ExecutorStatus::Rejected => "REJECTED",
        }
    }
}

impl std::fmt::Display for ExecutorStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How result strings are embedded in the `result` object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultEncoding {
    /// `{"message": "done"}`
    #[default]
    Plain,
    /// AWS typed values: `{"message": {"s": "done"}}`
    Typed,
}

impl ResultEncoding {
    /// Build a single-entry result object
    pub fn result(&self, key: &str, text: &str) -> Value {
        let value = match self {
            ResultEncoding::Plain => Value::String(text.to_string()),
            ResultEncoding::Typed => json!({ "s": text }),
        };
        let mut map = serde_json::Map::new();
        map.insert(key.to_string(), value);
        Value::Object(map)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReason {
    pub reason_code: String,
    pub reason_description: String,
}

impl StatusReason {
    pub fn new(reason_code: impl Into<String>, reason_description: impl Into<String>) -> Self {
        Self {
            reason_code: reason_code.into(),
            reason_description: reason_description.into(),
        }
    }
}

/// A message published to an execution's response topic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMessage {
    pub status: ExecutorStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    pub status_reason: StatusReason,
    /// Unix seconds
    pub timestamp: u64,
}

impl ResponseMessage {
    /// Create an IN_PROGRESS update
    pub fn progress(description: impl Into<String>, timestamp: u64) -> Self {
        Self {
            status: ExecutorStatus::InProgress,
            result: None,
            status_reason: StatusReason::new(reason::OK, description),
            timestamp,
        }
    }

    /// Create a terminal response carrying a result object
    pub fn terminal(
        status: ExecutorStatus,
        reason_code: &str,
        description: impl Into<String>,
        result: Value,
        timestamp: u64,
    ) -> Self {
        debug_assert!(status.is_terminal());
        Self {
            status,
            result: Some(result),
            status_reason: StatusReason::new(reason_code, description),
            timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_wire_names() {
        let encoded = serde_json::to_string(&ExecutorStatus::InProgress).unwrap();
        assert_eq!(encoded, "\"IN_PROGRESS\"");
        assert_eq!(ExecutorStatus::Succeeded.to_string(), "SUCCEEDED");
        assert!(!ExecutorStatus::Idle.is_terminal());
        assert!(ExecutorStatus::Rejected.is_terminal());
    }

    #[test]
    fn test_progress_message_shape() {
        let msg = ResponseMessage::progress("50% done", 1_700_000_000);
        let value = serde_json::to_value(&msg).unwrap();

        assert_eq!(
            value,
            json!({
                "status": "IN_PROGRESS",
                "statusReason": {"reasonCode": "200", "reasonDescription": "50% done"},
                "timestamp": 1_700_000_000u64
            })
        );
    }

    #[test]
    fn test_terminal_message_shape() {
        let result = ResultEncoding::Plain.result("error", "timeout");
        let msg = ResponseMessage::terminal(
            ExecutorStatus::Failed,
            reason::FAILED,
            "timeout",
            result,
            42,
        );
        let value = serde_json::to_value(&msg).unwrap();

        assert_eq!(value["status"], "FAILED");
        assert_eq!(value["result"], json!({"error": "timeout"}));
        assert_eq!(value["statusReason"]["reasonCode"], "500");
        assert_eq!(value["timestamp"], 42);
    }

    #[test]
    fn test_typed_result_encoding() {
        let result = ResultEncoding::Typed.result("message", "done");
        assert_eq!(result, json!({"message": {"s": "done"}}));
    }
}
