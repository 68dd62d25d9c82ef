//! Command Execution Shared Types
//!
//! This crate provides the topic layout, wire messages, JSON codec and status
//! machine for answering AWS IoT command executions from a device.

pub mod codec;
pub mod message;
pub mod state_machine;
pub mod topic;

use std::time::{SystemTime, UNIX_EPOCH};

// Re-export commonly used types at crate root
pub use message::{ExecutorStatus, ResponseMessage, ResultEncoding, StatusReason};
pub use topic::{InboundTopic, TopicError, Topics};

/// Get current timestamp in whole seconds since Unix epoch
pub fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Reason codes mirrored in the `statusReason` of every response
pub mod reason {
    /// Progress and successful completion
    pub const OK: &str = "200";

    /// Request rejected as invalid or incompatible
    pub const REJECTED: &str = "400";

    /// Execution failed on the device
    pub const FAILED: &str = "500";
}

/// Default texts used when the operator does not supply one
pub mod defaults {
    pub const PROGRESS_MESSAGE: &str = "Processing...";
    pub const COMPLETE_RESULT: &str = "completed";
    pub const FAIL_MESSAGE: &str = "Command failed";
    pub const REJECT_MESSAGE: &str = "Invalid or incompatible request";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_secs_is_seconds() {
        let now = now_secs();
        // Sometime after 2020 and not a millisecond value
        assert!(now > 1_577_836_800);
        assert!(now < 10_000_000_000);
    }

    #[test]
    fn test_reason_codes() {
        assert_eq!(reason::OK, "200");
        assert_eq!(reason::REJECTED, "400");
        assert_eq!(reason::FAILED, "500");
    }
}
