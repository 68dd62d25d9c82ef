//! Execution Status Machine
//!
//! Defines the valid status transitions for the single tracked execution.

use crate::ExecutorStatus;

/// Events that can trigger status transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusEvent {
    /// Operator reported progress
    Progress,
    /// Operator completed the execution
    Complete,
    /// Operator reported a failure
    Fail,
    /// Operator rejected the request
    Reject,
    /// Terminal response sent, execution cleared
    Reset,
}

/// Get the next status for a given event, if the transition is valid
pub fn next_status(from: ExecutorStatus, event: StatusEvent) -> Option<ExecutorStatus> {
    use ExecutorStatus::*;
    use StatusEvent::*;

    match (from, event) {
        // Progress is repeatable
        (Idle | InProgress, Progress) => Some(InProgress),

        // Terminal reports are allowed with or without prior progress
        (Idle | InProgress, Complete) => Some(Succeeded),
        (Idle | InProgress, Fail) => Some(Failed),
        (Idle | InProgress, Reject) => Some(Rejected),

        // Terminal statuses only ever go back to idle
        (Succeeded | Failed | Rejected, Reset) => Some(Idle),

        _ => None,
    }
}

/// Check if a transition from one status to another is valid
pub fn is_valid_transition(from: ExecutorStatus, to: ExecutorStatus) -> bool {
    use ExecutorStatus::*;

    match (from, to) {
        (Idle, InProgress) | (InProgress, InProgress) => true,
        (Idle | InProgress, Succeeded | Failed | Rejected) => true,
        (Succeeded | Failed | Rejected, Idle) => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ExecutorStatus::*;

    #[test]
    fn test_normal_flow() {
        let status = next_status(Idle, StatusEvent::Progress).unwrap();
        assert_eq!(status, InProgress);

        let status = next_status(status, StatusEvent::Progress).unwrap();
        assert_eq!(status, InProgress);

        let status = next_status(status, StatusEvent::Complete).unwrap();
        assert_eq!(status, Succeeded);

        let status = next_status(status, StatusEvent::Reset).unwrap();
        assert_eq!(status, Idle);
    }

    #[test]
    fn test_terminal_without_progress() {
        assert_eq!(next_status(Idle, StatusEvent::Reject), Some(Rejected));
        assert_eq!(next_status(Idle, StatusEvent::Fail), Some(Failed));
    }

    #[test]
    fn test_terminal_statuses_only_reset() {
        for terminal in [Succeeded, Failed, Rejected] {
            assert_eq!(next_status(terminal, StatusEvent::Progress), None);
            assert_eq!(next_status(terminal, StatusEvent::Complete), None);
            assert_eq!(next_status(terminal, StatusEvent::Reset), Some(Idle));
        }
    }

    #[test]
    fn test_transitions_agree_with_events() {
        let statuses = [Idle, InProgress, Succeeded, Failed, Rejected];
        let events = [
            StatusEvent::Progress,
            StatusEvent::Complete,
            StatusEvent::Fail,
            StatusEvent::Reject,
            StatusEvent::Reset,
        ];

        for from in statuses {
            for event in events {
                if let Some(to) = next_status(from, event) {
                    assert!(is_valid_transition(from, to), "{from} -> {to}");
                }
            }
        }
    }

    #[test]
    fn test_reset_requires_terminal_status() {
        assert_eq!(next_status(Idle, StatusEvent::Reset), None);
        assert_eq!(next_status(InProgress, StatusEvent::Reset), None);
        assert!(!is_valid_transition(InProgress, Idle));
    }

    #[test]
    fn test_invalid_transition() {
        assert!(!is_valid_transition(Succeeded, InProgress));
        assert!(!is_valid_transition(Failed, Rejected));
    }
}
