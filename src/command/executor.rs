//! Command executor - tracks the active execution and publishes its responses

use crate::transport::Publisher;
use command_shared::{
    codec::{self, CodecError},
    defaults, reason,
    state_machine::{is_valid_transition, next_status, StatusEvent},
    ExecutorStatus, ResponseMessage, ResultEncoding, TopicError, Topics,
};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Errors returned by the report operations
#[derive(Error, Debug)]
pub enum ExecutorError {
    /// Nothing to report on; the call was a no-op
    #[error("No active command")]
    NoActiveExecution,

    #[error(transparent)]
    Topic(#[from] TopicError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("Publish failed: {0}")]
    Publish(#[source] anyhow::Error),
}

impl ExecutorError {
    pub fn is_no_active(&self) -> bool {
        matches!(self, ExecutorError::NoActiveExecution)
    }
}

/// Wall-clock source for response timestamps
pub trait Clock: Send + Sync {
    /// Unix seconds
    fn now_secs(&self) -> u64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_secs(&self) -> u64 {
        command_shared::now_secs()
    }
}

/// The execution currently being answered
#[derive(Debug, Clone, PartialEq)]
pub struct Execution {
    pub execution_id: String,
    pub payload: Value,
    pub response_topic: String,
}

/// Point-in-time view of the executor for display
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub status: ExecutorStatus,
    pub execution: Option<Execution>,
}

/// What a successful report published
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub topic: String,
    pub message: ResponseMessage,
}

#[derive(Debug)]
struct ExecutorState {
    status: ExecutorStatus,
    current: Option<Execution>,
}

impl ExecutorState {
    fn apply(&mut self, event: StatusEvent) {
        match next_status(self.status, event) {
            Some(next) => {
                debug_assert!(is_valid_transition(self.status, next));
                self.status = next;
            }
            None => error!("Invalid status transition: {} on {:?}", self.status, event),
        }
    }
}

/// Answers at most one command execution at a time.
///
/// The inbound listener and the console share one executor. Every operation
/// takes the same lock and holds it across its publish, so a new request can
/// never land in the middle of a terminal transition.
pub struct CommandExecutor {
    topics: Topics,
    result_encoding: ResultEncoding,
    publisher: Arc<dyn Publisher>,
    clock: Arc<dyn Clock>,
    state: Mutex<ExecutorState>,
}

impl CommandExecutor {
    /// Create a new command executor
    pub fn new(topics: Topics, publisher: Arc<dyn Publisher>) -> Self {
        Self {
            topics,
            result_encoding: ResultEncoding::default(),
            publisher,
            clock: Arc::new(SystemClock),
            state: Mutex::new(ExecutorState {
                status: ExecutorStatus::Idle,
                current: None,
            }),
        }
    }

    #[cfg(test)]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_result_encoding(mut self, encoding: ResultEncoding) -> Self {
        self.result_encoding = encoding;
        self
    }

    pub fn topics(&self) -> &Topics {
        &self.topics
    }

    /// Start tracking the execution requested on `topic`.
    ///
    /// An unfinished execution is replaced and never answered. Status is
    /// left as it was.
    pub async fn on_request(&self, topic: &str, payload: Value) -> Result<String, ExecutorError> {
        let execution_id = self.topics.parse_request(topic)?;
        let execution = Execution {
            response_topic: self.topics.response_topic(&execution_id),
            execution_id: execution_id.clone(),
            payload,
        };

        let mut state = self.state.lock().await;
        if let Some(previous) = state.current.replace(execution) {
            warn!(
                "Execution {} replaced by {} before a final response (status {})",
                previous.execution_id, execution_id, state.status
            );
        }

        info!("Tracking execution {}", execution_id);
        Ok(execution_id)
    }

    /// Report IN_PROGRESS for the active execution
    pub async fn progress(&self, description: &str) -> Result<Report, ExecutorError> {
        let mut state = self.state.lock().await;
        let execution = state
            .current
            .as_ref()
            .ok_or(ExecutorError::NoActiveExecution)?;

        let report = Report {
            topic: execution.response_topic.clone(),
            message: ResponseMessage::progress(description, self.clock.now_secs()),
        };
        self.send(&report).await?;

        state.apply(StatusEvent::Progress);
        Ok(report)
    }

    /// Finish with SUCCEEDED
    pub async fn complete(&self, result: &str) -> Result<Report, ExecutorError> {
        self.finish(
            StatusEvent::Complete,
            ExecutorStatus::Succeeded,
            reason::OK,
            result,
            "message",
        )
        .await
    }

    /// Finish with FAILED
    pub async fn fail(&self, error: &str) -> Result<Report, ExecutorError> {
        self.finish(
            StatusEvent::Fail,
            ExecutorStatus::Failed,
            reason::FAILED,
            error,
            "error",
        )
        .await
    }

    /// Finish with REJECTED
    pub async fn reject(&self, error: &str) -> Result<Report, ExecutorError> {
        self.finish(
            StatusEvent::Reject,
            ExecutorStatus::Rejected,
            reason::REJECTED,
            error,
            "rejected_reason",
        )
        .await
    }

    /// Publish a terminal response, then clear the execution.
    ///
    /// On publish failure nothing changes, so the same report can be sent again.
    async fn finish(
        &self,
        event: StatusEvent,
        status: ExecutorStatus,
        reason_code: &str,
        description: &str,
        result_key: &str,
    ) -> Result<Report, ExecutorError> {
        let mut state = self.state.lock().await;
        let execution = state
            .current
            .as_ref()
            .ok_or(ExecutorError::NoActiveExecution)?;

        let report = Report {
            topic: execution.response_topic.clone(),
            message: ResponseMessage::terminal(
                status,
                reason_code,
                description,
                self.result_encoding.result(result_key, description),
                self.clock.now_secs(),
            ),
        };
        self.send(&report).await?;

        let finished = state.current.take();
        state.apply(event);
        info!(
            "Execution {} finished: {}",
            finished.map(|e| e.execution_id).unwrap_or_default(),
            state.status
        );
        state.apply(StatusEvent::Reset);

        Ok(report)
    }

    async fn send(&self, report: &Report) -> Result<(), ExecutorError> {
        let payload = codec::encode(&report.message)?;
        debug!(
            "Publishing {} ({} bytes) via {}",
            report.topic,
            payload.len(),
            self.publisher.name()
        );
        self.publisher
            .publish(&report.topic, payload)
            .await
            .map_err(ExecutorError::Publish)
    }

    /// Current status and execution, cloned
    pub async fn snapshot(&self) -> Snapshot {
        let state = self.state.lock().await;
        Snapshot {
            status: state.status,
            execution: state.current.clone(),
        }
    }

    #[cfg(test)]
    pub async fn status(&self) -> ExecutorStatus {
        self.state.lock().await.status
    }
}

/// Report operations with their default texts
impl CommandExecutor {
    pub async fn progress_default(&self) -> Result<Report, ExecutorError> {
        self.progress(defaults::PROGRESS_MESSAGE).await
    }

    pub async fn complete_default(&self) -> Result<Report, ExecutorError> {
        self.complete(defaults::COMPLETE_RESULT).await
    }

    pub async fn fail_default(&self) -> Result<Report, ExecutorError> {
        self.fail(defaults::FAIL_MESSAGE).await
    }

    pub async fn reject_default(&self) -> Result<Report, ExecutorError> {
        self.reject(defaults::REJECT_MESSAGE).await
    }
}
