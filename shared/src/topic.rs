//! Topic layout for command executions
//!
//! All per-thing topics hang off one base:
//! ```text
//! {prefix}/commands/things/{thing}/executions/{execution_id}/...
//! ```
//! The prefix is the reserved `$aws` namespace on AWS IoT Core. An empty
//! prefix drops it, which is handy against a local broker.

use thiserror::Error;

/// Reserved AWS IoT topic namespace
pub const AWS_PREFIX: &str = "$aws";

/// A received topic, parsed into what it means for this thing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundTopic {
    /// New execution request
    Request { execution_id: String },
    /// The service accepted one of our responses
    Accepted { execution_id: String },
    /// The service rejected one of our responses
    Rejected { execution_id: String },
    /// Command execution lifecycle event
    Event { command_id: String, event_type: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TopicError {
    #[error("Topic belongs to thing '{0}'")]
    Foreign(String),

    #[error("Unrecognized topic: {0}")]
    Unrecognized(String),

    #[error("Empty execution id in topic: {0}")]
    EmptyExecutionId(String),

    #[error("Expected a request topic, got: {0}")]
    NotARequest(String),
}

/// Topic builder and parser bound to one thing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics {
    prefix: String,
    thing_name: String,
}

impl Topics {
    /// Topics under the reserved `$aws` namespace
    pub fn new(thing_name: impl Into<String>) -> Self {
        Self::with_prefix(AWS_PREFIX, thing_name)
    }

    pub fn with_prefix(prefix: impl Into<String>, thing_name: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into().trim_end_matches('/').to_string(),
            thing_name: thing_name.into(),
        }
    }

    pub fn thing_name(&self) -> &str {
        &self.thing_name
    }

    fn rooted(&self, rest: &str) -> String {
        if self.prefix.is_empty() {
            rest.to_string()
        } else {
            format!("{}/{}", self.prefix, rest)
        }
    }

    /// `{prefix}/commands/things/{thing}/executions`
    pub fn executions_base(&self) -> String {
        self.rooted(&format!("commands/things/{}/executions", self.thing_name))
    }

    /// Filters to subscribe to, in subscription order
    pub fn subscriptions(&self) -> Vec<String> {
        let base = self.executions_base();
        vec![
            format!("{}/+/request/json", base),
            format!("{}/+/response/accepted/json", base),
            format!("{}/+/response/rejected/json", base),
            self.rooted("events/commandExecution/+/+"),
        ]
    }

    /// Where responses for an execution are published
    pub fn response_topic(&self, execution_id: &str) -> String {
        format!("{}/{}/response/json", self.executions_base(), execution_id)
    }

    /// Parse a received topic
    pub fn parse(&self, topic: &str) -> Result<InboundTopic, TopicError> {
        let unrecognized = || TopicError::Unrecognized(topic.to_string());

        let rest = if self.prefix.is_empty() {
            topic
        } else {
            topic
                .strip_prefix(self.prefix.as_str())
                .and_then(|r| r.strip_prefix('/'))
                .ok_or_else(unrecognized)?
        };

        let segments: Vec<&str> = rest.split('/').collect();

        match segments.as_slice() {
            ["events", "commandExecution", command_id, event_type] => Ok(InboundTopic::Event {
                command_id: command_id.to_string(),
                event_type: event_type.to_string(),
            }),
            ["commands", "things", thing, "executions", execution_id, tail @ ..] => {
                if *thing != self.thing_name {
                    return Err(TopicError::Foreign(thing.to_string()));
                }
                if execution_id.is_empty() {
                    return Err(TopicError::EmptyExecutionId(topic.to_string()));
                }
                let execution_id = execution_id.to_string();
                match tail {
                    ["request", "json"] => Ok(InboundTopic::Request { execution_id }),
                    ["response", "accepted", "json"] => Ok(InboundTopic::Accepted { execution_id }),
                    ["response", "rejected", "json"] => Ok(InboundTopic::Rejected { execution_id }),
                    _ => Err(unrecognized()),
                }
            }
            _ => Err(unrecognized()),
        }
    }

    /// Parse a topic that must be an execution request
    pub fn parse_request(&self, topic: &str) -> Result<String, TopicError> {
        match self.parse(topic)? {
            InboundTopic::Request { execution_id } => Ok(execution_id),
            _ => Err(TopicError::NotARequest(topic.to_string())),
        }
    }
}
