//! Inbound message handling for the background listener

use super::CommandExecutor;
use crate::connection::ConnectionEvent;
use crate::console;
use command_shared::{codec, InboundTopic};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Consume connection events until the connection manager goes away
pub async fn run(mut events: mpsc::Receiver<ConnectionEvent>, executor: Arc<CommandExecutor>) {
    let mut announced = false;

    while let Some(event) = events.recv().await {
        match event {
            ConnectionEvent::Connected { subscriptions } => {
                info!(
                    "Connected as {}, subscribed to {} topics",
                    executor.topics().thing_name(),
                    subscriptions
                );
                if !announced {
                    console::print_ready();
                    announced = true;
                }
            }
            ConnectionEvent::Disconnected { reason } => {
                warn!("Disconnected: {}", reason);
            }
            ConnectionEvent::Received { topic, payload } => {
                handle_inbound(&executor, &topic, &payload).await;
            }
        }
    }

    info!("Connection event channel closed");
}

/// Show an inbound message and hand requests to the executor.
///
/// Returns the execution id when a new execution is now tracked.
pub async fn handle_inbound(
    executor: &CommandExecutor,
    topic: &str,
    payload: &[u8],
) -> Option<String> {
    console::print_inbound(topic, payload);

    let parsed = match executor.topics().parse(topic) {
        Ok(parsed) => parsed,
        Err(e) => {
            debug!("Ignoring message: {}", e);
            return None;
        }
    };

    match parsed {
        InboundTopic::Request { .. } => {
            let value = match codec::decode_payload(payload) {
                Ok(value) => value,
                Err(e) => {
                    warn!("Dropping request on {}: {}", topic, e);
                    return None;
                }
            };

            match executor.on_request(topic, value).await {
                Ok(execution_id) => Some(execution_id),
                Err(e) => {
                    warn!("Request on {} not tracked: {}", topic, e);
                    None
                }
            }
        }
        InboundTopic::Accepted { execution_id } => {
            debug!("Response accepted for {}", execution_id);
            None
        }
        InboundTopic::Rejected { execution_id } => {
            warn!("Response rejected for {}", execution_id);
            None
        }
        InboundTopic::Event {
            command_id,
            event_type,
        } => {
            debug!("Execution event {} for command {}", event_type, command_id);
            None
        }
    }
}
