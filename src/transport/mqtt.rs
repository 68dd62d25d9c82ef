//! MQTT publisher backed by a rumqttc client handle

use crate::transport::traits::Publisher;
use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use rumqttc::{AsyncClient, QoS};

/// Publishes through the client owned by the connection manager.
///
/// The client only queues the request; the connection manager's event loop
/// writes it to the broker.
#[derive(Clone)]
pub struct MqttPublisher {
    client: AsyncClient,
    qos: QoS,
}

impl MqttPublisher {
    pub fn new(client: AsyncClient) -> Self {
        Self {
            client,
            qos: QoS::AtLeastOnce,
        }
    }
}

#[async_trait]
impl Publisher for MqttPublisher {
    /// `Ok` means the PUBLISH was queued on the client, not that the broker
    /// has it. The only error is a closed request channel, i.e. the event
    /// loop is gone. Later delivery problems are reported by the connection
    /// loop as `Disconnected`.
    async fn publish(&self, topic: &str, payload: Bytes) -> Result<()> {
        self.client
            .publish_bytes(topic, self.qos, false, payload)
            .await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "MQTT"
    }
}
