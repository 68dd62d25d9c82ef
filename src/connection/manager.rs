//! Connection manager owning the MQTT event loop

use crate::config::DeviceConfig;
use crate::transport::MqttPublisher;
use anyhow::{Context, Result};
use bytes::Bytes;
use rumqttc::{
    AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS, SubscribeFilter, TlsConfiguration,
    Transport,
};
use std::path::Path;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// Events emitted by the connection manager
#[derive(Debug, Clone)]
pub enum ConnectionEvent {
    /// Broker acknowledged the connection and subscriptions were requested
    Connected { subscriptions: usize },
    /// Polling failed; the client reconnects on the next poll
    Disconnected { reason: String },
    /// A message arrived on one of the subscribed topics
    Received { topic: String, payload: Bytes },
}

/// Manages the broker connection for one thing
pub struct ConnectionManager {
    client: AsyncClient,
    task: JoinHandle<()>,
}

impl ConnectionManager {
    /// Create a connection manager and start its event loop.
    ///
    /// Returns the manager and the receiver for its events.
    pub fn new(config: &DeviceConfig) -> Result<(Self, mpsc::Receiver<ConnectionEvent>)> {
        let options = mqtt_options(config)?;
        let (client, eventloop) = AsyncClient::new(options, 100);
        let (event_tx, event_rx) = mpsc::channel::<ConnectionEvent>(100);

        info!(
            "Connecting to {}:{} as {}",
            config.mqtt.host,
            config.mqtt.port,
            config.client_id()
        );

        let subscriptions = config.topics().subscriptions();
        let reconnect_delay = config.reconnect_delay();
        let client_clone = client.clone();
        let task = tokio::spawn(async move {
            connection_loop(eventloop, client_clone, subscriptions, reconnect_delay, event_tx)
                .await;
        });

        Ok((Self { client, task }, event_rx))
    }

    /// Publisher sharing this connection
    pub fn publisher(&self) -> MqttPublisher {
        MqttPublisher::new(self.client.clone())
    }

    /// Send DISCONNECT and stop the event loop
    pub async fn shutdown(self) {
        if let Err(e) = self.client.disconnect().await {
            debug!("Disconnect request failed: {}", e);
        }
        // Give the event loop a moment to flush the DISCONNECT
        tokio::time::sleep(Duration::from_millis(200)).await;
        self.task.abort();
    }
}

/// Build client options, loading certificates when TLS is configured
pub fn mqtt_options(config: &DeviceConfig) -> Result<MqttOptions> {
    let mut options = MqttOptions::new(config.client_id(), &config.mqtt.host, config.mqtt.port);
    options.set_keep_alive(config.keep_alive());

    if let Some(tls) = &config.tls {
        let ca = read_file(&tls.ca_file, "CA certificate")?;
        let cert = read_file(&tls.cert_file, "device certificate")?;
        let key = read_file(&tls.key_file, "private key")?;

        options.set_transport(Transport::Tls(TlsConfiguration::Simple {
            ca,
            alpn: None,
            client_auth: Some((cert, key)),
        }));
    }

    Ok(options)
}

fn read_file(path: &Path, what: &str) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("Failed to read {} {}", what, path.display()))
}

/// Queue one SUBSCRIBE for all topics from a separate task.
///
/// The request channel is drained by `EventLoop::poll`, so the loop itself
/// must never wait on it.
fn request_subscriptions(client: &AsyncClient, subscriptions: &[String]) -> JoinHandle<()> {
    let client = client.clone();
    let filters: Vec<SubscribeFilter> = subscriptions
        .iter()
        .map(|topic| SubscribeFilter::new(topic.clone(), QoS::AtLeastOnce))
        .collect();

    tokio::spawn(async move {
        let count = filters.len();
        match client.subscribe_many(filters).await {
            Ok(()) => debug!("Subscription request queued for {} topics", count),
            Err(e) => error!("Failed to subscribe: {}", e),
        }
    })
}

/// Main event loop: subscribe on every connect and forward publishes
async fn connection_loop(
    mut eventloop: EventLoop,
    client: AsyncClient,
    subscriptions: Vec<String>,
    reconnect_delay: Duration,
    event_tx: mpsc::Sender<ConnectionEvent>,
) {
    let mut pending_subscribe: Option<JoinHandle<()>> = None;

    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                if let Some(previous) = pending_subscribe.take() {
                    previous.abort();
                }
                pending_subscribe = Some(request_subscriptions(&client, &subscriptions));

                let event = ConnectionEvent::Connected {
                    subscriptions: subscriptions.len(),
                };
                if event_tx.send(event).await.is_err() {
                    break;
                }
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                let event = ConnectionEvent::Received {
                    topic: publish.topic,
                    payload: publish.payload,
                };
                if event_tx.send(event).await.is_err() {
                    break;
                }
            }
            Ok(Event::Incoming(Packet::SubAck(ack))) => {
                debug!("Subscription acknowledged: pkid={}", ack.pkid);
            }
            Ok(_) => {}
            Err(e) => {
                let event = ConnectionEvent::Disconnected {
                    reason: e.to_string(),
                };
                if event_tx.send(event).await.is_err() {
                    break;
                }
                tokio::time::sleep(reconnect_delay).await;
            }
        }
    }

    if let Some(task) = pending_subscribe {
        task.abort();
    }
    debug!("Connection loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TlsConfig;
    use std::path::PathBuf;

    fn config() -> DeviceConfig {
        DeviceConfig {
            thing_name: "dev-1".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_options_from_config() {
        let options = mqtt_options(&config()).unwrap();
        assert_eq!(options.client_id(), "dev-1");
        assert_eq!(options.broker_address(), ("localhost".to_string(), 1883));
        assert_eq!(options.keep_alive(), Duration::from_secs(30));
    }

    #[test]
    fn test_missing_certificate_is_reported() {
        let mut config = config();
        config.tls = Some(TlsConfig {
            ca_file: PathBuf::from("/nonexistent/ca.pem"),
            cert_file: PathBuf::from("/nonexistent/device.pem.crt"),
            key_file: PathBuf::from("/nonexistent/private.pem.key"),
        });

        let err = mqtt_options(&config).unwrap_err();
        assert!(err.to_string().contains("CA certificate"));
    }

    #[test]
    fn test_tls_files_are_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let write = |name: &str| {
            let path = dir.path().join(name);
            std::fs::write(&path, b"-----BEGIN CERTIFICATE-----").unwrap();
            path
        };

        let mut config = config();
        config.tls = Some(TlsConfig {
            ca_file: write("ca.pem"),
            cert_file: write("device.pem.crt"),
            key_file: write("private.pem.key"),
        });

        assert!(mqtt_options(&config).is_ok());
    }

    #[tokio::test]
    async fn test_subscribe_does_not_block_on_full_queue() {
        let options = MqttOptions::new("dev-1", "localhost", 1883);
        let (client, _eventloop) = AsyncClient::new(options, 1);

        // Fill the request queue; nothing polls the event loop here
        client
            .try_publish("t", QoS::AtLeastOnce, false, b"{}".to_vec())
            .unwrap();

        let topics = config().topics().subscriptions();
        let task = request_subscriptions(&client, &topics);

        // The caller got control back while the request is still waiting
        tokio::task::yield_now().await;
        assert!(!task.is_finished());

        task.abort();
        assert!(task.await.unwrap_err().is_cancelled());
    }
}
