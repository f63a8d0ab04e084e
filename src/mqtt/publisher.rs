//! Broker publish capability and its rumqttc implementation.

use crate::config::MqttConfig;
use async_trait::async_trait;
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// The one thing the bridge needs from the broker side.
///
/// A call is a single best-effort attempt: `true` means the message was
/// accepted for delivery, `false` that it was not. No retries are
/// performed here or expected from implementations. Implementations must
/// be safe to share across concurrent requests.
#[async_trait]
pub trait Publish: Send + Sync {
    async fn publish(&self, topic: &str, payload: &[u8]) -> bool;
}

/// rumqttc-backed publisher.
///
/// The underlying `AsyncClient` serializes access to the broker session
/// internally, so one publisher handle is shared by all requests.
pub struct MqttPublisher {
    client: AsyncClient,
    qos: QoS,
}

impl MqttPublisher {
    /// Set up the broker session and spawn the driving event loop.
    ///
    /// The connection itself is established lazily by the event loop;
    /// publishes enqueued before the broker is reachable are buffered by
    /// rumqttc up to its channel capacity.
    pub fn connect(config: &MqttConfig) -> Self {
        let mut options =
            MqttOptions::new(config.client_id.clone(), config.host.clone(), config.port);
        options.set_keep_alive(Duration::from_secs(config.keep_alive_secs));
        if !config.username.is_empty() {
            options.set_credentials(config.username.as_str(), config.password.as_str());
        }

        let (client, mut eventloop) = AsyncClient::new(options, 10);

        tokio::spawn(async move {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        info!("connected to MQTT broker");
                    }
                    Ok(event) => {
                        debug!(event = ?event, "MQTT event");
                    }
                    Err(e) => {
                        warn!(error = %e, "MQTT connection error, retrying");
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
            }
        });

        Self {
            client,
            qos: qos_level(config.qos),
        }
    }
}

#[async_trait]
impl Publish for MqttPublisher {
    async fn publish(&self, topic: &str, payload: &[u8]) -> bool {
        match self
            .client
            .publish(topic, self.qos, false, payload.to_vec())
            .await
        {
            Ok(()) => true,
            Err(e) => {
                error!(topic = %topic, error = %e, "failed to hand message to MQTT client");
                false
            }
        }
    }
}

fn qos_level(level: u8) -> QoS {
    match level {
        2 => QoS::ExactlyOnce,
        1 => QoS::AtLeastOnce,
        _ => QoS::AtMostOnce,
    }
}
