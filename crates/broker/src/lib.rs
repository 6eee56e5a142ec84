//! MQTT broker client
//!
//! Thin wrapper over `rumqttc` that owns the client/event-loop pair and
//! maps the wire-level event stream down to the three events the
//! pipeline cares about: connected, message, disconnected.
//!
//! The event loop must be pumped continuously (network I/O, keepalive,
//! QoS handshakes all happen inside [`BrokerClient::poll`]); the broker
//! worker is the only caller. Subscriptions and publishes go through a
//! cheaply cloneable [`ClientHandle`].

use roost_config::BrokerConfig;
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS};
use thiserror::Error;

/// Capacity of the rumqttc request queue between handle and event loop.
const REQUEST_QUEUE_CAPACITY: usize = 10;

/// Errors from the broker client
#[derive(Debug, Error)]
pub enum BrokerError {
    /// QoS outside 0-2
    #[error("invalid QoS level {0}")]
    InvalidQos(u8),

    /// Request could not be queued (event loop gone or queue full)
    #[error("client error: {0}")]
    Client(#[from] rumqttc::ClientError),

    /// Network-level failure surfaced by the event loop
    #[error("connection error: {0}")]
    Connection(#[from] rumqttc::ConnectionError),
}

/// What the event loop produced, reduced to pipeline-relevant events.
#[derive(Debug)]
pub enum BrokerEvent {
    /// CONNACK received; (re)subscriptions should be issued now.
    Connected,

    /// An application message arrived on a subscribed topic.
    Message { topic: String, payload: Vec<u8> },

    /// The broker closed the session cleanly.
    Disconnected,
}

/// Owned client + event loop pair.
///
/// Constructing the client performs no network I/O; the connection is
/// established lazily by the first [`poll`](Self::poll).
pub struct BrokerClient {
    handle: ClientHandle,
    event_loop: EventLoop,
}

impl BrokerClient {
    /// Build a client from the broker configuration.
    pub fn new(config: &BrokerConfig) -> Self {
        let mut options = MqttOptions::new(&config.client_id, &config.host, config.port);
        options.set_keep_alive(config.keepalive);

        if config.has_credentials() {
            options.set_credentials(&config.username, &config.password);
        }

        let (client, event_loop) = AsyncClient::new(options, REQUEST_QUEUE_CAPACITY);

        Self {
            handle: ClientHandle { client },
            event_loop,
        }
    }

    /// A handle for subscribe/unsubscribe/disconnect requests.
    pub fn handle(&self) -> ClientHandle {
        self.handle.clone()
    }

    /// Pump the event loop once.
    ///
    /// Returns `Ok(Some(event))` for pipeline-relevant events,
    /// `Ok(None)` for protocol chatter (acks, pings, outgoing), and
    /// `Err` when the connection failed; the next `poll` after an error
    /// starts a fresh connection attempt.
    pub async fn poll(&mut self) -> Result<Option<BrokerEvent>, BrokerError> {
        let event = self.event_loop.poll().await?;
        Ok(map_event(event))
    }
}

/// Cloneable request surface of a [`BrokerClient`].
#[derive(Clone)]
pub struct ClientHandle {
    client: AsyncClient,
}

impl ClientHandle {
    /// Subscribe to a topic filter with the given QoS (0-2).
    pub async fn subscribe(&self, topic: &str, qos: u8) -> Result<(), BrokerError> {
        self.client.subscribe(topic, qos_from_u8(qos)?).await?;
        Ok(())
    }

    /// Unsubscribe from a topic filter.
    pub async fn unsubscribe(&self, topic: &str) -> Result<(), BrokerError> {
        self.client.unsubscribe(topic).await?;
        Ok(())
    }

    /// Request a clean disconnect.
    pub async fn disconnect(&self) -> Result<(), BrokerError> {
        self.client.disconnect().await?;
        Ok(())
    }
}

/// Map a QoS byte from config onto the protocol enum.
pub fn qos_from_u8(qos: u8) -> Result<QoS, BrokerError> {
    match qos {
        0 => Ok(QoS::AtMostOnce),
        1 => Ok(QoS::AtLeastOnce),
        2 => Ok(QoS::ExactlyOnce),
        other => Err(BrokerError::InvalidQos(other)),
    }
}

fn map_event(event: Event) -> Option<BrokerEvent> {
    match event {
        Event::Incoming(Packet::ConnAck(ack)) => {
            tracing::debug!(session_present = ack.session_present, "broker connected");
            Some(BrokerEvent::Connected)
        }
        Event::Incoming(Packet::Publish(publish)) => Some(BrokerEvent::Message {
            topic: publish.topic,
            payload: publish.payload.to_vec(),
        }),
        Event::Incoming(Packet::Disconnect) => Some(BrokerEvent::Disconnected),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rumqttc::{ConnAck, ConnectReturnCode, Publish};

    #[test]
    fn test_qos_mapping() {
        assert_eq!(qos_from_u8(0).unwrap(), QoS::AtMostOnce);
        assert_eq!(qos_from_u8(1).unwrap(), QoS::AtLeastOnce);
        assert_eq!(qos_from_u8(2).unwrap(), QoS::ExactlyOnce);
        assert!(matches!(qos_from_u8(3), Err(BrokerError::InvalidQos(3))));
    }

    #[test]
    fn test_map_publish_to_message() {
        let publish = Publish::new("sensors/a", QoS::AtMostOnce, r#"{"v":1}"#);
        let event = map_event(Event::Incoming(Packet::Publish(publish)));

        match event {
            Some(BrokerEvent::Message { topic, payload }) => {
                assert_eq!(topic, "sensors/a");
                assert_eq!(payload, br#"{"v":1}"#);
            }
            other => panic!("expected Message, got {:?}", other),
        }
    }

    #[test]
    fn test_map_connack_to_connected() {
        let ack = ConnAck {
            session_present: false,
            code: ConnectReturnCode::Success,
        };
        let event = map_event(Event::Incoming(Packet::ConnAck(ack)));
        assert!(matches!(event, Some(BrokerEvent::Connected)));
    }

    #[test]
    fn test_protocol_chatter_filtered() {
        assert!(map_event(Event::Incoming(Packet::PingResp)).is_none());
        assert!(map_event(Event::Outgoing(rumqttc::Outgoing::PingReq)).is_none());
    }

    #[tokio::test]
    async fn test_client_construction_is_offline() {
        // Construction must not touch the network.
        let config = BrokerConfig::default();
        let client = BrokerClient::new(&config);
        let _handle = client.handle();
    }
}
