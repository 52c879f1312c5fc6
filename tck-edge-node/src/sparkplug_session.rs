//! Minimal MQTT edge session used by the `tck-edge-node` binary
//!
//! Publishes NBIRTH after connecting, registers NDEATH as the last will and
//! publishes it again on a clean disconnect. Payloads are JSON encoded with
//! serde; this is not the Sparkplug B protobuf encoding.

use log::{debug, error, info, warn};
use rumqttc::{AsyncClient, Event, LastWill, MqttOptions, Outgoing, Packet, QoS};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{timeout, Duration};

use crate::config::BrokerAddress;
use crate::error::SessionError;
use crate::session::{EdgeSession, Metric, SessionFactory, SessionSettings};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const DISCONNECT_TIMEOUT: Duration = Duration::from_millis(1000);
const KEEP_ALIVE: Duration = Duration::from_secs(30);

/// bdSeq runs 0..=255 and wraps
const BD_SEQ_MODULUS: u64 = 256;

/// Sparkplug message types published by an edge node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeMessageType {
    Birth,
    Death,
}

impl NodeMessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeMessageType::Birth => "NBIRTH",
            NodeMessageType::Death => "NDEATH",
        }
    }
}

/// `<namespace>/<group>/<type>/<edge node>`
pub fn node_topic(settings: &SessionSettings, message_type: NodeMessageType) -> String {
    format!(
        "{}/{}/{}/{}",
        settings.namespace_prefix,
        settings.group_id,
        message_type.as_str(),
        settings.edge_node_id
    )
}

#[derive(Serialize, Debug)]
struct PayloadMetric {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    alias: Option<u64>,
    value: f64,
}

#[derive(Serialize, Debug)]
struct NodePayload {
    timestamp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    seq: Option<u8>,
    metrics: Vec<PayloadMetric>,
}

fn bd_seq_metric(bd_seq: u64) -> PayloadMetric {
    PayloadMetric {
        name: "bdSeq".to_string(),
        alias: None,
        value: bd_seq as f64,
    }
}

/// NBIRTH payload: bdSeq followed by the declared metrics, sequence 0
pub fn birth_payload(bd_seq: u64, metrics: &[Metric]) -> Result<String, serde_json::Error> {
    let payload = NodePayload {
        timestamp: chrono::Utc::now().timestamp_millis(),
        seq: Some(0),
        metrics: std::iter::once(bd_seq_metric(bd_seq))
            .chain(metrics.iter().map(|metric| PayloadMetric {
                name: metric.name.clone(),
                alias: Some(metric.alias),
                value: metric.value,
            }))
            .collect(),
    };
    serde_json::to_string(&payload)
}

/// NDEATH payload: only the bdSeq, no sequence number
pub fn death_payload(bd_seq: u64) -> Result<String, serde_json::Error> {
    let payload = NodePayload {
        timestamp: chrono::Utc::now().timestamp_millis(),
        seq: None,
        metrics: vec![bd_seq_metric(bd_seq)],
    };
    serde_json::to_string(&payload)
}

/// Builds [`MqttEdgeSession`]s, handing each one the next bdSeq
#[derive(Debug, Default)]
pub struct MqttSessionFactory {
    next_bd_seq: AtomicU64,
}

impl MqttSessionFactory {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_bd_seq(&self) -> u64 {
        self.next_bd_seq.fetch_add(1, Ordering::SeqCst) % BD_SEQ_MODULUS
    }
}

impl SessionFactory for MqttSessionFactory {
    type Session = MqttEdgeSession;

    fn create(&self, settings: SessionSettings) -> Result<MqttEdgeSession, SessionError> {
        MqttEdgeSession::new(settings, self.next_bd_seq())
    }
}

/// Edge node session over its own MQTT connection
pub struct MqttEdgeSession {
    settings: SessionSettings,
    options: MqttOptions,
    bd_seq: u64,
    client: Option<AsyncClient>,
    driver: Option<JoinHandle<()>>,
    connected: Arc<AtomicBool>,
}

impl MqttEdgeSession {
    /// `bd_seq` goes into the registered NDEATH and every NBIRTH of this session
    pub fn new(settings: SessionSettings, bd_seq: u64) -> Result<Self, SessionError> {
        let address = BrokerAddress::parse(&settings.broker_url)
            .map_err(|e| SessionError::Settings(e.to_string()))?;
        if settings.group_id.is_empty() || settings.edge_node_id.is_empty() {
            return Err(SessionError::Settings(
                "group_id and edge_node_id are required".to_string(),
            ));
        }

        let will_payload =
            death_payload(bd_seq).map_err(|e| SessionError::Settings(e.to_string()))?;

        let mut options = MqttOptions::new(&settings.client_id, address.host, address.port);
        options.set_keep_alive(KEEP_ALIVE);
        options.set_clean_session(true);
        options.set_last_will(LastWill::new(
            node_topic(&settings, NodeMessageType::Death),
            will_payload,
            QoS::AtLeastOnce,
            false,
        ));
        if let Some(username) = settings.username.as_deref() {
            options.set_credentials(username, settings.password.as_deref().unwrap_or_default());
        }

        Ok(Self {
            settings,
            options,
            bd_seq,
            client: None,
            driver: None,
            connected: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn bd_seq(&self) -> u64 {
        self.bd_seq
    }
}

impl EdgeSession for MqttEdgeSession {
    async fn connect(&mut self) -> Result<(), SessionError> {
        if self.client.is_some() {
            return Err(SessionError::Connect("already connected".to_string()));
        }

        let (client, mut eventloop) = AsyncClient::new(self.options.clone(), 10);

        let handshake = async {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(Packet::ConnAck(_))) => return Ok(()),
                    Ok(_) => {}
                    Err(e) => return Err(e),
                }
            }
        };
        match timeout(CONNECT_TIMEOUT, handshake).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(SessionError::Connect(e.to_string())),
            Err(_) => {
                return Err(SessionError::Connect(
                    "timed out waiting for CONNACK".to_string(),
                ))
            }
        }

        info!(
            "Edge Node {}/{} connected",
            self.settings.group_id, self.settings.edge_node_id
        );
        self.connected.store(true, Ordering::SeqCst);

        let connected = self.connected.clone();
        self.driver = Some(tokio::spawn(async move {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Outgoing(Outgoing::Disconnect)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        error!("Edge Node connection lost: {}", e);
                        break;
                    }
                }
            }
            connected.store(false, Ordering::SeqCst);
        }));
        self.client = Some(client);
        Ok(())
    }

    async fn publish_birth(&mut self, metrics: &[Metric]) -> Result<(), SessionError> {
        let client = match &self.client {
            Some(client) if self.is_connected() => client,
            _ => return Err(SessionError::Birth("not connected".to_string())),
        };

        let topic = node_topic(&self.settings, NodeMessageType::Birth);
        let payload =
            birth_payload(self.bd_seq, metrics).map_err(|e| SessionError::Birth(e.to_string()))?;

        client
            .publish(&topic, QoS::AtMostOnce, false, payload)
            .await
            .map_err(|e| SessionError::Birth(e.to_string()))?;
        debug!("Published {}", topic);
        Ok(())
    }

    async fn disconnect(&mut self) {
        let Some(client) = self.client.take() else {
            return;
        };
        let Some(mut driver) = self.driver.take() else {
            return;
        };

        if self.is_connected() {
            let topic = node_topic(&self.settings, NodeMessageType::Death);
            match death_payload(self.bd_seq) {
                Ok(payload) => {
                    if let Err(e) = client.try_publish(&topic, QoS::AtLeastOnce, false, payload) {
                        warn!("Failed to publish NDEATH: {}", e);
                    }
                }
                Err(e) => warn!("Failed to encode NDEATH: {}", e),
            }

            if client.try_disconnect().is_ok()
                && timeout(DISCONNECT_TIMEOUT, &mut driver).await.is_ok()
            {
                self.connected.store(false, Ordering::SeqCst);
                info!("Edge Node disconnected");
                return;
            }
        }

        driver.abort();
        self.connected.store(false, Ordering::SeqCst);
        info!("Edge Node disconnected");
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EdgeNodeConfig;
    use crate::session::birth_metrics;

    fn settings() -> SessionSettings {
        SessionSettings::for_edge_node(&EdgeNodeConfig::default(), "G1", "E1")
    }

    #[test]
    fn test_node_topics() {
        let settings = settings();
        assert_eq!(node_topic(&settings, NodeMessageType::Birth), "spBv1.0/G1/NBIRTH/E1");
        assert_eq!(node_topic(&settings, NodeMessageType::Death), "spBv1.0/G1/NDEATH/E1");
    }

    #[test]
    fn test_birth_payload_carries_bd_seq_and_metrics() {
        let json = birth_payload(3, &birth_metrics()).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed["seq"], 0);
        assert!(parsed["timestamp"].as_i64().unwrap() > 0);
        assert_eq!(parsed["metrics"][0]["name"], "bdSeq");
        assert_eq!(parsed["metrics"][0]["value"], 3.0);
        assert!(parsed["metrics"][0].get("alias").is_none());
        assert_eq!(parsed["metrics"][1]["name"], "TestMetric");
        assert_eq!(parsed["metrics"][1]["alias"], 1);
        assert_eq!(parsed["metrics"][1]["value"], 42.0);
    }

    #[test]
    fn test_death_payload_has_no_seq() {
        let json = death_payload(0).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(parsed.get("seq").is_none());
        assert_eq!(parsed["metrics"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_new_rejects_bad_settings() {
        let mut bad_url = settings();
        bad_url.broker_url = "ws://broker".into();
        assert!(matches!(
            MqttEdgeSession::new(bad_url, 0),
            Err(SessionError::Settings(_))
        ));

        let mut no_edge = settings();
        no_edge.edge_node_id.clear();
        assert!(matches!(
            MqttEdgeSession::new(no_edge, 0),
            Err(SessionError::Settings(_))
        ));
    }

    #[test]
    fn test_factory_advances_bd_seq() {
        let factory = MqttSessionFactory::new();
        let first = factory.create(settings()).unwrap();
        let second = factory.create(settings()).unwrap();
        assert_eq!(first.bd_seq(), 0);
        assert_eq!(second.bd_seq(), 1);
    }

    #[test]
    fn test_bd_seq_wraps_after_255() {
        let factory = MqttSessionFactory {
            next_bd_seq: AtomicU64::new(255),
        };
        assert_eq!(factory.create(settings()).unwrap().bd_seq(), 255);
        assert_eq!(factory.create(settings()).unwrap().bd_seq(), 0);
    }

    #[tokio::test]
    async fn test_birth_before_connect_fails() {
        let mut session = MqttSessionFactory::new().create(settings()).unwrap();
        assert!(!session.is_connected());
        let err = session.publish_birth(&birth_metrics()).await;
        assert!(matches!(err, Err(SessionError::Birth(_))));

        // Disconnecting a session that never connected is a no-op
        session.disconnect().await;
        assert!(!session.is_connected());
    }

    #[tokio::test]
    async fn test_connect_to_closed_port_fails() {
        let mut settings = settings();
        settings.broker_url = "tcp://127.0.0.1:1".into();
        let mut session = MqttEdgeSession::new(settings, 0).unwrap();

        let err = session.connect().await;
        assert!(matches!(err, Err(SessionError::Connect(_))));
        assert!(!session.is_connected());
    }
}
