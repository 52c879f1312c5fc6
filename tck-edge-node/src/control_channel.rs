use log::{debug, error, info, trace, warn};
use rumqttc::{
    AsyncClient, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS, SubscribeFilter,
    SubscribeReasonCode,
};
use sparkplug_tck_protocol::ControlTopic;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Duration;

use crate::config::EdgeNodeConfig;
use crate::error::ChannelError;

/// Upper bound for a graceful disconnect
pub const DISCONNECT_TIMEOUT: Duration = Duration::from_millis(1000);

const KEEP_ALIVE: Duration = Duration::from_secs(60);
const REQUEST_CAPACITY: usize = 100;

/// Connection flags shared between the event loop task and publishers
#[derive(Debug, Default)]
pub struct ConnectionState {
    connected: AtomicBool,
    running: AtomicBool,
}

impl ConnectionState {
    /// Transport is connected to the broker
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Control topics are subscribed and the node accepts commands
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    pub fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::SeqCst);
    }
}

/// Inbound control message routed by topic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlMessage {
    pub topic: ControlTopic,
    pub payload: String,
}

impl ControlMessage {
    pub fn new(topic: ControlTopic, payload: impl Into<String>) -> Self {
        Self {
            topic,
            payload: payload.into(),
        }
    }

    /// Route a raw publish by exact topic match. Unknown topics yield `None`.
    pub fn route(topic: &str, payload: &[u8]) -> Option<Self> {
        let topic = ControlTopic::from_inbound_path(topic)?;
        Some(Self::new(topic, String::from_utf8_lossy(payload)))
    }
}

/// Publishing onto the control channel
pub trait ControlPublisher: Send + Sync {
    /// Enqueue without waiting. Fails when the request queue is full.
    fn try_publish(&self, topic: ControlTopic, payload: &str) -> Result<(), ChannelError>;

    /// Enqueue, waiting for room in the request queue
    fn publish(
        &self,
        topic: ControlTopic,
        payload: &str,
    ) -> impl Future<Output = Result<(), ChannelError>> + Send;
}

/// QoS a control topic is published or subscribed with
pub fn qos_for(topic: ControlTopic) -> QoS {
    if topic.at_least_once() {
        QoS::AtLeastOnce
    } else {
        QoS::AtMostOnce
    }
}

/// Cloneable publishing half of the control channel
#[derive(Clone)]
pub struct ControlHandle {
    client: AsyncClient,
    state: Arc<ConnectionState>,
}

impl ControlHandle {
    /// Enqueue a publish without waiting for the broker. Fails right away
    /// when the transport is down.
    pub fn publish_raw(&self, topic: &str, payload: &str, qos: QoS) -> Result<(), ChannelError> {
        if !self.state.is_connected() {
            return Err(ChannelError::NotConnected);
        }
        self.client.try_publish(topic, qos, false, payload)?;
        Ok(())
    }

    /// Enqueue a publish, waiting while the request queue is full. Still
    /// fails right away when the transport is down.
    pub async fn publish_queued(
        &self,
        topic: &str,
        payload: &str,
        qos: QoS,
    ) -> Result<(), ChannelError> {
        if !self.state.is_connected() {
            return Err(ChannelError::NotConnected);
        }
        self.client.publish(topic, qos, false, payload).await?;
        Ok(())
    }
}

impl ControlPublisher for ControlHandle {
    fn try_publish(&self, topic: ControlTopic, payload: &str) -> Result<(), ChannelError> {
        self.publish_raw(topic.path(), payload, qos_for(topic))
    }

    async fn publish(&self, topic: ControlTopic, payload: &str) -> Result<(), ChannelError> {
        self.publish_queued(topic.path(), payload, qos_for(topic)).await
    }
}

/// Subscribe to the inbound control topics after CONNACK. Never waits on the
/// request queue, since the caller is the task that drains it.
fn on_connack(state: &ConnectionState, client: &AsyncClient) {
    state.set_connected(true);
    state.set_running(false);
    info!("Connected to broker");

    let filters = ControlTopic::INBOUND
        .iter()
        .map(|topic| SubscribeFilter::new(topic.path().to_string(), qos_for(*topic)));
    if let Err(e) = client.try_subscribe_many(filters) {
        error!("Failed to subscribe: {}", e);
    }
}

/// The node accepts commands only once every control subscription is granted
fn on_suback(state: &ConnectionState, codes: &[SubscribeReasonCode]) -> bool {
    if codes
        .iter()
        .any(|code| matches!(code, SubscribeReasonCode::Failure))
    {
        error!("Subscribe failed: {:?}", codes);
        return false;
    }

    state.set_running(true);
    info!("Subscribed to TCK control topics");
    info!("TCK Edge Node ready, waiting for test commands from TCK Console...");
    true
}

/// The MQTT connection dedicated to TCK test control
pub struct ControlChannel {
    handle: ControlHandle,
    eventloop: Option<EventLoop>,
    driver: Option<JoinHandle<()>>,
}

impl ControlChannel {
    pub fn new(config: &EdgeNodeConfig) -> Result<Self, ChannelError> {
        let address = config.broker_address()?;

        let mut mqttoptions =
            MqttOptions::new(config.control_client_id(), address.host, address.port);
        mqttoptions.set_keep_alive(KEEP_ALIVE);
        mqttoptions.set_clean_session(true);
        if let Some((username, password)) = config.credentials() {
            mqttoptions.set_credentials(username, password);
        }

        let (client, eventloop) = AsyncClient::new(mqttoptions, REQUEST_CAPACITY);

        Ok(Self {
            handle: ControlHandle {
                client,
                state: Arc::new(ConnectionState::default()),
            },
            eventloop: Some(eventloop),
            driver: None,
        })
    }

    pub fn handle(&self) -> ControlHandle {
        self.handle.clone()
    }

    pub fn state(&self) -> Arc<ConnectionState> {
        self.handle.state.clone()
    }

    /// Start the connection handshake in the background. Returning `Ok` only
    /// means the request was accepted; connection and subscription outcomes
    /// are logged by the event loop task.
    pub fn connect(&mut self) -> Result<mpsc::UnboundedReceiver<ControlMessage>, ChannelError> {
        let eventloop = self.eventloop.take().ok_or(ChannelError::AlreadyStarted)?;
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();

        info!("Connecting control channel to broker...");
        self.driver = Some(tokio::spawn(drive_control_channel(
            eventloop,
            self.handle.clone(),
            inbound_tx,
        )));

        Ok(inbound_rx)
    }

    /// Best-effort, time-bounded disconnect. Does nothing when the channel
    /// was never started or is already torn down.
    pub async fn disconnect(&mut self) {
        let Some(mut driver) = self.driver.take() else {
            return;
        };
        let state = &self.handle.state;

        if state.is_connected() {
            match self.handle.client.try_disconnect() {
                Ok(()) => {
                    if tokio::time::timeout(DISCONNECT_TIMEOUT, &mut driver)
                        .await
                        .is_err()
                    {
                        warn!("Control channel did not disconnect in time, aborting");
                        driver.abort();
                    }
                }
                Err(e) => {
                    warn!("Failed to request disconnect: {}", e);
                    driver.abort();
                }
            }
        } else {
            driver.abort();
        }

        state.set_connected(false);
        state.set_running(false);
        info!("Control channel disconnected");
    }

    pub fn publish(&self, topic: &str, payload: &str, qos: QoS) -> Result<(), ChannelError> {
        self.handle.publish_raw(topic, payload, qos)
    }
}

/// Poll the event loop until the connection ends. Never reconnects; both
/// flags are cleared on the way out.
async fn drive_control_channel(
    mut eventloop: EventLoop,
    handle: ControlHandle,
    inbound: mpsc::UnboundedSender<ControlMessage>,
) {
    let state = handle.state.clone();

    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(_))) => on_connack(&state, &handle.client),
            Ok(Event::Incoming(Packet::SubAck(suback))) => {
                on_suback(&state, &suback.return_codes);
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                debug!(
                    "Received: {} -> {}",
                    publish.topic,
                    String::from_utf8_lossy(&publish.payload)
                );
                match ControlMessage::route(&publish.topic, &publish.payload) {
                    Some(message) => {
                        if inbound.send(message).is_err() {
                            warn!("Dispatch loop is gone, dropping control message");
                        }
                    }
                    None => trace!("Ignoring message on topic {}", publish.topic),
                }
            }
            Ok(Event::Incoming(Packet::Disconnect)) => {
                warn!("Broker closed the control connection");
                break;
            }
            Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                debug!("Disconnect sent");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                if state.is_connected() {
                    error!("Connection lost: {}", e);
                } else {
                    error!("Connection failed: {}", e);
                }
                break;
            }
        }
    }

    state.set_connected(false);
    state.set_running(false);
}
