//! In-memory stand-ins for the broker, the edge session and the operator

#![allow(dead_code)]

use sparkplug_tck_edge_node::{
    ChannelError, ConsoleInput, ControlPublisher, EdgeNodeConfig, EdgeSession, Metric,
    Orchestrator, SessionError, SessionFactory, SessionSettings, SessionSlot,
};
use sparkplug_tck_protocol::ControlTopic;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Records everything published on the control channel
#[derive(Clone, Default)]
pub struct RecordingPublisher {
    sent: Arc<Mutex<Vec<(ControlTopic, String)>>>,
    disconnected: Arc<AtomicBool>,
}

impl RecordingPublisher {
    pub fn set_connected(&self, connected: bool) {
        self.disconnected.store(!connected, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<(ControlTopic, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn on(&self, topic: ControlTopic) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter(|(t, _)| *t == topic)
            .map(|(_, payload)| payload)
            .collect()
    }

    pub fn results(&self) -> Vec<String> {
        self.on(ControlTopic::Result)
    }

    pub fn logs(&self) -> Vec<String> {
        self.on(ControlTopic::Log)
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }
}

impl ControlPublisher for RecordingPublisher {
    fn try_publish(&self, topic: ControlTopic, payload: &str) -> Result<(), ChannelError> {
        if self.disconnected.load(Ordering::SeqCst) {
            return Err(ChannelError::NotConnected);
        }
        self.sent.lock().unwrap().push((topic, payload.to_string()));
        Ok(())
    }

    async fn publish(&self, topic: ControlTopic, payload: &str) -> Result<(), ChannelError> {
        self.try_publish(topic, payload)
    }
}

/// What happened to the fake sessions, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Created { group_id: String, edge_node_id: String, client_id: String },
    Connected(String),
    Birth { edge_node_id: String, metrics: Vec<String> },
    Disconnected(String),
}

#[derive(Default)]
pub struct FakeBehaviour {
    pub fail_create: bool,
    pub fail_connect: bool,
    pub fail_birth: bool,
}

#[derive(Clone, Default)]
pub struct FakeSessionFactory {
    events: Arc<Mutex<Vec<SessionEvent>>>,
    behaviour: Arc<Mutex<FakeBehaviour>>,
}

impl FakeSessionFactory {
    pub fn events(&self) -> Vec<SessionEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn created_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, SessionEvent::Created { .. }))
            .count()
    }

    pub fn behave(&self, f: impl FnOnce(&mut FakeBehaviour)) {
        f(&mut self.behaviour.lock().unwrap());
    }
}

pub struct FakeSession {
    edge_node_id: String,
    connected: bool,
    fail_connect: bool,
    fail_birth: bool,
    events: Arc<Mutex<Vec<SessionEvent>>>,
}

impl EdgeSession for FakeSession {
    async fn connect(&mut self) -> Result<(), SessionError> {
        if self.fail_connect {
            return Err(SessionError::Connect("connection refused".into()));
        }
        self.connected = true;
        self.events
            .lock()
            .unwrap()
            .push(SessionEvent::Connected(self.edge_node_id.clone()));
        Ok(())
    }

    async fn publish_birth(&mut self, metrics: &[Metric]) -> Result<(), SessionError> {
        if self.fail_birth {
            return Err(SessionError::Birth("not authorized".into()));
        }
        self.events.lock().unwrap().push(SessionEvent::Birth {
            edge_node_id: self.edge_node_id.clone(),
            metrics: metrics.iter().map(|m| m.name.clone()).collect(),
        });
        Ok(())
    }

    async fn disconnect(&mut self) {
        self.connected = false;
        self.events
            .lock()
            .unwrap()
            .push(SessionEvent::Disconnected(self.edge_node_id.clone()));
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

impl SessionFactory for FakeSessionFactory {
    type Session = FakeSession;

    fn create(&self, settings: SessionSettings) -> Result<FakeSession, SessionError> {
        let behaviour = self.behaviour.lock().unwrap();
        if behaviour.fail_create {
            return Err(SessionError::Settings("factory refused".into()));
        }
        self.events.lock().unwrap().push(SessionEvent::Created {
            group_id: settings.group_id.clone(),
            edge_node_id: settings.edge_node_id.clone(),
            client_id: settings.client_id.clone(),
        });
        Ok(FakeSession {
            edge_node_id: settings.edge_node_id,
            connected: false,
            fail_connect: behaviour.fail_connect,
            fail_birth: behaviour.fail_birth,
            events: self.events.clone(),
        })
    }
}

/// Answers console prompts from a fixed script
#[derive(Clone, Default)]
pub struct ScriptedConsole {
    replies: Arc<Mutex<VecDeque<String>>>,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl ScriptedConsole {
    pub fn with_replies(replies: &[&str]) -> Self {
        let console = Self::default();
        console
            .replies
            .lock()
            .unwrap()
            .extend(replies.iter().map(|r| r.to_string()));
        console
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

impl ConsoleInput for ScriptedConsole {
    async fn prompt(&self, message: &str) -> Option<String> {
        self.prompts.lock().unwrap().push(message.to_string());
        self.replies.lock().unwrap().pop_front()
    }
}

pub type TestOrchestrator = Orchestrator<RecordingPublisher, FakeSessionFactory, ScriptedConsole>;

pub struct Harness {
    pub orchestrator: TestOrchestrator,
    pub publisher: RecordingPublisher,
    pub factory: FakeSessionFactory,
    pub sessions: Arc<SessionSlot<FakeSessionFactory>>,
    pub console: ScriptedConsole,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_console(ScriptedConsole::default())
    }

    pub fn with_console(console: ScriptedConsole) -> Self {
        let publisher = RecordingPublisher::default();
        let factory = FakeSessionFactory::default();
        let sessions = Arc::new(SessionSlot::new(factory.clone()));
        let orchestrator = Orchestrator::new(
            EdgeNodeConfig::default(),
            publisher.clone(),
            sessions.clone(),
            console.clone(),
        );

        Self {
            orchestrator,
            publisher,
            factory,
            sessions,
            console,
        }
    }
}
