//! Ownership of the edge session under test
//!
//! The device-protocol session itself is an external collaborator reached
//! through [`EdgeSession`] and [`SessionFactory`]. [`SessionSlot`] makes sure
//! at most one session exists at a time.

use log::{info, warn};
use std::future::Future;
use tokio::sync::Mutex;

use crate::config::EdgeNodeConfig;
use crate::error::SessionError;

/// A metric declared in a birth certificate
#[derive(Debug, Clone, PartialEq)]
pub struct Metric {
    pub name: String,
    pub alias: u64,
    pub value: f64,
}

impl Metric {
    pub fn new(name: impl Into<String>, alias: u64, value: f64) -> Self {
        Self {
            name: name.into(),
            alias,
            value,
        }
    }
}

/// Metrics announced when a scenario brings a session up
pub fn birth_metrics() -> Vec<Metric> {
    vec![Metric::new("TestMetric", 1, 42.0)]
}

/// Everything needed to build one edge session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    pub broker_url: String,
    pub client_id: String,
    pub group_id: String,
    pub edge_node_id: String,
    pub namespace_prefix: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl SessionSettings {
    /// Settings for an edge node, reusing the control channel's broker and
    /// credentials
    pub fn for_edge_node(config: &EdgeNodeConfig, group_id: &str, edge_node_id: &str) -> Self {
        let (username, password) = match config.credentials() {
            Some((user, pass)) => (Some(user.to_string()), Some(pass.to_string())),
            None => (None, None),
        };

        Self {
            broker_url: config.broker_url.clone(),
            client_id: format!("{}_client", edge_node_id),
            group_id: group_id.to_string(),
            edge_node_id: edge_node_id.to_string(),
            namespace_prefix: config.namespace_prefix.clone(),
            username,
            password,
        }
    }
}

/// Device-protocol session driven by the scenarios
pub trait EdgeSession: Send {
    fn connect(&mut self) -> impl Future<Output = Result<(), SessionError>> + Send;

    fn publish_birth(
        &mut self,
        metrics: &[Metric],
    ) -> impl Future<Output = Result<(), SessionError>> + Send;

    /// Safe to call on a session that never connected
    fn disconnect(&mut self) -> impl Future<Output = ()> + Send;

    fn is_connected(&self) -> bool;
}

pub trait SessionFactory: Send + Sync + 'static {
    type Session: EdgeSession + 'static;

    fn create(&self, settings: SessionSettings) -> Result<Self::Session, SessionError>;
}

/// Holds at most one edge session
pub struct SessionSlot<F: SessionFactory> {
    factory: F,
    session: Mutex<Option<F::Session>>,
}

impl<F: SessionFactory> SessionSlot<F> {
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            session: Mutex::new(None),
        }
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// Build, connect and announce a new session. Fails without touching the
    /// current session if one already exists. A session that fails to connect
    /// or announce is torn down and dropped.
    pub async fn create(
        &self,
        settings: SessionSettings,
        metrics: &[Metric],
    ) -> Result<(), SessionError> {
        let mut slot = self.session.lock().await;
        if slot.is_some() {
            return Err(SessionError::AlreadyExists);
        }

        let mut session = self.factory.create(settings)?;

        info!("Connecting Edge Node to broker");
        if let Err(e) = session.connect().await {
            session.disconnect().await;
            return Err(e);
        }

        info!("Publishing NBIRTH");
        if let Err(e) = session.publish_birth(metrics).await {
            session.disconnect().await;
            return Err(e);
        }

        info!("Edge Node created and NBIRTH published");
        *slot = Some(session);
        Ok(())
    }

    /// Disconnect and drop the session. Returns whether one existed.
    pub async fn release(&self) -> bool {
        let mut slot = self.session.lock().await;
        let Some(mut session) = slot.take() else {
            return false;
        };

        if session.is_connected() {
            session.disconnect().await;
        } else {
            warn!("Releasing an Edge Node that is no longer connected");
        }
        true
    }

    pub async fn is_active(&self) -> bool {
        self.session.lock().await.is_some()
    }
}
