//! Sparkplug TCK edge-node driver
//!
//! Connects to the broker on a dedicated control channel, listens on the
//! `SPARKPLUG_TCK/#` control topics and runs the edge profile scenarios the
//! TCK console asks for, reporting logs and verdicts back over the same
//! channel.

pub mod config;
pub mod console;
pub mod control_channel;
pub mod error;
pub mod node;
pub mod orchestrator;
pub mod reporter;
pub mod session;
pub mod sparkplug_session;

pub use crate::config::{BrokerAddress, EdgeNodeConfig};
pub use console::{ConsoleInput, StdinConsole};
pub use control_channel::{
    ConnectionState, ControlChannel, ControlHandle, ControlMessage, ControlPublisher,
};
pub use error::{ChannelError, ConfigError, NodeError, SessionError};
pub use node::TckEdgeNode;
pub use orchestrator::{Orchestrator, TestRun};
pub use reporter::Reporter;
pub use session::{EdgeSession, Metric, SessionFactory, SessionSettings, SessionSlot};
pub use sparkplug_session::{MqttEdgeSession, MqttSessionFactory};
