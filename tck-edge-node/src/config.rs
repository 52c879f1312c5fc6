use config::{Config, Environment, File};
use serde::Deserialize;
use sparkplug_tck_protocol::protocol::{
    DEFAULT_BROKER_URL, DEFAULT_CLIENT_ID_PREFIX, DEFAULT_EDGE_NODE_ID, DEFAULT_GROUP_ID,
    DEFAULT_MQTT_PORT, DEFAULT_UTC_WINDOW_MS,
};
use sparkplug_tck_protocol::NAMESPACE_PREFIX;
use std::path::Path;

use crate::error::{ChannelError, ConfigError};

/// Environment variable prefix, e.g. `TCK_BROKER_URL`
pub const ENV_PREFIX: &str = "TCK";

/// Configuration for the TCK edge node
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EdgeNodeConfig {
    pub broker_url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub client_id_prefix: String,
    pub group_id: String,
    pub edge_node_id: String,
    pub namespace_prefix: String,
    /// Tolerance for timestamp checks, updated by the console at runtime
    pub utc_window_ms: u64,
}

impl Default for EdgeNodeConfig {
    fn default() -> Self {
        Self {
            broker_url: DEFAULT_BROKER_URL.to_string(),
            username: None,
            password: None,
            client_id_prefix: DEFAULT_CLIENT_ID_PREFIX.to_string(),
            group_id: DEFAULT_GROUP_ID.to_string(),
            edge_node_id: DEFAULT_EDGE_NODE_ID.to_string(),
            namespace_prefix: NAMESPACE_PREFIX.to_string(),
            utc_window_ms: DEFAULT_UTC_WINDOW_MS,
        }
    }
}

impl EdgeNodeConfig {
    /// Load configuration from an optional file plus `TCK_*` environment
    /// variables, falling back to defaults for anything unset
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }
        let settings = builder
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?;
        Ok(settings.try_deserialize()?)
    }

    /// Client id of the control connection
    pub fn control_client_id(&self) -> String {
        format!("{}_control", self.client_id_prefix)
    }

    /// Username and password, only when a non-empty username is configured
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match self.username.as_deref() {
            Some(user) if !user.is_empty() => {
                Some((user, self.password.as_deref().unwrap_or_default()))
            }
            _ => None,
        }
    }

    pub fn broker_address(&self) -> Result<BrokerAddress, ChannelError> {
        BrokerAddress::parse(&self.broker_url)
    }
}

/// Host and port extracted from a broker URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerAddress {
    pub host: String,
    pub port: u16,
}

impl BrokerAddress {
    /// Accepts `tcp://host:port`, `mqtt://host:port`, `host:port` or `host`
    pub fn parse(url: &str) -> Result<Self, ChannelError> {
        let invalid = || ChannelError::InvalidBrokerUrl(url.to_string());

        let rest = match url.split_once("://") {
            Some(("tcp" | "mqtt", rest)) => rest,
            Some(_) => return Err(invalid()),
            None => url,
        };
        let rest = rest.trim_end_matches('/');

        let (host, port) = match rest.rsplit_once(':') {
            Some((host, port)) => (host, port.parse::<u16>().map_err(|_| invalid())?),
            None => (rest, DEFAULT_MQTT_PORT),
        };
        if host.is_empty() || host.contains('/') {
            return Err(invalid());
        }

        Ok(Self {
            host: host.to_string(),
            port,
        })
    }
}

impl std::fmt::Display for BrokerAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}
