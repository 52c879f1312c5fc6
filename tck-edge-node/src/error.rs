use thiserror::Error;

/// Control-channel transport errors. Logged, never fatal.
#[derive(Error, Debug)]
pub enum ChannelError {
    #[error("Not connected")]
    NotConnected,
    #[error("Control channel already started")]
    AlreadyStarted,
    #[error("Invalid broker URL: {0}")]
    InvalidBrokerUrl(String),
    #[error("MQTT client error: {0}")]
    Client(#[from] rumqttc::ClientError),
}

/// Errors creating or driving the edge session under test.
/// Reported to the console as a FAIL verdict.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Edge Node already exists")]
    AlreadyExists,
    #[error("Invalid session settings: {0}")]
    Settings(String),
    #[error("Failed to connect: {0}")]
    Connect(String),
    #[error("Failed to publish NBIRTH: {0}")]
    Birth(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
}

#[derive(Error, Debug)]
pub enum NodeError {
    #[error(transparent)]
    Channel(#[from] ChannelError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}
