//! Core TCK protocol types

use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Errors raised while interpreting a control message
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Empty control message")]
    Empty,
    #[error("Invalid NEW_TEST command format: {0}")]
    MalformedNewTest(String),
    #[error("Missing argument: {0}")]
    MissingArgument(&'static str),
    #[error("Invalid numeric value for {key}: {value:?}")]
    InvalidNumber { key: &'static str, value: String },
}

/// Verdict published on the result topic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Verdict {
    Pass,
    Fail,
    NotExecuted,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Pass => "PASS",
            Verdict::Fail => "FAIL",
            Verdict::NotExecuted => "NOT EXECUTED",
        }
    }

    /// Payload sent to the TCK console, e.g. `OVERALL: PASS`
    pub fn payload(&self) -> String {
        format!("OVERALL: {}", self.as_str())
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity of a line published on the log topic
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }

    /// Format a log line the way the console expects it: `[LEVEL] message`
    pub fn format_line(&self, message: &str) -> String {
        format!("[{}] {}", self.as_str(), message)
    }
}

/// TCK profile named in a `NEW_TEST` command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Profile {
    Edge,
    Host,
    Broker,
    Other(String),
}

impl Profile {
    pub fn parse(s: &str) -> Profile {
        match s {
            crate::EDGE_PROFILE => Profile::Edge,
            "host" => Profile::Host,
            "broker" => Profile::Broker,
            other => Profile::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Profile::Edge => crate::EDGE_PROFILE,
            Profile::Host => "host",
            Profile::Broker => "broker",
            Profile::Other(s) => s,
        }
    }
}

/// Edge profile scenarios known to the TCK
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scenario {
    SessionEstablishment,
    SessionTermination,
    SendData,
    SendComplexData,
    ReceiveCommand,
    PrimaryHost,
    MultipleBroker,
    Unknown(String),
}

impl Scenario {
    /// Get all known scenarios
    pub fn all() -> Vec<Scenario> {
        vec![
            Scenario::SessionEstablishment,
            Scenario::SessionTermination,
            Scenario::SendData,
            Scenario::SendComplexData,
            Scenario::ReceiveCommand,
            Scenario::PrimaryHost,
            Scenario::MultipleBroker,
        ]
    }

    /// Name used by the TCK console
    pub fn name(&self) -> &str {
        match self {
            Scenario::SessionEstablishment => "SessionEstablishmentTest",
            Scenario::SessionTermination => "SessionTerminationTest",
            Scenario::SendData => "SendDataTest",
            Scenario::SendComplexData => "SendComplexDataTest",
            Scenario::ReceiveCommand => "ReceiveCommandTest",
            Scenario::PrimaryHost => "PrimaryHostTest",
            Scenario::MultipleBroker => "MultipleBrokerTest",
            Scenario::Unknown(name) => name,
        }
    }

    /// Parse from the console name. Unrecognized names are kept verbatim.
    pub fn parse(s: &str) -> Scenario {
        Self::all()
            .into_iter()
            .find(|scenario| scenario.name() == s)
            .unwrap_or_else(|| Scenario::Unknown(s.to_string()))
    }

    /// Session-style scenarios stay running until the console ends them
    pub fn awaits_end_test(&self) -> bool {
        matches!(self, Scenario::SessionEstablishment)
    }
}

impl std::fmt::Display for Scenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// State of the current test run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TestState {
    #[default]
    Idle,
    Running,
    Completed,
    Failed,
}

impl TestState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TestState::Idle => "IDLE",
            TestState::Running => "RUNNING",
            TestState::Completed => "COMPLETED",
            TestState::Failed => "FAILED",
        }
    }
}
