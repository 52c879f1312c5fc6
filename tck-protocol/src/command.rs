//! Typed control commands
//!
//! Each inbound topic carries its own small command language. Messages are
//! parsed once into these variants so handlers never index raw tokens.

use crate::parser::tokenize;
use crate::protocol::keywords;
use crate::types::{Profile, ProtocolError, Scenario};

/// Commands on the test-control topic
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestControl {
    /// `NEW_TEST <profile> <scenario> [args...]`
    NewTest {
        profile: Profile,
        scenario: Scenario,
        args: Vec<String>,
    },
    /// `END_TEST`
    EndTest,
    /// Any other leading word
    Other(String),
}

impl TestControl {
    pub fn parse(message: &str) -> Result<TestControl, ProtocolError> {
        let mut tokens = tokenize(message).into_iter();
        let command = tokens.next().ok_or(ProtocolError::Empty)?;

        match command.as_str() {
            keywords::NEW_TEST => {
                let (Some(profile), Some(scenario)) = (tokens.next(), tokens.next()) else {
                    return Err(ProtocolError::MalformedNewTest(message.trim().to_string()));
                };
                Ok(TestControl::NewTest {
                    profile: Profile::parse(&profile),
                    scenario: Scenario::parse(&scenario),
                    args: tokens.collect(),
                })
            }
            keywords::END_TEST => Ok(TestControl::EndTest),
            _ => Ok(TestControl::Other(command)),
        }
    }
}

/// Commands on the configuration topic
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigCommand {
    /// `UTCwindow <milliseconds>`
    UtcWindow(u64),
    /// Unrecognized key, kept for logging
    Unknown(String),
}

impl ConfigCommand {
    /// A non-numeric or negative UTC window is rejected as a protocol error;
    /// callers keep the previous value.
    pub fn parse(message: &str) -> Result<ConfigCommand, ProtocolError> {
        let tokens = tokenize(message);
        let key = tokens.first().ok_or(ProtocolError::Empty)?;

        if key != keywords::UTC_WINDOW {
            return Ok(ConfigCommand::Unknown(key.clone()));
        }

        let value = tokens
            .get(1)
            .ok_or(ProtocolError::MissingArgument("UTCwindow value"))?;
        value
            .parse::<u64>()
            .map(ConfigCommand::UtcWindow)
            .map_err(|_| ProtocolError::InvalidNumber {
                key: keywords::UTC_WINDOW,
                value: value.clone(),
            })
    }
}

/// Commands on the result-configuration topic
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultConfig {
    /// `NEW_RESULT-LOG <settings...>`
    NewResultLog(Vec<String>),
    Unknown(String),
}

impl ResultConfig {
    pub fn parse(message: &str) -> Result<ResultConfig, ProtocolError> {
        let mut tokens = tokenize(message).into_iter();
        let key = tokens.next().ok_or(ProtocolError::Empty)?;

        if key != keywords::NEW_RESULT_LOG {
            return Ok(ResultConfig::Unknown(key));
        }

        let settings: Vec<String> = tokens.collect();
        if settings.is_empty() {
            return Err(ProtocolError::MissingArgument("NEW_RESULT-LOG settings"));
        }
        Ok(ResultConfig::NewResultLog(settings))
    }
}
