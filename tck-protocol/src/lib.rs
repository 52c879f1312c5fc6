//! Sparkplug TCK control protocol
//!
//! This crate provides the shared definitions for the text protocol spoken
//! between the Sparkplug TCK console and an edge-node test driver over the
//! `SPARKPLUG_TCK/#` control topics.
//!
//! # Features
//!
//! - **Topic Table**: every control topic with its direction and delivery level
//! - **Tokenizer**: the whitespace tokenization the console payloads rely on
//! - **Typed Commands**: control messages parsed once into tagged variants
//! - **Verdicts**: the `OVERALL: ...` result strings
//!
//! # Example
//!
//! ```rust
//! use sparkplug_tck_protocol::{Profile, Scenario, TestControl};
//!
//! let cmd = TestControl::parse("NEW_TEST edge SessionEstablishmentTest G1 E1").unwrap();
//! match cmd {
//!     TestControl::NewTest { profile, scenario, args } => {
//!         assert_eq!(profile, Profile::Edge);
//!         assert_eq!(scenario, Scenario::SessionEstablishment);
//!         assert_eq!(args, vec!["G1", "E1"]);
//!     }
//!     _ => unreachable!(),
//! }
//! ```

pub mod command;
pub mod parser;
pub mod protocol;
pub mod types;

// Re-export commonly used types
pub use command::{ConfigCommand, ResultConfig, TestControl};
pub use parser::tokenize;
pub use protocol::ControlTopic;
pub use types::*;

/// Default Sparkplug namespace prefix for device-protocol topics
pub const NAMESPACE_PREFIX: &str = "spBv1.0";

/// The only TCK profile this driver implements
pub const EDGE_PROFILE: &str = "edge";
