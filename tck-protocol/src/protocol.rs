//! TCK control topics, delivery levels and protocol defaults

/// Root of every control topic
pub const TOPIC_ROOT: &str = "SPARKPLUG_TCK";

/// Control-channel topics shared with the TCK console
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlTopic {
    /// `NEW_TEST ...` / `END_TEST` from the console
    TestControl,
    /// Free-text operator prompt from the console
    ConsolePrompt,
    /// Test parameter updates such as `UTCwindow <ms>`
    Config,
    /// Result log configuration
    ResultConfig,
    /// `[LEVEL] message` lines back to the console
    Log,
    /// `OVERALL: ...` verdicts
    Result,
    /// Operator answers to a console prompt
    ConsoleReply,
}

impl ControlTopic {
    /// Topics the driver subscribes to
    pub const INBOUND: [ControlTopic; 4] = [
        ControlTopic::TestControl,
        ControlTopic::ConsolePrompt,
        ControlTopic::Config,
        ControlTopic::ResultConfig,
    ];

    /// Full topic path
    pub fn path(&self) -> &'static str {
        match self {
            ControlTopic::TestControl => "SPARKPLUG_TCK/TEST_CONTROL",
            ControlTopic::ConsolePrompt => "SPARKPLUG_TCK/CONSOLE_PROMPT",
            ControlTopic::Config => "SPARKPLUG_TCK/CONFIG",
            ControlTopic::ResultConfig => "SPARKPLUG_TCK/RESULT_CONFIG",
            ControlTopic::Log => "SPARKPLUG_TCK/LOG",
            ControlTopic::Result => "SPARKPLUG_TCK/RESULT",
            ControlTopic::ConsoleReply => "SPARKPLUG_TCK/CONSOLE_REPLY",
        }
    }

    /// Resolve an inbound topic by exact match. Outbound topics never resolve.
    pub fn from_inbound_path(path: &str) -> Option<ControlTopic> {
        Self::INBOUND.into_iter().find(|topic| topic.path() == path)
    }

    /// Whether this topic is delivered at least once (QoS 1).
    /// Only log lines are fire-and-forget.
    pub fn at_least_once(&self) -> bool {
        !matches!(self, ControlTopic::Log)
    }

    pub fn is_inbound(&self) -> bool {
        Self::INBOUND.contains(self)
    }
}

impl std::fmt::Display for ControlTopic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.path())
    }
}

/// Control message keywords
pub mod keywords {
    pub const NEW_TEST: &str = "NEW_TEST";
    pub const END_TEST: &str = "END_TEST";
    pub const UTC_WINDOW: &str = "UTCwindow";
    pub const NEW_RESULT_LOG: &str = "NEW_RESULT-LOG";
}

/// Default broker URL
pub const DEFAULT_BROKER_URL: &str = "tcp://localhost:1883";
pub const DEFAULT_MQTT_PORT: u16 = 1883;

/// Default identity of the edge node under test
pub const DEFAULT_GROUP_ID: &str = "tck_group";
pub const DEFAULT_EDGE_NODE_ID: &str = "tck_edge";
pub const DEFAULT_CLIENT_ID_PREFIX: &str = "tck_edge_node";

/// Default UTC window tolerance (in milliseconds)
pub const DEFAULT_UTC_WINDOW_MS: u64 = 5000;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inbound_topics_resolve() {
        for topic in ControlTopic::INBOUND {
            assert_eq!(ControlTopic::from_inbound_path(topic.path()), Some(topic));
            assert!(topic.is_inbound());
        }
    }

    #[test]
    fn test_outbound_topics_do_not_resolve() {
        assert_eq!(ControlTopic::from_inbound_path("SPARKPLUG_TCK/RESULT"), None);
        assert_eq!(ControlTopic::from_inbound_path("SPARKPLUG_TCK/LOG"), None);
        assert_eq!(ControlTopic::from_inbound_path("SPARKPLUG_TCK/test_control"), None);
        assert_eq!(ControlTopic::from_inbound_path("SPARKPLUG_TCK/TEST_CONTROL/x"), None);
    }

    #[test]
    fn test_delivery_levels() {
        assert!(!ControlTopic::Log.at_least_once());
        assert!(ControlTopic::Result.at_least_once());
        assert!(ControlTopic::ConsoleReply.at_least_once());
        for topic in ControlTopic::INBOUND {
            assert!(topic.at_least_once());
        }
    }

    #[test]
    fn test_all_paths_under_root() {
        let all = [
            ControlTopic::TestControl,
            ControlTopic::ConsolePrompt,
            ControlTopic::Config,
            ControlTopic::ResultConfig,
            ControlTopic::Log,
            ControlTopic::Result,
            ControlTopic::ConsoleReply,
        ];
        for topic in all {
            assert!(topic.path().starts_with(TOPIC_ROOT));
        }
    }
}
