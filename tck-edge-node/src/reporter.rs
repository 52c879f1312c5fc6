use log::{info, trace, warn, Level};
use sparkplug_tck_protocol::{ControlTopic, LogLevel, Verdict};

use crate::control_channel::ControlPublisher;

fn to_log_level(level: LogLevel) -> Level {
    match level {
        LogLevel::Debug => Level::Debug,
        LogLevel::Info => Level::Info,
        LogLevel::Warn => Level::Warn,
        LogLevel::Error => Level::Error,
    }
}

/// Sends log lines, verdicts and console replies back to the TCK console
pub struct Reporter<P> {
    publisher: P,
}

impl<P: ControlPublisher> Reporter<P> {
    pub fn new(publisher: P) -> Self {
        Self { publisher }
    }

    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    /// Log locally and mirror the line to the console. Never fails.
    pub fn log(&self, level: LogLevel, message: &str) {
        log::log!(to_log_level(level), "{}", message);

        let line = level.format_line(message);
        if let Err(e) = self.publisher.try_publish(ControlTopic::Log, &line) {
            trace!("Log line not published: {}", e);
        }
    }

    pub fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    pub fn warn(&self, message: &str) {
        self.log(LogLevel::Warn, message);
    }

    pub fn error(&self, message: &str) {
        self.log(LogLevel::Error, message);
    }

    /// Waits for room in the publish queue, so a burst of log lines cannot
    /// push the verdict out
    pub async fn publish_result(&self, verdict: Verdict) {
        let payload = verdict.payload();
        info!("Result: {}", payload);
        if let Err(e) = self.publisher.publish(ControlTopic::Result, &payload).await {
            warn!("Failed to publish result '{}': {}", payload, e);
        }
    }

    pub async fn publish_console_reply(&self, reply: &str) {
        info!("Console reply: {}", reply);
        if let Err(e) = self
            .publisher
            .publish(ControlTopic::ConsoleReply, reply)
            .await
        {
            warn!("Failed to publish console reply: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ChannelError;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        connected: bool,
        sent: Mutex<Vec<(ControlTopic, String)>>,
    }

    impl ControlPublisher for Recorder {
        fn try_publish(&self, topic: ControlTopic, payload: &str) -> Result<(), ChannelError> {
            if !self.connected {
                return Err(ChannelError::NotConnected);
            }
            self.sent.lock().unwrap().push((topic, payload.to_string()));
            Ok(())
        }

        async fn publish(&self, topic: ControlTopic, payload: &str) -> Result<(), ChannelError> {
            self.try_publish(topic, payload)
        }
    }

    #[test]
    fn test_log_line_is_mirrored() {
        let reporter = Reporter::new(Recorder {
            connected: true,
            ..Default::default()
        });
        reporter.warn("SendDataTest not yet implemented");

        let sent = reporter.publisher().sent.lock().unwrap();
        assert_eq!(
            *sent,
            vec![(ControlTopic::Log, "[WARN] SendDataTest not yet implemented".to_string())]
        );
    }

    #[tokio::test]
    async fn test_publish_errors_are_swallowed() {
        let reporter = Reporter::new(Recorder::default());
        reporter.error("nobody is listening");
        reporter.publish_result(Verdict::Fail).await;
        reporter.publish_console_reply("PASS").await;
        assert!(reporter.publisher().sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_result_and_reply_topics() {
        let reporter = Reporter::new(Recorder {
            connected: true,
            ..Default::default()
        });
        reporter.publish_result(Verdict::NotExecuted).await;
        reporter.publish_console_reply("FAIL").await;

        let sent = reporter.publisher().sent.lock().unwrap();
        assert_eq!(sent[0], (ControlTopic::Result, "OVERALL: NOT EXECUTED".to_string()));
        assert_eq!(sent[1], (ControlTopic::ConsoleReply, "FAIL".to_string()));
    }
}
