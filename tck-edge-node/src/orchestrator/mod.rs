//! Test-run state machine driven by the TCK console

mod scenarios;

use log::{debug, info, warn};
use sparkplug_tck_protocol::{
    ConfigCommand, ControlTopic, Profile, ProtocolError, ResultConfig, Scenario, TestControl,
    TestState, Verdict,
};
use std::sync::Arc;

use crate::config::EdgeNodeConfig;
use crate::console::ConsoleInput;
use crate::control_channel::{ControlMessage, ControlPublisher};
use crate::reporter::Reporter;
use crate::session::{SessionFactory, SessionSlot};

/// The one active test run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestRun {
    pub state: TestState,
    pub scenario: Option<Scenario>,
    pub args: Vec<String>,
    pub group_id: Option<String>,
    pub edge_node_id: Option<String>,
    pub device_ids: Vec<String>,
}

impl TestRun {
    /// Start a new run, overwriting whatever the previous one recorded
    fn begin(&mut self, scenario: Scenario, args: Vec<String>) {
        *self = Self {
            state: TestState::Running,
            scenario: Some(scenario),
            args,
            ..Default::default()
        };
    }

    fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn is_running(&self) -> bool {
        self.state == TestState::Running
    }
}

/// Handles control messages one at a time and runs the requested scenarios
pub struct Orchestrator<P, F: SessionFactory, C> {
    config: EdgeNodeConfig,
    reporter: Reporter<P>,
    sessions: Arc<SessionSlot<F>>,
    console: C,
    run: TestRun,
}

impl<P, F, C> Orchestrator<P, F, C>
where
    P: ControlPublisher,
    F: SessionFactory,
    C: ConsoleInput,
{
    pub fn new(
        config: EdgeNodeConfig,
        publisher: P,
        sessions: Arc<SessionSlot<F>>,
        console: C,
    ) -> Self {
        Self {
            config,
            reporter: Reporter::new(publisher),
            sessions,
            console,
            run: TestRun::default(),
        }
    }

    pub fn run(&self) -> &TestRun {
        &self.run
    }

    pub fn state(&self) -> TestState {
        self.run.state
    }

    pub fn config(&self) -> &EdgeNodeConfig {
        &self.config
    }

    pub fn utc_window_ms(&self) -> u64 {
        self.config.utc_window_ms
    }

    pub fn reporter(&self) -> &Reporter<P> {
        &self.reporter
    }

    pub fn sessions(&self) -> &Arc<SessionSlot<F>> {
        &self.sessions
    }

    pub async fn dispatch(&mut self, message: ControlMessage) {
        match message.topic {
            ControlTopic::TestControl => self.handle_test_control(&message.payload).await,
            ControlTopic::ConsolePrompt => self.handle_console_prompt(&message.payload).await,
            ControlTopic::Config => self.handle_config(&message.payload),
            ControlTopic::ResultConfig => self.handle_result_config(&message.payload),
            topic => debug!("Ignoring message on outbound topic {}", topic),
        }
    }

    pub async fn handle_test_control(&mut self, message: &str) {
        match TestControl::parse(message) {
            Ok(TestControl::NewTest {
                profile,
                scenario,
                args,
            }) => self.new_test(profile, scenario, args).await,
            Ok(TestControl::EndTest) => self.end_test().await,
            Ok(TestControl::Other(command)) => {
                debug!("Ignoring test control command: {}", command);
            }
            Err(ProtocolError::MalformedNewTest(_)) => {
                self.reporter.error("Invalid NEW_TEST command format");
            }
            Err(e) => self.reporter.warn(&format!("Ignoring test control message: {}", e)),
        }
    }

    async fn new_test(&mut self, profile: Profile, scenario: Scenario, args: Vec<String>) {
        if profile != Profile::Edge {
            self.reporter
                .warn(&format!("Ignoring non-edge test: {}", profile.as_str()));
            return;
        }

        if self.sessions.release().await {
            info!("Released Edge Node left over from the previous test");
        }

        self.run.begin(scenario.clone(), args.clone());
        self.reporter.info(&format!("Starting test: {}", scenario));

        self.run_scenario(&scenario, &args).await;
    }

    async fn end_test(&mut self) {
        self.reporter.info("Test end requested");

        if self.run.is_running()
            && self
                .run
                .scenario
                .as_ref()
                .is_some_and(Scenario::awaits_end_test)
        {
            self.publish_verdict(Verdict::Pass).await;
        }

        if self.sessions.release().await {
            info!("Edge Node session released");
        }

        self.run.reset();
    }

    /// Publish the verdict and close the run
    async fn publish_verdict(&mut self, verdict: Verdict) {
        self.reporter.publish_result(verdict).await;
        self.run.state = match verdict {
            Verdict::Fail => TestState::Failed,
            Verdict::Pass | Verdict::NotExecuted => TestState::Completed,
        };
    }

    /// Blocks the dispatch loop until the operator answers
    pub async fn handle_console_prompt(&mut self, message: &str) {
        let Some(reply) = self.console.prompt(message).await else {
            warn!("No console reply available for prompt: {}", message);
            return;
        };

        let reply = reply.trim();
        if reply.is_empty() {
            debug!("Empty console reply, nothing to publish");
            return;
        }
        self.reporter.publish_console_reply(reply).await;
    }

    /// Invalid values are logged and leave the configuration unchanged
    pub fn handle_config(&mut self, message: &str) {
        match ConfigCommand::parse(message) {
            Ok(ConfigCommand::UtcWindow(window_ms)) => {
                self.config.utc_window_ms = window_ms;
                self.reporter
                    .info(&format!("UTC window set to {} ms", window_ms));
            }
            Ok(ConfigCommand::Unknown(key)) => {
                self.reporter.warn(&format!("Ignoring unknown config: {}", key));
            }
            Err(e) => self.reporter.warn(&format!("Ignoring config message: {}", e)),
        }
    }

    pub fn handle_result_config(&self, message: &str) {
        match ResultConfig::parse(message) {
            Ok(ResultConfig::NewResultLog(_)) => {
                self.reporter
                    .info(&format!("Result config: {}", message.trim()));
            }
            Ok(ResultConfig::Unknown(key)) => {
                debug!("Ignoring result config: {}", key);
            }
            Err(e) => self
                .reporter
                .warn(&format!("Ignoring result config message: {}", e)),
        }
    }

    /// Release anything the current run still holds
    pub async fn shutdown(&mut self) {
        if self.sessions.release().await {
            info!("Edge Node session released on shutdown");
        }
        self.run.reset();
    }
}
