//! Edge profile scenario handlers
//!
//! Every handler either leaves the run `Running` until `END_TEST` or
//! publishes exactly one verdict before returning.

use sparkplug_tck_protocol::{Scenario, Verdict};

use super::Orchestrator;
use crate::console::ConsoleInput;
use crate::control_channel::ControlPublisher;
use crate::session::{birth_metrics, SessionFactory, SessionSettings};

impl<P, F, C> Orchestrator<P, F, C>
where
    P: ControlPublisher,
    F: SessionFactory,
    C: ConsoleInput,
{
    pub(super) async fn run_scenario(&mut self, scenario: &Scenario, args: &[String]) {
        match scenario {
            Scenario::SessionEstablishment => self.run_session_establishment_test(args).await,
            Scenario::SessionTermination
            | Scenario::SendData
            | Scenario::SendComplexData
            | Scenario::ReceiveCommand
            | Scenario::PrimaryHost
            | Scenario::MultipleBroker => self.run_not_implemented(scenario).await,
            Scenario::Unknown(name) => {
                self.reporter.error(&format!("Unknown test type: {}", name));
                self.publish_verdict(Verdict::NotExecuted).await;
            }
        }
    }

    /// `SessionEstablishmentTest <group_id> <edge_node_id> [device_ids...]`
    ///
    /// Passes only once the console sends `END_TEST`.
    async fn run_session_establishment_test(&mut self, args: &[String]) {
        let (group_id, edge_node_id, device_args) = match args {
            [group_id, edge_node_id, rest @ ..]
                if !group_id.is_empty() && !edge_node_id.is_empty() =>
            {
                (group_id, edge_node_id, rest)
            }
            _ => {
                self.reporter
                    .error("Missing parameters for SessionEstablishmentTest");
                self.publish_verdict(Verdict::NotExecuted).await;
                return;
            }
        };
        let device_ids: Vec<String> = device_args
            .iter()
            .filter(|id| !id.is_empty())
            .cloned()
            .collect();

        self.reporter.info(&format!(
            "Creating Edge Node group_id={}, edge_node_id={}",
            group_id, edge_node_id
        ));
        self.run.group_id = Some(group_id.clone());
        self.run.edge_node_id = Some(edge_node_id.clone());

        let settings = SessionSettings::for_edge_node(&self.config, group_id, edge_node_id);
        match self.sessions.create(settings, &birth_metrics()).await {
            Ok(()) => {
                self.run.device_ids = device_ids;
                self.reporter
                    .info("Edge Node session established successfully");
            }
            Err(e) => {
                self.reporter.error(&e.to_string());
                self.publish_verdict(Verdict::Fail).await;
            }
        }
    }

    async fn run_not_implemented(&mut self, scenario: &Scenario) {
        self.reporter
            .warn(&format!("{} not yet implemented", scenario));
        self.publish_verdict(Verdict::NotExecuted).await;
    }
}
