use log::{info, warn};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::{timeout, Duration};

use crate::config::EdgeNodeConfig;
use crate::console::ConsoleInput;
use crate::control_channel::{ControlChannel, ControlMessage, ControlPublisher};
use crate::error::{ChannelError, NodeError};
use crate::orchestrator::Orchestrator;
use crate::session::{SessionFactory, SessionSlot};

const DISPATCH_STOP_TIMEOUT: Duration = Duration::from_millis(1000);

/// The TCK edge node: control channel plus the dispatch loop feeding the
/// orchestrator
pub struct TckEdgeNode<F: SessionFactory, C> {
    config: EdgeNodeConfig,
    channel: ControlChannel,
    sessions: Arc<SessionSlot<F>>,
    console: Option<C>,
    shutdown_tx: broadcast::Sender<()>,
    dispatcher: Option<JoinHandle<()>>,
}

impl<F, C> TckEdgeNode<F, C>
where
    F: SessionFactory,
    C: ConsoleInput + 'static,
{
    pub fn new(config: EdgeNodeConfig, factory: F, console: C) -> Result<Self, NodeError> {
        let channel = ControlChannel::new(&config)?;
        let (shutdown_tx, _) = broadcast::channel(1);

        Ok(Self {
            config,
            channel,
            sessions: Arc::new(SessionSlot::new(factory)),
            console: Some(console),
            shutdown_tx,
            dispatcher: None,
        })
    }

    pub fn config(&self) -> &EdgeNodeConfig {
        &self.config
    }

    /// Connect the control channel and start handling control messages.
    /// Connection and subscription results arrive asynchronously; poll
    /// [`Self::is_running`] for readiness.
    pub fn start(&mut self) -> Result<(), NodeError> {
        let console = self.console.take().ok_or(ChannelError::AlreadyStarted)?;
        let inbound = self.channel.connect()?;

        let orchestrator = Orchestrator::new(
            self.config.clone(),
            self.channel.handle(),
            self.sessions.clone(),
            console,
        );
        self.dispatcher = Some(tokio::spawn(run_dispatch_loop(
            orchestrator,
            inbound,
            self.shutdown_tx.subscribe(),
        )));
        Ok(())
    }

    /// Stop dispatching, release the session and disconnect. Safe to call
    /// more than once.
    pub async fn stop(&mut self) {
        if let Some(mut dispatcher) = self.dispatcher.take() {
            let _ = self.shutdown_tx.send(());
            // A pending console prompt keeps the loop busy; don't wait on it forever
            if timeout(DISPATCH_STOP_TIMEOUT, &mut dispatcher).await.is_err() {
                warn!("Dispatch loop did not stop in time, aborting");
                dispatcher.abort();
            }
        }

        self.sessions.release().await;
        self.channel.disconnect().await;
    }

    /// Control topics are subscribed and the node is accepting commands
    pub fn is_running(&self) -> bool {
        self.channel.state().is_running()
    }

    pub fn is_connected(&self) -> bool {
        self.channel.state().is_connected()
    }
}

/// Feed control messages to the orchestrator one at a time until the channel
/// closes or shutdown is signalled
pub async fn run_dispatch_loop<P, F, C>(
    mut orchestrator: Orchestrator<P, F, C>,
    mut inbound: mpsc::UnboundedReceiver<ControlMessage>,
    mut shutdown_rx: broadcast::Receiver<()>,
) where
    P: ControlPublisher,
    F: SessionFactory,
    C: ConsoleInput,
{
    loop {
        tokio::select! {
            message = inbound.recv() => match message {
                Some(message) => orchestrator.dispatch(message).await,
                None => {
                    warn!("Control channel closed, no more test commands");
                    break;
                }
            },
            _ = shutdown_rx.recv() => {
                info!("Dispatch loop shutting down");
                break;
            }
        }
    }

    orchestrator.shutdown().await;
}
