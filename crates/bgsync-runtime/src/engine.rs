//! Sync Engine Task
//!
//! The single writer. Every connection talks to the engine through an
//! `EngineHandle`; commands are queued on one bounded mpsc channel and
//! processed strictly in order, so the game state and the ledger never see
//! concurrent access. Multi-step navigation is paced by a separate task
//! (see `navigation`) that feeds its steps back through the same queue,
//! leaving the engine free to serve other clients between steps.

use bgsync_core::{ClientId, GameState, InboundMessage, SyncConfig, SyncError, SyncResult};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::context::ServerContext;
use crate::dispatcher::{Dispatcher, Route};
use crate::hub::{client_channel, ClientReceiver, ClientSender};
use crate::navigation::{Navigator, StepOutcome, TraversalId, TraversalPlan, TraversalState};

// ----------------------------------------------------------------------------
// Commands
// ----------------------------------------------------------------------------

/// Work items processed by the engine, in arrival order
#[derive(Debug)]
pub enum EngineCommand {
    Connect {
        client: ClientId,
        sender: ClientSender,
    },
    Disconnect {
        client: ClientId,
    },
    /// Raw text frame from a client, parsed by the engine
    Inbound {
        client: ClientId,
        text: String,
    },
    /// Already parsed message from a client
    Message {
        client: ClientId,
        message: InboundMessage,
    },
    /// Next step of a running traversal
    NavigationStep {
        traversal: TraversalId,
        reply: oneshot::Sender<StepOutcome>,
    },
    Snapshot {
        reply: oneshot::Sender<LedgerSnapshot>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Point-in-time view of the engine state
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerSnapshot {
    pub state: GameState,
    pub hist_i: usize,
    pub hist_n: usize,
    pub history_sns: Vec<u64>,
    pub redo_sns: Vec<u64>,
    pub traversal: TraversalState,
    pub clients: usize,
}

// ----------------------------------------------------------------------------
// Engine Handle
// ----------------------------------------------------------------------------

/// Cloneable entry point to a running engine
#[derive(Debug, Clone)]
pub struct EngineHandle {
    commands: mpsc::Sender<EngineCommand>,
}

impl EngineHandle {
    /// Register a client; the returned queue yields the initial state push
    /// followed by every broadcast
    pub async fn connect(&self, client: ClientId) -> SyncResult<ClientReceiver> {
        let (sender, receiver) = client_channel();
        self.send(EngineCommand::Connect { client, sender }).await?;
        Ok(receiver)
    }

    pub async fn disconnect(&self, client: ClientId) -> SyncResult<()> {
        self.send(EngineCommand::Disconnect { client }).await
    }

    /// Queue a raw JSON text frame from `client`
    pub async fn submit_text<S: Into<String>>(&self, client: ClientId, text: S) -> SyncResult<()> {
        self.send(EngineCommand::Inbound {
            client,
            text: text.into(),
        })
        .await
    }

    pub async fn submit(&self, client: ClientId, message: InboundMessage) -> SyncResult<()> {
        self.send(EngineCommand::Message { client, message }).await
    }

    /// Current state, ledger layout and traversal state. Observes every
    /// command queued before it.
    pub async fn snapshot(&self) -> SyncResult<LedgerSnapshot> {
        let (reply, response) = oneshot::channel();
        self.send(EngineCommand::Snapshot { reply }).await?;
        response
            .await
            .map_err(|_| SyncError::channel_error("engine dropped snapshot request"))
    }

    /// Cancel any traversal, save the ledger and stop the engine
    pub async fn shutdown(&self) -> SyncResult<()> {
        let (reply, response) = oneshot::channel();
        self.send(EngineCommand::Shutdown { reply }).await?;
        response
            .await
            .map_err(|_| SyncError::channel_error("engine stopped before acknowledging shutdown"))
    }

    async fn send(&self, command: EngineCommand) -> SyncResult<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| SyncError::channel_error("sync engine is not running"))
    }
}

// ----------------------------------------------------------------------------
// Sync Engine
// ----------------------------------------------------------------------------

pub struct SyncEngine {
    context: ServerContext,
    dispatcher: Dispatcher,
    navigator: Navigator,
    receiver: mpsc::Receiver<EngineCommand>,
    /// Handed to traversal tasks; weak so the engine does not keep its own
    /// queue open
    commands: mpsc::WeakSender<EngineCommand>,
    running: bool,
}

impl SyncEngine {
    /// Restore the ledger and create the engine with its handle
    pub fn new(config: SyncConfig) -> SyncResult<(Self, EngineHandle)> {
        config.validate()?;

        let (sender, receiver) = mpsc::channel(config.channels.command_buffer_size);
        let engine = Self {
            context: ServerContext::open(&config),
            dispatcher: Dispatcher::new(config.navigation.clone()),
            navigator: Navigator::new(config.navigation.cancel_wait()),
            receiver,
            commands: sender.downgrade(),
            running: true,
        };
        Ok((engine, EngineHandle { commands: sender }))
    }

    /// Create the engine and run it on a tokio task
    pub fn spawn(config: SyncConfig) -> SyncResult<(EngineHandle, JoinHandle<()>)> {
        let (engine, handle) = Self::new(config)?;
        let task = tokio::spawn(engine.run());
        Ok((handle, task))
    }

    /// Process commands until shutdown or until every handle is dropped
    pub async fn run(mut self) {
        info!(
            "Sync engine starting at sn={} ({} history entries)",
            self.context.state().sn,
            self.context.ledger().position()
        );

        while self.running {
            match self.receiver.recv().await {
                Some(command) => self.process(command).await,
                None => {
                    info!("Command channel closed, shutting down");
                    self.stop_traversal().await;
                    self.context.save();
                    break;
                }
            }
        }

        info!("Sync engine stopped");
    }

    async fn process(&mut self, command: EngineCommand) {
        match command {
            EngineCommand::Connect { client, sender } => self.context.connect(client, sender),
            EngineCommand::Disconnect { client } => self.context.disconnect(client),
            EngineCommand::Inbound { client, text } => match InboundMessage::parse(&text) {
                Ok(message) => self.handle_message(client, message).await,
                Err(e) => self.context.reject(client, &e),
            },
            EngineCommand::Message { client, message } => {
                self.handle_message(client, message).await
            }
            EngineCommand::NavigationStep { traversal, reply } => {
                let outcome = self.navigation_step(traversal);
                // The pacing task may have been cancelled meanwhile
                let _ = reply.send(outcome);
            }
            EngineCommand::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }
            EngineCommand::Shutdown { reply } => {
                info!("Shutdown requested");
                self.stop_traversal().await;
                self.context.save();
                self.running = false;
                let _ = reply.send(());
            }
        }
    }

    async fn handle_message(&mut self, client: ClientId, message: InboundMessage) {
        debug!(
            "{} -> {} (history={})",
            client,
            message.message.message_type(),
            message.history
        );

        match self.dispatcher.route(message) {
            Route::Mutate {
                mutation,
                commit,
                animation_secs,
            } => {
                match self.context.prepare(mutation) {
                    Ok(next) => {
                        // No mutation may land between two steps of a traversal
                        self.stop_traversal().await;
                        self.context.install(next, commit, animation_secs);
                    }
                    // A rejected message leaves any traversal running
                    Err(e) => self.context.reject(client, &e),
                }
            }
            Route::Navigate(plan) => self.navigate(plan).await,
        }
    }

    // ------------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------------

    async fn stop_traversal(&mut self) {
        if self.navigator.stop().await {
            self.context.save();
        }
    }

    /// Perform the first step inline; hand the rest to a pacing task
    async fn navigate(&mut self, plan: TraversalPlan) {
        self.stop_traversal().await;

        if !self.context.step(plan.direction, plan.animation_secs) {
            debug!("Nothing to navigate {:?}", plan.direction);
            return;
        }

        if plan.is_complete(1) || !self.context.can_step(plan.direction) {
            self.context.save();
            return;
        }

        match self.commands.upgrade() {
            Some(commands) => {
                self.navigator.start(plan, 1, commands);
            }
            None => self.context.save(),
        }
    }

    fn navigation_step(&mut self, traversal: TraversalId) -> StepOutcome {
        let Some(plan) = self.navigator.plan(traversal).cloned() else {
            debug!("Ignoring step of stale {}", traversal);
            return StepOutcome::Finished;
        };

        let finished = !self.context.step(plan.direction, plan.animation_secs)
            || self.navigator.record_step(traversal)
            || !self.context.can_step(plan.direction);

        if finished {
            self.navigator.finish(traversal);
            self.context.save();
            StepOutcome::Finished
        } else {
            StepOutcome::Continue
        }
    }

    fn snapshot(&self) -> LedgerSnapshot {
        let (hist_i, hist_n) = self.context.indices();
        let ledger = self.context.ledger();
        LedgerSnapshot {
            state: self.context.state().clone(),
            hist_i,
            hist_n,
            history_sns: ledger.history().iter().map(|s| s.sn).collect(),
            redo_sns: ledger.redo().iter().map(|s| s.sn).collect(),
            traversal: self.navigator.state(),
            clients: self.context.hub().len(),
        }
    }
}
