//! Cancellable History Navigation
//!
//! Multi-step traversals (`back2`, `back_all`, ...) run as a background
//! task that only paces the walk: after each delay it asks the engine to
//! perform one step and waits for the answer. The ledger itself is only
//! ever touched by the engine, so steps never interleave with mutations.
//!
//! At most one traversal is active. Starting another one, or applying a
//! mutation, first requests cancellation through a `watch` channel and
//! waits (bounded) for the task to exit.
//!
//! ```text
//! Idle -> Running -> Stopped
//!            \-> CancelRequested -> Stopped
//! ```

use core::fmt;
use std::time::Duration;

use bgsync_core::{Direction, NavigationConfig};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

use crate::engine::EngineCommand;

// ----------------------------------------------------------------------------
// Traversal Types
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraversalState {
    Idle,
    Running,
    CancelRequested,
    Stopped,
}

/// Identity of one traversal; never reused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TraversalId(u64);

impl fmt::Display for TraversalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "traversal-{}", self.0)
    }
}

/// Engine's answer to a step request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Continue,
    Finished,
}

/// Parameters of one navigation request
#[derive(Debug, Clone, PartialEq)]
pub struct TraversalPlan {
    pub direction: Direction,
    /// Maximum number of steps; 0 walks until the stack is exhausted
    pub limit: usize,
    /// Pause before every step after the first
    pub delay: Duration,
    /// Animation hint attached to every step broadcast
    pub animation_secs: f64,
}

impl TraversalPlan {
    /// `back` / `fwd`
    pub fn single(direction: Direction, config: &NavigationConfig) -> Self {
        Self {
            direction,
            limit: 1,
            delay: Duration::ZERO,
            animation_secs: config.step_animation_secs,
        }
    }

    /// `back2` / `fwd2`
    pub fn slow(direction: Direction, config: &NavigationConfig) -> Self {
        Self::walk(
            direction,
            config.slow_step_limit,
            config.slow_step_delay(),
            config,
        )
    }

    /// `back_all` / `fwd_all`
    pub fn fast(direction: Direction, config: &NavigationConfig) -> Self {
        Self::walk(direction, 0, config.fast_step_delay(), config)
    }

    fn walk(direction: Direction, limit: usize, delay: Duration, config: &NavigationConfig) -> Self {
        // Unbounded walks animate instantly; clients only see the sweep
        let animation_secs = if limit == 0 {
            0.0
        } else {
            config.step_animation_secs
        };
        Self {
            direction,
            limit,
            delay,
            animation_secs,
        }
    }

    /// Whether `steps` completed steps exhaust the plan
    pub fn is_complete(&self, steps: usize) -> bool {
        self.limit != 0 && steps >= self.limit
    }
}

// ----------------------------------------------------------------------------
// Navigator
// ----------------------------------------------------------------------------

struct ActiveTraversal {
    id: TraversalId,
    plan: TraversalPlan,
    steps: usize,
    cancel: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Owner of the single active traversal; lives inside the engine task
pub struct Navigator {
    state: TraversalState,
    next_id: u64,
    active: Option<ActiveTraversal>,
    cancel_wait: Duration,
}

impl Navigator {
    pub fn new(cancel_wait: Duration) -> Self {
        Self {
            state: TraversalState::Idle,
            next_id: 0,
            active: None,
            cancel_wait,
        }
    }

    pub fn state(&self) -> TraversalState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn is_current(&self, id: TraversalId) -> bool {
        self.active.as_ref().is_some_and(|active| active.id == id)
    }

    /// Plan of the traversal `id`, if it is still the active one
    pub fn plan(&self, id: TraversalId) -> Option<&TraversalPlan> {
        self.active
            .as_ref()
            .filter(|active| active.id == id)
            .map(|active| &active.plan)
    }

    /// Spawn the pacing task for a traversal whose first `steps_done`
    /// steps the engine already performed
    pub fn start(
        &mut self,
        plan: TraversalPlan,
        steps_done: usize,
        commands: mpsc::Sender<EngineCommand>,
    ) -> TraversalId {
        self.next_id += 1;
        let id = TraversalId(self.next_id);
        let (cancel, cancel_rx) = watch::channel(false);
        let handle = tokio::spawn(run_traversal(id, plan.delay, commands, cancel_rx));

        debug!(
            "Started {} {:?} limit={} delay={:?}",
            id, plan.direction, plan.limit, plan.delay
        );
        self.active = Some(ActiveTraversal {
            id,
            plan,
            steps: steps_done,
            cancel,
            handle,
        });
        self.state = TraversalState::Running;
        id
    }

    /// Count a completed step of `id`. Returns true when the plan is
    /// exhausted, in which case the traversal is finished.
    pub fn record_step(&mut self, id: TraversalId) -> bool {
        let Some(active) = self.active.as_mut().filter(|active| active.id == id) else {
            return true;
        };
        active.steps += 1;
        if active.plan.is_complete(active.steps) {
            self.finish(id);
            return true;
        }
        false
    }

    /// Mark `id` as done. The pacing task exits on its own once it sees
    /// the `Finished` reply.
    pub fn finish(&mut self, id: TraversalId) {
        if self.is_current(id) {
            if let Some(active) = self.active.take() {
                debug!("{} finished after {} steps", id, active.steps);
            }
            self.state = TraversalState::Stopped;
        }
    }

    /// Cancel the active traversal and wait for its task to exit.
    /// Returns true when there was one to stop.
    pub async fn stop(&mut self) -> bool {
        let Some(mut active) = self.active.take() else {
            return false;
        };

        self.state = TraversalState::CancelRequested;
        // The receiver is gone once the task exited; nothing to signal then
        let _ = active.cancel.send(true);

        if timeout(self.cancel_wait, &mut active.handle).await.is_err() {
            warn!(
                "{} did not stop within {:?}, aborting",
                active.id, self.cancel_wait
            );
            active.handle.abort();
        }

        debug!("{} cancelled after {} steps", active.id, active.steps);
        self.state = TraversalState::Stopped;
        true
    }
}

// ----------------------------------------------------------------------------
// Pacing Task
// ----------------------------------------------------------------------------

async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    loop {
        if *cancel.borrow_and_update() {
            return;
        }
        // A dropped sender also ends the traversal
        if cancel.changed().await.is_err() {
            return;
        }
    }
}

async fn run_traversal(
    id: TraversalId,
    delay: Duration,
    commands: mpsc::Sender<EngineCommand>,
    mut cancel: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            _ = cancelled(&mut cancel) => break,
            _ = sleep(delay) => {}
        }

        let (reply, reply_rx) = oneshot::channel();
        let command = EngineCommand::NavigationStep {
            traversal: id,
            reply,
        };

        tokio::select! {
            _ = cancelled(&mut cancel) => break,
            sent = commands.send(command) => {
                if sent.is_err() {
                    debug!("{}: engine gone", id);
                    break;
                }
            }
        }

        let outcome = tokio::select! {
            _ = cancelled(&mut cancel) => break,
            outcome = reply_rx => outcome,
        };

        match outcome {
            Ok(StepOutcome::Continue) => continue,
            Ok(StepOutcome::Finished) | Err(_) => break,
        }
    }
    debug!("{} task exited", id);
}
