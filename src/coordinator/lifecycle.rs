//! Run loop, command channel and shutdown.
//!
//! Every input (lifecycle events, toggles, timer-driven sweeps) funnels
//! into one `select!` loop, so the coordinator applies them strictly one at
//! a time. Destroy commands run as background tasks and report back here.

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::handle::HandleId;

use super::{CoordinatorSnapshot, DestroyOutcome, EvictionCoordinator, LifecycleEvent, SkipReason};

/// Input to the run loop.
#[derive(Debug)]
pub enum Command {
    Lifecycle(LifecycleEvent),
    /// Flip exclusion of the currently active handle
    ToggleExclusion,
    /// Sweep now instead of waiting for the interval
    Sweep,
    Snapshot(oneshot::Sender<CoordinatorSnapshot>),
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("coordinator has shut down")]
pub struct CoordinatorGone;

/// Cloneable sender side of a running coordinator.
#[derive(Debug, Clone)]
pub struct CoordinatorHandle {
    tx: mpsc::Sender<Command>,
}

impl CoordinatorHandle {
    /// Bounded command channel. Wire the receiver into
    /// [`EvictionCoordinator::run`].
    #[must_use]
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<Command>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (Self { tx }, rx)
    }

    pub async fn send(&self, command: Command) -> Result<(), CoordinatorGone> {
        self.tx.send(command).await.map_err(|_| CoordinatorGone)
    }

    pub async fn created(&self, id: HandleId) -> Result<(), CoordinatorGone> {
        self.send(Command::Lifecycle(LifecycleEvent::Created(id))).await
    }

    pub async fn activated(&self, id: HandleId) -> Result<(), CoordinatorGone> {
        self.send(Command::Lifecycle(LifecycleEvent::Activated(id))).await
    }

    pub async fn removed(&self, id: HandleId) -> Result<(), CoordinatorGone> {
        self.send(Command::Lifecycle(LifecycleEvent::Removed(id))).await
    }

    pub async fn toggle_exclusion(&self) -> Result<(), CoordinatorGone> {
        self.send(Command::ToggleExclusion).await
    }

    pub async fn sweep(&self) -> Result<(), CoordinatorGone> {
        self.send(Command::Sweep).await
    }

    /// Ask for a snapshot. Answered after every command queued before it.
    pub async fn snapshot(&self) -> Result<CoordinatorSnapshot, CoordinatorGone> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Snapshot(reply)).await?;
        rx.await.map_err(|_| CoordinatorGone)
    }
}

impl EvictionCoordinator {
    /// Create a command channel sized from config.
    #[must_use]
    pub fn channel(&self) -> (CoordinatorHandle, mpsc::Receiver<Command>) {
        CoordinatorHandle::channel(self.config.event_buffer)
    }

    /// Move the coordinator onto a task. The task hands the coordinator
    /// back once `shutdown` fires or every handle is dropped.
    pub fn spawn(mut self, shutdown: CancellationToken) -> (CoordinatorHandle, JoinHandle<Self>) {
        let (handle, commands) = self.channel();
        let task = tokio::spawn(async move {
            self.run(commands, shutdown).await;
            self
        });
        (handle, task)
    }

    /// Run the main event loop until `shutdown` fires or the command
    /// channel closes, then settle in-flight destroys.
    #[tracing::instrument(skip_all)]
    pub async fn run(&mut self, mut commands: mpsc::Receiver<Command>, shutdown: CancellationToken) {
        info!(
            capacity = self.config.capacity,
            grace_ms = self.config.grace_period().as_millis() as u64,
            sweep_ms = self.config.sweep_interval_ms,
            "Reaper running"
        );

        let mut sweep_interval = tokio::time::interval(self.config.sweep_interval());
        sweep_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    debug!("Shutdown requested");
                    break;
                }

                command = commands.recv() => match command {
                    Some(command) => self.apply(command).await,
                    None => {
                        debug!("All coordinator handles dropped");
                        break;
                    }
                },

                _ = sweep_interval.tick() => {
                    self.spawn_sweep(Instant::now());
                }

                Some(joined) = self.in_flight.join_next(), if !self.in_flight.is_empty() => {
                    self.settle(joined);
                }
            }
        }

        self.shutdown().await;
    }

    /// Cut retry delays short and wait for in-flight destroys to settle.
    pub async fn shutdown(&mut self) {
        info!(in_flight = self.in_flight.len(), "Reaper shutting down");
        self.cancel.cancel();
        while let Some(joined) = self.in_flight.join_next().await {
            self.settle(joined);
        }
        info!("Reaper shutdown complete");
    }

    async fn apply(&mut self, command: Command) {
        match command {
            Command::Lifecycle(event) => {
                self.handle_event(event).await;
            }
            Command::ToggleExclusion => {
                self.toggle_exclusion().await;
            }
            Command::Sweep => self.spawn_sweep(Instant::now()),
            Command::Snapshot(reply) => {
                let _ = reply.send(self.snapshot());
            }
        }
    }

    fn settle(&mut self, joined: Result<(HandleId, DestroyOutcome), JoinError>) {
        match joined {
            Ok((id, outcome)) => {
                debug!(id = %id, outcome = outcome.label(), "Destroy settled");
                self.destroying.remove(&id);
                if matches!(
                    outcome,
                    DestroyOutcome::Destroyed { .. } | DestroyOutcome::Skipped(SkipReason::Gone)
                ) {
                    self.untrack(id, "destroyed");
                    self.publish_sizes();
                }
            }
            Err(e) => error!(error = %e, "Destroy task failed"),
        }
        // A failed task cannot report its id
        if self.in_flight.is_empty() {
            self.destroying.clear();
        }
        crate::metrics::set_in_flight_destroys(self.in_flight.len());
    }
}
