//! Periodic update checks on a background task.

use crate::error::{UpdateError, UpdateResult};
use crate::fetcher::ManifestSource;
use crate::orchestrator::{CheckOptions, CheckOutcome, UpdateOrchestrator};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

#[derive(Debug)]
enum SchedulerCommand {
    CheckNow {
        options: CheckOptions,
        reply: oneshot::Sender<CheckOutcome>,
    },
    Stop,
}

/// Handle for talking to a running scheduler.
#[derive(Clone)]
pub struct UpdateSchedulerHandle {
    command_tx: mpsc::Sender<SchedulerCommand>,
}

impl UpdateSchedulerHandle {
    /// Run a check right away and wait for its outcome.
    pub async fn check_now(&self, options: CheckOptions) -> UpdateResult<CheckOutcome> {
        let (reply, outcome) = oneshot::channel();
        self.command_tx
            .send(SchedulerCommand::CheckNow { options, reply })
            .await
            .map_err(|_| UpdateError::SchedulerStopped)?;
        outcome.await.map_err(|_| UpdateError::SchedulerStopped)
    }

    pub async fn stop(&self) -> UpdateResult<()> {
        self.command_tx
            .send(SchedulerCommand::Stop)
            .await
            .map_err(|_| UpdateError::SchedulerStopped)
    }
}

/// Spawn a task that runs a background check every `interval`, skipping the
/// immediate first tick. Periodic checks respect the cooldown and never
/// notify; `check_now` runs with the caller's options.
pub fn spawn_update_scheduler<S>(
    orchestrator: Arc<UpdateOrchestrator<S>>,
    interval: Duration,
) -> (UpdateSchedulerHandle, JoinHandle<()>)
where
    S: ManifestSource + 'static,
{
    let (command_tx, mut command_rx) = mpsc::channel(16);
    let handle = UpdateSchedulerHandle { command_tx };

    let task = tokio::spawn(async move {
        info!(interval_secs = interval.as_secs(), "Update scheduler started");
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let outcome = orchestrator.check_for_updates(CheckOptions::background()).await;
                    debug!(?outcome, "Periodic update check finished");
                }
                cmd = command_rx.recv() => {
                    match cmd {
                        Some(SchedulerCommand::CheckNow { options, reply }) => {
                            let outcome = orchestrator.check_for_updates(options).await;
                            let _ = reply.send(outcome);
                        }
                        Some(SchedulerCommand::Stop) => {
                            info!("Update scheduler stopping");
                            break;
                        }
                        None => {
                            info!("Command channel closed, stopping update scheduler");
                            break;
                        }
                    }
                }
            }
        }
    });

    (handle, task)
}
