//! Update orchestrator: decides when to check, fetches, validates and
//! commits dataset deltas.
//!
//! A check walks `Idle → CooldownCheck → (Skip | Fetching) → Validating →
//! Applying → Committed`. Any failure returns the orchestrator to `Idle`.
//! Only one check runs per store at a time, across every orchestrator
//! holding a handle to it. Errors never
//! escape [`UpdateOrchestrator::check_for_updates`]; they come back as
//! [`CheckOutcome::Failed`] so a broken network cannot take the app down.

use crate::config::UpdateConfig;
use crate::error::{UpdateError, UpdateResult};
use crate::fetcher::ManifestSource;
use chrono::{DateTime, Utc};
use lectio_delta::{Allowlist, ChangeApplier};
use lectio_store::{LocalStore, StoreError, StoreResult};
use serde::Serialize;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, error, info, warn};

/// Where the orchestrator currently is in a check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckState {
    Idle,
    CooldownCheck,
    /// The cooldown window had not elapsed.
    Skip,
    Fetching,
    Validating,
    Applying,
    Committed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CheckOptions {
    /// Ignore the cooldown.
    pub force: bool,
    /// Do not notify, even on success or failure.
    pub silent: bool,
}

impl CheckOptions {
    pub fn forced() -> Self {
        Self {
            force: true,
            silent: false,
        }
    }

    /// Scheduled checks: cooldown applies and nothing is shown to the user.
    pub fn background() -> Self {
        Self {
            force: false,
            silent: true,
        }
    }
}

/// Result of one call to [`UpdateOrchestrator::check_for_updates`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CheckOutcome {
    /// The cooldown has not elapsed since `last_checked`.
    Skipped { last_checked: DateTime<Utc> },
    /// Another check was already in flight on the same store.
    AlreadyRunning,
    UpToDate { version: i64 },
    Applied {
        from_version: i64,
        to_version: i64,
        changes: usize,
    },
    Failed { stage: CheckState, error: String },
}

/// User-facing notification emitted by non-silent checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UpdateNotice {
    Applied {
        from_version: i64,
        to_version: i64,
        changes: usize,
        description: Option<String>,
    },
    Failed { message: String },
}

pub type UpdateNotifier = Arc<dyn Fn(&UpdateNotice) + Send + Sync>;

/// Coordinates update checks against one local store.
pub struct UpdateOrchestrator<S> {
    store: LocalStore,
    source: S,
    applier: ChangeApplier,
    config: UpdateConfig,
    auth_token: Option<String>,
    notifier: Option<UpdateNotifier>,
    state: Mutex<CheckState>,
}

struct StageError {
    stage: CheckState,
    error: UpdateError,
}

trait AtStage<T> {
    fn at(self, stage: CheckState) -> Result<T, StageError>;
}

impl<T> AtStage<T> for UpdateResult<T> {
    fn at(self, stage: CheckState) -> Result<T, StageError> {
        self.map_err(|error| StageError { stage, error })
    }
}

impl<S: ManifestSource> UpdateOrchestrator<S> {
    pub fn new(store: LocalStore, source: S, allowlist: Allowlist, config: UpdateConfig) -> Self {
        Self {
            store,
            source,
            applier: ChangeApplier::new(allowlist),
            config,
            auth_token: None,
            notifier: None,
            state: Mutex::new(CheckState::Idle),
        }
    }

    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    pub fn with_notifier(mut self, notifier: impl Fn(&UpdateNotice) + Send + Sync + 'static) -> Self {
        self.notifier = Some(Arc::new(notifier));
        self
    }

    pub fn config(&self) -> &UpdateConfig {
        &self.config
    }

    /// Last state reached. `Skip` and `Committed` stick until the next
    /// check starts.
    pub fn state(&self) -> CheckState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, state: CheckState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }

    fn notify(&self, options: CheckOptions, notice: UpdateNotice) {
        if options.silent {
            return;
        }
        if let Some(notifier) = &self.notifier {
            notifier(&notice);
        }
    }

    /// Run one update check.
    pub async fn check_for_updates(&self, options: CheckOptions) -> CheckOutcome {
        let Some(_guard) = self.store.try_begin_update() else {
            debug!("Update check already in flight");
            return CheckOutcome::AlreadyRunning;
        };

        match self.run_check(options).await {
            Ok((outcome, notice)) => {
                if !matches!(
                    outcome,
                    CheckOutcome::Applied { .. } | CheckOutcome::Skipped { .. }
                ) {
                    self.set_state(CheckState::Idle);
                }
                if let Some(notice) = notice {
                    self.notify(options, notice);
                }
                outcome
            }
            Err(StageError { stage, error }) => {
                if stage == CheckState::Applying {
                    error!(?stage, "Update check failed: {error}");
                } else {
                    warn!(?stage, "Update check failed: {error}");
                }
                self.set_state(CheckState::Idle);
                let message = error.to_string();
                self.notify(
                    options,
                    UpdateNotice::Failed {
                        message: message.clone(),
                    },
                );
                CheckOutcome::Failed {
                    stage,
                    error: message,
                }
            }
        }
    }

    async fn run_check(
        &self,
        options: CheckOptions,
    ) -> Result<(CheckOutcome, Option<UpdateNotice>), StageError> {
        self.set_state(CheckState::CooldownCheck);
        let now = Utc::now();
        if !options.force {
            let last = self
                .with_store(|store| store.last_update_check())
                .await
                .at(CheckState::CooldownCheck)?;
            if let Some(last_checked) = last {
                let elapsed = now - last_checked;
                // a timestamp from the future (clock moved back) does not block checks
                if elapsed >= chrono::Duration::zero() && elapsed < self.config.cooldown() {
                    debug!(%last_checked, "Update check skipped, cooldown active");
                    self.set_state(CheckState::Skip);
                    return Ok((CheckOutcome::Skipped { last_checked }, None));
                }
            }
        }
        self.with_store(move |store| store.set_last_update_check(now))
            .await
            .at(CheckState::CooldownCheck)?;

        self.set_state(CheckState::Fetching);
        let current = self
            .with_store(|store| store.data_version())
            .await
            .at(CheckState::Fetching)?;
        let manifest = self
            .source
            .fetch_manifest(current, self.auth_token.as_deref())
            .await
            .at(CheckState::Fetching)?;

        if !manifest.has_updates()
            || manifest.changes.is_empty()
            || manifest.latest_version <= current
        {
            debug!(version = current, "Dataset is up to date");
            return Ok((CheckOutcome::UpToDate { version: current }, None));
        }

        self.set_state(CheckState::Validating);
        if manifest.from_version != current {
            return Err(StageError {
                stage: CheckState::Validating,
                error: UpdateError::VersionMismatch {
                    expected: current,
                    got: manifest.from_version,
                },
            });
        }
        let statements = self
            .applier
            .prepare(&manifest.changes)
            .map_err(UpdateError::from)
            .at(CheckState::Validating)?;

        self.set_state(CheckState::Applying);
        let applier = self.applier.clone();
        let latest = manifest.latest_version;
        let report = self
            .with_store(move |store| store.apply_versioned(&applier, &statements, current, latest))
            .await
            .map_err(|e| match e {
                // data_version was written while this check was fetching
                UpdateError::Store(StoreError::VersionConflict {
                    expected, found, ..
                }) => UpdateError::VersionMismatch {
                    expected: found,
                    got: expected,
                },
                other => other,
            })
            .at(CheckState::Applying)?;

        self.set_state(CheckState::Committed);
        info!(
            from_version = current,
            to_version = latest,
            changes = report.statements,
            "Dataset updated"
        );
        let outcome = CheckOutcome::Applied {
            from_version: current,
            to_version: latest,
            changes: report.statements,
        };
        let notice = UpdateNotice::Applied {
            from_version: current,
            to_version: latest,
            changes: report.statements,
            description: manifest.description,
        };
        Ok((outcome, Some(notice)))
    }

    /// Run a store operation on the blocking pool.
    async fn with_store<T, F>(&self, op: F) -> UpdateResult<T>
    where
        F: FnOnce(&LocalStore) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = self.store.clone();
        let result = tokio::task::spawn_blocking(move || op(&store))
            .await
            .map_err(|e| UpdateError::Worker(e.to_string()))?;
        Ok(result?)
    }
}
