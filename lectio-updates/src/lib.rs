//! Dataset update engine for Lectio.
//!
//! Keeps the embedded dataset current by fetching versioned delta manifests
//! and committing them atomically together with the new `data_version`:
//! - [`fetcher`] retrieves manifests over HTTP
//! - [`orchestrator`] runs the cooldown-gated check state machine
//! - [`scheduler`] drives periodic checks on a background task

pub mod config;
pub mod error;
pub mod fetcher;
pub mod orchestrator;
pub mod scheduler;

pub use config::UpdateConfig;
pub use error::{UpdateError, UpdateResult};
pub use fetcher::{HttpManifestFetcher, ManifestSource};
pub use orchestrator::{
    CheckOptions, CheckOutcome, CheckState, UpdateNotice, UpdateNotifier, UpdateOrchestrator,
};
pub use scheduler::{spawn_update_scheduler, UpdateSchedulerHandle};
