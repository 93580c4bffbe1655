//! Domain types for Freshen
//!
//! - Credentials: per-target login material, redacted and zeroed on drop
//! - TargetOutcome: result of one target (status, attempts, duration, error)
//! - RunSummary: ordered outcomes plus the derived overall status

pub mod credentials;
pub mod outcome;
pub mod summary;

pub use credentials::Credentials;
pub use outcome::{ErrorKind, RunnerStage, TargetOutcome, TargetStatus};
pub use summary::{OverallStatus, RunSummary, RunSummaryBuilder};
