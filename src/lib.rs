//! Freshen - keeps profile text fields looking recently updated
//!
//! For every enabled target, Freshen logs in, reads a text field, makes a
//! minimal meaning-preserving edit, writes it back and verifies it stuck.
//! Targets run one at a time; a failure in one never stops the others, and
//! every run ends in a `RunSummary`.

pub mod config;
pub mod domain;
pub mod error;
pub mod gate;
pub mod id;
pub mod invoke;
pub mod mutate;
pub mod notify;
pub mod orchestrator;
pub mod retry;
pub mod runner;
pub mod secrets;
pub mod session;

pub use error::{FreshenError, Result};
