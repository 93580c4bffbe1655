//! Target runner module - executes one target's refresh pipeline.
//!
//! This module provides:
//! - TargetRunner, the per-target state machine
//! - TargetRunnerConfig for retry policy and fallback behaviour

mod target_runner;

pub use target_runner::{TargetRunner, TargetRunnerConfig};
