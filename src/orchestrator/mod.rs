//! Application-level orchestration utilities.
//!
//! This module serializes UI commands against the wizard controller, runs
//! backend requests off the command loop, and performs post-generation
//! processing (fetch, save, export). UI/CLI layers call into this module to
//! keep responsibilities separated.

mod controller;
mod post_process;

pub(crate) use controller::{run_controller, UiCommand};
pub(crate) use post_process::{build_outcome, process_generation, ProcessedDocument};
