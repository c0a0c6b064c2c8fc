//! # Headless scenario runner
//!
//! Runs the simulation core without a renderer: loads a template set,
//! spawns a small skirmish, ticks at a fixed rate, and reports the final
//! world state as JSON. Used for CI smoke verification and quick balance
//! checks.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod runner;

pub use runner::{run, RunConfig, RunReport};
