//! Command line interface module
//!
//! This module provides argument parsing and the runner that wires the daemon
//! configuration, the Docker client and the image mover together.

pub mod args;
pub mod runner;

pub use args::Args;
pub use runner::Runner;
