#![forbid(unsafe_code)]

//! Command-line walkthrough of the tether engine.
//!
//! Each subcommand runs one scripted scenario against `tether-core` and
//! prints what the listeners observed. Logging goes to stderr through
//! `tracing-subscriber`; the report goes to stdout.

pub mod cli;
pub mod error;
pub mod scenarios;

pub use cli::{Cli, Commands, run, run_from_env};
pub use error::{DemoError, Result};
