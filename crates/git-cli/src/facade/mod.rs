//! Command facade: orchestration functions shared by the CLI subcommands.
//!
//! Each function here takes an explicit config struct and returns an outcome
//! struct — no argument parsing, no `io::stdout`/`io::stderr` handles. The
//! `commands::*::run()` functions build a config from clap args, call the
//! matching facade function, then print from the outcome.

pub mod checkout;
pub mod clone;
pub mod commit;
pub mod error;
pub mod fetch;
pub mod init;
pub mod merge;
pub mod push;

pub use error::{FacadeError, FacadeResult};
