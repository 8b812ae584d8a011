use std::io;
use std::io::Write;

use anyhow::Result;
use clap::Args;

use crate::facade::{self, checkout::{CheckoutConfig, CheckoutOutcome}};
use crate::Cli;
use super::open_repo;

#[derive(Args)]
pub struct CheckoutArgs {
    /// Create a new branch and switch to it
    #[arg(short, long, value_name = "new-branch")]
    b: Option<String>,

    /// Create or reset a branch and switch to it
    #[arg(short = 'B', value_name = "new-branch")]
    force_b: Option<String>,

    /// Detach HEAD at the named commit
    #[arg(long)]
    detach: bool,

    /// Force checkout (discard local changes)
    #[arg(short, long)]
    force: bool,

    /// Target branch or commit
    target: Option<String>,
}

pub fn run(args: &CheckoutArgs, cli: &Cli) -> Result<i32> {
    let mut repo = open_repo(cli)?;
    let stderr = io::stderr();
    let mut err = stderr.lock();

    let _ = args.force;

    let (create, force_create) = match (&args.b, &args.force_b) {
        (Some(name), _) => (Some(name.clone()), false),
        (None, Some(name)) => (Some(name.clone()), true),
        (None, None) => (None, false),
    };

    let config = CheckoutConfig {
        create,
        force_create,
        detach: args.detach,
        target: args.target.clone(),
    };

    let outcome = facade::checkout::run(&mut repo, config)?;

    match outcome {
        CheckoutOutcome::NewBranch { name } => {
            writeln!(err, "Switched to a new branch '{}'", name)?;
        }
        CheckoutOutcome::SwitchedBranch { name } => {
            writeln!(err, "Switched to branch '{}'", name)?;
        }
        CheckoutOutcome::Detached { oid, target } => {
            writeln!(err, "HEAD is now at {} {}", &oid.to_hex()[..7], target)?;
        }
    }

    Ok(0)
}
