use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use crate::facade::{self, clone::CloneConfig};
use crate::Cli;

#[derive(Args)]
pub struct CloneArgs {
    /// Create a shallow clone with a history truncated to the specified number of commits
    #[arg(long)]
    depth: Option<u32>,

    /// Checkout the specified branch instead of the remote HEAD
    #[arg(short, long, value_name = "name")]
    branch: Option<String>,

    /// Make a bare Git repository
    #[arg(long)]
    bare: bool,

    /// Be quiet, only report errors
    #[arg(short, long)]
    quiet: bool,

    /// Repository URL
    repository: String,

    /// Destination directory
    dest_dir: Option<String>,
}

pub fn run(args: &CloneArgs, _cli: &Cli) -> Result<i32> {
    let stderr = io::stderr();
    let mut err = stderr.lock();

    let dest = match &args.dest_dir {
        Some(d) => PathBuf::from(d),
        None => facade::clone::infer_directory(&args.repository)?,
    };

    if !args.quiet {
        writeln!(err, "Cloning into '{}'...", dest.display())?;
    }

    let config = CloneConfig {
        repository: args.repository.clone(),
        dest_dir: dest,
        depth: args.depth,
        branch: args.branch.clone(),
        bare: args.bare,
    };

    let outcome = facade::clone::run(config)?;

    if outcome.was_empty && !args.quiet {
        writeln!(err, "warning: You appear to have cloned an empty repository.")?;
    }

    Ok(0)
}
