use std::io::{self, Write};

use anyhow::Result;
use clap::Args;

use crate::facade::{self, fetch::FetchConfig};
use crate::facade::fetch::RefUpdateKind;
use crate::Cli;
use super::open_repo;

#[derive(Args)]
pub struct FetchArgs {
    /// Fetch all remotes
    #[arg(long)]
    pub all: bool,

    /// Prune remote-tracking refs that no longer exist
    #[arg(short, long)]
    pub prune: bool,

    /// Limit fetching to specified depth
    #[arg(long)]
    pub depth: Option<u32>,

    /// Fetch all tags
    #[arg(long)]
    pub tags: bool,

    /// Be quiet
    #[arg(short, long)]
    pub quiet: bool,

    /// Remote name
    pub remote: Option<String>,

    /// Refspecs to fetch
    pub refspec: Vec<String>,
}

pub fn run(args: &FetchArgs, cli: &Cli) -> Result<i32> {
    let repo = open_repo(cli)?;
    let stderr = io::stderr();
    let mut err = stderr.lock();

    let config = FetchConfig {
        remote: args.remote.clone(),
        refspec: args.refspec.clone(),
        depth: args.depth,
        tags: args.tags,
        prune: args.prune,
    };

    let outcome = facade::fetch::run(&repo, config)?;

    if !args.quiet {
        writeln!(err, "From {}", outcome.remote_url)?;
        for update in &outcome.updates {
            match update.kind {
                RefUpdateKind::NewBranch => {
                    writeln!(err, " * [new branch]      {} -> {}", update.source, update.dest)?;
                }
                RefUpdateKind::NewTag => {
                    writeln!(err, " * [new tag]         {}", update.dest)?;
                }
                RefUpdateKind::Updated => {}
                RefUpdateKind::Deleted => {
                    writeln!(err, " - [deleted]         {} -> {}", update.source, update.dest)?;
                }
            }
        }
    }

    Ok(0)
}
