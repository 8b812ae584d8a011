use std::io::{self, Write};

use anyhow::{bail, Result};
use clap::Args;
use git_protocol::push::PushRefResult;

use crate::facade::{self, push::{PushConfig, PushOutcome}};
use crate::Cli;
use super::open_repo;

#[derive(Args)]
pub struct PushArgs {
    /// Force push
    #[arg(short, long)]
    force: bool,

    /// Force push with lease (safer force push)
    #[arg(long)]
    force_with_lease: bool,

    /// Delete remote branches
    #[arg(short, long)]
    delete: bool,

    /// Push tags
    #[arg(long)]
    tags: bool,

    /// Set upstream tracking
    #[arg(short = 'u', long = "set-upstream")]
    set_upstream: bool,

    /// Atomic push
    #[arg(long)]
    atomic: bool,

    /// Dry run
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Push option to transmit
    #[arg(short = 'o', long = "push-option")]
    push_option: Vec<String>,

    /// Skip pre-push hook
    #[arg(long)]
    no_verify: bool,

    /// Be verbose
    #[arg(short, long)]
    verbose: bool,

    /// Show progress
    #[arg(long)]
    progress: bool,

    /// Push all branches
    #[arg(long)]
    all: bool,

    /// Mirror all refs
    #[arg(long)]
    mirror: bool,

    /// Use thin pack transfer
    #[arg(long)]
    thin: bool,

    /// Don't use thin pack transfer
    #[arg(long)]
    no_thin: bool,

    /// GPG sign the push
    #[arg(long, value_name = "mode")]
    signed: Option<String>,

    /// Recurse into submodules
    #[arg(long, value_name = "check|on-demand|only|no")]
    recurse_submodules: Option<String>,

    /// Remote name
    remote: Option<String>,

    /// Refspecs to push
    refspec: Vec<String>,
}

pub fn run(args: &PushArgs, cli: &Cli) -> Result<i32> {
    let repo = open_repo(cli)?;
    let stderr = io::stderr();
    let mut err = stderr.lock();

    let _ = (args.all, args.mirror, args.thin, args.no_thin, args.signed.as_ref(), args.recurse_submodules.as_ref(), args.no_verify);

    let config = PushConfig {
        remote: args.remote.clone(),
        refspec: args.refspec.clone(),
        force: args.force,
        force_with_lease: args.force_with_lease,
        delete: args.delete,
        tags: args.tags,
        set_upstream: args.set_upstream,
        atomic: args.atomic,
        dry_run: args.dry_run,
        push_option: args.push_option.clone(),
    };

    let outcome = facade::push::run(&repo, config)?;

    match outcome {
        PushOutcome::UpToDate => {
            writeln!(err, "Everything up-to-date")?;
            Ok(0)
        }
        PushOutcome::DryRun { updates } => {
            for update in &updates {
                writeln!(
                    err,
                    "Would push {} -> {}",
                    update.local_oid.map(|o| o.to_hex()).unwrap_or_else(|| "(delete)".to_string()),
                    update.remote_ref
                )?;
            }
            Ok(0)
        }
        PushOutcome::Pushed { push_url, updates, ref_results, upstream_set, ok } => {
            for (refname, status) in &ref_results {
                match status {
                    PushRefResult::Ok => {
                        if args.verbose {
                            writeln!(err, "   {} -> {} (ok)", refname, refname)?;
                        }
                    }
                    PushRefResult::Rejected(reason) => {
                        writeln!(err, " ! [rejected]        {} -> {} ({})", refname, refname, reason)?;
                    }
                    PushRefResult::Error(msg) => {
                        writeln!(err, " ! [error]           {} -> {} ({})", refname, refname, msg)?;
                    }
                }
            }

            if let Some((branch, remote)) = &upstream_set {
                writeln!(err, "branch '{}' set up to track '{}/{}'.", branch, remote, branch)?;
            }

            if ok {
                if !args.verbose {
                    writeln!(err, "To {}", push_url)?;
                    for update in &updates {
                        let local = update
                            .local_oid
                            .map(|o| format!("{}..{}", &o.to_hex()[..7], &o.to_hex()[..7]))
                            .unwrap_or_else(|| "[deleted]".to_string());
                        writeln!(err, "   {}  {} -> {}", local, update.remote_ref, update.remote_ref)?;
                    }
                }
                Ok(0)
            } else {
                bail!("failed to push some refs to '{}'", push_url);
            }
        }
    }
}
