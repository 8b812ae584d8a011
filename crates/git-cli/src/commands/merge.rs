use std::io::{self, Write};

use anyhow::{bail, Result};
use clap::Args;

use crate::facade::{self, merge::{MergeConfig, MergeOutcome}};
use crate::Cli;
use super::open_repo;

#[derive(Args)]
pub struct MergeArgs {
    /// Create a merge commit even when fast-forward is possible
    #[arg(long = "no-ff")]
    pub no_ff: bool,

    /// Only allow fast-forward merges (fail otherwise)
    #[arg(long)]
    pub ff_only: bool,

    /// Squash the merge into a single set of changes (don't commit)
    #[arg(long)]
    pub squash: bool,

    /// Abort the current in-progress merge
    #[arg(long)]
    pub abort: bool,

    /// Continue after resolving conflicts
    #[arg(long, name = "continue")]
    pub cont: bool,

    /// Perform the merge but don't create a commit
    #[arg(long = "no-commit")]
    pub no_commit: bool,

    /// Use the auto-generated message without launching an editor
    #[arg(long)]
    pub no_edit: bool,

    /// Merge commit message
    #[arg(short = 'm')]
    pub message: Option<String>,

    /// Merge strategy to use
    #[arg(short = 's', long = "strategy")]
    pub strategy: Option<String>,

    /// Pass option to the merge strategy
    #[arg(short = 'X', long = "strategy-option")]
    pub strategy_option: Vec<String>,

    /// Be verbose
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Be quiet
    #[arg(short, long)]
    pub quiet: bool,

    /// Show diffstat at end of merge
    #[arg(long)]
    pub stat: bool,

    /// Do not show diffstat at end of merge
    #[arg(long)]
    pub no_stat: bool,

    /// Open an editor for the merge message
    #[arg(short = 'e', long)]
    pub edit: bool,

    /// Allow merging unrelated histories
    #[arg(long)]
    pub allow_unrelated_histories: bool,

    /// Add Signed-off-by trailer
    #[arg(long)]
    pub signoff: bool,

    /// Run pre-merge and commit-msg hooks
    #[arg(long)]
    pub verify: bool,

    /// Bypass pre-merge and commit-msg hooks
    #[arg(long)]
    pub no_verify: bool,

    /// Branch(es) or commit(s) to merge
    #[arg(required_unless_present_any = ["abort", "continue"])]
    pub commit: Vec<String>,
}

pub fn run(args: &MergeArgs, cli: &Cli) -> Result<i32> {
    let mut repo = open_repo(cli)?;

    let stderr = io::stderr();
    let mut err = stderr.lock();
    let stdout = io::stdout();
    let mut out = stdout.lock();

    let _ = (args.no_edit, args.verbose, args.stat, args.no_stat, args.edit, args.signoff, args.verify, args.no_verify);

    if args.abort {
        facade::merge::abort(&mut repo)?;
        writeln!(err, "Merge aborted.")?;
        return Ok(0);
    }

    if args.cont {
        let outcome = facade::merge::cont(&mut repo)?;
        if let MergeOutcome::Continued { strategy_name, .. } = outcome {
            writeln!(out, "Merge made by the '{}' strategy.", strategy_name)?;
        }
        return Ok(0);
    }

    let config = MergeConfig {
        targets: args.commit.clone(),
        no_ff: args.no_ff,
        ff_only: args.ff_only,
        squash: args.squash,
        no_commit: args.no_commit,
        message: args.message.clone(),
        strategy: args.strategy.clone(),
        strategy_option: args.strategy_option.clone(),
        allow_unrelated_histories: args.allow_unrelated_histories,
    };

    match facade::merge::run(&mut repo, config) {
        Ok(MergeOutcome::AlreadyUpToDate) => {
            writeln!(err, "Already up to date.")?;
            Ok(0)
        }
        Ok(MergeOutcome::FastForward { from, to, diffstat }) => {
            writeln!(err, "Updating {}..{}", &from.to_hex()[..7], &to.to_hex()[..7])?;
            writeln!(err, "Fast-forward")?;
            print_diffstat(&diffstat, &mut err)?;
            Ok(0)
        }
        Ok(MergeOutcome::SquashedFastForward { .. }) => {
            writeln!(err, "Squash commit -- not updating HEAD")?;
            Ok(0)
        }
        Ok(MergeOutcome::FfOnlyFailed) => {
            writeln!(err, "fatal: Not possible to fast-forward, aborting.")?;
            Ok(128)
        }
        Ok(MergeOutcome::CleanMerge { strategy_name, diffstat, .. }) => {
            writeln!(err, "Merge made by the '{}' strategy.", strategy_name)?;
            print_diffstat(&diffstat, &mut err)?;
            Ok(0)
        }
        Ok(MergeOutcome::SquashedMerge { .. }) => {
            writeln!(err, "Squash commit -- not updating HEAD")?;
            Ok(0)
        }
        Ok(MergeOutcome::StoppedBeforeCommit) => {
            writeln!(err, "Automatic merge went well; stopped before committing as requested.")?;
            Ok(0)
        }
        Ok(MergeOutcome::Conflicts { conflicts }) => {
            for conflict in &conflicts {
                writeln!(err, "Auto-merging {}", conflict.path.to_str_lossy())?;
            }
            for conflict in &conflicts {
                writeln!(
                    err,
                    "CONFLICT ({}): Merge conflict in {}",
                    conflict_type_label(conflict),
                    conflict.path.to_str_lossy()
                )?;
            }
            writeln!(err, "Automatic merge failed; fix conflicts and then commit the result.")?;
            Ok(1)
        }
        Ok(MergeOutcome::Aborted) | Ok(MergeOutcome::Continued { .. }) => Ok(0),
        Err(e) => bail!(e),
    }
}

fn print_diffstat(diffstat: &Option<facade::merge::DiffSummary>, err: &mut impl Write) -> Result<()> {
    if let Some(stat) = diffstat {
        let mut parts = Vec::new();
        parts.push(format!(" {} file{} changed", stat.files, if stat.files != 1 { "s" } else { "" }));
        if stat.insertions > 0 {
            parts.push(format!("{} insertion{}", stat.insertions, if stat.insertions != 1 { "s(+)" } else { "(+)" }));
        }
        if stat.deletions > 0 {
            parts.push(format!("{} deletion{}", stat.deletions, if stat.deletions != 1 { "s(-)" } else { "(-)" }));
        }
        writeln!(err, "{}", parts.join(", "))?;
    }
    Ok(())
}

/// Human-readable label for a conflict type.
fn conflict_type_label(conflict: &git_merge::ConflictEntry) -> &'static str {
    match conflict.conflict_type {
        git_merge::ConflictType::Content => "content",
        git_merge::ConflictType::ModifyDelete => "modify/delete",
        git_merge::ConflictType::AddAdd => "add/add",
        git_merge::ConflictType::RenameRename => "rename/rename",
        git_merge::ConflictType::RenameDelete => "rename/delete",
        git_merge::ConflictType::DirectoryFile => "directory/file",
    }
}
