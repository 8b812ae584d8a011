pub mod add;
pub mod checkout;
pub mod clone;
pub mod commit;
pub mod fetch;
pub mod init;
pub mod merge;
pub mod push;
pub mod status;

use anyhow::Result;
use clap::Subcommand;

use crate::Cli;

#[derive(Subcommand)]
pub enum Commands {
    /// Create an empty Git repository or reinitialize an existing one
    Init(init::InitArgs),
    /// Clone a repository into a new directory
    Clone(clone::CloneArgs),
    /// Add file contents to the index
    Add(add::AddArgs),
    /// Show the working tree status
    Status(status::StatusArgs),
    /// Switch branches or restore working tree files
    Checkout(checkout::CheckoutArgs),
    /// Record changes to the repository
    Commit(commit::CommitArgs),
    /// Join two or more development histories together
    Merge(merge::MergeArgs),
    /// Download objects and refs from another repository
    Fetch(fetch::FetchArgs),
    /// Update remote refs along with associated objects
    Push(push::PushArgs),
}

impl Commands {
    /// Get the command name as used in config keys (e.g., "commit", "merge").
    pub fn command_name(&self) -> &str {
        match self {
            Commands::Init(_) => "init",
            Commands::Clone(_) => "clone",
            Commands::Add(_) => "add",
            Commands::Status(_) => "status",
            Commands::Checkout(_) => "checkout",
            Commands::Commit(_) => "commit",
            Commands::Merge(_) => "merge",
            Commands::Fetch(_) => "fetch",
            Commands::Push(_) => "push",
        }
    }
}

/// Open a repository, respecting --git-dir override.
pub fn open_repo(cli: &Cli) -> Result<git_repository::Repository> {
    let repo = if let Some(ref git_dir) = cli.git_dir {
        git_repository::Repository::open(git_dir)?
    } else {
        git_repository::Repository::discover(".")?
    };
    Ok(repo)
}

pub fn run(cli: Cli) -> Result<i32> {
    match &cli.command {
        Commands::Init(args) => init::run(args, &cli),
        Commands::Clone(args) => clone::run(args, &cli),
        Commands::Add(args) => add::run(args, &cli),
        Commands::Status(args) => status::run(args, &cli),
        Commands::Checkout(args) => checkout::run(args, &cli),
        Commands::Commit(args) => commit::run(args, &cli),
        Commands::Merge(args) => merge::run(args, &cli),
        Commands::Fetch(args) => fetch::run(args, &cli),
        Commands::Push(args) => push::run(args, &cli),
    }
}
