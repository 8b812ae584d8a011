use std::io::{self, Write};
use std::process::Command;

use anyhow::{bail, Result};
use bstr::{BString, ByteSlice};
use clap::Args;
use git_object::Commit;
use git_utils::date::{GitDate, Signature};

use crate::facade::{self, commit::CommitConfig};
use crate::Cli;
use super::open_repo;

#[derive(Args)]
pub struct CommitArgs {
    /// Use the given message as the commit message (can be specified multiple times)
    #[arg(short = 'm', num_args = 1)]
    message: Vec<String>,

    /// Automatically stage all tracked modified files before committing
    #[arg(short = 'a', long = "all")]
    all: bool,

    /// Replace the tip of the current branch by creating a new commit
    #[arg(long)]
    amend: bool,

    /// Allow creating a commit with no changes from the parent
    #[arg(long)]
    allow_empty: bool,

    /// Open an editor for the commit message
    #[arg(short = 'e', long = "edit")]
    edit: bool,

    /// With --amend, reuse the previous commit's message without editing
    #[arg(long)]
    no_edit: bool,

    /// Override the author (format: "Name <email>")
    #[arg(long, value_name = "author")]
    author: Option<String>,
}

pub fn run(args: &CommitArgs, cli: &Cli) -> Result<i32> {
    let mut repo = open_repo(cli)?;

    let prev_commit = if args.amend {
        match repo.head_oid()? {
            Some(oid) => match repo.odb().read(&oid)? {
                Some(git_object::Object::Commit(c)) => Some(c),
                _ => None,
            },
            None => None,
        }
    } else {
        None
    };

    let message = determine_message(args, prev_commit.as_ref())?;

    let author_override = match &args.author {
        Some(author_str) => Some(parse_author_override(author_str)?),
        None => None,
    };

    let author = get_signature("GIT_AUTHOR_NAME", "GIT_AUTHOR_EMAIL", "GIT_AUTHOR_DATE", &repo)?;
    let committer = get_signature("GIT_COMMITTER_NAME", "GIT_COMMITTER_EMAIL", "GIT_COMMITTER_DATE", &repo)?;

    let config = CommitConfig {
        message,
        author_override,
        author,
        committer,
        amend: args.amend,
        allow_empty: args.allow_empty,
        auto_stage: args.all,
    };

    let outcome = facade::commit::run(&mut repo, config)?;

    print_summary(&outcome, args.amend)?;

    Ok(0)
}

/// Determine the commit message from flags and editor.
fn determine_message(args: &CommitArgs, prev_commit: Option<&Commit>) -> Result<BString> {
    if args.no_edit && args.amend {
        if let Some(pc) = prev_commit {
            return Ok(pc.message.clone());
        }
        bail!("--no-edit requires --amend with an existing commit");
    }

    if !args.message.is_empty() {
        let combined = args.message.join("\n\n");
        let mut msg = combined;
        if !msg.ends_with('\n') {
            msg.push('\n');
        }

        if args.edit {
            return launch_editor(Some(&msg));
        }

        return Ok(BString::from(msg));
    }

    let template = if args.amend {
        prev_commit.map(|pc| {
            let msg: &[u8] = pc.message.as_ref();
            String::from_utf8_lossy(msg).to_string()
        })
    } else {
        None
    };

    launch_editor(template.as_deref())
}

/// Launch an editor to compose the commit message.
fn launch_editor(initial_content: Option<&str>) -> Result<BString> {
    let editor = std::env::var("GIT_EDITOR")
        .or_else(|_| std::env::var("EDITOR"))
        .unwrap_or_else(|_| "vi".to_string());

    let tmp_dir = std::env::temp_dir();
    let msg_path = tmp_dir.join("COMMIT_EDITMSG");

    let content = if let Some(initial) = initial_content {
        initial.to_string()
    } else {
        "\n# Enter the commit message for your changes.\n\
         # Lines starting with '#' will be ignored.\n"
            .to_string()
    };
    std::fs::write(&msg_path, &content)?;

    let status = Command::new(&editor)
        .arg(&msg_path)
        .status()
        .map_err(|e| anyhow::anyhow!("failed to launch editor '{}': {}", editor, e))?;

    if !status.success() {
        bail!("editor '{}' exited with non-zero status", editor);
    }

    let raw = std::fs::read_to_string(&msg_path)?;
    let filtered: Vec<&str> = raw.lines().filter(|line| !line.starts_with('#')).collect();
    let mut message = filtered.join("\n");

    if !message.ends_with('\n') {
        message.push('\n');
    }

    let _ = std::fs::remove_file(&msg_path);

    Ok(BString::from(message))
}

/// Print the commit summary.
fn print_summary(outcome: &facade::commit::CommitOutcome, is_amend: bool) -> Result<()> {
    let stderr = io::stderr();
    let mut err = stderr.lock();

    let hex = outcome.oid.to_hex();
    let short_sha = &hex[..7.min(hex.len())];

    let branch_name = match &outcome.branch_name {
        Some(name) if outcome.is_initial => format!("{} (root-commit)", name),
        Some(name) => name.clone(),
        None if outcome.is_initial => "(root-commit)".to_string(),
        None => format!("(HEAD detached at {})", short_sha),
    };

    writeln!(err, "[{} {}] {}", branch_name, short_sha, outcome.summary.to_str_lossy())?;

    let _ = is_amend;

    if let Some(diffstat) = &outcome.diffstat {
        let mut parts = Vec::new();
        parts.push(format!(
            " {} file{} changed",
            diffstat.files,
            if diffstat.files != 1 { "s" } else { "" }
        ));
        if diffstat.insertions > 0 {
            parts.push(format!(
                "{} insertion{}",
                diffstat.insertions,
                if diffstat.insertions != 1 { "s(+)" } else { "(+)" }
            ));
        }
        if diffstat.deletions > 0 {
            parts.push(format!(
                "{} deletion{}",
                diffstat.deletions,
                if diffstat.deletions != 1 { "s(-)" } else { "(-)" }
            ));
        }
        writeln!(err, "{}", parts.join(", "))?;
    }

    Ok(())
}

/// Parse --author="Name <email>" override.
fn parse_author_override(author_str: &str) -> Result<Signature> {
    let gt_pos = author_str
        .rfind('>')
        .ok_or_else(|| anyhow::anyhow!("invalid --author format, expected 'Name <email>'"))?;
    let lt_pos = author_str[..gt_pos]
        .rfind('<')
        .ok_or_else(|| anyhow::anyhow!("invalid --author format, expected 'Name <email>'"))?;

    let name = author_str[..lt_pos].trim();
    let email = &author_str[lt_pos + 1..gt_pos];

    Ok(Signature {
        name: BString::from(name),
        email: BString::from(email),
        date: GitDate::now(),
    })
}

/// Build a Signature from environment variables or config.
pub(crate) fn get_signature(
    name_var: &str,
    email_var: &str,
    date_var: &str,
    repo: &git_repository::Repository,
) -> Result<Signature> {
    let name = std::env::var(name_var)
        .ok()
        .or_else(|| repo.config().get_string("user.name").ok().flatten())
        .unwrap_or_else(|| "Unknown".to_string());

    let email = std::env::var(email_var)
        .ok()
        .or_else(|| repo.config().get_string("user.email").ok().flatten())
        .unwrap_or_else(|| "unknown@unknown".to_string());

    let date = if let Ok(date_str) = std::env::var(date_var) {
        GitDate::parse_raw(&date_str)?
    } else {
        GitDate::now()
    };

    Ok(Signature {
        name: BString::from(name),
        email: BString::from(email),
        date,
    })
}
