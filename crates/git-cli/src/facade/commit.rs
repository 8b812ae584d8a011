//! `commit` facade: write the index as a tree, create a commit object, move
//! HEAD, and run the commit hook sequence.

use std::path::Path;

use bstr::{BString, ByteSlice};
use git_hash::ObjectId;
use git_index::{EntryFlags, Index, IndexEntry, Stage, StatData};
use git_object::{Commit, FileMode, Object, ObjectType};
use git_ref::reflog::{append_reflog_entry, ReflogEntry};
use git_ref::{RefName, Reference};
use git_repository::hooks::{HookRunner, HookType};
use git_repository::Repository;
use git_utils::date::Signature;

use super::error::{FacadeError, FacadeResult};

pub struct CommitConfig {
    pub message: BString,
    pub author_override: Option<Signature>,
    pub author: Signature,
    pub committer: Signature,
    pub amend: bool,
    pub allow_empty: bool,
    pub auto_stage: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DiffStat {
    pub files: usize,
    pub insertions: usize,
    pub deletions: usize,
}

pub struct CommitOutcome {
    pub oid: ObjectId,
    pub is_initial: bool,
    pub branch_name: Option<String>,
    pub summary: BString,
    pub diffstat: Option<DiffStat>,
}

pub fn run(repo: &mut Repository, config: CommitConfig) -> FacadeResult<CommitOutcome> {
    {
        let index = repo.index()?;
        if !index.conflicts().is_empty() {
            return Err(FacadeError::Message(
                "cannot commit: you have unmerged paths.\nfix conflicts and then commit the result."
                    .into(),
            ));
        }
    }

    let work_tree = repo
        .work_tree()
        .ok_or_else(|| FacadeError::Message("cannot commit in a bare repository".into()))?
        .to_path_buf();

    if config.auto_stage {
        auto_stage_tracked(repo, &work_tree)?;
    }

    let hooks = HookRunner::new(repo);
    let pre_commit = hooks.run_or_ok(HookType::PreCommit, &[], None)?;
    if !pre_commit.success() {
        return Err(FacadeError::Message("pre-commit hook failed".into()));
    }

    let index_path = repo.git_dir().join("index");
    let index = Index::read_from(&index_path)?;
    let tree_oid = index.write_tree(repo.odb())?;

    let is_unborn = repo.is_unborn()?;
    let mut parents: Vec<ObjectId> = Vec::new();
    let mut prev_commit: Option<Commit> = None;

    if config.amend {
        if is_unborn {
            return Err(FacadeError::Message("cannot amend: no existing commit to amend".into()));
        }
        let head_oid = repo
            .head_oid()?
            .ok_or_else(|| FacadeError::Message("HEAD does not point to a valid commit".into()))?;
        let head_obj = repo
            .odb()
            .read(&head_oid)?
            .ok_or_else(|| FacadeError::Message("failed to read HEAD commit object".into()))?;
        let commit = match head_obj {
            Object::Commit(c) => c,
            _ => return Err(FacadeError::Message("HEAD does not point to a commit object".into())),
        };
        parents = commit.parents.clone();
        prev_commit = Some(commit);
    } else if !is_unborn {
        if let Some(head_oid) = repo.head_oid()? {
            parents.push(head_oid);
        }
    }

    if !config.allow_empty && !config.amend && !is_unborn {
        if let Some(parent_oid) = parents.first() {
            let parent_obj = repo
                .odb()
                .read(parent_oid)?
                .ok_or_else(|| FacadeError::Message("failed to read parent commit".into()))?;
            if let Object::Commit(parent_commit) = parent_obj {
                if parent_commit.tree == tree_oid {
                    return Err(FacadeError::Message(
                        "nothing to commit, working tree clean\n(use --allow-empty to override)"
                            .into(),
                    ));
                }
            }
        }
    }

    let author = if let Some(a) = config.author_override {
        a
    } else if config.amend {
        prev_commit
            .as_ref()
            .map(|pc| pc.author.clone())
            .unwrap_or(config.author)
    } else {
        config.author
    };

    let message = {
        let commit_msg_hook_path = repo.git_dir().join("hooks").join(HookType::CommitMsg.name());
        if commit_msg_hook_path.exists() {
            let tmp = tempfile::NamedTempFile::new()?;
            std::fs::write(tmp.path(), config.message.as_slice())?;
            let tmp_path_str = tmp.path().to_string_lossy().to_string();
            let result = hooks.run_or_ok(HookType::CommitMsg, &[&tmp_path_str], None)?;
            if !result.success() {
                return Err(FacadeError::Message("commit-msg hook failed".into()));
            }
            BString::from(std::fs::read(tmp.path())?)
        } else {
            config.message
        }
    };

    if message.trim().is_empty() {
        return Err(FacadeError::Message("Aborting commit due to empty commit message.".into()));
    }

    let commit = Commit {
        tree: tree_oid,
        parents,
        author,
        committer: config.committer,
        encoding: None,
        gpgsig: None,
        extra_headers: Vec::new(),
        message,
    };

    let obj = Object::Commit(commit.clone());
    let commit_oid = repo.odb().write(&obj)?;

    let old_head_oid = repo.head_oid()?.unwrap_or(match repo.hash_algo() {
        git_hash::HashAlgorithm::Sha1 => ObjectId::NULL_SHA1,
        git_hash::HashAlgorithm::Sha256 => ObjectId::NULL_SHA256,
    });
    update_head(repo, &commit_oid)?;

    let reflog_msg = if is_unborn {
        format!("commit (initial): {}", commit.summary().to_str_lossy())
    } else if config.amend {
        format!("commit (amend): {}", commit.summary().to_str_lossy())
    } else {
        format!("commit: {}", commit.summary().to_str_lossy())
    };
    let entry = ReflogEntry {
        old_oid: old_head_oid,
        new_oid: commit_oid,
        identity: commit.committer.clone(),
        message: BString::from(reflog_msg),
    };
    let head_ref = RefName::new(BString::from("HEAD"))?;
    append_reflog_entry(repo.git_dir(), &head_ref, &entry)?;

    let _ = hooks.run_or_ok(HookType::PostCommit, &[], None);

    let branch_name = repo.current_branch()?;
    let diffstat = compute_diffstat(repo, commit.first_parent(), &commit.tree);

    Ok(CommitOutcome {
        oid: commit_oid,
        is_initial: is_unborn,
        branch_name,
        summary: commit.summary().to_vec().into(),
        diffstat,
    })
}

fn auto_stage_tracked(repo: &mut Repository, work_tree: &Path) -> FacadeResult<()> {
    let _ = repo.index_mut()?;

    let entries_to_update: Vec<(String, bool)> = {
        let index = repo.index()?;
        index
            .iter()
            .filter(|e| e.stage == Stage::Normal)
            .map(|entry| {
                let path_str = entry.path.to_str_lossy().to_string();
                let file_exists = work_tree.join(&path_str).exists();
                (path_str, file_exists)
            })
            .collect()
    };

    let mut changed = false;

    for (path_str, file_exists) in &entries_to_update {
        let file_path = work_tree.join(path_str);

        if !file_exists {
            let bpath = bstr::BStr::new(path_str.as_bytes());
            repo.index_mut()?.remove(bpath, Stage::Normal);
            changed = true;
            continue;
        }

        let meta = std::fs::metadata(&file_path)?;
        let needs_update = {
            let index = repo.index()?;
            match index.get(bstr::BStr::new(path_str.as_bytes()), Stage::Normal) {
                Some(entry) => !entry.stat.matches(&meta),
                None => false,
            }
        };

        if needs_update {
            let data = std::fs::read(&file_path)?;
            let oid = repo.odb().write_raw(ObjectType::Blob, &data)?;
            let mode = if is_executable(&meta) {
                FileMode::Executable
            } else {
                FileMode::Regular
            };

            repo.index_mut()?.add(IndexEntry {
                path: BString::from(path_str.as_str()),
                oid,
                mode,
                stage: Stage::Normal,
                stat: StatData::from_metadata(&meta),
                flags: EntryFlags::default(),
            });
            changed = true;
        }
    }

    if changed {
        repo.write_index()?;
    }

    Ok(())
}

fn update_head(repo: &Repository, commit_oid: &ObjectId) -> FacadeResult<()> {
    let refs = repo.refs();
    let head_ref = RefName::new("HEAD")?;

    match refs.resolve(&head_ref)? {
        Some(Reference::Symbolic { target, .. }) => refs.write_ref(&target, commit_oid)?,
        Some(Reference::Direct { .. }) | None => refs.write_ref(&head_ref, commit_oid)?,
    }

    Ok(())
}

fn compute_diffstat(
    repo: &Repository,
    parent: Option<&ObjectId>,
    tree: &ObjectId,
) -> Option<DiffStat> {
    let parent_tree = parent.and_then(|p| {
        repo.odb().read(p).ok().flatten().and_then(|o| match o {
            Object::Commit(c) => Some(c.tree),
            _ => None,
        })
    });

    let diff_opts = git_diff::DiffOptions::default();
    let result = git_diff::tree::diff_trees(repo.odb(), parent_tree.as_ref(), Some(tree), &diff_opts).ok()?;

    if result.is_empty() {
        return None;
    }

    Some(DiffStat {
        files: result.num_files_changed(),
        insertions: result.insertions(),
        deletions: result.deletions(),
    })
}

#[cfg(unix)]
fn is_executable(meta: &std::fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn is_executable(_meta: &std::fs::Metadata) -> bool {
    false
}
