//! `checkout` facade: resolve a branch or revision, materialize its tree into
//! the work tree and index, and move HEAD.
//!
//! The tree-materialization walk is shared by `clone`, `merge` (fast-forward
//! and merge-commit paths), and `checkout` itself, rather than each CLI
//! handler carrying its own copy of the recursion.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use bstr::{BString, ByteSlice, ByteVec};
use git_hash::ObjectId;
use git_index::{EntryFlags, Index, IndexEntry, Stage, StatData};
use git_object::{FileMode, Object};
use git_odb::ObjectDatabase;
use git_ref::reflog::{append_reflog_entry, ReflogEntry};
use git_ref::{RefName, RefStore};
use git_repository::Repository;

use super::error::{FacadeError, FacadeResult};

pub struct CheckoutConfig {
    /// Create a new branch named `create` (or reset it if `force_create`) starting at `target`.
    pub create: Option<String>,
    pub force_create: bool,
    /// Detach HEAD at `target` instead of switching to a branch.
    pub detach: bool,
    /// Branch name or revision to resolve `target` against; `HEAD` if absent.
    pub target: Option<String>,
}

pub enum CheckoutOutcome {
    SwitchedBranch { name: String },
    NewBranch { name: String },
    Detached { oid: ObjectId, target: String },
}

/// Resolve `config.target`, update the working tree and index to match it, and
/// move HEAD (symbolic for a branch, direct for a detached checkout).
pub fn run(repo: &mut Repository, config: CheckoutConfig) -> FacadeResult<CheckoutOutcome> {
    let old_head_oid = repo.head_oid()?.unwrap_or(match repo.hash_algo() {
        git_hash::HashAlgorithm::Sha1 => ObjectId::NULL_SHA1,
        git_hash::HashAlgorithm::Sha256 => ObjectId::NULL_SHA256,
    });
    let old_name = repo.current_branch()?.unwrap_or_else(|| {
        let hex = old_head_oid.to_hex();
        hex[..7.min(hex.len())].to_string()
    });

    if let Some(new_branch) = config.create.clone() {
        let start = config.target.as_deref().unwrap_or("HEAD");
        let oid = git_revwalk::resolve_revision(repo, start)
            .map_err(|e| FacadeError::Message(e.to_string()))?;

        let refname = RefName::new(BString::from(format!("refs/heads/{}", new_branch)))?;
        if !config.force_create && repo.refs().resolve(&refname)?.is_some() {
            return Err(FacadeError::Message(format!(
                "a branch named '{}' already exists",
                new_branch
            )));
        }
        repo.refs().write_ref(&refname, &oid)?;
        switch_to_branch(repo, &new_branch, &oid)?;
        write_checkout_reflog(repo, old_head_oid, oid, &old_name, &new_branch)?;
        return Ok(CheckoutOutcome::NewBranch { name: new_branch });
    }

    let target = config.target.unwrap_or_else(|| "HEAD".to_string());

    if config.detach {
        let oid = git_revwalk::resolve_revision(repo, &target)
            .map_err(|e| FacadeError::Message(e.to_string()))?;
        switch_to_detached(repo, &oid)?;
        write_checkout_reflog(repo, old_head_oid, oid, &old_name, &target)?;
        return Ok(CheckoutOutcome::Detached { oid, target });
    }

    let refname = RefName::new(BString::from(format!("refs/heads/{}", target)))?;
    if let Some(reference) = repo.refs().resolve(&refname)? {
        let oid = reference.peel_to_oid(repo.refs())?;
        switch_to_branch(repo, &target, &oid)?;
        write_checkout_reflog(repo, old_head_oid, oid, &old_name, &target)?;
        return Ok(CheckoutOutcome::SwitchedBranch { name: target });
    }

    let oid = git_revwalk::resolve_revision(repo, &target)
        .map_err(|e| FacadeError::Message(e.to_string()))?;
    switch_to_detached(repo, &oid)?;
    write_checkout_reflog(repo, old_head_oid, oid, &old_name, &target)?;
    Ok(CheckoutOutcome::Detached { oid, target })
}

fn switch_to_branch(repo: &mut Repository, branch: &str, oid: &ObjectId) -> FacadeResult<()> {
    checkout_commit_to_working(repo, oid)?;
    let head = RefName::new(BString::from("HEAD"))?;
    let branch_ref = RefName::new(BString::from(format!("refs/heads/{}", branch)))?;
    repo.refs().write_symbolic_ref(&head, &branch_ref)?;
    Ok(())
}

fn switch_to_detached(repo: &mut Repository, oid: &ObjectId) -> FacadeResult<()> {
    checkout_commit_to_working(repo, oid)?;
    let head = RefName::new(BString::from("HEAD"))?;
    repo.refs().write_ref(&head, oid)?;
    Ok(())
}

fn write_checkout_reflog(
    repo: &Repository,
    old_oid: ObjectId,
    new_oid: ObjectId,
    old_name: &str,
    new_name: &str,
) -> FacadeResult<()> {
    let sig = crate::commands::commit::get_signature(
        "GIT_COMMITTER_NAME",
        "GIT_COMMITTER_EMAIL",
        "GIT_COMMITTER_DATE",
        repo,
    )
    .map_err(|e| FacadeError::Message(e.to_string()))?;
    let entry = ReflogEntry {
        old_oid,
        new_oid,
        identity: sig,
        message: BString::from(format!("checkout: moving from {} to {}", old_name, new_name)),
    };
    let head_ref = RefName::new(BString::from("HEAD"))?;
    append_reflog_entry(repo.git_dir(), &head_ref, &entry)?;
    Ok(())
}

/// Write the tree of `commit_oid` into the work tree and replace the index
/// with entries matching what was written.
pub fn checkout_commit_to_working(repo: &mut Repository, commit_oid: &ObjectId) -> FacadeResult<()> {
    let obj = repo
        .odb()
        .read(commit_oid)?
        .ok_or_else(|| FacadeError::Message(format!("commit {} not found", commit_oid.to_hex())))?;

    let tree_oid = match obj {
        Object::Commit(c) => c.tree,
        other => {
            return Err(FacadeError::Message(format!(
                "expected commit, got {}",
                other.object_type()
            )))
        }
    };

    checkout_tree_to_working(repo, &tree_oid)
}

/// Write a tree directly into the work tree and replace the index to match.
pub fn checkout_tree_to_working(repo: &mut Repository, tree_oid: &ObjectId) -> FacadeResult<()> {
    let work_tree = repo
        .work_tree()
        .ok_or_else(|| FacadeError::Message("cannot checkout: bare repository".into()))?
        .to_path_buf();

    let old_paths: HashSet<BString> = match repo.index() {
        Ok(idx) => idx.iter().map(|e| e.path.clone()).collect(),
        Err(_) => HashSet::new(),
    };

    let mut index_entries = Vec::new();
    checkout_tree_recursive(
        repo.odb(),
        tree_oid,
        &work_tree,
        &BString::from(""),
        &mut index_entries,
    )?;

    let new_paths: HashSet<BString> = index_entries.iter().map(|e| e.path.clone()).collect();
    for old_path in old_paths.difference(&new_paths) {
        let fs_path = work_tree.join(old_path.to_str_lossy().as_ref());
        if fs_path.exists() {
            std::fs::remove_file(&fs_path)?;
        }
    }

    let mut index = Index::new();
    for entry in index_entries {
        index.add(entry);
    }
    repo.set_index(index);
    repo.write_index()?;

    Ok(())
}

fn checkout_tree_recursive(
    odb: &ObjectDatabase,
    tree_oid: &ObjectId,
    work_tree: &Path,
    prefix: &BString,
    entries: &mut Vec<IndexEntry>,
) -> FacadeResult<()> {
    let obj = odb
        .read(tree_oid)?
        .ok_or_else(|| FacadeError::Message(format!("tree {} not found", tree_oid.to_hex())))?;

    let tree = match obj {
        Object::Tree(t) => t,
        other => {
            return Err(FacadeError::Message(format!(
                "expected tree, got {}",
                other.object_type()
            )))
        }
    };

    for entry in tree.iter() {
        let path = if prefix.is_empty() {
            entry.name.clone()
        } else {
            let mut p = prefix.clone();
            p.push_byte(b'/');
            p.extend_from_slice(&entry.name);
            p
        };

        if entry.mode.is_tree() {
            let dir_path: PathBuf = work_tree.join(path.to_str_lossy().as_ref());
            std::fs::create_dir_all(&dir_path)?;
            checkout_tree_recursive(odb, &entry.oid, work_tree, &path, entries)?;
            continue;
        }

        let file_path = work_tree.join(path.to_str_lossy().as_ref());
        if let Some(parent) = file_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let blob_obj = odb
            .read(&entry.oid)?
            .ok_or_else(|| FacadeError::Message(format!("blob {} not found", entry.oid.to_hex())))?;

        let data = match blob_obj {
            Object::Blob(b) => b.data,
            other => {
                return Err(FacadeError::Message(format!(
                    "expected blob for {}, got {}",
                    path.to_str_lossy(),
                    other.object_type()
                )))
            }
        };

        if entry.mode == FileMode::Symlink {
            if file_path.exists() {
                std::fs::remove_file(&file_path)?;
            }
            #[cfg(unix)]
            {
                let target = String::from_utf8_lossy(&data);
                std::os::unix::fs::symlink(target.as_ref(), &file_path)?;
            }
            #[cfg(not(unix))]
            {
                std::fs::write(&file_path, &data)?;
            }
        } else {
            std::fs::write(&file_path, &data)?;

            #[cfg(unix)]
            if entry.mode == FileMode::Executable {
                use std::os::unix::fs::PermissionsExt;
                std::fs::set_permissions(&file_path, std::fs::Permissions::from_mode(0o755))?;
            }
        }

        let metadata = std::fs::symlink_metadata(&file_path)?;
        entries.push(IndexEntry {
            path,
            oid: entry.oid,
            mode: entry.mode,
            stage: Stage::Normal,
            stat: StatData::from_metadata(&metadata),
            flags: EntryFlags::default(),
        });
    }

    Ok(())
}
