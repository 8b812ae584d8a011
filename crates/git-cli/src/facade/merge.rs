//! `merge` facade: three-way (or octopus) merge orchestration.
//!
//! Lifted from the former `commands::merge::run` body; `writeln!` calls on
//! stdout/stderr became pushes onto the returned outcome, and exit-code
//! `Result<i32>` returns became `MergeOutcome` variants for the caller to
//! translate into exit codes and printed lines.

use std::path::Path;

use bstr::{BString, ByteSlice, ByteVec};
use git_hash::ObjectId;
use git_index::{EntryFlags, Index, IndexEntry, Stage, StatData};
use git_merge::{ConflictEntry, ConflictStyle, ConflictType, MergeOptions, MergeStrategyType};
use git_object::{Commit, FileMode, Object};
use git_ref::reflog::{append_reflog_entry, ReflogEntry};
use git_ref::{RefName, Reference};
use git_revwalk::{merge_base_one, resolve_revision};
use git_utils::date::{GitDate, Signature};

use super::error::{FacadeError, FacadeResult};

pub struct MergeConfig {
    pub targets: Vec<String>,
    pub no_ff: bool,
    pub ff_only: bool,
    pub squash: bool,
    pub no_commit: bool,
    pub message: Option<String>,
    pub strategy: Option<String>,
    pub strategy_option: Vec<String>,
    pub allow_unrelated_histories: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DiffSummary {
    pub files: usize,
    pub insertions: usize,
    pub deletions: usize,
}

pub enum MergeOutcome {
    AlreadyUpToDate,
    FastForward {
        from: ObjectId,
        to: ObjectId,
        diffstat: Option<DiffSummary>,
    },
    SquashedFastForward {
        tree_oid: ObjectId,
        source: ObjectId,
    },
    FfOnlyFailed,
    CleanMerge {
        commit_oid: ObjectId,
        strategy_name: &'static str,
        diffstat: Option<DiffSummary>,
    },
    SquashedMerge {
        tree_oid: ObjectId,
        source: ObjectId,
    },
    StoppedBeforeCommit,
    Conflicts {
        conflicts: Vec<ConflictEntry>,
    },
    Aborted,
    Continued {
        commit_oid: ObjectId,
        strategy_name: &'static str,
    },
}

pub fn run(repo: &mut git_repository::Repository, config: MergeConfig) -> FacadeResult<MergeOutcome> {
    let merge_head_path = repo.git_dir().join("MERGE_HEAD");
    if merge_head_path.exists() {
        return Err(FacadeError::Message(
            "you have not concluded your merge (MERGE_HEAD exists).\nPlease, commit your changes before you merge.\nExiting because of unfinished merge.".into(),
        ));
    }

    let head_oid = repo
        .head_oid()?
        .ok_or_else(|| FacadeError::Message("cannot merge into an unborn branch".into()))?;

    if config.targets.is_empty() {
        return Err(FacadeError::Message("no commit specified to merge".into()));
    }

    let mut theirs_oids = Vec::new();
    for spec in &config.targets {
        theirs_oids.push(resolve_revision(repo, spec).map_err(|e| FacadeError::Message(e.to_string()))?);
    }

    if theirs_oids.len() >= 2 {
        return run_octopus_merge(&config, repo, &head_oid, &theirs_oids);
    }

    let theirs_oid = theirs_oids[0];

    if head_oid == theirs_oid {
        return Ok(MergeOutcome::AlreadyUpToDate);
    }

    let base_oid = merge_base_one(repo, &head_oid, &theirs_oid).map_err(|e| FacadeError::Message(e.to_string()))?;

    if let Some(ref base) = base_oid {
        if *base == theirs_oid {
            return Ok(MergeOutcome::AlreadyUpToDate);
        }
    }

    let theirs_label = &config.targets[0];

    let can_ff = matches!(base_oid, Some(ref base) if *base == head_oid);

    if can_ff && !config.no_ff {
        if config.squash {
            checkout_tree_to_working(repo, &theirs_oid)?;
            write_merge_msg(
                repo,
                &format!("Squashed commit of the following:\n\ncommit {}\n", theirs_oid.to_hex()),
            )?;
            return Ok(MergeOutcome::SquashedFastForward {
                tree_oid: commit_tree(repo, &theirs_oid)?,
                source: theirs_oid,
            });
        }

        let diffstat = compute_diffstat(repo, Some(&head_oid), &theirs_oid);

        update_head_to(repo, &theirs_oid)?;

        {
            let sig = get_signature("GIT_COMMITTER_NAME", "GIT_COMMITTER_EMAIL", "GIT_COMMITTER_DATE", repo)?;
            let entry = ReflogEntry {
                old_oid: head_oid,
                new_oid: theirs_oid,
                identity: sig,
                message: BString::from(format!("merge {}: Fast-forward", theirs_label)),
            };
            let head_ref = RefName::new(BString::from("HEAD"))?;
            append_reflog_entry(repo.git_dir(), &head_ref, &entry)?;
        }

        checkout_tree_to_working(repo, &theirs_oid)?;

        return Ok(MergeOutcome::FastForward {
            from: head_oid,
            to: theirs_oid,
            diffstat,
        });
    }

    if config.ff_only {
        return Ok(MergeOutcome::FfOnlyFailed);
    }

    save_orig_head(repo, &head_oid)?;

    let base = base_oid.unwrap_or(null_oid(repo));
    let options = build_merge_options(&config, repo)?;
    let merge_result = git_merge::strategy::dispatch_merge(repo, &head_oid, &theirs_oid, &base, &options)
        .map_err(FacadeError::Merge)?;

    if merge_result.is_clean {
        let tree_oid = merge_result
            .tree
            .ok_or_else(|| FacadeError::Message("clean merge produced no tree".into()))?;

        if config.squash {
            checkout_tree_to_working_from_tree(repo, &tree_oid)?;
            write_merge_msg(
                repo,
                &format!("Squashed commit of the following:\n\ncommit {}\n", theirs_oid.to_hex()),
            )?;
            return Ok(MergeOutcome::SquashedMerge {
                tree_oid,
                source: theirs_oid,
            });
        }

        if config.no_commit {
            checkout_tree_to_working_from_tree(repo, &tree_oid)?;
            write_merge_head(repo, &[theirs_oid])?;
            let msg = build_merge_message(&config, &[theirs_label.as_str()]);
            write_merge_msg(repo, &msg)?;
            return Ok(MergeOutcome::StoppedBeforeCommit);
        }

        let msg = build_merge_message(&config, &[theirs_label.as_str()]);
        let parents = vec![head_oid, theirs_oid];
        let commit_oid = create_merge_commit(repo, &tree_oid, &parents, &msg)?;

        update_head_to(repo, &commit_oid)?;

        {
            let sig = get_signature("GIT_COMMITTER_NAME", "GIT_COMMITTER_EMAIL", "GIT_COMMITTER_DATE", repo)?;
            let entry = ReflogEntry {
                old_oid: head_oid,
                new_oid: commit_oid,
                identity: sig,
                message: BString::from(format!(
                    "merge {}: Merge made by the '{}' strategy.",
                    theirs_label,
                    options.strategy.name()
                )),
            };
            let head_ref = RefName::new(BString::from("HEAD"))?;
            append_reflog_entry(repo.git_dir(), &head_ref, &entry)?;
        }

        checkout_tree_to_working_from_tree(repo, &tree_oid)?;
        let diffstat = compute_diffstat(repo, Some(&head_oid), &commit_oid);

        return Ok(MergeOutcome::CleanMerge {
            commit_oid,
            strategy_name: options.strategy.name(),
            diffstat,
        });
    }

    write_conflict_index(repo, &merge_result.conflicts)?;
    write_conflict_files(repo, &merge_result.conflicts, theirs_label)?;
    write_merge_head(repo, &[theirs_oid])?;
    let msg = build_merge_message(&config, &[theirs_label.as_str()]);
    write_merge_msg(repo, &msg)?;

    Ok(MergeOutcome::Conflicts {
        conflicts: merge_result.conflicts,
    })
}

pub fn abort(repo: &mut git_repository::Repository) -> FacadeResult<MergeOutcome> {
    let orig_head_path = repo.git_dir().join("ORIG_HEAD");
    if !orig_head_path.exists() {
        return Err(FacadeError::Message("There is no merge to abort (ORIG_HEAD missing).".into()));
    }

    let orig_head_hex = std::fs::read_to_string(&orig_head_path)?;
    let orig_head = ObjectId::from_hex(orig_head_hex.trim()).map_err(|e| FacadeError::Message(e.to_string()))?;

    update_head_to(repo, &orig_head)?;
    checkout_tree_to_working(repo, &orig_head)?;
    cleanup_merge_state(repo)?;

    Ok(MergeOutcome::Aborted)
}

pub fn cont(repo: &mut git_repository::Repository) -> FacadeResult<MergeOutcome> {
    let merge_head_path = repo.git_dir().join("MERGE_HEAD");
    if !merge_head_path.exists() {
        return Err(FacadeError::Message("There is no merge in progress (MERGE_HEAD missing).".into()));
    }

    {
        let index = repo.index()?;
        let conflicts = index.conflicts();
        if !conflicts.is_empty() {
            let paths: Vec<String> = conflicts.iter().map(|p| p.to_str_lossy().into_owned()).collect();
            return Err(FacadeError::Message(format!(
                "you need to resolve all merge conflicts before continuing.\nUnmerged paths:\n{}",
                paths.iter().map(|p| format!("\t{p}")).collect::<Vec<_>>().join("\n")
            )));
        }
    }

    let merge_head_content = std::fs::read_to_string(&merge_head_path)?;
    let mut theirs_oids = Vec::new();
    for line in merge_head_content.lines() {
        let trimmed = line.trim();
        if !trimmed.is_empty() {
            theirs_oids.push(ObjectId::from_hex(trimmed).map_err(|e| FacadeError::Message(e.to_string()))?);
        }
    }
    if theirs_oids.is_empty() {
        return Err(FacadeError::Message("MERGE_HEAD is empty".into()));
    }

    let head_oid = repo
        .head_oid()?
        .ok_or_else(|| FacadeError::Message("HEAD not found".into()))?;

    let index_path = repo.git_dir().join("index");
    let index = Index::read_from(&index_path)?;
    let tree_oid = index.write_tree(repo.odb())?;

    let merge_msg_path = repo.git_dir().join("MERGE_MSG");
    let msg = if merge_msg_path.exists() {
        std::fs::read_to_string(&merge_msg_path)?
    } else {
        format!("Merge commit '{}'", theirs_oids[0].to_hex())
    };

    let mut parents = vec![head_oid];
    parents.extend_from_slice(&theirs_oids);
    let commit_oid = create_merge_commit(repo, &tree_oid, &parents, &msg)?;

    update_head_to(repo, &commit_oid)?;
    cleanup_merge_state(repo)?;

    let strategy_name = repo
        .config()
        .get_string("merge.strategy")
        .ok()
        .flatten()
        .and_then(|s| MergeStrategyType::from_name(&s))
        .unwrap_or(MergeStrategyType::Ort)
        .name();

    Ok(MergeOutcome::Continued {
        commit_oid,
        strategy_name,
    })
}

fn run_octopus_merge(
    config: &MergeConfig,
    repo: &mut git_repository::Repository,
    head_oid: &ObjectId,
    theirs_oids: &[ObjectId],
) -> FacadeResult<MergeOutcome> {
    if config.ff_only {
        return Ok(MergeOutcome::FfOnlyFailed);
    }

    save_orig_head(repo, head_oid)?;

    let mut options = build_merge_options(config, repo)?;
    options.strategy = MergeStrategyType::Octopus;

    let mut current_oid = *head_oid;
    let mut merge_parents: Vec<ObjectId> = Vec::new();
    let mut remaining_heads: Vec<ObjectId> = Vec::new();

    for (i, theirs) in theirs_oids.iter().enumerate() {
        if i == 0 {
            let base = merge_base_one(repo, &current_oid, theirs).map_err(|e| FacadeError::Message(e.to_string()))?;
            let can_ff = matches!(base, Some(ref b) if *b == current_oid);
            if can_ff {
                current_oid = *theirs;
                merge_parents.push(*theirs);
            } else {
                merge_parents.push(current_oid);
                remaining_heads.push(*theirs);
            }
        } else {
            remaining_heads.push(*theirs);
        }
    }

    if remaining_heads.is_empty() {
        let tree_oid = commit_tree(repo, &current_oid)?;
        checkout_tree_to_working_from_tree(repo, &tree_oid)?;
        update_head_to(repo, &current_oid)?;
        return Ok(MergeOutcome::FastForward {
            from: *head_oid,
            to: current_oid,
            diffstat: None,
        });
    }

    let mut bases = Vec::new();
    for theirs in &remaining_heads {
        match merge_base_one(repo, &current_oid, theirs).map_err(|e| FacadeError::Message(e.to_string()))? {
            Some(b) => bases.push(b),
            None => bases.push(null_oid(repo)),
        }
    }

    let octopus = git_merge::strategy::octopus::OctopusStrategy;
    let merge_result = octopus
        .merge_multi(repo, &current_oid, &remaining_heads, &bases, &options)
        .map_err(FacadeError::Merge)?;

    let tree_oid = merge_result
        .tree
        .ok_or_else(|| FacadeError::Message("octopus merge produced no tree".into()))?;

    let labels: Vec<&str> = config.targets.iter().map(|s| s.as_str()).collect();
    let msg = build_merge_message(config, &labels);

    for h in &remaining_heads {
        merge_parents.push(*h);
    }
    let commit_oid = create_merge_commit(repo, &tree_oid, &merge_parents, &msg)?;

    update_head_to(repo, &commit_oid)?;

    {
        let sig = get_signature("GIT_COMMITTER_NAME", "GIT_COMMITTER_EMAIL", "GIT_COMMITTER_DATE", repo)?;
        let entry = ReflogEntry {
            old_oid: *head_oid,
            new_oid: commit_oid,
            identity: sig,
            message: BString::from(format!(
                "merge {}: Merge made by the 'octopus' strategy.",
                labels.join(", ")
            )),
        };
        let head_ref = RefName::new(BString::from("HEAD"))?;
        append_reflog_entry(repo.git_dir(), &head_ref, &entry)?;
    }

    checkout_tree_to_working_from_tree(repo, &tree_oid)?;

    Ok(MergeOutcome::CleanMerge {
        commit_oid,
        strategy_name: "octopus",
        diffstat: None,
    })
}

fn commit_tree(repo: &git_repository::Repository, commit_oid: &ObjectId) -> FacadeResult<ObjectId> {
    let obj = repo
        .odb()
        .read(commit_oid)?
        .ok_or_else(|| FacadeError::Message("commit not found".into()))?;
    match obj {
        Object::Commit(c) => Ok(c.tree),
        _ => Err(FacadeError::Message("expected commit".into())),
    }
}

fn null_oid(repo: &git_repository::Repository) -> ObjectId {
    match repo.hash_algo() {
        git_hash::HashAlgorithm::Sha1 => ObjectId::NULL_SHA1,
        git_hash::HashAlgorithm::Sha256 => ObjectId::NULL_SHA256,
    }
}

fn build_merge_options(config: &MergeConfig, repo: &git_repository::Repository) -> FacadeResult<MergeOptions> {
    let mut options = MergeOptions::default();

    if let Some(ref strategy_name) = config.strategy {
        match MergeStrategyType::from_name(strategy_name) {
            Some(st) => options.strategy = st,
            None => {
                return Err(FacadeError::Message(format!(
                    "Could not find merge strategy '{}'.\nAvailable strategies are: ort, recursive, ours, octopus.",
                    strategy_name
                )))
            }
        }
    } else if let Some(config_strategy) = repo.config().get_string("merge.strategy")?.as_deref() {
        if let Some(st) = MergeStrategyType::from_name(config_strategy) {
            options.strategy = st;
        }
    }

    options.strategy_options = config.strategy_option.clone();

    if let Some(style_name) = repo.config().get_string("merge.conflictStyle")?.as_deref() {
        if let Some(style) = ConflictStyle::from_name(style_name) {
            options.conflict_style = style;
        }
    }

    options.allow_unrelated_histories = config.allow_unrelated_histories;

    Ok(options)
}

fn build_merge_message(config: &MergeConfig, theirs_labels: &[&str]) -> String {
    if let Some(ref msg) = config.message {
        msg.clone()
    } else if theirs_labels.len() == 1 {
        format!("Merge branch '{}'\n", theirs_labels[0])
    } else {
        let quoted: Vec<String> = theirs_labels.iter().map(|l| format!("'{}'", l)).collect();
        format!("Merge branches {}\n", quoted.join(", "))
    }
}

fn create_merge_commit(
    repo: &git_repository::Repository,
    tree_oid: &ObjectId,
    parents: &[ObjectId],
    message: &str,
) -> FacadeResult<ObjectId> {
    let author = get_signature("GIT_AUTHOR_NAME", "GIT_AUTHOR_EMAIL", "GIT_AUTHOR_DATE", repo)?;
    let committer = get_signature("GIT_COMMITTER_NAME", "GIT_COMMITTER_EMAIL", "GIT_COMMITTER_DATE", repo)?;

    let commit = Commit {
        tree: *tree_oid,
        parents: parents.to_vec(),
        author,
        committer,
        encoding: None,
        gpgsig: None,
        extra_headers: Vec::new(),
        message: BString::from(message),
    };

    let obj = Object::Commit(commit);
    Ok(repo.odb().write(&obj)?)
}

fn update_head_to(repo: &git_repository::Repository, oid: &ObjectId) -> FacadeResult<()> {
    let head_ref = RefName::new(BString::from("HEAD"))?;
    match repo.refs().resolve(&head_ref)? {
        Some(Reference::Symbolic { target, .. }) => repo.refs().write_ref(&target, oid)?,
        _ => repo.refs().write_ref(&head_ref, oid)?,
    }
    Ok(())
}

fn save_orig_head(repo: &git_repository::Repository, oid: &ObjectId) -> FacadeResult<()> {
    let path = repo.git_dir().join("ORIG_HEAD");
    std::fs::write(path, format!("{}\n", oid.to_hex()))?;
    Ok(())
}

fn write_merge_head(repo: &git_repository::Repository, oids: &[ObjectId]) -> FacadeResult<()> {
    let path = repo.git_dir().join("MERGE_HEAD");
    let content: String = oids.iter().map(|o| format!("{}\n", o.to_hex())).collect();
    std::fs::write(path, content)?;
    Ok(())
}

fn write_merge_msg(repo: &git_repository::Repository, msg: &str) -> FacadeResult<()> {
    let path = repo.git_dir().join("MERGE_MSG");
    std::fs::write(path, msg)?;
    Ok(())
}

fn cleanup_merge_state(repo: &git_repository::Repository) -> FacadeResult<()> {
    let git_dir = repo.git_dir();
    for name in &["MERGE_HEAD", "MERGE_MSG", "ORIG_HEAD"] {
        let path = git_dir.join(name);
        if path.exists() {
            std::fs::remove_file(path)?;
        }
    }
    Ok(())
}

fn checkout_tree_to_working(repo: &mut git_repository::Repository, commit_oid: &ObjectId) -> FacadeResult<()> {
    let tree_oid = commit_tree(repo, commit_oid)?;
    checkout_tree_to_working_from_tree(repo, &tree_oid)
}

fn checkout_tree_to_working_from_tree(repo: &mut git_repository::Repository, tree_oid: &ObjectId) -> FacadeResult<()> {
    let work_tree = repo
        .work_tree()
        .ok_or_else(|| FacadeError::Message("this operation must be run in a work tree".into()))?
        .to_path_buf();

    let mut index_entries = Vec::new();
    checkout_tree_recursive(repo.odb(), tree_oid, &work_tree, &BString::from(""), &mut index_entries)?;

    let mut index = Index::new();
    for entry in index_entries {
        index.add(entry);
    }
    repo.set_index(index);
    repo.write_index()?;

    Ok(())
}

fn checkout_tree_recursive(
    odb: &git_odb::ObjectDatabase,
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
            let dir_path = work_tree.join(path.to_str_lossy().as_ref());
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

fn write_conflict_index(repo: &mut git_repository::Repository, conflicts: &[ConflictEntry]) -> FacadeResult<()> {
    let index = repo.index_mut()?;

    for conflict in conflicts {
        let path_bstr = &conflict.path;
        index.remove(path_bstr.as_ref(), Stage::Normal);

        if let Some(ref side) = conflict.base {
            index.add(IndexEntry {
                path: path_bstr.clone(),
                oid: side.oid,
                mode: side.mode,
                stage: Stage::Base,
                stat: StatData::default(),
                flags: EntryFlags::default(),
            });
        }
        if let Some(ref side) = conflict.ours {
            index.add(IndexEntry {
                path: path_bstr.clone(),
                oid: side.oid,
                mode: side.mode,
                stage: Stage::Ours,
                stat: StatData::default(),
                flags: EntryFlags::default(),
            });
        }
        if let Some(ref side) = conflict.theirs {
            index.add(IndexEntry {
                path: path_bstr.clone(),
                oid: side.oid,
                mode: side.mode,
                stage: Stage::Theirs,
                stat: StatData::default(),
                flags: EntryFlags::default(),
            });
        }
    }

    repo.write_index()?;
    Ok(())
}

fn write_conflict_files(
    repo: &git_repository::Repository,
    conflicts: &[ConflictEntry],
    theirs_label: &str,
) -> FacadeResult<()> {
    let work_tree = match repo.work_tree() {
        Some(wt) => wt.to_path_buf(),
        None => return Ok(()),
    };
    let odb = repo.odb();

    for conflict in conflicts {
        if conflict.conflict_type != ConflictType::Content {
            continue;
        }

        let path = work_tree.join(conflict.path.to_str_lossy().as_ref());

        let read_side = |side: &Option<git_merge::ConflictSide>| -> Vec<u8> {
            side.as_ref()
                .and_then(|s| odb.read(&s.oid).ok().flatten())
                .map(|obj| match obj {
                    Object::Blob(b) => b.data.to_vec(),
                    _ => Vec::new(),
                })
                .unwrap_or_default()
        };

        let ours_content = read_side(&conflict.ours);
        let theirs_content = read_side(&conflict.theirs);
        let base_content = read_side(&conflict.base);

        let merged = merge_with_markers(&base_content, &ours_content, &theirs_content, theirs_label);

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, merged)?;
    }

    Ok(())
}

fn merge_with_markers(base: &[u8], ours: &[u8], theirs: &[u8], theirs_label: &str) -> Vec<u8> {
    let base_lines: Vec<&str> = std::str::from_utf8(base).unwrap_or("").lines().collect();
    let ours_lines: Vec<&str> = std::str::from_utf8(ours).unwrap_or("").lines().collect();
    let theirs_lines: Vec<&str> = std::str::from_utf8(theirs).unwrap_or("").lines().collect();

    let mut result = String::new();
    let max_len = base_lines.len().max(ours_lines.len()).max(theirs_lines.len());

    let mut in_conflict = false;
    let mut ours_block: Vec<&str> = Vec::new();
    let mut theirs_block: Vec<&str> = Vec::new();

    let flush = |result: &mut String, ours_block: &mut Vec<&str>, theirs_block: &mut Vec<&str>| {
        result.push_str("<<<<<<< HEAD\n");
        for l in ours_block.iter() {
            result.push_str(l);
            result.push('\n');
        }
        result.push_str("=======\n");
        for l in theirs_block.iter() {
            result.push_str(l);
            result.push('\n');
        }
        result.push_str(&format!(">>>>>>> {}\n", theirs_label));
        ours_block.clear();
        theirs_block.clear();
    };

    for i in 0..max_len {
        let base_line = base_lines.get(i).copied().unwrap_or("");
        let ours_line = ours_lines.get(i).copied().unwrap_or("");
        let theirs_line = theirs_lines.get(i).copied().unwrap_or("");

        if ours_line == theirs_line {
            if in_conflict {
                flush(&mut result, &mut ours_block, &mut theirs_block);
                in_conflict = false;
            }
            result.push_str(ours_line);
            result.push('\n');
        } else if ours_line == base_line {
            if in_conflict {
                ours_block.push(ours_line);
                theirs_block.push(theirs_line);
            } else {
                result.push_str(theirs_line);
                result.push('\n');
            }
        } else if theirs_line == base_line {
            if in_conflict {
                ours_block.push(ours_line);
                theirs_block.push(theirs_line);
            } else {
                result.push_str(ours_line);
                result.push('\n');
            }
        } else {
            in_conflict = true;
            ours_block.push(ours_line);
            theirs_block.push(theirs_line);
        }
    }

    if in_conflict {
        flush(&mut result, &mut ours_block, &mut theirs_block);
    }

    result.into_bytes()
}

fn compute_diffstat(repo: &git_repository::Repository, from_oid: Option<&ObjectId>, to_oid: &ObjectId) -> Option<DiffSummary> {
    let odb = repo.odb();
    let from_tree = from_oid.and_then(|oid| {
        odb.read(oid).ok().flatten().and_then(|o| match o {
            Object::Commit(c) => Some(c.tree),
            _ => None,
        })
    });
    let to_tree = odb.read(to_oid).ok().flatten().and_then(|o| match o {
        Object::Commit(c) => Some(c.tree),
        _ => None,
    })?;

    let diff_opts = git_diff::DiffOptions::default();
    let result = git_diff::tree::diff_trees(odb, from_tree.as_ref(), Some(&to_tree), &diff_opts).ok()?;

    if result.is_empty() {
        return None;
    }

    Some(DiffSummary {
        files: result.num_files_changed(),
        insertions: result.insertions(),
        deletions: result.deletions(),
    })
}

fn get_signature(name_var: &str, email_var: &str, date_var: &str, repo: &git_repository::Repository) -> FacadeResult<Signature> {
    let name = std::env::var(name_var)
        .ok()
        .or_else(|| repo.config().get_string("user.name").ok().flatten())
        .unwrap_or_else(|| "Unknown".to_string());

    let email = std::env::var(email_var)
        .ok()
        .or_else(|| repo.config().get_string("user.email").ok().flatten())
        .unwrap_or_else(|| "unknown@unknown".to_string());

    let date = if let Ok(date_str) = std::env::var(date_var) {
        GitDate::parse_raw(&date_str).map_err(|e| FacadeError::Message(e.to_string()))?
    } else {
        GitDate::now()
    };

    Ok(Signature {
        name: BString::from(name),
        email: BString::from(email),
        date,
    })
}
