//! Octopus merge strategy.
//!
//! Merges 3+ branches simultaneously. Fails if any merge produces conflicts.

use bstr::BString;
use git_hash::ObjectId;
use git_object::{Commit, Object};
use git_repository::Repository;
use git_utils::date::{GitDate, Signature};

use crate::{MergeError, MergeOptions, MergeResult};
use super::MergeStrategy;

pub struct OctopusStrategy;

impl MergeStrategy for OctopusStrategy {
    fn merge(
        &self,
        repo: &mut Repository,
        ours: &ObjectId,
        theirs: &ObjectId,
        base: &ObjectId,
        options: &MergeOptions,
    ) -> Result<MergeResult, MergeError> {
        // Octopus merge for 2 heads falls back to ORT
        let ort = super::ort::OrtStrategy;
        let result = ort.merge(repo, ours, theirs, base, options)?;

        if !result.is_clean {
            return Err(MergeError::Conflict {
                path: bstr::BString::from("octopus merge failed: conflict detected"),
            });
        }

        Ok(result)
    }
}

impl OctopusStrategy {
    /// Merge `head` against each of `heads` in turn, one pairwise ORT merge
    /// per branch against its precomputed merge base. Each clean result is
    /// wrapped in a throwaway commit (never attached to a ref) so the next
    /// pairwise merge has a commit to read `ours`'s tree from. Stops and
    /// returns the first conflicting result, matching `merge`'s
    /// fail-on-conflict contract.
    pub fn merge_multi(
        &self,
        repo: &mut Repository,
        head: &ObjectId,
        heads: &[ObjectId],
        bases: &[ObjectId],
        options: &MergeOptions,
    ) -> Result<MergeResult, MergeError> {
        let ort = super::ort::OrtStrategy;
        let mut current = *head;

        for (theirs, base) in heads.iter().zip(bases.iter()) {
            let result = ort.merge(repo, &current, theirs, base, options)?;
            if !result.is_clean {
                return Ok(result);
            }

            let tree = result.tree.ok_or_else(|| MergeError::Conflict {
                path: BString::from("octopus merge produced no tree"),
            })?;

            let interim = Commit {
                tree,
                parents: vec![current, *theirs],
                author: Signature {
                    name: BString::from("octopus-merge"),
                    email: BString::from("octopus-merge@localhost"),
                    date: GitDate::now(),
                },
                committer: Signature {
                    name: BString::from("octopus-merge"),
                    email: BString::from("octopus-merge@localhost"),
                    date: GitDate::now(),
                },
                encoding: None,
                gpgsig: None,
                extra_headers: Vec::new(),
                message: BString::from("interim octopus merge step"),
            };
            current = repo.odb().write(&Object::Commit(interim))?;
        }

        let final_tree = match repo.odb().read(&current)? {
            Some(Object::Commit(c)) => c.tree,
            _ => {
                return Err(MergeError::Conflict {
                    path: BString::from("octopus merge lost its final tree"),
                })
            }
        };

        Ok(MergeResult::clean(final_tree))
    }
}
