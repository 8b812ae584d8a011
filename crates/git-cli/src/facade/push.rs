//! `push` facade: negotiate and upload objects to a remote, update its refs.

use std::collections::HashSet;
use std::io::Write;

use bstr::{BString, ByteSlice};
use git_config::types::PushDefault;
use git_hash::ObjectId;
use git_protocol::push::{PushOptions as ProtoPushOptions, PushRefResult, PushUpdate};
use git_protocol::remote::RemoteConfig;
use git_ref::RefName;
use git_transport::Service;

use super::error::{FacadeError, FacadeResult};

pub struct PushConfig {
    pub remote: Option<String>,
    pub refspec: Vec<String>,
    pub force: bool,
    pub force_with_lease: bool,
    pub delete: bool,
    pub tags: bool,
    pub set_upstream: bool,
    pub atomic: bool,
    pub dry_run: bool,
    pub push_option: Vec<String>,
}

pub enum PushOutcome {
    UpToDate,
    DryRun {
        updates: Vec<PushUpdate>,
    },
    Pushed {
        push_url: String,
        updates: Vec<PushUpdate>,
        ref_results: Vec<(String, PushRefResult)>,
        upstream_set: Option<(String, String)>,
        ok: bool,
    },
}

pub fn run(repo: &git_repository::Repository, config: PushConfig) -> FacadeResult<PushOutcome> {
    let remote_name = if let Some(ref name) = config.remote {
        name.clone()
    } else if let Ok(Some(branch)) = repo.current_branch() {
        let key = format!("branch.{}.remote", branch);
        repo.config().get_string(&key)?.unwrap_or_else(|| "origin".to_string())
    } else {
        "origin".to_string()
    };

    let remote_config = RemoteConfig::from_config(repo.config(), &remote_name)?
        .ok_or_else(|| FacadeError::Message(format!("'{}' does not appear to be a git repository", remote_name)))?;

    let push_url_str = remote_config.push_url().to_string();
    let url = git_transport::GitUrl::parse(&push_url_str).map_err(FacadeError::Transport)?;
    let mut transport = git_transport::connect(&url, Service::ReceivePack).map_err(FacadeError::Transport)?;

    let reader = &mut git_protocol::pktline::PktLineReader::new(transport.reader());
    let (advertised_refs, capabilities) =
        git_protocol::v1::parse_ref_advertisement(reader).map_err(FacadeError::Protocol)?;

    let updates = resolve_push_updates(repo, &config, &advertised_refs)?;

    if updates.is_empty() {
        return Ok(PushOutcome::UpToDate);
    }

    if config.dry_run {
        return Ok(PushOutcome::DryRun { updates });
    }

    let local_oids: Vec<ObjectId> = updates.iter().filter_map(|u| u.local_oid).collect();
    let remote_oids: Vec<ObjectId> = advertised_refs.iter().map(|(oid, _)| *oid).collect();
    let objects_to_send = git_protocol::push::compute_push_objects(&local_oids, &remote_oids);

    let pack_data = if objects_to_send.is_empty() {
        Vec::new()
    } else {
        build_pack_data(repo, &objects_to_send)?
    };

    let push_opts = ProtoPushOptions {
        progress: false,
        atomic: config.atomic,
        push_options: config.push_option.clone(),
        thin: true,
    };

    let result = git_protocol::push::push(
        transport.as_mut(),
        &advertised_refs,
        &capabilities,
        &updates,
        &pack_data,
        &push_opts,
    )
    .map_err(FacadeError::Protocol)?;

    let upstream_set = if config.set_upstream {
        if let Ok(Some(branch)) = repo.current_branch() {
            set_upstream_config(repo, &branch, &remote_name)?;
            Some((branch, remote_name.clone()))
        } else {
            None
        }
    } else {
        None
    };

    Ok(PushOutcome::Pushed {
        push_url: push_url_str,
        updates,
        ref_results: result.ref_results,
        upstream_set,
        ok: result.ok,
    })
}

fn resolve_push_updates(
    repo: &git_repository::Repository,
    config: &PushConfig,
    advertised_refs: &[(ObjectId, BString)],
) -> FacadeResult<Vec<PushUpdate>> {
    let mut updates = Vec::new();

    if !config.refspec.is_empty() {
        for spec in &config.refspec {
            if config.delete || spec.starts_with(':') {
                let remote_ref = spec.trim_start_matches(':');
                let remote_full = if remote_ref.starts_with("refs/") {
                    remote_ref.to_string()
                } else {
                    format!("refs/heads/{}", remote_ref)
                };
                updates.push(PushUpdate {
                    local_oid: None,
                    remote_ref: remote_full,
                    force: config.force,
                    expected_remote_oid: None,
                });
            } else if let Some((src, dst)) = spec.split_once(':') {
                let local_ref = if src.starts_with("refs/") {
                    src.to_string()
                } else {
                    format!("refs/heads/{}", src)
                };
                let remote_ref = if dst.starts_with("refs/") {
                    dst.to_string()
                } else {
                    format!("refs/heads/{}", dst)
                };
                let oid = resolve_ref_oid(repo, &local_ref)?;
                updates.push(PushUpdate {
                    local_oid: Some(oid),
                    remote_ref,
                    force: config.force,
                    expected_remote_oid: if config.force_with_lease {
                        find_remote_oid(advertised_refs, &local_ref)
                    } else {
                        None
                    },
                });
            } else {
                let refname = if spec.starts_with("refs/") {
                    spec.to_string()
                } else {
                    format!("refs/heads/{}", spec)
                };
                let oid = resolve_ref_oid(repo, &refname)?;
                updates.push(PushUpdate {
                    local_oid: Some(oid),
                    remote_ref: refname,
                    force: config.force,
                    expected_remote_oid: None,
                });
            }
        }
    } else {
        let push_default = repo
            .config()
            .get_string("push.default")?
            .and_then(|v| PushDefault::from_config(&v).ok())
            .unwrap_or(PushDefault::Simple);

        match push_default {
            PushDefault::Nothing => {
                return Err(FacadeError::Message(
                    "No configured push destination.\nSpecify the remote and refspec.".into(),
                ));
            }
            PushDefault::Current => {
                if let Some(branch) = repo.current_branch()? {
                    let refname = format!("refs/heads/{}", branch);
                    let oid = resolve_ref_oid(repo, &refname)?;
                    updates.push(PushUpdate {
                        local_oid: Some(oid),
                        remote_ref: refname,
                        force: config.force,
                        expected_remote_oid: None,
                    });
                }
            }
            PushDefault::Upstream | PushDefault::Simple => {
                if let Some(branch) = repo.current_branch()? {
                    let local_ref = format!("refs/heads/{}", branch);
                    let remote_ref = if push_default == PushDefault::Simple {
                        local_ref.clone()
                    } else {
                        let merge_key = format!("branch.{}.merge", branch);
                        repo.config().get_string(&merge_key)?.unwrap_or_else(|| local_ref.clone())
                    };
                    let oid = resolve_ref_oid(repo, &local_ref)?;
                    updates.push(PushUpdate {
                        local_oid: Some(oid),
                        remote_ref,
                        force: config.force,
                        expected_remote_oid: None,
                    });
                }
            }
            PushDefault::Matching => {
                if let Ok(iter) = repo.refs().iter(Some("refs/heads/")) {
                    for r in iter.flatten() {
                        let name = r.name().as_str().to_string();
                        if find_remote_oid(advertised_refs, &name).is_some() {
                            if let Some(oid) = r.target_oid() {
                                updates.push(PushUpdate {
                                    local_oid: Some(oid),
                                    remote_ref: name,
                                    force: config.force,
                                    expected_remote_oid: None,
                                });
                            }
                        }
                    }
                }
            }
        }
    }

    if config.tags {
        if let Ok(iter) = repo.refs().iter(Some("refs/tags/")) {
            for r in iter.flatten() {
                if let Some(oid) = r.target_oid() {
                    let name = r.name().as_str().to_string();
                    if find_remote_oid(advertised_refs, &name).is_none() {
                        updates.push(PushUpdate {
                            local_oid: Some(oid),
                            remote_ref: name,
                            force: false,
                            expected_remote_oid: None,
                        });
                    }
                }
            }
        }
    }

    Ok(updates)
}

fn resolve_ref_oid(repo: &git_repository::Repository, refname: &str) -> FacadeResult<ObjectId> {
    let name = RefName::new(BString::from(refname))?;
    repo.refs()
        .resolve_to_oid(&name)?
        .ok_or_else(|| FacadeError::Message(format!("src refspec {} does not match any", refname)))
}

fn find_remote_oid(advertised_refs: &[(ObjectId, BString)], refname: &str) -> Option<ObjectId> {
    advertised_refs
        .iter()
        .find(|(_, name)| name.to_str_lossy() == refname)
        .map(|(oid, _)| *oid)
}

fn set_upstream_config(repo: &git_repository::Repository, branch: &str, remote: &str) -> FacadeResult<()> {
    let config_path = repo.git_dir().join("config");
    let mut content = std::fs::read_to_string(&config_path).unwrap_or_default();

    let section = format!("[branch \"{}\"]", branch);
    if !content.contains(&section) {
        content.push_str(&format!(
            "\n{}\n\tremote = {}\n\tmerge = refs/heads/{}\n",
            section, remote, branch
        ));
    }
    std::fs::write(&config_path, content)?;
    Ok(())
}

fn build_pack_data(repo: &git_repository::Repository, objects: &[ObjectId]) -> FacadeResult<Vec<u8>> {
    let mut all_oids = Vec::new();
    let mut seen = HashSet::new();

    fn walk_tree(
        odb: &git_odb::ObjectDatabase,
        oid: &ObjectId,
        all_oids: &mut Vec<ObjectId>,
        seen: &mut HashSet<ObjectId>,
    ) -> FacadeResult<()> {
        if !seen.insert(*oid) {
            return Ok(());
        }
        all_oids.push(*oid);
        if let Some(git_object::Object::Tree(tree)) = odb.read(oid)? {
            for entry in tree.iter() {
                walk_tree(odb, &entry.oid, all_oids, seen)?;
            }
        }
        Ok(())
    }

    for oid in objects {
        if !seen.insert(*oid) {
            continue;
        }
        all_oids.push(*oid);
        if let Some(git_object::Object::Commit(c)) = repo.odb().read(oid)? {
            walk_tree(repo.odb(), &c.tree, &mut all_oids, &mut seen)?;
        }
    }

    let mut pack = Vec::new();
    pack.extend_from_slice(b"PACK");
    pack.extend_from_slice(&2u32.to_be_bytes());
    pack.extend_from_slice(&(all_oids.len() as u32).to_be_bytes());

    for oid in &all_oids {
        if let Some(obj) = repo.odb().read(oid)? {
            let content = obj.serialize_content();
            let obj_type_num: u8 = match obj.object_type() {
                git_object::ObjectType::Commit => 1,
                git_object::ObjectType::Tree => 2,
                git_object::ObjectType::Blob => 3,
                git_object::ObjectType::Tag => 4,
            };

            let size = content.len();
            let mut header_byte = (obj_type_num << 4) | (size as u8 & 0x0f);
            let mut remaining = size >> 4;
            if remaining > 0 {
                header_byte |= 0x80;
            }
            pack.push(header_byte);
            while remaining > 0 {
                let mut byte = (remaining & 0x7f) as u8;
                remaining >>= 7;
                if remaining > 0 {
                    byte |= 0x80;
                }
                pack.push(byte);
            }

            let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
            encoder.write_all(&content)?;
            let compressed = encoder.finish()?;
            pack.extend_from_slice(&compressed);
        }
    }

    let checksum = git_hash::hasher::Hasher::digest(git_hash::HashAlgorithm::Sha1, &pack)
        .map_err(|e| FacadeError::Message(format!("hash error: {}", e)))?;
    pack.extend_from_slice(checksum.as_bytes());

    Ok(pack)
}
