//! `fetch` facade: negotiate and download new objects from a remote, update
//! remote-tracking refs, optionally pull tags and prune stale ones.

use bstr::{BString, ByteSlice};
use git_hash::ObjectId;
use git_protocol::remote::{RefSpec, RemoteConfig};
use git_ref::RefName;
use git_transport::Service;

use super::error::{FacadeError, FacadeResult};

pub struct FetchConfig {
    pub remote: Option<String>,
    pub refspec: Vec<String>,
    pub depth: Option<u32>,
    pub tags: bool,
    pub prune: bool,
}

pub enum RefUpdateKind {
    NewBranch,
    NewTag,
    Updated,
    Deleted,
}

pub struct RefUpdateNote {
    pub kind: RefUpdateKind,
    pub source: String,
    pub dest: String,
}

pub struct FetchOutcome {
    pub remote_url: String,
    pub updates: Vec<RefUpdateNote>,
}

pub fn run(repo: &git_repository::Repository, config: FetchConfig) -> FacadeResult<FetchOutcome> {
    let remote_name = config.remote.as_deref().unwrap_or("origin");

    let remote_config = RemoteConfig::from_config(repo.config(), remote_name)?
        .ok_or_else(|| FacadeError::Message(format!("'{}' does not appear to be a git repository", remote_name)))?;

    let url = git_transport::GitUrl::parse(&remote_config.url).map_err(FacadeError::Transport)?;
    let mut transport = git_transport::connect(&url, Service::UploadPack).map_err(FacadeError::Transport)?;

    let reader = &mut git_protocol::pktline::PktLineReader::new(transport.reader());
    let (advertised_refs, capabilities) =
        git_protocol::v1::parse_ref_advertisement(reader).map_err(FacadeError::Protocol)?;

    let refspecs: Vec<RefSpec> = if !config.refspec.is_empty() {
        config
            .refspec
            .iter()
            .map(|s| RefSpec::parse(s))
            .collect::<Result<Vec<_>, _>>()
            .map_err(FacadeError::Protocol)?
    } else {
        remote_config.fetch_refspecs.clone()
    };

    let wanted_refs: Vec<String> = advertised_refs
        .iter()
        .filter(|(_, name)| {
            let n = name.to_str_lossy();
            refspecs.iter().any(|rs| rs.matches_source(&n)) || (config.tags && n.starts_with("refs/tags/"))
        })
        .map(|(_, name)| name.to_str_lossy().to_string())
        .collect();

    let local_refs: Vec<(ObjectId, String)> = {
        let mut refs = Vec::new();
        if let Ok(iter) = repo.refs().iter(Some("refs/")) {
            for r in iter.flatten() {
                if let Some(oid) = r.target_oid() {
                    refs.push((oid, r.name().as_str().to_string()));
                }
            }
        }
        refs
    };

    let fetch_opts = git_protocol::fetch::FetchOptions {
        depth: config.depth,
        filter: None,
        progress: false,
    };

    let pack_dir = repo.common_dir().join("objects").join("pack");
    std::fs::create_dir_all(&pack_dir)?;

    git_protocol::fetch::fetch(
        transport.as_mut(),
        &advertised_refs,
        &capabilities,
        &local_refs,
        &wanted_refs,
        &fetch_opts,
        Some(&pack_dir),
    )
    .map_err(FacadeError::Protocol)?;

    let mut updates = Vec::new();

    let mapped = git_protocol::remote::map_refs(&advertised_refs, &refspecs);
    for (oid, source, dest) in &mapped {
        if dest.is_empty() {
            continue;
        }
        let ref_name = RefName::new(BString::from(dest.as_str()))?;
        let is_new = repo.refs().resolve(&ref_name)?.is_none();
        repo.refs().write_ref(&ref_name, oid)?;
        let short_dest = dest.strip_prefix("refs/remotes/").unwrap_or(dest).to_string();
        updates.push(RefUpdateNote {
            kind: if is_new { RefUpdateKind::NewBranch } else { RefUpdateKind::Updated },
            source: source.clone(),
            dest: short_dest,
        });
    }

    if config.tags {
        for (oid, name) in &advertised_refs {
            let n = name.to_str_lossy();
            if n.starts_with("refs/tags/") {
                let ref_name = RefName::new(name.clone())?;
                if repo.refs().resolve(&ref_name)?.is_none() {
                    repo.refs().write_ref(&ref_name, oid)?;
                    let short = n.strip_prefix("refs/tags/").unwrap_or(&n).to_string();
                    updates.push(RefUpdateNote {
                        kind: RefUpdateKind::NewTag,
                        source: short.clone(),
                        dest: short,
                    });
                }
            }
        }
    }

    if config.prune {
        let remote_ref_names: std::collections::HashSet<String> = advertised_refs
            .iter()
            .filter_map(|(_, name)| {
                let n = name.to_str_lossy();
                refspecs.iter().find_map(|rs| rs.map_to_destination(&n))
            })
            .collect();

        let prefix = format!("refs/remotes/{}/", remote_name);
        if let Ok(iter) = repo.refs().iter(Some(&prefix)) {
            for r in iter.flatten() {
                let name = r.name().as_str().to_string();
                if !remote_ref_names.contains(&name) {
                    let ref_name = RefName::new(BString::from(name.as_str()))?;
                    repo.refs().delete_ref(&ref_name)?;
                    let short = name.strip_prefix("refs/remotes/").unwrap_or(&name).to_string();
                    updates.push(RefUpdateNote {
                        kind: RefUpdateKind::Deleted,
                        source: remote_name.to_string(),
                        dest: short,
                    });
                }
            }
        }
    }

    Ok(FetchOutcome {
        remote_url: remote_config.url,
        updates,
    })
}
