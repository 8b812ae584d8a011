//! `clone` facade: connect to a remote, fetch its objects, and lay out a new
//! local repository with remote-tracking refs and (for non-bare clones) a
//! checked-out working tree.

use std::path::PathBuf;

use bstr::{BString, ByteSlice};
use git_hash::ObjectId;
use git_protocol::remote::RefSpec;
use git_ref::RefName;
use git_repository::{InitOptions, Repository};
use git_transport::{GitUrl, Service};

use super::checkout::checkout_commit_to_working;
use super::error::{FacadeError, FacadeResult};

pub struct CloneConfig {
    pub repository: String,
    pub dest_dir: PathBuf,
    pub depth: Option<u32>,
    pub branch: Option<String>,
    pub bare: bool,
}

pub struct CloneOutcome {
    pub dest: PathBuf,
    pub was_empty: bool,
    pub checked_out_branch: Option<String>,
}

pub fn run(config: CloneConfig) -> FacadeResult<CloneOutcome> {
    let dest = &config.dest_dir;

    if dest.exists()
        && std::fs::read_dir(dest)
            .map_err(FacadeError::Io)?
            .next()
            .is_some()
    {
        return Err(FacadeError::Message(format!(
            "destination path '{}' already exists and is not an empty directory.",
            dest.display()
        )));
    }

    let url = GitUrl::parse(&config.repository).map_err(FacadeError::Transport)?;
    let mut transport = git_transport::connect(&url, Service::UploadPack).map_err(FacadeError::Transport)?;

    let reader = &mut git_protocol::pktline::PktLineReader::new(transport.reader());
    let (advertised_refs, capabilities) =
        git_protocol::v1::parse_ref_advertisement(reader).map_err(FacadeError::Protocol)?;

    let was_empty = advertised_refs.is_empty();

    let opts = InitOptions {
        bare: config.bare,
        ..Default::default()
    };
    let repo = Repository::init_opts(dest, &opts)?;

    write_remote_config(&repo, &config.repository)?;

    if was_empty {
        let head_ref = RefName::new(BString::from("HEAD"))?;
        let branch_ref = RefName::new(BString::from("refs/heads/main"))?;
        repo.refs().write_symbolic_ref(&head_ref, &branch_ref)?;

        return Ok(CloneOutcome {
            dest: dest.clone(),
            was_empty,
            checked_out_branch: None,
        });
    }

    let fetch_refspec = RefSpec::parse("+refs/heads/*:refs/remotes/origin/*").map_err(FacadeError::Protocol)?;
    let wanted_refs: Vec<String> = advertised_refs
        .iter()
        .filter(|(_, name)| {
            let n = name.to_str_lossy();
            n.starts_with("refs/heads/") || n.starts_with("refs/tags/")
        })
        .map(|(_, name)| name.to_str_lossy().to_string())
        .collect();

    let local_refs: Vec<(ObjectId, String)> = Vec::new();
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

    drop(repo);
    let mut repo = Repository::open(dest)?;

    let checkout_branch = determine_checkout_branch(config.branch.as_deref(), &advertised_refs, &capabilities);

    if config.bare {
        for (oid, refname) in &advertised_refs {
            let name = refname.to_str_lossy();
            if name.starts_with("refs/heads/") || name.starts_with("refs/tags/") {
                let ref_name = RefName::new(refname.clone())?;
                repo.refs().write_ref(&ref_name, oid)?;
            }
        }

        if let Some((ref branch_name, _)) = checkout_branch {
            let head_ref = RefName::new(BString::from("HEAD"))?;
            let branch_ref = RefName::new(BString::from(format!("refs/heads/{}", branch_name)))?;
            repo.refs().write_symbolic_ref(&head_ref, &branch_ref)?;
        }
    } else {
        for (oid, refname) in &advertised_refs {
            let name = refname.to_str_lossy();
            if let Some(dest_ref) = fetch_refspec.map_to_destination(&name) {
                let ref_name = RefName::new(BString::from(dest_ref.as_str()))?;
                repo.refs().write_ref(&ref_name, oid)?;
            }
            if name.starts_with("refs/tags/") {
                let ref_name = RefName::new(refname.clone())?;
                repo.refs().write_ref(&ref_name, oid)?;
            }
        }

        if let Some((ref branch_name, _)) = checkout_branch {
            let remote_head = RefName::new(BString::from("refs/remotes/origin/HEAD"))?;
            let remote_branch = RefName::new(BString::from(format!("refs/remotes/origin/{}", branch_name)))?;
            repo.refs().write_symbolic_ref(&remote_head, &remote_branch)?;
        }

        if let Some((ref branch_name, oid)) = checkout_branch {
            let head_ref = RefName::new(BString::from("HEAD"))?;
            let branch_ref = RefName::new(BString::from(format!("refs/heads/{}", branch_name)))?;
            repo.refs().write_symbolic_ref(&head_ref, &branch_ref)?;
            repo.refs().write_ref(&branch_ref, &oid)?;

            checkout_commit_to_working(&mut repo, &oid)?;
        }
    }

    Ok(CloneOutcome {
        dest: dest.clone(),
        was_empty,
        checked_out_branch: checkout_branch.map(|(name, _)| name),
    })
}

pub fn infer_directory(url_str: &str) -> FacadeResult<PathBuf> {
    let path = url_str
        .rsplit('/')
        .next()
        .unwrap_or(url_str)
        .trim_end_matches(".git");
    if path.is_empty() {
        return Err(FacadeError::Message(format!(
            "cannot infer directory name from '{}'",
            url_str
        )));
    }
    Ok(PathBuf::from(path))
}

fn write_remote_config(repo: &Repository, url: &str) -> FacadeResult<()> {
    let config_path = repo.git_dir().join("config");
    let mut content = std::fs::read_to_string(&config_path).unwrap_or_default();
    content.push_str(&format!(
        "\n[remote \"origin\"]\n\turl = {}\n\tfetch = +refs/heads/*:refs/remotes/origin/*\n",
        url
    ));
    std::fs::write(&config_path, content)?;
    Ok(())
}

fn determine_checkout_branch(
    requested: Option<&str>,
    advertised_refs: &[(ObjectId, BString)],
    capabilities: &git_protocol::capability::Capabilities,
) -> Option<(String, ObjectId)> {
    if let Some(branch) = requested {
        let full_ref = format!("refs/heads/{}", branch);
        for (oid, name) in advertised_refs {
            if name.to_str_lossy() == full_ref {
                return Some((branch.to_string(), *oid));
            }
        }
        return None;
    }

    if let Some(symref) = capabilities.get("symref") {
        if let Some(target) = symref.strip_prefix("HEAD:refs/heads/") {
            let branch = target.to_string();
            for (oid, name) in advertised_refs {
                if name.to_str_lossy() == format!("refs/heads/{}", branch) {
                    return Some((branch, *oid));
                }
            }
        }
    }

    for (oid, name) in advertised_refs {
        if name.to_str_lossy() == "HEAD" {
            for (branch_oid, branch_name) in advertised_refs {
                let bn = branch_name.to_str_lossy();
                if bn.starts_with("refs/heads/") && branch_oid == oid {
                    let short = bn.strip_prefix("refs/heads/").unwrap();
                    return Some((short.to_string(), *oid));
                }
            }
            return Some(("main".to_string(), *oid));
        }
    }

    None
}
