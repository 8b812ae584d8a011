//! `init` facade: create a new repository.

use std::path::{Path, PathBuf};

use git_hash::HashAlgorithm;
use git_repository::{InitOptions, Repository};

use super::error::FacadeResult;

pub struct InitConfig {
    pub bare: bool,
    pub default_branch: Option<String>,
    pub template_dir: Option<PathBuf>,
    pub hash_algorithm: HashAlgorithm,
}

impl Default for InitConfig {
    fn default() -> Self {
        Self {
            bare: false,
            default_branch: None,
            template_dir: None,
            hash_algorithm: HashAlgorithm::Sha1,
        }
    }
}

pub struct InitOutcome {
    pub git_dir: PathBuf,
    pub reinit: bool,
}

pub fn run(target: &Path, config: InitConfig) -> FacadeResult<InitOutcome> {
    let target = if target.is_relative() {
        std::env::current_dir()?.join(target)
    } else {
        target.to_path_buf()
    };

    if !target.exists() {
        std::fs::create_dir_all(&target)?;
    }

    let reinit = {
        let probe_git_dir = if config.bare {
            target.clone()
        } else {
            target.join(".git")
        };
        probe_git_dir.join("HEAD").is_file()
    };

    let opts = InitOptions {
        bare: config.bare,
        default_branch: config.default_branch,
        template_dir: config.template_dir,
        hash_algorithm: config.hash_algorithm,
    };

    let repo = Repository::init_opts(&target, &opts)?;

    Ok(InitOutcome {
        git_dir: repo.git_dir().to_path_buf(),
        reinit,
    })
}
