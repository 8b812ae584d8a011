//! Error type for the command facade.
//!
//! Mirrors `git_repository::RepoError`'s `#[error(transparent)]` composition,
//! extended with the crates the facade touches that `git-repository` itself
//! cannot depend on (merge, revwalk, protocol, transport).

#[derive(Debug, thiserror::Error)]
pub enum FacadeError {
    #[error(transparent)]
    Repo(#[from] git_repository::RepoError),

    #[error(transparent)]
    Odb(#[from] git_odb::OdbError),

    #[error(transparent)]
    Ref(#[from] git_ref::RefError),

    #[error(transparent)]
    Index(#[from] git_index::IndexError),

    #[error(transparent)]
    Object(#[from] git_object::ObjectError),

    #[error(transparent)]
    Merge(#[from] git_merge::MergeError),

    #[error(transparent)]
    RevWalk(#[from] git_revwalk::RevWalkError),

    #[error(transparent)]
    Transport(#[from] git_transport::TransportError),

    #[error(transparent)]
    Protocol(#[from] git_protocol::ProtocolError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Message(String),
}

pub type FacadeResult<T> = Result<T, FacadeError>;
