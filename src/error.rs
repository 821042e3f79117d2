use parley_core::{GroupName, Username};
use thiserror::Error;

pub type AppResult<T> = Result<T, InfraError>;

/// Session-local failures. The `Display` text is exactly what the client is told.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatError {
    #[error("Authentication failed!")]
    AuthenticationFailure,

    #[error("User {0} is already logged in!")]
    DuplicateLogin(Username),

    #[error("Group {0} already exists!")]
    GroupAlreadyExists(GroupName),

    #[error("Group {0} does not exist!")]
    UnknownGroup(GroupName),

    #[error("You are not a member of group {0}!")]
    NotGroupMember(GroupName),

    #[error("User {0} not found!")]
    UnknownUser(String),
}

#[derive(Debug, Error)]
pub enum ConfigErrorKind {
    #[error("failed to read file: {0}")]
    Read(std::io::Error),

    #[error("failed to parse file: {0}")]
    Parse(toml::de::Error),

    #[error("invalid environment variable {0}: {1}")]
    InvalidEnv(String, String),
}

#[derive(Debug, Error)]
pub enum InfraError {
    #[error("invalid configuration in {path}: {source}")]
    Config {
        path: std::path::PathBuf,
        #[source]
        source: ConfigErrorKind,
    },

    #[error("invalid environment: {0}")]
    Env(#[source] ConfigErrorKind),

    #[error("cannot read credentials from {path}: {source}")]
    Credentials {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}
