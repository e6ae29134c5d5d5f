use crate::model::OwnerId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VaultError {
    #[error("No profile stored for owner {0}")]
    NotFound(OwnerId),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Unknown field: {0}")]
    UnknownField(String),

    #[error("Invalid value for field {field}: expected {expected}")]
    InvalidValue {
        field: String,
        expected: &'static str,
    },

    #[error("Invalid owner identifier: {0:?}")]
    InvalidOwner(String),

    #[error("A profile already exists for owner {0}")]
    AlreadyExists(OwnerId),

    #[error("Profile for owner {owner} is unrecoverable: {reason}")]
    Unrecoverable { owner: OwnerId, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Config error: {0}")]
    Config(String),
}

impl VaultError {
    /// True for the terminal per-owner failure that callers must stop retrying.
    pub fn is_unrecoverable(&self) -> bool {
        matches!(self, VaultError::Unrecoverable { .. })
    }
}

pub type Result<T> = std::result::Result<T, VaultError>;
