//! Error taxonomy for the Guided Hierarchical Traversal Engine.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("malformed document: {0}")]
    MalformedDocument(String),

    #[error("invalid tree: {reason}")]
    InvalidTree { reason: String },

    #[error("oracle failure ({kind:?}): {message}")]
    OracleFailure {
        kind: OracleFailureKind,
        message: String,
    },

    #[error("unmappable evaluation for node {0}")]
    UnmappableEvaluation(String),

    #[error("result store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("json error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Classification of an oracle invocation failure, used to decide whether a
/// batch chunk should fall back to a default decision or abort the run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OracleFailureKind {
    RateLimit,
    Timeout,
    TokenOverflow,
    Schema,
    Other,
}

impl Error {
    pub fn malformed_document(reason: impl Into<String>) -> Self {
        Self::MalformedDocument(reason.into())
    }

    pub fn invalid_tree(reason: impl Into<String>) -> Self {
        Self::InvalidTree {
            reason: reason.into(),
        }
    }

    pub fn oracle_failure(kind: OracleFailureKind, message: impl Into<String>) -> Self {
        Self::OracleFailure {
            kind,
            message: message.into(),
        }
    }
}
