use std::time::Duration;
use thiserror::Error;

use super::Scope;
use crate::zip::ArchiveError;

/// Coarse classification of export failures, one per response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Unauthenticated,
    Forbidden,
    InvalidRequest,
    NotFound,
    UpstreamFailure,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Unauthenticated => "unauthenticated",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::InvalidRequest => "invalid_request",
            ErrorKind::NotFound => "not_found",
            ErrorKind::UpstreamFailure => "upstream_failure",
            ErrorKind::Internal => "internal",
        }
    }
}

/// Why an export produced no archive.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("authentication required")]
    Unauthenticated,

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("access to {scope} denied")]
    Forbidden { scope: Scope },

    #[error("no files found for {scope}")]
    NoMatchingFiles { scope: Scope },

    #[error("file {file_id} is missing from storage")]
    ObjectMissing { file_id: String },

    #[error("{context}: {source:#}")]
    Upstream {
        context: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("export timed out after {after:?}")]
    TimedOut { after: Duration },

    #[error("archive assembly failed: {0}")]
    Internal(#[from] ArchiveError),
}

impl ExportError {
    pub fn upstream(context: impl Into<String>, source: anyhow::Error) -> Self {
        ExportError::Upstream {
            context: context.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ExportError::Unauthenticated => ErrorKind::Unauthenticated,
            ExportError::InvalidRequest(_) => ErrorKind::InvalidRequest,
            ExportError::Forbidden { .. } => ErrorKind::Forbidden,
            ExportError::NoMatchingFiles { .. } | ExportError::ObjectMissing { .. } => {
                ErrorKind::NotFound
            }
            ExportError::Upstream { .. } | ExportError::TimedOut { .. } => {
                ErrorKind::UpstreamFailure
            }
            ExportError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Message safe to show to the requester.
    ///
    /// Upstream and internal causes are left out, they may name storage
    /// keys or hosts.
    pub fn public_message(&self) -> String {
        match self {
            ExportError::Upstream { context, .. } => format!("{context}: upstream service failed"),
            ExportError::Internal(_) => "failed to build the archive".to_string(),
            other => other.to_string(),
        }
    }
}
