//! Scoped bulk export of stored files into one ZIP archive.
//!
//! An export runs entirely within one request:
//!
//! 1. Authorize the requester for the team and/or organization scope
//! 2. Enumerate matching files through the [`FileCatalog`]
//! 3. Fetch every file's bytes from the [`ObjectStore`](crate::io::ObjectStore)
//! 4. Give each file a unique path inside the archive ([`PathRegistry`])
//! 5. Assemble the archive ([`crate::zip::ZipBuilder`])
//! 6. Record one [`AuditRecord`] through the [`AuditSink`]
//!
//! Any failure before step 6 leaves no audit record and returns no archive.

mod error;
mod path;
mod service;

pub use error::{ErrorKind, ExportError};
pub use path::{FALLBACK_SEGMENT, MAX_SEGMENT_CHARS, PathRegistry, normalize_segment};
pub use service::{DEFAULT_FETCH_CONCURRENCY, ExportArchive, ExportService};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// An authenticated requester.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub user_id: String,
}

impl Identity {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }
}

/// The team and/or organization an export is restricted to.
///
/// At least one of the two ids is always present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scope {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,
}

impl Scope {
    /// Build a scope from optional request parameters.
    ///
    /// Blank ids count as absent; with neither id present this is an
    /// [`ExportError::InvalidRequest`].
    pub fn new(
        team_id: Option<String>,
        organization_id: Option<String>,
    ) -> Result<Self, ExportError> {
        let clean = |id: Option<String>| {
            id.map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };
        let team_id = clean(team_id);
        let organization_id = clean(organization_id);

        if team_id.is_none() && organization_id.is_none() {
            return Err(ExportError::InvalidRequest(
                "teamId or organizationId is required".to_string(),
            ));
        }

        Ok(Self {
            team_id,
            organization_id,
        })
    }

    pub fn team(team_id: impl Into<String>) -> Self {
        Self {
            team_id: Some(team_id.into()),
            organization_id: None,
        }
    }

    pub fn organization(organization_id: impl Into<String>) -> Self {
        Self {
            team_id: None,
            organization_id: Some(organization_id.into()),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.team_id, &self.organization_id) {
            (Some(team), Some(org)) => write!(f, "team {team} in organization {org}"),
            (Some(team), None) => write!(f, "team {team}"),
            (None, Some(org)) => write!(f, "organization {org}"),
            (None, None) => write!(f, "empty scope"),
        }
    }
}

/// A logical file as listed by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogFile {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub file_type: String,
    pub storage_key: String,
    pub organization_name: String,
    pub created_at: DateTime<Utc>,
}

/// What gets recorded after a successful export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRecord {
    pub identity: Identity,
    pub scope: Scope,
    pub filter: Option<String>,
    pub file_count: usize,
}

/// Parameters of one export request.
#[derive(Debug, Clone, Default)]
pub struct ExportRequest {
    pub team_id: Option<String>,
    pub organization_id: Option<String>,
    pub query: Option<String>,
}

/// Resolves requesters and decides who may export which scope.
#[async_trait]
pub trait AccessControl: Send + Sync {
    /// Resolve a bearer token to an identity, `None` if the token is unknown
    async fn authenticate(&self, token: &str) -> anyhow::Result<Option<Identity>>;

    async fn can_access_scope(&self, identity: &Identity, scope: &Scope) -> anyhow::Result<bool>;
}

/// Lists the files belonging to a scope.
#[async_trait]
pub trait FileCatalog: Send + Sync {
    /// Files matching `scope` and, if given, the free-text `filter`, in a
    /// stable order
    async fn list_files(
        &self,
        scope: &Scope,
        filter: Option<&str>,
    ) -> anyhow::Result<Vec<CatalogFile>>;
}

/// Persists export audit records.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record_export_audit(&self, record: AuditRecord) -> anyhow::Result<()>;
}
