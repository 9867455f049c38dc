use bytes::Bytes;
use chrono::{DateTime, Local, NaiveDate};
use futures::{StreamExt, TryStreamExt, stream};
use std::sync::Arc;

use super::{
    AccessControl, AuditRecord, AuditSink, CatalogFile, ExportError, ExportRequest, FileCatalog,
    Identity, PathRegistry, Scope,
};
use crate::io::{ObjectStore, StorageError};
use crate::zip::{ArchiveEntry, ZipBuilder};

/// Objects fetched at once when no other limit is configured.
pub const DEFAULT_FETCH_CONCURRENCY: usize = 4;

/// A finished export, ready to be sent as a download.
#[derive(Debug, Clone)]
pub struct ExportArchive {
    /// Suggested download name, `funding-files-{YYYY-MM-DD}.zip`
    pub file_name: String,
    pub entry_count: usize,
    pub data: Vec<u8>,
}

/// Runs exports against a fixed set of collaborators.
///
/// The service holds no per-request state, so one instance can serve any
/// number of concurrent exports.
#[derive(Clone)]
pub struct ExportService {
    access: Arc<dyn AccessControl>,
    catalog: Arc<dyn FileCatalog>,
    store: Arc<dyn ObjectStore>,
    audit: Arc<dyn AuditSink>,
    fetch_concurrency: usize,
}

impl ExportService {
    pub fn new(
        access: Arc<dyn AccessControl>,
        catalog: Arc<dyn FileCatalog>,
        store: Arc<dyn ObjectStore>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            access,
            catalog,
            store,
            audit,
            fetch_concurrency: DEFAULT_FETCH_CONCURRENCY,
        }
    }

    /// Limit the number of objects fetched at the same time (at least 1).
    pub fn with_fetch_concurrency(mut self, fetch_concurrency: usize) -> Self {
        self.fetch_concurrency = fetch_concurrency.max(1);
        self
    }

    pub fn fetch_concurrency(&self) -> usize {
        self.fetch_concurrency
    }

    /// Resolve the bearer token of a request to an identity.
    pub async fn authenticate(&self, token: Option<&str>) -> Result<Identity, ExportError> {
        let token = token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(ExportError::Unauthenticated)?;

        self.access
            .authenticate(token)
            .await
            .map_err(|e| ExportError::upstream("resolving identity", e))?
            .ok_or(ExportError::Unauthenticated)
    }

    /// Run one export for `identity`, stamping entries with the current time.
    pub async fn export(
        &self,
        identity: &Identity,
        request: ExportRequest,
    ) -> Result<ExportArchive, ExportError> {
        self.export_at(identity, request, Local::now()).await
    }

    /// Run one export as if it happened at `now`.
    ///
    /// `now` sets the entries' modification time and the download name.
    pub async fn export_at(
        &self,
        identity: &Identity,
        request: ExportRequest,
        now: DateTime<Local>,
    ) -> Result<ExportArchive, ExportError> {
        let scope = Scope::new(request.team_id, request.organization_id)?;
        let filter = request
            .query
            .map(|q| q.trim().to_string())
            .filter(|q| !q.is_empty());

        self.authorize(identity, &scope).await?;

        let files = self
            .catalog
            .list_files(&scope, filter.as_deref())
            .await
            .map_err(|e| ExportError::upstream(format!("listing files for {scope}"), e))?;
        if files.is_empty() {
            tracing::info!(user = %identity.user_id, %scope, "export matched no files");
            return Err(ExportError::NoMatchingFiles { scope });
        }

        tracing::info!(
            user = %identity.user_id,
            %scope,
            files = files.len(),
            "starting export"
        );

        let contents = self.fetch_all(&files).await?;

        let mut registry = PathRegistry::new();
        let entries: Vec<ArchiveEntry> = files
            .iter()
            .zip(contents)
            .map(|(file, data)| {
                let path = registry.archive_path(
                    &file.organization_name,
                    &file.file_type,
                    file.created_at.date_naive(),
                    &file.name,
                );
                ArchiveEntry::new(path, data)
            })
            .collect();

        let data = ZipBuilder::with_timestamp(&now.naive_local())
            .build(&entries)
            .map_err(|e| {
                tracing::error!(%scope, error = %e, "archive assembly failed");
                ExportError::Internal(e)
            })?;

        let entry_count = entries.len();
        self.audit
            .record_export_audit(AuditRecord {
                identity: identity.clone(),
                scope: scope.clone(),
                filter,
                file_count: entry_count,
            })
            .await
            .map_err(|e| ExportError::upstream("recording export audit", e))?;

        tracing::info!(
            user = %identity.user_id,
            %scope,
            entries = entry_count,
            bytes = data.len(),
            "export finished"
        );

        Ok(ExportArchive {
            file_name: download_name(now.date_naive()),
            entry_count,
            data,
        })
    }

    async fn authorize(&self, identity: &Identity, scope: &Scope) -> Result<(), ExportError> {
        let allowed = self
            .access
            .can_access_scope(identity, scope)
            .await
            .map_err(|e| ExportError::upstream("checking access", e))?;

        if !allowed {
            tracing::warn!(user = %identity.user_id, %scope, "export denied");
            return Err(ExportError::Forbidden {
                scope: scope.clone(),
            });
        }
        Ok(())
    }

    /// Fetch every file with bounded concurrency, keeping catalog order.
    ///
    /// The first failure drops all in-flight and completed fetches.
    async fn fetch_all(&self, files: &[CatalogFile]) -> Result<Vec<Bytes>, ExportError> {
        let fetches: Vec<_> = files
            .iter()
            .map(|file| {
                fetch_one(
                    Arc::clone(&self.store),
                    file.id.clone(),
                    file.storage_key.clone(),
                )
            })
            .collect();

        stream::iter(fetches)
            .buffered(self.fetch_concurrency)
            .try_collect()
            .await
    }
}

async fn fetch_one(
    store: Arc<dyn ObjectStore>,
    file_id: String,
    storage_key: String,
) -> Result<Bytes, ExportError> {
    match store.get_object_bytes(&storage_key).await {
        Ok(data) => {
            tracing::debug!(%file_id, bytes = data.len(), "fetched file");
            Ok(data)
        }
        Err(StorageError::NotFound { .. }) => {
            tracing::warn!(%file_id, "file missing from storage");
            Err(ExportError::ObjectMissing { file_id })
        }
        Err(StorageError::Upstream(e)) => {
            tracing::warn!(%file_id, error = %e, "fetching file failed");
            Err(ExportError::upstream(format!("fetching file {file_id}"), e))
        }
    }
}

/// `funding-files-{YYYY-MM-DD}.zip`
pub fn download_name(date: NaiveDate) -> String {
    format!("funding-files-{}.zip", date.format("%Y-%m-%d"))
}
