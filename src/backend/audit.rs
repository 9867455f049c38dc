use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

use crate::export::{AuditRecord, AuditSink};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AuditLine<'a> {
    recorded_at: DateTime<Utc>,
    #[serde(flatten)]
    record: &'a AuditRecord,
}

/// Appends audit records to a JSON Lines file
pub struct JsonlAuditSink {
    path: PathBuf,
}

impl JsonlAuditSink {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl AuditSink for JsonlAuditSink {
    async fn record_export_audit(&self, record: AuditRecord) -> Result<()> {
        let mut line = serde_json::to_vec(&AuditLine {
            recorded_at: Utc::now(),
            record: &record,
        })?;
        line.push(b'\n');

        // One write per record; O_APPEND keeps concurrent lines whole
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .with_context(|| format!("failed to open audit log {}", self.path.display()))?;
        file.write_all(&line).await?;
        file.flush().await?;

        tracing::info!(
            user = %record.identity.user_id,
            scope = %record.scope,
            files = record.file_count,
            "export audited"
        );
        Ok(())
    }
}
