use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;

use crate::export::{CatalogFile, FileCatalog, Scope};

/// One manifest entry: a catalog file plus the scope it belongs to.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestFile {
    #[serde(flatten)]
    pub file: CatalogFile,
    #[serde(default)]
    pub team_id: Option<String>,
    pub organization_id: String,
}

impl ManifestFile {
    fn in_scope(&self, scope: &Scope) -> bool {
        let team_ok = scope
            .team_id
            .as_ref()
            .is_none_or(|team| self.team_id.as_ref() == Some(team));
        let org_ok = scope
            .organization_id
            .as_ref()
            .is_none_or(|org| &self.organization_id == org);
        team_ok && org_ok
    }

    /// Case-insensitive match of an already lowercased filter
    fn matches(&self, filter: &str) -> bool {
        [
            &self.file.name,
            &self.file.file_type,
            &self.file.organization_name,
        ]
        .iter()
        .any(|field| field.to_lowercase().contains(filter))
    }
}

/// File catalog loaded once from a JSON manifest
///
/// Files are listed in manifest order.
#[derive(Debug, Clone)]
pub struct JsonCatalog {
    files: Vec<ManifestFile>,
}

impl JsonCatalog {
    pub fn from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read catalog {}", path.display()))?;
        Self::from_json(&json).with_context(|| format!("invalid catalog {}", path.display()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let files: Vec<ManifestFile> = serde_json::from_str(json)?;
        Ok(Self { files })
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

#[async_trait]
impl FileCatalog for JsonCatalog {
    async fn list_files(&self, scope: &Scope, filter: Option<&str>) -> Result<Vec<CatalogFile>> {
        let filter = filter.map(str::to_lowercase);
        Ok(self
            .files
            .iter()
            .filter(|f| f.in_scope(scope))
            .filter(|f| filter.as_deref().is_none_or(|q| f.matches(q)))
            .map(|f| f.file.clone())
            .collect())
    }
}
