//! Server configuration.
//!
//! Every option can be given on the command line or through a `FUNDZIP_*`
//! environment variable.
//!
//! # Example
//!
//! ```no_run
//! use clap::Parser;
//! use fundzip::ServeConfig;
//!
//! #[derive(Parser)]
//! struct Args {
//!     #[command(flatten)]
//!     serve: ServeConfig,
//! }
//!
//! let config = Args::parse().serve;
//! config.validate().expect("Invalid configuration");
//! ```

use clap::Args;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::backend::{JsonCatalog, JsonlAuditSink, TokenPolicy};
use crate::export::{DEFAULT_FETCH_CONCURRENCY, ExportService};
use crate::http::AppState;
use crate::io::{HttpObjectStore, LocalObjectStore, ObjectStore};

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Conflicting configuration: {0}")]
    Conflict(String),

    #[error("Invalid {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// Options of `fundzip serve`.
#[derive(Debug, Clone, Args)]
pub struct ServeConfig {
    /// HTTP bind address
    #[arg(long, env = "FUNDZIP_HTTP_BIND", default_value = "127.0.0.1:8080")]
    pub http_bind: SocketAddr,

    /// JSON manifest listing every exportable file
    #[arg(long, env = "FUNDZIP_CATALOG", default_value = "./catalog.json")]
    pub catalog: PathBuf,

    /// JSON access policy (bearer tokens and their scopes)
    #[arg(long, env = "FUNDZIP_POLICY", default_value = "./policy.json")]
    pub policy: PathBuf,

    /// Serve objects from this directory
    #[arg(long, env = "FUNDZIP_STORAGE_DIR")]
    pub storage_dir: Option<PathBuf>,

    /// Fetch objects from this base URL
    #[arg(long, env = "FUNDZIP_STORAGE_URL")]
    pub storage_url: Option<String>,

    /// Per-request timeout of the HTTP object store, in seconds
    #[arg(long, env = "FUNDZIP_STORAGE_TIMEOUT", default_value_t = 30)]
    pub storage_timeout_secs: u64,

    /// Attempts per object when the HTTP object store cannot connect
    #[arg(long, env = "FUNDZIP_STORAGE_MAX_RETRY", default_value_t = 10)]
    pub storage_max_retry: u32,

    /// Audit log, one JSON line per export
    #[arg(long, env = "FUNDZIP_AUDIT_LOG", default_value = "./export-audit.jsonl")]
    pub audit_log: PathBuf,

    /// Objects fetched concurrently per export
    #[arg(long, env = "FUNDZIP_FETCH_CONCURRENCY", default_value_t = DEFAULT_FETCH_CONCURRENCY)]
    pub fetch_concurrency: usize,

    /// Upper bound on one export, in seconds
    #[arg(long, env = "FUNDZIP_EXPORT_TIMEOUT", default_value_t = 120)]
    pub export_timeout_secs: u64,
}

impl ServeConfig {
    /// Validate configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - The catalog or policy file doesn't exist
    /// - Neither or both of the storage sources are set
    /// - The storage directory doesn't exist
    /// - Concurrency, retries or a timeout is zero
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (what, path) in [("catalog", &self.catalog), ("policy", &self.policy)] {
            if !path.is_file() {
                return Err(ConfigError::MissingRequired(format!(
                    "{what} file not found: {}",
                    path.display()
                )));
            }
        }

        match (&self.storage_dir, &self.storage_url) {
            (None, None) => {
                return Err(ConfigError::MissingRequired(
                    "one of --storage-dir or --storage-url".to_string(),
                ));
            }
            (Some(_), Some(_)) => {
                return Err(ConfigError::Conflict(
                    "--storage-dir and --storage-url are mutually exclusive".to_string(),
                ));
            }
            (Some(dir), None) => {
                if !dir.is_dir() {
                    return Err(ConfigError::MissingRequired(format!(
                        "storage directory not found: {}",
                        dir.display()
                    )));
                }
            }
            (None, Some(_)) => {}
        }

        if self.fetch_concurrency == 0 {
            return Err(ConfigError::InvalidValue {
                field: "fetch concurrency",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.storage_max_retry == 0 {
            return Err(ConfigError::InvalidValue {
                field: "storage max retry",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.export_timeout_secs == 0 || self.storage_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "timeout",
                reason: "must be at least 1 second".to_string(),
            });
        }

        Ok(())
    }

    pub fn export_timeout(&self) -> Duration {
        Duration::from_secs(self.export_timeout_secs)
    }

    fn object_store(&self) -> anyhow::Result<Arc<dyn ObjectStore>> {
        match (&self.storage_dir, &self.storage_url) {
            (Some(dir), _) => Ok(Arc::new(LocalObjectStore::new(dir)?)),
            (None, Some(url)) => Ok(Arc::new(
                HttpObjectStore::new(url, Duration::from_secs(self.storage_timeout_secs))?
                    .with_max_retry(self.storage_max_retry),
            )),
            (None, None) => Err(ConfigError::MissingRequired("object storage".to_string()).into()),
        }
    }

    /// Load the collaborators and build the state shared by all handlers.
    pub fn build_state(&self) -> anyhow::Result<AppState> {
        let catalog = JsonCatalog::from_file(&self.catalog)?;
        let policy = TokenPolicy::from_file(&self.policy)?;
        tracing::info!(
            "Loaded {} catalog files and {} policy users",
            catalog.len(),
            policy.len()
        );

        let service = ExportService::new(
            Arc::new(policy),
            Arc::new(catalog),
            self.object_store()?,
            Arc::new(JsonlAuditSink::new(&self.audit_log)),
        )
        .with_fetch_concurrency(self.fetch_concurrency);

        Ok(AppState::new(service, self.export_timeout()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestArgs {
        #[command(flatten)]
        serve: ServeConfig,
    }

    fn parse(args: &[&str]) -> ServeConfig {
        TestArgs::try_parse_from(std::iter::once("fundzip").chain(args.iter().copied()))
            .unwrap()
            .serve
    }

    fn files() -> (tempfile::TempDir, String, String) {
        let dir = tempfile::tempdir().unwrap();
        let catalog = dir.path().join("catalog.json");
        let policy = dir.path().join("policy.json");
        std::fs::write(&catalog, "[]").unwrap();
        std::fs::write(&policy, r#"{"users": []}"#).unwrap();
        (
            dir,
            catalog.display().to_string(),
            policy.display().to_string(),
        )
    }

    #[test]
    fn defaults() {
        let config = parse(&["--storage-url", "http://storage.local"]);
        assert_eq!(config.fetch_concurrency, DEFAULT_FETCH_CONCURRENCY);
        assert_eq!(config.export_timeout(), Duration::from_secs(120));
        assert_eq!(config.http_bind.port(), 8080);
        assert_eq!(config.storage_max_retry, 10);
    }

    #[test]
    fn accepts_url_storage_with_retries() {
        let (_dir, catalog, policy) = files();
        let config = parse(&[
            "--catalog",
            &catalog,
            "--policy",
            &policy,
            "--storage-url",
            "http://storage.local/bucket",
            "--storage-max-retry",
            "3",
        ]);
        config.validate().unwrap();
        assert!(config.build_state().is_ok());
    }

    #[test]
    fn rejects_zero_retries() {
        let (_dir, catalog, policy) = files();
        let config = parse(&[
            "--catalog",
            &catalog,
            "--policy",
            &policy,
            "--storage-url",
            "http://storage.local",
            "--storage-max-retry",
            "0",
        ]);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field: "storage max retry", .. })
        ));
    }

    #[test]
    fn accepts_directory_storage() {
        let (dir, catalog, policy) = files();
        let storage = dir.path().display().to_string();
        let config = parse(&[
            "--catalog", &catalog, "--policy", &policy, "--storage-dir", &storage,
        ]);
        config.validate().unwrap();
        let state = config.build_state().unwrap();
        assert_eq!(state.service.fetch_concurrency(), DEFAULT_FETCH_CONCURRENCY);
    }

    #[test]
    fn requires_a_storage_source() {
        let (_dir, catalog, policy) = files();
        let config = parse(&["--catalog", &catalog, "--policy", &policy]);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingRequired(_))
        ));
    }

    #[test]
    fn rejects_both_storage_sources() {
        let (dir, catalog, policy) = files();
        let storage = dir.path().display().to_string();
        let config = parse(&[
            "--catalog",
            &catalog,
            "--policy",
            &policy,
            "--storage-dir",
            &storage,
            "--storage-url",
            "http://storage.local",
        ]);
        assert!(matches!(config.validate(), Err(ConfigError::Conflict(_))));
    }

    #[test]
    fn rejects_zero_concurrency() {
        let (_dir, catalog, policy) = files();
        let config = parse(&[
            "--catalog",
            &catalog,
            "--policy",
            &policy,
            "--storage-url",
            "http://storage.local",
            "--fetch-concurrency",
            "0",
        ]);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn missing_catalog_is_reported() {
        let config = parse(&[
            "--catalog",
            "/nonexistent/catalog.json",
            "--storage-url",
            "http://storage.local",
        ]);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingRequired(msg)) if msg.contains("catalog")
        ));
    }
}
