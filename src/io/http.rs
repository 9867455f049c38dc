use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, StatusCode, Url};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use super::{ObjectStore, StorageError};
use anyhow::{Result, anyhow};

/// Object store reached over HTTP
///
/// An object with key `a/b.pdf` is fetched with `GET {base_url}/a/b.pdf`.
pub struct HttpObjectStore {
    client: Client,
    base_url: Url,
    transferred_bytes: AtomicU64,
    max_retry: u32,
}

impl HttpObjectStore {
    /// Create a new HTTP object store
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        let base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(anyhow!("storage URL {base_url} cannot be used as a base"));
        }

        Ok(Self {
            client,
            base_url,
            transferred_bytes: AtomicU64::new(0),
            max_retry: 10,
        })
    }

    pub fn with_max_retry(mut self, max_retry: u32) -> Self {
        self.max_retry = max_retry.max(1);
        self
    }

    /// Get total bytes transferred from network
    pub fn transferred_bytes(&self) -> u64 {
        self.transferred_bytes.load(Ordering::Relaxed)
    }

    fn object_url(&self, key: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("storage URL cannot be used as a base"))?
            .pop_if_empty()
            .extend(key.split('/').filter(|s| !s.is_empty()));
        Ok(url)
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn get_object_bytes(&self, key: &str) -> Result<Bytes, StorageError> {
        let url = self.object_url(key)?;
        let mut retry_count = 0;

        loop {
            match self.client.get(url.clone()).send().await {
                Ok(resp) => {
                    if resp.status() == StatusCode::NOT_FOUND {
                        return Err(StorageError::NotFound {
                            key: key.to_string(),
                        });
                    }
                    if !resp.status().is_success() {
                        return Err(anyhow!("HTTP request failed with status: {}", resp.status()).into());
                    }

                    let bytes = resp.bytes().await.map_err(anyhow::Error::from)?;
                    self.transferred_bytes
                        .fetch_add(bytes.len() as u64, Ordering::Relaxed);
                    return Ok(bytes);
                }
                Err(e) if e.is_timeout() || e.is_connect() => {
                    retry_count += 1;
                    if retry_count >= self.max_retry {
                        return Err(anyhow!("Max retries exceeded: {e}").into());
                    }
                    tracing::warn!(
                        "Connection error, retry {}/{}: {}",
                        retry_count,
                        self.max_retry,
                        e
                    );
                    tokio::time::sleep(Duration::from_millis(500 * retry_count as u64)).await;
                }
                Err(e) => return Err(anyhow::Error::from(e).into()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(base: &str) -> HttpObjectStore {
        HttpObjectStore::new(base, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn object_urls_append_key_segments() {
        let s = store("http://storage.local/bucket");
        assert_eq!(
            s.object_url("org/1/a b.pdf").unwrap().as_str(),
            "http://storage.local/bucket/org/1/a%20b.pdf"
        );
        assert_eq!(s.transferred_bytes(), 0);
    }

    #[test]
    fn trailing_slash_in_base_is_ignored() {
        let s = store("http://storage.local/bucket/");
        assert_eq!(
            s.object_url("x.bin").unwrap().as_str(),
            "http://storage.local/bucket/x.bin"
        );
    }

    #[test]
    fn rejects_non_base_urls() {
        assert!(HttpObjectStore::new("mailto:ops@example.com", Duration::from_secs(1)).is_err());
    }
}
