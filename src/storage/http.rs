use super::ObjectStore;
use crate::config::Config;
use crate::error::{PortalError, Result};
use async_trait::async_trait;
use reqwest::StatusCode;

/// Object store backed by an S3-compatible storage REST API
/// (`{base}/storage/v1/object/{bucket}/{key}`), authenticated with a
/// service-role key.
pub struct HttpObjectStore {
    client: reqwest::Client,
    base: String,
    bucket: String,
    key: String,
}

impl HttpObjectStore {
    pub fn new(config: &Config) -> Self {
        Self {
            client: reqwest::Client::new(),
            base: config.storage_url.trim_end_matches('/').to_string(),
            bucket: config.storage_bucket.clone(),
            key: config.storage_key.clone(),
        }
    }

    fn endpoint(&self, object_key: &str) -> String {
        format!("{}/storage/v1/object/{}/{}", self.base, self.bucket, object_key)
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let resp = self
            .client
            .get(self.endpoint(key))
            .header("Authorization", format!("Bearer {}", self.key))
            .header("apikey", self.key.clone())
            .send()
            .await?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(PortalError::Store {
                message: format!("GET {} failed: {}", key, resp.status()),
            });
        }
        Ok(Some(resp.bytes().await?.to_vec()))
    }

    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<()> {
        // upsert=true makes overwrites idempotent
        let resp = self
            .client
            .put(self.endpoint(key))
            .header("Authorization", format!("Bearer {}", self.key))
            .header("apikey", self.key.clone())
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .query(&[("upsert", "true")])
            .body(bytes)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(PortalError::Store {
                message: format!("PUT {} failed: {} - {}", key, status, body),
            });
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let resp = self
            .client
            .delete(self.endpoint(key))
            .header("Authorization", format!("Bearer {}", self.key))
            .header("apikey", self.key.clone())
            .send()
            .await?;

        // Missing keys delete cleanly
        if !resp.status().is_success() && resp.status() != StatusCode::NOT_FOUND {
            return Err(PortalError::Store {
                message: format!("DELETE {} failed: {}", key, resp.status()),
            });
        }
        Ok(())
    }
}
