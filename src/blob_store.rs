//! Filesystem [`BlobStore`] with HMAC-signed access URLs.
//!
//! Objects are written under `storage.root` and served back by the HTTP
//! API at `{public_url}/blobs/{name}`, with each segment of `name`
//! percent-encoded. The content type given at upload is kept in a sidecar
//! file under `.content-types/`.
//!
//! Temporary access URLs carry an expiry and a signature:
//!
//! ```text
//! {public_url}/blobs/{name}?expires={unix_seconds}&sig={hex(HMAC-SHA256(key, "{name}\n{expires}"))}
//! ```
//!
//! The signature covers the decoded name. Without a signing key, the plain
//! public URL is handed out instead.

use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use doc_orchestrator_core::blob::{BlobObject, BlobStore};
use doc_orchestrator_core::{PipelineError, Result};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::config::StorageConfig;

type HmacSha256 = Hmac<Sha256>;

const META_DIR: &str = ".content-types";
const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

pub struct LocalBlobStore {
    root: PathBuf,
    public_url: String,
    signing_key: Option<Vec<u8>>,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>, public_url: &str, signing_key: Option<Vec<u8>>) -> Self {
        Self {
            root: root.into(),
            public_url: public_url.trim_end_matches('/').to_string(),
            signing_key,
        }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(&config.root, &config.public_url, config.signing_key())
    }

    pub fn requires_signature(&self) -> bool {
        self.signing_key.is_some()
    }

    fn public_url_for(&self, name: &str) -> String {
        let encoded = name
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/");
        format!("{}/blobs/{}", self.public_url, encoded)
    }

    fn object_path(&self, name: &str) -> Result<PathBuf> {
        Ok(self.root.join(checked_name(name)?))
    }

    fn meta_path(&self, name: &str) -> Result<PathBuf> {
        Ok(self.root.join(META_DIR).join(checked_name(name)?))
    }

    fn sign(&self, key: &[u8], name: &str, expires: i64) -> Result<String> {
        let mut mac = HmacSha256::new_from_slice(key)
            .map_err(|e| PipelineError::Configuration(format!("invalid signing key: {}", e)))?;
        mac.update(format!("{}\n{}", name, expires).as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// Check a temporary access signature for `name`.
    ///
    /// Always true when no signing key is configured. Otherwise the
    /// signature must match and `expires` must not be in the past.
    pub fn verify_access(&self, name: &str, expires: i64, sig: &str, now: DateTime<Utc>) -> bool {
        let Some(key) = &self.signing_key else {
            return true;
        };
        if expires < now.timestamp() {
            return false;
        }
        let Ok(sig_bytes) = hex::decode(sig) else {
            return false;
        };
        let Ok(mut mac) = HmacSha256::new_from_slice(key) else {
            return false;
        };
        mac.update(format!("{}\n{}", name, expires).as_bytes());
        mac.verify_slice(&sig_bytes).is_ok()
    }
}

/// Reject names that could escape the storage root.
fn checked_name(name: &str) -> Result<&Path> {
    let path = Path::new(name);
    if name.is_empty() {
        return Err(PipelineError::Validation("blob name must not be empty".to_string()));
    }
    let escapes = path.components().any(|c| {
        !matches!(c, Component::Normal(_) | Component::CurDir)
    });
    if escapes {
        return Err(PipelineError::Validation(format!(
            "invalid blob name: '{}'",
            name
        )));
    }
    Ok(path)
}

fn io_err(name: &str, e: std::io::Error) -> PipelineError {
    if e.kind() == std::io::ErrorKind::NotFound {
        PipelineError::not_found("blob", name)
    } else {
        PipelineError::Storage(format!("blob '{}': {}", name, e))
    }
}

async fn write_file(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, bytes).await
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn upload(&self, name: &str, bytes: &[u8], content_type: &str) -> Result<String> {
        let path = self.object_path(name)?;
        let meta = self.meta_path(name)?;
        write_file(&path, bytes).await.map_err(|e| io_err(name, e))?;
        write_file(&meta, content_type.as_bytes())
            .await
            .map_err(|e| io_err(name, e))?;
        Ok(self.public_url_for(name))
    }

    async fn temporary_access_url(&self, name: &str, ttl: Duration) -> Result<String> {
        checked_name(name)?;
        let url = self.public_url_for(name);
        let Some(key) = &self.signing_key else {
            return Ok(url);
        };
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| PipelineError::Validation(format!("invalid access ttl: {}", e)))?;
        let expires = (Utc::now() + ttl).timestamp();
        let sig = self.sign(key, name, expires)?;
        Ok(format!("{}?expires={}&sig={}", url, expires, sig))
    }

    async fn exists(&self, name: &str) -> Result<bool> {
        let path = self.object_path(name)?;
        tokio::fs::try_exists(&path)
            .await
            .map_err(|e| io_err(name, e))
    }

    async fn delete(&self, name: &str) -> Result<()> {
        let path = self.object_path(name)?;
        tokio::fs::remove_file(&path)
            .await
            .map_err(|e| io_err(name, e))?;
        // The sidecar may be missing for objects copied in by hand
        let _ = tokio::fs::remove_file(self.meta_path(name)?).await;
        Ok(())
    }

    async fn read(&self, name: &str) -> Result<BlobObject> {
        let bytes = tokio::fs::read(self.object_path(name)?)
            .await
            .map_err(|e| io_err(name, e))?;
        let content_type = tokio::fs::read_to_string(self.meta_path(name)?)
            .await
            .map(|s| s.trim().to_string())
            .unwrap_or_else(|_| DEFAULT_CONTENT_TYPE.to_string());
        Ok(BlobObject {
            bytes,
            content_type,
        })
    }

    fn blob_name_for(&self, url: &str) -> String {
        let prefix = format!("{}/blobs/", self.public_url);
        match url.strip_prefix(&prefix) {
            Some(rest) => {
                let encoded = rest.split_once('?').map_or(rest, |(name, _)| name);
                urlencoding::decode(encoded)
                    .map(|name| name.into_owned())
                    .unwrap_or_else(|_| encoded.to_string())
            }
            None => url.to_string(),
        }
    }
}
