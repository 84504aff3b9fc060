//! Content Fetcher
//!
//! Resolves a `DocumentRef` locator to raw bytes and an effective MIME type.
//! Three paths:
//! 1. Object-storage URLs (s3:// or S3 HTTPS endpoints) via authenticated
//!    `object_store` access. Private buckets are never fetched with an
//!    anonymous GET.
//! 2. Other http(s) URLs via plain reqwest GET.
//! 3. Everything else is a path read relative to the document root.

use std::path::{Component, Path};

use bytes::Bytes;
use object_store::aws::AmazonS3Builder;
use object_store::Attribute;
use url::Url;

use super::config::AnalysisConfig;
use super::error::{AnalysisError, Result};
use super::types::DocumentRef;

/// Raw bytes plus the effective MIME type for one document.
#[derive(Debug, Clone)]
pub struct FetchedDocument {
    pub bytes: Bytes,
    pub content_type: String,
}

/// Fetch one document's bytes. The effective MIME type is the storage
/// response's content type when present, else the declared one.
pub async fn fetch_document(cfg: &AnalysisConfig, doc: &DocumentRef) -> Result<FetchedDocument> {
    if let Ok(url) = Url::parse(&doc.locator) {
        if let Some((bucket, key)) = parse_storage_url(&url) {
            return fetch_from_storage(doc, &bucket, &key).await;
        }
        if matches!(url.scheme(), "http" | "https") {
            return fetch_from_http(doc, &url).await;
        }
        // Unknown scheme (e.g. ftp://) is not a local path either
        return Err(AnalysisError::InvalidLocator {
            locator: doc.locator.clone(),
        });
    }

    fetch_local(cfg, doc).await
}

async fn fetch_from_storage(doc: &DocumentRef, bucket: &str, key: &str) -> Result<FetchedDocument> {
    tracing::debug!("[Fetcher] Storage fetch: bucket={} key={}", bucket, key);

    // Credentials come from the environment (AWS_ACCESS_KEY_ID etc.)
    let store = AmazonS3Builder::from_env()
        .with_bucket_name(bucket)
        .build()?;

    let result = object_store::ObjectStore::get(&store, &object_store::path::Path::from(key)).await?;

    let content_type = result
        .attributes
        .get(&Attribute::ContentType)
        .map(|v| v.to_string())
        .filter(|ct| !ct.is_empty())
        .unwrap_or_else(|| doc.mime_type.clone());

    let bytes = result.bytes().await?;

    Ok(FetchedDocument { bytes, content_type })
}

async fn fetch_from_http(doc: &DocumentRef, url: &Url) -> Result<FetchedDocument> {
    tracing::debug!("[Fetcher] HTTP fetch: {}", url);

    let response = super::client::http_client()
        .get(url.clone())
        .send()
        .await?
        .error_for_status()?;

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.split(';').next().unwrap_or(ct).trim().to_string())
        .filter(|ct| !ct.is_empty())
        .unwrap_or_else(|| doc.mime_type.clone());

    let bytes = response.bytes().await?;

    Ok(FetchedDocument { bytes, content_type })
}

async fn fetch_local(cfg: &AnalysisConfig, doc: &DocumentRef) -> Result<FetchedDocument> {
    let relative = Path::new(&doc.locator);

    // Uploads never legitimately escape the document root
    let escapes = relative.is_absolute()
        || relative
            .components()
            .any(|c| matches!(c, Component::ParentDir));
    if escapes {
        return Err(AnalysisError::InvalidLocator {
            locator: doc.locator.clone(),
        });
    }

    let path = cfg.document_root.join(relative);
    tracing::debug!("[Fetcher] Local read: {}", path.display());

    let bytes = tokio::fs::read(&path).await?;

    Ok(FetchedDocument {
        bytes: Bytes::from(bytes),
        content_type: doc.mime_type.clone(),
    })
}

/// Recognize object-storage URLs and split them into (bucket, key).
///
/// Accepted shapes:
/// - `s3://bucket/key`
/// - virtual-host style `https://bucket.s3.<region>.amazonaws.com/key`
/// - path style `https://s3.<region>.amazonaws.com/bucket/key`
pub fn parse_storage_url(url: &Url) -> Option<(String, String)> {
    let key = url.path().trim_start_matches('/');

    if url.scheme() == "s3" {
        let bucket = url.host_str()?;
        if bucket.is_empty() || key.is_empty() {
            return None;
        }
        return Some((bucket.to_string(), key.to_string()));
    }

    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }

    let host = url.host_str()?;
    if !host.ends_with(".amazonaws.com") {
        return None;
    }

    if let Some(bucket) = host.split_once(".s3").map(|(b, _)| b).filter(|b| !b.is_empty()) {
        // Virtual-host style
        if key.is_empty() {
            return None;
        }
        return Some((bucket.to_string(), key.to_string()));
    }

    if host.starts_with("s3.") || host == "s3.amazonaws.com" {
        // Path style: first segment is the bucket
        let (bucket, key) = key.split_once('/')?;
        if bucket.is_empty() || key.is_empty() {
            return None;
        }
        return Some((bucket.to_string(), key.to_string()));
    }

    None
}
