//! Object storage proxy client.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use reqwest::{multipart, Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{MediaError, Result};
use crate::resolver::{file_name, UrlResolver};

#[derive(Debug, Deserialize)]
struct UploadResponse {
    url: String,
}

#[derive(Debug, Serialize)]
struct DeleteRequest<'a> {
    filename: &'a str,
}

#[derive(Debug, Deserialize)]
struct DeleteResponse {
    success: bool,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// Talks to the `upload` and `delete` proxy endpoints. Signing happens
/// behind the proxy; this side only sees canonical URLs and success flags.
#[derive(Debug, Clone)]
pub struct StorageClient {
    client: Client,
    endpoint: String,
    resolver: Arc<UrlResolver>,
}

impl StorageClient {
    /// Creates a client for the proxy rooted at `endpoint`.
    ///
    /// # Errors
    /// Returns error if HTTP client creation fails.
    pub fn new(endpoint: impl Into<String>, resolver: Arc<UrlResolver>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| MediaError::Internal(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            resolver,
        })
    }

    /// Uploads a file and returns its canonical public URL.
    pub async fn upload(
        &self,
        filename: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String> {
        if filename.trim().is_empty() {
            return Err(MediaError::InvalidRequest("filename cannot be empty".to_string()));
        }

        let part = multipart::Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str(content_type)
            .map_err(|e| MediaError::InvalidRequest(format!("bad content type: {e}")))?;
        let form = multipart::Form::new().part("file", part);

        debug!("Uploading {} to storage proxy", filename);
        let response = self
            .client
            .post(format!("{}/upload", self.endpoint))
            .multipart(form)
            .send()
            .await
            .map_err(|e| MediaError::Storage(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(error_from(status, response).await);
        }

        let body: UploadResponse = response
            .json()
            .await
            .map_err(|e| MediaError::Storage(format!("failed to parse upload response: {e}")))?;

        // The proxy may still hand back legacy storage hosts
        let url = self.resolver.resolve(Some(&body.url));
        info!("Uploaded {} -> {}", filename, url);
        Ok(url)
    }

    /// Deletes a file by name. Returns the proxy's success flag.
    pub async fn delete(&self, filename: &str) -> Result<bool> {
        let filename = file_name(filename);
        if filename.is_empty() {
            return Err(MediaError::InvalidRequest("filename cannot be empty".to_string()));
        }

        let response = self
            .client
            .post(format!("{}/delete", self.endpoint))
            .json(&DeleteRequest { filename })
            .send()
            .await
            .map_err(|e| MediaError::Storage(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(error_from(status, response).await);
        }

        let body: DeleteResponse = response
            .json()
            .await
            .map_err(|e| MediaError::Storage(format!("failed to parse delete response: {e}")))?;

        if !body.success {
            warn!("Storage proxy reported failure deleting {}", filename);
        }
        Ok(body.success)
    }
}

async fn error_from(status: StatusCode, response: reqwest::Response) -> MediaError {
    let message = match response.json::<ErrorBody>().await {
        Ok(body) => body.error,
        Err(_) => format!("HTTP {status}"),
    };
    MediaError::Storage(message)
}

/// Stored files that no record references, compared by file name so
/// canonical, legacy and bare forms of the same object match.
pub fn find_orphans(stored: &[String], referenced: &[String]) -> Vec<String> {
    let in_use: HashSet<&str> = referenced
        .iter()
        .map(|r| file_name(r.split(['?', '#']).next().unwrap_or(r)))
        .filter(|name| !name.is_empty())
        .collect();

    stored
        .iter()
        .filter(|s| !in_use.contains(file_name(s)))
        .cloned()
        .collect()
}
