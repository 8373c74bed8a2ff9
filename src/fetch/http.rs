//! reqwest-backed fetcher.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client};
use tracing::{debug, warn};

use super::{FetchError, Fetcher};
use crate::config::Config;
use crate::error::{MediaError, Result};
use crate::resolver::MediaKind;

const USER_AGENT: &str = concat!("atelier-media/", env!("CARGO_PKG_VERSION"));

/// Fetches media over HTTP.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    /// Origin prepended to root-relative URLs
    origin: Option<String>,
}

impl HttpFetcher {
    /// Creates a fetcher that can only fetch absolute URLs.
    ///
    /// # Errors
    /// Returns error if HTTP client creation fails.
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| MediaError::Internal(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            origin: None,
        })
    }

    /// Fetcher for a configured site. Root-relative URLs go to
    /// `SITE_ORIGIN`, never to the public media base.
    pub fn from_config(config: &Config) -> Result<Self> {
        let fetcher = Self::new()?;
        Ok(match &config.site_origin {
            Some(origin) => fetcher.with_origin(origin.clone()),
            None => fetcher,
        })
    }

    pub fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }

    /// Resolves root-relative URLs such as the placeholder against `origin`.
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into().trim_end_matches('/').to_string());
        self
    }

    fn absolute(&self, url: &str) -> std::result::Result<String, FetchError> {
        if url.starts_with('/') {
            return match &self.origin {
                Some(origin) => Ok(format!("{origin}{url}")),
                None => Err(FetchError::Network(format!(
                    "no origin configured for relative URL {url}"
                ))),
            };
        }
        Ok(url.to_string())
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> std::result::Result<MediaKind, FetchError> {
        let target = self.absolute(url)?;
        debug!(url = %target, "Fetching media");

        let response = self
            .client
            .get(&target)
            .header(header::ACCEPT, "image/*,video/*;q=0.9,*/*;q=0.5")
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, url = %target, "Media request failed");
                FetchError::Network(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let kind = match response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
        {
            Some(content_type) => MediaKind::from_content_type(content_type).ok_or_else(|| {
                FetchError::Decode(format!("unexpected content type {content_type}"))
            })?,
            None => MediaKind::from_reference(&target),
        };

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;
        if body.is_empty() {
            return Err(FetchError::Decode("empty body".to_string()));
        }

        Ok(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::get, Router};

    async fn spawn_origin() -> String {
        let app = Router::new()
            .route(
                "/ok.jpg",
                get(|| async {
                    ([(header::CONTENT_TYPE, "image/jpeg")], vec![0xFFu8, 0xD8, 0xFF])
                }),
            )
            .route(
                "/clip.mp4",
                get(|| async { ([(header::CONTENT_TYPE, "video/mp4")], vec![0u8; 16]) }),
            )
            .route(
                "/page",
                get(|| async { ([(header::CONTENT_TYPE, "text/html")], "<html></html>") }),
            )
            .route("/gone.jpg", get(|| async { StatusCode::NOT_FOUND }));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn test_fetch_image_and_video() {
        let origin = spawn_origin().await;
        let fetcher = HttpFetcher::new().unwrap();

        let kind = fetcher.fetch(&format!("{origin}/ok.jpg")).await.unwrap();
        assert_eq!(kind, MediaKind::Image);

        let kind = fetcher.fetch(&format!("{origin}/clip.mp4")).await.unwrap();
        assert_eq!(kind, MediaKind::Video);
    }

    #[tokio::test]
    async fn test_fetch_error_status() {
        let origin = spawn_origin().await;
        let fetcher = HttpFetcher::new().unwrap();

        let result = fetcher.fetch(&format!("{origin}/gone.jpg")).await;
        assert_eq!(result, Err(FetchError::Status(404)));
    }

    #[tokio::test]
    async fn test_fetch_rejects_non_media() {
        let origin = spawn_origin().await;
        let fetcher = HttpFetcher::new().unwrap();

        let result = fetcher.fetch(&format!("{origin}/page")).await;
        assert!(matches!(result, Err(FetchError::Decode(_))));
    }

    #[tokio::test]
    async fn test_root_relative_uses_origin() {
        let origin = spawn_origin().await;

        let without = HttpFetcher::new().unwrap();
        assert!(matches!(
            without.fetch("/ok.jpg").await,
            Err(FetchError::Network(_))
        ));

        let with = HttpFetcher::new().unwrap().with_origin(format!("{origin}/"));
        assert_eq!(with.fetch("/ok.jpg").await, Ok(MediaKind::Image));
    }

    #[test]
    fn test_origin_comes_from_site_not_media_base() {
        let config = Config {
            public_base_url: Some("https://cdn.example.com".to_string()),
            ..Config::default()
        };
        assert_eq!(HttpFetcher::from_config(&config).unwrap().origin(), None);

        let config = Config {
            public_base_url: Some("https://cdn.example.com".to_string()),
            site_origin: Some("https://atelier.example.com/".to_string()),
            ..Config::default()
        };
        assert_eq!(
            HttpFetcher::from_config(&config).unwrap().origin(),
            Some("https://atelier.example.com")
        );
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let fetcher = HttpFetcher::new().unwrap();
        let result = fetcher.fetch(&format!("http://{addr}/ok.jpg")).await;
        assert!(matches!(result, Err(FetchError::Network(_))));
    }
}
