use crate::config::FetchConfig;
use crate::domain::model::{Resource, DEFAULT_CONTENT_TYPE};
use crate::domain::ports::{FetchResult, FetchStrategy};
use crate::utils::encoding::decode_document;
use crate::utils::error::{FetchError, Result, WsdlError};
use crate::utils::uri::{is_local, resolve_reference};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use url::Url;

/// Fetches documents over HTTP(S) and from `file:` URIs.
pub struct LiveFetchStrategy {
    base_uri: String,
    base_content: Option<String>,
    config: FetchConfig,
    client: Client,
    last_resolved: Option<String>,
}

impl LiveFetchStrategy {
    pub fn new(base_uri: impl Into<String>, config: FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| WsdlError::ConfigError {
                message: format!("unable to build HTTP client: {}", e),
            })?;

        Ok(Self {
            base_uri: base_uri.into(),
            base_content: None,
            config,
            client,
            last_resolved: None,
        })
    }

    /// Serves `content` as the base document instead of fetching it.
    pub fn with_base_content(mut self, content: impl Into<String>) -> Self {
        self.base_content = Some(content.into());
        self
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    pub async fn fetch(&self, uri: &str) -> FetchResult {
        let parsed = Url::parse(uri).map_err(|_| FetchError::UnsupportedScheme {
            uri: uri.to_string(),
        })?;

        match parsed.scheme() {
            "http" | "https" => self.fetch_http(uri).await,
            "file" => self.fetch_file(&parsed, uri).await,
            _ => Err(FetchError::UnsupportedScheme {
                uri: uri.to_string(),
            }),
        }
    }

    async fn fetch_http(&self, uri: &str) -> FetchResult {
        let limit = self.config.effective_max_document_size();
        let network = |e: reqwest::Error| FetchError::Network {
            uri: uri.to_string(),
            message: e.to_string(),
        };

        tracing::debug!("Fetching {}", uri);
        let mut response = self.client.get(uri).send().await.map_err(network)?;
        tracing::debug!("Response status for {}: {}", uri, response.status());

        if !response.status().is_success() {
            return Err(FetchError::Http {
                uri: uri.to_string(),
                status: response.status().as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let too_large = || FetchError::SizeLimitExceeded {
            uri: uri.to_string(),
            limit,
        };

        if response.content_length().is_some_and(|len| len > limit as u64) {
            return Err(too_large());
        }

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(network)? {
            if body.len() + chunk.len() > limit {
                return Err(too_large());
            }
            body.extend_from_slice(&chunk);
        }

        Self::into_resource(uri, &body, content_type)
    }

    async fn fetch_file(&self, parsed: &Url, uri: &str) -> FetchResult {
        let limit = self.config.effective_max_document_size();
        let io = |e: std::io::Error| FetchError::Io {
            uri: uri.to_string(),
            message: e.to_string(),
        };

        let path = parsed.to_file_path().map_err(|_| FetchError::Io {
            uri: uri.to_string(),
            message: "not a local file path".to_string(),
        })?;

        tracing::debug!("Reading {}", path.display());
        let file = tokio::fs::File::open(&path).await.map_err(io)?;
        let mut body = Vec::new();
        file.take(limit as u64 + 1)
            .read_to_end(&mut body)
            .await
            .map_err(io)?;

        if body.len() > limit {
            return Err(FetchError::SizeLimitExceeded {
                uri: uri.to_string(),
                limit,
            });
        }

        Self::into_resource(uri, &body, None)
    }

    fn into_resource(uri: &str, body: &[u8], content_type: Option<String>) -> FetchResult {
        let content = decode_document(uri, body, content_type.as_deref())?;
        Ok(Resource::new(
            uri,
            content_type.unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string()),
            content,
        )
        .with_fetched_size(body.len()))
    }
}

#[async_trait]
impl FetchStrategy for LiveFetchStrategy {
    fn base_uri(&self) -> &str {
        &self.base_uri
    }

    async fn fetch_base(&mut self) -> FetchResult {
        self.last_resolved = Some(self.base_uri.clone());
        match &self.base_content {
            Some(content) => Ok(Resource::new(
                self.base_uri.as_str(),
                DEFAULT_CONTENT_TYPE,
                content.as_str(),
            )),
            None => self.fetch(&self.base_uri).await,
        }
    }

    async fn fetch_import(&mut self, parent_uri: &str, location: &str) -> Option<FetchResult> {
        self.last_resolved = Some(location.to_string());
        let uri = resolve_reference(Some(parent_uri), location)?;
        self.last_resolved = Some(uri.clone());

        if is_local(&uri) && !self.config.allow_local_imports {
            return Some(Err(FetchError::LocalAccessDenied { uri }));
        }

        Some(self.fetch(&uri).await)
    }

    fn last_resolved_uri(&self) -> Option<&str> {
        self.last_resolved.as_deref()
    }

    fn release(&mut self) {
        self.base_content = None;
    }
}
