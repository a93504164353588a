use crate::domain::model::{DocumentSet, Resource, DEFAULT_CONTENT_TYPE};
use crate::domain::ports::{FetchResult, FetchStrategy};
use crate::utils::error::{FetchError, Result, WsdlError};
use crate::utils::uri::resolve_reference;
use async_trait::async_trait;

/// Serves documents from a saved [`DocumentSet`]. Never touches the
/// network or the file system.
#[derive(Debug, Clone)]
pub struct ReplayFetchStrategy {
    documents: DocumentSet,
    last_resolved: Option<String>,
}

impl ReplayFetchStrategy {
    /// Fails up front when the set does not hold its own base document.
    pub fn new(documents: &DocumentSet) -> Result<Self> {
        if documents.base_document().is_none() {
            return Err(WsdlError::MissingBaseDocumentError {
                uri: documents.base_uri.clone(),
            });
        }
        Ok(Self {
            documents: documents.clone(),
            last_resolved: None,
        })
    }

    fn lookup(&self, uri: &str) -> Option<Resource> {
        self.documents
            .get(uri)
            .map(|content| Resource::new(uri, DEFAULT_CONTENT_TYPE, content))
    }
}

#[async_trait]
impl FetchStrategy for ReplayFetchStrategy {
    fn base_uri(&self) -> &str {
        &self.documents.base_uri
    }

    async fn fetch_base(&mut self) -> FetchResult {
        let uri = self.documents.base_uri.clone();
        self.last_resolved = Some(uri.clone());
        // `new` guarantees presence; a miss still reads as a failed fetch
        self.lookup(&uri).ok_or_else(|| FetchError::Io {
            uri,
            message: "document not present in document set".to_string(),
        })
    }

    async fn fetch_import(&mut self, parent_uri: &str, location: &str) -> Option<FetchResult> {
        self.last_resolved = Some(location.to_string());
        let uri = resolve_reference(Some(parent_uri), location)?;
        self.last_resolved = Some(uri.clone());
        tracing::debug!("Replaying {}", uri);
        self.lookup(&uri).map(Ok)
    }

    fn last_resolved_uri(&self) -> Option<&str> {
        self.last_resolved.as_deref()
    }
}
