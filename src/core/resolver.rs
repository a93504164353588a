use crate::adapters::{LiveFetchStrategy, ReplayFetchStrategy, TrackingFetchStrategy};
use crate::config::FetchConfig;
use crate::core::schema::SchemaAnalysis;
use crate::core::wsdl::Wsdl;
use crate::domain::model::{DocumentSet, TrackedResource};
use crate::domain::ports::FetchStrategy;
use crate::utils::error::Result;
use tracing::{debug, info, warn};

/// Outcome of one resolution pass.
#[derive(Debug)]
pub struct Resolution {
    pub wsdl: Wsdl,
    /// Every fetch in request order, duplicates included.
    pub resources: Vec<TrackedResource>,
}

impl Resolution {
    /// Deduplicated snapshot of the resolved import closure.
    pub fn snapshot(&self) -> DocumentSet {
        self.wsdl.snapshot()
    }

    pub fn schema_analysis(&self) -> SchemaAnalysis {
        SchemaAnalysis::new(&self.wsdl)
    }

    pub fn failed_fetches(&self) -> impl Iterator<Item = &TrackedResource> {
        self.resources.iter().filter(|r| !r.is_success())
    }
}

/// Entry point: resolves a WSDL and its imports into a [`Wsdl`] model.
#[derive(Debug, Clone, Default)]
pub struct WsdlResolver {
    config: FetchConfig,
}

impl WsdlResolver {
    pub fn new(config: FetchConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Fetches `uri` and everything it imports.
    pub async fn resolve(&self, uri: &str) -> Result<Resolution> {
        let strategy = LiveFetchStrategy::new(uri, self.config.clone())?;
        self.run(strategy).await
    }

    /// Uses `text` as the content of `uri`; only imports are fetched.
    pub async fn resolve_text(&self, uri: &str, text: &str) -> Result<Resolution> {
        let strategy = LiveFetchStrategy::new(uri, self.config.clone())?.with_base_content(text);
        self.run(strategy).await
    }

    /// Rebuilds a model from a snapshot without any I/O.
    pub async fn replay(&self, documents: &DocumentSet) -> Result<Resolution> {
        let strategy = ReplayFetchStrategy::new(documents)?;
        self.run(strategy).await
    }

    async fn run<S: FetchStrategy>(&self, strategy: S) -> Result<Resolution> {
        let base_uri = strategy.base_uri().to_string();
        info!("Resolving WSDL {}", base_uri);

        let mut tracking = TrackingFetchStrategy::new(strategy, self.config.clone());
        let result = Wsdl::from_strategy(&mut tracking).await;
        tracking.release();

        let wsdl = match result {
            Ok(wsdl) => wsdl,
            Err(e) => {
                warn!(
                    "Resolution of {} failed (last location {:?}): {}",
                    base_uri,
                    tracking.last_resolved_uri(),
                    e
                );
                return Err(e);
            }
        };

        let resources = tracking.into_resources();
        debug!(
            "Resolved {} documents with {} fetches",
            wsdl.graph().len(),
            resources.len()
        );
        Ok(Resolution { wsdl, resources })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::WsdlError;

    fn documents() -> DocumentSet {
        let mut set = DocumentSet::new("http://h/a/root.wsdl");
        set.documents.insert(
            "http://h/a/root.wsdl".into(),
            r#"<definitions xmlns="http://schemas.xmlsoap.org/wsdl/" targetNamespace="urn:r">
                 <import namespace="urn:c" location="common.wsdl"/>
                 <import namespace="urn:gone" location="gone.wsdl"/>
               </definitions>"#
                .into(),
        );
        set.documents.insert(
            "http://h/a/common.wsdl".into(),
            r#"<definitions xmlns="http://schemas.xmlsoap.org/wsdl/" targetNamespace="urn:c"><message name="M"/></definitions>"#.into(),
        );
        set
    }

    #[tokio::test]
    async fn test_replay_round_trip_is_stable() {
        let resolver = WsdlResolver::default();
        let first = resolver.replay(&documents()).await.unwrap();
        assert_eq!(first.wsdl.messages().len(), 1);

        let snapshot = first.snapshot();
        assert_eq!(snapshot.len(), 2);

        let second = resolver.replay(&snapshot).await.unwrap();
        assert_eq!(second.snapshot(), snapshot);
    }

    #[tokio::test]
    async fn test_replay_requires_base_document() {
        let resolver = WsdlResolver::default();
        let mut set = documents();
        set.base_uri = "http://h/a/other.wsdl".into();
        assert!(matches!(
            resolver.replay(&set).await,
            Err(WsdlError::MissingBaseDocumentError { .. })
        ));
    }

    #[tokio::test]
    async fn test_resolve_text_without_imports_needs_no_network() {
        let resolver = WsdlResolver::default();
        let resolution = resolver
            .resolve_text(
                "http://unreachable.invalid/svc.wsdl",
                r#"<definitions xmlns="http://schemas.xmlsoap.org/wsdl/" targetNamespace="urn:s"/>"#,
            )
            .await
            .unwrap();
        assert_eq!(resolution.wsdl.target_namespace(), "urn:s");
        assert_eq!(resolution.resources.len(), 1);
        assert_eq!(resolution.failed_fetches().count(), 0);
    }
}
