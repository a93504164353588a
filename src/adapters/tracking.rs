use crate::config::FetchConfig;
use crate::domain::model::{Resource, TrackedResource};
use crate::domain::ports::{FetchResult, FetchStrategy};
use crate::utils::error::FetchError;
use crate::xml::sanitize::{self, Inspection, SCHEMA_STUB_WSDL};
use async_trait::async_trait;
use tracing::{debug, warn};

/// Records every fetch made through the wrapped strategy, successful or
/// not, in request order, and sanitizes fetched content on the way
/// through.
///
/// Meant for a single resolution pass. Re-fetching a URI appends a new
/// entry; nothing is deduplicated here.
pub struct TrackingFetchStrategy<S> {
    inner: S,
    config: FetchConfig,
    resources: Vec<TrackedResource>,
}

impl<S: FetchStrategy> TrackingFetchStrategy<S> {
    pub fn new(inner: S, config: FetchConfig) -> Self {
        Self {
            inner,
            config,
            resources: Vec::new(),
        }
    }

    pub fn resources(&self) -> &[TrackedResource] {
        &self.resources
    }

    pub fn into_resources(self) -> Vec<TrackedResource> {
        self.resources
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn record(&mut self, outcome: &FetchResult) {
        let uri = match outcome {
            Ok(resource) => resource.uri().to_string(),
            Err(e) => e.uri().to_string(),
        };
        self.resources.push(TrackedResource {
            uri,
            outcome: outcome.clone(),
        });
    }

    async fn track(&mut self, fetched: FetchResult, is_import: bool) -> FetchResult {
        let outcome = match fetched {
            Ok(resource) => self.sanitize(resource, is_import).await,
            Err(e) => Err(e),
        };
        self.record(&outcome);
        outcome
    }

    async fn sanitize(&mut self, resource: Resource, is_import: bool) -> FetchResult {
        let limit = self.config.effective_max_document_size();
        if resource.size() > limit {
            return Err(FetchError::SizeLimitExceeded {
                uri: resource.uri().to_string(),
                limit,
            });
        }

        match sanitize::inspect(resource.content()) {
            Inspection::Schema if is_import && self.config.strip_schemas => {
                debug!("Replacing schema document {} with a stub", resource.uri());
                Ok(resource.with_content(SCHEMA_STUB_WSDL))
            }
            Inspection::Doctype if self.config.strip_doctypes => {
                debug!("Removing DOCTYPE from {}", resource.uri());
                let replacements = self.fetch_entities(&resource).await?;
                let inlined = sanitize::inline_entities(resource.content(), &replacements);
                let clean = sanitize::strip_doctype(resource.uri(), &inlined)?;
                Ok(resource.with_content(clean))
            }
            _ => Ok(resource),
        }
    }

    /// Fetches the external entities declared by `resource` through the
    /// inner strategy, so the same access rules apply to them.
    async fn fetch_entities(
        &mut self,
        resource: &Resource,
    ) -> Result<Vec<(String, String)>, FetchError> {
        let mut replacements = Vec::new();

        for (name, system_id) in sanitize::external_entities(resource.content()) {
            match self.inner.fetch_import(resource.uri(), &system_id).await {
                Some(Ok(entity)) => {
                    let limit = self.config.effective_max_document_size();
                    if entity.size() > limit {
                        return Err(FetchError::SizeLimitExceeded {
                            uri: entity.uri().to_string(),
                            limit,
                        });
                    }
                    replacements.push((name, entity.content().to_string()));
                    self.record(&Ok(entity));
                }
                Some(Err(e)) => {
                    self.record(&Err(e.clone()));
                    if e.is_size_limit() {
                        return Err(e);
                    }
                    warn!("Unable to load entity '{}' for {}: {}", name, resource.uri(), e);
                }
                None => warn!(
                    "Entity '{}' in {} has unresolvable location '{}'",
                    name,
                    resource.uri(),
                    system_id
                ),
            }
        }

        Ok(replacements)
    }
}

#[async_trait]
impl<S: FetchStrategy> FetchStrategy for TrackingFetchStrategy<S> {
    fn base_uri(&self) -> &str {
        self.inner.base_uri()
    }

    async fn fetch_base(&mut self) -> FetchResult {
        let fetched = self.inner.fetch_base().await;
        self.track(fetched, false).await
    }

    async fn fetch_import(&mut self, parent_uri: &str, location: &str) -> Option<FetchResult> {
        let fetched = self.inner.fetch_import(parent_uri, location).await?;
        Some(self.track(fetched, true).await)
    }

    fn last_resolved_uri(&self) -> Option<&str> {
        self.inner.last_resolved_uri()
    }

    fn release(&mut self) {
        self.inner.release()
    }
}
