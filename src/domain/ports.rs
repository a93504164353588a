use crate::domain::model::Resource;
use crate::utils::error::FetchError;
use async_trait::async_trait;

pub type FetchResult = std::result::Result<Resource, FetchError>;

/// Source of WSDL documents for one resolution pass.
///
/// The reader calls `fetch_base` once and then `fetch_import` once per
/// import it meets, depth-first, never concurrently. A failed fetch comes
/// back as `Err` so the caller decides whether it is fatal. `fetch_import`
/// returns `None` when the import does not exist at all (unresolvable
/// location, unknown URI in a replay map).
#[async_trait]
pub trait FetchStrategy: Send {
    fn base_uri(&self) -> &str;

    async fn fetch_base(&mut self) -> FetchResult;

    async fn fetch_import(&mut self, parent_uri: &str, location: &str) -> Option<FetchResult>;

    /// URI of the most recent fetch attempt, set even when resolution fails.
    fn last_resolved_uri(&self) -> Option<&str>;

    fn release(&mut self) {}
}

#[async_trait]
impl<T: FetchStrategy + ?Sized> FetchStrategy for Box<T> {
    fn base_uri(&self) -> &str {
        (**self).base_uri()
    }

    async fn fetch_base(&mut self) -> FetchResult {
        (**self).fetch_base().await
    }

    async fn fetch_import(&mut self, parent_uri: &str, location: &str) -> Option<FetchResult> {
        (**self).fetch_import(parent_uri, location).await
    }

    fn last_resolved_uri(&self) -> Option<&str> {
        (**self).last_resolved_uri()
    }

    fn release(&mut self) {
        (**self).release()
    }
}
