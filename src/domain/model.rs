use crate::utils::error::FetchError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub const DEFAULT_CONTENT_TYPE: &str = "text/xml";

/// Namespace-qualified name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QName {
    pub namespace: String,
    pub local: String,
}

impl QName {
    pub fn new(namespace: impl Into<String>, local: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            local: local.into(),
        }
    }

    pub fn is(&self, namespace: &str, local: &str) -> bool {
        self.namespace == namespace && self.local == local
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{}", self.local)
        } else {
            write!(f, "{{{}}}{}", self.namespace, self.local)
        }
    }
}

/// A fetched document. Identity is the URI.
///
/// `size` is the length of the bytes as fetched, before decoding. For
/// text built in memory it is the UTF-8 length of the content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    uri: String,
    content_type: String,
    content: String,
    size: usize,
}

impl Resource {
    pub fn new(
        uri: impl Into<String>,
        content_type: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        let content = content.into();
        Self {
            uri: uri.into(),
            content_type: content_type.into(),
            size: content.len(),
            content,
        }
    }

    /// Records the raw length of the bytes `content` was decoded from.
    pub fn with_fetched_size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Same URI and content type, different body.
    pub fn with_content(&self, content: impl Into<String>) -> Self {
        Self::new(self.uri.as_str(), self.content_type.as_str(), content)
    }
}

/// One entry of the resolution log kept by the tracking wrapper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedResource {
    pub uri: String,
    pub outcome: std::result::Result<Resource, FetchError>,
}

impl TrackedResource {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn resource(&self) -> Option<&Resource> {
        self.outcome.as_ref().ok()
    }
}

/// Serializable snapshot of a resolved document graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSet {
    pub base_uri: String,
    pub documents: BTreeMap<String, String>,
}

impl DocumentSet {
    pub fn new(base_uri: impl Into<String>) -> Self {
        Self {
            base_uri: base_uri.into(),
            documents: BTreeMap::new(),
        }
    }

    pub fn base_document(&self) -> Option<&str> {
        self.documents.get(&self.base_uri).map(String::as_str)
    }

    pub fn get(&self, uri: &str) -> Option<&str> {
        self.documents.get(uri).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Builds a set from a resolution log, keeping the first successful
    /// fetch of every URI.
    pub fn from_tracked(base_uri: impl Into<String>, tracked: &[TrackedResource]) -> Self {
        let mut set = Self::new(base_uri);
        for resource in tracked.iter().filter_map(TrackedResource::resource) {
            set.documents
                .entry(resource.uri().to_string())
                .or_insert_with(|| resource.content().to_string());
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qname_display() {
        assert_eq!(QName::new("urn:a", "Foo").to_string(), "{urn:a}Foo");
        assert_eq!(QName::new("", "Foo").to_string(), "Foo");
    }

    #[test]
    fn test_document_set_from_tracked_deduplicates() {
        let tracked = vec![
            TrackedResource {
                uri: "http://h/a.wsdl".into(),
                outcome: Ok(Resource::new("http://h/a.wsdl", DEFAULT_CONTENT_TYPE, "<a/>")),
            },
            TrackedResource {
                uri: "http://h/b.wsdl".into(),
                outcome: Err(FetchError::Http {
                    uri: "http://h/b.wsdl".into(),
                    status: 404,
                }),
            },
            TrackedResource {
                uri: "http://h/a.wsdl".into(),
                outcome: Ok(Resource::new("http://h/a.wsdl", DEFAULT_CONTENT_TYPE, "<again/>")),
            },
        ];

        let set = DocumentSet::from_tracked("http://h/a.wsdl", &tracked);
        assert_eq!(set.len(), 1);
        assert_eq!(set.base_document(), Some("<a/>"));
    }
}
