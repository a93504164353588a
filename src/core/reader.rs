use crate::core::definition::Definition;
use crate::domain::ports::FetchStrategy;
use crate::utils::error::Result;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// Every document loaded during one resolution pass. Index 0 is the base
/// document; imports point at other entries by index, so import cycles
/// are just back references.
#[derive(Debug, Clone)]
pub struct DefinitionGraph {
    documents: Vec<Definition>,
}

impl DefinitionGraph {
    pub fn root(&self) -> &Definition {
        &self.documents[0]
    }

    pub fn get(&self, index: usize) -> Option<&Definition> {
        self.documents.get(index)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Documents reachable from the root through imports, depth-first,
    /// each exactly once.
    pub fn closure(&self) -> Vec<&Definition> {
        let mut seen = HashSet::new();
        let mut order = Vec::new();
        let mut stack = vec![0usize];

        while let Some(index) = stack.pop() {
            if !seen.insert(index) {
                continue;
            }
            let Some(definition) = self.documents.get(index) else {
                continue;
            };
            order.push(definition);
            stack.extend(
                definition
                    .imports
                    .iter()
                    .rev()
                    .filter_map(|import| import.document),
            );
        }
        order
    }
}

/// Builds the definition graph by driving `strategy`: the base document
/// first, then every import depth-first, one fetch at a time.
///
/// A failing base document is fatal. A failing import is skipped with a
/// warning unless it hit the size limit.
pub async fn read<S>(strategy: &mut S) -> Result<DefinitionGraph>
where
    S: FetchStrategy + ?Sized,
{
    let base = strategy.fetch_base().await?;
    debug!("Parsing base document {}", base.uri());
    let root = Definition::parse(base.uri(), base.content())?;

    let mut documents = vec![root];
    let mut by_uri: HashMap<String, usize> = HashMap::new();
    by_uri.insert(base.uri().to_string(), 0);

    // (document, next import position)
    let mut stack = vec![(0usize, 0usize)];

    while let Some((index, position)) = stack.pop() {
        if position >= documents[index].imports.len() {
            continue;
        }
        stack.push((index, position + 1));

        let Some(location) = documents[index].imports[position].location.clone() else {
            debug!(
                "Import of namespace {:?} in {} has no location",
                documents[index].imports[position].namespace, documents[index].document_uri
            );
            continue;
        };
        let parent_uri = documents[index].document_uri.clone();

        let resource = match strategy.fetch_import(&parent_uri, &location).await {
            None => {
                warn!("Import '{}' from {} could not be resolved", location, parent_uri);
                continue;
            }
            Some(Err(e)) if e.is_size_limit() => return Err(e.into()),
            Some(Err(e)) => {
                warn!("Skipping import '{}' from {}: {}", location, parent_uri, e);
                documents[index].imports[position].resolved_uri = Some(e.uri().to_string());
                continue;
            }
            Some(Ok(resource)) => resource,
        };

        let uri = resource.uri().to_string();
        documents[index].imports[position].resolved_uri = Some(uri.clone());

        if let Some(&existing) = by_uri.get(&uri) {
            debug!("Import {} already loaded", uri);
            documents[index].imports[position].document = Some(existing);
            continue;
        }

        debug!("Parsing imported document {}", uri);
        let definition = Definition::parse(&uri, resource.content())?;
        let child = documents.len();
        documents.push(definition);
        by_uri.insert(uri, child);
        documents[index].imports[position].document = Some(child);
        stack.push((child, 0));
    }

    Ok(DefinitionGraph { documents })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{Resource, DEFAULT_CONTENT_TYPE};
    use crate::domain::ports::FetchResult;
    use crate::utils::error::{FetchError, WsdlError};
    use crate::utils::uri::resolve_reference;
    use async_trait::async_trait;

    /// In-memory strategy that counts fetches per URI.
    struct MapStrategy {
        base: String,
        documents: HashMap<String, String>,
        fetches: Vec<String>,
        last: Option<String>,
    }

    impl MapStrategy {
        fn new(base: &str, documents: &[(&str, &str)]) -> Self {
            Self {
                base: base.to_string(),
                documents: documents
                    .iter()
                    .map(|(u, c)| (u.to_string(), c.to_string()))
                    .collect(),
                fetches: Vec::new(),
                last: None,
            }
        }

        fn load(&mut self, uri: &str) -> Option<FetchResult> {
            self.fetches.push(uri.to_string());
            self.last = Some(uri.to_string());
            if uri.ends_with("huge.wsdl") {
                return Some(Err(FetchError::SizeLimitExceeded {
                    uri: uri.to_string(),
                    limit: 1,
                }));
            }
            self.documents
                .get(uri)
                .map(|c| Ok(Resource::new(uri, DEFAULT_CONTENT_TYPE, c.as_str())))
        }
    }

    #[async_trait]
    impl FetchStrategy for MapStrategy {
        fn base_uri(&self) -> &str {
            &self.base
        }

        async fn fetch_base(&mut self) -> FetchResult {
            let base = self.base.clone();
            self.load(&base).unwrap_or(Err(FetchError::Http { uri: base, status: 404 }))
        }

        async fn fetch_import(&mut self, parent_uri: &str, location: &str) -> Option<FetchResult> {
            let uri = resolve_reference(Some(parent_uri), location)?;
            self.load(&uri)
        }

        fn last_resolved_uri(&self) -> Option<&str> {
            self.last.as_deref()
        }
    }

    fn wsdl(imports: &[&str]) -> String {
        let imports: String = imports
            .iter()
            .map(|l| format!(r#"<w:import namespace="urn:x" location="{}"/>"#, l))
            .collect();
        format!(
            r#"<w:definitions xmlns:w="http://schemas.xmlsoap.org/wsdl/" targetNamespace="urn:x">{}</w:definitions>"#,
            imports
        )
    }

    #[tokio::test]
    async fn test_cyclic_imports_are_linked_by_index() {
        let a = wsdl(&["b.wsdl"]);
        let b = wsdl(&["a.wsdl", "missing.wsdl"]);
        let mut strategy =
            MapStrategy::new("http://h/a.wsdl", &[("http://h/a.wsdl", &a), ("http://h/b.wsdl", &b)]);

        let graph = read(&mut strategy).await.unwrap();
        assert_eq!(graph.len(), 2);
        assert_eq!(graph.root().imports[0].document, Some(1));
        assert_eq!(graph.get(1).unwrap().imports[0].document, Some(0));
        assert_eq!(graph.get(1).unwrap().imports[1].document, None);
        assert_eq!(graph.closure().len(), 2);
        // the back reference is fetched again before being recognized
        assert_eq!(
            strategy.fetches,
            vec![
                "http://h/a.wsdl",
                "http://h/b.wsdl",
                "http://h/a.wsdl",
                "http://h/missing.wsdl"
            ]
        );
    }

    #[tokio::test]
    async fn test_imports_are_visited_depth_first() {
        let root = wsdl(&["one.wsdl", "two.wsdl"]);
        let one = wsdl(&["deep.wsdl"]);
        let leaf = wsdl(&[]);
        let mut strategy = MapStrategy::new(
            "http://h/root.wsdl",
            &[
                ("http://h/root.wsdl", &root),
                ("http://h/one.wsdl", &one),
                ("http://h/two.wsdl", &leaf),
                ("http://h/deep.wsdl", &leaf),
            ],
        );

        read(&mut strategy).await.unwrap();
        assert_eq!(
            strategy.fetches,
            vec![
                "http://h/root.wsdl",
                "http://h/one.wsdl",
                "http://h/deep.wsdl",
                "http://h/two.wsdl"
            ]
        );
    }

    #[tokio::test]
    async fn test_size_limit_on_import_is_fatal() {
        let root = wsdl(&["huge.wsdl"]);
        let mut strategy = MapStrategy::new("http://h/root.wsdl", &[("http://h/root.wsdl", &root)]);
        let err = read(&mut strategy).await.unwrap_err();
        assert!(err.is_size_limit());
    }

    #[tokio::test]
    async fn test_missing_base_is_fatal() {
        let mut strategy = MapStrategy::new("http://h/root.wsdl", &[]);
        assert!(matches!(
            read(&mut strategy).await,
            Err(WsdlError::FetchError(FetchError::Http { status: 404, .. }))
        ));
    }
}
