//! Owned WSDL 1.1 definition for a single document.
//!
//! Imports are recorded by location; the reader links them to other
//! documents of the resolution arena by index once they are parsed.

use crate::core::extension::Extension;
use crate::domain::model::QName;
use crate::utils::error::{Result, WsdlError};
use crate::xml::{self, XmlElement, XSD_NS};
use roxmltree::{Document, Node};

pub const WSDL_NS: &str = "http://schemas.xmlsoap.org/wsdl/";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Wsdl,
    /// A bare `xs:schema` reached through a WSDL import.
    Schema,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    pub namespace: Option<String>,
    pub location: Option<String>,
    pub resolved_uri: Option<String>,
    /// Arena index of the imported document, when it could be loaded.
    pub document: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaFragment {
    pub target_namespace: String,
    pub element: XmlElement,
}

impl SchemaFragment {
    /// Names of the top-level `xs:element` declarations.
    pub fn element_names(&self) -> impl Iterator<Item = QName> + '_ {
        self.element
            .child_elements()
            .filter(|e| e.is(XSD_NS, "element"))
            .filter_map(|e| e.attribute("name"))
            .map(|name| QName::new(self.target_namespace.as_str(), name))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    pub name: String,
    pub element: Option<QName>,
    pub type_name: Option<QName>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub name: QName,
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationMessage {
    pub name: Option<String>,
    pub message: Option<QName>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    pub name: String,
    pub input: Option<OperationMessage>,
    pub output: Option<OperationMessage>,
    pub faults: Vec<OperationMessage>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortType {
    pub name: QName,
    pub operations: Vec<Operation>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingMessage {
    pub name: Option<String>,
    pub extensions: Vec<Extension>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingOperation {
    pub name: String,
    pub extensions: Vec<Extension>,
    pub input: Option<BindingMessage>,
    pub output: Option<BindingMessage>,
    pub faults: Vec<BindingMessage>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub name: QName,
    pub port_type: Option<QName>,
    pub operations: Vec<BindingOperation>,
    pub extensions: Vec<Extension>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Port {
    pub name: String,
    pub binding: Option<QName>,
    pub extensions: Vec<Extension>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Service {
    pub name: QName,
    pub ports: Vec<Port>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Definition {
    pub document_uri: String,
    pub kind: DocumentKind,
    pub target_namespace: String,
    pub name: Option<String>,
    pub imports: Vec<Import>,
    pub types: Vec<SchemaFragment>,
    pub messages: Vec<Message>,
    pub port_types: Vec<PortType>,
    pub bindings: Vec<Binding>,
    pub services: Vec<Service>,
    /// Extensibility elements directly under `wsdl:definitions`.
    pub extensions: Vec<Extension>,
    /// Whole document, used for re-serialization.
    pub root: XmlElement,
}

impl Definition {
    /// Parses one document. DOCTYPEs are expected to have been stripped
    /// upstream and are rejected here.
    pub fn parse(uri: &str, text: &str) -> Result<Self> {
        let doc = Document::parse_with_options(text, xml::parse_options(false))
            .map_err(|e| WsdlError::format(uri, e.to_string()))?;
        let root = doc.root_element();

        if root.has_tag_name((XSD_NS, "schema")) {
            return Ok(Self::schema_document(uri, root));
        }
        if !root.has_tag_name((WSDL_NS, "definitions")) {
            return Err(WsdlError::format(
                uri,
                format!(
                    "expected wsdl:definitions, found {}",
                    QName::new(root.tag_name().namespace().unwrap_or(""), root.tag_name().name())
                ),
            ));
        }

        let target_namespace = root.attribute("targetNamespace").unwrap_or("").to_string();
        let mut definition = Self::empty(uri, DocumentKind::Wsdl, target_namespace, root);
        definition.name = root.attribute("name").map(str::to_string);

        for child in root.children().filter(Node::is_element) {
            if child.tag_name().namespace() != Some(WSDL_NS) {
                definition.extensions.push(Extension::from_node(child));
                continue;
            }
            definition.read_top_level(child);
        }

        Ok(definition)
    }

    fn empty(uri: &str, kind: DocumentKind, target_namespace: String, root: Node<'_, '_>) -> Self {
        Self {
            document_uri: uri.to_string(),
            kind,
            target_namespace,
            name: None,
            imports: Vec::new(),
            types: Vec::new(),
            messages: Vec::new(),
            port_types: Vec::new(),
            bindings: Vec::new(),
            services: Vec::new(),
            extensions: Vec::new(),
            root: XmlElement::from_node(root),
        }
    }

    fn schema_document(uri: &str, root: Node<'_, '_>) -> Self {
        let target_namespace = root.attribute("targetNamespace").unwrap_or("").to_string();
        let mut definition =
            Self::empty(uri, DocumentKind::Schema, target_namespace.clone(), root);
        definition.types.push(SchemaFragment {
            target_namespace,
            element: definition.root.clone(),
        });
        definition
    }

    fn qualified(&self, local: &str) -> QName {
        QName::new(self.target_namespace.as_str(), local)
    }

    fn read_top_level(&mut self, node: Node<'_, '_>) {
        match node.tag_name().name() {
            "import" => self.imports.push(Import {
                namespace: node.attribute("namespace").map(str::to_string),
                location: node.attribute("location").map(str::to_string),
                resolved_uri: None,
                document: None,
            }),
            "types" => {
                for schema in node.children().filter(|c| c.has_tag_name((XSD_NS, "schema"))) {
                    self.types.push(SchemaFragment {
                        target_namespace: schema
                            .attribute("targetNamespace")
                            .unwrap_or("")
                            .to_string(),
                        element: XmlElement::detached(schema),
                    });
                }
            }
            "message" => {
                let name = self.qualified(node.attribute("name").unwrap_or(""));
                let parts = wsdl_children(node, "part")
                    .map(|part| Part {
                        name: part.attribute("name").unwrap_or("").to_string(),
                        element: qname_attribute(part, "element"),
                        type_name: qname_attribute(part, "type"),
                    })
                    .collect();
                self.messages.push(Message { name, parts });
            }
            "portType" => {
                let name = self.qualified(node.attribute("name").unwrap_or(""));
                let operations = wsdl_children(node, "operation").map(read_operation).collect();
                self.port_types.push(PortType { name, operations });
            }
            "binding" => {
                let name = self.qualified(node.attribute("name").unwrap_or(""));
                self.bindings.push(Binding {
                    name,
                    port_type: qname_attribute(node, "type"),
                    operations: wsdl_children(node, "operation")
                        .map(read_binding_operation)
                        .collect(),
                    extensions: extensions(node),
                });
            }
            "service" => {
                let name = self.qualified(node.attribute("name").unwrap_or(""));
                let ports = wsdl_children(node, "port")
                    .map(|port| Port {
                        name: port.attribute("name").unwrap_or("").to_string(),
                        binding: qname_attribute(port, "binding"),
                        extensions: extensions(port),
                    })
                    .collect();
                self.services.push(Service { name, ports });
            }
            _ => {}
        }
    }
}

fn wsdl_children<'a, 'input: 'a>(
    node: Node<'a, 'input>,
    local: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    node.children()
        .filter(move |c| c.has_tag_name((WSDL_NS, local)))
}

/// Extensibility elements: element children outside the WSDL namespace.
fn extensions(node: Node<'_, '_>) -> Vec<Extension> {
    node.children()
        .filter(|c| c.is_element() && c.tag_name().namespace() != Some(WSDL_NS))
        .map(Extension::from_node)
        .collect()
}

/// Resolves a `prefix:local` attribute value against the namespaces in
/// scope on `node`.
fn qname_attribute(node: Node<'_, '_>, attr: &str) -> Option<QName> {
    let value = node.attribute(attr)?.trim();
    if value.is_empty() {
        return None;
    }
    let (prefix, local) = match value.split_once(':') {
        Some((prefix, local)) => (Some(prefix), local),
        None => (None, value),
    };
    let namespace = node.lookup_namespace_uri(prefix).unwrap_or("");
    Some(QName::new(namespace, local))
}

fn operation_message(node: Node<'_, '_>) -> OperationMessage {
    OperationMessage {
        name: node.attribute("name").map(str::to_string),
        message: qname_attribute(node, "message"),
    }
}

fn read_operation(node: Node<'_, '_>) -> Operation {
    Operation {
        name: node.attribute("name").unwrap_or("").to_string(),
        input: wsdl_children(node, "input").next().map(operation_message),
        output: wsdl_children(node, "output").next().map(operation_message),
        faults: wsdl_children(node, "fault").map(operation_message).collect(),
    }
}

fn binding_message(node: Node<'_, '_>) -> BindingMessage {
    BindingMessage {
        name: node.attribute("name").map(str::to_string),
        extensions: extensions(node),
    }
}

fn read_binding_operation(node: Node<'_, '_>) -> BindingOperation {
    BindingOperation {
        name: node.attribute("name").unwrap_or("").to_string(),
        extensions: extensions(node),
        input: wsdl_children(node, "input").next().map(binding_message),
        output: wsdl_children(node, "output").next().map(binding_message),
        faults: wsdl_children(node, "fault").map(binding_message).collect(),
    }
}
