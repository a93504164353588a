//! Owned XML element tree.
//!
//! `roxmltree` documents borrow their source text, so everything the
//! definition graph keeps is copied into [`XmlElement`]s. The tree remembers
//! where namespaces were declared and the original attribute order, which
//! makes [`XmlElement::to_document_string`] stable across a
//! serialize/parse/serialize cycle.

pub mod sanitize;

use crate::domain::model::QName;
use roxmltree::{Document, Node, ParsingOptions};
use std::borrow::Cow;

pub const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";
pub const XSD_NS: &str = "http://www.w3.org/2001/XMLSchema";

/// Upper bound on nodes (including entity expansions) for one document.
pub const NODES_LIMIT: u32 = 4_000_000;

pub const XML_DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace {
    pub prefix: Option<String>,
    pub uri: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlAttribute {
    pub name: QName,
    pub prefix: Option<String>,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlElement {
    pub name: QName,
    pub prefix: Option<String>,
    /// Declarations made on this element (all in-scope ones for a detached copy).
    pub namespaces: Vec<Namespace>,
    pub attributes: Vec<XmlAttribute>,
    pub children: Vec<XmlNode>,
}

pub fn parse_options(allow_dtd: bool) -> ParsingOptions {
    ParsingOptions {
        allow_dtd,
        nodes_limit: NODES_LIMIT,
    }
}

/// Parses `text` into an owned tree rooted at the document element.
pub fn parse_element(text: &str, allow_dtd: bool) -> Result<XmlElement, roxmltree::Error> {
    let doc = Document::parse_with_options(text, parse_options(allow_dtd))?;
    Ok(XmlElement::from_node(doc.root_element()))
}

impl XmlElement {
    pub fn from_node(node: Node<'_, '_>) -> Self {
        Self::build(node, declared_namespaces(node))
    }

    /// Copy of `node` carrying every namespace in scope, so it can be
    /// serialized on its own without losing prefixes bound by ancestors.
    pub fn detached(node: Node<'_, '_>) -> Self {
        let namespaces = node
            .namespaces()
            .filter(|ns| ns.uri() != XML_NS)
            .map(|ns| Namespace {
                prefix: ns.name().map(str::to_string),
                uri: ns.uri().to_string(),
            })
            .collect();
        Self::build(node, namespaces)
    }

    fn build(node: Node<'_, '_>, namespaces: Vec<Namespace>) -> Self {
        let tag = node.tag_name();
        let name = QName::new(tag.namespace().unwrap_or(""), tag.name());
        let prefix = tag
            .namespace()
            .and_then(|uri| node.lookup_prefix(uri))
            .map(str::to_string);

        let attributes = node
            .attributes()
            .map(|attr| XmlAttribute {
                name: QName::new(attr.namespace().unwrap_or(""), attr.name()),
                prefix: attr.namespace().and_then(|uri| attribute_prefix(node, uri)),
                value: attr.value().to_string(),
            })
            .collect();

        let children = node
            .children()
            .filter_map(|child| {
                if child.is_element() {
                    Some(XmlNode::Element(XmlElement::from_node(child)))
                } else if child.is_text() {
                    child.text().map(|t| XmlNode::Text(t.to_string()))
                } else {
                    None
                }
            })
            .collect();

        Self {
            name,
            prefix,
            namespaces,
            attributes,
            children,
        }
    }

    pub fn is(&self, namespace: &str, local: &str) -> bool {
        self.name.is(namespace, local)
    }

    /// Unqualified attribute value.
    pub fn attribute(&self, local: &str) -> Option<&str> {
        self.attribute_ns("", local)
    }

    pub fn attribute_ns(&self, namespace: &str, local: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name.is(namespace, local))
            .map(|a| a.value.as_str())
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|c| match c {
            XmlNode::Element(e) => Some(e),
            XmlNode::Text(_) => None,
        })
    }

    pub fn text(&self) -> String {
        self.children
            .iter()
            .map(|c| match c {
                XmlNode::Text(t) => Cow::Borrowed(t.as_str()),
                XmlNode::Element(e) => Cow::Owned(e.text()),
            })
            .collect()
    }

    /// Keeps only the direct child elements accepted by `keep`; text is untouched.
    pub fn retain_children<F>(&mut self, mut keep: F)
    where
        F: FnMut(&XmlElement) -> bool,
    {
        self.children.retain(|c| match c {
            XmlNode::Element(e) => keep(e),
            XmlNode::Text(_) => true,
        });
    }

    pub fn to_xml_string(&self) -> String {
        let mut out = String::new();
        write_element(&mut out, self);
        out
    }

    pub fn to_document_string(&self) -> String {
        let mut out = String::from(XML_DECLARATION);
        out.push('\n');
        write_element(&mut out, self);
        out
    }
}

fn declared_namespaces(node: Node<'_, '_>) -> Vec<Namespace> {
    let inherited: Vec<_> = node
        .parent_element()
        .map(|p| p.namespaces().collect())
        .unwrap_or_default();

    node.namespaces()
        .filter(|ns| ns.uri() != XML_NS)
        .filter(|ns| {
            !inherited
                .iter()
                .any(|p| p.name() == ns.name() && p.uri() == ns.uri())
        })
        .map(|ns| Namespace {
            prefix: ns.name().map(str::to_string),
            uri: ns.uri().to_string(),
        })
        .collect()
}

fn attribute_prefix(node: Node<'_, '_>, uri: &str) -> Option<String> {
    if uri == XML_NS {
        return Some("xml".to_string());
    }
    node.namespaces()
        .find(|ns| ns.uri() == uri && ns.name().is_some())
        .and_then(|ns| ns.name())
        .map(str::to_string)
}

fn write_name(out: &mut String, prefix: Option<&str>, local: &str) {
    if let Some(prefix) = prefix {
        out.push_str(prefix);
        out.push(':');
    }
    out.push_str(local);
}

fn escape_attribute(value: &str) -> String {
    quick_xml::escape::escape(value)
        .replace('\t', "&#9;")
        .replace('\n', "&#10;")
        .replace('\r', "&#13;")
}

fn escape_text(value: &str) -> String {
    quick_xml::escape::escape(value).replace('\r', "&#13;")
}

fn write_element(out: &mut String, element: &XmlElement) {
    out.push('<');
    write_name(out, element.prefix.as_deref(), &element.name.local);

    for ns in &element.namespaces {
        match &ns.prefix {
            Some(prefix) => {
                out.push_str(" xmlns:");
                out.push_str(prefix);
            }
            None => out.push_str(" xmlns"),
        }
        out.push_str("=\"");
        out.push_str(&escape_attribute(&ns.uri));
        out.push('"');
    }

    for attr in &element.attributes {
        out.push(' ');
        write_name(out, attr.prefix.as_deref(), &attr.name.local);
        out.push_str("=\"");
        out.push_str(&escape_attribute(&attr.value));
        out.push('"');
    }

    if element.children.is_empty() {
        out.push_str("/>");
        return;
    }

    out.push('>');
    for child in &element.children {
        match child {
            XmlNode::Element(e) => write_element(out, e),
            XmlNode::Text(t) => out.push_str(&escape_text(t)),
        }
    }
    out.push_str("</");
    write_name(out, element.prefix.as_deref(), &element.name.local);
    out.push('>');
}
