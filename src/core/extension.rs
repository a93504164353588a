//! Extensibility elements attached to WSDL constructs.
//!
//! Only a handful of extensions matter for resolution and the model
//! queries, so they are a closed enum. Everything else is kept verbatim in
//! [`Extension::Opaque`].

use crate::core::policy::{WSP_15_NS, WSP_2004_NS};
use crate::xml::XmlElement;
use roxmltree::Node;

pub const SOAP11_NS: &str = "http://schemas.xmlsoap.org/wsdl/soap/";
pub const SOAP12_NS: &str = "http://schemas.xmlsoap.org/wsdl/soap12/";
pub const HTTP_NS: &str = "http://schemas.xmlsoap.org/wsdl/http/";
pub const MIME_NS: &str = "http://schemas.xmlsoap.org/wsdl/mime/";

pub const SOAP11_ENVELOPE_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";
pub const SOAP12_ENVELOPE_NS: &str = "http://www.w3.org/2003/05/soap-envelope";
pub const ENVELOPE_NAMESPACES: [&str; 2] = [SOAP11_ENVELOPE_NS, SOAP12_ENVELOPE_NS];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoapVersion {
    Soap11,
    Soap12,
}

impl SoapVersion {
    fn from_namespace(ns: &str) -> Option<Self> {
        match ns {
            SOAP11_NS => Some(SoapVersion::Soap11),
            SOAP12_NS => Some(SoapVersion::Soap12),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MimePart {
    pub name: Option<String>,
    pub extensions: Vec<Extension>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extension {
    SoapBinding {
        version: SoapVersion,
        style: Option<String>,
        transport: Option<String>,
    },
    SoapOperation {
        version: SoapVersion,
        style: Option<String>,
        soap_action: Option<String>,
    },
    SoapBody {
        version: SoapVersion,
        use_: Option<String>,
        namespace: Option<String>,
    },
    SoapAddress {
        version: SoapVersion,
        location: Option<String>,
    },
    HttpBinding {
        verb: Option<String>,
    },
    MimeMultipartRelated {
        parts: Vec<MimePart>,
    },
    Policy(XmlElement),
    PolicyReference(XmlElement),
    Opaque(XmlElement),
}

fn attr(node: Node<'_, '_>, name: &str) -> Option<String> {
    node.attribute(name)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl Extension {
    pub fn from_node(node: Node<'_, '_>) -> Self {
        let tag = node.tag_name();
        let ns = tag.namespace().unwrap_or("");
        let local = tag.name();

        if let Some(version) = SoapVersion::from_namespace(ns) {
            match local {
                "binding" => {
                    return Extension::SoapBinding {
                        version,
                        style: attr(node, "style"),
                        transport: attr(node, "transport"),
                    }
                }
                "operation" => {
                    return Extension::SoapOperation {
                        version,
                        style: attr(node, "style"),
                        soap_action: attr(node, "soapAction"),
                    }
                }
                "body" => {
                    return Extension::SoapBody {
                        version,
                        use_: attr(node, "use"),
                        namespace: attr(node, "namespace"),
                    }
                }
                "address" => {
                    return Extension::SoapAddress {
                        version,
                        location: attr(node, "location"),
                    }
                }
                _ => {}
            }
        }

        match (ns, local) {
            (HTTP_NS, "binding") => Extension::HttpBinding {
                verb: attr(node, "verb"),
            },
            (MIME_NS, "multipartRelated") => Extension::MimeMultipartRelated {
                parts: node
                    .children()
                    .filter(|c| c.has_tag_name((MIME_NS, "part")))
                    .map(|part| MimePart {
                        name: attr(part, "name"),
                        extensions: part
                            .children()
                            .filter(Node::is_element)
                            .map(Extension::from_node)
                            .collect(),
                    })
                    .collect(),
            },
            (WSP_2004_NS | WSP_15_NS, "Policy") => Extension::Policy(XmlElement::detached(node)),
            (WSP_2004_NS | WSP_15_NS, "PolicyReference") => {
                Extension::PolicyReference(XmlElement::detached(node))
            }
            _ => Extension::Opaque(XmlElement::detached(node)),
        }
    }

    pub fn is_policy(&self) -> bool {
        matches!(self, Extension::Policy(_))
    }

    pub fn is_policy_reference(&self) -> bool {
        matches!(self, Extension::PolicyReference(_))
    }

    pub fn is_binding_protocol(&self) -> bool {
        matches!(
            self,
            Extension::SoapBinding { .. } | Extension::HttpBinding { .. }
        )
    }

    pub fn soap_address(&self) -> Option<(SoapVersion, Option<&str>)> {
        match self {
            Extension::SoapAddress { version, location } => Some((*version, location.as_deref())),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first_extension(xml: &str) -> Extension {
        let doc = roxmltree::Document::parse(xml).unwrap();
        let child = doc.root_element().first_element_child().unwrap();
        Extension::from_node(child)
    }

    #[test]
    fn test_soap_extensions() {
        let ext = first_extension(&format!(
            r#"<r xmlns:s="{SOAP12_NS}"><s:body use="literal" namespace=""/></r>"#
        ));
        assert_eq!(
            ext,
            Extension::SoapBody {
                version: SoapVersion::Soap12,
                use_: Some("literal".into()),
                namespace: None
            }
        );

        let ext = first_extension(&format!(
            r#"<r xmlns:s="{SOAP11_NS}"><s:address location="http://h/svc"/></r>"#
        ));
        assert_eq!(
            ext.soap_address(),
            Some((SoapVersion::Soap11, Some("http://h/svc")))
        );
    }

    #[test]
    fn test_multipart_parts_keep_their_extensions() {
        let ext = first_extension(&format!(
            r#"<r xmlns:m="{MIME_NS}" xmlns:s="{SOAP11_NS}">
                 <m:multipartRelated>
                   <m:part name="body"><s:body use="literal"/></m:part>
                   <m:part><m:content part="file" type="application/octet-stream"/></m:part>
                 </m:multipartRelated>
               </r>"#
        ));
        let Extension::MimeMultipartRelated { parts } = ext else {
            panic!("expected multipart");
        };
        assert_eq!(parts.len(), 2);
        assert!(matches!(parts[0].extensions[0], Extension::SoapBody { .. }));
        assert!(matches!(parts[1].extensions[0], Extension::Opaque(_)));
    }

    #[test]
    fn test_policy_kinds() {
        let ext = first_extension(&format!(
            r##"<r xmlns:wsp="{WSP_2004_NS}"><wsp:PolicyReference URI="#P1"/></r>"##
        ));
        assert!(ext.is_policy_reference());
        assert!(!ext.is_policy());

        let ext = first_extension(r#"<r><other/></r>"#);
        assert!(matches!(ext, Extension::Opaque(_)));
    }
}
