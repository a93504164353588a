//! Document Model over a resolved definition graph.
//!
//! Every enumeration walks the whole import closure. Derived values that
//! are expensive or consulted repeatedly are computed once per model and
//! cached in `OnceLock`s; the graph itself never changes after
//! construction, so a rebuilt model is the only way to see new text.

use crate::core::definition::{
    Binding, BindingMessage, BindingOperation, Definition, Message, Operation, Port, PortType,
    SchemaFragment, Service,
};
use crate::core::extension::{
    Extension, MimePart, SoapVersion, ENVELOPE_NAMESPACES, SOAP11_ENVELOPE_NS,
};
use crate::core::policy::{self, Policy, PolicyRegistry};
use crate::core::reader::{self, DefinitionGraph};
use crate::domain::model::{DocumentSet, QName};
use crate::domain::ports::FetchStrategy;
use crate::utils::error::{Result, WsdlError};
use crate::xml::XmlElement;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::sync::OnceLock;
use tracing::warn;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BindingFilter {
    #[default]
    All,
    Soap,
    Http,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingStyle {
    Document,
    Rpc,
}

impl BindingStyle {
    fn parse(value: Option<&str>) -> Option<Self> {
        match value?.trim() {
            v if v.eq_ignore_ascii_case("rpc") => Some(BindingStyle::Rpc),
            v if v.eq_ignore_ascii_case("document") => Some(BindingStyle::Document),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BindingStyle::Document => "document",
            BindingStyle::Rpc => "rpc",
        }
    }
}

impl fmt::Display for BindingStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoapUse {
    Literal,
    Encoded,
}

impl SoapUse {
    fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("encoded") {
            SoapUse::Encoded
        } else {
            SoapUse::Literal
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SoapUse::Literal => "literal",
            SoapUse::Encoded => "encoded",
        }
    }
}

impl fmt::Display for SoapUse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
pub struct Wsdl {
    graph: DefinitionGraph,
    soap_port: OnceLock<Option<Port>>,
    policies: OnceLock<Vec<XmlElement>>,
    policy_registry: OnceLock<PolicyRegistry>,
    binding_styles: OnceLock<HashMap<BindingSlot, BindingStyle>>,
    multipart_operations: OnceLock<HashSet<(BindingSlot, usize)>>,
}

/// Position of a binding in the graph: document index, binding index.
/// Names are not unique across imported documents.
type BindingSlot = (usize, usize);

const ENVELOPE_PREFIX: &str = "soapenv";
const GENERATED_PREFIX: &str = "ns";

impl Wsdl {
    pub fn new(graph: DefinitionGraph) -> Self {
        Self {
            graph,
            soap_port: OnceLock::new(),
            policies: OnceLock::new(),
            policy_registry: OnceLock::new(),
            binding_styles: OnceLock::new(),
            multipart_operations: OnceLock::new(),
        }
    }

    pub async fn from_strategy<S>(strategy: &mut S) -> Result<Self>
    where
        S: FetchStrategy + ?Sized,
    {
        Ok(Self::new(reader::read(strategy).await?))
    }

    pub fn graph(&self) -> &DefinitionGraph {
        &self.graph
    }

    pub fn root(&self) -> &Definition {
        self.graph.root()
    }

    pub fn document_uri(&self) -> &str {
        &self.root().document_uri
    }

    pub fn target_namespace(&self) -> &str {
        &self.root().target_namespace
    }

    fn definitions(&self) -> Vec<&Definition> {
        self.graph.closure()
    }

    // Enumerations

    pub fn services(&self) -> Vec<&Service> {
        self.definitions()
            .into_iter()
            .flat_map(|d| d.services.iter())
            .collect()
    }

    pub fn bindings(&self, filter: BindingFilter) -> Vec<&Binding> {
        self.definitions()
            .into_iter()
            .flat_map(|d| d.bindings.iter())
            .filter(|b| match filter {
                BindingFilter::All => true,
                BindingFilter::Soap => {
                    matches!(self.binding_protocol(b), Some(Extension::SoapBinding { .. }))
                }
                BindingFilter::Http => {
                    matches!(self.binding_protocol(b), Some(Extension::HttpBinding { .. }))
                }
            })
            .collect()
    }

    pub fn binding_operations(&self, filter: BindingFilter) -> Vec<&BindingOperation> {
        self.bindings(filter)
            .into_iter()
            .flat_map(|b| b.operations.iter())
            .collect()
    }

    pub fn port_types(&self) -> Vec<&PortType> {
        self.definitions()
            .into_iter()
            .flat_map(|d| d.port_types.iter())
            .collect()
    }

    pub fn messages(&self) -> Vec<&Message> {
        self.definitions()
            .into_iter()
            .flat_map(|d| d.messages.iter())
            .collect()
    }

    pub fn schema_fragments(&self) -> Vec<&SchemaFragment> {
        self.definitions()
            .into_iter()
            .flat_map(|d| d.types.iter())
            .collect()
    }

    pub fn message(&self, name: &QName) -> Option<&Message> {
        self.messages().into_iter().find(|m| &m.name == name)
    }

    pub fn port_type(&self, name: &QName) -> Option<&PortType> {
        self.port_types().into_iter().find(|p| &p.name == name)
    }

    pub fn binding_by_name(&self, local: &str) -> Option<&Binding> {
        self.bindings(BindingFilter::All)
            .into_iter()
            .find(|b| b.name.local == local)
    }

    /// Binding that declares `operation`.
    pub fn binding_for(&self, operation: &BindingOperation) -> Option<&Binding> {
        self.bindings(BindingFilter::All)
            .into_iter()
            .find(|b| b.operations.iter().any(|op| std::ptr::eq(op, operation)))
    }

    fn require_binding_for(&self, operation: &BindingOperation) -> Result<&Binding> {
        self.binding_for(operation)
            .ok_or_else(|| WsdlError::UnknownOperationError {
                operation: operation.name.clone(),
            })
    }

    fn indexed_bindings(&self) -> impl Iterator<Item = (BindingSlot, &Binding)> + '_ {
        (0..self.graph.len())
            .filter_map(move |d| self.graph.get(d).map(|definition| (d, definition)))
            .flat_map(|(d, definition)| {
                definition
                    .bindings
                    .iter()
                    .enumerate()
                    .map(move |(b, binding)| ((d, b), binding))
            })
    }

    fn binding_slot(&self, binding: &Binding) -> Option<BindingSlot> {
        self.indexed_bindings()
            .find(|(_, b)| std::ptr::eq(*b, binding))
            .map(|(slot, _)| slot)
    }

    fn operation_slot(&self, operation: &BindingOperation) -> Option<(BindingSlot, usize)> {
        self.indexed_bindings().find_map(|(slot, b)| {
            b.operations
                .iter()
                .position(|op| std::ptr::eq(op, operation))
                .map(|o| (slot, o))
        })
    }

    /// First SOAP or HTTP binding extension.
    pub fn binding_protocol<'a>(&self, binding: &'a Binding) -> Option<&'a Extension> {
        binding.extensions.iter().find(|e| e.is_binding_protocol())
    }

    // Messages of a binding operation, through its port type

    fn abstract_operation(&self, operation: &BindingOperation) -> Option<&Operation> {
        let binding = self.binding_for(operation)?;
        let port_type = self.port_type(binding.port_type.as_ref()?)?;
        port_type
            .operations
            .iter()
            .find(|op| op.name == operation.name)
    }

    pub fn input_message(&self, operation: &BindingOperation) -> Option<&Message> {
        let name = self.abstract_operation(operation)?.input.as_ref()?.message.as_ref()?;
        self.message(name)
    }

    pub fn output_message(&self, operation: &BindingOperation) -> Option<&Message> {
        let name = self.abstract_operation(operation)?.output.as_ref()?.message.as_ref()?;
        self.message(name)
    }

    // Ports and addresses

    /// The single SOAP port of the first service. SOAP 1.1 is preferred
    /// over SOAP 1.2.
    pub fn soap_port(&self) -> Option<&Port> {
        self.soap_port
            .get_or_init(|| self.find_soap_port())
            .as_ref()
    }

    pub fn require_soap_port(&self) -> Result<&Port> {
        self.soap_port()
            .ok_or_else(|| WsdlError::format(self.document_uri(), "no SOAP port found"))
    }

    fn find_soap_port(&self) -> Option<Port> {
        let services = self.services();
        if services.len() > 1 {
            warn!(
                "WSDL {} declares {} services, only the first is used",
                self.document_uri(),
                services.len()
            );
        }
        let service = services.first()?;

        let soap11 = ports_with_address(service, SoapVersion::Soap11);
        let soap12 = ports_with_address(service, SoapVersion::Soap12);

        if soap11.len() + soap12.len() > 1 {
            warn!(
                "Service {} has {} SOAP ports, using the first",
                service.name,
                soap11.len() + soap12.len()
            );
        }

        soap11.first().or(soap12.first()).map(|p| (*p).clone())
    }

    /// SOAP address of `port`, SOAP 1.1 first.
    pub fn uri_from_port<'a>(&self, port: &'a Port) -> Option<&'a str> {
        let addresses: Vec<_> = port
            .extensions
            .iter()
            .filter_map(Extension::soap_address)
            .collect();
        if addresses.len() > 1 {
            warn!("Port {} has {} SOAP addresses", port.name, addresses.len());
        }

        addresses
            .iter()
            .find(|(v, _)| *v == SoapVersion::Soap11)
            .or_else(|| addresses.first())
            .and_then(|(_, location)| *location)
    }

    pub fn port_url(&self, port: &Port) -> Option<Url> {
        let location = self.uri_from_port(port)?;
        match Url::parse(location) {
            Ok(url) => Some(url),
            Err(e) => {
                warn!("Invalid address '{}' on port {}: {}", location, port.name, e);
                None
            }
        }
    }

    pub fn service_uri(&self) -> Option<&str> {
        self.uri_from_port(self.soap_port()?)
    }

    pub fn service_name(&self) -> Option<&str> {
        self.services().first().map(|s| s.name.local.as_str())
    }

    // Style and use

    fn declared_style(binding: &Binding) -> BindingStyle {
        binding
            .extensions
            .iter()
            .find_map(|e| match e {
                Extension::SoapBinding { style, .. } => BindingStyle::parse(style.as_deref()),
                _ => None,
            })
            .unwrap_or(BindingStyle::Document)
    }

    /// Style declared by the binding's SOAP extension. HTTP bindings and
    /// bindings without a declared style are document style.
    pub fn binding_style_of(&self, binding: &Binding) -> BindingStyle {
        let styles = self.binding_styles.get_or_init(|| {
            self.indexed_bindings()
                .map(|(slot, b)| (slot, Self::declared_style(b)))
                .collect()
        });
        self.binding_slot(binding)
            .and_then(|slot| styles.get(&slot).copied())
            .unwrap_or_else(|| Self::declared_style(binding))
    }

    /// Operation style, falling back to the binding's style and finally
    /// to document (never rpc).
    pub fn binding_style(&self, operation: &BindingOperation) -> BindingStyle {
        let declared = operation.extensions.iter().find_map(|e| match e {
            Extension::SoapOperation { style, .. } => BindingStyle::parse(style.as_deref()),
            _ => None,
        });
        declared
            .or_else(|| self.binding_for(operation).map(|b| self.binding_style_of(b)))
            .unwrap_or(BindingStyle::Document)
    }

    fn message_use(message: Option<&BindingMessage>) -> Option<SoapUse> {
        fn find(extensions: &[Extension]) -> Option<SoapUse> {
            extensions.iter().find_map(|e| match e {
                Extension::SoapBody { use_: Some(u), .. } => Some(SoapUse::parse(u)),
                Extension::MimeMultipartRelated { parts } => {
                    parts.iter().find_map(|p| find(&p.extensions))
                }
                _ => None,
            })
        }
        find(&message?.extensions)
    }

    /// Use of an operation's bodies. Input and output must agree.
    pub fn soap_use(&self, operation: &BindingOperation) -> Result<SoapUse> {
        let input = Self::message_use(operation.input.as_ref());
        let output = Self::message_use(operation.output.as_ref());
        match (input, output) {
            (Some(i), Some(o)) if i != o => Err(WsdlError::format(
                self.document_uri(),
                format!(
                    "operation '{}' mixes {} input with {} output",
                    operation.name, i, o
                ),
            )),
            (Some(u), _) | (None, Some(u)) => Ok(u),
            (None, None) => Ok(SoapUse::Literal),
        }
    }

    /// Use shared by every operation of a SOAP binding.
    pub fn soap_use_of_binding(&self, binding: &Binding) -> Result<SoapUse> {
        if !matches!(self.binding_protocol(binding), Some(Extension::SoapBinding { .. })) {
            return Err(WsdlError::NotSoapBindingError {
                binding: binding.name.to_string(),
            });
        }

        let mut found: Option<SoapUse> = None;
        for operation in &binding.operations {
            let use_ = self.soap_use(operation)?;
            match found {
                Some(existing) if existing != use_ => {
                    return Err(WsdlError::format(
                        self.document_uri(),
                        format!(
                            "binding '{}' mixes {} and {} operations",
                            binding.name, existing, use_
                        ),
                    ))
                }
                _ => found = Some(use_),
            }
        }
        Ok(found.unwrap_or(SoapUse::Literal))
    }

    // Multipart

    fn multipart_of(message: Option<&BindingMessage>) -> Option<&[MimePart]> {
        message?.extensions.iter().find_map(|e| match e {
            Extension::MimeMultipartRelated { parts } => Some(parts.as_slice()),
            _ => None,
        })
    }

    pub fn mime_multipart_input<'a>(&self, operation: &'a BindingOperation) -> Option<&'a [MimePart]> {
        Self::multipart_of(operation.input.as_ref())
    }

    pub fn mime_multipart_output<'a>(&self, operation: &'a BindingOperation) -> Option<&'a [MimePart]> {
        Self::multipart_of(operation.output.as_ref())
    }

    fn declares_multipart(operation: &BindingOperation) -> bool {
        Self::multipart_of(operation.input.as_ref()).is_some()
            || Self::multipart_of(operation.output.as_ref()).is_some()
    }

    pub fn is_multipart(&self, operation: &BindingOperation) -> bool {
        let multipart = self.multipart_operations.get_or_init(|| {
            self.indexed_bindings()
                .flat_map(|(slot, b)| {
                    b.operations
                        .iter()
                        .enumerate()
                        .filter(|(_, op)| Self::declares_multipart(op))
                        .map(move |(o, _)| (slot, o))
                })
                .collect()
        });

        match self.operation_slot(operation) {
            Some(slot) => multipart.contains(&slot),
            None => Self::declares_multipart(operation),
        }
    }

    pub fn has_multipart_operations(&self) -> bool {
        self.binding_operations(BindingFilter::All)
            .into_iter()
            .any(|op| self.is_multipart(op))
    }

    pub fn input_extensions<'a>(&self, operation: &'a BindingOperation) -> &'a [Extension] {
        operation
            .input
            .as_ref()
            .map(|m| m.extensions.as_slice())
            .unwrap_or_default()
    }

    pub fn output_extensions<'a>(&self, operation: &'a BindingOperation) -> &'a [Extension] {
        operation
            .output
            .as_ref()
            .map(|m| m.extensions.as_slice())
            .unwrap_or_default()
    }

    fn body_namespace(extensions: &[Extension]) -> Option<&str> {
        extensions.iter().find_map(|e| match e {
            Extension::SoapBody { namespace, .. } => namespace.as_deref(),
            Extension::MimeMultipartRelated { parts } => {
                parts.iter().find_map(|p| Self::body_namespace(&p.extensions))
            }
            _ => None,
        })
    }

    /// `soap:body` namespace of the input, else the target namespace.
    pub fn binding_input_namespace(&self, operation: &BindingOperation) -> String {
        Self::body_namespace(self.input_extensions(operation))
            .unwrap_or_else(|| self.target_namespace())
            .to_string()
    }

    pub fn binding_output_namespace(&self, operation: &BindingOperation) -> String {
        Self::body_namespace(self.output_extensions(operation))
            .unwrap_or_else(|| self.target_namespace())
            .to_string()
    }

    // Namespaces

    /// Prefix bindings for building request messages, in order: the
    /// target namespace and any SOAP envelope namespace declared on the
    /// root (by URI), a `soapenv` envelope binding when none is declared,
    /// then every input `soap:body` namespace not already bound.
    ///
    /// Default-namespace and undeclared URIs get `ns1`, `ns2`, ...
    pub fn namespaces(&self) -> Vec<(String, String)> {
        let target = self.target_namespace();

        let mut declared: BTreeMap<&str, Option<&str>> = BTreeMap::new();
        for ns in &self.root().root.namespaces {
            let prefix = ns.prefix.as_deref().filter(|p| !p.is_empty());
            let slot = declared.entry(ns.uri.as_str()).or_insert(prefix);
            if slot.is_none() {
                *slot = prefix;
            }
        }

        let mut bound: Vec<(Option<String>, String)> = declared
            .into_iter()
            .filter(|(uri, _)| ENVELOPE_NAMESPACES.contains(uri) || *uri == target)
            .map(|(uri, prefix)| (prefix.map(str::to_string), uri.to_string()))
            .collect();

        if !bound
            .iter()
            .any(|(_, uri)| ENVELOPE_NAMESPACES.contains(&uri.as_str()))
        {
            let taken = bound
                .iter()
                .any(|(prefix, _)| prefix.as_deref() == Some(ENVELOPE_PREFIX));
            bound.push((
                (!taken).then(|| ENVELOPE_PREFIX.to_string()),
                SOAP11_ENVELOPE_NS.to_string(),
            ));
        }

        for operation in self.binding_operations(BindingFilter::All) {
            let Some(uri) = Self::body_namespace(self.input_extensions(operation)) else {
                continue;
            };
            if !uri.is_empty() && !bound.iter().any(|(_, u)| u == uri) {
                bound.push((None, uri.to_string()));
            }
        }

        let mut generated = 0;
        bound
            .into_iter()
            .map(|(prefix, uri)| {
                let prefix = prefix.unwrap_or_else(|| {
                    generated += 1;
                    format!("{}{}", GENERATED_PREFIX, generated)
                });
                (prefix, uri)
            })
            .collect()
    }

    // Policies

    pub fn is_policy(element: &XmlElement) -> bool {
        policy::is_policy_element(element)
    }

    pub fn is_policy_reference(element: &XmlElement) -> bool {
        policy::is_policy_reference_element(element)
    }

    /// Top-level policies of the root document.
    pub fn policies(&self) -> &[XmlElement] {
        self.policies.get_or_init(|| {
            self.root()
                .extensions
                .iter()
                .filter_map(|e| match e {
                    Extension::Policy(element) => Some(element.clone()),
                    _ => None,
                })
                .collect()
        })
    }

    pub fn policy_registry(&self) -> &PolicyRegistry {
        self.policy_registry
            .get_or_init(|| PolicyRegistry::from_policies(self.policies()))
    }

    pub fn to_policy_reference<'a>(&self, extension: &'a Extension) -> Option<&'a str> {
        match extension {
            Extension::PolicyReference(element) => policy::reference_uri(element),
            _ => None,
        }
    }

    /// Normalized policy for a policy or policy reference extension.
    ///
    /// A reference without a URI is logged and treated as absent; a URI
    /// that is not registered is a [`WsdlError::BadPolicyReferenceError`].
    pub fn to_policy(&self, extension: &Extension) -> Result<Option<Policy>> {
        match extension {
            Extension::Policy(element) => {
                Policy::from_element(element, self.policy_registry()).map(Some)
            }
            Extension::PolicyReference(_) => match self.to_policy_reference(extension) {
                Some(uri) => Policy::from_reference(uri, self.policy_registry()).map(Some),
                None => {
                    warn!("Ignoring policy reference without URI in {}", self.document_uri());
                    Ok(None)
                }
            },
            _ => Ok(None),
        }
    }

    fn attached_policies<'a, I>(&self, extensions: I) -> Result<Option<Policy>>
    where
        I: IntoIterator<Item = &'a Extension>,
    {
        let mut policies = Vec::new();
        for extension in extensions {
            if let Some(policy) = self.to_policy(extension)? {
                policies.push(policy);
            }
        }
        Ok(policy::merge_all(policies))
    }

    /// Binding, operation and input attachments merged in that order.
    pub fn effective_input_policy(
        &self,
        binding: &Binding,
        operation: &BindingOperation,
    ) -> Result<Option<Policy>> {
        self.attached_policies(
            binding
                .extensions
                .iter()
                .chain(operation.extensions.iter())
                .chain(self.input_extensions(operation)),
        )
    }

    pub fn effective_output_policy(
        &self,
        binding: &Binding,
        operation: &BindingOperation,
    ) -> Result<Option<Policy>> {
        self.attached_policies(
            binding
                .extensions
                .iter()
                .chain(operation.extensions.iter())
                .chain(self.output_extensions(operation)),
        )
    }

    /// Convenience over [`Self::effective_input_policy`] that finds the
    /// binding itself.
    pub fn effective_input_policy_of(&self, operation: &BindingOperation) -> Result<Option<Policy>> {
        let binding = self.require_binding_for(operation)?;
        self.effective_input_policy(binding, operation)
    }

    pub fn effective_output_policy_of(&self, operation: &BindingOperation) -> Result<Option<Policy>> {
        let binding = self.require_binding_for(operation)?;
        self.effective_output_policy(binding, operation)
    }

    // Snapshot

    /// Every document of the import closure, re-serialized once.
    pub fn snapshot(&self) -> DocumentSet {
        let mut set = DocumentSet::new(self.document_uri());
        for definition in self.definitions() {
            set.documents
                .entry(definition.document_uri.clone())
                .or_insert_with(|| definition.root.to_document_string());
        }
        set
    }
}

fn ports_with_address(service: &Service, version: SoapVersion) -> Vec<&Port> {
    service
        .ports
        .iter()
        .filter(|p| {
            p.extensions
                .iter()
                .any(|e| matches!(e.soap_address(), Some((v, _)) if v == version))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::replay::ReplayFetchStrategy;

    const BASE: &str = "http://h/svc.wsdl";

    fn wsdl_with(body: &str) -> String {
        format!(
            r#"<definitions xmlns="http://schemas.xmlsoap.org/wsdl/"
                 xmlns:soap="http://schemas.xmlsoap.org/wsdl/soap/"
                 xmlns:soap12="http://schemas.xmlsoap.org/wsdl/soap12/"
                 xmlns:http="http://schemas.xmlsoap.org/wsdl/http/"
                 xmlns:mime="http://schemas.xmlsoap.org/wsdl/mime/"
                 xmlns:wsp="http://schemas.xmlsoap.org/ws/2004/09/policy"
                 xmlns:wsu="http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-utility-1.0.xsd"
                 xmlns:sp="urn:sp"
                 xmlns:tns="urn:svc" targetNamespace="urn:svc">{}</definitions>"#,
            body
        )
    }

    async fn model(body: &str) -> Wsdl {
        let mut set = DocumentSet::new(BASE);
        set.documents.insert(BASE.to_string(), wsdl_with(body));
        let mut strategy = ReplayFetchStrategy::new(&set).unwrap();
        Wsdl::from_strategy(&mut strategy).await.unwrap()
    }

    #[tokio::test]
    async fn test_style_falls_back_to_document() {
        let wsdl = model(
            r#"<binding name="B" type="tns:P">
                 <soap:binding transport="http://schemas.xmlsoap.org/soap/http"/>
                 <operation name="Plain"><soap:operation soapAction=""/></operation>
                 <operation name="Rpc"><soap:operation style="rpc"/></operation>
               </binding>
               <binding name="R" type="tns:P">
                 <soap:binding style="rpc"/>
                 <operation name="Inherited"/>
               </binding>"#,
        )
        .await;

        let ops = wsdl.binding_operations(BindingFilter::Soap);
        assert_eq!(wsdl.binding_style(ops[0]), BindingStyle::Document);
        assert_eq!(wsdl.binding_style(ops[1]), BindingStyle::Rpc);
        assert_eq!(wsdl.binding_style(ops[2]), BindingStyle::Rpc);
    }

    #[tokio::test]
    async fn test_mixed_use_is_a_format_error() {
        let wsdl = model(
            r#"<binding name="B" type="tns:P">
                 <soap:binding style="document"/>
                 <operation name="Mixed">
                   <input><soap:body use="literal"/></input>
                   <output><soap:body use="encoded"/></output>
                 </operation>
                 <operation name="Default"><input/><output/></operation>
               </binding>"#,
        )
        .await;

        let ops = wsdl.binding_operations(BindingFilter::All);
        assert!(matches!(
            wsdl.soap_use(ops[0]),
            Err(WsdlError::FormatError { .. })
        ));
        assert_eq!(wsdl.soap_use(ops[1]).unwrap(), SoapUse::Literal);

        let binding = wsdl.binding_by_name("B").unwrap();
        assert!(wsdl.soap_use_of_binding(binding).is_err());
    }

    #[tokio::test]
    async fn test_non_soap_binding_has_no_soap_use() {
        let wsdl = model(
            r#"<binding name="H" type="tns:P"><http:binding verb="GET"/></binding>"#,
        )
        .await;
        let binding = wsdl.binding_by_name("H").unwrap();
        assert!(matches!(
            wsdl.soap_use_of_binding(binding),
            Err(WsdlError::NotSoapBindingError { .. })
        ));
        assert_eq!(wsdl.bindings(BindingFilter::Http).len(), 1);
        assert!(wsdl.bindings(BindingFilter::Soap).is_empty());
        assert_eq!(wsdl.binding_style_of(binding), BindingStyle::Document);
    }

    #[tokio::test]
    async fn test_soap_port_prefers_soap11_in_first_service() {
        let wsdl = model(
            r#"<service name="First">
                 <port name="P12" binding="tns:B"><soap12:address location="http://h/12"/></port>
                 <port name="P11" binding="tns:B"><soap:address location="http://h/11"/></port>
               </service>
               <service name="Second">
                 <port name="Other" binding="tns:B"><soap:address location="http://h/other"/></port>
               </service>"#,
        )
        .await;

        assert_eq!(wsdl.soap_port().map(|p| p.name.as_str()), Some("P11"));
        assert_eq!(wsdl.service_uri(), Some("http://h/11"));
        assert_eq!(wsdl.service_name(), Some("First"));

        let p12 = &wsdl.services()[0].ports[0];
        assert_eq!(wsdl.port_url(p12).map(|u| u.to_string()), Some("http://h/12".to_string()));
    }

    #[tokio::test]
    async fn test_missing_soap_port_is_a_format_error() {
        let wsdl = model(r#"<service name="S"><port name="P" binding="tns:B"/></service>"#).await;
        assert!(wsdl.soap_port().is_none());
        assert!(matches!(
            wsdl.require_soap_port(),
            Err(WsdlError::FormatError { .. })
        ));
    }

    #[tokio::test]
    async fn test_multipart_detection() {
        let wsdl = model(
            r#"<binding name="B" type="tns:P">
                 <soap:binding/>
                 <operation name="Upload">
                   <input>
                     <mime:multipartRelated>
                       <mime:part><soap:body use="literal" namespace="urn:upload"/></mime:part>
                       <mime:part><mime:content part="file" type="application/octet-stream"/></mime:part>
                     </mime:multipartRelated>
                   </input>
                   <output><soap:body use="literal"/></output>
                 </operation>
                 <operation name="Ping"/>
               </binding>"#,
        )
        .await;

        let ops = wsdl.binding_operations(BindingFilter::All);
        assert!(wsdl.is_multipart(ops[0]));
        assert!(!wsdl.is_multipart(ops[1]));
        assert!(wsdl.has_multipart_operations());
        assert_eq!(wsdl.mime_multipart_input(ops[0]).map(<[MimePart]>::len), Some(2));
        assert!(wsdl.mime_multipart_output(ops[0]).is_none());
        assert_eq!(wsdl.binding_input_namespace(ops[0]), "urn:upload");
        assert_eq!(wsdl.binding_output_namespace(ops[0]), "urn:svc");
    }

    #[tokio::test]
    async fn test_effective_policy_merges_binding_and_operation() {
        let wsdl = model(
            r##"<wsp:Policy wsu:Id="P1"><sp:A/></wsp:Policy>
               <binding name="B" type="tns:P">
                 <wsp:PolicyReference URI="#P1"/>
                 <soap:binding/>
                 <operation name="Secured">
                   <wsp:Policy><wsp:ExactlyOne><sp:B/><sp:C/></wsp:ExactlyOne></wsp:Policy>
                   <input/>
                 </operation>
               </binding>
               <binding name="Bare" type="tns:P">
                 <soap:binding/>
                 <operation name="Open"/>
               </binding>"##,
        )
        .await;

        assert_eq!(wsdl.policies().len(), 1);
        assert!(wsdl.policy_registry().get("#P1").is_some());

        let binding = wsdl.binding_by_name("B").unwrap();
        let policy = wsdl
            .effective_input_policy(binding, &binding.operations[0])
            .unwrap()
            .unwrap();
        let names: Vec<Vec<&str>> = policy
            .alternatives
            .iter()
            .map(|alt| alt.iter().map(|a| a.name.local.as_str()).collect())
            .collect();
        assert_eq!(names, vec![vec!["A", "B"], vec!["A", "C"]]);

        let bare = wsdl.binding_by_name("Bare").unwrap();
        assert_eq!(
            wsdl.effective_output_policy(bare, &bare.operations[0]).unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_policy_references_bad_and_malformed() {
        let wsdl = model(
            r##"<binding name="B" type="tns:P">
                 <wsp:PolicyReference URI="#Nope"/>
                 <operation name="Op"><wsp:PolicyReference/></operation>
               </binding>"##,
        )
        .await;

        let binding = wsdl.binding_by_name("B").unwrap();
        assert!(matches!(
            wsdl.to_policy(&binding.extensions[0]),
            Err(WsdlError::BadPolicyReferenceError { .. })
        ));
        assert_eq!(wsdl.to_policy(&binding.operations[0].extensions[0]).unwrap(), None);
        assert!(wsdl.effective_input_policy_of(&binding.operations[0]).is_err());
    }

    #[tokio::test]
    async fn test_snapshot_holds_each_document_once() {
        let wsdl = model(r#"<import namespace="urn:svc" location="svc.wsdl"/>"#).await;
        let snapshot = wsdl.snapshot();
        assert_eq!(snapshot.base_uri, BASE);
        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.base_document().unwrap().starts_with("<?xml"));
    }

    #[tokio::test]
    async fn test_overloaded_operations_tracked_separately() {
        let wsdl = model(
            r#"<binding name="B" type="tns:P">
                 <soap:binding/>
                 <operation name="Send">
                   <input><mime:multipartRelated><mime:part/></mime:multipartRelated></input>
                 </operation>
                 <operation name="Send"><input><soap:body use="literal"/></input></operation>
               </binding>"#,
        )
        .await;

        let ops = wsdl.binding_operations(BindingFilter::All);
        assert_eq!(ops[0].name, ops[1].name);
        assert!(wsdl.is_multipart(ops[0]));
        assert!(!wsdl.is_multipart(ops[1]));
    }

    #[tokio::test]
    async fn test_same_named_bindings_keep_their_own_style() {
        let imported = "http://h/other.wsdl";
        let mut set = DocumentSet::new(BASE);
        set.documents.insert(
            BASE.to_string(),
            wsdl_with(
                r#"<import namespace="urn:svc" location="other.wsdl"/>
                   <binding name="B" type="tns:P"><soap:binding style="document"/></binding>"#,
            ),
        );
        set.documents.insert(
            imported.to_string(),
            wsdl_with(r#"<binding name="B" type="tns:P"><soap:binding style="rpc"/></binding>"#),
        );
        let mut strategy = ReplayFetchStrategy::new(&set).unwrap();
        let wsdl = Wsdl::from_strategy(&mut strategy).await.unwrap();

        let bindings = wsdl.bindings(BindingFilter::All);
        assert_eq!(bindings.len(), 2);
        assert_eq!(bindings[0].name, bindings[1].name);
        assert_eq!(wsdl.binding_style_of(bindings[0]), BindingStyle::Document);
        assert_eq!(wsdl.binding_style_of(bindings[1]), BindingStyle::Rpc);
    }

    #[tokio::test]
    async fn test_namespaces_for_request_generation() {
        let wsdl = model(
            r#"<binding name="B" type="tns:P">
                 <soap:binding/>
                 <operation name="A"><input><soap:body use="literal" namespace="urn:svc:ops"/></input></operation>
                 <operation name="B"><input><soap:body use="literal" namespace="urn:svc"/></input></operation>
                 <operation name="C"><input><soap:body use="literal" namespace="urn:svc:ops"/></input></operation>
               </binding>"#,
        )
        .await;

        let expected = [
            ("tns", "urn:svc"),
            ("soapenv", SOAP11_ENVELOPE_NS),
            ("ns1", "urn:svc:ops"),
        ];
        let namespaces = wsdl.namespaces();
        assert_eq!(
            namespaces
                .iter()
                .map(|(p, u)| (p.as_str(), u.as_str()))
                .collect::<Vec<_>>(),
            expected
        );
    }

    #[tokio::test]
    async fn test_namespaces_keep_declared_envelope() {
        let mut set = DocumentSet::new(BASE);
        set.documents.insert(
            BASE.to_string(),
            r#"<w:definitions xmlns:w="http://schemas.xmlsoap.org/wsdl/" xmlns="urn:d"
                 xmlns:env="http://www.w3.org/2003/05/soap-envelope" targetNamespace="urn:d"/>"#
                .to_string(),
        );
        let mut strategy = ReplayFetchStrategy::new(&set).unwrap();
        let wsdl = Wsdl::from_strategy(&mut strategy).await.unwrap();

        assert_eq!(
            wsdl.namespaces(),
            vec![
                ("env".to_string(), crate::core::extension::SOAP12_ENVELOPE_NS.to_string()),
                ("ns1".to_string(), "urn:d".to_string()),
            ]
        );
    }
}
