//! WS-Policy support: registry of named policies, normalization to
//! alternatives, and merging of attachments.

use crate::domain::model::QName;
use crate::utils::error::{Result, WsdlError};
use crate::xml::{Namespace, XmlAttribute, XmlElement, XmlNode};
use std::collections::HashMap;
use tracing::debug;

pub const WSP_2004_NS: &str = "http://schemas.xmlsoap.org/ws/2004/09/policy";
pub const WSP_15_NS: &str = "http://www.w3.org/ns/ws-policy";
pub const WSU_NS: &str =
    "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-utility-1.0.xsd";

/// One alternative of a normalized policy: assertions that must all hold.
pub type Alternative = Vec<XmlElement>;

fn is_policy_namespace(ns: &str) -> bool {
    ns == WSP_2004_NS || ns == WSP_15_NS
}

pub fn is_policy_element(element: &XmlElement) -> bool {
    is_policy_namespace(&element.name.namespace) && element.name.local == "Policy"
}

pub fn is_policy_reference_element(element: &XmlElement) -> bool {
    is_policy_namespace(&element.name.namespace) && element.name.local == "PolicyReference"
}

/// `URI` attribute of a reference, unqualified or in the policy namespace.
pub fn reference_uri(element: &XmlElement) -> Option<&str> {
    element
        .attribute("URI")
        .or_else(|| element.attribute_ns(&element.name.namespace, "URI"))
        .map(str::trim)
        .filter(|uri| !uri.is_empty())
}

/// Keys a policy is reachable under: `#` + `wsu:Id`, and its `Name`.
pub fn policy_keys(element: &XmlElement) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(id) = element.attribute_ns(WSU_NS, "Id") {
        keys.push(format!("#{}", id));
    }
    if let Some(name) = element.attribute("Name") {
        keys.push(name.to_string());
    }
    keys
}

/// Top-level policies by reference URI.
#[derive(Debug, Clone, Default)]
pub struct PolicyRegistry {
    by_uri: HashMap<String, XmlElement>,
}

impl PolicyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_policies<'a, I>(policies: I) -> Self
    where
        I: IntoIterator<Item = &'a XmlElement>,
    {
        let mut registry = Self::new();
        for policy in policies {
            registry.register(policy);
        }
        registry
    }

    /// First registration of a key wins.
    pub fn register(&mut self, policy: &XmlElement) {
        for key in policy_keys(policy) {
            self.by_uri.entry(key).or_insert_with(|| policy.clone());
        }
    }

    pub fn get(&self, uri: &str) -> Option<&XmlElement> {
        self.by_uri.get(uri)
    }

    pub fn len(&self) -> usize {
        self.by_uri.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_uri.is_empty()
    }
}

/// Policy in normal form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Policy {
    pub id: Option<String>,
    pub namespace: String,
    pub alternatives: Vec<Alternative>,
}

impl Policy {
    /// Normalizes a `wsp:Policy` element, resolving nested references
    /// through `registry`.
    pub fn from_element(element: &XmlElement, registry: &PolicyRegistry) -> Result<Self> {
        let mut visiting = Vec::new();
        let alternatives = normalize_all(element, &[], registry, &mut visiting)?;
        Ok(Self {
            id: policy_keys(element).into_iter().next(),
            namespace: element.name.namespace.clone(),
            alternatives,
        })
    }

    /// Resolves a `wsp:PolicyReference` and normalizes its target.
    pub fn from_reference(uri: &str, registry: &PolicyRegistry) -> Result<Self> {
        let target = registry
            .get(uri)
            .ok_or_else(|| WsdlError::BadPolicyReferenceError {
                uri: uri.to_string(),
            })?;
        let mut policy = Self::from_element(target, registry)?;
        policy.id = Some(uri.to_string());
        Ok(policy)
    }

    /// Algebraic merge: every alternative of `self` combined with every
    /// alternative of `other`.
    pub fn merge(&self, other: &Policy) -> Policy {
        Policy {
            id: None,
            namespace: self.namespace.clone(),
            alternatives: cross(&self.alternatives, &other.alternatives),
        }
    }

    /// A policy without alternatives admits no behavior at all.
    pub fn is_satisfiable(&self) -> bool {
        !self.alternatives.is_empty()
    }

    /// Normal-form XML: `Policy/ExactlyOne/All*`.
    pub fn to_element(&self) -> XmlElement {
        let ns = self.namespace.as_str();
        let alternatives = self
            .alternatives
            .iter()
            .map(|alternative| {
                let mut all = policy_operator(ns, "All", Vec::new());
                all.children = alternative.iter().cloned().map(XmlNode::Element).collect();
                XmlNode::Element(all)
            })
            .collect();

        let exactly_one = policy_operator(ns, "ExactlyOne", alternatives);
        let mut root = policy_operator(ns, "Policy", vec![XmlNode::Element(exactly_one)]);
        root.namespaces.push(Namespace {
            prefix: Some("wsp".to_string()),
            uri: ns.to_string(),
        });
        root
    }
}

fn policy_operator(ns: &str, local: &str, children: Vec<XmlNode>) -> XmlElement {
    XmlElement {
        name: QName::new(ns, local),
        prefix: Some("wsp".to_string()),
        namespaces: Vec::new(),
        attributes: Vec::new(),
        children,
    }
}

fn cross(left: &[Alternative], right: &[Alternative]) -> Vec<Alternative> {
    left.iter()
        .flat_map(|l| {
            right.iter().map(move |r| {
                let mut combined = l.clone();
                combined.extend(r.iter().cloned());
                combined
            })
        })
        .collect()
}

/// Namespaces visible on `element` given those in scope on its parent.
fn scope_of(parent_scope: &[Namespace], element: &XmlElement) -> Vec<Namespace> {
    let mut scope: Vec<Namespace> = parent_scope
        .iter()
        .filter(|ns| !element.namespaces.iter().any(|own| own.prefix == ns.prefix))
        .cloned()
        .collect();
    scope.extend(element.namespaces.iter().cloned());
    scope
}

/// Children of `Policy` and `All` are conjunctive.
fn normalize_all(
    element: &XmlElement,
    parent_scope: &[Namespace],
    registry: &PolicyRegistry,
    visiting: &mut Vec<String>,
) -> Result<Vec<Alternative>> {
    let scope = scope_of(parent_scope, element);
    let mut result = vec![Vec::new()];
    for child in element.child_elements() {
        let alternatives = normalize_term(child, &scope, registry, visiting)?;
        result = cross(&result, &alternatives);
    }
    Ok(result)
}

fn normalize_term(
    element: &XmlElement,
    parent_scope: &[Namespace],
    registry: &PolicyRegistry,
    visiting: &mut Vec<String>,
) -> Result<Vec<Alternative>> {
    let ns = element.name.namespace.as_str();
    if is_policy_namespace(ns) {
        match element.name.local.as_str() {
            "Policy" | "All" => return normalize_all(element, parent_scope, registry, visiting),
            "ExactlyOne" => {
                let scope = scope_of(parent_scope, element);
                let mut result = Vec::new();
                for child in element.child_elements() {
                    result.extend(normalize_term(child, &scope, registry, visiting)?);
                }
                return Ok(result);
            }
            "PolicyReference" => {
                let Some(uri) = reference_uri(element) else {
                    debug!("Ignoring nested policy reference without URI");
                    return Ok(vec![Vec::new()]);
                };
                if visiting.iter().any(|v| v == uri) {
                    return Err(WsdlError::format(uri, "circular policy reference"));
                }
                let target =
                    registry
                        .get(uri)
                        .ok_or_else(|| WsdlError::BadPolicyReferenceError {
                            uri: uri.to_string(),
                        })?;
                visiting.push(uri.to_string());
                let result = normalize_all(target, &[], registry, visiting);
                visiting.pop();
                return result;
            }
            _ => {}
        }
    }

    let optional = element
        .attributes
        .iter()
        .find(|a| is_policy_namespace(&a.name.namespace) && a.name.local == "Optional")
        .is_some_and(|a| a.value.trim() == "true" || a.value.trim() == "1");

    let assertion = standalone_assertion(element, parent_scope);
    if optional {
        Ok(vec![vec![assertion], Vec::new()])
    } else {
        Ok(vec![vec![assertion]])
    }
}

/// Copy of an assertion that serializes on its own, minus `wsp:Optional`.
fn standalone_assertion(element: &XmlElement, parent_scope: &[Namespace]) -> XmlElement {
    let mut assertion = element.clone();
    assertion.namespaces = scope_of(parent_scope, element);
    assertion.attributes.retain(|a: &XmlAttribute| {
        !(is_policy_namespace(&a.name.namespace) && a.name.local == "Optional")
    });
    assertion
}

/// Merges attachments in order. `None` when there are none; a single
/// attachment is returned unchanged.
pub fn merge_all(policies: Vec<Policy>) -> Option<Policy> {
    let mut iter = policies.into_iter();
    let first = iter.next()?;
    Some(iter.fold(first, |acc, next| acc.merge(&next)))
}
