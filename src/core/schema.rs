use crate::core::definition::{Message, SchemaFragment};
use crate::core::wsdl::{BindingFilter, Wsdl};
use crate::domain::model::QName;
use crate::xml::XSD_NS;
use std::collections::BTreeSet;

/// Splits the global element declarations of a WSDL's schemas by the
/// direction that uses them.
#[derive(Debug, Clone)]
pub struct SchemaAnalysis {
    fragments: Vec<SchemaFragment>,
    input_only: BTreeSet<QName>,
    output_only: BTreeSet<QName>,
    shared: BTreeSet<QName>,
}

fn part_elements(message: Option<&Message>) -> impl Iterator<Item = QName> + '_ {
    message
        .into_iter()
        .flat_map(|m| m.parts.iter())
        .filter_map(|p| p.element.clone())
}

impl SchemaAnalysis {
    pub fn new(wsdl: &Wsdl) -> Self {
        let mut input = BTreeSet::new();
        let mut output = BTreeSet::new();

        for operation in wsdl.binding_operations(BindingFilter::All) {
            input.extend(part_elements(wsdl.input_message(operation)));
            output.extend(part_elements(wsdl.output_message(operation)));
        }

        let fragments = wsdl.schema_fragments().into_iter().cloned().collect();
        Self::from_usage(fragments, input, output)
    }

    pub fn from_usage(
        fragments: Vec<SchemaFragment>,
        input: BTreeSet<QName>,
        output: BTreeSet<QName>,
    ) -> Self {
        Self {
            fragments,
            input_only: input.difference(&output).cloned().collect(),
            output_only: output.difference(&input).cloned().collect(),
            shared: input.intersection(&output).cloned().collect(),
        }
    }

    pub fn input_only(&self) -> &BTreeSet<QName> {
        &self.input_only
    }

    pub fn output_only(&self) -> &BTreeSet<QName> {
        &self.output_only
    }

    pub fn shared(&self) -> &BTreeSet<QName> {
        &self.shared
    }

    pub fn fragments(&self) -> &[SchemaFragment] {
        &self.fragments
    }

    /// Schemas for validating requests: output-only elements removed.
    pub fn input_schemas(&self) -> Vec<SchemaFragment> {
        self.without(&self.output_only)
    }

    /// Schemas for validating responses: input-only elements removed.
    pub fn output_schemas(&self) -> Vec<SchemaFragment> {
        self.without(&self.input_only)
    }

    fn without(&self, excluded: &BTreeSet<QName>) -> Vec<SchemaFragment> {
        self.fragments
            .iter()
            .cloned()
            .map(|mut fragment| {
                let namespace = fragment.target_namespace.clone();
                fragment.element.retain_children(|child| {
                    let declared = child
                        .attribute("name")
                        .filter(|_| child.is(XSD_NS, "element"))
                        .map(|name| QName::new(namespace.as_str(), name));
                    !declared.is_some_and(|name| excluded.contains(&name))
                });
                fragment
            })
            .collect()
    }
}
