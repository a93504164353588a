use super::{parse_element, XSD_NS};
use crate::utils::error::FetchError;
use regex::Regex;
use std::ops::Range;
use std::sync::LazyLock;

/// Stand-in for an imported schema document when schemas are stripped.
pub const SCHEMA_STUB_WSDL: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
<wsdl:definitions xmlns:wsdl=\"http://schemas.xmlsoap.org/wsdl/\"/>";

static EXTERNAL_ENTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"<!ENTITY\s+([^\s%"'>]+)\s+(?:SYSTEM\s+(?:"([^"]*)"|'([^']*)')|PUBLIC\s+(?:"[^"]*"|'[^']*')\s+(?:"([^"]*)"|'([^']*)'))\s*>"#,
    )
    .expect("external entity pattern")
});

static TEXT_DECLARATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*<\?xml[^>]*\?>").expect("text declaration pattern"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inspection {
    /// Root element is `xs:schema`.
    Schema,
    /// The document carries a DOCTYPE declaration.
    Doctype,
    Plain,
    /// Not well-formed; left for the reader to report.
    Unparseable,
}

pub fn inspect(text: &str) -> Inspection {
    match roxmltree::Document::parse_with_options(text, super::parse_options(false)) {
        Ok(doc) => {
            if doc.root_element().has_tag_name((XSD_NS, "schema")) {
                Inspection::Schema
            } else {
                Inspection::Plain
            }
        }
        Err(roxmltree::Error::DtdDetected) => Inspection::Doctype,
        Err(_) => Inspection::Unparseable,
    }
}

/// External general entities declared in the internal subset: `(name, system id)`.
pub fn external_entities(text: &str) -> Vec<(String, String)> {
    let Some(range) = internal_subset(text) else {
        return Vec::new();
    };
    let subset = &text[range];

    EXTERNAL_ENTITY
        .captures_iter(subset)
        .filter_map(|caps| {
            let system_id = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .or_else(|| caps.get(5))?;
            Some((caps[1].to_string(), system_id.as_str().to_string()))
        })
        .collect()
}

/// Rewrites external entity declarations into internal ones using the
/// fetched replacement text. Entities without replacement keep their
/// external declaration.
pub fn inline_entities(text: &str, replacements: &[(String, String)]) -> String {
    let Some(range) = internal_subset(text) else {
        return text.to_string();
    };
    let subset = &text[range.clone()];

    let rewritten = EXTERNAL_ENTITY.replace_all(subset, |caps: &regex::Captures| {
        let name = &caps[1];
        match replacements.iter().find(|(n, _)| n == name) {
            Some((_, content)) => format!("<!ENTITY {} {}>", name, entity_literal(content)),
            None => caps[0].to_string(),
        }
    });

    format!("{}{}{}", &text[..range.start], rewritten, &text[range.end..])
}

/// Expands entities and drops the DOCTYPE by re-serializing the tree.
pub fn strip_doctype(uri: &str, text: &str) -> Result<String, FetchError> {
    parse_element(text, true)
        .map(|root| root.to_document_string())
        .map_err(|e| FetchError::Sanitize {
            uri: uri.to_string(),
            message: e.to_string(),
        })
}

fn internal_subset(text: &str) -> Option<Range<usize>> {
    let doctype = text.find("<!DOCTYPE")?;
    let rest = &text[doctype..];
    let open = rest.find('[')?;
    if rest[..open].contains('>') {
        return None;
    }
    let close = rest[open..].find(']')?;
    Some(doctype + open + 1..doctype + open + close)
}

/// Quoted entity value for `content`, without its text declaration.
fn entity_literal(content: &str) -> String {
    let body = TEXT_DECLARATION.replace(content, "");
    if !body.contains('"') {
        format!("\"{}\"", body)
    } else if !body.contains('\'') {
        format!("'{}'", body)
    } else {
        format!("\"{}\"", body.replace('"', "&#34;"))
    }
}
