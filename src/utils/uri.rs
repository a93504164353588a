use url::Url;

/// Resolves an import location against the importing document.
///
/// Absolute locations are returned exactly as written. Relative ones are
/// joined onto `parent`. `None` means the location could not be turned
/// into an absolute URI and the import should be treated as absent.
pub fn resolve_reference(parent: Option<&str>, location: &str) -> Option<String> {
    let location = location.trim();
    if location.is_empty() {
        return None;
    }

    if Url::parse(location).is_ok() {
        return Some(location.to_string());
    }

    let base = Url::parse(parent?).ok()?;
    base.join(location).ok().map(|u| u.to_string())
}

pub fn is_local(uri: &str) -> bool {
    Url::parse(uri).map(|u| u.scheme() == "file").unwrap_or(false)
}
