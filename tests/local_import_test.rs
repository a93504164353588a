use anyhow::Result;
use std::fs;
use tempfile::TempDir;
use url::Url;
use wsdl_resolver::{FetchConfig, FetchError, TomlConfig, WsdlResolver};

const ROOT: &str = r#"<definitions xmlns="http://schemas.xmlsoap.org/wsdl/" targetNamespace="urn:local">
  <import namespace="urn:local" location="part.wsdl"/>
</definitions>"#;

const PART: &str = r#"<definitions xmlns="http://schemas.xmlsoap.org/wsdl/" targetNamespace="urn:local">
  <message name="Ping"/>
</definitions>"#;

fn write_documents(dir: &TempDir) -> Result<String> {
    fs::write(dir.path().join("root.wsdl"), ROOT)?;
    fs::write(dir.path().join("part.wsdl"), PART)?;
    let url = Url::from_file_path(dir.path().join("root.wsdl"))
        .map_err(|_| anyhow::anyhow!("temp path is not absolute"))?;
    Ok(url.to_string())
}

#[tokio::test]
async fn test_local_imports_denied_by_default() -> Result<()> {
    let dir = TempDir::new()?;
    let root = write_documents(&dir)?;

    let resolution = WsdlResolver::default().resolve(&root).await?;

    // the base file itself is read, its local import is refused
    assert!(resolution.wsdl.messages().is_empty());
    let failed: Vec<_> = resolution.failed_fetches().collect();
    assert_eq!(failed.len(), 1);
    assert!(matches!(
        &failed[0].outcome,
        Err(FetchError::LocalAccessDenied { uri }) if uri.ends_with("part.wsdl")
    ));
    Ok(())
}

#[tokio::test]
async fn test_local_imports_followed_when_allowed() -> Result<()> {
    let dir = TempDir::new()?;
    let root = write_documents(&dir)?;

    let resolver = WsdlResolver::new(FetchConfig::default().with_local_imports(true));
    let resolution = resolver.resolve(&root).await?;

    assert_eq!(resolution.wsdl.messages().len(), 1);
    assert_eq!(resolution.snapshot().len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_config_file_drives_resolution() -> Result<()> {
    let dir = TempDir::new()?;
    let root = write_documents(&dir)?;
    let config_path = dir.path().join("resolver.toml");
    fs::write(
        &config_path,
        "[fetch]\nallow_local_imports = true\nmax_document_size = 4096\n\n[logging]\nlevel = \"debug\"\n",
    )?;

    let config = TomlConfig::from_file(&config_path)?;
    config.validate_config()?;
    assert_eq!(config.fetch.effective_max_document_size(), 4096);

    let resolution = WsdlResolver::new(config.fetch).resolve(&root).await?;
    assert_eq!(resolution.wsdl.messages().len(), 1);
    Ok(())
}
