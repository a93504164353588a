use crate::config::toml_config::TomlConfig;
use crate::config::FetchConfig;
use crate::utils::error::Result;
use crate::utils::validation::{self, Validate};
use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "wsdl-resolve")]
#[command(about = "Resolve a WSDL document and all of its imports")]
pub struct CliConfig {
    /// Base WSDL location (http, https or file URI)
    pub uri: Option<String>,

    #[arg(long, help = "TOML configuration file")]
    pub config: Option<String>,

    #[arg(long, help = "Resolve from a saved document set instead of fetching")]
    pub replay: Option<String>,

    #[arg(long, help = "Write the resolved document set as JSON to this path")]
    pub snapshot_out: Option<String>,

    #[arg(long, help = "Allow imports from the local file system")]
    pub allow_local_imports: bool,

    #[arg(long, help = "Maximum size of a single document in bytes")]
    pub max_document_size: Option<usize>,

    #[arg(long, help = "Replace imported XML Schema documents with a stub")]
    pub strip_schemas: bool,

    #[arg(long, help = "Keep DOCTYPE declarations instead of inlining them")]
    pub no_strip_doctypes: bool,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub json_logs: bool,
}

impl CliConfig {
    pub fn file_config(&self) -> Result<TomlConfig> {
        match &self.config {
            Some(path) => {
                let config = TomlConfig::from_file(path)?;
                config.validate()?;
                Ok(config)
            }
            None => Ok(TomlConfig::default()),
        }
    }

    /// Command-line switches layered over the file configuration.
    pub fn fetch_config(&self, base: FetchConfig) -> FetchConfig {
        let mut config = base;
        if self.allow_local_imports {
            config.allow_local_imports = true;
        }
        if let Some(max) = self.max_document_size {
            config.max_document_size = Some(max);
        }
        if self.strip_schemas {
            config.strip_schemas = true;
        }
        if self.no_strip_doctypes {
            config.strip_doctypes = false;
        }
        config
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        match (&self.uri, &self.replay) {
            (Some(uri), _) => validation::validate_document_uri("uri", uri)?,
            (None, Some(path)) => validation::validate_path("replay", path)?,
            (None, None) => {
                return Err(crate::utils::error::WsdlError::ConfigError {
                    message: "either a URI or --replay is required".to_string(),
                })
            }
        }
        if let Some(path) = &self.snapshot_out {
            validation::validate_path("snapshot_out", path)?;
        }
        if let Some(max) = self.max_document_size {
            validation::validate_positive_number("max_document_size", max, 1)?;
        }
        Ok(())
    }
}
