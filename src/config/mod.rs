#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};

pub const DEFAULT_MAX_DOCUMENT_SIZE: usize = 10 * 1024 * 1024;
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
pub const DEFAULT_USER_AGENT: &str = concat!("wsdl-resolver/", env!("CARGO_PKG_VERSION"));

static MAX_DOCUMENT_SIZE: AtomicUsize = AtomicUsize::new(DEFAULT_MAX_DOCUMENT_SIZE);

/// Process-wide size limit used by fetches that do not set their own.
pub fn default_max_document_size() -> usize {
    MAX_DOCUMENT_SIZE.load(Ordering::Relaxed)
}

pub fn set_default_max_document_size(bytes: usize) {
    MAX_DOCUMENT_SIZE.store(bytes, Ordering::Relaxed);
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// `None` reads the process-wide default at fetch time.
    pub max_document_size: Option<usize>,
    pub allow_local_imports: bool,
    pub strip_schemas: bool,
    pub strip_doctypes: bool,
    pub timeout_seconds: u64,
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_document_size: None,
            allow_local_imports: false,
            strip_schemas: false,
            strip_doctypes: true,
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl FetchConfig {
    pub fn effective_max_document_size(&self) -> usize {
        self.max_document_size
            .unwrap_or_else(default_max_document_size)
    }

    pub fn with_max_document_size(mut self, bytes: usize) -> Self {
        self.max_document_size = Some(bytes);
        self
    }

    pub fn with_local_imports(mut self, allow: bool) -> Self {
        self.allow_local_imports = allow;
        self
    }

    pub fn with_schema_stripping(mut self, strip: bool) -> Self {
        self.strip_schemas = strip;
        self
    }

    pub fn with_doctype_stripping(mut self, strip: bool) -> Self {
        self.strip_doctypes = strip;
        self
    }
}
