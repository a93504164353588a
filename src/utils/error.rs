use thiserror::Error;

/// Failure while fetching a single document.
///
/// Fetch failures are values, not panics: strategies hand them back from
/// `fetch_base`/`fetch_import`, the tracking wrapper records them, and the
/// reader decides whether they are fatal (base document, size limit) or
/// just mean "import absent".
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("I/O error reading {uri}: {message}")]
    Io { uri: String, message: String },

    #[error("HTTP status {status} fetching {uri}")]
    Http { uri: String, status: u16 },

    #[error("request for {uri} failed: {message}")]
    Network { uri: String, message: String },

    #[error("Local import not permitted '{uri}'")]
    LocalAccessDenied { uri: String },

    #[error("document {uri} exceeds the maximum size of {limit} bytes")]
    SizeLimitExceeded { uri: String, limit: usize },

    #[error("unsupported character encoding '{charset}' for {uri}")]
    UnsupportedEncoding { uri: String, charset: String },

    #[error("content of {uri} is not valid {charset}")]
    Decode { uri: String, charset: String },

    #[error("unsupported URI scheme for {uri}")]
    UnsupportedScheme { uri: String },

    #[error("unable to sanitize {uri}: {message}")]
    Sanitize { uri: String, message: String },
}

impl FetchError {
    pub fn uri(&self) -> &str {
        match self {
            FetchError::Io { uri, .. }
            | FetchError::Http { uri, .. }
            | FetchError::Network { uri, .. }
            | FetchError::LocalAccessDenied { uri }
            | FetchError::SizeLimitExceeded { uri, .. }
            | FetchError::UnsupportedEncoding { uri, .. }
            | FetchError::Decode { uri, .. }
            | FetchError::UnsupportedScheme { uri }
            | FetchError::Sanitize { uri, .. } => uri,
        }
    }

    pub fn is_size_limit(&self) -> bool {
        matches!(self, FetchError::SizeLimitExceeded { .. })
    }
}

#[derive(Error, Debug)]
pub enum WsdlError {
    #[error("Fetch failed: {0}")]
    FetchError(#[from] FetchError),

    #[error("Document set does not contain the base document '{uri}'")]
    MissingBaseDocumentError { uri: String },

    #[error("Invalid WSDL '{uri}': {message}")]
    FormatError { uri: String, message: String },

    #[error("Unable to resolve policy reference: URI={uri}")]
    BadPolicyReferenceError { uri: String },

    #[error("Must be SOAP binding ( {binding} )")]
    NotSoapBindingError { binding: String },

    #[error("The binding for binding operation '{operation}' is not found in this WSDL")]
    UnknownOperationError { operation: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration validation failed for {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl WsdlError {
    pub fn format(uri: impl Into<String>, message: impl Into<String>) -> Self {
        WsdlError::FormatError {
            uri: uri.into(),
            message: message.into(),
        }
    }

    pub fn is_size_limit(&self) -> bool {
        matches!(self, WsdlError::FetchError(e) if e.is_size_limit())
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            WsdlError::FetchError(FetchError::SizeLimitExceeded { uri, limit }) => format!(
                "The document at {} is too large (limit is {} bytes)",
                uri, limit
            ),
            WsdlError::FetchError(FetchError::LocalAccessDenied { uri }) => format!(
                "Local file access is disabled, cannot read {}",
                uri
            ),
            WsdlError::FetchError(e) => format!("Could not retrieve {}: {}", e.uri(), e),
            WsdlError::MissingBaseDocumentError { uri } => {
                format!("The stored document set has no entry for {}", uri)
            }
            WsdlError::FormatError { uri, message } => {
                format!("The WSDL at {} is invalid: {}", uri, message)
            }
            WsdlError::BadPolicyReferenceError { uri } => {
                format!("The WSDL references an unknown policy: {}", uri)
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, WsdlError>;
