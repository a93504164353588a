pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;
pub mod xml;

#[cfg(feature = "cli")]
pub use crate::config::cli::CliConfig;

pub use crate::config::{toml_config::TomlConfig, FetchConfig};
pub use crate::core::policy::{Policy, PolicyRegistry};
pub use crate::core::resolver::{Resolution, WsdlResolver};
pub use crate::core::schema::SchemaAnalysis;
pub use crate::core::wsdl::{BindingFilter, BindingStyle, SoapUse, Wsdl};
pub use crate::domain::model::{DocumentSet, QName, Resource, TrackedResource};
pub use crate::utils::error::{FetchError, Result, WsdlError};
