pub mod definition;
pub mod extension;
pub mod policy;
pub mod reader;
pub mod resolver;
pub mod schema;
pub mod wsdl;

pub use crate::domain::model::{DocumentSet, Resource, TrackedResource};
pub use crate::domain::ports::FetchStrategy;
pub use crate::utils::error::Result;
