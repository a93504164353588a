use crate::utils::error::{Result, WsdlError};
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

/// Accepts the schemes a fetch strategy can retrieve from.
pub fn validate_document_uri(field_name: &str, uri_str: &str) -> Result<()> {
    if uri_str.is_empty() {
        return Err(WsdlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: uri_str.to_string(),
            reason: "URI cannot be empty".to_string(),
        });
    }

    match Url::parse(uri_str) {
        Ok(url) => match url.scheme() {
            "http" | "https" | "file" => Ok(()),
            scheme => Err(WsdlError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: uri_str.to_string(),
                reason: format!("Unsupported URI scheme: {}", scheme),
            }),
        },
        Err(e) => Err(WsdlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: uri_str.to_string(),
            reason: format!("Invalid URI format: {}", e),
        }),
    }
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(WsdlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(WsdlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

pub fn validate_positive_number(field_name: &str, value: usize, min_value: usize) -> Result<()> {
    if value < min_value {
        return Err(WsdlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min_value),
        });
    }
    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(WsdlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(WsdlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be between {} and {}", min, max),
        });
    }
    Ok(())
}

pub fn validate_one_of(field_name: &str, value: &str, allowed: &[&str]) -> Result<()> {
    if !allowed.contains(&value) {
        return Err(WsdlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Valid values: {}", allowed.join(", ")),
        });
    }
    Ok(())
}
