//! Character encoding detection for fetched documents.
//!
//! Order of precedence:
//! 1. a UTF-16 byte-order mark,
//! 2. the `charset` parameter of the content type (this also wins over a
//!    UTF-8 BOM, which is treated as possibly mis-detected),
//! 3. a UTF-8 byte-order mark,
//! 4. the `encoding` pseudo-attribute of the XML declaration,
//! 5. UTF-8.

use crate::utils::error::FetchError;
use regex::Regex;
use std::sync::LazyLock;

static XML_DECL_ENCODING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^<\?xml[^>]*?encoding\s*=\s*["']([A-Za-z][A-Za-z0-9._-]*)["']"#)
        .expect("encoding declaration pattern")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Utf8,
    Utf16Le,
    Utf16Be,
    Latin1,
}

impl TextEncoding {
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" => Some(TextEncoding::Utf8),
            "utf-16" | "utf-16be" | "utf16" | "unicodefffe" => Some(TextEncoding::Utf16Be),
            "utf-16le" => Some(TextEncoding::Utf16Le),
            "iso-8859-1" | "iso8859-1" | "latin1" | "l1" | "us-ascii" | "ascii" => {
                Some(TextEncoding::Latin1)
            }
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            TextEncoding::Utf8 => "UTF-8",
            TextEncoding::Utf16Le => "UTF-16LE",
            TextEncoding::Utf16Be => "UTF-16BE",
            TextEncoding::Latin1 => "ISO-8859-1",
        }
    }

    fn bom(&self) -> &'static [u8] {
        match self {
            TextEncoding::Utf8 => &[0xEF, 0xBB, 0xBF],
            TextEncoding::Utf16Le => &[0xFF, 0xFE],
            TextEncoding::Utf16Be => &[0xFE, 0xFF],
            TextEncoding::Latin1 => &[],
        }
    }
}

pub fn sniff_bom(bytes: &[u8]) -> Option<TextEncoding> {
    [TextEncoding::Utf8, TextEncoding::Utf16Le, TextEncoding::Utf16Be]
        .into_iter()
        .find(|enc| bytes.starts_with(enc.bom()))
}

pub fn charset_from_content_type(content_type: &str) -> Option<String> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        if key.trim().eq_ignore_ascii_case("charset") {
            let value = value.trim().trim_matches('"').trim_matches('\'');
            (!value.is_empty()).then(|| value.to_string())
        } else {
            None
        }
    })
}

pub fn declared_encoding(bytes: &[u8]) -> Option<String> {
    let prefix = &bytes[..bytes.len().min(256)];
    let text: String = prefix
        .iter()
        .take_while(|b| b.is_ascii())
        .map(|&b| b as char)
        .collect();
    XML_DECL_ENCODING
        .captures(&text)
        .map(|caps| caps[1].to_string())
}

/// Decides which encoding to decode `bytes` with.
///
/// Returns the label of the encoding that was chosen but is not supported
/// as the error value.
pub fn select_encoding(
    bytes: &[u8],
    content_type: Option<&str>,
) -> std::result::Result<TextEncoding, String> {
    let bom = sniff_bom(bytes);
    if let Some(enc @ (TextEncoding::Utf16Le | TextEncoding::Utf16Be)) = bom {
        return Ok(enc);
    }

    if let Some(charset) = content_type.and_then(charset_from_content_type) {
        return TextEncoding::from_label(&charset).ok_or(charset);
    }

    if bom == Some(TextEncoding::Utf8) {
        return Ok(TextEncoding::Utf8);
    }

    if let Some(label) = declared_encoding(bytes) {
        return TextEncoding::from_label(&label).ok_or(label);
    }

    Ok(TextEncoding::Utf8)
}

pub fn decode_document(
    uri: &str,
    bytes: &[u8],
    content_type: Option<&str>,
) -> std::result::Result<String, FetchError> {
    let encoding =
        select_encoding(bytes, content_type).map_err(|charset| FetchError::UnsupportedEncoding {
            uri: uri.to_string(),
            charset,
        })?;

    let body = bytes.strip_prefix(encoding.bom()).unwrap_or(bytes);
    let decode_error = || FetchError::Decode {
        uri: uri.to_string(),
        charset: encoding.name().to_string(),
    };

    let text = match encoding {
        TextEncoding::Utf8 => String::from_utf8(body.to_vec()).map_err(|_| decode_error())?,
        TextEncoding::Latin1 => body.iter().map(|&b| b as char).collect(),
        TextEncoding::Utf16Le | TextEncoding::Utf16Be => {
            if body.len() % 2 != 0 {
                return Err(decode_error());
            }
            let units: Vec<u16> = body
                .chunks_exact(2)
                .map(|pair| match encoding {
                    TextEncoding::Utf16Le => u16::from_le_bytes([pair[0], pair[1]]),
                    _ => u16::from_be_bytes([pair[0], pair[1]]),
                })
                .collect();
            String::from_utf16(&units).map_err(|_| decode_error())?
        }
    };

    Ok(text
        .strip_prefix('\u{FEFF}')
        .map(str::to_string)
        .unwrap_or(text))
}
