//! The canonical textual document format (§4.H, §6).
//!
//! A document is a `serde_json::Value` tree of nested
//! `{version, type, data}` shells. `serde_json` is used only for the tree
//! shape (objects, arrays, strings) — primitive-specific numeric fields go
//! through [`crate::numeric`] so that `±inf`/`nan` survive the round trip.

use crate::error::{FormatError, Result, VersionError};
use serde_json::Value;

/// The version this crate writes and the newest version it reads.
pub const CURRENT_VERSION: &str = "1.0";

struct ParsedVersion {
    major: u32,
    minor: u32,
}

fn parse_version(version: &str, path: &str) -> Result<ParsedVersion> {
    let mut parts = version.splitn(2, '.');
    let major = parts.next().unwrap_or("");
    let minor = parts.next().unwrap_or("0");
    let major: u32 = major.parse().map_err(|_| FormatError::Malformed {
        path: path.to_string(),
        message: format!("malformed version string `{version}`"),
    })?;
    let minor: u32 = minor.parse().map_err(|_| FormatError::Malformed {
        path: path.to_string(),
        message: format!("malformed version string `{version}`"),
    })?;
    Ok(ParsedVersion { major, minor })
}

/// Check that a document's `version` is readable by this crate (§4.H):
/// the reader's major must be `>=` the document's major, or majors are
/// equal and the reader's minor is `>=` the document's minor.
pub fn check_version(doc_version: &str, path: &str) -> Result<()> {
    let doc = parse_version(doc_version, path)?;
    let reader = parse_version(CURRENT_VERSION, "$reader")?;
    let compatible = reader.major > doc.major || (reader.major == doc.major && reader.minor >= doc.minor);
    if compatible {
        Ok(())
    } else {
        Err(VersionError {
            found: doc_version.to_string(),
            reader: CURRENT_VERSION.to_string(),
        }
        .into())
    }
}

/// Pull the `{version, type, data}` triple out of a document node, failing
/// with a `FormatError` that names the offending path.
pub fn unwrap_shell<'a>(doc: &'a Value, path: &str) -> Result<(&'a str, &'a str, &'a Value)> {
    let obj = doc.as_object().ok_or_else(|| FormatError::Malformed {
        path: path.to_string(),
        message: "expected an object with `version`, `type` and `data`".to_string(),
    })?;

    let version = obj
        .get("version")
        .and_then(Value::as_str)
        .ok_or_else(|| FormatError::MissingField {
            path: path.to_string(),
            field: "version",
        })?;
    check_version(version, path)?;

    let type_name = obj
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| FormatError::MissingField {
            path: path.to_string(),
            field: "type",
        })?;

    let data = obj.get("data").ok_or_else(|| FormatError::MissingField {
        path: path.to_string(),
        field: "data",
    })?;

    Ok((version, type_name, data))
}

/// Fetch a required field from a document body, naming both the field and
/// the path for diagnostics.
pub fn field<'a>(data: &'a Value, field: &'static str, path: &str) -> Result<&'a Value> {
    data.get(field).ok_or_else(|| {
        FormatError::MissingField {
            path: path.to_string(),
            field,
        }
        .into()
    })
}

pub fn as_f64(data: &Value, field_name: &'static str, path: &str) -> Result<f64> {
    crate::numeric::decode_number(field(data, field_name, path)?, &format!("{path}.{field_name}"))
}

pub fn as_usize(data: &Value, field_name: &'static str, path: &str) -> Result<usize> {
    field(data, field_name, path)?
        .as_u64()
        .map(|n| n as usize)
        .ok_or_else(|| {
            FormatError::WrongType {
                path: path.to_string(),
                field: field_name,
                expected: "non-negative integer",
            }
            .into()
        })
}

pub fn as_str<'a>(data: &'a Value, field_name: &'static str, path: &str) -> Result<&'a str> {
    field(data, field_name, path)?
        .as_str()
        .ok_or_else(|| {
            FormatError::WrongType {
                path: path.to_string(),
                field: field_name,
                expected: "string",
            }
            .into()
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("1.0", true)]
    #[case("0.9", true)]
    #[case("0.1", true)]
    #[case("2.0", false)]
    #[case("1.7", false)]
    fn version_compatibility_matrix(#[case] doc_version: &str, #[case] compatible: bool) {
        assert_eq!(check_version(doc_version, "$").is_ok(), compatible);
    }
}
