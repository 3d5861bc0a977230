//! Template filters available to catalog authors
//!
//! These extend MiniJinja with the yaml round-trip, formatting and hashing
//! helpers service definitions rely on.

use base64::Engine as _;
use minijinja::{Error, ErrorKind, Value};
use sha1::{Digest, Sha1};
use sha2::Sha256;

/// Convert a value to YAML format
///
/// Usage: {{ values.nested | toyaml }}
pub fn toyaml(value: Value) -> Result<String, Error> {
    let json_value: serde_json::Value = serde_json::to_value(&value)
        .map_err(|e| Error::new(ErrorKind::InvalidOperation, e.to_string()))?;

    let yaml = serde_yaml::to_string(&json_value)
        .map_err(|e| Error::new(ErrorKind::InvalidOperation, e.to_string()))?;

    // Remove trailing newline and leading "---\n" if present
    let yaml = yaml.trim_start_matches("---\n").trim_end();

    Ok(yaml.to_string())
}

/// Parse a YAML string into a value
///
/// Usage: {% set config = parameters.raw | fromyaml %}
pub fn fromyaml(value: String) -> Result<Value, Error> {
    let parsed: serde_json::Value = serde_yaml::from_str(&value)
        .map_err(|e| Error::new(ErrorKind::InvalidOperation, format!("invalid yaml: {}", e)))?;

    Ok(Value::from_serialize(&parsed))
}

/// Base64 encode a string
pub fn b64encode(value: String) -> String {
    base64::engine::general_purpose::STANDARD.encode(value.as_bytes())
}

/// Base64 decode a string
pub fn b64decode(value: String) -> Result<String, Error> {
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(value.as_bytes())
        .map_err(|e| {
            Error::new(
                ErrorKind::InvalidOperation,
                format!("base64 decode error: {}", e),
            )
        })?;

    String::from_utf8(decoded)
        .map_err(|e| Error::new(ErrorKind::InvalidOperation, format!("UTF-8 decode error: {}", e)))
}

/// Quote a string with double quotes
///
/// Usage: {{ name | quote }}
pub fn quote(value: Value) -> String {
    let s = if let Some(str_val) = value.as_str() {
        str_val.to_string()
    } else {
        value.to_string()
    };
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Indent text without newline prefix
///
/// Usage: {{ content | indent(4) }}
pub fn indent(value: String, spaces: usize) -> String {
    let indent_str = " ".repeat(spaces);
    let mut result = String::with_capacity(value.len() + spaces * value.lines().count());
    let mut first = true;

    for line in value.lines() {
        if !first {
            result.push('\n');
        }
        first = false;

        if !line.is_empty() {
            result.push_str(&indent_str);
        }
        result.push_str(line);
    }

    result
}

/// Indent text with a leading newline
///
/// Usage: {{ content | nindent(4) }}
pub fn nindent(value: String, spaces: usize) -> String {
    let mut result = String::with_capacity(1 + value.len() + spaces * value.lines().count());
    result.push('\n');

    let indent_str = " ".repeat(spaces);
    let mut first = true;

    for line in value.lines() {
        if !first {
            result.push('\n');
        }
        first = false;

        if !line.is_empty() {
            result.push_str(&indent_str);
            result.push_str(line);
        }
    }

    result
}

/// Truncate a string to at most `len` characters
pub fn trunc(value: String, len: usize) -> String {
    value.chars().take(len).collect()
}

/// SHA256 hash of a string, hex encoded
pub fn sha256sum(value: String) -> String {
    hex::encode(Sha256::digest(value.as_bytes()))
}

/// MD5 hash of a string, hex encoded
pub fn md5sum(value: String) -> String {
    format!("{:x}", md5::compute(value.as_bytes()))
}

/// htpasswd-style SHA1 password entry: `{SHA}` + base64 of the raw digest
pub fn htpasswd(value: String) -> String {
    let digest = Sha1::digest(value.as_bytes());
    format!(
        "{{SHA}}{}",
        base64::engine::general_purpose::STANDARD.encode(digest)
    )
}

/// Cost factor matching the entries existing releases already store
const BCRYPT_COST: u32 = 14;

/// bcrypt-hash a password
pub fn bcrypt_hash(value: String) -> Result<String, Error> {
    bcrypt::hash(value.as_bytes(), BCRYPT_COST)
        .map_err(|e| Error::new(ErrorKind::InvalidOperation, format!("bcrypt error: {}", e)))
}
