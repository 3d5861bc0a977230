//! Template functions (global functions available in templates)
//!
//! The generators are the interesting part: catalog templates call them to
//! mint credentials at install time, and the rendered output is what the
//! chart engine stores, so they must produce plain scalars that survive a
//! yaml round trip.

use minijinja::{Error, ErrorKind, Value};
use rand::Rng;
use sha1::{Digest, Sha1};
use uuid::Uuid;

const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";
const ALPHANUMERIC: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Generate a 31 character username starting with an alphabetic character
///
/// Usage: {{ generate_username() }}
pub fn generate_username() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("u{}", &id[..30])
}

/// Generate a 32 character alphanumeric password
///
/// The first character is always alphabetic so the value is usable where
/// identifiers must not start with a digit.
pub fn generate_password() -> String {
    let mut rng = rand::thread_rng();
    let mut password = String::with_capacity(32);
    password.push(ALPHABET[rng.gen_range(0..ALPHABET.len())] as char);
    for _ in 0..31 {
        password.push(ALPHANUMERIC[rng.gen_range(0..ALPHANUMERIC.len())] as char);
    }
    password
}

/// Derive DNS names for a release under a domain suffix
///
/// Returns `[long]` when `<release>.<suffix>` fits, otherwise
/// `[short, long]` where `short` is a sha1-derived prefix of at most
/// 8 hex characters. Certificates can then carry both names.
pub fn generate_dns_names(release: String, suffix: String) -> Vec<String> {
    let short_len = 63_i64 - suffix.len() as i64;
    let long_name = format!("{}.{}", release, suffix);
    if short_len <= 0 || long_name.len() <= 64 {
        return vec![long_name];
    }

    let hash = hex::encode(Sha1::digest(release.as_bytes()));
    let short_len = (short_len as usize).min(8);
    let short_name = format!("{}.{}", &hash[..short_len], suffix);
    vec![short_name, long_name]
}

/// Look up an environment variable, empty string when unset
///
/// Usage: {{ env("INGRESS_DOMAIN") }}
pub fn env(name: String) -> String {
    std::env::var(name).unwrap_or_default()
}

/// Fail with a custom error message
///
/// Usage: {{ fail("unsupported parameter combination") }}
pub fn fail(message: String) -> Result<Value, Error> {
    Err(Error::new(ErrorKind::InvalidOperation, message))
}

/// Create a dict from key-value pairs
///
/// Usage: {{ dict("key1", value1, "key2", value2) }}
pub fn dict(args: Vec<Value>) -> Result<Value, Error> {
    if args.len() % 2 != 0 {
        return Err(Error::new(
            ErrorKind::InvalidOperation,
            "dict requires an even number of arguments (key-value pairs)",
        ));
    }

    let mut map = serde_json::Map::new();
    for chunk in args.chunks(2) {
        let key = chunk[0]
            .as_str()
            .ok_or_else(|| Error::new(ErrorKind::InvalidOperation, "dict keys must be strings"))?;
        let value: serde_json::Value = serde_json::to_value(&chunk[1])
            .map_err(|e| Error::new(ErrorKind::InvalidOperation, e.to_string()))?;
        map.insert(key.to_string(), value);
    }

    Ok(Value::from_serialize(serde_json::Value::Object(map)))
}

/// Create a list from values
pub fn list(args: Vec<Value>) -> Value {
    Value::from(args)
}

/// Return the first non-empty value
///
/// Usage: {{ coalesce(parameters.size, plan.chart_values.size, "1Gi") }}
pub fn coalesce(args: Vec<Value>) -> Value {
    for arg in args {
        if !arg.is_undefined() && !arg.is_none() {
            if let Some(s) = arg.as_str() {
                if !s.is_empty() {
                    return arg;
                }
            } else {
                return arg;
            }
        }
    }
    Value::UNDEFINED
}

/// Ternary operator
///
/// Usage: {{ ternary(true_value, false_value, condition) }}
pub fn ternary(true_val: Value, false_val: Value, condition: Value) -> Value {
    if condition.is_true() {
        true_val
    } else {
        false_val
    }
}
