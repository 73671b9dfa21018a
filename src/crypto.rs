//! Request signing for the Piastrix API
//!
//! Every request and callback is signed the same way: the values of a fixed
//! set of fields are rendered to strings, ordered by field name, joined with
//! `:`, suffixed with the shop secret and hashed with SHA-256.

use crate::types::{Fields, SIGN_FIELD};
use crate::{PiastrixError, Result};
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Separator placed between field values in the signed string
pub const FIELD_SEPARATOR: &str = ":";

/// Render a field value the way it enters the signed string.
///
/// Strings are taken verbatim, numbers use serde_json's rendering (integers
/// without leading zeros, floats in shortest round-trip form), `null` is
/// empty and nested values are compact JSON.
pub fn canonical_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

/// Compute the signature of `fields` over `required` without touching the map.
pub fn compute_signature<I, S>(fields: &Fields, required: I, secret_key: &str) -> Result<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut names: Vec<String> = required
        .into_iter()
        .map(|name| name.as_ref().to_owned())
        .collect();
    names.sort();
    names.dedup();

    let values = names
        .iter()
        .map(|name| {
            fields
                .get(name)
                .map(canonical_string)
                .ok_or_else(|| PiastrixError::missing_field(name.as_str()))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut signed = values.join(FIELD_SEPARATOR);
    signed.push_str(secret_key);

    Ok(hex::encode(Sha256::digest(signed.as_bytes())))
}

/// Sign `fields` over `required`, storing the digest under `sign`.
///
/// Any previous `sign` entry is overwritten. Returns the digest.
pub fn sign_fields<I, S>(fields: &mut Fields, required: I, secret_key: &str) -> Result<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let sign = compute_signature(fields, required, secret_key)?;
    fields.insert(SIGN_FIELD.to_string(), Value::String(sign.clone()));
    Ok(sign)
}

/// Merge caller-supplied `extra` fields into `base`.
///
/// Fails without modifying anything if any key of `extra` is already set.
pub fn merge_extra_fields(mut base: Fields, extra: Fields) -> Result<Fields> {
    if let Some(key) = extra.keys().find(|key| base.contains_key(*key)) {
        return Err(PiastrixError::extra_field_conflict(key.as_str()));
    }
    base.extend(extra);
    Ok(base)
}
