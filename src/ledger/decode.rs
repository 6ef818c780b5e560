//! JSON-Cadence decoding of the audit manager script result

use serde_json::Value;

use super::{AttestationQueryError, AttestationSet};

const AUDITS_FIELD: &str = "audits";

/// Extract the attestation set from a JSON-Cadence script result
///
/// `Optional(nil)` means the account holds no audit manager.
pub fn decode_attestations(value: &Value) -> Result<AttestationSet, AttestationQueryError> {
    let value = match cadence_type(value)? {
        "Optional" => match value.get("value") {
            None | Some(Value::Null) => return Ok(AttestationSet::new()),
            Some(inner) => inner,
        },
        _ => value,
    };

    let kind = cadence_type(value)?;
    if kind != "Resource" && kind != "Struct" {
        return Err(decode_error(format!("expected composite, found {}", kind)));
    }

    let fields = value
        .pointer("/value/fields")
        .and_then(Value::as_array)
        .ok_or_else(|| decode_error("composite without fields"))?;

    let audits = fields
        .iter()
        .find(|f| f.get("name").and_then(Value::as_str) == Some(AUDITS_FIELD))
        .and_then(|f| f.get("value"))
        .ok_or_else(|| decode_error("missing 'audits' field"))?;

    if cadence_type(audits)? != "Dictionary" {
        return Err(decode_error("'audits' is not a dictionary"));
    }

    let entries = audits
        .get("value")
        .and_then(Value::as_array)
        .ok_or_else(|| decode_error("dictionary without entries"))?;

    let mut flags = Vec::with_capacity(entries.len());
    for entry in entries {
        let id = entry
            .get("key")
            .filter(|k| k.get("type").and_then(Value::as_str) == Some("String"))
            .and_then(|k| k.get("value"))
            .and_then(Value::as_str)
            .ok_or_else(|| decode_error("dictionary key is not a String"))?;
        let attested = entry
            .get("value")
            .filter(|v| v.get("type").and_then(Value::as_str) == Some("Bool"))
            .and_then(|v| v.get("value"))
            .and_then(Value::as_bool)
            .ok_or_else(|| decode_error("dictionary value is not a Bool"))?;
        flags.push((id, attested));
    }

    Ok(AttestationSet::from_flags(flags))
}

fn cadence_type(value: &Value) -> Result<&str, AttestationQueryError> {
    value
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| decode_error("value without 'type'"))
}

fn decode_error(message: impl Into<String>) -> AttestationQueryError {
    AttestationQueryError::Decode(message.into())
}
