//! Field-alias resolution over polymorphic upstream JSON.
//!
//! Upstream providers name the same logical attribute differently per bank
//! and per catalog generation. Each logical attribute is resolved through an
//! explicit ordered alias list, first present wins; call sites never probe
//! record shapes ad hoc.

use serde_json::Value;

/// First alias present on the record, regardless of its value type.
pub(crate) fn first_present<'a>(record: &'a Value, aliases: &[&str]) -> Option<&'a Value> {
    aliases
        .iter()
        .find_map(|alias| record.get(*alias))
        .filter(|value| !value.is_null())
}

/// Resolve an attribute to a non-empty string. Numbers are accepted and
/// rendered, since some providers send numeric identifiers.
pub(crate) fn string_field(record: &Value, aliases: &[&str]) -> Option<String> {
    let value = first_present(record, aliases)?;
    let rendered = match value {
        Value::String(text) => text.trim().to_string(),
        Value::Number(number) => number.to_string(),
        _ => return None,
    };
    if rendered.is_empty() {
        None
    } else {
        Some(rendered)
    }
}

/// Resolve an attribute to a finite number. String-encoded numbers count,
/// anything else resolves to `None`.
pub(crate) fn number_field(record: &Value, aliases: &[&str]) -> Option<f64> {
    coerce_number(first_present(record, aliases)?)
}

pub(crate) fn coerce_number(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    parsed.is_finite().then_some(parsed)
}
