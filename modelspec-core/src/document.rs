//! Generic structured document: the untyped tree between bytes and descriptors.
//!
//! A document is a string-keyed [`serde_yaml::Mapping`]. Mappings keep their
//! insertion order, so what a codec writes first is emitted first. JSON input
//! is accepted because it parses as YAML.

use serde_yaml::{Mapping, Value};

use crate::error::DocumentError;

/// The root of a descriptor document.
pub type Document = Mapping;

/// Parse raw bytes into a document.
///
/// The root must be a mapping; anything else (a scalar, a list, an empty
/// file) is reported as malformed.
pub fn parse(bytes: &[u8]) -> Result<Document, DocumentError> {
    let value: Value = serde_yaml::from_slice(bytes).map_err(|e| DocumentError::Malformed {
        message: e.to_string(),
    })?;
    match value {
        Value::Mapping(map) => Ok(map),
        Value::Null => Err(DocumentError::Malformed {
            message: "document is empty".to_string(),
        }),
        other => Err(DocumentError::Malformed {
            message: format!("expected a mapping at the document root, found {}", kind_of(&other)),
        }),
    }
}

/// Parse a string into a document.
pub fn parse_str(text: &str) -> Result<Document, DocumentError> {
    parse(text.as_bytes())
}

/// Serialize a document as YAML, dropping null-valued entries.
pub fn to_yaml_string(doc: &Document) -> Result<String, DocumentError> {
    let pruned = prune_nulls(doc);
    serde_yaml::to_string(&pruned).map_err(|e| DocumentError::Serialize {
        message: e.to_string(),
    })
}

/// Serialize a document as pretty-printed JSON, dropping null-valued entries.
///
/// JSON has no infinities, so infinite numbers are written as the strings
/// `"inf"` and `"-inf"`. NaN cannot be represented and is an error.
pub fn to_json_string(doc: &Document) -> Result<String, DocumentError> {
    let pruned = Value::Mapping(prune_nulls(doc));
    let finite = json_numbers(&pruned)?;
    serde_json::to_string_pretty(&finite).map_err(|e| DocumentError::Serialize {
        message: e.to_string(),
    })
}

fn json_numbers(value: &Value) -> Result<Value, DocumentError> {
    match value {
        Value::Number(n) => match n.as_f64() {
            Some(f) if f.is_nan() => Err(DocumentError::Serialize {
                message: "NaN cannot be written as JSON".to_string(),
            }),
            Some(f) if f == f64::INFINITY => Ok(Value::String("inf".to_string())),
            Some(f) if f == f64::NEG_INFINITY => Ok(Value::String("-inf".to_string())),
            _ => Ok(value.clone()),
        },
        Value::Mapping(map) => map
            .iter()
            .map(|(k, v)| Ok((k.clone(), json_numbers(v)?)))
            .collect::<Result<Mapping, DocumentError>>()
            .map(Value::Mapping),
        Value::Sequence(seq) => seq
            .iter()
            .map(json_numbers)
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Sequence),
        other => Ok(other.clone()),
    }
}

/// Copy of `doc` with every null-valued mapping entry removed, recursively.
///
/// Nulls inside sequences are kept since removing them would shift positions.
pub fn prune_nulls(doc: &Document) -> Document {
    let mut out = Mapping::with_capacity(doc.len());
    for (key, value) in doc {
        if value.is_null() {
            continue;
        }
        out.insert(key.clone(), prune_value(value));
    }
    out
}

fn prune_value(value: &Value) -> Value {
    match value {
        Value::Mapping(map) => Value::Mapping(prune_nulls(map)),
        Value::Sequence(seq) => Value::Sequence(seq.iter().map(prune_value).collect()),
        Value::Tagged(tagged) => prune_value(&tagged.value),
        other => other.clone(),
    }
}

/// Short human-readable name of a value's shape, for error messages.
pub fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a list",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}
