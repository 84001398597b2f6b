//! Typed, path-aware access to untyped document mappings.
//!
//! [`Fields`] wraps a borrowed mapping together with its dotted path from the
//! document root, so that every type error names the exact field that failed
//! (`inputs[0].shape.min`). [`Emitter`] is the write-side counterpart: it
//! builds a mapping in insertion order and silently skips absent values.

use serde_yaml::{Mapping, Number, Value};
use std::collections::BTreeMap;

use crate::document::kind_of;
use crate::error::CodecError;
use crate::model::DataRange;

/// Read view over one mapping of a document.
#[derive(Debug, Clone, Copy)]
pub struct Fields<'a> {
    map: &'a Mapping,
    path: &'a str,
}

/// Owned path for a nested view; keeps [`Fields`] itself `Copy`.
#[derive(Debug, Clone)]
pub struct FieldPath(String);

impl FieldPath {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<'a> Fields<'a> {
    /// View over the document root.
    pub fn root(map: &'a Mapping) -> Self {
        Self { map, path: "" }
    }

    /// View over a nested mapping whose path was produced by [`Fields::path_of`].
    pub fn nested(map: &'a Mapping, path: &'a FieldPath) -> Self {
        Self {
            map,
            path: path.as_str(),
        }
    }

    pub fn mapping_ref(&self) -> &'a Mapping {
        self.map
    }

    /// Dotted path of `key` below this view.
    pub fn path_of(&self, key: &str) -> FieldPath {
        if self.path.is_empty() {
            FieldPath(key.to_string())
        } else {
            FieldPath(format!("{}.{}", self.path, key))
        }
    }

    /// Path of the `index`th element of the list at `key`.
    pub fn element_path(&self, key: &str, index: usize) -> FieldPath {
        FieldPath(format!("{}[{}]", self.path_of(key).0, index))
    }

    /// Raw value at `key`; null counts as absent.
    pub fn get(&self, key: &str) -> Option<&'a Value> {
        self.map.get(key).filter(|v| !v.is_null())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    fn invalid(&self, key: &str, expected: &str, found: &Value) -> CodecError {
        CodecError::invalid(
            self.path_of(key).0,
            format!("expected {}, found {}", expected, kind_of(found)),
        )
    }

    /// A string. Numbers and booleans are stringified.
    pub fn string(&self, key: &str) -> Result<Option<String>, CodecError> {
        match self.get(key) {
            None => Ok(None),
            Some(value) => scalar_to_string(value)
                .map(Some)
                .ok_or_else(|| self.invalid(key, "a string", value)),
        }
    }

    pub fn required_string(&self, key: &str) -> Result<String, CodecError> {
        self.string(key)?
            .ok_or_else(|| CodecError::missing(self.path_of(key).0))
    }

    /// A list of strings.
    pub fn string_list(&self, key: &str) -> Result<Option<Vec<String>>, CodecError> {
        let Some(items) = self.list(key)? else {
            return Ok(None);
        };
        items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                scalar_to_string(item).ok_or_else(|| {
                    CodecError::invalid(
                        self.element_path(key, i).0,
                        format!("expected a string, found {}", kind_of(item)),
                    )
                })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Some)
    }

    /// A single string or a list of strings, always returned as a list.
    pub fn string_or_list(&self, key: &str) -> Result<Option<Vec<String>>, CodecError> {
        match self.get(key) {
            Some(Value::Sequence(_)) => self.string_list(key),
            Some(_) => Ok(self.string(key)?.map(|s| vec![s])),
            None => Ok(None),
        }
    }

    pub fn integer(&self, key: &str) -> Result<Option<i64>, CodecError> {
        match self.get(key) {
            None => Ok(None),
            Some(value) => value
                .as_i64()
                .map(Some)
                .ok_or_else(|| self.invalid(key, "an integer", value)),
        }
    }

    /// A list of integers.
    pub fn int_list(&self, key: &str) -> Result<Option<Vec<i64>>, CodecError> {
        let Some(items) = self.list(key)? else {
            return Ok(None);
        };
        items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                item.as_i64().ok_or_else(|| {
                    CodecError::invalid(
                        self.element_path(key, i).0,
                        format!("expected an integer, found {}", kind_of(item)),
                    )
                })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Some)
    }

    /// A list of numbers.
    pub fn float_list(&self, key: &str) -> Result<Option<Vec<f64>>, CodecError> {
        let Some(items) = self.list(key)? else {
            return Ok(None);
        };
        items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                item.as_f64().ok_or_else(|| {
                    CodecError::invalid(
                        self.element_path(key, i).0,
                        format!("expected a number, found {}", kind_of(item)),
                    )
                })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Some)
    }

    /// A number written either as a scalar or as a one-element list.
    pub fn number(&self, key: &str) -> Result<Option<f64>, CodecError> {
        let Some(value) = self.get(key) else {
            return Ok(None);
        };
        match value {
            Value::Number(n) => Ok(n.as_f64()),
            Value::String(_) => bound_from_value(value)
                .map(Some)
                .ok_or_else(|| self.invalid(key, "a number", value)),
            Value::Sequence(items) if items.len() == 1 => bound_from_value(&items[0])
                .map(Some)
                .ok_or_else(|| self.invalid(key, "a number", &items[0])),
            Value::Sequence(items) => Err(CodecError::invalid(
                self.path_of(key).0,
                format!("expected a single number, found a list of {}", items.len()),
            )),
            other => Err(self.invalid(key, "a number", other)),
        }
    }

    /// A `[min, max]` pair; `inf`/`-inf` strings are infinite bounds.
    pub fn data_range(&self, key: &str) -> Result<Option<DataRange>, CodecError> {
        let Some(items) = self.list(key)? else {
            return Ok(None);
        };
        if items.len() != 2 {
            return Err(CodecError::invalid(
                self.path_of(key).0,
                format!("expected [min, max], found a list of {}", items.len()),
            ));
        }
        let bound = |i: usize| {
            bound_from_value(&items[i]).ok_or_else(|| {
                CodecError::invalid(
                    self.element_path(key, i).0,
                    format!("expected a number or 'inf', found {}", kind_of(&items[i])),
                )
            })
        };
        Ok(Some(DataRange::new(bound(0)?, bound(1)?)))
    }

    /// A sequence.
    pub fn list(&self, key: &str) -> Result<Option<&'a [Value]>, CodecError> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::Sequence(items)) => Ok(Some(items.as_slice())),
            Some(other) => Err(self.invalid(key, "a list", other)),
        }
    }

    /// A nested mapping.
    pub fn mapping(&self, key: &str) -> Result<Option<&'a Mapping>, CodecError> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::Mapping(map)) => Ok(Some(map)),
            Some(other) => Err(self.invalid(key, "a mapping", other)),
        }
    }

    /// A mapping of string to string, ordered by key.
    pub fn string_map(&self, key: &str) -> Result<Option<BTreeMap<String, String>>, CodecError> {
        let Some(map) = self.mapping(key)? else {
            return Ok(None);
        };
        let mut out = BTreeMap::new();
        for (k, v) in map {
            let name = scalar_to_string(k).ok_or_else(|| {
                CodecError::invalid(self.path_of(key).0, "mapping keys must be strings")
            })?;
            let entry = scalar_to_string(v).ok_or_else(|| {
                CodecError::invalid(
                    self.path_of(key).path_of(&name),
                    format!("expected a string, found {}", kind_of(v)),
                )
            })?;
            out.insert(name, entry);
        }
        Ok(Some(out))
    }
}

impl FieldPath {
    fn path_of(&self, key: &str) -> String {
        format!("{}.{}", self.0, key)
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn bound_from_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => match s.as_str() {
            "inf" | "+inf" => Some(f64::INFINITY),
            "-inf" => Some(f64::NEG_INFINITY),
            _ => None,
        },
        _ => None,
    }
}

/// Wire form of a data-range bound.
pub fn bound_to_value(bound: f64) -> Value {
    if bound == f64::INFINITY {
        Value::String("inf".to_string())
    } else if bound == f64::NEG_INFINITY {
        Value::String("-inf".to_string())
    } else {
        Value::Number(Number::from(bound))
    }
}

/// Builds one mapping in insertion order, dropping absent values.
#[derive(Debug, Default)]
pub struct Emitter {
    map: Mapping,
}

impl Emitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, key: &str, value: impl Into<Value>) -> &mut Self {
        self.map.insert(Value::String(key.to_string()), value.into());
        self
    }

    pub fn put_opt(&mut self, key: &str, value: Option<Value>) -> &mut Self {
        if let Some(value) = value {
            self.put(key, value);
        }
        self
    }

    pub fn put_str(&mut self, key: &str, value: Option<&str>) -> &mut Self {
        self.put_opt(key, value.map(Value::from))
    }

    pub fn put_number(&mut self, key: &str, value: Option<f64>) -> &mut Self {
        self.put_opt(key, value.map(|n| Value::Number(Number::from(n))))
    }

    pub fn put_str_list(&mut self, key: &str, value: Option<&[String]>) -> &mut Self {
        self.put_opt(key, value.map(str_seq))
    }

    pub fn put_int_list(&mut self, key: &str, value: Option<&[i64]>) -> &mut Self {
        self.put_opt(
            key,
            value.map(|items| {
                Value::Sequence(items.iter().map(|&n| Value::Number(n.into())).collect())
            }),
        )
    }

    pub fn put_float_list(&mut self, key: &str, value: Option<&[f64]>) -> &mut Self {
        self.put_opt(
            key,
            value.map(|items| {
                Value::Sequence(items.iter().map(|&n| Value::Number(n.into())).collect())
            }),
        )
    }

    pub fn put_data_range(&mut self, key: &str, value: Option<DataRange>) -> &mut Self {
        self.put_opt(
            key,
            value.map(|r| Value::Sequence(vec![bound_to_value(r.min), bound_to_value(r.max)])),
        )
    }

    pub fn put_string_map(
        &mut self,
        key: &str,
        value: Option<&BTreeMap<String, String>>,
    ) -> &mut Self {
        self.put_opt(
            key,
            value.map(|entries| {
                Value::Mapping(
                    entries
                        .iter()
                        .map(|(k, v)| (Value::from(k.as_str()), Value::from(v.as_str())))
                        .collect(),
                )
            }),
        )
    }

    /// Nested mapping; an empty emitter is dropped.
    pub fn put_nested(&mut self, key: &str, nested: Emitter) -> &mut Self {
        if !nested.map.is_empty() {
            self.put(key, Value::Mapping(nested.map));
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn finish(self) -> Mapping {
        self.map
    }
}

/// Sequence of string values.
pub fn str_seq(items: &[String]) -> Value {
    Value::Sequence(items.iter().map(|s| Value::from(s.as_str())).collect())
}
