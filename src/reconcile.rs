use crate::codec::kind_name;
use serde_yaml::{Mapping, Value};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Top-level keys that are only ever inserted whole, never merged into.
///
/// Cloning shares the underlying set, so several stores can be handed the
/// same exemptions without any of them owning global state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExemptKeys {
    keys: Arc<BTreeSet<String>>,
}

impl ExemptKeys {
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keys: Arc::new(keys.into_iter().map(Into::into).collect()),
        }
    }

    /// Reads exemptions from a YAML value: a single string or a sequence of
    /// strings. Anything else is reported and ignored.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Null => Self::default(),
            Value::String(key) => Self::new([key.clone()]),
            Value::Sequence(items) => {
                let mut keys = BTreeSet::new();
                for item in items {
                    match item.as_str() {
                        Some(key) => {
                            keys.insert(key.to_string());
                        }
                        None => tracing::error!(
                            event = "config.exempt_keys.invalid_item",
                            found = kind_name(item),
                            "Ignoring non-string exempt key"
                        ),
                    }
                }
                Self {
                    keys: Arc::new(keys),
                }
            }
            other => {
                tracing::error!(
                    event = "config.exempt_keys.invalid",
                    found = kind_name(other),
                    "Exempt keys must be a string or a list of strings; ignoring"
                );
                Self::default()
            }
        }
    }

    pub fn union(&self, other: &ExemptKeys) -> ExemptKeys {
        if other.keys.is_empty() || Arc::ptr_eq(&self.keys, &other.keys) {
            return self.clone();
        }
        if self.keys.is_empty() {
            return other.clone();
        }
        let merged = self.keys.iter().chain(other.keys.iter()).cloned();
        ExemptKeys::new(merged)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }

    pub fn shares_with(&self, other: &ExemptKeys) -> bool {
        Arc::ptr_eq(&self.keys, &other.keys)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FillKind {
    Inserted,
    SubKeys(Vec<String>),
    Elements(usize),
}

/// One top-level key that reconciliation changed.
#[derive(Debug, Clone, PartialEq)]
pub struct Fill {
    pub key: String,
    pub kind: FillKind,
}

/// Copies whatever `defaults` has and `active` lacks into `active`.
///
/// Missing top-level keys are inserted with their default value. For keys
/// already present and not exempt, a default mapping contributes its missing
/// sub-keys (one level only) and a default sequence contributes the elements
/// not already in the stored sequence, appended in default order. Scalars,
/// exempt keys and values whose type differs from the default are left
/// alone. An empty result means nothing changed.
pub fn fill_missing(active: &mut Mapping, defaults: &Mapping, exempt: &ExemptKeys) -> Vec<Fill> {
    let mut fills = Vec::new();
    for (key, default_value) in defaults {
        let label = key_label(key);
        if !active.contains_key(key) {
            active.insert(key.clone(), default_value.clone());
            fills.push(Fill {
                key: label,
                kind: FillKind::Inserted,
            });
            continue;
        }
        if key.as_str().is_some_and(|name| exempt.contains(name)) {
            continue;
        }
        let Some(current) = active.get_mut(key) else {
            continue;
        };
        match (default_value, current) {
            (Value::Mapping(default_map), Value::Mapping(current_map)) => {
                let added = fill_sub_keys(current_map, default_map);
                if !added.is_empty() {
                    fills.push(Fill {
                        key: label,
                        kind: FillKind::SubKeys(added),
                    });
                }
            }
            (Value::Sequence(default_items), Value::Sequence(current_items)) => {
                let added = fill_elements(current_items, default_items);
                if added > 0 {
                    fills.push(Fill {
                        key: label,
                        kind: FillKind::Elements(added),
                    });
                }
            }
            _ => {}
        }
    }
    fills
}

fn fill_sub_keys(current: &mut Mapping, defaults: &Mapping) -> Vec<String> {
    let mut added = Vec::new();
    for (sub_key, value) in defaults {
        if !current.contains_key(sub_key) {
            current.insert(sub_key.clone(), value.clone());
            added.push(key_label(sub_key));
        }
    }
    added
}

fn fill_elements(current: &mut Vec<Value>, defaults: &[Value]) -> usize {
    let mut added = 0;
    for item in defaults {
        if !current.contains(item) {
            current.push(item.clone());
            added += 1;
        }
    }
    added
}

pub(crate) fn key_label(key: &Value) -> String {
    match key {
        Value::String(text) => text.clone(),
        Value::Number(number) => number.to_string(),
        Value::Bool(flag) => flag.to_string(),
        Value::Null => "null".to_string(),
        other => format!("<{}>", kind_name(other)),
    }
}
