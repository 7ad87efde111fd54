//! Attribute-to-option coercion.
//!
//! Coercion table for attribute values (applied in order):
//!
//! | raw string                          | result               |
//! |-------------------------------------|----------------------|
//! | `"true"` / `"false"` (exact)        | `Bool`               |
//! | fully parseable as a finite number  | `Number`             |
//! | anything else (incl. `"12px"`)      | `Text`, unchanged    |
//!
//! Keys are converted from kebab-case to camelCase after stripping
//! `<prefix>-`.

use std::collections::BTreeMap;

use crate::dom::{Document, NodeId};

/// One option value.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl OptionValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<bool> for OptionValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<f64> for OptionValue {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

impl From<&str> for OptionValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

/// Coerce a raw attribute string per the module-level table.
pub fn coerce(raw: &str) -> OptionValue {
    match raw {
        "true" => return OptionValue::Bool(true),
        "false" => return OptionValue::Bool(false),
        _ => {}
    }
    let trimmed = raw.trim();
    if !trimmed.is_empty() {
        if let Ok(n) = trimmed.parse::<f64>() {
            if n.is_finite() && is_plain_number(trimmed) {
                return OptionValue::Number(n);
            }
        }
    }
    OptionValue::Text(raw.to_string())
}

// `f64::from_str` accepts "inf"/"NaN"; markup numbers are digits only.
fn is_plain_number(s: &str) -> bool {
    s.chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'))
}

/// `scale-amount` -> `scaleAmount`.
pub fn kebab_to_camel(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut upper = false;
    for c in key.chars() {
        if c == '-' {
            upper = !out.is_empty();
            continue;
        }
        if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// Options record keyed by camelCase option name.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Options {
    values: BTreeMap<String, OptionValue>,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<OptionValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<OptionValue>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&OptionValue> {
        self.values.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Overlay `other` on top of `self`; `other` wins on conflicts.
    pub fn merge(mut self, other: &Options) -> Self {
        for (k, v) in &other.values {
            self.values.insert(k.clone(), v.clone());
        }
        self
    }

    /// Merge in precedence order: `defaults` < `caller` < `attributes`.
    pub fn layered(defaults: &Options, caller: &Options, attributes: &Options) -> Self {
        defaults.clone().merge(caller).merge(attributes)
    }

    /// Numeric option, or `default` when missing or of another type.
    pub fn number(&self, key: &str, default: f64) -> f64 {
        self.typed(key, default, OptionValue::as_f64)
    }

    pub fn boolean(&self, key: &str, default: bool) -> bool {
        self.typed(key, default, OptionValue::as_bool)
    }

    /// Text option. Numbers and booleans are rendered back to text so that
    /// e.g. a `direction="1"` attribute does not silently vanish.
    pub fn text(&self, key: &str, default: &str) -> String {
        match self.values.get(key) {
            Some(OptionValue::Text(s)) => s.clone(),
            Some(OptionValue::Number(n)) => n.to_string(),
            Some(OptionValue::Bool(b)) => b.to_string(),
            None => default.to_string(),
        }
    }

    fn typed<T: Copy>(&self, key: &str, default: T, get: fn(&OptionValue) -> Option<T>) -> T {
        match self.values.get(key) {
            None => default,
            Some(v) => get(v).unwrap_or_else(|| {
                tracing::debug!(key, value = ?v, "option has unexpected type, using default");
                default
            }),
        }
    }
}

impl<K: Into<String>, V: Into<OptionValue>> FromIterator<(K, V)> for Options {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut out = Self::new();
        for (k, v) in iter {
            out.insert(k, v);
        }
        out
    }
}

/// Read every `<prefix>-<kebab-key>` attribute of `node` into an options
/// record. Attributes without the prefix are ignored.
pub fn resolve(doc: &Document, node: NodeId, prefix: &str) -> Options {
    let head = format!("{prefix}-");
    doc.attributes(node)
        .filter_map(|(name, raw)| {
            let key = name.strip_prefix(head.as_str())?;
            if key.is_empty() {
                return None;
            }
            Some((kebab_to_camel(key), coerce(raw)))
        })
        .collect()
}
