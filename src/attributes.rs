//! Scalar attribute values attached to vertices and edges.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Key under which every vertex and edge carries its identity.
pub const NAME_KEY: &str = "name";

/// Attribute map of a vertex or edge. Keys are kept sorted so that the
/// serialized graph form is deterministic.
pub type AttributeMap = BTreeMap<String, AttributeValue>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
}

impl AttributeValue {
    /// Empty values act as wildcards in pattern attributes: every falsy value
    /// (null, "", `false`, zero) opts its key out of the comparison.
    pub fn is_empty(&self) -> bool {
        !self.is_truthy()
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            AttributeValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Truthiness used by predicates: `false`, null, zero and "" are false.
    pub fn is_truthy(&self) -> bool {
        match self {
            AttributeValue::Null => false,
            AttributeValue::Bool(b) => *b,
            AttributeValue::Number(n) => *n != 0.0,
            AttributeValue::String(s) => !s.is_empty(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            AttributeValue::Null => "null",
            AttributeValue::Bool(_) => "boolean",
            AttributeValue::Number(_) => "number",
            AttributeValue::String(_) => "string",
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::String(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::String(value)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        AttributeValue::Number(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Number(value as f64)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Bool(value)
    }
}

/// Python-literal spelling, the same form the literal graph grammar reads.
impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Null => f.write_str("None"),
            AttributeValue::Bool(true) => f.write_str("True"),
            AttributeValue::Bool(false) => f.write_str("False"),
            AttributeValue::Number(n) => write!(f, "{}", format_number(*n)),
            AttributeValue::String(s) => write!(f, "'{}'", escape(s)),
        }
    }
}

pub(crate) fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out
}

/// Formats `{'k': v, ...}`, skipping the identity key.
pub fn format_attributes(attrs: &AttributeMap) -> String {
    let body = attrs
        .iter()
        .filter(|(key, _)| key.as_str() != NAME_KEY)
        .map(|(key, value)| format!("'{}': {}", escape(key), value))
        .collect::<Vec<_>>()
        .join(", ");
    format!("{{{body}}}")
}

/// Subset test used by the matcher: every non-empty guest value must be present
/// and equal on the host. Empty guest values opt their key out; the identity
/// key is never compared.
pub fn contains(host: &AttributeMap, guest: &AttributeMap) -> bool {
    guest
        .iter()
        .filter(|(key, value)| key.as_str() != NAME_KEY && !value.is_empty())
        .all(|(key, value)| host.get(key) == Some(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, AttributeValue)]) -> AttributeMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_contains_ignores_empty_guest_values() {
        let host = map(&[("tag", "NN".into()), ("word", "good".into())]);
        let guest = map(&[("tag", "NN".into()), ("word", AttributeValue::Null)]);
        assert!(contains(&host, &guest));
        let blank = map(&[("lemma", "".into())]);
        assert!(contains(&host, &blank));
    }

    #[test]
    fn test_contains_requires_equal_values() {
        let host = map(&[("tag", "NN".into())]);
        assert!(!contains(&host, &map(&[("tag", "VB".into())])));
        assert!(!contains(&host, &map(&[("count", 3_i64.into())])));
        assert!(!contains(&host, &map(&[("flag", true.into())])));
    }

    #[test]
    fn test_false_and_zero_are_wildcards() {
        let host = map(&[("flag", true.into()), ("n", 5_i64.into())]);
        assert!(contains(&host, &map(&[("flag", false.into())])));
        assert!(contains(&host, &map(&[("n", 0_i64.into()), ("missing", false.into())])));
    }

    #[test]
    fn test_contains_skips_identity() {
        let host = map(&[("name", "v1".into())]);
        assert!(contains(&host, &map(&[("name", "a".into())])));
    }

    #[test]
    fn test_python_literal_formatting() {
        let attrs = map(&[
            ("b", true.into()),
            ("n", 3_i64.into()),
            ("f", 0.5.into()),
            ("s", "it's".into()),
            ("z", AttributeValue::Null),
            ("name", "hidden".into()),
        ]);
        assert_eq!(
            format_attributes(&attrs),
            "{'b': True, 'f': 0.5, 'n': 3, 's': 'it\\'s', 'z': None}"
        );
    }
}
