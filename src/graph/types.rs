use serde::{Deserialize, Serialize};

use crate::attributes::{AttributeMap, AttributeValue, NAME_KEY};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Vertex {
    pub name: String,
    pub attributes: AttributeMap,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Edge {
    pub name: String,
    pub source: String,
    pub target: String,
    pub attributes: AttributeMap,
}

impl Vertex {
    pub fn new(name: impl Into<String>, attributes: AttributeMap) -> Self {
        Self {
            name: name.into(),
            attributes: strip_identity(attributes),
        }
    }

    /// Attribute map with the identity folded back in under `name`.
    pub fn attributes_with_name(&self) -> AttributeMap {
        with_identity(&self.attributes, &self.name)
    }
}

impl Edge {
    pub fn new(
        name: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
        attributes: AttributeMap,
    ) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            target: target.into(),
            attributes: strip_identity(attributes),
        }
    }

    pub fn attributes_with_name(&self) -> AttributeMap {
        with_identity(&self.attributes, &self.name)
    }

    pub fn connects(&self, source: &str, target: &str) -> bool {
        self.source == source && self.target == target
    }

    pub fn touches(&self, vertex: &str) -> bool {
        self.source == vertex || self.target == vertex
    }
}

pub(crate) fn strip_identity(mut attributes: AttributeMap) -> AttributeMap {
    attributes.remove(NAME_KEY);
    attributes
}

pub(crate) fn with_identity(attributes: &AttributeMap, name: &str) -> AttributeMap {
    let mut full = attributes.clone();
    full.insert(NAME_KEY.to_string(), AttributeValue::from(name));
    full
}
