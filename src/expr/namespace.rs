//! Evaluation environment: names mapped to copies of attribute maps.
//!
//! A namespace never aliases graph storage. Values are copied in when it is
//! built, and a successful run is written back explicitly with
//! [`Namespace::write_back_instance`] or [`Namespace::write_back_pattern`].

use ahash::AHashMap;

use crate::{
    attributes::{AttributeMap, AttributeValue, NAME_KEY},
    graph::{InstanceGraph, types::strip_identity},
    pattern::PatternGraph,
};

use super::{EvalError, EvalResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntityKind {
    Vertex,
    Edge,
}

#[derive(Clone, Debug)]
struct Entry {
    kind: EntityKind,
    identity: String,
    attributes: AttributeMap,
    dirty: bool,
}

#[derive(Clone, Debug, Default)]
pub struct Namespace {
    entries: AHashMap<String, Entry>,
}

impl Namespace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `key` to a copy of `attributes`; the identity is exposed as `name`.
    pub fn bind(
        &mut self,
        key: impl Into<String>,
        kind: EntityKind,
        identity: impl Into<String>,
        attributes: &AttributeMap,
    ) {
        let identity = identity.into();
        let mut attributes = attributes.clone();
        attributes.insert(NAME_KEY.to_string(), AttributeValue::from(identity.as_str()));
        self.entries.insert(
            key.into(),
            Entry {
                kind,
                identity,
                attributes,
                dirty: false,
            },
        );
    }

    /// Binds `key` to the instance entity called `identity`, vertices first.
    /// Returns false when no such entity exists.
    pub fn bind_instance(
        &mut self,
        key: impl Into<String>,
        graph: &InstanceGraph,
        identity: &str,
    ) -> bool {
        if let Some(vertex) = graph.vertex(identity) {
            self.bind(key, EntityKind::Vertex, identity, &vertex.attributes);
            true
        } else if let Some(edge) = graph.edge(identity) {
            self.bind(key, EntityKind::Edge, identity, &edge.attributes);
            true
        } else {
            false
        }
    }

    /// Namespace over the instance entities named in `names`; names that
    /// identify nothing are left unbound.
    pub fn for_instance<'a>(
        graph: &InstanceGraph,
        names: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        let mut namespace = Self::new();
        for name in names {
            namespace.bind_instance(name, graph, name);
        }
        namespace
    }

    /// Namespace over every placeholder of a pattern graph, keyed by placeholder.
    pub fn for_pattern(pattern: &PatternGraph) -> Self {
        let mut namespace = Self::new();
        for edge in pattern.edges() {
            namespace.bind(&edge.name, EntityKind::Edge, &edge.name, &edge.attributes);
        }
        for vertex in pattern.vertices() {
            namespace.bind(&vertex.name, EntityKind::Vertex, &vertex.name, &vertex.attributes);
        }
        namespace
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn attributes(&self, key: &str) -> Option<&AttributeMap> {
        self.entries.get(key).map(|e| &e.attributes)
    }

    pub fn get(&self, key: &str, attribute: &str) -> EvalResult<&AttributeValue> {
        let entry = self
            .entries
            .get(key)
            .ok_or_else(|| EvalError::unbound_name(key))?;
        entry
            .attributes
            .get(attribute)
            .ok_or_else(|| EvalError::missing_key(key, attribute))
    }

    pub fn assoc(&mut self, key: &str, attribute: &str, value: AttributeValue) -> EvalResult<()> {
        if attribute == NAME_KEY {
            return Err(EvalError::IdentityKey {
                name: key.to_string(),
            });
        }
        let entry = self
            .entries
            .get_mut(key)
            .ok_or_else(|| EvalError::unbound_name(key))?;
        entry.attributes.insert(attribute.to_string(), value);
        entry.dirty = true;
        Ok(())
    }

    /// Overwrites the attributes of every modified instance entity with the
    /// namespace copy. Returns how many entities were written.
    pub fn write_back_instance(&self, graph: &mut InstanceGraph) -> usize {
        let mut written = 0;
        for entry in self.entries.values().filter(|e| e.dirty) {
            let target = match entry.kind {
                EntityKind::Vertex => graph.vertex_mut(&entry.identity).map(|v| &mut v.attributes),
                EntityKind::Edge => graph.edge_mut(&entry.identity).map(|e| &mut e.attributes),
            };
            if let Some(attributes) = target {
                *attributes = strip_identity(entry.attributes.clone());
                written += 1;
            }
        }
        written
    }

    /// Same as [`Namespace::write_back_instance`] for a pattern graph.
    pub fn write_back_pattern(&self, pattern: &mut PatternGraph) -> usize {
        let mut written = 0;
        for entry in self.entries.values().filter(|e| e.dirty) {
            let target = match entry.kind {
                EntityKind::Vertex => pattern.vertex_attributes_mut(&entry.identity),
                EntityKind::Edge => pattern.edge_attributes_mut(&entry.identity),
            };
            if let Some(attributes) = target {
                *attributes = strip_identity(entry.attributes.clone());
                written += 1;
            }
        }
        written
    }
}
