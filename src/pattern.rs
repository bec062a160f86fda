//! Pattern graphs built from clause arguments, and the bindings a match produces.

use std::collections::BTreeMap;

use crate::attributes::AttributeMap;
use crate::graph::types::strip_identity;

#[derive(Clone, Debug, PartialEq)]
pub struct PatternVertex {
    pub name: String,
    pub attributes: AttributeMap,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PatternEdge {
    pub name: String,
    pub source: String,
    pub target: String,
    pub attributes: AttributeMap,
    /// The name was generated because the literal carried no `name` key.
    pub anonymous: bool,
}

/// Small directed graph of placeholders. Vertices and edges keep the order in
/// which they were written.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PatternGraph {
    vertices: Vec<PatternVertex>,
    edges: Vec<PatternEdge>,
}

impl PatternGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a vertex term. A repeated placeholder folds into the first term.
    pub fn add_vertex(&mut self, name: impl Into<String>, attributes: AttributeMap) {
        let name = name.into();
        let attributes = strip_identity(attributes);
        if let Some(existing) = self.vertices.iter_mut().find(|v| v.name == name) {
            for (key, value) in attributes {
                existing.attributes.entry(key).or_insert(value);
            }
            return;
        }
        self.vertices.push(PatternVertex { name, attributes });
    }

    pub fn add_edge(&mut self, edge: PatternEdge) {
        self.edges.push(PatternEdge {
            attributes: strip_identity(edge.attributes),
            ..edge
        });
    }

    /// Appends attribute-less vertices for edge endpoints that have no vertex term.
    pub fn declare_implicit_endpoints(&mut self) {
        let missing: Vec<String> = self
            .edges
            .iter()
            .flat_map(|e| [e.source.clone(), e.target.clone()])
            .filter(|name| self.vertex(name).is_none())
            .collect();
        for name in missing {
            self.add_vertex(name, AttributeMap::new());
        }
    }

    pub fn vertices(&self) -> &[PatternVertex] {
        &self.vertices
    }

    pub fn edges(&self) -> &[PatternEdge] {
        &self.edges
    }

    pub fn vertex(&self, name: &str) -> Option<&PatternVertex> {
        self.vertices.iter().find(|v| v.name == name)
    }

    pub fn edge(&self, name: &str) -> Option<&PatternEdge> {
        self.edges.iter().find(|e| e.name == name)
    }

    pub fn vertex_index(&self, name: &str) -> Option<usize> {
        self.vertices.iter().position(|v| v.name == name)
    }

    pub(crate) fn vertex_attributes_mut(&mut self, name: &str) -> Option<&mut AttributeMap> {
        self.vertices
            .iter_mut()
            .find(|v| v.name == name)
            .map(|v| &mut v.attributes)
    }

    pub(crate) fn edge_attributes_mut(&mut self, name: &str) -> Option<&mut AttributeMap> {
        self.edges
            .iter_mut()
            .find(|e| e.name == name)
            .map(|e| &mut e.attributes)
    }

    /// True when `name` is a vertex or edge placeholder of this pattern.
    pub fn has_placeholder(&self, name: &str) -> bool {
        self.vertex(name).is_some() || self.edge(name).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() && self.edges.is_empty()
    }

    /// Copy of the pattern with every bound placeholder replaced by its
    /// instance identity. Unbound placeholders keep their literal names.
    pub fn renamed(&self, binding: &Binding) -> PatternGraph {
        let vertex_name = |name: &str| -> String {
            binding
                .vertex(name)
                .map(str::to_string)
                .unwrap_or_else(|| name.to_string())
        };
        PatternGraph {
            vertices: self
                .vertices
                .iter()
                .map(|v| PatternVertex {
                    name: vertex_name(&v.name),
                    attributes: v.attributes.clone(),
                })
                .collect(),
            edges: self
                .edges
                .iter()
                .map(|e| {
                    let bound = binding.edge(&e.name);
                    PatternEdge {
                        name: bound.map(str::to_string).unwrap_or_else(|| e.name.clone()),
                        source: vertex_name(&e.source),
                        target: vertex_name(&e.target),
                        attributes: e.attributes.clone(),
                        anonymous: e.anonymous && bound.is_none(),
                    }
                })
                .collect(),
        }
    }
}

/// Placeholder to instance-identity maps produced by one successful match.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Binding {
    vertices: BTreeMap<String, String>,
    edges: BTreeMap<String, String>,
}

impl Binding {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind_vertex(&mut self, placeholder: impl Into<String>, identity: impl Into<String>) {
        self.vertices.insert(placeholder.into(), identity.into());
    }

    pub fn bind_edge(&mut self, placeholder: impl Into<String>, identity: impl Into<String>) {
        self.edges.insert(placeholder.into(), identity.into());
    }

    pub fn vertex(&self, placeholder: &str) -> Option<&str> {
        self.vertices.get(placeholder).map(String::as_str)
    }

    pub fn edge(&self, placeholder: &str) -> Option<&str> {
        self.edges.get(placeholder).map(String::as_str)
    }

    /// Vertex binding first, then edge binding.
    pub fn resolve(&self, placeholder: &str) -> Option<&str> {
        self.vertex(placeholder).or_else(|| self.edge(placeholder))
    }

    pub fn vertices(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vertices.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn edges(&self) -> impl Iterator<Item = (&str, &str)> {
        self.edges.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Every placeholder-to-identity pair, vertices before edges.
    pub fn aliases(&self) -> BTreeMap<String, String> {
        let mut aliases = self.edges.clone();
        aliases.extend(self.vertices.clone());
        aliases
    }

    /// Layers `newer` on top of this binding; newer entries win.
    pub fn absorb(&mut self, newer: &Binding) {
        self.vertices.extend(newer.vertices.clone());
        self.edges.extend(newer.edges.clone());
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() && self.edges.is_empty()
    }

    pub fn len(&self) -> usize {
        self.vertices.len() + self.edges.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::AttributeValue;

    fn edge(name: &str, source: &str, target: &str, anonymous: bool) -> PatternEdge {
        PatternEdge {
            name: name.into(),
            source: source.into(),
            target: target.into(),
            attributes: AttributeMap::new(),
            anonymous,
        }
    }

    #[test]
    fn test_renamed_substitutes_bound_placeholders_only() {
        let mut pattern = PatternGraph::new();
        pattern.add_vertex("a", AttributeMap::new());
        pattern.add_vertex("d", AttributeMap::new());
        pattern.add_edge(edge("r", "a", "d", false));
        pattern.add_edge(edge("edge7", "d", "a", true));

        let mut binding = Binding::new();
        binding.bind_vertex("a", "v2");
        binding.bind_edge("r", "e9");

        let renamed = pattern.renamed(&binding);
        let names: Vec<&str> = renamed.vertices().iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["v2", "d"]);
        assert_eq!(renamed.edges()[0].name, "e9");
        assert_eq!(renamed.edges()[0].source, "v2");
        assert!(renamed.edges()[1].anonymous);
        assert_eq!(renamed.edges()[1].target, "v2");
    }

    #[test]
    fn test_repeated_vertex_terms_fold_together() {
        let mut pattern = PatternGraph::new();
        let mut first = AttributeMap::new();
        first.insert("tag".into(), AttributeValue::from("NN"));
        let mut second = AttributeMap::new();
        second.insert("tag".into(), AttributeValue::from("VB"));
        second.insert("word".into(), AttributeValue::from("x"));
        pattern.add_vertex("a", first);
        pattern.add_vertex("a", second);
        assert_eq!(pattern.vertices().len(), 1);
        let attrs = &pattern.vertex("a").unwrap().attributes;
        assert_eq!(attrs.get("tag"), Some(&AttributeValue::from("NN")));
        assert_eq!(attrs.get("word"), Some(&AttributeValue::from("x")));
    }

    #[test]
    fn test_implicit_endpoints_are_declared() {
        let mut pattern = PatternGraph::new();
        pattern.add_vertex("a", AttributeMap::new());
        pattern.add_edge(edge("r", "a", "b", false));
        pattern.declare_implicit_endpoints();
        assert!(pattern.vertex("b").is_some());
        assert_eq!(pattern.vertex_index("b"), Some(1));
    }

    #[test]
    fn test_binding_resolve_prefers_vertices() {
        let mut binding = Binding::new();
        binding.bind_vertex("x", "v1");
        binding.bind_edge("x", "e1");
        binding.bind_edge("r", "e2");
        assert_eq!(binding.resolve("x"), Some("v1"));
        assert_eq!(binding.resolve("r"), Some("e2"));
        assert_eq!(binding.resolve("zz"), None);
        assert_eq!(binding.len(), 3);
    }
}
