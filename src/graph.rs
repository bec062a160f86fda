use ahash::RandomState;
use indexmap::IndexMap;
use rand::Rng;

use crate::{
    attributes::{AttributeMap, format_attributes},
    errors::GraphDbError,
    literal,
};

pub(crate) mod types;

pub use types::{Edge, Vertex};

type Index<V> = IndexMap<String, V, RandomState>;

/// The stored graph. Vertices and edges are keyed by their `name` identity and
/// iterate in insertion order; removals keep the order of the remaining items.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstanceGraph {
    vertices: Index<Vertex>,
    edges: Index<Edge>,
}

impl InstanceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a graph from the literal form `{...}(v), {...}(v,w), ...`.
    pub fn from_literal(text: &str) -> Result<Self, GraphDbError> {
        let mut graph = Self::new();
        if text.trim().is_empty() {
            return Ok(graph);
        }
        let pattern = literal::parse_graph(text, literal::DEFAULT_EDGE_PREFIX)?;
        for vertex in pattern.vertices() {
            graph.merge_vertex(&vertex.name, vertex.attributes.clone());
        }
        for edge in pattern.edges() {
            graph.add_edge(Edge::new(
                edge.name.clone(),
                edge.source.clone(),
                edge.target.clone(),
                edge.attributes.clone(),
            ))?;
        }
        Ok(graph)
    }

    /// Serialized whole-graph form: vertex terms then edge terms, comma separated,
    /// with the identity left out of the attribute maps.
    pub fn to_literal(&self) -> String {
        let vertex_terms = self
            .vertices
            .values()
            .map(|v| format!("{}({})", format_attributes(&v.attributes), v.name));
        let edge_terms = self.edges.values().map(|e| {
            format!(
                "{}({},{})",
                format_attributes(&e.attributes),
                e.source,
                e.target
            )
        });
        vertex_terms.chain(edge_terms).collect::<Vec<_>>().join(", ")
    }

    pub fn add_vertex(&mut self, vertex: Vertex) -> Result<(), GraphDbError> {
        if self.vertices.contains_key(&vertex.name) {
            return Err(GraphDbError::identity_collision(format!(
                "vertex {} already exists",
                vertex.name
            )));
        }
        self.vertices.insert(vertex.name.clone(), vertex);
        Ok(())
    }

    /// Inserts the vertex, or folds `attributes` into the existing one keeping
    /// existing values on conflict. Returns true when a vertex was created.
    pub fn merge_vertex(&mut self, name: &str, attributes: AttributeMap) -> bool {
        match self.vertices.get_mut(name) {
            Some(existing) => {
                merge_first_wins(&mut existing.attributes, attributes);
                false
            }
            None => {
                self.vertices
                    .insert(name.to_string(), Vertex::new(name, attributes));
                true
            }
        }
    }

    pub fn add_edge(&mut self, edge: Edge) -> Result<(), GraphDbError> {
        if self.edges.contains_key(&edge.name) {
            return Err(GraphDbError::identity_collision(format!(
                "edge {} already exists",
                edge.name
            )));
        }
        for endpoint in [&edge.source, &edge.target] {
            if !self.vertices.contains_key(endpoint) {
                return Err(GraphDbError::dangling_edge(format!(
                    "edge {} references missing vertex {endpoint}",
                    edge.name
                )));
            }
        }
        self.edges.insert(edge.name.clone(), edge);
        Ok(())
    }

    /// Folds `attributes` into an existing edge, first write wins.
    pub(crate) fn merge_edge_attributes(&mut self, name: &str, attributes: AttributeMap) {
        if let Some(edge) = self.edges.get_mut(name) {
            merge_first_wins(&mut edge.attributes, attributes);
        }
    }

    /// Removes a vertex. Incident edges are not cascaded: the call fails while any remain.
    pub fn remove_vertex(&mut self, name: &str) -> Result<Option<Vertex>, GraphDbError> {
        if let Some(edge) = self.edges.values().find(|e| e.touches(name)) {
            return Err(GraphDbError::dangling_edge(format!(
                "vertex {name} still has incident edge {}",
                edge.name
            )));
        }
        Ok(self.vertices.shift_remove(name))
    }

    pub fn remove_edge(&mut self, name: &str) -> Option<Edge> {
        self.edges.shift_remove(name)
    }

    pub fn vertex(&self, name: &str) -> Option<&Vertex> {
        self.vertices.get(name)
    }

    pub fn vertex_mut(&mut self, name: &str) -> Option<&mut Vertex> {
        self.vertices.get_mut(name)
    }

    pub fn edge(&self, name: &str) -> Option<&Edge> {
        self.edges.get(name)
    }

    pub fn edge_mut(&mut self, name: &str) -> Option<&mut Edge> {
        self.edges.get_mut(name)
    }

    pub fn contains_vertex(&self, name: &str) -> bool {
        self.vertices.contains_key(name)
    }

    pub fn contains_edge(&self, name: &str) -> bool {
        self.edges.contains_key(name)
    }

    pub fn vertices(&self) -> impl Iterator<Item = &Vertex> {
        self.vertices.values()
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    pub fn edges_between<'a>(
        &'a self,
        source: &'a str,
        target: &'a str,
    ) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.values().filter(move |e| e.connects(source, target))
    }

    pub fn incident_edges<'a>(&'a self, vertex: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.values().filter(move |e| e.touches(vertex))
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() && self.edges.is_empty()
    }

    /// Picks an edge identity not yet used in this graph.
    pub fn fresh_edge_name(&self, prefix: &str) -> String {
        let mut rng = rand::thread_rng();
        loop {
            let candidate = format!("{prefix}{}", rng.gen_range(0..u32::MAX));
            if !self.edges.contains_key(&candidate) {
                return candidate;
            }
        }
    }
}

fn merge_first_wins(existing: &mut AttributeMap, incoming: AttributeMap) {
    for (key, value) in incoming {
        existing.entry(key).or_insert(value);
    }
}
