//! Backtracking subgraph matcher.
//!
//! The search maps one pattern vertex at a time, then every pattern edge whose
//! endpoints have both become mapped. Vertices are visited in a
//! connectivity-aware order so candidates can be drawn from the neighbours of
//! already-mapped vertices instead of the whole graph. Embeddings are
//! injective on vertices and on edges, and not induced: extra host edges
//! between mapped vertices are allowed.

use std::collections::BTreeMap;

use ahash::AHashSet;
use tracing::{debug, trace};

use crate::{
    attributes::contains,
    errors::GraphDbError,
    expr::{EntityKind, EvalError, Namespace, Script},
    graph::InstanceGraph,
    pattern::{Binding, PatternGraph},
};

pub struct Matcher<'g> {
    graph: &'g InstanceGraph,
    pattern: &'g PatternGraph,
    predicate: Script,
    base: Namespace,
    plan: Option<Plan>,
}

/// Visit order computed once per pattern.
struct Plan {
    order: Vec<usize>,
    /// Pattern edges to map right after the vertex at the same step.
    edges_at: Vec<Vec<usize>>,
    /// (source, target) vertex indices per pattern edge.
    endpoints: Vec<(usize, usize)>,
}

struct State<'g> {
    vertices: Vec<Option<&'g str>>,
    edges: Vec<Option<&'g str>>,
    used_vertices: AHashSet<&'g str>,
    used_edges: AHashSet<&'g str>,
}

impl<'g> Matcher<'g> {
    pub fn new(graph: &'g InstanceGraph, pattern: &'g PatternGraph) -> Self {
        Self::with_predicate(graph, pattern, &Script::new(), &Binding::new())
    }

    /// Matcher gated by a WHERE script. Names bound by an earlier match in
    /// `carried` are remapped to their identities unless this pattern
    /// declares them again.
    pub fn with_predicate(
        graph: &'g InstanceGraph,
        pattern: &'g PatternGraph,
        predicate: &Script,
        carried: &Binding,
    ) -> Self {
        let aliases: BTreeMap<String, String> = carried
            .aliases()
            .into_iter()
            .filter(|(placeholder, _)| !pattern.has_placeholder(placeholder))
            .collect();
        let predicate = predicate.remap(&aliases);
        let base = Namespace::for_instance(
            graph,
            predicate
                .referenced_names()
                .into_iter()
                .filter(|name| !pattern.has_placeholder(name)),
        );
        Self {
            graph,
            pattern,
            predicate,
            base,
            plan: Plan::build(pattern),
        }
    }

    /// Every embedding in discovery order.
    pub fn find_all(&self) -> Vec<Binding> {
        let Some(plan) = &self.plan else {
            debug!("pattern edge references an undeclared vertex");
            return Vec::new();
        };
        let mut state = State {
            vertices: vec![None; self.pattern.vertices().len()],
            edges: vec![None; self.pattern.edges().len()],
            used_vertices: AHashSet::new(),
            used_edges: AHashSet::new(),
        };
        let mut found = Vec::new();
        self.extend_vertex(plan, 0, &mut state, &mut found);
        debug!(
            embeddings = found.len(),
            pattern_vertices = self.pattern.vertices().len(),
            pattern_edges = self.pattern.edges().len(),
            "matcher finished"
        );
        found
    }

    /// The embedding at `index` modulo the number of embeddings.
    pub fn match_at(&self, index: usize) -> Result<Binding, GraphDbError> {
        let mut all = self.find_all();
        if all.is_empty() {
            return Err(GraphDbError::NoMatch);
        }
        let position = index % all.len();
        Ok(all.swap_remove(position))
    }

    pub fn exists(&self) -> bool {
        !self.find_all().is_empty()
    }

    fn extend_vertex(
        &self,
        plan: &Plan,
        step: usize,
        state: &mut State<'g>,
        found: &mut Vec<Binding>,
    ) {
        if step == plan.order.len() {
            if self.allows(state, true) {
                found.push(self.binding(state));
            }
            return;
        }
        let guest_index = plan.order[step];
        let guest = &self.pattern.vertices()[guest_index];
        for host in self.candidates(plan, guest_index, state) {
            if state.used_vertices.contains(host) {
                continue;
            }
            let Some(vertex) = self.graph.vertex(host) else {
                continue;
            };
            if !contains(&vertex.attributes, &guest.attributes) {
                continue;
            }
            state.vertices[guest_index] = Some(host);
            state.used_vertices.insert(host);
            if self.allows(state, false) {
                self.extend_edges(plan, step, 0, state, found);
            } else {
                trace!(placeholder = %guest.name, host, "predicate pruned candidate");
            }
            state.used_vertices.remove(host);
            state.vertices[guest_index] = None;
        }
    }

    fn extend_edges(
        &self,
        plan: &Plan,
        step: usize,
        k: usize,
        state: &mut State<'g>,
        found: &mut Vec<Binding>,
    ) {
        let Some(&edge_index) = plan.edges_at[step].get(k) else {
            self.extend_vertex(plan, step + 1, state, found);
            return;
        };
        let guest = &self.pattern.edges()[edge_index];
        let (source, target) = plan.endpoints[edge_index];
        let (Some(host_source), Some(host_target)) = (state.vertices[source], state.vertices[target])
        else {
            return;
        };
        for host in self.graph.edges_between(host_source, host_target) {
            let name = host.name.as_str();
            if state.used_edges.contains(name) || !contains(&host.attributes, &guest.attributes) {
                continue;
            }
            state.edges[edge_index] = Some(name);
            state.used_edges.insert(name);
            self.extend_edges(plan, step, k + 1, state, found);
            state.used_edges.remove(name);
            state.edges[edge_index] = None;
        }
    }

    /// Host vertices adjacent to a mapped neighbour, or every host vertex when
    /// the guest vertex has none yet.
    fn candidates(&self, plan: &Plan, guest: usize, state: &State<'g>) -> Vec<&'g str> {
        let graph = self.graph;
        for &(source, target) in &plan.endpoints {
            if source == guest && target != guest {
                if let Some(anchor) = state.vertices[target] {
                    return dedup(
                        graph
                            .incident_edges(anchor)
                            .filter(|e| e.target == anchor)
                            .map(|e| e.source.as_str()),
                    );
                }
            }
            if target == guest && source != guest {
                if let Some(anchor) = state.vertices[source] {
                    return dedup(
                        graph
                            .incident_edges(anchor)
                            .filter(|e| e.source == anchor)
                            .map(|e| e.target.as_str()),
                    );
                }
            }
        }
        graph.vertices().map(|v| v.name.as_str()).collect()
    }

    /// Runs the WHERE script over the partial mapping. While the search is
    /// incomplete, a reference to a placeholder that is not mapped yet passes.
    fn allows(&self, state: &State<'g>, complete: bool) -> bool {
        if self.predicate.is_empty() {
            return true;
        }
        let mut namespace = self.namespace(state);
        match self.predicate.evaluate(&mut namespace) {
            Ok(value) => value.is_truthy(),
            Err(EvalError::UnboundName { name }) if !complete && self.pattern.has_placeholder(&name) => {
                true
            }
            Err(err) => {
                trace!(error = %err, "predicate failed softly");
                false
            }
        }
    }

    fn namespace(&self, state: &State<'g>) -> Namespace {
        let mut namespace = self.base.clone();
        for (guest, host) in self.pattern.edges().iter().zip(&state.edges) {
            if let Some(edge) = host.and_then(|name| self.graph.edge(name)) {
                namespace.bind(&guest.name, EntityKind::Edge, &edge.name, &edge.attributes);
            }
        }
        for (guest, host) in self.pattern.vertices().iter().zip(&state.vertices) {
            if let Some(vertex) = host.and_then(|name| self.graph.vertex(name)) {
                namespace.bind(&guest.name, EntityKind::Vertex, &vertex.name, &vertex.attributes);
            }
        }
        namespace
    }

    fn binding(&self, state: &State<'g>) -> Binding {
        let mut binding = Binding::new();
        for (guest, host) in self.pattern.vertices().iter().zip(&state.vertices) {
            if let Some(host) = host {
                binding.bind_vertex(guest.name.as_str(), *host);
            }
        }
        for (guest, host) in self.pattern.edges().iter().zip(&state.edges) {
            if let Some(host) = host {
                binding.bind_edge(guest.name.as_str(), *host);
            }
        }
        binding
    }
}

impl Plan {
    fn build(pattern: &PatternGraph) -> Option<Plan> {
        let mut endpoints = Vec::with_capacity(pattern.edges().len());
        for edge in pattern.edges() {
            endpoints.push((
                pattern.vertex_index(&edge.source)?,
                pattern.vertex_index(&edge.target)?,
            ));
        }
        let count = pattern.vertices().len();
        let mut placed = vec![false; count];
        let mut order = Vec::with_capacity(count);
        while order.len() < count {
            let adjacent = (0..count).find(|&v| {
                !placed[v]
                    && endpoints
                        .iter()
                        .any(|&(s, t)| (s == v && placed[t]) || (t == v && placed[s]))
            });
            let Some(next) = adjacent.or_else(|| (0..count).find(|&v| !placed[v])) else {
                break;
            };
            placed[next] = true;
            order.push(next);
        }
        let mut step_of = vec![0; count];
        for (step, &vertex) in order.iter().enumerate() {
            step_of[vertex] = step;
        }
        let mut edges_at = vec![Vec::new(); count];
        for (index, &(source, target)) in endpoints.iter().enumerate() {
            edges_at[step_of[source].max(step_of[target])].push(index);
        }
        Some(Plan {
            order,
            edges_at,
            endpoints,
        })
    }
}

fn dedup<'g>(names: impl Iterator<Item = &'g str>) -> Vec<&'g str> {
    let mut seen = AHashSet::new();
    names.filter(|name| seen.insert(*name)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::parse_script;
    use crate::literal::parse_graph;

    fn graph(text: &str) -> InstanceGraph {
        InstanceGraph::from_literal(text).unwrap()
    }

    fn pattern(text: &str) -> PatternGraph {
        parse_graph(text, "e").unwrap()
    }

    #[test]
    fn test_single_edge_pattern_finds_each_edge() {
        let host = graph("{}(a), {}(b), {}(c), {}(a,b), {}(a,c)");
        let guest = pattern("{}(x), {}(x,y)");
        let found = Matcher::new(&host, &guest).find_all();
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|b| b.vertex("x") == Some("a")));
        let ys: AHashSet<&str> = found.iter().filter_map(|b| b.vertex("y")).collect();
        assert_eq!(ys, ["b", "c"].into_iter().collect());
    }

    #[test]
    fn test_match_index_wraps_around() {
        let host = graph("{'k': 1}(a), {'k': 1}(b), {'k': 1}(c)");
        let guest = pattern("{'k': 1}(x)");
        let matcher = Matcher::new(&host, &guest);
        let first = matcher.match_at(0).unwrap();
        let second = matcher.match_at(1).unwrap();
        assert_ne!(first, second);
        assert_eq!(matcher.match_at(3).unwrap(), first);
    }

    #[test]
    fn test_vertex_mapping_is_injective() {
        let host = graph("{}(a), {}(a,a)");
        let loop_pattern = pattern("{}(x,x)");
        assert_eq!(Matcher::new(&host, &loop_pattern).find_all().len(), 1);
        let pair = pattern("{}(x,y)");
        assert!(matches!(
            Matcher::new(&host, &pair).match_at(0),
            Err(GraphDbError::NoMatch)
        ));
    }

    #[test]
    fn test_parallel_edges_bind_distinct_host_edges() {
        let host = graph("{}(a), {}(b), {'w': 1}(a,b), {'w': 2}(a,b)");
        let guest = pattern("{'name': 'r'}(x,y), {'name': 's'}(x,y)");
        let found = Matcher::new(&host, &guest).find_all();
        assert_eq!(found.len(), 2);
        for binding in &found {
            assert_ne!(binding.edge("r"), binding.edge("s"));
        }
    }

    #[test]
    fn test_edge_attributes_constrain_and_direction_matters() {
        let host = graph("{}(a), {}(b), {'type': 'X'}(a,b)");
        assert!(Matcher::new(&host, &pattern("{'type': 'X'}(x,y)")).exists());
        assert!(!Matcher::new(&host, &pattern("{'type': 'Y'}(x,y)")).exists());
        let reversed = Matcher::new(&host, &pattern("{}(x), {}(y), {}(y,x)")).find_all();
        assert_eq!(reversed.len(), 1);
        assert_eq!(reversed[0].vertex("y"), Some("a"));
    }

    #[test]
    fn test_where_predicate_prunes_candidates() {
        let host = graph("{'word': 'this'}(v1), {'word': 'documentation'}(v2), {'word': 'good'}(v3)");
        let guest = pattern("{}(a)");
        let script = parse_script(r#"(in (get a "word") ["documentation" "Doc"])"#).unwrap();
        let found = Matcher::with_predicate(&host, &guest, &script, &Binding::new()).find_all();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].vertex("a"), Some("v2"));
    }

    #[test]
    fn test_predicate_on_later_placeholder_is_deferred() {
        let host = graph("{'n': 1}(p), {'n': 2}(q), {'n': 3}(r), {}(p,q), {}(p,r)");
        let guest = pattern("{}(a), {}(b), {}(a,b)");
        let script = parse_script(r#"(= (get b "n") 3)"#).unwrap();
        let found = Matcher::with_predicate(&host, &guest, &script, &Binding::new()).find_all();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].vertex("b"), Some("r"));
    }

    #[test]
    fn test_predicate_can_read_matched_edges() {
        let host = graph("{}(a), {}(b), {'w': 1}(a,b), {'w': 5}(b,a)");
        let guest = pattern("{'name': 'r'}(x,y)");
        let script = parse_script(r#"(> (get r "w") 2)"#).unwrap();
        let found = Matcher::with_predicate(&host, &guest, &script, &Binding::new()).find_all();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].vertex("x"), Some("b"));
    }

    #[test]
    fn test_predicate_errors_reject() {
        let host = graph("{'word': 'x'}(v1)");
        let guest = pattern("{}(a)");
        let script = parse_script(r#"(= (get a "missing") 1)"#).unwrap();
        assert!(!Matcher::with_predicate(&host, &guest, &script, &Binding::new()).exists());
    }

    #[test]
    fn test_carried_names_resolve_to_earlier_identities() {
        let host = graph("{'n': 1}(v1), {'n': 1}(v2), {'n': 1}(v3)");
        let guest = pattern("{}(b)");
        let mut carried = Binding::new();
        carried.bind_vertex("a", "v2");
        let script = parse_script(r#"(= (get a "name") "v2") (!= (get b "name") "v1")"#).unwrap();
        let found = Matcher::with_predicate(&host, &guest, &script, &carried).find_all();
        let names: Vec<&str> = found.iter().filter_map(|b| b.vertex("b")).collect();
        assert_eq!(names, vec!["v2", "v3"]);
    }

    #[test]
    fn test_empty_pattern_yields_one_empty_binding() {
        let host = graph("{}(a)");
        let guest = PatternGraph::new();
        let found = Matcher::new(&host, &guest).find_all();
        assert_eq!(found, vec![Binding::new()]);
    }
}
