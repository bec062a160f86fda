//! CREATE, DELETE and SET applied to the instance graph.
//!
//! CREATE and DELETE check everything that can fail before touching the graph,
//! so a rejected clause leaves it unchanged. SET never fails: evaluation errors
//! skip the write-back for the namespace that raised them.

use ahash::{AHashMap, AHashSet};
use tracing::{debug, warn};

use crate::{
    config::DatabaseConfig,
    errors::GraphDbError,
    expr::{Namespace, Script},
    graph::{Edge, InstanceGraph},
    pattern::{Binding, PatternEdge, PatternGraph},
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CreateOutcome {
    pub vertices_created: usize,
    pub vertices_merged: usize,
    pub edges_created: usize,
    pub edges_merged: usize,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DeleteOutcome {
    pub vertices_removed: usize,
    pub edges_removed: usize,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SetOutcome {
    pub pattern_written: usize,
    pub instance_written: usize,
}

enum EdgeAction {
    Insert(Edge),
    Merge(PatternEdge),
    Anonymous(PatternEdge),
}

/// Merges `pattern` into `graph` after renaming bound placeholders to their
/// identities. Vertices sharing a name contract into one, first write wins.
/// Edges contract when they carry the same identity, or when an anonymous
/// edge repeats an existing edge exactly (same endpoints and attributes).
pub fn create(
    graph: &mut InstanceGraph,
    pattern: &PatternGraph,
    binding: &Binding,
    config: &DatabaseConfig,
) -> Result<CreateOutcome, GraphDbError> {
    if config.strict_identities {
        for vertex in pattern.vertices() {
            if binding.vertex(&vertex.name).is_none() && graph.contains_vertex(&vertex.name) {
                warn!(vertex = %vertex.name, "unbound CREATE placeholder names an existing vertex");
                return Err(GraphDbError::identity_collision(format!(
                    "vertex {} already exists and is not bound by a match",
                    vertex.name
                )));
            }
        }
        for edge in pattern.edges().iter().filter(|e| !e.anonymous) {
            if binding.edge(&edge.name).is_none() && graph.contains_edge(&edge.name) {
                warn!(edge = %edge.name, "unbound CREATE placeholder names an existing edge");
                return Err(GraphDbError::identity_collision(format!(
                    "edge {} already exists and is not bound by a match",
                    edge.name
                )));
            }
        }
    }

    let renamed = pattern.renamed(binding);
    let declared: AHashSet<&str> = renamed.vertices().iter().map(|v| v.name.as_str()).collect();
    let mut planned: AHashMap<String, (String, String)> = AHashMap::new();
    let mut actions = Vec::with_capacity(renamed.edges().len());

    for edge in renamed.edges() {
        for endpoint in [&edge.source, &edge.target] {
            if !declared.contains(endpoint.as_str()) && !graph.contains_vertex(endpoint) {
                return Err(GraphDbError::dangling_edge(format!(
                    "edge {} references undeclared vertex {endpoint}",
                    edge.name
                )));
            }
        }
        if edge.anonymous {
            actions.push(EdgeAction::Anonymous(edge.clone()));
            continue;
        }
        let existing = graph
            .edge(&edge.name)
            .map(|e| (e.source.clone(), e.target.clone()))
            .or_else(|| planned.get(&edge.name).cloned());
        match existing {
            Some((source, target)) if source == edge.source && target == edge.target => {
                actions.push(EdgeAction::Merge(edge.clone()));
            }
            Some((source, target)) => {
                warn!(edge = %edge.name, "edge identity reused with different endpoints");
                return Err(GraphDbError::identity_collision(format!(
                    "edge {} already connects {source} to {target}, not {} to {}",
                    edge.name, edge.source, edge.target
                )));
            }
            None => {
                planned.insert(
                    edge.name.clone(),
                    (edge.source.clone(), edge.target.clone()),
                );
                actions.push(EdgeAction::Insert(Edge::new(
                    edge.name.clone(),
                    edge.source.clone(),
                    edge.target.clone(),
                    edge.attributes.clone(),
                )));
            }
        }
    }

    let mut outcome = CreateOutcome::default();
    for vertex in renamed.vertices() {
        if graph.merge_vertex(&vertex.name, vertex.attributes.clone()) {
            outcome.vertices_created += 1;
        } else {
            outcome.vertices_merged += 1;
        }
    }
    for action in actions {
        match action {
            EdgeAction::Insert(edge) => {
                graph.add_edge(edge)?;
                outcome.edges_created += 1;
            }
            EdgeAction::Merge(edge) => {
                graph.merge_edge_attributes(&edge.name, edge.attributes);
                outcome.edges_merged += 1;
            }
            EdgeAction::Anonymous(edge) => {
                let duplicate = graph
                    .edges_between(&edge.source, &edge.target)
                    .any(|e| e.attributes == edge.attributes);
                if duplicate {
                    outcome.edges_merged += 1;
                    continue;
                }
                let name = if graph.contains_edge(&edge.name) || planned.contains_key(&edge.name) {
                    graph.fresh_edge_name(&config.generated_name_prefix)
                } else {
                    edge.name
                };
                graph.add_edge(Edge::new(name, edge.source, edge.target, edge.attributes))?;
                outcome.edges_created += 1;
            }
        }
    }
    debug!(?outcome, "create applied");
    Ok(outcome)
}

/// Removes the entities named by `placeholders`. Each name resolves through
/// `binding` (vertex then edge) and otherwise stands for itself; names that
/// identify nothing are skipped. A vertex may only go when every incident
/// edge is removed by the same call.
pub fn delete(
    graph: &mut InstanceGraph,
    placeholders: &[String],
    binding: &Binding,
) -> Result<DeleteOutcome, GraphDbError> {
    let mut vertices: Vec<String> = Vec::new();
    let mut edges: Vec<String> = Vec::new();
    for placeholder in placeholders {
        let placeholder = placeholder.as_str();
        if let Some(identity) = binding.vertex(placeholder) {
            vertices.push(identity.to_string());
        } else if let Some(identity) = binding.edge(placeholder) {
            edges.push(identity.to_string());
        } else if graph.contains_vertex(placeholder) {
            vertices.push(placeholder.to_string());
        } else if graph.contains_edge(placeholder) {
            edges.push(placeholder.to_string());
        } else {
            debug!(placeholder, "DELETE name resolves to nothing");
        }
    }

    let doomed: AHashSet<&str> = edges.iter().map(String::as_str).collect();
    for vertex in &vertices {
        if let Some(edge) = graph
            .incident_edges(vertex)
            .find(|e| !doomed.contains(e.name.as_str()))
        {
            return Err(GraphDbError::dangling_edge(format!(
                "deleting vertex {vertex} would orphan edge {}; name it in the DELETE list",
                edge.name
            )));
        }
    }

    let mut outcome = DeleteOutcome::default();
    for edge in &edges {
        if graph.remove_edge(edge).is_some() {
            outcome.edges_removed += 1;
        }
    }
    for vertex in &vertices {
        if graph.remove_vertex(vertex)?.is_some() {
            outcome.vertices_removed += 1;
        }
    }
    debug!(?outcome, "delete applied");
    Ok(outcome)
}

/// Runs `script` twice: against the pattern's placeholders, then against the
/// instance entities it names once bound placeholders are replaced by their
/// identities. Each run writes back only if it evaluated without error.
pub fn set(
    graph: &mut InstanceGraph,
    pattern: Option<&mut PatternGraph>,
    script: &Script,
    binding: &Binding,
) -> SetOutcome {
    let mut outcome = SetOutcome::default();

    if let Some(pattern) = pattern {
        let mut namespace = Namespace::for_pattern(pattern);
        match script.evaluate(&mut namespace) {
            Ok(_) => outcome.pattern_written = namespace.write_back_pattern(pattern),
            Err(err) => debug!(error = %err, "SET skipped on the pattern graph"),
        }
    }

    let remapped = script.remap(&binding.aliases());
    let mut namespace = Namespace::for_instance(graph, remapped.referenced_names());
    match remapped.evaluate(&mut namespace) {
        Ok(_) => outcome.instance_written = namespace.write_back_instance(graph),
        Err(err) => debug!(error = %err, "SET skipped on the instance graph"),
    }
    outcome
}
