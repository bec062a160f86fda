//! Query driver: runs parsed statements against the instance graph.

use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::Serialize;
use tracing::debug;

use crate::{
    attributes::AttributeMap,
    config::DatabaseConfig,
    dsl::{Clause, Keyword, Statement, parse_query},
    errors::GraphDbError,
    expr::Script,
    graph::InstanceGraph,
    matcher::Matcher,
    mutation,
    pattern::{Binding, PatternGraph},
};

/// One row of a query result.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResultRow {
    /// Requested placeholder to attribute map, in RETURN order.
    Bindings(IndexMap<String, AttributeMap>),
    /// RETURN without names: the serialized whole graph.
    Graph {
        #[serde(rename = "GRAPH")]
        graph: String,
    },
}

impl ResultRow {
    pub fn empty() -> Self {
        ResultRow::Bindings(IndexMap::new())
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            ResultRow::Bindings(map) => !map.is_empty(),
            ResultRow::Graph { .. } => true,
        }
    }

    pub fn get(&self, placeholder: &str) -> Option<&AttributeMap> {
        match self {
            ResultRow::Bindings(map) => map.get(placeholder),
            ResultRow::Graph { .. } => None,
        }
    }

    pub fn graph(&self) -> Option<&str> {
        match self {
            ResultRow::Graph { graph } => Some(graph),
            ResultRow::Bindings(_) => None,
        }
    }
}

/// In-memory graph database. A query holds the write lock from its first
/// statement to its last, so queries never interleave.
#[derive(Debug, Default)]
pub struct GraphDatabase {
    graph: RwLock<InstanceGraph>,
    config: DatabaseConfig,
}

impl GraphDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: DatabaseConfig) -> Self {
        Self::from_graph(InstanceGraph::new(), config)
    }

    pub fn from_graph(graph: InstanceGraph, config: DatabaseConfig) -> Self {
        Self {
            graph: RwLock::new(graph),
            config,
        }
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    /// Snapshot of the current instance graph.
    pub fn get_graph(&self) -> InstanceGraph {
        self.graph.read().clone()
    }

    pub fn graph_literal(&self) -> String {
        self.graph.read().to_literal()
    }

    pub fn query(&self, text: &str) -> Result<Vec<ResultRow>, GraphDbError> {
        self.query_with_repeat(text, None)
    }

    /// Runs every statement of `text` in order and returns the rows of the
    /// last statement whose first row is truthy. `repeat_override` fixes the number of
    /// iterations per statement.
    pub fn query_with_repeat(
        &self,
        text: &str,
        repeat_override: Option<usize>,
    ) -> Result<Vec<ResultRow>, GraphDbError> {
        let statements = parse_query(text, &self.config.generated_name_prefix)?;
        let mut graph = self.graph.write();
        let mut result = Vec::new();
        for (position, statement) in statements.iter().enumerate() {
            let repeat = self.repeat_for(statement, &graph, repeat_override);
            debug!(statement = position, repeat, text = %statement.text, "running statement");
            let rows = self.run_statement(&mut graph, statement, repeat)?;
            debug!(statement = position, rows = rows.len(), "statement finished");
            if rows.first().is_some_and(ResultRow::is_truthy) {
                result = rows;
            }
        }
        Ok(result)
    }

    fn repeat_for(
        &self,
        statement: &Statement,
        graph: &InstanceGraph,
        requested: Option<usize>,
    ) -> usize {
        requested.or(self.config.default_repeat).unwrap_or_else(|| {
            if statement.has(Keyword::Create) || !statement.has(Keyword::Match) {
                1
            } else {
                graph.vertex_count()
            }
        })
    }

    fn run_statement(
        &self,
        graph: &mut InstanceGraph,
        statement: &Statement,
        repeat: usize,
    ) -> Result<Vec<ResultRow>, GraphDbError> {
        let mut rows = Vec::new();
        for index in 0..repeat {
            match self.run_iteration(graph, statement, index) {
                Ok(row) => {
                    let truthy = row.is_truthy();
                    rows.push(row);
                    if !truthy {
                        break;
                    }
                }
                Err(err) if err.is_no_match() => {
                    debug!(index, "no match, ending statement");
                    break;
                }
                Err(err) => return Err(err),
            }
        }
        Ok(rows)
    }

    fn run_iteration(
        &self,
        graph: &mut InstanceGraph,
        statement: &Statement,
        index: usize,
    ) -> Result<ResultRow, GraphDbError> {
        let mut context = MatchContext::new(index);
        for clause in &statement.clauses {
            match clause {
                Clause::Match(pattern) => context.begin_match(graph, pattern.clone())?,
                Clause::Where(script) => context.add_predicate(script),
                Clause::Create(pattern) => {
                    let binding = context.binding(graph)?;
                    mutation::create(graph, pattern, &binding, &self.config)?;
                }
                Clause::Delete(names) => {
                    let binding = context.binding(graph)?;
                    mutation::delete(graph, names, &binding)?;
                }
                Clause::Set(script) => {
                    let binding = context.binding(graph)?;
                    mutation::set(graph, context.pattern.as_mut(), script, &binding);
                }
                Clause::Return(names) if names.is_empty() => {
                    return Ok(ResultRow::Graph {
                        graph: graph.to_literal(),
                    });
                }
                Clause::Return(names) => {
                    let binding = context.binding(graph)?;
                    return Ok(project(graph, names, &binding));
                }
            }
        }
        Ok(ResultRow::empty())
    }
}

/// Clause state for one statement iteration.
struct MatchContext {
    index: usize,
    pattern: Option<PatternGraph>,
    predicate: Script,
    /// Bindings of earlier MATCH clauses in this iteration.
    carried: Binding,
    resolved: Option<Binding>,
}

impl MatchContext {
    fn new(index: usize) -> Self {
        Self {
            index,
            pattern: None,
            predicate: Script::new(),
            carried: Binding::new(),
            resolved: None,
        }
    }

    /// Resolves the previous MATCH, if any, into the carried binding before
    /// switching to `pattern`. A previous pattern without embeddings is `NoMatch`.
    fn begin_match(
        &mut self,
        graph: &InstanceGraph,
        pattern: PatternGraph,
    ) -> Result<(), GraphDbError> {
        if self.pattern.is_some() {
            self.carried = self.binding(graph)?;
            self.resolved = None;
        }
        self.pattern = Some(pattern);
        self.predicate = Script::new();
        Ok(())
    }

    fn add_predicate(&mut self, script: &Script) {
        self.predicate.extend(script);
        self.resolved = None;
    }

    /// Carried bindings overlaid with the current match, which is resolved
    /// on first use and cached.
    fn binding(&mut self, graph: &InstanceGraph) -> Result<Binding, GraphDbError> {
        let current = match &self.resolved {
            Some(binding) => binding.clone(),
            None => {
                let binding = match &self.pattern {
                    Some(pattern) => {
                        Matcher::with_predicate(graph, pattern, &self.predicate, &self.carried)
                            .match_at(self.index)?
                    }
                    None => Binding::new(),
                };
                self.resolved = Some(binding.clone());
                binding
            }
        };
        let mut effective = self.carried.clone();
        effective.absorb(&current);
        Ok(effective)
    }
}

/// Vertices are returned with their `name`, edges without it. Names that
/// resolve to nothing are left out.
fn project(graph: &InstanceGraph, names: &[String], binding: &Binding) -> ResultRow {
    let mut row = IndexMap::new();
    for name in names {
        let vertex = binding
            .vertex(name)
            .and_then(|identity| graph.vertex(identity));
        let edge = binding.edge(name).and_then(|identity| graph.edge(identity));
        let attributes = match (vertex, edge) {
            (Some(vertex), _) => Some(vertex.attributes_with_name()),
            (None, Some(edge)) => Some(edge.attributes.clone()),
            (None, None) => graph
                .vertex(name)
                .map(|v| v.attributes_with_name())
                .or_else(|| graph.edge(name).map(|e| e.attributes.clone())),
        };
        match attributes {
            Some(attributes) => {
                row.insert(name.clone(), attributes);
            }
            None => debug!(placeholder = %name, "RETURN name resolves to nothing"),
        }
    }
    ResultRow::Bindings(row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::AttributeValue;

    #[test]
    fn test_repeat_policy() {
        let db = GraphDatabase::from_graph(
            InstanceGraph::from_literal("{}(a), {}(b), {}(c)").unwrap(),
            DatabaseConfig::default(),
        );
        let graph = db.get_graph();
        let statements = parse_query(
            "MATCH {}(x) RETURN x; MATCH {}(x) CREATE {}(x), {}(x,y); RETURN",
            "edge",
        )
        .unwrap();
        assert_eq!(db.repeat_for(&statements[0], &graph, None), 3);
        assert_eq!(db.repeat_for(&statements[1], &graph, None), 1);
        assert_eq!(db.repeat_for(&statements[2], &graph, None), 1);
        assert_eq!(db.repeat_for(&statements[0], &graph, Some(7)), 7);
    }

    #[test]
    fn test_result_row_json_shape() {
        let mut map = IndexMap::new();
        let mut attrs = AttributeMap::new();
        attrs.insert("tag".into(), AttributeValue::from("NN"));
        map.insert("a".to_string(), attrs);
        let rows = vec![
            ResultRow::Bindings(map),
            ResultRow::Graph {
                graph: "{}(a)".into(),
            },
        ];
        assert_eq!(
            serde_json::to_string(&rows).unwrap(),
            r#"[{"a":{"tag":"NN"}},{"GRAPH":"{}(a)"}]"#
        );
    }

    #[test]
    fn test_unresolved_match_still_constrains_the_next_one() {
        let db = GraphDatabase::from_graph(
            InstanceGraph::from_literal("{'k': 'p'}(v1), {'k': 'q'}(v2)").unwrap(),
            DatabaseConfig::default(),
        );
        let rows = db
            .query("MATCH {'k': 'zzz'}(a) MATCH {'k': 'q'}(b) RETURN a, b")
            .unwrap();
        assert!(rows.is_empty());

        let rows = db
            .query("MATCH {'k': 'p'}(a) MATCH {'k': 'q'}(b) RETURN a, b")
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("a").unwrap().get("name"), Some(&"v1".into()));
        assert_eq!(rows[0].get("b").unwrap().get("name"), Some(&"v2".into()));
    }

    #[test]
    fn test_second_match_carries_first_binding() {
        let db = GraphDatabase::from_graph(
            InstanceGraph::from_literal("{'k': 'p'}(v1), {'k': 'q'}(v2)").unwrap(),
            DatabaseConfig::default(),
        );
        let rows = db
            .query_with_repeat(
                "MATCH {'k': 'p'}(a) SET (assoc a \"seen\" 1) MATCH {'k': 'q'}(b) RETURN a, b",
                Some(1),
            )
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("a").unwrap().get("name"), Some(&"v1".into()));
        assert_eq!(rows[0].get("b").unwrap().get("name"), Some(&"v2".into()));
    }
}
