//! In-memory property graph with a small pattern query language.
//!
//! ```text
//! CREATE {'tag': 'NNP'}(1), {'w': 'WRITES'}(1,2), {'tag': 'NN'}(2);
//! MATCH {'tag': 'NNP'}(a), {'w': 'WRITES'}(a,b) RETURN a, b
//! ```
//!
//! Run Criterion benchmarks with `cargo bench` to inspect reports under `target/criterion`.

pub mod attributes;
pub mod client;
pub mod config;
pub mod dsl;
pub mod errors;
pub mod expr;
pub mod graph;
pub mod literal;
pub mod matcher;
pub mod mutation;
pub mod pattern;
pub mod query;

pub use crate::attributes::{AttributeMap, AttributeValue};
pub use crate::config::DatabaseConfig;
pub use crate::errors::GraphDbError;
pub use crate::expr::{EvalError, Script};
pub use crate::graph::{Edge, InstanceGraph, Vertex};
pub use crate::matcher::Matcher;
pub use crate::pattern::{Binding, PatternGraph};
pub use crate::query::{GraphDatabase, ResultRow};
