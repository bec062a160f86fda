use std::io::Read;

use crate::{
    config::DatabaseConfig,
    errors::GraphDbError,
    graph::InstanceGraph,
    query::{GraphDatabase, ResultRow},
};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommandLineConfig {
    pub graph: Option<String>,
    pub config: Option<String>,
    pub repeat: Option<usize>,
    pub print_graph: bool,
    /// Query file; `None` or `-` reads standard input.
    pub query: Option<String>,
}

impl CommandLineConfig {
    pub fn from_args(args: &[&str]) -> Result<Self, String> {
        let mut parsed = Self::default();
        let mut iter = args.iter().skip(1);
        while let Some(arg) = iter.next() {
            match *arg {
                "--graph" => {
                    parsed.graph = Some(
                        iter.next()
                            .ok_or_else(|| "--graph requires a value".to_string())?
                            .to_string(),
                    );
                }
                "--config" => {
                    parsed.config = Some(
                        iter.next()
                            .ok_or_else(|| "--config requires a value".to_string())?
                            .to_string(),
                    );
                }
                "--repeat" => {
                    let value = iter
                        .next()
                        .ok_or_else(|| "--repeat requires a value".to_string())?;
                    parsed.repeat = Some(
                        value
                            .parse::<usize>()
                            .map_err(|_| format!("--repeat expects a count, got {value}"))?,
                    );
                }
                "--print-graph" => parsed.print_graph = true,
                "-" => parsed.query = Some("-".to_string()),
                other if other.starts_with('-') => {
                    return Err(format!("unknown flag {other}"));
                }
                other => {
                    if parsed.query.is_some() {
                        return Err(format!("unexpected argument {other}"));
                    }
                    parsed.query = Some(other.to_string());
                }
            }
        }
        Ok(parsed)
    }

    pub fn help() -> &'static str {
        "Usage: parvograph [--graph FILE] [--config FILE] [--repeat N] [--print-graph] [QUERY_FILE|-]\n"
    }

    pub fn reads_stdin(&self) -> bool {
        self.query.as_deref().is_none_or(|q| q == "-")
    }
}

/// Builds the database described by the command line: configuration first,
/// then the initial graph in literal form.
pub fn open_database(config: &CommandLineConfig) -> Result<GraphDatabase, GraphDbError> {
    let db_config = match &config.config {
        Some(path) => DatabaseConfig::from_path(path)?,
        None => DatabaseConfig::default(),
    };
    let graph = match &config.graph {
        Some(path) => InstanceGraph::from_literal(&read_file(path)?)?,
        None => InstanceGraph::new(),
    };
    Ok(GraphDatabase::from_graph(graph, db_config))
}

pub fn read_query(config: &CommandLineConfig) -> Result<String, GraphDbError> {
    if config.reads_stdin() {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .map_err(|e| GraphDbError::io(format!("stdin: {e}")))?;
        return Ok(text);
    }
    match &config.query {
        Some(path) => read_file(path),
        None => Ok(String::new()),
    }
}

pub fn render_rows(rows: &[ResultRow]) -> Result<String, GraphDbError> {
    serde_json::to_string_pretty(rows).map_err(|e| GraphDbError::io(e.to_string()))
}

fn read_file(path: &str) -> Result<String, GraphDbError> {
    std::fs::read_to_string(path).map_err(|e| GraphDbError::io(format!("{path}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_flags_and_query_path() {
        let config = CommandLineConfig::from_args(&[
            "parvograph",
            "--graph",
            "g.txt",
            "--repeat",
            "2",
            "--print-graph",
            "q.txt",
        ])
        .unwrap();
        assert_eq!(config.graph.as_deref(), Some("g.txt"));
        assert_eq!(config.repeat, Some(2));
        assert!(config.print_graph);
        assert_eq!(config.query.as_deref(), Some("q.txt"));
        assert!(!config.reads_stdin());
    }

    #[test]
    fn test_rejects_bad_arguments() {
        assert!(CommandLineConfig::from_args(&["parvograph", "--repeat", "many"]).is_err());
        assert!(CommandLineConfig::from_args(&["parvograph", "--graph"]).is_err());
        assert!(CommandLineConfig::from_args(&["parvograph", "--bogus"]).is_err());
        assert!(CommandLineConfig::from_args(&["parvograph", "a.txt", "b.txt"]).is_err());
    }

    #[test]
    fn test_defaults_to_stdin() {
        let config = CommandLineConfig::from_args(&["parvograph"]).unwrap();
        assert!(config.reads_stdin());
        let dash = CommandLineConfig::from_args(&["parvograph", "-"]).unwrap();
        assert!(dash.reads_stdin());
    }
}
