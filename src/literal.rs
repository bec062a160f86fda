//! Literal graph grammar: `{'key': value, ...}(name)` for a vertex and
//! `{...}(source,target)` for a directed edge, comma separated.

use ahash::AHashSet;
use rand::Rng;

use crate::{
    attributes::{AttributeMap, AttributeValue, NAME_KEY},
    errors::GraphDbError,
    pattern::{PatternEdge, PatternGraph},
};

pub const DEFAULT_EDGE_PREFIX: &str = "edge";

pub fn parse_graph(text: &str, edge_prefix: &str) -> Result<PatternGraph, GraphDbError> {
    let mut scanner = Scanner::new(text);
    let mut graph = PatternGraph::new();
    let mut edges = Vec::new();
    let mut edge_names = AHashSet::new();

    scanner.skip_ws();
    if scanner.at_end() {
        return Err(GraphDbError::malformed("empty graph literal"));
    }
    loop {
        let mut attributes = scanner.attribute_map()?;
        let names = scanner.name_list()?;
        match names.as_slice() {
            [vertex] => graph.add_vertex(vertex.clone(), attributes),
            [source, target] => {
                let explicit = match attributes.remove(NAME_KEY) {
                    Some(AttributeValue::String(name)) if !name.is_empty() => Some(name),
                    Some(other) => {
                        return Err(GraphDbError::malformed(format!(
                            "edge name must be a non-empty string, got {other}"
                        )));
                    }
                    None => None,
                };
                let edge = PatternEdge {
                    name: explicit.clone().unwrap_or_default(),
                    source: source.clone(),
                    target: target.clone(),
                    attributes,
                    anonymous: explicit.is_none(),
                };
                if let Some(name) = explicit {
                    if !edge_names.insert(name.clone()) {
                        return Err(GraphDbError::malformed(format!(
                            "edge placeholder {name} used twice"
                        )));
                    }
                }
                edges.push(edge);
            }
            _ => {
                return Err(GraphDbError::malformed(format!(
                    "term names must be (vertex) or (source,target), got ({})",
                    names.join(",")
                )));
            }
        }
        scanner.skip_ws();
        if scanner.at_end() {
            break;
        }
        scanner.expect(',')?;
    }

    // Generated names are drawn once every explicit name is known.
    let mut rng = rand::thread_rng();
    for mut edge in edges {
        while edge.anonymous && edge.name.is_empty() {
            let candidate = format!("{edge_prefix}{}", rng.gen_range(0..u32::MAX));
            if edge_names.insert(candidate.clone()) {
                edge.name = candidate;
            }
        }
        graph.add_edge(edge);
    }
    graph.declare_implicit_endpoints();
    Ok(graph)
}

/// Splits a comma separated placeholder list (`a, b, _edge`). Empty input is an empty list.
pub fn parse_name_list(text: &str) -> Result<Vec<String>, GraphDbError> {
    let mut names = Vec::new();
    for raw in text.split(',') {
        let name = raw.trim();
        if name.is_empty() {
            continue;
        }
        if !name.chars().all(is_name_char) {
            return Err(GraphDbError::malformed(format!(
                "expected a placeholder name, got `{name}`"
            )));
        }
        names.push(name.to_string());
    }
    Ok(names)
}

fn is_name_char(ch: char) -> bool {
    ch.is_alphanumeric() || matches!(ch, '_' | '-' | '.' | ':')
}

struct Scanner<'a> {
    chars: Vec<char>,
    pos: usize,
    source: &'a str,
}

impl<'a> Scanner<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            source,
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn error(&self, what: &str) -> GraphDbError {
        GraphDbError::malformed(format!(
            "{what} at offset {} in graph literal `{}`",
            self.pos,
            self.source.trim()
        ))
    }

    fn expect(&mut self, ch: char) -> Result<(), GraphDbError> {
        self.skip_ws();
        if self.peek() == Some(ch) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(&format!("expected `{ch}`")))
        }
    }

    fn eat(&mut self, ch: char) -> bool {
        self.skip_ws();
        if self.peek() == Some(ch) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn attribute_map(&mut self) -> Result<AttributeMap, GraphDbError> {
        self.expect('{')?;
        let mut map = AttributeMap::new();
        if self.eat('}') {
            return Ok(map);
        }
        loop {
            self.skip_ws();
            let key = match self.peek() {
                Some(quote @ ('\'' | '"')) => self.string(quote)?,
                _ => return Err(self.error("expected a quoted key")),
            };
            self.expect(':')?;
            let value = self.value()?;
            map.insert(key, value);
            if self.eat(',') {
                if self.eat('}') {
                    break;
                }
                continue;
            }
            self.expect('}')?;
            break;
        }
        Ok(map)
    }

    fn name_list(&mut self) -> Result<Vec<String>, GraphDbError> {
        self.expect('(')?;
        let start = self.pos;
        while self.peek().is_some_and(|c| c != ')') {
            self.pos += 1;
        }
        if self.at_end() {
            return Err(self.error("unterminated name list"));
        }
        let inner: String = self.chars[start..self.pos].iter().collect();
        self.pos += 1;
        let names = parse_name_list(&inner)?;
        if names.is_empty() {
            return Err(self.error("empty name list"));
        }
        Ok(names)
    }

    fn value(&mut self) -> Result<AttributeValue, GraphDbError> {
        self.skip_ws();
        match self.peek() {
            Some(quote @ ('\'' | '"')) => Ok(AttributeValue::String(self.string(quote)?)),
            Some(c) if c == '-' || c == '+' || c.is_ascii_digit() || c == '.' => self.number(),
            Some(c) if c.is_alphabetic() => {
                let start = self.pos;
                while self.peek().is_some_and(char::is_alphanumeric) {
                    self.pos += 1;
                }
                let word: String = self.chars[start..self.pos].iter().collect();
                match word.as_str() {
                    "True" | "true" => Ok(AttributeValue::Bool(true)),
                    "False" | "false" => Ok(AttributeValue::Bool(false)),
                    "None" | "null" => Ok(AttributeValue::Null),
                    other => Err(self.error(&format!("unknown literal `{other}`"))),
                }
            }
            _ => Err(self.error("expected a value")),
        }
    }

    fn number(&mut self) -> Result<AttributeValue, GraphDbError> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | 'e' | 'E'))
        {
            self.pos += 1;
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        text.parse::<f64>()
            .map(AttributeValue::Number)
            .map_err(|_| self.error(&format!("invalid number `{text}`")))
    }

    fn string(&mut self, quote: char) -> Result<String, GraphDbError> {
        self.pos += 1;
        let mut out = String::new();
        while let Some(c) = self.peek() {
            self.pos += 1;
            match c {
                '\\' => {
                    let escaped = self.peek().ok_or_else(|| self.error("dangling escape"))?;
                    self.pos += 1;
                    out.push(match escaped {
                        'n' => '\n',
                        't' => '\t',
                        other => other,
                    });
                }
                c if c == quote => return Ok(out),
                c => out.push(c),
            }
        }
        Err(self.error("unterminated string"))
    }
}
