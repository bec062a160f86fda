//! Query text to statements and clauses.
//!
//! ```text
//! # comment lines and blank lines are dropped
//! MATCH {'tag': 'NN'}(a), {}(a,b) WHERE (= (get b "tag") "VB") RETURN a, b;
//! CREATE {}(x), {'type': 'X'}(x,y), {}(y)
//! ```

use crate::{
    errors::GraphDbError,
    expr::{Script, parse_script},
    literal::{parse_graph, parse_name_list},
    pattern::PatternGraph,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Keyword {
    Match,
    Create,
    Delete,
    Set,
    Where,
    Return,
}

impl Keyword {
    const ALL: [Keyword; 6] = [
        Keyword::Match,
        Keyword::Create,
        Keyword::Delete,
        Keyword::Set,
        Keyword::Where,
        Keyword::Return,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Keyword::Match => "MATCH",
            Keyword::Create => "CREATE",
            Keyword::Delete => "DELETE",
            Keyword::Set => "SET",
            Keyword::Where => "WHERE",
            Keyword::Return => "RETURN",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Clause {
    Match(PatternGraph),
    Create(PatternGraph),
    Delete(Vec<String>),
    Set(Script),
    Where(Script),
    /// An empty list asks for the whole serialized graph.
    Return(Vec<String>),
}

impl Clause {
    pub fn keyword(&self) -> Keyword {
        match self {
            Clause::Match(_) => Keyword::Match,
            Clause::Create(_) => Keyword::Create,
            Clause::Delete(_) => Keyword::Delete,
            Clause::Set(_) => Keyword::Set,
            Clause::Where(_) => Keyword::Where,
            Clause::Return(_) => Keyword::Return,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Statement {
    pub text: String,
    pub clauses: Vec<Clause>,
}

impl Statement {
    pub fn has(&self, keyword: Keyword) -> bool {
        self.clauses.iter().any(|c| c.keyword() == keyword)
    }
}

/// Parses every statement of `text`. Nothing is executed, so a malformed
/// statement anywhere rejects the whole query.
pub fn parse_query(text: &str, edge_prefix: &str) -> Result<Vec<Statement>, GraphDbError> {
    split_statements(text)
        .iter()
        .map(|statement| parse_statement(statement, edge_prefix))
        .collect()
}

/// Strips comment and blank lines, then splits on `;` outside quotes.
pub fn split_statements(text: &str) -> Vec<String> {
    let cleaned = text
        .lines()
        .filter(|line| {
            let trimmed = line.trim();
            !trimmed.is_empty() && !trimmed.starts_with('#')
        })
        .collect::<Vec<_>>()
        .join("\n");

    let mut statements = Vec::new();
    let mut start = 0;
    for (index, ch) in unquoted_chars(&cleaned) {
        if ch == ';' {
            statements.push(cleaned[start..index].to_string());
            start = index + 1;
        }
    }
    statements.push(cleaned[start..].to_string());
    statements
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

pub fn parse_statement(text: &str, edge_prefix: &str) -> Result<Statement, GraphDbError> {
    let spans = keyword_spans(text);
    let mut clauses = Vec::new();

    let leading_end = spans.first().map_or(text.len(), |span| span.start);
    let leading = text[..leading_end].trim();
    if !leading.is_empty() {
        clauses.push(Clause::Return(parse_name_list(leading)?));
    }

    let mut seen_match = false;
    for (i, span) in spans.iter().enumerate() {
        let arg_end = spans.get(i + 1).map_or(text.len(), |next| next.start);
        let arg = text[span.end..arg_end].trim();
        let clause = match span.keyword {
            Keyword::Match => {
                seen_match = true;
                Clause::Match(parse_graph(arg, edge_prefix)?)
            }
            Keyword::Create => Clause::Create(parse_graph(arg, edge_prefix)?),
            Keyword::Delete => {
                let names = parse_name_list(arg)?;
                if names.is_empty() {
                    return Err(GraphDbError::malformed("DELETE needs at least one name"));
                }
                Clause::Delete(names)
            }
            Keyword::Set => Clause::Set(parse_script(arg)?),
            Keyword::Where => {
                if !seen_match {
                    return Err(GraphDbError::malformed("WHERE must follow a MATCH clause"));
                }
                Clause::Where(parse_script(arg)?)
            }
            Keyword::Return => Clause::Return(parse_name_list(arg)?),
        };
        clauses.push(clause);
    }

    Ok(Statement {
        text: text.to_string(),
        clauses,
    })
}

#[derive(Debug)]
struct KeywordSpan {
    keyword: Keyword,
    start: usize,
    end: usize,
}

fn keyword_spans(text: &str) -> Vec<KeywordSpan> {
    let mut spans = Vec::new();
    let mut previous: Option<char> = None;
    let positions: Vec<(usize, char)> = text.char_indices().collect();
    let unquoted = quoted_mask(text);
    for (n, &(index, ch)) in positions.iter().enumerate() {
        let boundary_before = !previous.is_some_and(is_word_char);
        previous = Some(ch);
        if !unquoted[n] || !boundary_before || !ch.is_ascii_uppercase() {
            continue;
        }
        let rest = &text[index..];
        let found = Keyword::ALL.into_iter().find(|keyword| {
            rest.starts_with(keyword.as_str())
                && !rest[keyword.as_str().len()..]
                    .chars()
                    .next()
                    .is_some_and(is_word_char)
        });
        if let Some(keyword) = found {
            spans.push(KeywordSpan {
                keyword,
                start: index,
                end: index + keyword.as_str().len(),
            });
        }
    }
    spans
}

fn is_word_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_'
}

/// Characters of `text` that sit outside quoted strings, with byte offsets.
fn unquoted_chars(text: &str) -> impl Iterator<Item = (usize, char)> + '_ {
    let mask = quoted_mask(text);
    text.char_indices()
        .zip(mask)
        .filter_map(|(item, outside)| outside.then_some(item))
}

/// Per character: true when it lies outside any quoted string. Quote
/// characters themselves count as inside.
fn quoted_mask(text: &str) -> Vec<bool> {
    let mut mask = Vec::with_capacity(text.len());
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for ch in text.chars() {
        match quote {
            Some(open) => {
                mask.push(false);
                if escaped {
                    escaped = false;
                } else if ch == '\\' {
                    escaped = true;
                } else if ch == open {
                    quote = None;
                }
            }
            None if ch == '\'' || ch == '"' => {
                mask.push(false);
                quote = Some(ch);
            }
            None => mask.push(true),
        }
    }
    mask
}
