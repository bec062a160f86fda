use crate::{attributes::AttributeValue, errors::GraphDbError};

use super::{Expr, Script};

#[derive(Clone, Debug, PartialEq)]
enum Token {
    Open,
    Close,
    OpenList,
    CloseList,
    Str(String),
    Atom(String),
}

/// Parses one clause argument into a script. Only the bracket structure and
/// string syntax are checked here; operator names and arities are checked
/// when the script runs.
pub fn parse_script(text: &str) -> Result<Script, GraphDbError> {
    let tokens = tokenize(text)?;
    if tokens.is_empty() {
        return Err(GraphDbError::malformed("empty expression"));
    }
    let mut pos = 0;
    let mut exprs = Vec::new();
    while pos < tokens.len() {
        exprs.push(parse_expr(&tokens, &mut pos, text)?);
    }
    Ok(Script::from_exprs(exprs))
}

fn tokenize(text: &str) -> Result<Vec<Token>, GraphDbError> {
    let mut tokens = Vec::new();
    let mut chars = text.chars().peekable();
    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' => {
                chars.next();
                tokens.push(Token::Open);
            }
            ')' => {
                chars.next();
                tokens.push(Token::Close);
            }
            '[' => {
                chars.next();
                tokens.push(Token::OpenList);
            }
            ']' => {
                chars.next();
                tokens.push(Token::CloseList);
            }
            '"' | '\'' => {
                let quote = c;
                chars.next();
                let mut value = String::new();
                let mut closed = false;
                while let Some(ch) = chars.next() {
                    match ch {
                        '\\' => match chars.next() {
                            Some('n') => value.push('\n'),
                            Some('t') => value.push('\t'),
                            Some(other) => value.push(other),
                            None => break,
                        },
                        ch if ch == quote => {
                            closed = true;
                            break;
                        }
                        ch => value.push(ch),
                    }
                }
                if !closed {
                    return Err(GraphDbError::malformed(format!(
                        "unterminated string in expression `{}`",
                        text.trim()
                    )));
                }
                tokens.push(Token::Str(value));
            }
            _ => {
                let mut atom = String::new();
                while let Some(&ch) = chars.peek() {
                    if ch.is_whitespace() || matches!(ch, '(' | ')' | '[' | ']' | '"' | '\'') {
                        break;
                    }
                    atom.push(ch);
                    chars.next();
                }
                tokens.push(Token::Atom(atom));
            }
        }
    }
    Ok(tokens)
}

fn parse_expr(tokens: &[Token], pos: &mut usize, text: &str) -> Result<Expr, GraphDbError> {
    let unbalanced = || GraphDbError::malformed(format!("unbalanced expression `{}`", text.trim()));
    let token = tokens.get(*pos).ok_or_else(unbalanced)?;
    *pos += 1;
    match token {
        Token::Str(s) => Ok(Expr::Literal(AttributeValue::String(s.clone()))),
        Token::Atom(atom) => Ok(atom_expr(atom)),
        Token::OpenList => {
            let mut items = Vec::new();
            loop {
                match tokens.get(*pos) {
                    Some(Token::CloseList) => {
                        *pos += 1;
                        return Ok(Expr::List(items));
                    }
                    Some(_) => items.push(parse_expr(tokens, pos, text)?),
                    None => return Err(unbalanced()),
                }
            }
        }
        Token::Open => {
            let op = match tokens.get(*pos) {
                Some(Token::Atom(op)) => op.clone(),
                _ => {
                    return Err(GraphDbError::malformed(format!(
                        "expected an operator after `(` in `{}`",
                        text.trim()
                    )));
                }
            };
            *pos += 1;
            let mut args = Vec::new();
            // Entity references stay names even when they look like numbers (`1`).
            if matches!(op.as_str(), "get" | "assoc") {
                if let Some(Token::Atom(name)) = tokens.get(*pos) {
                    args.push(Expr::Symbol(name.clone()));
                    *pos += 1;
                }
            }
            loop {
                match tokens.get(*pos) {
                    Some(Token::Close) => {
                        *pos += 1;
                        return Ok(Expr::Call { op, args });
                    }
                    Some(_) => args.push(parse_expr(tokens, pos, text)?),
                    None => return Err(unbalanced()),
                }
            }
        }
        Token::Close | Token::CloseList => Err(unbalanced()),
    }
}

fn atom_expr(atom: &str) -> Expr {
    match atom {
        "true" | "True" => return Expr::Literal(AttributeValue::Bool(true)),
        "false" | "False" => return Expr::Literal(AttributeValue::Bool(false)),
        "nil" | "None" | "null" => return Expr::Literal(AttributeValue::Null),
        _ => {}
    }
    let numeric_start = atom
        .trim_start_matches(['-', '+'])
        .starts_with(|c: char| c.is_ascii_digit() || c == '.');
    if numeric_start {
        if let Ok(n) = atom.parse::<f64>() {
            return Expr::Literal(AttributeValue::Number(n));
        }
    }
    Expr::Symbol(atom.to_string())
}
