use thiserror::Error;

use crate::expr::EvalError;

#[derive(Debug, Error)]
pub enum GraphDbError {
    #[error("no match: pattern could not be embedded in the graph")]
    NoMatch,
    /// Conversion target for callers that run a `Script` themselves. Queries
    /// never return it: WHERE and SET absorb evaluation errors.
    #[error("evaluation error: {0}")]
    Evaluation(#[from] EvalError),
    #[error("identity collision: {0}")]
    IdentityCollision(String),
    #[error("malformed query: {0}")]
    MalformedQuery(String),
    #[error("dangling edge: {0}")]
    DanglingEdge(String),
    #[error("config error: {0}")]
    Config(String),
    #[error("io error: {0}")]
    Io(String),
}

impl GraphDbError {
    pub fn identity_collision<T: Into<String>>(msg: T) -> Self {
        GraphDbError::IdentityCollision(msg.into())
    }

    pub fn malformed<T: Into<String>>(msg: T) -> Self {
        GraphDbError::MalformedQuery(msg.into())
    }

    pub fn dangling_edge<T: Into<String>>(msg: T) -> Self {
        GraphDbError::DanglingEdge(msg.into())
    }

    pub fn config<T: Into<String>>(msg: T) -> Self {
        GraphDbError::Config(msg.into())
    }

    pub fn io<T: Into<String>>(msg: T) -> Self {
        GraphDbError::Io(msg.into())
    }

    /// True for the errors that end a statement's iterations without failing the query.
    pub fn is_no_match(&self) -> bool {
        matches!(self, GraphDbError::NoMatch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{Namespace, parse_script};

    fn run(text: &str) -> Result<(), GraphDbError> {
        let script = parse_script(text)?;
        script.evaluate(&mut Namespace::new())?;
        Ok(())
    }

    #[test]
    fn test_eval_errors_convert_with_question_mark() {
        let err = run(r#"(get ghost "k")"#).unwrap_err();
        assert!(matches!(
            err,
            GraphDbError::Evaluation(EvalError::UnboundName { ref name }) if name == "ghost"
        ));
        assert!(!err.is_no_match());
        assert!(matches!(run("(get"), Err(GraphDbError::MalformedQuery(_))));
    }
}
