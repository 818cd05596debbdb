// ABOUTME: Runtime error types raised while walking the AST

use thiserror::Error;

/// An error raised during evaluation. Every variant carries the 1-based
/// source line of the node that raised it; a runtime error aborts the
/// current top-level step but leaves earlier print output intact.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RuntimeError {
    #[error("access to undefined variable '{name}' at line {line}")]
    UndefinedVariable { name: String, line: u32 },

    #[error("access to deleted variable '{name}' at line {line}")]
    DeletedVariable { name: String, line: u32 },

    #[error("undefined function '{name}' at line {line}")]
    UndefinedFunction { name: String, line: u32 },

    #[error("undefined record type '{name}' at line {line}")]
    UndefinedRecord { name: String, line: u32 },

    #[error("field '{field}' not found in record '{record}' at line {line}")]
    UnknownField {
        field: String,
        record: String,
        line: u32,
    },

    #[error("method '{method}' not found in record '{record}' at line {line}")]
    UnknownMethod {
        method: String,
        record: String,
        line: u32,
    },

    #[error("variable '{name}' is not a record at line {line}")]
    NotARecord { name: String, line: u32 },

    #[error("type mismatch in '{op}' operation at line {line}")]
    TypeMismatch { op: String, line: u32 },

    #[error("division by zero in '/' at line {line}")]
    DivisionByZero { line: u32 },

    #[error("modulus by zero in '%' at line {line}")]
    ModulusByZero { line: u32 },

    #[error("'{callee}' expects {expected} argument{}, got {given} at line {line}", if *.expected == 1 { "" } else { "s" })]
    ArityMismatch {
        callee: String,
        expected: usize,
        given: usize,
        line: u32,
    },

    #[error("condition must be a boolean at line {line}")]
    NonBoolCondition { line: u32 },

    #[error("input() cannot suspend inside a parallel block at line {line}")]
    InputInParallel { line: u32 },
}

impl RuntimeError {
    /// Create a type mismatch error naming the offending operator.
    pub fn type_mismatch(op: impl Into<String>, line: u32) -> Self {
        RuntimeError::TypeMismatch {
            op: op.into(),
            line,
        }
    }

    /// Create an arity error citing expected vs given argument counts.
    pub fn arity(callee: impl Into<String>, expected: usize, given: usize, line: u32) -> Self {
        RuntimeError::ArityMismatch {
            callee: callee.into(),
            expected,
            given,
            line,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deleted_variable_message() {
        let err = RuntimeError::DeletedVariable {
            name: "x".to_string(),
            line: 3,
        };
        assert!(err.to_string().contains("deleted variable 'x'"));
        assert!(err.to_string().contains("line 3"));
    }

    #[test]
    fn test_zero_division_messages_name_the_operator() {
        assert!(RuntimeError::DivisionByZero { line: 2 }
            .to_string()
            .contains("'/'"));
        assert!(RuntimeError::ModulusByZero { line: 2 }
            .to_string()
            .contains("'%'"));
    }

    #[test]
    fn test_arity_message_pluralizes() {
        let one = RuntimeError::arity("f", 1, 2, 1);
        assert_eq!(one.to_string(), "'f' expects 1 argument, got 2 at line 1");
        let two = RuntimeError::arity("g", 2, 0, 4);
        assert_eq!(two.to_string(), "'g' expects 2 arguments, got 0 at line 4");
    }

    #[test]
    fn test_type_mismatch_names_operator() {
        let err = RuntimeError::type_mismatch("+", 9);
        assert_eq!(err.to_string(), "type mismatch in '+' operation at line 9");
    }
}
