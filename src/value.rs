// ABOUTME: Runtime value types produced by the evaluator

use crate::ast::Node;
use crate::env::Cell;
use indexmap::IndexMap;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A runtime value. The set of kinds is closed; the evaluator dispatches
/// with exhaustive pattern matching.
#[derive(Debug, Clone)]
pub enum Value {
    Number(f64),
    Str(String),
    Bool(bool),
    Null,
    Array(Vec<Value>),
    /// A record instance: the defining type's name plus its fields in
    /// declaration order.
    Record {
        name: String,
        fields: IndexMap<String, Value>,
    },
    /// An anonymous callable carrying its parameter list, body, and the
    /// variable snapshot taken at construction.
    Lambda {
        params: Vec<String>,
        body: Arc<Node>,
        captured: HashMap<String, Cell>,
    },
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Null, Value::Null) => true,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Record { name: a, fields: x }, Value::Record { name: b, fields: y }) => {
                a == b && x == y
            }
            // Lambdas compare by identity of their body.
            (Value::Lambda { body: a, .. }, Value::Lambda { body: b, .. }) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => {
                // Integral values keep a single trailing .0 to match float
                // formatting; everything else prints naturally.
                if n.fract() == 0.0 && n.is_finite() {
                    write!(f, "{:.1}", n)
                } else {
                    write!(f, "{}", n)
                }
            }
            Value::Str(s) => write!(f, "{}", s),
            Value::Bool(b) => write!(f, "{}", if *b { "true" } else { "false" }),
            Value::Null => write!(f, "null"),
            Value::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Record { name, fields } => {
                write!(f, "{}(", name)?;
                for (i, (field, value)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", field, value)?;
                }
                write!(f, ")")
            }
            Value::Lambda { params, .. } => write!(f, "<lambda({})>", params.join(", ")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::NodeKind;

    #[test]
    fn test_integral_numbers_keep_trailing_zero() {
        assert_eq!(format!("{}", Value::Number(11.0)), "11.0");
        assert_eq!(format!("{}", Value::Number(0.0)), "0.0");
        assert_eq!(format!("{}", Value::Number(-3.0)), "-3.0");
    }

    #[test]
    fn test_fractional_numbers_print_naturally() {
        assert_eq!(format!("{}", Value::Number(2.5)), "2.5");
        assert_eq!(format!("{}", Value::Number(-0.25)), "-0.25");
    }

    #[test]
    fn test_string_displays_verbatim() {
        let s = Value::Str("Hello, Alice".to_string());
        assert_eq!(format!("{}", s), "Hello, Alice");
    }

    #[test]
    fn test_bool_null_display() {
        assert_eq!(format!("{}", Value::Bool(true)), "true");
        assert_eq!(format!("{}", Value::Null), "null");
    }

    #[test]
    fn test_array_display() {
        let array = Value::Array(vec![
            Value::Number(1.0),
            Value::Number(2.5),
            Value::Str("x".to_string()),
        ]);
        assert_eq!(format!("{}", array), "[1.0, 2.5, x]");
    }

    #[test]
    fn test_record_display_preserves_field_order() {
        let mut fields = IndexMap::new();
        fields.insert("x".to_string(), Value::Number(3.0));
        fields.insert("y".to_string(), Value::Number(4.0));
        let record = Value::Record {
            name: "Point".to_string(),
            fields,
        };
        assert_eq!(format!("{}", record), "Point(x: 3.0, y: 4.0)");
    }

    #[test]
    fn test_record_equality_is_structural() {
        let mut fields = IndexMap::new();
        fields.insert("x".to_string(), Value::Number(1.0));
        let a = Value::Record {
            name: "P".to_string(),
            fields: fields.clone(),
        };
        let b = Value::Record {
            name: "P".to_string(),
            fields: fields.clone(),
        };
        let c = Value::Record {
            name: "Q".to_string(),
            fields,
        };
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_array_equality_is_pairwise() {
        let a = Value::Array(vec![Value::Number(1.0), Value::Number(2.0)]);
        let b = Value::Array(vec![Value::Number(1.0), Value::Number(2.0)]);
        let c = Value::Array(vec![Value::Number(1.0)]);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_cross_kind_equality_is_false() {
        assert_ne!(Value::Number(0.0), Value::Bool(false));
        assert_ne!(Value::Null, Value::Str("null".to_string()));
    }

    #[test]
    fn test_lambda_display() {
        let lambda = Value::Lambda {
            params: vec!["a".to_string(), "b".to_string()],
            body: Arc::new(Node::new(NodeKind::Null, 1)),
            captured: HashMap::new(),
        };
        assert_eq!(format!("{}", lambda), "<lambda(a, b)>");
    }
}
