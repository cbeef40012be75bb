use ordered_float::NotNan;
use serde_json::Value;
use std::fmt::{self, Display};

/// A constant value appearing in a query expression.
///
/// Primitive variants can be bound as positional parameters; `Composite`
/// carries an arbitrary structured value and is only queryable when a column
/// mapping supplies a transform that reduces it to a primitive.
#[derive(Clone, PartialEq)]
pub enum Literal {
    String(String),
    Int(i64),
    Float(NotNan<f64>),
    Bool(bool),
    Null,
    Composite(Value),
}

impl Literal {
    pub fn is_primitive(&self) -> bool {
        !matches!(self, Literal::Composite(_))
    }

    /// Stringified parameter form, `None` for NULL and composite values.
    pub fn to_parameter(&self) -> Option<String> {
        match self {
            Literal::String(s) => Some(s.clone()),
            Literal::Int(i) => Some(i.to_string()),
            Literal::Float(n) => Some(n.into_inner().to_string()),
            Literal::Bool(b) => Some(if *b { "1" } else { "0" }.to_string()),
            Literal::Null | Literal::Composite(_) => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Literal::String(s) => Value::String(s.clone()),
            Literal::Int(i) => Value::Number((*i).into()),
            Literal::Float(n) => serde_json::Number::from_f64(n.into_inner())
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Literal::Bool(b) => Value::Bool(*b),
            Literal::Null => Value::Null,
            Literal::Composite(v) => v.clone(),
        }
    }

    pub fn float(f: f64) -> Option<Literal> {
        NotNan::new(f).ok().map(Literal::Float)
    }
}

impl Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::String(s) => write!(f, "\"{}\"", s),
            Literal::Int(i) => write!(f, "{}", i),
            Literal::Float(n) => write!(f, "{}", n.into_inner()),
            Literal::Bool(b) => write!(f, "{}", b),
            Literal::Null => write!(f, "NULL"),
            Literal::Composite(v) => write!(f, "{}", v),
        }
    }
}

impl fmt::Debug for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::String(_) => write!(f, "String({})", self),
            Literal::Int(_) => write!(f, "Int({})", self),
            Literal::Float(_) => write!(f, "Float({})", self),
            Literal::Bool(_) => write!(f, "Bool({})", self),
            Literal::Null => write!(f, "Null"),
            Literal::Composite(_) => write!(f, "Composite({})", self),
        }
    }
}

impl From<&str> for Literal {
    fn from(s: &str) -> Self {
        Literal::String(s.to_string())
    }
}

impl From<String> for Literal {
    fn from(s: String) -> Self {
        Literal::String(s)
    }
}

impl From<i64> for Literal {
    fn from(i: i64) -> Self {
        Literal::Int(i)
    }
}

impl From<i32> for Literal {
    fn from(i: i32) -> Self {
        Literal::Int(i as i64)
    }
}

impl From<bool> for Literal {
    fn from(b: bool) -> Self {
        Literal::Bool(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parameter_form_for_primitives() {
        assert_eq!(Literal::from("Ann").to_parameter(), Some("Ann".into()));
        assert_eq!(Literal::from(42).to_parameter(), Some("42".into()));
        assert_eq!(Literal::from(true).to_parameter(), Some("1".into()));
        assert_eq!(Literal::from(false).to_parameter(), Some("0".into()));
        assert_eq!(Literal::Null.to_parameter(), None);
    }

    #[test]
    fn composite_is_not_primitive_and_has_no_parameter_form() {
        let l = Literal::Composite(json!({ "number": "555" }));
        assert!(!l.is_primitive());
        assert_eq!(l.to_parameter(), None);
    }
}
