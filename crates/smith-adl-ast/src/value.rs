//! The value union of the configuration language.
//!
//! A `Value` is either a concrete scalar/collection or an unresolved
//! expression (template or conditional). The resolver's output invariant is
//! that no unresolved variant survives into a resolved configuration; see
//! [`Value::is_resolved`].

use std::fmt;

use indexmap::IndexMap;

use crate::template::{Conditional, Template};

/// Tagged union over every value the language can express.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Number(f64),
    Bool(bool),
    List(Vec<Value>),
    Map(IndexMap<String, Value>),
    /// String with `${...}` spans, or a bare dotted reference. Unresolved.
    Template(Template),
    /// `cond ? then : else` expression. Unresolved.
    Conditional(Box<Conditional>),
}

impl Value {
    /// Human-readable name of this value's type, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::String(_) => "string",
            Value::Number(_) => "number",
            Value::Bool(_) => "bool",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Template(_) | Value::Conditional(_) => "expression",
        }
    }

    /// Get the string content, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get the numeric content, if this is a number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Get the boolean content, if this is a bool.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get the elements, if this is a list.
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Get the entries, if this is a map.
    pub fn as_map(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Value::Map(entries) => Some(entries),
            _ => None,
        }
    }

    /// True when no unresolved expression remains anywhere in this value.
    pub fn is_resolved(&self) -> bool {
        match self {
            Value::String(_) | Value::Number(_) | Value::Bool(_) => true,
            Value::List(items) => items.iter().all(Value::is_resolved),
            Value::Map(entries) => entries.values().all(Value::is_resolved),
            Value::Template(_) | Value::Conditional(_) => false,
        }
    }

    /// Convert a resolved value into plain JSON.
    ///
    /// Unresolved expressions serialize as their surface syntax; they are
    /// never expected here outside of debug output.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Number(n) => {
                if n.fract() == 0.0 && n.is_finite() && *n >= i64::MIN as f64 && *n <= i64::MAX as f64 {
                    serde_json::Value::from(*n as i64)
                } else {
                    serde_json::Number::from_f64(*n)
                        .map(serde_json::Value::Number)
                        .unwrap_or(serde_json::Value::Null)
                }
            }
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::List(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Map(entries) => serde_json::Value::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            Value::Template(tpl) => serde_json::Value::String(tpl.to_string()),
            Value::Conditional(_) => serde_json::Value::String(self.to_string()),
        }
    }

    /// Convert plain JSON into a value. Null becomes an empty string, the
    /// closest ADL equivalent.
    pub fn from_json(json: &serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::String(String::new()),
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(0.0)),
            serde_json::Value::String(s) => Value::String(s.clone()),
            serde_json::Value::Array(items) => {
                Value::List(items.iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(entries) => Value::Map(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::from_json(v)))
                    .collect(),
            ),
        }
    }
}

/// Display is the stringification used when a value is spliced into a
/// larger template: numbers drop a trailing `.0`, collections render as
/// JSON.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{}", s),
            Value::Number(n) => {
                if n.fract() == 0.0 && n.is_finite() {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", n)
                }
            }
            Value::Bool(b) => write!(f, "{}", b),
            Value::List(_) | Value::Map(_) => write!(f, "{}", self.to_json()),
            Value::Template(tpl) => write!(f, "{}", tpl),
            Value::Conditional(cond) => {
                write!(f, "{} ? {} : {}", cond.cond.lhs, cond.when_true, cond.when_false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_formats_integral_numbers_without_decimal() {
        assert_eq!(Value::Number(1000.0).to_string(), "1000");
        assert_eq!(Value::Number(0.7).to_string(), "0.7");
    }

    #[test]
    fn json_round_trip_preserves_structure() {
        let mut map = IndexMap::new();
        map.insert("temperature".to_string(), Value::Number(0.7));
        map.insert("max_tokens".to_string(), Value::Number(1000.0));
        let value = Value::Map(map);

        let json = value.to_json();
        assert_eq!(json["temperature"], serde_json::json!(0.7));
        assert_eq!(json["max_tokens"], serde_json::json!(1000));
        assert_eq!(Value::from_json(&json), value);
    }

    #[test]
    fn resolved_check_descends_collections() {
        use crate::span::Span;
        use crate::template::{Template, TemplatePart};
        let tpl = Value::Template(Template::new(
            vec![TemplatePart::Literal("x".into())],
            Span::zero(0),
        ));
        assert!(!Value::List(vec![Value::Bool(true), tpl]).is_resolved());
        assert!(Value::List(vec![Value::Bool(true)]).is_resolved());
    }
}
