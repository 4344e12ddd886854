//! Variable definitions and override sources.
//!
//! `variable` blocks declare name, type, default, and sensitivity. The
//! effective value comes from the highest-precedence source that has one:
//! CLI assignment, then override files, then `SMITH_VAR_*` environment
//! pairs, then the declared default expression. Defaults may interpolate
//! other variables; supplied override values must be literal.

use indexmap::IndexMap;
use smith_adl_ast::{Span, Value};
use tracing::debug;

use crate::error::Error;
use crate::merge::MergedConfig;
use crate::schema::SchemaType;

/// Environment variable prefix for overrides: `SMITH_VAR_MODEL=...`
/// supplies variable `model`.
pub const ENV_VAR_PREFIX: &str = "SMITH_VAR_";

/// A declared variable.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableDef {
    pub name: String,
    pub declared_type: SchemaType,
    pub description: Option<String>,
    /// Unresolved default expression, if any.
    pub default: Option<Value>,
    pub sensitive: bool,
    pub span: Span,
}

/// Collect every `variable` block into a definition table.
///
/// Malformed declarations (label count, bad `type`) are reported here; the
/// schema validator repeats the structural checks later against the full
/// block, so this pass only extracts what resolution needs.
pub fn collect_variables(merged: &MergedConfig) -> Result<IndexMap<String, VariableDef>, Vec<Error>> {
    let mut defs = IndexMap::new();
    let mut errors = Vec::new();

    for block in merged.of_type("variable") {
        let [name] = block.labels.as_slice() else {
            errors.push(Error::Validation {
                path: block.id(),
                message: "a variable block takes exactly one label, its name".to_string(),
            });
            continue;
        };

        // A missing or invalid `type` is reported by schema validation;
        // fall back to `any` so resolution can still proceed.
        let declared_type = block
            .attribute("type")
            .and_then(|attr| attr.value.as_str())
            .and_then(SchemaType::parse)
            .unwrap_or(SchemaType::Any);

        let def = VariableDef {
            name: name.clone(),
            declared_type,
            description: block
                .attribute("description")
                .and_then(|attr| attr.value.as_str())
                .map(str::to_string),
            default: block.attribute("default").map(|attr| attr.value.clone()),
            sensitive: block
                .attribute("sensitive")
                .and_then(|attr| attr.value.as_bool())
                .unwrap_or(false),
            span: block.span,
        };
        defs.insert(name.clone(), def);
    }

    if errors.is_empty() {
        Ok(defs)
    } else {
        Err(errors)
    }
}

/// Variable values supplied from outside the documents, by source.
#[derive(Debug, Clone, Default)]
pub struct VarOverrides {
    cli: IndexMap<String, Value>,
    file: IndexMap<String, Value>,
    env: IndexMap<String, Value>,
}

impl VarOverrides {
    /// Record a CLI-supplied value (highest precedence).
    pub fn set_cli(&mut self, name: impl Into<String>, value: Value) {
        self.cli.insert(name.into(), value);
    }

    /// Parse and record a `name=value` CLI assignment.
    pub fn add_cli_assignment(&mut self, assignment: &str) -> Result<(), Error> {
        let Some((name, raw)) = assignment.split_once('=') else {
            return Err(Error::Validation {
                path: "--var".to_string(),
                message: format!("invalid assignment '{}', expected name=value", assignment),
            });
        };
        self.set_cli(name.trim(), convert_scalar(raw.trim()));
        Ok(())
    }

    /// Record a value from an override file.
    pub fn set_file(&mut self, name: impl Into<String>, value: Value) {
        self.file.insert(name.into(), value);
    }

    /// Record an environment-supplied value.
    pub fn set_env(&mut self, name: impl Into<String>, value: Value) {
        self.env.insert(name.into(), value);
    }

    /// Scan environment-style pairs for the `SMITH_VAR_` prefix.
    ///
    /// `SMITH_VAR_MODEL_TEMPERATURE=0.5` supplies `model_temperature`.
    pub fn load_env<I>(&mut self, pairs: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, raw) in pairs {
            if let Some(name) = key.strip_prefix(ENV_VAR_PREFIX) {
                let name = name.to_lowercase();
                debug!(variable = %name, "environment override");
                self.set_env(name, convert_scalar(&raw));
            }
        }
    }

    /// The highest-precedence supplied value for a variable, if any.
    pub fn effective(&self, name: &str) -> Option<&Value> {
        self.cli
            .get(name)
            .or_else(|| self.file.get(name))
            .or_else(|| self.env.get(name))
    }
}

/// Convert a raw override string the way the language reads scalars:
/// booleans and numbers when they parse, a string otherwise.
pub fn convert_scalar(raw: &str) -> Value {
    match raw.to_ascii_lowercase().as_str() {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }
    if let Ok(n) = raw.parse::<f64>() {
        return Value::Number(n);
    }
    Value::String(raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_conversion() {
        assert_eq!(convert_scalar("true"), Value::Bool(true));
        assert_eq!(convert_scalar("False"), Value::Bool(false));
        assert_eq!(convert_scalar("0.7"), Value::Number(0.7));
        assert_eq!(convert_scalar("1000"), Value::Number(1000.0));
        assert_eq!(convert_scalar("ollama"), Value::String("ollama".into()));
    }

    #[test]
    fn precedence_cli_over_file_over_env() {
        let mut overrides = VarOverrides::default();
        overrides.set_env("x", Value::String("env".into()));
        assert_eq!(overrides.effective("x").unwrap().as_str(), Some("env"));

        overrides.set_file("x", Value::String("file".into()));
        assert_eq!(overrides.effective("x").unwrap().as_str(), Some("file"));

        overrides.set_cli("x", Value::String("cli".into()));
        assert_eq!(overrides.effective("x").unwrap().as_str(), Some("cli"));
    }

    #[test]
    fn env_prefix_filtering_and_lowercasing() {
        let mut overrides = VarOverrides::default();
        overrides.load_env(vec![
            ("SMITH_VAR_MODEL_TEMPERATURE".to_string(), "0.5".to_string()),
            ("PATH".to_string(), "/usr/bin".to_string()),
        ]);
        assert_eq!(
            overrides.effective("model_temperature"),
            Some(&Value::Number(0.5))
        );
        assert!(overrides.effective("path").is_none());
    }

    #[test]
    fn cli_assignment_parsing() {
        let mut overrides = VarOverrides::default();
        overrides.add_cli_assignment("temperature=0.9").unwrap();
        assert_eq!(overrides.effective("temperature"), Some(&Value::Number(0.9)));

        assert!(overrides.add_cli_assignment("no_equals_sign").is_err());
    }
}
