//! Schema validation.
//!
//! Walks each resolved block against its schema node, depth first:
//! unknown and missing attributes, declared types, validation rules
//! (range, pattern, options), and nested block cardinality. All violations
//! are accumulated so one pass reports every problem.

use indexmap::IndexMap;
use regex::Regex;
use smith_adl_ast::{Block, SourceMap, Value};

use crate::error::{Error, Location};
use crate::schema::{
    AttributeSchema, BlockSchema, NestedBlockSchema, NestingMode, SchemaRegistry, ValidationRule,
};

/// Validate every block against the registry, returning all violations.
pub fn validate(
    blocks: &IndexMap<String, Block>,
    registry: &SchemaRegistry,
    sources: &SourceMap,
) -> Vec<Error> {
    let mut errors = Vec::new();

    for (id, block) in blocks {
        let Some(label_names) = registry.label_names(&block.block_type) else {
            // Unknown types were rejected at merge; a miss here means the
            // registry changed under us, which merge prevents.
            continue;
        };
        if block.labels.len() != label_names.len() {
            errors.push(Error::Validation {
                path: id.clone(),
                message: format!(
                    "expected {} label(s) ({}), found {}",
                    label_names.len(),
                    label_names.join(", "),
                    block.labels.len()
                ),
            });
            continue;
        }

        let Some(schema) = registry.lookup(&block.block_type, &block.labels) else {
            errors.push(Error::UnknownBlockType {
                block_type: id.clone(),
                location: Location::from_span(sources, &block.span),
            });
            continue;
        };

        validate_block(block, schema, id, &mut errors);
    }

    errors
}

/// Validate one block body against its schema, recursing into nested
/// blocks.
fn validate_block(block: &Block, schema: &BlockSchema, path: &str, errors: &mut Vec<Error>) {
    // Unknown attributes first, then required/typed checks.
    for attr in &block.attributes {
        if !schema.attributes.contains_key(&attr.name)
            && !schema.block_types.contains_key(&attr.name)
        {
            errors.push(Error::Validation {
                path: path.to_string(),
                message: format!("unknown attribute '{}'", attr.name),
            });
        }
    }

    for (name, attr_schema) in &schema.attributes {
        match block.attribute(name) {
            None => {
                if attr_schema.required {
                    errors.push(Error::Validation {
                        path: path.to_string(),
                        message: format!("missing required attribute '{}'", name),
                    });
                }
            }
            Some(attr) => {
                validate_value(&attr.value, attr_schema, &format!("{}.{}", path, name), errors);
            }
        }
    }

    for nested in &block.nested {
        if !schema.block_types.contains_key(&nested.block_type) {
            errors.push(Error::Validation {
                path: path.to_string(),
                message: format!("unknown nested block '{}'", nested.block_type),
            });
        }
    }

    for (name, nested_schema) in &schema.block_types {
        let group: Vec<&Block> = block.nested_of_type(name).collect();
        validate_cardinality(&group, nested_schema, name, path, errors);
        for (idx, child) in group.iter().enumerate() {
            let child_path = match nested_schema.nesting_mode {
                NestingMode::Single => format!("{}.{}", path, name),
                NestingMode::List => format!("{}.{}[{}]", path, name, idx),
            };
            validate_block(child, &nested_schema.block, &child_path, errors);
        }
    }
}

/// Check how often a nested block type appears.
fn validate_cardinality(
    group: &[&Block],
    schema: &NestedBlockSchema,
    name: &str,
    path: &str,
    errors: &mut Vec<Error>,
) {
    let count = group.len();
    let min = schema.min_items.unwrap_or(0);

    match schema.nesting_mode {
        NestingMode::Single => {
            if count > 1 {
                errors.push(Error::Validation {
                    path: path.to_string(),
                    message: format!("multiple '{}' blocks are not allowed", name),
                });
            }
            if count == 0 && min >= 1 {
                errors.push(Error::Validation {
                    path: path.to_string(),
                    message: format!("missing required block '{}'", name),
                });
            }
        }
        NestingMode::List => {
            if count < min {
                errors.push(Error::Validation {
                    path: path.to_string(),
                    message: format!("at least {} '{}' block(s) required, found {}", min, name, count),
                });
            }
            if let Some(max) = schema.max_items {
                if count > max {
                    errors.push(Error::Validation {
                        path: path.to_string(),
                        message: format!("at most {} '{}' block(s) allowed, found {}", max, name, count),
                    });
                }
            }
        }
    }
}

/// Type-check a resolved value and run its validation rules.
fn validate_value(value: &Value, schema: &AttributeSchema, path: &str, errors: &mut Vec<Error>) {
    if !schema.value_type.accepts(value) {
        errors.push(Error::TypeMismatch {
            path: path.to_string(),
            expected: schema.value_type.name().to_string(),
            actual: value.type_name().to_string(),
        });
        return;
    }

    if let Some(element) = &schema.element {
        match value {
            Value::List(items) => {
                for (idx, item) in items.iter().enumerate() {
                    validate_value(item, element, &format!("{}[{}]", path, idx), errors);
                }
            }
            Value::Map(entries) => {
                for (key, entry) in entries {
                    validate_value(entry, element, &format!("{}.{}", path, key), errors);
                }
            }
            _ => {}
        }
    }

    for rule in &schema.validation {
        apply_rule(value, rule, path, errors);
    }
}

/// Apply one range/pattern/options rule.
fn apply_rule(value: &Value, rule: &ValidationRule, path: &str, errors: &mut Vec<Error>) {
    if let Some(range) = &rule.range {
        if let Some(n) = value.as_number() {
            let below = range.min.is_some_and(|min| n < min);
            let above = range.max.is_some_and(|max| n > max);
            if below || above {
                errors.push(Error::Validation {
                    path: path.to_string(),
                    message: rule.error_message.clone().unwrap_or_else(|| {
                        range_message(range.min, range.max, n)
                    }),
                });
            }
        }
    }

    if let Some(pattern) = &rule.pattern {
        if let Some(s) = value.as_str() {
            match Regex::new(pattern) {
                Ok(re) => {
                    if !re.is_match(s) {
                        errors.push(Error::Validation {
                            path: path.to_string(),
                            message: rule.error_message.clone().unwrap_or_else(|| {
                                format!("value '{}' does not match pattern '{}'", s, pattern)
                            }),
                        });
                    }
                }
                Err(e) => {
                    errors.push(Error::Validation {
                        path: path.to_string(),
                        message: format!("schema pattern '{}' is invalid: {}", pattern, e),
                    });
                }
            }
        }
    }

    if let Some(options) = &rule.options {
        let allowed: Vec<Value> = options.iter().map(Value::from_json).collect();
        if !allowed.contains(value) {
            errors.push(Error::Validation {
                path: path.to_string(),
                message: rule.error_message.clone().unwrap_or_else(|| {
                    let names: Vec<String> = allowed.iter().map(Value::to_string).collect();
                    format!("value must be one of: {}", names.join(", "))
                }),
            });
        }
    }
}

fn range_message(min: Option<f64>, max: Option<f64>, actual: f64) -> String {
    match (min, max) {
        (Some(min), Some(max)) => format!("value {} is not between {} and {}", actual, min, max),
        (Some(min), None) => format!("value {} is below the minimum {}", actual, min),
        (None, Some(max)) => format!("value {} is above the maximum {}", actual, max),
        (None, None) => format!("value {} violates an empty range rule", actual),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::merge_documents;
    use smith_adl_parser::parse_document;

    fn check(source: &str) -> Vec<Error> {
        let registry = SchemaRegistry::agent_defaults();
        let mut sources = SourceMap::new();
        let file_id = sources.add_file("test.adl", source.to_string());
        let doc = parse_document(source, file_id).expect("test source should parse");
        let merged = merge_documents(&[doc], &registry, &sources).expect("merge should succeed");
        validate(&merged.blocks, &registry, &sources)
    }

    #[test]
    fn valid_model_passes() {
        let errors = check(
            "model \"m\" {\n  provider = \"ollama\"\n  name = \"llama2\"\n  settings {\n    temperature = 0.7\n  }\n}\n",
        );
        assert!(errors.is_empty(), "unexpected errors: {:?}", errors);
    }

    #[test]
    fn range_rule_rejects_out_of_bounds() {
        let errors = check(
            "model \"m\" {\n  provider = \"ollama\"\n  name = \"llama2\"\n  settings {\n    temperature = 1.5\n  }\n}\n",
        );
        assert!(errors.iter().any(|e| matches!(
            e,
            Error::Validation { path, message }
                if path == "model.m.settings.temperature"
                    && message == "Temperature must be between 0 and 1"
        )));
    }

    #[test]
    fn missing_required_attribute() {
        let errors = check("model \"m\" {\n  name = \"llama2\"\n}\n");
        assert!(errors.iter().any(|e| matches!(
            e,
            Error::Validation { message, .. } if message.contains("provider")
        )));
    }

    #[test]
    fn unknown_attribute_rejected() {
        let errors = check(
            "model \"m\" {\n  provider = \"p\"\n  name = \"n\"\n  nonexistent = 1\n}\n",
        );
        assert!(errors.iter().any(|e| matches!(
            e,
            Error::Validation { message, .. } if message.contains("nonexistent")
        )));
    }

    #[test]
    fn wrong_type_is_a_type_mismatch() {
        let errors = check(
            "model \"m\" {\n  provider = \"p\"\n  name = \"n\"\n  settings {\n    temperature = \"hot\"\n  }\n}\n",
        );
        assert!(errors.iter().any(|e| matches!(
            e,
            Error::TypeMismatch { path, expected, actual }
                if path == "model.m.settings.temperature"
                    && expected == "number"
                    && actual == "string"
        )));
    }

    #[test]
    fn multiple_single_blocks_rejected() {
        let errors = check(
            "model \"m\" {\n  provider = \"p\"\n  name = \"n\"\n  settings {\n  }\n  settings {\n  }\n}\n",
        );
        assert!(errors.iter().any(|e| matches!(
            e,
            Error::Validation { message, .. } if message.contains("multiple 'settings' blocks")
        )));
    }

    #[test]
    fn remote_plugin_requires_version() {
        let errors = check(
            "plugin \"remote\" \"echo\" {\n  source = \"https://example.com/echo\"\n}\n",
        );
        assert!(errors.iter().any(|e| matches!(
            e,
            Error::Validation { path, message }
                if path == "plugin.remote.echo" && message.contains("version")
        )));
    }

    #[test]
    fn local_plugin_does_not_require_version() {
        let errors = check(
            "plugin \"local\" \"echo\" {\n  source = \"./plugins/echo\"\n}\n",
        );
        assert!(errors.is_empty(), "unexpected errors: {:?}", errors);
    }

    #[test]
    fn local_plugin_source_pattern() {
        let errors = check(
            "plugin \"local\" \"echo\" {\n  source = \"plugins/echo\"\n}\n",
        );
        assert!(errors.iter().any(|e| matches!(
            e,
            Error::Validation { message, .. } if message.contains("filesystem path")
        )));
    }

    #[test]
    fn variable_type_options() {
        let errors = check("variable \"v\" {\n  type = \"struct\"\n}\n");
        assert!(errors.iter().any(|e| matches!(
            e,
            Error::Validation { message, .. } if message.contains("type must be one of")
        )));
    }

    #[test]
    fn label_count_enforced() {
        let errors = check("model \"a\" \"b\" {\n  provider = \"p\"\n  name = \"n\"\n}\n");
        assert!(errors.iter().any(|e| matches!(
            e,
            Error::Validation { path, message } if path == "model.a.b" && message.contains("label")
        )));
    }
}
