//! Expression resolution.
//!
//! Evaluates templates and conditionals into concrete values by resolving
//! every reference they contain. Resolution is memoized recursion: each
//! reference is computed at most once per pass, and an in-progress stack
//! turns re-entry into a `CircularDependency` error carrying the full
//! cycle. Declaration order across documents is irrelevant; the reference
//! graph alone determines evaluation order.
//!
//! Reference forms:
//!
//! - `var.<name>` — a variable's effective value
//! - `model.<id>` / `plugin.<kind>.<id>` / `agent.<id>` — the canonical
//!   reference string for a whole block (bound to a definition later, by
//!   the reference resolver)
//! - `model.<id>.<attr...>` and friends — an attribute value, traversing
//!   nested blocks, map keys, and list indices
//! - `runtime.<attr>` — a runtime setting

use std::collections::HashMap;

use indexmap::IndexMap;
use smith_adl_ast::{Block, CmpOp, Conditional, Operand, Path, Template, TemplatePart, Value};
use tracing::trace;

use crate::error::Error;
use crate::vars::{VarOverrides, VariableDef};

/// Resolves expressions against the merged block set and variable table.
///
/// One evaluator lives for one resolution pass; its memo table and
/// in-progress stack are never shared across passes.
pub struct Evaluator<'a> {
    blocks: &'a IndexMap<String, Block>,
    variables: &'a IndexMap<String, VariableDef>,
    overrides: &'a VarOverrides,
    memo: HashMap<String, Value>,
    stack: Vec<String>,
}

impl<'a> Evaluator<'a> {
    pub fn new(
        blocks: &'a IndexMap<String, Block>,
        variables: &'a IndexMap<String, VariableDef>,
        overrides: &'a VarOverrides,
    ) -> Self {
        Self {
            blocks,
            variables,
            overrides,
            memo: HashMap::new(),
            stack: Vec::new(),
        }
    }

    /// Resolve a raw value into a concrete one. `ctx` is the dotted path
    /// of the attribute being resolved, used in error reports.
    pub fn resolve_value(&mut self, value: &Value, ctx: &str) -> Result<Value, Error> {
        match value {
            Value::String(_) | Value::Number(_) | Value::Bool(_) => Ok(value.clone()),
            Value::List(items) => {
                let resolved = items
                    .iter()
                    .map(|item| self.resolve_value(item, ctx))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::List(resolved))
            }
            Value::Map(entries) => {
                let mut resolved = IndexMap::with_capacity(entries.len());
                for (key, entry) in entries {
                    resolved.insert(key.clone(), self.resolve_value(entry, ctx)?);
                }
                Ok(Value::Map(resolved))
            }
            Value::Template(tpl) => self.resolve_template(tpl, ctx),
            Value::Conditional(cond) => self.resolve_conditional(cond, ctx),
        }
    }

    /// Produce a copy of a block with every attribute resolved, nested
    /// blocks included.
    pub fn resolve_block(&mut self, block: &'a Block, path: &str) -> Result<Block, Error> {
        let mut attributes = Vec::with_capacity(block.attributes.len());
        for attr in &block.attributes {
            let attr_path = format!("{}.{}", path, attr.name);
            attributes.push(smith_adl_ast::Attribute {
                name: attr.name.clone(),
                value: self.resolve_value(&attr.value, &attr_path)?,
                span: attr.span,
            });
        }

        let mut nested = Vec::with_capacity(block.nested.len());
        for child in &block.nested {
            let child_path = format!("{}.{}", path, child.block_type);
            nested.push(self.resolve_block(child, &child_path)?);
        }

        Ok(Block {
            block_type: block.block_type.clone(),
            labels: block.labels.clone(),
            attributes,
            nested,
            span: block.span,
        })
    }

    /// Resolve a reference, memoized, with cycle detection.
    pub fn resolve_ref(&mut self, path: &Path, ctx: &str) -> Result<Value, Error> {
        let key = path.to_string();
        if let Some(cached) = self.memo.get(&key) {
            return Ok(cached.clone());
        }
        if let Some(pos) = self.stack.iter().position(|entry| entry == &key) {
            let mut cycle = self.stack[pos..].to_vec();
            cycle.push(key);
            return Err(Error::CircularDependency { cycle });
        }

        trace!(reference = %key, "resolving");
        self.stack.push(key.clone());
        let result = self.eval_ref(path, ctx);
        self.stack.pop();

        let value = result?;
        self.memo.insert(key, value.clone());
        Ok(value)
    }

    fn resolve_template(&mut self, tpl: &Template, ctx: &str) -> Result<Value, Error> {
        // A whole-reference template keeps the referenced value's type.
        if let Some(path) = tpl.as_single_ref() {
            return self.resolve_ref(path, ctx);
        }

        let mut text = String::new();
        for part in &tpl.parts {
            match part {
                TemplatePart::Literal(lit) => text.push_str(lit),
                TemplatePart::Ref(path) => {
                    let value = self.resolve_ref(path, ctx)?;
                    text.push_str(&value.to_string());
                }
            }
        }
        Ok(Value::String(text))
    }

    fn resolve_conditional(&mut self, cond: &Conditional, ctx: &str) -> Result<Value, Error> {
        let lhs = self.operand_value(&cond.cond.lhs, ctx)?;
        let truth = match &cond.cond.cmp {
            None => lhs.as_bool().ok_or_else(|| Error::TypeMismatch {
                path: ctx.to_string(),
                expected: "bool".to_string(),
                actual: lhs.type_name().to_string(),
            })?,
            Some((op, rhs_operand)) => {
                let rhs = self.operand_value(rhs_operand, ctx)?;
                compare(&lhs, *op, &rhs, ctx)?
            }
        };
        let branch = if truth {
            &cond.when_true
        } else {
            &cond.when_false
        };
        self.resolve_template(branch, ctx)
    }

    fn operand_value(&mut self, operand: &Operand, ctx: &str) -> Result<Value, Error> {
        match operand {
            Operand::Ref(path) => self.resolve_ref(path, ctx),
            Operand::Str(s) => Ok(Value::String(s.clone())),
            Operand::Num(n) => Ok(Value::Number(*n)),
            Operand::Bool(b) => Ok(Value::Bool(*b)),
        }
    }

    /// Dispatch a reference to its namespace.
    fn eval_ref(&mut self, path: &Path, ctx: &str) -> Result<Value, Error> {
        match path.first() {
            Some("var") => match path.segments() {
                [_, name] => self.resolve_variable(name),
                _ => Err(invalid_reference(path, ctx)),
            },
            Some("model") | Some("agent") => self.block_ref(path, 2, ctx),
            Some("plugin") => self.block_ref(path, 3, ctx),
            Some("runtime") => {
                if path.len() < 2 {
                    return Err(invalid_reference(path, ctx));
                }
                let Some(block) = self.blocks.get("runtime") else {
                    return Err(Error::UnresolvedReference {
                        reference: path.to_string(),
                        path: ctx.to_string(),
                    });
                };
                self.navigate_block(block, "runtime", &path.segments()[1..], path, ctx)
            }
            _ => Err(Error::UnresolvedReference {
                reference: path.to_string(),
                path: ctx.to_string(),
            }),
        }
    }

    /// Resolve a reference into a top-level block namespace whose id takes
    /// `id_segments` path segments (`model.m1` = 2, `plugin.local.echo` = 3).
    fn block_ref(&mut self, path: &Path, id_segments: usize, ctx: &str) -> Result<Value, Error> {
        if path.len() < id_segments {
            return Err(invalid_reference(path, ctx));
        }
        let id = path.segments()[..id_segments].join(".");
        let Some(block) = self.blocks.get(&id) else {
            return Err(Error::UnresolvedReference {
                reference: id,
                path: ctx.to_string(),
            });
        };

        if path.len() == id_segments {
            // Whole-block reference: the canonical reference string. The
            // reference resolver binds it to the actual definition.
            return Ok(Value::String(id));
        }
        self.navigate_block(block, &id, &path.segments()[id_segments..], path, ctx)
    }

    /// Walk the remaining reference segments through a block's attributes
    /// and nested blocks.
    fn navigate_block(
        &mut self,
        block: &'a Block,
        block_path: &str,
        segments: &[String],
        full: &Path,
        ctx: &str,
    ) -> Result<Value, Error> {
        let Some(segment) = segments.first() else {
            return self.block_as_map(block, block_path);
        };

        if let Some(attr) = block.attribute(segment) {
            let attr_path = format!("{}.{}", block_path, segment);
            let value = self.resolve_value(&attr.value, &attr_path)?;
            return navigate_value(value, &segments[1..], full, ctx);
        }

        if let Some(child) = block.nested_of_type(segment).next() {
            let child_path = format!("{}.{}", block_path, segment);
            return self.navigate_block(child, &child_path, &segments[1..], full, ctx);
        }

        Err(Error::UnresolvedReference {
            reference: full.to_string(),
            path: ctx.to_string(),
        })
    }

    /// A reference to a nested block with no further segments resolves to
    /// its attributes as a map.
    fn block_as_map(&mut self, block: &'a Block, block_path: &str) -> Result<Value, Error> {
        let mut entries = IndexMap::with_capacity(block.attributes.len());
        for attr in &block.attributes {
            let attr_path = format!("{}.{}", block_path, attr.name);
            entries.insert(attr.name.clone(), self.resolve_value(&attr.value, &attr_path)?);
        }
        Ok(Value::Map(entries))
    }

    /// Resolve a variable's effective value: supplied override first, then
    /// the declared default expression.
    fn resolve_variable(&mut self, name: &str) -> Result<Value, Error> {
        let Some(def) = self.variables.get(name) else {
            return Err(Error::MissingVariable {
                name: name.to_string(),
            });
        };

        if let Some(supplied) = self.overrides.effective(name) {
            check_variable_type(def, supplied)?;
            return Ok(supplied.clone());
        }

        if let Some(default) = &def.default {
            let value = self.resolve_value(default, &format!("var.{}", name))?;
            check_variable_type(def, &value)?;
            return Ok(value);
        }

        Err(Error::MissingVariable {
            name: name.to_string(),
        })
    }
}

/// Check a value against a variable's declared type.
fn check_variable_type(def: &VariableDef, value: &Value) -> Result<(), Error> {
    if def.declared_type.accepts(value) {
        Ok(())
    } else {
        Err(Error::TypeMismatch {
            path: format!("var.{}", def.name),
            expected: def.declared_type.name().to_string(),
            actual: value.type_name().to_string(),
        })
    }
}

/// Descend into a resolved value by map keys and list indices.
fn navigate_value(
    value: Value,
    segments: &[String],
    full: &Path,
    ctx: &str,
) -> Result<Value, Error> {
    let mut current = value;
    for segment in segments {
        let next = match &current {
            Value::Map(entries) => entries.get(segment.as_str()).cloned(),
            Value::List(items) => segment
                .parse::<usize>()
                .ok()
                .and_then(|idx| items.get(idx).cloned()),
            _ => None,
        };
        current = next.ok_or_else(|| Error::UnresolvedReference {
            reference: full.to_string(),
            path: ctx.to_string(),
        })?;
    }
    Ok(current)
}

/// Evaluate a comparison between two resolved values.
fn compare(lhs: &Value, op: CmpOp, rhs: &Value, ctx: &str) -> Result<bool, Error> {
    match op {
        CmpOp::Eq => Ok(lhs == rhs),
        CmpOp::Ne => Ok(lhs != rhs),
        CmpOp::Lt | CmpOp::Le | CmpOp::Gt | CmpOp::Ge => {
            let (Some(l), Some(r)) = (lhs.as_number(), rhs.as_number()) else {
                let offender = if lhs.as_number().is_none() { lhs } else { rhs };
                return Err(Error::TypeMismatch {
                    path: ctx.to_string(),
                    expected: "number".to_string(),
                    actual: offender.type_name().to_string(),
                });
            };
            Ok(match op {
                CmpOp::Lt => l < r,
                CmpOp::Le => l <= r,
                CmpOp::Gt => l > r,
                CmpOp::Ge => l >= r,
                CmpOp::Eq | CmpOp::Ne => unreachable!("handled above"),
            })
        }
    }
}

fn invalid_reference(path: &Path, ctx: &str) -> Error {
    Error::Validation {
        path: ctx.to_string(),
        message: format!("invalid reference format '${{{}}}'", path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaRegistry;
    use crate::vars::collect_variables;
    use crate::merge::merge_documents;
    use smith_adl_ast::SourceMap;
    use smith_adl_parser::parse_document;

    fn setup(source: &str) -> (IndexMap<String, Block>, IndexMap<String, VariableDef>) {
        let registry = SchemaRegistry::agent_defaults();
        let mut sources = SourceMap::new();
        let file_id = sources.add_file("test.adl", source.to_string());
        let doc = parse_document(source, file_id).expect("test source should parse");
        let merged = merge_documents(&[doc], &registry, &sources).expect("merge should succeed");
        let vars = collect_variables(&merged).expect("variable collection should succeed");
        (merged.blocks, vars)
    }

    #[test]
    fn nested_variable_interpolation() {
        let (blocks, vars) = setup(
            r#"
variable "base" {
  type    = string
  default = "X"
}
variable "nested" {
  type    = string
  default = "${var.base}-Y"
}
"#,
        );
        let overrides = VarOverrides::default();
        let mut eval = Evaluator::new(&blocks, &vars, &overrides);
        let value = eval.resolve_ref(&Path::parse("var.nested"), "test").unwrap();
        assert_eq!(value, Value::String("X-Y".into()));
    }

    #[test]
    fn cycle_names_both_variables() {
        let (blocks, vars) = setup(
            r#"
variable "a" {
  type    = string
  default = "${var.b}"
}
variable "b" {
  type    = string
  default = "${var.a}"
}
"#,
        );
        let overrides = VarOverrides::default();
        let mut eval = Evaluator::new(&blocks, &vars, &overrides);
        let err = eval.resolve_ref(&Path::parse("var.a"), "test").unwrap_err();
        let Error::CircularDependency { cycle } = err else {
            panic!("expected circular dependency, got {:?}", err);
        };
        assert!(cycle.contains(&"var.a".to_string()));
        assert!(cycle.contains(&"var.b".to_string()));
        assert_eq!(cycle.first(), cycle.last());
    }

    #[test]
    fn whole_block_reference_is_canonical_string() {
        let (blocks, vars) = setup("model \"m1\" {\n  provider = \"ollama\"\n  name = \"llama2\"\n}\n");
        let overrides = VarOverrides::default();
        let mut eval = Evaluator::new(&blocks, &vars, &overrides);
        let value = eval.resolve_ref(&Path::parse("model.m1"), "test").unwrap();
        assert_eq!(value, Value::String("model.m1".into()));
    }

    #[test]
    fn attribute_path_reference() {
        let (blocks, vars) = setup(
            "model \"m1\" {\n  provider = \"ollama\"\n  name = \"llama2\"\n  settings {\n    temperature = 0.7\n  }\n}\n",
        );
        let overrides = VarOverrides::default();
        let mut eval = Evaluator::new(&blocks, &vars, &overrides);
        assert_eq!(
            eval.resolve_ref(&Path::parse("model.m1.name"), "test").unwrap(),
            Value::String("llama2".into())
        );
        assert_eq!(
            eval.resolve_ref(&Path::parse("model.m1.settings.temperature"), "test")
                .unwrap(),
            Value::Number(0.7)
        );
    }

    #[test]
    fn unknown_block_reference_errors() {
        let (blocks, vars) = setup("model \"m1\" {\n  provider = \"p\"\n  name = \"n\"\n}\n");
        let overrides = VarOverrides::default();
        let mut eval = Evaluator::new(&blocks, &vars, &overrides);
        let err = eval.resolve_ref(&Path::parse("model.missing"), "test").unwrap_err();
        assert!(matches!(
            err,
            Error::UnresolvedReference { reference, .. } if reference == "model.missing"
        ));
    }

    #[test]
    fn undeclared_variable_is_missing() {
        let (blocks, vars) = setup("model \"m1\" {\n  provider = \"p\"\n  name = \"n\"\n}\n");
        let overrides = VarOverrides::default();
        let mut eval = Evaluator::new(&blocks, &vars, &overrides);
        let err = eval.resolve_ref(&Path::parse("var.ghost"), "test").unwrap_err();
        assert!(matches!(err, Error::MissingVariable { name } if name == "ghost"));
    }

    #[test]
    fn override_type_mismatch() {
        let (blocks, vars) = setup(
            "variable \"temp\" {\n  type = number\n  default = 0.7\n}\n",
        );
        let mut overrides = VarOverrides::default();
        overrides.set_cli("temp", Value::String("hot".into()));
        let mut eval = Evaluator::new(&blocks, &vars, &overrides);
        let err = eval.resolve_ref(&Path::parse("var.temp"), "test").unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { .. }));
    }

    #[test]
    fn conditional_branches_on_comparison() {
        let (blocks, vars) = setup(
            r#"
variable "temp" {
  type    = number
  default = 0.9
}
agent "a" {
  name          = "a"
  system_prompt = "p"
  model         = "model.m"
  description   = "var.temp > 0.5 ? hot : cold"
}
"#,
        );
        let overrides = VarOverrides::default();
        let mut eval = Evaluator::new(&blocks, &vars, &overrides);
        let agent = blocks.get("agent.a").unwrap();
        let desc = agent.attribute("description").unwrap();
        let value = eval
            .resolve_value(&desc.value, "agent.a.description")
            .unwrap();
        assert_eq!(value, Value::String("hot".into()));
    }

    #[test]
    fn memoization_returns_identical_values() {
        let (blocks, vars) = setup(
            "variable \"x\" {\n  type = string\n  default = \"v\"\n}\n",
        );
        let overrides = VarOverrides::default();
        let mut eval = Evaluator::new(&blocks, &vars, &overrides);
        let first = eval.resolve_ref(&Path::parse("var.x"), "test").unwrap();
        let second = eval.resolve_ref(&Path::parse("var.x"), "test").unwrap();
        assert_eq!(first, second);
    }
}
