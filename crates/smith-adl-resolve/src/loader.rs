//! The resolution pipeline.
//!
//! A `Loader` owns one pass: sources go in, a [`ResolvedConfig`] comes
//! out. The pass is single-threaded, performs no I/O (callers supply file
//! contents), and shares no state with other passes — repeated calls with
//! the same inputs produce structurally identical output.
//!
//! ```text
//! parse → merge → resolve variables → resolve blocks → validate → bind
//! ```
//!
//! The first unrecoverable error aborts the pass; parse, merge,
//! validation, and missing-variable errors are accumulated so one run
//! reports as much as it can.

use indexmap::IndexMap;
use smith_adl_ast::{Document, Path, SourceMap, Value};
use smith_adl_parser::{parse_document, parse_var_file};
use tracing::debug;

use crate::config::{build, ResolvedConfig};
use crate::error::Error;
use crate::eval::Evaluator;
use crate::merge::merge_documents;
use crate::schema::SchemaRegistry;
use crate::validate::validate;
use crate::vars::{collect_variables, VarOverrides};

/// Drives one configuration resolution pass.
pub struct Loader {
    registry: SchemaRegistry,
    sources: SourceMap,
    documents: Vec<Document>,
    overrides: VarOverrides,
}

impl Loader {
    /// Create a loader with an externally supplied schema registry.
    pub fn new(registry: SchemaRegistry) -> Self {
        Self {
            registry,
            sources: SourceMap::new(),
            documents: Vec::new(),
            overrides: VarOverrides::default(),
        }
    }

    /// Create a loader with the built-in agent-domain registry.
    pub fn with_agent_defaults() -> Self {
        Self::new(SchemaRegistry::agent_defaults())
    }

    /// Add one document's text. `name` is used in error locations.
    pub fn add_source(
        &mut self,
        name: impl Into<String>,
        text: impl Into<String>,
    ) -> Result<(), Vec<Error>> {
        let text = text.into();
        let file_id = self.sources.add_file(name, text.clone());
        match parse_document(&text, file_id) {
            Ok(document) => {
                self.documents.push(document);
                Ok(())
            }
            Err(parse_errors) => Err(parse_errors
                .iter()
                .map(|e| Error::from_parse(&self.sources, e))
                .collect()),
        }
    }

    /// Add a variable override file (`*.vars.adl`).
    ///
    /// Accepts top-level `name = value` assignments and
    /// `variable "name" { default = ... }` blocks. Values must be
    /// literal: an override is data, not an expression.
    pub fn add_var_file(
        &mut self,
        name: impl Into<String>,
        text: impl Into<String>,
    ) -> Result<(), Vec<Error>> {
        let text = text.into();
        let file_id = self.sources.add_file(name, text.clone());
        let file = parse_var_file(&text, file_id)
            .map_err(|e| vec![Error::from_parse(&self.sources, &e)])?;

        let mut errors = Vec::new();

        for block in &file.blocks {
            if block.block_type != "variable" || block.labels.len() != 1 {
                errors.push(Error::Validation {
                    path: block.id(),
                    message: "override files allow only assignments and variable blocks"
                        .to_string(),
                });
                continue;
            }
            if let Some(attr) = block.attribute("default") {
                match self.literal_override(&attr.value, &block.id()) {
                    Ok(value) => self.overrides.set_file(block.labels[0].clone(), value),
                    Err(e) => errors.push(e),
                }
            }
        }

        for attr in &file.assignments {
            match self.literal_override(&attr.value, &attr.name) {
                Ok(value) => self.overrides.set_file(attr.name.clone(), value),
                Err(e) => errors.push(e),
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn literal_override(&self, value: &Value, path: &str) -> Result<Value, Error> {
        if value.is_resolved() {
            Ok(value.clone())
        } else {
            Err(Error::Validation {
                path: path.to_string(),
                message: "override values must be literal, not expressions".to_string(),
            })
        }
    }

    /// Supply a variable value at invocation time (highest precedence).
    pub fn set_var(&mut self, name: impl Into<String>, value: Value) {
        self.overrides.set_cli(name, value);
    }

    /// Parse and record a `name=value` assignment (highest precedence).
    pub fn add_var_assignment(&mut self, assignment: &str) -> Result<(), Error> {
        self.overrides.add_cli_assignment(assignment)
    }

    /// Scan environment-style pairs for `SMITH_VAR_*` overrides.
    pub fn load_env<I>(&mut self, pairs: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        self.overrides.load_env(pairs);
    }

    /// The source map for this pass (for custom diagnostics rendering).
    pub fn sources(&self) -> &SourceMap {
        &self.sources
    }

    /// Run the pass: merge, resolve, validate, bind.
    pub fn resolve(&self) -> Result<ResolvedConfig, Vec<Error>> {
        let merged = merge_documents(&self.documents, &self.registry, &self.sources)?;
        debug!(blocks = merged.blocks.len(), "documents merged");

        let variable_defs = collect_variables(&merged)?;
        let mut evaluator = Evaluator::new(&merged.blocks, &variable_defs, &self.overrides);

        // Every declared variable gets an effective value, referenced or
        // not. Missing values are collected so all are reported at once.
        let mut variables: IndexMap<String, Value> = IndexMap::new();
        let mut missing = Vec::new();
        for name in variable_defs.keys() {
            let reference = format!("var.{}", name);
            match evaluator.resolve_ref(&Path::parse(&reference), &reference) {
                Ok(value) => {
                    variables.insert(name.clone(), value);
                }
                Err(e @ Error::MissingVariable { .. }) => missing.push(e),
                Err(e) => return Err(vec![e]),
            }
        }
        if !missing.is_empty() {
            return Err(missing);
        }
        debug!(variables = variables.len(), "variables resolved");

        // Substitute every expression in every block. Variable blocks are
        // carried as-is: their defaults were consumed above and may
        // legitimately stay unused expressions when overridden.
        let mut resolved_blocks: IndexMap<String, smith_adl_ast::Block> = IndexMap::new();
        for (id, block) in &merged.blocks {
            let resolved = if block.block_type == "variable" {
                block.clone()
            } else {
                evaluator.resolve_block(block, id).map_err(|e| vec![e])?
            };
            resolved_blocks.insert(id.clone(), resolved);
        }
        debug!("expressions substituted");

        let validation_errors = validate(&resolved_blocks, &self.registry, &self.sources);
        if !validation_errors.is_empty() {
            return Err(validation_errors);
        }
        debug!("schema validation passed");

        let config = build(&resolved_blocks, variables, &variable_defs)?;
        debug!(
            models = config.models.len(),
            plugins = config.plugins.len(),
            agents = config.agents.len(),
            "references bound"
        );
        Ok(config)
    }
}
