// Allow unwrap in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! Resolution and validation for the Agent Definition Language.
//!
//! This crate turns parsed documents into a fully resolved, internally
//! consistent configuration: it merges blocks across documents, applies
//! variable override precedence (CLI > file > environment > default),
//! substitutes every `${...}` interpolation with cycle detection, checks
//! the result against a data-driven schema registry, and binds agent →
//! model/plugin references into direct links.
//!
//! The entry point is [`Loader`]:
//!
//! ```
//! use smith_adl_resolve::Loader;
//!
//! let mut loader = Loader::with_agent_defaults();
//! loader.add_source("agent.adl", r#"
//! variable "temperature" {
//!   type    = number
//!   default = 0.7
//! }
//!
//! model "llama2" {
//!   provider = "ollama"
//!   name     = "llama2"
//!   settings {
//!     temperature = var.temperature
//!   }
//! }
//!
//! agent "assistant" {
//!   name          = "assistant"
//!   system_prompt = "You are a helpful assistant."
//!   model         = model.llama2
//! }
//! "#).unwrap();
//!
//! let config = loader.resolve().unwrap();
//! assert_eq!(config.agents["assistant"].model.name, "llama2");
//! ```

pub mod config;
pub mod error;
pub mod eval;
pub mod loader;
pub mod merge;
pub mod schema;
pub mod validate;
pub mod vars;

pub use config::{AgentDef, ModelDef, PluginDef, PluginKind, ResolvedConfig, RuntimeSettings};
pub use error::{Error, Location};
pub use loader::Loader;
pub use schema::{SchemaRegistry, SchemaType};
pub use vars::{VarOverrides, VariableDef, ENV_VAR_PREFIX};
