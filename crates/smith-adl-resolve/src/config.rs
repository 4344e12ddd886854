//! Resolved configuration output and reference binding.
//!
//! After expression resolution and validation, composition references are
//! bound: an agent's `model` names a model block id and becomes a direct
//! `Arc<ModelDef>` link; each entry of `plugins` becomes an
//! `Arc<PluginDef>`. The runtime consumes this structure read-only and
//! never performs string lookups.

use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use smith_adl_ast::{Block, Value};

use crate::error::Error;
use crate::vars::VariableDef;

/// The final, fully substituted, reference-bound configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    pub runtime: RuntimeSettings,
    /// Effective variable values by name.
    pub variables: IndexMap<String, Value>,
    /// Names of variables declared sensitive; redacted in display output.
    pub sensitive: IndexSet<String>,
    pub models: IndexMap<String, Arc<ModelDef>>,
    /// Keyed `kind:id`, e.g. `local:echo`.
    pub plugins: IndexMap<String, Arc<PluginDef>>,
    pub agents: IndexMap<String, AgentDef>,
}

/// Settings from the `runtime` block.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RuntimeSettings {
    pub required_version: Option<String>,
    pub extra: IndexMap<String, Value>,
}

/// A resolved `model` block.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelDef {
    pub id: String,
    pub provider: String,
    pub name: String,
    pub settings: IndexMap<String, Value>,
}

/// Where a plugin comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginKind {
    Local,
    Remote,
}

impl PluginKind {
    fn parse(label: &str) -> Option<Self> {
        match label {
            "local" => Some(PluginKind::Local),
            "remote" => Some(PluginKind::Remote),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PluginKind::Local => "local",
            PluginKind::Remote => "remote",
        }
    }
}

/// A resolved `plugin` block.
#[derive(Debug, Clone, PartialEq)]
pub struct PluginDef {
    pub kind: PluginKind,
    pub id: String,
    pub source: String,
    pub version: Option<String>,
    pub variables: IndexMap<String, Value>,
}

/// A resolved `agent` block with its references bound.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentDef {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub system_prompt: String,
    pub model: Arc<ModelDef>,
    pub plugins: Vec<Arc<PluginDef>>,
}

/// Bind references and extract typed definitions from resolved blocks.
///
/// Blocks are assumed schema-valid; the remaining failure mode is a
/// dangling composition reference, and every one found is reported.
pub fn build(
    blocks: &IndexMap<String, Block>,
    variables: IndexMap<String, Value>,
    defs: &IndexMap<String, VariableDef>,
) -> Result<ResolvedConfig, Vec<Error>> {
    let mut errors = Vec::new();

    let mut runtime = RuntimeSettings::default();
    if let Some(block) = blocks.get("runtime") {
        for attr in &block.attributes {
            if attr.name == "required_version" {
                runtime.required_version = attr.value.as_str().map(str::to_string);
            } else {
                runtime.extra.insert(attr.name.clone(), attr.value.clone());
            }
        }
    }

    let mut models: IndexMap<String, Arc<ModelDef>> = IndexMap::new();
    for block in blocks.values().filter(|b| b.block_type == "model") {
        let id = block.labels[0].clone();
        match extract_model(block, &id) {
            Ok(def) => {
                models.insert(id, Arc::new(def));
            }
            Err(e) => errors.push(e),
        }
    }

    let mut plugins: IndexMap<String, Arc<PluginDef>> = IndexMap::new();
    for block in blocks.values().filter(|b| b.block_type == "plugin") {
        match extract_plugin(block) {
            Ok(def) => {
                plugins.insert(format!("{}:{}", def.kind.as_str(), def.id), Arc::new(def));
            }
            Err(e) => errors.push(e),
        }
    }

    let mut agents: IndexMap<String, AgentDef> = IndexMap::new();
    for block in blocks.values().filter(|b| b.block_type == "agent") {
        match extract_agent(block, &models, &plugins) {
            Ok(def) => {
                agents.insert(def.id.clone(), def);
            }
            Err(e) => errors.push(e),
        }
    }

    let sensitive: IndexSet<String> = defs
        .values()
        .filter(|def| def.sensitive)
        .map(|def| def.name.clone())
        .collect();

    if errors.is_empty() {
        Ok(ResolvedConfig {
            runtime,
            variables,
            sensitive,
            models,
            plugins,
            agents,
        })
    } else {
        Err(errors)
    }
}

fn extract_model(block: &Block, id: &str) -> Result<ModelDef, Error> {
    let path = block.id();
    let settings = block
        .nested_of_type("settings")
        .next()
        .map(|settings| {
            settings
                .attributes
                .iter()
                .map(|attr| (attr.name.clone(), attr.value.clone()))
                .collect()
        })
        .unwrap_or_default();

    Ok(ModelDef {
        id: id.to_string(),
        provider: require_str(block, "provider", &path)?,
        name: require_str(block, "name", &path)?,
        settings,
    })
}

fn extract_plugin(block: &Block) -> Result<PluginDef, Error> {
    let path = block.id();
    let kind = PluginKind::parse(&block.labels[0]).ok_or_else(|| Error::Validation {
        path: path.clone(),
        message: format!("unknown plugin kind '{}'", block.labels[0]),
    })?;

    let variables = block
        .attribute("variables")
        .and_then(|attr| attr.value.as_map().cloned())
        .unwrap_or_default();

    Ok(PluginDef {
        kind,
        id: block.labels[1].clone(),
        source: require_str(block, "source", &path)?,
        version: block
            .attribute("version")
            .and_then(|attr| attr.value.as_str())
            .map(str::to_string),
        variables,
    })
}

fn extract_agent(
    block: &Block,
    models: &IndexMap<String, Arc<ModelDef>>,
    plugins: &IndexMap<String, Arc<PluginDef>>,
) -> Result<AgentDef, Error> {
    let path = block.id();
    let id = block.labels[0].clone();

    let model_ref = require_str(block, "model", &path)?;
    let model = model_ref
        .strip_prefix("model.")
        .and_then(|model_id| models.get(model_id))
        .cloned()
        .ok_or_else(|| Error::UnresolvedReference {
            reference: model_ref.clone(),
            path: format!("{}.model", path),
        })?;

    let mut bound_plugins = Vec::new();
    if let Some(attr) = block.attribute("plugins") {
        let items = attr.value.as_list().unwrap_or(&[]);
        for (idx, item) in items.iter().enumerate() {
            let item_path = format!("{}.plugins[{}]", path, idx);
            let Some(reference) = item.as_str() else {
                return Err(Error::TypeMismatch {
                    path: item_path,
                    expected: "string".to_string(),
                    actual: item.type_name().to_string(),
                });
            };
            let plugin = reference
                .strip_prefix("plugin.")
                .map(|rest| rest.replacen('.', ":", 1))
                .and_then(|key| plugins.get(&key))
                .cloned()
                .ok_or_else(|| Error::UnresolvedReference {
                    reference: reference.to_string(),
                    path: item_path,
                })?;
            bound_plugins.push(plugin);
        }
    }

    Ok(AgentDef {
        id,
        name: require_str(block, "name", &path)?,
        description: block
            .attribute("description")
            .and_then(|attr| attr.value.as_str())
            .map(str::to_string),
        system_prompt: require_str(block, "system_prompt", &path)?,
        model,
        plugins: bound_plugins,
    })
}

/// Fetch a required string attribute from a schema-validated block.
fn require_str(block: &Block, name: &str, path: &str) -> Result<String, Error> {
    match block.attribute(name) {
        Some(attr) => attr
            .value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| Error::TypeMismatch {
                path: format!("{}.{}", path, name),
                expected: "string".to_string(),
                actual: attr.value.type_name().to_string(),
            }),
        None => Err(Error::Validation {
            path: path.to_string(),
            message: format!("missing required attribute '{}'", name),
        }),
    }
}

impl ResolvedConfig {
    /// Render the configuration as plain JSON, shaped like the merged
    /// document tree: `runtime`, `variable`, `model`, `plugin`, `agent`.
    ///
    /// With `redact` set, sensitive variable values print as
    /// `(sensitive)`.
    pub fn to_json(&self, redact: bool) -> serde_json::Value {
        let mut variables = serde_json::Map::new();
        for (name, value) in &self.variables {
            let rendered = if redact && self.sensitive.contains(name) {
                serde_json::Value::String("(sensitive)".to_string())
            } else {
                value.to_json()
            };
            variables.insert(name.clone(), rendered);
        }

        let mut runtime = serde_json::Map::new();
        if let Some(version) = &self.runtime.required_version {
            runtime.insert(
                "required_version".to_string(),
                serde_json::Value::String(version.clone()),
            );
        }
        for (name, value) in &self.runtime.extra {
            runtime.insert(name.clone(), value.to_json());
        }

        let models: serde_json::Map<String, serde_json::Value> = self
            .models
            .iter()
            .map(|(id, def)| (id.clone(), model_json(def)))
            .collect();
        let plugins: serde_json::Map<String, serde_json::Value> = self
            .plugins
            .iter()
            .map(|(key, def)| (key.clone(), plugin_json(def)))
            .collect();
        let agents: serde_json::Map<String, serde_json::Value> = self
            .agents
            .iter()
            .map(|(id, def)| (id.clone(), agent_json(def)))
            .collect();

        serde_json::json!({
            "runtime": runtime,
            "variable": variables,
            "model": models,
            "plugin": plugins,
            "agent": agents,
        })
    }
}

fn model_json(def: &ModelDef) -> serde_json::Value {
    let settings: serde_json::Map<String, serde_json::Value> = def
        .settings
        .iter()
        .map(|(k, v)| (k.clone(), v.to_json()))
        .collect();
    serde_json::json!({
        "provider": def.provider,
        "name": def.name,
        "settings": settings,
    })
}

fn plugin_json(def: &PluginDef) -> serde_json::Value {
    let variables: serde_json::Map<String, serde_json::Value> = def
        .variables
        .iter()
        .map(|(k, v)| (k.clone(), v.to_json()))
        .collect();
    let mut out = serde_json::Map::new();
    out.insert("type".to_string(), def.kind.as_str().into());
    out.insert("name".to_string(), def.id.clone().into());
    out.insert("source".to_string(), def.source.clone().into());
    if let Some(version) = &def.version {
        out.insert("version".to_string(), version.clone().into());
    }
    out.insert("variables".to_string(), serde_json::Value::Object(variables));
    serde_json::Value::Object(out)
}

fn agent_json(def: &AgentDef) -> serde_json::Value {
    let plugins: Vec<serde_json::Value> = def.plugins.iter().map(|p| plugin_json(p)).collect();
    let mut out = serde_json::Map::new();
    out.insert("name".to_string(), def.name.clone().into());
    if let Some(description) = &def.description {
        out.insert("description".to_string(), description.clone().into());
    }
    out.insert("system_prompt".to_string(), def.system_prompt.clone().into());
    out.insert("model".to_string(), model_json(&def.model));
    out.insert("plugins".to_string(), serde_json::Value::Array(plugins));
    serde_json::Value::Object(out)
}
