// End-to-end resolution through the full pipeline.

use smith_adl_ast::Value;
use smith_adl_resolve::{Error, Loader};

const AGENT: &str = r#"
runtime {
  required_version = "0.1.0"
}

variable "model_temperature" {
  description = "Sampling temperature"
  type        = number
  default     = 0.7
}

variable "model_max_tokens" {
  type    = number
  default = 1000
}

model "llama2_instance" {
  provider = "ollama"
  name     = "llama2"
  settings {
    temperature = var.model_temperature
    max_tokens  = var.model_max_tokens
  }
}

plugin "local" "echo" {
  source    = "./plugins/echo"
  variables = {}
}

agent "assistant" {
  name          = "assistant"
  description   = "Runs ${model.llama2_instance.name} at ${var.model_temperature}"
  system_prompt = "You are a helpful AI assistant."
  model         = model.llama2_instance
  plugins       = [plugin.local.echo]
}
"#;

fn loader_with(source: &str) -> Loader {
    let mut loader = Loader::with_agent_defaults();
    loader.add_source("agent.adl", source).expect("source should parse");
    loader
}

#[test]
fn full_pipeline_resolves_and_binds() {
    let config = loader_with(AGENT).resolve().expect("resolution should succeed");

    assert_eq!(config.runtime.required_version.as_deref(), Some("0.1.0"));
    assert_eq!(config.variables["model_temperature"], Value::Number(0.7));

    let model = &config.models["llama2_instance"];
    assert_eq!(model.provider, "ollama");
    assert_eq!(model.settings["temperature"], Value::Number(0.7));
    assert_eq!(model.settings["max_tokens"], Value::Number(1000.0));

    let agent = &config.agents["assistant"];
    assert_eq!(agent.description.as_deref(), Some("Runs llama2 at 0.7"));
    // References are direct links, not names to look up.
    assert_eq!(agent.model.id, "llama2_instance");
    assert_eq!(agent.plugins[0].source, "./plugins/echo");
}

#[test]
fn idempotence_same_inputs_same_output() {
    let first = loader_with(AGENT).resolve().unwrap();
    let second = loader_with(AGENT).resolve().unwrap();
    assert_eq!(first, second);
}

#[test]
fn document_order_does_not_matter() {
    // The agent references blocks declared after it, across files.
    let agent_doc = r#"
agent "assistant" {
  name          = "assistant"
  system_prompt = "prompt"
  model         = model.m
  plugins       = [plugin.local.echo]
}
"#;
    let rest_doc = r#"
variable "temp" {
  type    = number
  default = 0.2
}

model "m" {
  provider = "openai"
  name     = "gpt-4"
  settings {
    temperature = var.temp
  }
}

plugin "local" "echo" {
  source    = "./plugins/echo"
  variables = {}
}
"#;

    let mut forward = Loader::with_agent_defaults();
    forward.add_source("a.adl", agent_doc).unwrap();
    forward.add_source("b.adl", rest_doc).unwrap();

    let mut backward = Loader::with_agent_defaults();
    backward.add_source("b.adl", rest_doc).unwrap();
    backward.add_source("a.adl", agent_doc).unwrap();

    assert_eq!(forward.resolve().unwrap(), backward.resolve().unwrap());
}

#[test]
fn nested_variable_defaults_resolve_through_each_other() {
    let mut loader = Loader::with_agent_defaults();
    loader
        .add_source(
            "vars.adl",
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
        )
        .unwrap();
    let config = loader.resolve().unwrap();
    assert_eq!(config.variables["nested"], Value::String("X-Y".into()));
}

#[test]
fn unknown_model_reference_fails_binding() {
    let mut loader = Loader::with_agent_defaults();
    loader
        .add_source(
            "agent.adl",
            r#"
agent "a" {
  name          = "a"
  system_prompt = "p"
  model         = model.m1
}
"#,
        )
        .unwrap();
    let errors = loader.resolve().unwrap_err();
    assert!(
        errors.iter().any(|e| matches!(
            e,
            Error::UnresolvedReference { reference, .. } if reference.contains("m1")
        )),
        "expected unresolved reference to m1, got {:?}",
        errors
    );
}

#[test]
fn conditional_selects_branch_from_variable() {
    let mut loader = Loader::with_agent_defaults();
    loader
        .add_source(
            "agent.adl",
            r#"
variable "fast" {
  type    = bool
  default = true
}

model "m" {
  provider = "ollama"
  name     = "var.fast ? llama2-7b : llama2-70b"
}

agent "a" {
  name          = "a"
  system_prompt = "p"
  model         = model.m
}
"#,
        )
        .unwrap();
    let config = loader.resolve().unwrap();
    assert_eq!(config.models["m"].name, "llama2-7b");
}

#[test]
fn heredoc_prompt_resolves_with_interpolation() {
    let mut loader = Loader::with_agent_defaults();
    loader
        .add_source(
            "agent.adl",
            "variable \"tone\" {\n  type = string\n  default = \"friendly\"\n}\n\nmodel \"m\" {\n  provider = \"ollama\"\n  name = \"llama2\"\n}\n\nagent \"a\" {\n  name = \"a\"\n  model = model.m\n  system_prompt = <<-EOT\n    Be ${var.tone}.\n  EOT\n}\n",
        )
        .unwrap();
    let config = loader.resolve().unwrap();
    assert_eq!(config.agents["a"].system_prompt, "Be friendly.\n");
}

#[test]
fn json_output_shape_and_redaction() {
    let mut loader = Loader::with_agent_defaults();
    loader
        .add_source(
            "agent.adl",
            r#"
variable "api_key" {
  type      = string
  sensitive = true
  default   = "sk-secret"
}

model "m" {
  provider = "openai"
  name     = "gpt-4"
}

agent "a" {
  name          = "a"
  system_prompt = "p"
  model         = model.m
}
"#,
        )
        .unwrap();
    let config = loader.resolve().unwrap();

    let revealed = config.to_json(false);
    assert_eq!(revealed["variable"]["api_key"], serde_json::json!("sk-secret"));

    let redacted = config.to_json(true);
    assert_eq!(redacted["variable"]["api_key"], serde_json::json!("(sensitive)"));
    assert_eq!(redacted["agent"]["a"]["model"]["name"], serde_json::json!("gpt-4"));
}
