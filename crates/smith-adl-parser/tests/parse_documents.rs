// Integration tests that parse realistic multi-block ADL documents.

use smith_adl_ast::Value;
use smith_adl_parser::parse_document;

#[test]
fn parse_full_agent_document() {
    let source = r#"
runtime {
  required_version = "0.1.0"
}

variable "model_temperature" {
  description = "Sampling temperature"
  type        = number
  default     = 0.7
}

model "llama2_instance" {
  provider = "ollama"
  name     = "llama2"
  settings {
    temperature = var.model_temperature
    max_tokens  = 1000
  }
}

plugin "local" "echo" {
  source    = "./plugins/echo"
  variables = {}
}

agent "assistant" {
  name          = "assistant"
  description   = "A helpful assistant"
  system_prompt = "You are a helpful AI assistant."
  model         = model.llama2_instance
  plugins       = [plugin.local.echo]
}
"#;

    let doc = parse_document(source, 0).expect("parsing should succeed");
    assert_eq!(doc.blocks.len(), 5);

    let runtime = &doc.blocks[0];
    assert_eq!(runtime.block_type, "runtime");
    assert!(runtime.labels.is_empty());
    assert_eq!(
        runtime.attribute("required_version").unwrap().value,
        Value::String("0.1.0".into())
    );

    let variable = &doc.blocks[1];
    assert_eq!(variable.id(), "variable.model_temperature");
    // `type = number` is a bare identifier, parsed as a plain string.
    assert_eq!(
        variable.attribute("type").unwrap().value,
        Value::String("number".into())
    );
    assert_eq!(
        variable.attribute("default").unwrap().value,
        Value::Number(0.7)
    );

    let model = &doc.blocks[2];
    assert_eq!(model.labels, vec!["llama2_instance"]);
    let settings: Vec<_> = model.nested_of_type("settings").collect();
    assert_eq!(settings.len(), 1);
    let temp = settings[0].attribute("temperature").unwrap();
    let Value::Template(tpl) = &temp.value else {
        panic!("expected reference template");
    };
    assert_eq!(
        tpl.as_single_ref().map(|p| p.to_string()),
        Some("var.model_temperature".into())
    );

    let plugin = &doc.blocks[3];
    assert_eq!(plugin.labels, vec!["local", "echo"]);
    assert_eq!(plugin.attribute("variables").unwrap().value, Value::Map(Default::default()));

    let agent = &doc.blocks[4];
    let plugins = agent.attribute("plugins").unwrap();
    let Value::List(items) = &plugins.value else {
        panic!("expected list");
    };
    assert_eq!(items.len(), 1);
    let Value::Template(tpl) = &items[0] else {
        panic!("expected reference in list");
    };
    assert_eq!(
        tpl.as_single_ref().map(|p| p.to_string()),
        Some("plugin.local.echo".into())
    );
}

#[test]
fn parse_interpolated_strings() {
    let source = r#"
agent "a" {
  description = "Using temperature ${var.model_temperature}"
}
"#;
    let doc = parse_document(source, 0).expect("parsing should succeed");
    let desc = doc.blocks[0].attribute("description").unwrap();
    let Value::Template(tpl) = &desc.value else {
        panic!("expected template");
    };
    assert_eq!(tpl.parts.len(), 2);
    assert_eq!(tpl.to_string(), "Using temperature ${var.model_temperature}");
}

#[test]
fn parse_heredoc_attribute() {
    let source = "agent \"a\" {\n  system_prompt = <<-EOT\n    You are helpful.\n    Answer briefly.\n  EOT\n}\n";
    let doc = parse_document(source, 0).expect("parsing should succeed");
    let prompt = doc.blocks[0].attribute("system_prompt").unwrap();
    assert_eq!(
        prompt.value,
        Value::String("You are helpful.\nAnswer briefly.\n".into())
    );
}

#[test]
fn parse_lists_and_maps_with_trailing_commas() {
    let source = r#"
plugin "local" "search" {
  source = "./plugins/search"
  variables = {
    max_results = 5,
    engines     = ["ddg", "brave",],
  }
}
"#;
    let doc = parse_document(source, 0).expect("parsing should succeed");
    let vars = doc.blocks[0].attribute("variables").unwrap();
    let map = vars.value.as_map().unwrap();
    assert_eq!(map["max_results"], Value::Number(5.0));
    assert_eq!(
        map["engines"],
        Value::List(vec![
            Value::String("ddg".into()),
            Value::String("brave".into())
        ])
    );
}

#[test]
fn parse_map_entries_without_commas() {
    let source = r#"
model "m" {
  options = {
    a = 1
    b = 2
  }
}
"#;
    let doc = parse_document(source, 0).expect("parsing should succeed");
    let options = doc.blocks[0].attribute("options").unwrap();
    let map = options.value.as_map().unwrap();
    assert_eq!(map.len(), 2);
}

#[test]
fn block_order_and_spans_preserved() {
    let source = "model \"a\" {\n}\nmodel \"b\" {\n}\n";
    let doc = parse_document(source, 3).expect("parsing should succeed");
    assert_eq!(doc.file_id, 3);
    assert_eq!(doc.blocks[0].id(), "model.a");
    assert_eq!(doc.blocks[1].id(), "model.b");
    assert!(doc.blocks[0].span.start < doc.blocks[1].span.start);
    assert_eq!(doc.blocks[0].span.file_id, 3);
}
