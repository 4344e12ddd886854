//! The untyped document tree.
//!
//! A parsed source file is a `Document`: an ordered sequence of blocks.
//! Blocks carry a type, up to two labels, attributes, and nested blocks.
//! The parser produces this tree with no schema knowledge; merging,
//! validation, and resolution all happen downstream.

use crate::span::Span;
use crate::value::Value;

/// One parsed source file.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Top-level blocks in source order.
    pub blocks: Vec<Block>,
    /// Id of the source file in the pass's `SourceMap`.
    pub file_id: u16,
}

/// A block: `type "label1" "label2" { ... }`.
///
/// Identity is the `(type, labels)` tuple; duplicate identity across the
/// merged document set is an error.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub block_type: String,
    pub labels: Vec<String>,
    /// Attributes in source order. Names are unique within one block.
    pub attributes: Vec<Attribute>,
    /// Nested blocks in source order.
    pub nested: Vec<Block>,
    pub span: Span,
}

/// A `name = value` attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub value: Value,
    pub span: Span,
}

impl Block {
    /// Look up an attribute by name.
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|attr| attr.name == name)
    }

    /// All nested blocks of a given type.
    pub fn nested_of_type<'a, 'b>(
        &'a self,
        block_type: &'b str,
    ) -> impl Iterator<Item = &'a Block> + 'b
    where
        'a: 'b,
    {
        self.nested
            .iter()
            .filter(move |block| block.block_type == block_type)
    }

    /// Canonical dotted identity, e.g. `plugin.local.echo` or `runtime`.
    pub fn id(&self) -> String {
        let mut id = self.block_type.clone();
        for label in &self.labels {
            id.push('.');
            id.push_str(label);
        }
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(block_type: &str, labels: &[&str]) -> Block {
        Block {
            block_type: block_type.to_string(),
            labels: labels.iter().map(|s| s.to_string()).collect(),
            attributes: Vec::new(),
            nested: Vec::new(),
            span: Span::zero(0),
        }
    }

    #[test]
    fn id_joins_type_and_labels() {
        assert_eq!(block("runtime", &[]).id(), "runtime");
        assert_eq!(block("model", &["m1"]).id(), "model.m1");
        assert_eq!(block("plugin", &["local", "echo"]).id(), "plugin.local.echo");
    }

    #[test]
    fn attribute_lookup_by_name() {
        let mut b = block("model", &["m1"]);
        b.attributes.push(Attribute {
            name: "provider".into(),
            value: Value::String("ollama".into()),
            span: Span::zero(0),
        });
        assert!(b.attribute("provider").is_some());
        assert!(b.attribute("name").is_none());
    }
}
