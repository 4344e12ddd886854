//! Document merging.
//!
//! Multiple parsed documents merge into one logical configuration keyed by
//! block identity `(type, labels)`. Merging is order-independent apart from
//! which duplicate gets reported first.

use indexmap::IndexMap;
use smith_adl_ast::{Block, Document, SourceMap};
use tracing::debug;

use crate::error::{Error, Location};
use crate::schema::SchemaRegistry;

/// All top-level blocks of a configuration, keyed by canonical id
/// (`model.m1`, `plugin.local.echo`, `runtime`).
#[derive(Debug, Clone, Default)]
pub struct MergedConfig {
    pub blocks: IndexMap<String, Block>,
}

impl MergedConfig {
    /// Blocks of one type, in merge order.
    pub fn of_type<'a>(&'a self, block_type: &'a str) -> impl Iterator<Item = &'a Block> {
        self.blocks
            .values()
            .filter(move |block| block.block_type == block_type)
    }
}

/// Merge documents, rejecting unknown block types and duplicate identities.
///
/// All merge errors are collected in one pass.
pub fn merge_documents(
    documents: &[Document],
    registry: &SchemaRegistry,
    sources: &SourceMap,
) -> Result<MergedConfig, Vec<Error>> {
    let mut merged = MergedConfig::default();
    let mut errors = Vec::new();

    for document in documents {
        for block in &document.blocks {
            if !registry.contains(&block.block_type) {
                errors.push(Error::UnknownBlockType {
                    block_type: block.block_type.clone(),
                    location: Location::from_span(sources, &block.span),
                });
                continue;
            }

            let id = block.id();
            if let Some(existing) = merged.blocks.get(&id) {
                errors.push(Error::DuplicateBlock {
                    id,
                    first: Location::from_span(sources, &existing.span),
                    second: Location::from_span(sources, &block.span),
                });
                continue;
            }
            debug!(block = %id, "merged block");
            merged.blocks.insert(id, block.clone());
        }
    }

    if errors.is_empty() {
        Ok(merged)
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smith_adl_parser::parse_document;

    fn parse_into(sources: &mut SourceMap, name: &str, text: &str) -> Document {
        let file_id = sources.add_file(name, text.to_string());
        parse_document(text, file_id).expect("test source should parse")
    }

    #[test]
    fn duplicate_identity_across_files_is_an_error() {
        let registry = SchemaRegistry::agent_defaults();
        let mut sources = SourceMap::new();
        let a = parse_into(&mut sources, "a.adl", "model \"m1\" {\n}\n");
        let b = parse_into(&mut sources, "b.adl", "model \"m1\" {\n}\n");

        let errors = merge_documents(&[a, b], &registry, &sources).unwrap_err();
        assert!(matches!(
            &errors[0],
            Error::DuplicateBlock { id, first, second }
                if id == "model.m1" && first.file == "a.adl" && second.file == "b.adl"
        ));
    }

    #[test]
    fn same_type_different_labels_merge_fine() {
        let registry = SchemaRegistry::agent_defaults();
        let mut sources = SourceMap::new();
        let a = parse_into(&mut sources, "a.adl", "model \"m1\" {\n}\nmodel \"m2\" {\n}\n");

        let merged = merge_documents(&[a], &registry, &sources).unwrap();
        assert_eq!(merged.blocks.len(), 2);
        assert_eq!(merged.of_type("model").count(), 2);
    }

    #[test]
    fn unknown_block_type_is_rejected() {
        let registry = SchemaRegistry::agent_defaults();
        let mut sources = SourceMap::new();
        let a = parse_into(&mut sources, "a.adl", "gadget \"g\" {\n}\n");

        let errors = merge_documents(&[a], &registry, &sources).unwrap_err();
        assert!(matches!(
            &errors[0],
            Error::UnknownBlockType { block_type, .. } if block_type == "gadget"
        ));
    }
}
