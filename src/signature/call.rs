//! Call Signature Module
//!
//! The logical identity of a cacheable operation.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde::Serialize;

use crate::error::{CacheError, Result};
use crate::signature::CanonicalValue;

/// A normalized configuration or argument block.
pub type Block = BTreeMap<String, CanonicalValue>;

// == Call Signature ==
/// Describes one cacheable call: which operation, with which arguments,
/// under which retrieval and bot configuration.
///
/// Built fresh for every call and never persisted. Omitted blocks are empty
/// mappings, so "no retrieval config" and "empty retrieval config" are the
/// same call.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CallSignature {
    operation_id: String,
    arguments: Block,
    retrieval_config: Block,
    bot_config: Block,
}

impl CallSignature {
    /// Starts a signature for the given operation with empty blocks.
    pub fn new(operation_id: impl Into<String>) -> Self {
        Self {
            operation_id: operation_id.into(),
            ..Self::default()
        }
    }

    /// Adds or replaces an argument.
    pub fn arg(mut self, name: impl Into<String>, value: impl Into<CanonicalValue>) -> Self {
        self.arguments.insert(name.into(), value.into());
        self
    }

    /// Adds or replaces a retrieval setting.
    pub fn retrieval(mut self, name: impl Into<String>, value: impl Into<CanonicalValue>) -> Self {
        self.retrieval_config.insert(name.into(), value.into());
        self
    }

    /// Adds or replaces a bot setting.
    pub fn bot(mut self, name: impl Into<String>, value: impl Into<CanonicalValue>) -> Self {
        self.bot_config.insert(name.into(), value.into());
        self
    }

    /// Merges the fields of a serializable struct or map into the arguments.
    pub fn with_arguments<T: Serialize + ?Sized>(mut self, args: &T) -> Result<Self> {
        self.arguments.extend(to_block(args, "arguments")?);
        Ok(self)
    }

    /// Merges a serializable retrieval configuration.
    pub fn with_retrieval_config<T: Serialize + ?Sized>(mut self, config: &T) -> Result<Self> {
        self.retrieval_config
            .extend(to_block(config, "retrieval_config")?);
        Ok(self)
    }

    /// Merges a serializable bot configuration.
    pub fn with_bot_config<T: Serialize + ?Sized>(mut self, config: &T) -> Result<Self> {
        self.bot_config.extend(to_block(config, "bot_config")?);
        Ok(self)
    }

    pub fn operation_id(&self) -> &str {
        &self.operation_id
    }

    pub fn arguments(&self) -> &Block {
        &self.arguments
    }

    pub fn retrieval_config(&self) -> &Block {
        &self.retrieval_config
    }

    pub fn bot_config(&self) -> &Block {
        &self.bot_config
    }

    // == Canonical Form ==
    /// Serializes the signature into its canonical byte-stable form.
    ///
    /// Four segments in fixed order (operation id, arguments, retrieval
    /// config, bot config), each prefixed with its byte length.
    pub fn canonical_form(&self) -> String {
        let segments = [
            CanonicalValue::Text(self.operation_id.clone()).to_canonical_string(),
            block_encoding(&self.arguments),
            block_encoding(&self.retrieval_config),
            block_encoding(&self.bot_config),
        ];

        let mut out = String::new();
        for segment in &segments {
            let _ = write!(out, "{}#", segment.len());
            out.push_str(segment);
        }
        out
    }
}

fn block_encoding(block: &Block) -> String {
    let mut out = String::new();
    let _ = write!(out, "m{}{{", block.len());
    for (key, value) in block {
        CanonicalValue::Text(key.clone()).write_canonical(&mut out);
        value.write_canonical(&mut out);
    }
    out.push('}');
    out
}

// A block must be a mapping; null (an omitted Option) becomes the empty block.
fn to_block<T: Serialize + ?Sized>(value: &T, block: &str) -> Result<Block> {
    match CanonicalValue::from_serialize(value)? {
        CanonicalValue::Map(map) => Ok(map),
        CanonicalValue::Null => Ok(Block::new()),
        other => Err(CacheError::Serialization(format!(
            "{} must serialize to a mapping, got {:?}",
            block, other
        ))),
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builder_collects_blocks() {
        let sig = CallSignature::new("generate_brewing_guide")
            .arg("method", "V60")
            .retrieval("top_k", 3)
            .bot("model", "gpt-4o-mini");

        assert_eq!(sig.operation_id(), "generate_brewing_guide");
        assert_eq!(sig.arguments().len(), 1);
        assert_eq!(sig.retrieval_config()["top_k"], CanonicalValue::Integer(3));
        assert_eq!(
            sig.bot_config()["model"],
            CanonicalValue::Text("gpt-4o-mini".into())
        );
    }

    #[test]
    fn test_insertion_order_does_not_matter() {
        let a = CallSignature::new("guide").arg("method", "V60").arg("grams", 15);
        let b = CallSignature::new("guide").arg("grams", 15).arg("method", "V60");

        assert_eq!(a.canonical_form(), b.canonical_form());
    }

    #[test]
    fn test_omitted_and_empty_blocks_are_equal() {
        let omitted = CallSignature::new("guide");
        let empty = CallSignature::new("guide")
            .with_retrieval_config(&json!({}))
            .unwrap()
            .with_bot_config(&None::<BTreeMap<String, String>>)
            .unwrap();

        assert_eq!(omitted.canonical_form(), empty.canonical_form());
    }

    #[test]
    fn test_blocks_do_not_bleed_into_each_other() {
        let as_arg = CallSignature::new("guide").arg("top_k", 3);
        let as_retrieval = CallSignature::new("guide").retrieval("top_k", 3);

        assert_ne!(as_arg.canonical_form(), as_retrieval.canonical_form());
    }

    #[test]
    fn test_canonical_form_layout() {
        let sig = CallSignature::new("op").arg("a", true);
        assert_eq!(sig.canonical_form(), "5#s2:op10#m1{s1:ab1}4#m0{}4#m0{}");
    }

    #[test]
    fn test_non_mapping_block_is_rejected() {
        let result = CallSignature::new("guide").with_bot_config(&vec![1, 2, 3]);
        assert!(matches!(result, Err(CacheError::Serialization(_))));
    }

    #[test]
    fn test_with_arguments_from_json() {
        let sig = CallSignature::new("guide")
            .with_arguments(&json!({"method": "Chemex", "grams": 30.0}))
            .unwrap();
        let built = CallSignature::new("guide").arg("grams", 30).arg("method", "Chemex");

        assert_eq!(sig.canonical_form(), built.canonical_form());
    }
}
