//! Typed Settings Module
//!
//! Well-known operation ids and typed retrieval/bot configuration that
//! serialize into the corresponding signature blocks.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::signature::CallSignature;

// == Operation Ids ==
pub const GENERATE_BREWING_GUIDE: &str = "generate_brewing_guide";
pub const SUGGEST_IMPROVEMENTS: &str = "suggest_improvements";
pub const ASK_QUESTION: &str = "ask_question";
pub const EMBED_TEXT: &str = "embed_text";
pub const SIMILARITY_SEARCH: &str = "similarity_search";

/// Which embedding set a similarity search runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SimilarityField {
    #[default]
    Chunks,
    Summary,
}

/// Similarity-search parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalSettings {
    pub top_k: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score_threshold: Option<f64>,
    pub index_name: String,
    pub similarity_field: SimilarityField,
    /// Cap on whole documents returned in whole-file mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_whole_files: Option<u32>,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            top_k: 5,
            score_threshold: None,
            index_name: "knowledge".to_string(),
            similarity_field: SimilarityField::Chunks,
            max_whole_files: None,
        }
    }
}

/// Generative model parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotSettings {
    pub model: String,
    pub temperature: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persona: Option<String>,
}

impl Default for BotSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            temperature: 0.2,
            persona: None,
        }
    }
}

impl CallSignature {
    /// Signature for a call that uses both a retrieval step and a generative bot.
    pub fn for_assistant(
        operation_id: &str,
        retrieval: &RetrievalSettings,
        bot: &BotSettings,
    ) -> Result<Self> {
        CallSignature::new(operation_id)
            .with_retrieval_config(retrieval)?
            .with_bot_config(bot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::{CanonicalValue, KeyBuilder};

    #[test]
    fn test_retrieval_settings_block() {
        let sig = CallSignature::new(SIMILARITY_SEARCH)
            .with_retrieval_config(&RetrievalSettings::default())
            .unwrap();

        let block = sig.retrieval_config();
        assert_eq!(block["top_k"], CanonicalValue::Integer(5));
        assert_eq!(block["similarity_field"], CanonicalValue::Text("chunks".into()));
        assert!(!block.contains_key("score_threshold"));
    }

    #[test]
    fn test_typed_and_manual_blocks_agree() {
        let typed = CallSignature::for_assistant(
            ASK_QUESTION,
            &RetrievalSettings::default(),
            &BotSettings::default(),
        )
        .unwrap()
        .arg("query", "What grind for espresso?");

        let manual = CallSignature::new(ASK_QUESTION)
            .arg("query", "What grind for espresso?")
            .bot("temperature", 0.2)
            .bot("model", "gpt-4o-mini")
            .retrieval("similarity_field", "chunks")
            .retrieval("index_name", "knowledge")
            .retrieval("top_k", 5);

        let keys = KeyBuilder::new("brew");
        assert_eq!(keys.build(&typed), keys.build(&manual));
    }

    #[test]
    fn test_bot_settings_change_key() {
        let keys = KeyBuilder::new("brew");
        let retrieval = RetrievalSettings::default();
        let cold = BotSettings::default();
        let warm = BotSettings {
            temperature: 0.7,
            ..BotSettings::default()
        };

        let a = CallSignature::for_assistant(SUGGEST_IMPROVEMENTS, &retrieval, &cold).unwrap();
        let b = CallSignature::for_assistant(SUGGEST_IMPROVEMENTS, &retrieval, &warm).unwrap();
        assert_ne!(keys.build(&a), keys.build(&b));
    }

    #[test]
    fn test_similarity_field_serializes_lowercase() {
        let json = serde_json::to_string(&SimilarityField::Summary).unwrap();
        assert_eq!(json, "\"summary\"");
    }
}
