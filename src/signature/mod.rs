//! Signature Module
//!
//! Call signatures, their canonical serialization and the keys derived from them.

mod call;
mod key;
mod settings;
mod value;


// Re-export public types
pub use call::{Block, CallSignature};
pub use key::{CacheKey, KeyBuilder, Namespace, DIGEST_HEX_LEN};
pub use settings::{
    BotSettings, RetrievalSettings, SimilarityField, ASK_QUESTION, EMBED_TEXT,
    GENERATE_BREWING_GUIDE, SIMILARITY_SEARCH, SUGGEST_IMPROVEMENTS,
};
pub use value::CanonicalValue;
