//! Key Builder Module
//!
//! Derives deterministic cache keys and namespace prefixes from call signatures.

use std::fmt;

use sha2::{Digest, Sha256};

use crate::signature::CallSignature;

/// Length of the hex-encoded SHA-256 digest at the end of every key.
pub const DIGEST_HEX_LEN: usize = 64;

// == Cache Key ==
/// Opaque key of the form `{prefix}:{operation}:{sha256 hex}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The fixed-length hashed portion of the key.
    pub fn digest(&self) -> &str {
        &self.0[self.0.len() - DIGEST_HEX_LEN..]
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// == Namespace ==
/// A key prefix selecting every entry of one operation, or every entry
/// under the configured root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace(String);

impl Namespace {
    /// The literal key prefix shared by every member.
    pub fn as_prefix(&self) -> &str {
        &self.0
    }

    pub fn contains(&self, key: &str) -> bool {
        key.starts_with(&self.0)
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// == Key Builder ==
/// Builds cache keys under a fixed root prefix.
///
/// The operation id is repeated in clear text (escaped) ahead of the digest
/// so that a store with prefix iteration can drop one operation's entries
/// without touching the rest.
#[derive(Debug, Clone)]
pub struct KeyBuilder {
    prefix: String,
}

impl KeyBuilder {
    pub fn new(prefix: impl AsRef<str>) -> Self {
        Self {
            prefix: escape_segment(prefix.as_ref()),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    // == Build ==
    /// Derives the key for a signature. Pure and total.
    pub fn build(&self, signature: &CallSignature) -> CacheKey {
        let digest = Sha256::digest(signature.canonical_form().as_bytes());

        CacheKey(format!(
            "{}{}",
            self.namespace(signature.operation_id()).as_prefix(),
            hex::encode(digest)
        ))
    }

    /// Prefix of every key derived from signatures with this operation id.
    pub fn namespace(&self, operation_id: &str) -> Namespace {
        Namespace(format!("{}:{}:", self.prefix, escape_segment(operation_id)))
    }

    /// Prefix of every key this builder can produce.
    pub fn root(&self) -> Namespace {
        Namespace(format!("{}:", self.prefix))
    }
}

// ':' separates key segments and must never appear inside one.
fn escape_segment(segment: &str) -> String {
    segment.replace('%', "%25").replace(':', "%3A")
}
