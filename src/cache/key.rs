//! Cache Key Module
//!
//! Builds store keys of the form
//! `{prefix}{namespace:}{category}:{identifier}{:fingerprint}`.
//!
//! Identifiers and namespaces are reduced to `[A-Za-z0-9_-]`. Whenever that
//! reduction loses information, or the identifier has to be truncated to keep
//! the key within [`MAX_KEY_LENGTH`], an 8-hex-character SHA-256 fingerprint of
//! the original input is appended so distinct inputs keep distinct keys.

use sha2::{Digest, Sha256};

use crate::cache::{Category, MAX_KEY_LENGTH, MAX_NAMESPACE_LENGTH, MAX_PREFIX_LENGTH};
use crate::error::{CacheError, Result};

/// Hex characters of the fingerprint suffix
const FINGERPRINT_LEN: usize = 8;

// == Key Codec ==
/// Deterministic cache key builder bound to a global key prefix.
#[derive(Debug, Clone)]
pub struct KeyCodec {
    prefix: String,
}

impl KeyCodec {
    // == Constructor ==
    /// Creates a codec for the given global prefix (e.g. `bench:`).
    ///
    /// The prefix may contain `:` separators in addition to key-safe
    /// characters. Anything longer than `MAX_PREFIX_LENGTH` is rejected.
    pub fn new(prefix: impl Into<String>) -> Result<Self> {
        let prefix = prefix.into();
        if prefix.len() > MAX_PREFIX_LENGTH {
            return Err(CacheError::Config(format!(
                "Key prefix exceeds maximum length of {} bytes",
                MAX_PREFIX_LENGTH
            )));
        }
        if let Some(bad) = prefix.chars().find(|c| !is_key_char(*c) && *c != ':') {
            return Err(CacheError::Config(format!(
                "Key prefix contains unsupported character {:?}",
                bad
            )));
        }
        Ok(Self { prefix })
    }

    /// Returns the global prefix every key starts with.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    // == Make Key ==
    /// Builds the store key for a `(category, identifier, namespace)` triple.
    pub fn make_key(&self, category: Category, identifier: &str, namespace: Option<&str>) -> String {
        let mut lossy = false;
        let mut key = self.prefix.clone();

        if let Some(ns) = namespace.filter(|ns| !ns.is_empty()) {
            let (clean, changed) = sanitize(ns);
            lossy |= changed || clean.len() > MAX_NAMESPACE_LENGTH;
            key.push_str(&clean[..clean.len().min(MAX_NAMESPACE_LENGTH)]);
            key.push(':');
        }

        key.push_str(category.as_str());
        key.push(':');

        let (clean_id, changed) = sanitize(identifier);
        lossy |= changed;

        let room = MAX_KEY_LENGTH - key.len();
        if !lossy && clean_id.len() <= room {
            key.push_str(&clean_id);
            return key;
        }

        // Room left for the identifier once `:` and the fingerprint are reserved
        let keep = room.saturating_sub(FINGERPRINT_LEN + 1).min(clean_id.len());
        key.push_str(&clean_id[..keep]);
        key.push(':');
        key.push_str(&fingerprint(namespace, identifier));
        key
    }

    // == Scoped Pattern ==
    /// Prefixes a caller-supplied glob pattern so invalidation never reaches
    /// keys outside this codec's prefix.
    ///
    /// Only key-safe characters, `:` and the glob metacharacters `* ? [ ] ^`
    /// are accepted.
    pub fn scoped_pattern(&self, pattern: &str) -> Result<String> {
        if pattern.is_empty() {
            return Err(CacheError::InvalidPattern("pattern is empty".to_string()));
        }
        if let Some(bad) = pattern
            .chars()
            .find(|c| !is_key_char(*c) && !matches!(c, ':' | '*' | '?' | '[' | ']' | '^'))
        {
            return Err(CacheError::InvalidPattern(format!(
                "unsupported character {:?} in {:?}",
                bad, pattern
            )));
        }
        if pattern.starts_with(&self.prefix) {
            Ok(pattern.to_string())
        } else {
            Ok(format!("{}{}", self.prefix, pattern))
        }
    }
}

// == Helpers ==
fn is_key_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

/// Replaces every character outside `[A-Za-z0-9_-]` with `_`.
///
/// Returns the cleaned string and whether anything was replaced.
fn sanitize(raw: &str) -> (String, bool) {
    let mut changed = false;
    let clean = raw
        .chars()
        .map(|c| {
            if is_key_char(c) {
                c
            } else {
                changed = true;
                '_'
            }
        })
        .collect();
    (clean, changed)
}

/// First 8 hex characters of SHA-256 over the original, unsanitized input.
///
/// The namespace only takes part when present, so un-namespaced keys are a
/// digest of the identifier alone.
fn fingerprint(namespace: Option<&str>, identifier: &str) -> String {
    let mut hasher = Sha256::new();
    if let Some(ns) = namespace.filter(|ns| !ns.is_empty()) {
        hasher.update(ns.as_bytes());
        hasher.update([0u8]);
    }
    hasher.update(identifier.as_bytes());
    let digest = hasher.finalize();
    hex::encode(&digest[..FINGERPRINT_LEN / 2])
}
