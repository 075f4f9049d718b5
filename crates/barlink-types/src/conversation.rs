use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Separator between the two participant ids in a conversation key.
pub const SEPARATOR: char = ';';

/// Canonical, order-independent identifier for a two-party chat.
///
/// Derived by sorting the two participant ids lexicographically and joining
/// them with `;`. The same key is used as the partition key for stored
/// messages and as the routing suffix for `ReceiveMessage_{key}` gateway
/// targets, so it must always be derived server-side from the participants
/// and never accepted pre-computed from a client.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationKey(String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversationKeyError {
    #[error("participant id must not be empty")]
    EmptyId,
    #[error("participant id must not contain '{SEPARATOR}'")]
    ContainsSeparator,
}

impl ConversationKey {
    /// Derive the key for the unordered pair `{a, b}`.
    ///
    /// Ids containing the separator are rejected outright: joining them
    /// would produce a key that parses as a different pair.
    pub fn derive(a: &str, b: &str) -> Result<Self, ConversationKeyError> {
        if a.is_empty() || b.is_empty() {
            return Err(ConversationKeyError::EmptyId);
        }
        if a.contains(SEPARATOR) || b.contains(SEPARATOR) {
            return Err(ConversationKeyError::ContainsSeparator);
        }

        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        Ok(Self(format!("{lo}{SEPARATOR}{hi}")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConversationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_is_commutative() {
        let ids = ["alice", "bob", "carol@example.com", "z", "0user", "Able"];
        for a in ids {
            for b in ids {
                if a == b {
                    continue;
                }
                let ab = ConversationKey::derive(a, b).unwrap();
                let ba = ConversationKey::derive(b, a).unwrap();
                assert_eq!(ab, ba, "derive({a}, {b}) != derive({b}, {a})");
            }
        }
    }

    #[test]
    fn derive_sorts_lexicographically() {
        let key = ConversationKey::derive("bob", "alice").unwrap();
        assert_eq!(key.as_str(), "alice;bob");
    }

    #[test]
    fn same_user_twice_is_defined() {
        let key = ConversationKey::derive("alice", "alice").unwrap();
        assert_eq!(key.as_str(), "alice;alice");
    }

    #[test]
    fn empty_id_is_rejected() {
        assert_eq!(
            ConversationKey::derive("", "bob"),
            Err(ConversationKeyError::EmptyId)
        );
        assert_eq!(
            ConversationKey::derive("alice", ""),
            Err(ConversationKeyError::EmptyId)
        );
    }

    #[test]
    fn separator_in_id_is_rejected() {
        assert_eq!(
            ConversationKey::derive("al;ice", "bob"),
            Err(ConversationKeyError::ContainsSeparator)
        );
    }
}
