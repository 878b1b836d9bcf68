//! Client instance identity.
//!
//! One logical chat session is identified by its backend URL, an optional
//! end-user identifier, and an inbox identifier. The derived key is the
//! sole partition key for every store; it is computed once at client
//! construction and never changes afterwards.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Deterministic partition key derived from `(base_url, user_identifier,
/// inbox_identifier)`. Equal inputs always produce the same key, so two
/// clients configured identically share one persisted dataset; differing
/// in any field yields a disjoint dataset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClientInstanceKey(String);

impl ClientInstanceKey {
    pub fn derive(
        base_url: &str,
        user_identifier: Option<&str>,
        inbox_identifier: &str,
    ) -> Self {
        let base = base_url.trim_end_matches('/');
        let user = user_identifier.unwrap_or("").trim();
        Self(format!("{base}|{inbox_identifier}|{user}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientInstanceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_inputs_derive_the_same_key() {
        let a = ClientInstanceKey::derive("https://chat.example.com", Some("u-1"), "inbox-9");
        let b = ClientInstanceKey::derive("https://chat.example.com", Some("u-1"), "inbox-9");
        assert_eq!(a, b);
    }

    #[test]
    fn trailing_slash_on_base_url_is_normalized() {
        let a = ClientInstanceKey::derive("https://chat.example.com/", None, "inbox-9");
        let b = ClientInstanceKey::derive("https://chat.example.com", None, "inbox-9");
        assert_eq!(a, b);
    }

    #[test]
    fn any_differing_field_derives_a_distinct_key() {
        let base = ClientInstanceKey::derive("https://chat.example.com", Some("u-1"), "inbox-9");
        let other_url =
            ClientInstanceKey::derive("https://chat.other.com", Some("u-1"), "inbox-9");
        let other_user =
            ClientInstanceKey::derive("https://chat.example.com", Some("u-2"), "inbox-9");
        let no_user = ClientInstanceKey::derive("https://chat.example.com", None, "inbox-9");
        let other_inbox =
            ClientInstanceKey::derive("https://chat.example.com", Some("u-1"), "inbox-3");
        assert_ne!(base, other_url);
        assert_ne!(base, other_user);
        assert_ne!(base, no_user);
        assert_ne!(base, other_inbox);
    }
}
