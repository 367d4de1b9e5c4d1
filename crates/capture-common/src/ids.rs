//! ID types for users, NPC groups and in-flight paths.
//!
//! All ids are opaque strings assigned by the session layer. They order
//! lexicographically so every table keyed by them iterates the same way on
//! every participant.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates an id from anything string-like.
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Returns the raw id.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_id!(
    /// Identifier of a connected user (human player or bot).
    UserId
);

string_id!(
    /// Identifier of an NPC group. Unique across the registry.
    GroupId
);

string_id!(
    /// Identifier of an in-flight path record.
    PathId
);

impl PathId {
    /// Derives the path id used when `group` is thrown on `tick`.
    ///
    /// Every participant computes the same id from synchronized inputs.
    #[must_use]
    pub fn for_throw(group: &GroupId, tick: u64) -> Self {
        Self(format!("{group}@{tick}"))
    }
}
