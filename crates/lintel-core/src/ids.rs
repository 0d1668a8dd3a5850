//! Validated identifiers for rules and rule sets.
//!
//! Both identifiers share one grammar: one or more groups of ASCII letters,
//! joined by single dashes (`LongMethod`, `code-style`).

use serde::Serialize;
use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

/// Error raised when an identifier does not follow the id grammar.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{value}' is not a valid {kind} id: expected letters optionally separated by single dashes")]
pub struct IdError {
    /// Which kind of identifier was being built.
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

fn is_valid_id(value: &str) -> bool {
    !value.is_empty()
        && value
            .split('-')
            .all(|group| !group.is_empty() && group.chars().all(|c| c.is_ascii_alphabetic()))
}

macro_rules! identifier {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Validates and wraps an identifier.
            ///
            /// # Errors
            ///
            /// Returns [`IdError`] if `value` does not follow the id grammar.
            pub fn new(value: impl Into<String>) -> Result<Self, IdError> {
                let value = value.into();
                if is_valid_id(&value) {
                    Ok(Self(value))
                } else {
                    Err(IdError { kind: $kind, value })
                }
            }

            /// Returns the identifier as a string slice.
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

        impl FromStr for $name {
            type Err = IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

identifier!(
    /// Identifier of a rule, also its config key inside the rule set scope.
    RuleId,
    "rule"
);

identifier!(
    /// Identifier of a rule set, also its top-level config key.
    RuleSetId,
    "rule set"
);
