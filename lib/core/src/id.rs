//! Typed identifiers.
//!
//! Identifiers wrap a ULID and render as `<prefix>_<ulid>`, e.g.
//! `run_01HZY3...`. ULIDs sort by creation time, so turns created later in a
//! run compare greater than earlier ones.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;

/// Why a string is not a valid identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseIdError {
    /// The `<prefix>_` part is missing or belongs to another kind of ID.
    WrongPrefix { expected: &'static str },
    /// The part after the prefix is not a ULID.
    InvalidUlid { reason: String },
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WrongPrefix { expected } => write!(f, "expected an id starting with '{expected}_'"),
            Self::InvalidUlid { reason } => write!(f, "invalid ulid: {reason}"),
        }
    }
}

impl std::error::Error for ParseIdError {}

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Ulid);

        impl $name {
            /// Display prefix.
            pub const PREFIX: &'static str = $prefix;

            /// Generates a fresh identifier.
            #[must_use]
            pub fn new() -> Self {
                Self(Ulid::new())
            }

            #[must_use]
            pub const fn as_ulid(&self) -> Ulid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}_{}", Self::PREFIX, self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let raw = s
                    .strip_prefix(Self::PREFIX)
                    .and_then(|rest| rest.strip_prefix('_'))
                    .ok_or(ParseIdError::WrongPrefix {
                        expected: Self::PREFIX,
                    })?;
                raw.parse::<Ulid>()
                    .map(Self)
                    .map_err(|e| ParseIdError::InvalidUlid {
                        reason: e.to_string(),
                    })
            }
        }
    };
}

define_id!(
    /// One control-loop run, i.e. one HTTP request.
    RunId,
    "run"
);

define_id!(
    /// One turn of a conversation.
    TurnId,
    "turn"
);
