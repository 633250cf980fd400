//! Identifier newtypes used across the cascade protocol.
//!
//! Each wrapper is an opaque string with its own type, so a task id
//! can never land where a function id belongs. The engine assigns no
//! meaning to the contents; callers bring whatever id scheme their
//! registry or fabric already uses.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap an identifier value.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// View the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Unwrap into the underlying string.
            pub fn into_string(self) -> String {
                self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_owned())
            }
        }
    };
}

string_id! {
    /// Identifies a deployed function and its cascade definition.
    FunctionId
}

string_id! {
    /// Identifies one execution of a cascade.
    ExecutionId
}

string_id! {
    /// Identifies a pending human task.
    TaskId
}

string_id! {
    /// Identifies the human who answered a task.
    ResponderId
}
