use serde::{Deserialize, Serialize};
use std::fmt;

/// Declares a surrogate-key newtype.
///
/// Wraps a database row ID to provide type safety and prevent accidental
/// mixing of different ID types.
macro_rules! surrogate_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Creates a new ID.
            pub fn new(id: i64) -> Self {
                Self(id)
            }

            /// Returns the underlying ID value.
            pub fn get(self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

surrogate_id!(
    /// Surrogate key of a `category` row.
    CategoryId
);
surrogate_id!(
    /// Surrogate key of a `note` row.
    NoteId
);
surrogate_id!(
    /// Surrogate key of a `note_version` row.
    VersionId
);
surrogate_id!(
    /// Surrogate key of a row in one of the medication tables.
    MedicationRowId
);
