//! Enumerations stored as MySQL `ENUM` columns.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

macro_rules! db_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $field:literal {
            $( $(#[$vmeta:meta])* $variant:ident => $text:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $( $(#[$vmeta])* #[serde(rename = $text)] $variant ),+
        }

        impl $name {
            /// Every variant in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Database spelling.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }

            /// Accepted spellings joined for error messages.
            #[must_use]
            pub fn choices() -> String {
                Self::ALL.iter().map(|v| v.as_str()).collect::<Vec<_>>().join(" | ")
            }
        }

        impl FromStr for $name {
            type Err = CoreError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_uppercase().as_str() {
                    $($text => Ok($name::$variant),)+
                    _ => Err(CoreError::InvalidEnum {
                        field: $field.to_owned(),
                        raw: s.to_owned(),
                    }),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

db_enum! {
    /// Physical condition of a bridge.
    Kondisi, "kondisi" {
        /// Good condition.
        Baik => "BAIK",
        /// Fair condition.
        Sedang => "SEDANG",
        /// Lightly damaged.
        RusakRingan => "RUSAK_RINGAN",
        /// Heavily damaged.
        RusakBerat => "RUSAK_BERAT",
    }
}

db_enum! {
    /// Administrator role.
    Level, "level" {
        /// Full access including maintenance.
        Developer => "DEVELOPER",
        /// Manages users and reference data.
        Admin => "ADMIN",
        /// Reviews submitted figures.
        Verifikator => "VERIFIKATOR",
        /// Enters figures for one OPD.
        Operator => "OPERATOR",
    }
}

db_enum! {
    /// Whether an administrator may sign in.
    LockStatus, "lockuser" {
        /// Account may sign in.
        Aktif => "AKTIF",
        /// Account is locked.
        Nonaktif => "NONAKTIF",
    }
}

db_enum! {
    /// Audit action recorded in the `aksi` column.
    Aksi, "aksi" {
        /// Row was inserted.
        Create => "CREATE",
        /// Row was updated.
        Edit => "EDIT",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parsing_is_case_insensitive_and_trimmed() {
        assert_eq!(" operator ".parse::<Level>(), Ok(Level::Operator));
        assert_eq!("rusak_berat".parse::<Kondisi>(), Ok(Kondisi::RusakBerat));
    }

    #[test]
    fn unknown_value_names_the_field() {
        let err = match "HIJAU".parse::<Kondisi>() {
            Err(e) => e,
            Ok(k) => panic!("unexpected {k}"),
        };
        assert_eq!(err.to_string(), "kondisi tidak valid: HIJAU");
    }

    #[test]
    fn choices_lists_variants_in_order() {
        assert_eq!(LockStatus::choices(), "AKTIF | NONAKTIF");
        assert_eq!(Level::choices(), "DEVELOPER | ADMIN | VERIFIKATOR | OPERATOR");
    }

    #[test]
    fn serde_uses_database_spelling() {
        let json = match serde_json::to_string(&Kondisi::RusakRingan) {
            Ok(s) => s,
            Err(e) => panic!("serialization failed: {e}"),
        };
        assert_eq!(json, "\"RUSAK_RINGAN\"");
    }
}
