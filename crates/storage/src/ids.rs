use std::fmt;
use std::str::FromStr;

use super::error::{InvalidIdSnafu, StorageError, StorageResult};

/// Number of decimal digits in every session id.
pub const SESSION_ID_DIGITS: usize = 15;

const SESSION_ID_MIN: u64 = 100_000_000_000_000;
const SESSION_ID_SPAN: u64 = 900_000_000_000_000;

// Both identifiers are opaque strings on the wire; the macro keeps their
// accessors identical while each keeps its own validation.
macro_rules! define_string_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_string(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl FromStr for $name {
            type Err = StorageError;

            fn from_str(raw: &str) -> StorageResult<Self> {
                Self::parse(raw)
            }
        }
    };
}

define_string_id!(SessionId);
define_string_id!(SubjectId);

impl SessionId {
    /// Accepts exactly fifteen ASCII digits.
    pub fn parse(raw: &str) -> StorageResult<Self> {
        if raw.len() != SESSION_ID_DIGITS || !raw.bytes().all(|byte| byte.is_ascii_digit()) {
            return InvalidIdSnafu {
                stage: "parse-session-id",
                id_type: "session-id",
                raw: raw.to_string(),
                details: "expected exactly 15 decimal digits",
            }
            .fail();
        }

        Ok(Self(raw.to_string()))
    }

    /// Maps 64 random bits onto `[10^14, 10^15 - 1]`.
    pub fn from_entropy(random: u64) -> Self {
        let value = SESSION_ID_MIN + random % SESSION_ID_SPAN;
        Self(value.to_string())
    }
}

impl SubjectId {
    /// Subject ids are opaque; only empty input is rejected.
    pub fn parse(raw: &str) -> StorageResult<Self> {
        if raw.is_empty() {
            return InvalidIdSnafu {
                stage: "parse-subject-id",
                id_type: "subject-id",
                raw: raw.to_string(),
                details: "subject id is empty",
            }
            .fail();
        }

        Ok(Self(raw.to_string()))
    }

    /// Treats missing or empty input as "no subject".
    pub fn from_optional(raw: Option<&str>) -> Option<Self> {
        raw.and_then(|value| Self::parse(value).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_fifteen_digits(raw: &str) -> bool {
        raw.len() == 15 && raw.bytes().all(|byte| byte.is_ascii_digit())
    }

    #[test]
    fn entropy_maps_into_fifteen_digit_range() {
        for random in [0, 1, SESSION_ID_SPAN - 1, SESSION_ID_SPAN, u64::MAX, 0xDEAD_BEEF] {
            let id = SessionId::from_entropy(random);
            assert!(is_fifteen_digits(id.as_str()), "{id} for {random}");
        }

        assert_eq!(SessionId::from_entropy(0).as_str(), "100000000000000");
        assert_eq!(
            SessionId::from_entropy(SESSION_ID_SPAN - 1).as_str(),
            "999999999999999"
        );
    }

    #[test]
    fn session_id_rejects_non_matching_values() {
        for raw in ["", "12345", "1234567890123456", "12345678901234a", " 23456789012345"] {
            assert!(SessionId::parse(raw).is_err(), "{raw:?} should be rejected");
        }
        assert_eq!(
            "123456789012345".parse::<SessionId>().map(String::from).ok(),
            Some("123456789012345".to_string())
        );
    }

    #[test]
    fn subject_id_is_opaque_but_never_empty() {
        assert_eq!(SubjectId::parse(" 42").map(String::from).ok(), Some(" 42".into()));
        assert!(SubjectId::parse("").is_err());
        assert_eq!(SubjectId::from_optional(None), None);
        assert_eq!(SubjectId::from_optional(Some("")), None);
    }
}
