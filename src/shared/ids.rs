use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

pub fn validate_identifier_value(kind: &str, value: &str) -> Result<(), String> {
    if value.is_empty() {
        return Err(format!("{kind} must be non-empty"));
    }
    if value
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' || ch == '.')
    {
        return Ok(());
    }
    Err(format!(
        "{kind} must use only ASCII letters, digits, '-', '_' or '.'"
    ))
}

/// Server ids arrive as free-form strings on the control surface; only emptiness is rejected.
pub fn validate_server_id_value(kind: &str, value: &str) -> Result<(), String> {
    if value.is_empty() {
        return Err(format!("{kind} must be non-empty"));
    }
    Ok(())
}

macro_rules! define_id_type {
    ($name:ident, $kind:literal) => {
        define_id_type!($name, $kind, validate_identifier_value);
    };
    ($name:ident, $kind:literal, $validate:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn parse(raw: &str) -> Result<Self, String> {
                $validate($kind, raw)?;
                Ok(Self(raw.to_string()))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                self.0.fmt(f)
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                self.as_str()
            }
        }

        impl TryFrom<String> for $name {
            type Error = String;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::parse(&value)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: Deserializer<'de>,
            {
                let raw = String::deserialize(deserializer)?;
                Self::parse(&raw).map_err(|err| {
                    D::Error::custom(format!("invalid {} `{}`: {}", $kind, raw, err))
                })
            }
        }
    };
}

define_id_type!(ServerId, "server id", validate_server_id_value);
define_id_type!(NodeId, "node id");
define_id_type!(EdgeId, "edge id");

impl EdgeId {
    pub(crate) fn sequential(sequence: u64) -> Self {
        Self(format!("edge-{sequence}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_ids_accept_canvas_style_identifiers() {
        let id = ServerId::parse("composite-server-1712345678").expect("valid id");
        assert_eq!(id.as_str(), "composite-server-1712345678");
        assert_eq!(id.to_string(), "composite-server-1712345678");
    }

    #[test]
    fn server_ids_accept_any_non_empty_string() {
        assert_eq!(
            ServerId::parse("My Server").expect("spaces").as_str(),
            "My Server"
        );
        assert!(ServerId::parse("srv/1").is_ok());
        assert!(ServerId::parse("").is_err());
    }

    #[test]
    fn ids_reject_empty_and_path_like_values() {
        assert!(ServerId::parse("").is_err());
        assert!(NodeId::parse("../etc").is_err());
        assert!(NodeId::parse("redis 1").is_err());
    }

    #[test]
    fn ids_deserialize_through_validation() {
        let parsed: Result<NodeId, _> = serde_json::from_str("\"bad id\"");
        let err = parsed.expect_err("invalid id should fail");
        assert!(err.to_string().contains("invalid node id `bad id`"));
    }
}
