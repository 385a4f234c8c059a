use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A string did not match any known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid {field} value: '{value}'")]
pub struct ParseEnumError {
    pub field: String,
    pub value: String,
}

/// Macro to generate enum with as_str + std::str::FromStr pattern.
/// Serde goes through the same wire strings.
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(ParseEnumError {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

str_enum!(MessageRole {
    User => "user",
    Assistant => "assistant",
    System => "system",
});

str_enum!(UserRole {
    Admin => "ADMIN",
    SalesManager => "SALES_MANAGER",
    SalesAgent => "SALES_AGENT",
    Viewer => "VIEWER",
});

str_enum!(LeadStatus {
    New => "new",
    Contacted => "contacted",
    Qualified => "qualified",
    Proposal => "proposal",
    Negotiation => "negotiation",
    ClosedWon => "closed_won",
    ClosedLost => "closed_lost",
});

impl LeadStatus {
    /// Qualified leads that have not closed yet.
    pub fn is_in_pipeline(&self) -> bool {
        matches!(self, Self::Qualified | Self::Proposal | Self::Negotiation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_role_uses_lowercase_wire_names() {
        assert_eq!(serde_json::to_string(&MessageRole::Assistant).unwrap(), "\"assistant\"");
        let role: MessageRole = serde_json::from_str("\"user\"").unwrap();
        assert_eq!(role, MessageRole::User);
    }

    #[test]
    fn unknown_role_is_rejected() {
        let err = "bot".parse::<MessageRole>().unwrap_err();
        assert_eq!(err.field, "MessageRole");
        assert_eq!(err.value, "bot");
    }

    #[test]
    fn user_role_round_trips_screaming_case() {
        assert_eq!("SALES_AGENT".parse::<UserRole>().unwrap(), UserRole::SalesAgent);
        assert_eq!(UserRole::Admin.to_string(), "ADMIN");
    }

    #[test]
    fn pipeline_statuses() {
        assert!(LeadStatus::Proposal.is_in_pipeline());
        assert!(!LeadStatus::ClosedWon.is_in_pipeline());
        assert!(!LeadStatus::New.is_in_pipeline());
    }
}
