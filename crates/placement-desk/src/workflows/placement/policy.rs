use serde::{Deserialize, Serialize};

/// How `accept` behaves once a position has no capacity left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapacityPolicy {
    /// Fail the accept with `CapacityExhausted`.
    #[default]
    Strict,
    /// Accept anyway and leave the counter at zero.
    Lenient,
}

impl CapacityPolicy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "strict" => Some(Self::Strict),
            "lenient" => Some(Self::Lenient),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            CapacityPolicy::Strict => "strict",
            CapacityPolicy::Lenient => "lenient",
        }
    }
}

/// Product rules applied by the placement service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlacementPolicy {
    pub capacity: CapacityPolicy,
    /// Close a position in the same transaction as the accept that fills it.
    pub close_when_filled: bool,
}
