use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize, EnumString, Display, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Role {
    Staff,
    Supervisor,
    SubEngineer,
    Manager,
    GeneralManager,
    Ceo,
    SuperAdmin,
}

impl Role {
    /// Trims and case-folds a stored role string. Unknown or empty input has no role.
    pub fn normalize(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        trimmed.parse().ok()
    }

    /// Position in the organisation ladder. Supervisor and sub-engineer share a rung.
    pub fn rank(self) -> u8 {
        match self {
            Role::Staff => 0,
            Role::Supervisor | Role::SubEngineer => 1,
            Role::Manager => 2,
            Role::GeneralManager => 3,
            Role::Ceo => 4,
            Role::SuperAdmin => 5,
        }
    }
}
