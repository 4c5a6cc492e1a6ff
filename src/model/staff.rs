use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::role::Role;

/// Directory entry for anyone who can appear on an attendance sheet or act on one.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct StaffMember {
    #[schema(example = 42)]
    pub id: u64,
    #[schema(example = "Rahim Uddin")]
    pub name: String,
    #[schema(example = "supervisor")]
    pub role: String,
    #[schema(example = "operations", nullable = true)]
    pub department: Option<String>,
    /// Comma separated; only meaningful for executive roles.
    #[schema(example = "operations,security", nullable = true)]
    pub departments: Option<String>,
    /// 5 or 6. Anything else is read as a six day week.
    #[schema(example = 6, nullable = true)]
    pub shift_days: Option<u8>,
    #[schema(example = "09:00", nullable = true)]
    pub shift_start: Option<String>,
    #[schema(example = "17:00", nullable = true)]
    pub shift_end: Option<String>,
    pub is_active: bool,
}

impl StaffMember {
    pub fn role(&self) -> Option<Role> {
        Role::normalize(&self.role)
    }

    pub fn department_set(&self) -> Vec<String> {
        self.departments
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Credential row used only by login.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Credential {
    pub id: u64,
    pub username: String,
    pub password_hash: String,
    pub role: String,
}
