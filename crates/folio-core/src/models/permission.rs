use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use utoipa::ToSchema;

/// Strength of a capability grant.
///
/// The derived ordering follows declaration order, so `Read < Write`. Grants are
/// compared through [`PermissionLevel::satisfies`], never by their string form.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "permission_level", rename_all = "UPPERCASE")
)]
#[serde(rename_all = "UPPERCASE")]
pub enum PermissionLevel {
    Read,
    Write,
}

impl PermissionLevel {
    /// Whether a grant at this level covers an operation requiring `required`.
    pub fn satisfies(self, required: PermissionLevel) -> bool {
        self >= required
    }
}

impl FromStr for PermissionLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "READ" => Ok(PermissionLevel::Read),
            "WRITE" => Ok(PermissionLevel::Write),
            _ => Err(anyhow::anyhow!("Invalid permission level: {}", s)),
        }
    }
}

impl Display for PermissionLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            PermissionLevel::Read => write!(f, "READ"),
            PermissionLevel::Write => write!(f, "WRITE"),
        }
    }
}
