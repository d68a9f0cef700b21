use crate::gateway::Row;

use super::str_field;

/// Public profile row, used to resolve conversation partner display data.
#[derive(Debug, Clone)]
pub struct Profile {
    pub id: String,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
}

impl Profile {
    pub fn from_row(row: &Row) -> Option<Self> {
        Some(Profile {
            id: str_field(row, "id")?,
            name: str_field(row, "name").filter(|n| !n.is_empty()),
            avatar_url: str_field(row, "avatar_url").filter(|a| !a.is_empty()),
        })
    }
}

/// The authenticated user context operations execute as. Absence of a
/// principal means "unauthenticated".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub id: String,
    pub display_name: Option<String>,
}

impl Principal {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: None,
        }
    }
}
