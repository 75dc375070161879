//! The authenticated actor behind a request.

use serde::{Deserialize, Serialize};

/// Kind of principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrincipalType {
    User,
    Service,
    ServiceAccount,
}

/// The actor on whose behalf a permission check is made and to whom
/// audit columns are attributed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Principal {
    pub id: i64,
    pub uid: String,
    pub display_name: String,
    #[serde(rename = "type")]
    pub kind: PrincipalType,
}

impl Principal {
    /// Convenience constructor for a human user.
    pub fn user(id: i64, uid: impl Into<String>) -> Self {
        let uid = uid.into();
        Self {
            id,
            display_name: uid.clone(),
            uid,
            kind: PrincipalType::User,
        }
    }
}
