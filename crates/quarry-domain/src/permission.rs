//! The vocabulary of authorization checks.
//!
//! A check asks: may this principal exercise `Permission` on `Resource`
//! within `Scope`? The evaluation algorithm itself lives behind the
//! authorizer contract; these types only shape the question.

use serde::{Deserialize, Serialize};

/// Permission kinds known to the namespace layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    SpaceView,
    SpaceCreate,
    SpaceEdit,
    SpaceDelete,
    RepoView,
    RepoCreate,
    RepoEdit,
    RepoDelete,
}

impl Permission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::SpaceView => "space_view",
            Permission::SpaceCreate => "space_create",
            Permission::SpaceEdit => "space_edit",
            Permission::SpaceDelete => "space_delete",
            Permission::RepoView => "repo_view",
            Permission::RepoCreate => "repo_create",
            Permission::RepoEdit => "repo_edit",
            Permission::RepoDelete => "repo_delete",
        }
    }
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of resource a permission applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Space,
    Repo,
}

/// The concrete object of a permission check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub kind: ResourceKind,
    /// UID of the resource within its scope; empty for creation checks,
    /// where the resource does not exist yet.
    pub name: String,
}

/// Where a permission check applies: the path of the enclosing space.
/// An empty path denotes the namespace root (e.g. root-space creation).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
    pub space_path: String,
}

impl Scope {
    pub fn root() -> Self {
        Self {
            space_path: String::new(),
        }
    }

    pub fn space(path: impl Into<String>) -> Self {
        Self {
            space_path: path.into(),
        }
    }
}
