//! Authorization contract and reference implementations.
//!
//! The evaluation algorithm (role bindings, inheritance rules) lives in
//! the surrounding platform; this module only defines the call contract
//! the move engine consumes, plus two table-free implementations used in
//! development and tests.

use std::collections::HashMap;
use std::sync::RwLock;

use quarry_domain::{paths, Permission, Principal, Resource, Scope};
use thiserror::Error;

/// Failure while evaluating a permission check. The engine treats any
/// evaluation failure as a denial, never as an implicit allow.
#[derive(Debug, Error)]
pub enum AuthzError {
    #[error("no permission checks provided")]
    NoChecksProvided,

    #[error("authorizer failure: {0}")]
    Internal(String),
}

/// One (scope, resource, permission) triple for a multi-check call.
#[derive(Debug, Clone)]
pub struct PermissionCheck {
    pub scope: Scope,
    pub resource: Resource,
    pub permission: Permission,
}

/// Yes/no/error permission evaluation for a principal against a scoped
/// resource.
///
/// Returns `Ok(true)` if the principal may perform the action,
/// `Ok(false)` if not, and `Err(_)` if evaluation failed and the action
/// must be denied.
pub trait Authorizer: Send + Sync {
    fn check(
        &self,
        principal: &Principal,
        scope: &Scope,
        resource: &Resource,
        permission: Permission,
    ) -> Result<bool, AuthzError>;

    /// Check that ALL the given triples are allowed.
    fn check_all(
        &self,
        principal: &Principal,
        checks: &[PermissionCheck],
    ) -> Result<bool, AuthzError> {
        if checks.is_empty() {
            return Err(AuthzError::NoChecksProvided);
        }
        for c in checks {
            if !self.check(principal, &c.scope, &c.resource, c.permission)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

/// Authorizer that allows everything. Development and single-user setups.
#[derive(Debug, Default)]
pub struct UnrestrictedAuthorizer;

impl Authorizer for UnrestrictedAuthorizer {
    fn check(
        &self,
        _principal: &Principal,
        _scope: &Scope,
        _resource: &Resource,
        _permission: Permission,
    ) -> Result<bool, AuthzError> {
        Ok(true)
    }
}

/// Table-driven authorizer: permissions granted to a principal at a space
/// path apply to that space and its whole subtree. Grants at the empty
/// path apply everywhere, including root-space creation.
#[derive(Debug, Default)]
pub struct MembershipAuthorizer {
    grants: RwLock<HashMap<i64, Vec<(String, Permission)>>>,
}

impl MembershipAuthorizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant `permission` to `principal_id` at `space_path` and below.
    pub fn grant(
        &self,
        principal_id: i64,
        space_path: &str,
        permission: Permission,
    ) -> Result<(), AuthzError> {
        self.grants
            .write()
            .map_err(|_| AuthzError::Internal("grants lock poisoned".to_string()))?
            .entry(principal_id)
            .or_default()
            .push((space_path.to_string(), permission));
        Ok(())
    }
}

fn scope_covers(granted_at: &str, requested: &str) -> bool {
    granted_at.is_empty()
        || granted_at == requested
        || paths::is_ancestor_of(granted_at, requested)
}

impl Authorizer for MembershipAuthorizer {
    fn check(
        &self,
        principal: &Principal,
        scope: &Scope,
        resource: &Resource,
        permission: Permission,
    ) -> Result<bool, AuthzError> {
        // the full path of the checked resource within its scope
        let requested = if resource.name.is_empty() {
            scope.space_path.clone()
        } else if scope.space_path.is_empty() {
            resource.name.clone()
        } else {
            paths::concatenate(&scope.space_path, &resource.name)
        };

        let grants = self
            .grants
            .read()
            .map_err(|_| AuthzError::Internal("grants lock poisoned".to_string()))?;
        let allowed = grants
            .get(&principal.id)
            .map(|entries| {
                entries
                    .iter()
                    .any(|(at, p)| *p == permission && scope_covers(at, &requested))
            })
            .unwrap_or(false);
        Ok(allowed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quarry_domain::ResourceKind;

    fn check(
        authz: &MembershipAuthorizer,
        principal_id: i64,
        scope_path: &str,
        name: &str,
        permission: Permission,
    ) -> bool {
        authz
            .check(
                &Principal::user(principal_id, "tester"),
                &Scope::space(scope_path),
                &Resource {
                    kind: ResourceKind::Space,
                    name: name.to_string(),
                },
                permission,
            )
            .unwrap()
    }

    #[test]
    fn grants_apply_to_subtree() {
        let authz = MembershipAuthorizer::new();
        authz.grant(1, "eng", Permission::SpaceEdit).unwrap();

        assert!(check(&authz, 1, "", "eng", Permission::SpaceEdit));
        assert!(check(&authz, 1, "eng", "team1", Permission::SpaceEdit));
        assert!(!check(&authz, 1, "", "ops", Permission::SpaceEdit));
        assert!(!check(&authz, 1, "eng", "team1", Permission::SpaceDelete));
        assert!(!check(&authz, 2, "eng", "team1", Permission::SpaceEdit));
    }

    #[test]
    fn empty_scope_grant_is_global() {
        let authz = MembershipAuthorizer::new();
        authz.grant(1, "", Permission::SpaceCreate).unwrap();
        // root-space creation: empty scope, empty resource name
        assert!(check(&authz, 1, "", "", Permission::SpaceCreate));
        assert!(check(&authz, 1, "eng/team1", "", Permission::SpaceCreate));
    }

    #[test]
    fn check_all_requires_every_permission() {
        let authz = MembershipAuthorizer::new();
        authz.grant(1, "eng", Permission::SpaceEdit).unwrap();
        let principal = Principal::user(1, "tester");
        let mk = |permission| PermissionCheck {
            scope: Scope::space("eng"),
            resource: Resource {
                kind: ResourceKind::Space,
                name: "team1".to_string(),
            },
            permission,
        };

        assert!(authz.check_all(&principal, &[mk(Permission::SpaceEdit)]).unwrap());
        assert!(!authz
            .check_all(&principal, &[mk(Permission::SpaceEdit), mk(Permission::SpaceDelete)])
            .unwrap());
        assert!(matches!(
            authz.check_all(&principal, &[]),
            Err(AuthzError::NoChecksProvided)
        ));
    }
}
