//! Permission evaluator
//!
//! Pure predicates over the active-user permission set. Nothing here mutates
//! state, and every check fails closed when the session has not been
//! populated yet.

use super::active::ActiveUser;
use super::scope::{scopes_covering, scopes_satisfying};
use super::PermissionResult;
use crate::types::*;
use tracing::trace;

/// What a route guard or view needs before it shows something
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Requirement {
    pub resource: Resource,
    pub operation: Operation,
    /// Narrowest scope that is still good enough
    pub minimum_scope: Scope,
}

impl Requirement {
    pub fn new(resource: Resource, operation: Operation, minimum_scope: Scope) -> Self {
        Self {
            resource,
            operation,
            minimum_scope,
        }
    }
}

/// Read-only view over the (possibly absent) active-user permission set
#[derive(Debug, Clone, Copy)]
pub struct Evaluator<'a> {
    active: Option<&'a ActiveUser>,
}

impl<'a> Evaluator<'a> {
    pub fn new(active: Option<&'a ActiveUser>) -> Self {
        Self { active }
    }

    /// Evaluator that denies everything (no session)
    pub fn unauthenticated() -> Self {
        Self { active: None }
    }

    /// The permission set being evaluated, if populated
    pub fn active_user(&self) -> Option<&'a ActiveUser> {
        self.active
    }

    /// Check if the user holds (resource, operation) at exactly `scope`.
    ///
    /// `Scope::Any` asks whether the pair is granted at any scope at all.
    pub fn is_allowed(&self, scope: Scope, resource: Resource, operation: Operation) -> bool {
        let Some(active) = self.active else {
            trace!("Denied {}:{}:{} (no session)", resource, scope, operation);
            return false;
        };
        let key = RuleKey::new(resource, scope, operation);
        let allowed = active.holds(key);
        if !allowed {
            trace!("Denied {} (not held)", key);
        }
        allowed
    }

    /// Check if the user holds (resource, operation) at `minimum` or any broader scope
    pub fn is_allowed_with_minimum_scope(
        &self,
        minimum: Scope,
        resource: Resource,
        operation: Operation,
    ) -> bool {
        scopes_satisfying(minimum)
            .into_iter()
            .any(|scope| self.is_allowed(scope, resource, operation))
    }

    /// Check if the user may perform `operation` on `resource` belonging to an organization
    pub fn is_allowed_for_organization(
        &self,
        resource: Resource,
        operation: Operation,
        target: Option<OrganizationId>,
    ) -> bool {
        let (Some(active), Some(target)) = (self.active, target) else {
            trace!("Denied {}:{} (no session or no organization)", resource, operation);
            return false;
        };

        if self.is_allowed(Scope::Global, resource, operation) {
            return true;
        }
        if target == active.organization_id
            && self.is_allowed(Scope::Organization, resource, operation)
        {
            return true;
        }
        if active.shares_collaboration_with(target)
            && self.is_allowed(Scope::Collaboration, resource, operation)
        {
            return true;
        }

        trace!("Denied {}:{} for organization {}", resource, operation, target);
        false
    }

    /// Check if the user may perform `operation` on `resource` within a collaboration
    pub fn is_allowed_for_collaboration(
        &self,
        resource: Resource,
        operation: Operation,
        collaboration: Option<&Collaboration>,
    ) -> bool {
        let (Some(active), Some(collaboration)) = (self.active, collaboration) else {
            trace!("Denied {}:{} (no session or no collaboration)", resource, operation);
            return false;
        };

        let allowed = self.is_allowed(Scope::Global, resource, operation)
            || (collaboration.includes(active.organization_id)
                && self.is_allowed(Scope::Collaboration, resource, operation));
        if !allowed {
            trace!("Denied {}:{} for collaboration {}", resource, operation, collaboration.id);
        }
        allowed
    }

    /// Check if the user's own privilege is broad enough to hand out a rule at `scope`
    pub fn is_allowed_to_assign_rule_to_role(
        &self,
        scope: Scope,
        resource: Resource,
        operation: Operation,
    ) -> bool {
        let allowed = scopes_covering(scope)
            .into_iter()
            .any(|held| self.is_allowed(held, resource, operation));
        if !allowed {
            trace!("Denied assigning {}:{}:{} to a role", resource, scope, operation);
        }
        allowed
    }

    /// Filter organizations down to those the user may act on
    pub fn allowed_organizations(
        &self,
        resource: Resource,
        operation: Operation,
        known: &[OrganizationId],
    ) -> Vec<OrganizationId> {
        known
            .iter()
            .copied()
            .filter(|org| self.is_allowed_for_organization(resource, operation, Some(*org)))
            .collect()
    }

    /// Check if a route/view requirement is met
    pub fn satisfies(&self, requirement: &Requirement) -> bool {
        self.is_allowed_with_minimum_scope(
            requirement.minimum_scope,
            requirement.resource,
            requirement.operation,
        )
    }

    /// Like [`satisfies`](Self::satisfies), with a reason when denied
    pub fn check(&self, requirement: &Requirement) -> PermissionResult {
        if self.active.is_none() {
            return PermissionResult::Denied("not logged in".to_string());
        }
        if self.satisfies(requirement) {
            PermissionResult::Allowed
        } else {
            PermissionResult::Denied(format!(
                "requires {} {} at scope {} or broader",
                requirement.operation, requirement.resource, requirement.minimum_scope
            ))
        }
    }
}
