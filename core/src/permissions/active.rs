//! Active-user permission set
//!
//! The rules granted to the logged-in principal together with the
//! organizations the principal can reach: its own and those sharing a
//! collaboration with it.

use crate::types::*;
use std::collections::HashSet;

/// Rules and organization reach of the current principal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveUser {
    /// Logged-in user
    pub user_id: UserId,

    /// The user's own organization
    pub organization_id: OrganizationId,

    /// Rules granted to the user (directly or through roles)
    pub rules: Vec<Rule>,

    /// Organizations sharing at least one collaboration with the user's organization
    pub shared_organizations: HashSet<OrganizationId>,
}

impl ActiveUser {
    pub fn new(
        user_id: UserId,
        organization_id: OrganizationId,
        rules: Vec<Rule>,
        shared_organizations: impl IntoIterator<Item = OrganizationId>,
    ) -> Self {
        Self {
            user_id,
            organization_id,
            rules,
            shared_organizations: shared_organizations.into_iter().collect(),
        }
    }

    /// Derive the shared organizations from the collaborations the server returned.
    ///
    /// Collaborations that do not include the user's organization are ignored.
    pub fn from_collaborations(
        user_id: UserId,
        organization_id: OrganizationId,
        rules: Vec<Rule>,
        collaborations: &[Collaboration],
    ) -> Self {
        let shared = collaborations
            .iter()
            .filter(|c| c.includes(organization_id))
            .flat_map(|c| c.organization_ids.iter().copied());
        Self::new(user_id, organization_id, rules, shared)
    }

    /// Check if some granted rule matches the query key.
    ///
    /// `Any` in the query matches every value of that field.
    pub fn holds(&self, query: RuleKey) -> bool {
        self.rules.iter().any(|rule| {
            query.resource.matches(rule.resource)
                && (query.scope == Scope::Any || query.scope == rule.scope)
                && query.operation.matches(rule.operation)
        })
    }

    /// Check if an organization is reachable through a shared collaboration
    pub fn shares_collaboration_with(&self, organization_id: OrganizationId) -> bool {
        self.shared_organizations.contains(&organization_id)
    }
}
