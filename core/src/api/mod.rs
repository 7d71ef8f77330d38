//! Server API collaborators
//!
//! The permission engine only needs a handful of reads from the server: the
//! rule catalog, the rules of a user or role, the current user, and the
//! collaborations around the user's organization. [`PermissionApi`] is that
//! seam; [`HttpApi`] talks to a live server and [`StaticApi`] serves a JSON
//! fixture.

mod fixture;
mod http;

pub use fixture::{FixtureData, FixtureRole, StaticApi};
pub use http::{collect_pages, Credentials, HttpApi};

use crate::types::*;
use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Which rules to fetch
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum RuleFilter {
    /// The whole catalog
    All,
    /// Rules bundled in a role
    Role(RoleId),
    /// Rules granted to a user, directly or through roles
    User(UserId),
}

/// The logged-in user as the server describes it
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub struct CurrentUser {
    pub id: UserId,

    #[serde(default)]
    pub username: Option<String>,

    pub organization_id: OrganizationId,

    /// Organizations sharing a collaboration with the user's organization,
    /// when the server precomputes them
    #[serde(default)]
    pub shared_organizations: Option<Vec<OrganizationId>>,
}

/// Reads the permission engine needs from the server
#[async_trait]
pub trait PermissionApi: Send + Sync {
    /// Obtain credentials for subsequent requests
    async fn authenticate(&mut self, username: &str, password: &str) -> Result<()>;

    /// Forget any credentials held
    fn sign_out(&mut self);

    /// Fetch every rule matching the filter, across all pages
    async fn fetch_rules(&self, filter: RuleFilter) -> Result<Vec<Rule>>;

    /// Fetch the authenticated user
    async fn fetch_current_user(&self) -> Result<CurrentUser>;

    /// Fetch every collaboration an organization takes part in
    async fn fetch_collaborations(&self, organization_id: OrganizationId) -> Result<Vec<Collaboration>>;

    /// Fetch a single collaboration
    async fn fetch_collaboration(&self, id: CollaborationId) -> Result<Collaboration>;
}
