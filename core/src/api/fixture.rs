//! In-memory server API backed by a JSON fixture
//!
//! Used for offline demos of the console and as the API in tests.

use super::{CurrentUser, PermissionApi, RuleFilter};
use crate::types::*;
use crate::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A role and the rules it bundles
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub struct FixtureRole {
    pub id: RoleId,
    #[serde(default)]
    pub name: String,
    pub rules: Vec<RuleId>,
}

/// Contents of a fixture file
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub struct FixtureData {
    /// The user every login resolves to
    pub user: CurrentUser,

    /// Full rule catalog
    pub rules: Vec<Rule>,

    /// Ids of the rules granted to `user`
    pub user_rules: Vec<RuleId>,

    #[serde(default)]
    pub roles: Vec<FixtureRole>,

    #[serde(default)]
    pub collaborations: Vec<Collaboration>,
}

/// [`PermissionApi`] answering from a fixture
#[derive(Debug, Clone)]
pub struct StaticApi {
    data: FixtureData,
    authenticated: bool,
}

impl StaticApi {
    /// Serve `data`; the API starts out authenticated
    pub fn new(data: FixtureData) -> Self {
        Self {
            data,
            authenticated: true,
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(Self::new(serde_json::from_str(json)?))
    }

    /// Load a fixture file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn data(&self) -> &FixtureData {
        &self.data
    }

    fn ensure_authenticated(&self) -> Result<()> {
        if self.authenticated {
            Ok(())
        } else {
            Err(Error::NotAuthenticated)
        }
    }

    fn resolve(&self, ids: &[RuleId]) -> Vec<Rule> {
        self.data
            .rules
            .iter()
            .filter(|rule| ids.contains(&rule.id))
            .copied()
            .collect()
    }
}

#[async_trait]
impl PermissionApi for StaticApi {
    async fn authenticate(&mut self, username: &str, _password: &str) -> Result<()> {
        match self.data.user.username.as_deref() {
            Some(expected) if expected != username => {
                Err(Error::Api(format!("unknown user {:?}", username)))
            }
            _ => {
                self.authenticated = true;
                Ok(())
            }
        }
    }

    fn sign_out(&mut self) {
        self.authenticated = false;
    }

    async fn fetch_rules(&self, filter: RuleFilter) -> Result<Vec<Rule>> {
        self.ensure_authenticated()?;
        match filter {
            RuleFilter::All => Ok(self.data.rules.clone()),
            RuleFilter::User(id) if id == self.data.user.id => Ok(self.resolve(&self.data.user_rules)),
            RuleFilter::User(id) => Err(Error::NotFound(format!("user {}", id))),
            RuleFilter::Role(id) => self
                .data
                .roles
                .iter()
                .find(|role| role.id == id)
                .map(|role| self.resolve(&role.rules))
                .ok_or_else(|| Error::NotFound(format!("role {}", id))),
        }
    }

    async fn fetch_current_user(&self) -> Result<CurrentUser> {
        self.ensure_authenticated()?;
        Ok(self.data.user.clone())
    }

    async fn fetch_collaborations(&self, organization_id: OrganizationId) -> Result<Vec<Collaboration>> {
        self.ensure_authenticated()?;
        Ok(self
            .data
            .collaborations
            .iter()
            .filter(|c| c.includes(organization_id))
            .cloned()
            .collect())
    }

    async fn fetch_collaboration(&self, id: CollaborationId) -> Result<Collaboration> {
        self.ensure_authenticated()?;
        self.data
            .collaborations
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("collaboration {}", id)))
    }
}
