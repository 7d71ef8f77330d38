//! Session-scoped permission context
//!
//! A [`Session`] is built once after authentication and dropped as a whole
//! on logout. It is never patched in place: logging in again fetches
//! everything afresh.

use crate::api::{CurrentUser, PermissionApi, RuleFilter};
use crate::catalog::RuleCatalog;
use crate::permissions::{ActiveUser, Evaluator};
use crate::{Error, Result};
use tracing::{debug, info};

/// Everything the permission engine knows about the logged-in user
#[derive(Debug, Clone)]
pub struct Session {
    /// The user as returned by the server
    pub user: CurrentUser,

    /// All rules defined on the server
    pub catalog: RuleCatalog,

    /// Rules and organization reach of the user
    pub active: ActiveUser,
}

impl Session {
    /// Fetch the catalog, the user, the user's rules and, if the server does
    /// not precompute them, the collaborations around the user's organization
    pub async fn establish(api: &dyn PermissionApi) -> Result<Self> {
        let (all_rules, user) = tokio::try_join!(
            api.fetch_rules(RuleFilter::All),
            api.fetch_current_user()
        )?;
        let catalog = RuleCatalog::new(all_rules);
        let granted = api.fetch_rules(RuleFilter::User(user.id)).await?;

        let active = match &user.shared_organizations {
            Some(shared) => ActiveUser::new(user.id, user.organization_id, granted, shared.iter().copied()),
            None => {
                let collaborations = api.fetch_collaborations(user.organization_id).await?;
                debug!(
                    "Organization {} takes part in {} collaborations",
                    user.organization_id,
                    collaborations.len()
                );
                ActiveUser::from_collaborations(user.id, user.organization_id, granted, &collaborations)
            }
        };

        info!(
            "Session established for user {}: {} of {} rules granted",
            user.id,
            active.rules.len(),
            catalog.len()
        );

        Ok(Self {
            user,
            catalog,
            active,
        })
    }

    pub fn evaluator(&self) -> Evaluator<'_> {
        Evaluator::new(Some(&self.active))
    }
}

/// Owner of the current session, if any
#[derive(Debug, Default)]
pub struct SessionContext {
    session: Option<Session>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace any existing session with a freshly fetched one.
    ///
    /// The old session is dropped before fetching, so a failed login leaves
    /// the context logged out.
    pub async fn login(&mut self, api: &dyn PermissionApi) -> Result<&Session> {
        self.session = None;
        let session = Session::establish(api).await?;
        Ok(self.session.insert(session))
    }

    /// Install a session built elsewhere
    pub fn install(&mut self, session: Session) {
        self.session = Some(session);
    }

    /// Drop the session entirely
    pub fn logout(&mut self) {
        if let Some(session) = self.session.take() {
            info!("Session for user {} closed", session.user.id);
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Session or [`Error::NotAuthenticated`]
    pub fn require(&self) -> Result<&Session> {
        self.session.as_ref().ok_or(Error::NotAuthenticated)
    }

    /// Evaluator over the current session; denies everything when logged out
    pub fn evaluator(&self) -> Evaluator<'_> {
        Evaluator::new(self.session.as_ref().map(|s| &s.active))
    }

    /// Rule catalog of the current session
    pub fn catalog(&self) -> Option<&RuleCatalog> {
        self.session.as_ref().map(|s| &s.catalog)
    }
}
