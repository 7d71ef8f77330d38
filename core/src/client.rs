//! Client API for the console
//!
//! High-level API the console front ends use: log in and out, answer
//! permission questions for the current session, and drive a single role
//! permission editor.

use crate::api::{HttpApi, PermissionApi, RuleFilter};
use crate::permissions::{Evaluator, MatrixInputs, PermissionMatrix, RuleChanges};
use crate::session::{Session, SessionContext};
use crate::types::*;
use crate::{Error, Result};

use std::time::Duration;
use tracing::debug;

/// Client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the server API
    pub api_url: String,

    /// Page size used when collecting list endpoints
    pub per_page: u32,

    /// Upper bound on pages fetched for a single list
    pub max_pages: u32,

    /// Timeout for a single HTTP request
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:7601/api".to_string(),
            per_page: 100,
            max_pages: 100,
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Open role editor
#[derive(Debug, Clone)]
pub struct RoleEditor {
    /// Role being edited, `None` for an ad-hoc rule selection
    pub role_id: Option<RoleId>,
    pub matrix: PermissionMatrix,
}

/// Main client for the console
pub struct Client {
    /// Server API
    api: Box<dyn PermissionApi>,

    /// Session of the logged-in user
    context: SessionContext,

    /// Role editor, if one is open
    editor: Option<RoleEditor>,
}

impl Client {
    /// Create a client talking HTTP to the configured server
    pub fn new(config: ClientConfig) -> Result<Self> {
        Ok(Self::with_api(Box::new(HttpApi::new(&config)?)))
    }

    /// Create a client on top of any API implementation
    pub fn with_api(api: Box<dyn PermissionApi>) -> Self {
        Self {
            api,
            context: SessionContext::new(),
            editor: None,
        }
    }

    /// Authenticate and build a fresh session
    pub async fn login(&mut self, username: &str, password: &str) -> Result<&Session> {
        self.logout();
        self.api.authenticate(username, password).await?;
        self.context.login(&*self.api).await
    }

    /// Build a session with whatever credentials the API already holds
    pub async fn resume(&mut self) -> Result<&Session> {
        self.editor = None;
        self.context.login(&*self.api).await
    }

    /// Drop the session, the editor and the API credentials
    pub fn logout(&mut self) {
        self.editor = None;
        self.context.logout();
        self.api.sign_out();
    }

    pub fn is_authenticated(&self) -> bool {
        self.context.is_authenticated()
    }

    pub fn session(&self) -> Option<&Session> {
        self.context.session()
    }

    /// Evaluator over the current session (denies everything when logged out)
    pub fn evaluator(&self) -> Evaluator<'_> {
        self.context.evaluator()
    }

    /// Rules matching the filter; the catalog is served from the session
    pub async fn rules(&self, filter: RuleFilter) -> Result<Vec<Rule>> {
        let session = self.context.require()?;
        match filter {
            RuleFilter::All => Ok(session.catalog.rules().to_vec()),
            RuleFilter::User(id) if id == session.user.id => Ok(session.active.rules.clone()),
            _ => self.api.fetch_rules(filter).await,
        }
    }

    /// Fetch a collaboration for a collaboration-scoped check
    pub async fn collaboration(&self, id: CollaborationId) -> Result<Collaboration> {
        self.context.require()?;
        self.api.fetch_collaboration(id).await
    }

    /// Open the editor for a role: every catalog rule is selectable and the
    /// role's current rules are preselected
    pub async fn open_role_editor(&mut self, role_id: RoleId) -> Result<&PermissionMatrix> {
        let session = self.context.require()?;
        let preselected = self.api.fetch_rules(RuleFilter::Role(role_id)).await?;
        let inputs = MatrixInputs {
            fixed_selected: vec![],
            selectable: session.catalog.rules().to_vec(),
            preselected,
        };
        debug!("Opening editor for role {}", role_id);
        self.open_editor(Some(role_id), inputs)
    }

    /// Open the editor on explicit inputs, replacing any open editor
    pub fn open_editor(&mut self, role_id: Option<RoleId>, inputs: MatrixInputs) -> Result<&PermissionMatrix> {
        let matrix = PermissionMatrix::build(inputs, &self.context.require()?.evaluator());
        let editor = self.editor.insert(RoleEditor { role_id, matrix });
        Ok(&editor.matrix)
    }

    /// Rebuild the open editor from new inputs
    pub fn update_editor(&mut self, inputs: MatrixInputs) -> Result<&PermissionMatrix> {
        let session = self.context.require()?;
        let editor = self.editor.as_mut().ok_or_else(no_editor)?;
        editor.matrix.rebuild(inputs, &session.evaluator());
        Ok(&editor.matrix)
    }

    pub fn editor(&self) -> Option<&RoleEditor> {
        self.editor.as_ref()
    }

    /// Toggle a cell in the open editor and return the new rule list
    pub fn toggle(&mut self, key: RuleKey) -> Result<Vec<Rule>> {
        self.editor.as_mut().ok_or_else(no_editor)?.matrix.toggle(key)
    }

    /// Restore the open editor's initial selection
    pub fn reset_editor(&mut self) -> Result<Vec<Rule>> {
        Ok(self.editor.as_mut().ok_or_else(no_editor)?.matrix.reset())
    }

    /// Pending changes of the open editor
    pub fn editor_changes(&self) -> Result<RuleChanges> {
        Ok(self.editor.as_ref().ok_or_else(no_editor)?.matrix.changes())
    }

    pub fn close_editor(&mut self) {
        self.editor = None;
    }
}

fn no_editor() -> Error {
    Error::NotFound("no role editor is open".to_string())
}
