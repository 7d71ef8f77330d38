//! Permissions and access control module
//!
//! Client-side evaluation of the server's hierarchical rule model and the
//! state machine behind the role permission editor.
//!
//! - [`scope`]: which scopes satisfy or cover a given scope
//! - [`ActiveUser`]: rules and organization reach of the logged-in user
//! - [`Evaluator`]: allow/deny predicates used by guards and views
//! - [`PermissionMatrix`]: resource x scope x operation grid with cascading selection

mod active;
mod evaluator;
pub mod matrix;
pub mod scope;

#[cfg(test)]
mod property_tests;

pub use active::ActiveUser;
pub use evaluator::{Evaluator, Requirement};
pub use matrix::{CellState, MatrixCell, MatrixInputs, MatrixRow, PermissionMatrix, RuleChanges};
pub use scope::{scopes_covering, scopes_satisfying};

/// Permission check result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionResult {
    /// Permission granted
    Allowed,
    /// Permission denied with reason
    Denied(String),
}

impl PermissionResult {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }

    pub fn is_denied(&self) -> bool {
        !self.is_allowed()
    }

    pub fn deny_reason(&self) -> Option<&str> {
        match self {
            Self::Denied(reason) => Some(reason),
            _ => None,
        }
    }
}
