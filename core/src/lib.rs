//! Console Core Library
//!
//! Client-side permission engine for the federated-analysis administrative
//! console. This library re-derives the server's hierarchical rule model
//! (global > collaboration > organization > own) so the console can decide
//! which views and actions the logged-in user may use, and it drives the
//! role permission-matrix editor.

pub mod api;
pub mod catalog;
pub mod client;
pub mod permissions;
pub mod session;
pub mod types;
pub mod version;

pub use catalog::RuleCatalog;
pub use client::{Client, ClientConfig};
pub use permissions::{ActiveUser, CellState, Evaluator, MatrixInputs, PermissionMatrix, Requirement};
pub use session::{Session, SessionContext};
pub use types::*;
pub use version::{version_string, VERSION};

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("API request failed: {0}")]
    Api(String),

    #[error("HTTP transport failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unknown {kind}: {value:?}")]
    UnknownValue { kind: &'static str, value: String },

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("No such cell in the permission matrix: {0}")]
    UnknownCell(RuleKey),

    #[error("Cell cannot be changed: {0}")]
    CellNotEditable(RuleKey),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
