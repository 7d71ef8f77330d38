//! Dashboard Backend
//!
//! Owns one console session and exposes permission checks and the role
//! permission grid to the browser console as a JSON API.

use anyhow::Context;
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use clap::Parser;
use console_core::api::StaticApi;
use console_core::permissions::{MatrixRow, RuleChanges};
use console_core::{
    Client, ClientConfig, CollaborationId, MatrixInputs, Operation, OrganizationId, Resource,
    RoleId, Rule, RuleId, RuleKey, Scope, UserId,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server API base URL
    #[arg(short = 'u', long, default_value = "http://localhost:7601/api")]
    api_url: String,

    /// Serve a JSON fixture instead of talking to a server
    #[arg(short, long, conflicts_with = "api_url")]
    fixture: Option<PathBuf>,

    /// Address to listen on
    #[arg(short, long, default_value = "127.0.0.1:3030")]
    listen: String,

    /// Page size for list requests
    #[arg(long, default_value_t = 100)]
    per_page: u32,

    /// Maximum pages fetched for a single list
    #[arg(long, default_value_t = 100)]
    max_pages: u32,
}

/// Shared state: the one client whose session the dashboard shows
#[derive(Clone)]
struct AppState {
    client: Arc<RwLock<Client>>,
}

/// Envelope for every response
#[derive(Debug, Serialize)]
struct ApiResponse {
    success: bool,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    username: String,
    #[serde(default)]
    password: String,
}

#[derive(Debug, Serialize)]
struct SessionInfo {
    authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_id: Option<UserId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    organization_id: Option<OrganizationId>,
    shared_organizations: Vec<OrganizationId>,
    granted_rules: usize,
    catalog_rules: usize,
}

/// Permission question, one variant per evaluator predicate
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Check {
    Scope {
        scope: Scope,
        resource: Resource,
        operation: Operation,
    },
    MinimumScope {
        scope: Scope,
        resource: Resource,
        operation: Operation,
    },
    Organization {
        resource: Resource,
        operation: Operation,
        #[serde(default)]
        organization_id: Option<OrganizationId>,
    },
    Collaboration {
        resource: Resource,
        operation: Operation,
        #[serde(default)]
        collaboration_id: Option<CollaborationId>,
    },
    Assign {
        scope: Scope,
        resource: Resource,
        operation: Operation,
    },
}

#[derive(Debug, Serialize)]
struct CheckResult {
    allowed: bool,
}

/// Grid inputs: a role to edit, or explicit rule-id lists
#[derive(Debug, Deserialize)]
struct MatrixRequest {
    #[serde(default)]
    role_id: Option<RoleId>,
    #[serde(default)]
    fixed_selected: Vec<RuleId>,
    /// Defaults to the whole catalog
    #[serde(default)]
    selectable: Option<Vec<RuleId>>,
    #[serde(default)]
    preselected: Vec<RuleId>,
}

#[derive(Debug, Serialize)]
struct MatrixView {
    #[serde(skip_serializing_if = "Option::is_none")]
    role_id: Option<RoleId>,
    rows: Vec<MatrixRow>,
    selected_rules: Vec<Rule>,
    changes: RuleChanges,
}

#[derive(Debug, Serialize)]
struct VersionInfo {
    version: &'static str,
    banner: String,
    build: &'static str,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dashboard_backend=debug,console_core=info".into()),
        )
        .init();

    let args = Args::parse();

    info!("🚀 Starting Dashboard Backend ({})", console_core::version_string());

    let client = match &args.fixture {
        Some(path) => {
            let api = StaticApi::load(path)
                .with_context(|| format!("Failed to load fixture: {}", path.display()))?;
            info!("📁 Serving fixture {}", path.display());
            Client::with_api(Box::new(api))
        }
        None => {
            let config = ClientConfig {
                api_url: args.api_url.clone(),
                per_page: args.per_page,
                max_pages: args.max_pages,
                request_timeout: Duration::from_secs(30),
            };
            info!("🌐 Using server API at {}", config.api_url);
            Client::new(config)?
        }
    };

    let app = router(AppState {
        client: Arc::new(RwLock::new(client)),
    });

    let listener = tokio::net::TcpListener::bind(&args.listen)
        .await
        .with_context(|| format!("Failed to bind {}", args.listen))?;

    info!("🎯 Dashboard backend listening on http://{}", args.listen);
    info!("💡 REST API at http://{}/api/*", args.listen);

    axum::serve(listener, app).await?;

    Ok(())
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/session", get(session_handler))
        .route("/api/login", post(login_handler))
        .route("/api/logout", post(logout_handler))
        .route("/api/check", post(check_handler))
        .route("/api/matrix", post(matrix_handler))
        .route("/api/matrix/toggle", post(toggle_handler))
        .route("/api/version", get(version_handler))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Turn a handler result into the response envelope
fn respond<T: Serialize>(message: &str, result: anyhow::Result<T>) -> Json<ApiResponse> {
    let result = result.and_then(|data| Ok(serde_json::to_value(data)?));
    match result {
        Ok(data) => Json(ApiResponse {
            success: true,
            message: message.to_string(),
            data: Some(data),
        }),
        Err(e) => {
            error!("{} failed: {:#}", message, e);
            Json(ApiResponse {
                success: false,
                message: format!("{} failed: {:#}", message, e),
                data: None,
            })
        }
    }
}

fn session_info(client: &Client) -> SessionInfo {
    match client.session() {
        Some(session) => {
            let mut shared: Vec<OrganizationId> =
                session.active.shared_organizations.iter().copied().collect();
            shared.sort();
            SessionInfo {
                authenticated: true,
                user_id: Some(session.user.id),
                username: session.user.username.clone(),
                organization_id: Some(session.user.organization_id),
                shared_organizations: shared,
                granted_rules: session.active.rules.len(),
                catalog_rules: session.catalog.len(),
            }
        }
        None => SessionInfo {
            authenticated: false,
            user_id: None,
            username: None,
            organization_id: None,
            shared_organizations: vec![],
            granted_rules: 0,
            catalog_rules: 0,
        },
    }
}

fn matrix_view(client: &Client) -> anyhow::Result<MatrixView> {
    let editor = client.editor().context("No matrix is open")?;
    Ok(MatrixView {
        role_id: editor.role_id,
        rows: editor.matrix.rows(),
        selected_rules: editor.matrix.selected_rules(),
        changes: editor.matrix.changes(),
    })
}

async fn session_handler(State(state): State<AppState>) -> Json<ApiResponse> {
    let client = state.client.read().await;
    respond("Session", Ok(session_info(&client)))
}

async fn login_handler(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Json<ApiResponse> {
    info!("🔑 Login request for {}", request.username);
    let mut client = state.client.write().await;
    let result = client
        .login(&request.username, &request.password)
        .await
        .map(|_| ())
        .map_err(anyhow::Error::from);
    respond("Login", result.map(|()| session_info(&client)))
}

async fn logout_handler(State(state): State<AppState>) -> Json<ApiResponse> {
    let mut client = state.client.write().await;
    client.logout();
    respond("Logout", Ok(session_info(&client)))
}

async fn check_handler(
    State(state): State<AppState>,
    Json(check): Json<Check>,
) -> Json<ApiResponse> {
    let client = state.client.read().await;
    respond("Check", evaluate(&client, check).await)
}

async fn evaluate(client: &Client, check: Check) -> anyhow::Result<CheckResult> {
    let allowed = match check {
        Check::Scope {
            scope,
            resource,
            operation,
        } => client.evaluator().is_allowed(scope, resource, operation),
        Check::MinimumScope {
            scope,
            resource,
            operation,
        } => client
            .evaluator()
            .is_allowed_with_minimum_scope(scope, resource, operation),
        Check::Organization {
            resource,
            operation,
            organization_id,
        } => client
            .evaluator()
            .is_allowed_for_organization(resource, operation, organization_id),
        Check::Collaboration {
            resource,
            operation,
            collaboration_id,
        } => {
            let collaboration = match collaboration_id {
                Some(id) if client.is_authenticated() => Some(client.collaboration(id).await?),
                _ => None,
            };
            client
                .evaluator()
                .is_allowed_for_collaboration(resource, operation, collaboration.as_ref())
        }
        Check::Assign {
            scope,
            resource,
            operation,
        } => client
            .evaluator()
            .is_allowed_to_assign_rule_to_role(scope, resource, operation),
    };
    Ok(CheckResult { allowed })
}

async fn matrix_handler(
    State(state): State<AppState>,
    Json(request): Json<MatrixRequest>,
) -> Json<ApiResponse> {
    let mut client = state.client.write().await;
    respond("Matrix", open_matrix(&mut client, request).await)
}

async fn open_matrix(client: &mut Client, request: MatrixRequest) -> anyhow::Result<MatrixView> {
    match request.role_id {
        Some(role_id) => {
            client.open_role_editor(role_id).await?;
        }
        None => {
            let catalog = client
                .session()
                .map(|session| &session.catalog)
                .context("Not authenticated")?;
            let inputs = MatrixInputs {
                fixed_selected: catalog.resolve(&request.fixed_selected),
                selectable: match &request.selectable {
                    Some(ids) => catalog.resolve(ids),
                    None => catalog.rules().to_vec(),
                },
                preselected: catalog.resolve(&request.preselected),
            };
            client.open_editor(None, inputs)?;
        }
    }
    matrix_view(client)
}

async fn toggle_handler(
    State(state): State<AppState>,
    Json(key): Json<RuleKey>,
) -> Json<ApiResponse> {
    let mut client = state.client.write().await;
    let result = client
        .toggle(key)
        .map_err(anyhow::Error::from)
        .and_then(|_| matrix_view(&client));
    respond("Toggle", result)
}

async fn version_handler() -> Json<ApiResponse> {
    respond(
        "Version",
        Ok(VersionInfo {
            version: console_core::VERSION,
            banner: console_core::version_string(),
            build: console_core::version::BUILD_PROFILE,
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    const FIXTURE: &str = include_str!("../../../core/tests/fixtures/console.json");

    fn app() -> Router {
        let api = StaticApi::from_json(FIXTURE).unwrap();
        router(AppState {
            client: Arc::new(RwLock::new(Client::with_api(Box::new(api)))),
        })
    }

    async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> Value {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(match body {
                Some(body) => Body::from(body.to_string()),
                None => Body::empty(),
            })
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn login(app: &Router) {
        let body = json!({ "username": "org-admin", "password": "secret" });
        let response = call(app, Method::POST, "/api/login", Some(body)).await;
        assert_eq!(response["success"], true);
    }

    #[tokio::test]
    async fn test_session_lifecycle() {
        let app = app();

        let response = call(&app, Method::GET, "/api/session", None).await;
        assert_eq!(response["data"]["authenticated"], false);

        login(&app).await;
        let response = call(&app, Method::GET, "/api/session", None).await;
        assert_eq!(response["data"]["authenticated"], true);
        assert_eq!(response["data"]["organization_id"], 5);
        assert_eq!(response["data"]["catalog_rules"], 33);

        call(&app, Method::POST, "/api/logout", None).await;
        let response = call(&app, Method::GET, "/api/session", None).await;
        assert_eq!(response["data"]["authenticated"], false);
    }

    #[tokio::test]
    async fn test_checks_fail_closed_then_answer() {
        let app = app();
        let check = json!({
            "type": "organization",
            "resource": "task",
            "operation": "create",
            "organization_id": 7
        });

        let response = call(&app, Method::POST, "/api/check", Some(check.clone())).await;
        assert_eq!(response["data"]["allowed"], false);

        login(&app).await;
        let response = call(&app, Method::POST, "/api/check", Some(check)).await;
        assert_eq!(response["data"]["allowed"], true);

        let check = json!({
            "type": "collaboration",
            "resource": "task",
            "operation": "create",
            "collaboration_id": 3
        });
        let response = call(&app, Method::POST, "/api/check", Some(check)).await;
        assert_eq!(response["data"]["allowed"], false);

        let check = json!({
            "type": "minimum_scope",
            "scope": "OWN",
            "resource": "Task",
            "operation": "create"
        });
        let response = call(&app, Method::POST, "/api/check", Some(check)).await;
        assert_eq!(response["data"]["allowed"], true);
    }

    #[tokio::test]
    async fn test_unknown_scope_is_rejected() {
        let app = app();
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/check")
            .header("content-type", "application/json")
            .body(Body::from(
                json!({"type": "scope", "scope": "galactic", "resource": "task", "operation": "view"})
                    .to_string(),
            ))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert!(response.status().is_client_error());
    }

    #[tokio::test]
    async fn test_role_matrix_toggle() {
        let app = app();
        login(&app).await;

        let response = call(&app, Method::POST, "/api/matrix", Some(json!({ "role_id": 3 }))).await;
        assert_eq!(response["success"], true);
        assert_eq!(response["data"]["selected_rules"].as_array().unwrap().len(), 4);

        let key = json!({ "resource": "task", "scope": "collaboration", "operation": "view" });
        let response = call(&app, Method::POST, "/api/matrix/toggle", Some(key)).await;
        assert_eq!(response["success"], true);
        assert_eq!(response["data"]["selected_rules"].as_array().unwrap().len(), 2);
        assert_eq!(response["data"]["changes"]["removed"].as_array().unwrap().len(), 2);

        let key = json!({ "resource": "task", "scope": "global", "operation": "view" });
        let response = call(&app, Method::POST, "/api/matrix/toggle", Some(key)).await;
        assert_eq!(response["success"], false);
    }

    #[tokio::test]
    async fn test_matrix_from_rule_ids() {
        let app = app();
        login(&app).await;

        let body = json!({ "selectable": [1, 2], "preselected": [1] });
        let response = call(&app, Method::POST, "/api/matrix", Some(body)).await;
        assert_eq!(response["success"], true);
        assert_eq!(response["data"]["rows"].as_array().unwrap().len(), 1);
        assert_eq!(response["data"]["selected_rules"][0]["id"], 1);
    }

    #[tokio::test]
    async fn test_version() {
        let response = call(&app(), Method::GET, "/api/version", None).await;
        assert_eq!(response["data"]["version"], console_core::VERSION);
    }
}
