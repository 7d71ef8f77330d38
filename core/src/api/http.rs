//! HTTP implementation of the server API
//!
//! JSON over HTTPS with a bearer token. List endpoints are paginated; the
//! whole list is collected by walking `page=1..` at a fixed `per_page` until
//! the server returns a short page. A list that does not end within
//! `max_pages` pages is an error rather than a silently truncated catalog.

use super::{CurrentUser, PermissionApi, RuleFilter};
use crate::client::ClientConfig;
use crate::types::*;
use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use tracing::{debug, info};
use zeroize::Zeroize;

/// Tokens issued at login, wiped from memory when dropped
pub struct Credentials {
    access_token: String,
    refresh_token: Option<String>,
    /// User the tokens were issued to
    pub user_id: UserId,
}

impl Credentials {
    pub fn access_token(&self) -> &str {
        &self.access_token
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_token", &"<redacted>")
            .field("user_id", &self.user_id)
            .finish()
    }
}

impl Drop for Credentials {
    fn drop(&mut self) {
        self.access_token.zeroize();
        if let Some(token) = self.refresh_token.as_mut() {
            token.zeroize();
        }
    }
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    user_url: Option<String>,
}

#[derive(Deserialize)]
struct Page<T> {
    data: Vec<T>,
}

#[derive(Deserialize)]
struct IdRef {
    id: u64,
}

#[derive(Deserialize)]
struct UserRecord {
    id: UserId,
    #[serde(default)]
    username: Option<String>,
    organization: IdRef,
}

#[derive(Deserialize)]
struct CollaborationRecord {
    id: CollaborationId,
    name: String,
    #[serde(default)]
    organizations: Vec<IdRef>,
}

impl From<CollaborationRecord> for Collaboration {
    fn from(record: CollaborationRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            organization_ids: record
                .organizations
                .into_iter()
                .map(|org| OrganizationId(org.id))
                .collect(),
        }
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    msg: String,
}

/// Collect a paginated list by requesting pages `1..=max_pages` until one
/// comes back with fewer than `per_page` items
pub async fn collect_pages<T, F, Fut>(per_page: u32, max_pages: u32, mut fetch_page: F) -> Result<Vec<T>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Vec<T>>>,
{
    let per_page = per_page.max(1) as usize;
    let mut items = Vec::new();

    for page in 1..=max_pages {
        let batch = fetch_page(page).await?;
        let last = batch.len() < per_page;
        items.extend(batch);
        if last {
            return Ok(items);
        }
    }

    Err(Error::Api(format!(
        "list did not end within {} pages of {} items",
        max_pages, per_page
    )))
}

/// Extract the user id from a `.../user/<id>` link
fn user_id_from_url(url: &str) -> Option<UserId> {
    url.trim_end_matches('/')
        .rsplit('/')
        .next()
        .and_then(|id| id.parse().ok())
}

/// Server API client over HTTP
pub struct HttpApi {
    client: reqwest::Client,
    base_url: String,
    per_page: u32,
    max_pages: u32,
    credentials: Option<Credentials>,
}

impl HttpApi {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            per_page: config.per_page,
            max_pages: config.max_pages,
            credentials: None,
        })
    }

    /// Credentials from the last successful login
    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn credentials_or_err(&self) -> Result<&Credentials> {
        self.credentials.as_ref().ok_or(Error::NotAuthenticated)
    }

    async fn check(url: &str, response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::UNAUTHORIZED {
            return Err(Error::NotAuthenticated);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .map(|e| e.msg)
            .unwrap_or(body);
        Err(Error::Api(format!("{} returned {}: {}", url, status, message)))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let credentials = self.credentials_or_err()?;
        let url = self.url(path);
        debug!("GET {} {:?}", url, query);

        let response = self
            .client
            .get(&url)
            .bearer_auth(credentials.access_token())
            .query(query)
            .send()
            .await?;

        Ok(Self::check(&url, response).await?.json().await?)
    }

    async fn get_all<T: DeserializeOwned + Send>(&self, path: &str, query: &[(&str, String)]) -> Result<Vec<T>> {
        let per_page = self.per_page;
        collect_pages(per_page, self.max_pages, |page| {
            let mut query = query.to_vec();
            query.push(("page", page.to_string()));
            query.push(("per_page", per_page.to_string()));
            async move {
                let page: Page<T> = self.get_json(path, &query).await?;
                Ok(page.data)
            }
        })
        .await
    }
}

#[async_trait]
impl PermissionApi for HttpApi {
    async fn authenticate(&mut self, username: &str, password: &str) -> Result<()> {
        let url = self.url("token/user");
        let response = self
            .client
            .post(&url)
            .json(&LoginRequest { username, password })
            .send()
            .await?;
        let tokens: TokenResponse = Self::check(&url, response).await?.json().await?;

        let user_id = tokens
            .user_url
            .as_deref()
            .and_then(user_id_from_url)
            .ok_or_else(|| Error::Api("login response did not name the user".to_string()))?;

        info!("Authenticated as user {}", user_id);
        self.credentials = Some(Credentials {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            user_id,
        });
        Ok(())
    }

    fn sign_out(&mut self) {
        self.credentials = None;
    }

    async fn fetch_rules(&self, filter: RuleFilter) -> Result<Vec<Rule>> {
        let query = match filter {
            RuleFilter::All => vec![],
            RuleFilter::Role(id) => vec![("role_id", id.to_string())],
            RuleFilter::User(id) => vec![("user_id", id.to_string())],
        };
        self.get_all("rule", &query).await
    }

    async fn fetch_current_user(&self) -> Result<CurrentUser> {
        let user_id = self.credentials_or_err()?.user_id;
        let record: UserRecord = self.get_json(&format!("user/{}", user_id), &[]).await?;

        Ok(CurrentUser {
            id: record.id,
            username: record.username,
            organization_id: OrganizationId(record.organization.id),
            shared_organizations: None,
        })
    }

    async fn fetch_collaborations(&self, organization_id: OrganizationId) -> Result<Vec<Collaboration>> {
        let records: Vec<CollaborationRecord> = self
            .get_all("collaboration", &[("organization_id", organization_id.to_string())])
            .await?;
        Ok(records.into_iter().map(Collaboration::from).collect())
    }

    async fn fetch_collaboration(&self, id: CollaborationId) -> Result<Collaboration> {
        let record: CollaborationRecord = self.get_json(&format!("collaboration/{}", id), &[]).await?;
        Ok(record.into())
    }
}
