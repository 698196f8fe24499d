use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;
use url::Url;
use uuid::Uuid;

use crate::domain::repositories::directory::UserDirectory;

#[derive(Debug, Clone)]
pub struct SupabaseAuthConfig {
    pub project_url: String,
    pub service_key: String,
}

/// Looks users up by e-mail through the Supabase Auth admin API. Service-role
/// key only; never reachable from client credentials.
pub struct SupabaseAuthAdmin {
    http: reqwest::Client,
    users_url: Url,
    service_key: String,
}

#[derive(Debug, Deserialize)]
struct AdminUser {
    id: String,
}

/// The admin endpoint has returned both a bare array and a `{ users: [...] }`
/// envelope across versions; accept either shape.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AdminUsersResponse {
    Envelope { users: Vec<AdminUser> },
    List(Vec<AdminUser>),
}

impl AdminUsersResponse {
    fn first_id(self) -> Option<String> {
        let users = match self {
            AdminUsersResponse::Envelope { users } => users,
            AdminUsersResponse::List(users) => users,
        };
        users.into_iter().next().map(|user| user.id)
    }
}

impl SupabaseAuthAdmin {
    pub fn new(config: SupabaseAuthConfig) -> Result<Self> {
        let base = Url::parse(config.project_url.trim_end_matches('/'))
            .context("SUPABASE_PROJECT_URL is not a valid url")?;
        let users_url = base
            .join("/auth/v1/admin/users")
            .context("failed to build auth admin url")?;

        Ok(Self {
            http: reqwest::Client::new(),
            users_url,
            service_key: config.service_key,
        })
    }
}

#[async_trait]
impl UserDirectory for SupabaseAuthAdmin {
    async fn find_user_id_by_email(&self, email: &str) -> Result<Option<Uuid>> {
        let resp = self
            .http
            .get(self.users_url.clone())
            .query(&[("email", email)])
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
            .send()
            .await
            .context("auth admin lookup request failed")?;

        if !resp.status().is_success() {
            anyhow::bail!("auth admin lookup failed (status {})", resp.status());
        }

        let parsed: AdminUsersResponse = resp
            .json()
            .await
            .context("auth admin response was not valid json")?;

        let user_id = parsed.first_id().and_then(|id| Uuid::parse_str(&id).ok());
        debug!(found = user_id.is_some(), "directory: auth admin email lookup");
        Ok(user_id)
    }
}
