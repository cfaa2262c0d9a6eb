use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};

use super::error::GitHubError;
use super::types::{LanguageBreakdown, RemoteRepository};

const API_BASE: &str = "https://api.github.com";
const ACCEPT_HEADER: &str = "application/vnd.github.v3+json";
const USER_AGENT_HEADER: &str = concat!("atelier/", env!("CARGO_PKG_VERSION"));

/// The subset of the GitHub REST API the sync service depends on.
///
/// Kept behind a trait so tests can substitute a canned implementation.
#[async_trait]
pub trait GitHubApi: Send + Sync {
    /// Lists the repositories the token can see, most recently updated first.
    async fn list_repositories(&self) -> Result<Vec<RemoteRepository>, GitHubError>;

    async fn get_repository(
        &self,
        owner: &str,
        name: &str,
    ) -> Result<RemoteRepository, GitHubError>;

    async fn get_languages(
        &self,
        owner: &str,
        name: &str,
    ) -> Result<LanguageBreakdown, GitHubError>;
}

pub struct GitHubClient {
    http: reqwest::Client,
    base_url: String,
}

impl GitHubClient {
    /// Builds a client and verifies the access token against the
    /// authenticated-user endpoint before handing it back. A bad token
    /// fails here rather than on the first real request.
    pub async fn connect(token: &str) -> Result<Self, GitHubError> {
        Self::connect_to(API_BASE, token).await
    }

    /// Same as [`connect`](Self::connect) against an alternate base URL.
    pub async fn connect_to(base_url: &str, token: &str) -> Result<Self, GitHubError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_HEADER));
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_HEADER));

        let mut auth = HeaderValue::from_str(&format!("token {token}"))
            .map_err(|_| GitHubError::Authentication { status: 401 })?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let http = reqwest::Client::builder().default_headers(headers).build()?;

        let client = Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        };

        let response = client
            .http
            .get(format!("{}/user", client.base_url))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GitHubError::Authentication {
                status: response.status().as_u16(),
            });
        }

        Ok(client)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, GitHubError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.http.get(&url).send().await?;

        // Authentication errors are the connect-time failure mode; once
        // connected, any non-success status on a data operation surfaces
        // as a plain status error.
        let status = response.status();
        if !status.is_success() {
            return Err(GitHubError::Status {
                status: status.as_u16(),
                url,
            });
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl GitHubApi for GitHubClient {
    async fn list_repositories(&self) -> Result<Vec<RemoteRepository>, GitHubError> {
        self.get_json("/user/repos?sort=updated&direction=desc&per_page=100")
            .await
    }

    async fn get_repository(
        &self,
        owner: &str,
        name: &str,
    ) -> Result<RemoteRepository, GitHubError> {
        self.get_json(&format!("/repos/{owner}/{name}")).await
    }

    async fn get_languages(
        &self,
        owner: &str,
        name: &str,
    ) -> Result<LanguageBreakdown, GitHubError> {
        self.get_json(&format!("/repos/{owner}/{name}/languages"))
            .await
    }
}
