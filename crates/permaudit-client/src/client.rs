//! REST client implementing the permaudit fetcher traits

use crate::config::{Credentials, ServerConfig};
use crate::wire::{
    nested_list, ErrorEnvelope, PermissionsEnvelope, ProjectsEnvelope, SignInCredentials,
    SignInRequest, SignInResponse, SiteRef, WireAsset, WireGroup, WireUser, WireView,
};
use async_trait::async_trait;
use permaudit_core::{
    AssetSummary, AuditError, ContentKind, DirectoryFetcher, GroupMember, PermissionFetcher,
    PermissionRule, ProjectSummary, Result, ViewSummary,
};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use tracing::{debug, info, instrument, warn};

const AUTH_HEADER: &str = "X-Tableau-Auth";

/// Authenticated session state
#[derive(Clone)]
struct Session {
    token: String,
    site_id: String,
    user_id: Option<String>,
}

/// Client for the remote service's REST API
#[derive(Clone)]
pub struct RestClient {
    http: Client,
    config: ServerConfig,
    session: Option<Session>,
}

impl RestClient {
    /// Create an unauthenticated client
    pub fn new(config: ServerConfig) -> Result<Self> {
        config.validate()?;
        let http = Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!("permaudit/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AuditError::internal(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            config,
            session: None,
        })
    }

    /// Connection configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Id of the signed-in user, if the service reported one
    pub fn user_id(&self) -> Option<&str> {
        self.session.as_ref().and_then(|s| s.user_id.as_deref())
    }

    /// Sign in with a personal access token
    #[instrument(skip(self, credentials), fields(site = %self.config.site))]
    pub async fn sign_in(&mut self, credentials: &Credentials) -> Result<()> {
        let url = format!("{}/auth/signin", self.config.api_url());
        let body = SignInRequest {
            credentials: SignInCredentials {
                personal_access_token_name: &credentials.token_name,
                personal_access_token_secret: &credentials.token_secret,
                site: SiteRef {
                    content_url: &self.config.site,
                },
            },
        };

        let response = self
            .http
            .post(&url)
            .header("Accept", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(map_transport_error)?;
        let response: SignInResponse = decode(check_status(response).await?).await?;

        if response.credentials.token.is_empty() || response.credentials.site.id.is_empty() {
            return Err(AuditError::auth(
                "sign-in response did not carry a token and site",
            ));
        }

        self.session = Some(Session {
            token: response.credentials.token,
            site_id: response.credentials.site.id,
            user_id: response.credentials.user.map(|u| u.id),
        });
        info!(user = self.user_id().unwrap_or("-"), "signed in");
        Ok(())
    }

    /// Sign out; failures are logged and otherwise ignored
    pub async fn sign_out(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        let url = format!("{}/auth/signout", self.config.api_url());
        match self
            .http
            .post(&url)
            .header(AUTH_HEADER, &session.token)
            .send()
            .await
        {
            Ok(_) => debug!("signed out"),
            Err(e) => warn!(error = %e, "sign-out failed"),
        }
    }

    fn session(&self) -> Result<&Session> {
        self.session
            .as_ref()
            .ok_or_else(|| AuditError::auth("not signed in"))
    }

    fn site_url(&self, path: &str) -> Result<String> {
        let session = self.session()?;
        Ok(format!(
            "{}/sites/{}/{}",
            self.config.api_url(),
            session.site_id,
            path
        ))
    }

    fn get(&self, url: &str) -> Result<RequestBuilder> {
        let session = self.session()?;
        Ok(self
            .http
            .get(url)
            .header(AUTH_HEADER, &session.token)
            .header("Accept", "application/json"))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.site_url(path)?;
        debug!(%url, "GET");
        let response = self.get(&url)?.send().await.map_err(map_transport_error)?;
        decode(check_status(response).await?).await
    }

    async fn get_listing<T: DeserializeOwned>(
        &self,
        path: &str,
        outer: &str,
        inner: &str,
    ) -> Result<Vec<T>> {
        let path = format!("{path}?pageSize={}", self.config.page_size);
        let body: serde_json::Value = self.get_json(&path).await?;
        nested_list(&body, outer, inner)
    }

    async fn get_rules(&self, path: &str) -> Result<Vec<PermissionRule>> {
        let envelope: PermissionsEnvelope = self.get_json(path).await?;
        envelope.into_rules()
    }
}

fn resource_segment(kind: ContentKind) -> Result<&'static str> {
    match kind {
        ContentKind::Workbook => Ok("workbooks"),
        ContentKind::Datasource => Ok("datasources"),
        ContentKind::View => Ok("views"),
        ContentKind::Flow => Ok("flows"),
        other => Err(AuditError::invalid(format!(
            "no per-resource permission endpoint for {other}"
        ))),
    }
}

fn listing_keys(kind: ContentKind) -> Result<(&'static str, &'static str, &'static str)> {
    match kind {
        ContentKind::Workbook => Ok(("workbooks", "workbooks", "workbook")),
        ContentKind::Datasource => Ok(("datasources", "datasources", "datasource")),
        ContentKind::Flow => Ok(("flows", "flows", "flow")),
        other => Err(AuditError::invalid(format!("cannot list {other} as assets"))),
    }
}

/// Map a response status onto the error taxonomy
pub(crate) fn status_error(status: StatusCode, message: String) -> AuditError {
    match status {
        StatusCode::UNAUTHORIZED => AuditError::auth(message),
        // Per-resource refusal, e.g. databases on sites without Data Management.
        StatusCode::FORBIDDEN => AuditError::forbidden(message),
        // Unsupported default-permission paths answer 400 on some versions.
        StatusCode::NOT_FOUND | StatusCode::BAD_REQUEST => AuditError::not_found(message),
        other => AuditError::remote(other.as_u16(), message),
    }
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let url = response.url().path().to_string();
    let body = response.bytes().await.unwrap_or_default();
    let detail = serde_json::from_slice::<ErrorEnvelope>(&body)
        .map(|e| e.error.describe())
        .unwrap_or_else(|_| String::from_utf8_lossy(&body).into_owned());
    Err(status_error(status, format!("{url}: {detail}")))
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let bytes = response.bytes().await.map_err(map_transport_error)?;
    serde_json::from_slice(&bytes).map_err(|e| {
        debug!(body = %String::from_utf8_lossy(&bytes), "failed to parse response");
        AuditError::serialization(e.to_string())
    })
}

fn map_transport_error(err: reqwest::Error) -> AuditError {
    if err.is_timeout() {
        AuditError::timeout(err.to_string())
    } else if let Some(status) = err.status() {
        status_error(status, err.to_string())
    } else if err.is_decode() || err.is_body() {
        AuditError::serialization(err.to_string())
    } else {
        AuditError::transport(err.to_string())
    }
}

#[async_trait]
impl PermissionFetcher for RestClient {
    #[instrument(skip(self))]
    async fn project_permissions(&self, project_id: &str) -> Result<Vec<PermissionRule>> {
        self.get_rules(&format!("projects/{project_id}/permissions"))
            .await
    }

    #[instrument(skip(self))]
    async fn default_permissions(&self, project_id: &str, path: &str) -> Result<Vec<PermissionRule>> {
        self.get_rules(&format!(
            "projects/{project_id}/default-permissions/{path}"
        ))
        .await
    }

    #[instrument(skip(self))]
    async fn resource_permissions(&self, kind: ContentKind, id: &str) -> Result<Vec<PermissionRule>> {
        let segment = resource_segment(kind)?;
        self.get_rules(&format!("{segment}/{id}/permissions")).await
    }
}

#[async_trait]
impl DirectoryFetcher for RestClient {
    async fn list_projects(&self) -> Result<Vec<ProjectSummary>> {
        let path = format!("projects?pageSize={}", self.config.page_size);
        let envelope: ProjectsEnvelope = self.get_json(&path).await?;
        Ok(envelope
            .projects
            .project
            .into_iter()
            .map(ProjectSummary::from)
            .collect())
    }

    async fn list_assets(&self, kind: ContentKind) -> Result<Vec<AssetSummary>> {
        let (path, outer, inner) = listing_keys(kind)?;
        let assets: Vec<WireAsset> = self.get_listing(path, outer, inner).await?;
        Ok(assets.into_iter().map(AssetSummary::from).collect())
    }

    async fn list_views(&self) -> Result<Vec<ViewSummary>> {
        let views: Vec<WireView> = self.get_listing("views", "views", "view").await?;
        Ok(views.into_iter().map(ViewSummary::from).collect())
    }

    async fn users(&self) -> Result<HashMap<String, String>> {
        let users: Vec<WireUser> = self.get_listing("users", "users", "user").await?;
        Ok(users
            .into_iter()
            .filter(|u| !u.id.is_empty() && !u.name.is_empty())
            .map(|u| (u.id, u.name))
            .collect())
    }

    async fn groups(&self) -> Result<HashMap<String, String>> {
        let groups: Vec<WireGroup> = self.get_listing("groups", "groups", "group").await?;
        Ok(groups
            .into_iter()
            .filter(|g| !g.id.is_empty() && !g.name.is_empty())
            .map(|g| (g.id, g.name))
            .collect())
    }

    async fn group_members(&self, group_id: &str) -> Result<Vec<GroupMember>> {
        let users: Vec<WireUser> = self
            .get_listing(&format!("groups/{group_id}/users"), "users", "user")
            .await?;
        Ok(users.into_iter().map(GroupMember::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn client() -> RestClient {
        RestClient::new(ServerConfig {
            url: "https://tableau.example.com".to_string(),
            ..ServerConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_status_mapping() {
        assert_matches!(
            status_error(StatusCode::UNAUTHORIZED, String::new()),
            AuditError::Auth { .. }
        );
        let forbidden = status_error(StatusCode::FORBIDDEN, String::new());
        assert_matches!(forbidden, AuditError::Forbidden { .. });
        assert!(!forbidden.is_fatal());
        assert_matches!(
            status_error(StatusCode::NOT_FOUND, String::new()),
            AuditError::NotFound { .. }
        );
        assert_matches!(
            status_error(StatusCode::BAD_REQUEST, String::new()),
            AuditError::NotFound { .. }
        );
        assert_matches!(
            status_error(StatusCode::INTERNAL_SERVER_ERROR, String::new()),
            AuditError::Remote { status: 500, .. }
        );
    }

    #[test]
    fn test_requests_require_session() {
        let client = client();
        assert_matches!(client.site_url("projects"), Err(AuditError::Auth { .. }));
        assert!(client.user_id().is_none());
    }

    #[tokio::test]
    async fn test_fetch_before_sign_in_is_fatal() {
        let client = client();
        let err = client.project_permissions("p-1").await.unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_resource_segments() {
        assert_eq!(resource_segment(ContentKind::View).unwrap(), "views");
        assert!(resource_segment(ContentKind::Project).is_err());
        assert!(listing_keys(ContentKind::View).is_err());
    }
}
