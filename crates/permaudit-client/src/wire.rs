//! JSON payloads of the REST API
//!
//! The API wraps every list in a singular-named object
//! (`{"projects": {"project": [...]}}`) and omits the inner array when the
//! list is empty, so every level defaults.

use permaudit_core::{
    AssetSummary, AuditError, Capability, Grantee, GroupMember, PermissionRule, ProjectSummary,
    Result, ViewSummary,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SignInRequest<'a> {
    pub credentials: SignInCredentials<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SignInCredentials<'a> {
    pub personal_access_token_name: &'a str,
    pub personal_access_token_secret: &'a str,
    pub site: SiteRef<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SiteRef<'a> {
    pub content_url: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SignInResponse {
    pub credentials: SessionCredentials,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SessionCredentials {
    pub token: String,
    pub site: IdRef,
    #[serde(default)]
    pub user: Option<IdRef>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct IdRef {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorEnvelope {
    pub error: ApiError,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiError {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
}

impl ApiError {
    pub(crate) fn describe(&self) -> String {
        let mut parts = Vec::new();
        if let Some(code) = &self.code {
            parts.push(format!("[{code}]"));
        }
        if let Some(summary) = &self.summary {
            parts.push(summary.clone());
        }
        if let Some(detail) = &self.detail {
            parts.push(detail.clone());
        }
        parts.join(" ")
    }
}

// Permissions

#[derive(Debug, Default, Deserialize)]
pub(crate) struct PermissionsEnvelope {
    #[serde(default)]
    pub permissions: PermissionsBody,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PermissionsBody {
    #[serde(default)]
    pub grantee_capabilities: Vec<GranteeCapabilities>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GranteeCapabilities {
    #[serde(default)]
    pub user: Option<IdRef>,
    #[serde(default)]
    pub group: Option<IdRef>,
    #[serde(default)]
    pub capabilities: CapabilityList,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct CapabilityList {
    #[serde(default)]
    pub capability: Vec<WireCapability>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireCapability {
    pub name: String,
    pub mode: String,
}

impl PermissionsEnvelope {
    /// Convert into rules; entries naming neither a user nor a group are skipped
    pub(crate) fn into_rules(self) -> Result<Vec<PermissionRule>> {
        let mut rules = Vec::new();
        for entry in self.permissions.grantee_capabilities {
            let grantee = match (entry.user, entry.group) {
                (Some(user), _) => Grantee::user(user.id),
                (None, Some(group)) => Grantee::group(group.id),
                (None, None) => {
                    tracing::debug!("skipping grantee entry without user or group");
                    continue;
                }
            };
            let capabilities = entry
                .capabilities
                .capability
                .into_iter()
                .map(|cap| Ok(Capability::new(cap.name, cap.mode.parse()?)))
                .collect::<Result<Vec<_>>>()?;
            rules.push(PermissionRule::new(grantee, capabilities));
        }
        Ok(rules)
    }
}

// Listings

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ProjectsEnvelope {
    #[serde(default)]
    pub projects: ProjectList,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ProjectList {
    #[serde(default)]
    pub project: Vec<WireProject>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireProject {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub parent_project_id: Option<String>,
    #[serde(default)]
    pub content_permissions: Option<String>,
}

impl From<WireProject> for ProjectSummary {
    fn from(p: WireProject) -> Self {
        ProjectSummary {
            id: p.id,
            name: p.name,
            parent_project_id: p.parent_project_id,
            content_permissions: p.content_permissions,
        }
    }
}

/// A workbook, data source or flow entry; the list key differs per kind
#[derive(Debug, Deserialize)]
pub(crate) struct WireAsset {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub project: Option<IdRef>,
}

impl From<WireAsset> for AssetSummary {
    fn from(a: WireAsset) -> Self {
        let (project_id, project_name) = match a.project {
            Some(project) => (Some(project.id), project.name),
            None => (None, None),
        };
        AssetSummary {
            id: a.id,
            name: a.name,
            project_id,
            project_name,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireView {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub workbook: Option<IdRef>,
}

impl From<WireView> for ViewSummary {
    fn from(v: WireView) -> Self {
        ViewSummary {
            id: v.id,
            name: v.name,
            workbook_id: v.workbook.map(|w| w.id),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireUser {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
}

impl From<WireUser> for GroupMember {
    fn from(u: WireUser) -> Self {
        GroupMember {
            id: u.id,
            name: u.name,
            email: u.email.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireGroup {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// Pull `body[outer][inner]` out as a list, treating missing levels as empty
pub(crate) fn nested_list<T: serde::de::DeserializeOwned>(
    body: &serde_json::Value,
    outer: &str,
    inner: &str,
) -> Result<Vec<T>> {
    match body.get(outer).and_then(|v| v.get(inner)) {
        Some(list) => serde_json::from_value(list.clone())
            .map_err(|e| AuditError::serialization(format!("malformed {outer} listing: {e}"))),
        None => Ok(Vec::new()),
    }
}
