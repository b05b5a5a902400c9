//! Pulumi Cloud REST client.
//!
//! This module provides the HTTP implementation of [`PulumiServiceApi`].

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, Method, Response, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, trace};

use crate::error::ApiError;
use crate::id::{EnvironmentId, StackName};

use super::api::{ApiResult, PulumiServiceApi};
use super::types::{
    AuthPolicy, AuthPolicyDefinition, AuthPolicyUpdateRequest, CreateEnvironmentRequest,
    CreateTeamRequest, DeploymentScheduleRequest, DeploymentSettings, DiagnosticsResponse,
    DriftScheduleRequest, EnvironmentDefinition, EnvironmentDiagnostic, EnvironmentRevisionTag,
    ErrorResponse, OidcIssuer, OidcIssuerRegistrationRequest, OidcIssuerUpdateRequest,
    ScheduleResponse, StackTag, StackTagsResponse, Team, TeamEnvironmentPermission,
    TeamGrantPatch, TeamStackPermission, TemplateSource, TemplateSourceList,
    TemplateSourceRequest, TtlScheduleRequest, UpdateEnvironmentResponse,
    UpdateRevisionTagRequest, UpdateTeamMembershipRequest, UpdateTeamRequest,
};

/// Default Pulumi Cloud URL.
pub const DEFAULT_SERVICE_URL: &str = "https://api.pulumi.com";

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// API version negotiated through the `Accept` header.
const ACCEPT_VERSION: &str = "application/vnd.pulumi+8";

/// Header identifying the caller to the service.
const SOURCE_HEADER: &str = "X-Pulumi-Source";

/// Header carrying the revision of a fetched environment.
const REVISION_HEADER: &str = "Pulumi-ESC-Revision";

/// Request body variants.
enum Body<'a> {
    Empty,
    Json(serde_json::Value),
    Yaml(&'a str),
}

impl Body<'_> {
    fn json<T: Serialize + ?Sized>(body: &T) -> ApiResult<Self> {
        serde_json::to_value(body)
            .map(Body::Json)
            .map_err(|e| ApiError::invalid_request(format!("Failed to encode request: {e}")))
    }
}

/// Pulumi Cloud API client.
#[derive(Debug, Clone)]
pub struct PulumiClient {
    /// HTTP client.
    client: Client,
    /// `{service_url}/api/`.
    base_url: Url,
    /// Access token.
    access_token: String,
}

impl PulumiClient {
    /// Creates a client for the given service URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is malformed or the HTTP client cannot be created.
    pub fn new(service_url: &str, access_token: &str) -> ApiResult<Self> {
        Self::with_timeout(service_url, access_token, DEFAULT_TIMEOUT_SECS)
    }

    /// Creates a client with a custom timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is malformed or the HTTP client cannot be created.
    pub fn with_timeout(service_url: &str, access_token: &str, timeout_secs: u64) -> ApiResult<Self> {
        let mut base_url = Url::parse(service_url).map_err(|e| {
            ApiError::invalid_request(format!("invalid service URL {service_url:?}: {e}"))
        })?;
        let api_path = format!("{}/api/", base_url.path().trim_end_matches('/'));
        base_url.set_path(&api_path);

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ApiError::network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url,
            access_token: access_token.to_string(),
        })
    }

    /// Returns the API root this client talks to.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Sends a request and returns the response whatever its status.
    async fn send(&self, method: Method, path: &str, body: Body<'_>) -> ApiResult<Response> {
        let url = self
            .base_url
            .join(path)
            .map_err(|e| ApiError::invalid_request(format!("invalid request path {path:?}: {e}")))?;
        trace!("{method} {url}");

        let request = self
            .client
            .request(method, url)
            .header(header::ACCEPT, ACCEPT_VERSION)
            .header(header::AUTHORIZATION, format!("token {}", self.access_token))
            .header(SOURCE_HEADER, "provider");
        let request = match body {
            Body::Empty => request.header(header::CONTENT_TYPE, "application/json"),
            Body::Json(value) => request.json(&value),
            Body::Yaml(yaml) => request
                .header(header::CONTENT_TYPE, "application/x-yaml")
                .body(yaml.to_string()),
        };

        request
            .send()
            .await
            .map_err(|e| ApiError::network(format!("Request failed: {e}")))
    }

    /// Sends a request and maps non-success statuses to errors.
    async fn execute(&self, method: Method, path: &str, body: Body<'_>) -> ApiResult<Response> {
        let response = self.send(method, path, body).await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        debug!("{path} answered {status}");
        let message = serde_json::from_str::<ErrorResponse>(&text)
            .ok()
            .map(|e| e.message)
            .filter(|m| !m.is_empty())
            .unwrap_or(text);
        Err(ApiError::api_error(status.as_u16(), message))
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> ApiResult<T> {
        response
            .json()
            .await
            .map_err(|e| ApiError::invalid_response(format!("Failed to parse response: {e}")))
    }

    /// GETs a JSON document, mapping 404 to `None`.
    async fn get_optional<T: DeserializeOwned>(&self, path: &str) -> ApiResult<Option<T>> {
        match self.execute(Method::GET, path, Body::Empty).await {
            Ok(response) => Self::decode(response).await.map(Some),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn call<B: Serialize + ?Sized>(&self, method: Method, path: &str, body: &B) -> ApiResult<Response> {
        self.execute(method, path, Body::json(body)?).await
    }

    /// DELETEs a path, treating an absent object as deleted.
    async fn delete_idempotent(&self, path: &str) -> ApiResult<()> {
        match self.execute(Method::DELETE, path, Body::Empty).await {
            Ok(_) => Ok(()),
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn patch_team<B: Serialize + ?Sized>(&self, organization: &str, team: &str, body: &B) -> ApiResult<()> {
        self.call(Method::PATCH, &team_path(organization, team), body)
            .await
            .map(drop)
    }
}

fn stack_path(stack: &StackName) -> String {
    format!("stacks/{}/{}/{}", stack.organization, stack.project, stack.stack)
}

fn team_path(organization: &str, team: &str) -> String {
    format!("orgs/{organization}/teams/{team}")
}

fn environment_path(environment: &EnvironmentId) -> String {
    format!(
        "esc/environments/{}/{}/{}",
        environment.organization, environment.project, environment.environment
    )
}

fn diagnostics_error(diagnostics: &[EnvironmentDiagnostic]) -> ApiError {
    ApiError::Diagnostics {
        diagnostics: diagnostics.iter().map(ToString::to_string).collect(),
    }
}

#[async_trait]
impl PulumiServiceApi for PulumiClient {
    async fn create_stack_tag(&self, stack: &StackName, tag: &StackTag) -> ApiResult<()> {
        let path = format!("{}/tags", stack_path(stack));
        self.call(Method::POST, &path, tag).await.map(drop)
    }

    async fn get_stack_tag(&self, stack: &StackName, name: &str) -> ApiResult<Option<StackTag>> {
        let response = self.execute(Method::GET, &stack_path(stack), Body::Empty).await?;
        let stack: StackTagsResponse = Self::decode(response).await?;
        Ok(stack.tags.get(name).map(|value| StackTag {
            name: name.to_string(),
            value: value.clone(),
        }))
    }

    async fn list_stack_tags(
        &self,
        stack: &StackName,
    ) -> ApiResult<Option<BTreeMap<String, String>>> {
        let stack: Option<StackTagsResponse> = self.get_optional(&stack_path(stack)).await?;
        Ok(stack.map(|s| s.tags))
    }

    async fn delete_stack_tag(&self, stack: &StackName, name: &str) -> ApiResult<()> {
        let path = format!("{}/tags/{name}", stack_path(stack));
        self.execute(Method::DELETE, &path, Body::Empty).await.map(drop)
    }

    async fn create_deployment_schedule(
        &self,
        stack: &StackName,
        request: &DeploymentScheduleRequest,
    ) -> ApiResult<String> {
        let path = format!("{}/deployments/schedules", stack_path(stack));
        let response = self.call(Method::POST, &path, request).await?;
        Ok(Self::decode::<ScheduleResponse>(response).await?.id)
    }

    async fn update_deployment_schedule(
        &self,
        stack: &StackName,
        schedule_id: &str,
        request: &DeploymentScheduleRequest,
    ) -> ApiResult<String> {
        let path = format!("{}/deployments/schedules/{schedule_id}", stack_path(stack));
        let response = self.call(Method::POST, &path, request).await?;
        Ok(Self::decode::<ScheduleResponse>(response).await?.id)
    }

    async fn create_ttl_schedule(
        &self,
        stack: &StackName,
        request: &TtlScheduleRequest,
    ) -> ApiResult<String> {
        let path = format!("{}/deployments/ttl/schedules", stack_path(stack));
        let response = self.call(Method::POST, &path, request).await?;
        Ok(Self::decode::<ScheduleResponse>(response).await?.id)
    }

    async fn update_ttl_schedule(
        &self,
        stack: &StackName,
        schedule_id: &str,
        request: &TtlScheduleRequest,
    ) -> ApiResult<String> {
        let path = format!("{}/deployments/ttl/schedules/{schedule_id}", stack_path(stack));
        let response = self.call(Method::POST, &path, request).await?;
        Ok(Self::decode::<ScheduleResponse>(response).await?.id)
    }

    async fn create_drift_schedule(
        &self,
        stack: &StackName,
        request: &DriftScheduleRequest,
    ) -> ApiResult<String> {
        let path = format!("{}/deployments/drift/schedules", stack_path(stack));
        let response = self.call(Method::POST, &path, request).await?;
        Ok(Self::decode::<ScheduleResponse>(response).await?.id)
    }

    async fn update_drift_schedule(
        &self,
        stack: &StackName,
        schedule_id: &str,
        request: &DriftScheduleRequest,
    ) -> ApiResult<String> {
        let path = format!("{}/deployments/drift/schedules/{schedule_id}", stack_path(stack));
        let response = self.call(Method::POST, &path, request).await?;
        Ok(Self::decode::<ScheduleResponse>(response).await?.id)
    }

    async fn get_stack_schedule(
        &self,
        stack: &StackName,
        schedule_id: &str,
    ) -> ApiResult<Option<ScheduleResponse>> {
        let path = format!("{}/deployments/schedules/{schedule_id}", stack_path(stack));
        self.get_optional(&path).await
    }

    async fn delete_stack_schedule(&self, stack: &StackName, schedule_id: &str) -> ApiResult<()> {
        let path = format!("{}/deployments/schedules/{schedule_id}", stack_path(stack));
        self.execute(Method::DELETE, &path, Body::Empty).await.map(drop)
    }

    async fn put_deployment_settings(
        &self,
        stack: &StackName,
        settings: &DeploymentSettings,
    ) -> ApiResult<DeploymentSettings> {
        let path = format!("{}/deployments/settings", stack_path(stack));
        let response = self.call(Method::PUT, &path, settings).await?;
        Self::decode(response).await
    }

    async fn get_deployment_settings(
        &self,
        stack: &StackName,
    ) -> ApiResult<Option<DeploymentSettings>> {
        let path = format!("{}/deployments/settings", stack_path(stack));
        self.get_optional(&path).await
    }

    async fn delete_deployment_settings(&self, stack: &StackName) -> ApiResult<()> {
        let path = format!("{}/deployments/settings", stack_path(stack));
        self.execute(Method::DELETE, &path, Body::Empty).await.map(drop)
    }

    async fn check_environment_yaml(
        &self,
        organization: &str,
        yaml: &str,
    ) -> ApiResult<Vec<EnvironmentDiagnostic>> {
        let path = format!("esc/environments/{organization}/yaml/check");
        let response = self.send(Method::POST, &path, Body::Yaml(yaml)).await?;
        let status = response.status();
        if status.is_success() || status.as_u16() == 400 {
            let checked: DiagnosticsResponse = Self::decode(response).await?;
            return Ok(checked.diagnostics);
        }
        let text = response.text().await.unwrap_or_default();
        Err(ApiError::api_error(status.as_u16(), text))
    }

    async fn create_environment(&self, environment: &EnvironmentId) -> ApiResult<()> {
        let path = format!("esc/environments/{}", environment.organization);
        let body = CreateEnvironmentRequest {
            project: &environment.project,
            name: &environment.environment,
        };
        self.call(Method::POST, &path, &body).await.map(drop)
    }

    async fn update_environment(&self, environment: &EnvironmentId, yaml: &str) -> ApiResult<i64> {
        let response = self
            .send(Method::PATCH, &environment_path(environment), Body::Yaml(yaml))
            .await?;
        let status = response.status();
        if !status.is_success() && status.as_u16() != 400 {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&text)
                .map(|e| e.message)
                .unwrap_or(text);
            return Err(ApiError::api_error(status.as_u16(), message));
        }

        let updated: UpdateEnvironmentResponse = Self::decode(response).await?;
        if !updated.diagnostics.is_empty() {
            return Err(diagnostics_error(&updated.diagnostics));
        }
        if !status.is_success() {
            return Err(ApiError::api_error(status.as_u16(), "environment update rejected"));
        }
        Ok(updated.revision)
    }

    async fn get_environment(
        &self,
        environment: &EnvironmentId,
    ) -> ApiResult<Option<EnvironmentDefinition>> {
        let response = match self
            .execute(Method::GET, &environment_path(environment), Body::Empty)
            .await
        {
            Ok(response) => response,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(e),
        };

        let revision = match response.headers().get(REVISION_HEADER) {
            Some(value) => value
                .to_str()
                .ok()
                .and_then(|v| v.parse().ok())
                .ok_or_else(|| {
                    ApiError::invalid_response(format!("unparseable {REVISION_HEADER} header"))
                })?,
            None => 0,
        };
        let yaml = response
            .text()
            .await
            .map_err(|e| ApiError::invalid_response(format!("Failed to read response: {e}")))?;
        Ok(Some(EnvironmentDefinition { yaml, revision }))
    }

    async fn delete_environment(&self, environment: &EnvironmentId) -> ApiResult<()> {
        self.execute(Method::DELETE, &environment_path(environment), Body::Empty)
            .await
            .map(drop)
    }

    async fn create_environment_revision_tag(
        &self,
        environment: &EnvironmentId,
        tag: &str,
        revision: i64,
    ) -> ApiResult<()> {
        let path = format!("{}/versions/tags", environment_path(environment));
        let body = EnvironmentRevisionTag {
            name: tag.to_string(),
            revision,
        };
        self.call(Method::POST, &path, &body).await.map(drop)
    }

    async fn get_environment_revision_tag(
        &self,
        environment: &EnvironmentId,
        tag: &str,
    ) -> ApiResult<Option<EnvironmentRevisionTag>> {
        let path = format!("{}/versions/tags/{tag}", environment_path(environment));
        self.get_optional(&path).await
    }

    async fn update_environment_revision_tag(
        &self,
        environment: &EnvironmentId,
        tag: &str,
        revision: i64,
    ) -> ApiResult<()> {
        let path = format!("{}/versions/tags/{tag}", environment_path(environment));
        self.call(Method::PATCH, &path, &UpdateRevisionTagRequest { revision })
            .await
            .map(drop)
    }

    async fn delete_environment_revision_tag(
        &self,
        environment: &EnvironmentId,
        tag: &str,
    ) -> ApiResult<()> {
        let path = format!("{}/versions/tags/{tag}", environment_path(environment));
        self.execute(Method::DELETE, &path, Body::Empty).await.map(drop)
    }

    async fn create_team(&self, request: &CreateTeamRequest) -> ApiResult<Team> {
        let path = format!("orgs/{}/teams/{}", request.organization, request.team_type);
        let response = self.call(Method::POST, &path, request).await?;
        Self::decode(response).await
    }

    async fn get_team(&self, organization: &str, team: &str) -> ApiResult<Option<Team>> {
        self.get_optional(&team_path(organization, team)).await
    }

    async fn update_team(
        &self,
        organization: &str,
        team: &str,
        display_name: &str,
        description: &str,
    ) -> ApiResult<()> {
        let body = UpdateTeamRequest {
            new_display_name: display_name,
            new_description: description,
        };
        self.patch_team(organization, team, &body).await
    }

    async fn delete_team(&self, organization: &str, team: &str) -> ApiResult<()> {
        self.execute(Method::DELETE, &team_path(organization, team), Body::Empty)
            .await
            .map(drop)
    }

    async fn add_team_member(&self, organization: &str, team: &str, user: &str) -> ApiResult<()> {
        let body = UpdateTeamMembershipRequest {
            member_action: "add",
            member: user,
        };
        match self.patch_team(organization, team, &body).await {
            Err(e) if e.is_conflict() => {
                debug!("{user} is already a member of {organization}/{team}");
                Ok(())
            }
            other => other,
        }
    }

    async fn remove_team_member(
        &self,
        organization: &str,
        team: &str,
        user: &str,
    ) -> ApiResult<()> {
        let body = UpdateTeamMembershipRequest {
            member_action: "remove",
            member: user,
        };
        self.patch_team(organization, team, &body).await
    }

    async fn add_stack_permission(
        &self,
        stack: &StackName,
        team: &str,
        permission: i64,
    ) -> ApiResult<()> {
        let grant = TeamStackPermission {
            project_name: stack.project.clone(),
            stack_name: stack.stack.clone(),
            permission,
        };
        let body = TeamGrantPatch::AddStackPermission(&grant);
        self.patch_team(&stack.organization, team, &body).await
    }

    async fn remove_stack_permission(&self, stack: &StackName, team: &str) -> ApiResult<()> {
        let body = TeamGrantPatch::RemoveStack {
            project_name: &stack.project,
            stack_name: &stack.stack,
        };
        self.patch_team(&stack.organization, team, &body).await
    }

    async fn get_team_stack_permission(
        &self,
        stack: &StackName,
        team: &str,
    ) -> ApiResult<Option<i64>> {
        let Some(team) = self.get_team(&stack.organization, team).await? else {
            return Ok(None);
        };
        Ok(team
            .stacks
            .iter()
            .find(|s| s.project_name == stack.project && s.stack_name == stack.stack)
            .map(|s| s.permission))
    }

    async fn add_environment_permission(
        &self,
        organization: &str,
        team: &str,
        grant: &TeamEnvironmentPermission,
    ) -> ApiResult<()> {
        self.patch_team(organization, team, &TeamGrantPatch::AddEnvironmentPermission(grant))
            .await
    }

    async fn remove_environment_permission(
        &self,
        organization: &str,
        team: &str,
        project: &str,
        environment: &str,
    ) -> ApiResult<()> {
        let body = TeamGrantPatch::RemoveEnvironment {
            env_name: environment,
            project_name: project,
        };
        self.patch_team(organization, team, &body).await
    }

    async fn get_team_environment_permission(
        &self,
        organization: &str,
        team: &str,
        project: &str,
        environment: &str,
    ) -> ApiResult<Option<TeamEnvironmentPermission>> {
        let Some(team) = self.get_team(organization, team).await? else {
            return Ok(None);
        };
        Ok(team
            .environments
            .into_iter()
            .find(|e| e.env_name == environment && e.project_name == project))
    }

    async fn register_oidc_issuer(
        &self,
        organization: &str,
        request: &OidcIssuerRegistrationRequest,
    ) -> ApiResult<OidcIssuer> {
        let path = format!("orgs/{organization}/oidc/issuers");
        let response = self.call(Method::POST, &path, request).await?;
        Self::decode(response).await
    }

    async fn update_oidc_issuer(
        &self,
        organization: &str,
        issuer_id: &str,
        request: &OidcIssuerUpdateRequest,
    ) -> ApiResult<OidcIssuer> {
        let path = format!("orgs/{organization}/oidc/issuers/{issuer_id}");
        let response = self.call(Method::PATCH, &path, request).await?;
        Self::decode(response).await
    }

    async fn get_oidc_issuer(
        &self,
        organization: &str,
        issuer_id: &str,
    ) -> ApiResult<Option<OidcIssuer>> {
        self.get_optional(&format!("orgs/{organization}/oidc/issuers/{issuer_id}"))
            .await
    }

    async fn delete_oidc_issuer(&self, organization: &str, issuer_id: &str) -> ApiResult<()> {
        self.delete_idempotent(&format!("orgs/{organization}/oidc/issuers/{issuer_id}"))
            .await
    }

    async fn get_auth_policy(&self, organization: &str, issuer_id: &str) -> ApiResult<AuthPolicy> {
        let path = format!("orgs/{organization}/auth/policies/oidcissuers/{issuer_id}");
        let response = self.execute(Method::GET, &path, Body::Empty).await?;
        Self::decode(response).await
    }

    async fn update_auth_policy(
        &self,
        organization: &str,
        policy_id: &str,
        policies: &[AuthPolicyDefinition],
    ) -> ApiResult<AuthPolicy> {
        let path = format!("orgs/{organization}/auth/policies/{policy_id}");
        let response = self
            .call(Method::PATCH, &path, &AuthPolicyUpdateRequest { policies })
            .await?;
        Self::decode(response).await
    }

    async fn create_template_source(
        &self,
        organization: &str,
        request: &TemplateSourceRequest,
    ) -> ApiResult<TemplateSource> {
        let path = format!("orgs/{organization}/templates/sources");
        let response = self.call(Method::POST, &path, request).await?;
        Self::decode(response).await
    }

    async fn update_template_source(
        &self,
        organization: &str,
        source_id: &str,
        request: &TemplateSourceRequest,
    ) -> ApiResult<TemplateSource> {
        let path = format!("orgs/{organization}/templates/sources/{source_id}");
        let response = self.call(Method::PATCH, &path, request).await?;
        Self::decode(response).await
    }

    async fn get_template_source(
        &self,
        organization: &str,
        source_id: &str,
    ) -> ApiResult<Option<TemplateSource>> {
        let path = format!("orgs/{organization}/templates/sources");
        let Some(list) = self.get_optional::<TemplateSourceList>(&path).await? else {
            return Ok(None);
        };
        Ok(list.sources.into_iter().find(|s| s.id == source_id))
    }

    async fn delete_template_source(&self, organization: &str, source_id: &str) -> ApiResult<()> {
        self.delete_idempotent(&format!("orgs/{organization}/templates/sources/{source_id}"))
            .await
    }
}
