//! The Pulumi Cloud operations resources depend on.
//!
//! Handlers receive an `Arc<dyn PulumiServiceApi>` at construction, so tests
//! substitute the generated `MockPulumiServiceApi` for the HTTP client.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::error::ApiError;
use crate::id::{EnvironmentId, StackName};

use super::types::{
    AuthPolicy, AuthPolicyDefinition, CreateTeamRequest, DeploymentScheduleRequest,
    DeploymentSettings, DriftScheduleRequest, EnvironmentDefinition, EnvironmentDiagnostic,
    EnvironmentRevisionTag, OidcIssuer, OidcIssuerRegistrationRequest, OidcIssuerUpdateRequest,
    ScheduleResponse, StackTag, Team, TeamEnvironmentPermission, TemplateSource,
    TemplateSourceRequest, TtlScheduleRequest,
};

/// Result of a client call.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Pulumi Cloud REST operations.
///
/// Lookups return `Ok(None)` when the service reports the object absent.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PulumiServiceApi: Send + Sync {
    // Stack tags

    /// Adds a tag to a stack.
    async fn create_stack_tag(&self, stack: &StackName, tag: &StackTag) -> ApiResult<()>;

    /// Looks up one tag. Fails if the stack itself does not exist.
    async fn get_stack_tag(&self, stack: &StackName, name: &str) -> ApiResult<Option<StackTag>>;

    /// Returns every tag of a stack, or `None` if the stack does not exist.
    async fn list_stack_tags(
        &self,
        stack: &StackName,
    ) -> ApiResult<Option<BTreeMap<String, String>>>;

    /// Removes a tag from a stack.
    async fn delete_stack_tag(&self, stack: &StackName, name: &str) -> ApiResult<()>;

    // Schedules

    /// Creates a deployment schedule and returns its ID.
    async fn create_deployment_schedule(
        &self,
        stack: &StackName,
        request: &DeploymentScheduleRequest,
    ) -> ApiResult<String>;

    /// Replaces a deployment schedule and returns its new ID.
    async fn update_deployment_schedule(
        &self,
        stack: &StackName,
        schedule_id: &str,
        request: &DeploymentScheduleRequest,
    ) -> ApiResult<String>;

    /// Creates a TTL schedule and returns its ID.
    async fn create_ttl_schedule(
        &self,
        stack: &StackName,
        request: &TtlScheduleRequest,
    ) -> ApiResult<String>;

    /// Replaces a TTL schedule and returns its new ID.
    async fn update_ttl_schedule(
        &self,
        stack: &StackName,
        schedule_id: &str,
        request: &TtlScheduleRequest,
    ) -> ApiResult<String>;

    /// Creates a drift detection schedule and returns its ID.
    async fn create_drift_schedule(
        &self,
        stack: &StackName,
        request: &DriftScheduleRequest,
    ) -> ApiResult<String>;

    /// Replaces a drift detection schedule and returns its new ID.
    async fn update_drift_schedule(
        &self,
        stack: &StackName,
        schedule_id: &str,
        request: &DriftScheduleRequest,
    ) -> ApiResult<String>;

    /// Looks up any schedule of a stack.
    async fn get_stack_schedule(
        &self,
        stack: &StackName,
        schedule_id: &str,
    ) -> ApiResult<Option<ScheduleResponse>>;

    /// Deletes any schedule of a stack.
    async fn delete_stack_schedule(&self, stack: &StackName, schedule_id: &str) -> ApiResult<()>;

    // Deployment settings

    /// Creates or replaces the deployment settings of a stack, returning the
    /// stored settings with secrets encrypted.
    async fn put_deployment_settings(
        &self,
        stack: &StackName,
        settings: &DeploymentSettings,
    ) -> ApiResult<DeploymentSettings>;

    /// Looks up the deployment settings of a stack.
    async fn get_deployment_settings(
        &self,
        stack: &StackName,
    ) -> ApiResult<Option<DeploymentSettings>>;

    /// Removes the deployment settings of a stack.
    async fn delete_deployment_settings(&self, stack: &StackName) -> ApiResult<()>;

    // Environments

    /// Validates environment YAML without storing it.
    async fn check_environment_yaml(
        &self,
        organization: &str,
        yaml: &str,
    ) -> ApiResult<Vec<EnvironmentDiagnostic>>;

    /// Creates an empty environment.
    async fn create_environment(&self, environment: &EnvironmentId) -> ApiResult<()>;

    /// Stores new environment YAML and returns the resulting revision.
    async fn update_environment(&self, environment: &EnvironmentId, yaml: &str)
    -> ApiResult<i64>;

    /// Looks up the current definition of an environment.
    async fn get_environment(
        &self,
        environment: &EnvironmentId,
    ) -> ApiResult<Option<EnvironmentDefinition>>;

    /// Deletes an environment.
    async fn delete_environment(&self, environment: &EnvironmentId) -> ApiResult<()>;

    /// Tags a revision of an environment.
    async fn create_environment_revision_tag(
        &self,
        environment: &EnvironmentId,
        tag: &str,
        revision: i64,
    ) -> ApiResult<()>;

    /// Looks up a revision tag.
    async fn get_environment_revision_tag(
        &self,
        environment: &EnvironmentId,
        tag: &str,
    ) -> ApiResult<Option<EnvironmentRevisionTag>>;

    /// Moves a revision tag.
    async fn update_environment_revision_tag(
        &self,
        environment: &EnvironmentId,
        tag: &str,
        revision: i64,
    ) -> ApiResult<()>;

    /// Deletes a revision tag.
    async fn delete_environment_revision_tag(
        &self,
        environment: &EnvironmentId,
        tag: &str,
    ) -> ApiResult<()>;

    // Teams

    /// Creates a team.
    async fn create_team(&self, request: &CreateTeamRequest) -> ApiResult<Team>;

    /// Looks up a team.
    async fn get_team(&self, organization: &str, team: &str) -> ApiResult<Option<Team>>;

    /// Changes a team's display name and description.
    async fn update_team(
        &self,
        organization: &str,
        team: &str,
        display_name: &str,
        description: &str,
    ) -> ApiResult<()>;

    /// Deletes a team.
    async fn delete_team(&self, organization: &str, team: &str) -> ApiResult<()>;

    /// Adds a member. Adding an existing member succeeds.
    async fn add_team_member(&self, organization: &str, team: &str, user: &str) -> ApiResult<()>;

    /// Removes a member.
    async fn remove_team_member(&self, organization: &str, team: &str, user: &str)
    -> ApiResult<()>;

    /// Grants a team a permission level on a stack.
    async fn add_stack_permission(
        &self,
        stack: &StackName,
        team: &str,
        permission: i64,
    ) -> ApiResult<()>;

    /// Revokes a team's grant on a stack.
    async fn remove_stack_permission(&self, stack: &StackName, team: &str) -> ApiResult<()>;

    /// Returns a team's permission level on a stack.
    async fn get_team_stack_permission(
        &self,
        stack: &StackName,
        team: &str,
    ) -> ApiResult<Option<i64>>;

    /// Grants a team a permission on an environment.
    async fn add_environment_permission(
        &self,
        organization: &str,
        team: &str,
        grant: &TeamEnvironmentPermission,
    ) -> ApiResult<()>;

    /// Revokes a team's grant on an environment.
    async fn remove_environment_permission(
        &self,
        organization: &str,
        team: &str,
        project: &str,
        environment: &str,
    ) -> ApiResult<()>;

    /// Returns a team's grant on an environment.
    async fn get_team_environment_permission(
        &self,
        organization: &str,
        team: &str,
        project: &str,
        environment: &str,
    ) -> ApiResult<Option<TeamEnvironmentPermission>>;

    // OIDC issuers

    /// Registers an OIDC issuer.
    async fn register_oidc_issuer(
        &self,
        organization: &str,
        request: &OidcIssuerRegistrationRequest,
    ) -> ApiResult<OidcIssuer>;

    /// Updates an OIDC issuer.
    async fn update_oidc_issuer(
        &self,
        organization: &str,
        issuer_id: &str,
        request: &OidcIssuerUpdateRequest,
    ) -> ApiResult<OidcIssuer>;

    /// Looks up an OIDC issuer.
    async fn get_oidc_issuer(
        &self,
        organization: &str,
        issuer_id: &str,
    ) -> ApiResult<Option<OidcIssuer>>;

    /// Deletes an OIDC issuer. Deleting an absent issuer succeeds.
    async fn delete_oidc_issuer(&self, organization: &str, issuer_id: &str) -> ApiResult<()>;

    /// Returns the authorization policy of an issuer.
    async fn get_auth_policy(&self, organization: &str, issuer_id: &str)
    -> ApiResult<AuthPolicy>;

    /// Replaces the rules of an authorization policy.
    async fn update_auth_policy(
        &self,
        organization: &str,
        policy_id: &str,
        policies: &[AuthPolicyDefinition],
    ) -> ApiResult<AuthPolicy>;

    // Template sources

    /// Registers a template source.
    async fn create_template_source(
        &self,
        organization: &str,
        request: &TemplateSourceRequest,
    ) -> ApiResult<TemplateSource>;

    /// Updates a template source.
    async fn update_template_source(
        &self,
        organization: &str,
        source_id: &str,
        request: &TemplateSourceRequest,
    ) -> ApiResult<TemplateSource>;

    /// Looks up a template source.
    async fn get_template_source(
        &self,
        organization: &str,
        source_id: &str,
    ) -> ApiResult<Option<TemplateSource>>;

    /// Deletes a template source. Deleting an absent source succeeds.
    async fn delete_template_source(&self, organization: &str, source_id: &str) -> ApiResult<()>;
}
