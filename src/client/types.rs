//! Pulumi Cloud API types and data structures.
//!
//! This module defines the request and response bodies exchanged with the
//! Pulumi Cloud REST API. Field names follow the service's JSON exactly,
//! including its occasional irregular casing.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::duration::GoDuration;
use crate::secret::SecretValue;

/// Error body returned with non-2xx responses.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorResponse {
    /// Status code echoed by the service; zero when absent.
    #[serde(default)]
    pub code: u16,
    /// Human readable message.
    #[serde(default)]
    pub message: String,
}

// ---------------------------------------------------------------------------
// Stack tags
// ---------------------------------------------------------------------------

/// A single stack tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackTag {
    /// Tag name.
    pub name: String,
    /// Tag value.
    pub value: String,
}

/// The subset of a stack needed to read its tags.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct StackTagsResponse {
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

// ---------------------------------------------------------------------------
// Schedules
// ---------------------------------------------------------------------------

/// Deployment options carried by a scheduled request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleOperationOptions {
    /// Delete the stack once a scheduled destroy succeeds.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub delete_after_destroy: bool,
    /// Run a remediating update when a drift run finds changes.
    #[serde(
        default,
        rename = "remediateIfDriftDetected",
        skip_serializing_if = "std::ops::Not::not"
    )]
    pub auto_remediate: bool,
}

/// Operation context carried by a scheduled request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleOperationContext {
    /// Deployment options.
    #[serde(default)]
    pub options: ScheduleOperationOptions,
}

/// The deployment a schedule triggers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledDeployment {
    /// Pulumi operation: update, preview, refresh or destroy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,
    /// Operation context.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_context: Option<ScheduleOperationContext>,
}

/// Body of a deployment schedule create or update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentScheduleRequest {
    /// Cron expression for recurring schedules.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule_cron: Option<String>,
    /// Instant for one-off schedules.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule_once: Option<DateTime<Utc>>,
    /// The deployment to run.
    pub request: ScheduledDeployment,
}

/// Body of a TTL schedule create or update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TtlScheduleRequest {
    /// When the stack expires.
    pub timestamp: DateTime<Utc>,
    /// Delete the stack after destroying its resources.
    pub delete_after_destroy: bool,
}

/// Body of a drift detection schedule create or update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DriftScheduleRequest {
    /// Cron expression for drift runs.
    pub schedule_cron: String,
    /// Remediate detected drift with an update.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub auto_remediate: bool,
}

/// Definition of a stored schedule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ScheduleDefinition {
    /// The deployment the schedule triggers.
    #[serde(default)]
    pub request: ScheduledDeployment,
}

/// A stored schedule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleResponse {
    /// Schedule ID.
    #[serde(default)]
    pub id: String,
    /// One-off instant, formatted `YYYY-MM-DD HH:MM:SS` in UTC.
    #[serde(default)]
    pub schedule_once: Option<String>,
    /// Cron expression.
    #[serde(default)]
    pub schedule_cron: Option<String>,
    /// What the schedule runs.
    #[serde(default)]
    pub definition: ScheduleDefinition,
}

// ---------------------------------------------------------------------------
// Deployment settings
// ---------------------------------------------------------------------------

/// Deployment settings of a stack.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentSettings {
    /// How deployments run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_context: Option<OperationContext>,
    /// GitHub integration.
    #[serde(default, rename = "gitHub", skip_serializing_if = "Option::is_none")]
    pub github: Option<GitHubConfiguration>,
    /// Where the program source comes from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_context: Option<SourceContext>,
    /// Executor image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executor_context: Option<ExecutorContext>,
    /// Agent pool running the deployments.
    #[serde(default, rename = "agentPoolID", skip_serializing_if = "Option::is_none")]
    pub agent_pool_id: Option<String>,
    /// Dependency caching.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_options: Option<CacheOptions>,
}

/// How deployments run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationContext {
    /// Deployment options.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<OperationContextOptions>,
    /// Commands run before the Pulumi operation.
    #[serde(default, rename = "PreRunCommands", skip_serializing_if = "Option::is_none")]
    pub pre_run_commands: Option<Vec<String>>,
    /// Environment variables, possibly encrypted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment_variables: Option<BTreeMap<String, SecretValue>>,
    /// Cloud OIDC credentials.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oidc: Option<OidcConfiguration>,
}

/// Deployment options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationContextOptions {
    /// Skip dependency installation.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub skip_install_dependencies: bool,
    /// Skip deployments of intermediate commits.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub skip_intermediate_deployments: bool,
    /// Shell used for commands.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shell: Option<String>,
    /// Delete the stack after destroying its resources.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub delete_after_destroy: bool,
}

/// Cloud OIDC credentials.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OidcConfiguration {
    /// AWS.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aws: Option<AwsOidcConfiguration>,
    /// Google Cloud.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gcp: Option<GcpOidcConfiguration>,
    /// Azure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub azure: Option<AzureOidcConfiguration>,
}

/// AWS OIDC credentials.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AwsOidcConfiguration {
    /// Session duration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    /// Policies attached to the session.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_arns: Option<Vec<String>>,
    /// Role assumed.
    #[serde(default)]
    pub role_arn: String,
    /// Session name.
    #[serde(default)]
    pub session_name: String,
}

/// Google Cloud OIDC credentials.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GcpOidcConfiguration {
    /// Project number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    /// Region.
    #[serde(default)]
    pub region: String,
    /// Workload identity pool.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workload_pool_id: Option<String>,
    /// Identity provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<String>,
    /// Service account impersonated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_account: Option<String>,
    /// Token lifetime.
    #[serde(default)]
    pub token_lifetime: String,
}

/// Azure OIDC credentials.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzureOidcConfiguration {
    /// Application client ID.
    #[serde(default)]
    pub client_id: String,
    /// Directory tenant ID.
    #[serde(default)]
    pub tenant_id: String,
    /// Subscription ID.
    #[serde(default)]
    pub subscription_id: String,
}

/// GitHub integration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitHubConfiguration {
    /// `owner/repo`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
    /// Deploy on push.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub deploy_commits: bool,
    /// Preview pull requests.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub preview_pull_requests: bool,
    /// Use the pull request template.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub pull_request_template: bool,
    /// Path filters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paths: Option<Vec<String>>,
}

/// Where the program source comes from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceContext {
    /// A git repository.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git: Option<SourceContextGit>,
    /// A template.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<SourceContextTemplate>,
}

/// Git source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceContextGit {
    /// Repository URL.
    #[serde(default, rename = "repoURL")]
    pub repo_url: String,
    /// Branch.
    #[serde(default)]
    pub branch: String,
    /// Directory of the program inside the repository.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_dir: Option<String>,
    /// Pinned commit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,
    /// Credentials.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_auth: Option<GitAuthConfig>,
}

/// Template source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceContextTemplate {
    /// Template URL.
    #[serde(default)]
    pub source_url: String,
}

/// Git credentials. At most one method is normally set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitAuthConfig {
    /// Personal access token.
    #[serde(default, rename = "accessToken", skip_serializing_if = "Option::is_none")]
    pub access_token: Option<SecretValue>,
    /// SSH key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh_auth: Option<SshAuth>,
    /// Username and password.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub basic_auth: Option<BasicAuth>,
}

/// SSH credentials.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SshAuth {
    /// Private key.
    #[serde(default)]
    pub ssh_private_key: SecretValue,
    /// Key passphrase.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<SecretValue>,
}

/// Basic credentials.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BasicAuth {
    /// Username.
    #[serde(default)]
    pub user_name: SecretValue,
    /// Password.
    #[serde(default)]
    pub password: SecretValue,
}

/// Executor image.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutorContext {
    /// Image used to run deployments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executor_image: Option<DockerImage>,
}

/// A container image reference.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DockerImage {
    /// Image reference.
    pub reference: String,
}

/// Dependency caching.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheOptions {
    /// Whether caching is on.
    #[serde(default)]
    pub enable: bool,
}

// ---------------------------------------------------------------------------
// Environments
// ---------------------------------------------------------------------------

/// A problem found in environment YAML.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EnvironmentDiagnostic {
    /// Description.
    #[serde(default)]
    pub summary: String,
    /// Path of the offending value.
    #[serde(default)]
    pub path: Option<String>,
}

impl fmt::Display for EnvironmentDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(path) if !path.is_empty() => write!(f, "{path}: {}", self.summary),
            _ => write!(f, "{}", self.summary),
        }
    }
}

/// Diagnostics returned by YAML checks and updates.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct DiagnosticsResponse {
    #[serde(default)]
    pub diagnostics: Vec<EnvironmentDiagnostic>,
}

/// Result of pushing new environment YAML.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct UpdateEnvironmentResponse {
    #[serde(default)]
    pub diagnostics: Vec<EnvironmentDiagnostic>,
    #[serde(default)]
    pub revision: i64,
}

/// Body creating an empty environment.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct CreateEnvironmentRequest<'a> {
    pub project: &'a str,
    pub name: &'a str,
}

/// The current definition of an environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentDefinition {
    /// YAML source.
    pub yaml: String,
    /// Revision number of this definition.
    pub revision: i64,
}

/// A named pointer to an environment revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentRevisionTag {
    /// Tag name.
    pub name: String,
    /// Tagged revision.
    pub revision: i64,
}

/// Body moving a revision tag.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct UpdateRevisionTagRequest {
    pub revision: i64,
}

// ---------------------------------------------------------------------------
// Teams
// ---------------------------------------------------------------------------

/// A team and its grants.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    /// `pulumi` or `github`.
    #[serde(default)]
    pub kind: String,
    /// Team name.
    #[serde(default)]
    pub name: String,
    /// Display name.
    #[serde(default)]
    pub display_name: String,
    /// Description.
    #[serde(default)]
    pub description: String,
    /// Members.
    #[serde(default)]
    pub members: Vec<TeamMember>,
    /// Stack grants.
    #[serde(default)]
    pub stacks: Vec<TeamStackPermission>,
    /// Environment grants.
    #[serde(default)]
    pub environments: Vec<TeamEnvironmentPermission>,
}

/// A team member.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamMember {
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Login.
    #[serde(default)]
    pub github_login: String,
    /// Avatar.
    #[serde(default)]
    pub avatar_url: String,
    /// Role in the team.
    #[serde(default)]
    pub role: String,
}

/// A team's grant on a stack.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamStackPermission {
    /// Project.
    pub project_name: String,
    /// Stack.
    pub stack_name: String,
    /// Permission level: 101 read, 102 write, 103 admin, 0 none.
    pub permission: i64,
}

/// A team's grant on an environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamEnvironmentPermission {
    /// Environment.
    pub env_name: String,
    /// Project.
    pub project_name: String,
    /// `read`, `open`, `write` or `admin`.
    pub permission: String,
    /// Longest duration an environment may stay open.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_open_duration: Option<GoDuration>,
}

/// Body creating a team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTeamRequest {
    /// Organization.
    pub organization: String,
    /// `pulumi` or `github`.
    pub team_type: String,
    /// Team name.
    pub name: String,
    /// Display name.
    pub display_name: String,
    /// Description.
    pub description: String,
    /// Backing GitHub team for `github` teams.
    #[serde(rename = "githubTeamID", skip_serializing_if = "Option::is_none")]
    pub github_team_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UpdateTeamRequest<'a> {
    pub new_display_name: &'a str,
    pub new_description: &'a str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UpdateTeamMembershipRequest<'a> {
    pub member_action: &'a str,
    pub member: &'a str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) enum TeamGrantPatch<'a> {
    AddStackPermission(&'a TeamStackPermission),
    #[serde(rename = "removeStack")]
    RemoveStack {
        #[serde(rename = "projectName")]
        project_name: &'a str,
        #[serde(rename = "stackName")]
        stack_name: &'a str,
    },
    AddEnvironmentPermission(&'a TeamEnvironmentPermission),
    RemoveEnvironment {
        #[serde(rename = "envName")]
        env_name: &'a str,
        #[serde(rename = "projectName")]
        project_name: &'a str,
    },
}

// ---------------------------------------------------------------------------
// OIDC issuers
// ---------------------------------------------------------------------------

/// Body registering an OIDC issuer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OidcIssuerRegistrationRequest {
    /// Display name.
    pub name: String,
    /// Issuer URL.
    pub url: String,
    /// TLS certificate thumbprints.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbprints: Option<Vec<String>>,
    /// Longest token lifetime, in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_expiration: Option<i64>,
}

/// Body updating an OIDC issuer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OidcIssuerUpdateRequest {
    /// Display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// TLS certificate thumbprints.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbprints: Option<Vec<String>>,
    /// Longest token lifetime, in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_expiration: Option<i64>,
}

/// A registered OIDC issuer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OidcIssuer {
    /// Issuer ID.
    #[serde(default)]
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Issuer URL as registered.
    #[serde(default)]
    pub url: String,
    /// Issuer URL as discovered.
    #[serde(default)]
    pub issuer: String,
    /// TLS certificate thumbprints.
    #[serde(default)]
    pub thumbprints: Vec<String>,
    /// Longest token lifetime, in seconds.
    #[serde(default)]
    pub max_expiration: Option<i64>,
}

/// The authorization policy attached to an issuer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AuthPolicy {
    /// Policy ID.
    #[serde(default)]
    pub id: String,
    /// Policy version.
    #[serde(default)]
    pub version: i64,
    /// Rules, evaluated in order.
    #[serde(default)]
    pub policies: Vec<AuthPolicyDefinition>,
}

/// One authorization rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthPolicyDefinition {
    /// `allow` or `deny`.
    pub decision: String,
    /// `organization`, `team`, `personal` or `runner`.
    pub token_type: String,
    /// Team for team tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_name: Option<String>,
    /// User for personal tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_login: Option<String>,
    /// Deployment runner for runner tokens.
    #[serde(default, rename = "runnerID", skip_serializing_if = "Option::is_none")]
    pub runner_id: Option<String>,
    /// Permissions granted.
    #[serde(default)]
    pub authorized_permissions: Vec<String>,
    /// Claim matchers.
    #[serde(default)]
    pub rules: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct AuthPolicyUpdateRequest<'a> {
    pub policies: &'a [AuthPolicyDefinition],
}

// ---------------------------------------------------------------------------
// Template sources
// ---------------------------------------------------------------------------

/// Where projects created from a template are pushed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateSourceDestination {
    /// Destination URL.
    #[serde(default)]
    pub url: Option<String>,
}

/// Body creating or updating a template source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateSourceRequest {
    /// Source name.
    pub name: String,
    /// Repository holding the templates.
    #[serde(rename = "sourceURL")]
    pub source_url: String,
    /// Destination.
    pub destination: Option<TemplateSourceDestination>,
}

/// A registered template source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateSource {
    /// Source ID.
    #[serde(default)]
    pub id: String,
    /// Whether the service could read the source.
    #[serde(default)]
    pub is_valid: bool,
    /// Source name.
    #[serde(default)]
    pub name: String,
    /// Repository holding the templates.
    #[serde(default, rename = "sourceURL")]
    pub source_url: String,
    /// Destination.
    #[serde(default)]
    pub destination: Option<TemplateSourceDestination>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct TemplateSourceList {
    #[serde(default)]
    pub sources: Vec<TemplateSource>,
}
