//! Resource handlers.
//!
//! Each resource kind translates between its property bag and calls on the
//! injected [`PulumiServiceApi`](crate::client::PulumiServiceApi):
//!
//! - Stack metadata: [`StackTagResource`], [`StackTagsResource`]
//! - Stack automation: [`DeploymentScheduleResource`], [`TtlScheduleResource`],
//!   [`DriftScheduleResource`], [`DeploymentSettingsResource`]
//! - Environments: [`EnvironmentResource`], [`EnvironmentVersionTagResource`]
//! - Access control: [`TeamResource`], [`TeamStackPermissionResource`],
//!   [`TeamEnvironmentPermissionResource`], [`OidcIssuerResource`]
//! - Templates: [`TemplateSourceResource`]

mod deployment_schedule;
mod deployment_settings;
mod drift_schedule;
mod environment;
mod environment_version_tag;
mod handler;
mod oidc_issuer;
mod stack_tag;
mod stack_tags;
mod team;
mod team_environment_permission;
mod team_stack_permission;
mod template_source;
mod ttl_schedule;

pub use deployment_schedule::{
    DeploymentScheduleInput, DeploymentScheduleResource, DEPLOYMENT_SCHEDULE,
};
pub use deployment_settings::{
    DeploymentSettingsInput, DeploymentSettingsResource, SecretSources, View,
    DEPLOYMENT_SETTINGS,
};
pub use drift_schedule::{DriftScheduleInput, DriftScheduleResource, DRIFT_SCHEDULE};
pub use environment::{EnvironmentInput, EnvironmentResource, ENVIRONMENT};
pub use environment_version_tag::{
    EnvironmentVersionTagInput, EnvironmentVersionTagResource, ENVIRONMENT_VERSION_TAG,
};
pub use handler::{
    CheckFailure, CheckRequest, CheckResponse, CreateRequest, CreateResponse, DeleteRequest,
    DiffRequest, ReadRequest, ReadResponse, ResourceHandler, UpdateRequest, UpdateResponse,
};
pub use oidc_issuer::{OidcIssuerInput, OidcIssuerResource, OIDC_ISSUER};
pub use stack_tag::{StackTagInput, StackTagResource, STACK_TAG};
pub use stack_tags::{StackTagsInput, StackTagsResource, STACK_TAGS};
pub use team::{TeamInput, TeamResource, TEAM};
pub use team_environment_permission::{
    TeamEnvironmentPermissionInput, TeamEnvironmentPermissionResource,
    TEAM_ENVIRONMENT_PERMISSION,
};
pub use team_stack_permission::{
    TeamStackPermissionInput, TeamStackPermissionResource, TEAM_STACK_PERMISSION,
};
pub use template_source::{TemplateSourceInput, TemplateSourceResource, TEMPLATE_SOURCE};
pub use ttl_schedule::{TtlScheduleInput, TtlScheduleResource, TTL_SCHEDULE};
