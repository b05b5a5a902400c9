//! A team's permission level on an environment.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::client::{PulumiServiceApi, TeamEnvironmentPermission};
use crate::diff::{DiffResponse, ReplaceKeys};
use crate::duration::GoDuration;
use crate::error::{PropertyError, ProviderError, Result};
use crate::id::{CompositeId, TeamEnvironmentPermissionId, DEFAULT_PROJECT};
use crate::property::PropertyMap;

use super::handler::{
    CheckFailure, CheckRequest, CheckResponse, CreateRequest, CreateResponse, DeleteRequest,
    DiffRequest, ReadRequest, ReadResponse, ResourceHandler, UpdateRequest, UpdateResponse,
};

/// Type token.
pub const TEAM_ENVIRONMENT_PERMISSION: &str = "pulumiservice:index:TeamEnvironmentPermission";

/// Declared state of an environment grant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamEnvironmentPermissionInput {
    /// Organization, team, project and environment.
    pub id: TeamEnvironmentPermissionId,
    /// `read`, `open`, `write` or `admin`.
    pub permission: String,
    /// Longest duration the team may keep the environment open.
    pub max_open_duration: Option<GoDuration>,
}

impl TeamEnvironmentPermissionInput {
    /// Decodes the input from properties. `project` defaults to `default`.
    ///
    /// # Errors
    ///
    /// Returns a [`PropertyError`] for a missing or mistyped key or an
    /// unparseable duration.
    pub fn from_property_map(props: &PropertyMap) -> std::result::Result<Self, PropertyError> {
        let max_open_duration = props
            .optional_str("maxOpenDuration")?
            .map(|raw| {
                GoDuration::parse(raw).map_err(|e| {
                    PropertyError::invalid("maxOpenDuration", format!("malformed duration: {e}"))
                })
            })
            .transpose()?;

        Ok(Self {
            id: TeamEnvironmentPermissionId {
                organization: props.required_str("organization")?.to_string(),
                team: props.required_str("team")?.to_string(),
                project: props
                    .optional_str("project")?
                    .unwrap_or(DEFAULT_PROJECT)
                    .to_string(),
                environment: props.required_str("environment")?.to_string(),
            },
            permission: props.required_str("permission")?.to_string(),
            max_open_duration,
        })
    }

    /// Encodes the input as properties.
    #[must_use]
    pub fn to_property_map(&self) -> PropertyMap {
        let mut props = crate::props! {
            "organization" => &self.id.organization,
            "team" => &self.id.team,
            "project" => &self.id.project,
            "environment" => &self.id.environment,
            "permission" => &self.permission,
        };
        props.insert_opt(
            "maxOpenDuration",
            self.max_open_duration.map(|d| d.to_string()),
        );
        props
    }

    fn grant(&self) -> TeamEnvironmentPermission {
        TeamEnvironmentPermission {
            env_name: self.id.environment.clone(),
            project_name: self.id.project.clone(),
            permission: self.permission.clone(),
            max_open_duration: self.max_open_duration,
        }
    }
}

/// Manages an environment grant; every change replaces it.
pub struct TeamEnvironmentPermissionResource {
    client: Arc<dyn PulumiServiceApi>,
}

impl TeamEnvironmentPermissionResource {
    /// Creates the handler.
    #[must_use]
    pub fn new(client: Arc<dyn PulumiServiceApi>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ResourceHandler for TeamEnvironmentPermissionResource {
    fn name(&self) -> &'static str {
        TEAM_ENVIRONMENT_PERMISSION
    }

    fn check(&self, request: &CheckRequest) -> Result<CheckResponse> {
        let mut inputs = request.news.clone();
        let mut failures = CheckFailure::missing(
            &inputs,
            &["organization", "team", "environment", "permission"],
        );
        if !inputs.contains_key("project") {
            inputs.insert("project", DEFAULT_PROJECT);
        }

        match inputs.optional_str("maxOpenDuration") {
            Ok(Some(raw)) => match GoDuration::normalize(raw) {
                Ok(normalized) => {
                    inputs.insert("maxOpenDuration", normalized);
                }
                Err(e) => failures.push(CheckFailure::new(
                    "maxOpenDuration",
                    format!("malformed duration: {e}"),
                )),
            },
            Ok(None) => {}
            Err(e) => failures.push(e.into()),
        }

        Ok(CheckResponse { inputs, failures })
    }

    fn diff(&self, request: &DiffRequest) -> Result<DiffResponse> {
        Ok(request.diff_inputs(ReplaceKeys::All))
    }

    async fn create(&self, request: &CreateRequest) -> Result<CreateResponse> {
        let input = TeamEnvironmentPermissionInput::from_property_map(&request.properties)?;
        if request.preview {
            return Ok(CreateResponse::preview(input.to_property_map()));
        }
        info!(
            team = %input.id.team,
            project = %input.id.project,
            environment = %input.id.environment,
            permission = %input.permission,
            "Granting environment permission"
        );

        self.client
            .add_environment_permission(&input.id.organization, &input.id.team, &input.grant())
            .await?;

        Ok(CreateResponse {
            id: input.id.encode(),
            properties: input.to_property_map(),
        })
    }

    async fn read(&self, request: &ReadRequest) -> Result<ReadResponse> {
        let id = TeamEnvironmentPermissionId::decode(&request.id)?;
        debug!(id = %request.id, "Reading team environment permission");

        let grant = self
            .client
            .get_team_environment_permission(&id.organization, &id.team, &id.project, &id.environment)
            .await
            .map_err(|e| ProviderError::operation("failed to get team environment permission", e))?;
        let Some(grant) = grant else {
            return Ok(ReadResponse::absent());
        };

        let props = TeamEnvironmentPermissionInput {
            id,
            permission: grant.permission,
            max_open_duration: grant.max_open_duration,
        }
        .to_property_map();
        Ok(ReadResponse {
            id: request.id.clone(),
            properties: props.clone(),
            inputs: props,
        })
    }

    async fn update(&self, _request: &UpdateRequest) -> Result<UpdateResponse> {
        Err(ProviderError::unexpected_update(TEAM_ENVIRONMENT_PERMISSION))
    }

    async fn delete(&self, request: &DeleteRequest) -> Result<()> {
        let input = TeamEnvironmentPermissionInput::from_property_map(&request.properties)?;
        info!(team = %input.id.team, environment = %input.id.environment, "Revoking environment permission");
        self.client
            .remove_environment_permission(
                &input.id.organization,
                &input.id.team,
                &input.id.project,
                &input.id.environment,
            )
            .await?;
        Ok(())
    }
}
