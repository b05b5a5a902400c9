//! A team's permission level on a stack.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::client::PulumiServiceApi;
use crate::diff::{DiffResponse, ReplaceKeys};
use crate::error::{PropertyError, ProviderError, Result};
use crate::id::{CompositeId, StackName, TeamStackPermissionId};
use crate::property::PropertyMap;

use super::handler::{
    stack_from_properties, stack_properties, CheckFailure, CheckRequest, CheckResponse,
    CreateRequest, CreateResponse, DeleteRequest, DiffRequest, ReadRequest, ReadResponse,
    ResourceHandler, UpdateRequest, UpdateResponse,
};

/// Type token.
pub const TEAM_STACK_PERMISSION: &str = "pulumiservice:index:TeamStackPermission";

/// Declared state of a stack grant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamStackPermissionInput {
    /// Stack the team is granted access to.
    pub stack: StackName,
    /// Team name.
    pub team: String,
    /// Service permission level.
    pub permission: i64,
}

impl TeamStackPermissionInput {
    /// Decodes the input from properties.
    ///
    /// # Errors
    ///
    /// Returns a [`PropertyError`] for a missing or mistyped key.
    pub fn from_property_map(props: &PropertyMap) -> std::result::Result<Self, PropertyError> {
        Ok(Self {
            stack: stack_from_properties(props)?,
            team: props.required_str("team")?.to_string(),
            permission: props.required_i64("permission")?,
        })
    }

    /// Encodes the input as properties.
    #[must_use]
    pub fn to_property_map(&self) -> PropertyMap {
        let mut props = stack_properties(&self.stack);
        props.insert("team", &self.team);
        props.insert("permission", self.permission);
        props
    }

    fn id(&self) -> TeamStackPermissionId {
        TeamStackPermissionId {
            stack: self.stack.clone(),
            team: self.team.clone(),
        }
    }
}

/// Manages a stack grant; every change replaces it.
pub struct TeamStackPermissionResource {
    client: Arc<dyn PulumiServiceApi>,
}

impl TeamStackPermissionResource {
    /// Creates the handler.
    #[must_use]
    pub fn new(client: Arc<dyn PulumiServiceApi>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ResourceHandler for TeamStackPermissionResource {
    fn name(&self) -> &'static str {
        TEAM_STACK_PERMISSION
    }

    fn check(&self, request: &CheckRequest) -> Result<CheckResponse> {
        let news = &request.news;
        let mut failures = CheckFailure::missing(
            news,
            &["organization", "project", "stack", "team", "permission"],
        );
        if let Err(e) = news.optional_i64("permission") {
            failures.push(e.into());
        }
        Ok(CheckResponse {
            inputs: news.clone(),
            failures,
        })
    }

    fn diff(&self, request: &DiffRequest) -> Result<DiffResponse> {
        Ok(request.diff_inputs(ReplaceKeys::All))
    }

    async fn create(&self, request: &CreateRequest) -> Result<CreateResponse> {
        let input = TeamStackPermissionInput::from_property_map(&request.properties)?;
        if request.preview {
            return Ok(CreateResponse::preview(input.to_property_map()));
        }
        info!(stack = %input.stack, team = %input.team, permission = input.permission, "Granting stack permission");

        self.client
            .add_stack_permission(&input.stack, &input.team, input.permission)
            .await?;

        Ok(CreateResponse {
            id: input.id().encode(),
            properties: input.to_property_map(),
        })
    }

    async fn read(&self, request: &ReadRequest) -> Result<ReadResponse> {
        let id = TeamStackPermissionId::decode(&request.id)?;
        debug!(id = %request.id, "Reading team stack permission");

        let permission = self
            .client
            .get_team_stack_permission(&id.stack, &id.team)
            .await
            .map_err(|e| ProviderError::operation("failed to get team stack permission", e))?;
        let Some(permission) = permission else {
            return Ok(ReadResponse::absent());
        };

        let props = TeamStackPermissionInput {
            stack: id.stack,
            team: id.team,
            permission,
        }
        .to_property_map();
        Ok(ReadResponse {
            id: request.id.clone(),
            properties: props.clone(),
            inputs: props,
        })
    }

    async fn update(&self, _request: &UpdateRequest) -> Result<UpdateResponse> {
        Err(ProviderError::unexpected_update(TEAM_STACK_PERMISSION))
    }

    async fn delete(&self, request: &DeleteRequest) -> Result<()> {
        let input = TeamStackPermissionInput::from_property_map(&request.properties)?;
        info!(stack = %input.stack, team = %input.team, "Revoking stack permission");
        self.client
            .remove_stack_permission(&input.stack, &input.team)
            .await?;
        Ok(())
    }
}
