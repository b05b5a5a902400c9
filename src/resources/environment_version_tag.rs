//! Named tags pointing at an environment revision.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::client::PulumiServiceApi;
use crate::diff::{DiffResponse, ReplaceKeys};
use crate::error::{PropertyError, ProviderError, Result};
use crate::id::{CompositeId, EnvironmentId, EnvironmentTagId, DEFAULT_PROJECT};
use crate::property::PropertyMap;

use super::handler::{
    CheckFailure, CheckRequest, CheckResponse, CreateRequest, CreateResponse, DeleteRequest,
    DiffRequest, ReadRequest, ReadResponse, ResourceHandler, UpdateRequest, UpdateResponse,
};

/// Type token.
pub const ENVIRONMENT_VERSION_TAG: &str = "pulumiservice:index:EnvironmentVersionTag";

const REPLACE_KEYS: &[&str] = &["organization", "project", "environment", "tagName"];

/// Declared state of a version tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentVersionTagInput {
    /// Tagged environment and tag name.
    pub id: EnvironmentTagId,
    /// Revision the tag points at.
    pub revision: i64,
}

impl EnvironmentVersionTagInput {
    /// Decodes the input from properties. `project` defaults to `default`.
    ///
    /// # Errors
    ///
    /// Returns a [`PropertyError`] for a missing or mistyped key.
    pub fn from_property_map(props: &PropertyMap) -> std::result::Result<Self, PropertyError> {
        Ok(Self {
            id: EnvironmentTagId {
                environment: EnvironmentId::new(
                    props.required_str("organization")?,
                    props.optional_str("project")?.unwrap_or(DEFAULT_PROJECT),
                    props.required_str("environment")?,
                ),
                tag: props.required_str("tagName")?.to_string(),
            },
            revision: props.required_i64("revision")?,
        })
    }

    /// Encodes the input as properties.
    #[must_use]
    pub fn to_property_map(&self) -> PropertyMap {
        let environment = &self.id.environment;
        crate::props! {
            "organization" => &environment.organization,
            "project" => &environment.project,
            "environment" => &environment.environment,
            "tagName" => &self.id.tag,
            "revision" => self.revision,
        }
    }
}

/// Manages a version tag; changing the revision moves the tag in place.
pub struct EnvironmentVersionTagResource {
    client: Arc<dyn PulumiServiceApi>,
}

impl EnvironmentVersionTagResource {
    /// Creates the handler.
    #[must_use]
    pub fn new(client: Arc<dyn PulumiServiceApi>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ResourceHandler for EnvironmentVersionTagResource {
    fn name(&self) -> &'static str {
        ENVIRONMENT_VERSION_TAG
    }

    fn check(&self, request: &CheckRequest) -> Result<CheckResponse> {
        let mut inputs = request.news.clone();
        let mut failures =
            CheckFailure::missing(&inputs, &["organization", "environment", "tagName", "revision"]);
        if !inputs.contains_key("project") {
            inputs.insert("project", DEFAULT_PROJECT);
        }
        if let Err(e) = inputs.optional_i64("revision") {
            failures.push(e.into());
        }
        Ok(CheckResponse { inputs, failures })
    }

    fn diff(&self, request: &DiffRequest) -> Result<DiffResponse> {
        Ok(request.diff_inputs(ReplaceKeys::Only(REPLACE_KEYS)))
    }

    async fn create(&self, request: &CreateRequest) -> Result<CreateResponse> {
        let input = EnvironmentVersionTagInput::from_property_map(&request.properties)?;
        if request.preview {
            return Ok(CreateResponse::preview(input.to_property_map()));
        }
        info!(environment = %input.id.environment, tag = %input.id.tag, revision = input.revision, "Creating environment version tag");

        self.client
            .create_environment_revision_tag(&input.id.environment, &input.id.tag, input.revision)
            .await?;

        Ok(CreateResponse {
            id: input.id.encode(),
            properties: input.to_property_map(),
        })
    }

    async fn read(&self, request: &ReadRequest) -> Result<ReadResponse> {
        let id = EnvironmentTagId::decode(&request.id)?;
        debug!(id = %request.id, "Reading environment version tag");

        let tag = self
            .client
            .get_environment_revision_tag(&id.environment, &id.tag)
            .await
            .map_err(|e| {
                ProviderError::operation(
                    format!("failed to read EnvironmentVersionTag ({:?})", request.id),
                    e,
                )
            })?;
        let Some(tag) = tag else {
            return Ok(ReadResponse::absent());
        };

        let props = EnvironmentVersionTagInput {
            id,
            revision: tag.revision,
        }
        .to_property_map();
        Ok(ReadResponse {
            id: request.id.clone(),
            properties: props.clone(),
            inputs: props,
        })
    }

    async fn update(&self, request: &UpdateRequest) -> Result<UpdateResponse> {
        let input = EnvironmentVersionTagInput::from_property_map(&request.news)?;
        if request.preview {
            return Ok(UpdateResponse {
                properties: input.to_property_map(),
            });
        }
        info!(environment = %input.id.environment, tag = %input.id.tag, revision = input.revision, "Moving environment version tag");

        self.client
            .update_environment_revision_tag(&input.id.environment, &input.id.tag, input.revision)
            .await?;
        Ok(UpdateResponse {
            properties: input.to_property_map(),
        })
    }

    async fn delete(&self, request: &DeleteRequest) -> Result<()> {
        let input = EnvironmentVersionTagInput::from_property_map(&request.properties)?;
        info!(environment = %input.id.environment, tag = %input.id.tag, "Deleting environment version tag");
        self.client
            .delete_environment_revision_tag(&input.id.environment, &input.id.tag)
            .await?;
        Ok(())
    }
}
