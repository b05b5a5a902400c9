//! A single tag on a stack.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::client::{PulumiServiceApi, StackTag};
use crate::diff::{DiffResponse, ReplaceKeys};
use crate::error::{PropertyError, ProviderError, Result};
use crate::id::{CompositeId, StackName, StackTagId};
use crate::property::PropertyMap;

use super::handler::{
    stack_from_properties, stack_properties, CheckFailure, CheckRequest, CheckResponse, CreateRequest,
    CreateResponse, DeleteRequest, DiffRequest, ReadRequest, ReadResponse, ResourceHandler,
    UpdateRequest, UpdateResponse,
};

/// Type token.
pub const STACK_TAG: &str = "pulumiservice:index:StackTag";

const REQUIRED: &[&str] = &["organization", "project", "stack", "name", "value"];

/// Declared state of a stack tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackTagInput {
    /// Tagged stack.
    pub stack: StackName,
    /// Tag name.
    pub name: String,
    /// Tag value.
    pub value: String,
}

impl StackTagInput {
    /// Decodes the input from properties.
    ///
    /// # Errors
    ///
    /// Returns a [`PropertyError`] for a missing or mistyped key.
    pub fn from_property_map(props: &PropertyMap) -> std::result::Result<Self, PropertyError> {
        Ok(Self {
            stack: stack_from_properties(props)?,
            name: props.required_str("name")?.to_string(),
            value: props.required_str("value")?.to_string(),
        })
    }

    /// Encodes the input as properties.
    #[must_use]
    pub fn to_property_map(&self) -> PropertyMap {
        let mut props = stack_properties(&self.stack);
        props.insert("name", &self.name);
        props.insert("value", &self.value);
        props
    }

    fn id(&self) -> StackTagId {
        StackTagId {
            stack: self.stack.clone(),
            tag: self.name.clone(),
        }
    }
}

/// Manages one tag; every change replaces it.
pub struct StackTagResource {
    client: Arc<dyn PulumiServiceApi>,
}

impl StackTagResource {
    /// Creates the handler.
    #[must_use]
    pub fn new(client: Arc<dyn PulumiServiceApi>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ResourceHandler for StackTagResource {
    fn name(&self) -> &'static str {
        STACK_TAG
    }

    fn check(&self, request: &CheckRequest) -> Result<CheckResponse> {
        let mut failures = CheckFailure::missing(&request.news, REQUIRED);
        if failures.is_empty() {
            if let Err(e) = StackTagInput::from_property_map(&request.news) {
                failures.push(e.into());
            }
        }
        Ok(CheckResponse {
            inputs: request.news.clone(),
            failures,
        })
    }

    fn diff(&self, request: &DiffRequest) -> Result<DiffResponse> {
        Ok(request.diff_inputs(ReplaceKeys::All))
    }

    async fn create(&self, request: &CreateRequest) -> Result<CreateResponse> {
        let input = StackTagInput::from_property_map(&request.properties)?;
        if request.preview {
            return Ok(CreateResponse::preview(input.to_property_map()));
        }
        info!(stack = %input.stack, tag = %input.name, "Creating stack tag");

        let tag = StackTag {
            name: input.name.clone(),
            value: input.value.clone(),
        };
        self.client.create_stack_tag(&input.stack, &tag).await?;

        Ok(CreateResponse {
            id: input.id().encode(),
            properties: request.properties.clone(),
        })
    }

    async fn read(&self, request: &ReadRequest) -> Result<ReadResponse> {
        let id = StackTagId::decode(&request.id)?;
        debug!(id = %request.id, "Reading stack tag");

        let tag = self
            .client
            .get_stack_tag(&id.stack, &id.tag)
            .await
            .map_err(|e| {
                ProviderError::operation(format!("failed to read StackTag ({:?})", request.id), e)
            })?;
        let Some(tag) = tag else {
            return Ok(ReadResponse::absent());
        };

        let props = StackTagInput {
            stack: id.stack,
            name: tag.name,
            value: tag.value,
        }
        .to_property_map();
        Ok(ReadResponse {
            id: request.id.clone(),
            properties: props.clone(),
            inputs: props,
        })
    }

    async fn update(&self, _request: &UpdateRequest) -> Result<UpdateResponse> {
        Err(ProviderError::unexpected_update(STACK_TAG))
    }

    async fn delete(&self, request: &DeleteRequest) -> Result<()> {
        let input = StackTagInput::from_property_map(&request.properties)?;
        info!(stack = %input.stack, tag = %input.name, "Deleting stack tag");
        self.client
            .delete_stack_tag(&input.stack, &input.name)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockPulumiServiceApi;
    use crate::diff::DiffChanges;
    use crate::error::ApiError;
    use crate::props;

    fn inputs() -> PropertyMap {
        props! {
            "organization" => "acme",
            "project" => "web",
            "stack" => "prod",
            "name" => "owner",
            "value" => "platform",
        }
    }

    #[tokio::test]
    async fn test_create_returns_four_part_id() {
        let mut api = MockPulumiServiceApi::new();
        api.expect_create_stack_tag()
            .withf(|stack, tag| stack.stack == "prod" && tag.name == "owner" && tag.value == "platform")
            .times(1)
            .returning(|_, _| Ok(()));
        let handler = StackTagResource::new(Arc::new(api));

        let response = handler
            .create(&CreateRequest {
                properties: inputs(),
                ..CreateRequest::default()
            })
            .await
            .expect("create");
        assert_eq!(response.id, "acme/web/prod/owner");
        assert_eq!(response.properties, inputs());
    }

    #[tokio::test]
    async fn test_read_missing_tag_is_absent() {
        let mut api = MockPulumiServiceApi::new();
        api.expect_get_stack_tag()
            .withf(|_, name| name == "nonexistent")
            .returning(|_, _| Ok(None));
        let handler = StackTagResource::new(Arc::new(api));

        let response = handler
            .read(&ReadRequest {
                id: "org/project/stack/nonexistent".to_string(),
                ..ReadRequest::default()
            })
            .await
            .expect("read");
        assert!(response.is_absent());
        assert!(response.properties.is_empty());
    }

    #[tokio::test]
    async fn test_read_error_names_the_resource() {
        let mut api = MockPulumiServiceApi::new();
        api.expect_get_stack_tag()
            .returning(|_, _| Err(ApiError::api_error(404, "stack not found")));
        let handler = StackTagResource::new(Arc::new(api));

        let err = handler
            .read(&ReadRequest {
                id: "acme/web/gone/owner".to_string(),
                ..ReadRequest::default()
            })
            .await
            .expect_err("stack lookup fails");
        assert_eq!(
            err.to_string(),
            "failed to read StackTag (\"acme/web/gone/owner\"): 404 API error: stack not found"
        );
    }

    #[tokio::test]
    async fn test_read_rebuilds_properties_from_id() {
        let mut api = MockPulumiServiceApi::new();
        api.expect_get_stack_tag().returning(|_, name| {
            Ok(Some(StackTag {
                name: name.to_string(),
                value: "platform".to_string(),
            }))
        });
        let handler = StackTagResource::new(Arc::new(api));

        let response = handler
            .read(&ReadRequest {
                id: "acme/web/prod/owner".to_string(),
                ..ReadRequest::default()
            })
            .await
            .expect("read");
        assert_eq!(response.id, "acme/web/prod/owner");
        assert_eq!(response.inputs, inputs());
    }

    #[tokio::test]
    async fn test_read_rejects_malformed_id() {
        let handler = StackTagResource::new(Arc::new(MockPulumiServiceApi::new()));
        let err = handler
            .read(&ReadRequest {
                id: "acme/web/prod".to_string(),
                ..ReadRequest::default()
            })
            .await
            .expect_err("three parts");
        assert!(matches!(err, ProviderError::Id(_)));
    }

    #[test]
    fn test_every_change_replaces() {
        let handler = StackTagResource::new(Arc::new(MockPulumiServiceApi::new()));
        let mut news = inputs();
        news.insert("value", "security");
        let response = handler
            .diff(&DiffRequest {
                old_inputs: Some(inputs()),
                news,
                ..DiffRequest::default()
            })
            .expect("diff");
        assert_eq!(response.changes, DiffChanges::Some);
        assert_eq!(response.replaces, vec!["value".to_string()]);
        assert!(response.delete_before_replace);
    }

    #[tokio::test]
    async fn test_update_is_a_contract_violation() {
        let handler = StackTagResource::new(Arc::new(MockPulumiServiceApi::new()));
        let err = handler
            .update(&UpdateRequest::default())
            .await
            .expect_err("update");
        assert!(matches!(err, ProviderError::UnexpectedUpdate { .. }));
    }

    #[test]
    fn test_check_reports_missing_value() {
        let handler = StackTagResource::new(Arc::new(MockPulumiServiceApi::new()));
        let mut news = inputs();
        news.remove("value");
        let response = handler
            .check(&CheckRequest {
                news,
                ..CheckRequest::default()
            })
            .expect("check");
        assert_eq!(
            response.failures,
            vec![CheckFailure::new("value", "missing required property 'value'")]
        );
    }

    #[test]
    fn test_check_reports_mistyped_name() {
        let handler = StackTagResource::new(Arc::new(MockPulumiServiceApi::new()));
        let mut news = inputs();
        news.insert("name", true);
        let response = handler
            .check(&CheckRequest {
                news,
                ..CheckRequest::default()
            })
            .expect("check");
        assert_eq!(response.failures.len(), 1);
        assert_eq!(response.failures[0].property, "name");
    }

    #[tokio::test]
    async fn test_preview_create_posts_nothing() {
        let mut api = MockPulumiServiceApi::new();
        api.expect_create_stack_tag().never();
        let handler = StackTagResource::new(Arc::new(api));

        let response = handler
            .create(&CreateRequest {
                properties: inputs(),
                preview: true,
                ..CreateRequest::default()
            })
            .await
            .expect("preview");
        assert!(response.id.is_empty());
        assert_eq!(response.properties, inputs());
    }

    #[test]
    fn test_input_survives_property_encoding() {
        let input = StackTagInput {
            stack: StackName::new("acme", "web", "prod"),
            name: "owner".to_string(),
            value: "platform".to_string(),
        };
        assert_eq!(StackTagInput::from_property_map(&input.to_property_map()), Ok(input));
    }
}
