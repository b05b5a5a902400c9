//! Time-to-live schedules that destroy a stack at a given time.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use tracing::{debug, info};

use crate::client::{PulumiServiceApi, TtlScheduleRequest};
use crate::diff::{DiffResponse, ReplaceKeys};
use crate::error::{PropertyError, ProviderError, Result};
use crate::id::{CompositeId, StackName, TtlScheduleId};
use crate::property::{PropertyMap, PropertyValue};

use super::deployment_schedule::{
    check_timestamp, diff_schedule, format_timestamp, parse_service_timestamp, parse_timestamp,
    schedule_id, SCHEDULE_ID,
};
use super::handler::{
    stack_from_properties, stack_properties, CheckFailure, CheckRequest, CheckResponse,
    CreateRequest, CreateResponse, DeleteRequest, DiffRequest, ReadRequest, ReadResponse,
    ResourceHandler, UpdateRequest, UpdateResponse,
};

/// Type token.
pub const TTL_SCHEDULE: &str = "pulumiservice:index:TtlSchedule";

const REPLACE_KEYS: &[&str] = &["organization", "project", "stack", "timestamp"];

/// Declared state of a TTL schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TtlScheduleInput {
    /// Stack to destroy.
    pub stack: StackName,
    /// When to destroy it.
    pub timestamp: DateTime<FixedOffset>,
    /// Whether to delete the stack itself after destroying its resources.
    pub delete_after_destroy: bool,
}

impl TtlScheduleInput {
    /// Decodes the input from properties.
    ///
    /// # Errors
    ///
    /// Returns a [`PropertyError`] for a missing or mistyped key or a
    /// timestamp that is not RFC 3339.
    pub fn from_property_map(props: &PropertyMap) -> std::result::Result<Self, PropertyError> {
        Ok(Self {
            stack: stack_from_properties(props)?,
            timestamp: parse_timestamp("timestamp", props.required_str("timestamp")?)?,
            delete_after_destroy: props.optional_bool("deleteAfterDestroy")?.unwrap_or(false),
        })
    }

    /// Encodes the input as properties. `deleteAfterDestroy` is always present.
    #[must_use]
    pub fn to_property_map(&self) -> PropertyMap {
        let mut props = stack_properties(&self.stack);
        props.insert("timestamp", format_timestamp(&self.timestamp));
        props.insert("deleteAfterDestroy", self.delete_after_destroy);
        props
    }

    /// Outputs: the inputs plus the schedule ID.
    #[must_use]
    pub fn to_outputs(&self, schedule_id: &str) -> PropertyMap {
        let mut props = self.to_property_map();
        props.insert(SCHEDULE_ID, schedule_id);
        props
    }

    fn to_request(&self) -> TtlScheduleRequest {
        TtlScheduleRequest {
            timestamp: self.timestamp.to_utc(),
            delete_after_destroy: self.delete_after_destroy,
        }
    }
}

/// Manages a TTL schedule.
pub struct TtlScheduleResource {
    client: Arc<dyn PulumiServiceApi>,
}

impl TtlScheduleResource {
    /// Creates the handler.
    #[must_use]
    pub fn new(client: Arc<dyn PulumiServiceApi>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ResourceHandler for TtlScheduleResource {
    fn name(&self) -> &'static str {
        TTL_SCHEDULE
    }

    fn check(&self, request: &CheckRequest) -> Result<CheckResponse> {
        let news = &request.news;
        let mut failures =
            CheckFailure::missing(news, &["organization", "project", "stack", "timestamp"]);
        check_timestamp(news, &mut failures);
        if news
            .get("deleteAfterDestroy")
            .is_some_and(|v| v.as_bool().is_none())
        {
            failures.push(CheckFailure::new(
                "deleteAfterDestroy",
                "deleteAfterDestroy property is present but can't be parsed as bool",
            ));
        }

        Ok(CheckResponse {
            inputs: news.clone(),
            failures,
        })
    }

    fn diff(&self, request: &DiffRequest) -> Result<DiffResponse> {
        let mut request = request.clone();
        if !request.news.contains_key("deleteAfterDestroy") {
            request
                .news
                .insert("deleteAfterDestroy", PropertyValue::Bool(false));
        }
        Ok(diff_schedule(&request, ReplaceKeys::Only(REPLACE_KEYS)))
    }

    async fn create(&self, request: &CreateRequest) -> Result<CreateResponse> {
        let input = TtlScheduleInput::from_property_map(&request.properties)?;
        if request.preview {
            let mut outputs = input.to_property_map();
            outputs.insert(SCHEDULE_ID, PropertyValue::Computed);
            return Ok(CreateResponse::preview(outputs));
        }
        info!(stack = %input.stack, timestamp = %input.timestamp, "Creating TTL schedule");

        let schedule_id = self
            .client
            .create_ttl_schedule(&input.stack, &input.to_request())
            .await?;
        let id = TtlScheduleId {
            stack: input.stack.clone(),
            schedule_id: schedule_id.clone(),
        };

        Ok(CreateResponse {
            id: id.encode(),
            properties: input.to_outputs(&schedule_id),
        })
    }

    async fn read(&self, request: &ReadRequest) -> Result<ReadResponse> {
        let id = TtlScheduleId::decode(&request.id)?;
        let context = || format!("failed to read TtlSchedule ({:?})", request.id);
        debug!(id = %request.id, "Reading TTL schedule");

        let schedule = self
            .client
            .get_stack_schedule(&id.stack, &id.schedule_id)
            .await
            .map_err(|e| ProviderError::operation(context(), e))?;
        let Some(schedule) = schedule else {
            return Ok(ReadResponse::absent());
        };

        let raw = schedule.schedule_once.as_deref().unwrap_or_default();
        let timestamp = parse_service_timestamp(raw).ok_or_else(|| {
            ProviderError::internal(format!("{}: unrecognized timestamp {raw:?}", context()))
        })?;
        let delete_after_destroy = schedule
            .definition
            .request
            .operation_context
            .is_some_and(|ctx| ctx.options.delete_after_destroy);
        let input = TtlScheduleInput {
            stack: id.stack,
            timestamp,
            delete_after_destroy,
        };

        Ok(ReadResponse {
            id: request.id.clone(),
            properties: input.to_outputs(&id.schedule_id),
            inputs: input.to_property_map(),
        })
    }

    async fn update(&self, request: &UpdateRequest) -> Result<UpdateResponse> {
        let previous = schedule_id(&request.olds)?;
        let input = TtlScheduleInput::from_property_map(&request.news)?;
        if request.preview {
            return Ok(UpdateResponse {
                properties: input.to_outputs(previous),
            });
        }
        info!(stack = %input.stack, schedule = previous, "Updating TTL schedule");

        let schedule_id = self
            .client
            .update_ttl_schedule(&input.stack, previous, &input.to_request())
            .await?;

        Ok(UpdateResponse {
            properties: input.to_outputs(&schedule_id),
        })
    }

    async fn delete(&self, request: &DeleteRequest) -> Result<()> {
        let stack = stack_from_properties(&request.properties)?;
        let schedule = schedule_id(&request.properties)?;
        info!(stack = %stack, schedule, "Deleting TTL schedule");
        self.client.delete_stack_schedule(&stack, schedule).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{
        MockPulumiServiceApi, ScheduleDefinition, ScheduleOperationContext,
        ScheduleOperationOptions, ScheduleResponse, ScheduledDeployment,
    };
    use crate::diff::DiffChanges;
    use crate::props;

    fn inputs() -> PropertyMap {
        props! {
            "organization" => "acme",
            "project" => "web",
            "stack" => "review-42",
            "timestamp" => "2030-06-01T12:00:00Z",
        }
    }

    #[test]
    fn test_check_flags_non_bool_delete_after_destroy() {
        let handler = TtlScheduleResource::new(Arc::new(MockPulumiServiceApi::new()));
        let mut news = inputs();
        news.insert("deleteAfterDestroy", "yes");
        let response = handler
            .check(&CheckRequest {
                news,
                ..CheckRequest::default()
            })
            .expect("check");
        assert_eq!(
            response.failures,
            vec![CheckFailure::new(
                "deleteAfterDestroy",
                "deleteAfterDestroy property is present but can't be parsed as bool"
            )]
        );
    }

    #[test]
    fn test_absent_delete_after_destroy_equals_false() {
        let handler = TtlScheduleResource::new(Arc::new(MockPulumiServiceApi::new()));
        let mut olds = inputs();
        olds.insert("deleteAfterDestroy", false);
        let response = handler
            .diff(&DiffRequest {
                old_inputs: Some(olds),
                news: inputs(),
                ..DiffRequest::default()
            })
            .expect("diff");
        assert_eq!(response.changes, DiffChanges::None);
    }

    #[tokio::test]
    async fn test_create_uses_ttl_id_format() {
        let mut api = MockPulumiServiceApi::new();
        api.expect_create_ttl_schedule()
            .withf(|stack, request| stack.stack == "review-42" && !request.delete_after_destroy)
            .returning(|_, _| Ok("ttl-9".to_string()));
        let handler = TtlScheduleResource::new(Arc::new(api));

        let response = handler
            .create(&CreateRequest {
                properties: inputs(),
                ..CreateRequest::default()
            })
            .await
            .expect("create");
        assert_eq!(response.id, "acme/web/review-42/ttl/ttl-9");
        assert_eq!(
            response.properties.get("deleteAfterDestroy"),
            Some(&PropertyValue::Bool(false))
        );
    }

    #[tokio::test]
    async fn test_read_reports_delete_after_destroy() {
        let mut api = MockPulumiServiceApi::new();
        api.expect_get_stack_schedule().returning(|_, id| {
            Ok(Some(ScheduleResponse {
                id: id.to_string(),
                schedule_once: Some("2030-06-01 12:00:00".to_string()),
                schedule_cron: None,
                definition: ScheduleDefinition {
                    request: ScheduledDeployment {
                        operation: Some("destroy".to_string()),
                        operation_context: Some(ScheduleOperationContext {
                            options: ScheduleOperationOptions {
                                delete_after_destroy: true,
                                ..ScheduleOperationOptions::default()
                            },
                        }),
                    },
                },
            }))
        });
        let handler = TtlScheduleResource::new(Arc::new(api));

        let response = handler
            .read(&ReadRequest {
                id: "acme/web/review-42/ttl/ttl-9".to_string(),
                ..ReadRequest::default()
            })
            .await
            .expect("read");
        let mut expected = inputs();
        expected.insert("deleteAfterDestroy", true);
        assert_eq!(response.inputs, expected);
    }

    #[tokio::test]
    async fn test_read_missing_schedule_is_absent() {
        let mut api = MockPulumiServiceApi::new();
        api.expect_get_stack_schedule().returning(|_, _| Ok(None));
        let handler = TtlScheduleResource::new(Arc::new(api));

        let response = handler
            .read(&ReadRequest {
                id: "acme/web/review-42/ttl/ttl-9".to_string(),
                ..ReadRequest::default()
            })
            .await
            .expect("read");
        assert!(response.is_absent());
    }


    #[test]
    fn test_input_survives_property_encoding() {
        let input = TtlScheduleInput {
            stack: StackName::new("acme", "web", "review-42"),
            timestamp: DateTime::parse_from_rfc3339("2030-06-01T14:00:00+02:00").expect("timestamp"),
            delete_after_destroy: true,
        };
        assert_eq!(
            TtlScheduleInput::from_property_map(&input.to_property_map()).expect("decode"),
            input
        );
    }

    #[tokio::test]
    async fn test_preview_update_keeps_schedule_id() {
        let handler = TtlScheduleResource::new(Arc::new(MockPulumiServiceApi::new()));
        let mut olds = inputs();
        olds.insert(SCHEDULE_ID, "ttl-9");
        let response = handler
            .update(&UpdateRequest {
                id: "acme/web/review-42/ttl/ttl-9".to_string(),
                olds,
                news: inputs(),
                preview: true,
                ..UpdateRequest::default()
            })
            .await
            .expect("update");
        assert_eq!(
            response.properties.get(SCHEDULE_ID),
            Some(&PropertyValue::from("ttl-9"))
        );
    }
}
