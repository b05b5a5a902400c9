//! Recurring drift detection runs against a stack.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::client::{DriftScheduleRequest, PulumiServiceApi};
use crate::diff::{DiffResponse, ReplaceKeys};
use crate::error::{PropertyError, ProviderError, Result};
use crate::id::{CompositeId, DriftScheduleId, StackName};
use crate::property::{PropertyMap, PropertyValue};

use super::deployment_schedule::{diff_schedule, schedule_id, SCHEDULE_ID};
use super::handler::{
    stack_from_properties, stack_properties, CheckFailure, CheckRequest, CheckResponse,
    CreateRequest, CreateResponse, DeleteRequest, DiffRequest, ReadRequest, ReadResponse,
    ResourceHandler, UpdateRequest, UpdateResponse,
};

/// Type token.
pub const DRIFT_SCHEDULE: &str = "pulumiservice:index:DriftSchedule";

const REPLACE_KEYS: &[&str] = &["organization", "project", "stack"];

/// Declared state of a drift schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriftScheduleInput {
    /// Stack to check for drift.
    pub stack: StackName,
    /// Cron expression for the runs.
    pub schedule_cron: String,
    /// Whether a run that detects drift also remediates it.
    pub auto_remediate: bool,
}

impl DriftScheduleInput {
    /// Decodes the input from properties.
    ///
    /// # Errors
    ///
    /// Returns a [`PropertyError`] for a missing or mistyped key.
    pub fn from_property_map(props: &PropertyMap) -> std::result::Result<Self, PropertyError> {
        Ok(Self {
            stack: stack_from_properties(props)?,
            schedule_cron: props.required_str("scheduleCron")?.to_string(),
            auto_remediate: props.optional_bool("autoRemediate")?.unwrap_or(false),
        })
    }

    /// Encodes the input as properties. `autoRemediate` is always present.
    #[must_use]
    pub fn to_property_map(&self) -> PropertyMap {
        let mut props = stack_properties(&self.stack);
        props.insert("scheduleCron", self.schedule_cron.as_str());
        props.insert("autoRemediate", self.auto_remediate);
        props
    }

    /// Outputs: the inputs plus the schedule ID.
    #[must_use]
    pub fn to_outputs(&self, schedule_id: &str) -> PropertyMap {
        let mut props = self.to_property_map();
        props.insert(SCHEDULE_ID, schedule_id);
        props
    }

    fn to_request(&self) -> DriftScheduleRequest {
        DriftScheduleRequest {
            schedule_cron: self.schedule_cron.clone(),
            auto_remediate: self.auto_remediate,
        }
    }
}

/// Manages a drift detection schedule.
pub struct DriftScheduleResource {
    client: Arc<dyn PulumiServiceApi>,
}

impl DriftScheduleResource {
    /// Creates the handler.
    #[must_use]
    pub fn new(client: Arc<dyn PulumiServiceApi>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ResourceHandler for DriftScheduleResource {
    fn name(&self) -> &'static str {
        DRIFT_SCHEDULE
    }

    fn check(&self, request: &CheckRequest) -> Result<CheckResponse> {
        let news = &request.news;
        let mut failures =
            CheckFailure::missing(news, &["organization", "project", "stack", "scheduleCron"]);
        if news
            .get("scheduleCron")
            .is_some_and(|v| v.secret_or_string().is_none())
        {
            failures.push(CheckFailure::new("scheduleCron", "scheduleCron must be a string"));
        }
        if news
            .get("autoRemediate")
            .is_some_and(|v| v.as_bool().is_none())
        {
            failures.push(CheckFailure::new(
                "autoRemediate",
                "autoRemediate property is present but can't be parsed as bool",
            ));
        }

        Ok(CheckResponse {
            inputs: news.clone(),
            failures,
        })
    }

    fn diff(&self, request: &DiffRequest) -> Result<DiffResponse> {
        let mut request = request.clone();
        if !request.news.contains_key("autoRemediate") {
            request
                .news
                .insert("autoRemediate", PropertyValue::Bool(false));
        }
        Ok(diff_schedule(&request, ReplaceKeys::Only(REPLACE_KEYS)))
    }

    async fn create(&self, request: &CreateRequest) -> Result<CreateResponse> {
        let input = DriftScheduleInput::from_property_map(&request.properties)?;
        if request.preview {
            let mut outputs = input.to_property_map();
            outputs.insert(SCHEDULE_ID, PropertyValue::Computed);
            return Ok(CreateResponse::preview(outputs));
        }
        info!(stack = %input.stack, cron = %input.schedule_cron, "Creating drift schedule");

        let schedule_id = self
            .client
            .create_drift_schedule(&input.stack, &input.to_request())
            .await?;
        let id = DriftScheduleId {
            stack: input.stack.clone(),
            schedule_id: schedule_id.clone(),
        };

        Ok(CreateResponse {
            id: id.encode(),
            properties: input.to_outputs(&schedule_id),
        })
    }

    async fn read(&self, request: &ReadRequest) -> Result<ReadResponse> {
        let id = DriftScheduleId::decode(&request.id)?;
        let context = || format!("failed to read DriftSchedule ({:?})", request.id);
        debug!(id = %request.id, "Reading drift schedule");

        let schedule = self
            .client
            .get_stack_schedule(&id.stack, &id.schedule_id)
            .await
            .map_err(|e| ProviderError::operation(context(), e))?;
        let Some(schedule) = schedule else {
            return Ok(ReadResponse::absent());
        };

        let auto_remediate = schedule
            .definition
            .request
            .operation_context
            .is_some_and(|ctx| ctx.options.auto_remediate);
        let input = DriftScheduleInput {
            stack: id.stack,
            schedule_cron: schedule.schedule_cron.unwrap_or_default(),
            auto_remediate,
        };

        Ok(ReadResponse {
            id: request.id.clone(),
            properties: input.to_outputs(&id.schedule_id),
            inputs: input.to_property_map(),
        })
    }

    async fn update(&self, request: &UpdateRequest) -> Result<UpdateResponse> {
        let previous = schedule_id(&request.olds)?;
        let input = DriftScheduleInput::from_property_map(&request.news)?;
        if request.preview {
            return Ok(UpdateResponse {
                properties: input.to_outputs(previous),
            });
        }
        info!(stack = %input.stack, schedule = previous, "Updating drift schedule");

        let schedule_id = self
            .client
            .update_drift_schedule(&input.stack, previous, &input.to_request())
            .await?;

        Ok(UpdateResponse {
            properties: input.to_outputs(&schedule_id),
        })
    }

    async fn delete(&self, request: &DeleteRequest) -> Result<()> {
        let stack = stack_from_properties(&request.properties)?;
        let schedule = schedule_id(&request.properties)?;
        info!(stack = %stack, schedule, "Deleting drift schedule");
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
            "stack" => "prod",
            "scheduleCron" => "0 */6 * * *",
        }
    }

    fn check(news: PropertyMap) -> CheckResponse {
        DriftScheduleResource::new(Arc::new(MockPulumiServiceApi::new()))
            .check(&CheckRequest {
                news,
                ..CheckRequest::default()
            })
            .expect("check")
    }

    #[test]
    fn test_check_requires_cron() {
        let mut news = inputs();
        news.remove("scheduleCron");
        assert_eq!(
            check(news).failures,
            vec![CheckFailure::new(
                "scheduleCron",
                "missing required property 'scheduleCron'"
            )]
        );
    }

    #[test]
    fn test_check_flags_non_bool_auto_remediate() {
        let mut news = inputs();
        news.insert("autoRemediate", "always");
        assert_eq!(
            check(news).failures,
            vec![CheckFailure::new(
                "autoRemediate",
                "autoRemediate property is present but can't be parsed as bool"
            )]
        );
    }

    #[test]
    fn test_absent_auto_remediate_equals_false() {
        let handler = DriftScheduleResource::new(Arc::new(MockPulumiServiceApi::new()));
        let mut olds = inputs();
        olds.insert("autoRemediate", false);
        let response = handler
            .diff(&DiffRequest {
                old_inputs: Some(olds),
                news: inputs(),
                ..DiffRequest::default()
            })
            .expect("diff");
        assert_eq!(response.changes, DiffChanges::None);
    }

    #[test]
    fn test_cron_change_updates_in_place() {
        let handler = DriftScheduleResource::new(Arc::new(MockPulumiServiceApi::new()));
        let mut news = inputs();
        news.insert("scheduleCron", "0 0 * * *");
        let response = handler
            .diff(&DiffRequest {
                old_inputs: Some(inputs()),
                news,
                ..DiffRequest::default()
            })
            .expect("diff");
        assert_eq!(response.changes, DiffChanges::Some);
        assert!(response.replaces.is_empty());
    }

    #[tokio::test]
    async fn test_create_uses_drift_id_format() {
        let mut api = MockPulumiServiceApi::new();
        api.expect_create_drift_schedule()
            .withf(|stack, request| {
                stack.stack == "prod"
                    && request.schedule_cron == "0 */6 * * *"
                    && !request.auto_remediate
            })
            .returning(|_, _| Ok("drift-1".to_string()));
        let handler = DriftScheduleResource::new(Arc::new(api));

        let response = handler
            .create(&CreateRequest {
                properties: inputs(),
                ..CreateRequest::default()
            })
            .await
            .expect("create");
        assert_eq!(response.id, "acme/web/prod/drift/drift-1");
        assert_eq!(
            response.properties.get(SCHEDULE_ID),
            Some(&PropertyValue::from("drift-1"))
        );
    }

    #[tokio::test]
    async fn test_preview_create_leaves_schedule_id_unknown() {
        let handler = DriftScheduleResource::new(Arc::new(MockPulumiServiceApi::new()));
        let response = handler
            .create(&CreateRequest {
                properties: inputs(),
                preview: true,
                ..CreateRequest::default()
            })
            .await
            .expect("create");
        assert!(response.id.is_empty());
        assert_eq!(response.properties.get(SCHEDULE_ID), Some(&PropertyValue::Computed));
    }

    #[tokio::test]
    async fn test_read_reports_auto_remediate() {
        let mut api = MockPulumiServiceApi::new();
        api.expect_get_stack_schedule().returning(|_, id| {
            Ok(Some(ScheduleResponse {
                id: id.to_string(),
                schedule_once: None,
                schedule_cron: Some("0 */6 * * *".to_string()),
                definition: ScheduleDefinition {
                    request: ScheduledDeployment {
                        operation: Some("detect-drift".to_string()),
                        operation_context: Some(ScheduleOperationContext {
                            options: ScheduleOperationOptions {
                                auto_remediate: true,
                                ..ScheduleOperationOptions::default()
                            },
                        }),
                    },
                },
            }))
        });
        let handler = DriftScheduleResource::new(Arc::new(api));

        let response = handler
            .read(&ReadRequest {
                id: "acme/web/prod/drift/drift-1".to_string(),
                ..ReadRequest::default()
            })
            .await
            .expect("read");
        let mut expected = inputs();
        expected.insert("autoRemediate", true);
        assert_eq!(response.inputs, expected);
    }

    #[tokio::test]
    async fn test_read_rejects_ttl_identifier() {
        let handler = DriftScheduleResource::new(Arc::new(MockPulumiServiceApi::new()));
        handler
            .read(&ReadRequest {
                id: "acme/web/prod/ttl/drift-1".to_string(),
                ..ReadRequest::default()
            })
            .await
            .expect_err("wrong kind");
    }

    #[tokio::test]
    async fn test_update_replaces_schedule() {
        let mut api = MockPulumiServiceApi::new();
        api.expect_update_drift_schedule()
            .withf(|_, previous, request| previous == "drift-1" && request.auto_remediate)
            .returning(|_, _, _| Ok("drift-2".to_string()));
        let handler = DriftScheduleResource::new(Arc::new(api));

        let mut news = inputs();
        news.insert("autoRemediate", true);
        let mut olds = inputs();
        olds.insert(SCHEDULE_ID, "drift-1");
        let response = handler
            .update(&UpdateRequest {
                id: "acme/web/prod/drift/drift-1".to_string(),
                olds,
                news,
                ..UpdateRequest::default()
            })
            .await
            .expect("update");
        assert_eq!(
            response.properties.get(SCHEDULE_ID),
            Some(&PropertyValue::from("drift-2"))
        );
    }

    #[test]
    fn test_input_survives_property_encoding() {
        let input = DriftScheduleInput {
            stack: StackName::new("acme", "web", "prod"),
            schedule_cron: "15 3 * * 1".to_string(),
            auto_remediate: true,
        };
        assert_eq!(
            DriftScheduleInput::from_property_map(&input.to_property_map()).expect("decode"),
            input
        );
    }
}
