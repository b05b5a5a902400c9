//! Scheduled deployments of a stack, recurring (cron) or one-off.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDateTime, SecondsFormat};
use tracing::{debug, info};

use crate::client::{DeploymentScheduleRequest, PulumiServiceApi, ScheduledDeployment};
use crate::diff::{diff, DiffResponse, ReplaceKeys};
use crate::error::{PropertyError, ProviderError, Result};
use crate::id::{CompositeId, DeploymentScheduleId, StackName};
use crate::property::{PropertyMap, PropertyValue};

use super::handler::{
    stack_from_properties, stack_properties, CheckFailure, CheckRequest, CheckResponse,
    CreateRequest, CreateResponse, DeleteRequest, DiffRequest, ReadRequest, ReadResponse,
    ResourceHandler, UpdateRequest, UpdateResponse,
};

/// Type token.
pub const DEPLOYMENT_SCHEDULE: &str = "pulumiservice:index:DeploymentSchedule";

/// Output key holding the service-assigned schedule ID.
pub(super) const SCHEDULE_ID: &str = "scheduleId";

const REPLACE_KEYS: &[&str] = &["organization", "project", "stack", "timestamp"];

const OPERATIONS: &[&str] = &["update", "preview", "refresh", "destroy"];

/// Parses an RFC 3339 timestamp property.
pub(super) fn parse_timestamp(
    key: &str,
    value: &str,
) -> std::result::Result<DateTime<FixedOffset>, PropertyError> {
    DateTime::parse_from_rfc3339(value).map_err(|e| PropertyError::invalid(key, e.to_string()))
}

/// Formats a timestamp the way it is stored in properties.
pub(super) fn format_timestamp(timestamp: &DateTime<FixedOffset>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parses the `YYYY-MM-DD HH:MM:SS` UTC form the schedules API reports.
pub(super) fn parse_service_timestamp(value: &str) -> Option<DateTime<FixedOffset>> {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc().fixed_offset())
        .or_else(|| DateTime::parse_from_rfc3339(value).ok())
}

/// Reads the schedule ID recorded in a schedule's outputs.
pub(super) fn schedule_id(props: &PropertyMap) -> std::result::Result<&str, PropertyError> {
    props.required_str(SCHEDULE_ID)
}

/// Diffs schedule inputs. A service-assigned ID in old outputs is ignored.
pub(super) fn diff_schedule(request: &DiffRequest, replace_keys: ReplaceKeys) -> DiffResponse {
    let mut previous = request.previous().clone();
    previous.remove(SCHEDULE_ID);
    diff(&previous, &request.news, replace_keys)
}

/// Checks the `timestamp` key, if present, is RFC 3339.
pub(super) fn check_timestamp(news: &PropertyMap, failures: &mut Vec<CheckFailure>) {
    if let Some(timestamp) = news.get("timestamp").and_then(PropertyValue::secret_or_string) {
        if let Err(e) = DateTime::parse_from_rfc3339(timestamp) {
            failures.push(CheckFailure::new(
                "timestamp",
                format!("timestamp failed to parse due to: {e}"),
            ));
        }
    }
}

/// Declared state of a deployment schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentScheduleInput {
    /// Stack to deploy.
    pub stack: StackName,
    /// Cron expression for recurring schedules.
    pub schedule_cron: Option<String>,
    /// Single run time for one-off schedules.
    pub schedule_once: Option<DateTime<FixedOffset>>,
    /// Operation to run: update, preview, refresh or destroy.
    pub pulumi_operation: String,
}

impl DeploymentScheduleInput {
    /// Decodes the input from properties.
    ///
    /// # Errors
    ///
    /// Returns a [`PropertyError`] for a missing or mistyped key or a
    /// timestamp that is not RFC 3339.
    pub fn from_property_map(props: &PropertyMap) -> std::result::Result<Self, PropertyError> {
        Ok(Self {
            stack: stack_from_properties(props)?,
            schedule_cron: props.optional_str("scheduleCron")?.map(str::to_string),
            schedule_once: props
                .optional_str("timestamp")?
                .map(|t| parse_timestamp("timestamp", t))
                .transpose()?,
            pulumi_operation: props.required_str("pulumiOperation")?.to_string(),
        })
    }

    /// Encodes the input as properties.
    #[must_use]
    pub fn to_property_map(&self) -> PropertyMap {
        let mut props = stack_properties(&self.stack);
        props.insert_opt("scheduleCron", self.schedule_cron.as_ref());
        props.insert_opt("timestamp", self.schedule_once.as_ref().map(format_timestamp));
        props.insert("pulumiOperation", &self.pulumi_operation);
        props
    }

    /// Outputs: the inputs plus the schedule ID.
    #[must_use]
    pub fn to_outputs(&self, schedule_id: &str) -> PropertyMap {
        let mut props = self.to_property_map();
        props.insert(SCHEDULE_ID, schedule_id);
        props
    }

    fn to_request(&self) -> DeploymentScheduleRequest {
        DeploymentScheduleRequest {
            schedule_cron: self.schedule_cron.clone(),
            schedule_once: self.schedule_once.map(|t| t.to_utc()),
            request: ScheduledDeployment {
                operation: Some(self.pulumi_operation.clone()),
                operation_context: None,
            },
        }
    }
}

/// Manages a deployment schedule.
pub struct DeploymentScheduleResource {
    client: Arc<dyn PulumiServiceApi>,
}

impl DeploymentScheduleResource {
    /// Creates the handler.
    #[must_use]
    pub fn new(client: Arc<dyn PulumiServiceApi>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ResourceHandler for DeploymentScheduleResource {
    fn name(&self) -> &'static str {
        DEPLOYMENT_SCHEDULE
    }

    fn check(&self, request: &CheckRequest) -> Result<CheckResponse> {
        let news = &request.news;
        let mut failures = CheckFailure::missing(
            news,
            &["organization", "project", "stack", "pulumiOperation"],
        );

        if news.contains_key("scheduleCron") == news.contains_key("timestamp") {
            failures.push(CheckFailure::new(
                "scheduleCron",
                "One of scheduleCron or timestamp must be specified but not both",
            ));
        }
        check_timestamp(news, &mut failures);

        let operation = news
            .get("pulumiOperation")
            .and_then(PropertyValue::secret_or_string);
        if let Some(operation) = operation {
            if !OPERATIONS.contains(&operation) {
                failures.push(CheckFailure::new(
                    "pulumiOperation",
                    format!(
                        "found {operation:?} instead of one of {}",
                        OPERATIONS.join(", ")
                    ),
                ));
            }
        }

        Ok(CheckResponse {
            inputs: news.clone(),
            failures,
        })
    }

    fn diff(&self, request: &DiffRequest) -> Result<DiffResponse> {
        Ok(diff_schedule(request, ReplaceKeys::Only(REPLACE_KEYS)))
    }

    async fn create(&self, request: &CreateRequest) -> Result<CreateResponse> {
        let input = DeploymentScheduleInput::from_property_map(&request.properties)?;
        if request.preview {
            let mut outputs = input.to_property_map();
            outputs.insert(SCHEDULE_ID, PropertyValue::Computed);
            return Ok(CreateResponse::preview(outputs));
        }
        info!(stack = %input.stack, operation = %input.pulumi_operation, "Creating deployment schedule");

        let schedule_id = self
            .client
            .create_deployment_schedule(&input.stack, &input.to_request())
            .await?;
        let id = DeploymentScheduleId {
            stack: input.stack.clone(),
            schedule_id: schedule_id.clone(),
        };

        Ok(CreateResponse {
            id: id.encode(),
            properties: input.to_outputs(&schedule_id),
        })
    }

    async fn read(&self, request: &ReadRequest) -> Result<ReadResponse> {
        let id = DeploymentScheduleId::decode(&request.id)?;
        let context = || format!("failed to read DeploymentSchedule ({:?})", request.id);
        debug!(id = %request.id, "Reading deployment schedule");

        let schedule = self
            .client
            .get_stack_schedule(&id.stack, &id.schedule_id)
            .await
            .map_err(|e| ProviderError::operation(context(), e))?;
        let Some(schedule) = schedule else {
            return Ok(ReadResponse::absent());
        };

        let schedule_once = match schedule.schedule_once.as_deref() {
            Some(raw) => Some(parse_service_timestamp(raw).ok_or_else(|| {
                ProviderError::internal(format!("{}: unrecognized timestamp {raw:?}", context()))
            })?),
            None => None,
        };
        let input = DeploymentScheduleInput {
            stack: id.stack,
            schedule_cron: schedule.schedule_cron,
            schedule_once,
            pulumi_operation: schedule.definition.request.operation.unwrap_or_default(),
        };

        Ok(ReadResponse {
            id: request.id.clone(),
            properties: input.to_outputs(&id.schedule_id),
            inputs: input.to_property_map(),
        })
    }

    async fn update(&self, request: &UpdateRequest) -> Result<UpdateResponse> {
        let previous = schedule_id(&request.olds)?;
        let input = DeploymentScheduleInput::from_property_map(&request.news)?;
        if request.preview {
            return Ok(UpdateResponse {
                properties: input.to_outputs(previous),
            });
        }
        info!(stack = %input.stack, schedule = previous, "Updating deployment schedule");

        let schedule_id = self
            .client
            .update_deployment_schedule(&input.stack, previous, &input.to_request())
            .await?;

        Ok(UpdateResponse {
            properties: input.to_outputs(&schedule_id),
        })
    }

    async fn delete(&self, request: &DeleteRequest) -> Result<()> {
        let stack = stack_from_properties(&request.properties)?;
        let schedule = schedule_id(&request.properties)?;
        info!(stack = %stack, schedule, "Deleting deployment schedule");
        self.client.delete_stack_schedule(&stack, schedule).await?;
        Ok(())
    }
}
