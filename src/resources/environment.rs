//! ESC environments.
//!
//! An environment is created empty and then filled with its YAML definition,
//! so creation is two remote calls that can fail independently.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::client::PulumiServiceApi;
use crate::diff::{DiffResponse, ReplaceKeys};
use crate::error::{ApiError, PropertyError, ProviderError, Result};
use crate::id::{CompositeId, EnvironmentId, DEFAULT_PROJECT};
use crate::property::{PropertyMap, PropertyValue};

use super::handler::{
    CheckFailure, CheckRequest, CheckResponse, CreateRequest, CreateResponse, DeleteRequest,
    DiffRequest, ReadRequest, ReadResponse, ResourceHandler, UpdateRequest, UpdateResponse,
};

/// Type token.
pub const ENVIRONMENT: &str = "pulumiservice:index:Environment";

const REPLACE_KEYS: &[&str] = &["organization", "project", "name"];

/// Reads the YAML definition from a string, a text or path asset, or a
/// secret wrapping either. Returns `None` for a computed value.
fn yaml_text(value: &PropertyValue) -> std::result::Result<Option<String>, PropertyError> {
    let value = value.unwrap_secret();
    if value.is_computed() {
        return Ok(None);
    }
    if let Some(text) = value.as_str() {
        return Ok(Some(text.to_string()));
    }
    match value.as_asset() {
        Some(asset) => asset
            .read_text()
            .map(Some)
            .map_err(|e| PropertyError::invalid("yaml", format!("failed to read yaml asset: {e}"))),
        None => Err(PropertyError::wrong_type("yaml", "a string or an asset")),
    }
}

/// Declared state of an environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentInput {
    /// Environment location.
    pub environment: EnvironmentId,
    /// YAML definition.
    pub yaml: String,
}

impl EnvironmentInput {
    /// Decodes the input from properties. `project` defaults to `default`.
    ///
    /// # Errors
    ///
    /// Returns a [`PropertyError`] for a missing or mistyped key, or an
    /// unreadable YAML asset.
    pub fn from_property_map(props: &PropertyMap) -> std::result::Result<Self, PropertyError> {
        let yaml = props
            .get("yaml")
            .ok_or_else(|| PropertyError::missing("yaml"))?;
        let yaml = yaml_text(yaml)?.ok_or_else(|| PropertyError::invalid("yaml", "value is not known yet"))?;
        Ok(Self {
            environment: EnvironmentId::new(
                props.required_str("organization")?,
                props.optional_str("project")?.unwrap_or(DEFAULT_PROJECT),
                props.required_str("name")?,
            ),
            yaml,
        })
    }

    /// Encodes the input as properties; the YAML is always secret.
    #[must_use]
    pub fn to_property_map(&self) -> PropertyMap {
        crate::props! {
            "organization" => &self.environment.organization,
            "project" => &self.environment.project,
            "name" => &self.environment.environment,
            "yaml" => PropertyValue::secret(self.yaml.as_str()),
        }
    }

    /// Outputs: the inputs plus the current revision.
    #[must_use]
    pub fn to_outputs(&self, revision: i64) -> PropertyMap {
        let mut props = self.to_property_map();
        props.insert("revision", revision);
        props
    }
}

/// Manages an environment and its definition.
pub struct EnvironmentResource {
    client: Arc<dyn PulumiServiceApi>,
}

impl EnvironmentResource {
    /// Creates the handler.
    #[must_use]
    pub fn new(client: Arc<dyn PulumiServiceApi>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ResourceHandler for EnvironmentResource {
    fn name(&self) -> &'static str {
        ENVIRONMENT
    }

    fn check(&self, request: &CheckRequest) -> Result<CheckResponse> {
        let mut inputs = request.news.clone();
        let mut failures = CheckFailure::missing(&inputs, &["organization", "name", "yaml"]);

        if !inputs.contains_key("project") {
            inputs.insert("project", DEFAULT_PROJECT);
        }
        for key in REPLACE_KEYS {
            if inputs
                .get(key)
                .and_then(PropertyValue::secret_or_string)
                .is_some_and(|value| value.contains('/'))
            {
                failures.push(CheckFailure::new(
                    *key,
                    format!("'{key}' property contains `/` illegal character"),
                ));
            }
        }

        if let Some(yaml) = inputs.get("yaml") {
            match yaml_text(yaml) {
                Ok(Some(text)) => {
                    let text = text.trim().to_string();
                    if let Err(e) = serde_yaml::from_str::<serde_yaml::Value>(&text) {
                        failures.push(CheckFailure::new("yaml", format!("failed to parse yaml: {e}")));
                    }
                    inputs.insert("yaml", PropertyValue::secret(text));
                }
                Ok(None) => {}
                Err(e) => failures.push(e.into()),
            }
        }

        Ok(CheckResponse { inputs, failures })
    }

    fn diff(&self, request: &DiffRequest) -> Result<DiffResponse> {
        Ok(request.diff_inputs(ReplaceKeys::Only(REPLACE_KEYS)))
    }

    async fn create(&self, request: &CreateRequest) -> Result<CreateResponse> {
        let input = EnvironmentInput::from_property_map(&request.properties)?;
        let environment = &input.environment;
        if request.preview {
            let mut outputs = input.to_property_map();
            outputs.insert("revision", PropertyValue::Computed);
            return Ok(CreateResponse::preview(outputs));
        }
        info!(environment = %environment, "Creating environment");

        let diagnostics = self
            .client
            .check_environment_yaml(&environment.organization, &input.yaml)
            .await?;
        if !diagnostics.is_empty() {
            return Err(ProviderError::operation(
                "failed to check environment yaml",
                ApiError::Diagnostics {
                    diagnostics: diagnostics.iter().map(ToString::to_string).collect(),
                },
            ));
        }

        self.client
            .create_environment(environment)
            .await
            .map_err(|e| ProviderError::operation("failed to create new environment due to error", e))?;

        let id = environment.encode();
        match self.client.update_environment(environment, &input.yaml).await {
            Ok(revision) => Ok(CreateResponse {
                id,
                properties: input.to_outputs(revision),
            }),
            Err(e) => {
                warn!(environment = %environment, error = %e, "Environment created but its definition was rejected");
                Err(ProviderError::ResourceInitFailed {
                    id,
                    properties: input.to_property_map(),
                    reasons: vec![format!("failed to push yaml into environment due to error: {e}")],
                })
            }
        }
    }

    async fn read(&self, request: &ReadRequest) -> Result<ReadResponse> {
        let environment = EnvironmentId::decode(&request.id)?;
        debug!(environment = %environment, "Reading environment");

        let definition = self
            .client
            .get_environment(&environment)
            .await
            .map_err(|e| {
                ProviderError::operation(format!("failed to read Environment ({:?})", request.id), e)
            })?;
        let Some(definition) = definition else {
            return Ok(ReadResponse::absent());
        };

        let input = EnvironmentInput {
            environment,
            yaml: definition.yaml,
        };
        Ok(ReadResponse {
            id: request.id.clone(),
            properties: input.to_outputs(definition.revision),
            inputs: input.to_property_map(),
        })
    }

    async fn update(&self, request: &UpdateRequest) -> Result<UpdateResponse> {
        let input = EnvironmentInput::from_property_map(&request.news)?;
        if request.preview {
            let mut outputs = input.to_property_map();
            outputs.insert("revision", PropertyValue::Computed);
            return Ok(UpdateResponse { properties: outputs });
        }
        info!(environment = %input.environment, "Updating environment");

        let revision = self
            .client
            .update_environment(&input.environment, &input.yaml)
            .await
            .map_err(|e| ProviderError::operation("failed to update environment", e))?;
        Ok(UpdateResponse {
            properties: input.to_outputs(revision),
        })
    }

    async fn delete(&self, request: &DeleteRequest) -> Result<()> {
        let environment = EnvironmentId::decode(&request.id)?;
        info!(environment = %environment, "Deleting environment");
        self.client.delete_environment(&environment).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{EnvironmentDefinition, EnvironmentDiagnostic, MockPulumiServiceApi};
    use crate::property::Asset;
    use crate::props;

    const YAML: &str = "values:\n  region: us-west-2";

    fn inputs() -> PropertyMap {
        props! {
            "organization" => "acme",
            "project" => "infra",
            "name" => "shared",
            "yaml" => PropertyValue::secret(YAML),
        }
    }

    #[test]
    fn test_check_trims_and_wraps_yaml() {
        let handler = EnvironmentResource::new(Arc::new(MockPulumiServiceApi::new()));
        let response = handler
            .check(&CheckRequest {
                news: props! {
                    "organization" => "acme",
                    "name" => "shared",
                    "yaml" => Asset::from_text(format!("\n{YAML}\n\n")),
                },
                ..CheckRequest::default()
            })
            .expect("check");
        assert!(response.is_valid());
        assert_eq!(response.inputs["yaml"], PropertyValue::secret(YAML));
        assert_eq!(response.inputs["project"], PropertyValue::from("default"));
    }

    #[test]
    fn test_check_rejects_slash_in_name() {
        let handler = EnvironmentResource::new(Arc::new(MockPulumiServiceApi::new()));
        let mut news = inputs();
        news.insert("name", "team/shared");
        let response = handler
            .check(&CheckRequest {
                news,
                ..CheckRequest::default()
            })
            .expect("check");
        assert_eq!(
            response.failures,
            vec![CheckFailure::new(
                "name",
                "'name' property contains `/` illegal character"
            )]
        );
    }

    #[test]
    fn test_check_reports_unparseable_yaml() {
        let handler = EnvironmentResource::new(Arc::new(MockPulumiServiceApi::new()));
        let mut news = inputs();
        news.insert("yaml", "values: [unclosed");
        let response = handler
            .check(&CheckRequest {
                news,
                ..CheckRequest::default()
            })
            .expect("check");
        assert_eq!(response.failures.len(), 1);
        assert_eq!(response.failures[0].property, "yaml");
    }

    #[test]
    fn test_check_skips_computed_yaml() {
        let handler = EnvironmentResource::new(Arc::new(MockPulumiServiceApi::new()));
        let mut news = inputs();
        news.insert("yaml", PropertyValue::Computed);
        let response = handler
            .check(&CheckRequest {
                news,
                ..CheckRequest::default()
            })
            .expect("check");
        assert!(response.is_valid());
        assert!(response.inputs["yaml"].is_computed());
    }

    #[tokio::test]
    async fn test_create_pushes_yaml_and_reports_revision() {
        let mut api = MockPulumiServiceApi::new();
        api.expect_check_environment_yaml()
            .withf(|org, yaml| org == "acme" && yaml == YAML)
            .returning(|_, _| Ok(Vec::new()));
        api.expect_create_environment().times(1).returning(|_| Ok(()));
        api.expect_update_environment()
            .withf(|env, _| env.to_string() == "acme/infra/shared")
            .returning(|_, _| Ok(3));
        let handler = EnvironmentResource::new(Arc::new(api));

        let response = handler
            .create(&CreateRequest {
                properties: inputs(),
                ..CreateRequest::default()
            })
            .await
            .expect("create");
        assert_eq!(response.id, "acme/infra/shared");
        assert_eq!(response.properties["revision"], PropertyValue::from(3_i64));
    }

    #[tokio::test]
    async fn test_create_stops_on_diagnostics() {
        let mut api = MockPulumiServiceApi::new();
        api.expect_check_environment_yaml().returning(|_, _| {
            Ok(vec![EnvironmentDiagnostic {
                summary: "unknown function".to_string(),
                path: Some("values.x".to_string()),
            }])
        });
        api.expect_create_environment().never();
        let handler = EnvironmentResource::new(Arc::new(api));

        let err = handler
            .create(&CreateRequest {
                properties: inputs(),
                ..CreateRequest::default()
            })
            .await
            .expect_err("diagnostics");
        assert!(err.to_string().contains("values.x: unknown function"));
    }

    #[tokio::test]
    async fn test_failed_push_is_a_partial_failure() {
        let mut api = MockPulumiServiceApi::new();
        api.expect_check_environment_yaml().returning(|_, _| Ok(Vec::new()));
        api.expect_create_environment().returning(|_| Ok(()));
        api.expect_update_environment()
            .returning(|_, _| Err(ApiError::api_error(500, "boom")));
        let handler = EnvironmentResource::new(Arc::new(api));

        let err = handler
            .create(&CreateRequest {
                properties: inputs(),
                ..CreateRequest::default()
            })
            .await
            .expect_err("push fails");
        assert_eq!(err.partial_id(), Some("acme/infra/shared"));
    }

    #[tokio::test]
    async fn test_read_accepts_legacy_id() {
        let mut api = MockPulumiServiceApi::new();
        api.expect_get_environment()
            .withf(|env| env.project == "default" && env.environment == "shared")
            .returning(|_| {
                Ok(Some(EnvironmentDefinition {
                    yaml: YAML.to_string(),
                    revision: 7,
                }))
            });
        let handler = EnvironmentResource::new(Arc::new(api));

        let response = handler
            .read(&ReadRequest {
                id: "acme/shared".to_string(),
                ..ReadRequest::default()
            })
            .await
            .expect("read");
        assert_eq!(response.id, "acme/shared");
        assert!(!response.inputs.contains_key("revision"));
        assert_eq!(response.properties["revision"], PropertyValue::from(7_i64));
        assert_eq!(response.inputs["yaml"], PropertyValue::secret(YAML));
    }

    #[tokio::test]
    async fn test_read_missing_environment_is_absent() {
        let mut api = MockPulumiServiceApi::new();
        api.expect_get_environment().returning(|_| Ok(None));
        let handler = EnvironmentResource::new(Arc::new(api));

        let response = handler
            .read(&ReadRequest {
                id: "acme/infra/shared".to_string(),
                ..ReadRequest::default()
            })
            .await
            .expect("read");
        assert!(response.is_absent());
    }


    #[test]
    fn test_input_survives_property_encoding() {
        let input = EnvironmentInput {
            environment: EnvironmentId::new("acme", "infra", "shared"),
            yaml: YAML.to_string(),
        };
        assert_eq!(
            EnvironmentInput::from_property_map(&input.to_property_map()).expect("decode"),
            input
        );
    }

    #[tokio::test]
    async fn test_preview_create_leaves_revision_unknown() {
        let handler = EnvironmentResource::new(Arc::new(MockPulumiServiceApi::new()));
        let response = handler
            .create(&CreateRequest {
                properties: inputs(),
                preview: true,
                ..CreateRequest::default()
            })
            .await
            .expect("create");
        assert!(response.id.is_empty());
        assert_eq!(response.properties.get("revision"), Some(&PropertyValue::Computed));
    }
}
