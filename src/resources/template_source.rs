//! Template repositories registered with an organization.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::client::{
    PulumiServiceApi, TemplateSource, TemplateSourceDestination, TemplateSourceRequest,
};
use crate::diff::{DiffResponse, ReplaceKeys};
use crate::error::{PropertyError, ProviderError, Result};
use crate::id::{CompositeId, TemplateSourceId};
use crate::property::PropertyMap;

use super::handler::{
    CheckFailure, CheckRequest, CheckResponse, CreateRequest, CreateResponse, DeleteRequest,
    DiffRequest, ReadRequest, ReadResponse, ResourceHandler, UpdateRequest, UpdateResponse,
};

/// Type token.
pub const TEMPLATE_SOURCE: &str = "pulumiservice:index:TemplateSource";

const REPLACE_KEYS: &[&str] = &["organizationName"];

/// Declared state of a template source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateSourceInput {
    /// Organization login.
    pub organization: String,
    /// Source name.
    pub source_name: String,
    /// Repository holding the templates.
    pub source_url: String,
    /// Where new projects are pushed.
    pub destination: Option<TemplateSourceDestination>,
}

impl TemplateSourceInput {
    /// Decodes the input from properties.
    ///
    /// # Errors
    ///
    /// Returns a [`PropertyError`] for a missing or mistyped key.
    pub fn from_property_map(props: &PropertyMap) -> std::result::Result<Self, PropertyError> {
        let destination = props
            .optional_object("destination")?
            .map(|d| {
                Ok::<_, PropertyError>(TemplateSourceDestination {
                    url: d.optional_str("url")?.map(str::to_string),
                })
            })
            .transpose()?;

        Ok(Self {
            organization: props.required_str("organizationName")?.to_string(),
            source_name: props.required_str("sourceName")?.to_string(),
            source_url: props.required_str("sourceURL")?.to_string(),
            destination,
        })
    }

    /// Rebuilds the input from the registered source.
    #[must_use]
    pub fn from_source(organization: &str, source: TemplateSource) -> Self {
        Self {
            organization: organization.to_string(),
            source_name: source.name,
            source_url: source.source_url,
            destination: source.destination,
        }
    }

    /// Encodes the input as properties.
    #[must_use]
    pub fn to_property_map(&self) -> PropertyMap {
        let mut props = crate::props! {
            "organizationName" => &self.organization,
            "sourceName" => &self.source_name,
            "sourceURL" => &self.source_url,
        };
        if let Some(destination) = &self.destination {
            let mut nested = PropertyMap::new();
            nested.insert_opt("url", destination.url.as_deref());
            props.insert("destination", nested);
        }
        props
    }

    fn request(&self) -> TemplateSourceRequest {
        TemplateSourceRequest {
            name: self.source_name.clone(),
            source_url: self.source_url.clone(),
            destination: self.destination.clone(),
        }
    }
}

/// Manages a template source; renames and URL changes update in place.
pub struct TemplateSourceResource {
    client: Arc<dyn PulumiServiceApi>,
}

impl TemplateSourceResource {
    /// Creates the handler.
    #[must_use]
    pub fn new(client: Arc<dyn PulumiServiceApi>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ResourceHandler for TemplateSourceResource {
    fn name(&self) -> &'static str {
        TEMPLATE_SOURCE
    }

    fn check(&self, request: &CheckRequest) -> Result<CheckResponse> {
        let news = &request.news;
        let mut failures =
            CheckFailure::missing(news, &["organizationName", "sourceName", "sourceURL"]);
        if let Err(e) = news.optional_object("destination") {
            failures.push(e.into());
        }
        Ok(CheckResponse {
            inputs: news.clone(),
            failures,
        })
    }

    fn diff(&self, request: &DiffRequest) -> Result<DiffResponse> {
        Ok(request.diff_inputs(ReplaceKeys::Only(REPLACE_KEYS)))
    }

    async fn create(&self, request: &CreateRequest) -> Result<CreateResponse> {
        let input = TemplateSourceInput::from_property_map(&request.properties)?;
        if request.preview {
            return Ok(CreateResponse::preview(input.to_property_map()));
        }
        info!(organization = %input.organization, name = %input.source_name, url = %input.source_url, "Registering template source");

        let source = self
            .client
            .create_template_source(&input.organization, &input.request())
            .await?;
        let id = TemplateSourceId {
            organization: input.organization.clone(),
            source_id: source.id.clone(),
        };

        Ok(CreateResponse {
            id: id.encode(),
            properties: TemplateSourceInput::from_source(&input.organization, source)
                .to_property_map(),
        })
    }

    async fn read(&self, request: &ReadRequest) -> Result<ReadResponse> {
        let id = TemplateSourceId::decode(&request.id)?;
        debug!(id = %request.id, "Reading template source");

        let source = self
            .client
            .get_template_source(&id.organization, &id.source_id)
            .await
            .map_err(|e| {
                ProviderError::operation(
                    format!(
                        "failed to get template source during Read. org: {} id: {} due to error",
                        id.organization, id.source_id
                    ),
                    e,
                )
            })?;
        let Some(source) = source else {
            return Ok(ReadResponse::absent());
        };

        let props = TemplateSourceInput::from_source(&id.organization, source).to_property_map();
        Ok(ReadResponse {
            id: id.encode(),
            properties: props.clone(),
            inputs: props,
        })
    }

    async fn update(&self, request: &UpdateRequest) -> Result<UpdateResponse> {
        let id = TemplateSourceId::decode(&request.id)?;
        let input = TemplateSourceInput::from_property_map(&request.news)?;
        if request.preview {
            return Ok(UpdateResponse {
                properties: input.to_property_map(),
            });
        }
        info!(source = %id.source_id, name = %input.source_name, "Updating template source");

        let source = self
            .client
            .update_template_source(&input.organization, &id.source_id, &input.request())
            .await?;
        Ok(UpdateResponse {
            properties: TemplateSourceInput::from_source(&input.organization, source)
                .to_property_map(),
        })
    }

    async fn delete(&self, request: &DeleteRequest) -> Result<()> {
        let id = TemplateSourceId::decode(&request.id)?;
        info!(source = %id.source_id, organization = %id.organization, "Deleting template source");
        self.client
            .delete_template_source(&id.organization, &id.source_id)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockPulumiServiceApi;
    use crate::error::{ApiError, IdError};
    use crate::props;

    fn source(destination: Option<&str>) -> TemplateSource {
        TemplateSource {
            id: "src-1".to_string(),
            is_valid: true,
            name: "starters".to_string(),
            source_url: "https://github.com/acme/templates".to_string(),
            destination: destination.map(|url| TemplateSourceDestination {
                url: Some(url.to_string()),
            }),
        }
    }

    fn inputs() -> PropertyMap {
        props! {
            "organizationName" => "acme",
            "sourceName" => "starters",
            "sourceURL" => "https://github.com/acme/templates",
        }
    }

    #[tokio::test]
    async fn test_create_with_destination() {
        let mut api = MockPulumiServiceApi::new();
        api.expect_create_template_source()
            .withf(|org, request| {
                org == "acme"
                    && request.name == "starters"
                    && request
                        .destination
                        .as_ref()
                        .and_then(|d| d.url.as_deref())
                        == Some("https://github.com/acme")
            })
            .times(1)
            .returning(|_, _| Ok(source(Some("https://github.com/acme"))));

        let mut properties = inputs();
        properties.insert("destination", props! { "url" => "https://github.com/acme" });
        let response = TemplateSourceResource::new(Arc::new(api))
            .create(&CreateRequest {
                properties: properties.clone(),
                ..CreateRequest::default()
            })
            .await
            .expect("create");
        assert_eq!(response.id, "acme/src-1");
        assert_eq!(response.properties, properties);
    }

    #[tokio::test]
    async fn test_read_without_destination() {
        let mut api = MockPulumiServiceApi::new();
        api.expect_get_template_source()
            .returning(|_, _| Ok(Some(source(None))));

        let response = TemplateSourceResource::new(Arc::new(api))
            .read(&ReadRequest {
                id: "acme/src-1".to_string(),
                ..ReadRequest::default()
            })
            .await
            .expect("read");
        assert_eq!(response.id, "acme/src-1");
        assert_eq!(response.inputs, inputs());
    }

    #[tokio::test]
    async fn test_read_missing_source_is_absent() {
        let mut api = MockPulumiServiceApi::new();
        api.expect_get_template_source().returning(|_, _| Ok(None));
        let response = TemplateSourceResource::new(Arc::new(api))
            .read(&ReadRequest {
                id: "acme/src-1".to_string(),
                ..ReadRequest::default()
            })
            .await
            .expect("read");
        assert!(response.is_absent());
    }

    #[tokio::test]
    async fn test_read_failure_names_org_and_id() {
        let mut api = MockPulumiServiceApi::new();
        api.expect_get_template_source()
            .returning(|_, _| Err(ApiError::api_error(500, "boom")));
        let err = TemplateSourceResource::new(Arc::new(api))
            .read(&ReadRequest {
                id: "acme/src-1".to_string(),
                ..ReadRequest::default()
            })
            .await
            .expect_err("read fails");
        assert!(err
            .to_string()
            .starts_with("failed to get template source during Read. org: acme id: src-1"));
    }

    #[tokio::test]
    async fn test_read_rejects_malformed_id() {
        let err = TemplateSourceResource::new(Arc::new(MockPulumiServiceApi::new()))
            .read(&ReadRequest {
                id: "acme".to_string(),
                ..ReadRequest::default()
            })
            .await
            .expect_err("bad id");
        assert!(matches!(err, ProviderError::Id(IdError::InvalidFormat { .. })));
    }

    #[tokio::test]
    async fn test_update_removes_destination() {
        let mut api = MockPulumiServiceApi::new();
        api.expect_update_template_source()
            .withf(|_, id, request| id == "src-1" && request.destination.is_none())
            .times(1)
            .returning(|_, _, _| Ok(source(None)));

        let mut olds = inputs();
        olds.insert("destination", props! { "url" => "https://github.com/acme" });
        let response = TemplateSourceResource::new(Arc::new(api))
            .update(&UpdateRequest {
                id: "acme/src-1".to_string(),
                olds,
                news: inputs(),
                ..UpdateRequest::default()
            })
            .await
            .expect("update");
        assert!(!response.properties.contains_key("destination"));
    }

    #[test]
    fn test_name_change_updates_and_org_change_replaces() {
        let handler = TemplateSourceResource::new(Arc::new(MockPulumiServiceApi::new()));
        let mut renamed = inputs();
        renamed.insert("sourceName", "other");
        let response = handler
            .diff(&DiffRequest {
                old_inputs: Some(inputs()),
                news: renamed,
                ..DiffRequest::default()
            })
            .expect("diff");
        assert!(response.replaces.is_empty());

        let mut moved = inputs();
        moved.insert("organizationName", "globex");
        let response = handler
            .diff(&DiffRequest {
                old_inputs: Some(inputs()),
                news: moved,
                ..DiffRequest::default()
            })
            .expect("diff");
        assert_eq!(response.replaces, vec!["organizationName".to_string()]);
        assert!(response.delete_before_replace);
    }


    #[test]
    fn test_input_survives_property_encoding() {
        let input = TemplateSourceInput::from_source("acme", source(Some("https://github.com/acme")));
        assert_eq!(
            TemplateSourceInput::from_property_map(&input.to_property_map()).expect("decode"),
            input
        );
    }
}
