//! Handler registry and lifecycle dispatch.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::client::{PulumiClient, PulumiServiceApi};
use crate::config::{ConfigParser, ProviderConfig};
use crate::diff::DiffResponse;
use crate::error::{ProviderError, Result};
use crate::resources::{
    CheckRequest, CheckResponse, CreateRequest, CreateResponse, DeleteRequest,
    DeploymentScheduleResource, DeploymentSettingsResource, DiffRequest, DriftScheduleResource,
    EnvironmentResource, EnvironmentVersionTagResource, OidcIssuerResource, ReadRequest,
    ReadResponse, ResourceHandler, StackTagResource, StackTagsResource, TeamEnvironmentPermissionResource,
    TeamResource, TeamStackPermissionResource, TemplateSourceResource, TtlScheduleResource,
    UpdateRequest, UpdateResponse,
};

use super::urn::resource_type;

/// Routes lifecycle requests to the handler registered for the resource type.
pub struct Provider {
    handlers: BTreeMap<&'static str, Box<dyn ResourceHandler>>,
}

impl Provider {
    /// Registers every resource kind against one shared client.
    #[must_use]
    pub fn new(client: Arc<dyn PulumiServiceApi>) -> Self {
        let handlers: Vec<Box<dyn ResourceHandler>> = vec![
            Box::new(StackTagResource::new(Arc::clone(&client))),
            Box::new(StackTagsResource::new(Arc::clone(&client))),
            Box::new(DeploymentScheduleResource::new(Arc::clone(&client))),
            Box::new(TtlScheduleResource::new(Arc::clone(&client))),
            Box::new(DriftScheduleResource::new(Arc::clone(&client))),
            Box::new(DeploymentSettingsResource::new(Arc::clone(&client))),
            Box::new(EnvironmentResource::new(Arc::clone(&client))),
            Box::new(EnvironmentVersionTagResource::new(Arc::clone(&client))),
            Box::new(TeamResource::new(Arc::clone(&client))),
            Box::new(TeamStackPermissionResource::new(Arc::clone(&client))),
            Box::new(TeamEnvironmentPermissionResource::new(Arc::clone(&client))),
            Box::new(OidcIssuerResource::new(Arc::clone(&client))),
            Box::new(TemplateSourceResource::new(client)),
        ];
        Self {
            handlers: handlers.into_iter().map(|h| (h.name(), h)).collect(),
        }
    }

    /// Builds a provider talking to the service described by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn from_config(config: &ProviderConfig) -> Result<Self> {
        info!(service_url = %config.service_url, "Configuring provider");
        let client = PulumiClient::new(&config.service_url, &config.access_token)?;
        Ok(Self::new(Arc::new(client)))
    }

    /// Resolves configuration from the engine's variables, the environment
    /// and stored credentials, then builds the provider.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when no access token can be found.
    pub fn configure(variables: &BTreeMap<String, String>) -> Result<Self> {
        let parser = ConfigParser::new();
        if let Err(e) = parser.load_dotenv() {
            warn!(error = %e, "Ignoring unreadable .env file");
        }
        Self::from_config(&parser.resolve(variables)?)
    }

    /// Registered type tokens, sorted.
    pub fn resource_types(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.handlers.keys().copied()
    }

    /// Handler for the type named by `urn`.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::UnknownResource`] for unregistered types.
    pub fn handler(&self, urn: &str) -> Result<&dyn ResourceHandler> {
        let token = resource_type(urn)?;
        self.handlers
            .get(token)
            .map(|handler| handler.as_ref())
            .ok_or_else(|| ProviderError::UnknownResource {
                token: token.to_string(),
            })
    }

    /// Provider configuration is accepted as given.
    #[must_use]
    pub fn check_config(&self, request: &CheckRequest) -> CheckResponse {
        CheckResponse {
            inputs: request.news.clone(),
            failures: Vec::new(),
        }
    }

    /// Provider configuration changes never affect resources.
    #[must_use]
    pub fn diff_config(&self, _request: &DiffRequest) -> DiffResponse {
        DiffResponse::no_changes()
    }

    /// Dispatches Check.
    ///
    /// # Errors
    ///
    /// Returns the handler's error or an unknown-type error.
    pub fn check(&self, request: &CheckRequest) -> Result<CheckResponse> {
        debug!(urn = %request.urn, "Check");
        self.handler(&request.urn)?.check(request)
    }

    /// Dispatches Diff.
    ///
    /// # Errors
    ///
    /// Returns the handler's error or an unknown-type error.
    pub fn diff(&self, request: &DiffRequest) -> Result<DiffResponse> {
        debug!(urn = %request.urn, id = %request.id, "Diff");
        self.handler(&request.urn)?.diff(request)
    }

    /// Dispatches Create.
    ///
    /// # Errors
    ///
    /// Returns the handler's error or an unknown-type error.
    pub async fn create(&self, request: &CreateRequest) -> Result<CreateResponse> {
        debug!(urn = %request.urn, preview = request.preview, "Create");
        self.handler(&request.urn)?.create(request).await
    }

    /// Dispatches Read.
    ///
    /// # Errors
    ///
    /// Returns the handler's error or an unknown-type error.
    pub async fn read(&self, request: &ReadRequest) -> Result<ReadResponse> {
        debug!(urn = %request.urn, id = %request.id, "Read");
        self.handler(&request.urn)?.read(request).await
    }

    /// Dispatches Update.
    ///
    /// # Errors
    ///
    /// Returns the handler's error or an unknown-type error.
    pub async fn update(&self, request: &UpdateRequest) -> Result<UpdateResponse> {
        debug!(urn = %request.urn, id = %request.id, "Update");
        self.handler(&request.urn)?.update(request).await
    }

    /// Dispatches Delete.
    ///
    /// # Errors
    ///
    /// Returns the handler's error or an unknown-type error.
    pub async fn delete(&self, request: &DeleteRequest) -> Result<()> {
        debug!(urn = %request.urn, id = %request.id, "Delete");
        self.handler(&request.urn)?.delete(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{MockPulumiServiceApi, StackTag};
    use crate::props;
    use crate::resources::{DRIFT_SCHEDULE, OIDC_ISSUER, STACK_TAG, TEAM};

    fn provider(api: MockPulumiServiceApi) -> Provider {
        Provider::new(Arc::new(api))
    }

    #[test]
    fn test_registers_every_kind() {
        let provider = provider(MockPulumiServiceApi::new());
        let types: Vec<_> = provider.resource_types().collect();
        assert_eq!(types.len(), 13);
        assert!(types.contains(&STACK_TAG));
        assert!(types.contains(&TEAM));
        assert!(types.contains(&OIDC_ISSUER));
        assert!(types.contains(&DRIFT_SCHEDULE));
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let provider = provider(MockPulumiServiceApi::new());
        let err = provider
            .check(&CheckRequest {
                urn: "urn:pulumi:prod::infra::pulumiservice:index:Webhook::hook".to_string(),
                ..CheckRequest::default()
            })
            .expect_err("unknown");
        assert_eq!(
            err.to_string(),
            "unknown resource type 'pulumiservice:index:Webhook'"
        );
    }

    #[tokio::test]
    async fn test_dispatches_to_handler() {
        let mut api = MockPulumiServiceApi::new();
        api.expect_get_stack_tag().returning(|_, name| {
            Ok(Some(StackTag {
                name: name.to_string(),
                value: "blue".to_string(),
            }))
        });

        let response = provider(api)
            .read(&ReadRequest {
                id: "acme/web/prod/color".to_string(),
                urn: "urn:pulumi:prod::web::pulumiservice:index:StackTag::color".to_string(),
                ..ReadRequest::default()
            })
            .await
            .expect("read");
        assert_eq!(response.id, "acme/web/prod/color");
        assert_eq!(response.inputs.optional_str("value"), Ok(Some("blue")));
    }

    #[test]
    fn test_config_is_echoed_and_never_diffs() {
        let provider = provider(MockPulumiServiceApi::new());
        let news = props! { "accessToken" => "pul-123" };
        let checked = provider.check_config(&CheckRequest {
            news: news.clone(),
            ..CheckRequest::default()
        });
        assert_eq!(checked.inputs, news);
        assert!(!provider.diff_config(&DiffRequest::default()).has_changes());
    }
}
