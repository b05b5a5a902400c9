//! OIDC issuers trusted by an organization, with their authorization policies.
//!
//! An issuer is registered first; the service then attaches a default
//! policy, which is replaced when the declaration lists its own rules.
//! Policy order is significant and preserved in both directions.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::client::{
    AuthPolicy, AuthPolicyDefinition, OidcIssuer, OidcIssuerRegistrationRequest,
    OidcIssuerUpdateRequest, PulumiServiceApi,
};
use crate::diff::{DiffResponse, ReplaceKeys};
use crate::error::{PropertyError, ProviderError, Result};
use crate::id::{CompositeId, OidcIssuerId};
use crate::property::{PropertyMap, PropertyValue};

use super::handler::{
    CheckFailure, CheckRequest, CheckResponse, CreateRequest, CreateResponse, DeleteRequest,
    DiffRequest, ReadRequest, ReadResponse, ResourceHandler, UpdateRequest, UpdateResponse,
};

/// Type token.
pub const OIDC_ISSUER: &str = "pulumiservice:index:OidcIssuer";

const REPLACE_KEYS: &[&str] = &["organization", "url"];

/// Declared state of an issuer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OidcIssuerInput {
    /// Organization login.
    pub organization: String,
    /// Display name.
    pub name: String,
    /// Issuer URL.
    pub url: String,
    /// Longest token lifetime, in seconds.
    pub max_expiration_seconds: Option<i64>,
    /// TLS certificate thumbprints.
    pub thumbprints: Vec<String>,
    /// Authorization rules, in evaluation order.
    pub policies: Vec<AuthPolicyDefinition>,
}

impl OidcIssuerInput {
    /// Decodes the input from properties.
    ///
    /// # Errors
    ///
    /// Returns a [`PropertyError`] for a missing or mistyped key.
    pub fn from_property_map(props: &PropertyMap) -> std::result::Result<Self, PropertyError> {
        let policies = match props.get("policies") {
            None => Vec::new(),
            Some(value) => value
                .secret_or_array()
                .ok_or_else(|| PropertyError::wrong_type("policies", "an array of objects"))?
                .iter()
                .map(|item| {
                    item.secret_or_object()
                        .ok_or_else(|| PropertyError::wrong_type("policies", "an array of objects"))
                        .and_then(policy_from_property_map)
                })
                .collect::<std::result::Result<Vec<_>, _>>()?,
        };

        Ok(Self {
            organization: props.required_str("organization")?.to_string(),
            name: props.required_str("name")?.to_string(),
            url: props.required_str("url")?.to_string(),
            max_expiration_seconds: props.optional_i64("maxExpirationSeconds")?,
            thumbprints: props.string_array("thumbprints")?.unwrap_or_default(),
            policies,
        })
    }

    /// Encodes the input as properties. Empty thumbprints and policies are omitted.
    #[must_use]
    pub fn to_property_map(&self) -> PropertyMap {
        let mut props = crate::props! {
            "organization" => &self.organization,
            "name" => &self.name,
            "url" => &self.url,
        };
        props.insert_opt("maxExpirationSeconds", self.max_expiration_seconds);
        if !self.thumbprints.is_empty() {
            props.insert("thumbprints", PropertyValue::string_array(&self.thumbprints));
        }
        if !self.policies.is_empty() {
            props.insert("policies", policies_value(&self.policies));
        }
        props
    }

    /// Outputs: the inputs plus the thumbprints and policies the service holds.
    #[must_use]
    pub fn to_outputs(&self, issuer: &OidcIssuer, policy: &AuthPolicy) -> PropertyMap {
        let mut props = self.to_property_map();
        props.insert("thumbprints", PropertyValue::string_array(&issuer.thumbprints));
        props.insert("policies", policies_value(&policy.policies));
        props
    }

    fn registration(&self) -> OidcIssuerRegistrationRequest {
        OidcIssuerRegistrationRequest {
            name: self.name.clone(),
            url: self.url.clone(),
            thumbprints: (!self.thumbprints.is_empty()).then(|| self.thumbprints.clone()),
            max_expiration: self.max_expiration_seconds,
        }
    }

    fn update_request(&self) -> OidcIssuerUpdateRequest {
        OidcIssuerUpdateRequest {
            name: Some(self.name.clone()),
            thumbprints: Some(self.thumbprints.clone()),
            max_expiration: self.max_expiration_seconds,
        }
    }
}

fn policy_from_property_map(
    props: &PropertyMap,
) -> std::result::Result<AuthPolicyDefinition, PropertyError> {
    Ok(AuthPolicyDefinition {
        decision: props.required_str("decision")?.to_string(),
        token_type: props.required_str("tokenType")?.to_string(),
        team_name: props.optional_str("teamName")?.map(str::to_string),
        user_login: props.optional_str("userLogin")?.map(str::to_string),
        runner_id: props.optional_str("runnerID")?.map(str::to_string),
        authorized_permissions: props
            .string_array("authorizedPermissions")?
            .unwrap_or_default(),
        rules: props.string_map("rules")?.unwrap_or_default(),
    })
}

fn policy_to_property_map(policy: &AuthPolicyDefinition) -> PropertyMap {
    let mut props = crate::props! {
        "decision" => &policy.decision,
        "tokenType" => &policy.token_type,
    };
    props.insert_opt("teamName", policy.team_name.as_deref());
    props.insert_opt("userLogin", policy.user_login.as_deref());
    props.insert_opt("runnerID", policy.runner_id.as_deref());
    if !policy.authorized_permissions.is_empty() {
        props.insert(
            "authorizedPermissions",
            PropertyValue::string_array(&policy.authorized_permissions),
        );
    }
    // An empty rule set is still written so the key is always present.
    props.insert(
        "rules",
        PropertyValue::Object(
            policy
                .rules
                .iter()
                .map(|(k, v)| (k.clone(), PropertyValue::from(v)))
                .collect(),
        ),
    );
    props
}

fn policies_value(policies: &[AuthPolicyDefinition]) -> PropertyValue {
    PropertyValue::Array(
        policies
            .iter()
            .map(|p| PropertyValue::Object(policy_to_property_map(p)))
            .collect(),
    )
}

/// Manages an OIDC issuer and its authorization policy.
pub struct OidcIssuerResource {
    client: Arc<dyn PulumiServiceApi>,
}

impl OidcIssuerResource {
    /// Creates the handler.
    #[must_use]
    pub fn new(client: Arc<dyn PulumiServiceApi>) -> Self {
        Self { client }
    }

    async fn auth_policy(&self, organization: &str, issuer_id: &str) -> Result<AuthPolicy> {
        self.client
            .get_auth_policy(organization, issuer_id)
            .await
            .map_err(|e| {
                ProviderError::operation(
                    format!("error retrieving auth policies for oidc issuer '{issuer_id}'"),
                    e,
                )
            })
    }

    /// Fetches the issuer's policy and applies the declared rules to it.
    async fn configure_policies(
        &self,
        input: &OidcIssuerInput,
        issuer_id: &str,
    ) -> Result<AuthPolicy> {
        let current = self.auth_policy(&input.organization, issuer_id).await?;
        self.apply_policies(input, issuer_id, current).await
    }

    /// Replaces the issuer's default policy with the declared rules, if any.
    async fn apply_policies(
        &self,
        input: &OidcIssuerInput,
        issuer_id: &str,
        current: AuthPolicy,
    ) -> Result<AuthPolicy> {
        if input.policies.is_empty() {
            return Ok(current);
        }
        self.client
            .update_auth_policy(&input.organization, &current.id, &input.policies)
            .await
            .map_err(|e| {
                ProviderError::operation(
                    format!("error updating auth policies for oidc issuer '{issuer_id}'"),
                    e,
                )
            })
    }
}

#[async_trait]
impl ResourceHandler for OidcIssuerResource {
    fn name(&self) -> &'static str {
        OIDC_ISSUER
    }

    fn check(&self, request: &CheckRequest) -> Result<CheckResponse> {
        let news = &request.news;
        let failures = CheckFailure::missing(news, &["organization", "name", "url"]);
        if !failures.is_empty() {
            return Ok(CheckResponse {
                inputs: news.clone(),
                failures,
            });
        }

        // Decoding and re-encoding drops empty collections so they never diff.
        match OidcIssuerInput::from_property_map(news) {
            Ok(input) => Ok(CheckResponse {
                inputs: input.to_property_map(),
                failures,
            }),
            Err(e) => Ok(CheckResponse {
                inputs: news.clone(),
                failures: vec![e.into()],
            }),
        }
    }

    fn diff(&self, request: &DiffRequest) -> Result<DiffResponse> {
        Ok(request.diff_inputs(ReplaceKeys::Only(REPLACE_KEYS)))
    }

    async fn create(&self, request: &CreateRequest) -> Result<CreateResponse> {
        let input = OidcIssuerInput::from_property_map(&request.properties)?;
        if request.preview {
            return Ok(CreateResponse::preview(input.to_property_map()));
        }
        info!(organization = %input.organization, name = %input.name, url = %input.url, "Registering OIDC issuer");

        let issuer = self
            .client
            .register_oidc_issuer(&input.organization, &input.registration())
            .await
            .map_err(|e| {
                ProviderError::operation(format!("error creating oidc issuer '{}'", input.name), e)
            })?;

        let id = OidcIssuerId {
            organization: input.organization.clone(),
            issuer_id: issuer.id.clone(),
        };
        let policy = match self.configure_policies(&input, &issuer.id).await {
            Ok(policy) => policy,
            Err(e) => {
                warn!(issuer = %issuer.id, error = %e, "Policy setup failed, removing issuer");
                if let Err(cleanup) = self
                    .client
                    .delete_oidc_issuer(&input.organization, &issuer.id)
                    .await
                {
                    // The issuer still exists, so hand its ID to the engine.
                    warn!(issuer = %issuer.id, error = %cleanup, "Failed to remove issuer");
                    return Err(ProviderError::ResourceInitFailed {
                        id: id.encode(),
                        properties: input.to_property_map(),
                        reasons: vec![e.to_string(), cleanup.to_string()],
                    });
                }
                return Err(e);
            }
        };

        Ok(CreateResponse {
            id: id.encode(),
            properties: input.to_outputs(&issuer, &policy),
        })
    }

    async fn read(&self, request: &ReadRequest) -> Result<ReadResponse> {
        let id = OidcIssuerId::decode(&request.id)?;
        debug!(id = %request.id, "Reading OIDC issuer");

        let Some(issuer) = self
            .client
            .get_oidc_issuer(&id.organization, &id.issuer_id)
            .await?
        else {
            return Ok(ReadResponse::absent());
        };
        let policy = self.auth_policy(&id.organization, &id.issuer_id).await?;

        let input = OidcIssuerInput {
            organization: id.organization,
            name: issuer.name.clone(),
            url: issuer.url.clone(),
            max_expiration_seconds: issuer.max_expiration,
            thumbprints: issuer.thumbprints.clone(),
            policies: policy.policies.clone(),
        };
        Ok(ReadResponse {
            id: request.id.clone(),
            properties: input.to_outputs(&issuer, &policy),
            inputs: input.to_property_map(),
        })
    }

    async fn update(&self, request: &UpdateRequest) -> Result<UpdateResponse> {
        let id = OidcIssuerId::decode(&request.id)?;
        let input = OidcIssuerInput::from_property_map(&request.news)?;
        if request.preview {
            return Ok(UpdateResponse {
                properties: input.to_property_map(),
            });
        }
        info!(issuer = %id.issuer_id, name = %input.name, "Updating OIDC issuer");

        let issuer = self
            .client
            .update_oidc_issuer(&input.organization, &id.issuer_id, &input.update_request())
            .await
            .map_err(|e| {
                ProviderError::operation(format!("error updating oidc issuer '{}'", input.name), e)
            })?;
        let policy = self.configure_policies(&input, &id.issuer_id).await?;

        Ok(UpdateResponse {
            properties: input.to_outputs(&issuer, &policy),
        })
    }

    async fn delete(&self, request: &DeleteRequest) -> Result<()> {
        let id = OidcIssuerId::decode(&request.id)?;
        info!(issuer = %id.issuer_id, organization = %id.organization, "Deleting OIDC issuer");
        self.client
            .delete_oidc_issuer(&id.organization, &id.issuer_id)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::client::MockPulumiServiceApi;
    use crate::error::ApiError;
    use crate::props;

    fn policy(decision: &str, token_type: &str) -> AuthPolicyDefinition {
        AuthPolicyDefinition {
            decision: decision.to_string(),
            token_type: token_type.to_string(),
            rules: BTreeMap::from([("aud".to_string(), "acme".to_string())]),
            ..AuthPolicyDefinition::default()
        }
    }

    fn issuer() -> OidcIssuer {
        OidcIssuer {
            id: "iss-1".to_string(),
            name: "ci".to_string(),
            url: "https://token.actions.example.com".to_string(),
            issuer: "https://token.actions.example.com".to_string(),
            thumbprints: vec!["ab12".to_string()],
            max_expiration: None,
        }
    }

    fn inputs() -> PropertyMap {
        props! {
            "organization" => "acme",
            "name" => "ci",
            "url" => "https://token.actions.example.com",
        }
    }

    #[test]
    fn test_check_preserves_policy_order() {
        let mut news = inputs();
        news.insert(
            "policies",
            policies_value(&[policy("deny", "personal"), policy("allow", "organization")]),
        );
        let response = OidcIssuerResource::new(Arc::new(MockPulumiServiceApi::new()))
            .check(&CheckRequest {
                news,
                ..CheckRequest::default()
            })
            .expect("check");
        assert!(response.is_valid());

        let decoded = OidcIssuerInput::from_property_map(&response.inputs).expect("decode");
        let decisions: Vec<_> = decoded.policies.iter().map(|p| p.decision.as_str()).collect();
        assert_eq!(decisions, ["deny", "allow"]);
    }

    #[test]
    fn test_policy_map_always_carries_rules() {
        let mut definition = policy("allow", "team");
        definition.rules.clear();
        definition.team_name = Some("platform".to_string());
        let props = policy_to_property_map(&definition);
        assert!(props.contains_key("rules"));
        assert!(!props.contains_key("authorizedPermissions"));
        assert_eq!(props.optional_str("teamName"), Ok(Some("platform")));
    }

    #[tokio::test]
    async fn test_create_without_policies_keeps_default() {
        let mut api = MockPulumiServiceApi::new();
        api.expect_register_oidc_issuer()
            .times(1)
            .returning(|_, _| Ok(issuer()));
        api.expect_get_auth_policy().returning(|_, _| {
            Ok(AuthPolicy {
                id: "pol-1".to_string(),
                version: 1,
                policies: vec![policy("allow", "organization")],
            })
        });
        api.expect_update_auth_policy().never();

        let response = OidcIssuerResource::new(Arc::new(api))
            .create(&CreateRequest {
                properties: inputs(),
                ..CreateRequest::default()
            })
            .await
            .expect("create");
        assert_eq!(response.id, "acme/iss-1");
        assert_eq!(
            response.properties.string_array("thumbprints"),
            Ok(Some(vec!["ab12".to_string()]))
        );
        let policies = response.properties.get("policies").and_then(PropertyValue::as_array);
        assert_eq!(policies.map(<[PropertyValue]>::len), Some(1));
    }

    #[tokio::test]
    async fn test_create_removes_issuer_when_policies_are_rejected() {
        let mut api = MockPulumiServiceApi::new();
        api.expect_register_oidc_issuer().returning(|_, _| Ok(issuer()));
        api.expect_get_auth_policy().returning(|_, _| {
            Ok(AuthPolicy {
                id: "pol-1".to_string(),
                ..AuthPolicy::default()
            })
        });
        api.expect_update_auth_policy()
            .withf(|_, policy_id, policies| policy_id == "pol-1" && policies.len() == 1)
            .returning(|_, _, _| Err(ApiError::api_error(400, "bad rule")));
        api.expect_delete_oidc_issuer()
            .withf(|org, id| org == "acme" && id == "iss-1")
            .times(1)
            .returning(|_, _| Ok(()));

        let mut properties = inputs();
        properties.insert("policies", policies_value(&[policy("allow", "runner")]));
        let err = OidcIssuerResource::new(Arc::new(api))
            .create(&CreateRequest {
                properties,
                ..CreateRequest::default()
            })
            .await
            .expect_err("policy update fails");
        assert!(err
            .to_string()
            .starts_with("error updating auth policies for oidc issuer 'iss-1'"));
    }

    #[tokio::test]
    async fn test_read_reconstructs_inputs_from_service() {
        let mut api = MockPulumiServiceApi::new();
        api.expect_get_oidc_issuer().returning(|_, _| Ok(Some(issuer())));
        api.expect_get_auth_policy().returning(|_, _| {
            Ok(AuthPolicy {
                id: "pol-1".to_string(),
                version: 2,
                policies: vec![policy("deny", "personal"), policy("allow", "team")],
            })
        });

        let response = OidcIssuerResource::new(Arc::new(api))
            .read(&ReadRequest {
                id: "acme/iss-1".to_string(),
                ..ReadRequest::default()
            })
            .await
            .expect("read");
        let decoded = OidcIssuerInput::from_property_map(&response.inputs).expect("decode");
        assert_eq!(decoded.name, "ci");
        assert_eq!(decoded.thumbprints, vec!["ab12".to_string()]);
        assert_eq!(decoded.policies[0].token_type, "personal");
        assert_eq!(decoded.policies[1].token_type, "team");
    }

    #[tokio::test]
    async fn test_read_missing_issuer_is_absent() {
        let mut api = MockPulumiServiceApi::new();
        api.expect_get_oidc_issuer().returning(|_, _| Ok(None));
        api.expect_get_auth_policy().never();

        let response = OidcIssuerResource::new(Arc::new(api))
            .read(&ReadRequest {
                id: "acme/iss-1".to_string(),
                ..ReadRequest::default()
            })
            .await
            .expect("read");
        assert!(response.is_absent());
    }

    #[test]
    fn test_url_change_replaces() {
        let mut news = inputs();
        news.insert("url", "https://other.example.com");
        news.insert("name", "renamed");
        let response = OidcIssuerResource::new(Arc::new(MockPulumiServiceApi::new()))
            .diff(&DiffRequest {
                old_inputs: Some(inputs()),
                news,
                ..DiffRequest::default()
            })
            .expect("diff");
        assert_eq!(response.replaces, vec!["url".to_string()]);
    }

    #[tokio::test]
    async fn test_create_removes_issuer_when_policy_lookup_fails() {
        let mut api = MockPulumiServiceApi::new();
        api.expect_register_oidc_issuer().returning(|_, _| {
            Ok(OidcIssuer {
                id: "iss-9".to_string(),
                ..issuer()
            })
        });
        api.expect_get_auth_policy()
            .returning(|_, _| Err(ApiError::api_error(500, "boom")));
        api.expect_update_auth_policy().never();
        api.expect_delete_oidc_issuer()
            .withf(|org, id| org == "acme" && id == "iss-9")
            .times(1)
            .returning(|_, _| Ok(()));

        let err = OidcIssuerResource::new(Arc::new(api))
            .create(&CreateRequest {
                properties: inputs(),
                ..CreateRequest::default()
            })
            .await
            .expect_err("policy lookup fails");
        assert!(err
            .to_string()
            .starts_with("error retrieving auth policies for oidc issuer 'iss-9'"));
    }

    #[tokio::test]
    async fn test_create_reports_issuer_it_could_not_remove() {
        let mut api = MockPulumiServiceApi::new();
        api.expect_register_oidc_issuer().returning(|_, _| {
            Ok(OidcIssuer {
                id: "iss-9".to_string(),
                ..issuer()
            })
        });
        api.expect_get_auth_policy()
            .returning(|_, _| Err(ApiError::api_error(500, "boom")));
        api.expect_delete_oidc_issuer()
            .times(1)
            .returning(|_, _| Err(ApiError::api_error(503, "unavailable")));

        let err = OidcIssuerResource::new(Arc::new(api))
            .create(&CreateRequest {
                properties: inputs(),
                ..CreateRequest::default()
            })
            .await
            .expect_err("policy lookup fails");
        assert_eq!(err.partial_id(), Some("acme/iss-9"));
        match err {
            ProviderError::ResourceInitFailed {
                properties,
                reasons,
                ..
            } => {
                assert_eq!(properties, inputs());
                assert_eq!(reasons.len(), 2);
                assert!(reasons[1].contains("unavailable"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_preview_registers_nothing() {
        let mut api = MockPulumiServiceApi::new();
        api.expect_register_oidc_issuer().never();
        api.expect_update_oidc_issuer().never();
        let handler = OidcIssuerResource::new(Arc::new(api));

        let created = handler
            .create(&CreateRequest {
                properties: inputs(),
                preview: true,
                ..CreateRequest::default()
            })
            .await
            .expect("preview create");
        assert!(created.id.is_empty());
        assert_eq!(created.properties, inputs());

        let mut news = inputs();
        news.insert("name", "renamed");
        let updated = handler
            .update(&UpdateRequest {
                id: "acme/iss-1".to_string(),
                olds: inputs(),
                news: news.clone(),
                preview: true,
                ..UpdateRequest::default()
            })
            .await
            .expect("preview update");
        assert_eq!(updated.properties, news);
    }

    #[test]
    fn test_input_survives_property_encoding() {
        let mut team_policy = policy("allow", "team");
        team_policy.team_name = Some("platform".to_string());
        team_policy.authorized_permissions = vec!["admin".to_string()];
        let mut runner_policy = policy("deny", "runner");
        runner_policy.runner_id = Some("runner-1".to_string());
        let mut personal_policy = policy("allow", "personal");
        personal_policy.user_login = Some("alice".to_string());

        let input = OidcIssuerInput {
            organization: "acme".to_string(),
            name: "ci".to_string(),
            url: "https://token.actions.example.com".to_string(),
            max_expiration_seconds: Some(3600),
            thumbprints: vec!["ab12".to_string(), "cd34".to_string()],
            policies: vec![team_policy, runner_policy, personal_policy],
        };
        assert_eq!(OidcIssuerInput::from_property_map(&input.to_property_map()), Ok(input));
    }
}
