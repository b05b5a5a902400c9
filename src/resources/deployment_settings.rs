//! Deployment settings of a stack.
//!
//! Settings hold credentials the service only returns encrypted, so every
//! encoding goes through a single function parametrized by where secret
//! plaintext comes from ([`SecretSources`]) and which half of each secret is
//! wanted ([`View`]).

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::client::{
    AwsOidcConfiguration, AzureOidcConfiguration, BasicAuth, CacheOptions, DeploymentSettings,
    DockerImage, ExecutorContext, GcpOidcConfiguration, GitAuthConfig, GitHubConfiguration,
    OidcConfiguration, OperationContext, OperationContextOptions, PulumiServiceApi,
    SourceContext, SourceContextGit, SourceContextTemplate, SshAuth,
};
use crate::diff::{DiffResponse, ReplaceKeys};
use crate::duration::GoDuration;
use crate::error::{PropertyError, Result};
use crate::id::{CompositeId, StackName};
use crate::property::{PropertyMap, PropertyValue};
use crate::secret::{emit_secret, SecretMode, SecretValue};

use super::handler::{
    stack_from_properties, stack_properties, CheckFailure, CheckRequest, CheckResponse,
    CreateRequest, CreateResponse, DeleteRequest, DiffRequest, ReadRequest, ReadResponse,
    ResourceHandler, UpdateRequest, UpdateResponse,
};

/// Type token.
pub const DEPLOYMENT_SETTINGS: &str = "pulumiservice:index:DeploymentSettings";

const REPLACE_KEYS: &[&str] = &["organization", "project", "stack"];

const AWS_DURATION: &str = "operationContext.oidc.aws.duration";

type PropertyResult<T> = std::result::Result<T, PropertyError>;

/// Where the plaintext and the previously stored ciphertext of secret fields come from.
#[derive(Debug, Clone, Copy)]
pub struct SecretSources<'a> {
    mode: SecretMode,
    plaintext: Option<&'a DeploymentSettings>,
    stored: Option<&'a DeploymentSettings>,
}

impl<'a> SecretSources<'a> {
    /// Settings were just written with `plaintext`.
    #[must_use]
    pub const fn create(plaintext: &'a DeploymentSettings) -> Self {
        Self {
            mode: SecretMode::Create,
            plaintext: Some(plaintext),
            stored: None,
        }
    }

    /// Refresh of tracked settings: `plaintext` from the recorded inputs,
    /// `stored` ciphertext from the recorded outputs.
    #[must_use]
    pub const fn merge(plaintext: &'a DeploymentSettings, stored: &'a DeploymentSettings) -> Self {
        Self {
            mode: SecretMode::Merge,
            plaintext: Some(plaintext),
            stored: Some(stored),
        }
    }

    /// Import of untracked settings.
    #[must_use]
    pub const fn import() -> Self {
        Self {
            mode: SecretMode::Import,
            plaintext: None,
            stored: None,
        }
    }

    /// Mode the sources imply.
    #[must_use]
    pub const fn mode(&self) -> SecretMode {
        self.mode
    }
}

/// Which representation of secret fields to emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    /// Secret-wrapped plaintext, recorded as resource inputs.
    Inputs,
    /// Ciphertext, recorded as resource outputs.
    Outputs,
}

/// Declared deployment settings of a stack.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeploymentSettingsInput {
    /// Configured stack.
    pub stack: StackName,
    /// The settings document.
    pub settings: DeploymentSettings,
}

impl DeploymentSettingsInput {
    /// Decodes the input from properties.
    ///
    /// Secrets are recognized by the secret marker on the value or on any
    /// enclosing object; SSH keys and passwords are always secret.
    ///
    /// # Errors
    ///
    /// Returns a [`PropertyError`] for a missing stack key or a mistyped field.
    pub fn from_property_map(props: &PropertyMap) -> PropertyResult<Self> {
        Ok(Self {
            stack: stack_from_properties(props)?,
            settings: DeploymentSettings {
                operation_context: decode_operation_context(props)?,
                github: decode_github(props)?,
                source_context: decode_source_context(props)?,
                executor_context: decode_executor_context(props)?,
                agent_pool_id: owned_str(props, "agentPoolId")?,
                cache_options: props
                    .optional_object("cacheOptions")?
                    .map(|cache| -> PropertyResult<_> {
                        Ok(CacheOptions {
                            enable: cache.optional_bool("enable")?.unwrap_or(false),
                        })
                    })
                    .transpose()?,
            },
        })
    }

    /// Encodes the settings as properties.
    ///
    /// Empty strings and false options are omitted. Secret fields are emitted
    /// as `view` asks, with plaintext resolved through `sources`.
    #[must_use]
    pub fn to_property_map(&self, sources: SecretSources<'_>, view: View) -> PropertyMap {
        let emitter = Emitter { sources, view };
        let settings = &self.settings;
        let mut props = stack_properties(&self.stack);

        props.insert_opt("agentPoolId", filled(settings.agent_pool_id.as_deref()));
        if let Some(source) = &settings.source_context {
            props.insert("sourceContext", emitter.source_context(source));
        }
        if let Some(operation) = &settings.operation_context {
            props.insert("operationContext", emitter.operation_context(operation));
        }
        if let Some(github) = &settings.github {
            props.insert("github", github_properties(github));
        }
        if let Some(image) = settings
            .executor_context
            .as_ref()
            .and_then(|context| context.executor_image.as_ref())
            .filter(|image| !image.reference.is_empty())
        {
            props.insert(
                "executorContext",
                crate::props! { "executorImage" => &image.reference },
            );
        }
        if let Some(cache) = settings.cache_options {
            props.insert("cacheOptions", crate::props! { "enable" => cache.enable });
        }
        props
    }
}

fn filled(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

fn owned_str(props: &PropertyMap, key: &str) -> PropertyResult<Option<String>> {
    Ok(props.optional_str(key)?.map(str::to_string))
}

fn string_or_default(props: &PropertyMap, key: &str) -> PropertyResult<String> {
    Ok(owned_str(props, key)?.unwrap_or_default())
}

fn is_secret(props: &PropertyMap, key: &str) -> bool {
    props.get(key).is_some_and(PropertyValue::is_secret)
}

/// Reads a field that is always stored encrypted. Outputs record it under
/// the same key as ciphertext; older states used a `<key>Cipher` twin.
fn always_secret(props: &PropertyMap, key: &str) -> PropertyResult<Option<SecretValue>> {
    if !props.contains_key(key) && !props.contains_key(&format!("{key}Cipher")) {
        return Ok(None);
    }
    Ok(Some(SecretValue::secret(string_or_default(props, key)?)))
}

fn decode_source_context(props: &PropertyMap) -> PropertyResult<Option<SourceContext>> {
    let Some(source) = props.optional_object("sourceContext")? else {
        return Ok(None);
    };
    let cascade = is_secret(props, "sourceContext");

    let git = source
        .optional_object("git")?
        .map(|git| decode_git(git, cascade || is_secret(source, "git")))
        .transpose()?;
    let template = source
        .optional_object("template")?
        .map(|template| -> PropertyResult<_> {
            Ok(SourceContextTemplate {
                source_url: string_or_default(template, "sourceUrl")?,
            })
        })
        .transpose()?;

    Ok(Some(SourceContext { git, template }))
}

fn decode_git(git: &PropertyMap, cascade: bool) -> PropertyResult<SourceContextGit> {
    let git_auth = git
        .optional_object("gitAuth")?
        .map(|auth| decode_git_auth(auth, cascade || is_secret(git, "gitAuth")))
        .transpose()?;

    Ok(SourceContextGit {
        repo_url: string_or_default(git, "repoUrl")?,
        branch: string_or_default(git, "branch")?,
        repo_dir: owned_str(git, "repoDir")?,
        commit: owned_str(git, "commit")?,
        git_auth,
    })
}

fn decode_git_auth(auth: &PropertyMap, cascade: bool) -> PropertyResult<GitAuthConfig> {
    let ssh_auth = auth
        .optional_object("sshAuth")?
        .map(|ssh| -> PropertyResult<_> {
            Ok(SshAuth {
                ssh_private_key: always_secret(ssh, "sshPrivateKey")?.unwrap_or_default(),
                password: always_secret(ssh, "password")?,
            })
        })
        .transpose()?;

    let basic_cascade = cascade || is_secret(auth, "basicAuth");
    let basic_auth = auth
        .optional_object("basicAuth")?
        .map(|basic| -> PropertyResult<_> {
            let user_name = match basic.optional_str("username")? {
                Some(name) => SecretValue {
                    value: name.to_string(),
                    secret: basic_cascade || is_secret(basic, "username"),
                },
                None => SecretValue::default(),
            };
            Ok(BasicAuth {
                user_name,
                password: always_secret(basic, "password")?.unwrap_or_default(),
            })
        })
        .transpose()?;

    Ok(GitAuthConfig {
        access_token: always_secret(auth, "accessToken")?,
        ssh_auth,
        basic_auth,
    })
}

fn decode_operation_context(props: &PropertyMap) -> PropertyResult<Option<OperationContext>> {
    let Some(operation) = props.optional_object("operationContext")? else {
        return Ok(None);
    };
    let cascade = is_secret(props, "operationContext");

    let environment_variables = operation
        .optional_object("environmentVariables")?
        .map(|variables| {
            let cascade = cascade || is_secret(operation, "environmentVariables");
            variables
                .iter()
                .map(|(name, value)| {
                    let text = value
                        .secret_or_string()
                        .ok_or_else(|| PropertyError::wrong_type(name.as_str(), "a string"))?;
                    Ok((
                        name.clone(),
                        SecretValue {
                            value: text.to_string(),
                            secret: cascade || value.is_secret(),
                        },
                    ))
                })
                .collect::<PropertyResult<_>>()
        })
        .transpose()?;

    let options = operation
        .optional_object("options")?
        .map(|options| -> PropertyResult<_> {
            Ok(OperationContextOptions {
                skip_install_dependencies: options
                    .optional_bool("skipInstallDependencies")?
                    .unwrap_or(false),
                skip_intermediate_deployments: options
                    .optional_bool("skipIntermediateDeployments")?
                    .unwrap_or(false),
                shell: owned_str(options, "shell")?,
                delete_after_destroy: options.optional_bool("deleteAfterDestroy")?.unwrap_or(false),
            })
        })
        .transpose()?;

    Ok(Some(OperationContext {
        options,
        pre_run_commands: operation.string_array("preRunCommands")?,
        environment_variables,
        oidc: operation.optional_object("oidc")?.map(decode_oidc).transpose()?,
    }))
}

fn decode_oidc(oidc: &PropertyMap) -> PropertyResult<OidcConfiguration> {
    let aws = oidc
        .optional_object("aws")?
        .map(|aws| -> PropertyResult<_> {
            Ok(AwsOidcConfiguration {
                duration: owned_str(aws, "duration")?,
                policy_arns: aws.string_array("policyARNs")?,
                role_arn: string_or_default(aws, "roleARN")?,
                session_name: string_or_default(aws, "sessionName")?,
            })
        })
        .transpose()?;
    let gcp = oidc
        .optional_object("gcp")?
        .map(|gcp| -> PropertyResult<_> {
            Ok(GcpOidcConfiguration {
                project_id: owned_str(gcp, "projectId")?,
                region: string_or_default(gcp, "region")?,
                workload_pool_id: owned_str(gcp, "workloadPoolId")?,
                provider_id: owned_str(gcp, "providerId")?,
                service_account: owned_str(gcp, "serviceAccount")?,
                token_lifetime: string_or_default(gcp, "tokenLifetime")?,
            })
        })
        .transpose()?;
    let azure = oidc
        .optional_object("azure")?
        .map(|azure| -> PropertyResult<_> {
            Ok(AzureOidcConfiguration {
                client_id: string_or_default(azure, "clientId")?,
                tenant_id: string_or_default(azure, "tenantId")?,
                subscription_id: string_or_default(azure, "subscriptionId")?,
            })
        })
        .transpose()?;

    Ok(OidcConfiguration { aws, gcp, azure })
}

fn decode_github(props: &PropertyMap) -> PropertyResult<Option<GitHubConfiguration>> {
    props
        .optional_object("github")?
        .map(|github| -> PropertyResult<_> {
            Ok(GitHubConfiguration {
                repository: owned_str(github, "repository")?,
                deploy_commits: github.optional_bool("deployCommits")?.unwrap_or(false),
                preview_pull_requests: github
                    .optional_bool("previewPullRequests")?
                    .unwrap_or(false),
                pull_request_template: github
                    .optional_bool("pullRequestTemplate")?
                    .unwrap_or(false),
                paths: github.string_array("paths")?,
            })
        })
        .transpose()
}

fn decode_executor_context(props: &PropertyMap) -> PropertyResult<Option<ExecutorContext>> {
    props
        .optional_object("executorContext")?
        .map(|context| -> PropertyResult<_> {
            Ok(ExecutorContext {
                executor_image: owned_str(context, "executorImage")?
                    .map(|reference| DockerImage { reference }),
            })
        })
        .transpose()
}

fn git_auth_of(settings: &DeploymentSettings) -> Option<&GitAuthConfig> {
    settings
        .source_context
        .as_ref()?
        .git
        .as_ref()?
        .git_auth
        .as_ref()
}

struct Emitter<'a> {
    sources: SecretSources<'a>,
    view: View,
}

impl Emitter<'_> {
    /// Emits one secret field. `field` locates the same field in the plaintext
    /// and stored settings.
    fn secret<F>(&self, live: &SecretValue, field: F) -> PropertyValue
    where
        F: for<'s> Fn(&'s DeploymentSettings) -> Option<&'s SecretValue>,
    {
        let plaintext = self.sources.plaintext.and_then(&field).map(|v| v.value.as_str());
        let stored = self.sources.stored.and_then(&field).map(|v| v.value.as_str());
        let emission = emit_secret(self.sources.mode, &live.value, plaintext, stored);
        match self.view {
            View::Inputs => emission.input,
            View::Outputs => emission.output,
        }
    }

    fn source_context(&self, source: &SourceContext) -> PropertyMap {
        let mut map = PropertyMap::new();
        if let Some(git) = &source.git {
            let mut git_map = PropertyMap::new();
            git_map.insert_opt("repoUrl", filled(Some(git.repo_url.as_str())));
            git_map.insert_opt("commit", filled(git.commit.as_deref()));
            git_map.insert_opt("branch", filled(Some(git.branch.as_str())));
            git_map.insert_opt("repoDir", filled(git.repo_dir.as_deref()));
            if let Some(auth) = &git.git_auth {
                git_map.insert("gitAuth", self.git_auth(auth));
            }
            map.insert("git", git_map);
        }
        if let Some(template) = &source.template {
            map.insert(
                "template",
                crate::props! { "sourceUrl" => &template.source_url },
            );
        }
        map
    }

    fn git_auth(&self, auth: &GitAuthConfig) -> PropertyMap {
        let mut map = PropertyMap::new();
        if let Some(token) = auth.access_token.as_ref().filter(|t| !t.value.is_empty()) {
            map.insert(
                "accessToken",
                self.secret(token, |s| git_auth_of(s)?.access_token.as_ref()),
            );
        }

        if let Some(ssh) = &auth.ssh_auth {
            let mut ssh_map = PropertyMap::new();
            if !ssh.ssh_private_key.value.is_empty() {
                ssh_map.insert(
                    "sshPrivateKey",
                    self.secret(&ssh.ssh_private_key, |s| {
                        git_auth_of(s)?.ssh_auth.as_ref().map(|a| &a.ssh_private_key)
                    }),
                );
            }
            if let Some(password) = ssh.password.as_ref().filter(|p| !p.value.is_empty()) {
                ssh_map.insert(
                    "password",
                    self.secret(password, |s| git_auth_of(s)?.ssh_auth.as_ref()?.password.as_ref()),
                );
            }
            map.insert("sshAuth", ssh_map);
        }

        if let Some(basic) = &auth.basic_auth {
            let mut basic_map = PropertyMap::new();
            let user_name = &basic.user_name;
            if !user_name.value.is_empty() {
                let value = if user_name.secret {
                    self.secret(user_name, |s| {
                        git_auth_of(s)?.basic_auth.as_ref().map(|a| &a.user_name)
                    })
                } else {
                    PropertyValue::from(user_name.value.as_str())
                };
                basic_map.insert("username", value);
            }
            if !basic.password.value.is_empty() {
                basic_map.insert(
                    "password",
                    self.secret(&basic.password, |s| {
                        git_auth_of(s)?.basic_auth.as_ref().map(|a| &a.password)
                    }),
                );
            }
            map.insert("basicAuth", basic_map);
        }
        map
    }

    fn operation_context(&self, operation: &OperationContext) -> PropertyMap {
        let mut map = PropertyMap::new();
        if let Some(commands) = &operation.pre_run_commands {
            map.insert("preRunCommands", PropertyValue::string_array(commands));
        }

        if let Some(variables) = &operation.environment_variables {
            let variables: PropertyMap = variables
                .iter()
                .map(|(name, value)| {
                    let emitted = if value.secret {
                        self.secret(value, |s| {
                            s.operation_context
                                .as_ref()?
                                .environment_variables
                                .as_ref()?
                                .get(name)
                        })
                    } else {
                        PropertyValue::from(value.value.as_str())
                    };
                    (name.as_str(), emitted)
                })
                .collect();
            map.insert("environmentVariables", variables);
        }

        if let Some(options) = &operation.options {
            let mut options_map = PropertyMap::new();
            options_map.insert_opt("shell", filled(options.shell.as_deref()));
            let flags = [
                ("skipInstallDependencies", options.skip_install_dependencies),
                ("skipIntermediateDeployments", options.skip_intermediate_deployments),
                ("deleteAfterDestroy", options.delete_after_destroy),
            ];
            for (key, set) in flags {
                if set {
                    options_map.insert(key, true);
                }
            }
            map.insert("options", options_map);
        }

        if let Some(oidc) = operation
            .oidc
            .as_ref()
            .filter(|o| o.aws.is_some() || o.gcp.is_some() || o.azure.is_some())
        {
            map.insert("oidc", oidc_properties(oidc));
        }
        map
    }
}

fn oidc_properties(oidc: &OidcConfiguration) -> PropertyMap {
    let mut map = PropertyMap::new();
    if let Some(aws) = &oidc.aws {
        let mut aws_map = PropertyMap::new();
        aws_map.insert_opt("roleARN", filled(Some(aws.role_arn.as_str())));
        aws_map.insert_opt("sessionName", filled(Some(aws.session_name.as_str())));
        aws_map.insert_opt(
            "policyARNs",
            aws.policy_arns.as_ref().map(PropertyValue::string_array),
        );
        aws_map.insert_opt("duration", filled(aws.duration.as_deref()));
        map.insert("aws", aws_map);
    }
    if let Some(gcp) = &oidc.gcp {
        let mut gcp_map = PropertyMap::new();
        gcp_map.insert_opt("providerId", filled(gcp.provider_id.as_deref()));
        gcp_map.insert_opt("serviceAccount", filled(gcp.service_account.as_deref()));
        gcp_map.insert_opt("region", filled(Some(gcp.region.as_str())));
        gcp_map.insert_opt("workloadPoolId", filled(gcp.workload_pool_id.as_deref()));
        gcp_map.insert_opt("projectId", filled(gcp.project_id.as_deref()));
        gcp_map.insert_opt("tokenLifetime", filled(Some(gcp.token_lifetime.as_str())));
        map.insert("gcp", gcp_map);
    }
    if let Some(azure) = &oidc.azure {
        let mut azure_map = PropertyMap::new();
        azure_map.insert_opt("tenantId", filled(Some(azure.tenant_id.as_str())));
        azure_map.insert_opt("clientId", filled(Some(azure.client_id.as_str())));
        azure_map.insert_opt("subscriptionId", filled(Some(azure.subscription_id.as_str())));
        map.insert("azure", azure_map);
    }
    map
}

fn github_properties(github: &GitHubConfiguration) -> PropertyMap {
    let mut map = crate::props! {
        "previewPullRequests" => github.preview_pull_requests,
        "deployCommits" => github.deploy_commits,
        "pullRequestTemplate" => github.pull_request_template,
    };
    map.insert_opt("repository", filled(github.repository.as_deref()));
    if let Some(paths) = github.paths.as_ref().filter(|p| !p.is_empty()) {
        map.insert("paths", PropertyValue::string_array(paths));
    }
    map
}

fn object_mut(value: &mut PropertyValue) -> Option<&mut PropertyMap> {
    match value {
        PropertyValue::Object(map) => Some(map),
        PropertyValue::Secret(inner) => object_mut(inner),
        _ => None,
    }
}

fn normalize_duration(input: &str) -> std::result::Result<String, String> {
    if input.is_empty() {
        return Err("empty value provided for duration string".to_string());
    }
    GoDuration::normalize(input)
        .map_err(|e| format!("failed to parse duration string `{input}` due to error: {e}"))
}

/// Rewrites `operationContext.oidc.aws.duration` in canonical form, keeping
/// its secretness.
fn normalize_aws_duration(news: &mut PropertyMap) -> Option<CheckFailure> {
    let aws = news
        .get_mut("operationContext")
        .and_then(object_mut)?
        .get_mut("oidc")
        .and_then(object_mut)?
        .get_mut("aws")
        .and_then(object_mut)?;
    let duration = aws.get_mut("duration")?;
    let raw = duration.secret_or_string()?.to_string();

    match normalize_duration(&raw) {
        Ok(normalized) => {
            *duration = if duration.is_secret() {
                PropertyValue::secret(normalized)
            } else {
                PropertyValue::from(normalized)
            };
            None
        }
        Err(reason) => Some(CheckFailure::new(
            AWS_DURATION,
            format!("Failed to normalize duration string due to error: {reason}"),
        )),
    }
}

/// Manages the deployment settings of a stack.
pub struct DeploymentSettingsResource {
    client: Arc<dyn PulumiServiceApi>,
}

impl DeploymentSettingsResource {
    /// Creates the handler.
    #[must_use]
    pub fn new(client: Arc<dyn PulumiServiceApi>) -> Self {
        Self { client }
    }

    async fn put(&self, properties: &PropertyMap) -> Result<PropertyMap> {
        let input = DeploymentSettingsInput::from_property_map(properties)?;
        let stored = self
            .client
            .put_deployment_settings(&input.stack, &input.settings)
            .await?;

        let live = DeploymentSettingsInput {
            stack: input.stack.clone(),
            settings: stored,
        };
        Ok(live.to_property_map(SecretSources::create(&input.settings), View::Outputs))
    }
}

#[async_trait]
impl ResourceHandler for DeploymentSettingsResource {
    fn name(&self) -> &'static str {
        DEPLOYMENT_SETTINGS
    }

    fn check(&self, request: &CheckRequest) -> Result<CheckResponse> {
        let mut inputs = request.news.clone();
        let mut failures = CheckFailure::missing(&inputs, REPLACE_KEYS);
        failures.extend(normalize_aws_duration(&mut inputs));
        Ok(CheckResponse { inputs, failures })
    }

    fn diff(&self, request: &DiffRequest) -> Result<DiffResponse> {
        Ok(request.diff_inputs(ReplaceKeys::Only(REPLACE_KEYS)))
    }

    async fn create(&self, request: &CreateRequest) -> Result<CreateResponse> {
        let stack = stack_from_properties(&request.properties)?;
        if request.preview {
            return Ok(CreateResponse::preview(request.properties.clone()));
        }
        info!(stack = %stack, "Creating deployment settings");
        let properties = self.put(&request.properties).await?;
        Ok(CreateResponse {
            id: stack.encode(),
            properties,
        })
    }

    async fn read(&self, request: &ReadRequest) -> Result<ReadResponse> {
        let stack = StackName::decode(&request.id)?;
        debug!(stack = %stack, "Reading deployment settings");

        let Some(settings) = self.client.get_deployment_settings(&stack).await? else {
            return Ok(ReadResponse::absent());
        };
        let live = DeploymentSettingsInput { stack, settings };

        let tracked = if request.properties.contains_key("stack") {
            Some((
                DeploymentSettingsInput::from_property_map(&request.inputs)?.settings,
                DeploymentSettingsInput::from_property_map(&request.properties)?.settings,
            ))
        } else {
            None
        };
        let sources = match &tracked {
            Some((plaintext, stored)) => SecretSources::merge(plaintext, stored),
            None => SecretSources::import(),
        };

        Ok(ReadResponse {
            id: request.id.clone(),
            properties: live.to_property_map(sources, View::Outputs),
            inputs: live.to_property_map(sources, View::Inputs),
        })
    }

    async fn update(&self, request: &UpdateRequest) -> Result<UpdateResponse> {
        let stack = stack_from_properties(&request.news)?;
        if request.preview {
            return Ok(UpdateResponse {
                properties: request.news.clone(),
            });
        }
        info!(stack = %stack, "Updating deployment settings");
        Ok(UpdateResponse {
            properties: self.put(&request.news).await?,
        })
    }

    async fn delete(&self, request: &DeleteRequest) -> Result<()> {
        let stack = StackName::decode(&request.id)?;
        info!(stack = %stack, "Deleting deployment settings");
        self.client.delete_deployment_settings(&stack).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use crate::client::MockPulumiServiceApi;
    use crate::props;
    use crate::secret::REPLACE_ME;

    fn stack_props() -> PropertyMap {
        props! {
            "organization" => "acme",
            "project" => "web",
            "stack" => "prod",
        }
    }

    fn with_ssh_key(mut props: PropertyMap, key: PropertyValue) -> PropertyMap {
        props.insert(
            "sourceContext",
            props! {
                "git" => props! {
                    "repoUrl" => "https://github.com/acme/web.git",
                    "branch" => "main",
                    "gitAuth" => props! {
                        "sshAuth" => props! { "sshPrivateKey" => key },
                    },
                },
            },
        );
        props
    }

    fn live_settings(cipher: &str) -> DeploymentSettings {
        DeploymentSettings {
            source_context: Some(SourceContext {
                git: Some(SourceContextGit {
                    repo_url: "https://github.com/acme/web.git".to_string(),
                    branch: "main".to_string(),
                    git_auth: Some(GitAuthConfig {
                        ssh_auth: Some(SshAuth {
                            ssh_private_key: SecretValue::secret(cipher),
                            password: None,
                        }),
                        ..GitAuthConfig::default()
                    }),
                    ..SourceContextGit::default()
                }),
                template: None,
            }),
            ..DeploymentSettings::default()
        }
    }

    fn ssh_key(props: &PropertyMap) -> Option<&PropertyValue> {
        props
            .optional_object("sourceContext")
            .ok()??
            .optional_object("git")
            .ok()??
            .optional_object("gitAuth")
            .ok()??
            .optional_object("sshAuth")
            .ok()??
            .get("sshPrivateKey")
    }

    #[test]
    fn test_check_normalizes_aws_duration() {
        let handler = DeploymentSettingsResource::new(Arc::new(MockPulumiServiceApi::new()));
        let mut news = stack_props();
        news.insert(
            "operationContext",
            props! { "oidc" => props! { "aws" => props! { "duration" => "1h30m" } } },
        );

        let response = handler
            .check(&CheckRequest {
                news,
                ..CheckRequest::default()
            })
            .expect("check");
        assert!(response.is_valid());
        let aws = response.inputs["operationContext"].as_object().expect("object")["oidc"]
            .as_object()
            .expect("object")["aws"]
            .as_object()
            .expect("object");
        assert_eq!(aws.get("duration"), Some(&PropertyValue::from("1h30m0s")));
    }

    #[test]
    fn test_check_keeps_duration_secret() {
        let handler = DeploymentSettingsResource::new(Arc::new(MockPulumiServiceApi::new()));
        let mut news = stack_props();
        news.insert(
            "operationContext",
            PropertyValue::secret(props! {
                "oidc" => props! { "aws" => props! { "duration" => PropertyValue::secret("90m") } },
            }),
        );

        let response = handler
            .check(&CheckRequest {
                news,
                ..CheckRequest::default()
            })
            .expect("check");
        let context = response.inputs.get("operationContext").expect("context");
        assert!(context.is_secret());
        let duration = context
            .secret_or_object()
            .and_then(|c| c.get("oidc"))
            .and_then(PropertyValue::as_object)
            .and_then(|o| o.get("aws"))
            .and_then(PropertyValue::as_object)
            .and_then(|a| a.get("duration"))
            .expect("duration");
        assert_eq!(duration, &PropertyValue::secret("1h30m0s"));
    }

    #[test]
    fn test_check_reports_bad_duration() {
        let handler = DeploymentSettingsResource::new(Arc::new(MockPulumiServiceApi::new()));
        let mut news = stack_props();
        news.insert(
            "operationContext",
            props! { "oidc" => props! { "aws" => props! { "duration" => "" } } },
        );

        let response = handler
            .check(&CheckRequest {
                news,
                ..CheckRequest::default()
            })
            .expect("check");
        assert_eq!(
            response.failures,
            vec![CheckFailure::new(
                "operationContext.oidc.aws.duration",
                "Failed to normalize duration string due to error: empty value provided for duration string"
            )]
        );
    }

    #[test]
    fn test_decode_cascades_secretness_to_environment_variables() {
        let mut props = stack_props();
        props.insert(
            "operationContext",
            props! {
                "environmentVariables" => PropertyValue::secret(props! { "TOKEN" => "abc" }),
                "options" => props! { "shell" => "/bin/bash" },
            },
        );
        let input = DeploymentSettingsInput::from_property_map(&props).expect("decode");
        let context = input.settings.operation_context.expect("context");
        let variables = context.environment_variables.expect("variables");
        assert_eq!(variables["TOKEN"], SecretValue::secret("abc"));
        assert_eq!(
            context.options.and_then(|o| o.shell).as_deref(),
            Some("/bin/bash")
        );
    }

    #[tokio::test]
    async fn test_create_emits_ciphertext_outputs() {
        let mut api = MockPulumiServiceApi::new();
        api.expect_put_deployment_settings()
            .withf(|stack, settings| {
                stack.to_string() == "acme/web/prod"
                    && settings == &live_settings("-----BEGIN KEY-----")
            })
            .times(1)
            .returning(|_, _| Ok(live_settings("cipher-1")));
        let handler = DeploymentSettingsResource::new(Arc::new(api));

        let response = handler
            .create(&CreateRequest {
                properties: with_ssh_key(
                    stack_props(),
                    PropertyValue::secret("-----BEGIN KEY-----"),
                ),
                ..CreateRequest::default()
            })
            .await
            .expect("create");
        assert_eq!(response.id, "acme/web/prod");
        assert_eq!(
            ssh_key(&response.properties),
            Some(&PropertyValue::from("cipher-1"))
        );
    }

    #[tokio::test]
    async fn test_read_merges_unchanged_secret() {
        let mut api = MockPulumiServiceApi::new();
        api.expect_get_deployment_settings()
            .returning(|_| Ok(Some(live_settings("cipher-1"))));
        let handler = DeploymentSettingsResource::new(Arc::new(api));

        let response = handler
            .read(&ReadRequest {
                id: "acme/web/prod".to_string(),
                properties: with_ssh_key(stack_props(), PropertyValue::from("cipher-1")),
                inputs: with_ssh_key(stack_props(), PropertyValue::secret("my-key")),
                ..ReadRequest::default()
            })
            .await
            .expect("read");
        assert_eq!(ssh_key(&response.inputs), Some(&PropertyValue::secret("my-key")));
        assert_eq!(
            ssh_key(&response.properties),
            Some(&PropertyValue::from("cipher-1"))
        );
    }

    #[tokio::test]
    async fn test_read_blanks_secret_rotated_out_of_band() {
        let mut api = MockPulumiServiceApi::new();
        api.expect_get_deployment_settings()
            .returning(|_| Ok(Some(live_settings("cipher-2"))));
        let handler = DeploymentSettingsResource::new(Arc::new(api));

        let response = handler
            .read(&ReadRequest {
                id: "acme/web/prod".to_string(),
                properties: with_ssh_key(stack_props(), PropertyValue::from("cipher-1")),
                inputs: with_ssh_key(stack_props(), PropertyValue::secret("my-key")),
                ..ReadRequest::default()
            })
            .await
            .expect("read");
        assert_eq!(ssh_key(&response.inputs), Some(&PropertyValue::secret("")));
    }

    #[tokio::test]
    async fn test_import_uses_placeholder() {
        let mut api = MockPulumiServiceApi::new();
        api.expect_get_deployment_settings()
            .returning(|_| Ok(Some(live_settings("cipher-1"))));
        let handler = DeploymentSettingsResource::new(Arc::new(api));

        let response = handler
            .read(&ReadRequest {
                id: "acme/web/prod".to_string(),
                ..ReadRequest::default()
            })
            .await
            .expect("read");
        assert_eq!(
            ssh_key(&response.inputs),
            Some(&PropertyValue::secret(REPLACE_ME))
        );
        assert_eq!(response.inputs["organization"], PropertyValue::from("acme"));
    }

    #[tokio::test]
    async fn test_read_missing_settings_is_absent() {
        let mut api = MockPulumiServiceApi::new();
        api.expect_get_deployment_settings().returning(|_| Ok(None));
        let handler = DeploymentSettingsResource::new(Arc::new(api));

        let response = handler
            .read(&ReadRequest {
                id: "acme/web/prod".to_string(),
                ..ReadRequest::default()
            })
            .await
            .expect("read");
        assert!(response.is_absent());
    }

    #[test]
    fn test_plain_environment_variables_stay_plain() {
        let mut variables = BTreeMap::new();
        variables.insert("REGION".to_string(), SecretValue::plain("us-west-2"));
        variables.insert("TOKEN".to_string(), SecretValue::secret("cipher-t"));
        let input = DeploymentSettingsInput {
            stack: StackName::new("acme", "web", "prod"),
            settings: DeploymentSettings {
                operation_context: Some(OperationContext {
                    environment_variables: Some(variables),
                    ..OperationContext::default()
                }),
                ..DeploymentSettings::default()
            },
        };

        let inputs = input.to_property_map(SecretSources::import(), View::Inputs);
        let emitted = inputs["operationContext"].as_object().expect("object")
            ["environmentVariables"]
            .as_object()
            .expect("object");
        assert_eq!(emitted["REGION"], PropertyValue::from("us-west-2"));
        assert_eq!(emitted["TOKEN"], PropertyValue::secret(REPLACE_ME));
    }


    #[test]
    fn test_input_survives_property_encoding() {
        let mut props = with_ssh_key(stack_props(), PropertyValue::secret("-----BEGIN KEY-----"));
        props.insert(
            "operationContext",
            props! {
                "environmentVariables" => props! {
                    "TOKEN" => PropertyValue::secret("abc"),
                    "REGION" => "us-west-2",
                },
                "options" => props! { "shell" => "/bin/bash", "skipInstallDependencies" => true },
                "preRunCommands" => PropertyValue::string_array(["make deps"]),
            },
        );
        props.insert("agentPoolId", "pool-1");
        props.insert("cacheOptions", props! { "enable" => true });
        let input = DeploymentSettingsInput::from_property_map(&props).expect("decode");

        let encoded = input.to_property_map(SecretSources::create(&input.settings), View::Inputs);
        assert_eq!(
            DeploymentSettingsInput::from_property_map(&encoded).expect("decode"),
            input
        );
    }

    #[tokio::test]
    async fn test_preview_create_writes_nothing() {
        let handler = DeploymentSettingsResource::new(Arc::new(MockPulumiServiceApi::new()));
        let properties = with_ssh_key(stack_props(), PropertyValue::secret("-----BEGIN KEY-----"));
        let response = handler
            .create(&CreateRequest {
                properties: properties.clone(),
                preview: true,
                ..CreateRequest::default()
            })
            .await
            .expect("create");
        assert!(response.id.is_empty());
        assert_eq!(response.properties, properties);
    }
}
