//! Resource handler trait and lifecycle request types.
//!
//! This module defines the interface every resource kind implements and the
//! request/response shapes exchanged with the engine for each operation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::diff::{diff, DiffResponse, ReplaceKeys};
use crate::error::{PropertyError, Result};
use crate::id::StackName;
use crate::property::PropertyMap;

/// One resource kind's lifecycle.
///
/// Handlers are stateless apart from their injected client, so a single
/// instance serves concurrent requests for different resources.
#[async_trait]
pub trait ResourceHandler: Send + Sync {
    /// Type token, e.g. `pulumiservice:index:StackTag`.
    fn name(&self) -> &'static str;

    /// Validates and normalizes declared inputs.
    ///
    /// User-correctable problems are reported as failures, not errors.
    ///
    /// # Errors
    ///
    /// Returns an error only when the request cannot be processed at all.
    fn check(&self, request: &CheckRequest) -> Result<CheckResponse>;

    /// Compares old inputs with new inputs without calling the service.
    ///
    /// # Errors
    ///
    /// Returns an error if the old state cannot be interpreted.
    fn diff(&self, request: &DiffRequest) -> Result<DiffResponse>;

    /// Creates the remote object.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::ResourceInitFailed`](crate::error::ProviderError::ResourceInitFailed)
    /// when the object exists remotely but a dependent call failed.
    async fn create(&self, request: &CreateRequest) -> Result<CreateResponse>;

    /// Refreshes the resource from the service.
    ///
    /// # Errors
    ///
    /// Returns an error for malformed identifiers and failed lookups. An
    /// absent object is not an error; it yields [`ReadResponse::absent`].
    async fn read(&self, request: &ReadRequest) -> Result<ReadResponse>;

    /// Updates the remote object in place.
    ///
    /// # Errors
    ///
    /// Kinds whose every field forces replacement return
    /// [`ProviderError::UnexpectedUpdate`](crate::error::ProviderError::UnexpectedUpdate).
    async fn update(&self, request: &UpdateRequest) -> Result<UpdateResponse>;

    /// Deletes the remote object.
    ///
    /// # Errors
    ///
    /// Returns an error if the service call fails.
    async fn delete(&self, request: &DeleteRequest) -> Result<()>;
}

/// A user-correctable validation problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckFailure {
    /// Offending property path.
    pub property: String,
    /// What is wrong with it.
    pub reason: String,
}

impl CheckFailure {
    /// Creates a failure for a property.
    #[must_use]
    pub fn new(property: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            reason: reason.into(),
        }
    }

    /// One failure per required key that is absent from `news`.
    #[must_use]
    pub fn missing(news: &PropertyMap, required: &[&str]) -> Vec<Self> {
        required
            .iter()
            .filter(|key| !news.contains_key(key))
            .map(|key| Self::new(*key, format!("missing required property '{key}'")))
            .collect()
    }
}

impl From<PropertyError> for CheckFailure {
    fn from(err: PropertyError) -> Self {
        let property = match &err {
            PropertyError::Missing { key }
            | PropertyError::WrongType { key, .. }
            | PropertyError::Invalid { key, .. } => key.clone(),
            PropertyError::Malformed { .. } => String::new(),
        };
        Self::new(property, err.to_string())
    }
}

/// Check request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckRequest {
    /// Resource URN.
    #[serde(default)]
    pub urn: String,
    /// Previous inputs, empty on first creation.
    #[serde(default)]
    pub olds: PropertyMap,
    /// Declared inputs.
    #[serde(default)]
    pub news: PropertyMap,
}

/// Check response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckResponse {
    /// Normalized inputs.
    pub inputs: PropertyMap,
    /// Validation failures.
    #[serde(default)]
    pub failures: Vec<CheckFailure>,
}

impl CheckResponse {
    /// Returns true if no failures were reported.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Diff request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffRequest {
    /// Resource identifier.
    #[serde(default)]
    pub id: String,
    /// Resource URN.
    #[serde(default)]
    pub urn: String,
    /// Previous outputs.
    #[serde(default)]
    pub olds: PropertyMap,
    /// Previous inputs, when the engine recorded them.
    #[serde(default)]
    pub old_inputs: Option<PropertyMap>,
    /// New checked inputs.
    #[serde(default)]
    pub news: PropertyMap,
}

impl DiffRequest {
    /// Old inputs when recorded, otherwise old outputs.
    #[must_use]
    pub fn previous(&self) -> &PropertyMap {
        self.old_inputs.as_ref().unwrap_or(&self.olds)
    }

    /// Diffs [`previous`](Self::previous) against the new inputs.
    #[must_use]
    pub fn diff_inputs(&self, replace_keys: ReplaceKeys) -> DiffResponse {
        diff(self.previous(), &self.news, replace_keys)
    }
}

/// Create request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRequest {
    /// Resource URN.
    #[serde(default)]
    pub urn: String,
    /// Checked inputs.
    #[serde(default)]
    pub properties: PropertyMap,
    /// Plan only; no remote changes.
    #[serde(default)]
    pub preview: bool,
}

/// Create response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateResponse {
    /// Allocated identifier.
    pub id: String,
    /// Output properties.
    pub properties: PropertyMap,
}

impl CreateResponse {
    /// Response for a planned create. No identifier is allocated.
    #[must_use]
    pub fn preview(properties: PropertyMap) -> Self {
        Self {
            id: String::new(),
            properties,
        }
    }
}

/// Read request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadRequest {
    /// Identifier to look up.
    pub id: String,
    /// Resource URN.
    #[serde(default)]
    pub urn: String,
    /// Previous outputs, empty on import.
    #[serde(default)]
    pub properties: PropertyMap,
    /// Previous inputs, empty on import.
    #[serde(default)]
    pub inputs: PropertyMap,
}

/// Read response. An empty `id` tells the engine the object is gone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadResponse {
    /// Identifier, empty when the object no longer exists.
    pub id: String,
    /// Live outputs.
    #[serde(default)]
    pub properties: PropertyMap,
    /// Inputs reconstructed from the live object.
    #[serde(default)]
    pub inputs: PropertyMap,
}

impl ReadResponse {
    /// Response for an object that no longer exists remotely.
    #[must_use]
    pub fn absent() -> Self {
        Self::default()
    }

    /// Returns true if the object was not found.
    #[must_use]
    pub fn is_absent(&self) -> bool {
        self.id.is_empty()
    }
}

/// Update request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRequest {
    /// Resource identifier.
    pub id: String,
    /// Resource URN.
    #[serde(default)]
    pub urn: String,
    /// Previous outputs.
    #[serde(default)]
    pub olds: PropertyMap,
    /// Previous inputs, when recorded.
    #[serde(default)]
    pub old_inputs: Option<PropertyMap>,
    /// New checked inputs.
    #[serde(default)]
    pub news: PropertyMap,
    /// Plan only; no remote changes.
    #[serde(default)]
    pub preview: bool,
}

/// Update response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResponse {
    /// New outputs.
    pub properties: PropertyMap,
}

/// Delete request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteRequest {
    /// Resource identifier.
    pub id: String,
    /// Resource URN.
    #[serde(default)]
    pub urn: String,
    /// Last recorded outputs.
    #[serde(default)]
    pub properties: PropertyMap,
}

/// Reads the `organization`, `project` and `stack` keys.
pub(crate) fn stack_from_properties(props: &PropertyMap) -> std::result::Result<StackName, PropertyError> {
    Ok(StackName::new(
        props.required_str("organization")?,
        props.required_str("project")?,
        props.required_str("stack")?,
    ))
}

/// Writes the `organization`, `project` and `stack` keys.
pub(crate) fn stack_properties(stack: &StackName) -> PropertyMap {
    crate::props! {
        "organization" => &stack.organization,
        "project" => &stack.project,
        "stack" => &stack.stack,
    }
}
