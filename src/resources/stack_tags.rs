//! The managed set of tags on a stack.
//!
//! Unlike [`StackTagResource`](super::StackTagResource), one resource owns
//! several tags and updates them in place. Tags on the stack that the
//! resource never declared are left alone.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::client::{PulumiServiceApi, StackTag};
use crate::diff::{DiffResponse, ReplaceKeys};
use crate::error::{PropertyError, ProviderError, Result};
use crate::id::{CompositeId, StackName, StackTagsId};
use crate::property::PropertyMap;

use super::handler::{
    stack_from_properties, stack_properties, CheckFailure, CheckRequest, CheckResponse, CreateRequest,
    CreateResponse, DeleteRequest, DiffRequest, ReadRequest, ReadResponse, ResourceHandler,
    UpdateRequest, UpdateResponse,
};

/// Type token.
pub const STACK_TAGS: &str = "pulumiservice:index:StackTags";

const REPLACE_KEYS: &[&str] = &["organization", "project", "stack"];

const REQUIRED: &[&str] = &["organization", "project", "stack", "tags"];

/// Declared state of a stack's tag set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackTagsInput {
    /// Tagged stack.
    pub stack: StackName,
    /// Tag name to value.
    pub tags: BTreeMap<String, String>,
}

impl StackTagsInput {
    /// Decodes the input from properties. Absent `tags` is an empty set.
    ///
    /// # Errors
    ///
    /// Returns a [`PropertyError`] for a missing or mistyped key.
    pub fn from_property_map(props: &PropertyMap) -> std::result::Result<Self, PropertyError> {
        Ok(Self {
            stack: stack_from_properties(props)?,
            tags: props.string_map("tags")?.unwrap_or_default(),
        })
    }

    /// Encodes the input as properties.
    #[must_use]
    pub fn to_property_map(&self) -> PropertyMap {
        let mut props = stack_properties(&self.stack);
        props.insert("tags", self.tags.clone());
        props
    }
}

/// Tags to remove and tags to (re)create to move from `old` to `new`.
///
/// A changed value is a delete followed by a create. Both lists are sorted.
fn plan_tag_changes(
    old: &BTreeMap<String, String>,
    new: &BTreeMap<String, String>,
) -> (Vec<String>, Vec<StackTag>) {
    let deletes = old
        .iter()
        .filter(|(name, value)| new.get(*name) != Some(*value))
        .map(|(name, _)| name.clone())
        .collect();
    let creates = new
        .iter()
        .filter(|(name, value)| old.get(*name) != Some(*value))
        .map(|(name, value)| StackTag {
            name: name.clone(),
            value: value.clone(),
        })
        .collect();
    (deletes, creates)
}

/// Manages a set of tags on one stack.
pub struct StackTagsResource {
    client: Arc<dyn PulumiServiceApi>,
}

impl StackTagsResource {
    /// Creates the handler.
    #[must_use]
    pub fn new(client: Arc<dyn PulumiServiceApi>) -> Self {
        Self { client }
    }

    /// Deletes then creates tags, tracking the set the stack holds after each call.
    ///
    /// On failure the error carries the tags in place at that point.
    async fn apply_changes(
        &self,
        stack: &StackName,
        mut applied: BTreeMap<String, String>,
        deletes: &[String],
        creates: &[StackTag],
    ) -> std::result::Result<BTreeMap<String, String>, (BTreeMap<String, String>, String)> {
        for name in deletes {
            if let Err(e) = self.client.delete_stack_tag(stack, name).await {
                return Err((applied, format!("failed to delete tag {name:?}: {e}")));
            }
            applied.remove(name);
        }
        for tag in creates {
            if let Err(e) = self.client.create_stack_tag(stack, tag).await {
                return Err((applied, format!("failed to create tag {:?}: {e}", tag.name)));
            }
            applied.insert(tag.name.clone(), tag.value.clone());
        }
        Ok(applied)
    }

    async fn delete_tags<'a>(
        &self,
        stack: &StackName,
        names: impl IntoIterator<Item = &'a String>,
    ) -> Result<()> {
        for name in names {
            self.client
                .delete_stack_tag(stack, name)
                .await
                .map_err(|e| ProviderError::operation(format!("failed to delete tag {name:?}"), e))?;
        }
        Ok(())
    }
}

#[async_trait]
impl ResourceHandler for StackTagsResource {
    fn name(&self) -> &'static str {
        STACK_TAGS
    }

    fn check(&self, request: &CheckRequest) -> Result<CheckResponse> {
        let mut failures = CheckFailure::missing(&request.news, REQUIRED);
        if let Err(e) = request.news.string_map("tags") {
            failures.push(e.into());
        }
        Ok(CheckResponse {
            inputs: request.news.clone(),
            failures,
        })
    }

    fn diff(&self, request: &DiffRequest) -> Result<DiffResponse> {
        Ok(request.diff_inputs(ReplaceKeys::Only(REPLACE_KEYS)))
    }

    async fn create(&self, request: &CreateRequest) -> Result<CreateResponse> {
        let input = StackTagsInput::from_property_map(&request.properties)?;
        let id = StackTagsId {
            stack: input.stack.clone(),
        }
        .encode();
        if request.preview {
            return Ok(CreateResponse::preview(input.to_property_map()));
        }
        info!(stack = %input.stack, count = input.tags.len(), "Creating stack tags");

        let mut created = BTreeMap::new();
        for (name, value) in &input.tags {
            let tag = StackTag {
                name: name.clone(),
                value: value.clone(),
            };
            if let Err(e) = self.client.create_stack_tag(&input.stack, &tag).await {
                // Tags created so far exist remotely and must stay tracked.
                if created.is_empty() {
                    return Err(ProviderError::operation(
                        format!("failed to create tag {name:?}"),
                        e,
                    ));
                }
                let partial = StackTagsInput {
                    stack: input.stack,
                    tags: created,
                };
                return Err(ProviderError::ResourceInitFailed {
                    id,
                    properties: partial.to_property_map(),
                    reasons: vec![format!("failed to create tag {name:?}: {e}")],
                });
            }
            created.insert(name.clone(), value.clone());
        }

        Ok(CreateResponse {
            id,
            properties: request.properties.clone(),
        })
    }

    async fn read(&self, request: &ReadRequest) -> Result<ReadResponse> {
        let id = StackTagsId::decode(&request.id)?;
        debug!(id = %request.id, "Reading stack tags");

        let live = self
            .client
            .list_stack_tags(&id.stack)
            .await
            .map_err(|e| {
                ProviderError::operation(format!("failed to read stack tags ({:?})", request.id), e)
            })?;
        let Some(live) = live else {
            return Ok(ReadResponse::absent());
        };

        let managed = request
            .inputs
            .string_map("tags")?
            .filter(|tags| !tags.is_empty());
        let tags = match managed {
            Some(managed) => live
                .into_iter()
                .filter(|(name, _)| managed.contains_key(name))
                .collect(),
            None => live,
        };

        let props = StackTagsInput {
            stack: id.stack,
            tags,
        }
        .to_property_map();
        Ok(ReadResponse {
            id: request.id.clone(),
            properties: props.clone(),
            inputs: props,
        })
    }

    async fn update(&self, request: &UpdateRequest) -> Result<UpdateResponse> {
        let old = StackTagsInput::from_property_map(&request.olds)?;
        let new = StackTagsInput::from_property_map(&request.news)?;
        let (deletes, creates) = plan_tag_changes(&old.tags, &new.tags);
        info!(
            stack = %new.stack,
            deletes = deletes.len(),
            creates = creates.len(),
            "Updating stack tags"
        );

        if request.preview {
            return Ok(UpdateResponse {
                properties: request.news.clone(),
            });
        }

        match self
            .apply_changes(&new.stack, old.tags, &deletes, &creates)
            .await
        {
            Ok(_) => Ok(UpdateResponse {
                properties: request.news.clone(),
            }),
            Err((applied, reason)) => {
                warn!(stack = %new.stack, reason = %reason, "Stack tags partially updated");
                Err(ProviderError::ResourceInitFailed {
                    id: request.id.clone(),
                    properties: StackTagsInput {
                        stack: new.stack,
                        tags: applied,
                    }
                    .to_property_map(),
                    reasons: vec![reason],
                })
            }
        }
    }

    async fn delete(&self, request: &DeleteRequest) -> Result<()> {
        let input = StackTagsInput::from_property_map(&request.properties)?;
        info!(stack = %input.stack, count = input.tags.len(), "Deleting stack tags");
        self.delete_tags(&input.stack, input.tags.keys()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use crate::client::MockPulumiServiceApi;
    use crate::diff::DiffChanges;
    use crate::error::ApiError;
    use crate::props;

    fn tags(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    fn input(pairs: &[(&str, &str)]) -> PropertyMap {
        StackTagsInput {
            stack: StackName::new("acme", "web", "prod"),
            tags: tags(pairs),
        }
        .to_property_map()
    }

    #[test]
    fn test_plan_tag_changes() {
        let old = tags(&[("a", "1"), ("b", "2"), ("c", "3")]);
        let new = tags(&[("b", "2"), ("c", "30"), ("d", "4")]);
        let (deletes, creates) = plan_tag_changes(&old, &new);
        assert_eq!(deletes, vec!["a".to_string(), "c".to_string()]);
        let created: Vec<&str> = creates.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(created, vec!["c", "d"]);
        assert_eq!(creates[0].value, "30");
    }

    #[tokio::test]
    async fn test_create_reports_tags_created_before_failure() {
        let mut api = MockPulumiServiceApi::new();
        api.expect_create_stack_tag().returning(|_, tag| {
            if tag.name == "b" {
                Err(ApiError::api_error(500, "boom"))
            } else {
                Ok(())
            }
        });
        let handler = StackTagsResource::new(Arc::new(api));

        let err = handler
            .create(&CreateRequest {
                properties: input(&[("a", "1"), ("b", "2"), ("c", "3")]),
                ..CreateRequest::default()
            })
            .await
            .expect_err("second tag fails");
        match err {
            ProviderError::ResourceInitFailed { id, properties, .. } => {
                assert_eq!(id, "acme/web/prod/tags");
                assert_eq!(properties, input(&[("a", "1")]));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_read_keeps_only_managed_tags() {
        let mut api = MockPulumiServiceApi::new();
        api.expect_list_stack_tags()
            .returning(|_| Ok(Some(tags(&[("a", "1"), ("b", "2"), ("pulumi:team", "x")]))));
        let handler = StackTagsResource::new(Arc::new(api));

        let response = handler
            .read(&ReadRequest {
                id: "acme/web/prod/tags".to_string(),
                inputs: input(&[("a", "0"), ("b", "2")]),
                ..ReadRequest::default()
            })
            .await
            .expect("read");
        assert_eq!(response.properties, input(&[("a", "1"), ("b", "2")]));
    }

    #[tokio::test]
    async fn test_import_reads_every_tag() {
        let mut api = MockPulumiServiceApi::new();
        api.expect_list_stack_tags()
            .returning(|_| Ok(Some(tags(&[("a", "1"), ("b", "2")]))));
        let handler = StackTagsResource::new(Arc::new(api));

        let response = handler
            .read(&ReadRequest {
                id: "acme/web/prod/tags".to_string(),
                ..ReadRequest::default()
            })
            .await
            .expect("read");
        assert_eq!(response.inputs, input(&[("a", "1"), ("b", "2")]));
    }

    #[tokio::test]
    async fn test_update_deletes_then_creates_in_order() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut api = MockPulumiServiceApi::new();
        let deleted = Arc::clone(&calls);
        api.expect_delete_stack_tag().returning(move |_, name| {
            deleted.lock().expect("lock").push(format!("delete {name}"));
            Ok(())
        });
        let created = Arc::clone(&calls);
        api.expect_create_stack_tag().returning(move |_, tag| {
            created.lock().expect("lock").push(format!("create {}", tag.name));
            Ok(())
        });
        let handler = StackTagsResource::new(Arc::new(api));

        let news = input(&[("b", "20"), ("c", "3")]);
        let response = handler
            .update(&UpdateRequest {
                id: "acme/web/prod/tags".to_string(),
                olds: input(&[("a", "1"), ("b", "2")]),
                news: news.clone(),
                ..UpdateRequest::default()
            })
            .await
            .expect("update");
        assert_eq!(response.properties, news);
        assert_eq!(
            *calls.lock().expect("lock"),
            vec!["delete a", "delete b", "create b", "create c"]
        );
    }

    #[test]
    fn test_tag_change_is_in_place() {
        let handler = StackTagsResource::new(Arc::new(MockPulumiServiceApi::new()));
        let response = handler
            .diff(&DiffRequest {
                old_inputs: Some(input(&[("a", "1")])),
                news: input(&[("a", "2")]),
                ..DiffRequest::default()
            })
            .expect("diff");
        assert_eq!(response.changes, DiffChanges::Some);
        assert!(response.replaces.is_empty());
        assert!(!response.delete_before_replace);

        let mut moved = input(&[("a", "1")]);
        moved.insert("stack", "staging");
        let response = handler
            .diff(&DiffRequest {
                old_inputs: Some(input(&[("a", "1")])),
                news: moved,
                ..DiffRequest::default()
            })
            .expect("diff");
        assert_eq!(response.replaces, vec!["stack".to_string()]);
    }

    #[test]
    fn test_absent_tags_decode_as_empty() {
        let decoded = StackTagsInput::from_property_map(&props! {
            "organization" => "acme",
            "project" => "web",
            "stack" => "prod",
        })
        .expect("decode");
        assert!(decoded.tags.is_empty());
    }

    #[test]
    fn test_check_reports_missing_and_mistyped_tags() {
        let handler = StackTagsResource::new(Arc::new(MockPulumiServiceApi::new()));
        let mut news = input(&[]);
        news.remove("tags");
        let response = handler
            .check(&CheckRequest {
                news: news.clone(),
                ..CheckRequest::default()
            })
            .expect("check");
        assert_eq!(
            response.failures,
            vec![CheckFailure::new("tags", "missing required property 'tags'")]
        );

        news.insert("tags", "owner=platform");
        let response = handler
            .check(&CheckRequest {
                news,
                ..CheckRequest::default()
            })
            .expect("check");
        assert_eq!(response.failures.len(), 1);
        assert_eq!(response.failures[0].property, "tags");
    }

    #[tokio::test]
    async fn test_update_failure_reports_tags_in_place() {
        let mut api = MockPulumiServiceApi::new();
        api.expect_delete_stack_tag().returning(|_, _| Ok(()));
        api.expect_create_stack_tag().returning(|_, tag| {
            if tag.name == "d" {
                Err(ApiError::api_error(500, "boom"))
            } else {
                Ok(())
            }
        });
        let handler = StackTagsResource::new(Arc::new(api));

        let err = handler
            .update(&UpdateRequest {
                id: "acme/web/prod/tags".to_string(),
                olds: input(&[("a", "1"), ("b", "2")]),
                news: input(&[("a", "1"), ("c", "3"), ("d", "4")]),
                ..UpdateRequest::default()
            })
            .await
            .expect_err("tag d fails");
        let ProviderError::ResourceInitFailed {
            id,
            properties,
            reasons,
        } = err
        else {
            panic!("expected a partial failure");
        };
        assert_eq!(id, "acme/web/prod/tags");
        assert_eq!(properties, input(&[("a", "1"), ("c", "3")]));
        assert!(reasons[0].contains("boom"));
    }

    #[tokio::test]
    async fn test_preview_makes_no_remote_calls() {
        let mut api = MockPulumiServiceApi::new();
        api.expect_create_stack_tag().never();
        api.expect_delete_stack_tag().never();
        let handler = StackTagsResource::new(Arc::new(api));

        let created = handler
            .create(&CreateRequest {
                properties: input(&[("a", "1")]),
                preview: true,
                ..CreateRequest::default()
            })
            .await
            .expect("preview create");
        assert_eq!(created.properties, input(&[("a", "1")]));

        let updated = handler
            .update(&UpdateRequest {
                id: "acme/web/prod/tags".to_string(),
                olds: input(&[("a", "1")]),
                news: input(&[("b", "2")]),
                preview: true,
                ..UpdateRequest::default()
            })
            .await
            .expect("preview update");
        assert_eq!(updated.properties, input(&[("b", "2")]));
    }

    #[test]
    fn test_input_survives_property_encoding() {
        let input = StackTagsInput {
            stack: StackName::new("acme", "web", "prod"),
            tags: tags(&[("owner", "platform"), ("tier", "gold")]),
        };
        assert_eq!(StackTagsInput::from_property_map(&input.to_property_map()), Ok(input));
    }
}
