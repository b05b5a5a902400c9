//! Organization teams and their membership.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::client::{CreateTeamRequest, PulumiServiceApi, Team};
use crate::diff::{DiffResponse, ReplaceKeys};
use crate::error::{PropertyError, ProviderError, Result};
use crate::id::{CompositeId, TeamId};
use crate::property::{PropertyMap, PropertyValue};

use super::handler::{
    CheckFailure, CheckRequest, CheckResponse, CreateRequest, CreateResponse, DeleteRequest,
    DiffRequest, ReadRequest, ReadResponse, ResourceHandler, UpdateRequest, UpdateResponse,
};

/// Type token.
pub const TEAM: &str = "pulumiservice:index:Team";

const REPLACE_KEYS: &[&str] = &["organizationName", "teamType", "name"];

const PULUMI_TEAM: &str = "pulumi";
const GITHUB_TEAM: &str = "github";

/// Declared state of a team.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeamInput {
    /// Owning organization.
    pub organization: String,
    /// `pulumi` or `github`.
    pub team_type: String,
    /// Team name; GitHub teams take theirs from GitHub.
    pub name: String,
    /// Display name.
    pub display_name: String,
    /// Description.
    pub description: String,
    /// Backing GitHub team.
    pub github_team_id: Option<i64>,
    /// Member logins, sorted.
    pub members: Vec<String>,
}

impl TeamInput {
    /// Decodes the input from properties. Members are sorted.
    ///
    /// # Errors
    ///
    /// Returns a [`PropertyError`] for a missing or mistyped key.
    pub fn from_property_map(props: &PropertyMap) -> std::result::Result<Self, PropertyError> {
        let mut members = props.string_array("members")?.unwrap_or_default();
        members.sort();
        Ok(Self {
            organization: props.required_str("organizationName")?.to_string(),
            team_type: props.required_str("teamType")?.to_string(),
            name: props.optional_str("name")?.unwrap_or_default().to_string(),
            display_name: props.optional_str("displayName")?.unwrap_or_default().to_string(),
            description: props.optional_str("description")?.unwrap_or_default().to_string(),
            github_team_id: props.optional_i64("githubTeamId")?,
            members,
        })
    }

    /// Encodes the input as properties. Empty strings are omitted.
    #[must_use]
    pub fn to_property_map(&self) -> PropertyMap {
        let mut props = crate::props! {
            "organizationName" => &self.organization,
            "teamType" => &self.team_type,
            "members" => PropertyValue::string_array(&self.members),
        };
        props.insert_opt("name", non_empty(&self.name));
        props.insert_opt("displayName", non_empty(&self.display_name));
        props.insert_opt("description", non_empty(&self.description));
        props.insert_opt("githubTeamId", self.github_team_id);
        props
    }

    fn from_team(organization: &str, team: Team, github_team_id: Option<i64>) -> Self {
        let mut members: Vec<String> = team.members.into_iter().map(|m| m.github_login).collect();
        members.sort();
        Self {
            organization: organization.to_string(),
            team_type: team.kind,
            name: team.name,
            display_name: team.display_name,
            description: team.description,
            github_team_id,
            members,
        }
    }
}

fn non_empty(value: &str) -> Option<&str> {
    (!value.is_empty()).then_some(value)
}

/// A membership change stopped part way; `state` is the team as it stands.
fn partial_membership(id: &str, state: &TeamInput, reason: String) -> ProviderError {
    warn!(id = %id, reason = %reason, "Team membership partially updated");
    ProviderError::ResourceInitFailed {
        id: id.to_string(),
        properties: state.to_property_map(),
        reasons: vec![reason],
    }
}

/// Manages a team. Membership of GitHub teams is owned by GitHub.
pub struct TeamResource {
    client: Arc<dyn PulumiServiceApi>,
}

impl TeamResource {
    /// Creates the handler.
    #[must_use]
    pub fn new(client: Arc<dyn PulumiServiceApi>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ResourceHandler for TeamResource {
    fn name(&self) -> &'static str {
        TEAM
    }

    fn check(&self, request: &CheckRequest) -> Result<CheckResponse> {
        let mut inputs = request.news.clone();
        let mut failures = CheckFailure::missing(&inputs, &["organizationName"]);

        let team_type = inputs
            .get("teamType")
            .and_then(PropertyValue::secret_or_string)
            .unwrap_or_default()
            .to_string();
        if team_type != PULUMI_TEAM && team_type != GITHUB_TEAM {
            failures.push(CheckFailure::new(
                "teamType",
                format!("found {team_type:?} instead of 'pulumi' or 'github'"),
            ));
        }
        if team_type == GITHUB_TEAM && !inputs.contains_key("githubTeamId") {
            failures.push(CheckFailure::new(
                "githubTeamId",
                "teams with teamType 'github' require a githubTeamId",
            ));
        }
        if team_type == PULUMI_TEAM && !inputs.contains_key("name") {
            failures.push(CheckFailure::new(
                "name",
                "teams with teamType 'pulumi' require a name",
            ));
        }

        if !inputs.contains_key("displayName") {
            if let Some(name) = inputs.get("name").cloned() {
                inputs.insert("displayName", name);
            }
        }
        match inputs.string_array("members") {
            Ok(Some(mut members)) => {
                members.sort();
                inputs.insert("members", PropertyValue::string_array(members));
            }
            Ok(None) => {}
            Err(e) => failures.push(e.into()),
        }

        Ok(CheckResponse { inputs, failures })
    }

    fn diff(&self, request: &DiffRequest) -> Result<DiffResponse> {
        Ok(request.diff_inputs(ReplaceKeys::Only(REPLACE_KEYS)))
    }

    async fn create(&self, request: &CreateRequest) -> Result<CreateResponse> {
        let input = TeamInput::from_property_map(&request.properties)?;
        if request.preview {
            return Ok(CreateResponse {
                id: String::new(),
                properties: input.to_property_map(),
            });
        }
        info!(organization = %input.organization, team = %input.name, kind = %input.team_type, "Creating team");

        let created = self
            .client
            .create_team(&CreateTeamRequest {
                organization: input.organization.clone(),
                team_type: input.team_type.clone(),
                name: input.name.clone(),
                display_name: input.display_name.clone(),
                description: input.description.clone(),
                github_team_id: input.github_team_id,
            })
            .await
            .map_err(|e| ProviderError::operation(format!("error creating team '{}'", input.name), e))?;

        let id = TeamId {
            organization: input.organization.clone(),
            team: created.name.clone(),
        };
        let mut state = TeamInput {
            name: created.name,
            members: Vec::new(),
            ..input.clone()
        };

        for member in &input.members {
            if let Err(e) = self
                .client
                .add_team_member(&id.organization, &id.team, member)
                .await
            {
                warn!(team = %id.team, member = %member, error = %e, "Team created but a member could not be added");
                return Err(ProviderError::ResourceInitFailed {
                    id: id.encode(),
                    properties: state.to_property_map(),
                    reasons: vec![format!("failed to add '{member}' to team: {e}")],
                });
            }
            state.members.push(member.clone());
        }

        Ok(CreateResponse {
            id: id.encode(),
            properties: state.to_property_map(),
        })
    }

    async fn read(&self, request: &ReadRequest) -> Result<ReadResponse> {
        let id = TeamId::decode(&request.id)?;
        debug!(id = %request.id, "Reading team");

        let team = self
            .client
            .get_team(&id.organization, &id.team)
            .await
            .map_err(|e| ProviderError::operation(format!("failed to read Team ({:?})", request.id), e))?;
        let Some(team) = team else {
            return Ok(ReadResponse::absent());
        };

        let github_team_id = request.properties.optional_i64("githubTeamId").ok().flatten();
        let props = TeamInput::from_team(&id.organization, team, github_team_id).to_property_map();
        Ok(ReadResponse {
            id: request.id.clone(),
            properties: props.clone(),
            inputs: props,
        })
    }

    async fn update(&self, request: &UpdateRequest) -> Result<UpdateResponse> {
        let old = TeamInput::from_property_map(&request.olds)?;
        let new = TeamInput::from_property_map(&request.news)?;
        let desired = TeamInput {
            name: old.name.clone(),
            ..new.clone()
        };
        if request.preview {
            return Ok(UpdateResponse {
                properties: desired.to_property_map(),
            });
        }
        let organization = &new.organization;
        let team = &old.name;
        info!(organization = %organization, team = %team, "Updating team");

        if old.display_name != new.display_name || old.description != new.description {
            self.client
                .update_team(organization, team, &new.display_name, &new.description)
                .await?;
        }

        if new.team_type != GITHUB_TEAM && old.members != new.members {
            // Settings are applied; membership moves one call at a time.
            let mut state = TeamInput {
                members: old.members.clone(),
                ..desired.clone()
            };
            let removals = old.members.iter().filter(|m| !new.members.contains(m));
            for member in removals {
                debug!(team = %team, member = %member, "Removing team member");
                if let Err(e) = self.client.remove_team_member(organization, team, member).await {
                    return Err(partial_membership(
                        &request.id,
                        &state,
                        format!("failed to remove '{member}' from team: {e}"),
                    ));
                }
                state.members.retain(|m| m != member);
            }
            for member in new.members.iter().filter(|m| !old.members.contains(m)) {
                debug!(team = %team, member = %member, "Adding team member");
                if let Err(e) = self.client.add_team_member(organization, team, member).await {
                    return Err(partial_membership(
                        &request.id,
                        &state,
                        format!("failed to add '{member}' to team: {e}"),
                    ));
                }
                state.members.push(member.clone());
                state.members.sort();
            }
        }

        Ok(UpdateResponse {
            properties: desired.to_property_map(),
        })
    }

    async fn delete(&self, request: &DeleteRequest) -> Result<()> {
        let id = TeamId::decode(&request.id)?;
        info!(organization = %id.organization, team = %id.team, "Deleting team");
        self.client.delete_team(&id.organization, &id.team).await?;
        Ok(())
    }
}
