//! Composite resource identifiers.
//!
//! Every resource kind names its remote object with a `/`-joined tuple of
//! identity fields. Decoding is total: a string with an unsupported number
//! of parts is an [`IdError`], never a partially filled value.

use std::fmt;

use crate::error::IdError;

/// Project assumed by identifiers written before projects existed.
pub const DEFAULT_PROJECT: &str = "default";

/// A composite identifier with one canonical string form.
pub trait CompositeId: Sized {
    /// Joins the identity fields with `/`.
    fn encode(&self) -> String;

    /// Splits an identifier string back into its identity fields.
    ///
    /// # Errors
    ///
    /// Returns [`IdError`] if the string does not have an accepted shape.
    fn decode(id: &str) -> Result<Self, IdError>;
}

fn split_exact<const N: usize>(id: &str, expected: &'static str) -> Result<[String; N], IdError> {
    let parts: Vec<String> = id.split('/').map(str::to_string).collect();
    parts
        .try_into()
        .map_err(|_| IdError::invalid(id, expected))
}

/// Fully qualified stack name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct StackName {
    /// Organization login.
    pub organization: String,
    /// Project name.
    pub project: String,
    /// Stack name.
    pub stack: String,
}

impl StackName {
    /// Creates a stack name.
    #[must_use]
    pub fn new(
        organization: impl Into<String>,
        project: impl Into<String>,
        stack: impl Into<String>,
    ) -> Self {
        Self {
            organization: organization.into(),
            project: project.into(),
            stack: stack.into(),
        }
    }
}

impl fmt::Display for StackName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.organization, self.project, self.stack)
    }
}

impl CompositeId for StackName {
    fn encode(&self) -> String {
        self.to_string()
    }

    fn decode(id: &str) -> Result<Self, IdError> {
        let [organization, project, stack] = split_exact(id, "organization/project/stack")?;
        Ok(Self {
            organization,
            project,
            stack,
        })
    }
}

/// `organization/project/stack/tagName`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackTagId {
    /// Stack carrying the tag.
    pub stack: StackName,
    /// Tag name.
    pub tag: String,
}

impl CompositeId for StackTagId {
    fn encode(&self) -> String {
        format!("{}/{}", self.stack, self.tag)
    }

    fn decode(id: &str) -> Result<Self, IdError> {
        let [organization, project, stack, tag] =
            split_exact(id, "organization/project/stack/tagName")?;
        Ok(Self {
            stack: StackName {
                organization,
                project,
                stack,
            },
            tag,
        })
    }
}

/// `organization/project/stack/tags`, the identifier of a stack's managed tag set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackTagsId {
    /// Stack carrying the tags.
    pub stack: StackName,
}

impl CompositeId for StackTagsId {
    fn encode(&self) -> String {
        format!("{}/tags", self.stack)
    }

    fn decode(id: &str) -> Result<Self, IdError> {
        const EXPECTED: &str = "organization/project/stack/tags";
        let [organization, project, stack, suffix] = split_exact(id, EXPECTED)?;
        if suffix != "tags" {
            return Err(IdError::invalid(id, EXPECTED));
        }
        Ok(Self {
            stack: StackName {
                organization,
                project,
                stack,
            },
        })
    }
}

/// `organization/project/stack/scheduleId`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentScheduleId {
    /// Stack owning the schedule.
    pub stack: StackName,
    /// Service-assigned schedule ID.
    pub schedule_id: String,
}

impl CompositeId for DeploymentScheduleId {
    fn encode(&self) -> String {
        format!("{}/{}", self.stack, self.schedule_id)
    }

    fn decode(id: &str) -> Result<Self, IdError> {
        let [organization, project, stack, schedule_id] =
            split_exact(id, "organization/project/stack/scheduleId")?;
        Ok(Self {
            stack: StackName {
                organization,
                project,
                stack,
            },
            schedule_id,
        })
    }
}

/// `organization/project/stack/ttl/scheduleId`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TtlScheduleId {
    /// Stack owning the schedule.
    pub stack: StackName,
    /// Service-assigned schedule ID.
    pub schedule_id: String,
}

impl CompositeId for TtlScheduleId {
    fn encode(&self) -> String {
        format!("{}/ttl/{}", self.stack, self.schedule_id)
    }

    fn decode(id: &str) -> Result<Self, IdError> {
        const EXPECTED: &str = "organization/project/stack/ttl/scheduleId";
        let [organization, project, stack, kind, schedule_id] = split_exact(id, EXPECTED)?;
        if kind != "ttl" {
            return Err(IdError::invalid(id, EXPECTED));
        }
        Ok(Self {
            stack: StackName {
                organization,
                project,
                stack,
            },
            schedule_id,
        })
    }
}

/// `organization/project/stack/drift/scheduleId`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriftScheduleId {
    /// Stack owning the schedule.
    pub stack: StackName,
    /// Service-assigned schedule ID.
    pub schedule_id: String,
}

impl CompositeId for DriftScheduleId {
    fn encode(&self) -> String {
        format!("{}/drift/{}", self.stack, self.schedule_id)
    }

    fn decode(id: &str) -> Result<Self, IdError> {
        const EXPECTED: &str = "organization/project/stack/drift/scheduleId";
        let [organization, project, stack, kind, schedule_id] = split_exact(id, EXPECTED)?;
        if kind != "drift" {
            return Err(IdError::invalid(id, EXPECTED));
        }
        Ok(Self {
            stack: StackName {
                organization,
                project,
                stack,
            },
            schedule_id,
        })
    }
}

/// `organization/project/environment`, or the legacy `organization/environment`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentId {
    /// Organization login.
    pub organization: String,
    /// Project, `default` for legacy identifiers.
    pub project: String,
    /// Environment name.
    pub environment: String,
}

impl EnvironmentId {
    /// Creates an environment identifier.
    #[must_use]
    pub fn new(
        organization: impl Into<String>,
        project: impl Into<String>,
        environment: impl Into<String>,
    ) -> Self {
        Self {
            organization: organization.into(),
            project: project.into(),
            environment: environment.into(),
        }
    }
}

impl fmt::Display for EnvironmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.organization, self.project, self.environment)
    }
}

impl CompositeId for EnvironmentId {
    fn encode(&self) -> String {
        self.to_string()
    }

    fn decode(id: &str) -> Result<Self, IdError> {
        let parts: Vec<&str> = id.split('/').collect();
        match parts.as_slice() {
            [organization, project, environment] => {
                Ok(Self::new(*organization, *project, *environment))
            }
            [organization, environment] => {
                Ok(Self::new(*organization, DEFAULT_PROJECT, *environment))
            }
            _ => Err(IdError::invalid(
                id,
                "organization/project/environment or organization/environment",
            )),
        }
    }
}

/// `organization/project/environment/tag`, or the legacy `organization/environment/tag`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentTagId {
    /// Tagged environment.
    pub environment: EnvironmentId,
    /// Tag name.
    pub tag: String,
}

impl CompositeId for EnvironmentTagId {
    fn encode(&self) -> String {
        format!("{}/{}", self.environment, self.tag)
    }

    fn decode(id: &str) -> Result<Self, IdError> {
        let parts: Vec<&str> = id.split('/').collect();
        let (environment, tag) = match parts.as_slice() {
            [organization, project, environment, tag] => {
                (EnvironmentId::new(*organization, *project, *environment), *tag)
            }
            [organization, environment, tag] => (
                EnvironmentId::new(*organization, DEFAULT_PROJECT, *environment),
                *tag,
            ),
            _ => {
                return Err(IdError::invalid(
                    id,
                    "organization/project/environment/tag or organization/environment/tag",
                ));
            }
        };
        Ok(Self {
            environment,
            tag: tag.to_string(),
        })
    }
}

/// `organization/teamName`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamId {
    /// Organization login.
    pub organization: String,
    /// Team name.
    pub team: String,
}

impl CompositeId for TeamId {
    fn encode(&self) -> String {
        format!("{}/{}", self.organization, self.team)
    }

    fn decode(id: &str) -> Result<Self, IdError> {
        let [organization, team] = split_exact(id, "organization/teamName")?;
        Ok(Self { organization, team })
    }
}

/// `organization/project/stack/team`
///
/// Permissions created by releases before v0.17.0 used an identifier that
/// cannot be mapped back to the team, so they are reported distinctly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamStackPermissionId {
    /// Stack the permission applies to.
    pub stack: StackName,
    /// Team holding the permission.
    pub team: String,
}

impl CompositeId for TeamStackPermissionId {
    fn encode(&self) -> String {
        format!("{}/{}", self.stack, self.team)
    }

    fn decode(id: &str) -> Result<Self, IdError> {
        let parts: Vec<&str> = id.split('/').collect();
        match parts.as_slice() {
            [organization, project, stack, team] => Ok(Self {
                stack: StackName::new(*organization, *project, *stack),
                team: (*team).to_string(),
            }),
            [_, _, _] => Err(IdError::LegacyTeamStackPermission),
            _ => Err(IdError::invalid(id, "organization/project/stack/team")),
        }
    }
}

/// `organization/team/project+environment`, or the legacy `organization/team/environment`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamEnvironmentPermissionId {
    /// Organization login.
    pub organization: String,
    /// Team holding the permission.
    pub team: String,
    /// Project, `default` for legacy identifiers.
    pub project: String,
    /// Environment name.
    pub environment: String,
}

impl CompositeId for TeamEnvironmentPermissionId {
    fn encode(&self) -> String {
        format!(
            "{}/{}/{}+{}",
            self.organization, self.team, self.project, self.environment
        )
    }

    fn decode(id: &str) -> Result<Self, IdError> {
        const EXPECTED: &str = "organization/team/project+environment";
        let [organization, team, scoped] = split_exact(id, EXPECTED)?;
        let scoped: Vec<&str> = scoped.split('+').collect();
        let (project, environment) = match scoped.as_slice() {
            [environment] => (DEFAULT_PROJECT, *environment),
            [project, environment] => (*project, *environment),
            _ => return Err(IdError::invalid(id, EXPECTED)),
        };
        Ok(Self {
            organization,
            team,
            project: project.to_string(),
            environment: environment.to_string(),
        })
    }
}

/// `organization/issuerId`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OidcIssuerId {
    /// Organization login.
    pub organization: String,
    /// Service-assigned issuer ID.
    pub issuer_id: String,
}

impl CompositeId for OidcIssuerId {
    fn encode(&self) -> String {
        format!("{}/{}", self.organization, self.issuer_id)
    }

    fn decode(id: &str) -> Result<Self, IdError> {
        let [organization, issuer_id] = split_exact(id, "organization/issuerId")?;
        Ok(Self {
            organization,
            issuer_id,
        })
    }
}

/// `organization/templateSourceId`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateSourceId {
    /// Organization login.
    pub organization: String,
    /// Service-assigned source ID.
    pub source_id: String,
}

impl CompositeId for TemplateSourceId {
    fn encode(&self) -> String {
        format!("{}/{}", self.organization, self.source_id)
    }

    fn decode(id: &str) -> Result<Self, IdError> {
        let [organization, source_id] = split_exact(id, "organization/templateSourceId")?;
        Ok(Self {
            organization,
            source_id,
        })
    }
}
