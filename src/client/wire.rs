//! JSON shapes of the SysML v2 REST API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    client::{Change, CommitRequest},
    domain::{CommitId, CommitInfo, Element, ElementId, ElementKind, Payload, ProjectId, ProjectInfo},
};

/// `{"@id": ...}`
#[derive(Debug, Serialize, Deserialize)]
pub struct IdRef<T> {
    #[serde(rename = "@id")]
    pub id: T,
}

#[derive(Debug, Deserialize)]
pub struct ProjectDto {
    #[serde(rename = "@id")]
    id: ProjectId,
    #[serde(default)]
    name: Option<String>,
}

impl From<ProjectDto> for ProjectInfo {
    fn from(dto: ProjectDto) -> Self {
        Self {
            id: dto.id,
            name: dto.name.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct NewProjectDto<'a> {
    #[serde(rename = "@type")]
    kind: &'static str,
    name: &'a str,
    description: &'a str,
}

impl<'a> NewProjectDto<'a> {
    pub const fn new(name: &'a str, description: &'a str) -> Self {
        Self {
            kind: "Project",
            name,
            description,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CommitDto {
    #[serde(rename = "@id")]
    id: CommitId,
    created: DateTime<Utc>,
}

impl From<CommitDto> for CommitInfo {
    fn from(dto: CommitDto) -> Self {
        Self {
            id: dto.id,
            created: dto.created,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ElementDto {
    #[serde(rename = "@id")]
    id: ElementId,
    #[serde(rename = "@type")]
    kind: String,
    #[serde(default)]
    name: Option<String>,
    /// The first entry is the owner.
    #[serde(default, rename = "ownedElement")]
    owned_element: Option<Vec<IdRef<ElementId>>>,
    #[serde(default)]
    text: Option<Vec<String>>,
}

impl From<ElementDto> for Element {
    fn from(dto: ElementDto) -> Self {
        Self {
            id: dto.id,
            name: dto.name.unwrap_or_default(),
            kind: ElementKind::from_type_tag(&dto.kind),
            owner: dto
                .owned_element
                .and_then(|owners| owners.into_iter().next())
                .map(|owner| owner.id),
            description: dto.text.and_then(|text| text.into_iter().next()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CommitBody<'a> {
    #[serde(rename = "@type")]
    kind: &'static str,
    change: Vec<DataVersion<'a>>,
    #[serde(rename = "previousCommit", skip_serializing_if = "Option::is_none")]
    previous_commit: Option<IdRef<&'a CommitId>>,
}

impl<'a> From<&'a CommitRequest> for CommitBody<'a> {
    fn from(request: &'a CommitRequest) -> Self {
        Self {
            kind: "Commit",
            change: request.changes.iter().map(DataVersion::from).collect(),
            previous_commit: request.previous.as_ref().map(|id| IdRef { id }),
        }
    }
}

#[derive(Debug, Serialize)]
struct DataVersion<'a> {
    #[serde(rename = "@type")]
    kind: &'static str,
    payload: Option<PayloadDto<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    identity: Option<IdRef<&'a ElementId>>,
}

impl<'a> From<&'a Change> for DataVersion<'a> {
    fn from(change: &'a Change) -> Self {
        Self {
            kind: "DataVersion",
            payload: change
                .payload
                .as_ref()
                .map(|payload| PayloadDto::new(payload, change.identity.as_ref())),
            identity: change.identity.as_ref().map(|id| IdRef { id }),
        }
    }
}

#[derive(Debug, Serialize)]
struct PayloadDto<'a> {
    #[serde(rename = "@type")]
    kind: &'a str,
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    identifier: Option<&'a ElementId>,
    #[serde(rename = "ownedElement", skip_serializing_if = "Vec::is_empty")]
    owned_element: Vec<IdRef<&'a ElementId>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<[&'a str; 1]>,
}

impl<'a> PayloadDto<'a> {
    fn new(payload: &'a Payload, identity: Option<&'a ElementId>) -> Self {
        Self {
            kind: payload.kind.type_tag(),
            name: &payload.name,
            identifier: identity,
            owned_element: payload.owner.iter().map(|id| IdRef { id }).collect(),
            text: payload.description.as_deref().map(|text| [text]),
        }
    }
}
