//! Model elements as returned by the model API.

use std::{convert::Infallible, fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::attribute::{Attribute, AttributeError};

/// Opaque identifier of an element (`@id` on the wire).
///
/// Identifiers are stable across commits that do not replace the element.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(String);

impl ElementId {
    /// Wraps an identifier received from the API.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Mints a fresh random identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// The identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ElementId {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

/// The type tag of an element.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ElementKind {
    /// A structural part (`PartUsage`).
    Part,
    /// An attribute of a part (`AttributeUsage`).
    Attribute,
    /// A requirement (`RequirementUsage`).
    Requirement,
    /// An annotation. Comments never take part in the hierarchy.
    Comment,
    /// Any other element type reported by the API.
    Other(String),
}

impl ElementKind {
    /// The type tag used by the SysML v2 API.
    #[must_use]
    pub fn type_tag(&self) -> &str {
        match self {
            Self::Part => "PartUsage",
            Self::Attribute => "AttributeUsage",
            Self::Requirement => "RequirementUsage",
            Self::Comment => "Comment",
            Self::Other(tag) => tag,
        }
    }

    /// Maps an API type tag to a kind.
    #[must_use]
    pub fn from_type_tag(tag: &str) -> Self {
        match tag {
            "PartUsage" => Self::Part,
            "AttributeUsage" => Self::Attribute,
            "RequirementUsage" => Self::Requirement,
            "Comment" => Self::Comment,
            other => Self::Other(other.to_string()),
        }
    }

    /// Whether elements of this kind may own other elements.
    ///
    /// Attributes and requirements are leaves, comments are outside the
    /// hierarchy altogether.
    #[must_use]
    pub const fn can_own(&self) -> bool {
        matches!(self, Self::Part | Self::Other(_))
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Part => f.write_str("part"),
            Self::Attribute => f.write_str("attribute"),
            Self::Requirement => f.write_str("requirement"),
            Self::Comment => f.write_str("comment"),
            Self::Other(tag) => f.write_str(tag),
        }
    }
}

/// A node of the remote model graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Unique identifier.
    pub id: ElementId,
    /// Display name. Not guaranteed to be unique within a project.
    ///
    /// For attributes this is the encoded `"name: value"` text.
    pub name: String,
    /// Type tag.
    pub kind: ElementKind,
    /// The structural parent, if any.
    pub owner: Option<ElementId>,
    /// Free text of a requirement.
    pub description: Option<String>,
}

impl Element {
    /// Decodes the attribute carried by an attribute element.
    ///
    /// Returns `None` for elements of any other kind.
    ///
    /// # Errors
    ///
    /// Returns an error if the element's text is not a valid attribute
    /// encoding.
    pub fn attribute(&self) -> Option<Result<Attribute, AttributeError>> {
        (self.kind == ElementKind::Attribute).then(|| self.name.parse())
    }

    /// The element's content without its identity.
    #[must_use]
    pub fn payload(&self) -> Payload {
        Payload {
            kind: self.kind.clone(),
            name: self.name.clone(),
            owner: self.owner.clone(),
            description: self.description.clone(),
        }
    }
}

/// The content of an element, as submitted in a commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    /// Type tag.
    pub kind: ElementKind,
    /// Display name (encoded attribute text for attributes).
    pub name: String,
    /// The structural parent, if any.
    pub owner: Option<ElementId>,
    /// Free text of a requirement.
    pub description: Option<String>,
}

impl Payload {
    /// A part, optionally owned by another element.
    #[must_use]
    pub fn part(name: impl Into<String>, owner: Option<ElementId>) -> Self {
        Self {
            kind: ElementKind::Part,
            name: name.into(),
            owner,
            description: None,
        }
    }

    /// An attribute owned by `owner`.
    #[must_use]
    pub fn attribute(attribute: &Attribute, owner: ElementId) -> Self {
        Self {
            kind: ElementKind::Attribute,
            name: attribute.to_string(),
            owner: Some(owner),
            description: None,
        }
    }

    /// A requirement owned by `owner`.
    #[must_use]
    pub fn requirement(
        name: impl Into<String>,
        description: impl Into<String>,
        owner: ElementId,
    ) -> Self {
        Self {
            kind: ElementKind::Requirement,
            name: name.into(),
            owner: Some(owner),
            description: Some(description.into()),
        }
    }

    /// A free-standing comment.
    #[must_use]
    pub fn comment(text: impl Into<String>) -> Self {
        Self {
            kind: ElementKind::Comment,
            name: text.into(),
            owner: None,
            description: None,
        }
    }

    /// Attaches an identity, producing a full element.
    #[must_use]
    pub fn into_element(self, id: ElementId) -> Element {
        Element {
            id,
            name: self.name,
            kind: self.kind,
            owner: self.owner,
            description: self.description,
        }
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case("PartUsage", ElementKind::Part; "part")]
    #[test_case("AttributeUsage", ElementKind::Attribute; "attribute")]
    #[test_case("RequirementUsage", ElementKind::Requirement; "requirement")]
    #[test_case("Comment", ElementKind::Comment; "comment")]
    #[test_case("PortUsage", ElementKind::Other("PortUsage".to_string()); "other")]
    fn type_tags_map_both_ways(tag: &str, kind: ElementKind) {
        assert_eq!(ElementKind::from_type_tag(tag), kind);
        assert_eq!(kind.type_tag(), tag);
    }

    #[test]
    fn only_parts_and_unknown_kinds_can_own() {
        assert!(ElementKind::Part.can_own());
        assert!(ElementKind::Other("PortUsage".into()).can_own());
        assert!(!ElementKind::Attribute.can_own());
        assert!(!ElementKind::Requirement.can_own());
        assert!(!ElementKind::Comment.can_own());
    }

    #[test]
    fn attribute_is_decoded_only_for_attribute_elements() {
        let owner = ElementId::new("1");
        let attribute = Attribute::new("mass", "5").unwrap();
        let element = Payload::attribute(&attribute, owner.clone()).into_element(ElementId::new("2"));
        assert_eq!(element.name, "mass: 5");
        assert_eq!(element.attribute().unwrap().unwrap(), attribute);

        let part = Payload::part("Wheel", Some(owner)).into_element(ElementId::new("3"));
        assert!(part.attribute().is_none());
    }
}
