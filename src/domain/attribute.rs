//! Attribute name/value pairs.
//!
//! The model API stores an attribute as a single text field of the form
//! `"name: value"`. [`Attribute`] keeps the two halves apart and only packs
//! them at the wire boundary.

use std::{fmt, str::FromStr};

use thiserror::Error;

/// A named attribute value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Attribute {
    name: String,
    value: String,
}

/// Errors raised when constructing or decoding an [`Attribute`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AttributeError {
    /// The attribute name is empty.
    #[error("attribute name must not be empty")]
    EmptyName,
    /// The attribute name contains the `:` separator.
    #[error("attribute name '{0}' must not contain ':'")]
    ColonInName(String),
    /// The encoded text has no `:` separator.
    #[error("'{0}' is not of the form 'name: value'")]
    MissingSeparator(String),
}

impl Attribute {
    /// Creates an attribute.
    ///
    /// # Errors
    ///
    /// The name must be non-empty (after trimming) and must not contain `:`,
    /// since the first `:` separates name from value in the encoded form.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Result<Self, AttributeError> {
        let name = name.into().trim().to_string();
        if name.is_empty() {
            return Err(AttributeError::EmptyName);
        }
        if name.contains(':') {
            return Err(AttributeError::ColonInName(name));
        }
        Ok(Self {
            name,
            value: value.into().trim().to_string(),
        })
    }

    /// The attribute name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The attribute value.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Returns a copy of this attribute carrying a different value.
    #[must_use]
    pub fn with_value(&self, value: impl Into<String>) -> Self {
        Self {
            name: self.name.clone(),
            value: value.into().trim().to_string(),
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.value)
    }
}

impl FromStr for Attribute {
    type Err = AttributeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, value) = s
            .split_once(':')
            .ok_or_else(|| AttributeError::MissingSeparator(s.to_string()))?;
        Self::new(name, value)
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case("mass: 5", "mass", "5"; "canonical")]
    #[test_case("mass:5", "mass", "5"; "no space")]
    #[test_case("  mass  :  5 kg ", "mass", "5 kg"; "padded")]
    #[test_case("time: 12:30", "time", "12:30"; "colon in value")]
    #[test_case("note:", "note", ""; "empty value")]
    fn decodes(text: &str, name: &str, value: &str) {
        let attribute: Attribute = text.parse().unwrap();
        assert_eq!(attribute.name(), name);
        assert_eq!(attribute.value(), value);
    }

    #[test]
    fn text_without_separator_is_rejected() {
        assert_eq!(
            "mass".parse::<Attribute>(),
            Err(AttributeError::MissingSeparator("mass".to_string()))
        );
    }

    #[test]
    fn names_with_separator_are_rejected() {
        assert_eq!(
            Attribute::new("a:b", "1"),
            Err(AttributeError::ColonInName("a:b".to_string()))
        );
        assert_eq!(Attribute::new("  ", "1"), Err(AttributeError::EmptyName));
    }

    #[test]
    fn encoding_decodes_back_to_the_same_pair() {
        let attribute = Attribute::new("time", "12:30").unwrap();
        assert_eq!(attribute.to_string(), "time: 12:30");
        assert_eq!(attribute.to_string().parse::<Attribute>().unwrap(), attribute);
    }

    #[test]
    fn with_value_keeps_the_name() {
        let attribute = Attribute::new("mass", "5").unwrap().with_value("7");
        assert_eq!(attribute.to_string(), "mass: 7");
    }
}
