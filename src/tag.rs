use std::fmt;
use std::rc::{Rc, Weak};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::validation::ValidationError;

/// Validated label for a [`TypeTag`] (pattern: `[A-Za-z_][A-Za-z0-9_.-]{0,127}`).
///
/// The label is purely descriptive; tag equivalence is always decided by
/// identity, never by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagName(String);

impl TagName {
    /// Creates a name without validation; callers are responsible for conformity.
    pub fn new(value: String) -> Self {
        Self(value)
    }

    /// Parses a validated tag name from a string.
    pub fn parse(value: impl Into<String>) -> Result<Self, ValidationError> {
        let s = value.into();
        if !Regex::new(r"^[A-Za-z_][A-Za-z0-9_.-]{0,127}$")
            .expect("invalid regex")
            .is_match(&s)
        {
            return Err(ValidationError::PatternMismatch {
                field: "TagName",
                value: s,
            });
        }
        Ok(Self(s))
    }
}

impl From<String> for TagName {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl AsRef<str> for TagName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

pub(crate) struct TagInner {
    name: Option<TagName>,
}

/// Identity token distinguishing object types, standing in for the prototype
/// notion of the source data model.
///
/// Two tags denote the same type iff they share one allocation: `clone`
/// preserves identity, [`TypeTag::new`] and [`TypeTag::named`] mint fresh
/// ones. Objects carrying distinct tags are never merged during admission,
/// even when their entries are deeply equal.
#[derive(Clone)]
pub struct TypeTag(Rc<TagInner>);

impl TypeTag {
    /// Mints a fresh anonymous tag.
    pub fn new() -> Self {
        Self(Rc::new(TagInner { name: None }))
    }

    /// Mints a fresh tag carrying a descriptive label.
    pub fn named(name: TagName) -> Self {
        Self(Rc::new(TagInner { name: Some(name) }))
    }

    /// The tag's label, if it has one.
    pub fn name(&self) -> Option<&TagName> {
        self.0.name.as_ref()
    }

    /// Whether both handles denote the same tag identity.
    pub fn same(&self, other: &TypeTag) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn addr(&self) -> usize {
        Rc::as_ptr(&self.0) as usize
    }

    pub(crate) fn downgrade(&self) -> Weak<TagInner> {
        Rc::downgrade(&self.0)
    }
}

impl Default for TypeTag {
    /// Equivalent to [`TypeTag::new`]: every call mints a distinct identity.
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "TypeTag({})", name.as_ref()),
            None => write!(f, "TypeTag(@{:x})", self.addr()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_identity_and_fresh_tags_do_not() {
        let tag = TypeTag::new();
        assert!(tag.same(&tag.clone()));
        assert!(!tag.same(&TypeTag::new()));
    }

    #[test]
    fn tag_name_pattern_is_enforced() {
        assert!(TagName::parse("Point").is_ok());
        assert!(TagName::parse("geo.position-v2").is_ok());
        assert!(TagName::parse("9starts-with-digit").is_err());
        assert!(TagName::parse("").is_err());
        assert!(TagName::parse("has space").is_err());
    }

    #[test]
    fn named_tags_expose_their_label() {
        let name = TagName::parse("Point").unwrap();
        let tag = TypeTag::named(name.clone());
        assert_eq!(tag.name(), Some(&name));
        assert_eq!(TypeTag::new().name(), None);
    }
}
