//! Locator abstraction for element selection.
//!
//! A [`Locator`] is an immutable description of how to find an element. It is
//! replayed verbatim whenever a unique element goes stale, so it must carry
//! everything needed to find the same element again.
//!
//! # Design Philosophy
//!
//! - **Validated at construction**: empty values never reach the backend
//! - **Replayable**: the same locator drives initial lookup and recovery
//! - **Expectation-bearing**: id, name and attribute locators also describe
//!   what the resolved element must look like

use crate::backend::By;
use crate::result::{AnchorageError, AnchorageResult};
use serde::Serialize;
use std::fmt;

/// Kind of locator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum LocatorKind {
    /// Match the `id` attribute
    Id,
    /// Match the `name` attribute
    Name,
    /// XPath expression
    XPath,
    /// Tag name plus a case-insensitive attribute match
    Attribute,
    /// Tag name only
    TagName,
}

/// Immutable element selection strategy
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Locator {
    kind: LocatorKind,
    value: String,
    tag_name: Option<String>,
    attribute_name: Option<String>,
}

impl Locator {
    /// Locate by `id` attribute
    pub fn id(value: impl Into<String>) -> AnchorageResult<Self> {
        Self::simple(LocatorKind::Id, value.into())
    }

    /// Locate by `name` attribute
    pub fn name(value: impl Into<String>) -> AnchorageResult<Self> {
        Self::simple(LocatorKind::Name, value.into())
    }

    /// Locate by XPath expression
    pub fn xpath(value: impl Into<String>) -> AnchorageResult<Self> {
        Self::simple(LocatorKind::XPath, value.into())
    }

    /// Locate by tag name
    pub fn tag(value: impl Into<String>) -> AnchorageResult<Self> {
        Self::simple(LocatorKind::TagName, value.into())
    }

    /// Locate `tag` elements whose `attribute` equals `value`, ignoring case
    pub fn attribute(
        tag: impl Into<String>,
        attribute: impl Into<String>,
        value: impl Into<String>,
    ) -> AnchorageResult<Self> {
        let tag = require("tag name", tag.into())?;
        let attribute = require("attribute name", attribute.into())?;
        let value = require("attribute value", value.into())?;
        Ok(Self {
            kind: LocatorKind::Attribute,
            value,
            tag_name: Some(tag),
            attribute_name: Some(attribute),
        })
    }

    fn simple(kind: LocatorKind, value: String) -> AnchorageResult<Self> {
        let value = require("locator value", value)?;
        Ok(Self {
            kind,
            value,
            tag_name: None,
            attribute_name: None,
        })
    }

    /// Locator kind
    #[must_use]
    pub const fn kind(&self) -> LocatorKind {
        self.kind
    }

    /// Primary value (id, name, expression, tag or attribute value)
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Tag name of an attribute locator
    #[must_use]
    pub fn tag_name(&self) -> Option<&str> {
        self.tag_name.as_deref()
    }

    /// Attribute name of an attribute locator
    #[must_use]
    pub fn attribute_name(&self) -> Option<&str> {
        self.attribute_name.as_deref()
    }

    /// Backend query that yields the candidate set
    #[must_use]
    pub fn by(&self) -> By {
        match self.kind {
            LocatorKind::Id => By::Id(self.value.clone()),
            LocatorKind::Name => By::Name(self.value.clone()),
            LocatorKind::XPath => By::XPath(self.value.clone()),
            LocatorKind::TagName => By::TagName(self.value.clone()),
            LocatorKind::Attribute => {
                By::TagName(self.tag_name.clone().unwrap_or_default())
            }
        }
    }

    /// Attribute filter applied to the candidate set, if any
    pub(crate) fn attribute_filter(&self) -> Option<(&str, &str)> {
        match self.kind {
            LocatorKind::Attribute => self
                .attribute_name
                .as_deref()
                .map(|attribute| (attribute, self.value.as_str())),
            _ => None,
        }
    }

    /// Attribute the resolved element must carry, if the locator implies one
    pub(crate) fn expectation(&self) -> Option<(&str, &str)> {
        match self.kind {
            LocatorKind::Id => Some(("id", self.value.as_str())),
            LocatorKind::Name => Some(("name", self.value.as_str())),
            LocatorKind::Attribute => self.attribute_filter(),
            LocatorKind::XPath | LocatorKind::TagName => None,
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            LocatorKind::Id => write!(f, "id={}", self.value),
            LocatorKind::Name => write!(f, "name={}", self.value),
            LocatorKind::XPath => write!(f, "xpath={}", self.value),
            LocatorKind::TagName => write!(f, "tag={}", self.value),
            LocatorKind::Attribute => write!(
                f,
                "{}[@{}='{}']",
                self.tag_name.as_deref().unwrap_or("*"),
                self.attribute_name.as_deref().unwrap_or(""),
                self.value
            ),
        }
    }
}

fn require(what: &str, value: String) -> AnchorageResult<String> {
    if value.is_empty() {
        return Err(AnchorageError::InvalidLocator {
            message: format!("{what} must not be empty"),
        });
    }
    Ok(value)
}

/// Case-insensitive comparison used for attribute expectations
pub(crate) fn eq_ignore_case(left: &str, right: &str) -> bool {
    left.eq_ignore_ascii_case(right) || left.to_lowercase() == right.to_lowercase()
}
