//! Backend - Abstract Browser Capability Trait
//!
//! Every browser interaction funnels through the [`Backend`] trait. Element
//! proxies, sessions and components never talk to a concrete driver; they
//! speak in opaque [`NodeRef`] handles and [`NodeOp`] operations.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │  Components ──► ElementProxy ──► Session ──► dyn Backend          │
//! │                    (staleness recovery)       ├─ MockBackend      │
//! │                                               └─ (real drivers)   │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Staleness is reported as [`BackendError::Stale`] and is the only error the
//! proxy layer recovers from. Everything else propagates unchanged.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type for backend calls
pub type BackendResult<T> = Result<T, BackendError>;

/// Opaque handle to a live node owned by the backend
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeRef {
    id: String,
}

impl NodeRef {
    /// Wrap a backend-specific identifier
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    /// Backend-specific identifier
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node:{}", self.id)
    }
}

/// Query understood by every backend
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum By {
    /// Match the `id` attribute
    Id(String),
    /// Match the `name` attribute
    Name(String),
    /// XPath expression
    XPath(String),
    /// Match the tag name (case-insensitive)
    TagName(String),
}

impl fmt::Display for By {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(v) => write!(f, "id={v}"),
            Self::Name(v) => write!(f, "name={v}"),
            Self::XPath(v) => write!(f, "xpath={v}"),
            Self::TagName(v) => write!(f, "tag={v}"),
        }
    }
}

/// Operation performed against a single node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeOp {
    /// Click the node
    Click,
    /// Submit the enclosing form
    Submit,
    /// Clear an editable node
    Clear,
    /// Type text into the node
    SendKeys(String),
    /// Lower-case tag name, returned as a JSON string
    TagName,
    /// Attribute value, returned as a JSON string or null
    Attribute(String),
    /// Rendered text, returned as a JSON string
    Text,
    /// Selection state, returned as a JSON bool
    IsSelected,
    /// Enabled state, returned as a JSON bool
    IsEnabled,
    /// Display state, returned as a JSON bool
    IsDisplayed,
    /// Computed style property, returned as a JSON string
    CssValue(String),
}

impl NodeOp {
    /// Short name used in logs and call histories
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Click => "click",
            Self::Submit => "submit",
            Self::Clear => "clear",
            Self::SendKeys(_) => "send_keys",
            Self::TagName => "tag_name",
            Self::Attribute(_) => "attribute",
            Self::Text => "text",
            Self::IsSelected => "is_selected",
            Self::IsEnabled => "is_enabled",
            Self::IsDisplayed => "is_displayed",
            Self::CssValue(_) => "css_value",
        }
    }
}

/// Errors reported by a backend
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// The node handle no longer refers to a live node
    #[error("stale element reference")]
    Stale,

    /// No node matched the query
    #[error("no element matches {query}")]
    NotFound {
        /// Query that failed
        query: String,
    },

    /// No alert dialog is open
    #[error("no alert is open")]
    NoSuchAlert,

    /// Backend cannot serve requests
    #[error("backend unavailable: {message}")]
    Unavailable {
        /// Error message
        message: String,
    },

    /// Any other failure
    #[error("{operation} failed: {message}")]
    Failed {
        /// Operation name
        operation: String,
        /// Error message
        message: String,
    },
}

/// Browser capabilities consumed by the proxy and component layers
///
/// Implementations are shared across threads behind an `Arc`, so every method
/// takes `&self` and interior state is guarded by the implementation.
pub trait Backend: Send + Sync {
    /// First node matching `by`, searched under `root` or the active document
    fn find_one(&self, by: &By, root: Option<&NodeRef>) -> BackendResult<NodeRef>;

    /// All nodes matching `by`, in document order
    fn find_many(&self, by: &By, root: Option<&NodeRef>) -> BackendResult<Vec<NodeRef>>;

    /// Perform `op` on `node`
    fn invoke(&self, node: &NodeRef, op: &NodeOp) -> BackendResult<serde_json::Value>;

    /// Make the frame document behind `frame` the active context
    fn enter_context(&self, frame: &NodeRef) -> BackendResult<()>;

    /// Make the top-level document the active context
    fn enter_default_context(&self) -> BackendResult<()>;

    /// Identifier of the current window
    fn current_window(&self) -> BackendResult<String>;

    /// PNG bytes of the viewport
    fn screenshot(&self) -> BackendResult<Vec<u8>>;

    /// Load `url` in the current window
    fn navigate(&self, url: &str) -> BackendResult<()>;

    /// URL of the current window
    fn current_url(&self) -> BackendResult<String>;

    /// Text of the open alert
    fn alert_text(&self) -> BackendResult<String>;

    /// Accept the open alert
    fn accept_alert(&self) -> BackendResult<()>;

    /// Dismiss the open alert
    fn dismiss_alert(&self) -> BackendResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_ref_display() {
        let node = NodeRef::new("abc");
        assert_eq!(node.id(), "abc");
        assert_eq!(node.to_string(), "node:abc");
    }

    #[test]
    fn test_by_display() {
        assert_eq!(By::Id("a".into()).to_string(), "id=a");
        assert_eq!(By::TagName("div".into()).to_string(), "tag=div");
        assert_eq!(By::XPath("//a".into()).to_string(), "xpath=//a");
    }

    #[test]
    fn test_op_names() {
        assert_eq!(NodeOp::SendKeys("x".into()).name(), "send_keys");
        assert_eq!(NodeOp::Attribute("id".into()).name(), "attribute");
        assert_eq!(NodeOp::Click.name(), "click");
    }

    #[test]
    fn test_op_serialization() {
        let json = serde_json::to_string(&NodeOp::SendKeys("hello".into())).unwrap();
        let back: NodeOp = serde_json::from_str(&json).unwrap();
        assert_eq!(back, NodeOp::SendKeys("hello".into()));
    }
}
