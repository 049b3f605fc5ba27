//! Result and error types for Anchorage.

use crate::backend::BackendError;
use thiserror::Error;

/// Result type for Anchorage operations
pub type AnchorageResult<T> = Result<T, AnchorageError>;

/// Errors that can occur in Anchorage
#[derive(Debug, Error)]
pub enum AnchorageError {
    /// Initial resolution never matched within the timeout
    #[error("No element matched {locator} within {timeout_ms}ms")]
    ElementNotFound {
        /// Locator that was searched
        locator: String,
        /// Timeout in milliseconds
        timeout_ms: u64,
    },

    /// A unique element went stale and replay never matched again
    #[error("Element {locator} went stale and could not be found again within {timeout_ms}ms")]
    ElementUnresolvable {
        /// Locator that was replayed
        locator: String,
        /// Timeout in milliseconds
        timeout_ms: u64,
    },

    /// A multi-result element went stale; the caller must enumerate again
    #[error("Element {locator} went stale; it was one of several matches and must be enumerated again")]
    StaleMultiResult {
        /// Locator of the enumeration the element came from
        locator: String,
    },

    /// Component used before any locator was set
    #[error("Component was not loaded; call one of the load_by_* methods first")]
    ComponentNotLoaded,

    /// Component used while hidden
    #[error("Component is hidden; call show() before accessing it")]
    ComponentNotVisible,

    /// Resolved element tag is not acceptable for the widget
    #[error("Element <{tag}> is not valid for a {widget} (expected {expected})")]
    InvalidElementTag {
        /// Tag of the resolved element
        tag: String,
        /// Widget kind that rejected it
        widget: &'static str,
        /// Human readable description of the accepted tags
        expected: String,
    },

    /// Resolved element does not carry an expected attribute value
    #[error("Attribute {attribute} expected {expected:?} but element has {actual:?}")]
    AttributeMismatch {
        /// Attribute name
        attribute: String,
        /// Expected value (compared case-insensitively)
        expected: String,
        /// Live value, if the attribute exists
        actual: Option<String>,
    },

    /// Backend cannot serve requests or the document never settled
    #[error("Backend unavailable: {message}")]
    BackendUnavailable {
        /// Error message
        message: String,
    },

    /// Locator construction rejected its input
    #[error("Invalid locator: {message}")]
    InvalidLocator {
        /// Error message
        message: String,
    },

    /// Argument rejected before reaching the backend
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Error message
        message: String,
    },

    /// No child registered under the given name
    #[error("No component registered under {name:?}")]
    UnknownComponent {
        /// Requested name
        name: String,
    },

    /// Child exists but is a different widget kind
    #[error("Component {name:?} is a {actual}, not a {expected}")]
    WrongComponentKind {
        /// Requested name
        name: String,
        /// Requested widget kind
        expected: &'static str,
        /// Registered widget kind
        actual: &'static str,
    },

    /// Table coordinate outside the 1-based grid
    #[error("Invalid table coordinate: {message}")]
    InvalidCoordinate {
        /// Error message
        message: String,
    },

    /// Select option never appeared
    #[error("No option matching {option} within {timeout_ms}ms")]
    OptionNotFound {
        /// Option query
        option: String,
        /// Timeout in milliseconds
        timeout_ms: u64,
    },

    /// Backend reported an error that is not staleness
    #[error("Backend error: {0}")]
    Backend(#[source] BackendError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AnchorageError {
    /// Whether a polling loop should treat this error as "not yet"
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Backend(BackendError::Stale | BackendError::NotFound { .. })
        )
    }

    /// Whether this error means no element matched
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::ElementNotFound { .. } | Self::Backend(BackendError::NotFound { .. })
        )
    }
}

impl From<BackendError> for AnchorageError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Unavailable { message } => Self::BackendUnavailable { message },
            other => Self::Backend(other),
        }
    }
}
