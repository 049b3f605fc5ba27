//! Session - Shared Backend Handle and Context Stack
//!
//! A [`Session`] is the single entry point every component talks through. It
//! owns the backend, the wait configuration and the stack of frame depths
//! describing which browsing context is active.
//!
//! ## Toyota Way Application
//!
//! - **Genchi Genbutsu**: Document-level lookups go through a virtual root
//!   proxy, so staleness at the top of a context heals like any other element
//! - **Jidoka**: A document that never settles surfaces as
//!   [`AnchorageError::BackendUnavailable`] instead of a hang

use crate::backend::{Backend, BackendError};
use crate::element::ElementProxy;
use crate::locator::Locator;
use crate::result::{AnchorageError, AnchorageResult};
use crate::wait::{poll_until, WaitOptions};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

/// Tag of the element standing in for a context's document
pub const DEFAULT_ROOT_TAG: &str = "html";

// =============================================================================
// CONFIGURATION
// =============================================================================

/// Session configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Wait options shared by resolution, recovery and polling helpers
    pub wait: WaitOptions,
    /// Tag name of the virtual root element
    pub root_tag: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            wait: WaitOptions::default(),
            root_tag: DEFAULT_ROOT_TAG.to_string(),
        }
    }
}

impl SessionConfig {
    /// Defaults with wait options read from the environment
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            wait: WaitOptions::from_env(),
            ..Self::default()
        }
    }

    /// Set wait options
    #[must_use]
    pub fn with_wait(mut self, wait: WaitOptions) -> Self {
        self.wait = wait;
        self
    }

    /// Set the virtual root tag
    #[must_use]
    pub fn with_root_tag(mut self, tag: impl Into<String>) -> Self {
        self.root_tag = tag.into();
        self
    }
}

// =============================================================================
// SESSION
// =============================================================================

/// Cheap, cloneable handle to a backend session
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    backend: Arc<dyn Backend>,
    config: SessionConfig,
    contexts: Mutex<Vec<u32>>,
}

impl Session {
    /// Session with configuration read from the environment
    pub fn new<B: Backend + 'static>(backend: Arc<B>) -> Self {
        Self::with_config(backend, SessionConfig::from_env())
    }

    /// Session with explicit configuration
    pub fn with_config<B: Backend + 'static>(backend: Arc<B>, config: SessionConfig) -> Self {
        debug!(timeout_ms = config.wait.timeout_ms, poll_ms = config.wait.poll_interval_ms, "session created");
        Self {
            inner: Arc::new(SessionInner {
                backend,
                config,
                contexts: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Backend every call is routed to
    #[must_use]
    pub fn backend(&self) -> &dyn Backend {
        self.inner.backend.as_ref()
    }

    /// Session configuration
    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    /// Default wait options
    #[must_use]
    pub fn wait_options(&self) -> &WaitOptions {
        &self.inner.config.wait
    }

    // =========================================================================
    // LOOKUP
    // =========================================================================

    /// Virtual root of the active context, polled until the document settles
    pub fn document_root(&self) -> AnchorageResult<ElementProxy> {
        let locator = Locator::tag(self.inner.config.root_tag.as_str())?;
        let by = locator.by();
        let node = poll_until(self.wait_options(), "document root", || {
            match self.backend().find_one(&by, None) {
                Ok(node) => Ok(Some(node)),
                Err(BackendError::Stale | BackendError::NotFound { .. }) => Ok(None),
                Err(err) => Err(err.into()),
            }
        })?;

        match node {
            Some(node) => Ok(ElementProxy::virtual_root(self.clone(), node, locator)),
            None => {
                warn!(timeout_ms = self.wait_options().timeout_ms, "document root never settled");
                Err(self.unsettled())
            }
        }
    }

    /// Single attempt at the first element matching `locator`
    pub fn find_one(&self, locator: &Locator) -> AnchorageResult<ElementProxy> {
        self.document_root()?
            .find_element(locator)
            .map_err(|err| self.root_failure(err))
    }

    /// Single attempt at every element matching `locator`
    pub fn find_many(&self, locator: &Locator) -> AnchorageResult<Vec<ElementProxy>> {
        self.document_root()?
            .find_elements(locator)
            .map_err(|err| self.root_failure(err))
    }

    /// Poll [`Session::find_one`] until it matches or `options` times out
    pub fn locate(&self, locator: &Locator, options: &WaitOptions) -> AnchorageResult<ElementProxy> {
        let found = poll_until(options, &locator.to_string(), || match self.find_one(locator) {
            Ok(element) => Ok(Some(element)),
            Err(err) if err.is_not_found() || err.is_transient() => Ok(None),
            Err(err) => Err(err),
        })?;

        found.ok_or_else(|| AnchorageError::ElementNotFound {
            locator: locator.to_string(),
            timeout_ms: options.timeout_ms,
        })
    }

    /// Poll [`Session::find_many`] until at least one element matches
    pub fn locate_all(
        &self,
        locator: &Locator,
        options: &WaitOptions,
    ) -> AnchorageResult<Vec<ElementProxy>> {
        let found = poll_until(options, &locator.to_string(), || match self.find_many(locator) {
            Ok(elements) if !elements.is_empty() => Ok(Some(elements)),
            Ok(_) => Ok(None),
            Err(err) if err.is_transient() => Ok(None),
            Err(err) => Err(err),
        })?;

        found.ok_or_else(|| AnchorageError::ElementNotFound {
            locator: locator.to_string(),
            timeout_ms: options.timeout_ms,
        })
    }

    fn root_failure(&self, err: AnchorageError) -> AnchorageError {
        match err {
            AnchorageError::ElementUnresolvable { .. } => self.unsettled(),
            other => other,
        }
    }

    fn unsettled(&self) -> AnchorageError {
        AnchorageError::BackendUnavailable {
            message: format!(
                "document root <{}> did not settle within {}ms",
                self.inner.config.root_tag,
                self.wait_options().timeout_ms
            ),
        }
    }

    // =========================================================================
    // CONTEXTS
    // =========================================================================

    /// Enter the frame document behind `frame` and push `depth`
    pub fn enter_context(&self, frame: &ElementProxy, depth: u32) -> AnchorageResult<()> {
        frame.enter_as_context()?;
        self.contexts().push(depth);
        info!(depth, frame = %frame.locator(), "entered frame context");
        Ok(())
    }

    /// Return to the top-level document and clear the stack
    pub fn enter_default_context(&self) -> AnchorageResult<()> {
        self.backend().enter_default_context()?;
        self.clear_contexts();
        debug!("entered default context");
        Ok(())
    }

    /// Depths of the entered frames, outermost first
    #[must_use]
    pub fn context_stack(&self) -> Vec<u32> {
        self.contexts().clone()
    }

    /// Depth of the active context, zero at the top level
    #[must_use]
    pub fn context_depth(&self) -> usize {
        self.contexts().len()
    }

    fn clear_contexts(&self) {
        self.contexts().clear();
    }

    fn contexts(&self) -> MutexGuard<'_, Vec<u32>> {
        self.inner
            .contexts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    // =========================================================================
    // WINDOW
    // =========================================================================

    /// Load `url`; the top-level document becomes the active context
    pub fn navigate(&self, url: &str) -> AnchorageResult<()> {
        self.backend().navigate(url)?;
        self.clear_contexts();
        info!(url, "navigated");
        Ok(())
    }

    /// URL of the current window
    pub fn current_url(&self) -> AnchorageResult<String> {
        Ok(self.backend().current_url()?)
    }

    /// Identifier of the current window
    pub fn current_window(&self) -> AnchorageResult<String> {
        Ok(self.backend().current_window()?)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.inner.config)
            .field("contexts", &self.context_stack())
            .finish()
    }
}
