//! Browser Facade
//!
//! Window-level helpers layered on a [`Session`]: navigation, text search,
//! alert dialogs and screenshots.

use crate::backend::BackendError;
use crate::locator::Locator;
use crate::result::{AnchorageError, AnchorageResult};
use crate::session::Session;
use crate::wait::poll_until;
use base64::Engine;
use std::path::Path;
use std::time::SystemTime;
use tracing::{debug, info};

/// Window-level operations of one session
#[derive(Debug, Clone)]
pub struct Browser {
    session: Session,
}

impl Browser {
    /// Facade over `session`
    #[must_use]
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    /// Session behind the facade
    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Load `url` in the current window
    pub fn open(&self, url: &str) -> AnchorageResult<()> {
        self.session.navigate(url)
    }

    /// URL of the current window
    pub fn current_url(&self) -> AnchorageResult<String> {
        self.session.current_url()
    }

    /// Whether the `body` text contains `text`, ignoring case
    ///
    /// Polls until the text shows up; `false` once the timeout elapses.
    pub fn is_text_present(&self, text: &str) -> AnchorageResult<bool> {
        let wanted = text.to_lowercase();
        let body = Locator::tag("body")?;
        let found = poll_until(self.session.wait_options(), text, || {
            match self.session.find_one(&body).and_then(|body| body.text()) {
                Ok(content) => Ok(content.to_lowercase().contains(&wanted).then_some(())),
                Err(err) if err.is_not_found() || err.is_transient() => Ok(None),
                Err(AnchorageError::ElementUnresolvable { .. }) => Ok(None),
                Err(err) => Err(err),
            }
        })?;
        debug!(text, present = found.is_some(), "text search finished");
        Ok(found.is_some())
    }

    /// Alert currently open, waiting for one to appear
    pub fn alert(&self) -> AnchorageResult<Alert<'_>> {
        let backend = self.session.backend();
        let text = poll_until(self.session.wait_options(), "alert", || {
            match backend.alert_text() {
                Ok(text) => Ok(Some(text)),
                Err(BackendError::NoSuchAlert) => Ok(None),
                Err(err) => Err(err.into()),
            }
        })?;
        let text = text.ok_or(AnchorageError::Backend(BackendError::NoSuchAlert))?;
        Ok(Alert {
            session: &self.session,
            text,
        })
    }

    /// Capture the current window
    pub fn screenshot(&self) -> AnchorageResult<Screenshot> {
        let data = self.session.backend().screenshot()?;
        debug!(bytes = data.len(), "screenshot captured");
        Ok(Screenshot::new(data))
    }
}

// =============================================================================
// ALERTS
// =============================================================================

/// Open alert dialog
#[derive(Debug)]
pub struct Alert<'a> {
    session: &'a Session,
    text: String,
}

impl Alert<'_> {
    /// Message shown by the dialog
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Accept the dialog
    pub fn confirm(self) -> AnchorageResult<()> {
        self.session.backend().accept_alert()?;
        info!(text = %self.text, "alert confirmed");
        Ok(())
    }

    /// Dismiss the dialog
    pub fn cancel(self) -> AnchorageResult<()> {
        self.session.backend().dismiss_alert()?;
        info!(text = %self.text, "alert cancelled");
        Ok(())
    }
}

// =============================================================================
// SCREENSHOTS
// =============================================================================

/// Captured window image
#[derive(Debug, Clone)]
pub struct Screenshot {
    /// Raw image data
    pub data: Vec<u8>,
    /// When the capture was taken
    pub timestamp: SystemTime,
}

impl Screenshot {
    const PNG_SIGNATURE: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];

    /// Screenshot of `data`, stamped now
    #[must_use]
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data,
            timestamp: SystemTime::now(),
        }
    }

    /// Size in bytes
    #[must_use]
    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }

    /// Whether any data was captured
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.data.is_empty()
    }

    /// Whether the data starts with the PNG signature
    #[must_use]
    pub fn is_png(&self) -> bool {
        self.data.starts_with(&Self::PNG_SIGNATURE)
    }

    /// Standard base64 encoding of the data
    #[must_use]
    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.data)
    }

    /// Write the data to `path`
    pub fn save(&self, path: impl AsRef<Path>) -> AnchorageResult<()> {
        std::fs::write(path.as_ref(), &self.data)?;
        debug!(path = %path.as_ref().display(), "screenshot saved");
        Ok(())
    }
}
