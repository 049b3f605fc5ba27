//! Anchorage: Durable Element References for UI Test Automation
//!
//! Anchorage sits between a test and a remote browsing backend. Tests
//! describe page elements once, by id, name, attribute or XPath, and talk to
//! them through typed components. The library absorbs the instability of a
//! live document: nodes replaced by asynchronous updates, nodes that appear
//! late, and nodes hidden inside nested frames.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                    ANCHORAGE Architecture                        │
//! ├──────────────────────────────────────────────────────────────────┤
//! │  ┌────────────┐   ┌──────────────┐   ┌──────────────┐            │
//! │  │ Components │   │ ElementProxy │   │   Session    │            │
//! │  │ Frames     │──►│ (stale-aware │──►│ (virtual root│──► Backend │
//! │  │ Builder    │   │  recovery)   │   │  + contexts) │            │
//! │  └────────────┘   └──────────────┘   └──────────────┘            │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust
//! use anchorage::mock::{fixtures, MockBackend};
//! use anchorage::prelude::*;
//! use std::sync::Arc;
//!
//! # fn main() -> AnchorageResult<()> {
//! let backend = Arc::new(MockBackend::new(fixtures::iframe_page()));
//! let session = Session::new(backend.clone());
//!
//! let mut button = Button::new(session.clone());
//! button.load_by_id("buttonId")?;
//! button.click()?;
//!
//! backend.reload_page();
//! button.click()?; // the stale node is found again
//!
//! let mut frame = FrameContext::new(session.clone());
//! frame.load_by_id("iframeId")?;
//! frame.add_component("field", TextField::new(session.clone()));
//! frame.show()?;
//! let field = frame.get::<TextField>("field")?;
//! field.load_by_id("textFieldChild")?;
//! field.fill("hello")?;
//! frame.hide()?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
// Lints are configured in workspace Cargo.toml [workspace.lints.clippy]

/// Backend capability contract
///
/// The remote browsing session every call is routed to.
#[allow(clippy::missing_errors_doc)]
pub mod backend;

/// Window-level helpers: navigation, alerts, screenshots
#[allow(
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::missing_const_for_fn
)]
pub mod browser;

/// Typed page components and their shared lifecycle
#[allow(
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::missing_const_for_fn,
    clippy::doc_markdown
)]
pub mod component;

#[allow(clippy::missing_errors_doc, clippy::must_use_candidate)]
mod element;

/// Frame contexts and their component registries
#[allow(
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::missing_const_for_fn
)]
pub mod frame;

#[allow(clippy::missing_errors_doc)]
mod locator;

/// Tracing subscriber setup for test binaries
pub mod logging;

/// In-memory backend for tests
///
/// A document tree with frames, alerts and handle regeneration.
#[allow(
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::missing_panics_doc
)]
pub mod mock;

mod result;

#[allow(clippy::missing_errors_doc, clippy::must_use_candidate)]
mod session;

/// Assertion helpers over live component state
#[allow(clippy::missing_errors_doc)]
pub mod validators;

/// Bounded polling and wait configuration
#[allow(clippy::missing_errors_doc, clippy::must_use_candidate)]
pub mod wait;

pub use backend::{Backend, BackendError, BackendResult, By, NodeOp, NodeRef};
pub use browser::{Alert, Browser, Screenshot};
pub use component::{
    Button, ButtonType, Cell, Checkbox, Clickable, Component, ComponentBuilder, ComponentCore,
    Coordinate, Div, Fillable, GenericComponent, Link, Locatable, RadioButton, Select,
    SelectOption, Table, TableSection, TextArea, TextField, TextReadable, Widget, WidgetKind,
};
pub use element::ElementProxy;
pub use frame::FrameContext;
pub use locator::{Locator, LocatorKind};
pub use result::{AnchorageError, AnchorageResult};
pub use session::{Session, SessionConfig, DEFAULT_ROOT_TAG};
pub use wait::{poll_until, WaitOptions};

/// Everything a test usually needs
pub mod prelude {
    pub use super::browser::{Alert, Browser, Screenshot};
    pub use super::component::{
        Button, ButtonType, Cell, Checkbox, Clickable, Component, ComponentBuilder, Coordinate,
        Div, Fillable, GenericComponent, Link, Locatable, RadioButton, Select, SelectOption,
        Table, TableSection, TextArea, TextField, TextReadable, Widget, WidgetKind,
    };
    pub use super::frame::FrameContext;
    pub use super::locator::Locator;
    pub use super::result::{AnchorageError, AnchorageResult};
    pub use super::session::{Session, SessionConfig};
    pub use super::wait::WaitOptions;
}
