//! Frame Contexts
//!
//! A [`FrameContext`] is a component bound to an `iframe` or `frame` element
//! that also owns a registry of named child components. Showing a frame
//! enters its browsing context; hiding it returns to the enclosing one.
//!
//! ## Toyota Way Application:
//! - **Poka-Yoke**: Depths are assigned by the registry, never by hand
//! - **Jidoka**: A frame that cannot be resolved stays hidden and is never
//!   pushed onto the context stack
//!
//! # Lineage
//!
//! Each frame shares an [`Arc`] link with its children. A child reaches its
//! parent through that link, and re-entering a parent always starts from the
//! top-level document:
//!
//! ```text
//! default ──enter(outer, 1)──► outer ──enter(child, 2)──► child
//!    ▲                           ▲                          │
//!    └────── outer.hide() ───────┴─────── child.hide() ─────┘
//! ```

use crate::component::{Component, ComponentCore, Locatable, Widget, WidgetKind};
use crate::locator::Locator;
use crate::result::{AnchorageError, AnchorageResult};
use crate::session::Session;
use crate::wait::WaitOptions;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info};

// =============================================================================
// LINEAGE
// =============================================================================

/// Shared view of a frame's position in the frame tree
#[derive(Debug)]
pub(crate) struct FrameLink {
    state: Mutex<LinkState>,
}

#[derive(Debug, Clone)]
struct LinkState {
    locator: Option<Locator>,
    depth: u32,
    parent: Option<Arc<FrameLink>>,
}

impl FrameLink {
    fn root() -> Self {
        Self {
            state: Mutex::new(LinkState {
                locator: None,
                depth: 1,
                parent: None,
            }),
        }
    }

    fn snapshot(&self) -> LinkState {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn update(&self, apply: impl FnOnce(&mut LinkState)) {
        apply(&mut self.state.lock().unwrap_or_else(PoisonError::into_inner));
    }

    /// Enter this frame's context starting from the top-level document
    fn reenter(&self, session: &Session, wait: &WaitOptions) -> AnchorageResult<()> {
        let state = self.snapshot();
        match &state.parent {
            Some(parent) => parent.reenter(session, wait)?,
            None => session.enter_default_context()?,
        }

        let locator = state.locator.ok_or(AnchorageError::ComponentNotLoaded)?;
        let element = session
            .locate(&locator, wait)
            .map_err(|err| unresolvable(err, &locator, wait))?;
        WidgetKind::Frame.validate(&element)?;
        session.enter_context(&element, state.depth)
    }
}

fn unresolvable(err: AnchorageError, locator: &Locator, wait: &WaitOptions) -> AnchorageError {
    match err {
        AnchorageError::ElementNotFound { .. } => AnchorageError::ElementUnresolvable {
            locator: locator.to_string(),
            timeout_ms: wait.timeout_ms,
        },
        other => other,
    }
}

// =============================================================================
// FRAME CONTEXT
// =============================================================================

/// `iframe` or `frame` with a registry of named child components
///
/// Frames start hidden. While a frame is shown, components fetched through
/// [`FrameContext::get_component`] are shown too, so they resolve inside the
/// frame's document.
#[derive(Debug)]
pub struct FrameContext {
    core: ComponentCore,
    children: HashMap<String, Component>,
    link: Arc<FrameLink>,
}

impl FrameContext {
    pub(crate) fn wrap(core: ComponentCore) -> Self {
        Self {
            core,
            children: HashMap::new(),
            link: Arc::new(FrameLink::root()),
        }
    }

    /// Nesting depth, 1 for a frame hosted in the top-level document
    #[must_use]
    pub fn depth(&self) -> u32 {
        self.link.snapshot().depth
    }

    /// Whether this frame is registered inside another frame
    #[must_use]
    pub fn has_parent(&self) -> bool {
        self.link.snapshot().parent.is_some()
    }

    // =========================================================================
    // REGISTRY
    // =========================================================================

    /// Register `component` under `name`, returning the one it replaces
    ///
    /// A nested frame becomes a child of this frame; its depth and the
    /// depths of its own nested frames are renumbered.
    pub fn add_component(
        &mut self,
        name: impl Into<String>,
        component: impl Into<Component>,
    ) -> Option<Component> {
        let name = name.into();
        let mut component = component.into();
        if let Component::Frame(frame) = &mut component {
            frame.attach(Some(Arc::clone(&self.link)), self.depth() + 1);
        }
        debug!(frame = self.label(), child = %name, kind = component.kind().name(), "component registered");
        self.children.insert(name, component)
    }

    /// Unregister the component under `name`; a frame becomes top-level again
    pub fn remove_component(&mut self, name: &str) -> AnchorageResult<Component> {
        let mut component = self.children.remove(name).ok_or_else(|| unknown(name))?;
        if let Component::Frame(frame) = &mut component {
            frame.attach(None, 1);
        }
        Ok(component)
    }

    /// Component under `name`, shown first when this frame is shown
    ///
    /// Nested frames are never shown implicitly.
    pub fn get_component(&mut self, name: &str) -> AnchorageResult<&mut Component> {
        let visible = self.core.is_visible();
        let component = self.children.get_mut(name).ok_or_else(|| unknown(name))?;
        if visible && component.kind() != WidgetKind::Frame {
            component.show()?;
        }
        Ok(component)
    }

    /// Component under `name` as widget type `T`
    pub fn get<T: Widget>(&mut self, name: &str) -> AnchorageResult<&mut T> {
        let component = self.get_component(name)?;
        let actual = component.kind();
        component
            .as_widget_mut::<T>()
            .ok_or_else(|| AnchorageError::WrongComponentKind {
                name: name.to_string(),
                expected: T::KIND.name(),
                actual: actual.name(),
            })
    }

    /// Whether a component is registered under `name`
    #[must_use]
    pub fn contains_component(&self, name: &str) -> bool {
        self.children.contains_key(name)
    }

    /// Registered names, sorted
    #[must_use]
    pub fn component_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.children.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    fn attach(&mut self, parent: Option<Arc<FrameLink>>, depth: u32) {
        self.link.update(|state| {
            state.parent = parent;
            state.depth = depth;
        });
        self.renumber();
    }

    fn renumber(&mut self) {
        let depth = self.depth();
        for child in self.children.values_mut() {
            if let Component::Frame(frame) = child {
                frame.link.update(|state| state.depth = depth + 1);
                frame.renumber();
            }
        }
    }

    fn label(&self) -> String {
        self.core
            .locator()
            .map_or_else(|| "<unloaded frame>".to_string(), ToString::to_string)
    }
}

impl Locatable for FrameContext {
    fn core(&self) -> &ComponentCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ComponentCore {
        &mut self.core
    }

    /// Replace the locator; a shown frame is hidden first
    fn load(&mut self, locator: Locator) -> AnchorageResult<()> {
        if self.core.is_visible() {
            self.hide()?;
        }
        self.link.update(|state| state.locator = Some(locator.clone()));
        self.core.load(locator)
    }

    /// Resolve the frame element and enter its context
    ///
    /// The enclosing context is entered from the top-level document first, so
    /// showing works from whatever context is active.
    fn show(&mut self) -> AnchorageResult<()> {
        let session = self.core.session().clone();
        let wait = *self.core.wait_options();
        let state = self.link.snapshot();
        let locator = state.locator.ok_or(AnchorageError::ComponentNotLoaded)?;

        match &state.parent {
            Some(parent) => parent.reenter(&session, &wait)?,
            None => session.enter_default_context()?,
        }
        if let Err(err) = self.core.show() {
            self.core.hide();
            return Err(unresolvable(err, &locator, &wait));
        }

        let element = self.core.element()?;
        session.enter_context(&element, state.depth)?;
        info!(frame = %locator, depth = state.depth, "frame shown");
        Ok(())
    }

    /// Leave this frame's context for the enclosing one
    fn hide(&mut self) -> AnchorageResult<()> {
        self.core.hide();
        let session = self.core.session().clone();
        let wait = *self.core.wait_options();
        match self.link.snapshot().parent {
            Some(parent) => parent.reenter(&session, &wait)?,
            None => session.enter_default_context()?,
        }
        debug!(frame = self.label(), "frame hidden");
        Ok(())
    }

    /// Leave and enter the frame again
    fn reload(&mut self) -> AnchorageResult<()> {
        if !self.core.is_visible() {
            return Err(AnchorageError::ComponentNotVisible);
        }
        self.hide()?;
        self.show()
    }
}

fn unknown(name: &str) -> AnchorageError {
    AnchorageError::UnknownComponent {
        name: name.to_string(),
    }
}
