//! Page Components
//!
//! Typed widgets bound to a locator, resolved lazily and validated against
//! what the page actually rendered.
//!
//! ## Toyota Way Application:
//! - **Poka-Yoke**: A component refuses elements whose tag or attributes do
//!   not fit the widget kind
//! - **Jidoka**: Hidden components never touch the backend
//! - **Genchi Genbutsu**: Expectations are checked against live attributes
//!
//! # Lifecycle
//!
//! ```text
//!   new ──load_by_*──► loaded ──(visible)──► resolved + validated
//!                        │  ▲                       │
//!                      show hide ◄──────────────────┘
//! ```
//!
//! A component is resolved when it is visible and has a locator. Any
//! operation on a loaded, visible component without a validated element
//! resolves it first.

/// Implements [`Locatable`] for a widget struct holding a `core` field
macro_rules! locatable_widget {
    ($($ty:ident),+ $(,)?) => {
        $(
            impl $ty {
                pub(crate) fn wrap(core: $crate::component::ComponentCore) -> Self {
                    Self { core }
                }
            }

            impl $crate::component::Locatable for $ty {
                fn core(&self) -> &$crate::component::ComponentCore {
                    &self.core
                }

                fn core_mut(&mut self) -> &mut $crate::component::ComponentCore {
                    &mut self.core
                }
            }
        )+
    };
}

mod builder;
mod container;
mod form;
mod table;

pub use builder::ComponentBuilder;
pub use container::{Div, GenericComponent};
pub use form::{
    Button, ButtonType, Checkbox, Link, RadioButton, Select, SelectOption, TextArea, TextField,
    SUBMIT_PREFIX, TEXT_FIELD_TYPES,
};
pub use table::{Cell, Coordinate, Table, TableSection};

use crate::element::ElementProxy;
use crate::frame::FrameContext;
use crate::locator::{eq_ignore_case, Locator};
use crate::result::{AnchorageError, AnchorageResult};
use crate::session::Session;
use crate::wait::WaitOptions;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

// =============================================================================
// WIDGET KINDS
// =============================================================================

/// Every widget kind a component can be
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WidgetKind {
    /// `button`, `img`, or `input` of a button type
    Button,
    /// `input` of a text-like type
    TextField,
    /// `textarea`
    TextArea,
    /// `input[type=checkbox]`
    Checkbox,
    /// `input[type=radio]`
    RadioButton,
    /// `select`
    Select,
    /// `a`
    Link,
    /// `div`
    Div,
    /// Anything that is not a form control or link
    Generic,
    /// `table`
    Table,
    /// `iframe` or `frame`
    Frame,
}

impl WidgetKind {
    /// All widget kinds
    pub const ALL: [Self; 11] = [
        Self::Button,
        Self::TextField,
        Self::TextArea,
        Self::Checkbox,
        Self::RadioButton,
        Self::Select,
        Self::Link,
        Self::Div,
        Self::Generic,
        Self::Table,
        Self::Frame,
    ];

    /// Display name
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Button => "button",
            Self::TextField => "text field",
            Self::TextArea => "text area",
            Self::Checkbox => "checkbox",
            Self::RadioButton => "radio button",
            Self::Select => "select",
            Self::Link => "link",
            Self::Div => "div",
            Self::Generic => "generic component",
            Self::Table => "table",
            Self::Frame => "frame",
        }
    }

    /// Human readable description of the accepted elements
    #[must_use]
    pub const fn expected(self) -> &'static str {
        match self {
            Self::Button => "button, img or input[type=submit|reset|button|image]",
            Self::TextField => "input of a text-like type",
            Self::TextArea => "textarea",
            Self::Checkbox => "input[type=checkbox]",
            Self::RadioButton => "input[type=radio]",
            Self::Select => "select",
            Self::Link => "a",
            Self::Div => "div",
            Self::Generic => "any tag except select, a, button and visible input",
            Self::Table => "table",
            Self::Frame => "iframe or frame",
        }
    }

    /// Whether an element with `tag` (and `input_type`, for inputs) fits this kind
    ///
    /// `tag` and `input_type` must be lower case. Inputs without a type are
    /// text inputs.
    #[must_use]
    pub fn accepts(self, tag: &str, input_type: Option<&str>) -> bool {
        let input = |wanted: &str| tag == "input" && input_type == Some(wanted);
        match self {
            Self::Button => {
                matches!(tag, "button" | "img")
                    || (tag == "input" && input_type.and_then(ButtonType::parse).is_some())
            }
            Self::TextField => {
                tag == "input" && input_type.is_some_and(|t| TEXT_FIELD_TYPES.contains(&t))
            }
            Self::TextArea => tag == "textarea",
            Self::Checkbox => input("checkbox"),
            Self::RadioButton => input("radio"),
            Self::Select => tag == "select",
            Self::Link => tag == "a",
            Self::Div => tag == "div",
            Self::Table => tag == "table",
            Self::Frame => matches!(tag, "iframe" | "frame"),
            Self::Generic => {
                !(matches!(tag, "select" | "a" | "button")
                    || (tag == "input" && input_type != Some("hidden")))
            }
        }
    }

    /// Check a live element against this kind
    pub fn validate(self, element: &ElementProxy) -> AnchorageResult<()> {
        let tag = element.tag_name()?;
        let input_type = if tag == "input" {
            Some(
                element
                    .attribute("type")?
                    .map_or_else(|| "text".to_string(), |t| t.to_lowercase()),
            )
        } else {
            None
        };

        if self.accepts(&tag, input_type.as_deref()) {
            return Ok(());
        }
        Err(AnchorageError::InvalidElementTag {
            tag: match input_type {
                Some(t) => format!("{tag}[type={t}]"),
                None => tag,
            },
            widget: self.name(),
            expected: self.expected().to_string(),
        })
    }
}

// =============================================================================
// COMPONENT CORE
// =============================================================================

/// State shared by every widget
#[derive(Debug)]
pub struct ComponentCore {
    session: Session,
    kind: WidgetKind,
    locator: Option<Locator>,
    element: Option<ElementProxy>,
    attributes: HashMap<String, String>,
    visible: bool,
    validated: bool,
    wait: WaitOptions,
}

impl ComponentCore {
    /// Core for `kind`; frames start hidden, everything else visible
    #[must_use]
    pub fn new(session: Session, kind: WidgetKind) -> Self {
        let wait = *session.wait_options();
        Self {
            session,
            kind,
            locator: None,
            element: None,
            attributes: HashMap::new(),
            visible: kind != WidgetKind::Frame,
            validated: false,
            wait,
        }
    }

    /// Session the component talks through
    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Widget kind
    #[must_use]
    pub const fn kind(&self) -> WidgetKind {
        self.kind
    }

    /// Current locator
    #[must_use]
    pub fn locator(&self) -> Option<&Locator> {
        self.locator.as_ref()
    }

    /// Visibility flag
    #[must_use]
    pub const fn is_visible(&self) -> bool {
        self.visible
    }

    /// Whether the cached element passed validation
    #[must_use]
    pub const fn is_validated(&self) -> bool {
        self.validated
    }

    /// Cached element, without resolving
    #[must_use]
    pub fn cached_element(&self) -> Option<&ElementProxy> {
        self.element.as_ref()
    }

    /// Attribute expectations set through [`Locatable::set_attribute`]
    #[must_use]
    pub fn expectations(&self) -> &HashMap<String, String> {
        &self.attributes
    }

    /// Wait options used for resolution
    #[must_use]
    pub const fn wait_options(&self) -> &WaitOptions {
        &self.wait
    }

    /// Override the wait options used for resolution
    pub fn set_wait_options(&mut self, wait: WaitOptions) {
        self.wait = wait;
    }

    /// Replace the locator, resolving immediately when visible
    pub fn load(&mut self, locator: Locator) -> AnchorageResult<()> {
        debug!(widget = self.kind.name(), locator = %locator, visible = self.visible, "loading component");
        self.locator = Some(locator);
        self.invalidate();
        if self.visible {
            self.resolve()?;
        }
        Ok(())
    }

    /// Mark visible and re-resolve when a locator is set
    pub fn show(&mut self) -> AnchorageResult<()> {
        self.visible = true;
        self.invalidate();
        if self.locator.is_some() {
            self.resolve()?;
        }
        Ok(())
    }

    /// Mark hidden and drop the cached element
    pub fn hide(&mut self) {
        self.visible = false;
        self.invalidate();
    }

    /// Drop the cached element and resolve again
    pub fn reload(&mut self) -> AnchorageResult<()> {
        self.invalidate();
        self.resolve().map(|_| ())
    }

    /// Validated element, resolving first when needed
    pub fn element(&mut self) -> AnchorageResult<ElementProxy> {
        self.ensure_accessible()?;
        match &self.element {
            Some(element) if self.validated => Ok(element.clone()),
            _ => self.resolve(),
        }
    }

    /// Live attribute of the resolved element
    pub fn attribute(&mut self, name: &str) -> AnchorageResult<Option<String>> {
        require_attribute_name(name)?;
        self.element()?.attribute(name)
    }

    /// Record an attribute the element must carry
    pub fn set_attribute(&mut self, name: &str, value: &str) -> AnchorageResult<()> {
        require_attribute_name(name)?;
        self.attributes.insert(name.to_string(), value.to_string());
        self.validated = false;
        Ok(())
    }

    /// Check the cached element's tag against the widget kind
    pub fn validate_element_tag(&self) -> AnchorageResult<()> {
        let element = self.element.as_ref().ok_or(AnchorageError::ComponentNotLoaded)?;
        self.kind.validate(element)
    }

    /// Check the cached element against every expectation, ignoring case
    ///
    /// Expectations implied by the locator (id, name, attribute) are checked
    /// alongside the ones set explicitly.
    pub fn validate_attributes(&self) -> AnchorageResult<()> {
        let element = self.element.as_ref().ok_or(AnchorageError::ComponentNotLoaded)?;
        let implied = self.locator.as_ref().and_then(Locator::expectation);
        let explicit = self.attributes.iter().map(|(k, v)| (k.as_str(), v.as_str()));

        for (attribute, expected) in explicit.chain(implied) {
            let actual = element.attribute(attribute)?;
            if !actual.as_deref().is_some_and(|a| eq_ignore_case(a, expected)) {
                return Err(AnchorageError::AttributeMismatch {
                    attribute: attribute.to_string(),
                    expected: expected.to_string(),
                    actual,
                });
            }
        }
        Ok(())
    }

    /// Adopt an element found by a multi-result search
    pub(crate) fn bind(&mut self, locator: Locator, element: ElementProxy) -> AnchorageResult<()> {
        self.locator = Some(locator);
        self.visible = true;
        self.element = Some(element);
        self.validated = false;
        if let Err(err) = self.validate() {
            self.element = None;
            return Err(err);
        }
        self.validated = true;
        Ok(())
    }

    fn resolve(&mut self) -> AnchorageResult<ElementProxy> {
        self.ensure_accessible()?;
        let locator = self.locator.clone().ok_or(AnchorageError::ComponentNotLoaded)?;
        let element = self.session.locate(&locator, &self.wait)?;

        self.element = Some(element.clone());
        self.validated = false;
        if let Err(err) = self.validate() {
            debug!(widget = self.kind.name(), locator = %locator, error = %err, "element rejected");
            self.element = None;
            return Err(err);
        }
        self.validated = true;
        Ok(element)
    }

    fn validate(&self) -> AnchorageResult<()> {
        self.validate_element_tag()?;
        self.validate_attributes()
    }

    fn ensure_accessible(&self) -> AnchorageResult<()> {
        if self.locator.is_none() {
            return Err(AnchorageError::ComponentNotLoaded);
        }
        if !self.visible {
            return Err(AnchorageError::ComponentNotVisible);
        }
        Ok(())
    }

    fn invalidate(&mut self) {
        self.element = None;
        self.validated = false;
    }
}

fn require_attribute_name(name: &str) -> AnchorageResult<()> {
    if name.is_empty() {
        return Err(AnchorageError::InvalidArgument {
            message: "attribute name must not be empty".to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// CAPABILITIES
// =============================================================================

/// Anything bound to a locator and resolvable through a session
pub trait Locatable {
    /// Shared component state
    fn core(&self) -> &ComponentCore;

    /// Shared component state, mutably
    fn core_mut(&mut self) -> &mut ComponentCore;

    /// Replace the locator
    fn load(&mut self, locator: Locator) -> AnchorageResult<()> {
        self.core_mut().load(locator)
    }

    /// Locate by `id`; the element must carry that id
    fn load_by_id(&mut self, id: &str) -> AnchorageResult<()> {
        self.load(Locator::id(id)?)
    }

    /// Locate by `name`; the element must carry that name
    fn load_by_name(&mut self, name: &str) -> AnchorageResult<()> {
        self.load(Locator::name(name)?)
    }

    /// Locate by XPath
    fn load_by_xpath(&mut self, xpath: &str) -> AnchorageResult<()> {
        self.load(Locator::xpath(xpath)?)
    }

    /// Locate the first `tag` whose `attribute` equals `value`, ignoring case
    fn load_by_attribute(&mut self, tag: &str, attribute: &str, value: &str) -> AnchorageResult<()> {
        self.load(Locator::attribute(tag, attribute, value)?)
    }

    /// Make visible and resolve
    fn show(&mut self) -> AnchorageResult<()> {
        self.core_mut().show()
    }

    /// Make hidden
    fn hide(&mut self) -> AnchorageResult<()> {
        self.core_mut().hide();
        Ok(())
    }

    /// Visibility flag
    fn is_visible(&self) -> bool {
        self.core().is_visible()
    }

    /// Validated element, resolving first when needed
    fn element(&mut self) -> AnchorageResult<ElementProxy> {
        self.core_mut().element()
    }

    /// Live attribute value
    fn attribute(&mut self, name: &str) -> AnchorageResult<Option<String>> {
        self.core_mut().attribute(name)
    }

    /// Record an attribute the element must carry
    fn set_attribute(&mut self, name: &str, value: &str) -> AnchorageResult<()> {
        self.core_mut().set_attribute(name, value)
    }

    /// Live `id` attribute
    fn id(&mut self) -> AnchorageResult<Option<String>> {
        self.attribute("id")
    }

    /// Live `name` attribute
    fn name(&mut self) -> AnchorageResult<Option<String>> {
        self.attribute("name")
    }

    /// Resolve again from scratch
    fn reload(&mut self) -> AnchorageResult<()> {
        self.core_mut().reload()
    }

    /// Whether the element accepts interaction
    fn is_enabled(&mut self) -> AnchorageResult<bool> {
        self.element()?.is_enabled()
    }

    /// Whether the element is rendered
    fn is_displayed(&mut self) -> AnchorageResult<bool> {
        self.element()?.is_displayed()
    }
}

/// Widgets that can be clicked
pub trait Clickable: Locatable {
    /// Click the element
    fn click(&mut self) -> AnchorageResult<()> {
        self.element()?.click()
    }
}

/// Widgets with readable text
pub trait TextReadable: Locatable {
    /// Rendered text
    fn text(&mut self) -> AnchorageResult<String> {
        self.element()?.text()
    }
}

/// Widgets that accept typed text
pub trait Fillable: Locatable {
    /// Clear, then type `text`
    fn fill(&mut self, text: &str) -> AnchorageResult<()> {
        let element = self.element()?;
        element.clear()?;
        element.send_keys(text)
    }
}

// =============================================================================
// TAGGED COMPONENTS
// =============================================================================

/// Statically typed widget that can live inside a [`Component`]
pub trait Widget: Locatable + Into<Component> + Sized {
    /// Kind of this widget
    const KIND: WidgetKind;

    /// Wrap an existing core
    fn from_core(core: ComponentCore) -> Self;

    /// Borrow the widget out of a component of the same kind
    fn from_component_mut(component: &mut Component) -> Option<&mut Self>;

    /// Fresh, unloaded widget
    fn new(session: Session) -> Self {
        Self::from_core(ComponentCore::new(session, Self::KIND))
    }
}

macro_rules! components {
    ($($variant:ident => $ty:ty),+ $(,)?) => {
        /// Any widget, tagged by kind
        #[derive(Debug)]
        pub enum Component {
            $(
                #[doc = concat!("A [`", stringify!($ty), "`]")]
                $variant($ty),
            )+
        }

        impl Component {
            /// Widget kind of the wrapped widget
            #[must_use]
            pub const fn kind(&self) -> WidgetKind {
                match self {
                    $(Self::$variant(_) => WidgetKind::$variant,)+
                }
            }

            /// Fresh, unloaded component of `kind`
            #[must_use]
            pub fn new(session: Session, kind: WidgetKind) -> Self {
                match kind {
                    $(WidgetKind::$variant => Self::$variant(<$ty as Widget>::new(session)),)+
                }
            }

            pub(crate) fn from_core(core: ComponentCore) -> Self {
                match core.kind() {
                    $(WidgetKind::$variant => Self::$variant(<$ty as Widget>::from_core(core)),)+
                }
            }

            /// Shared behaviour of the wrapped widget
            pub fn as_locatable(&self) -> &dyn Locatable {
                match self {
                    $(Self::$variant(widget) => widget,)+
                }
            }

            /// Shared behaviour of the wrapped widget, mutably
            pub fn as_locatable_mut(&mut self) -> &mut dyn Locatable {
                match self {
                    $(Self::$variant(widget) => widget,)+
                }
            }
        }

        $(
            impl From<$ty> for Component {
                fn from(widget: $ty) -> Self {
                    Self::$variant(widget)
                }
            }

            impl Widget for $ty {
                const KIND: WidgetKind = WidgetKind::$variant;

                fn from_core(core: ComponentCore) -> Self {
                    <$ty>::wrap(core)
                }

                fn from_component_mut(component: &mut Component) -> Option<&mut Self> {
                    match component {
                        Component::$variant(widget) => Some(widget),
                        _ => None,
                    }
                }
            }
        )+
    };
}

components! {
    Button => Button,
    TextField => TextField,
    TextArea => TextArea,
    Checkbox => Checkbox,
    RadioButton => RadioButton,
    Select => Select,
    Link => Link,
    Div => Div,
    Generic => GenericComponent,
    Table => Table,
    Frame => FrameContext,
}

impl Component {
    /// Borrow the wrapped widget as `T`
    pub fn as_widget_mut<T: Widget>(&mut self) -> Option<&mut T> {
        T::from_component_mut(self)
    }

    /// Make visible (frames also enter their context)
    pub fn show(&mut self) -> AnchorageResult<()> {
        self.as_locatable_mut().show()
    }

    /// Make hidden (frames also leave their context)
    pub fn hide(&mut self) -> AnchorageResult<()> {
        self.as_locatable_mut().hide()
    }

    /// Visibility flag
    pub fn is_visible(&self) -> bool {
        self.as_locatable().is_visible()
    }

    /// Shared component state
    pub fn core(&self) -> &ComponentCore {
        self.as_locatable().core()
    }
}
