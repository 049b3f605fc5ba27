//! Containers and generic elements

use super::{Clickable, ComponentCore, Locatable, TextReadable};
use crate::result::AnchorageResult;

/// `div`
#[derive(Debug)]
pub struct Div {
    core: ComponentCore,
}

impl Div {
    /// Computed style property, e.g. `display`
    pub fn css_value(&mut self, property: &str) -> AnchorageResult<String> {
        self.element()?.css_value(property)
    }

    /// Whether the `class` attribute lists `class`
    pub fn has_class(&mut self, class: &str) -> AnchorageResult<bool> {
        Ok(self
            .attribute("class")?
            .is_some_and(|classes| classes.split_whitespace().any(|c| c == class)))
    }
}

impl Clickable for Div {}
impl TextReadable for Div {}

/// Any element that is not a form control or link
#[derive(Debug)]
pub struct GenericComponent {
    core: ComponentCore,
}

impl GenericComponent {
    /// Lower-case tag of the resolved element
    pub fn tag_name(&mut self) -> AnchorageResult<String> {
        self.element()?.tag_name()
    }
}

impl Clickable for GenericComponent {}
impl TextReadable for GenericComponent {}

locatable_widget!(Div, GenericComponent);
