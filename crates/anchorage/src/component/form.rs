//! Form Widgets
//!
//! Buttons, text inputs, toggles, selects and links.

use super::{Clickable, ComponentCore, Fillable, Locatable, TextReadable};
use crate::element::ElementProxy;
use crate::locator::Locator;
use crate::result::{AnchorageError, AnchorageResult};
use crate::wait::poll_until;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// `input` types a [`TextField`] accepts; a missing type counts as `text`
pub const TEXT_FIELD_TYPES: &[&str] = &[
    "text",
    "password",
    "number",
    "color",
    "date",
    "datetime",
    "datetime-local",
    "email",
    "month",
    "range",
    "search",
    "tel",
    "time",
    "url",
    "week",
];

/// Prefix of a [`Select::select_text`] argument that selects by value
pub const SUBMIT_PREFIX: &str = "submit::";

// =============================================================================
// BUTTON
// =============================================================================

/// Type of a button
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ButtonType {
    /// Submits its form
    Submit,
    /// Resets its form
    Reset,
    /// Plain push button
    Button,
    /// Graphical submit button
    Image,
}

impl ButtonType {
    /// Parse an HTML `type` attribute, ignoring case
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "submit" => Some(Self::Submit),
            "reset" => Some(Self::Reset),
            "button" => Some(Self::Button),
            "image" => Some(Self::Image),
            _ => None,
        }
    }
}

/// `button`, `img` or `input` of a button type
#[derive(Debug)]
pub struct Button {
    core: ComponentCore,
}

impl Button {
    /// Declared type; `button` elements default to submit, images have none
    pub fn button_type(&mut self) -> AnchorageResult<Option<ButtonType>> {
        let element = self.element()?;
        let tag = element.tag_name()?;
        let declared = element.attribute("type")?.as_deref().and_then(ButtonType::parse);
        Ok(match tag.as_str() {
            "button" => declared.or(Some(ButtonType::Submit)),
            "input" => declared,
            _ => None,
        })
    }
}

impl Clickable for Button {}
impl TextReadable for Button {}

// =============================================================================
// TEXT INPUTS
// =============================================================================

/// `input` of a text-like type
#[derive(Debug)]
pub struct TextField {
    core: ComponentCore,
}

impl TextField {
    /// Current `value`, empty when unset
    pub fn value(&mut self) -> AnchorageResult<String> {
        Ok(self.attribute("value")?.unwrap_or_default())
    }
}

impl Clickable for TextField {}
impl Fillable for TextField {}

/// `textarea`
#[derive(Debug)]
pub struct TextArea {
    core: ComponentCore,
}

impl Fillable for TextArea {}
impl TextReadable for TextArea {}

// =============================================================================
// TOGGLES
// =============================================================================

/// `input[type=checkbox]`
#[derive(Debug)]
pub struct Checkbox {
    core: ComponentCore,
}

impl Checkbox {
    /// Whether the box is ticked
    pub fn is_checked(&mut self) -> AnchorageResult<bool> {
        self.element()?.is_selected()
    }

    /// Tick the box if it is not ticked yet
    pub fn check(&mut self) -> AnchorageResult<()> {
        self.set_checked(true)
    }

    /// Untick the box if it is ticked
    pub fn uncheck(&mut self) -> AnchorageResult<()> {
        self.set_checked(false)
    }

    fn set_checked(&mut self, checked: bool) -> AnchorageResult<()> {
        let element = self.element()?;
        if element.is_selected()? != checked {
            element.click()?;
        }
        Ok(())
    }
}

impl Clickable for Checkbox {}

/// `input[type=radio]`
#[derive(Debug)]
pub struct RadioButton {
    core: ComponentCore,
}

impl RadioButton {
    /// Whether this option of the group is chosen
    pub fn is_selected(&mut self) -> AnchorageResult<bool> {
        self.element()?.is_selected()
    }
}

impl Clickable for RadioButton {}

// =============================================================================
// SELECT
// =============================================================================

/// One `option` of a [`Select`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    /// Zero-based position among the options
    pub index: usize,
    /// `value` attribute, the text when absent
    pub value: String,
    /// Rendered text
    pub text: String,
}

/// `select`
///
/// Options are enumerated as multi-result elements. When the list is rebuilt
/// while it is being read, the select is resolved again and the options are
/// enumerated from scratch until the timeout.
#[derive(Debug)]
pub struct Select {
    core: ComponentCore,
}

impl Select {
    /// Every option, in document order
    pub fn options(&mut self) -> AnchorageResult<Vec<SelectOption>> {
        let wait = *self.core.wait_options();
        let options = poll_until(&wait, "select options", || match self.read_options() {
            Ok(options) => Ok(Some(options.into_iter().map(|(option, _)| option).collect())),
            Err(err) => self.recover(err),
        })?;
        options.ok_or_else(|| AnchorageError::ElementUnresolvable {
            locator: self.locator_label(),
            timeout_ms: wait.timeout_ms,
        })
    }

    /// Option currently chosen
    pub fn selected(&mut self) -> AnchorageResult<Option<SelectOption>> {
        let wait = *self.core.wait_options();
        let selected = poll_until(&wait, "selected option", || {
            match self.read_selected() {
                Ok(selected) => Ok(Some(selected)),
                Err(err) => self.recover(err),
            }
        })?;
        selected.ok_or_else(|| AnchorageError::ElementUnresolvable {
            locator: self.locator_label(),
            timeout_ms: wait.timeout_ms,
        })
    }

    /// Choose the option showing `text`; `submit::v` chooses by value `v`
    pub fn select_text(&mut self, text: &str) -> AnchorageResult<()> {
        if let Some(value) = text.strip_prefix(SUBMIT_PREFIX) {
            return self.select_value(value);
        }
        self.select_where(text, |option| option.text.trim() == text.trim())
    }

    /// Choose the option whose `value` is `value`
    pub fn select_value(&mut self, value: &str) -> AnchorageResult<()> {
        self.select_where(value, |option| option.value == value)
    }

    /// Choose the option at zero-based `index`
    pub fn select_index(&mut self, index: usize) -> AnchorageResult<()> {
        self.select_where(&format!("#{index}"), |option| option.index == index)
    }

    fn select_where<F>(&mut self, wanted: &str, matches: F) -> AnchorageResult<()>
    where
        F: Fn(&SelectOption) -> bool,
    {
        let wait = *self.core.wait_options();
        let picked = poll_until(&wait, wanted, || {
            let attempt = self.read_options().and_then(|options| {
                match options.into_iter().find(|(option, _)| matches(option)) {
                    Some((_, element)) => element.click().map(|()| Some(())),
                    None => Ok(None),
                }
            });
            match attempt {
                Ok(found) => Ok(found),
                Err(err) => self.recover(err),
            }
        })?;

        picked.ok_or_else(|| AnchorageError::OptionNotFound {
            option: wanted.to_string(),
            timeout_ms: wait.timeout_ms,
        })
    }

    fn read_selected(&mut self) -> AnchorageResult<Option<SelectOption>> {
        for (option, element) in self.read_options()? {
            if element.is_selected()? {
                return Ok(Some(option));
            }
        }
        Ok(None)
    }

    fn read_options(&mut self) -> AnchorageResult<Vec<(SelectOption, ElementProxy)>> {
        let element = self.element()?;
        let options = element.find_elements(&Locator::tag("option")?)?;
        options
            .into_iter()
            .enumerate()
            .map(|(index, option)| {
                let text = option.text()?;
                let value = option.attribute("value")?.unwrap_or_else(|| text.clone());
                Ok((SelectOption { index, value, text }, option))
            })
            .collect()
    }

    fn recover<T>(&mut self, err: AnchorageError) -> AnchorageResult<Option<T>> {
        match err {
            AnchorageError::StaleMultiResult { .. } => {
                debug!(select = %self.locator_label(), "options changed while reading, enumerating again");
                self.core.reload()?;
                Ok(None)
            }
            other => Err(other),
        }
    }

    fn locator_label(&self) -> String {
        self.core
            .locator()
            .map_or_else(|| "select".to_string(), ToString::to_string)
    }
}

// =============================================================================
// LINK
// =============================================================================

/// `a`
#[derive(Debug)]
pub struct Link {
    core: ComponentCore,
}

impl Link {
    /// Target of the link
    pub fn href(&mut self) -> AnchorageResult<Option<String>> {
        self.attribute("href")
    }
}

impl Clickable for Link {}
impl TextReadable for Link {}

locatable_widget!(Button, TextField, TextArea, Checkbox, RadioButton, Select, Link);
