//! Component Builder
//!
//! Creates components by [`WidgetKind`] and binds widgets to every match of
//! an attribute search.

use super::{Component, ComponentCore, Widget, WidgetKind};
use crate::locator::Locator;
use crate::result::{AnchorageError, AnchorageResult};
use crate::session::Session;
use crate::wait::poll_until;
use tracing::debug;

/// Factory for components sharing one session
#[derive(Debug, Clone)]
pub struct ComponentBuilder {
    session: Session,
}

impl ComponentBuilder {
    /// Builder for `session`
    #[must_use]
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    /// Session handed to every component
    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Fresh, unloaded component of `kind`
    #[must_use]
    pub fn build(&self, kind: WidgetKind) -> Component {
        Component::new(self.session.clone(), kind)
    }

    /// Fresh, unloaded widget of type `T`
    #[must_use]
    pub fn widget<T: Widget>(&self) -> T {
        T::new(self.session.clone())
    }

    /// Widget of type `T` loaded by id
    pub fn by_id<T: Widget>(&self, id: &str) -> AnchorageResult<T> {
        let mut widget = self.widget::<T>();
        widget.load_by_id(id)?;
        Ok(widget)
    }

    /// Widget of type `T` loaded by name
    pub fn by_name<T: Widget>(&self, name: &str) -> AnchorageResult<T> {
        let mut widget = self.widget::<T>();
        widget.load_by_name(name)?;
        Ok(widget)
    }

    /// Widget of type `T` loaded by XPath
    pub fn by_xpath<T: Widget>(&self, xpath: &str) -> AnchorageResult<T> {
        let mut widget = self.widget::<T>();
        widget.load_by_xpath(xpath)?;
        Ok(widget)
    }

    /// One component of `kind` per `tag` whose `attribute` equals `value`
    ///
    /// The search runs under the element with id `parent_id`, or the whole
    /// active document. Each component is bound to a multi-result element
    /// and carries `attribute = value` as an expectation. Polls until at
    /// least one element matches, then fails with
    /// [`AnchorageError::ElementNotFound`].
    pub fn load_all_by_attribute(
        &self,
        kind: WidgetKind,
        parent_id: Option<&str>,
        tag: &str,
        attribute: &str,
        value: &str,
    ) -> AnchorageResult<Vec<Component>> {
        if kind == WidgetKind::Frame {
            return Err(AnchorageError::InvalidArgument {
                message: "frames cannot be bound to multi-result elements".to_string(),
            });
        }
        let locator = Locator::attribute(tag, attribute, value)?;
        let wait = *self.session.wait_options();

        let elements = match parent_id {
            None => self.session.locate_all(&locator, &wait)?,
            Some(id) => {
                let parent = self.session.locate(&Locator::id(id)?, &wait)?;
                let found = poll_until(&wait, &locator.to_string(), || {
                    match parent.find_elements(&locator) {
                        Ok(elements) if !elements.is_empty() => Ok(Some(elements)),
                        Ok(_) => Ok(None),
                        Err(err) if err.is_transient() => Ok(None),
                        Err(err) => Err(err),
                    }
                })?;
                found.ok_or_else(|| AnchorageError::ElementNotFound {
                    locator: format!("{locator} under id={id}"),
                    timeout_ms: wait.timeout_ms,
                })?
            }
        };

        debug!(widget = kind.name(), locator = %locator, count = elements.len(), "binding components");
        elements
            .into_iter()
            .map(|element| {
                let mut core = ComponentCore::new(self.session.clone(), kind);
                core.bind(locator.clone(), element)?;
                Ok(Component::from_core(core))
            })
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::component::{Button, Checkbox, Clickable, Locatable, TextField};
    use crate::mock::{fixtures, MockBackend, MockElement};
    use crate::session::SessionConfig;
    use crate::wait::WaitOptions;
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    fn setup() -> (Arc<MockBackend>, ComponentBuilder) {
        let backend = Arc::new(MockBackend::new(fixtures::form_page()));
        let config = SessionConfig::default()
            .with_wait(WaitOptions::new().with_timeout(200).with_poll_interval(10));
        let session = Session::with_config(backend.clone(), config);
        (backend, ComponentBuilder::new(session))
    }

    #[test]
    fn test_build_every_kind() {
        let (_backend, builder) = setup();
        for kind in WidgetKind::ALL {
            assert_eq!(builder.build(kind).kind(), kind);
        }
    }

    #[test]
    fn test_typed_shortcuts() {
        let (backend, builder) = setup();
        let mut button: Button = builder.by_id("buttonId").unwrap();
        button.click().unwrap();
        assert!(backend.was_called("click:#buttonId"));

        let mut field: TextField = builder.by_name("username").unwrap();
        assert_eq!(field.id().unwrap().as_deref(), Some("textId"));

        let checkbox: AnchorageResult<Checkbox> = builder.by_xpath("//form/input[@id='checkedId']");
        assert!(checkbox.is_ok());
    }

    #[test]
    fn test_load_all_by_attribute() {
        let (_backend, builder) = setup();
        let mut radios = builder
            .load_all_by_attribute(WidgetKind::RadioButton, Some("formId"), "input", "type", "RADIO")
            .unwrap();
        assert_eq!(radios.len(), 2);

        let ids: Vec<Option<String>> = radios
            .iter_mut()
            .map(|radio| radio.as_locatable_mut().id().unwrap())
            .collect();
        assert_eq!(ids, vec![Some("radioA".to_string()), Some("radioB".to_string())]);
        assert!(radios.iter().all(|radio| radio.core().is_validated()));
        assert!(radios[0]
            .core()
            .cached_element()
            .is_some_and(|element| !element.is_unique()));
    }

    #[test]
    fn test_load_all_without_parent_searches_document() {
        let (_backend, builder) = setup();
        let boxes = builder
            .load_all_by_attribute(WidgetKind::Checkbox, None, "input", "type", "checkbox")
            .unwrap();
        assert_eq!(boxes.len(), 2);
    }

    #[test]
    fn test_load_all_rejects_wrong_widget() {
        let (_backend, builder) = setup();
        let err = builder
            .load_all_by_attribute(WidgetKind::Button, None, "input", "type", "checkbox")
            .unwrap_err();
        assert!(matches!(err, AnchorageError::InvalidElementTag { .. }));
    }

    #[test]
    fn test_load_all_times_out() {
        let (_backend, builder) = setup();
        let start = Instant::now();
        let err = builder
            .load_all_by_attribute(WidgetKind::Div, None, "div", "class", "missing")
            .unwrap_err();
        assert!(matches!(err, AnchorageError::ElementNotFound { timeout_ms: 200, .. }));
        assert!(start.elapsed() >= Duration::from_millis(200));
    }

    #[test]
    fn test_load_all_rejects_frames() {
        let (_backend, builder) = setup();
        assert!(matches!(
            builder.load_all_by_attribute(WidgetKind::Frame, None, "iframe", "class", "x"),
            Err(AnchorageError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_bound_components_go_stale_after_reload() {
        let (backend, builder) = setup();
        backend.insert_element(None, MockElement::new("div").attr("class", "row").text("r1"));
        let mut rows = builder
            .load_all_by_attribute(WidgetKind::Div, None, "div", "class", "row")
            .unwrap();
        backend.reload_page();
        let err = rows[0].as_widget_mut::<crate::component::Div>().unwrap().click().unwrap_err();
        assert!(matches!(err, AnchorageError::StaleMultiResult { .. }));
    }
}
