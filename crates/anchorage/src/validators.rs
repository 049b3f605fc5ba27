//! Assertion helpers over live component state

use crate::component::Locatable;
use crate::result::{AnchorageError, AnchorageResult};

/// Whether `attribute` of `component` equals `value`, ignoring case
pub fn is_equal(component: &mut dyn Locatable, attribute: &str, value: &str) -> AnchorageResult<bool> {
    Ok(live(component, attribute)?.is_some_and(|actual| actual.to_lowercase() == value.to_lowercase()))
}

/// Whether `attribute` of `component` contains `value`, ignoring case
pub fn contains(component: &mut dyn Locatable, attribute: &str, value: &str) -> AnchorageResult<bool> {
    Ok(live(component, attribute)?
        .is_some_and(|actual| actual.to_lowercase().contains(&value.to_lowercase())))
}

/// Whether `component` accepts interaction
pub fn is_enabled(component: &mut dyn Locatable) -> AnchorageResult<bool> {
    component.is_enabled()
}

fn live(component: &mut dyn Locatable, attribute: &str) -> AnchorageResult<Option<String>> {
    if attribute.is_empty() {
        return Err(AnchorageError::InvalidArgument {
            message: "attribute name must not be empty".to_string(),
        });
    }
    component.attribute(attribute)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::component::{Div, TextField, Widget};
    use crate::mock::{fixtures, MockBackend};
    use crate::session::{Session, SessionConfig};
    use crate::wait::WaitOptions;
    use std::sync::Arc;

    fn session() -> Session {
        let backend = Arc::new(MockBackend::new(fixtures::form_page()));
        let config = SessionConfig::default()
            .with_wait(WaitOptions::new().with_timeout(200).with_poll_interval(10));
        Session::with_config(backend, config)
    }

    #[test]
    fn test_is_equal_and_contains() {
        let mut div = Div::new(session());
        div.load_by_id("divId").unwrap();
        assert!(is_equal(&mut div, "class", "PANEL WIDE").unwrap());
        assert!(!is_equal(&mut div, "class", "panel").unwrap());
        assert!(contains(&mut div, "class", "Wide").unwrap());
        assert!(!contains(&mut div, "title", "x").unwrap());
    }

    #[test]
    fn test_is_enabled() {
        let session = session();
        let mut enabled = TextField::new(session.clone());
        enabled.load_by_id("textId").unwrap();
        let mut disabled = TextField::new(session);
        disabled.load_by_id("disabledId").unwrap();
        assert!(is_enabled(&mut enabled).unwrap());
        assert!(!is_enabled(&mut disabled).unwrap());
    }

    #[test]
    fn test_empty_attribute_rejected() {
        let mut div = Div::new(session());
        div.load_by_id("divId").unwrap();
        assert!(matches!(
            is_equal(&mut div, "", "x"),
            Err(AnchorageError::InvalidArgument { .. })
        ));
        assert!(matches!(
            contains(&mut div, "", "x"),
            Err(AnchorageError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_unloaded_component() {
        let mut div = Div::new(session());
        assert!(matches!(
            is_equal(&mut div, "id", "x"),
            Err(AnchorageError::ComponentNotLoaded)
        ));
    }
}
