//! Element Proxy - Self-Healing Element Handles
//!
//! An [`ElementProxy`] wraps a backend [`NodeRef`] together with the locator
//! and parent that produced it. When an operation reports staleness the proxy
//! either heals itself or refuses, depending on how it was obtained:
//!
//! - **Unique** proxies (from a single-element lookup) replay their locator
//!   against the parent, or the document when the parent is the virtual root,
//!   until a node reappears or the timeout elapses. The operation is then
//!   retried once against the fresh node.
//! - **Multi-result** proxies (from an enumeration) fail with
//!   [`AnchorageError::StaleMultiResult`]; there is no way to tell which of
//!   the new matches corresponds to the old one.
//!
//! The document root of every context is itself a unique proxy tagged as
//! the virtual root, so document-level lookups share the same machinery.

use crate::backend::{Backend, BackendError, BackendResult, NodeOp, NodeRef};
use crate::locator::{eq_ignore_case, Locator};
use crate::result::{AnchorageError, AnchorageResult};
use crate::session::Session;
use crate::wait::poll_until;
use serde_json::Value;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, warn};

/// Self-healing handle to a backend node
#[derive(Clone)]
pub struct ElementProxy {
    inner: Arc<ProxyInner>,
}

struct ProxyInner {
    session: Session,
    node: Mutex<NodeRef>,
    locator: Locator,
    parent: Option<ElementProxy>,
    unique: bool,
    virtual_root: bool,
}

/// Steps of a single proxied operation
enum Recovery {
    Attempt(NodeRef),
    Relocate,
    Retry(NodeRef),
}

impl ElementProxy {
    pub(crate) fn new(
        session: Session,
        node: NodeRef,
        locator: Locator,
        parent: Option<Self>,
        unique: bool,
    ) -> Self {
        Self {
            inner: Arc::new(ProxyInner {
                session,
                node: Mutex::new(node),
                locator,
                parent,
                unique,
                virtual_root: false,
            }),
        }
    }

    pub(crate) fn virtual_root(session: Session, node: NodeRef, locator: Locator) -> Self {
        Self {
            inner: Arc::new(ProxyInner {
                session,
                node: Mutex::new(node),
                locator,
                parent: None,
                unique: true,
                virtual_root: true,
            }),
        }
    }

    /// Node currently backing this proxy
    #[must_use]
    pub fn node(&self) -> NodeRef {
        self.inner
            .node
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Locator replayed on recovery
    #[must_use]
    pub fn locator(&self) -> &Locator {
        &self.inner.locator
    }

    /// Proxy the locator was resolved against
    #[must_use]
    pub fn parent(&self) -> Option<&Self> {
        self.inner.parent.as_ref()
    }

    /// Whether this proxy heals itself after staleness
    #[must_use]
    pub fn is_unique(&self) -> bool {
        self.inner.unique
    }

    /// Whether this proxy stands for a context's document root
    #[must_use]
    pub fn is_virtual_root(&self) -> bool {
        self.inner.virtual_root
    }

    /// Session the proxy talks through
    #[must_use]
    pub fn session(&self) -> &Session {
        &self.inner.session
    }

    // =========================================================================
    // OPERATIONS
    // =========================================================================

    /// Click the element
    pub fn click(&self) -> AnchorageResult<()> {
        self.perform(&NodeOp::Click)
    }

    /// Submit the enclosing form
    pub fn submit(&self) -> AnchorageResult<()> {
        self.perform(&NodeOp::Submit)
    }

    /// Clear an editable element
    pub fn clear(&self) -> AnchorageResult<()> {
        self.perform(&NodeOp::Clear)
    }

    /// Type text into the element
    pub fn send_keys(&self, text: &str) -> AnchorageResult<()> {
        self.perform(&NodeOp::SendKeys(text.to_string()))
    }

    /// Lower-case tag name
    pub fn tag_name(&self) -> AnchorageResult<String> {
        let tag: String = self.decode(&NodeOp::TagName)?;
        Ok(tag.to_lowercase())
    }

    /// Live attribute value, `None` when absent
    pub fn attribute(&self, name: &str) -> AnchorageResult<Option<String>> {
        self.decode(&NodeOp::Attribute(name.to_string()))
    }

    /// Rendered text
    pub fn text(&self) -> AnchorageResult<String> {
        self.decode(&NodeOp::Text)
    }

    /// Selection state of checkboxes, radios and options
    pub fn is_selected(&self) -> AnchorageResult<bool> {
        self.decode(&NodeOp::IsSelected)
    }

    /// Whether the element accepts interaction
    pub fn is_enabled(&self) -> AnchorageResult<bool> {
        self.decode(&NodeOp::IsEnabled)
    }

    /// Whether the element is rendered
    pub fn is_displayed(&self) -> AnchorageResult<bool> {
        self.decode(&NodeOp::IsDisplayed)
    }

    /// Computed style property
    pub fn css_value(&self, property: &str) -> AnchorageResult<String> {
        self.decode(&NodeOp::CssValue(property.to_string()))
    }

    /// First descendant matching `locator`, as a unique proxy
    pub fn find_element(&self, locator: &Locator) -> AnchorageResult<Self> {
        let node = self.run(|backend, node| search_first(backend, Some(node), locator))?;
        match node {
            Some(node) => Ok(Self::new(
                self.session().clone(),
                node,
                locator.clone(),
                Some(self.clone()),
                true,
            )),
            None => Err(AnchorageError::ElementNotFound {
                locator: locator.to_string(),
                timeout_ms: 0,
            }),
        }
    }

    /// All descendants matching `locator`, as multi-result proxies
    pub fn find_elements(&self, locator: &Locator) -> AnchorageResult<Vec<Self>> {
        Ok(self
            .find_nodes(locator)?
            .into_iter()
            .map(|node| {
                Self::new(
                    self.session().clone(),
                    node,
                    locator.clone(),
                    Some(self.clone()),
                    false,
                )
            })
            .collect())
    }

    pub(crate) fn find_nodes(&self, locator: &Locator) -> AnchorageResult<Vec<NodeRef>> {
        self.run(|backend, node| search(backend, Some(node), locator))
    }

    pub(crate) fn enter_as_context(&self) -> AnchorageResult<()> {
        self.run(|backend, node| backend.enter_context(node))
    }

    fn perform(&self, op: &NodeOp) -> AnchorageResult<()> {
        self.run(|backend, node| backend.invoke(node, op)).map(|_| ())
    }

    fn decode<T: serde::de::DeserializeOwned>(&self, op: &NodeOp) -> AnchorageResult<T> {
        let value = self.run(|backend, node| backend.invoke(node, op))?;
        Ok(serde_json::from_value(value)?)
    }

    // =========================================================================
    // RECOVERY
    // =========================================================================

    fn run<T, F>(&self, op: F) -> AnchorageResult<T>
    where
        F: Fn(&dyn Backend, &NodeRef) -> BackendResult<T>,
    {
        let backend = self.inner.session.backend();
        let mut state = Recovery::Attempt(self.node());

        loop {
            state = match state {
                Recovery::Attempt(node) => match op(backend, &node) {
                    Ok(value) => return Ok(value),
                    Err(BackendError::Stale) if !self.inner.unique => {
                        debug!(locator = %self.inner.locator, "multi-result element went stale");
                        return Err(AnchorageError::StaleMultiResult {
                            locator: self.inner.locator.to_string(),
                        });
                    }
                    Err(BackendError::Stale) => Recovery::Relocate,
                    Err(err) => return Err(err.into()),
                },
                Recovery::Relocate => {
                    let fresh = self.relocate()?;
                    *self.inner.node.lock().unwrap_or_else(PoisonError::into_inner) = fresh.clone();
                    Recovery::Retry(fresh)
                }
                Recovery::Retry(node) => {
                    return op(backend, &node).map_err(|err| match err {
                        BackendError::Stale => self.unresolvable(),
                        other => other.into(),
                    });
                }
            };
        }
    }

    fn relocate(&self) -> AnchorageResult<NodeRef> {
        let locator = &self.inner.locator;
        let options = *self.inner.session.wait_options();
        debug!(locator = %locator, "stale reference, replaying locator");

        let found = poll_until(&options, &locator.to_string(), || {
            let candidates = match &self.inner.parent {
                Some(parent) if !parent.is_virtual_root() => parent.find_nodes(locator),
                _ => search(self.inner.session.backend(), None, locator).map_err(AnchorageError::from),
            };
            match candidates {
                Ok(nodes) => Ok(nodes.into_iter().next()),
                Err(err) if err.is_transient() => Ok(None),
                Err(err) => Err(err),
            }
        })?;

        match found {
            Some(node) => {
                info!(locator = %locator, node = %node, "recovered stale element");
                Ok(node)
            }
            None => {
                warn!(locator = %locator, timeout_ms = options.timeout_ms, "stale element could not be recovered");
                Err(self.unresolvable())
            }
        }
    }

    fn unresolvable(&self) -> AnchorageError {
        AnchorageError::ElementUnresolvable {
            locator: self.inner.locator.to_string(),
            timeout_ms: self.inner.session.wait_options().timeout_ms,
        }
    }
}

impl fmt::Debug for ElementProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementProxy")
            .field("locator", &self.inner.locator.to_string())
            .field("node", &self.node())
            .field("unique", &self.inner.unique)
            .field("virtual_root", &self.inner.virtual_root)
            .finish()
    }
}

// =============================================================================
// SEARCH
// =============================================================================

/// Every node under `root` matching `locator`, attribute filter applied
pub(crate) fn search(
    backend: &dyn Backend,
    root: Option<&NodeRef>,
    locator: &Locator,
) -> BackendResult<Vec<NodeRef>> {
    let nodes = match backend.find_many(&locator.by(), root) {
        Ok(nodes) => nodes,
        Err(BackendError::NotFound { .. }) => Vec::new(),
        Err(err) => return Err(err),
    };

    let Some((attribute, expected)) = locator.attribute_filter() else {
        return Ok(nodes);
    };

    let mut matched = Vec::new();
    for node in nodes {
        match backend.invoke(&node, &NodeOp::Attribute(attribute.to_string())) {
            Ok(Value::String(actual)) if eq_ignore_case(&actual, expected) => matched.push(node),
            // candidates that vanish mid-scan are skipped
            Ok(_) | Err(BackendError::Stale) => {}
            Err(err) => return Err(err),
        }
    }
    Ok(matched)
}

fn search_first(
    backend: &dyn Backend,
    root: Option<&NodeRef>,
    locator: &Locator,
) -> BackendResult<Option<NodeRef>> {
    if locator.attribute_filter().is_some() {
        return Ok(search(backend, root, locator)?.into_iter().next());
    }
    match backend.find_one(&locator.by(), root) {
        Ok(node) => Ok(Some(node)),
        Err(BackendError::NotFound { .. }) => Ok(None),
        Err(err) => Err(err),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::backend::By;
    use crate::mock::{MockBackend, MockElement};
    use crate::session::SessionConfig;
    use crate::wait::WaitOptions;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{Duration, Instant};

    fn page() -> MockElement {
        MockElement::new("html").child(
            MockElement::new("body")
                .child(MockElement::new("button").id("go").text("Go"))
                .child(
                    MockElement::new("ul")
                        .id("list")
                        .child(MockElement::new("li").attr("class", "item").text("one"))
                        .child(MockElement::new("li").attr("class", "ITEM").text("two"))
                        .child(MockElement::new("li").attr("class", "other").text("three")),
                ),
        )
    }

    fn setup() -> (Arc<MockBackend>, Session) {
        let backend = Arc::new(MockBackend::new(page()));
        let config = SessionConfig::default()
            .with_wait(WaitOptions::new().with_timeout(300).with_poll_interval(10));
        let session = Session::with_config(backend.clone(), config);
        (backend, session)
    }

    mod recovery_tests {
        use super::*;

        #[test]
        fn test_unique_proxy_recovers_after_reload() {
            let (backend, session) = setup();
            let button = session.find_one(&Locator::id("go").unwrap()).unwrap();
            let before = button.node();

            backend.reload_page();
            button.click().unwrap();

            assert_ne!(button.node(), before);
            assert!(backend.was_called("click"));
        }

        #[test]
        fn test_unique_proxy_recovers_against_element_parent() {
            let (backend, session) = setup();
            let list = session.find_one(&Locator::id("list").unwrap()).unwrap();
            let first = list.find_element(&Locator::tag("li").unwrap()).unwrap();

            backend.replace_element("list");
            assert_eq!(first.text().unwrap(), "one");
        }

        #[test]
        fn test_multi_result_proxy_refuses_to_guess() {
            let (backend, session) = setup();
            let items = session.find_many(&Locator::tag("li").unwrap()).unwrap();
            assert_eq!(items.len(), 3);
            assert!(!items[0].is_unique());

            backend.reload_page();
            let err = items[1].text().unwrap_err();
            assert!(matches!(err, AnchorageError::StaleMultiResult { .. }));
        }

        #[test]
        fn test_removed_element_is_unresolvable_after_timeout() {
            let (backend, session) = setup();
            let button = session.find_one(&Locator::id("go").unwrap()).unwrap();
            backend.remove_element("go");

            let start = Instant::now();
            let err = button.click().unwrap_err();
            assert!(matches!(err, AnchorageError::ElementUnresolvable { timeout_ms: 300, .. }));
            assert!(start.elapsed() >= Duration::from_millis(300));
        }

        #[test]
        fn test_non_stale_errors_propagate_without_recovery() {
            let (backend, session) = setup();
            let button = session.find_one(&Locator::id("go").unwrap()).unwrap();
            backend.fail_operations("click", "element not interactable");
            backend.clear_history();

            let err = button.click().unwrap_err();
            assert!(matches!(err, AnchorageError::Backend(BackendError::Failed { .. })));
            assert_eq!(backend.history(), vec!["click:#go".to_string()]);
        }
    }

    /// Backend whose clicks always land on a stale node
    struct StaleClicks {
        inner: MockBackend,
        clicks: AtomicUsize,
    }

    impl Backend for StaleClicks {
        fn find_one(&self, by: &By, root: Option<&NodeRef>) -> BackendResult<NodeRef> {
            self.inner.find_one(by, root)
        }

        fn find_many(&self, by: &By, root: Option<&NodeRef>) -> BackendResult<Vec<NodeRef>> {
            self.inner.find_many(by, root)
        }

        fn invoke(&self, node: &NodeRef, op: &NodeOp) -> BackendResult<Value> {
            if *op == NodeOp::Click {
                self.clicks.fetch_add(1, Ordering::SeqCst);
                return Err(BackendError::Stale);
            }
            self.inner.invoke(node, op)
        }

        fn enter_context(&self, frame: &NodeRef) -> BackendResult<()> {
            self.inner.enter_context(frame)
        }

        fn enter_default_context(&self) -> BackendResult<()> {
            self.inner.enter_default_context()
        }

        fn current_window(&self) -> BackendResult<String> {
            self.inner.current_window()
        }

        fn screenshot(&self) -> BackendResult<Vec<u8>> {
            self.inner.screenshot()
        }

        fn navigate(&self, url: &str) -> BackendResult<()> {
            self.inner.navigate(url)
        }

        fn current_url(&self) -> BackendResult<String> {
            self.inner.current_url()
        }

        fn alert_text(&self) -> BackendResult<String> {
            self.inner.alert_text()
        }

        fn accept_alert(&self) -> BackendResult<()> {
            self.inner.accept_alert()
        }

        fn dismiss_alert(&self) -> BackendResult<()> {
            self.inner.dismiss_alert()
        }
    }

    mod retry_tests {
        use super::*;

        #[test]
        fn test_stale_again_after_recovery_is_unresolvable() {
            let backend = Arc::new(StaleClicks {
                inner: MockBackend::new(page()),
                clicks: AtomicUsize::new(0),
            });
            let config = SessionConfig::default()
                .with_wait(WaitOptions::new().with_timeout(100).with_poll_interval(10));
            let session = Session::with_config(backend.clone(), config);
            let button = session.find_one(&Locator::id("go").unwrap()).unwrap();

            let err = button.click().unwrap_err();
            assert!(matches!(
                err,
                AnchorageError::ElementUnresolvable { ref locator, timeout_ms: 100 } if locator == "id=go"
            ));
            assert_eq!(backend.clicks.load(Ordering::SeqCst), 2);
        }

        #[test]
        fn test_other_operations_still_work() {
            let backend = Arc::new(StaleClicks {
                inner: MockBackend::new(page()),
                clicks: AtomicUsize::new(0),
            });
            let session = Session::with_config(backend, SessionConfig::default());
            let button = session.find_one(&Locator::id("go").unwrap()).unwrap();
            assert_eq!(button.text().unwrap(), "Go");
        }
    }

    mod search_tests {
        use super::*;

        #[test]
        fn test_attribute_filter_ignores_case() {
            let (_backend, session) = setup();
            let items = session
                .find_many(&Locator::attribute("li", "class", "item").unwrap())
                .unwrap();
            let texts: Vec<String> = items.iter().map(|item| item.text().unwrap()).collect();
            assert_eq!(texts, vec!["one", "two"]);
        }

        #[test]
        fn test_find_element_reports_not_found() {
            let (_backend, session) = setup();
            let list = session.find_one(&Locator::id("list").unwrap()).unwrap();
            let err = list.find_element(&Locator::tag("table").unwrap()).unwrap_err();
            assert!(matches!(err, AnchorageError::ElementNotFound { timeout_ms: 0, .. }));
        }

        #[test]
        fn test_children_keep_parent_link() {
            let (_backend, session) = setup();
            let list = session.find_one(&Locator::id("list").unwrap()).unwrap();
            let item = list.find_element(&Locator::tag("li").unwrap()).unwrap();
            assert!(item.is_unique());
            assert_eq!(item.parent().unwrap().locator(), list.locator());
            assert!(list.parent().unwrap().is_virtual_root());
        }

        #[test]
        fn test_typed_operations() {
            let (_backend, session) = setup();
            let button = session.find_one(&Locator::id("go").unwrap()).unwrap();
            assert_eq!(button.tag_name().unwrap(), "button");
            assert_eq!(button.attribute("id").unwrap().as_deref(), Some("go"));
            assert_eq!(button.attribute("missing").unwrap(), None);
            assert!(button.is_enabled().unwrap());
            assert!(button.is_displayed().unwrap());
        }
    }
}
