//! Mock Backend Module
//!
//! An in-memory document tree implementing [`Backend`], for testing proxies,
//! components and frames without a browser.
//!
//! ## Fidelity
//!
//! The mock reproduces the behaviours the proxy layer depends on:
//!
//! - Node handles are invalidated by [`MockBackend::reload_page`],
//!   [`MockBackend::replace_element`] and [`MockBackend::remove_element`];
//!   using an old handle reports [`BackendError::Stale`]
//! - Handles from a document other than the active context are stale too
//! - `iframe` elements carry their own sub-document entered through
//!   [`Backend::enter_context`]
//! - XPath supports `/`, `//`, `./` and `.//` with `tag`, `*`, `[n]` and
//!   `[@attr='value']` steps
//!
//! ## Example
//!
//! ```rust
//! use anchorage::mock::{MockBackend, MockElement};
//! use anchorage::{Locator, Session};
//! use std::sync::Arc;
//!
//! let backend = Arc::new(MockBackend::new(
//!     MockElement::new("html").child(MockElement::new("button").id("go")),
//! ));
//! let session = Session::new(backend.clone());
//! let button = session.find_one(&Locator::id("go").unwrap()).unwrap();
//!
//! backend.reload_page();
//! button.click().unwrap(); // recovered transparently
//! assert!(backend.was_called("click"));
//! ```

pub mod fixtures;

use crate::backend::{Backend, BackendError, BackendResult, By, NodeOp, NodeRef};
use regex::Regex;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};
use uuid::Uuid;

/// Bytes returned by [`Backend::screenshot`]: the PNG signature
pub const MOCK_SCREENSHOT: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];

// =============================================================================
// DECLARATIVE ELEMENTS
// =============================================================================

/// Declarative description of a mock element tree
#[derive(Debug, Clone, Default)]
pub struct MockElement {
    tag: String,
    attributes: Vec<(String, String)>,
    text: String,
    children: Vec<MockElement>,
    document: Option<Box<MockElement>>,
}

impl MockElement {
    /// Element with the given tag
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    /// Add an attribute
    #[must_use]
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    /// Shorthand for the `id` attribute
    #[must_use]
    pub fn id(self, value: impl Into<String>) -> Self {
        self.attr("id", value)
    }

    /// Own text content
    #[must_use]
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Append a child
    #[must_use]
    pub fn child(mut self, child: MockElement) -> Self {
        self.children.push(child);
        self
    }

    /// Append several children
    #[must_use]
    pub fn children(mut self, children: impl IntoIterator<Item = MockElement>) -> Self {
        self.children.extend(children);
        self
    }

    /// Document shown inside this (frame) element
    #[must_use]
    pub fn frame_document(mut self, document: MockElement) -> Self {
        self.document = Some(Box::new(document));
        self
    }
}

// =============================================================================
// DOCUMENT ARENA
// =============================================================================

#[derive(Debug)]
struct Node {
    id: String,
    tag: String,
    attributes: HashMap<String, String>,
    text: String,
    children: Vec<usize>,
    parent: Option<usize>,
    document: usize,
    frame_document: Option<usize>,
    selected: bool,
    detached: bool,
}

#[derive(Debug, Default)]
struct Dom {
    nodes: Vec<Node>,
    index: HashMap<String, usize>,
    top: usize,
    current: usize,
    url: String,
    alert: Option<String>,
    transient: bool,
    failures: HashMap<String, String>,
    stale_once: HashSet<String>,
    history: Vec<String>,
}

fn fresh_id() -> String {
    format!("node-{}", Uuid::new_v4())
}

impl Dom {
    fn insert(&mut self, template: &MockElement, parent: Option<usize>, document: Option<usize>) -> usize {
        let index = self.nodes.len();
        let document = document.unwrap_or(index);
        let attributes: HashMap<String, String> = template.attributes.iter().cloned().collect();
        let selected = attributes.contains_key("checked") || attributes.contains_key("selected");
        let id = fresh_id();

        self.nodes.push(Node {
            id: id.clone(),
            tag: template.tag.to_lowercase(),
            attributes,
            text: template.text.clone(),
            children: Vec::new(),
            parent,
            document,
            frame_document: None,
            selected,
            detached: false,
        });
        self.index.insert(id, index);

        for child in &template.children {
            let child_index = self.insert(child, Some(index), Some(document));
            self.nodes[index].children.push(child_index);
        }
        if let Some(sub) = &template.document {
            let sub_index = self.insert(sub, None, None);
            self.nodes[index].frame_document = Some(sub_index);
        }
        index
    }

    fn resolve(&self, node: &NodeRef) -> BackendResult<usize> {
        let index = *self.index.get(node.id()).ok_or(BackendError::Stale)?;
        let entry = &self.nodes[index];
        if entry.detached || entry.document != self.current {
            return Err(BackendError::Stale);
        }
        Ok(index)
    }

    fn handle(&self, index: usize) -> NodeRef {
        NodeRef::new(self.nodes[index].id.clone())
    }

    fn describe(&self, index: usize) -> String {
        let node = &self.nodes[index];
        node.attributes
            .get("id")
            .map_or_else(|| node.tag.clone(), |id| format!("#{id}"))
    }

    /// Pre-order walk that stays inside one document
    fn descendants(&self, index: usize, include_self: bool) -> Vec<usize> {
        let mut out = Vec::new();
        if include_self {
            out.push(index);
        }
        let mut stack: Vec<usize> = self.nodes[index].children.iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.nodes[next].children.iter().rev().copied());
        }
        out
    }

    fn attached(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.nodes.len()).filter(move |&i| !self.nodes[i].detached)
    }

    fn by_id_attribute(&self, id: &str) -> Option<usize> {
        self.attached()
            .find(|&i| self.nodes[i].attributes.get("id").map(String::as_str) == Some(id))
    }

    fn regenerate(&mut self, index: usize) {
        let old = std::mem::replace(&mut self.nodes[index].id, fresh_id());
        self.index.remove(&old);
        self.index.insert(self.nodes[index].id.clone(), index);

        let mut next: Vec<usize> = self.nodes[index].children.clone();
        next.extend(self.nodes[index].frame_document);
        for child in next {
            self.regenerate(child);
        }
    }

    fn detach(&mut self, index: usize) {
        let id = self.nodes[index].id.clone();
        self.index.remove(&id);
        self.nodes[index].detached = true;

        let mut next: Vec<usize> = self.nodes[index].children.clone();
        next.extend(self.nodes[index].frame_document);
        for child in next {
            self.detach(child);
        }
    }

    fn text_of(&self, index: usize) -> String {
        let node = &self.nodes[index];
        let mut parts: Vec<String> = Vec::new();
        if !node.text.is_empty() {
            parts.push(node.text.clone());
        }
        for &child in &node.children {
            let text = self.text_of(child);
            if !text.is_empty() {
                parts.push(text);
            }
        }
        parts.join(" ")
    }

    fn input_type(&self, index: usize) -> Option<String> {
        let node = &self.nodes[index];
        (node.tag == "input").then(|| {
            node.attributes
                .get("type")
                .map_or_else(|| "text".to_string(), |t| t.to_lowercase())
        })
    }

    fn click(&mut self, index: usize) {
        let tag = self.nodes[index].tag.clone();
        let input_type = self.input_type(index);
        match (tag.as_str(), input_type.as_deref()) {
            ("input", Some("checkbox")) => {
                self.nodes[index].selected = !self.nodes[index].selected;
            }
            ("input", Some("radio")) => {
                let name = self.nodes[index].attributes.get("name").cloned();
                let document = self.nodes[index].document;
                let peers: Vec<usize> = self
                    .attached()
                    .filter(|&i| {
                        self.nodes[i].document == document
                            && self.input_type(i).as_deref() == Some("radio")
                            && self.nodes[i].attributes.get("name") == name.as_ref()
                    })
                    .collect();
                for peer in peers {
                    self.nodes[peer].selected = false;
                }
                self.nodes[index].selected = true;
            }
            ("option", _) => {
                if let Some(parent) = self.nodes[index].parent {
                    let siblings = self.nodes[parent].children.clone();
                    for sibling in siblings {
                        self.nodes[sibling].selected = false;
                    }
                }
                self.nodes[index].selected = true;
            }
            _ => {}
        }
        if let Some(message) = self.nodes[index].attributes.get("data-alert").cloned() {
            self.alert = Some(message);
        }
    }

    fn edit_value(&mut self, index: usize, edit: impl FnOnce(&mut String)) {
        let node = &mut self.nodes[index];
        if node.tag == "textarea" {
            edit(&mut node.text);
            let text = node.text.clone();
            node.attributes.insert("value".to_string(), text);
        } else {
            let value = node.attributes.entry("value".to_string()).or_default();
            edit(value);
        }
    }

    fn css_value(&self, index: usize, property: &str) -> String {
        self.nodes[index]
            .attributes
            .get("style")
            .and_then(|style| {
                style.split(';').find_map(|decl| {
                    let (name, value) = decl.split_once(':')?;
                    (name.trim() == property).then(|| value.trim().to_string())
                })
            })
            .unwrap_or_default()
    }

    fn is_displayed(&self, index: usize) -> bool {
        let node = &self.nodes[index];
        !node.attributes.contains_key("hidden")
            && self.input_type(index).as_deref() != Some("hidden")
            && self.css_value(index, "display") != "none"
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    fn find(&self, by: &By, root: Option<&NodeRef>) -> BackendResult<Vec<usize>> {
        if root.is_none() && self.transient {
            return Err(BackendError::Stale);
        }
        let (scope, include_self) = match root {
            Some(root) => (self.resolve(root)?, false),
            None => (self.current, true),
        };

        if let By::XPath(expr) = by {
            return self.xpath(expr, scope);
        }
        Ok(self
            .descendants(scope, include_self)
            .into_iter()
            .filter(|&i| self.matches(i, by))
            .collect())
    }

    fn matches(&self, index: usize, by: &By) -> bool {
        let node = &self.nodes[index];
        match by {
            By::Id(value) => node.attributes.get("id") == Some(value),
            By::Name(value) => node.attributes.get("name") == Some(value),
            By::TagName(tag) => node.tag.eq_ignore_ascii_case(tag),
            By::XPath(_) => false,
        }
    }

    fn xpath(&self, expr: &str, scope: usize) -> BackendResult<Vec<usize>> {
        let document = self.nodes[scope].document;
        // `None` stands for the document node above the root element
        let (mut contexts, mut descend, rest): (Vec<Option<usize>>, bool, &str) =
            if let Some(rest) = expr.strip_prefix(".//") {
                (vec![Some(scope)], true, rest)
            } else if let Some(rest) = expr.strip_prefix("//") {
                (vec![None], true, rest)
            } else if let Some(rest) = expr.strip_prefix("./") {
                (vec![Some(scope)], false, rest)
            } else if let Some(rest) = expr.strip_prefix('/') {
                (vec![None], false, rest)
            } else {
                (vec![Some(scope)], false, expr)
            };

        for raw in rest.split('/') {
            if raw.is_empty() {
                descend = true;
                continue;
            }
            let step = Step::parse(raw).ok_or_else(|| BackendError::Failed {
                operation: "xpath".to_string(),
                message: format!("unsupported expression {expr}"),
            })?;

            let mut next: Vec<Option<usize>> = Vec::new();
            for context in &contexts {
                for candidate in self.step_candidates(*context, document, descend) {
                    if step.accepts(self, candidate) && !next.contains(&Some(candidate)) {
                        next.push(Some(candidate));
                    }
                }
            }
            contexts = next;
            descend = false;
        }

        Ok(contexts.into_iter().flatten().collect())
    }

    fn step_candidates(&self, context: Option<usize>, document: usize, descend: bool) -> Vec<usize> {
        match (context, descend) {
            (None, true) => self.descendants(document, true),
            (None, false) => vec![document],
            (Some(index), true) => self.descendants(index, false),
            (Some(index), false) => self.nodes[index].children.clone(),
        }
    }
}

/// One location step of the supported XPath subset
#[derive(Debug)]
struct Step {
    tag: String,
    predicate: Predicate,
}

#[derive(Debug)]
enum Predicate {
    None,
    Position(usize),
    Attribute(String, String),
}

fn step_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^([A-Za-z][\w-]*|\*)(?:\[(?:(\d+)|@([\w-]+)\s*=\s*'([^']*)')\])?$")
            .expect("step pattern is a valid regex")
    })
}

impl Step {
    fn parse(raw: &str) -> Option<Self> {
        let captures = step_pattern().captures(raw.trim())?;
        let tag = captures.get(1)?.as_str().to_lowercase();
        let predicate = if let Some(position) = captures.get(2) {
            Predicate::Position(position.as_str().parse().ok()?)
        } else if let (Some(name), Some(value)) = (captures.get(3), captures.get(4)) {
            Predicate::Attribute(name.as_str().to_string(), value.as_str().to_string())
        } else {
            Predicate::None
        };
        Some(Self { tag, predicate })
    }

    fn accepts(&self, dom: &Dom, index: usize) -> bool {
        let node = &dom.nodes[index];
        if self.tag != "*" && node.tag != self.tag {
            return false;
        }
        match &self.predicate {
            Predicate::None => true,
            Predicate::Attribute(name, value) => node.attributes.get(name) == Some(value),
            Predicate::Position(position) => {
                let rank = node.parent.map_or(1, |parent| {
                    dom.nodes[parent]
                        .children
                        .iter()
                        .filter(|&&sibling| self.tag == "*" || dom.nodes[sibling].tag == self.tag)
                        .position(|&sibling| sibling == index)
                        .map_or(0, |p| p + 1)
                });
                rank == *position
            }
        }
    }
}

// =============================================================================
// MOCK BACKEND
// =============================================================================

/// In-memory backend for unit and scenario tests
#[derive(Debug)]
pub struct MockBackend {
    dom: Mutex<Dom>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new(MockElement::new("html").child(MockElement::new("body")))
    }
}

impl MockBackend {
    /// Backend showing `document` as its top-level page
    #[must_use]
    pub fn new(document: MockElement) -> Self {
        let mut dom = Dom {
            url: "about:blank".to_string(),
            ..Dom::default()
        };
        let top = dom.insert(&document, None, None);
        dom.top = top;
        dom.current = top;
        Self {
            dom: Mutex::new(dom),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Dom> {
        self.dom.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // =========================================================================
    // DOCUMENT MUTATION
    // =========================================================================

    /// Issue new handles for every node; all old handles become stale
    pub fn reload_page(&self) {
        let mut dom = self.lock();
        let top = dom.top;
        dom.regenerate(top);
        dom.history.push("reload_page".to_string());
    }

    /// Issue new handles for the subtree under the element with `id`
    pub fn replace_element(&self, id: &str) -> bool {
        let mut dom = self.lock();
        match dom.by_id_attribute(id) {
            Some(index) => {
                dom.regenerate(index);
                true
            }
            None => false,
        }
    }

    /// Detach the element with `id` and its subtree
    pub fn remove_element(&self, id: &str) -> bool {
        let mut dom = self.lock();
        let Some(index) = dom.by_id_attribute(id) else {
            return false;
        };
        if let Some(parent) = dom.nodes[index].parent {
            dom.nodes[parent].children.retain(|&child| child != index);
        }
        dom.detach(index);
        true
    }

    /// Append `element` under the element with `parent_id`, or the top root
    pub fn insert_element(&self, parent_id: Option<&str>, element: MockElement) -> bool {
        let mut dom = self.lock();
        let parent = match parent_id {
            Some(id) => match dom.by_id_attribute(id) {
                Some(index) => index,
                None => return false,
            },
            None => dom.top,
        };
        let document = dom.nodes[parent].document;
        let child = dom.insert(&element, Some(parent), Some(document));
        dom.nodes[parent].children.push(child);
        true
    }

    /// Set an attribute on the element with `id`
    pub fn set_attribute(&self, id: &str, name: &str, value: &str) -> bool {
        let mut dom = self.lock();
        match dom.by_id_attribute(id) {
            Some(index) => {
                dom.nodes[index].attributes.insert(name.to_string(), value.to_string());
                true
            }
            None => false,
        }
    }

    /// Make root-less lookups report staleness, as a document mid-navigation does
    pub fn set_document_transient(&self, transient: bool) {
        self.lock().transient = transient;
    }

    /// Make every `operation` (a [`NodeOp::name`]) fail with `message`
    pub fn fail_operations(&self, operation: &str, message: &str) {
        self.lock()
            .failures
            .insert(operation.to_string(), message.to_string());
    }

    /// Make the next `operation` (a [`NodeOp::name`]) report staleness
    pub fn stale_next(&self, operation: &str) {
        self.lock().stale_once.insert(operation.to_string());
    }

    /// Open an alert dialog
    pub fn open_alert(&self, text: &str) {
        self.lock().alert = Some(text.to_string());
    }

    // =========================================================================
    // INSPECTION
    // =========================================================================

    /// `value` attribute of the element with `id`
    #[must_use]
    pub fn value_of(&self, id: &str) -> Option<String> {
        let dom = self.lock();
        let index = dom.by_id_attribute(id)?;
        dom.nodes[index].attributes.get("value").cloned()
    }

    /// Selection state of the element with `id`
    #[must_use]
    pub fn is_selected(&self, id: &str) -> bool {
        let dom = self.lock();
        dom.by_id_attribute(id).is_some_and(|index| dom.nodes[index].selected)
    }

    /// Whether an alert is open
    #[must_use]
    pub fn has_alert(&self) -> bool {
        self.lock().alert.is_some()
    }

    /// `id` attribute of the frame whose document is active, `None` at top level
    #[must_use]
    #[allow(clippy::let_and_return)]
    pub fn active_frame_id(&self) -> Option<String> {
        let dom = self.lock();
        if dom.current == dom.top {
            return None;
        }
        let id = dom
            .attached()
            .find(|&i| dom.nodes[i].frame_document == Some(dom.current))
            .and_then(|i| dom.nodes[i].attributes.get("id").cloned());
        id
    }

    /// Calls recorded so far, e.g. `click:#buttonId` or `find_one:id=x`
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.lock().history.clone()
    }

    /// Forget recorded calls
    pub fn clear_history(&self) {
        self.lock().history.clear();
    }

    /// Check if a call starting with `method` was recorded
    #[must_use]
    pub fn was_called(&self, method: &str) -> bool {
        self.lock().history.iter().any(|call| call.starts_with(method))
    }
}

impl Backend for MockBackend {
    fn find_one(&self, by: &By, root: Option<&NodeRef>) -> BackendResult<NodeRef> {
        let mut dom = self.lock();
        dom.history.push(format!("find_one:{by}"));
        let found = dom.find(by, root)?;
        found
            .first()
            .map(|&index| dom.handle(index))
            .ok_or_else(|| BackendError::NotFound {
                query: by.to_string(),
            })
    }

    fn find_many(&self, by: &By, root: Option<&NodeRef>) -> BackendResult<Vec<NodeRef>> {
        let mut dom = self.lock();
        dom.history.push(format!("find_many:{by}"));
        let found = dom.find(by, root)?;
        Ok(found.into_iter().map(|index| dom.handle(index)).collect())
    }

    fn invoke(&self, node: &NodeRef, op: &NodeOp) -> BackendResult<Value> {
        let mut dom = self.lock();
        let index = dom.resolve(node)?;
        let call = format!("{}:{}", op.name(), dom.describe(index));
        dom.history.push(call);

        if dom.stale_once.remove(op.name()) {
            return Err(BackendError::Stale);
        }
        if let Some(message) = dom.failures.get(op.name()) {
            return Err(BackendError::Failed {
                operation: op.name().to_string(),
                message: message.clone(),
            });
        }

        let result = match op {
            NodeOp::Click => {
                dom.click(index);
                Value::Null
            }
            NodeOp::Submit => Value::Null,
            NodeOp::Clear => {
                dom.edit_value(index, String::clear);
                Value::Null
            }
            NodeOp::SendKeys(text) => {
                dom.edit_value(index, |value| value.push_str(text));
                Value::Null
            }
            NodeOp::TagName => Value::String(dom.nodes[index].tag.clone()),
            NodeOp::Attribute(name) => dom.nodes[index]
                .attributes
                .get(name)
                .cloned()
                .map_or(Value::Null, Value::String),
            NodeOp::Text => Value::String(dom.text_of(index)),
            NodeOp::IsSelected => Value::Bool(dom.nodes[index].selected),
            NodeOp::IsEnabled => Value::Bool(!dom.nodes[index].attributes.contains_key("disabled")),
            NodeOp::IsDisplayed => Value::Bool(dom.is_displayed(index)),
            NodeOp::CssValue(property) => Value::String(dom.css_value(index, property)),
        };
        Ok(result)
    }

    fn enter_context(&self, frame: &NodeRef) -> BackendResult<()> {
        let mut dom = self.lock();
        let index = dom.resolve(frame)?;
        let document = dom.nodes[index].frame_document.ok_or_else(|| BackendError::Failed {
            operation: "enter_context".to_string(),
            message: format!("<{}> has no frame document", dom.nodes[index].tag),
        })?;
        let call = format!("enter_context:{}", dom.describe(index));
        dom.history.push(call);
        dom.current = document;
        Ok(())
    }

    fn enter_default_context(&self) -> BackendResult<()> {
        let mut dom = self.lock();
        dom.history.push("enter_default_context".to_string());
        dom.current = dom.top;
        Ok(())
    }

    fn current_window(&self) -> BackendResult<String> {
        Ok("window-1".to_string())
    }

    fn screenshot(&self) -> BackendResult<Vec<u8>> {
        self.lock().history.push("screenshot".to_string());
        Ok(MOCK_SCREENSHOT.to_vec())
    }

    fn navigate(&self, url: &str) -> BackendResult<()> {
        let mut dom = self.lock();
        dom.history.push(format!("navigate:{url}"));
        dom.url = url.to_string();
        let top = dom.top;
        dom.regenerate(top);
        dom.current = top;
        Ok(())
    }

    fn current_url(&self) -> BackendResult<String> {
        Ok(self.lock().url.clone())
    }

    fn alert_text(&self) -> BackendResult<String> {
        self.lock().alert.clone().ok_or(BackendError::NoSuchAlert)
    }

    fn accept_alert(&self) -> BackendResult<()> {
        let mut dom = self.lock();
        dom.alert.take().ok_or(BackendError::NoSuchAlert)?;
        dom.history.push("accept_alert".to_string());
        Ok(())
    }

    fn dismiss_alert(&self) -> BackendResult<()> {
        let mut dom = self.lock();
        dom.alert.take().ok_or(BackendError::NoSuchAlert)?;
        dom.history.push("dismiss_alert".to_string());
        Ok(())
    }
}
