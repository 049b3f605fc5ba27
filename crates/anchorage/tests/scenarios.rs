//! End-to-end scenarios against the in-memory backend
//!
//! Each scenario drives the public API the way a UI test would: load
//! components, interact, mutate the page underneath, and check that the
//! references held by the test keep working (or fail the documented way).

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use anchorage::logging::init_tracing;
use anchorage::mock::{fixtures, MockBackend, MockElement};
use anchorage::prelude::*;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const TIMEOUT_MS: u64 = 300;

fn session_on(page: MockElement) -> (Arc<MockBackend>, Session) {
    let _ = init_tracing();
    let backend = Arc::new(MockBackend::new(page));
    let config = SessionConfig::default()
        .with_wait(WaitOptions::new().with_timeout(TIMEOUT_MS).with_poll_interval(10));
    let session = Session::with_config(backend.clone(), config);
    (backend, session)
}

// =============================================================================
// STALE RECOVERY
// =============================================================================

#[test]
fn test_click_survives_page_reload() {
    let (backend, session) = session_on(fixtures::iframe_page());
    let mut button = Button::new(session);
    button.load_by_id("buttonId").unwrap();
    button.click().unwrap();

    let before = button.element().unwrap().node();
    backend.reload_page();
    button.click().unwrap();

    let after = button.element().unwrap().node();
    assert_ne!(before, after);
    let clicks = backend
        .history()
        .iter()
        .filter(|call| call.as_str() == "click:#buttonId")
        .count();
    assert_eq!(clicks, 2);
}

#[test]
fn test_replaced_subtree_is_found_again() {
    let (backend, session) = session_on(fixtures::form_page());
    let mut field = TextField::new(session);
    field.load_by_id("textId").unwrap();

    backend.replace_element("formId");
    field.fill("after ajax").unwrap();
    assert_eq!(backend.value_of("textId").as_deref(), Some("after ajax"));
}

#[test]
fn test_enumerated_elements_refuse_to_heal() {
    let (backend, session) = session_on(fixtures::form_page());
    let builder = ComponentBuilder::new(session);
    let mut radios = builder
        .load_all_by_attribute(WidgetKind::RadioButton, Some("formId"), "input", "name", "choice")
        .unwrap();
    assert_eq!(radios.len(), 2);

    backend.reload_page();
    let radio = radios[1].as_widget_mut::<RadioButton>().unwrap();
    assert!(matches!(radio.click(), Err(AnchorageError::StaleMultiResult { .. })));
}

#[test]
fn test_removed_element_becomes_unresolvable() {
    let (backend, session) = session_on(fixtures::form_page());
    let mut div = Div::new(session);
    div.load_by_id("divId").unwrap();
    backend.remove_element("divId");

    let start = Instant::now();
    let err = div.text().unwrap_err();
    assert!(matches!(err, AnchorageError::ElementUnresolvable { .. }));
    assert!(start.elapsed() >= Duration::from_millis(TIMEOUT_MS));
}

// =============================================================================
// LIFECYCLE
// =============================================================================

#[test]
fn test_missing_element_times_out() {
    let (_backend, session) = session_on(fixtures::form_page());
    let mut button = Button::new(session);

    let start = Instant::now();
    let err = button.load_by_id("doesNotExist").unwrap_err();
    let elapsed = start.elapsed();

    assert!(matches!(
        err,
        AnchorageError::ElementNotFound { ref locator, timeout_ms: TIMEOUT_MS } if locator == "id=doesNotExist"
    ));
    assert!(elapsed >= Duration::from_millis(TIMEOUT_MS));
    assert!(elapsed < Duration::from_millis(TIMEOUT_MS * 10));
}

#[test]
fn test_late_element_is_awaited() {
    let (backend, session) = session_on(fixtures::form_page());
    let writer = backend.clone();
    let handle = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        writer.insert_element(
            Some("divId"),
            MockElement::new("button").id("lateButton").text("Late"),
        );
    });

    let mut button = Button::new(session);
    button.load_by_id("lateButton").unwrap();
    handle.join().unwrap();
    assert_eq!(button.text().unwrap(), "Late");
}

#[test]
fn test_hide_then_show_replays_locator() {
    let (backend, session) = session_on(fixtures::form_page());
    let mut link = Link::new(session);
    link.load_by_id("linkId").unwrap();

    link.hide().unwrap();
    assert!(matches!(link.text(), Err(AnchorageError::ComponentNotVisible)));
    assert!(matches!(link.href(), Err(AnchorageError::ComponentNotVisible)));

    backend.clear_history();
    link.show().unwrap();
    assert!(backend.was_called("find_one:id=linkId"));
    assert_eq!(link.text().unwrap(), "Next page");
}

// =============================================================================
// FRAMES
// =============================================================================

#[test]
fn test_nested_frame_walkthrough() {
    let (backend, session) = session_on(fixtures::iframe_page());
    let browser = Browser::new(session.clone());

    let mut child = FrameContext::new(session.clone());
    child.load_by_id("iframeId_child").unwrap();
    child.add_component("field", TextField::new(session.clone()));

    let mut outer = FrameContext::new(session.clone());
    outer.load_by_id("iframeId").unwrap();
    outer.add_component("button", Button::new(session.clone()));
    outer.add_component("child", child);

    outer.show().unwrap();
    assert_eq!(session.context_stack(), vec![1]);
    assert!(browser.is_text_present("iFrame opened!").unwrap());

    let child = outer.get::<FrameContext>("child").unwrap();
    child.show().unwrap();
    assert_eq!(session.context_stack(), vec![1, 2]);
    assert!(browser.is_text_present("Grandchild iFrame opened!").unwrap());

    let field = child.get::<TextField>("field").unwrap();
    field.load_by_id("textFieldGrandchild").unwrap();
    field.fill("blablabla").unwrap();
    assert_eq!(field.value().unwrap(), "blablabla");

    child.hide().unwrap();
    assert_eq!(session.context_stack(), vec![1]);
    assert_eq!(backend.active_frame_id().as_deref(), Some("iframeId"));

    let button = outer.get::<Button>("button").unwrap();
    button.load_by_id("buttonId_child").unwrap();
    button.click().unwrap();
    assert!(backend.was_called("click:#buttonId_child"));

    outer.hide().unwrap();
    assert!(session.context_stack().is_empty());
    assert_eq!(backend.active_frame_id(), None);
}

#[test]
fn test_frame_survives_reload_while_inside() {
    let (backend, session) = session_on(fixtures::iframe_page());
    let mut outer = FrameContext::new(session.clone());
    outer.load_by_id("iframeId").unwrap();
    outer.add_component("field", TextField::new(session.clone()));
    outer.show().unwrap();

    let field = outer.get::<TextField>("field").unwrap();
    field.load_by_id("textFieldChild").unwrap();
    backend.replace_element("textFieldChild");
    field.fill("still here").unwrap();
    assert_eq!(backend.value_of("textFieldChild").as_deref(), Some("still here"));
}

#[test]
fn test_navigation_leaves_frames() {
    let (_backend, session) = session_on(fixtures::iframe_page());
    let browser = Browser::new(session.clone());
    let mut outer = FrameContext::new(session.clone());
    outer.load_by_id("iframeId").unwrap();
    outer.show().unwrap();

    browser.open("http://localhost/other").unwrap();
    assert!(session.context_stack().is_empty());
    assert_eq!(browser.current_url().unwrap(), "http://localhost/other");
}

// =============================================================================
// TABLES
// =============================================================================

#[test]
fn test_table_lines_and_columns() {
    let (_backend, session) = session_on(fixtures::table_page());
    let mut table = Table::new(session);
    table.load_by_id("tableId").unwrap();

    let body = table.cells_by_line(TableSection::Body).unwrap();
    let texts: Vec<Vec<String>> = body
        .iter()
        .map(|line| line.iter().map(|cell| cell.text().unwrap()).collect())
        .collect();
    assert_eq!(texts[0], vec!["data 1,1", "data 1,2", "data 1,3"]);
    assert_eq!(texts[2], vec!["data 3,1", "data 3,2", "data 3,3"]);

    let columns = table.cells_by_column(TableSection::Foot).unwrap();
    assert_eq!(columns.len(), 3);
    assert_eq!(columns[1][0].text().unwrap(), "foot 2");

    let head: Vec<String> = table.cells_by_line(TableSection::Head).unwrap()[0]
        .iter()
        .map(|cell| cell.text().unwrap())
        .collect();
    assert_eq!(head, vec!["head 1", "head 2", "head 3"]);
}

#[test]
fn test_cell_click_and_neighbouring_div() {
    let (backend, session) = session_on(fixtures::table_page());
    let builder = ComponentBuilder::new(session);
    let mut table: Table = builder.by_id("tableId").unwrap();

    let cell = table.cell(2, 2).unwrap();
    assert_eq!(cell.coordinate(), Coordinate { line: 2, column: 2 });
    cell.click().unwrap();
    assert!(backend.was_called("click:td"));

    let mut div: Div = builder.by_id("divId").unwrap();
    assert_eq!(div.text().unwrap(), "tab1");
}

// =============================================================================
// FORMS AND DIALOGS
// =============================================================================

#[test]
fn test_form_round_trip() {
    let (backend, session) = session_on(fixtures::form_page());
    let builder = ComponentBuilder::new(session);

    let mut name: TextField = builder.by_name("username").unwrap();
    name.fill("ana").unwrap();

    let mut terms: Checkbox = builder.by_id("checkboxId").unwrap();
    terms.check().unwrap();

    let mut color: Select = builder.by_id("selectId").unwrap();
    color.select_text("Blue").unwrap();

    let mut send: Button = builder.by_id("buttonId").unwrap();
    assert_eq!(send.button_type().unwrap(), Some(ButtonType::Submit));
    send.click().unwrap();

    assert_eq!(backend.value_of("textId").as_deref(), Some("ana"));
    assert!(backend.is_selected("checkboxId"));
    assert_eq!(color.selected().unwrap().map(|o| o.value), Some("b".to_string()));
}

#[test]
fn test_confirm_and_cancel_alerts() {
    let (backend, session) = session_on(fixtures::form_page());
    let browser = Browser::new(session.clone());
    let mut confirm: Button = ComponentBuilder::new(session).by_id("alertButton").unwrap();

    confirm.click().unwrap();
    let alert = browser.alert().unwrap();
    assert_eq!(alert.text(), "Confirmado");
    alert.confirm().unwrap();

    confirm.click().unwrap();
    browser.alert().unwrap().cancel().unwrap();
    assert!(!backend.has_alert());
    assert!(backend.was_called("dismiss_alert"));
}

#[test]
fn test_validators_on_live_components() {
    let (backend, session) = session_on(fixtures::form_page());
    let mut div: Div = ComponentBuilder::new(session).by_id("divId").unwrap();

    assert!(anchorage::validators::contains(&mut div, "class", "panel").unwrap());
    backend.set_attribute("divId", "class", "collapsed");
    assert!(anchorage::validators::is_equal(&mut div, "class", "Collapsed").unwrap());
    assert!(anchorage::validators::is_enabled(&mut div).unwrap());
}
