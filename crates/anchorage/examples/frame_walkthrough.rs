//! Example: Frame Walkthrough
//!
//! Demonstrates: nested frame contexts, stale recovery and table access
//!
//! Run with: `RUST_LOG=anchorage=info cargo run --example frame_walkthrough`
//!
//! Toyota Way: Genchi Genbutsu - every step reads back live page state

use anchorage::logging::init_tracing_with;
use anchorage::mock::{fixtures, MockBackend};
use anchorage::prelude::*;
use std::sync::Arc;

fn main() -> AnchorageResult<()> {
    init_tracing_with("anchorage=info");
    println!("=== Frame Walkthrough ===\n");

    // 1. Stale recovery
    println!("1. Clicking through a page reload...");
    let backend = Arc::new(MockBackend::new(fixtures::iframe_page()));
    let session = Session::with_config(
        backend.clone(),
        SessionConfig::default().with_wait(WaitOptions::new().with_timeout_secs(2)),
    );
    let mut open = Button::new(session.clone());
    open.load_by_id("buttonId")?;
    open.click()?;
    let before = open.element()?.node();
    backend.reload_page();
    open.click()?;
    println!("   node {} became {}", before, open.element()?.node());

    // 2. Nested frames
    println!("\n2. Entering nested frames...");
    let mut inner = FrameContext::new(session.clone());
    inner.load_by_id("iframeId_child")?;
    inner.add_component("field", TextField::new(session.clone()));

    let mut outer = FrameContext::new(session.clone());
    outer.load_by_id("iframeId")?;
    outer.add_component("inner", inner);
    outer.add_component("button", Button::new(session.clone()));
    outer.show()?;
    println!("   context stack: {:?}", session.context_stack());

    let inner = outer.get::<FrameContext>("inner")?;
    inner.show()?;
    println!("   context stack: {:?}", session.context_stack());

    let field = inner.get::<TextField>("field")?;
    field.load_by_id("textFieldGrandchild")?;
    field.fill("blablabla")?;
    println!("   grandchild field now holds {:?}", field.value()?);

    inner.hide()?;
    let button = outer.get::<Button>("button")?;
    button.load_by_id("buttonId_child")?;
    button.click()?;
    println!("   back in the outer frame, clicked {:?}", button.text()?);
    outer.hide()?;
    println!("   context stack: {:?}", session.context_stack());

    // 3. Tables
    println!("\n3. Reading a table...");
    let backend = Arc::new(MockBackend::new(fixtures::table_page()));
    let builder = ComponentBuilder::new(Session::new(backend));
    let mut table: Table = builder.by_id("tableId")?;
    for line in table.cells_by_line(TableSection::Body)? {
        let texts: Vec<String> = line.iter().map(Cell::text).collect::<AnchorageResult<_>>()?;
        println!("   {}", texts.join(" | "));
    }
    println!("   column 2: {} cells", table.column_cells(2)?.len());

    println!("\n=== Walkthrough complete ===");
    Ok(())
}
