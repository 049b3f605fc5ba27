//! Ready-made mock documents
//!
//! Small pages shared by unit tests, scenario tests, benches and demos.

use super::MockElement;

/// Page with a frame holding a text field, a button and a nested frame
///
/// ```text
/// html/body
/// ├── button#buttonId
/// └── iframe#iframeId ── html/body
///     ├── p "iFrame opened!"
///     ├── input#textFieldChild
///     ├── button#buttonId_child
///     └── iframe#iframeId_child ── html/body
///         ├── p "Grandchild iFrame opened!"
///         └── input#textFieldGrandchild
/// ```
#[must_use]
pub fn iframe_page() -> MockElement {
    let grandchild = MockElement::new("html").child(
        MockElement::new("body")
            .child(MockElement::new("p").text("Grandchild iFrame opened!"))
            .child(
                MockElement::new("input")
                    .id("textFieldGrandchild")
                    .attr("type", "text"),
            ),
    );
    let child = MockElement::new("html").child(
        MockElement::new("body")
            .child(MockElement::new("p").text("iFrame opened!"))
            .child(
                MockElement::new("input")
                    .id("textFieldChild")
                    .attr("type", "text")
                    .attr("name", "child"),
            )
            .child(
                MockElement::new("button")
                    .id("buttonId_child")
                    .text("Child button"),
            )
            .child(
                MockElement::new("iframe")
                    .id("iframeId_child")
                    .frame_document(grandchild),
            ),
    );
    MockElement::new("html").child(
        MockElement::new("body")
            .child(MockElement::new("button").id("buttonId").text("Open frame"))
            .child(MockElement::new("iframe").id("iframeId").frame_document(child)),
    )
}

/// Page with a 3x3 table plus one head and one foot line
///
/// Head cells read `head N`, body cells `data L,C`, foot cells `foot N`.
#[must_use]
pub fn table_page() -> MockElement {
    let head = MockElement::new("thead").child(
        MockElement::new("tr").children((1..=3).map(|c| MockElement::new("th").text(format!("head {c}")))),
    );
    let body = MockElement::new("tbody").children((1..=3).map(|l| {
        MockElement::new("tr")
            .children((1..=3).map(move |c| MockElement::new("td").text(format!("data {l},{c}"))))
    }));
    let foot = MockElement::new("tfoot").child(
        MockElement::new("tr").children((1..=3).map(|c| MockElement::new("td").text(format!("foot {c}")))),
    );
    MockElement::new("html").child(
        MockElement::new("body")
            .child(
                MockElement::new("table")
                    .id("tableId")
                    .child(head)
                    .child(body)
                    .child(foot),
            )
            .child(MockElement::new("div").id("divId").text("tab1")),
    )
}

/// Page with one element of every widget kind
#[must_use]
pub fn form_page() -> MockElement {
    let form = MockElement::new("form")
        .id("formId")
        .child(MockElement::new("button").id("buttonId").attr("type", "submit").text("Send"))
        .child(MockElement::new("input").id("submitInput").attr("type", "submit").attr("value", "Go"))
        .child(MockElement::new("input").id("fileInput").attr("type", "file"))
        .child(MockElement::new("img").id("imageButton").attr("src", "go.png"))
        .child(
            MockElement::new("input")
                .id("textId")
                .attr("type", "text")
                .attr("name", "username")
                .attr("class", "Field"),
        )
        .child(MockElement::new("input").id("untypedId").attr("name", "untyped"))
        .child(MockElement::new("input").id("passwordId").attr("type", "password"))
        .child(MockElement::new("input").id("emailId").attr("type", "EMAIL"))
        .child(MockElement::new("input").id("hiddenId").attr("type", "hidden"))
        .child(MockElement::new("input").id("checkboxId").attr("type", "checkbox"))
        .child(
            MockElement::new("input")
                .id("checkedId")
                .attr("type", "checkbox")
                .attr("checked", "checked"),
        )
        .child(MockElement::new("input").id("radioA").attr("type", "radio").attr("name", "choice"))
        .child(MockElement::new("input").id("radioB").attr("type", "radio").attr("name", "choice"))
        .child(MockElement::new("textarea").id("areaId").text("draft"))
        .child(
            MockElement::new("select")
                .id("selectId")
                .attr("name", "color")
                .child(MockElement::new("option").attr("value", "r").text("Red"))
                .child(MockElement::new("option").attr("value", "g").text("Green"))
                .child(MockElement::new("option").attr("value", "b").text("Blue")),
        )
        .child(
            MockElement::new("input")
                .id("disabledId")
                .attr("type", "text")
                .attr("disabled", "disabled"),
        );

    MockElement::new("html").child(
        MockElement::new("body")
            .child(form)
            .child(MockElement::new("a").id("linkId").attr("href", "/next").text("Next page"))
            .child(
                MockElement::new("div")
                    .id("divId")
                    .attr("class", "panel wide")
                    .text("Panel content"),
            )
            .child(MockElement::new("span").id("spanId").text("generic text"))
            .child(
                MockElement::new("button")
                    .id("alertButton")
                    .attr("type", "button")
                    .attr("data-alert", "Confirmado")
                    .text("Confirm"),
            ),
    )
}
