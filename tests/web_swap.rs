#![cfg(target_arch = "wasm32")]

use hx_dom::{
	events::LifecycleEvent,
	history::HistorySnapshot,
	swap::{self, SwapOutcome},
	SwapStrategy,
};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_test::{wasm_bindgen_test, wasm_bindgen_test_configure};
use web_sys::{window, CustomEvent};

wasm_bindgen_test_configure!(run_in_browser);

mod web_transport_;
use web_transport_::{by_id, count_events, document, engine, fixture, idle, MockTransport};

#[wasm_bindgen_test]
async fn inner_html_lands_verbatim() {
	let html = r#"<p class="greeting">Hello <em>hx-dom</em>!</p><ul><li>1</li><li>2</li></ul>"#;
	let transport = MockTransport::replying(html);
	let engine = engine(&transport);
	let container = fixture(r##"<button id="load-greeting" hx-get="/greeting" hx-target="#greeting">Load</button><div id="greeting">Loading…</div>"##);
	engine.process(&container);

	let swapped = count_events(&by_id("greeting"), LifecycleEvent::AfterSwap.name());
	let settled = count_events(&by_id("greeting"), LifecycleEvent::AfterSettle.name());
	by_id("load-greeting").click();
	idle(50).await;

	assert_eq!(by_id("greeting").inner_html(), html);
	assert_eq!(swapped.borrow().len(), 1);
	assert_eq!(settled.borrow().len(), 1);
	assert!(!by_id("load-greeting").class_list().contains("htmx-request"));

	container.remove();
}

#[wasm_bindgen_test]
fn open_details_survive_a_swap() {
	let container = fixture(r#"<div id="preserving"><details id="d1" hx-preserve open><summary>More</summary>Body</details><p>old</p></div>"#);
	let target = by_id("preserving");
	let details = by_id("d1");

	let outcome = swap::swap(&document(), &target, r#"<details id="d1"><summary>More</summary>Fresh</details><p>new</p>"#, SwapStrategy::InnerHtml, None).unwrap();

	assert!(matches!(outcome, SwapOutcome::Target));
	let after = by_id("d1");
	assert_eq!(after, details);
	assert!(after.has_attribute("open"));
	assert!(target.inner_html().contains("<p>new</p>"));

	container.remove();
}

#[wasm_bindgen_test]
fn outer_html_reports_the_parent() {
	let container = fixture(r#"<section id="outer-parent"><div id="outer">old</div></section>"#);

	let outcome = swap::swap(&document(), &by_id("outer"), r#"<div id="outer-new">new</div>"#, SwapStrategy::OuterHtml, None).unwrap();

	match outcome {
		SwapOutcome::Parent(Some(parent)) => assert_eq!(parent.id(), "outer-parent"),
		other => panic!("Unexpected outcome: {:?}", other),
	}
	assert!(document().get_element_by_id("outer").is_none());
	assert_eq!(by_id("outer-new").text_content().as_deref(), Some("new"));

	container.remove();
}

#[wasm_bindgen_test]
async fn missing_target_has_no_side_effects() {
	let transport = MockTransport::replying("never");
	let engine = engine(&transport);
	let container = fixture(r##"<button id="nowhere" hx-get="/x" hx-target="#does-not-exist" hx-sync="this:drop">Go</button>"##);
	engine.process(&container);

	let lifecycle: Vec<_> = [LifecycleEvent::BeforeRequest, LifecycleEvent::AfterRequest, LifecycleEvent::BeforeSwap, LifecycleEvent::ResponseError]
		.iter()
		.map(|event| count_events(&container, event.name()))
		.collect();
	by_id("nowhere").click();
	idle(20).await;

	assert_eq!(transport.count(), 0);
	assert!(lifecycle.iter().all(|seen| seen.borrow().is_empty()), "No lifecycle event may fire without a target.");
	let button = by_id("nowhere");
	assert!(!button.class_list().contains("htmx-request"));
	assert!(!button.has_attribute("data-htmx-requesting"));

	container.remove();
}

#[wasm_bindgen_test]
async fn before_request_can_cancel() {
	let transport = MockTransport::replying("never");
	let engine = engine(&transport);
	let container = fixture(r#"<button id="vetoed" hx-get="/x" hx-disable hx-disable-with="Wait…">Go</button>"#);
	engine.process(&container);

	let veto = wasm_bindgen::closure::Closure::wrap(Box::new(|event: web_sys::Event| event.prevent_default()) as Box<dyn FnMut(web_sys::Event)>);
	let button = by_id("vetoed");
	button.add_event_listener_with_callback(LifecycleEvent::BeforeRequest.name(), veto.as_ref().unchecked_ref()).unwrap();

	button.click();
	idle(20).await;

	assert_eq!(transport.count(), 0);
	assert_eq!(button.inner_html(), "Go");
	assert!(!button.class_list().contains("htmx-request"));
	assert_eq!(js_sys::Reflect::get(&button, &JsValue::from_str("disabled")).unwrap(), JsValue::FALSE);

	button.remove_event_listener_with_callback(LifecycleEvent::BeforeRequest.name(), veto.as_ref().unchecked_ref()).unwrap();
	container.remove();
}

#[wasm_bindgen_test]
async fn transport_failures_are_reported() {
	let transport = MockTransport::failing("offline");
	let engine = engine(&transport);
	let container = fixture(r##"<button id="failing" hx-post="/x" hx-target="#failing-target">Go</button><div id="failing-target">unchanged</div>"##);
	engine.process(&container);

	let errors = count_events(&by_id("failing-target"), LifecycleEvent::ResponseError.name());
	by_id("failing").click();
	idle(20).await;

	assert_eq!(transport.count(), 1);
	assert_eq!(by_id("failing-target").inner_html(), "unchanged");
	let errors = errors.borrow();
	assert_eq!(errors.len(), 1);
	let detail = errors[0].dyn_ref::<CustomEvent>().unwrap().detail();
	let message = js_sys::Reflect::get(&detail, &JsValue::from_str("error")).unwrap().as_string().unwrap();
	assert!(message.contains("offline"), "{:?}", message);
	assert!(!by_id("failing").class_list().contains("htmx-request"));

	container.remove();
}

#[wasm_bindgen_test]
async fn push_url_records_the_previous_content() {
	let window = window().unwrap();
	let original_url = window.location().href().unwrap();

	let transport = MockTransport::replying("<p>page two</p>");
	let engine = engine(&transport);
	let container = fixture(r##"<a id="next-page" hx-get="?page=2" hx-target="#paged" hx-push-url="true">Next</a><main id="paged"><p>page one</p></main>"##);
	engine.process(&container);

	by_id("next-page").click();
	idle(50).await;

	assert_eq!(by_id("paged").inner_html(), "<p>page two</p>");
	assert_eq!(window.location().search().unwrap(), "?page=2");
	let snapshot = HistorySnapshot::from_js(&window.history().unwrap().state().unwrap()).expect("A snapshot should have been pushed.");
	assert_eq!(snapshot.content, "<p>page one</p>");
	assert_eq!(snapshot.target, "#paged");

	engine.restore_history(&snapshot);
	assert_eq!(by_id("paged").inner_html(), "<p>page one</p>");

	window.history().unwrap().replace_state_with_url(&JsValue::NULL, "", Some(&original_url)).unwrap();
	container.remove();
}

#[wasm_bindgen_test]
async fn restored_history_is_bound_again() {
	let window = window().unwrap();
	let original_url = window.location().href().unwrap();

	let transport = MockTransport::replying("<p>chapter two</p>");
	let engine = engine(&transport);
	let container = fixture(
		r##"<main id="chapters"><button id="next-chapter" hx-get="?chapter=2" hx-target="#chapters" hx-push-url="true">Next</button><span id="chapter-lock" data-htmx-requesting="99"></span></main>"##,
	);
	engine.process(&container);

	by_id("next-chapter").click();
	idle(50).await;
	assert_eq!(transport.count(), 1);
	assert_eq!(by_id("chapters").inner_html(), "<p>chapter two</p>");

	let snapshot = HistorySnapshot::from_js(&window.history().unwrap().state().unwrap()).expect("A snapshot should have been pushed.");
	assert!(!snapshot.content.contains("data-htmx-setup"), "{:?}", snapshot.content);
	assert!(!snapshot.content.contains("data-htmx-requesting"), "{:?}", snapshot.content);

	engine.restore_history(&snapshot);
	let button = by_id("next-chapter");
	assert!(button.has_attribute("data-htmx-setup"));
	assert!(!by_id("chapter-lock").has_attribute("data-htmx-requesting"));

	button.click();
	idle(50).await;
	assert_eq!(transport.count(), 2, "Restored content should dispatch again.");

	window.history().unwrap().replace_state_with_url(&JsValue::NULL, "", Some(&original_url)).unwrap();
	container.remove();
}

#[wasm_bindgen_test]
async fn replace_url_records_the_previous_content() {
	let window = window().unwrap();
	let history = window.history().unwrap();
	let original_url = window.location().href().unwrap();

	let transport = MockTransport::replying("<p>tab two</p>");
	let engine = engine(&transport);
	let container = fixture(r##"<button id="second-tab" hx-get="?tab=2" hx-target="#tabbed" hx-replace-url="true">Tab</button><section id="tabbed"><p>tab one</p></section>"##);
	engine.process(&container);

	let entries = history.length().unwrap();
	by_id("second-tab").click();
	idle(50).await;

	assert_eq!(by_id("tabbed").inner_html(), "<p>tab two</p>");
	assert_eq!(window.location().search().unwrap(), "?tab=2");
	assert_eq!(history.length().unwrap(), entries, "Replacing must not add an entry.");
	let snapshot = HistorySnapshot::from_js(&history.state().unwrap()).expect("The replaced entry should carry a snapshot.");
	assert_eq!(snapshot.content, "<p>tab one</p>");
	assert_eq!(snapshot.target, "#tabbed");

	history.replace_state_with_url(&JsValue::NULL, "", Some(&original_url)).unwrap();
	container.remove();
}

#[wasm_bindgen_test]
async fn select_swaps_only_the_matching_fragment() {
	let transport = MockTransport::replying(r#"<header>chrome</header><div id="fragment"><b>wanted</b></div><footer>chrome</footer>"#);
	let engine = engine(&transport);
	let container = fixture(r##"<button id="selecting" hx-get="/page" hx-target="#selected" hx-select="#fragment">Go</button><div id="selected">old</div>"##);
	engine.process(&container);

	by_id("selecting").click();
	idle(50).await;

	assert_eq!(by_id("selected").inner_html(), "<b>wanted</b>");

	container.remove();
}

#[wasm_bindgen_test]
async fn delete_removes_the_target_later() {
	let container = fixture(r#"<div id="doomed">bye</div>"#);
	let target = by_id("doomed");

	let outcome = swap::swap(&document(), &target, "<p>ignored</p>", SwapStrategy::Delete, None).unwrap();

	assert!(matches!(outcome, SwapOutcome::Nothing));
	assert!(target.is_connected(), "Removal is deferred.");
	assert_eq!(target.inner_html(), "bye");
	idle(10).await;
	assert!(!target.is_connected());
	assert!(document().get_element_by_id("doomed").is_none());

	container.remove();
}

#[wasm_bindgen_test]
fn none_leaves_the_target_alone() {
	let container = fixture(r#"<div id="untouched"><p>as is</p></div>"#);

	let outcome = swap::swap(&document(), &by_id("untouched"), "<p>ignored</p>", SwapStrategy::None, None).unwrap();

	assert!(matches!(outcome, SwapOutcome::Nothing));
	assert_eq!(by_id("untouched").inner_html(), "<p>as is</p>");

	container.remove();
}

#[wasm_bindgen_test]
fn siblings_report_the_parent() {
	let container = fixture(r#"<ol id="siblings"><li id="middle">2</li></ol>"#);

	for (strategy, html) in [(SwapStrategy::BeforeBegin, "<li>1</li>"), (SwapStrategy::AfterEnd, "<li>3</li>")].iter().copied() {
		match swap::swap(&document(), &by_id("middle"), html, strategy, None).unwrap() {
			SwapOutcome::Parent(Some(parent)) => assert_eq!(parent.id(), "siblings"),
			other => panic!("Unexpected outcome for {}: {:?}", strategy, other),
		}
	}

	assert_eq!(by_id("siblings").inner_html(), r#"<li>1</li><li id="middle">2</li><li>3</li>"#);

	container.remove();
}

#[wasm_bindgen_test]
fn nested_preserved_elements_survive_together() {
	let container = fixture(
		r#"<div id="nesting"><section id="outer-kept" hx-preserve><details id="inner-kept" data-hx-preserve open><summary>S</summary>live</details></section><p>old</p></div>"#,
	);
	let outer = by_id("outer-kept");
	let inner = by_id("inner-kept");

	let html = r#"<section id="outer-kept"><details id="inner-kept"><summary>S</summary>fresh</details></section><p>new</p>"#;
	swap::swap(&document(), &by_id("nesting"), html, SwapStrategy::InnerHtml, None).unwrap();

	assert_eq!(by_id("outer-kept"), outer);
	assert_eq!(by_id("inner-kept"), inner);
	assert_eq!(inner.parent_element().map(|parent| parent.id()).as_deref(), Some("outer-kept"));
	assert!(inner.has_attribute("open"));
	assert!(by_id("nesting").inner_html().ends_with("<p>new</p>"));

	container.remove();
}
