#![cfg(target_arch = "wasm32")]

use hx_dom::events::LifecycleEvent;
use wasm_bindgen_test::{wasm_bindgen_test, wasm_bindgen_test_configure};

wasm_bindgen_test_configure!(run_in_browser);

mod web_transport_;
use web_transport_::{by_id, count_events, engine, fixture, idle, MockTransport};

const FLAG: &str = "data-htmx-requesting";

#[wasm_bindgen_test]
async fn drop_ignores_requests_while_busy() {
	let transport = MockTransport::replying("<b>done</b>").gated();
	let engine = engine(&transport);
	let container = fixture(r##"<button id="dropping" hx-get="/slow" hx-target="#dropping-out" hx-sync="this:drop">Go</button><div id="dropping-out"></div>"##);
	engine.process(&container);

	let button = by_id("dropping");
	button.click();
	idle(10).await;
	assert!(button.has_attribute(FLAG));

	button.click();
	button.click();
	idle(10).await;
	assert_eq!(transport.count(), 1);

	transport.open_gates();
	idle(20).await;
	assert!(!button.has_attribute(FLAG));
	assert_eq!(by_id("dropping-out").inner_html(), "<b>done</b>");

	button.click();
	idle(10).await;
	assert_eq!(transport.count(), 2, "The element should accept requests again once idle.");
	transport.open_gates();
	idle(20).await;

	container.remove();
}

#[wasm_bindgen_test]
async fn abort_cancels_the_request_in_flight() {
	let transport = MockTransport::replying("<b>latest</b>").gated();
	let engine = engine(&transport);
	let container = fixture(r##"<form id="aborting-form"><button id="aborting" type="button" hx-post="/slow" hx-target="#aborting-out" hx-sync="#aborting-form:abort">Go</button></form><div id="aborting-out"></div>"##);
	engine.process(&container);

	let errors = count_events(&by_id("aborting-out"), LifecycleEvent::ResponseError.name());
	let swaps = count_events(&by_id("aborting-out"), LifecycleEvent::AfterSwap.name());
	let button = by_id("aborting");
	let form = by_id("aborting-form");

	button.click();
	idle(10).await;
	let first_owner = form.get_attribute(FLAG).expect("The form coordinates the request.");

	button.click();
	idle(10).await;
	assert_eq!(transport.count(), 2);
	assert_eq!(transport.aborted(), 1, "The first request should have been cancelled.");
	let second_owner = form.get_attribute(FLAG).expect("The second request owns the flag now.");
	assert_ne!(first_owner, second_owner);

	transport.open_gates();
	idle(20).await;

	assert_eq!(errors.borrow().len(), 0, "Aborted requests are not errors.");
	assert_eq!(swaps.borrow().len(), 1);
	assert_eq!(by_id("aborting-out").inner_html(), "<b>latest</b>");
	assert!(!form.has_attribute(FLAG));

	container.remove();
}

#[wasm_bindgen_test]
async fn drop_silences_every_element_sharing_the_lock() {
	let transport = MockTransport::replying("<b>first</b>").gated();
	let engine = engine(&transport);
	let container = fixture(
		r##"<div id="shared-lock"></div><button id="lock-first" hx-get="/first" hx-target="#first-out" hx-sync="#shared-lock:drop">1</button><button id="lock-second" hx-get="/second" hx-target="#second-out" hx-sync="#shared-lock:drop">2</button><div id="first-out"></div><div id="second-out">untouched</div>"##,
	);
	engine.process(&container);

	let count = |id: &str, event: LifecycleEvent| count_events(&by_id(id), event.name());
	let first_before = count("first-out", LifecycleEvent::BeforeRequest);
	let first_after = count("first-out", LifecycleEvent::AfterRequest);
	let second_before = count("second-out", LifecycleEvent::BeforeRequest);
	let second_after = count("second-out", LifecycleEvent::AfterRequest);
	let second_errors = count("second-out", LifecycleEvent::ResponseError);
	let lock = by_id("shared-lock");

	by_id("lock-first").click();
	idle(10).await;
	assert!(lock.has_attribute(FLAG));
	assert_eq!(first_before.borrow().len(), 1);

	by_id("lock-second").click();
	by_id("lock-second").click();
	idle(10).await;
	assert_eq!(transport.count(), 1);
	assert_eq!(transport.requests()[0].url, "/first");
	assert_eq!(second_before.borrow().len(), 0);
	assert_eq!(second_after.borrow().len(), 0);
	assert_eq!(second_errors.borrow().len(), 0);
	assert!(!by_id("lock-second").class_list().contains("htmx-request"));

	transport.open_gates();
	idle(20).await;
	assert_eq!(first_after.borrow().len(), 1);
	assert!(!lock.has_attribute(FLAG));
	assert_eq!(by_id("first-out").inner_html(), "<b>first</b>");
	assert_eq!(by_id("second-out").inner_html(), "untouched");

	by_id("lock-second").click();
	idle(10).await;
	assert_eq!(transport.count(), 2, "The lock should admit the other element once idle.");
	assert_eq!(second_before.borrow().len(), 1);
	transport.open_gates();
	idle(20).await;

	container.remove();
}
