#![allow(dead_code)]

use async_trait::async_trait;
use futures::{
	channel::oneshot,
	future::{self, Either},
};
use hx_dom::{Config, Engine, Error, HxRequest, HxResponse, Result, Transport};
use js_sys::Promise;
use std::{cell::RefCell, rc::Rc, sync::Once};
use wasm_bindgen::{closure::Closure, JsCast};
use wasm_bindgen_futures::JsFuture;
use web_sys::{window, AbortSignal, Document, Element, HtmlElement};

/// Records requests and answers them with canned HTML.
///
/// A gated transport holds every response until [`MockTransport::open_gates`]. Aborts are honoured while waiting.
#[derive(Clone, Default)]
pub struct MockTransport(Rc<RefCell<State>>);

#[derive(Default)]
struct State {
	reply: String,
	redirect: Option<String>,
	refresh: Option<String>,
	failure: Option<String>,
	gated: bool,
	gates: Vec<oneshot::Sender<()>>,
	requests: Vec<HxRequest>,
	aborted: usize,
}

impl MockTransport {
	pub fn replying(html: &str) -> Self {
		let transport = Self::default();
		transport.0.borrow_mut().reply = html.to_owned();
		transport
	}

	pub fn failing(message: &str) -> Self {
		let transport = Self::default();
		transport.0.borrow_mut().failure = Some(message.to_owned());
		transport
	}

	/// Answers with an `HX-Redirect` header.
	pub fn redirecting(self, location: &str) -> Self {
		self.0.borrow_mut().redirect = Some(location.to_owned());
		self
	}

	/// Answers with `HX-Refresh: true`.
	pub fn refreshing(self) -> Self {
		self.0.borrow_mut().refresh = Some("true".to_owned());
		self
	}

	pub fn gated(self) -> Self {
		self.0.borrow_mut().gated = true;
		self
	}

	pub fn open_gates(&self) {
		for gate in self.0.borrow_mut().gates.drain(..) {
			gate.send(()).ok();
		}
	}

	pub fn requests(&self) -> Vec<HxRequest> {
		self.0.borrow().requests.clone()
	}

	pub fn count(&self) -> usize {
		self.0.borrow().requests.len()
	}

	pub fn aborted(&self) -> usize {
		self.0.borrow().aborted
	}
}

#[async_trait(?Send)]
impl Transport for MockTransport {
	async fn send(&self, request: HxRequest, signal: &AbortSignal) -> Result<HxResponse> {
		let gate = {
			let mut state = self.0.borrow_mut();
			state.requests.push(request);
			if state.gated {
				let (sender, receiver) = oneshot::channel();
				state.gates.push(sender);
				Some(receiver)
			} else {
				None
			}
		};

		if let Some(gate) = gate {
			if let Either::Right(_) = future::select(gate, abort_of(signal)).await {
				self.0.borrow_mut().aborted += 1;
				return Err(Error::Aborted);
			}
		}

		let state = self.0.borrow();
		match &state.failure {
			Some(message) => Err(Error::Transport(message.clone())),
			None => Ok(HxResponse {
				status: 200,
				redirect: state.redirect.clone(),
				refresh: state.refresh.clone(),
				text: state.reply.clone(),
			}),
		}
	}
}

fn abort_of(signal: &AbortSignal) -> JsFuture {
	let signal = signal.clone();
	JsFuture::from(Promise::new(&mut |resolve, _| signal.set_onabort(Some(&resolve))))
}

pub fn init_logging() {
	static LOGGING: Once = Once::new();
	LOGGING.call_once(tracing_wasm::set_as_global_default);
}

pub fn document() -> Document {
	window().unwrap().document().unwrap()
}

/// Appends a fresh `<div>` with `html` to `<body>`.
pub fn fixture(html: &str) -> Element {
	let container = document().create_element("div").unwrap();
	container.set_inner_html(html);
	document().body().unwrap().append_child(&container).unwrap();
	container
}

pub fn test_config() -> Config {
	Config {
		include_indicator_styles: false,
		history_enabled: false,
		default_settle_delay: 0,
		..Config::default()
	}
}

pub fn engine(transport: &MockTransport) -> Engine {
	engine_with(transport, test_config())
}

pub fn engine_with(transport: &MockTransport, config: Config) -> Engine {
	init_logging();
	Engine::new(config, transport.clone())
}

pub fn by_id(id: &str) -> HtmlElement {
	document().get_element_by_id(id).unwrap().dyn_into().unwrap()
}

/// Waits for spawned dispatches, timers and settles to run.
pub async fn idle(millis: u32) {
	hx_dom::timer::sleep(millis).await
}

/// Counts `event` on `target`. The listener stays for the rest of the test run.
pub fn count_events(target: &Element, event: &str) -> Rc<RefCell<Vec<web_sys::Event>>> {
	let seen = Rc::new(RefCell::new(Vec::new()));
	let closure = Closure::wrap(Box::new({
		let seen = Rc::clone(&seen);
		move |event: web_sys::Event| seen.borrow_mut().push(event)
	}) as Box<dyn FnMut(web_sys::Event)>);
	target.add_event_listener_with_callback(event, closure.as_ref().unchecked_ref()).unwrap();
	closure.forget();
	seen
}
