use crate::{
	attributes::{self, ACTIVATED},
	binder,
	bindings::{Bindings, Listener},
	config::Config,
	history::HistorySnapshot,
	styles,
	sync::InFlight,
	timer::Timeout,
	transport::{FetchTransport, Transport},
};
use core::{
	cell::{RefCell, RefMut},
	fmt::{self, Debug, Formatter},
};
use hashbrown::HashMap;
use std::rc::{Rc, Weak};
use tracing::{debug, error, info, instrument, trace, trace_span};
use wasm_bindgen::{closure::Closure, JsCast};
use web_sys::{Element, PopStateEvent};

/// An hx-dom engine instance: configuration, transport and the bookkeeping of everything it activated.
///
/// Cloning is cheap and yields a handle to the same instance.
/// Any number of instances may coexist, but each element is only ever activated by the first one to scan it.
#[derive(Clone)]
pub struct Engine(Rc<Inner>);

/// A non-owning [`Engine`] handle, as captured by DOM callbacks.
#[derive(Clone)]
pub(crate) struct WeakEngine(Weak<Inner>);

impl WeakEngine {
	pub(crate) fn upgrade(&self) -> Option<Engine> {
		self.0.upgrade().map(Engine)
	}
}

struct Inner {
	config: Config,
	transport: Box<dyn Transport>,
	state: RefCell<State>,
}

#[derive(Default)]
pub(crate) struct State {
	next_activation: u32,
	next_request: u64,
	pub(crate) bindings: Bindings,
	/// At most one pending debounce per (activation, trigger clause).
	pub(crate) debounce: HashMap<(u32, usize), Timeout>,
	/// Values collected by `hx-prompt`, sent with the next request only.
	pub(crate) prompts: HashMap<u32, String>,
	pub(crate) in_flight: InFlight,
	/// Bootstrap and `popstate` listeners.
	globals: Vec<Listener>,
}

impl Debug for Engine {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Engine").field("config", &self.0.config).finish_non_exhaustive()
	}
}

impl Engine {
	#[must_use]
	pub fn new(config: Config, transport: impl Transport + 'static) -> Self {
		Self(Rc::new(Inner {
			config,
			transport: Box::new(transport),
			state: RefCell::default(),
		}))
	}

	/// An engine that sends requests through `window.fetch`.
	#[must_use]
	pub fn with_fetch(config: Config) -> Self {
		Self::new(config, FetchTransport)
	}

	#[must_use]
	pub fn config(&self) -> &Config {
		&self.0.config
	}

	pub(crate) fn transport(&self) -> &dyn Transport {
		&*self.0.transport
	}

	pub(crate) fn downgrade(&self) -> WeakEngine {
		WeakEngine(Rc::downgrade(&self.0))
	}

	/// Borrows the mutable bookkeeping. Never hold this across DOM calls that may run page scripts.
	pub(crate) fn state(&self) -> RefMut<'_, State> {
		self.0.state.borrow_mut()
	}

	pub(crate) fn next_request_id(&self) -> u64 {
		let mut state = self.state();
		state.next_request += 1;
		state.next_request
	}

	/// The number of elements currently bound by this engine.
	#[must_use]
	pub fn binding_count(&self) -> usize {
		self.state().bindings.len()
	}

	/// Activates the page once the DOM is ready.
	///
	/// This processes `<body>`, installs the `popstate` handler and injects the default styles, as configured.
	#[instrument(skip(self))]
	pub fn start(&self) {
		let document = match web_sys::window().and_then(|window| window.document()) {
			Some(document) => document,
			None => return error!("No document to start on."),
		};

		if document.ready_state() != "loading" {
			return self.boot();
		}

		let engine = self.downgrade();
		let closure = Closure::wrap(Box::new(move |_: web_sys::Event| {
			if let Some(engine) = engine.upgrade() {
				engine.boot()
			}
		}) as Box<dyn FnMut(web_sys::Event)>);
		match Listener::add(&document, "DOMContentLoaded", closure) {
			Ok(listener) => self.state().globals.push(listener),
			Err(error) => error!("Failed to wait for DOMContentLoaded: {:?}", error),
		}
	}

	fn boot(&self) {
		let span = trace_span!("boot");
		let _enter = span.enter();

		let window = match web_sys::window() {
			Some(window) => window,
			None => return error!("No window to boot in."),
		};
		let document = match window.document() {
			Some(document) => document,
			None => return error!("No document to boot in."),
		};

		if let Some(body) = document.body() {
			self.process(&body);
		}

		if self.config().history_enabled {
			let engine = self.downgrade();
			let closure = Closure::wrap(Box::new(move |event: web_sys::Event| {
				let engine = match engine.upgrade() {
					Some(engine) => engine,
					None => return,
				};
				let state = match event.dyn_ref::<PopStateEvent>() {
					Some(event) => event.state(),
					None => return,
				};
				if let Some(snapshot) = HistorySnapshot::from_js(&state) {
					engine.restore_history(&snapshot)
				}
			}) as Box<dyn FnMut(web_sys::Event)>);
			match Listener::add(&window, "popstate", closure) {
				Ok(listener) => self.state().globals.push(listener),
				Err(error) => error!("Failed to install popstate handler: {:?}", error),
			}
		}

		if self.config().include_indicator_styles {
			styles::inject(&document, self.config());
		}

		info!("hx-dom started with {} binding(s).", self.binding_count());
	}

	/// Activates every not-yet-activated element in `root`, including `root` itself.
	///
	/// Bindings of elements that have left the document are released first.
	#[instrument(skip(self))]
	pub fn process(&self, root: &Element) {
		{
			let mut state = self.state();
			let drained = state.bindings.drain_disconnected();
			if !drained.is_empty() {
				state.debounce.retain(|(id, _), _| !drained.contains(id));
				state.prompts.retain(|id, _| !drained.contains(id));
			}
		}

		for (element, activation) in attributes::scan(root) {
			let id = {
				let mut state = self.state();
				state.next_activation += 1;
				state.next_activation
			};
			if let Err(error) = element.set_attribute(ACTIVATED, &id.to_string()) {
				error!("Failed to record activation: {:?}", error);
				continue;
			}

			let binding = binder::bind(self, &element, activation, id);
			self.state().bindings.insert(id, binding);
		}

		trace!("{} binding(s) after processing.", self.binding_count());
	}

	/// Restores a snapshot taken before a navigating swap, without a network round trip.
	#[instrument(skip(self, snapshot), fields(target = %snapshot.target))]
	pub fn restore_history(&self, snapshot: &HistorySnapshot) {
		let window = match web_sys::window() {
			Some(window) => window,
			None => return,
		};
		let target = match window.document().map(|document| document.query_selector(&snapshot.target)) {
			Some(Ok(Some(target))) => target,
			Some(Err(error)) => return error!("Invalid history target selector: {:?}", error),
			_ => return debug!("History target is gone. Not restoring."),
		};

		target.set_inner_html(&snapshot.content);
		attributes::clear_markers(&target);
		self.process(&target);
		window.scroll_to_with_x_and_y(0.0, snapshot.scroll_y);
	}

	/// Schedules `callback` for (`activation`, `clause`), replacing (and cancelling) any pending one.
	pub(crate) fn debounce(&self, activation: u32, clause: usize, millis: u32, callback: impl FnOnce() + 'static) {
		let timeout = Timeout::new(millis, callback);
		// The replaced timeout is dropped (and cleared) only after the borrow ends.
		let replaced = self.state().debounce.insert((activation, clause), timeout);
		if replaced.is_some() {
			trace!("Debounced pending trigger.");
		}
		drop(replaced);
	}

	/// Stashes a prompt answer for the next request of `activation`.
	pub(crate) fn stash_prompt(&self, activation: u32, value: String) {
		self.state().prompts.insert(activation, value);
	}

	/// Takes the stashed prompt answer for `element`, if any.
	pub(crate) fn take_prompt(&self, element: &Element) -> Option<String> {
		let activation = activation_id(element)?;
		self.state().prompts.remove(&activation)
	}
}

/// Reads back the id recorded by [`Engine::process`].
pub(crate) fn activation_id(element: &Element) -> Option<u32> {
	element.get_attribute(ACTIVATED)?.parse().ok()
}
