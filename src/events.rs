//! Lifecycle events dispatched on request targets.

use core::fmt::{self, Display, Formatter};
use js_sys::{Object, Reflect};
use tracing::{error, trace};
use wasm_bindgen::JsValue;
use web_sys::{CustomEvent, CustomEventInit, Element};

/// The closed set of events a request may dispatch on its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleEvent {
	/// Cancelable. Preventing it skips the request entirely.
	BeforeRequest,
	AfterRequest,
	/// Cancelable. Preventing it leaves the DOM untouched.
	BeforeSwap,
	AfterSwap,
	AfterSettle,
	ResponseError,
}

impl LifecycleEvent {
	#[must_use]
	pub fn name(self) -> &'static str {
		match self {
			Self::BeforeRequest => "htmx:beforeRequest",
			Self::AfterRequest => "htmx:afterRequest",
			Self::BeforeSwap => "htmx:beforeSwap",
			Self::AfterSwap => "htmx:afterSwap",
			Self::AfterSettle => "htmx:afterSettle",
			Self::ResponseError => "htmx:responseError",
		}
	}

	#[must_use]
	pub fn cancelable(self) -> bool {
		matches!(self, Self::BeforeRequest | Self::BeforeSwap)
	}
}

impl Display for LifecycleEvent {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.write_str(self.name())
	}
}

/// Builds an event `detail` object.
#[derive(Debug)]
pub struct Detail(Object);

impl Detail {
	#[must_use]
	pub fn new() -> Self {
		Self(Object::new())
	}

	#[must_use]
	pub fn with(self, key: &str, value: impl Into<JsValue>) -> Self {
		if let Err(error) = Reflect::set(&self.0, &JsValue::from_str(key), &value.into()) {
			error!("Failed to set event detail {:?}: {:?}", key, error)
		}
		self
	}
}

impl Default for Detail {
	fn default() -> Self {
		Self::new()
	}
}

/// Dispatches `event` on `target`.
///
/// Returns `false` iff the event is cancelable and a listener prevented it.
/// Failing to dispatch at all is logged and counts as not prevented.
pub fn emit(target: &Element, event: LifecycleEvent, detail: Detail) -> bool {
	let mut init = CustomEventInit::new();
	init.bubbles(true).cancelable(event.cancelable()).detail(&detail.0);

	let custom_event = match CustomEvent::new_with_event_init_dict(event.name(), &init) {
		Ok(custom_event) => custom_event,
		Err(error) => {
			error!("Failed to create {}: {:?}", event, error);
			return true;
		}
	};

	match target.dispatch_event(&custom_event) {
		Ok(not_prevented) => {
			trace!(%event, not_prevented, "Dispatched lifecycle event.");
			not_prevented || !event.cancelable()
		}
		Err(error) => {
			error!("Failed to dispatch {}: {:?}", event, error);
			true
		}
	}
}
