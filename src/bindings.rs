use crate::attributes::ACTIVATED;
use hashbrown::HashMap;
use tracing::{error, trace};
use wasm_bindgen::{closure::Closure, JsCast};
use web_sys::{Element, EventTarget, IntersectionObserver};

/// A DOM event listener that is removed again when dropped.
pub struct Listener {
	target: EventTarget,
	event: String,
	closure: Closure<dyn FnMut(web_sys::Event)>,
}

impl Listener {
	pub fn add(target: &EventTarget, event: &str, closure: Closure<dyn FnMut(web_sys::Event)>) -> Result<Self, wasm_bindgen::JsValue> {
		target.add_event_listener_with_callback(event, closure.as_ref().unchecked_ref())?;
		Ok(Self {
			target: target.clone(),
			event: event.to_owned(),
			closure,
		})
	}
}

impl Drop for Listener {
	fn drop(&mut self) {
		if let Err(error) = self.target.remove_event_listener_with_callback(&self.event, self.closure.as_ref().unchecked_ref()) {
			error!("Failed to remove {:?} listener: {:?}", self.event, error)
		}
	}
}

/// An intersection observer that disconnects when dropped.
pub struct Observer {
	observer: IntersectionObserver,
	_closure: Closure<dyn FnMut(js_sys::Array, IntersectionObserver)>,
}

impl Observer {
	pub fn new(observer: IntersectionObserver, closure: Closure<dyn FnMut(js_sys::Array, IntersectionObserver)>) -> Self {
		Self { observer, _closure: closure }
	}
}

impl Drop for Observer {
	fn drop(&mut self) {
		self.observer.disconnect()
	}
}

/// Everything bound for one activated element.
pub struct Binding {
	element: Element,
	listeners: Vec<Listener>,
	observers: Vec<Observer>,
}

impl Binding {
	#[must_use]
	pub fn new(element: Element) -> Self {
		Self {
			element,
			listeners: Vec::new(),
			observers: Vec::new(),
		}
	}

	pub fn push_listener(&mut self, listener: Listener) {
		self.listeners.push(listener)
	}

	pub fn push_observer(&mut self, observer: Observer) {
		self.observers.push(observer)
	}

	#[must_use]
	pub fn element(&self) -> &Element {
		&self.element
	}
}

/// Owns the [`Binding`]s of every activated element, keyed by activation id.
///
/// Bindings of elements that left the document are dropped by [`Bindings::drain_disconnected`].
#[derive(Default)]
pub struct Bindings(HashMap<u32, Binding>);

impl Bindings {
	pub fn insert(&mut self, id: u32, binding: Binding) {
		if self.0.insert(id, binding).is_some() {
			error!("hx-dom bug: Activation id {} was reused.", id)
		}
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.0.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Removes bindings whose element is no longer connected, clearing its activation record so it can be re-activated later.
	///
	/// Returns the removed ids. The caller must make sure none of the dropped closures is currently executing.
	pub fn drain_disconnected(&mut self) -> Vec<u32> {
		let disconnected: Vec<u32> = self.0.iter().filter(|(_, binding)| !binding.element.is_connected()).map(|(&id, _)| id).collect();
		for id in &disconnected {
			if let Some(binding) = self.0.remove(id) {
				if let Err(error) = binding.element.remove_attribute(ACTIVATED) {
					error!("Failed to clear activation record: {:?}", error)
				}
			}
		}
		if !disconnected.is_empty() {
			trace!("Freed {} binding(s).", disconnected.len());
		}
		disconnected
	}
}
