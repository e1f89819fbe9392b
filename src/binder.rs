//! Binds trigger clauses to DOM listeners and intersection observers.

use crate::{
	attributes::{self, Activation, RequestDescriptor, HX_CONFIRM, HX_PROMPT, HX_TRIGGER, TRIGGERED},
	bindings::{Binding, Listener, Observer},
	engine::{Engine, WeakEngine},
	trigger::{self, Modifiers, TriggerEvent, TriggerSpec},
};
use tracing::{debug, error, instrument, trace, trace_span, warn};
use wasm_bindgen::{closure::Closure, JsCast, JsValue};
use web_sys::{Element, HtmlElement, IntersectionObserver, IntersectionObserverEntry, IntersectionObserverInit};

/// Binds every trigger clause of `element`.
#[instrument(skip(engine))]
pub(crate) fn bind(engine: &Engine, element: &Element, activation: Activation, id: u32) -> Binding {
	let mut binding = Binding::new(element.clone());

	match activation {
		Activation::BoostedAnchor => bind_boosted(engine, &mut binding, activation, "click"),
		Activation::BoostedForm => bind_boosted(engine, &mut binding, activation, "submit"),
		Activation::Explicit(_) => {
			let triggers = trigger::parse_triggers(element.get_attribute(HX_TRIGGER).as_deref(), attributes::is_form(element));
			for (clause, spec) in triggers.into_iter().enumerate() {
				let span = trace_span!("Binding trigger clause", clause, event = %spec.event);
				let _enter = span.enter();
				let clause = Clause {
					engine: engine.downgrade(),
					element: element.clone(),
					activation,
					id,
					index: clause,
					spec,
				};
				match clause.spec.event {
					TriggerEvent::Load => bind_load(clause, &mut binding),
					TriggerEvent::Revealed | TriggerEvent::Intersect => bind_observer(clause, &mut binding),
					TriggerEvent::Dom(_) => bind_listener(clause, &mut binding),
				}
			}
		}
	}

	binding
}

/// One trigger clause of one activated element.
#[derive(Clone)]
struct Clause {
	engine: WeakEngine,
	element: Element,
	activation: Activation,
	id: u32,
	index: usize,
	spec: TriggerSpec,
}

impl Clause {
	fn modifiers(&self) -> &Modifiers {
		&self.spec.modifiers
	}

	fn already_triggered(&self) -> bool {
		self.element.has_attribute(TRIGGERED)
	}

	fn mark_triggered(&self) {
		if self.modifiers().once {
			if let Err(error) = self.element.set_attribute(TRIGGERED, "true") {
				error!("Failed to mark element as triggered: {:?}", error)
			}
		}
	}

	/// Fires now, or after the debounce interval if there is one.
	fn schedule(&self, engine: &Engine) {
		match self.modifiers().debounce() {
			Some(millis) => {
				let weak = self.engine.clone();
				let element = self.element.clone();
				let activation = self.activation;
				engine.debounce(self.id, self.index, millis, move || {
					if let Some(engine) = weak.upgrade() {
						fire(&engine, &element, activation)
					}
				});
			}
			None => fire(engine, &self.element, self.activation),
		}
	}
}

/// Loads a fresh descriptor and dispatches it on the next tick.
pub(crate) fn fire(engine: &Engine, element: &Element, activation: Activation) {
	let descriptor = match RequestDescriptor::load(element, activation, engine.config().default_swap_style) {
		Some(descriptor) => descriptor,
		None => return,
	};
	let engine = engine.clone();
	wasm_bindgen_futures::spawn_local(async move { engine.dispatch(descriptor).await });
}

fn bind_boosted(engine: &Engine, binding: &mut Binding, activation: Activation, event_name: &'static str) {
	let weak = engine.downgrade();
	let element = binding.element().clone();
	let closure = Closure::wrap(Box::new(move |event: web_sys::Event| {
		let engine = match weak.upgrade() {
			Some(engine) => engine,
			None => return,
		};
		event.prevent_default();
		fire(&engine, &element, activation)
	}) as Box<dyn FnMut(web_sys::Event)>);

	match Listener::add(binding.element(), event_name, closure) {
		Ok(listener) => binding.push_listener(listener),
		Err(error) => error!("Failed to bind boosted {:?} listener: {:?}", event_name, error),
	}
}

fn bind_load(clause: Clause, binding: &mut Binding) {
	let window = match web_sys::window() {
		Some(window) => window,
		None => return error!("No window to bind `load` on."),
	};
	let loaded = window.document().map_or(false, |document| document.ready_state() == "complete");

	let on_load = move |clause: &Clause| {
		let engine = match clause.engine.upgrade() {
			Some(engine) => engine,
			None => return,
		};
		if clause.modifiers().once && clause.already_triggered() {
			return trace!("`load once` already fired.");
		}
		clause.schedule(&engine);
		clause.mark_triggered();
	};

	if loaded {
		// The page's `load` event is long gone, so this is content swapped in later.
		let engine = match clause.engine.upgrade() {
			Some(engine) => engine,
			None => return,
		};
		let millis = clause.modifiers().debounce().unwrap_or(0);
		let (id, index) = (clause.id, clause.index);
		engine.debounce(id, index, millis, move || {
			let clause = Clause {
				spec: TriggerSpec {
					modifiers: Modifiers { delay: None, throttle: None, ..clause.spec.modifiers.clone() },
					..clause.spec.clone()
				},
				..clause
			};
			on_load(&clause)
		});
		return;
	}

	let closure = Closure::wrap(Box::new(move |_: web_sys::Event| on_load(&clause)) as Box<dyn FnMut(web_sys::Event)>);
	match Listener::add(&window, "load", closure) {
		Ok(listener) => binding.push_listener(listener),
		Err(error) => error!("Failed to bind `load` listener: {:?}", error),
	}
}

fn bind_observer(clause: Clause, binding: &mut Binding) {
	let is_revealed = clause.spec.event == TriggerEvent::Revealed;
	let threshold = clause.modifiers().threshold.unwrap_or(0.0);
	let element = clause.element.clone();

	let closure = Closure::wrap(Box::new(move |entries: js_sys::Array, observer: IntersectionObserver| {
		let engine = match clause.engine.upgrade() {
			Some(engine) => engine,
			None => return,
		};
		let intersecting = entries.iter().filter_map(|entry| entry.dyn_into::<IntersectionObserverEntry>().ok()).any(|entry| entry.is_intersecting());
		if !intersecting {
			return;
		}

		if clause.already_triggered() && (is_revealed || clause.modifiers().once) {
			observer.unobserve(&clause.element);
			return trace!("Already triggered. No longer observing.");
		}

		clause.schedule(&engine);
		clause.mark_triggered();

		if is_revealed || clause.modifiers().once {
			observer.unobserve(&clause.element);
		}
	}) as Box<dyn FnMut(js_sys::Array, IntersectionObserver)>);

	let observer = if is_revealed {
		IntersectionObserver::new(closure.as_ref().unchecked_ref())
	} else {
		let mut init = IntersectionObserverInit::new();
		init.threshold(&JsValue::from_f64(threshold.max(0.0).min(1.0)));
		IntersectionObserver::new_with_options(closure.as_ref().unchecked_ref(), &init)
	};

	match observer {
		Ok(observer) => {
			observer.observe(&element);
			binding.push_observer(Observer::new(observer, closure));
		}
		Err(error) => error!("Failed to create IntersectionObserver: {:?}", error),
	}
}

fn bind_listener(clause: Clause, binding: &mut Binding) {
	let event_name = clause.spec.event.name().to_owned();
	// `changed` compares against the value at activation time first.
	let mut last_value = if clause.modifiers().changed { Some(current_value(&clause.element)) } else { None };

	let listener_event = event_name.clone();
	let closure = Closure::wrap(Box::new(move |event: web_sys::Event| {
		let engine = match clause.engine.upgrade() {
			Some(engine) => engine,
			None => return,
		};
		let span = trace_span!("Trigger", event = %listener_event);
		let _enter = span.enter();
		on_event(&engine, &clause, &event, &mut last_value)
	}) as Box<dyn FnMut(web_sys::Event)>);

	match Listener::add(binding.element(), &event_name, closure) {
		Ok(listener) => binding.push_listener(listener),
		Err(error) => error!("Failed to bind {:?} listener: {:?}", event_name, error),
	}
}

fn on_event(engine: &Engine, clause: &Clause, event: &web_sys::Event, last_value: &mut Option<String>) {
	let element = &clause.element;
	let event_name = clause.spec.event.name();

	if event_name == "submit" || (event_name == "click" && attributes::is_form(element)) {
		event.prevent_default();
	}

	let window = match web_sys::window() {
		Some(window) => window,
		None => return,
	};

	if let Some(message) = element.get_attribute(HX_PROMPT).filter(|message| !message.is_empty()) {
		match window.prompt_with_message(&message) {
			Ok(Some(value)) => engine.stash_prompt(clause.id, value),
			Ok(None) => return debug!("Prompt cancelled."),
			Err(error) => return warn!("Prompt failed: {:?}", error),
		}
	}

	if let Some(message) = element.get_attribute(HX_CONFIRM).filter(|message| !message.is_empty()) {
		match window.confirm_with_message(&message) {
			Ok(true) => (),
			Ok(false) => return debug!("Confirmation declined."),
			Err(error) => return warn!("Confirmation failed: {:?}", error),
		}
	}

	if clause.modifiers().once && clause.already_triggered() {
		return trace!("`once` already fired.");
	}

	if clause.modifiers().changed {
		let value = current_value(element);
		if last_value.as_deref() == Some(value.as_str()) {
			return trace!("Value unchanged.");
		}
		*last_value = Some(value);
	}

	clause.schedule(engine);
	clause.mark_triggered();
}

/// `value` if the element has a non-empty one, otherwise its rendered text.
fn current_value(element: &Element) -> String {
	if let Some(value) = js_sys::Reflect::get(element, &JsValue::from_str("value")).ok().and_then(|value| value.as_string()).filter(|value| !value.is_empty()) {
		return value;
	}
	match element.dyn_ref::<HtmlElement>() {
		Some(element) => element.inner_text(),
		None => element.text_content().unwrap_or_default(),
	}
}
