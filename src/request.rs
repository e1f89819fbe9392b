//! The request pipeline, from trigger to settle.

use crate::{
	attributes::{self, RequestDescriptor, ScrollTarget},
	body::{self, BodyInputs, Encoding},
	engine::Engine,
	error::{Error, Result},
	events::{self, Detail, LifecycleEvent},
	headers::{self, HeaderInputs, ResponseAction, APPLICATION_JSON, CONTENT_TYPE},
	history::{self, HistorySnapshot, HistoryUpdate},
	swap::{self, SwapOutcome},
	sync::{Admission, SyncSpec},
	timer,
	transport::{HxRequest, HxResponse},
};
use futures::future::{self, Either};
use tracing::{debug, debug_span, error, info, trace, warn, Instrument};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{AbortController, AbortSignal, Document, Element, HtmlElement, ScrollIntoViewOptions, Window};

impl Engine {
	/// Runs one request for `descriptor` to completion, including swap and settle.
	///
	/// Never fails: every error is logged and, where appropriate, reported through ***htmx:responseError*** on the target.
	pub async fn dispatch(&self, descriptor: RequestDescriptor) {
		let span = debug_span!("dispatch", method = %descriptor.method, url = %descriptor.url);
		self.dispatch_inner(descriptor).instrument(span).await
	}

	async fn dispatch_inner(&self, descriptor: RequestDescriptor) {
		let window = match web_sys::window() {
			Some(window) => window,
			None => return error!("No window to dispatch in."),
		};
		let document = match window.document() {
			Some(document) => document,
			None => return error!("No document to dispatch in."),
		};

		let target = match resolve_target(&document, &descriptor) {
			Ok(target) => target,
			Err(error) => return error!("{}", error),
		};

		let request_id = self.next_request_id();
		let controller = match AbortController::new() {
			Ok(controller) => controller,
			Err(error) => return error!("Failed to create AbortController: {:?}", error),
		};

		let coordinator = match descriptor.sync.as_deref().and_then(SyncSpec::parse) {
			Some(spec) => match spec.resolve(&document, &descriptor.source) {
				Some(coordinator) => {
					let admission = self.state().in_flight.admit(&coordinator, spec.strategy);
					match admission {
						Admission::Proceed => (),
						Admission::Drop => return debug!("Coordinating element is busy. Dropping request."),
						Admission::AbortPrevious(previous) => {
							debug!("Aborting the in-flight request of the coordinating element.");
							previous.abort()
						}
					}
					self.state().in_flight.acquire(&coordinator, request_id, &controller);
					Some(coordinator)
				}
				None => {
					trace!("hx-sync element not found. Not synchronising.");
					None
				}
			},
			None => None,
		};

		let html = {
			let _guard = RequestGuard::new(self, &document, &descriptor, coordinator.map(|coordinator| (coordinator, request_id)));
			match self.exchange(&window, &document, &descriptor, &target, &controller).await {
				Ok(Some(html)) => html,
				Ok(None) => return,
				Err(error) => return self.report(&target, &error),
			}
		};

		if let Err(error) = self.apply(&window, &document, &descriptor, &target, html).await {
			self.report(&target, &error)
		}
	}

	/// Everything between ***htmx:beforeRequest*** and ***htmx:beforeSwap***.
	///
	/// Returns the HTML to swap in, or [`None`] if the pipeline ends early without error.
	async fn exchange(&self, window: &Window, document: &Document, descriptor: &RequestDescriptor, target: &Element, controller: &AbortController) -> Result<Option<String>> {
		let source = &descriptor.source;

		let before = Detail::new().with("elt", source.clone()).with("url", descriptor.url.as_str()).with("method", descriptor.method.as_http());
		if !events::emit(target, LifecycleEvent::BeforeRequest, before) {
			debug!("Request cancelled by an htmx:beforeRequest listener.");
			return Ok(None);
		}

		if descriptor.validate {
			validate(source)?;
		}

		let payload = if descriptor.method == attributes::Method::Get {
			None
		} else {
			let form = match body::owning_form(source) {
				Some(form) => Some(body::collect_form(&form)?),
				None => None,
			};
			body::build_body(&BodyInputs {
				form,
				params: descriptor.params.as_deref(),
				vals: descriptor.vals.as_deref(),
				included: descriptor.include.as_deref().map(|selector| body::collect_included(document, selector)).unwrap_or_default(),
				multipart: descriptor.multipart,
			})
		};

		let current_url = window.location().href().unwrap_or_default();
		let trigger_name = attributes::property_string(source, "name").unwrap_or_default();
		let prompt = self.take_prompt(source);
		let mut headers = headers::build_headers(&HeaderInputs {
			current_url: &current_url,
			trigger_id: &source.id(),
			trigger_name: &trigger_name,
			target_id: &target.id(),
			prompt: prompt.as_deref(),
			custom: descriptor.headers.as_deref(),
		});
		if payload.as_ref().map(body::Payload::encoding) == Some(Encoding::Json) {
			headers.set(CONTENT_TYPE, APPLICATION_JSON)
		}

		let request = HxRequest {
			method: descriptor.method,
			url: descriptor.url.clone(),
			headers,
			body: payload,
		};
		if cfg!(feature = "dangerous-logging") {
			trace!(?request, "Sending request.");
		}
		let response = self.send(request, &controller.signal(), controller).await?;

		match ResponseAction::classify(response.redirect.as_deref(), response.refresh.as_deref()) {
			ResponseAction::Redirect(location) => {
				info!("Redirected by HX-Redirect.");
				window.location().set_href(&location)?;
				return Ok(None);
			}
			ResponseAction::Refresh => {
				info!("Refreshing by HX-Refresh.");
				window.location().reload()?;
				return Ok(None);
			}
			ResponseAction::Swap => (),
		}

		events::emit(target, LifecycleEvent::AfterRequest, Detail::new().with("elt", source.clone()).with("status", response.status));

		let before_swap = Detail::new().with("elt", source.clone()).with("html", response.text.as_str()).with("swap", descriptor.swap.name());
		if !events::emit(target, LifecycleEvent::BeforeSwap, before_swap) {
			debug!("Swap cancelled by an htmx:beforeSwap listener.");
			return Ok(None);
		}

		Ok(Some(response.text))
	}

	/// Calls the transport, racing it against [`Config::timeout`](`crate::Config::timeout`) if that's set.
	async fn send(&self, request: HxRequest, signal: &AbortSignal, controller: &AbortController) -> Result<HxResponse> {
		let call = self.transport().send(request, signal);
		let timeout = self.config().timeout;
		if timeout == 0 {
			return call.await;
		}

		match future::select(call, Box::pin(timer::sleep(timeout))).await {
			Either::Left((response, _)) => response,
			Either::Right(((), _)) => {
				controller.abort();
				Err(Error::Timeout(timeout))
			}
		}
	}

	/// Swap, history, re-processing, scrolling and settle.
	async fn apply(&self, window: &Window, document: &Document, descriptor: &RequestDescriptor, target: &Element, html: String) -> Result<()> {
		let config = self.config();

		let snapshot = HistorySnapshot::new(snapshot_content(target)?, history_target(descriptor), window.scroll_y().unwrap_or(0.0));

		let classes = target.class_list();
		classes.add_1(&config.swapping_class)?;
		if config.default_swap_delay > 0 {
			timer::sleep(config.default_swap_delay).await;
		}
		let outcome = swap::swap(document, target, &html, descriptor.swap, descriptor.select.as_deref());
		classes.remove_1(&config.swapping_class)?;
		let outcome = outcome?;
		classes.add_1(&config.settling_class)?;

		if let Some(push_url) = &descriptor.push_url {
			history::record(window, HistoryUpdate::Push, push_url.resolve(&descriptor.url), &snapshot)
		}
		if let Some(replace_url) = &descriptor.replace_url {
			history::record(window, HistoryUpdate::Replace, replace_url.resolve(&descriptor.url), &snapshot)
		}

		match &outcome {
			SwapOutcome::Target => self.process(target),
			SwapOutcome::Parent(Some(parent)) => self.process(parent),
			SwapOutcome::Parent(None) | SwapOutcome::Nothing => trace!("Nothing to re-process."),
		}

		if let Some(scroll) = &descriptor.scroll {
			let element = match scroll {
				ScrollTarget::Target => Some(target.clone()),
				ScrollTarget::Selector(selector) => document.query_selector(selector).unwrap_or_else(|error| {
					warn!("Invalid hx-scroll selector {:?}: {:?}", selector, error);
					None
				}),
			};
			if let Some(element) = element {
				let mut options = ScrollIntoViewOptions::new();
				options.behavior(config.scroll_behavior.into());
				element.scroll_into_view_with_scroll_into_view_options(&options);
			}
		}

		events::emit(target, LifecycleEvent::AfterSwap, Detail::new().with("target", target.clone()).with("swap", descriptor.swap.name()));

		let settle_delay = config.default_settle_delay;
		let settling_class = config.settling_class.clone();
		let target = target.clone();
		wasm_bindgen_futures::spawn_local(
			async move {
				timer::sleep(settle_delay).await;
				if let Err(error) = target.class_list().remove_1(&settling_class) {
					error!("Failed to remove the settling class: {:?}", error)
				}
				events::emit(&target, LifecycleEvent::AfterSettle, Detail::new().with("target", target.clone()));
			}
			.instrument(debug_span!("settle")),
		);

		Ok(())
	}

	fn report(&self, target: &Element, error: &Error) {
		if !error.is_reported() {
			return debug!("{}", error);
		}
		error!("{}", error);
		events::emit(target, LifecycleEvent::ResponseError, Detail::new().with("error", error.to_string()));
	}
}

fn resolve_target(document: &Document, descriptor: &RequestDescriptor) -> Result<Element> {
	let selector = match &descriptor.target {
		Some(selector) => selector,
		None => return Ok(descriptor.source.clone()),
	};
	match document.query_selector(selector) {
		Ok(Some(target)) => Ok(target),
		Ok(None) => Err(Error::TargetNotFound(selector.clone())),
		Err(error) => {
			warn!("Invalid hx-target selector: {:?}", error);
			Err(Error::TargetNotFound(selector.clone()))
		}
	}
}

/// The selector a history snapshot restores into.
fn history_target(descriptor: &RequestDescriptor) -> String {
	if let Some(selector) = &descriptor.target {
		return selector.clone();
	}
	let id = descriptor.source.id();
	if id.is_empty() {
		"body".to_owned()
	} else {
		format!("#{}", id)
	}
}

/// The target's markup without activation or sync markers, so that it can be bound again on restore.
fn snapshot_content(target: &Element) -> Result<String> {
	let copy: Element = target.clone_node_with_deep(true)?.unchecked_into();
	attributes::clear_markers(&copy);
	Ok(copy.inner_html())
}

fn validate(source: &Element) -> Result<()> {
	match body::owning_form(source) {
		Some(form) if !form.check_validity() => {
			form.report_validity();
			Err(Error::ValidationFailed)
		}
		_ => Ok(()),
	}
}

/// Request-time decoration of the source element. Undone when dropped.
struct RequestGuard<'a> {
	engine: &'a Engine,
	source: Element,
	indicators: Vec<HtmlElement>,
	disabled: bool,
	replaced_html: Option<String>,
	sync: Option<(Element, u64)>,
}

impl<'a> RequestGuard<'a> {
	fn new(engine: &'a Engine, document: &Document, descriptor: &RequestDescriptor, sync: Option<(Element, u64)>) -> Self {
		let config = engine.config();
		let source = descriptor.source.clone();

		if let Err(error) = source.class_list().add_1(&config.request_class) {
			error!("Failed to add the request class: {:?}", error)
		}

		let indicators = indicators(document, &source, descriptor.indicator.as_deref(), &config.indicator_class);
		for indicator in &indicators {
			set_display(indicator, "block")
		}

		let mut replaced_html = None;
		if descriptor.disable {
			set_disabled(&source, true);
			if let Some(text) = &descriptor.disable_with {
				replaced_html = Some(source.inner_html());
				source.set_inner_html(text);
			}
		}

		Self {
			engine,
			source,
			indicators,
			disabled: descriptor.disable,
			replaced_html,
			sync,
		}
	}
}

impl<'a> Drop for RequestGuard<'a> {
	fn drop(&mut self) {
		if let Err(error) = self.source.class_list().remove_1(&self.engine.config().request_class) {
			error!("Failed to remove the request class: {:?}", error)
		}
		for indicator in &self.indicators {
			set_display(indicator, "none")
		}
		if self.disabled {
			set_disabled(&self.source, false);
			if let Some(html) = self.replaced_html.take() {
				self.source.set_inner_html(&html)
			}
		}
		if let Some((coordinator, id)) = self.sync.take() {
			self.engine.state().in_flight.release(&coordinator, id)
		}
	}
}

/// An explicit `hx-indicator` wins. Otherwise, the source's descendants with the indicator class are used.
fn indicators(document: &Document, source: &Element, selector: Option<&str>, indicator_class: &str) -> Vec<HtmlElement> {
	if let Some(selector) = selector {
		return match document.query_selector(selector) {
			Ok(indicator) => indicator.and_then(|indicator| indicator.dyn_into().ok()).into_iter().collect(),
			Err(error) => {
				warn!("Invalid hx-indicator selector: {:?}", error);
				Vec::new()
			}
		};
	}

	let nodes = match source.query_selector_all(&format!(".{}", indicator_class)) {
		Ok(nodes) => nodes,
		Err(error) => {
			warn!("Failed to look up indicators: {:?}", error);
			return Vec::new();
		}
	};
	(0..nodes.length()).filter_map(|i| nodes.get(i)).filter_map(|node| node.dyn_into().ok()).collect()
}

fn set_display(element: &HtmlElement, display: &str) {
	if let Err(error) = element.style().set_property("display", display) {
		error!("Failed to toggle indicator: {:?}", error)
	}
}

fn set_disabled(element: &Element, disabled: bool) {
	if let Err(error) = js_sys::Reflect::set(element, &JsValue::from_str("disabled"), &JsValue::from_bool(disabled)) {
		error!("Failed to toggle `disabled`: {:?}", error)
	}
}
