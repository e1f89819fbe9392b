//! Applies response HTML to the DOM.

use crate::attributes::{DATA_HX_PRESERVE, HX_PRESERVE};
use core::{
	cell::Cell,
	fmt::{self, Display, Formatter},
};
use serde::Deserialize;
use tracing::{error, instrument, trace, trace_span, warn};
use wasm_bindgen::JsCast;
use web_sys::{Document, Element, Node};

/// How response content is applied to the target.
///
/// Unrecognised names parse as [`SwapStrategy::InnerHtml`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(from = "String")]
pub enum SwapStrategy {
	InnerHtml,
	/// Replaces the target itself. Preserved elements are not restored.
	OuterHtml,
	BeforeBegin,
	AfterBegin,
	BeforeEnd,
	AfterEnd,
	/// Removes the target on the next microtask. The response content is ignored.
	Delete,
	/// No DOM mutation at all.
	None,
}

impl SwapStrategy {
	#[must_use]
	pub fn parse(name: &str) -> Self {
		match name.trim() {
			"innerHTML" => Self::InnerHtml,
			"outerHTML" => Self::OuterHtml,
			"beforebegin" => Self::BeforeBegin,
			"afterbegin" => Self::AfterBegin,
			"beforeend" => Self::BeforeEnd,
			"afterend" => Self::AfterEnd,
			"delete" => Self::Delete,
			"none" => Self::None,
			other => {
				if !other.is_empty() {
					warn!("Unknown swap strategy {:?}, using innerHTML.", other);
				}
				Self::InnerHtml
			}
		}
	}

	#[must_use]
	pub fn name(self) -> &'static str {
		match self {
			Self::InnerHtml => "innerHTML",
			Self::OuterHtml => "outerHTML",
			Self::BeforeBegin => "beforebegin",
			Self::AfterBegin => "afterbegin",
			Self::BeforeEnd => "beforeend",
			Self::AfterEnd => "afterend",
			Self::Delete => "delete",
			Self::None => "none",
		}
	}

	/// Whether preserved elements are put back after this strategy.
	#[must_use]
	pub fn restores_preserved(self) -> bool {
		!matches!(self, Self::OuterHtml | Self::Delete)
	}

	fn adjacent_position(self) -> Option<&'static str> {
		match self {
			Self::BeforeBegin | Self::AfterBegin | Self::BeforeEnd | Self::AfterEnd => Some(self.name()),
			_ => None,
		}
	}
}

impl From<String> for SwapStrategy {
	fn from(name: String) -> Self {
		Self::parse(&name)
	}
}

impl Default for SwapStrategy {
	fn default() -> Self {
		Self::InnerHtml
	}
}

impl Display for SwapStrategy {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.write_str(self.name())
	}
}

/// What is left to re-process after a swap.
#[derive(Debug, Clone)]
pub enum SwapOutcome {
	/// The target is still in place.
	Target,
	/// New content landed outside the target (or replaced it). Its (former) parent, if any, holds it.
	Parent(Option<Element>),
	/// The target is (about to be) gone, or nothing changed.
	Nothing,
}

thread_local! {
	static NEXT_PRESERVE_ID: Cell<u32> = Cell::new(0);
}

fn generate_preserve_id(document: &Document) -> String {
	loop {
		let id = NEXT_PRESERVE_ID.with(|next| {
			let id = next.get();
			next.set(id.wrapping_add(1));
			format!("hx-preserve-{}", id)
		});
		if document.get_element_by_id(&id).is_none() {
			break id;
		}
	}
}

/// Extracts the inner HTML of `selector`'s first match in `html`, or `""`.
#[instrument(skip(document, html))]
pub fn select_fragment(document: &Document, html: &str, selector: &str) -> Result<String, wasm_bindgen::JsValue> {
	let scratch = document.create_element("div")?;
	scratch.set_inner_html(html);
	Ok(match scratch.query_selector(selector)? {
		Some(selected) => selected.inner_html(),
		None => {
			trace!("hx-select matched nothing. Swapping in empty content.");
			String::new()
		}
	})
}

/// Captures the outermost preserved descendants of `target` in document order, with their ids.
///
/// Preserved elements nested in another preserved element travel with it and are not captured on their own.
/// Elements without an id are assigned a fresh one first. If two elements share an id, the later one wins.
pub fn capture_preserved(document: &Document, target: &Element) -> Vec<(String, Element)> {
	let mut preserved: Vec<(String, Element)> = Vec::new();
	let nodes = match target.query_selector_all(&format!("[{}], [{}]", HX_PRESERVE, DATA_HX_PRESERVE)) {
		Ok(nodes) => nodes,
		Err(error) => {
			error!("Failed to query preserved elements: {:?}", error);
			return preserved;
		}
	};

	for i in 0..nodes.length() {
		let element = match nodes.get(i).and_then(|node| node.dyn_into::<Element>().ok()) {
			Some(element) => element,
			None => continue,
		};
		if preserved.iter().any(|(_, outer)| outer.contains(Some(&*element))) {
			trace!("Preserved element is nested in another. Skipping.");
			continue;
		}
		let mut id = element.id();
		if id.is_empty() {
			id = generate_preserve_id(document);
			element.set_id(&id);
		}
		if let Some(index) = preserved.iter().position(|(other, _)| *other == id) {
			warn!("Preserved elements collide on id {:?}. Only the last one survives.", id);
			preserved.remove(index);
		}
		preserved.push((id, element));
	}
	preserved
}

/// Puts captured elements back in place of their same-id counterparts in the new content, in capture order.
///
/// The live node itself is reinserted, so its state (like `<details open>`), listeners and activation survive.
pub fn restore_preserved(document: &Document, preserved: Vec<(String, Element)>) {
	for (id, element) in preserved {
		match document.get_element_by_id(&id) {
			Some(replacement) if replacement != element => {
				if let Err(error) = replacement.replace_with_with_node_1(&element) {
					error!("Failed to restore preserved element #{}: {:?}", id, error)
				}
			}
			Some(_) => trace!("Preserved element #{} was never removed.", id),
			None => trace!("Preserved element #{} has no counterpart in the new content.", id),
		}
	}
}

/// Applies `html` to `target` according to `strategy`.
///
/// # Errors
///
/// Iff a DOM operation throws. The target may be partially updated in that case.
#[instrument(skip(document, html))]
pub fn swap(document: &Document, target: &Element, html: &str, strategy: SwapStrategy, select: Option<&str>) -> Result<SwapOutcome, wasm_bindgen::JsValue> {
	let selected;
	let content = match select {
		Some(selector) => {
			selected = select_fragment(document, html, selector)?;
			selected.as_str()
		}
		None => html,
	};

	let preserved = capture_preserved(document, target);

	let span = trace_span!("Applying swap", %strategy, preserved = preserved.len());
	let _enter = span.enter();

	let outcome = match strategy {
		SwapStrategy::InnerHtml => {
			target.set_inner_html(content);
			SwapOutcome::Target
		}
		SwapStrategy::OuterHtml => {
			let parent = target.parent_element();
			if target.parent_node().is_none() {
				warn!("outerHTML swap on a detached target. Nothing to replace.");
				return Ok(SwapOutcome::Nothing);
			}
			target.set_outer_html(content);
			return Ok(SwapOutcome::Parent(parent));
		}
		SwapStrategy::BeforeBegin | SwapStrategy::AfterBegin | SwapStrategy::BeforeEnd | SwapStrategy::AfterEnd => {
			let position = strategy.adjacent_position().unwrap_or("beforeend");
			target.insert_adjacent_html(position, content)?;
			match strategy {
				// Siblings land outside the target.
				SwapStrategy::BeforeBegin | SwapStrategy::AfterEnd => SwapOutcome::Parent(target.parent_element()),
				_ => SwapOutcome::Target,
			}
		}
		SwapStrategy::Delete => {
			let node: Node = target.clone().into();
			wasm_bindgen_futures::spawn_local(async move {
				if let Some(parent) = node.parent_node() {
					if let Err(error) = parent.remove_child(&node) {
						error!("Failed to delete swap target: {:?}", error)
					}
				}
			});
			return Ok(SwapOutcome::Nothing);
		}
		SwapStrategy::None => SwapOutcome::Nothing,
	};

	if strategy.restores_preserved() {
		restore_preserved(document, preserved);
	}
	Ok(outcome)
}
