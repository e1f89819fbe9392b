//! Reads the `hx-*` attribute surface off live elements.

use crate::swap::SwapStrategy;
use core::fmt::{self, Display, Formatter};
use tracing::{instrument, trace, warn};
use wasm_bindgen::JsCast;
use web_sys::Element;

pub const HX_GET: &str = "hx-get";
pub const HX_POST: &str = "hx-post";
pub const HX_PUT: &str = "hx-put";
pub const HX_DELETE: &str = "hx-delete";
pub const HX_PATCH: &str = "hx-patch";
pub const HX_BOOST: &str = "hx-boost";
pub const HX_TARGET: &str = "hx-target";
pub const HX_SWAP: &str = "hx-swap";
pub const HX_TRIGGER: &str = "hx-trigger";
pub const HX_VALS: &str = "hx-vals";
pub const HX_INCLUDE: &str = "hx-include";
pub const HX_SELECT: &str = "hx-select";
pub const HX_INDICATOR: &str = "hx-indicator";
pub const HX_PUSH_URL: &str = "hx-push-url";
pub const HX_REPLACE_URL: &str = "hx-replace-url";
pub const HX_CONFIRM: &str = "hx-confirm";
pub const HX_PROMPT: &str = "hx-prompt";
pub const HX_HEADERS: &str = "hx-headers";
pub const HX_DISABLE: &str = "hx-disable";
pub const HX_DISABLE_WITH: &str = "hx-disable-with";
pub const HX_PARAMS: &str = "hx-params";
pub const HX_SYNC: &str = "hx-sync";
pub const HX_VALIDATE: &str = "hx-validate";
pub const HX_ENCODING: &str = "hx-encoding";
pub const HX_PRESERVE: &str = "hx-preserve";
pub const DATA_HX_PRESERVE: &str = "data-hx-preserve";
pub const HX_SCROLL: &str = "hx-scroll";

/// Activation record. Present on every element that has been scanned and bound.
pub const ACTIVATED: &str = "data-htmx-setup";
/// Set once a `once` trigger has fired. Survives re-activation.
pub const TRIGGERED: &str = "data-htmx-triggered";
/// Sync coordination flag. The value is the owning request's id.
pub const REQUESTING: &str = "data-htmx-requesting";

pub const MULTIPART: &str = "multipart/form-data";

/// Matches every element that can be activated.
pub const ACTIVATABLE_SELECTOR: &str = "[hx-get], [hx-post], [hx-put], [hx-delete], [hx-patch], [hx-boost]";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
	Get,
	Post,
	Put,
	Delete,
	Patch,
}

impl Method {
	/// Selection priority when an element declares more than one verb.
	pub const PRIORITY: [Self; 5] = [Self::Get, Self::Post, Self::Put, Self::Delete, Self::Patch];

	#[must_use]
	pub fn attribute(self) -> &'static str {
		match self {
			Self::Get => HX_GET,
			Self::Post => HX_POST,
			Self::Put => HX_PUT,
			Self::Delete => HX_DELETE,
			Self::Patch => HX_PATCH,
		}
	}

	#[must_use]
	pub fn as_http(self) -> &'static str {
		match self {
			Self::Get => "GET",
			Self::Post => "POST",
			Self::Put => "PUT",
			Self::Delete => "DELETE",
			Self::Patch => "PATCH",
		}
	}

	/// Parses a form's `method` property. Anything unrecognised (including `dialog`) is POST.
	#[must_use]
	pub fn from_form_method(method: &str) -> Self {
		match method.trim().to_ascii_lowercase().as_str() {
			"get" => Self::Get,
			"put" => Self::Put,
			"delete" => Self::Delete,
			"patch" => Self::Patch,
			_ => Self::Post,
		}
	}

	/// The first declared verb in [`Method::PRIORITY`] order.
	#[must_use]
	pub fn declared_on(element: &Element) -> Option<Self> {
		Self::PRIORITY.iter().copied().find(|method| element.has_attribute(method.attribute()))
	}
}

impl Display for Method {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_http())
	}
}

/// How an element was activated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
	/// `hx-get` and friends. The URL is re-read from the attribute at trigger time.
	Explicit(Method),
	/// `<a hx-boost>`: GET on `href`.
	BoostedAnchor,
	/// `<form hx-boost>`: the form's own method on its `action`.
	BoostedForm,
}

impl Activation {
	#[must_use]
	pub fn of(element: &Element) -> Option<Self> {
		if is_boosted(element) {
			match element.tag_name().as_str() {
				"A" => return Some(Self::BoostedAnchor),
				"FORM" => return Some(Self::BoostedForm),
				_ => (),
			}
		}
		Method::declared_on(element).map(Self::Explicit)
	}
}

fn is_boosted(element: &Element) -> bool {
	element.get_attribute(HX_BOOST).map_or(false, |value| value.trim() != "false")
}

#[must_use]
pub fn is_activated(element: &Element) -> bool {
	element.has_attribute(ACTIVATED)
}

/// Removes [`ACTIVATED`] and [`REQUESTING`] from the descendants of `root`.
///
/// Markup carrying them (e.g. a history snapshot) would otherwise never be bound again.
pub fn clear_markers(root: &Element) {
	match root.query_selector_all(&format!("[{}], [{}]", ACTIVATED, REQUESTING)) {
		Ok(marked) => {
			for i in 0..marked.length() {
				if let Some(element) = marked.get(i).and_then(|node| node.dyn_into::<Element>().ok()) {
					for marker in &[ACTIVATED, REQUESTING] {
						if let Err(error) = element.remove_attribute(marker) {
							warn!("Failed to remove {}: {:?}", marker, error)
						}
					}
				}
			}
		}
		Err(error) => warn!("Failed to look up engine markers: {:?}", error),
	}
}

#[must_use]
pub fn is_form(element: &Element) -> bool {
	element.tag_name() == "FORM"
}

/// Finds every element in `root` (inclusive) that can be activated but hasn't been yet.
///
/// The root comes first, followed by descendants in document order.
#[instrument]
pub fn scan(root: &Element) -> Vec<(Element, Activation)> {
	let mut found = Vec::new();
	let mut consider = |element: Element| {
		if is_activated(&element) {
			return trace!("Skipping already activated element.");
		}
		if let Some(activation) = Activation::of(&element) {
			found.push((element, activation))
		}
	};

	consider(root.clone());

	match root.query_selector_all(ACTIVATABLE_SELECTOR) {
		Ok(descendants) => {
			for i in 0..descendants.length() {
				if let Some(element) = descendants.get(i).and_then(|node| node.dyn_into::<Element>().ok()) {
					consider(element)
				}
			}
		}
		Err(error) => warn!("Failed to scan for activatable elements: {:?}", error),
	}

	trace!("Found {} activatable element(s).", found.len());
	found
}

/// `true`, `false` or an explicit URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlUpdate {
	Request,
	Url(String),
}

impl UrlUpdate {
	#[must_use]
	pub fn parse(value: Option<&str>) -> Option<Self> {
		match value.map(str::trim) {
			None | Some("") | Some("false") => None,
			Some("true") => Some(Self::Request),
			Some(url) => Some(Self::Url(url.to_owned())),
		}
	}

	#[must_use]
	pub fn resolve<'a>(&'a self, request_url: &'a str) -> &'a str {
		match self {
			Self::Request => request_url,
			Self::Url(url) => url,
		}
	}
}

/// `hx-scroll`: `true` scrolls the target, anything else is a selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScrollTarget {
	Target,
	Selector(String),
}

impl ScrollTarget {
	#[must_use]
	pub fn parse(value: Option<&str>) -> Option<Self> {
		match value.map(str::trim) {
			None | Some("") | Some("false") => None,
			Some("true") => Some(Self::Target),
			Some(selector) => Some(Self::Selector(selector.to_owned())),
		}
	}
}

/// Everything one request needs, read from the source element's attributes at trigger time.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
	pub source: Element,
	pub method: Method,
	pub url: String,
	/// `None` targets the source element itself.
	pub target: Option<String>,
	pub swap: SwapStrategy,
	pub indicator: Option<String>,
	pub vals: Option<String>,
	pub include: Option<String>,
	pub push_url: Option<UrlUpdate>,
	pub replace_url: Option<UrlUpdate>,
	pub select: Option<String>,
	pub headers: Option<String>,
	pub params: Option<String>,
	pub multipart: bool,
	pub sync: Option<String>,
	pub scroll: Option<ScrollTarget>,
	pub validate: bool,
	pub disable: bool,
	pub disable_with: Option<String>,
}

impl RequestDescriptor {
	/// Loads a descriptor for `source` as activated by `activation`.
	///
	/// Returns [`None`] (with a warning) if the element no longer carries a URL.
	#[must_use]
	pub fn load(source: &Element, activation: Activation, default_swap: SwapStrategy) -> Option<Self> {
		let attribute = |name: &str| source.get_attribute(name).filter(|value| !value.is_empty());

		let (method, url, target, push_url) = match activation {
			Activation::Explicit(method) => (method, attribute(method.attribute()), attribute(HX_TARGET), attribute(HX_PUSH_URL)),
			Activation::BoostedAnchor => (
				Method::Get,
				property_string(source, "href").or_else(|| attribute("href")),
				attribute(HX_TARGET).or_else(|| Some("body".to_owned())),
				attribute(HX_PUSH_URL).or_else(|| Some("true".to_owned())),
			),
			Activation::BoostedForm => {
				let method = property_string(source, "method").or_else(|| attribute("method")).map_or(Method::Post, |method| Method::from_form_method(&method));
				(method, property_string(source, "action").or_else(|| attribute("action")), attribute(HX_TARGET), attribute(HX_PUSH_URL))
			}
		};

		let url = match url {
			Some(url) => url,
			None => {
				warn!("Element activated as {:?} carries no URL (anymore). Skipping request.", activation);
				return None;
			}
		};

		Some(Self {
			source: source.clone(),
			method,
			url,
			target,
			swap: attribute(HX_SWAP).map_or(default_swap, |swap| SwapStrategy::parse(&swap)),
			indicator: attribute(HX_INDICATOR),
			vals: attribute(HX_VALS),
			include: attribute(HX_INCLUDE),
			push_url: UrlUpdate::parse(push_url.as_deref()),
			replace_url: UrlUpdate::parse(attribute(HX_REPLACE_URL).as_deref()),
			select: attribute(HX_SELECT),
			headers: attribute(HX_HEADERS),
			params: attribute(HX_PARAMS),
			multipart: attribute(HX_ENCODING).map_or(false, |encoding| encoding.trim().eq_ignore_ascii_case(MULTIPART)),
			sync: attribute(HX_SYNC),
			scroll: ScrollTarget::parse(attribute(HX_SCROLL).as_deref()),
			validate: source.get_attribute(HX_VALIDATE).map_or(false, |validate| validate.trim() != "false"),
			disable: source.has_attribute(HX_DISABLE),
			disable_with: attribute(HX_DISABLE_WITH),
		})
	}
}

/// Reads a string-valued DOM property, like a resolved `href`.
pub(crate) fn property_string(element: &Element, name: &str) -> Option<String> {
	js_sys::Reflect::get(element, &name.into()).ok()?.as_string().filter(|value| !value.is_empty())
}
