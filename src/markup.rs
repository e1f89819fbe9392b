//! Renders the `hx-*` attribute surface for server-side templates.

use crate::{
	attributes::{
		Method, UrlUpdate, HX_BOOST, HX_CONFIRM, HX_DISABLE, HX_DISABLE_WITH, HX_ENCODING, HX_HEADERS, HX_INCLUDE, HX_INDICATOR, HX_PARAMS, HX_PRESERVE, HX_PROMPT, HX_PUSH_URL, HX_REPLACE_URL, HX_SCROLL, HX_SELECT, HX_SWAP, HX_SYNC,
		HX_TARGET, HX_TRIGGER, HX_VALIDATE, HX_VALS, MULTIPART,
	},
	swap::SwapStrategy,
};
use core::fmt::{self, Display, Formatter, Write};
use serde_json::Value;

/// A set of `hx-*` attributes, rendered as `name="value"` pairs by [`Display`].
///
/// Setting an attribute twice keeps the later value in the original position.
///
/// ```
/// use hx_dom::{markup::HxAttributes, SwapStrategy};
///
/// let attributes = HxAttributes::new().post("/counter/increment").target("#count").swap(SwapStrategy::OuterHtml);
/// assert_eq!(attributes.to_string(), r##"hx-post="/counter/increment" hx-target="#count" hx-swap="outerHTML""##);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HxAttributes(Vec<(&'static str, Option<String>)>);

impl HxAttributes {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	#[must_use]
	fn set(mut self, name: &'static str, value: Option<String>) -> Self {
		match self.0.iter_mut().find(|(existing, _)| *existing == name) {
			Some((_, existing)) => *existing = value,
			None => self.0.push((name, value)),
		}
		self
	}

	#[must_use]
	fn value(self, name: &'static str, value: impl Into<String>) -> Self {
		self.set(name, Some(value.into()))
	}

	#[must_use]
	pub fn request(self, method: Method, url: impl Into<String>) -> Self {
		self.value(method.attribute(), url)
	}

	#[must_use]
	pub fn get(self, url: impl Into<String>) -> Self {
		self.request(Method::Get, url)
	}

	#[must_use]
	pub fn post(self, url: impl Into<String>) -> Self {
		self.request(Method::Post, url)
	}

	#[must_use]
	pub fn put(self, url: impl Into<String>) -> Self {
		self.request(Method::Put, url)
	}

	#[must_use]
	pub fn delete(self, url: impl Into<String>) -> Self {
		self.request(Method::Delete, url)
	}

	#[must_use]
	pub fn patch(self, url: impl Into<String>) -> Self {
		self.request(Method::Patch, url)
	}

	#[must_use]
	pub fn target(self, selector: impl Into<String>) -> Self {
		self.value(HX_TARGET, selector)
	}

	#[must_use]
	pub fn swap(self, strategy: SwapStrategy) -> Self {
		self.value(HX_SWAP, strategy.name())
	}

	/// Comma-separated trigger clauses, like `keyup changed delay:300ms, click`.
	#[must_use]
	pub fn trigger(self, clauses: impl Into<String>) -> Self {
		self.value(HX_TRIGGER, clauses)
	}

	/// `vals` should be a JSON object. Anything else is ignored by the engine.
	#[must_use]
	pub fn vals(self, vals: &Value) -> Self {
		self.value(HX_VALS, vals.to_string())
	}

	#[must_use]
	pub fn headers(self, headers: &Value) -> Self {
		self.value(HX_HEADERS, headers.to_string())
	}

	#[must_use]
	pub fn include(self, selector: impl Into<String>) -> Self {
		self.value(HX_INCLUDE, selector)
	}

	#[must_use]
	pub fn select(self, selector: impl Into<String>) -> Self {
		self.value(HX_SELECT, selector)
	}

	#[must_use]
	pub fn indicator(self, selector: impl Into<String>) -> Self {
		self.value(HX_INDICATOR, selector)
	}

	#[must_use]
	pub fn push_url(self, update: Option<UrlUpdate>) -> Self {
		self.value(HX_PUSH_URL, url_update(update))
	}

	#[must_use]
	pub fn replace_url(self, update: Option<UrlUpdate>) -> Self {
		self.value(HX_REPLACE_URL, url_update(update))
	}

	#[must_use]
	pub fn confirm(self, message: impl Into<String>) -> Self {
		self.value(HX_CONFIRM, message)
	}

	#[must_use]
	pub fn prompt(self, message: impl Into<String>) -> Self {
		self.value(HX_PROMPT, message)
	}

	#[must_use]
	pub fn boost(self, boost: bool) -> Self {
		self.value(HX_BOOST, boost.to_string())
	}

	#[must_use]
	pub fn disable(self) -> Self {
		self.set(HX_DISABLE, None)
	}

	#[must_use]
	pub fn disable_with(self, html: impl Into<String>) -> Self {
		self.value(HX_DISABLE_WITH, html)
	}

	/// `*` or a comma-separated list of form field names.
	#[must_use]
	pub fn params(self, params: impl Into<String>) -> Self {
		self.value(HX_PARAMS, params)
	}

	/// `<selector|this>:<drop|abort>`.
	#[must_use]
	pub fn sync(self, sync: impl Into<String>) -> Self {
		self.value(HX_SYNC, sync)
	}

	#[must_use]
	pub fn validate(self, validate: bool) -> Self {
		self.value(HX_VALIDATE, validate.to_string())
	}

	#[must_use]
	pub fn multipart(self) -> Self {
		self.value(HX_ENCODING, MULTIPART)
	}

	#[must_use]
	pub fn preserve(self) -> Self {
		self.set(HX_PRESERVE, None)
	}

	/// `true` scrolls the target, anything else is a selector.
	#[must_use]
	pub fn scroll(self, scroll: impl Into<String>) -> Self {
		self.value(HX_SCROLL, scroll)
	}

	pub fn iter(&self) -> impl Iterator<Item = (&'static str, Option<&str>)> {
		self.0.iter().map(|(name, value)| (*name, value.as_deref()))
	}
}

fn url_update(update: Option<UrlUpdate>) -> String {
	match update {
		None => "false".to_owned(),
		Some(UrlUpdate::Request) => "true".to_owned(),
		Some(UrlUpdate::Url(url)) => url,
	}
}

impl Display for HxAttributes {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		for (i, (name, value)) in self.iter().enumerate() {
			if i > 0 {
				f.write_char(' ')?;
			}
			f.write_str(name)?;
			if let Some(value) = value {
				f.write_str("=\"")?;
				write_escaped(f, value)?;
				f.write_char('"')?;
			}
		}
		Ok(())
	}
}

/// Escapes a double-quoted attribute value.
fn write_escaped(f: &mut impl Write, value: &str) -> fmt::Result {
	for c in value.chars() {
		match c {
			'&' => f.write_str("&amp;")?,
			'"' => f.write_str("&quot;")?,
			'<' => f.write_str("&lt;")?,
			'>' => f.write_str("&gt;")?,
			c => f.write_char(c)?,
		}
	}
	Ok(())
}
