//! Request payload construction.
//!
//! [`build_body`] is deterministic in its inputs. Reading those inputs off the DOM happens in [`collect_form`] and [`collect_included`].

use crate::{
	attributes::HX_VALS,
	error::{Error, Result},
};
use serde_json::{Map, Value};
use tracing::{error, trace, warn};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Blob, Document, Element, FormData, HtmlFormElement};

/// A single field value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
	Text(String),
	/// From `hx-vals`. Kept as-is in JSON bodies.
	Json(Value),
	/// A file input's selection. Only meaningful in multipart bodies.
	Blob(Blob),
}

impl FieldValue {
	/// The JSON representation. Blobs have no meaningful one and serialise as `{}`.
	#[must_use]
	pub fn to_json(&self) -> Value {
		match self {
			Self::Text(text) => Value::String(text.clone()),
			Self::Json(value) => value.clone(),
			Self::Blob(_) => Value::Object(Map::new()),
		}
	}

	/// The text appended to multipart bodies, if this isn't a blob.
	#[must_use]
	pub fn to_text(&self) -> Option<String> {
		match self {
			Self::Text(text) => Some(text.clone()),
			Self::Json(Value::String(text)) => Some(text.clone()),
			Self::Json(value) => Some(value.to_string()),
			Self::Blob(_) => None,
		}
	}
}

impl From<&str> for FieldValue {
	fn from(text: &str) -> Self {
		Self::Text(text.to_owned())
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
	/// Later values for the same name replace earlier ones, keeping the earlier position.
	Json,
	/// Every value is appended.
	Multipart,
}

/// An ordered list of fields. [`build_body`] never returns an empty one.
#[derive(Debug, Clone, PartialEq)]
pub struct Payload {
	encoding: Encoding,
	fields: Vec<(String, FieldValue)>,
}

impl Payload {
	#[must_use]
	pub fn new(encoding: Encoding) -> Self {
		Self { encoding, fields: Vec::new() }
	}

	pub fn insert(&mut self, name: impl Into<String>, value: FieldValue) {
		let name = name.into();
		if self.encoding == Encoding::Json {
			if let Some((_, existing)) = self.fields.iter_mut().find(|(existing, _)| *existing == name) {
				*existing = value;
				return;
			}
		}
		self.fields.push((name, value))
	}

	#[must_use]
	pub fn encoding(&self) -> Encoding {
		self.encoding
	}

	#[must_use]
	pub fn fields(&self) -> &[(String, FieldValue)] {
		&self.fields
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.fields.is_empty()
	}

	#[must_use]
	pub fn get(&self, name: &str) -> Option<&FieldValue> {
		self.fields.iter().find(|(existing, _)| existing == name).map(|(_, value)| value)
	}

	#[must_use]
	pub fn to_json(&self) -> Value {
		Value::Object(self.fields.iter().map(|(name, value)| (name.clone(), value.to_json())).collect())
	}

	/// Builds a [`FormData`] for the `fetch` body.
	///
	/// # Errors
	///
	/// Iff appending throws.
	pub fn to_form_data(&self) -> Result<FormData, JsValue> {
		let form_data = FormData::new()?;
		for (name, value) in &self.fields {
			match value {
				FieldValue::Blob(blob) => form_data.append_with_blob(name, blob)?,
				other => form_data.append_with_str(name, &other.to_text().unwrap_or_default())?,
			}
		}
		Ok(form_data)
	}
}

/// `hx-params`: which form fields are sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamsFilter {
	All,
	Only(Vec<String>),
}

impl ParamsFilter {
	#[must_use]
	pub fn parse(value: Option<&str>) -> Self {
		match value {
			None => Self::All,
			Some(list) => {
				let names: Vec<String> = list.split(',').map(str::trim).filter(|name| !name.is_empty()).map(str::to_owned).collect();
				if names.iter().any(|name| name == "*") {
					Self::All
				} else {
					Self::Only(names)
				}
			}
		}
	}

	#[must_use]
	pub fn allows(&self, name: &str) -> bool {
		match self {
			Self::All => true,
			Self::Only(names) => names.iter().any(|allowed| allowed == name),
		}
	}
}

/// Everything [`build_body`] reads.
#[derive(Debug, Clone, Default)]
pub struct BodyInputs<'a> {
	/// Entries of the source element's form, if it has one.
	pub form: Option<Vec<(String, FieldValue)>>,
	pub params: Option<&'a str>,
	/// Raw `hx-vals`.
	pub vals: Option<&'a str>,
	/// `name`/`value` of each `hx-include` match that has a name.
	pub included: Vec<(String, String)>,
	pub multipart: bool,
}

/// Parses `hx-vals`. Must be a JSON object.
///
/// # Errors
///
/// Iff `vals` isn't a JSON object.
pub fn parse_vals(vals: &str) -> Result<Map<String, Value>> {
	match serde_json::from_str(vals) {
		Ok(Value::Object(map)) => Ok(map),
		Ok(other) => Err(Error::InvalidJson {
			attribute: HX_VALS,
			source: serde::de::Error::custom(format_args!("expected an object, found {}", other)),
		}),
		Err(source) => Err(Error::InvalidJson { attribute: HX_VALS, source }),
	}
}

/// Merges form fields (filtered by `hx-params`), `hx-vals` and `hx-include` in that order.
///
/// Returns [`None`] for an empty payload. Malformed `hx-vals` is logged and skipped.
#[must_use]
pub fn build_body(inputs: &BodyInputs<'_>) -> Option<Payload> {
	let mut payload = Payload::new(if inputs.multipart { Encoding::Multipart } else { Encoding::Json });

	if let Some(form) = &inputs.form {
		let filter = ParamsFilter::parse(inputs.params);
		for (name, value) in form.iter().filter(|(name, _)| filter.allows(name)) {
			payload.insert(name.clone(), value.clone())
		}
	}

	if let Some(vals) = inputs.vals {
		match parse_vals(vals) {
			Ok(vals) => {
				for (name, value) in vals {
					payload.insert(name, FieldValue::Json(value))
				}
			}
			Err(error) => {
				if cfg!(feature = "dangerous-logging") {
					error!("{}: {:?}", error, vals)
				} else {
					error!("{}", error)
				}
			}
		}
	}

	for (name, value) in &inputs.included {
		payload.insert(name.clone(), FieldValue::Text(value.clone()))
	}

	if payload.is_empty() {
		trace!("Empty payload.");
		None
	} else {
		Some(payload)
	}
}

/// The form `element` is or belongs to.
#[must_use]
pub fn owning_form(element: &Element) -> Option<HtmlFormElement> {
	if let Some(form) = element.dyn_ref::<HtmlFormElement>() {
		return Some(form.clone());
	}
	match element.closest("form") {
		Ok(form) => form.and_then(|form| form.dyn_into().ok()),
		Err(error) => {
			warn!("Failed to look up the owning form: {:?}", error);
			None
		}
	}
}

/// Reads a form's entries, as submitted.
///
/// # Errors
///
/// Iff the browser refuses to build the [`FormData`].
pub fn collect_form(form: &HtmlFormElement) -> Result<Vec<(String, FieldValue)>, JsValue> {
	let form_data = FormData::new_with_form(form)?;
	let mut fields = Vec::new();
	let entries = match js_sys::try_iter(&form_data)? {
		Some(entries) => entries,
		None => return Ok(fields),
	};
	for entry in entries {
		let entry: js_sys::Array = entry?.dyn_into()?;
		let name = entry.get(0).as_string().unwrap_or_default();
		let value = entry.get(1);
		let value = match value.as_string() {
			Some(text) => FieldValue::Text(text),
			None => match value.dyn_into::<Blob>() {
				Ok(blob) => FieldValue::Blob(blob),
				Err(other) => FieldValue::Text(format!("{:?}", other)),
			},
		};
		fields.push((name, value))
	}
	Ok(fields)
}

/// Reads `name`/`value` of every element matching `selector` that has a name.
#[must_use]
pub fn collect_included(document: &Document, selector: &str) -> Vec<(String, String)> {
	let nodes = match document.query_selector_all(selector) {
		Ok(nodes) => nodes,
		Err(error) => {
			error!("Invalid hx-include selector {:?}: {:?}", selector, error);
			return Vec::new();
		}
	};

	(0..nodes.length())
		.filter_map(|i| nodes.get(i))
		.filter_map(|node| {
			let name = js_sys::Reflect::get(&node, &"name".into()).ok()?.as_string().filter(|name| !name.is_empty())?;
			let value = js_sys::Reflect::get(&node, &"value".into()).ok().and_then(|value| value.as_string()).unwrap_or_default();
			Some((name, value))
		})
		.collect()
}
