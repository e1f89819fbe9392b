use thiserror::Error;
use wasm_bindgen::JsValue;

/// Failures inside a single request's pipeline.
///
/// None of these ever escape [`Engine::dispatch`](`crate::Engine::dispatch`):
/// they are logged and, where appropriate, reported through [***htmx:responseError***](`crate::events::LifecycleEvent::ResponseError`).
#[derive(Debug, Error)]
pub enum Error {
	#[error("target element not found: {0:?}")]
	TargetNotFound(String),

	#[error("invalid {attribute} JSON")]
	InvalidJson {
		attribute: &'static str,
		#[source]
		source: serde_json::Error,
	},

	#[error("request failed: {0}")]
	Transport(String),

	#[error("request timed out after {0}ms")]
	Timeout(u32),

	/// Cancelled through `hx-sync="…:abort"`.
	#[error("request aborted")]
	Aborted,

	#[error("form validation failed")]
	ValidationFailed,

	#[error("JavaScript error: {0}")]
	Js(String),
}

impl Error {
	/// Whether this failure should be surfaced through [***htmx:responseError***](`crate::events::LifecycleEvent::ResponseError`).
	#[must_use]
	pub fn is_reported(&self) -> bool {
		!matches!(self, Self::Aborted)
	}
}

impl From<JsValue> for Error {
	fn from(value: JsValue) -> Self {
		Self::Js(js_error_message(&value))
	}
}

pub(crate) fn js_error_message(value: &JsValue) -> String {
	if let Some(string) = value.as_string() {
		return string;
	}
	match js_sys::Reflect::get(value, &JsValue::from_str("message")).ok().and_then(|message| message.as_string()) {
		Some(message) => message,
		None => format!("{:?}", value),
	}
}

pub type Result<T, E = Error> = core::result::Result<T, E>;
