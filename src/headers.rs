use crate::{attributes::HX_HEADERS, error::Error};
use serde_json::Value;
use tracing::error;

pub const HX_REQUEST: &str = "HX-Request";
pub const HX_CURRENT_URL: &str = "HX-Current-URL";
pub const HX_TRIGGER: &str = "HX-Trigger";
pub const HX_TRIGGER_NAME: &str = "HX-Trigger-Name";
pub const HX_TARGET: &str = "HX-Target";
pub const HX_PROMPT: &str = "HX-Prompt";
pub const HX_REDIRECT: &str = "HX-Redirect";
pub const HX_REFRESH: &str = "HX-Refresh";
pub const CONTENT_TYPE: &str = "Content-Type";
pub const APPLICATION_JSON: &str = "application/json";

/// Everything [`build_headers`] reads.
#[derive(Debug, Clone, Default)]
pub struct HeaderInputs<'a> {
	pub current_url: &'a str,
	pub trigger_id: &'a str,
	pub trigger_name: &'a str,
	pub target_id: &'a str,
	/// Collected by `hx-prompt`.
	pub prompt: Option<&'a str>,
	/// Raw `hx-headers`.
	pub custom: Option<&'a str>,
}

/// An ordered header list. Setting an existing name (case-insensitively) replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderList(Vec<(String, String)>);

impl HeaderList {
	pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
		let (name, value) = (name.into(), value.into());
		match self.0.iter_mut().find(|(existing, _)| existing.eq_ignore_ascii_case(&name)) {
			Some((_, existing)) => *existing = value,
			None => self.0.push((name, value)),
		}
	}

	#[must_use]
	pub fn get(&self, name: &str) -> Option<&str> {
		self.0.iter().find(|(existing, _)| existing.eq_ignore_ascii_case(name)).map(|(_, value)| value.as_str())
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
		self.0.iter().map(|(name, value)| (name.as_str(), value.as_str()))
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.0.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}

/// Parses `hx-headers`. Non-string values are sent as their JSON text.
///
/// # Errors
///
/// Iff `custom` isn't a JSON object.
pub fn parse_custom(custom: &str) -> Result<Vec<(String, String)>, Error> {
	match serde_json::from_str(custom) {
		Ok(Value::Object(map)) => Ok(map
			.into_iter()
			.map(|(name, value)| match value {
				Value::String(value) => (name, value),
				other => (name, other.to_string()),
			})
			.collect()),
		Ok(other) => Err(Error::InvalidJson {
			attribute: HX_HEADERS,
			source: serde::de::Error::custom(format_args!("expected an object, found {}", other)),
		}),
		Err(source) => Err(Error::InvalidJson { attribute: HX_HEADERS, source }),
	}
}

/// The fixed request headers plus the stashed prompt value and `hx-headers`, which are merged last.
#[must_use]
pub fn build_headers(inputs: &HeaderInputs<'_>) -> HeaderList {
	let mut headers = HeaderList::default();
	headers.set(HX_REQUEST, "true");
	headers.set(HX_CURRENT_URL, inputs.current_url);
	headers.set(HX_TRIGGER, if inputs.trigger_id.is_empty() { inputs.trigger_name } else { inputs.trigger_id });
	headers.set(HX_TRIGGER_NAME, inputs.trigger_name);
	headers.set(HX_TARGET, inputs.target_id);

	if let Some(prompt) = inputs.prompt {
		headers.set(HX_PROMPT, prompt)
	}

	if let Some(custom) = inputs.custom {
		match parse_custom(custom) {
			Ok(custom) => {
				for (name, value) in custom {
					headers.set(name, value)
				}
			}
			Err(error) => error!("{}", error),
		}
	}

	headers
}

/// What a response asks for before its body is read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseAction {
	Redirect(String),
	Refresh,
	Swap,
}

impl ResponseAction {
	#[must_use]
	pub fn classify(redirect: Option<&str>, refresh: Option<&str>) -> Self {
		if let Some(location) = redirect.filter(|location| !location.is_empty()) {
			return Self::Redirect(location.to_owned());
		}
		if refresh.map(str::trim) == Some("true") {
			return Self::Refresh;
		}
		Self::Swap
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn inputs() -> HeaderInputs<'static> {
		HeaderInputs {
			current_url: "https://example.com/page",
			trigger_id: "",
			trigger_name: "q",
			target_id: "results",
			..HeaderInputs::default()
		}
	}

	#[test]
	fn fixed_headers() {
		let headers = build_headers(&inputs());
		assert_eq!(headers.get(HX_REQUEST), Some("true"));
		assert_eq!(headers.get("hx-current-url"), Some("https://example.com/page"));
		assert_eq!(headers.get(HX_TRIGGER), Some("q"));
		assert_eq!(headers.get(HX_TRIGGER_NAME), Some("q"));
		assert_eq!(headers.get(HX_TARGET), Some("results"));
		assert_eq!(headers.get(HX_PROMPT), None);
	}

	#[test]
	fn trigger_prefers_id() {
		let headers = build_headers(&HeaderInputs { trigger_id: "search", ..inputs() });
		assert_eq!(headers.get(HX_TRIGGER), Some("search"));
		assert_eq!(headers.get(HX_TRIGGER_NAME), Some("q"));
	}

	#[test]
	fn prompt_and_custom() {
		let headers = build_headers(&HeaderInputs {
			prompt: Some("yes"),
			custom: Some(r#"{"X-Token": "abc", "hx-target": "override", "X-Count": 3}"#),
			..inputs()
		});
		assert_eq!(headers.get(HX_PROMPT), Some("yes"));
		assert_eq!(headers.get("X-Token"), Some("abc"));
		assert_eq!(headers.get("X-Count"), Some("3"));
		assert_eq!(headers.get(HX_TARGET), Some("override"));
	}

	#[test]
	fn malformed_custom_headers_are_ignored() {
		let headers = build_headers(&HeaderInputs { custom: Some("{oops"), ..inputs() });
		assert_eq!(headers.len(), 5);
		assert_eq!(headers.get(HX_REQUEST), Some("true"));
	}

	#[test]
	fn classification() {
		assert_eq!(ResponseAction::classify(Some("/login"), Some("true")), ResponseAction::Redirect("/login".to_owned()));
		assert_eq!(ResponseAction::classify(None, Some("true")), ResponseAction::Refresh);
		assert_eq!(ResponseAction::classify(Some(""), Some("false")), ResponseAction::Swap);
		assert_eq!(ResponseAction::classify(None, None), ResponseAction::Swap);
	}
}
