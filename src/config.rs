use crate::swap::SwapStrategy;
use serde::Deserialize;
use tracing::{debug, error};

/// Name of the `<meta>` element whose `content` may override [`Config`] defaults.
pub const META_NAME: &str = "htmx-config";

/// Engine configuration, fixed after [`Engine::new`](`crate::Engine::new`).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
	/// Whether `popstate` restores snapshots pushed by `hx-push-url`.
	pub history_enabled: bool,
	/// Request timeout in milliseconds. `0` disables it.
	pub timeout: u32,
	pub scroll_behavior: ScrollBehavior,
	/// Swap strategy used when an element declares no `hx-swap`.
	pub default_swap_style: SwapStrategy,
	pub default_swap_delay: u32,
	pub default_settle_delay: u32,
	pub include_indicator_styles: bool,
	pub indicator_class: String,
	pub request_class: String,
	pub swapping_class: String,
	pub settling_class: String,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			history_enabled: true,
			timeout: 0,
			scroll_behavior: ScrollBehavior::Smooth,
			default_swap_style: SwapStrategy::InnerHtml,
			default_swap_delay: 0,
			default_settle_delay: 20,
			include_indicator_styles: true,
			indicator_class: "htmx-indicator".to_owned(),
			request_class: "htmx-request".to_owned(),
			swapping_class: "htmx-swapping".to_owned(),
			settling_class: "htmx-settling".to_owned(),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrollBehavior {
	Auto,
	Smooth,
	Instant,
}

impl From<ScrollBehavior> for web_sys::ScrollBehavior {
	fn from(behavior: ScrollBehavior) -> Self {
		match behavior {
			ScrollBehavior::Auto => Self::Auto,
			ScrollBehavior::Smooth => Self::Smooth,
			ScrollBehavior::Instant => Self::Instant,
		}
	}
}

impl Config {
	/// Parses a (partial) JSON override on top of the defaults.
	///
	/// # Errors
	///
	/// Iff `json` is not a valid configuration object.
	pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
		serde_json::from_str(json)
	}

	/// Reads `<meta name="htmx-config" content="…">` from `document`, if present.
	///
	/// Invalid JSON is logged and otherwise ignored.
	#[must_use]
	pub fn from_document(document: &web_sys::Document) -> Self {
		let meta = match document.query_selector(&format!("meta[name={:?}]", META_NAME)) {
			Ok(Some(meta)) => meta,
			Ok(None) => return Self::default(),
			Err(error) => {
				error!("Failed to query for the configuration <meta> element: {:?}", error);
				return Self::default();
			}
		};

		match meta.get_attribute("content") {
			Some(content) => match Self::from_json(&content) {
				Ok(config) => {
					debug!(?config, "Loaded configuration from <meta>.");
					config
				}
				Err(error) => {
					error!("Invalid {} JSON, using defaults: {}", META_NAME, error);
					Self::default()
				}
			},
			None => Self::default(),
		}
	}
}
