//! History snapshots for `hx-push-url`/`hx-replace-url`, restored on `popstate`.

use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument};
use wasm_bindgen::JsValue;
use web_sys::Window;

/// The state object pushed for navigating swaps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistorySnapshot {
	/// Distinguishes our entries from other scripts'.
	pub htmx: bool,
	/// The target's `innerHTML` before the swap.
	pub content: String,
	/// Selector that finds the target again.
	pub target: String,
	pub scroll_y: f64,
}

impl HistorySnapshot {
	#[must_use]
	pub fn new(content: String, target: String, scroll_y: f64) -> Self {
		Self { htmx: true, content, target, scroll_y }
	}

	/// Converts to a structured-cloneable JS object.
	///
	/// # Errors
	///
	/// Iff serialisation fails, which shouldn't happen.
	pub fn to_js(&self) -> Result<JsValue, JsValue> {
		let json = serde_json::to_string(self).map_err(|error| JsValue::from_str(&error.to_string()))?;
		js_sys::JSON::parse(&json)
	}

	/// Reads a snapshot back from `history.state`. Foreign or empty states yield [`None`].
	#[must_use]
	pub fn from_js(state: &JsValue) -> Option<Self> {
		if state.is_null() || state.is_undefined() {
			return None;
		}
		let json = js_sys::JSON::stringify(state).ok()?.as_string()?;
		Self::from_json(&json)
	}

	#[must_use]
	pub fn from_json(json: &str) -> Option<Self> {
		match serde_json::from_str::<Self>(json) {
			Ok(snapshot) if snapshot.htmx => Some(snapshot),
			Ok(_) => None,
			Err(error) => {
				debug!("Ignoring foreign history state: {}", error);
				None
			}
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryUpdate {
	Push,
	Replace,
}

/// Records `url` in the session history.
///
/// Pushed and replaced entries both carry `snapshot`.
#[instrument(skip(window, snapshot))]
pub fn record(window: &Window, update: HistoryUpdate, url: &str, snapshot: &HistorySnapshot) {
	let history = match window.history() {
		Ok(history) => history,
		Err(error) => return error!("No history available: {:?}", error),
	};

	let result = snapshot.to_js().and_then(|state| match update {
		HistoryUpdate::Push => history.push_state_with_url(&state, "", Some(url)),
		HistoryUpdate::Replace => history.replace_state_with_url(&state, "", Some(url)),
	});
	if let Err(error) = result {
		error!("Failed to update history: {:?}", error)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn json_shape() {
		let snapshot = HistorySnapshot::new("<p>old</p>".to_owned(), "#main".to_owned(), 120.0);
		let json = serde_json::to_value(&snapshot).unwrap();
		assert_eq!(json, serde_json::json!({"htmx": true, "content": "<p>old</p>", "target": "#main", "scrollY": 120.0}));
	}

	#[test]
	fn foreign_states_are_ignored() {
		assert_eq!(HistorySnapshot::from_json(r#"{"page": 3}"#), None);
		assert_eq!(HistorySnapshot::from_json(r#"{"htmx": false, "content": "", "target": "body", "scrollY": 0}"#), None);
		assert_eq!(
			HistorySnapshot::from_json(r#"{"htmx": true, "content": "x", "target": "body", "scrollY": 0}"#),
			Some(HistorySnapshot::new("x".to_owned(), "body".to_owned(), 0.0))
		);
	}
}
