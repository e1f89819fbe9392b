use js_sys::Promise;
use tracing::{error, trace};
use wasm_bindgen::{closure::Closure, JsCast, JsValue, UnwrapThrowExt};
use wasm_bindgen_futures::JsFuture;

/// A pending `setTimeout`. Dropping it clears the timeout.
#[derive(Debug)]
pub struct Timeout {
	id: Option<i32>,
	_callback: Closure<dyn FnMut()>,
}

impl Timeout {
	/// Schedules `callback` to run once after `millis`.
	///
	/// The returned handle must be kept alive until then.
	#[must_use]
	pub fn new(millis: u32, callback: impl FnOnce() + 'static) -> Self {
		let mut callback = Some(callback);
		let closure = Closure::wrap(Box::new(move || {
			if let Some(callback) = callback.take() {
				callback()
			}
		}) as Box<dyn FnMut()>);

		let id = match web_sys::window()
			.expect_throw("hx-dom: No `window` available.")
			.set_timeout_with_callback_and_timeout_and_arguments_0(closure.as_ref().unchecked_ref(), millis.min(i32::MAX as u32) as i32)
		{
			Ok(id) => Some(id),
			Err(error) => {
				error!("Failed to schedule timeout: {:?}", error);
				None
			}
		};

		Self { id, _callback: closure }
	}
}

impl Drop for Timeout {
	fn drop(&mut self) {
		if let Some(id) = self.id {
			if let Some(window) = web_sys::window() {
				window.clear_timeout_with_handle(id);
				trace!("Cleared timeout {}.", id);
			}
		}
	}
}

/// Resolves after `millis`.
pub async fn sleep(millis: u32) {
	let promise = Promise::new(&mut |resolve, reject| {
		let window = match web_sys::window() {
			Some(window) => window,
			None => {
				return drop(reject.call1(&JsValue::UNDEFINED, &JsValue::from_str("no window")));
			}
		};
		if let Err(error) = window.set_timeout_with_callback_and_timeout_and_arguments_0(&resolve, millis.min(i32::MAX as u32) as i32) {
			drop(reject.call1(&JsValue::UNDEFINED, &error));
		}
	});
	if let Err(error) = JsFuture::from(promise).await {
		error!("Sleep failed: {:?}", error)
	}
}
