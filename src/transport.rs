//! The network seam. [`FetchTransport`] is the browser `fetch` implementation.

use crate::{
	attributes::Method,
	body::{Encoding, Payload},
	error::{js_error_message, Error, Result},
	headers::{HeaderList, HX_REDIRECT, HX_REFRESH},
};
use async_trait::async_trait;
use tracing::{instrument, trace};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{AbortSignal, Headers, RequestInit, Response};

/// A fully built request, ready to send.
#[derive(Debug, Clone)]
pub struct HxRequest {
	pub method: Method,
	pub url: String,
	pub headers: HeaderList,
	/// `None` for GET requests and empty payloads.
	pub body: Option<Payload>,
}

/// The parts of a response the engine reads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HxResponse {
	pub status: u16,
	pub redirect: Option<String>,
	pub refresh: Option<String>,
	pub text: String,
}

/// Sends requests on the engine's behalf.
///
/// Implementations should give up with [`Error::Aborted`] once `signal` is aborted.
#[async_trait(?Send)]
pub trait Transport {
	async fn send(&self, request: HxRequest, signal: &AbortSignal) -> Result<HxResponse>;
}

/// `window.fetch`.
///
/// Multipart payloads are sent as [`web_sys::FormData`], so the browser picks the boundary.
/// Others are JSON-serialised. The `Content-Type` header is expected to be set already.
#[derive(Debug, Default, Clone, Copy)]
pub struct FetchTransport;

#[async_trait(?Send)]
impl Transport for FetchTransport {
	#[instrument(skip(self, request, signal), fields(method = %request.method, url = %request.url))]
	async fn send(&self, request: HxRequest, signal: &AbortSignal) -> Result<HxResponse> {
		let headers = Headers::new()?;
		for (name, value) in request.headers.iter() {
			headers.set(name, value)?;
		}

		let mut init = RequestInit::new();
		init.method(request.method.as_http()).headers(&headers).signal(Some(signal));

		if let Some(payload) = &request.body {
			let body: JsValue = match payload.encoding() {
				Encoding::Multipart => payload.to_form_data()?.into(),
				Encoding::Json => JsValue::from_str(&payload.to_json().to_string()),
			};
			init.body(Some(&body));
		}

		let window = web_sys::window().ok_or_else(|| Error::Js("no window".to_owned()))?;
		let response = JsFuture::from(window.fetch_with_str_and_init(&request.url, &init)).await.map_err(|error| transport_error(&error, signal))?;
		let response: Response = response.dyn_into()?;
		trace!(status = response.status(), "Received response headers.");

		let redirect = response.headers().get(HX_REDIRECT)?;
		let refresh = response.headers().get(HX_REFRESH)?;

		// The body is only read if neither header short-circuits.
		let text = if redirect.is_some() || refresh.as_deref().map(str::trim) == Some("true") {
			String::new()
		} else {
			JsFuture::from(response.text()?).await.map_err(|error| transport_error(&error, signal))?.as_string().unwrap_or_default()
		};

		Ok(HxResponse {
			status: response.status(),
			redirect,
			refresh,
			text,
		})
	}
}

fn transport_error(error: &JsValue, signal: &AbortSignal) -> Error {
	if signal.aborted() {
		Error::Aborted
	} else {
		Error::Transport(js_error_message(error))
	}
}
