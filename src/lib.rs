#![doc(html_root_url = "https://docs.rs/hx-dom/0.0.1")]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

#[cfg(doctest)]
pub mod readme {
	doc_comment::doctest!("../README.md");
}

pub mod attributes;
mod binder;
pub mod bindings;
pub mod body;
pub mod config;
mod engine;
pub mod error;
pub mod events;
pub mod headers;
pub mod history;
pub mod markup;
mod request;
pub mod styles;
pub mod swap;
pub mod sync;
pub mod timer;
pub mod transport;
pub mod trigger;

pub use attributes::RequestDescriptor;
pub use config::Config;
pub use engine::Engine;
pub use error::{Error, Result};
pub use swap::SwapStrategy;
pub use transport::{FetchTransport, HxRequest, HxResponse, Transport};

/// Starts an [`Engine`] configured by the page's `<meta name="htmx-config">` (if any) that sends requests through `fetch`.
///
/// The returned handle owns every binding. Dropping its last clone deactivates the page.
#[must_use = "dropping the engine unbinds everything again"]
pub fn start() -> Engine {
	let config = web_sys::window().and_then(|window| window.document()).map_or_else(Config::default, |document| Config::from_document(&document));
	let engine = Engine::with_fetch(config);
	engine.start();
	engine
}
