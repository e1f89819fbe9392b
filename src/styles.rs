use crate::config::Config;
use tracing::{error, trace};
use web_sys::Document;

/// Marks the injected `<style>` so it's only injected once per document.
const STYLE_MARKER: &str = "data-htmx-styles";

/// The default indicator, swapping and settling rules for `config`'s class names.
#[must_use]
pub fn default_styles(config: &Config) -> String {
	let Config {
		indicator_class,
		request_class,
		swapping_class,
		settling_class,
		..
	} = config;
	format!(
		".{indicator} {{ display: none; }}\n\
		.{request} .{indicator} {{ display: inline-block; }}\n\
		.{swapping} {{ opacity: 0; transition: opacity 0.2s ease-out; }}\n\
		.{settling} {{ opacity: 1; transition: opacity 0.2s ease-in; }}\n",
		indicator = indicator_class,
		request = request_class,
		swapping = swapping_class,
		settling = settling_class,
	)
}

/// Appends [`default_styles`] to `<head>` unless that already happened.
pub fn inject(document: &Document, config: &Config) {
	if let Ok(Some(_)) = document.query_selector(&format!("style[{}]", STYLE_MARKER)) {
		return trace!("Default styles already present.");
	}
	let head = match document.head() {
		Some(head) => head,
		None => return error!("No <head> to inject default styles into."),
	};
	let style = match document.create_element("style") {
		Ok(style) => style,
		Err(error) => return error!("Failed to create <style>: {:?}", error),
	};
	if let Err(error) = style.set_attribute(STYLE_MARKER, "") {
		error!("Failed to mark default styles: {:?}", error)
	}
	style.set_text_content(Some(&default_styles(config)));
	if let Err(error) = head.append_child(&style) {
		error!("Failed to inject default styles: {:?}", error)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn uses_configured_classes() {
		let config = Config {
			indicator_class: "spinner".to_owned(),
			request_class: "busy".to_owned(),
			..Config::default()
		};
		let css = default_styles(&config);
		assert!(css.contains(".spinner { display: none; }"));
		assert!(css.contains(".busy .spinner { display: inline-block; }"));
		assert!(css.contains(".htmx-settling { opacity: 1;"));
	}
}
