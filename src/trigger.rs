//! `hx-trigger` grammar.
//!
//! ```text
//! trigger  := clause ("," clause)*
//! clause   := event-name modifier*
//! modifier := "once" | "changed" | "delay:" duration | "throttle:" duration | "threshold:" float
//! duration := integer ("ms" | "s")?
//! ```
//!
//! Unrecognised modifiers are skipped, so parsing never fails.

use core::fmt::{self, Display, Formatter};

/// The event half of a trigger clause.
///
/// Anything other than the three synthetic events binds a plain DOM listener.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TriggerEvent {
	/// The window's `load` event.
	Load,
	/// The first time the element scrolls into view.
	Revealed,
	/// Every time the element starts intersecting the viewport.
	Intersect,
	Dom(String),
}

impl TriggerEvent {
	#[must_use]
	pub fn parse(name: &str) -> Self {
		match name {
			"load" => Self::Load,
			"revealed" => Self::Revealed,
			"intersect" => Self::Intersect,
			other => Self::Dom(other.to_owned()),
		}
	}

	#[must_use]
	pub fn name(&self) -> &str {
		match self {
			Self::Load => "load",
			Self::Revealed => "revealed",
			Self::Intersect => "intersect",
			Self::Dom(name) => name,
		}
	}
}

impl Display for TriggerEvent {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.write_str(self.name())
	}
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Modifiers {
	pub once: bool,
	pub changed: bool,
	/// Milliseconds.
	pub delay: Option<u32>,
	/// Milliseconds. Behaves as a trailing debounce, exactly like `delay`.
	pub throttle: Option<u32>,
	pub threshold: Option<f64>,
}

impl Modifiers {
	/// The debounce interval, if any. `delay` wins over `throttle`.
	///
	/// A zero interval counts as none.
	#[must_use]
	pub fn debounce(&self) -> Option<u32> {
		self.delay.filter(|&ms| ms > 0).or_else(|| self.throttle.filter(|&ms| ms > 0))
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct TriggerSpec {
	pub event: TriggerEvent,
	pub modifiers: Modifiers,
}

/// The trigger used when `hx-trigger` is absent.
#[must_use]
pub fn default_event(is_form: bool) -> &'static str {
	if is_form {
		"submit"
	} else {
		"click"
	}
}

/// Parses an `hx-trigger` value. `None` yields the element's default trigger.
#[must_use]
pub fn parse_triggers(attribute: Option<&str>, is_form: bool) -> Vec<TriggerSpec> {
	let attribute = match attribute.map(str::trim) {
		Some(attribute) if !attribute.is_empty() => attribute,
		_ => default_event(is_form),
	};

	attribute.split(',').filter_map(parse_clause).collect()
}

fn parse_clause(clause: &str) -> Option<TriggerSpec> {
	let mut tokens = clause.split_whitespace();
	let event = TriggerEvent::parse(tokens.next()?);

	let mut modifiers = Modifiers::default();
	for token in tokens {
		match token {
			"once" => modifiers.once = true,
			"changed" => modifiers.changed = true,
			_ => {
				if let Some(value) = token.strip_prefix("delay:") {
					modifiers.delay = parse_duration(value);
				} else if let Some(value) = token.strip_prefix("throttle:") {
					modifiers.throttle = parse_duration(value);
				} else if let Some(value) = token.strip_prefix("threshold:") {
					modifiers.threshold = value.parse().ok().filter(|threshold: &f64| threshold.is_finite());
				}
			}
		}
	}

	Some(TriggerSpec { event, modifiers })
}

/// Parses `300ms`, `2s` or a bare `300` (milliseconds).
///
/// Only the leading digits count, so `1.5s` is one second.
#[must_use]
pub fn parse_duration(token: &str) -> Option<u32> {
	let (number, scale) = if let Some(number) = token.strip_suffix("ms") {
		(number, 1)
	} else if let Some(number) = token.strip_suffix('s') {
		(number, 1000)
	} else {
		(token, 1)
	};

	let digits = number.trim_start();
	let end = digits.find(|c: char| !c.is_ascii_digit()).unwrap_or(digits.len());
	digits[..end].parse::<u32>().ok()?.checked_mul(scale)
}
