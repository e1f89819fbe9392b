//! `hx-sync` coordination between requests that share a coordinating element.

use crate::attributes::REQUESTING;
use tracing::{debug, error, trace};
use web_sys::{AbortController, Document, Element};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncTarget {
	/// The requesting element itself.
	This,
	Selector(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStrategy {
	/// Abandon the new request while another is in flight.
	Drop,
	/// Cancel the in-flight request and proceed.
	Abort,
	/// Proceed. Overlapping swaps are last-writer-wins.
	Proceed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSpec {
	pub target: SyncTarget,
	pub strategy: SyncStrategy,
}

impl SyncStrategy {
	/// Recognises a strategy name. `replace` and the `queue` variants are accepted but only proceed.
	#[must_use]
	pub fn parse(name: &str) -> Option<Self> {
		match name.trim() {
			"drop" => Some(Self::Drop),
			"abort" => Some(Self::Abort),
			"replace" | "queue" | "queue first" | "queue last" | "queue all" => Some(Self::Proceed),
			_ => None,
		}
	}
}

impl SyncSpec {
	/// Parses `<selector|this>[:<strategy>]`.
	///
	/// The text after the last `:` is split off only if it names a strategy, so selectors may contain colons.
	#[must_use]
	pub fn parse(value: &str) -> Option<Self> {
		let value = value.trim();
		let split = value.rfind(':').and_then(|i| SyncStrategy::parse(&value[i + 1..]).map(|strategy| (&value[..i], strategy)));
		let (target, strategy) = split.unwrap_or((value, SyncStrategy::Proceed));
		let target = match target.trim() {
			"" => return None,
			"this" => SyncTarget::This,
			selector => SyncTarget::Selector(selector.to_owned()),
		};
		Some(Self { target, strategy })
	}

	#[must_use]
	pub fn resolve(&self, document: &Document, source: &Element) -> Option<Element> {
		match &self.target {
			SyncTarget::This => Some(source.clone()),
			SyncTarget::Selector(selector) => match document.query_selector(selector) {
				Ok(element) => element,
				Err(error) => {
					error!("Invalid hx-sync selector {:?}: {:?}", selector, error);
					None
				}
			},
		}
	}
}

/// What to do about a new request on a coordinating element.
#[derive(Debug)]
pub enum Admission {
	Proceed,
	Drop,
	/// Proceed after aborting this controller.
	AbortPrevious(AbortController),
}

/// The in-flight requests of every coordinating element.
///
/// Each entry mirrors the [`REQUESTING`] flag on its element, whose value is the owning request's id.
#[derive(Debug, Default)]
pub struct InFlight(Vec<(Element, u64, AbortController)>);

impl InFlight {
	#[must_use]
	pub fn admit(&self, coordinator: &Element, strategy: SyncStrategy) -> Admission {
		let busy = coordinator.has_attribute(REQUESTING);
		match (busy, strategy) {
			(false, _) | (true, SyncStrategy::Proceed) => Admission::Proceed,
			(true, SyncStrategy::Drop) => Admission::Drop,
			(true, SyncStrategy::Abort) => match self.0.iter().find(|(element, _, _)| element == coordinator) {
				Some((_, _, controller)) => Admission::AbortPrevious(controller.clone()),
				None => {
					debug!("Coordinating element is flagged busy by another engine. Nothing to abort.");
					Admission::Proceed
				}
			},
		}
	}

	/// Flags `coordinator` as owned by request `id`.
	pub fn acquire(&mut self, coordinator: &Element, id: u64, controller: &AbortController) {
		if let Err(error) = coordinator.set_attribute(REQUESTING, &id.to_string()) {
			error!("Failed to set the sync flag: {:?}", error)
		}
		self.0.retain(|(element, _, _)| element != coordinator);
		self.0.push((coordinator.clone(), id, controller.clone()));
	}

	/// Clears the flag, but only if request `id` still owns it.
	pub fn release(&mut self, coordinator: &Element, id: u64) {
		let before = self.0.len();
		self.0.retain(|(element, owner, _)| !(element == coordinator && *owner == id));
		if self.0.len() == before {
			return trace!("Sync flag was taken over by a newer request.");
		}
		if coordinator.get_attribute(REQUESTING).as_deref() == Some(id.to_string().as_str()) {
			if let Err(error) = coordinator.remove_attribute(REQUESTING) {
				error!("Failed to clear the sync flag: {:?}", error)
			}
		}
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
