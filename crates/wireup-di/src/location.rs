//! Source locations used in diagnostics

use std::fmt;

/// Where a provider, binding or invoker was registered.
///
/// Captured with `#[track_caller]`, so the location points at the user's call
/// to [`Injector::provide`](crate::Injector::provide) and friends rather than at
/// library internals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Location {
	file: &'static str,
	line: u32,
	column: u32,
}

impl Location {
	/// Location of the (tracked) caller.
	#[track_caller]
	pub fn caller() -> Self {
		let loc = std::panic::Location::caller();
		Self {
			file: loc.file(),
			line: loc.line(),
			column: loc.column(),
		}
	}

	pub fn file(&self) -> &'static str {
		self.file
	}

	pub fn line(&self) -> u32 {
		self.line
	}

	pub fn column(&self) -> u32 {
		self.column
	}
}

impl fmt::Display for Location {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}:{}:{}", self.file, self.line, self.column)
	}
}
