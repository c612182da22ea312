//! Inbound game-state snapshot.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Opaque, server-authoritative snapshot of game progress.
///
/// The session layer never interprets the payload; it decodes one JSON
/// object per inbound frame and hands the whole snapshot to the caller.
/// Downstream consumers (a renderer, a console view) pick out the fields
/// they understand via [`GameState::field`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameState(Value);

impl GameState {
	/// Wraps a decoded payload. The payload is expected to be a JSON
	/// object; the session layer rejects anything else before this point.
	pub fn new(payload: Value) -> Self {
		Self(payload)
	}

	/// Looks up a top-level field of the snapshot.
	pub fn field(&self, name: &str) -> Option<&Value> {
		self.0.get(name)
	}

	/// Borrows the raw payload.
	pub fn as_value(&self) -> &Value {
		&self.0
	}

	/// Consumes the snapshot, yielding the raw payload.
	pub fn into_inner(self) -> Value {
		self.0
	}
}
