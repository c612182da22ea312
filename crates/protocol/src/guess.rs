//! Outbound guess message.

use serde::{Deserialize, Serialize};

/// Client-to-server message carrying the player's guess text.
///
/// One `GameGuess` is built per send, serialized onto the wire, and
/// discarded; it has no retained identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameGuess {
	/// The guess text exactly as the player entered it.
	pub guess: String,
}

impl GameGuess {
	/// Creates a guess message from the player's input.
	pub fn new(guess: impl Into<String>) -> Self {
		Self {
			guess: guess.into(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn guess_wire_shape() {
		let json = serde_json::to_value(GameGuess::new("dog")).unwrap();
		assert_eq!(json, serde_json::json!({"guess": "dog"}));
	}

	#[test]
	fn guess_preserves_text_verbatim() {
		let guess = GameGuess::new("  Bärsärk  ");
		assert_eq!(guess.guess, "  Bärsärk  ");
	}
}
