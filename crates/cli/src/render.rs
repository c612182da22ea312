//! Console rendering of game-state snapshots.

use gallows_protocol::GameState;
use serde_json::Value;

/// Formats one snapshot for the terminal.
///
/// The session layer treats snapshots as opaque, so this renders the
/// hangman fields the server is known to report and degrades to raw JSON
/// for anything unfamiliar.
pub fn render_state(state: &GameState) -> String {
	let mut parts = Vec::new();

	if let Some(Value::String(word)) = state.field("word") {
		parts.push(format!("word: {}", spaced(word)));
	}
	if let Some(attempts) = state.field("attempts").and_then(Value::as_i64) {
		parts.push(format!("attempts left: {attempts}"));
	}
	if let Some(score) = state.field("score").and_then(Value::as_i64) {
		parts.push(format!("score: {score}"));
	}
	if let Some(correct) = state.field("correct").and_then(Value::as_bool) {
		parts.push(if correct { "correct!" } else { "wrong" }.to_string());
	}
	if state.field("finished").and_then(Value::as_bool) == Some(true) {
		parts.push("game over".to_string());
	}

	if parts.is_empty() {
		state.as_value().to_string()
	} else {
		parts.join("  |  ")
	}
}

/// Spreads the masked word out so underscores are readable.
fn spaced(word: &str) -> String {
	word.chars()
		.map(|c| c.to_string())
		.collect::<Vec<_>>()
		.join(" ")
}
