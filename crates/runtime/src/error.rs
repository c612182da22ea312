//! Error types for the gallows session runtime.

use thiserror::Error;

/// Result type alias for runtime operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while establishing or running a game session.
///
/// Connect-category errors (`ConnectTimeout`, `Connect`) surface
/// synchronously from [`Session::connect`](crate::Session::connect) and are
/// fatal. Receive-category errors (`ReadTimeout`, `ConnectionLost`,
/// `Malformed`) are carried by the single terminal
/// [`SessionEvent::Terminated`](crate::SessionEvent::Terminated) event.
/// Send failures surface as the explicit result of
/// [`Session::send`](crate::Session::send).
#[derive(Debug, Error)]
pub enum Error {
	/// Connection establishment did not complete within the configured timeout.
	#[error("connection to {addr} timed out after {timeout_ms}ms")]
	ConnectTimeout { addr: String, timeout_ms: u64 },

	/// The peer was unreachable or socket setup failed.
	#[error("failed to connect to {addr}: {source}")]
	Connect {
		addr: String,
		#[source]
		source: std::io::Error,
	},

	/// No message arrived within the configured read timeout.
	#[error("no message from the server within {timeout_ms}ms")]
	ReadTimeout { timeout_ms: u64 },

	/// The peer closed the connection or the stream failed mid-read.
	#[error("connection lost to the server: {0}")]
	ConnectionLost(String),

	/// The inbound byte stream could not be decoded as a framed message.
	#[error("malformed frame: {0}")]
	Malformed(String),

	/// The session has terminated; no further sends will succeed.
	#[error("session is closed")]
	SessionClosed,

	/// I/O error on the underlying socket.
	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	/// JSON serialization/deserialization error.
	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),
}

impl Error {
	/// Returns true if this is a connect- or read-timeout error.
	pub fn is_timeout(&self) -> bool {
		matches!(
			self,
			Error::ConnectTimeout { .. } | Error::ReadTimeout { .. }
		)
	}

	/// Returns true if the session is unusable because the connection is gone.
	pub fn is_closed(&self) -> bool {
		matches!(self, Error::SessionClosed | Error::ConnectionLost(_))
	}
}
