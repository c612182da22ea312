//! Session lifecycle and event dispatch.
//!
//! A [`Session`] owns one persistent connection to the game server. The
//! receive path runs on two cooperative tasks: the transport read loop
//! decodes frames onto a channel, and the dispatch task turns decoded
//! frames into [`SessionEvent`]s, applying the read timeout and the
//! terminal-transition rule.
//!
//! The session is a two-state machine: it is listening from the moment
//! [`Session::connect`] returns, and it terminates exactly once - on the
//! first transport failure, read timeout, malformed frame, or explicit
//! [`Session::close`]. The terminal event is always the last one the
//! [`SessionEvents`] sequence yields.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use gallows_protocol::{GameGuess, GameState};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::{Mutex, Notify, mpsc};
use tokio::task::JoinHandle;
use tokio::time::timeout;

use crate::error::{Error, Result};
use crate::transport::{TcpTransport, Transport, TransportParts};

#[cfg(test)]
mod tests;

/// Connection parameters for a game session.
///
/// One duration bounds both connection establishment and each blocking
/// read; there is no separate idle timeout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
	/// Server host name or address.
	pub host: String,
	/// Server TCP port.
	pub port: u16,
	/// Bound, in milliseconds, on connect and on each blocking read.
	pub timeout_ms: u64,
}

impl SessionConfig {
	/// The configured timeout as a [`Duration`].
	pub fn timeout(&self) -> Duration {
		Duration::from_millis(self.timeout_ms)
	}

	fn addr(&self) -> String {
		format!("{}:{}", self.host, self.port)
	}
}

impl Default for SessionConfig {
	fn default() -> Self {
		Self {
			host: "127.0.0.1".to_string(),
			port: 8080,
			timeout_ms: 30_000,
		}
	}
}

/// One occurrence on a session's event sequence.
#[derive(Debug)]
pub enum SessionEvent {
	/// One inbound game-state snapshot, in arrival order.
	State(GameState),
	/// The terminal transition. Always the final event of a session, and
	/// emitted exactly once.
	Terminated(Error),
}

/// Lazy, finite, non-restartable sequence of session events.
///
/// Yields [`SessionEvent::State`] once per inbound message, in the order
/// the server wrote them, then exactly one [`SessionEvent::Terminated`],
/// then `None` forever. Dropping it stops the session's receive tasks.
pub struct SessionEvents {
	rx: mpsc::UnboundedReceiver<SessionEvent>,
}

impl SessionEvents {
	/// Awaits the next event. Returns `None` once the terminal event has
	/// been consumed.
	pub async fn next(&mut self) -> Option<SessionEvent> {
		self.rx.recv().await
	}
}

/// Handle to one live connection to the game server.
///
/// `Session` is the sole owner of the transport; guesses and game states
/// are transient values flowing through it, never stored. Both socket
/// halves are released on every exit path: the write half when the
/// `Session` drops, the read half when the receive tasks stop.
pub struct Session {
	sender: Mutex<Box<dyn Transport>>,
	terminated: Arc<AtomicBool>,
	shutdown: Arc<Notify>,
}

impl Session {
	/// Opens a TCP connection to the configured server and starts the
	/// receive tasks.
	///
	/// The configured timeout bounds connection establishment; the same
	/// duration then bounds every subsequent read.
	///
	/// # Errors
	///
	/// Returns [`Error::ConnectTimeout`] if the peer does not accept within
	/// the timeout, or [`Error::Connect`] if it is unreachable or socket
	/// setup fails. Both are fatal: there is no session to listen on or
	/// send through afterward.
	pub async fn connect(config: &SessionConfig) -> Result<(Session, SessionEvents)> {
		let addr = config.addr();
		tracing::debug!(%addr, timeout_ms = config.timeout_ms, "connecting");

		let connected = timeout(config.timeout(), TcpStream::connect(addr.as_str())).await;
		let stream = match connected {
			Err(_) => {
				return Err(Error::ConnectTimeout {
					addr,
					timeout_ms: config.timeout_ms,
				});
			}
			Ok(Err(source)) => return Err(Error::Connect { addr, source }),
			Ok(Ok(stream)) => stream,
		};

		let (read_half, write_half) = stream.into_split();
		let (transport, message_rx) = TcpTransport::new(write_half, read_half);
		let parts = transport.into_transport_parts(message_rx);

		Ok(Self::from_parts(parts, config.timeout()))
	}

	/// Builds a session from pre-established transport parts.
	///
	/// Production code goes through [`Session::connect`]; tests drive a
	/// session over in-memory pipes with this.
	pub fn from_parts(parts: TransportParts, read_timeout: Duration) -> (Session, SessionEvents) {
		let TransportParts {
			sender,
			mut receiver,
			message_rx,
		} = parts;

		let reader = tokio::spawn(async move { receiver.run().await });

		let (events_tx, events_rx) = mpsc::unbounded_channel();
		let terminated = Arc::new(AtomicBool::new(false));
		let shutdown = Arc::new(Notify::new());

		tokio::spawn(dispatch(
			message_rx,
			reader,
			events_tx,
			Arc::clone(&terminated),
			Arc::clone(&shutdown),
			read_timeout,
		));

		(
			Session {
				sender: Mutex::new(sender),
				terminated,
				shutdown,
			},
			SessionEvents { rx: events_rx },
		)
	}

	/// Serializes one guess, writes it as a single frame, and flushes.
	///
	/// Safe to call from any task; concurrent senders serialize on the
	/// outbound half, so frames are never interleaved. Each frame is
	/// encoded independently of every previous send.
	///
	/// # Errors
	///
	/// Returns [`Error::SessionClosed`] without touching the wire once the
	/// session has terminated, or the underlying write/serialization error.
	pub async fn send(&self, guess: &str) -> Result<()> {
		if self.terminated.load(Ordering::SeqCst) {
			return Err(Error::SessionClosed);
		}

		let message = serde_json::to_value(GameGuess::new(guess))?;
		let mut sender = self.sender.lock().await;
		sender.send(message).await
	}

	/// Signals the session to stop.
	///
	/// The dispatch task observes the signal, emits the terminal event
	/// with [`Error::SessionClosed`] as the reason, and stops the receive
	/// tasks. Subsequent [`Session::send`] calls fail immediately.
	/// Idempotent.
	pub fn close(&self) {
		self.terminated.store(true, Ordering::SeqCst);
		self.shutdown.notify_one();
	}

	/// Returns true once the session has terminated (or was closed).
	pub fn is_terminated(&self) -> bool {
		self.terminated.load(Ordering::SeqCst)
	}
}

/// Turns decoded frames into session events until the first failure or
/// stop signal, then emits the terminal event exactly once.
async fn dispatch(
	mut message_rx: mpsc::UnboundedReceiver<Value>,
	mut reader: JoinHandle<Result<()>>,
	events_tx: mpsc::UnboundedSender<SessionEvent>,
	terminated: Arc<AtomicBool>,
	shutdown: Arc<Notify>,
	read_timeout: Duration,
) {
	let reason = loop {
		tokio::select! {
			_ = shutdown.notified() => {
				break Error::SessionClosed;
			}
			_ = events_tx.closed() => {
				// Event consumer is gone; nobody is left to notify.
				terminated.store(true, Ordering::SeqCst);
				reader.abort();
				return;
			}
			next = timeout(read_timeout, message_rx.recv()) => match next {
				Err(_) => {
					break Error::ReadTimeout {
						timeout_ms: read_timeout.as_millis() as u64,
					};
				}
				Ok(None) => break reader_outcome(&mut reader).await,
				Ok(Some(value)) => {
					if !value.is_object() {
						break Error::Malformed(format!(
							"expected a game state object, got: {}",
							value
						));
					}
					let state = GameState::new(value);
					if events_tx.send(SessionEvent::State(state)).is_err() {
						terminated.store(true, Ordering::SeqCst);
						reader.abort();
						return;
					}
				}
			}
		}
	};

	terminated.store(true, Ordering::SeqCst);
	reader.abort();
	tracing::debug!(%reason, "session terminated");
	let _ = events_tx.send(SessionEvent::Terminated(reason));
}

/// Maps the finished read loop onto the reason the session died.
async fn reader_outcome(reader: &mut JoinHandle<Result<()>>) -> Error {
	match reader.await {
		Ok(Err(e)) => e,
		Ok(Ok(())) => Error::ConnectionLost("connection closed by the server".to_string()),
		Err(_) => Error::ConnectionLost("receive task failed".to_string()),
	}
}
