//! Length-framed JSON transport over a byte stream pair.
//!
//! Every message on the wire is a 4-byte little-endian payload length
//! followed by that many bytes of self-describing JSON. The framing is
//! symmetric: guesses go out and game states come in through the same
//! encoding, and every frame is interpretable on its own - JSON carries no
//! object cache across writes, so nothing needs resetting between frames.
//!
//! Production sessions hand the two halves of a [`tokio::net::TcpStream`]
//! to [`TcpTransport::new`]; tests drive the same code with
//! [`tokio::io::duplex`] pipes.

use std::future::Future;
use std::pin::Pin;

use serde_json::Value;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

use crate::error::{Error, Result};


/// Byte length of the frame length prefix.
pub const FRAME_PREFIX_LEN: usize = 4;

/// Upper bound on a single frame payload.
///
/// There is no partial-message recovery: an oversized frame poisons the
/// whole session rather than being skipped.
pub const MAX_FRAME_LEN: usize = 1024 * 1024;

/// Sender half of a transport: writes framed messages to the peer.
pub trait Transport: Send {
	/// Encodes and writes one framed message, flushing immediately.
	fn send(&mut self, message: Value) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Receiver half of a transport: reads framed messages until failure.
pub trait TransportReceiver: Send {
	/// Runs the read loop, pushing each decoded frame onto the message
	/// channel. Returns `Ok(())` only when the consumer went away; any
	/// transport failure is the error describing it.
	fn run(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Bundle of transport halves handed to the session controller.
pub struct TransportParts {
	/// Outbound half.
	pub sender: Box<dyn Transport>,
	/// Inbound half, to be driven by a dedicated task.
	pub receiver: Box<dyn TransportReceiver>,
	/// Receiving end of the decoded-frame channel fed by `receiver`.
	pub message_rx: mpsc::UnboundedReceiver<Value>,
}

/// Length-framed JSON transport over any `AsyncWrite`/`AsyncRead` pair.
pub struct TcpTransport<W, R> {
	writer: W,
	reader: R,
	message_tx: mpsc::UnboundedSender<Value>,
}

impl<W, R> TcpTransport<W, R>
where
	W: AsyncWrite + Unpin + Send + 'static,
	R: AsyncRead + Unpin + Send + 'static,
{
	/// Creates a transport around a byte stream pair.
	///
	/// Returns the transport and the receiving end of the channel onto
	/// which the read loop pushes decoded frames.
	pub fn new(writer: W, reader: R) -> (Self, mpsc::UnboundedReceiver<Value>) {
		let (message_tx, message_rx) = mpsc::unbounded_channel();
		(
			Self {
				writer,
				reader,
				message_tx,
			},
			message_rx,
		)
	}

	/// Splits into independently owned sender and receiver halves.
	pub fn into_parts(self) -> (TcpTransportSender<W>, TcpTransportReceiver<R>) {
		(
			TcpTransportSender {
				writer: self.writer,
			},
			TcpTransportReceiver {
				reader: self.reader,
				message_tx: self.message_tx,
			},
		)
	}

	/// Splits and boxes the halves together with the frame channel.
	pub fn into_transport_parts(
		self,
		message_rx: mpsc::UnboundedReceiver<Value>,
	) -> TransportParts {
		let (sender, receiver) = self.into_parts();
		TransportParts {
			sender: Box::new(sender),
			receiver: Box::new(receiver),
			message_rx,
		}
	}

	/// Runs the read loop without splitting first.
	pub async fn run(&mut self) -> Result<()> {
		read_loop(&mut self.reader, &self.message_tx).await
	}
}

/// Outbound half of a [`TcpTransport`].
pub struct TcpTransportSender<W> {
	writer: W,
}

impl<W> TcpTransportSender<W>
where
	W: AsyncWrite + Unpin + Send,
{
	/// Encodes `message`, writes the length prefix and payload, and flushes.
	///
	/// The caller is responsible for serializing concurrent senders; one
	/// call writes exactly one contiguous frame.
	pub async fn send(&mut self, message: Value) -> Result<()> {
		let payload = serde_json::to_vec(&message)?;
		if payload.len() > MAX_FRAME_LEN {
			return Err(Error::Malformed(format!(
				"outbound frame of {} bytes exceeds the {} byte limit",
				payload.len(),
				MAX_FRAME_LEN
			)));
		}

		let prefix = (payload.len() as u32).to_le_bytes();
		self.writer.write_all(&prefix).await?;
		self.writer.write_all(&payload).await?;
		self.writer.flush().await?;

		tracing::trace!(len = payload.len(), "frame sent");
		Ok(())
	}
}

impl<W> Transport for TcpTransportSender<W>
where
	W: AsyncWrite + Unpin + Send + 'static,
{
	fn send(&mut self, message: Value) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
		Box::pin(async move { TcpTransportSender::send(self, message).await })
	}
}

/// Inbound half of a [`TcpTransport`].
pub struct TcpTransportReceiver<R> {
	reader: R,
	message_tx: mpsc::UnboundedSender<Value>,
}

impl<R> TcpTransportReceiver<R>
where
	R: AsyncRead + Unpin + Send,
{
	/// Runs the read loop until the stream fails or the consumer goes away.
	pub async fn run(&mut self) -> Result<()> {
		read_loop(&mut self.reader, &self.message_tx).await
	}
}

impl<R> TransportReceiver for TcpTransportReceiver<R>
where
	R: AsyncRead + Unpin + Send + 'static,
{
	fn run(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
		Box::pin(async move { TcpTransportReceiver::run(self).await })
	}
}

/// Reads frames off `reader` and pushes each decoded payload onto
/// `message_tx`, one at a time, in arrival order.
async fn read_loop<R>(reader: &mut R, message_tx: &mpsc::UnboundedSender<Value>) -> Result<()>
where
	R: AsyncRead + Unpin,
{
	loop {
		let mut prefix = [0u8; FRAME_PREFIX_LEN];
		let mut filled = 0;
		while filled < FRAME_PREFIX_LEN {
			let n = reader
				.read(&mut prefix[filled..])
				.await
				.map_err(|e| Error::ConnectionLost(e.to_string()))?;
			if n == 0 {
				if filled == 0 {
					// EOF on a frame boundary: the peer closed the connection.
					return Err(Error::ConnectionLost(
						"connection closed by the server".to_string(),
					));
				}
				return Err(Error::Malformed(
					"failed to read length prefix: stream ended mid-prefix".to_string(),
				));
			}
			filled += n;
		}

		let len = u32::from_le_bytes(prefix) as usize;
		if len > MAX_FRAME_LEN {
			return Err(Error::Malformed(format!(
				"frame length {} exceeds the {} byte limit",
				len, MAX_FRAME_LEN
			)));
		}

		let mut payload = vec![0u8; len];
		reader
			.read_exact(&mut payload)
			.await
			.map_err(|e| match e.kind() {
				std::io::ErrorKind::UnexpectedEof => {
					Error::Malformed("stream ended mid-frame".to_string())
				}
				_ => Error::ConnectionLost(e.to_string()),
			})?;

		let message: Value = serde_json::from_slice(&payload)
			.map_err(|e| Error::Malformed(format!("invalid JSON payload: {}", e)))?;

		tracing::trace!(len, "frame received");

		if message_tx.send(message).is_err() {
			// Consumer is gone; stop reading quietly.
			return Ok(());
		}
	}
}
