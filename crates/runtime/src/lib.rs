//! Gallows runtime - session lifecycle, framed transport, and event dispatch.
//!
//! This crate provides the client-side infrastructure for talking to a
//! gallows game server over a single persistent TCP connection:
//!
//! - **Transport**: length-framed JSON messages over a byte stream pair
//! - **Session**: connect/teardown lifecycle, the receive loop, and the
//!   outbound send path
//! - **Events**: a finite sequence of decoded game states ending in one
//!   terminal event
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐
//! │    caller    │  drains SessionEvents, calls send()
//! └──────┬───────┘
//! ┌──────▼───────┐
//! │   Session    │  dispatch task: decode, order, terminate once
//! │  ┌────────┐  │
//! │  │ Trans  │  │  4-byte LE length prefix + JSON payload
//! │  └────────┘  │
//! └──────┬───────┘
//!        │ TCP
//! ┌──────▼───────┐
//! │ game server  │
//! └──────────────┘
//! ```
//!
//! The receive path runs on its own tasks; the caller is never required to
//! dedicate a thread to listening. Transport failures are never retried:
//! the first one terminates the session, and recovery (reconnect, user
//! notification) belongs entirely to the caller.

pub mod error;
pub mod session;
pub mod transport;

pub use error::{Error, Result};
pub use session::{Session, SessionConfig, SessionEvent, SessionEvents};
pub use transport::{
	TcpTransport, TcpTransportReceiver, TcpTransportSender, Transport, TransportParts,
	TransportReceiver,
};
