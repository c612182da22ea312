use std::time::{Duration, Instant};

use serde_json::{Value, json};
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};
use tokio::net::TcpListener;

use super::*;
use crate::transport::TcpTransport;

/// Builds a session over in-memory pipes. Returns the session, its event
/// sequence, the read end of the session's outbound stream, and the write
/// end of its inbound stream.
fn create_test_session(
	read_timeout: Duration,
) -> (Session, SessionEvents, DuplexStream, DuplexStream) {
	let (outbound_read, outbound_write) = tokio::io::duplex(64 * 1024);
	let (inbound_read, inbound_write) = tokio::io::duplex(64 * 1024);

	let (transport, message_rx) = TcpTransport::new(outbound_write, inbound_read);
	let parts = transport.into_transport_parts(message_rx);
	let (session, events) = Session::from_parts(parts, read_timeout);

	(session, events, outbound_read, inbound_write)
}

async fn write_frame(writer: &mut (impl tokio::io::AsyncWrite + Unpin), payload: &Value) {
	let bytes = serde_json::to_vec(payload).unwrap();
	writer
		.write_all(&(bytes.len() as u32).to_le_bytes())
		.await
		.unwrap();
	writer.write_all(&bytes).await.unwrap();
	writer.flush().await.unwrap();
}

async fn read_frame(reader: &mut (impl tokio::io::AsyncRead + Unpin)) -> Value {
	let mut len_buf = [0u8; 4];
	reader.read_exact(&mut len_buf).await.unwrap();
	let mut buf = vec![0u8; u32::from_le_bytes(len_buf) as usize];
	reader.read_exact(&mut buf).await.unwrap();
	serde_json::from_slice(&buf).unwrap()
}

#[tokio::test]
async fn states_arrive_in_order_then_exactly_one_terminated() {
	let (_session, mut events, _out, mut inbound) =
		create_test_session(Duration::from_secs(5));

	let states = [
		json!({"turn": 1, "word": "_____"}),
		json!({"turn": 2, "word": "_a___"}),
		json!({"turn": 3, "word": "ba___"}),
	];
	for state in &states {
		write_frame(&mut inbound, state).await;
	}
	drop(inbound);

	for expected in &states {
		match events.next().await {
			Some(SessionEvent::State(state)) => assert_eq!(state.as_value(), expected),
			other => panic!("expected state update, got: {other:?}"),
		}
	}

	match events.next().await {
		Some(SessionEvent::Terminated(reason)) => {
			assert!(matches!(reason, Error::ConnectionLost(_)), "got: {reason:?}")
		}
		other => panic!("expected terminal event, got: {other:?}"),
	}

	// The sequence is finite and non-restartable.
	assert!(events.next().await.is_none());
}

#[tokio::test]
async fn peer_close_after_one_state() {
	let (_session, mut events, _out, mut inbound) =
		create_test_session(Duration::from_secs(5));

	let state = json!({"turn": 1, "guess": "cat", "correct": false});
	write_frame(&mut inbound, &state).await;
	drop(inbound);

	match events.next().await {
		Some(SessionEvent::State(got)) => assert_eq!(got.as_value(), &state),
		other => panic!("expected state update, got: {other:?}"),
	}
	match events.next().await {
		Some(SessionEvent::Terminated(reason)) => assert!(reason.is_closed()),
		other => panic!("expected terminal event, got: {other:?}"),
	}
	assert!(events.next().await.is_none());
}

#[tokio::test]
async fn silent_peer_terminates_with_read_timeout() {
	let (_session, mut events, _out, _inbound) =
		create_test_session(Duration::from_millis(100));

	match events.next().await {
		Some(SessionEvent::Terminated(reason)) => {
			assert!(reason.is_timeout(), "got: {reason:?}")
		}
		other => panic!("expected terminal event, got: {other:?}"),
	}
	assert!(events.next().await.is_none());
}

#[tokio::test]
async fn malformed_payload_terminates_session() {
	let (_session, mut events, _out, mut inbound) =
		create_test_session(Duration::from_secs(5));

	let garbage = b"{not json";
	inbound
		.write_all(&(garbage.len() as u32).to_le_bytes())
		.await
		.unwrap();
	inbound.write_all(garbage).await.unwrap();
	inbound.flush().await.unwrap();

	match events.next().await {
		Some(SessionEvent::Terminated(reason)) => {
			assert!(matches!(reason, Error::Malformed(_)), "got: {reason:?}")
		}
		other => panic!("expected terminal event, got: {other:?}"),
	}
}

#[tokio::test]
async fn unexpected_message_shape_terminates_session() {
	let (_session, mut events, _out, mut inbound) =
		create_test_session(Duration::from_secs(5));

	// Valid JSON, but not a game state object.
	write_frame(&mut inbound, &json!([1, 2, 3])).await;

	match events.next().await {
		Some(SessionEvent::Terminated(reason)) => {
			assert!(matches!(reason, Error::Malformed(_)), "got: {reason:?}")
		}
		other => panic!("expected terminal event, got: {other:?}"),
	}
}

#[tokio::test]
async fn state_after_malformed_frame_is_never_delivered() {
	let (_session, mut events, _out, mut inbound) =
		create_test_session(Duration::from_secs(5));

	let garbage = b"garbage";
	inbound
		.write_all(&(garbage.len() as u32).to_le_bytes())
		.await
		.unwrap();
	inbound.write_all(garbage).await.unwrap();
	write_frame(&mut inbound, &json!({"turn": 99})).await;

	// The first failure invalidates the whole session; the well-formed
	// frame behind it must not surface.
	match events.next().await {
		Some(SessionEvent::Terminated(reason)) => {
			assert!(matches!(reason, Error::Malformed(_)), "got: {reason:?}")
		}
		other => panic!("expected terminal event, got: {other:?}"),
	}
	assert!(events.next().await.is_none());
}

#[tokio::test]
async fn guesses_are_independent_frames() {
	let (session, _events, mut outbound, _inbound) =
		create_test_session(Duration::from_secs(5));

	session.send("cat").await.unwrap();
	session.send("dog").await.unwrap();

	assert_eq!(read_frame(&mut outbound).await, json!({"guess": "cat"}));
	assert_eq!(read_frame(&mut outbound).await, json!({"guess": "dog"}));
}

#[tokio::test]
async fn concurrent_senders_never_interleave_frames() {
	let (session, _events, mut outbound, _inbound) =
		create_test_session(Duration::from_secs(5));

	let session = std::sync::Arc::new(session);
	let mut handles = Vec::new();
	for prefix in ["alpha", "beta"] {
		let session = std::sync::Arc::clone(&session);
		handles.push(tokio::spawn(async move {
			for i in 0..20 {
				session.send(&format!("{prefix}-{i}")).await.unwrap();
			}
		}));
	}
	for handle in handles {
		handle.await.unwrap();
	}

	let mut seen = std::collections::HashSet::new();
	for _ in 0..40 {
		let frame = read_frame(&mut outbound).await;
		let guess = frame["guess"].as_str().unwrap().to_string();
		assert!(seen.insert(guess), "duplicate frame: {frame}");
	}
	assert_eq!(seen.len(), 40);
}

#[tokio::test]
async fn send_after_termination_fails_without_writing() {
	let (session, mut events, outbound, inbound) =
		create_test_session(Duration::from_secs(5));

	drop(inbound);
	match events.next().await {
		Some(SessionEvent::Terminated(_)) => {}
		other => panic!("expected terminal event, got: {other:?}"),
	}

	let err = session.send("late").await.unwrap_err();
	assert!(matches!(err, Error::SessionClosed));

	// Nothing reached the wire.
	drop(session);
	let mut remaining = Vec::new();
	let mut outbound = outbound;
	outbound.read_to_end(&mut remaining).await.unwrap();
	assert!(remaining.is_empty());
}

#[tokio::test]
async fn close_emits_terminal_event_and_rejects_sends() {
	let (session, mut events, _out, _inbound) =
		create_test_session(Duration::from_secs(5));

	session.close();
	session.close(); // idempotent

	match events.next().await {
		Some(SessionEvent::Terminated(reason)) => {
			assert!(matches!(reason, Error::SessionClosed), "got: {reason:?}")
		}
		other => panic!("expected terminal event, got: {other:?}"),
	}
	assert!(events.next().await.is_none());

	assert!(session.is_terminated());
	let err = session.send("after close").await.unwrap_err();
	assert!(matches!(err, Error::SessionClosed));
}

#[tokio::test]
async fn connect_exchanges_messages_over_tcp() {
	let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
	let addr = listener.local_addr().unwrap();

	let server = tokio::spawn(async move {
		let (mut socket, _) = listener.accept().await.unwrap();

		let guess = read_frame(&mut socket).await;
		assert_eq!(guess, json!({"guess": "cat"}));

		write_frame(&mut socket, &json!({"turn": 1, "guess": "cat", "correct": false})).await;
	});

	let config = SessionConfig {
		host: "127.0.0.1".to_string(),
		port: addr.port(),
		timeout_ms: 5_000,
	};
	let (session, mut events) = Session::connect(&config).await.unwrap();
	session.send("cat").await.unwrap();

	match events.next().await {
		Some(SessionEvent::State(state)) => {
			assert_eq!(state.field("turn"), Some(&json!(1)));
			assert_eq!(state.field("correct"), Some(&json!(false)));
		}
		other => panic!("expected state update, got: {other:?}"),
	}
	match events.next().await {
		Some(SessionEvent::Terminated(reason)) => assert!(reason.is_closed()),
		other => panic!("expected terminal event, got: {other:?}"),
	}

	server.await.unwrap();
}

#[tokio::test]
async fn connect_to_dead_port_fails_fast() {
	// Bind to grab a free port, then release it so nothing is listening.
	let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
	let port = listener.local_addr().unwrap().port();
	drop(listener);

	let config = SessionConfig {
		host: "127.0.0.1".to_string(),
		port,
		timeout_ms: 2_000,
	};

	let started = Instant::now();
	let err = match Session::connect(&config).await {
		Err(err) => err,
		Ok(_) => panic!("expected connection failure"),
	};
	assert!(
		matches!(err, Error::Connect { .. } | Error::ConnectTimeout { .. }),
		"got: {err:?}"
	);
	assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn connect_never_hangs_past_the_timeout() {
	// TEST-NET-1 address; never routable.
	let config = SessionConfig {
		host: "192.0.2.1".to_string(),
		port: 9,
		timeout_ms: 250,
	};

	let started = Instant::now();
	let result = Session::connect(&config).await;
	assert!(result.is_err());
	// Configured timeout plus generous scheduling slack.
	assert!(started.elapsed() < Duration::from_secs(5));
}
