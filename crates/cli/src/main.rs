use clap::Parser;
use gallows_runtime::{Error, Session, SessionConfig, SessionEvent};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;

mod logging;
mod render;

#[derive(Parser, Debug)]
#[command(name = "gallows")]
#[command(about = "Terminal client for a gallows game server")]
struct Args {
	/// Server host name or address
	#[arg(long, default_value = "127.0.0.1")]
	host: String,

	/// Server TCP port
	#[arg(short, long, default_value_t = 8080)]
	port: u16,

	/// Bound on connect and on each blocking read, in milliseconds
	#[arg(long, default_value_t = 30_000)]
	timeout_ms: u64,

	/// Increase log verbosity (-v, -vv)
	#[arg(short, long, action = clap::ArgAction::Count)]
	verbose: u8,
}

#[tokio::main]
async fn main() {
	let args = Args::parse();
	logging::init_logging(args.verbose);

	if let Err(err) = run(args).await {
		eprintln!("{err}");
		std::process::exit(1);
	}
}

async fn run(args: Args) -> anyhow::Result<()> {
	let config = SessionConfig {
		host: args.host,
		port: args.port,
		timeout_ms: args.timeout_ms,
	};

	let (session, mut events) = Session::connect(&config).await?;
	println!(
		"connected to {}:{} - type a guess and press enter, `quit` to leave",
		config.host, config.port
	);

	let session = std::sync::Arc::new(session);
	let input_session = std::sync::Arc::clone(&session);

	// Guesses come from stdin on their own task; the main task drains the
	// event sequence until the session terminates.
	tokio::spawn(async move {
		let mut lines = BufReader::new(tokio::io::stdin()).lines();
		loop {
			match lines.next_line().await {
				Ok(Some(line)) => {
					let guess = line.trim();
					if guess.is_empty() {
						continue;
					}
					if guess.eq_ignore_ascii_case("quit") {
						input_session.close();
						break;
					}
					if let Err(err) = input_session.send(guess).await {
						warn!(%err, "failed to send guess");
						break;
					}
				}
				Ok(None) => {
					input_session.close();
					break;
				}
				Err(err) => {
					warn!(%err, "failed to read input");
					input_session.close();
					break;
				}
			}
		}
	});

	while let Some(event) = events.next().await {
		match event {
			SessionEvent::State(state) => println!("{}", render::render_state(&state)),
			SessionEvent::Terminated(Error::SessionClosed) => {
				println!("disconnected");
				break;
			}
			SessionEvent::Terminated(reason) => return Err(reason.into()),
		}
	}

	Ok(())
}
