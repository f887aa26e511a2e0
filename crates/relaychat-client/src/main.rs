//! relaychat terminal client.
//!
//! - Connects to the relay from `relaychat.yaml` / `RELAYCHAT_RELAY_ADDRESS`
//! - Prints every log change on stdout (relay lines and local echoes as
//!   `author: content`), logs go to stderr
//! - Stdin lines are sent as chat; `/purge`, `/reconnect`, `/status`, `/quit`

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{fmt, EnvFilter};

use relaychat_client::{config, ChatSession, SessionEvent};
use relaychat_core::error::Result;

#[derive(Debug, PartialEq, Eq)]
enum Command<'a> {
    Say(&'a str),
    Purge,
    Reconnect,
    Status,
    Quit,
    Unknown(&'a str),
    Empty,
}

fn parse_command(line: &str) -> Command<'_> {
    let line = line.trim_end_matches(['\r', '\n']);
    match line.trim() {
        "" => Command::Empty,
        "/purge" => Command::Purge,
        "/reconnect" => Command::Reconnect,
        "/status" => Command::Status,
        "/quit" => Command::Quit,
        cmd if cmd.starts_with('/') => Command::Unknown(cmd),
        _ => Command::Say(line),
    }
}

#[tokio::main]
async fn main() {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, code = e.code().as_str(), "relaychat failed");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cfg = config::load()?;
    let mut session = ChatSession::new(cfg);
    session.start()?;
    println!(
        "* connecting to {}",
        session.config().relay.address.as_deref().unwrap_or("-")
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Ok(Some(line)) = line else { break; };
                match parse_command(&line) {
                    Command::Empty => {}
                    Command::Say(text) => {
                        session.send_chat(text);
                        println!("{}: {text}", session.state().local_author());
                    }
                    Command::Purge => {
                        session.request_purge();
                        println!("* log cleared");
                    }
                    Command::Reconnect => match session.start() {
                        Ok(()) => println!("* {}", session.status()),
                        Err(e) => println!("* reconnect failed: {e}"),
                    },
                    Command::Status => println!(
                        "* {} as {} ({} messages)",
                        session.status(),
                        session.identity().unwrap_or("-"),
                        session.messages().len()
                    ),
                    Command::Quit => break,
                    Command::Unknown(cmd) => println!("* unknown command {cmd}"),
                }
            }

            event = session.next_event() => {
                let Some(event) = event else { break; };
                match event {
                    SessionEvent::IdentityAssigned(id) => println!("* connected as {id}"),
                    SessionEvent::Message(entry) => println!("{}: {}", entry.author, entry.content),
                    SessionEvent::Purged => println!("* log cleared by relay"),
                    SessionEvent::Disconnected(e) => {
                        println!("* disconnected ({e}), type /reconnect");
                    }
                }
            }
        }
    }

    session.stop();
    Ok(())
}
