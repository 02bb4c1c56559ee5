//! Interactive WebSocket client.
//!
//! Connects to the URL given as the first argument, sends every line read
//! from stdin as a text message and prints whatever the server sends back.
//! An empty line sends a ping; EOF closes the connection.
//!
//! Run with: `RUST_LOG=debug cargo run --example client -- ws://127.0.0.1:9001/`

use std::error::Error;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;
use wslink::{Config, Connection, Endpoint, EventHandler, Message};

const DEFAULT_URL: &str = "ws://127.0.0.1:9001/";

struct Printer;

impl EventHandler for Printer {
    fn on_open(&self) {
        println!("connected");
    }

    fn on_close(&self) {
        println!("disconnected");
    }

    fn on_message(&self, message: Message) {
        match message {
            Message::Text(_) => println!("< {}", message.as_text()),
            other => println!("< {} bytes ({})", other.len(), other.opcode()),
        }
    }

    fn on_pong(&self, payload: &[u8]) {
        println!("< pong {}", String::from_utf8_lossy(payload));
    }

    fn on_error(&self, error: &wslink::Error) {
        eprintln!("error: {error}");
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let url = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_URL.to_string());
    let endpoint = Endpoint::parse(&url)?;
    let config = Config::new().with_handshake_timeout(Duration::from_secs(10));

    let conn = Connection::builder(endpoint)
        .with_config(config)
        .build(Printer);
    conn.connect().await?;
    if let Some(protocol) = conn.protocol() {
        println!("subprotocol: {protocol}");
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) if line.is_empty() => conn.send_ping().await?,
                Some(line) => conn.send(line).await?,
                None => break,
            },
            () = conn.closed() => return Ok(()),
        }
    }

    conn.close().await?;
    Ok(())
}
