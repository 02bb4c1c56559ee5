//! Client connection management and state machine.
//!
//! A [`Connection`] owns one transport and one receiver task for its whole
//! life. Sends and close run under a single lock so frames never interleave
//! and the state check is atomic with the write that follows it.
//!
//! ## Connection Lifecycle
//!
//! 1. **Idle** - Created, not connected
//! 2. **Handshaking** - Transport opening, upgrade request in flight
//! 3. **Open** - Frames flow both ways
//! 4. **Closing** - Close frame sent, receiver stopping
//! 5. **Closed** - Terminal; construct a new connection to reconnect
//!
//! ## Example
//!
//! ```rust,no_run
//! use wslink::{ChannelHandler, Connection, Endpoint, Event};
//!
//! # async fn run() -> wslink::Result<()> {
//! let endpoint = Endpoint::parse("ws://localhost:10086/chat")?;
//! let (handler, mut events) = ChannelHandler::new();
//! let conn = Connection::new(endpoint, handler);
//!
//! conn.connect().await?;
//! conn.send("hello").await?;
//! while let Some(event) = events.recv().await {
//!     if let Event::Message(msg) = event {
//!         println!("received: {}", msg.as_text());
//!         break;
//!     }
//! }
//! conn.close().await?;
//! # Ok(())
//! # }
//! ```

#[allow(clippy::module_inception)]
mod connection;
mod receiver;
mod state;

pub use connection::{Connection, ConnectionBuilder};
pub use state::ConnectionState;
