//! # wslink - Asynchronous WebSocket Client
//!
//! `wslink` is an RFC 6455 WebSocket client built on tokio. It opens a
//! `ws://` or `wss://` connection, performs the HTTP/1.1 upgrade, masks every
//! outgoing frame, and delivers incoming frames to an [`EventHandler`] from a
//! dedicated receiver task.
//!
//! ## Features
//!
//! - **Event callbacks** for open, close, messages, ping, pong and errors
//! - **Serialized sends** from any number of tasks sharing one connection
//! - **Single-shot teardown**: `on_close` fires exactly once per connection
//! - **TLS** via rustls (`tls-rustls`) or the platform library (`tls-native`)
//! - **Pluggable transport** through the [`Connector`] trait
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use wslink::{ChannelHandler, Connection, Endpoint};
//!
//! # async fn run() -> wslink::Result<()> {
//! let (handler, mut events) = ChannelHandler::new();
//! let conn = Connection::new(Endpoint::parse("ws://localhost:10086/chat")?, handler);
//!
//! conn.connect().await?;
//! conn.send("hello").await?;
//! if let Some(event) = events.recv().await {
//!     println!("{event:?}");
//! }
//! conn.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod config;
pub mod connection;
pub mod endpoint;
pub mod entropy;
pub mod error;
pub mod event;
pub mod message;
pub mod protocol;
pub mod tls;
pub mod transport;

pub use config::{Config, Limits};
pub use connection::{Connection, ConnectionBuilder, ConnectionState};
pub use endpoint::{Endpoint, Scheme};
pub use entropy::{Entropy, SecureRandom};
pub use error::{DecodeError, Error, HandshakeError, Result};
pub use event::{ChannelHandler, Event, EventHandler};
pub use message::Message;
pub use protocol::{Frame, HandshakeResponse, OpCode, WS_GUID, compute_accept_key};
pub use transport::{Connector, MaybeTlsStream, TcpConnector};
