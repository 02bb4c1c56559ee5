use std::sync::{Arc, OnceLock};

use tokio::io::{AsyncWriteExt, BufReader, ReadHalf, WriteHalf};
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use super::ConnectionState;
use super::receiver;
use crate::codec::{FrameReader, FrameWriter};
use crate::config::Config;
use crate::endpoint::Endpoint;
use crate::entropy::Entropy;
use crate::error::{Error, Result};
use crate::event::EventHandler;
use crate::protocol::{
    Frame, HandshakeResponse, MAX_CONTROL_FRAME_PAYLOAD, OpCode, build_request, read_response,
};
use crate::transport::{Connector, TcpConnector};

pub(crate) type StreamReader<S> = FrameReader<BufReader<ReadHalf<S>>>;
type StreamWriter<S> = FrameWriter<WriteHalf<S>>;

/// Who started a close.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CloseOrigin {
    /// `Connection::close()` from the application.
    Local,
    /// The receiver task, after a peer close or a read error.
    Receiver,
}

/// Everything guarded by the connection lock.
struct Session<S> {
    state: ConnectionState,
    writer: Option<StreamWriter<S>>,
    receiver: Option<JoinHandle<()>>,
}

pub(crate) struct Inner<C: Connector> {
    endpoint: Endpoint,
    config: Config,
    connector: C,
    pub(crate) handler: Box<dyn EventHandler>,
    entropy: Arc<Entropy>,
    session: Mutex<Session<C::Stream>>,
    state_tx: watch::Sender<ConnectionState>,
    stop_tx: watch::Sender<bool>,
    protocol: OnceLock<String>,
}

impl<C: Connector> Inner<C> {
    /// Must be called with the session lock held.
    fn set_state(&self, session: &mut Session<C::Stream>, state: ConnectionState) {
        if session.state != state {
            debug!(from = %session.state, to = %state, "state change");
        }
        session.state = state;
        self.state_tx.send_replace(state);
    }

    /// Open the transport and run the upgrade exchange.
    async fn establish(
        &self,
    ) -> Result<(
        StreamReader<C::Stream>,
        StreamWriter<C::Stream>,
        HandshakeResponse,
    )> {
        let key = self.entropy.handshake_key();
        let request = build_request(&self.endpoint, &key)?;

        let stream = self.connector.connect(&self.endpoint, &self.config).await?;
        let (read_half, mut write_half) = tokio::io::split(stream);

        write_half.write_all(&request).await?;
        write_half.flush().await?;

        let mut buffered = BufReader::new(read_half);
        let response = read_response(&mut buffered, &self.config.limits).await?;
        response.validate(&key, self.config.verify_accept_key)?;
        debug!(status = response.status, protocol = ?response.protocol(), "handshake accepted");

        Ok((
            FrameReader::new(buffered, self.config.limits.clone()),
            FrameWriter::new(write_half, Arc::clone(&self.entropy)),
            response,
        ))
    }

    async fn send_frame(&self, frame: Frame) -> Result<()> {
        let mut session = self.session.lock().await;
        if !session.state.can_send() {
            return Err(Error::NotConnected);
        }
        let Some(writer) = session.writer.as_mut() else {
            return Err(Error::NotConnected);
        };
        let result = writer.write_frame(&frame).await;
        drop(session);

        match result {
            Ok(()) => {
                trace!(opcode = %frame.opcode, len = frame.payload().len(), "frame sent");
                Ok(())
            }
            Err(err) => {
                warn!(opcode = %frame.opcode, error = %err, "send failed");
                self.handler.on_error(&err);
                Err(err)
            }
        }
    }

    /// The single teardown path for every way a connection ends.
    ///
    /// Only the call that finds the connection `Open` does any work, so
    /// `on_close` fires exactly once. The lock is released before waiting for
    /// the receiver, which may itself be blocked on the lock.
    pub(crate) async fn shutdown(&self, origin: CloseOrigin) -> Result<()> {
        let (writer, receiver) = {
            let mut session = self.session.lock().await;
            match session.state {
                ConnectionState::Open => {}
                ConnectionState::Closing | ConnectionState::Closed => return Ok(()),
                _ => return Err(Error::NotConnected),
            }
            self.set_state(&mut session, ConnectionState::Closing);
            // Set before the close frame is written: from here on a read
            // failure is a stop, not an error.
            self.stop_tx.send_replace(true);

            let mut writer = session.writer.take();
            if let Some(writer) = writer.as_mut() {
                match writer.write_frame(&Frame::close()).await {
                    Ok(()) => trace!("close frame sent"),
                    Err(err) if origin == CloseOrigin::Local => {
                        warn!(error = %err, "failed to send close frame");
                        self.handler.on_error(&err);
                    }
                    // The peer is usually gone already.
                    Err(err) => debug!(error = %err, "failed to send close frame"),
                }
            }
            (writer, session.receiver.take())
        };

        if let Some(handle) = receiver {
            // The receiver cannot wait on itself.
            if origin == CloseOrigin::Local {
                if let Err(err) = handle.await {
                    debug!(error = %err, "receiver task ended abnormally");
                }
            }
        }
        if let Some(mut writer) = writer {
            if let Err(err) = writer.shutdown().await {
                debug!(error = %err, "transport shutdown failed");
            }
        }

        {
            let mut session = self.session.lock().await;
            self.set_state(&mut session, ConnectionState::Closed);
        }
        info!(endpoint = %self.endpoint, ?origin, "connection closed");
        self.handler.on_close();
        Ok(())
    }
}

/// A client connection to one endpoint.
///
/// All methods take `&self`; share a connection between tasks with `Arc`.
/// Dropping a connection without calling [`close`](Connection::close) stops
/// the receiver without sending a close frame or calling `on_close`.
pub struct Connection<C: Connector = TcpConnector> {
    inner: Arc<Inner<C>>,
}

impl Connection<TcpConnector> {
    /// Connection over TCP (and TLS for `wss`) with default configuration.
    pub fn new(endpoint: Endpoint, handler: impl EventHandler) -> Self {
        ConnectionBuilder::new(endpoint).build(handler)
    }

    #[must_use]
    pub fn builder(endpoint: Endpoint) -> ConnectionBuilder<TcpConnector> {
        ConnectionBuilder::new(endpoint)
    }
}

impl<C: Connector> Connection<C> {
    /// Open the transport, perform the handshake and start the receiver.
    ///
    /// Holds the connection lock throughout, so concurrent sends wait for the
    /// outcome. On success `on_open` fires before any message is delivered.
    ///
    /// # Errors
    ///
    /// - [`Error::AlreadyConnected`] unless the connection is `Idle`
    /// - [`Error::Terminated`] if the connection is already `Closed`
    /// - [`Error::Timeout`] if `handshake_timeout` elapsed
    /// - transport, TLS and handshake errors; the connection is then `Closed`
    pub async fn connect(&self) -> Result<()> {
        let inner = &self.inner;
        let mut session = inner.session.lock().await;
        match session.state {
            ConnectionState::Idle => {}
            ConnectionState::Closed => return Err(Error::Terminated),
            _ => return Err(Error::AlreadyConnected),
        }
        inner.set_state(&mut session, ConnectionState::Handshaking);
        info!(endpoint = %inner.endpoint, "connecting");

        let result = match inner.config.handshake_timeout {
            Some(limit) => tokio::time::timeout(limit, inner.establish())
                .await
                .unwrap_or(Err(Error::Timeout)),
            None => inner.establish().await,
        };
        let (reader, writer, response) = match result {
            Ok(parts) => parts,
            Err(err) => {
                inner.set_state(&mut session, ConnectionState::Closed);
                warn!(endpoint = %inner.endpoint, error = %err, "connect failed");
                return Err(err);
            }
        };

        if let Some(protocol) = response.protocol() {
            let _ = inner.protocol.set(protocol.to_string());
        }
        session.writer = Some(writer);
        inner.set_state(&mut session, ConnectionState::Open);
        info!(endpoint = %inner.endpoint, "connection open");
        inner.handler.on_open();

        let stop = inner.stop_tx.subscribe();
        session.receiver = Some(tokio::spawn(receiver::run(
            Arc::clone(inner),
            reader,
            stop,
        )));
        Ok(())
    }

    /// Send a text frame.
    ///
    /// # Errors
    ///
    /// [`Error::NotConnected`] outside `Open`; write failures are also
    /// reported to `on_error`.
    ///
    /// A failed write leaves the connection `Open`. Later sends keep failing
    /// the same way until the receiver sees the broken transport and closes
    /// the connection.
    pub async fn send(&self, text: impl Into<String>) -> Result<()> {
        self.inner
            .send_frame(Frame::text(text.into().into_bytes()))
            .await
    }

    /// Send a binary frame.
    ///
    /// # Errors
    ///
    /// As [`send`](Connection::send).
    pub async fn send_binary(&self, data: impl Into<Vec<u8>>) -> Result<()> {
        self.inner
            .send_frame(Frame::new(OpCode::Binary, data))
            .await
    }

    /// Send a ping carrying the configured ping payload.
    ///
    /// # Errors
    ///
    /// [`Error::ControlFrameTooLarge`] if the payload exceeds 125 bytes,
    /// otherwise as [`send`](Connection::send).
    pub async fn send_ping(&self) -> Result<()> {
        self.send_control(OpCode::Ping, &self.inner.config.ping_payload)
            .await
    }

    /// Send a pong carrying the configured pong payload.
    ///
    /// # Errors
    ///
    /// As [`send_ping`](Connection::send_ping).
    pub async fn send_pong(&self) -> Result<()> {
        self.send_control(OpCode::Pong, &self.inner.config.pong_payload)
            .await
    }

    async fn send_control(&self, opcode: OpCode, payload: &[u8]) -> Result<()> {
        if payload.len() > MAX_CONTROL_FRAME_PAYLOAD {
            return Err(Error::ControlFrameTooLarge(payload.len()));
        }
        self.inner
            .send_frame(Frame::new(opcode, payload.to_vec()))
            .await
    }

    /// Send a close frame, stop the receiver and release the transport.
    ///
    /// Returns `Ok` without doing anything once the connection is closing or
    /// closed.
    ///
    /// # Errors
    ///
    /// [`Error::NotConnected`] if `connect()` was never called.
    pub async fn close(&self) -> Result<()> {
        self.inner.shutdown(CloseOrigin::Local).await
    }

    /// Current state.
    pub fn state(&self) -> ConnectionState {
        *self.inner.state_tx.borrow()
    }

    /// Returns `true` while sends are accepted.
    pub fn is_open(&self) -> bool {
        self.state().can_send()
    }

    /// Wait until the connection is `Closed`, by any path.
    pub async fn closed(&self) {
        let mut rx = self.inner.state_tx.subscribe();
        loop {
            if rx.borrow_and_update().is_closed() {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    }

    /// Subprotocol selected by the server, once open.
    pub fn protocol(&self) -> Option<&str> {
        self.inner.protocol.get().map(String::as_str)
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.inner.endpoint
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }
}

impl<C: Connector> Drop for Connection<C> {
    fn drop(&mut self) {
        self.inner.stop_tx.send_replace(true);
    }
}

impl<C: Connector> std::fmt::Debug for Connection<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("endpoint", &self.inner.endpoint)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

/// Configures a [`Connection`] before it is created.
#[derive(Debug)]
pub struct ConnectionBuilder<C = TcpConnector> {
    endpoint: Endpoint,
    config: Config,
    connector: C,
    entropy: Option<Entropy>,
}

impl ConnectionBuilder<TcpConnector> {
    #[must_use]
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            config: Config::default(),
            connector: TcpConnector::default(),
            entropy: None,
        }
    }
}

impl<C: Connector> ConnectionBuilder<C> {
    #[must_use]
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Source of handshake keys and mask keys. Defaults to the OS generator.
    #[must_use]
    pub fn with_entropy(mut self, entropy: Entropy) -> Self {
        self.entropy = Some(entropy);
        self
    }

    /// Open streams with `connector` instead of TCP.
    #[must_use]
    pub fn with_connector<D: Connector>(self, connector: D) -> ConnectionBuilder<D> {
        ConnectionBuilder {
            endpoint: self.endpoint,
            config: self.config,
            connector,
            entropy: self.entropy,
        }
    }

    pub fn build(self, handler: impl EventHandler) -> Connection<C> {
        let (state_tx, _) = watch::channel(ConnectionState::Idle);
        let (stop_tx, _) = watch::channel(false);
        let inner = Inner {
            endpoint: self.endpoint,
            config: self.config,
            connector: self.connector,
            handler: Box::new(handler),
            entropy: Arc::new(self.entropy.unwrap_or_default()),
            session: Mutex::new(Session {
                state: ConnectionState::Idle,
                writer: None,
                receiver: None,
            }),
            state_tx,
            stop_tx,
            protocol: OnceLock::new(),
        };
        Connection {
            inner: Arc::new(inner),
        }
    }
}
