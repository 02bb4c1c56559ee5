//! Fake WebSocket server driven by a per-test script.

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use bytes::BytesMut;
use tokio::io::{
    AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader, DuplexStream,
    ReadBuf,
};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use wslink::codec::FrameReader;
use wslink::protocol::OpCode;
use wslink::{Config, Connector, Endpoint, Frame, Limits, Scheme, compute_accept_key};

/// A `101 Switching Protocols` head answering `key`.
pub fn switching_protocols(key: &str) -> String {
    format!(
        "HTTP/1.1 101 Switching Protocols\r\n\
         Upgrade: websocket\r\n\
         Connection: Upgrade\r\n\
         Sec-WebSocket-Accept: {}\r\n\r\n",
        compute_accept_key(key)
    )
}

/// The upgrade request as received by the server.
#[derive(Debug, Clone)]
pub struct Request {
    pub lines: Vec<String>,
}

impl Request {
    pub fn request_line(&self) -> &str {
        self.lines.first().map(String::as_str).unwrap_or_default()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.lines.iter().skip(1).find_map(|line| {
            let (key, value) = line.split_once(':')?;
            key.trim()
                .eq_ignore_ascii_case(name)
                .then(|| value.trim())
        })
    }

    pub fn key(&self) -> &str {
        self.header("Sec-WebSocket-Key")
            .expect("request has no Sec-WebSocket-Key")
    }
}

/// The server side of one accepted connection.
pub struct ServerConn<S = TcpStream> {
    stream: BufReader<S>,
}

impl<S: AsyncRead + AsyncWrite + Unpin> ServerConn<S> {
    pub fn new(stream: S) -> Self {
        Self {
            stream: BufReader::new(stream),
        }
    }

    /// Read the request head up to the blank line.
    pub async fn read_request(&mut self) -> Request {
        let mut lines = Vec::new();
        loop {
            let mut line = String::new();
            let n = self.stream.read_line(&mut line).await.unwrap();
            assert!(n > 0, "client closed during handshake");
            let line = line.trim_end_matches(['\r', '\n']).to_string();
            if line.is_empty() {
                return Request { lines };
            }
            lines.push(line);
        }
    }

    /// Read the request and answer with a valid 101.
    pub async fn accept(&mut self) -> Request {
        let request = self.read_request().await;
        self.write_raw(switching_protocols(request.key()).as_bytes())
            .await;
        request
    }

    pub async fn write_raw(&mut self, bytes: &[u8]) {
        let stream = self.stream.get_mut();
        stream.write_all(bytes).await.unwrap();
        stream.flush().await.unwrap();
    }

    /// Send a frame exactly as given; server frames are normally unmasked.
    pub async fn send_frame(&mut self, frame: &Frame, mask: Option<[u8; 4]>) {
        let mut buf = BytesMut::new();
        frame.encode(&mut buf, mask);
        self.write_raw(&buf).await;
    }

    pub async fn send_text(&mut self, text: &str) {
        self.send_frame(&Frame::text(text), None).await;
    }

    /// Read one client frame, asserting it was masked, and unmask it.
    pub async fn read_frame(&mut self) -> io::Result<Frame> {
        let mut reader = FrameReader::new(&mut self.stream, Limits::unrestricted());
        let mut frame = reader
            .read_frame()
            .await
            .map_err(|e| io::Error::other(e.to_string()))?;
        assert!(frame.is_masked(), "client frame was not masked");
        frame.unmask();
        Ok(frame)
    }

    /// Read frames until one with `opcode` arrives.
    pub async fn expect_frame(&mut self, opcode: OpCode) -> Frame {
        loop {
            let frame = self.read_frame().await.unwrap();
            if frame.opcode == opcode {
                return frame;
            }
        }
    }

    /// Discard everything until the client goes away.
    pub async fn drain(&mut self) {
        let mut buf = [0u8; 1024];
        while let Ok(n) = self.stream.read(&mut buf).await {
            if n == 0 {
                break;
            }
        }
    }
}

/// Listener on an ephemeral localhost port.
pub struct TestServer;

impl TestServer {
    /// Accept a single connection and hand it to `script`.
    pub async fn spawn<F, Fut>(script: F) -> (Endpoint, JoinHandle<()>)
    where
        F: FnOnce(ServerConn) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let handle = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            script(ServerConn::new(socket)).await;
        });
        (Self::endpoint(port), handle)
    }

    /// Echo text and binary frames back on every accepted connection until
    /// the client closes.
    pub async fn spawn_echo() -> (Endpoint, JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let handle = tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let mut conn = ServerConn::new(socket);
                    conn.accept().await;
                    while let Ok(frame) = conn.read_frame().await {
                        match frame.opcode {
                            OpCode::Text | OpCode::Binary => {
                                let reply = Frame::new(frame.opcode, frame.into_payload());
                                conn.send_frame(&reply, None).await;
                            }
                            OpCode::Close => {
                                conn.send_frame(&Frame::close(), None).await;
                                conn.drain().await;
                                break;
                            }
                            _ => {}
                        }
                    }
                });
            }
        });
        (Self::endpoint(port), handle)
    }

    fn endpoint(port: u16) -> Endpoint {
        Endpoint::new(Scheme::Plain, "127.0.0.1")
            .with_port(port)
            .with_path("/chat")
    }
}

/// Hands out one end of an in-memory pipe on the first `connect`.
pub struct DuplexConnector {
    stream: Mutex<Option<DuplexStream>>,
}

impl DuplexConnector {
    pub fn pair() -> (Self, ServerConn<DuplexStream>) {
        let (client, server) = tokio::io::duplex(64 * 1024);
        let connector = Self {
            stream: Mutex::new(Some(client)),
        };
        (connector, ServerConn::new(server))
    }
}

impl Connector for DuplexConnector {
    type Stream = DuplexStream;

    async fn connect(&self, _endpoint: &Endpoint, _config: &Config) -> wslink::Result<DuplexStream> {
        let stream = self.stream.lock().unwrap().take();
        stream.ok_or_else(|| io::Error::from(io::ErrorKind::ConnectionRefused).into())
    }
}

/// In-memory stream whose writes fail with `BrokenPipe` once broken.
///
/// Reads keep working, so the receiver stays up after a failed send.
pub struct BreakableStream {
    inner: DuplexStream,
    broken: Arc<AtomicBool>,
}

impl AsyncRead for BreakableStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_read(cx, buf)
    }
}

impl AsyncWrite for BreakableStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        if this.broken.load(Ordering::SeqCst) {
            return Poll::Ready(Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "write side broken",
            )));
        }
        Pin::new(&mut this.inner).poll_write(cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_shutdown(cx)
    }
}

/// Like [`DuplexConnector`], with a switch that breaks the client's writes.
pub struct BreakableConnector {
    stream: Mutex<Option<BreakableStream>>,
}

impl BreakableConnector {
    pub fn pair() -> (Self, ServerConn<DuplexStream>, Arc<AtomicBool>) {
        let (client, server) = tokio::io::duplex(64 * 1024);
        let broken = Arc::new(AtomicBool::new(false));
        let stream = BreakableStream {
            inner: client,
            broken: Arc::clone(&broken),
        };
        let connector = Self {
            stream: Mutex::new(Some(stream)),
        };
        (connector, ServerConn::new(server), broken)
    }
}

impl Connector for BreakableConnector {
    type Stream = BreakableStream;

    async fn connect(
        &self,
        _endpoint: &Endpoint,
        _config: &Config,
    ) -> wslink::Result<BreakableStream> {
        let stream = self.stream.lock().unwrap().take();
        stream.ok_or_else(|| io::Error::from(io::ErrorKind::ConnectionRefused).into())
    }
}
