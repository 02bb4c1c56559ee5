//! Opening the byte stream a connection runs over.
//!
//! A [`Connector`] turns an [`Endpoint`] into a duplex stream. The default
//! [`TcpConnector`] dials TCP and, for `wss`, wraps the socket in TLS with
//! whichever backend was compiled in.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

#[cfg(feature = "tls-rustls")]
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tracing::debug;

use crate::config::Config;
use crate::endpoint::{Endpoint, Scheme};
use crate::error::Result;

/// Opens the stream for an endpoint.
///
/// Implement this to run connections over something other than TCP, such as
/// an in-memory pipe in tests or a proxy tunnel.
pub trait Connector: Send + Sync + 'static {
    type Stream: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    /// Open a stream to `endpoint`, ready for the upgrade request.
    fn connect(
        &self,
        endpoint: &Endpoint,
        config: &Config,
    ) -> impl Future<Output = Result<Self::Stream>> + Send;
}

/// A TCP socket, possibly wrapped in TLS.
#[non_exhaustive]
pub enum MaybeTlsStream {
    Plain(TcpStream),
    #[cfg(feature = "tls-rustls")]
    Rustls(tokio_rustls::client::TlsStream<TcpStream>),
    #[cfg(feature = "tls-native")]
    NativeTls(tokio_native_tls::TlsStream<TcpStream>),
}

impl MaybeTlsStream {
    #[must_use]
    pub fn is_tls(&self) -> bool {
        !matches!(self, MaybeTlsStream::Plain(_))
    }
}

impl std::fmt::Debug for MaybeTlsStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MaybeTlsStream::Plain(s) => f.debug_tuple("Plain").field(s).finish(),
            #[cfg(feature = "tls-rustls")]
            MaybeTlsStream::Rustls(_) => f.write_str("Rustls(..)"),
            #[cfg(feature = "tls-native")]
            MaybeTlsStream::NativeTls(_) => f.write_str("NativeTls(..)"),
        }
    }
}

impl AsyncRead for MaybeTlsStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            MaybeTlsStream::Plain(s) => Pin::new(s).poll_read(cx, buf),
            #[cfg(feature = "tls-rustls")]
            MaybeTlsStream::Rustls(s) => Pin::new(s).poll_read(cx, buf),
            #[cfg(feature = "tls-native")]
            MaybeTlsStream::NativeTls(s) => Pin::new(s).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for MaybeTlsStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        match self.get_mut() {
            MaybeTlsStream::Plain(s) => Pin::new(s).poll_write(cx, buf),
            #[cfg(feature = "tls-rustls")]
            MaybeTlsStream::Rustls(s) => Pin::new(s).poll_write(cx, buf),
            #[cfg(feature = "tls-native")]
            MaybeTlsStream::NativeTls(s) => Pin::new(s).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            MaybeTlsStream::Plain(s) => Pin::new(s).poll_flush(cx),
            #[cfg(feature = "tls-rustls")]
            MaybeTlsStream::Rustls(s) => Pin::new(s).poll_flush(cx),
            #[cfg(feature = "tls-native")]
            MaybeTlsStream::NativeTls(s) => Pin::new(s).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            MaybeTlsStream::Plain(s) => Pin::new(s).poll_shutdown(cx),
            #[cfg(feature = "tls-rustls")]
            MaybeTlsStream::Rustls(s) => Pin::new(s).poll_shutdown(cx),
            #[cfg(feature = "tls-native")]
            MaybeTlsStream::NativeTls(s) => Pin::new(s).poll_shutdown(cx),
        }
    }
}

/// Dials TCP; `wss` endpoints get TLS on top.
///
/// With `tls-rustls`, the bundled webpki roots are trusted unless a client
/// config is supplied. With only `tls-native`, the platform trust store is
/// used. An explicitly supplied native connector takes precedence over rustls
/// when both features are enabled.
#[derive(Debug, Clone, Default)]
pub struct TcpConnector {
    #[cfg(feature = "tls-rustls")]
    rustls: Option<Arc<rustls::ClientConfig>>,
    #[cfg(feature = "tls-native")]
    native: Option<crate::tls::NativeTlsConnector>,
}

impl TcpConnector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `config` for `wss` endpoints.
    #[cfg(feature = "tls-rustls")]
    #[must_use]
    pub fn with_rustls_config(mut self, config: Arc<rustls::ClientConfig>) -> Self {
        self.rustls = Some(config);
        self
    }

    /// Use `connector` for `wss` endpoints.
    #[cfg(feature = "tls-native")]
    #[must_use]
    pub fn with_native_connector(mut self, connector: crate::tls::NativeTlsConnector) -> Self {
        self.native = Some(connector);
        self
    }

    #[cfg(feature = "tls-rustls")]
    async fn wrap_tls(&self, domain: &str, stream: TcpStream) -> Result<MaybeTlsStream> {
        #[cfg(feature = "tls-native")]
        if let Some(connector) = &self.native {
            let tls = connector.connect(domain, stream).await?;
            return Ok(MaybeTlsStream::NativeTls(tls));
        }

        let config = match &self.rustls {
            Some(config) => Arc::clone(config),
            None => crate::tls::client_config_with_webpki_roots(),
        };
        let tls = crate::tls::TlsConnector::new(config)
            .connect(domain, stream)
            .await?;
        Ok(MaybeTlsStream::Rustls(tls))
    }

    #[cfg(all(feature = "tls-native", not(feature = "tls-rustls")))]
    async fn wrap_tls(&self, domain: &str, stream: TcpStream) -> Result<MaybeTlsStream> {
        let connector = match &self.native {
            Some(connector) => connector.clone(),
            None => crate::tls::NativeTlsConnector::with_platform_roots()?,
        };
        let tls = connector.connect(domain, stream).await?;
        Ok(MaybeTlsStream::NativeTls(tls))
    }

    #[cfg(not(any(feature = "tls-rustls", feature = "tls-native")))]
    async fn wrap_tls(&self, _domain: &str, _stream: TcpStream) -> Result<MaybeTlsStream> {
        Err(crate::error::Error::TlsUnavailable)
    }
}

impl Connector for TcpConnector {
    type Stream = MaybeTlsStream;

    async fn connect(&self, endpoint: &Endpoint, config: &Config) -> Result<MaybeTlsStream> {
        let host = endpoint.connect_host();
        let port = endpoint.port();

        let stream = TcpStream::connect((host, port)).await?;
        stream.set_nodelay(config.tcp_nodelay)?;
        debug!(%host, port, scheme = %endpoint.scheme(), "tcp connected");

        match endpoint.scheme() {
            Scheme::Plain => Ok(MaybeTlsStream::Plain(stream)),
            Scheme::Secure => self.wrap_tls(host, stream).await,
        }
    }
}
