use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio_native_tls::TlsStream;

#[derive(Debug)]
pub enum NativeTlsError {
    Io(std::io::Error),
    Tls(native_tls::Error),
}

impl std::fmt::Display for NativeTlsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NativeTlsError::Io(e) => write!(f, "TLS I/O error: {}", e),
            NativeTlsError::Tls(e) => write!(f, "TLS error: {}", e),
        }
    }
}

impl std::error::Error for NativeTlsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            NativeTlsError::Io(e) => Some(e),
            NativeTlsError::Tls(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for NativeTlsError {
    fn from(err: std::io::Error) -> Self {
        NativeTlsError::Io(err)
    }
}

impl From<native_tls::Error> for NativeTlsError {
    fn from(err: native_tls::Error) -> Self {
        NativeTlsError::Tls(err)
    }
}

impl From<NativeTlsError> for crate::Error {
    fn from(err: NativeTlsError) -> Self {
        match err {
            NativeTlsError::Io(e) => e.into(),
            NativeTlsError::Tls(e) => crate::Error::Tls(e.to_string()),
        }
    }
}

/// Client-side TLS over the platform library.
#[derive(Clone)]
pub struct NativeTlsConnector {
    inner: tokio_native_tls::TlsConnector,
}

impl NativeTlsConnector {
    pub fn new(connector: native_tls::TlsConnector) -> Self {
        Self {
            inner: tokio_native_tls::TlsConnector::from(connector),
        }
    }

    /// Connector using the platform's default trust store.
    pub fn with_platform_roots() -> Result<Self, NativeTlsError> {
        Ok(Self::new(native_tls::TlsConnector::new()?))
    }

    pub async fn connect<S>(&self, domain: &str, stream: S) -> Result<TlsStream<S>, NativeTlsError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let tls_stream = self
            .inner
            .connect(domain, stream)
            .await
            .map_err(NativeTlsError::Tls)?;

        Ok(tls_stream)
    }
}

impl std::fmt::Debug for NativeTlsConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeTlsConnector").finish_non_exhaustive()
    }
}

/// Load a certificate from a PEM file for use with native-tls.
/// This is typically used for adding root certificates.
pub fn load_certificate_from_pem(path: &Path) -> Result<native_tls::Certificate, NativeTlsError> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut pem = Vec::new();
    std::io::Read::read_to_end(&mut reader, &mut pem)?;

    native_tls::Certificate::from_pem(&pem).map_err(NativeTlsError::Tls)
}

/// Connector that additionally trusts the PEM certificate at `path`.
pub fn connector_with_root_from_pem(path: &Path) -> Result<NativeTlsConnector, NativeTlsError> {
    let root = load_certificate_from_pem(path)?;
    let connector = native_tls::TlsConnector::builder()
        .add_root_certificate(root)
        .build()?;
    Ok(NativeTlsConnector::new(connector))
}
