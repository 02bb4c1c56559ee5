use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use rustls::RootCertStore;
use rustls::pki_types::{CertificateDer, ServerName};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_rustls::client::TlsStream;
use tokio_rustls::rustls::ClientConfig;

#[derive(Debug)]
pub enum TlsError {
    Io(std::io::Error),
    Configuration(String),
    NoCertificatesFound,
    InvalidDnsName(String),
}

impl std::fmt::Display for TlsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TlsError::Io(e) => write!(f, "TLS I/O error: {}", e),
            TlsError::Configuration(msg) => write!(f, "TLS configuration error: {}", msg),
            TlsError::NoCertificatesFound => write!(f, "no certificates found in file"),
            TlsError::InvalidDnsName(name) => write!(f, "invalid DNS name: {}", name),
        }
    }
}

impl std::error::Error for TlsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TlsError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for TlsError {
    fn from(err: std::io::Error) -> Self {
        TlsError::Io(err)
    }
}

impl From<TlsError> for crate::Error {
    fn from(err: TlsError) -> Self {
        match err {
            TlsError::Io(e) => e.into(),
            other => crate::Error::Tls(other.to_string()),
        }
    }
}

/// Client-side TLS over rustls.
#[derive(Clone)]
pub struct TlsConnector {
    inner: tokio_rustls::TlsConnector,
}

impl TlsConnector {
    pub fn new(config: Arc<ClientConfig>) -> Self {
        Self {
            inner: tokio_rustls::TlsConnector::from(config),
        }
    }

    /// Run the TLS handshake over `stream`, verifying the certificate for
    /// `domain` (a DNS name or IP address).
    pub async fn connect<S>(&self, domain: &str, stream: S) -> Result<TlsStream<S>, TlsError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let server_name = ServerName::try_from(domain.to_string())
            .map_err(|_| TlsError::InvalidDnsName(domain.to_string()))?;

        let tls_stream = self
            .inner
            .connect(server_name, stream)
            .await
            .map_err(TlsError::Io)?;

        Ok(tls_stream)
    }
}

impl std::fmt::Debug for TlsConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsConnector").finish_non_exhaustive()
    }
}

/// Client configuration trusting the bundled Mozilla roots.
pub fn client_config_with_webpki_roots() -> Arc<ClientConfig> {
    let root_store = RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    let config = ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    Arc::new(config)
}

/// Client configuration trusting exactly `roots`, e.g. a private CA.
pub fn client_config_with_roots(
    roots: Vec<CertificateDer<'static>>,
) -> Result<Arc<ClientConfig>, TlsError> {
    let mut root_store = RootCertStore::empty();
    for cert in roots {
        root_store
            .add(cert)
            .map_err(|e| TlsError::Configuration(e.to_string()))?;
    }

    let config = ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    Ok(Arc::new(config))
}

pub fn load_certs_from_file(path: &Path) -> Result<Vec<CertificateDer<'static>>, TlsError> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);

    let certs: Vec<CertificateDer<'static>> =
        rustls_pemfile::certs(&mut reader).collect::<Result<Vec<_>, _>>()?;

    if certs.is_empty() {
        return Err(TlsError::NoCertificatesFound);
    }

    Ok(certs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_tls_error_display() {
        let io_err = TlsError::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"));
        assert!(io_err.to_string().contains("TLS I/O error"));

        let config_err = TlsError::Configuration("bad config".to_string());
        assert!(config_err.to_string().contains("TLS configuration error"));
        assert!(config_err.to_string().contains("bad config"));

        let no_certs = TlsError::NoCertificatesFound;
        assert!(no_certs.to_string().contains("no certificates found"));

        let invalid_dns = TlsError::InvalidDnsName("bad name".to_string());
        assert!(invalid_dns.to_string().contains("invalid DNS name"));
    }

    #[test]
    fn test_tls_error_source() {
        let io_err = TlsError::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "test"));
        assert!(io_err.source().is_some());

        let config_err = TlsError::Configuration("test".to_string());
        assert!(config_err.source().is_none());
    }

    #[test]
    fn test_tls_error_into_crate_error() {
        let err: crate::Error = TlsError::InvalidDnsName("x y".to_string()).into();
        assert!(matches!(err, crate::Error::Tls(msg) if msg.contains("x y")));

        let err: crate::Error =
            TlsError::Io(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset")).into();
        assert!(err.is_transport());
    }

    #[test]
    fn test_load_certs_file_not_found() {
        let result = load_certs_from_file(Path::new("/nonexistent/path/cert.pem"));
        assert!(matches!(result, Err(TlsError::Io(_))));
    }

    #[test]
    fn test_load_certs_no_certs_in_file() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(b"not a certificate\njust some text\n").unwrap();
        temp.flush().unwrap();

        let result = load_certs_from_file(temp.path());
        assert!(matches!(result, Err(TlsError::NoCertificatesFound)));
    }

    #[test]
    fn test_load_certs_from_generated_pem() {
        let cert = rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(cert.cert.pem().as_bytes()).unwrap();
        temp.flush().unwrap();

        let certs = load_certs_from_file(temp.path()).unwrap();
        assert_eq!(certs.len(), 1);
        assert!(client_config_with_roots(certs).is_ok());
    }

    #[test]
    fn test_webpki_roots_config() {
        let config = client_config_with_webpki_roots();
        assert!(config.alpn_protocols.is_empty());
        assert!(config.enable_sni);
    }
}
