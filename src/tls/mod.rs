//! TLS support for secure WebSocket (wss://) connections.
//!
//! Multiple TLS backends are supported:
//!
//! - **rustls** (feature `tls-rustls`): Pure Rust TLS implementation
//! - **native-tls** (feature `tls-native`): Platform-native TLS (OpenSSL/Schannel/Security.framework)
//!
//! Without either feature, connecting to a `wss://` endpoint fails with
//! [`Error::TlsUnavailable`](crate::Error::TlsUnavailable).

#[cfg(feature = "tls-rustls")]
mod rustls_impl;

#[cfg(feature = "tls-native")]
mod native;

#[cfg(feature = "tls-rustls")]
pub use rustls_impl::{
    TlsConnector, TlsError, client_config_with_roots, client_config_with_webpki_roots,
    load_certs_from_file,
};

#[cfg(feature = "tls-native")]
pub use native::{
    NativeTlsConnector, NativeTlsError, connector_with_root_from_pem, load_certificate_from_pem,
};
