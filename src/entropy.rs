//! Injected randomness for handshake keys and frame masks.
//!
//! RFC 6455 requires both the `Sec-WebSocket-Key` nonce and every client mask
//! key to come from a strong source. The generator is passed in rather than
//! pulled from a global so tests can run with a fixed seed.

use std::sync::Mutex;

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};

/// A cryptographically secure generator that can move between tasks.
pub trait SecureRandom: RngCore + CryptoRng + Send {}

impl<T: RngCore + CryptoRng + Send> SecureRandom for T {}

/// Shared source of handshake nonces and mask keys.
pub struct Entropy {
    rng: Mutex<Box<dyn SecureRandom>>,
}

impl Entropy {
    /// Use the operating system's generator.
    #[must_use]
    pub fn os() -> Self {
        Self::from_rng(OsRng)
    }

    /// Use the given generator, e.g. a seeded `StdRng` in tests.
    #[must_use]
    pub fn from_rng<R: SecureRandom + 'static>(rng: R) -> Self {
        Self {
            rng: Mutex::new(Box::new(rng)),
        }
    }

    /// Four fresh bytes for masking one outgoing frame.
    pub fn mask_key(&self) -> [u8; 4] {
        let mut key = [0u8; 4];
        self.fill(&mut key);
        key
    }

    /// A base64-encoded 16-byte nonce for `Sec-WebSocket-Key`.
    pub fn handshake_key(&self) -> String {
        let mut nonce = [0u8; 16];
        self.fill(&mut nonce);
        BASE64.encode(nonce)
    }

    fn fill(&self, buf: &mut [u8]) {
        // Generator state stays valid across a poisoned lock.
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        rng.fill_bytes(buf);
    }
}

impl Default for Entropy {
    fn default() -> Self {
        Self::os()
    }
}

impl std::fmt::Debug for Entropy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Entropy").finish_non_exhaustive()
    }
}
