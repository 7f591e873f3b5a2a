//! Ledger-Safe Locator Codec
//!
//! Medical record bytes live in content-addressable storage; the ledger only
//! stores a locator (the retrieval URL for a stored object). Before the
//! locator is written on-chain it is sealed with XChaCha20-Poly1305 and
//! hex-encoded so it round-trips through the ledger's string storage
//! unmodified: ASCII hex, no embedded NUL bytes, no encoding ambiguity.
//!
//! The decode side is deliberately infallible. Legacy and partially-written
//! records may hold a raw content identifier instead of a sealed envelope, so
//! any decode failure falls back to prefixing the configured gateway base.
//! The fallback is a typed branch ([`DecodedLocator::GatewayFallback`]) that
//! callers and tests can observe.
//!
//! # Security note
//!
//! The default key is derived from a fixed shared passphrase carried over
//! from the deployed system. It obscures locators against casual ledger
//! inspection; it is NOT a confidentiality boundary, since every client holds
//! the same key. Callers that want real secrecy must supply their own
//! [`LocatorKey`] and manage distribution themselves.
//!
//! # Example
//!
//! ```rust
//! use dmed_locator_codec::{decode_locator, encode_locator, GatewayBase, LocatorKey};
//!
//! let key = LocatorKey::shared_default();
//! let gateway = GatewayBase::new("https://gateway.lighthouse.storage/ipfs/");
//!
//! let sealed = encode_locator("https://gateway.lighthouse.storage/ipfs/QmXyz", &key).unwrap();
//! let decoded = decode_locator(&sealed, &key, &gateway);
//! assert_eq!(decoded.url(), "https://gateway.lighthouse.storage/ipfs/QmXyz");
//! ```

use chacha20poly1305::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Key, XChaCha20Poly1305, XNonce,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Passphrase the deployed system shares between every client.
///
/// Kept for compatibility with records already written to the ledger; see the
/// crate-level security note.
pub const SHARED_LOCATOR_PASSPHRASE: &str = "dmr";

/// XChaCha20-Poly1305 nonce length in bytes, prepended to every envelope.
const NONCE_LEN: usize = 24;

/// Error type for locator sealing/opening
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LocatorError {
    /// The stored string is not a well-formed hex envelope
    #[error("stored locator is not a hex-encoded envelope")]
    Envelope,
    /// Decryption or UTF-8 decoding of the envelope payload failed
    #[error("locator envelope could not be opened with this key")]
    Open,
    /// AEAD sealing failed
    #[error("could not seal locator envelope")]
    Seal,
}

/// Symmetric key used to seal and open locator envelopes
#[derive(Clone)]
pub struct LocatorKey([u8; 32]);

impl LocatorKey {
    /// Derive a key from a passphrase (SHA-256 of the UTF-8 bytes)
    pub fn from_passphrase(passphrase: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(passphrase.as_bytes());
        let digest = hasher.finalize();
        let mut key = [0u8; 32];
        key.copy_from_slice(&digest);
        LocatorKey(key)
    }

    /// Create a key from raw bytes
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        LocatorKey(bytes)
    }

    /// The network-wide shared key every deployed client uses
    pub fn shared_default() -> Self {
        Self::from_passphrase(SHARED_LOCATOR_PASSPHRASE)
    }

    fn as_key(&self) -> &Key {
        Key::from_slice(&self.0)
    }
}

impl std::fmt::Debug for LocatorKey {
    // Key material never appears in logs
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("LocatorKey(..)")
    }
}

/// Base URL of the retrieval gateway, e.g. `https://gateway.lighthouse.storage/ipfs/`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayBase(String);

impl GatewayBase {
    pub fn new(base: impl Into<String>) -> Self {
        GatewayBase(base.into())
    }

    /// Deterministic retrieval URL for a content identifier
    pub fn retrieval_url(&self, content_id: &str) -> String {
        format!("{}{}", self.0, content_id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Result of decoding a stored locator
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum DecodedLocator {
    /// The envelope opened cleanly; this is the original retrieval URL
    Decrypted(String),
    /// The stored string was treated as a raw content identifier and
    /// prefixed with the gateway base (legacy/partially-written records)
    GatewayFallback(String),
}

impl DecodedLocator {
    /// The retrieval URL, whichever branch produced it
    pub fn url(&self) -> &str {
        match self {
            DecodedLocator::Decrypted(url) => url,
            DecodedLocator::GatewayFallback(url) => url,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, DecodedLocator::GatewayFallback(_))
    }
}

/// Seal a retrieval URL into a ledger-safe hex envelope.
///
/// Envelope layout: `nonce (24 bytes) || ciphertext`, lowercase hex. A fresh
/// random nonce is drawn per call, so two encodings of the same URL differ.
pub fn encode_locator(url: &str, key: &LocatorKey) -> Result<String, LocatorError> {
    let cipher = XChaCha20Poly1305::new(key.as_key());
    let nonce = XChaCha20Poly1305::generate_nonce(&mut OsRng);
    let ciphertext = cipher
        .encrypt(&nonce, url.as_bytes())
        .map_err(|_| LocatorError::Seal)?;

    let mut envelope = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    envelope.extend_from_slice(nonce.as_slice());
    envelope.extend_from_slice(&ciphertext);
    Ok(hex::encode(envelope))
}

/// Open a stored locator, falling back to a gateway URL on any failure.
///
/// Never errors: a malformed or foreign-key envelope yields
/// [`DecodedLocator::GatewayFallback`] with the stored string appended to the
/// gateway base, so legacy records stay viewable.
pub fn decode_locator(stored: &str, key: &LocatorKey, gateway: &GatewayBase) -> DecodedLocator {
    match open_envelope(stored, key) {
        Ok(url) => DecodedLocator::Decrypted(url),
        Err(_) => DecodedLocator::GatewayFallback(gateway.retrieval_url(stored)),
    }
}

fn open_envelope(stored: &str, key: &LocatorKey) -> Result<String, LocatorError> {
    let envelope = hex::decode(stored).map_err(|_| LocatorError::Envelope)?;
    if envelope.len() <= NONCE_LEN {
        return Err(LocatorError::Envelope);
    }
    let (nonce, ciphertext) = envelope.split_at(NONCE_LEN);

    let cipher = XChaCha20Poly1305::new(key.as_key());
    let plaintext = cipher
        .decrypt(XNonce::from_slice(nonce), ciphertext)
        .map_err(|_| LocatorError::Open)?;
    String::from_utf8(plaintext).map_err(|_| LocatorError::Open)
}
