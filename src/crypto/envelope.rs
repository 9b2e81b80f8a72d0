//! Authenticated note envelopes.
//!
//! One envelope is produced per encryption call:
//!
//! ```text
//! PlaintextNote (JSON)
//!      │
//!      ▼ XChaCha20-Poly1305 seal (key from crypto::derive)
//! Ciphertext + tag
//!      │
//!      ▼ DEFLATE (fast setting)
//! nonce[24] ++ compressed_ciphertext   ← bytes stored on the network
//! ```
//!
//! The 24-byte nonce is random per call and is never derived from the
//! content; reusing a nonce across two encryptions under the same key
//! breaks the construction, so every save generates a fresh one.
//! Decryption never returns unauthenticated plaintext: a failed tag is
//! reported as [`EnvelopeError::DecryptionFailure`] with no partial
//! output. Envelopes embedded in text-based storage are base64-encoded.

use std::io::{Read, Write};

use chacha20poly1305::aead::Aead;
use chacha20poly1305::{Key, KeyInit, XChaCha20Poly1305, XNonce};
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;
use hkdf::Hkdf;
use sha2::Sha256;
use thiserror::Error;
use zeroize::Zeroizing;

use super::derive::KeyMaterial;

/// Nonce length in bytes (XChaCha20-Poly1305 extended nonce).
pub const NONCE_LEN: usize = 24;

/// A fresh 24-byte envelope nonce.
pub type Nonce = [u8; NONCE_LEN];

/// Errors from sealing or opening envelopes.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    /// Authentication tag did not verify: wrong key, wrong nonce, or
    /// corrupted bytes. No plaintext is ever returned in this case.
    #[error("decryption failed: ciphertext did not authenticate")]
    DecryptionFailure,

    #[error("compression error: {0}")]
    CompressionError(String),

    #[error("encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("envelope truncated: {len} bytes, need at least {NONCE_LEN} for the nonce")]
    TruncatedEnvelope { len: usize },

    #[error("key derivation failed: {0}")]
    KeyDerivationFailed(String),

    #[error("invalid base64 envelope: {0}")]
    InvalidBase64(String),
}

/// An encrypted note payload: nonce plus compressed ciphertext.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub nonce: Nonce,
    /// DEFLATE-compressed XChaCha20-Poly1305 ciphertext.
    pub ciphertext: Vec<u8>,
}

impl Envelope {
    /// Encrypt `plaintext` under `key` with a fresh random nonce.
    pub fn seal(plaintext: &[u8], key: &KeyMaterial) -> Result<Self, EnvelopeError> {
        let nonce = generate_nonce();
        let ciphertext = encrypt(plaintext, key, &nonce)?;
        Ok(Self { nonce, ciphertext })
    }

    /// Decrypt back to plaintext bytes.
    pub fn open(&self, key: &KeyMaterial) -> Result<Vec<u8>, EnvelopeError> {
        decrypt(&self.ciphertext, key, &self.nonce)
    }

    /// Wire form: `nonce ++ compressed_ciphertext`.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(NONCE_LEN + self.ciphertext.len());
        out.extend_from_slice(&self.nonce);
        out.extend_from_slice(&self.ciphertext);
        out
    }

    /// Split wire bytes back into nonce and ciphertext.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, EnvelopeError> {
        if bytes.len() < NONCE_LEN {
            return Err(EnvelopeError::TruncatedEnvelope { len: bytes.len() });
        }
        let mut nonce = [0u8; NONCE_LEN];
        nonce.copy_from_slice(&bytes[..NONCE_LEN]);
        Ok(Self {
            nonce,
            ciphertext: bytes[NONCE_LEN..].to_vec(),
        })
    }

    /// Base64 form for text-based storage.
    pub fn to_base64(&self) -> String {
        use base64::Engine;
        base64::engine::general_purpose::STANDARD.encode(self.to_bytes())
    }

    pub fn from_base64(encoded: &str) -> Result<Self, EnvelopeError> {
        use base64::Engine;
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| EnvelopeError::InvalidBase64(e.to_string()))?;
        Self::from_bytes(&bytes)
    }
}

/// Encrypt and compress one note payload.
///
/// Returns the compressed ciphertext only; the caller owns the nonce and
/// prepends it when building the wire form.
pub fn encrypt(
    plaintext: &[u8],
    key: &KeyMaterial,
    nonce: &Nonce,
) -> Result<Vec<u8>, EnvelopeError> {
    let aead_key = envelope_key(key)?;
    let cipher = XChaCha20Poly1305::new(Key::from_slice(aead_key.as_ref()));

    let ciphertext = cipher
        .encrypt(XNonce::from_slice(nonce), plaintext)
        .map_err(|_| EnvelopeError::EncryptionFailed("AEAD seal failed".to_string()))?;

    compress(&ciphertext)
}

/// Decompress and decrypt one note payload.
pub fn decrypt(
    compressed_ciphertext: &[u8],
    key: &KeyMaterial,
    nonce: &Nonce,
) -> Result<Vec<u8>, EnvelopeError> {
    let ciphertext = decompress(compressed_ciphertext)?;

    let aead_key = envelope_key(key)?;
    let cipher = XChaCha20Poly1305::new(Key::from_slice(aead_key.as_ref()));

    cipher
        .decrypt(XNonce::from_slice(nonce), ciphertext.as_slice())
        .map_err(|_| EnvelopeError::DecryptionFailure)
}

/// Generate a random 24-byte nonce.
pub fn generate_nonce() -> Nonce {
    use rand::rngs::OsRng;
    use rand::RngCore;

    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);
    nonce
}

/// Expand the derived secret into the AEAD key, with the owner public key
/// as HKDF salt so the key is bound to the (secret, public key) pair.
fn envelope_key(key: &KeyMaterial) -> Result<Zeroizing<[u8; 32]>, EnvelopeError> {
    let hkdf = Hkdf::<Sha256>::new(Some(key.public_key()), key.secret_bytes());
    let mut out = Zeroizing::new([0u8; 32]);
    hkdf.expand(b"xchacha20-poly1305-key", out.as_mut())
        .map_err(|e| EnvelopeError::KeyDerivationFailed(format!("HKDF expand failed: {}", e)))?;
    Ok(out)
}

fn compress(data: &[u8]) -> Result<Vec<u8>, EnvelopeError> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::fast());
    encoder
        .write_all(data)
        .map_err(|e| EnvelopeError::CompressionError(e.to_string()))?;
    encoder
        .finish()
        .map_err(|e| EnvelopeError::CompressionError(e.to_string()))
}

fn decompress(data: &[u8]) -> Result<Vec<u8>, EnvelopeError> {
    let mut decoder = DeflateDecoder::new(data);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| EnvelopeError::CompressionError(e.to_string()))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> KeyMaterial {
        KeyMaterial::from_public_key(&[0u8; 32])
    }

    #[test]
    fn test_round_trip() {
        let nonce = [0x01u8; NONCE_LEN];
        let compressed = encrypt(b"Hello", &key(), &nonce).unwrap();
        let plaintext = decrypt(&compressed, &key(), &nonce).unwrap();
        assert_eq!(plaintext, b"Hello");
    }

    #[test]
    fn test_wrong_public_key_fails_to_authenticate() {
        // Concrete vector: zero public key, nonce of 0x01 bytes; opening
        // with an all-0xFF public key must fail, never return plaintext.
        let nonce = [0x01u8; NONCE_LEN];
        let compressed = encrypt(b"Hello", &key(), &nonce).unwrap();

        let wrong = KeyMaterial::from_public_key(&[0xFFu8; 32]);
        let result = decrypt(&compressed, &wrong, &nonce);
        assert!(matches!(result, Err(EnvelopeError::DecryptionFailure)));
    }

    #[test]
    fn test_wrong_nonce_fails_to_authenticate() {
        let nonce = [0x01u8; NONCE_LEN];
        let compressed = encrypt(b"Hello", &key(), &nonce).unwrap();

        let other_nonce = [0x02u8; NONCE_LEN];
        let result = decrypt(&compressed, &key(), &other_nonce);
        assert!(matches!(result, Err(EnvelopeError::DecryptionFailure)));
    }

    #[test]
    fn test_tampered_ciphertext_is_rejected() {
        // Flip one bit of the AEAD ciphertext (below the compression
        // layer) so the failure is guaranteed to be the tag check.
        let nonce = [0x01u8; NONCE_LEN];
        let compressed = encrypt(b"attack at dawn", &key(), &nonce).unwrap();

        let mut ciphertext = decompress(&compressed).unwrap();
        ciphertext[0] ^= 0x01;
        let recompressed = compress(&ciphertext).unwrap();

        let result = decrypt(&recompressed, &key(), &nonce);
        assert!(matches!(result, Err(EnvelopeError::DecryptionFailure)));
    }

    #[test]
    fn test_bit_flips_never_yield_altered_plaintext() {
        // Flipping any single bit of the wire ciphertext must fail in
        // whichever layer notices first. The only acceptable Ok is the
        // untouched plaintext (a flip in deflate padding bits can leave
        // the decoded stream identical); altered output is never allowed.
        let original = b"integrity matters";
        let nonce = [0x03u8; NONCE_LEN];
        let compressed = encrypt(original, &key(), &nonce).unwrap();

        for byte_index in 0..compressed.len() {
            for bit in 0..8 {
                let mut corrupted = compressed.clone();
                corrupted[byte_index] ^= 1 << bit;
                if let Ok(plaintext) = decrypt(&corrupted, &key(), &nonce) {
                    assert_eq!(
                        plaintext, original,
                        "bit {} of byte {} produced altered plaintext",
                        bit, byte_index
                    );
                }
            }
        }
    }

    #[test]
    fn test_malformed_deflate_is_a_compression_error() {
        let nonce = [0x01u8; NONCE_LEN];
        // 0xFF bytes are not a valid deflate stream.
        let result = decrypt(&[0xFFu8; 64], &key(), &nonce);
        assert!(matches!(result, Err(EnvelopeError::CompressionError(_))));
    }

    #[test]
    fn test_nonce_freshness() {
        let a = generate_nonce();
        let b = generate_nonce();
        assert_ne!(a, b);
    }

    #[test]
    fn test_seal_uses_fresh_nonces() {
        let e1 = Envelope::seal(b"same note", &key()).unwrap();
        let e2 = Envelope::seal(b"same note", &key()).unwrap();
        assert_ne!(e1.nonce, e2.nonce);
        assert_ne!(e1.ciphertext, e2.ciphertext);
        assert_eq!(e1.open(&key()).unwrap(), b"same note");
        assert_eq!(e2.open(&key()).unwrap(), b"same note");
    }

    #[test]
    fn test_wire_round_trip() {
        let envelope = Envelope::seal(b"wire me", &key()).unwrap();
        let bytes = envelope.to_bytes();

        let parsed = Envelope::from_bytes(&bytes).unwrap();
        assert_eq!(parsed, envelope);
        assert_eq!(parsed.open(&key()).unwrap(), b"wire me");
    }

    #[test]
    fn test_truncated_envelope_rejected() {
        let result = Envelope::from_bytes(&[0u8; NONCE_LEN - 1]);
        assert!(matches!(
            result,
            Err(EnvelopeError::TruncatedEnvelope { len }) if len == NONCE_LEN - 1
        ));
    }

    #[test]
    fn test_base64_round_trip() {
        let envelope = Envelope::seal(b"text storage", &key()).unwrap();
        let encoded = envelope.to_base64();
        let parsed = Envelope::from_base64(&encoded).unwrap();
        assert_eq!(parsed, envelope);
    }

    #[test]
    fn test_invalid_base64_rejected() {
        assert!(matches!(
            Envelope::from_base64("not base64!!!"),
            Err(EnvelopeError::InvalidBase64(_))
        ));
    }

    #[test]
    fn test_passphrase_key_cannot_be_opened_with_bare_key() {
        let pk = [5u8; 32];
        let guarded = KeyMaterial::with_passphrase(&pk, "hunter2");
        let envelope = Envelope::seal(b"private", &guarded).unwrap();

        let bare = KeyMaterial::from_public_key(&pk);
        assert!(matches!(
            envelope.open(&bare),
            Err(EnvelopeError::DecryptionFailure)
        ));
        assert_eq!(envelope.open(&guarded).unwrap(), b"private");
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn round_trip_holds_for_all_inputs(
                content in proptest::collection::vec(any::<u8>(), 0..2048),
                public_key in proptest::array::uniform32(any::<u8>()),
                nonce in proptest::array::uniform24(any::<u8>()),
            ) {
                let key = KeyMaterial::from_public_key(&public_key);
                let compressed = encrypt(&content, &key, &nonce).unwrap();
                let plaintext = decrypt(&compressed, &key, &nonce).unwrap();
                prop_assert_eq!(plaintext, content);
            }

            #[test]
            fn different_keys_never_open_each_others_envelopes(
                content in proptest::collection::vec(any::<u8>(), 1..512),
                key_a in proptest::array::uniform32(any::<u8>()),
                key_b in proptest::array::uniform32(any::<u8>()),
            ) {
                prop_assume!(key_a != key_b);
                let nonce = [0x11u8; NONCE_LEN];
                let sealed = encrypt(&content, &KeyMaterial::from_public_key(&key_a), &nonce).unwrap();
                let result = decrypt(&sealed, &KeyMaterial::from_public_key(&key_b), &nonce);
                prop_assert!(result.is_err());
            }
        }
    }
}
