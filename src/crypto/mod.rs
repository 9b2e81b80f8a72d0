//! Envelope cryptography for permanent note storage.
//!
//! Two layers:
//! - `derive`: key material computed from the owner's public key, with an
//!   optional passphrase mixed in for keys the owner actually controls
//! - `envelope`: the authenticated, compressed payload format stored on
//!   the durable network (`nonce[24] ++ compressed_ciphertext`)

pub mod derive;
pub mod envelope;

pub use derive::KeyMaterial;
pub use envelope::{
    decrypt, encrypt, generate_nonce, Envelope, EnvelopeError, Nonce, NONCE_LEN,
};
