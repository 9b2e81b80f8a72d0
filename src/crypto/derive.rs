//! Key material derivation for note envelopes.
//!
//! The compatibility path derives the envelope secret from the owner's
//! public key alone:
//!
//! ```text
//! secret = SHA256( SHA256(pub_key)[0..32] ++ pub_key )[0..32]
//! ```
//!
//! This is the scheme historical uploads were encrypted under, and it is
//! kept so those notes stay readable. It is obfuscation, not
//! confidentiality: no input is secret, so anyone who knows the owner's
//! public key can recompute the same value. Callers wanting actual
//! confidentiality must layer a passphrase via [`KeyMaterial::with_passphrase`],
//! which mixes material only the owner holds into the derivation.

use hkdf::Hkdf;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

/// Domain separation for the passphrase layer.
const PASSPHRASE_CONTEXT: &[u8] = b"permanote-passphrase-v1";

/// Envelope key material: the owner's public key plus the derived secret.
///
/// The secret is zeroized when the material is dropped.
pub struct KeyMaterial {
    public_key: Vec<u8>,
    secret: Zeroizing<[u8; 32]>,
}

impl KeyMaterial {
    /// Compatibility derivation from the public key alone.
    ///
    /// See the module docs for why this provides obfuscation only.
    pub fn from_public_key(public_key: &[u8]) -> Self {
        let secret = derive_note_secret(public_key);
        Self {
            public_key: public_key.to_vec(),
            secret,
        }
    }

    /// Derivation with a user-supplied passphrase layered on top.
    ///
    /// The compatibility secret is used as the HKDF salt and the
    /// passphrase as input key material, so the result depends on
    /// something only the owner controls. Notes encrypted this way cannot
    /// be decrypted from the public key alone.
    pub fn with_passphrase(public_key: &[u8], passphrase: &str) -> Self {
        let compat = derive_note_secret(public_key);
        let hkdf = Hkdf::<Sha256>::new(Some(compat.as_ref()), passphrase.as_bytes());
        let mut secret = Zeroizing::new([0u8; 32]);
        hkdf.expand(PASSPHRASE_CONTEXT, secret.as_mut())
            .expect("32 bytes is a valid HKDF-SHA256 output length");
        Self {
            public_key: public_key.to_vec(),
            secret,
        }
    }

    /// The owner public key this material was derived for.
    pub fn public_key(&self) -> &[u8] {
        &self.public_key
    }

    pub(crate) fn secret_bytes(&self) -> &[u8; 32] {
        &self.secret
    }
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print the secret.
        f.debug_struct("KeyMaterial")
            .field("public_key", &hex::encode(&self.public_key))
            .finish_non_exhaustive()
    }
}

/// `SHA256(SHA256(pub_key)[0..32] ++ pub_key)[0..32]`
fn derive_note_secret(public_key: &[u8]) -> Zeroizing<[u8; 32]> {
    let inner: [u8; 32] = Sha256::digest(public_key).into();

    let mut hasher = Sha256::new();
    hasher.update(inner);
    hasher.update(public_key);

    let mut secret = Zeroizing::new([0u8; 32]);
    secret.copy_from_slice(hasher.finalize().as_slice());
    secret
}
