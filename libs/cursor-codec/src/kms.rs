//! The encryption boundary a cursor is sealed against. Real deployments
//! wire a managed key service in here; this crate only ships the trait
//! plus a passthrough and an AES-GCM stand-in for local dev and tests.

use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{AeadCore, Aes256Gcm, Key, Nonce};

/// Seals/opens opaque cursor bytes. Implementations own their own key
/// material; `None` on open means "treat as invalid", never a different
/// error variant — an attacker probing cursor validity gets uniform 400s.
pub trait KmsClient: Send + Sync {
    fn seal(&self, plaintext: &[u8]) -> Vec<u8>;
    fn open(&self, ciphertext: &[u8]) -> Option<Vec<u8>>;
}

/// No encryption: the cursor payload is carried as-is. Appropriate only
/// when the cursor contents are not sensitive (no row values leak through
/// them) or for local development.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullKms;

impl KmsClient for NullKms {
    fn seal(&self, plaintext: &[u8]) -> Vec<u8> {
        plaintext.to_vec()
    }

    fn open(&self, ciphertext: &[u8]) -> Option<Vec<u8>> {
        Some(ciphertext.to_vec())
    }
}

/// AES-256-GCM encryption with a key held in process memory. A stand-in for
/// a managed KMS in local dev and integration tests — not a substitute for
/// one in production, where key material should never live in the gateway
/// process.
pub struct LocalAesKms {
    cipher: Aes256Gcm,
}

impl LocalAesKms {
    pub fn new(key_bytes: &[u8; 32]) -> Self {
        let key = Key::<Aes256Gcm>::from_slice(key_bytes);
        Self {
            cipher: Aes256Gcm::new(key),
        }
    }

    pub fn generate() -> (Self, [u8; 32]) {
        let mut key_bytes = [0u8; 32];
        use rand::RngCore;
        rand::thread_rng().fill_bytes(&mut key_bytes);
        (Self::new(&key_bytes), key_bytes)
    }
}

const NONCE_LEN: usize = 12;

impl KmsClient for LocalAesKms {
    fn seal(&self, plaintext: &[u8]) -> Vec<u8> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext)
            .expect("AES-GCM encryption with a well-formed key never fails");
        let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        out.extend_from_slice(nonce.as_slice());
        out.extend_from_slice(&ciphertext);
        out
    }

    fn open(&self, ciphertext: &[u8]) -> Option<Vec<u8>> {
        if ciphertext.len() < NONCE_LEN {
            return None;
        }
        let (nonce_bytes, body) = ciphertext.split_at(NONCE_LEN);
        let nonce = Nonce::from_slice(nonce_bytes);
        self.cipher.decrypt(nonce, body).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_kms_roundtrips() {
        let kms = NullKms;
        let sealed = kms.seal(b"hello");
        assert_eq!(kms.open(&sealed).unwrap(), b"hello");
    }

    #[test]
    fn local_aes_kms_roundtrips() {
        let (kms, _key) = LocalAesKms::generate();
        let sealed = kms.seal(b"page cursor payload");
        assert_eq!(kms.open(&sealed).unwrap(), b"page cursor payload");
    }

    #[test]
    fn local_aes_kms_rejects_tampered_ciphertext() {
        let (kms, _key) = LocalAesKms::generate();
        let mut sealed = kms.seal(b"page cursor payload");
        let last = sealed.len() - 1;
        sealed[last] ^= 0xff;
        assert!(kms.open(&sealed).is_none());
    }

    #[test]
    fn local_aes_kms_rejects_short_input() {
        let (kms, _key) = LocalAesKms::generate();
        assert!(kms.open(&[0u8; 4]).is_none());
    }
}
