//! Opaque pagination cursors: a small versioned payload, optionally
//! encrypted, then base64url-encoded for placement in a URL path segment.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::kms::KmsClient;

/// The decoded contents of a cursor: storage-adapter-specific position
/// state plus a hash of the filter set it was issued under, so a cursor
/// minted for one query can't silently be replayed against a different one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CursorPayload {
    pub position: String,
    pub filter_hash: String,
}

pub struct CursorCodec<'a> {
    kms: &'a dyn KmsClient,
}

impl<'a> CursorCodec<'a> {
    pub fn new(kms: &'a dyn KmsClient) -> Self {
        Self { kms }
    }

    pub fn encode(&self, payload: &CursorPayload) -> String {
        let json = serde_json::to_vec(payload).expect("CursorPayload always serializes");
        let sealed = self.kms.seal(&json);
        URL_SAFE_NO_PAD.encode(sealed)
    }

    /// Decoding failures of any kind (bad base64, decryption failure,
    /// malformed JSON) collapse to `None` — callers surface a uniform
    /// "cursor is not valid" response rather than distinguishing why.
    pub fn decode(&self, cursor: &str) -> Option<CursorPayload> {
        let raw = URL_SAFE_NO_PAD.decode(cursor).ok()?;
        let opened = self.kms.open(&raw)?;
        match serde_json::from_slice(&opened) {
            Ok(payload) => Some(payload),
            Err(err) => {
                debug!(error = %err, "cursor payload failed to deserialize");
                None
            }
        }
    }
}
