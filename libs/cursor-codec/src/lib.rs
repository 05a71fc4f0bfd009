//! Opaque, optionally-encrypted pagination cursors.

pub mod cursor;
pub mod filter_hash;
pub mod kms;

pub use cursor::{CursorCodec, CursorPayload};
pub use filter_hash::hash_filters;
pub use kms::{KmsClient, LocalAesKms, NullKms};
