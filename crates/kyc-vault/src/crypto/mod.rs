//! AES-256-GCM-SIV field encryption primitives.
//!
//! This module is intentionally free of store and HTTP dependencies.
//! It provides the low-level encrypt/decrypt operations used by the entity
//! transform.
//!
//! # Stored format
//!
//! ```text
//! { "iv": "<base64(nonce)>", "cipherText": "<base64(ciphertext+tag)>" }
//! ```

pub mod cipher;
pub mod key;

pub use cipher::{CipherError, EncryptedField, FieldCipher};
pub use key::EncryptionKey;
