//! AES-256-GCM-SIV encryption and decryption of individual string fields.
//!
//! Every call draws a fresh random IV, so equal plaintexts stored in different
//! fields or documents produce unlinkable ciphertexts.
//!
//! **Do NOT substitute plain AES-256-GCM with a fixed nonce.** GCM nonce reuse
//! breaks both confidentiality and authentication.

use std::sync::Arc;

use aes_gcm_siv::{
    aead::{rand_core::RngCore, Aead, KeyInit, OsRng},
    Aes256GcmSiv, Key, Nonce,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::key::{EncryptionKey, KEY_LEN};

/// Byte length of an AES-GCM-SIV nonce (12 bytes = 96 bits).
pub const NONCE_LEN: usize = 12;

/// Byte length of the authentication tag appended to every ciphertext.
pub const TAG_LEN: usize = 16;

/// JSON member holding the base64 IV.
pub const IV_FIELD: &str = "iv";

/// JSON member holding the base64 ciphertext + tag.
pub const CIPHER_TEXT_FIELD: &str = "cipherText";

/// One encrypted scalar value as stored in a customer document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedField {
    /// Base64 of the [`NONCE_LEN`]-byte IV.
    pub iv: String,
    /// Base64 of the ciphertext followed by the [`TAG_LEN`]-byte tag.
    #[serde(rename = "cipherText")]
    pub cipher_text: String,
}

impl EncryptedField {
    /// Recognise a stored value shaped as `{iv, cipherText}`.
    ///
    /// Returns `None` unless `value` is an object with both members present as
    /// strings. Extra members are ignored.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let iv = obj.get(IV_FIELD)?.as_str()?;
        let cipher_text = obj.get(CIPHER_TEXT_FIELD)?.as_str()?;
        Some(Self {
            iv: iv.to_owned(),
            cipher_text: cipher_text.to_owned(),
        })
    }

    /// Convert into the JSON object stored in place of the plaintext.
    pub fn into_value(self) -> Value {
        let mut obj = serde_json::Map::with_capacity(2);
        obj.insert(IV_FIELD.into(), Value::String(self.iv));
        obj.insert(CIPHER_TEXT_FIELD.into(), Value::String(self.cipher_text));
        Value::Object(obj)
    }
}

/// Errors produced by the cipher layer.
#[derive(Debug, Error)]
pub enum CipherError {
    /// The key is the wrong length (must be [`KEY_LEN`] bytes).
    #[error("invalid key length: expected {KEY_LEN} bytes, got {0}")]
    InvalidKeyLength(usize),

    /// The configured key is not valid base64.
    #[error("key is not valid base64")]
    InvalidKeyEncoding,

    /// AES-GCM-SIV encryption or decryption failed.
    #[error("aead operation failed")]
    AeadFailure,

    /// A stored iv or cipherText member is not decodable.
    #[error("invalid encrypted field format: {0}")]
    InvalidFormat(&'static str),

    /// The decrypted bytes are not UTF-8.
    #[error("decrypted value is not valid UTF-8")]
    InvalidUtf8,
}

/// Field codec bound to the process-wide [`EncryptionKey`].
///
/// Cloning is cheap (the AEAD instance sits behind an `Arc`) and the codec holds
/// no per-call mutable state, so clones are shared freely across request tasks.
#[derive(Clone)]
pub struct FieldCipher {
    aead: Arc<Aes256GcmSiv>,
}

impl FieldCipher {
    /// Create a codec that encrypts and decrypts under `key`.
    ///
    /// The key bytes are copied into the AEAD key schedule; `key` itself is
    /// zeroized when it drops here.
    pub fn new(key: EncryptionKey) -> Self {
        let aead = Aes256GcmSiv::new(Key::<Aes256GcmSiv>::from_slice(key.as_bytes()));
        Self { aead: Arc::new(aead) }
    }

    /// Encrypt a plaintext string.
    ///
    /// A random 96-bit IV is generated per call via the OS CSPRNG.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::AeadFailure`] on an internal AEAD error (should be
    /// unreachable with a valid key and nonce).
    pub fn encrypt(&self, plaintext: &str) -> Result<EncryptedField, CipherError> {
        let mut iv = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut iv);

        let ciphertext = self
            .aead
            .encrypt(Nonce::from_slice(&iv), plaintext.as_bytes())
            .map_err(|_| CipherError::AeadFailure)?;

        Ok(EncryptedField {
            iv: STANDARD.encode(iv),
            cipher_text: STANDARD.encode(ciphertext),
        })
    }

    /// Decrypt an [`EncryptedField`] back to its plaintext string.
    ///
    /// # Errors
    ///
    /// - [`CipherError::InvalidFormat`] if either member is not base64, the IV
    ///   has the wrong length, or the ciphertext is shorter than a tag.
    /// - [`CipherError::AeadFailure`] if authentication fails (wrong key or
    ///   tampered data).
    /// - [`CipherError::InvalidUtf8`] if the plaintext is not UTF-8.
    pub fn decrypt(&self, field: &EncryptedField) -> Result<String, CipherError> {
        let iv = STANDARD
            .decode(&field.iv)
            .map_err(|_| CipherError::InvalidFormat("iv is not base64"))?;
        if iv.len() != NONCE_LEN {
            return Err(CipherError::InvalidFormat("iv has wrong length"));
        }
        let ciphertext = STANDARD
            .decode(&field.cipher_text)
            .map_err(|_| CipherError::InvalidFormat("cipherText is not base64"))?;
        if ciphertext.len() < TAG_LEN {
            return Err(CipherError::InvalidFormat("cipherText is truncated"));
        }

        let plaintext = self
            .aead
            .decrypt(Nonce::from_slice(&iv), ciphertext.as_slice())
            .map_err(|_| CipherError::AeadFailure)?;

        String::from_utf8(plaintext).map_err(|_| CipherError::InvalidUtf8)
    }
}

impl std::fmt::Debug for FieldCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldCipher").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use proptest::prelude::*;

    use super::*;

    fn cipher() -> FieldCipher {
        FieldCipher::new(EncryptionKey::generate())
    }

    #[test]
    fn encrypt_decrypt_round_trip() {
        let c = cipher();
        let encrypted = c.encrypt("X123").unwrap();
        assert_eq!(c.decrypt(&encrypted).unwrap(), "X123");
    }

    #[test]
    fn empty_string_round_trips() {
        let c = cipher();
        let encrypted = c.encrypt("").unwrap();
        assert!(!encrypted.iv.is_empty());
        assert!(!encrypted.cipher_text.is_empty());
        assert_eq!(c.decrypt(&encrypted).unwrap(), "");
    }

    #[test]
    fn clones_share_one_key() {
        let c = cipher();
        let encrypted = c.encrypt("shared").unwrap();
        assert_eq!(c.clone().decrypt(&encrypted).unwrap(), "shared");
        assert_eq!(format!("{c:?}"), "FieldCipher { .. }");
    }

    #[test]
    fn iv_is_fresh_per_call() {
        let c = cipher();
        let ivs: HashSet<String> = (0..128)
            .map(|_| c.encrypt("same plaintext").unwrap().iv)
            .collect();
        assert_eq!(ivs.len(), 128);
    }

    #[test]
    fn wrong_key_fails_decryption() {
        let encrypted = cipher().encrypt("secret").unwrap();
        assert!(matches!(
            cipher().decrypt(&encrypted),
            Err(CipherError::AeadFailure)
        ));
    }

    #[test]
    fn tampered_ciphertext_fails_auth() {
        let c = cipher();
        let field = c.encrypt("tamper me").unwrap();
        let mut raw = STANDARD.decode(&field.cipher_text).unwrap();
        raw[0] ^= 0xFF;
        let tampered = EncryptedField {
            iv: field.iv,
            cipher_text: STANDARD.encode(raw),
        };
        assert!(matches!(c.decrypt(&tampered), Err(CipherError::AeadFailure)));
    }

    #[test]
    fn malformed_members_rejected() {
        let c = cipher();
        let good = c.encrypt("x").unwrap();

        let bad_iv = EncryptedField {
            iv: "!!!".into(),
            cipher_text: good.cipher_text.clone(),
        };
        assert!(matches!(c.decrypt(&bad_iv), Err(CipherError::InvalidFormat(_))));

        let short_iv = EncryptedField {
            iv: STANDARD.encode([0u8; 8]),
            cipher_text: good.cipher_text.clone(),
        };
        assert!(matches!(c.decrypt(&short_iv), Err(CipherError::InvalidFormat(_))));

        let truncated = EncryptedField {
            iv: good.iv,
            cipher_text: STANDARD.encode([0u8; 4]),
        };
        assert!(matches!(c.decrypt(&truncated), Err(CipherError::InvalidFormat(_))));
    }

    #[test]
    fn serialises_with_cipher_text_member() {
        let field = EncryptedField {
            iv: "aXY=".into(),
            cipher_text: "Y3Q=".into(),
        };
        let value = serde_json::to_value(&field).unwrap();
        assert_eq!(value, serde_json::json!({"iv": "aXY=", "cipherText": "Y3Q="}));
        assert_eq!(field.clone().into_value(), value);
        assert_eq!(EncryptedField::from_value(&value), Some(field));
    }

    #[test]
    fn from_value_requires_both_string_members() {
        assert!(EncryptedField::from_value(&serde_json::json!({"iv": "a"})).is_none());
        assert!(EncryptedField::from_value(&serde_json::json!({"iv": 1, "cipherText": "b"})).is_none());
        assert!(EncryptedField::from_value(&serde_json::json!("plain")).is_none());
    }

    proptest! {
        #[test]
        fn round_trip_preserves_any_string(plaintext in ".*") {
            let c = cipher();
            let encrypted = c.encrypt(&plaintext).unwrap();
            prop_assert_eq!(c.decrypt(&encrypted).unwrap(), plaintext);
        }
    }
}
