//! Entity transform: applies the field codec across whole entity records.
//!
//! # Module invariants
//!
//! - A record returned by [`transform::encrypt_record`] holds only `{iv, cipherText}`
//!   objects and nulls; there is no mixed plaintext/ciphertext output.
//! - Field values are never logged or embedded in errors, only field names.

pub mod transform;

pub use transform::{decrypt_record, encrypt_fields, encrypt_records, string_form};
