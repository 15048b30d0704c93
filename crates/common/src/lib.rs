//! Common types, protocol definitions, and errors shared across `kyc-vault` crates.

pub mod error;
pub mod protocol;

pub use error::ServiceError;
pub use protocol::EntityRecord;
