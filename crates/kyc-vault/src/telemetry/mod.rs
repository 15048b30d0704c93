//! Structured logging and optional OpenTelemetry span export.
//!
//! # Telemetry invariants
//!
//! - **No PII, ciphertext or key material** may appear in any span attribute or
//!   log field. Log identifiers (`cust_id`, `user_id`), counts and error kinds.
//! - Log level is configurable via `LOG_LEVEL` (default: `info`).

pub mod init;

pub use init::{init_telemetry, shutdown_telemetry};
