//! Axum HTTP server, routing, and middleware.
//!
//! # Responsibilities
//! - Define the Axum router with all routes and shared middleware.
//! - Translate multipart and JSON requests into customer-document operations.
//! - Render every [`common::ServiceError`] as a JSON [`common::protocol::ErrorResponse`].

pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;
