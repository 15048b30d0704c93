//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use crate::customer::CustomerService;
use crate::extraction::Extractor;

/// Application state shared across all request handlers.
///
/// All fields are cheaply cloneable (`Arc`-wrapped or already `Arc`-backed) so
/// that Axum can clone the state for each request without copying expensive data.
#[derive(Clone)]
pub struct AppState {
    /// Customer-document operations over the configured store.
    pub customers: CustomerService,
    /// Client for the remote extraction service.
    pub extractor: Arc<dyn Extractor>,
}

impl AppState {
    pub fn new(customers: CustomerService, extractor: Arc<dyn Extractor>) -> Self {
        Self {
            customers,
            extractor,
        }
    }
}
