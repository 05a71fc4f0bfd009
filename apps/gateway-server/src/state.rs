//! Shared, immutable application state handed to every request.

use std::sync::Arc;

use gateway_core::{GenericHandler, IdentityProvider};
use spec_model::SpecDocument;

#[derive(Clone)]
pub struct AppState {
    pub spec: Arc<SpecDocument>,
    pub handler: Arc<GenericHandler>,
    pub identity: Arc<dyn IdentityProvider>,
    /// CORS whitelist (`ORIGINS`); empty disables cross-origin access entirely.
    pub cors_origins: Vec<String>,
    /// Overrides the host/scheme used to build pagination URLs (`BASE_URL`).
    pub base_url: Option<String>,
}
