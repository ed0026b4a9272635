use std::path::PathBuf;
use std::sync::Arc;

use crate::auth::SessionRegistry;
use crate::service::ReviewService;

/// Shared state for the axum handlers.
#[derive(Clone)]
pub struct HttpState {
    pub review: ReviewService,
    pub sessions: Arc<SessionRegistry>,
    /// Re-read on every login attempt.
    pub credentials_path: PathBuf,
}
