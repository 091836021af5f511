use std::sync::Arc;

use crate::provider::ProviderFactory;

/// Process-wide immutable state. Handlers build their own provider client
/// per request through the factory; nothing mutable is shared across
/// requests.
pub struct AppState {
    /// Canonical session cookie name, `sb-{project_ref}-auth-token`.
    pub auth_cookie_name: String,
    pub secure_cookies: bool,
    pub provider: Arc<dyn ProviderFactory>,
}
