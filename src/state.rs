use std::sync::Arc;

use crate::auth::{RevocationManager, SystemCredentialBootstrapper, TokenIssuer, TokenValidator};
use crate::config::AuthSettings;
use crate::store::CredentialStore;

/// Shared application state passed to handlers and middleware.
pub struct AppState {
    pub store: Arc<dyn CredentialStore>,
    pub issuer: Arc<TokenIssuer>,
    pub validator: Arc<TokenValidator>,
    pub revocation: RevocationManager,
    pub bootstrapper: SystemCredentialBootstrapper,
}

impl AppState {
    /// Wire every auth component against one store and one set of settings.
    pub fn new(store: Arc<dyn CredentialStore>, settings: &AuthSettings) -> Self {
        let issuer = Arc::new(TokenIssuer::new(store.clone(), settings));
        let validator = Arc::new(TokenValidator::new(store.clone(), settings));
        let revocation = RevocationManager::new(store.clone(), validator.clone(), settings);
        let bootstrapper = SystemCredentialBootstrapper::new(store.clone(), issuer.clone(), settings);

        Self {
            store,
            issuer,
            validator,
            revocation,
            bootstrapper,
        }
    }
}
