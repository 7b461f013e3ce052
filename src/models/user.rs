use serde::{Deserialize, Serialize};

/// Authenticated caller, injected into request extensions by the auth
/// middleware.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: String,
}
