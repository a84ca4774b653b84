//! Session collaborator: supplies the bearer token and current user.
//!
//! Token storage and refresh live outside this crate; the gateway only
//! asks for the current values on each request.

use trek_core::types::DbId;

pub trait SessionProvider: Send + Sync {
    /// Bearer token for the current user, if signed in.
    fn token(&self) -> Option<String>;

    fn user_id(&self) -> Option<DbId>;
}

/// A session whose values never change.
#[derive(Debug, Clone, Default)]
pub struct StaticSession {
    token: Option<String>,
    user_id: Option<DbId>,
}

impl StaticSession {
    pub fn new(token: Option<String>, user_id: Option<DbId>) -> Self {
        Self { token, user_id }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }
}

impl SessionProvider for StaticSession {
    fn token(&self) -> Option<String> {
        self.token.clone()
    }

    fn user_id(&self) -> Option<DbId> {
        self.user_id
    }
}
