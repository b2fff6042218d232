use thiserror::Error;

/// Session errors
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("authentication required")]
    MissingSession,
    #[error("invalid session: {0}")]
    InvalidSession(String),
    #[error("session expired")]
    Expired,
    #[error("token error: {0}")]
    TokenError(String),
}

impl AuthError {
    /// Stable numeric code for external mapping/logging
    pub fn code(&self) -> u16 {
        match self {
            AuthError::MissingSession => 1001,
            AuthError::InvalidSession(_) => 1002,
            AuthError::Expired => 1003,
            AuthError::TokenError(_) => 1102,
        }
    }
}
