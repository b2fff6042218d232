use thiserror::Error;

/// Failure talking to one endpoint; the client moves on to the next.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("network error: {0}")]
    Network(String),
    #[error("http status {0}")]
    Status(u16),
    #[error("undecodable response: {0}")]
    Decode(String),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LensError {
    #[error("lens integration is disabled")]
    Disabled,
    #[error("all {attempts} lens endpoints failed, last: {last}")]
    Unavailable { attempts: usize, last: String },
    #[error("lens graphql error: {}", messages.join("; "))]
    GraphQl { messages: Vec<String> },
    #[error("no {operation} query variant succeeded, last: {last}")]
    VariantsExhausted { operation: &'static str, last: String },
    #[error("lens rejected the request: {0}")]
    Rejected(String),
    #[error("unexpected lens response: {0}")]
    Unexpected(String),
    #[error("lens access token required")]
    MissingToken,
    #[error("no lens account for {0}")]
    AccountNotFound(String),
}

impl LensError {
    /// Lens refuses writes from accounts still in the onboarding state until
    /// the session is switched to the account itself.
    pub fn is_onboarding(&self) -> bool {
        let mentions = |s: &str| s.to_ascii_lowercase().contains("onboarding");
        match self {
            LensError::GraphQl { messages } => messages.iter().any(|m| mentions(m)),
            LensError::Rejected(reason) => mentions(reason),
            _ => false,
        }
    }

    /// Errors after which trying another query variant is pointless.
    pub fn is_fatal_for_variants(&self) -> bool {
        matches!(self, LensError::Disabled | LensError::Unavailable { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn onboarding_detection() {
        assert!(LensError::GraphQl { messages: vec!["Account is in ONBOARDING state".into()] }.is_onboarding());
        assert!(LensError::Rejected("onboarding user cannot post".into()).is_onboarding());
        assert!(!LensError::GraphQl { messages: vec!["Forbidden".into()] }.is_onboarding());
        assert!(!LensError::Disabled.is_onboarding());
    }
}
