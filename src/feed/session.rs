//! Session context handed to the feed
//!
//! Authentication is explicit state passed in at construction; a
//! re-authentication replaces the whole context and restarts the page store.

use sha2::{Digest, Sha256};

#[derive(Clone, Default, PartialEq, Eq)]
pub struct SessionContext {
    /// Bearer token for feed requests (None = anonymous)
    token: Option<String>,
}

impl SessionContext {
    pub fn new(token: Option<String>) -> Self {
        let token = token.filter(|t| !t.trim().is_empty());
        Self { token }
    }

    #[cfg(test)]
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// Short stable identifier safe to log (first 8 hex chars of SHA-256)
    pub fn fingerprint(&self) -> String {
        match &self.token {
            Some(token) => {
                let digest = Sha256::digest(token.as_bytes());
                digest.iter().take(4).map(|b| format!("{:02x}", b)).collect()
            }
            None => "anonymous".to_string(),
        }
    }
}

// Never print the token itself
impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext")
            .field("session", &self.fingerprint())
            .finish()
    }
}
