use std::fmt;

/// Per-user state handed over by the login flow.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    pub access_token: String,
    pub login: Option<String>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &"***")
            .field("login", &self.login)
            .finish()
    }
}

/// Session lookup by opaque key. Implementations are injected at startup.
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> Option<Session>;
    fn set(&self, key: String, session: Session);
    fn delete(&self, key: &str) -> bool;
}
