//! Client session: the bearer token shared by every API call.
//!
//! A `Session` is a cheap handle; clones see the same token. The browser
//! session reads the token stored in localStorage under `auth_access_token`
//! and removes it on `clear`; an in-memory session never touches the DOM.

pub mod storage;

use std::sync::{Arc, RwLock};

#[derive(Clone, Debug)]
pub struct Session {
    token: Arc<RwLock<Option<String>>>,
    persistent: bool,
}

impl Session {
    /// Restore the browser session from localStorage
    pub fn restore() -> Self {
        Self {
            token: Arc::new(RwLock::new(storage::get_access_token())),
            persistent: true,
        }
    }

    pub fn in_memory(token: Option<String>) -> Self {
        Self {
            token: Arc::new(RwLock::new(token)),
            persistent: false,
        }
    }

    pub fn token(&self) -> Option<String> {
        self.token.read().ok().and_then(|t| t.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }

    /// Drop the token (e.g. after a 401)
    pub fn clear(&self) {
        if self.persistent {
            storage::clear_access_token();
        }
        if let Ok(mut guard) = self.token.write() {
            *guard = None;
        }
    }
}
