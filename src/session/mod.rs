//! Session collaborators
//!
//! Session storage engines live outside this crate. The dispatcher only needs
//! to record the previous URL when a session happens to be active.

use std::{collections::HashMap, sync::Mutex};

use crate::core::traits::SessionStore;

/// Key under which the last served URL is stored
pub const PREVIOUS_URL_KEY: &str = "_previous_url";

/// Session collaborator used when the host has no sessions
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSession;

impl SessionStore for NoSession {
    fn set_if_available(&self, _key: &str, _value: &str) -> bool {
        false
    }

    fn get(&self, _key: &str) -> Option<String> {
        None
    }
}

/// Process-local session, mainly for tests and single-user CLI hosts
#[derive(Debug)]
pub struct MemorySession {
    active: bool,
    values: Mutex<HashMap<String, String>>,
}

impl Default for MemorySession {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySession {
    pub fn new() -> Self {
        Self {
            active: true,
            values: Mutex::new(HashMap::new()),
        }
    }

    /// A session that was never started: writes are refused
    pub fn inactive() -> Self {
        Self {
            active: false,
            values: Mutex::new(HashMap::new()),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}

impl SessionStore for MemorySession {
    fn set_if_available(&self, key: &str, value: &str) -> bool {
        if !self.active {
            return false;
        }
        match self.values.lock() {
            Ok(mut values) => {
                values.insert(key.to_string(), value.to_string());
                true
            }
            Err(e) => {
                log::warn!("Session store poisoned, dropping write to {key}: {e}");
                false
            }
        }
    }

    fn get(&self, key: &str) -> Option<String> {
        self.values
            .lock()
            .ok()
            .and_then(|values| values.get(key).cloned())
    }
}
