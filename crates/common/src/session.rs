//! Session state shared with the UI layer
//!
//! The sideload controller is the only writer. A UI running concurrently
//! reads the published fields to decide whether to offer a cancel button
//! and which process a cancel applies to.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::trace;

/// Field holding the process id of the running sideload helper
pub const CHILD_PID_KEY: &str = "tw_child_pid";

/// Field telling the UI that the transfer window may be cancelled
pub const HAS_CANCEL_KEY: &str = "tw_has_cancel";

/// Write-only capability handed to the controller
pub trait SessionSink: Send + Sync {
    fn set_int(&self, key: &str, value: i64);
    fn set_bool(&self, key: &str, value: bool);
}

/// Value stored in a [`SharedSession`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionValue {
    Int(i64),
    Bool(bool),
}

/// In-process session store
///
/// Cheap to clone; all clones observe the same fields.
#[derive(Debug, Clone, Default)]
pub struct SharedSession {
    fields: Arc<RwLock<HashMap<String, SessionValue>>>,
}

impl SharedSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<SessionValue> {
        self.fields
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(key)
            .copied()
    }

    /// Integer field, `None` if unset or not an integer
    pub fn get_int(&self, key: &str) -> Option<i64> {
        match self.get(key) {
            Some(SessionValue::Int(v)) => Some(v),
            _ => None,
        }
    }

    /// Boolean field, `false` if unset or not a boolean
    pub fn get_bool(&self, key: &str) -> bool {
        matches!(self.get(key), Some(SessionValue::Bool(true)))
    }

    /// Process id of the running helper, if one was published
    pub fn child_pid(&self) -> Option<i64> {
        self.get_int(CHILD_PID_KEY)
    }

    /// Whether the UI should currently offer a cancel affordance
    pub fn can_cancel(&self) -> bool {
        self.get_bool(HAS_CANCEL_KEY)
    }

    fn insert(&self, key: &str, value: SessionValue) {
        trace!("session {} = {:?}", key, value);
        self.fields
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(key.to_string(), value);
    }
}

impl SessionSink for SharedSession {
    fn set_int(&self, key: &str, value: i64) {
        self.insert(key, SessionValue::Int(value));
    }

    fn set_bool(&self, key: &str, value: bool) {
        self.insert(key, SessionValue::Bool(value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_fields() {
        let session = SharedSession::new();
        assert_eq!(session.child_pid(), None);
        assert!(!session.can_cancel());
    }

    #[test]
    fn test_clones_share_state() {
        let session = SharedSession::new();
        let reader = session.clone();

        session.set_int(CHILD_PID_KEY, 4242);
        session.set_bool(HAS_CANCEL_KEY, true);

        assert_eq!(reader.child_pid(), Some(4242));
        assert!(reader.can_cancel());

        session.set_bool(HAS_CANCEL_KEY, false);
        assert!(!reader.can_cancel());
    }

    #[test]
    fn test_type_mismatch() {
        let session = SharedSession::new();
        session.set_bool(CHILD_PID_KEY, true);
        assert_eq!(session.child_pid(), None);

        session.set_int(HAS_CANCEL_KEY, 1);
        assert!(!session.can_cancel());
        assert_eq!(session.get(HAS_CANCEL_KEY), Some(SessionValue::Int(1)));
    }

    #[test]
    fn test_concurrent_reader() {
        let session = SharedSession::new();
        let reader = session.clone();

        let handle = std::thread::spawn(move || {
            for _ in 0..1000 {
                // Readers never see a torn value
                if let Some(pid) = reader.child_pid() {
                    assert!(pid == 1 || pid == 2);
                }
            }
        });

        for i in 0..1000 {
            session.set_int(CHILD_PID_KEY, if i % 2 == 0 { 1 } else { 2 });
        }

        handle.join().unwrap();
    }
}
