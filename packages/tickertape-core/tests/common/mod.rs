#![allow(dead_code)]

//! Shared helpers for the integration tests: in-memory state stores and
//! canned token grant bodies.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use tickertape_core::{BrokerConfig, StateStore, StoreError};

/// Store key the client persists its session under.
pub const STATE_KEY: &str = "broker_auth";

/// Simple in-memory store, shared between clients via `Arc`.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn blob(&self, key: &str) -> Option<String> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    pub fn auth_blob(&self) -> serde_json::Value {
        serde_json::from_str(&self.blob(STATE_KEY).expect("auth state persisted")).unwrap()
    }

    pub fn seed(&self, key: &str, value: &str) {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().unwrap().is_empty()
    }
}

impl StateStore for MemoryStore {
    fn retrieve(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    fn save(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Store whose saves can be made to fail on demand, to exercise the
/// "session usable now, lost on restart" persistence contract.
#[derive(Default)]
pub struct FailingStore {
    inner: MemoryStore,
    fail_saves: AtomicBool,
}

impl FailingStore {
    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }
}

impl StateStore for FailingStore {
    fn retrieve(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.inner.retrieve(key)
    }

    fn save(&self, key: &str, value: &str) -> Result<(), StoreError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StoreError::Io(std::io::Error::other("disk full")));
        }
        self.inner.save(key, value)
    }
}

pub fn config(base_url: &str) -> BrokerConfig {
    BrokerConfig::new(base_url, "cid", "csecret")
}

/// Token grant body as the authorize endpoint returns it. Refresh responses
/// omit `refresh_token`.
pub fn grant_body(access: &str, refresh: Option<&str>, expires_in: i64) -> serde_json::Value {
    let mut body = serde_json::json!({
        "expires_in": expires_in,
        "access_token": access,
        "token_type": "AccessToken",
        "userid": "testUser",
    });
    if let Some(refresh) = refresh {
        body["refresh_token"] = serde_json::Value::String(refresh.to_string());
    }
    body
}

/// A persisted session blob with a far-future expiry.
pub fn valid_session_blob(access: &str) -> String {
    format!(
        r#"{{"refresh_token":"RT1","access_token":"{access}","expires_at":"2099-01-01T00:00:00Z","redirect_uri":"https://cb"}}"#
    )
}

/// A persisted session blob whose token already expired.
pub fn expired_session_blob(access: &str) -> String {
    format!(
        r#"{{"refresh_token":"RT1","access_token":"{access}","expires_at":"2000-01-01T00:00:00Z","redirect_uri":"https://cb"}}"#
    )
}
