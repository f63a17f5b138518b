//! Session holder: the single optional "current user" value.

use std::sync::Mutex;

use crate::domain::Session;
use crate::error::{HaloError, Result};
use crate::local::LocalStorage;

/// Fixed local-storage key of the session value.
pub const SESSION_KEY: &str = "user";

pub trait SessionStore: Send + Sync {
    /// `Ok(None)` when nobody is signed in.
    fn get(&self) -> Result<Option<Session>>;

    fn set(&self, session: &Session) -> Result<()>;

    /// Idempotent.
    fn clear(&self) -> Result<()>;
}

/// Session kept as JSON under [`SESSION_KEY`] in [`LocalStorage`].
#[derive(Clone, Debug)]
pub struct LocalSessionStore {
    storage: LocalStorage,
}

impl LocalSessionStore {
    pub fn new(storage: LocalStorage) -> Self {
        Self { storage }
    }
}

impl SessionStore for LocalSessionStore {
    fn get(&self) -> Result<Option<Session>> {
        let Some(raw) = self.storage.get_item(SESSION_KEY)? else {
            return Ok(None);
        };
        let value: serde_json::Value = serde_json::from_str(&raw)
            .map_err(|e| HaloError::Format(format!("stored session is not JSON: {e}")))?;
        Ok(Session::from_stored(&value))
    }

    fn set(&self, session: &Session) -> Result<()> {
        let raw = serde_json::to_string(session)
            .map_err(|e| HaloError::Format(format!("failed to serialize session: {e}")))?;
        self.storage.set_item(SESSION_KEY, &raw)?;
        tracing::info!(username = %session.username, "session stored");
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.storage.remove_item(SESSION_KEY)?;
        tracing::info!("session cleared");
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemorySessionStore {
    session: Mutex<Option<Session>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self) -> Result<Option<Session>> {
        Ok(self.session.lock().map_err(poisoned)?.clone())
    }

    fn set(&self, session: &Session) -> Result<()> {
        *self.session.lock().map_err(poisoned)? = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.session.lock().map_err(poisoned)? = None;
        Ok(())
    }
}

fn poisoned<T>(_: std::sync::PoisonError<T>) -> HaloError {
    HaloError::StorageUnavailable("session lock poisoned".into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn exercise(store: &dyn SessionStore) {
        assert_eq!(store.get().unwrap(), None);
        let s = Session::with_password("ana", "pw");
        store.set(&s).unwrap();
        assert_eq!(store.get().unwrap(), Some(s));
        store.clear().unwrap();
        assert_eq!(store.get().unwrap(), None);
        store.clear().unwrap();
    }

    #[test]
    fn memory_store_lifecycle() {
        exercise(&MemorySessionStore::new());
    }

    #[test]
    fn local_store_lifecycle() {
        let tmp = TempDir::new().unwrap();
        exercise(&LocalSessionStore::new(LocalStorage::new(tmp.path())));
    }

    #[test]
    fn local_store_uses_the_user_key() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        LocalSessionStore::new(storage.clone())
            .set(&Session::with_email("ana", "ana@example.com"))
            .unwrap();
        let raw = storage.get_item("user").unwrap().unwrap();
        let v: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(v["email"], "ana@example.com");
    }

    #[test]
    fn any_truthy_stored_value_is_a_session() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        let sessions = LocalSessionStore::new(storage.clone());

        storage
            .set_item(SESSION_KEY, r#"{"username":42,"password":"pw"}"#)
            .unwrap();
        let s = sessions.get().unwrap().unwrap();
        assert_eq!(s.username, "");

        storage.set_item(SESSION_KEY, r#""someone""#).unwrap();
        assert!(sessions.get().unwrap().is_some());

        storage.set_item(SESSION_KEY, "null").unwrap();
        assert_eq!(sessions.get().unwrap(), None);
    }

    #[test]
    fn stored_text_that_is_not_json_is_a_format_error() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        storage.set_item(SESSION_KEY, "{username").unwrap();
        let err = LocalSessionStore::new(storage).get().unwrap_err();
        assert!(matches!(err, HaloError::Format(_)));
    }

    #[test]
    fn session_survives_a_new_handle() {
        let tmp = TempDir::new().unwrap();
        LocalSessionStore::new(LocalStorage::new(tmp.path()))
            .set(&Session::with_password("ana", "pw"))
            .unwrap();
        let again = LocalSessionStore::new(LocalStorage::new(tmp.path()));
        assert_eq!(again.get().unwrap().unwrap().username, "ana");
    }
}
