use crate::domain::Session;
use crate::error::Result;
use crate::session::SessionStore;

/// Which top-level view a session value selects.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum View {
    /// Nobody is signed in: show the credential gate.
    Gate,
    /// Any session value, whatever its contents: show the drive.
    Drive(Session),
}

impl View {
    pub fn from_session(session: Option<Session>) -> Self {
        match session {
            Some(s) => View::Drive(s),
            None => View::Gate,
        }
    }

    pub fn resolve(sessions: &dyn SessionStore) -> Result<Self> {
        Ok(Self::from_session(sessions.get()?))
    }
}
