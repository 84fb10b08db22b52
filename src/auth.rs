use serde::Deserialize;

use crate::{
    error::{PortalError, Result},
    models::{AccessLevel, Session},
    storage::StoreState,
};

/// What the session key holds, as far as the gate is concerned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredSession {
    /// Nothing usable: no key, unreadable storage, or a payload without a
    /// name and an integer level.
    Absent,
    Valid(Session),
    /// A well-formed payload whose level is outside 1..=4. It grants no pages.
    OutOfRange { name: String, level: i64 },
}

// Shape of a payload whose level failed `AccessLevel` validation.
#[derive(Deserialize)]
struct RawSession {
    name: String,
    level: i64,
}

/// SessionStore
///
/// Reads and writes the tab-scoped identity. There is no verification step:
/// whatever sits under the session key is the session. Everything the gate
/// does with it is presentation only.
#[derive(Clone)]
pub struct SessionStore {
    store: StoreState,
    key: String,
}

impl SessionStore {
    pub fn new(store: StoreState, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    /// The stored session, if it is valid.
    pub fn current(&self) -> Option<Session> {
        match self.stored() {
            StoredSession::Valid(session) => Some(session),
            StoredSession::Absent | StoredSession::OutOfRange { .. } => None,
        }
    }

    /// stored
    ///
    /// Classifies the session payload. One that does not parse counts as no
    /// session, so the visitor is sent back to login. One that parses but
    /// carries a level outside 1..=4 is kept apart: it is a session with no
    /// pages allowed.
    pub fn stored(&self) -> StoredSession {
        let raw = match self.store.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return StoredSession::Absent,
            Err(e) => {
                tracing::error!("session read error: {:?}", e);
                return StoredSession::Absent;
            }
        };

        match serde_json::from_str::<Session>(&raw) {
            Ok(session) => StoredSession::Valid(session),
            Err(e) => match serde_json::from_str::<RawSession>(&raw) {
                Ok(RawSession { name, level }) => {
                    tracing::warn!(user = %name, level, "session level outside 1..=4");
                    StoredSession::OutOfRange { name, level }
                }
                Err(_) => {
                    tracing::warn!(
                        key = %self.key,
                        error = %e,
                        "ignoring malformed session payload"
                    );
                    StoredSession::Absent
                }
            },
        }
    }

    /// login
    ///
    /// Writes a new session. The name is trimmed and must not be empty.
    pub fn login(&self, name: &str, level: AccessLevel) -> Result<Session> {
        let name = name.trim();
        if name.is_empty() {
            return Err(PortalError::InvalidLogin("name must not be empty".to_string()));
        }

        let session = Session {
            name: name.to_string(),
            level,
        };
        let payload = serde_json::to_string(&session).map_err(|source| PortalError::Corrupt {
            key: self.key.clone(),
            source,
        })?;
        self.store.set(&self.key, &payload)?;

        tracing::info!(user = %session.name, level = %session.level, "session started");
        Ok(session)
    }

    pub fn logout(&self) -> Result<()> {
        self.store.remove(&self.key)?;
        tracing::info!("session cleared");
        Ok(())
    }
}
