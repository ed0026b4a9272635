use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use uuid::Uuid;

use crate::error::{ReviewError, ReviewResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserEntry {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CredentialsFile {
    users: Vec<UserEntry>,
}

/// Username to plaintext password. Later duplicates win.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    users: HashMap<String, String>,
}

impl Credentials {
    pub fn load(path: &Path) -> ReviewResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ReviewError::Credentials(format!("{}: {}", path.display(), e)))?;
        let file: CredentialsFile = serde_json::from_str(&text)
            .map_err(|e| ReviewError::Credentials(format!("{}: {}", path.display(), e)))?;
        Ok(file.users.into_iter().collect())
    }
}

impl FromIterator<UserEntry> for Credentials {
    fn from_iter<I: IntoIterator<Item = UserEntry>>(iter: I) -> Self {
        Self {
            users: iter.into_iter().map(|u| (u.username, u.password)).collect(),
        }
    }
}

/// True iff `username` is known and `password` matches it exactly.
pub fn authenticate(username: &str, password: &str, credentials: &Credentials) -> bool {
    credentials
        .users
        .get(username)
        .is_some_and(|stored| stored.as_bytes() == password.as_bytes())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionState {
    Unauthenticated,
    Authenticated { username: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionContext {
    pub id: Uuid,
    #[serde(flatten)]
    pub state: SessionState,
}

impl SessionContext {
    pub fn is_authenticated(&self) -> bool {
        matches!(self.state, SessionState::Authenticated { .. })
    }

    pub fn username(&self) -> Option<&str> {
        match &self.state {
            SessionState::Authenticated { username } => Some(username),
            SessionState::Unauthenticated => None,
        }
    }
}

/// Live sessions keyed by the id handed to the browser.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<Uuid, SessionContext>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks the login against `credentials` and, on success, opens an
    /// authenticated session. On failure nothing changes.
    pub fn login(&self, username: &str, password: &str, credentials: &Credentials) -> ReviewResult<SessionContext> {
        if !authenticate(username, password, credentials) {
            return Err(ReviewError::InvalidCredentials);
        }
        let ctx = SessionContext {
            id: Uuid::new_v4(),
            state: SessionState::Authenticated { username: username.to_string() },
        };
        self.lock().insert(ctx.id, ctx.clone());
        Ok(ctx)
    }

    /// Context for `id`; unknown ids are unauthenticated.
    pub fn context(&self, id: Option<Uuid>) -> SessionContext {
        id.and_then(|id| self.lock().get(&id).cloned())
            .unwrap_or_else(|| SessionContext {
                id: id.unwrap_or_else(Uuid::nil),
                state: SessionState::Unauthenticated,
            })
    }

    pub fn logout(&self, id: Uuid) -> bool {
        self.lock().remove(&id).is_some()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, SessionContext>> {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }
}
