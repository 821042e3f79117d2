use crate::error::{AppResult, InfraError};
use std::collections::HashMap;
use std::path::Path;

/// Read-only username to password table, loaded once at startup.
#[derive(Debug, Default)]
pub struct CredentialStore {
    users: HashMap<String, String>,
}

impl CredentialStore {
    pub fn load<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path).map_err(|source| InfraError::Credentials {
            path: path.to_path_buf(),
            source,
        })?;
        let store = Self::parse(&data);
        tracing::info!(path = %path.display(), users = store.len(), "credentials loaded");
        Ok(store)
    }

    /// Parses `username:password` records. Blank lines, `#` comments and lines
    /// without a colon are skipped; the split happens at the first colon.
    pub fn parse(data: &str) -> Self {
        let mut users = HashMap::new();
        for (lineno, line) in data.lines().enumerate() {
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() || line.trim_start().starts_with('#') {
                continue;
            }
            let Some((user, pass)) = line.split_once(':') else {
                tracing::warn!(line = lineno + 1, "skipping credential line without ':'");
                continue;
            };
            let user = user.trim();
            if user.is_empty() {
                continue;
            }
            if users.insert(user.to_string(), pass.trim().to_string()).is_some() {
                tracing::warn!(user, line = lineno + 1, "duplicate credential entry, last one wins");
            }
        }
        Self { users }
    }

    pub fn verify(&self, username: &str, password: &str) -> bool {
        self.users.get(username).is_some_and(|p| p == password)
    }

    /// Every record, sorted by username.
    pub fn entries(&self) -> Vec<(String, String)> {
        let mut all: Vec<_> = self.users.iter().map(|(u, p)| (u.clone(), p.clone())).collect();
        all.sort();
        all
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

impl<U: Into<String>, P: Into<String>> FromIterator<(U, P)> for CredentialStore {
    fn from_iter<T: IntoIterator<Item = (U, P)>>(iter: T) -> Self {
        Self {
            users: iter.into_iter().map(|(u, p)| (u.into(), p.into())).collect(),
        }
    }
}
