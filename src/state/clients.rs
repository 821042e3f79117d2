use crate::error::ChatError;
use crate::net::output::{ConnId, OutputHandle};
use parley_core::Username;
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
pub struct ClientEntry {
    pub username: Username,
    pub output: OutputHandle,
}

/// Username to live connection. At most one connection per username.
#[derive(Debug, Default)]
pub struct ClientRegistry {
    clients: BTreeMap<Username, OutputHandle>,
}

impl ClientRegistry {
    pub fn register(&mut self, username: Username, output: OutputHandle) -> Result<(), ChatError> {
        if self.clients.contains_key(&username) {
            return Err(ChatError::DuplicateLogin(username));
        }
        self.clients.insert(username, output);
        Ok(())
    }

    /// Removing an absent username is a no-op.
    pub fn unregister(&mut self, username: &str) -> Option<OutputHandle> {
        self.clients.remove(username)
    }

    /// Remove `username` only while it is still bound to connection `id`.
    pub fn unregister_conn(&mut self, username: &str, id: ConnId) -> bool {
        if self.clients.get(username).is_some_and(|o| o.id() == id) {
            self.clients.remove(username);
            return true;
        }
        false
    }

    pub fn lookup(&self, username: &str) -> Result<OutputHandle, ChatError> {
        self.clients
            .get(username)
            .cloned()
            .ok_or_else(|| ChatError::UnknownUser(username.to_string()))
    }

    pub fn is_online(&self, username: &str) -> bool {
        self.clients.contains_key(username)
    }

    /// Entries ordered by username.
    pub fn snapshot(&self) -> Vec<ClientEntry> {
        self.clients
            .iter()
            .map(|(username, output)| ClientEntry {
                username: username.clone(),
                output: output.clone(),
            })
            .collect()
    }

    pub fn usernames(&self) -> Vec<Username> {
        self.clients.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(s: &str) -> Username {
        Username::parse(s).unwrap()
    }

    fn handle(id: u64) -> OutputHandle {
        OutputHandle::channel(ConnId(id), 4).0
    }

    #[test]
    fn register_then_lookup() {
        let mut reg = ClientRegistry::default();
        reg.register(user("alice"), handle(1)).unwrap();

        assert_eq!(reg.lookup("alice").unwrap().id(), ConnId(1));
        assert!(reg.is_online("alice"));
        assert_eq!(reg.lookup("bob").unwrap_err(), ChatError::UnknownUser("bob".into()));
    }

    #[test]
    fn second_registration_is_rejected_and_first_kept() {
        let mut reg = ClientRegistry::default();
        reg.register(user("alice"), handle(1)).unwrap();

        let err = reg.register(user("alice"), handle(2)).unwrap_err();
        assert_eq!(err, ChatError::DuplicateLogin(user("alice")));
        assert_eq!(reg.lookup("alice").unwrap().id(), ConnId(1));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn unregister_absent_is_noop() {
        let mut reg = ClientRegistry::default();
        reg.register(user("alice"), handle(1)).unwrap();

        assert!(reg.unregister("carol").is_none());
        assert_eq!(reg.usernames(), vec![user("alice")]);

        assert!(reg.unregister("alice").is_some());
        assert!(reg.unregister("alice").is_none());
        assert!(reg.is_empty());
    }

    #[test]
    fn unregister_conn_ignores_other_connections() {
        let mut reg = ClientRegistry::default();
        reg.register(user("alice"), handle(1)).unwrap();

        assert!(!reg.unregister_conn("alice", ConnId(2)));
        assert!(reg.is_online("alice"));
        assert!(reg.unregister_conn("alice", ConnId(1)));
        assert!(!reg.is_online("alice"));
    }

    #[test]
    fn snapshot_is_ordered() {
        let mut reg = ClientRegistry::default();
        reg.register(user("carol"), handle(3)).unwrap();
        reg.register(user("alice"), handle(1)).unwrap();
        reg.register(user("bob"), handle(2)).unwrap();

        let names: Vec<_> = reg.snapshot().into_iter().map(|e| e.username.to_string()).collect();
        assert_eq!(names, vec!["alice", "bob", "carol"]);
    }
}
