use crate::net::output::ConnId;
use parley_core::Username;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// Where a connection is in the login handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    AwaitingUsername,
    AwaitingPassword { username: String },
    Authenticated { username: Username },
}

#[derive(Debug)]
pub struct Session {
    // When was the connection accepted
    started: Instant,

    id: ConnId,
    peer: SocketAddr,
    phase: Phase,
    /// Consecutive failed logins
    failures: u32,
}

impl Session {
    pub fn new(id: ConnId, peer: SocketAddr) -> Self {
        Self {
            started: Instant::now(),
            id,
            peer,
            phase: Phase::AwaitingUsername,
            failures: 0,
        }
    }

    pub fn id(&self) -> ConnId {
        self.id
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub fn uptime(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn set_phase(&mut self, phase: Phase) {
        self.phase = phase;
    }

    pub fn is_logged_in(&self) -> bool {
        matches!(self.phase, Phase::Authenticated { .. })
    }

    /// The registered name, only while logged in.
    pub fn username(&self) -> Option<&Username> {
        match &self.phase {
            Phase::Authenticated { username } => Some(username),
            _ => None,
        }
    }

    /// Prompt matching the current phase, if it wants one.
    pub fn prompt(&self) -> Option<&'static str> {
        match self.phase {
            Phase::AwaitingUsername => Some("Enter username: "),
            Phase::AwaitingPassword { .. } => Some("Enter password: "),
            Phase::Authenticated { .. } => None,
        }
    }

    pub fn login(&mut self, username: Username) {
        self.phase = Phase::Authenticated { username };
        self.failures = 0;
    }

    /// Back to the username prompt. Returns the name that was logged in.
    pub fn logout(&mut self) -> Option<Username> {
        match std::mem::replace(&mut self.phase, Phase::AwaitingUsername) {
            Phase::Authenticated { username } => Some(username),
            _ => None,
        }
    }

    /// Record a failed login and return the running count.
    pub fn record_failure(&mut self) -> u32 {
        self.phase = Phase::AwaitingUsername;
        self.failures += 1;
        self.failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session::new(ConnId(1), "127.0.0.1:5000".parse().unwrap())
    }

    #[test]
    fn prompts_follow_phase() {
        let mut s = session();
        assert_eq!(s.prompt(), Some("Enter username: "));
        s.set_phase(Phase::AwaitingPassword { username: "alice".into() });
        assert_eq!(s.prompt(), Some("Enter password: "));
        s.login(Username::parse("alice").unwrap());
        assert_eq!(s.prompt(), None);
        assert!(s.is_logged_in());
    }

    #[test]
    fn logout_returns_to_username_prompt() {
        let mut s = session();
        s.login(Username::parse("alice").unwrap());

        assert_eq!(s.logout().map(|u| u.to_string()).as_deref(), Some("alice"));
        assert!(!s.is_logged_in());
        assert_eq!(*s.phase(), Phase::AwaitingUsername);
        assert!(s.logout().is_none());
    }

    #[test]
    fn username_only_while_logged_in() {
        let mut s = session();
        s.set_phase(Phase::AwaitingPassword { username: "alice".into() });
        assert!(s.username().is_none());
        assert!(s.logout().is_none());
        assert_eq!(*s.phase(), Phase::AwaitingUsername);

        s.login(Username::parse("alice").unwrap());
        assert_eq!(s.username().map(Username::as_str), Some("alice"));
    }

    #[test]
    fn failures_reset_on_login() {
        let mut s = session();
        assert_eq!(s.record_failure(), 1);
        assert_eq!(s.record_failure(), 2);
        s.login(Username::parse("bob").unwrap());
        s.logout();
        assert_eq!(s.record_failure(), 1);
    }
}
