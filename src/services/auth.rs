use crate::Registry;
use crate::error::ChatError;
use crate::net::output::OutputHandle;
use crate::state::session::{Phase, Session};
use parley_core::Username;
use std::sync::Arc;

/// What the connection should do after feeding one line to the handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthStep {
    /// Read another line; the session prompt says what for
    Continue,
    /// Tell the client, then start over at the username prompt
    Rejected(ChatError),
    /// Tell the client, then close the connection
    Locked(ChatError),
    Authenticated(Username),
}

/// Drives the username/password handshake against the credential store and
/// the client registry. One line in, one step out; the caller owns the I/O.
pub struct Authenticator {
    registry: Arc<Registry>,
}

impl Authenticator {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    pub fn advance(&self, sess: &mut Session, line: &str, output: &OutputHandle) -> AuthStep {
        let input = clean(line);

        match sess.phase().clone() {
            Phase::AwaitingUsername => {
                if input.is_empty() {
                    return AuthStep::Continue;
                }
                if let Ok(username) = Username::parse(input) {
                    if self.registry.is_online(username.as_str()) {
                        tracing::info!(peer = %sess.peer(), %username, "duplicate login refused");
                        return AuthStep::Rejected(ChatError::DuplicateLogin(username));
                    }
                }
                sess.set_phase(Phase::AwaitingPassword {
                    username: input.to_string(),
                });
                AuthStep::Continue
            }
            Phase::AwaitingPassword { username } => self.check_password(sess, &username, input, output),
            // Already registered; nothing more to check
            Phase::Authenticated { username } => AuthStep::Authenticated(username),
        }
    }

    fn check_password(&self, sess: &mut Session, username: &str, password: &str, output: &OutputHandle) -> AuthStep {
        let valid = Username::parse(username)
            .ok()
            .filter(|u| self.registry.credentials.verify(u.as_str(), password));

        let Some(username) = valid else {
            let failures = sess.record_failure();
            tracing::warn!(peer = %sess.peer(), username, failures, "authentication failed");

            let limit = self.registry.config.max_auth_failures;
            if limit > 0 && failures >= limit {
                return AuthStep::Locked(ChatError::AuthenticationFailure);
            }
            return AuthStep::Rejected(ChatError::AuthenticationFailure);
        };

        // Someone may have logged in under this name while we waited for the password
        if let Err(e) = self.registry.register(username.clone(), output.clone()) {
            tracing::info!(peer = %sess.peer(), %username, "lost login race");
            sess.set_phase(Phase::AwaitingUsername);
            return AuthStep::Rejected(e);
        }

        sess.login(username.clone());
        tracing::info!(peer = %sess.peer(), conn = %sess.id(), %username, "user logged in");
        AuthStep::Authenticated(username)
    }
}

fn clean(line: &str) -> &str {
    line.trim_end_matches(|c: char| c.is_whitespace() || c.is_control())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::net::output::ConnId;
    use crate::services::credentials::CredentialStore;

    fn registry(max_auth_failures: u32) -> Arc<Registry> {
        let creds: CredentialStore = [("alice", "password123"), ("bob", "hunter2")].into_iter().collect();
        let config = Config {
            max_auth_failures,
            ..Config::default()
        };
        Arc::new(Registry::new(Arc::new(config), Arc::new(creds)))
    }

    fn connect(reg: &Registry) -> (Session, OutputHandle) {
        let id = reg.next_conn_id();
        let (out, _rx) = OutputHandle::channel(id, 4);
        (Session::new(id, "127.0.0.1:40000".parse().unwrap()), out)
    }

    #[test]
    fn good_credentials_register_the_session() {
        let reg = registry(0);
        let auth = Authenticator::new(reg.clone());
        let (mut sess, out) = connect(&reg);

        assert_eq!(auth.advance(&mut sess, "alice\r\n", &out), AuthStep::Continue);
        assert_eq!(sess.prompt(), Some("Enter password: "));
        let step = auth.advance(&mut sess, "password123\r", &out);

        assert_eq!(step, AuthStep::Authenticated(Username::parse("alice").unwrap()));
        assert!(sess.is_logged_in());
        assert_eq!(reg.lookup("alice").unwrap().id(), sess.id());
    }

    #[test]
    fn wrong_password_returns_to_username() {
        let reg = registry(0);
        let auth = Authenticator::new(reg.clone());
        let (mut sess, out) = connect(&reg);

        auth.advance(&mut sess, "alice", &out);
        let step = auth.advance(&mut sess, "nope", &out);

        assert_eq!(step, AuthStep::Rejected(ChatError::AuthenticationFailure));
        assert_eq!(*sess.phase(), Phase::AwaitingUsername);
        assert!(!reg.is_online("alice"));
    }

    #[test]
    fn unknown_or_invalid_names_fail_at_password() {
        let reg = registry(0);
        let auth = Authenticator::new(reg.clone());
        let (mut sess, out) = connect(&reg);

        assert_eq!(auth.advance(&mut sess, "mallory", &out), AuthStep::Continue);
        assert_eq!(
            auth.advance(&mut sess, "password123", &out),
            AuthStep::Rejected(ChatError::AuthenticationFailure)
        );

        assert_eq!(auth.advance(&mut sess, "al ice", &out), AuthStep::Continue);
        assert_eq!(
            auth.advance(&mut sess, "password123", &out),
            AuthStep::Rejected(ChatError::AuthenticationFailure)
        );
    }

    #[test]
    fn blank_username_just_reprompts() {
        let reg = registry(0);
        let auth = Authenticator::new(reg.clone());
        let (mut sess, out) = connect(&reg);

        assert_eq!(auth.advance(&mut sess, "   \r", &out), AuthStep::Continue);
        assert_eq!(*sess.phase(), Phase::AwaitingUsername);
    }

    #[test]
    fn duplicate_login_is_refused_before_password() {
        let reg = registry(0);
        let auth = Authenticator::new(reg.clone());
        let (mut first, out1) = connect(&reg);
        auth.advance(&mut first, "alice", &out1);
        auth.advance(&mut first, "password123", &out1);

        let (mut second, out2) = connect(&reg);
        let step = auth.advance(&mut second, "alice", &out2);
        assert_eq!(step, AuthStep::Rejected(ChatError::DuplicateLogin(Username::parse("alice").unwrap())));
        assert_eq!(*second.phase(), Phase::AwaitingUsername);
        assert_eq!(reg.lookup("alice").unwrap().id(), first.id());

        // Same connection can still log in as someone else
        auth.advance(&mut second, "bob", &out2);
        assert!(matches!(auth.advance(&mut second, "hunter2", &out2), AuthStep::Authenticated(_)));
    }

    #[test]
    fn losing_the_register_race_reports_duplicate() {
        let reg = registry(0);
        let auth = Authenticator::new(reg.clone());
        let (mut sess, out) = connect(&reg);
        auth.advance(&mut sess, "alice", &out);

        let (other, _rx) = OutputHandle::channel(ConnId(999), 1);
        reg.register(Username::parse("alice").unwrap(), other).unwrap();

        let step = auth.advance(&mut sess, "password123", &out);
        assert_eq!(step, AuthStep::Rejected(ChatError::DuplicateLogin(Username::parse("alice").unwrap())));
        assert!(!sess.is_logged_in());
    }

    #[test]
    fn failure_limit_locks_the_connection() {
        let reg = registry(2);
        let auth = Authenticator::new(reg.clone());
        let (mut sess, out) = connect(&reg);

        auth.advance(&mut sess, "alice", &out);
        assert!(matches!(auth.advance(&mut sess, "x", &out), AuthStep::Rejected(_)));
        auth.advance(&mut sess, "alice", &out);
        assert_eq!(
            auth.advance(&mut sess, "y", &out),
            AuthStep::Locked(ChatError::AuthenticationFailure)
        );
    }

    #[test]
    fn leading_space_in_username_fails_login() {
        let reg = registry(0);
        let auth = Authenticator::new(reg.clone());
        let (mut sess, out) = connect(&reg);

        assert_eq!(auth.advance(&mut sess, " alice", &out), AuthStep::Continue);
        assert_eq!(
            auth.advance(&mut sess, "password123", &out),
            AuthStep::Rejected(ChatError::AuthenticationFailure)
        );
        assert!(!reg.is_online("alice"));
    }

    #[test]
    fn authenticated_session_is_reported_without_registering_again() {
        let reg = registry(0);
        let auth = Authenticator::new(reg.clone());
        let (mut sess, out) = connect(&reg);
        auth.advance(&mut sess, "alice", &out);
        auth.advance(&mut sess, "password123", &out);

        let step = auth.advance(&mut sess, "anything", &out);
        assert_eq!(step, AuthStep::Authenticated(Username::parse("alice").unwrap()));
        assert_eq!(reg.online_count(), 1);
        assert_eq!(reg.lookup("alice").unwrap().id(), sess.id());
    }
}
