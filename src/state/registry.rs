//! Process-wide chat state.
//!
//! The client and group registries live behind one mutex. Every operation
//! here takes the lock once, does its reads and writes, copies out whatever
//! the caller needs to send, and releases the lock before returning. Nothing
//! is ever written to a socket while the lock is held: callers get back
//! [`OutputHandle`]s and enqueue after the fact, see [`fan_out`].

use crate::config::Config;
use crate::error::ChatError;
use crate::net::output::{ConnId, DeliveryError, OutputHandle};
use crate::services::credentials::CredentialStore;
use crate::state::clients::{ClientEntry, ClientRegistry};
use crate::state::groups::{GroupRegistry, LeaveOutcome, Member, RemovalReport};
use parking_lot::Mutex;
use parley_core::{GroupName, Username};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
struct Directory {
    clients: ClientRegistry,
    groups: GroupRegistry,
}

/// Result of joining a group.
#[derive(Debug)]
pub struct Joined {
    /// `false` when the caller was already a member
    pub newly_joined: bool,
    /// Members other than the caller, for the join notice
    pub others: Vec<OutputHandle>,
}

/// Result of leaving a group.
#[derive(Debug)]
pub enum Left {
    Deleted,
    Remaining(Vec<OutputHandle>),
}

pub struct Registry {
    pub config: Arc<Config>,
    pub credentials: Arc<CredentialStore>,
    directory: Mutex<Directory>,
    next_conn: AtomicU64,
}

impl Registry {
    pub fn new(config: Arc<Config>, credentials: Arc<CredentialStore>) -> Self {
        Self {
            config,
            credentials,
            directory: Mutex::new(Directory::default()),
            next_conn: AtomicU64::new(1),
        }
    }

    pub fn next_conn_id(&self) -> ConnId {
        ConnId(self.next_conn.fetch_add(1, Ordering::Relaxed))
    }

    // ---- clients ----

    pub fn register(&self, username: Username, output: OutputHandle) -> Result<(), ChatError> {
        self.directory.lock().clients.register(username, output)
    }

    pub fn unregister(&self, username: &str) {
        self.directory.lock().clients.unregister(username);
    }

    pub fn is_online(&self, username: &str) -> bool {
        self.directory.lock().clients.is_online(username)
    }

    pub fn lookup(&self, username: &str) -> Result<OutputHandle, ChatError> {
        self.directory.lock().clients.lookup(username)
    }

    pub fn snapshot(&self) -> Vec<ClientEntry> {
        self.directory.lock().clients.snapshot()
    }

    pub fn who(&self) -> Vec<Username> {
        self.directory.lock().clients.usernames()
    }

    /// Every registered connection except `sender`.
    pub fn broadcast_targets(&self, sender: ConnId) -> Vec<OutputHandle> {
        let dir = self.directory.lock();
        dir.clients
            .snapshot()
            .into_iter()
            .map(|e| e.output)
            .filter(|o| o.id() != sender)
            .collect()
    }

    // ---- groups ----

    pub fn create_group(&self, name: GroupName, founder: Member) -> Result<(), ChatError> {
        self.directory.lock().groups.create(name, founder)
    }

    pub fn join_group(&self, name: &GroupName, member: Member) -> Result<Joined, ChatError> {
        let mut dir = self.directory.lock();
        let id = member.id();
        let newly_joined = dir.groups.join(name, member)?;
        let others = others_in(dir.groups.members(name)?, id);
        Ok(Joined { newly_joined, others })
    }

    pub fn leave_group(&self, name: &GroupName, id: ConnId) -> Result<Left, ChatError> {
        let mut dir = self.directory.lock();
        match dir.groups.leave(name, id)? {
            LeaveOutcome::Deleted => Ok(Left::Deleted),
            LeaveOutcome::Left => Ok(Left::Remaining(others_in(dir.groups.members(name)?, id))),
        }
    }

    pub fn group_members(&self, name: &GroupName) -> Result<Vec<Member>, ChatError> {
        self.directory.lock().groups.members(name)
    }

    /// Members of `name` other than `sender`. The sender must belong to the group.
    pub fn group_targets(&self, name: &GroupName, sender: ConnId) -> Result<Vec<OutputHandle>, ChatError> {
        let dir = self.directory.lock();
        let members = dir.groups.members(name)?;
        if !dir.groups.is_member(name, sender) {
            return Err(ChatError::NotGroupMember(name.clone()));
        }
        Ok(others_in(members, sender))
    }

    pub fn groups(&self) -> Vec<(GroupName, Vec<Username>)> {
        self.directory.lock().groups.list()
    }

    pub fn group_exists(&self, name: &str) -> bool {
        self.directory.lock().groups.contains(name)
    }

    pub fn remove_everywhere(&self, id: ConnId) -> RemovalReport {
        self.directory.lock().groups.remove_everywhere(id)
    }

    // ---- lifecycle ----

    /// Drop a connection's login and group memberships in one critical section.
    /// The login is only removed while it still belongs to `id`.
    pub fn disconnect(&self, username: Option<&Username>, id: ConnId) -> RemovalReport {
        let mut dir = self.directory.lock();
        if let Some(u) = username {
            dir.clients.unregister_conn(u.as_str(), id);
        }
        dir.groups.remove_everywhere(id)
    }

    pub fn online_count(&self) -> usize {
        self.directory.lock().clients.len()
    }

    pub fn group_count(&self) -> usize {
        self.directory.lock().groups.len()
    }
}

fn others_in(members: Vec<Member>, id: ConnId) -> Vec<OutputHandle> {
    members.into_iter().filter(|m| m.id() != id).map(|m| m.output).collect()
}

/// Enqueue `text` on every target without waiting. A full or closed queue
/// only loses that recipient's copy. Returns how many copies were queued.
pub fn fan_out(targets: &[OutputHandle], text: &str) -> usize {
    let mut delivered = 0;
    for target in targets {
        match target.deliver(text) {
            Ok(()) => delivered += 1,
            Err(DeliveryError::QueueFull) => {
                tracing::warn!(conn = %target.id(), "outbound queue full, message dropped");
            }
            Err(DeliveryError::Closed) => {
                tracing::debug!(conn = %target.id(), "recipient already gone");
            }
        }
    }
    delivered
}
