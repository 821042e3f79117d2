use crate::error::ChatError;
use crate::net::output::{ConnId, OutputHandle};
use parley_core::{GroupName, Username};
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
pub struct Member {
    pub username: Username,
    pub output: OutputHandle,
}

impl Member {
    pub fn id(&self) -> ConnId {
        self.output.id()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveOutcome {
    /// Others are still in the group
    Left,
    /// The leaver was the last member; the group is gone
    Deleted,
}

/// Groups a departing connection was stripped from.
#[derive(Debug, Default)]
pub struct RemovalReport {
    /// Groups that still exist, with the members left behind
    pub left: Vec<(GroupName, Vec<Member>)>,
    /// Groups deleted because they became empty
    pub deleted: Vec<GroupName>,
}

/// Group name to member set. A group with no members is never kept.
#[derive(Debug, Default)]
pub struct GroupRegistry {
    groups: BTreeMap<GroupName, BTreeMap<ConnId, Member>>,
}

impl GroupRegistry {
    /// Create `name` with `founder` as its only member.
    pub fn create(&mut self, name: GroupName, founder: Member) -> Result<(), ChatError> {
        if self.groups.contains_key(&name) {
            return Err(ChatError::GroupAlreadyExists(name));
        }
        self.groups.insert(name, BTreeMap::from([(founder.id(), founder)]));
        Ok(())
    }

    /// Returns `false` when `member` was already in the group.
    pub fn join(&mut self, name: &GroupName, member: Member) -> Result<bool, ChatError> {
        let members = self
            .groups
            .get_mut(name)
            .ok_or_else(|| ChatError::UnknownGroup(name.clone()))?;
        Ok(members.insert(member.id(), member).is_none())
    }

    pub fn leave(&mut self, name: &GroupName, id: ConnId) -> Result<LeaveOutcome, ChatError> {
        let members = self
            .groups
            .get_mut(name)
            .ok_or_else(|| ChatError::UnknownGroup(name.clone()))?;
        if members.remove(&id).is_none() {
            return Err(ChatError::NotGroupMember(name.clone()));
        }
        if members.is_empty() {
            self.groups.remove(name);
            return Ok(LeaveOutcome::Deleted);
        }
        Ok(LeaveOutcome::Left)
    }

    pub fn members(&self, name: &GroupName) -> Result<Vec<Member>, ChatError> {
        self.groups
            .get(name)
            .map(|m| m.values().cloned().collect())
            .ok_or_else(|| ChatError::UnknownGroup(name.clone()))
    }

    pub fn is_member(&self, name: &GroupName, id: ConnId) -> bool {
        self.groups.get(name).is_some_and(|m| m.contains_key(&id))
    }

    /// Strip `id` from every group, deleting the ones left empty.
    pub fn remove_everywhere(&mut self, id: ConnId) -> RemovalReport {
        let mut report = RemovalReport::default();
        self.groups.retain(|name, members| {
            if members.remove(&id).is_none() {
                return true;
            }
            if members.is_empty() {
                report.deleted.push(name.clone());
                return false;
            }
            report.left.push((name.clone(), members.values().cloned().collect()));
            true
        });
        report
    }

    /// Every group with its member names, ordered by group name.
    pub fn list(&self) -> Vec<(GroupName, Vec<Username>)> {
        self.groups
            .iter()
            .map(|(name, members)| {
                let mut names: Vec<_> = members.values().map(|m| m.username.clone()).collect();
                names.sort();
                (name.clone(), names)
            })
            .collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.groups.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn all_non_empty(&self) -> bool {
        self.groups.values().all(|m| !m.is_empty())
    }
}
