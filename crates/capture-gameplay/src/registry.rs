//! The NPC group registry.
//!
//! One canonical record per group, addressable two ways:
//! - by group id, for every live group regardless of phase
//! - by captor, only for groups currently CAPTURED
//!
//! Every mutator keeps both indices consistent:
//! - each by-user entry names a live, CAPTURED group whose captor is that user
//! - a user is indexed at most once
//! - deleting by either key removes the group from both indices
//! - a group with no members is never stored

use std::collections::BTreeMap;

use capture_common::{GroupId, SchemaVersion, SnapshotError, UserId};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::group::{GroupPhase, NpcGroup};

/// One invariant-preserving registry mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum RegistryMutation {
    /// Upsert a group on behalf of a user
    SetByUser {
        /// Captor key
        user_id: UserId,
        /// New group state
        group: NpcGroup,
    },
    /// Upsert a group by its id
    SetByGroupId {
        /// Group key
        group_id: GroupId,
        /// New group state
        group: NpcGroup,
    },
    /// Remove a user's captured group
    DeleteByUser {
        /// Captor key
        user_id: UserId,
    },
    /// Remove a group by id
    DeleteByGroupId {
        /// Group key
        group_id: GroupId,
    },
}

/// Dual-indexed ownership table for NPC groups.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SnapshotShape", into = "RegistrySnapshot")]
pub struct NpcGroupsBiMap {
    by_group: BTreeMap<GroupId, NpcGroup>,
    by_user: BTreeMap<UserId, GroupId>,
}

impl NpcGroupsBiMap {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry from `(id, group)` pairs, re-deriving every index
    /// through [`Self::set_by_group_id`].
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (GroupId, NpcGroup)>,
    {
        let mut registry = Self::new();
        for (id, group) in entries {
            registry.set_by_group_id(&id, group);
        }
        registry
    }

    /// Parses a JSON snapshot in any accepted shape.
    pub fn from_json(text: &str) -> Result<Self, SnapshotError> {
        let shape: SnapshotShape =
            serde_json::from_str(text).map_err(|e| SnapshotError::Parse(e.to_string()))?;
        Self::try_from(shape)
    }

    /// Serializes the canonical snapshot to JSON.
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        serde_json::to_string(&self.snapshot()).map_err(|e| SnapshotError::Parse(e.to_string()))
    }

    /// Canonical snapshot of the registry.
    #[must_use]
    pub fn snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot {
            version: SchemaVersion::REGISTRY_SNAPSHOT,
            groups: self
                .by_group
                .iter()
                .map(|(id, group)| (id.clone(), group.clone()))
                .collect(),
        }
    }

    /// Upserts a group on behalf of `user_id`.
    ///
    /// An empty group deletes the user's captured group instead. A CAPTURED
    /// group is indexed under `user_id`, which becomes its captor.
    pub fn set_by_user(&mut self, user_id: &UserId, mut group: NpcGroup) {
        if group.is_empty() {
            self.delete_by_user(user_id);
            return;
        }
        if group.phase == GroupPhase::Captured {
            group.captor_id = Some(user_id.clone());
        }
        self.upsert(group);
    }

    /// Upserts a group under `group_id`.
    ///
    /// An empty group deletes the id instead. A CAPTURED group with a captor
    /// is also indexed under that captor.
    pub fn set_by_group_id(&mut self, group_id: &GroupId, mut group: NpcGroup) {
        if group.is_empty() {
            self.delete_by_group_id(group_id);
            return;
        }
        if &group.id != group_id {
            group.id = group_id.clone();
        }
        self.upsert(group);
    }

    /// Removes the user's captured group from both indices.
    pub fn delete_by_user(&mut self, user_id: &UserId) -> Option<NpcGroup> {
        let group_id = self.by_user.remove(user_id)?;
        trace!("Deleted group {group_id} held by {user_id}");
        self.by_group.remove(&group_id)
    }

    /// Removes a group by id.
    ///
    /// The captor's by-user entry is only removed while it still points at
    /// this group; a captor that has since moved on keeps its newer entry.
    pub fn delete_by_group_id(&mut self, group_id: &GroupId) -> Option<NpcGroup> {
        let removed = self.by_group.remove(group_id)?;
        if let Some(captor) = &removed.captor_id {
            if self.by_user.get(captor) == Some(group_id) {
                self.by_user.remove(captor);
            }
        }
        trace!("Deleted group {group_id}");
        Some(removed)
    }

    /// Applies one mutation.
    pub fn apply_mutation(&mut self, mutation: &RegistryMutation) {
        match mutation {
            RegistryMutation::SetByUser { user_id, group } => {
                self.set_by_user(user_id, group.clone());
            },
            RegistryMutation::SetByGroupId { group_id, group } => {
                self.set_by_group_id(group_id, group.clone());
            },
            RegistryMutation::DeleteByUser { user_id } => {
                self.delete_by_user(user_id);
            },
            RegistryMutation::DeleteByGroupId { group_id } => {
                self.delete_by_group_id(group_id);
            },
        }
    }

    /// Applies a batch of mutations in order.
    pub fn apply<'a, I>(&mut self, batch: I)
    where
        I: IntoIterator<Item = &'a RegistryMutation>,
    {
        for mutation in batch {
            self.apply_mutation(mutation);
        }
    }

    /// Returns a new registry with the batch applied, leaving `self` as is.
    #[must_use]
    pub fn applied<'a, I>(&self, batch: I) -> Self
    where
        I: IntoIterator<Item = &'a RegistryMutation>,
    {
        let mut next = self.clone();
        next.apply(batch);
        next
    }

    /// The group a user currently holds captured.
    #[must_use]
    pub fn get_by_user(&self, user_id: &UserId) -> Option<&NpcGroup> {
        self.by_user.get(user_id).and_then(|id| self.by_group.get(id))
    }

    /// The group with this id.
    #[must_use]
    pub fn get_by_group_id(&self, group_id: &GroupId) -> Option<&NpcGroup> {
        self.by_group.get(group_id)
    }

    /// Whether a group with this id exists.
    #[must_use]
    pub fn contains_group(&self, group_id: &GroupId) -> bool {
        self.by_group.contains_key(group_id)
    }

    /// All live groups, ordered by id.
    pub fn values(&self) -> impl Iterator<Item = &NpcGroup> {
        self.by_group.values()
    }

    /// `(captor, group)` for every captured group, ordered by captor.
    pub fn captured(&self) -> impl Iterator<Item = (&UserId, &NpcGroup)> {
        self.by_user
            .iter()
            .filter_map(|(user, id)| self.by_group.get(id).map(|group| (user, group)))
    }

    /// Number of live groups.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_group.len()
    }

    /// Whether no groups are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_group.is_empty()
    }

    /// Number of users holding a captured group.
    #[must_use]
    pub fn captor_count(&self) -> usize {
        self.by_user.len()
    }

    /// Checks both indices against each other.
    #[must_use]
    pub fn invariants_hold(&self) -> bool {
        let users_consistent = self.by_user.iter().all(|(user, id)| {
            self.by_group
                .get(id)
                .is_some_and(|g| g.is_captured() && g.captor_id.as_ref() == Some(user))
        });
        let groups_consistent = self.by_group.iter().all(|(id, g)| {
            &g.id == id
                && !g.is_empty()
                && (g.phase != GroupPhase::Captured || g.captor_id.is_some())
                && (!g.is_captured()
                    || g.captor_id
                        .as_ref()
                        .is_some_and(|c| self.by_user.get(c) == Some(id)))
        });
        users_consistent && groups_consistent
    }

    fn upsert(&mut self, mut group: NpcGroup) {
        let group_id = group.id.clone();
        if group.phase == GroupPhase::Captured && group.captor_id.is_none() {
            debug!("Group {group_id} captured by nobody, now idle");
            group.release();
        }
        let captor = if group.is_captured() {
            group.captor_id.clone()
        } else {
            None
        };

        // Drop any by-user entry for this group that no longer matches.
        self.by_user
            .retain(|user, id| *id != group_id || captor.as_ref() == Some(user));

        if let Some(captor) = captor {
            if let Some(displaced) = self.by_user.insert(captor.clone(), group_id.clone()) {
                if displaced != group_id {
                    if let Some(old) = self.by_group.get_mut(&displaced) {
                        debug!("Group {displaced} displaced from {captor} by {group_id}, now idle");
                        old.release();
                    }
                }
            }
        }

        trace!("Upserted group {group_id} ({:?})", group.phase);
        self.by_group.insert(group_id, group);
    }
}

impl FromIterator<(GroupId, NpcGroup)> for NpcGroupsBiMap {
    fn from_iter<T: IntoIterator<Item = (GroupId, NpcGroup)>>(iter: T) -> Self {
        Self::from_entries(iter)
    }
}

/// Canonical, versioned registry snapshot: an array of `[id, group]` pairs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    /// Format version
    #[serde(default)]
    pub version: SchemaVersion,
    /// Every live group
    pub groups: Vec<(GroupId, NpcGroup)>,
}

impl From<NpcGroupsBiMap> for RegistrySnapshot {
    fn from(registry: NpcGroupsBiMap) -> Self {
        registry.snapshot()
    }
}

/// Snapshot shapes accepted on decode.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SnapshotShape {
    /// `{ "version": .., "groups": [[id, group], ..] }`
    Versioned(RegistrySnapshot),
    /// `[[id, group], ..]`
    Pairs(Vec<(GroupId, NpcGroup)>),
    /// `{ id: group, .. }`
    Map(BTreeMap<GroupId, NpcGroup>),
}

impl TryFrom<SnapshotShape> for NpcGroupsBiMap {
    type Error = SnapshotError;

    fn try_from(shape: SnapshotShape) -> Result<Self, Self::Error> {
        match shape {
            SnapshotShape::Versioned(snapshot) => {
                if !SchemaVersion::REGISTRY_SNAPSHOT.can_read(&snapshot.version) {
                    return Err(SnapshotError::VersionMismatch {
                        expected: SchemaVersion::REGISTRY_SNAPSHOT.to_string(),
                        actual: snapshot.version.to_string(),
                    });
                }
                Ok(Self::from_entries(snapshot.groups))
            },
            SnapshotShape::Pairs(pairs) => Ok(Self::from_entries(pairs)),
            SnapshotShape::Map(map) => Ok(Self::from_entries(map)),
        }
    }
}
