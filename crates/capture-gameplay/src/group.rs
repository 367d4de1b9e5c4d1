//! NPC groups.
//!
//! A group is one capturable unit made of one or more NPCs, each identified
//! by the file name of its face sprite. A group with no members is deleted.

use capture_common::{Direction, GroupId, Position, UserId};
use serde::{Deserialize, Serialize};

/// Ownership phase of a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GroupPhase {
    /// Free on the terrain
    #[default]
    Idle,
    /// Held by a captor
    Captured,
    /// In flight, tracked by a path record
    Path,
}

/// A capturable cluster of NPCs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NpcGroup {
    /// Unique group id
    pub id: GroupId,
    /// Member face sprites, oldest first
    pub file_names: Vec<String>,
    /// User currently holding or last throwing this group
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub captor_id: Option<UserId>,
    /// World position
    #[serde(default)]
    pub position: Position,
    /// Heading
    #[serde(default)]
    pub direction: Direction,
    /// Ownership phase
    #[serde(default)]
    pub phase: GroupPhase,
}

impl NpcGroup {
    /// Creates an idle group.
    #[must_use]
    pub fn new<I, S>(id: impl Into<GroupId>, file_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: id.into(),
            file_names: file_names.into_iter().map(Into::into).collect(),
            captor_id: None,
            position: Position::ORIGIN,
            direction: Direction::IDLE,
            phase: GroupPhase::Idle,
        }
    }

    /// Places the group.
    #[must_use]
    pub const fn at(mut self, position: Position) -> Self {
        self.position = position;
        self
    }

    /// Marks the group captured by `user`.
    #[must_use]
    pub fn captured_by(mut self, user: impl Into<UserId>) -> Self {
        self.capture(user.into());
        self
    }

    /// Sets the phase without touching the captor.
    #[must_use]
    pub const fn with_phase(mut self, phase: GroupPhase) -> Self {
        self.phase = phase;
        self
    }

    /// Face shown for the group: the most recent member.
    #[must_use]
    pub fn face_file_name(&self) -> Option<&str> {
        self.file_names.last().map(String::as_str)
    }

    /// Whether the group has no members left.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.file_names.is_empty()
    }

    /// Whether the group is held by a captor.
    #[must_use]
    pub fn is_captured(&self) -> bool {
        self.phase == GroupPhase::Captured && self.captor_id.is_some()
    }

    /// Hands the group to `user`.
    pub fn capture(&mut self, user: UserId) {
        self.captor_id = Some(user);
        self.phase = GroupPhase::Captured;
    }

    /// Drops the group on the terrain.
    pub fn release(&mut self) {
        self.captor_id = None;
        self.phase = GroupPhase::Idle;
        self.direction = Direction::IDLE;
    }

    /// Puts the group in flight. The captor is kept as the thrower.
    pub fn launch(&mut self) {
        self.phase = GroupPhase::Path;
    }

    /// Appends another group's members after this group's.
    pub fn absorb(&mut self, other: &Self) {
        self.file_names.extend(other.file_names.iter().cloned());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_face_is_last_member() {
        let group = NpcGroup::new("g1", ["fox.png", "cat.png"]);
        assert_eq!(group.face_file_name(), Some("cat.png"));
        assert_eq!(NpcGroup::new("g2", Vec::<String>::new()).face_file_name(), None);
    }

    #[test]
    fn test_absorb_concatenates_in_order() {
        let mut a = NpcGroup::new("a", ["fox.png"]);
        let b = NpcGroup::new("b", ["cat.png", "dog.png"]);
        a.absorb(&b);
        assert_eq!(a.file_names, vec!["fox.png", "cat.png", "dog.png"]);
        assert_eq!(a.face_file_name(), Some("dog.png"));
    }

    #[test]
    fn test_capture_then_release() {
        let mut group = NpcGroup::new("g1", ["fox.png"]).captured_by("u1");
        assert!(group.is_captured());
        group.release();
        assert!(!group.is_captured());
        assert_eq!(group.captor_id, None);
        assert_eq!(group.phase, GroupPhase::Idle);
    }

    #[test]
    fn test_launched_group_is_not_captured() {
        let mut group = NpcGroup::new("g1", ["fox.png"]).captured_by("u1");
        group.launch();
        assert!(!group.is_captured());
        assert_eq!(group.captor_id, Some(UserId::new("u1")));
    }

    #[test]
    fn test_wire_names() {
        let group = NpcGroup::new("g1", ["fox.png"]).captured_by("u1");
        let json = serde_json::to_value(&group).expect("serialize");
        assert_eq!(json["fileNames"][0], "fox.png");
        assert_eq!(json["captorId"], "u1");
        assert_eq!(json["phase"], "CAPTURED");
    }
}
