//! Users as seen by the simulation core.
//!
//! User records are owned by the session layer; a tick only reads them.

use std::collections::BTreeMap;

use capture_common::{Direction, Position, UserId};
use capture_kernel::{Footprint, FootprintTable};
use serde::{Deserialize, Serialize};

/// Every user in a room, ordered by id.
pub type UserTable = BTreeMap<UserId, UserInfo>;

/// A human player or bot avatar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    /// User id
    pub id: UserId,
    /// Species key of the avatar, used for its collision footprint
    pub animal: String,
    /// World position
    pub position: Position,
    /// Heading
    #[serde(default)]
    pub direction: Direction,
    /// Whether this entity is simulated on behalf of the room
    #[serde(default)]
    pub is_bot: bool,
    /// Human user whose connection simulates this bot
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controller_id: Option<UserId>,
}

impl UserInfo {
    /// Creates a human player.
    #[must_use]
    pub fn player(id: impl Into<UserId>, animal: impl Into<String>, position: Position) -> Self {
        Self {
            id: id.into(),
            animal: animal.into(),
            position,
            direction: Direction::IDLE,
            is_bot: false,
            controller_id: None,
        }
    }

    /// Creates a bot simulated by `controller`.
    #[must_use]
    pub fn bot(
        id: impl Into<UserId>,
        animal: impl Into<String>,
        position: Position,
        controller: Option<UserId>,
    ) -> Self {
        Self {
            is_bot: true,
            controller_id: controller,
            ..Self::player(id, animal, position)
        }
    }

    /// Collision footprint of the avatar.
    #[must_use]
    pub fn footprint(&self, table: &FootprintTable) -> Footprint {
        table.lookup(&self.animal)
    }
}
