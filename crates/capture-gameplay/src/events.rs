//! Simulation events.
//!
//! The authority publishes what each tick changed so the transport layer can
//! broadcast it and provisional participants can reconcile.

use capture_common::{GroupId, PacketError, PathId, UserId};
use crossbeam_channel::{bounded, Receiver, Sender};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::packet::Packet;
use crate::path::{PathData, PathPhase};
use crate::registry::RegistryMutation;

/// Event types that can be sent through the event bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum SimEvent {
    /// A mutation batch was applied to the registry
    RegistryDelta {
        /// Tick the batch belongs to
        tick: u64,
        /// Mutations in application order
        mutations: Vec<RegistryMutation>,
    },
    /// A group was thrown
    Thrown {
        /// Tick of the throw
        tick: u64,
        /// The new path
        path: PathData,
    },
    /// A path changed phase
    PathPhaseChanged {
        /// Tick of the change
        tick: u64,
        /// Path id
        path_id: PathId,
        /// New phase
        phase: PathPhase,
    },
    /// Paths were removed from the active table
    PathsRemoved {
        /// Tick of the removal
        tick: u64,
        /// Removed path ids
        path_ids: Vec<PathId>,
    },
    /// A returning group reached its owner
    Landed {
        /// Tick of the landing
        tick: u64,
        /// Group that landed
        group_id: GroupId,
        /// Who holds it now, if anyone
        captor_id: Option<UserId>,
    },
}

impl SimEvent {
    /// Event name used on the wire.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::RegistryDelta { .. } => "registryDelta",
            Self::Thrown { .. } => "thrown",
            Self::PathPhaseChanged { .. } => "pathPhaseChanged",
            Self::PathsRemoved { .. } => "pathsRemoved",
            Self::Landed { .. } => "landed",
        }
    }

    /// Tick the event belongs to.
    #[must_use]
    pub const fn tick(&self) -> u64 {
        match self {
            Self::RegistryDelta { tick, .. }
            | Self::Thrown { tick, .. }
            | Self::PathPhaseChanged { tick, .. }
            | Self::PathsRemoved { tick, .. }
            | Self::Landed { tick, .. } => *tick,
        }
    }

    /// Wraps the event as an EVENT packet.
    pub fn to_packet(&self) -> Result<Packet, PacketError> {
        let payload =
            serde_json::to_value(self).map_err(|e| PacketError::Malformed(e.to_string()))?;
        Ok(Packet::event(self.name(), payload))
    }

    /// Reads an event back out of an EVENT packet.
    pub fn from_packet(packet: &Packet) -> Result<Self, PacketError> {
        let payload = packet
            .event_payload()
            .ok_or_else(|| PacketError::Malformed("not an event packet".to_string()))?;
        serde_json::from_value(payload.clone()).map_err(|e| PacketError::Malformed(e.to_string()))
    }
}

/// Event bus for broadcasting events to subscribers.
#[derive(Debug)]
pub struct EventBus {
    sender: Sender<SimEvent>,
    receiver: Receiver<SimEvent>,
    capacity: usize,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl EventBus {
    /// Creates a new event bus with the given capacity (at least one slot).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        // A zero-capacity channel is a rendezvous: try_send would always fail.
        let capacity = capacity.max(1);
        let (sender, receiver) = bounded(capacity);
        Self {
            sender,
            receiver,
            capacity,
        }
    }

    /// Publishes an event. Returns `false` if the bus was full and the event
    /// was dropped.
    pub fn publish(&self, event: SimEvent) -> bool {
        match self.sender.try_send(event) {
            Ok(()) => true,
            Err(e) => {
                warn!("Event bus full, dropping {}", e.into_inner().name());
                false
            },
        }
    }

    /// Drains all pending events.
    pub fn drain(&self) -> Vec<SimEvent> {
        self.receiver.try_iter().collect()
    }

    /// Returns the number of pending events.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }

    /// Returns the channel capacity.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

}
