//! Change-notification fan-out used by store backends to drive client
//! re-fetches, mirroring the channel-subscription model of the hosted backend.

use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Table a change event originates from.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChangeTable {
    /// Game rows.
    Games,
    /// Player rows.
    Players,
    /// Seeded task rows.
    GameTasks,
    /// Per-(player, task) progress rows.
    UserTaskProgress,
}

/// Kind of mutation a change event describes.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// A row was created.
    Insert,
    /// A row was updated in place.
    Update,
    /// A row was removed.
    Delete,
}

/// Notification that a row changed; carries identifiers only, subscribers
/// re-fetch whatever state they need.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ChangeEvent {
    /// Table the change happened in.
    pub table: ChangeTable,
    /// Mutation kind.
    pub kind: ChangeKind,
    /// Game the changed row belongs to.
    pub game_id: Uuid,
    /// Primary key of the changed row.
    pub row_id: Uuid,
}

/// Broadcast hub with one channel per table.
pub struct ChangeHub {
    games: broadcast::Sender<ChangeEvent>,
    players: broadcast::Sender<ChangeEvent>,
    tasks: broadcast::Sender<ChangeEvent>,
    progress: broadcast::Sender<ChangeEvent>,
}

impl ChangeHub {
    /// Construct a hub backed by Tokio broadcast channels with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (games, _) = broadcast::channel(capacity);
        let (players, _) = broadcast::channel(capacity);
        let (tasks, _) = broadcast::channel(capacity);
        let (progress, _) = broadcast::channel(capacity);
        Self {
            games,
            players,
            tasks,
            progress,
        }
    }

    fn sender(&self, table: ChangeTable) -> &broadcast::Sender<ChangeEvent> {
        match table {
            ChangeTable::Games => &self.games,
            ChangeTable::Players => &self.players,
            ChangeTable::GameTasks => &self.tasks,
            ChangeTable::UserTaskProgress => &self.progress,
        }
    }

    /// Register a new subscriber for the given table.
    pub fn subscribe(&self, table: ChangeTable) -> broadcast::Receiver<ChangeEvent> {
        self.sender(table).subscribe()
    }

    /// Send an event to all current subscribers, ignoring delivery errors.
    pub fn publish(&self, event: ChangeEvent) {
        let _ = self.sender(event.table).send(event);
    }
}

impl Default for ChangeHub {
    fn default() -> Self {
        Self::new(64)
    }
}
