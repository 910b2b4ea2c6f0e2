use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use uuid::Uuid;

/// Lifecycle status of a game session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    /// Players can join and submit task completions.
    InProgress,
    /// The administrator ended the game; terminal.
    Ended,
}

/// Role a player holds for the whole game; assigned once at join time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Role {
    /// Regular innocent player completing tasks.
    Crewmate,
    /// Hidden saboteur.
    Imposter,
    /// The game creator; verifies tasks, manages players, ends the game.
    Administrator,
}

/// Whether a player still participates in the game.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PlayerStatus {
    /// Counted in role quotas and statistics.
    Active,
    /// Removed from play without deleting the row.
    Inactive,
}

/// Aggregate game entity persisted by the storage layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameEntity {
    /// Primary key of the game.
    pub id: Uuid,
    /// Short human-readable join code, unique among non-ended games.
    pub code: String,
    /// Capacity for assignable (non-administrator) players.
    pub max_players: u32,
    /// Number of assignable players currently joined.
    pub current_players: u32,
    /// Configured number of imposter slots; strictly below `max_players`.
    pub imposter_count: u32,
    /// Number of tasks seeded for this game.
    pub task_count: u32,
    /// Lifecycle status; only ever moves `in_progress` to `ended`.
    pub status: GameStatus,
    /// Creation timestamp for auditing/debugging.
    pub created_at: SystemTime,
    /// Last time the game entity was updated.
    pub updated_at: SystemTime,
    /// Player row of the administrator who created the game.
    pub admin_id: Uuid,
}

impl GameEntity {
    /// Configured number of innocent (crewmate) slots.
    pub fn innocent_count(&self) -> u32 {
        self.max_players.saturating_sub(self.imposter_count)
    }
}

/// Player row persisted by the storage layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerEntity {
    /// Primary key of the player.
    pub id: Uuid,
    /// Owning game.
    pub game_id: Uuid,
    /// Display name chosen when joining.
    pub name: String,
    /// Role assigned at join time; immutable thereafter.
    pub role: Role,
    /// Number of task submissions verified for this player.
    pub tasks_completed: u32,
    /// Participation status.
    pub status: PlayerStatus,
    /// Creation timestamp.
    pub created_at: SystemTime,
}

/// Campus task row persisted by the storage layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskEntity {
    /// Primary key of the task.
    pub id: Uuid,
    /// Owning game.
    pub game_id: Uuid,
    /// What the player has to do.
    pub description: String,
    /// Campus location label, when one is specified.
    pub location: Option<String>,
    /// Points awarded on verification.
    pub points: u32,
    /// Whether any submission for this task has been verified. Monotonic.
    pub verified: bool,
}

/// Completion claim for a (player, task) pair; at most one row per pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskProgressEntity {
    /// Primary key of the submission.
    pub id: Uuid,
    /// Owning game, denormalized for per-game queries and subscriptions.
    pub game_id: Uuid,
    /// Submitting player.
    pub player_id: Uuid,
    /// Claimed task.
    pub task_id: Uuid,
    /// Player claims the task is done.
    pub completed: bool,
    /// Administrator verified the claim; implies `completed`. Terminal.
    pub verified: bool,
    /// Last time the player toggled the claim.
    pub submitted_at: SystemTime,
}

impl TaskProgressEntity {
    /// Whether this row sits in the pending-verification queue.
    pub fn is_pending_verification(&self) -> bool {
        self.completed && !self.verified
    }
}

/// Subset of [`GameEntity`] persisted game data used for the public game list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameListItemEntity {
    /// Primary key of the game.
    pub id: Uuid,
    /// Short human-readable join code.
    pub code: String,
    /// Capacity for assignable players.
    pub max_players: u32,
    /// Number of assignable players currently joined.
    pub current_players: u32,
    /// Lifecycle status.
    pub status: GameStatus,
    /// Creation timestamp.
    pub created_at: SystemTime,
}

impl From<GameEntity> for GameListItemEntity {
    fn from(entity: GameEntity) -> Self {
        Self {
            id: entity.id,
            code: entity.code,
            max_players: entity.max_players,
            current_players: entity.current_players,
            status: entity.status,
            created_at: entity.created_at,
        }
    }
}
