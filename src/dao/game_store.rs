use std::sync::Arc;

use futures::future::BoxFuture;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::dao::change::{ChangeEvent, ChangeTable};
use crate::dao::models::{
    GameEntity, GameListItemEntity, GameStatus, PlayerEntity, PlayerStatus, Role,
    TaskEntity, TaskProgressEntity,
};
use crate::dao::storage::StorageResult;

/// Policy invoked inside the atomic join section to draw a role for the new
/// player against the freshly locked player set. Implementations must never
/// return [`Role::Administrator`]; that seat belongs to the game creator.
pub trait RoleAssigner: Send + Sync {
    /// Draw a role given the game configuration and the players already joined.
    fn assign(&self, game: &GameEntity, players: &[PlayerEntity]) -> Role;
}

/// Result of an atomic join attempt.
#[derive(Debug)]
pub enum JoinOutcome {
    /// The player was inserted and the game counter incremented.
    Joined {
        /// Game state after the join.
        game: GameEntity,
        /// The newly inserted player row, role already assigned.
        player: PlayerEntity,
    },
    /// The game already holds `max_players` assignable players.
    Full {
        /// Code of the full game.
        code: String,
    },
    /// The game exists but has already ended.
    Ended {
        /// Code of the ended game.
        code: String,
    },
    /// No game carries this code.
    NotFound {
        /// The unknown code.
        code: String,
    },
}

/// Partial update for a game row.
#[derive(Debug, Default, Clone)]
pub struct GamePatch {
    /// New lifecycle status.
    pub status: Option<GameStatus>,
}

/// Partial update for a player row.
#[derive(Debug, Default, Clone)]
pub struct PlayerPatch {
    /// New verified-submission count.
    pub tasks_completed: Option<u32>,
    /// New participation status.
    pub status: Option<PlayerStatus>,
}

/// Partial update for a task row.
#[derive(Debug, Default, Clone)]
pub struct TaskPatch {
    /// New verified flag; only ever set to `true`.
    pub verified: Option<bool>,
}

/// Abstraction over the persistence layer for games, players, tasks, and
/// task progress.
///
/// Backends must apply [`GameStore::join_game`] and [`GameStore::delete_player`]
/// atomically: the capacity check, the row mutation, and the
/// `current_players` counter adjustment either all take effect or none do, so
/// concurrent joins cannot race past the capacity check.
pub trait GameStore: Send + Sync {
    /// Insert a new game; fails with a conflict when another non-ended game
    /// already carries the same code.
    fn insert_game(&self, game: GameEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Fetch a game by its join code.
    fn find_game_by_code(&self, code: String)
    -> BoxFuture<'static, StorageResult<Option<GameEntity>>>;
    /// List games filtered by status.
    fn list_games(
        &self,
        status: GameStatus,
    ) -> BoxFuture<'static, StorageResult<Vec<GameListItemEntity>>>;
    /// Apply a partial update to the game with the given code.
    fn update_game(
        &self,
        code: String,
        patch: GamePatch,
    ) -> BoxFuture<'static, StorageResult<Option<GameEntity>>>;
    /// Atomic join: check capacity, draw a role via `roles`, insert the player
    /// row, and increment `current_players` as one unit.
    fn join_game(
        &self,
        code: String,
        name: String,
        roles: Arc<dyn RoleAssigner>,
    ) -> BoxFuture<'static, StorageResult<JoinOutcome>>;
    /// Insert a player row without touching the capacity counter. Reserved for
    /// the administrator seat created alongside the game.
    fn insert_player(&self, player: PlayerEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Players belonging to a game, in insertion order.
    fn players_by_game(
        &self,
        game_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<PlayerEntity>>>;
    /// Apply a partial update to a player row.
    fn update_player(
        &self,
        id: Uuid,
        patch: PlayerPatch,
    ) -> BoxFuture<'static, StorageResult<Option<PlayerEntity>>>;
    /// Delete a player row and decrement the owning game's `current_players`
    /// in the same atomic unit. Returns whether a row was deleted.
    fn delete_player(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>>;
    /// Insert the seeded task rows for a new game.
    fn insert_tasks(&self, tasks: Vec<TaskEntity>) -> BoxFuture<'static, StorageResult<()>>;
    /// Tasks belonging to a game, in seeded order.
    fn tasks_by_game(&self, game_id: Uuid) -> BoxFuture<'static, StorageResult<Vec<TaskEntity>>>;
    /// Apply a partial update to a task row.
    fn update_task(
        &self,
        id: Uuid,
        patch: TaskPatch,
    ) -> BoxFuture<'static, StorageResult<Option<TaskEntity>>>;
    /// All progress rows for a game.
    fn progress_by_game(
        &self,
        game_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<TaskProgressEntity>>>;
    /// Progress rows for one player within a game.
    fn progress_by_game_and_player(
        &self,
        game_id: Uuid,
        player_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<TaskProgressEntity>>>;
    /// Fetch a single progress row by id.
    fn find_progress(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<TaskProgressEntity>>>;
    /// Insert or update the progress row for the (player, task) pair carried
    /// by `row`; the pair is a uniqueness key, so retried toggles never create
    /// duplicates. Returns the stored row.
    fn upsert_progress(
        &self,
        row: TaskProgressEntity,
    ) -> BoxFuture<'static, StorageResult<TaskProgressEntity>>;
    /// Subscribe to change events for a table. Events carry the owning game
    /// id so callers can filter for their session.
    fn subscribe(&self, table: ChangeTable) -> broadcast::Receiver<ChangeEvent>;
    /// Probe backend connectivity.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
}
