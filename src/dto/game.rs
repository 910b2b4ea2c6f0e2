use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::{GameEntity, GameListItemEntity, GameStatus, Role},
    dto::{
        format_system_time,
        validation::{validate_display_name, validate_game_code},
    },
};

/// Payload used to bootstrap a brand-new game session.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateGameRequest {
    /// Number of innocent (crewmate) slots.
    #[validate(range(min = 1, message = "at least one innocent is required"))]
    pub innocents: u32,
    /// Number of imposter slots.
    #[validate(range(min = 1, message = "at least one imposter is required"))]
    pub imposters: u32,
    /// Number of tasks to seed from the campus catalog.
    #[validate(range(min = 1, message = "at least one task is required"))]
    pub tasks: u32,
}

/// Payload used to join an existing game by code.
#[derive(Debug, Deserialize, Validate)]
pub struct JoinGameRequest {
    /// The 6-character join code.
    #[validate(custom(function = validate_game_code))]
    pub code: String,
    /// Display name for the joining player.
    #[validate(custom(function = validate_display_name))]
    pub name: String,
}

/// Summary returned once a game has been created or fetched.
#[derive(Debug, Clone, Serialize)]
pub struct GameSummary {
    /// Join code.
    pub code: String,
    /// Capacity for assignable players.
    pub max_players: u32,
    /// Assignable players currently joined.
    pub current_players: u32,
    /// Configured imposter slots.
    pub imposter_count: u32,
    /// Number of seeded tasks.
    pub task_count: u32,
    /// Lifecycle status.
    pub status: GameStatus,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
    /// RFC 3339 last-update timestamp.
    pub updated_at: String,
}

impl From<GameEntity> for GameSummary {
    fn from(entity: GameEntity) -> Self {
        Self {
            code: entity.code,
            max_players: entity.max_players,
            current_players: entity.current_players,
            imposter_count: entity.imposter_count,
            task_count: entity.task_count,
            status: entity.status,
            created_at: format_system_time(entity.created_at),
            updated_at: format_system_time(entity.updated_at),
        }
    }
}

/// Minimal projection of a joinable game on the public list.
#[derive(Debug, Serialize)]
pub struct GameListItem {
    /// Primary key of the game.
    pub id: Uuid,
    /// Join code.
    pub code: String,
    /// Capacity for assignable players.
    pub max_players: u32,
    /// Assignable players currently joined.
    pub current_players: u32,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
}

impl From<GameListItemEntity> for GameListItem {
    fn from(entity: GameListItemEntity) -> Self {
        Self {
            id: entity.id,
            code: entity.code,
            max_players: entity.max_players,
            current_players: entity.current_players,
            created_at: format_system_time(entity.created_at),
        }
    }
}

/// Outcome of a successful join: the assigned role plus the game code.
#[derive(Debug, Serialize)]
pub struct JoinedPlayer {
    /// Code of the joined game.
    pub game_code: String,
    /// The new player row's primary key.
    pub player_id: Uuid,
    /// Display name as stored.
    pub name: String,
    /// Role drawn at join time.
    pub role: Role,
}

/// Acknowledgement of an end-game request.
#[derive(Debug, Serialize)]
pub struct EndGameResponse {
    /// Code of the ended game.
    pub code: String,
    /// `true` when the game was already ended and the call was a no-op.
    pub already_ended: bool,
}
