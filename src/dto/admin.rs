//! DTO definitions used by the admin console operations.

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::{PlayerEntity, PlayerStatus, Role},
    dto::{format_system_time, validation::validate_display_name},
};

/// Request to add a player to the game from the admin console.
#[derive(Debug, Deserialize, Validate)]
pub struct AddPlayerRequest {
    /// Display name for the new player.
    #[validate(custom(function = validate_display_name))]
    pub name: String,
}

/// Projection of a player for the admin roster.
#[derive(Debug, Clone, Serialize)]
pub struct PlayerSummary {
    /// Primary key of the player.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Assigned role.
    pub role: Role,
    /// Verified submissions for this player.
    pub tasks_completed: u32,
    /// Participation status.
    pub status: PlayerStatus,
    /// RFC 3339 join timestamp.
    pub created_at: String,
}

impl From<PlayerEntity> for PlayerSummary {
    fn from(entity: PlayerEntity) -> Self {
        Self {
            id: entity.id,
            name: entity.name,
            role: entity.role,
            tasks_completed: entity.tasks_completed,
            status: entity.status,
            created_at: format_system_time(entity.created_at),
        }
    }
}

/// First half of the two-phase player removal: a confirmation ticket the
/// presentation layer must echo back before the destructive call is issued.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RemovalTicket {
    /// One-shot token identifying this confirmation.
    pub token: Uuid,
    /// Player the ticket would remove.
    pub player_id: Uuid,
    /// Display name of that player, for the confirmation prompt.
    pub player_name: String,
}

/// Generic action acknowledgement used by admin operations.
#[derive(Debug, Serialize)]
pub struct ActionResponse {
    /// Short human-readable outcome.
    pub message: String,
}
