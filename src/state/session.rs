//! Device-local session context installed after create/join and torn down by
//! end-game.

use uuid::Uuid;

use crate::dao::models::Role;

/// The caller's standing within the game it created or joined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    /// Primary key of the session's game.
    pub game_id: Uuid,
    /// Join code of the session's game.
    pub game_code: String,
    /// The caller's player row.
    pub player_id: Uuid,
    /// Display name used at join time.
    pub name: String,
    /// Role assigned for the whole game.
    pub role: Role,
}

impl SessionContext {
    /// Whether this session belongs to the game's administrator.
    ///
    /// Checked at the top of every admin operation; once end-game clears the
    /// session slot, admin calls fail before touching the gateway.
    pub fn is_admin(&self) -> bool {
        self.role == Role::Administrator
    }
}
