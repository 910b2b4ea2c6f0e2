//! Admin console operations. Every entry point re-checks that the live
//! session holds the administrator seat; holding a session is not enough.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::{game_store::JoinOutcome, models::Role},
    dto::{
        admin::{ActionResponse, AddPlayerRequest, PlayerSummary, RemovalTicket},
        game::EndGameResponse,
        tasks::{GameStats, PendingSubmission},
    },
    error::ServiceError,
    services::{game_service, roles::FixedRole, task_service},
    state::SharedState,
};

/// Full roster of the administrator's game, including the admin seat and any
/// inactive rows.
pub async fn roster(state: &SharedState) -> Result<Vec<PlayerSummary>, ServiceError> {
    let session = state.require_admin().await?;
    let store = state.require_game_store().await?;
    let players = state.gateway(store.players_by_game(session.game_id)).await?;
    Ok(players.into_iter().map(Into::into).collect())
}

/// Manually add a crewmate to the game. The insert goes through the same
/// atomic join path as a code-based join, so capacity still holds.
pub async fn add_player(
    state: &SharedState,
    request: AddPlayerRequest,
) -> Result<PlayerSummary, ServiceError> {
    request.validate()?;
    let session = state.require_admin().await?;
    let store = state.require_game_store().await?;

    let outcome = state
        .gateway(store.join_game(
            session.game_code.clone(),
            request.name.trim().to_string(),
            Arc::new(FixedRole(Role::Crewmate)),
        ))
        .await?;

    match outcome {
        JoinOutcome::Joined { player, .. } => {
            info!(code = %session.game_code, player = %player.name, "admin added a player");
            Ok(player.into())
        }
        JoinOutcome::Full { code } => {
            Err(ServiceError::GameFull(format!("game `{code}` is full")))
        }
        JoinOutcome::Ended { code } | JoinOutcome::NotFound { code } => {
            Err(ServiceError::NotFound(format!("game `{code}` not found")))
        }
    }
}

/// First phase of removing a player: issue a one-shot confirmation ticket.
/// Nothing is deleted until the ticket comes back via [`confirm_removal`].
pub async fn request_removal(
    state: &SharedState,
    player_id: Uuid,
) -> Result<RemovalTicket, ServiceError> {
    let session = state.require_admin().await?;
    let store = state.require_game_store().await?;

    let players = state.gateway(store.players_by_game(session.game_id)).await?;
    let Some(player) = players.into_iter().find(|player| player.id == player_id) else {
        return Err(ServiceError::NotFound(format!(
            "player `{player_id}` not found in this game"
        )));
    };
    if player.role == Role::Administrator {
        return Err(ServiceError::InvalidState(
            "the administrator seat cannot be removed".into(),
        ));
    }

    let token = Uuid::new_v4();
    state.removal_tickets().insert(token, player_id);
    Ok(RemovalTicket {
        token,
        player_id,
        player_name: player.name,
    })
}

/// Second phase: spend the ticket and delete the player. The counter
/// decrement rides the same atomic store operation as the delete.
pub async fn confirm_removal(
    state: &SharedState,
    token: Uuid,
) -> Result<ActionResponse, ServiceError> {
    state.require_admin().await?;
    let store = state.require_game_store().await?;

    let Some((_, player_id)) = state.removal_tickets().remove(&token) else {
        return Err(ServiceError::NotFound(
            "removal ticket not found or already spent".into(),
        ));
    };

    let deleted = state.gateway(store.delete_player(player_id)).await?;
    if !deleted {
        return Err(ServiceError::NotFound(format!(
            "player `{player_id}` not found"
        )));
    }

    info!(player = %player_id, "player removed");
    Ok(ActionResponse {
        message: "player removed".into(),
    })
}

/// The pending-verification queue for the administrator's game.
pub async fn pending_submissions(
    state: &SharedState,
) -> Result<Vec<PendingSubmission>, ServiceError> {
    task_service::pending_submissions(state).await
}

/// Approve a submission and hand back the refreshed statistics.
pub async fn approve(state: &SharedState, progress_id: Uuid) -> Result<GameStats, ServiceError> {
    task_service::approve(state, progress_id).await?;
    task_service::game_stats(state).await
}

/// Reject a submission and hand back the refreshed statistics.
pub async fn reject(state: &SharedState, progress_id: Uuid) -> Result<GameStats, ServiceError> {
    task_service::reject(state, progress_id).await?;
    task_service::game_stats(state).await
}

/// Aggregate statistics for the administrator's game.
pub async fn game_stats(state: &SharedState) -> Result<GameStats, ServiceError> {
    state.require_admin().await?;
    task_service::game_stats(state).await
}

/// End the administrator's game and tear down the local session. After this,
/// admin operations fail with [`ServiceError::Unauthorized`] until a new game
/// is created.
pub async fn end_game(state: &SharedState) -> Result<EndGameResponse, ServiceError> {
    let session = state.require_admin().await?;
    let response = game_service::end_game(state, &session.game_code).await?;
    state.clear_session().await;
    info!(code = %response.code, "admin console closed");
    Ok(response)
}
