//! Task and verification tracking.
//!
//! Each (player, task) pair moves through `pending -> completed -> verified`;
//! rejection sends a completed claim back to pending, and `verified` is
//! terminal. Aggregate statistics are always recomputed from the authoritative
//! rows, never maintained as independently mutated counters.

use std::time::SystemTime;

use async_stream::try_stream;
use futures::Stream;
use tokio_stream::{
    StreamExt,
    wrappers::{BroadcastStream, errors::BroadcastStreamRecvError},
};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    dao::{
        change::ChangeTable,
        game_store::{PlayerPatch, TaskPatch},
        models::{
            GameStatus, PlayerEntity, PlayerStatus, Role, TaskEntity, TaskProgressEntity,
        },
    },
    dto::tasks::{GameStats, PendingSubmission, TaskBoard, TaskView},
    error::ServiceError,
    state::{SessionContext, SharedState},
};

/// The caller's task list with per-task status, plus game statistics.
pub async fn task_board(state: &SharedState) -> Result<TaskBoard, ServiceError> {
    let session = state.require_session().await?;
    board_for(state, &session).await
}

/// Toggle the caller's completion claim for a task. Upsert semantics: retries
/// never create a second row for the same (player, task) pair. Refused once
/// the pair is verified or the game has ended.
pub async fn toggle_complete(
    state: &SharedState,
    task_id: Uuid,
) -> Result<TaskView, ServiceError> {
    let session = state.require_session().await?;
    let store = state.require_game_store().await?;

    let Some(game) = state
        .gateway(store.find_game_by_code(session.game_code.clone()))
        .await?
    else {
        return Err(ServiceError::NotFound(format!(
            "game `{}` not found",
            session.game_code
        )));
    };
    if game.status != GameStatus::InProgress {
        return Err(ServiceError::InvalidState(
            "completions can only change while the game is in progress".into(),
        ));
    }

    let tasks = state.gateway(store.tasks_by_game(session.game_id)).await?;
    let Some(task) = tasks.into_iter().find(|task| task.id == task_id) else {
        return Err(ServiceError::NotFound(format!("task `{task_id}` not found")));
    };

    let mine = state
        .gateway(store.progress_by_game_and_player(session.game_id, session.player_id))
        .await?;
    let existing = mine.into_iter().find(|row| row.task_id == task_id);

    if existing.as_ref().is_some_and(|row| row.verified) {
        return Err(ServiceError::InvalidState(
            "task is already verified for this player".into(),
        ));
    }

    let completed = !existing.as_ref().map(|row| row.completed).unwrap_or(false);
    let row = TaskProgressEntity {
        id: existing.map(|row| row.id).unwrap_or_else(Uuid::new_v4),
        game_id: session.game_id,
        player_id: session.player_id,
        task_id,
        completed,
        verified: false,
        submitted_at: SystemTime::now(),
    };
    let stored = state.gateway(store.upsert_progress(row)).await?;

    debug!(task = %task_id, completed, "completion claim toggled");
    Ok(TaskView::build(task, Some(&stored)))
}

/// The administrator's pending-verification queue: claims with
/// `completed = true` and `verified = false`.
pub async fn pending_submissions(
    state: &SharedState,
) -> Result<Vec<PendingSubmission>, ServiceError> {
    let session = state.require_admin().await?;
    let store = state.require_game_store().await?;

    let players = state.gateway(store.players_by_game(session.game_id)).await?;
    let tasks = state.gateway(store.tasks_by_game(session.game_id)).await?;
    let progress = state.gateway(store.progress_by_game(session.game_id)).await?;

    Ok(progress
        .iter()
        .filter(|row| row.is_pending_verification())
        .filter_map(|row| {
            let task = tasks.iter().find(|task| task.id == row.task_id)?;
            let name = players
                .iter()
                .find(|player| player.id == row.player_id)
                .map(|player| player.name.as_str())
                .unwrap_or("unknown player");
            Some(PendingSubmission::build(row, name, task))
        })
        .collect())
}

/// Approve a pending claim: marks the pair verified, flags the task, and
/// bumps the player's verified-submission count. Approving an already
/// verified claim is a no-op.
pub async fn approve(state: &SharedState, progress_id: Uuid) -> Result<(), ServiceError> {
    let session = state.require_admin().await?;
    let store = state.require_game_store().await?;

    let progress = find_scoped_progress(state, &session, progress_id).await?;
    if progress.verified {
        info!(progress = %progress_id, "approve on an already-verified claim; no-op");
        return Ok(());
    }
    if !progress.completed {
        return Err(ServiceError::InvalidState(
            "submission is not awaiting verification".into(),
        ));
    }

    let verified = TaskProgressEntity {
        completed: true,
        verified: true,
        ..progress.clone()
    };
    state.gateway(store.upsert_progress(verified)).await?;
    state
        .gateway(store.update_task(
            progress.task_id,
            TaskPatch {
                verified: Some(true),
            },
        ))
        .await?;

    let players = state.gateway(store.players_by_game(session.game_id)).await?;
    if let Some(player) = players.iter().find(|player| player.id == progress.player_id) {
        state
            .gateway(store.update_player(
                player.id,
                PlayerPatch {
                    tasks_completed: Some(player.tasks_completed + 1),
                    status: None,
                },
            ))
            .await?;
    }

    info!(progress = %progress_id, "submission approved");
    Ok(())
}

/// Reject a pending claim, returning the pair to `pending` without touching
/// any counter. Rejecting a claim that is not pending is a no-op; a verified
/// claim can no longer be rejected.
pub async fn reject(state: &SharedState, progress_id: Uuid) -> Result<(), ServiceError> {
    let session = state.require_admin().await?;
    let store = state.require_game_store().await?;

    let progress = find_scoped_progress(state, &session, progress_id).await?;
    if progress.verified {
        return Err(ServiceError::InvalidState(
            "verified submissions cannot be rejected".into(),
        ));
    }
    if !progress.completed {
        info!(progress = %progress_id, "reject on a pending claim; no-op");
        return Ok(());
    }

    let cleared = TaskProgressEntity {
        completed: false,
        verified: false,
        ..progress
    };
    state.gateway(store.upsert_progress(cleared)).await?;

    info!(progress = %progress_id, "submission rejected");
    Ok(())
}

/// Aggregate statistics for the session's game, derived from current rows.
pub async fn game_stats(state: &SharedState) -> Result<GameStats, ServiceError> {
    let session = state.require_session().await?;
    stats_for(state, session.game_id).await
}

/// Stream of task-board snapshots for the session's game.
///
/// Subscribes to task and progress change events and re-derives the board on
/// every event touching this game, the same way the mobile client re-fetches
/// on channel notifications. The first item is the current snapshot.
pub fn watch_task_board(
    state: SharedState,
) -> impl Stream<Item = Result<TaskBoard, ServiceError>> {
    try_stream! {
        let session = state.require_session().await?;
        let store = state.require_game_store().await?;
        let progress = BroadcastStream::new(store.subscribe(ChangeTable::UserTaskProgress));
        let tasks = BroadcastStream::new(store.subscribe(ChangeTable::GameTasks));
        let mut events = progress.merge(tasks);

        yield board_for(&state, &session).await?;

        while let Some(event) = events.next().await {
            match event {
                Ok(event) if event.game_id == session.game_id => {
                    yield board_for(&state, &session).await?;
                }
                Ok(_) => {}
                // Dropped events only mean we re-derive once instead of N times.
                Err(BroadcastStreamRecvError::Lagged(_)) => {
                    yield board_for(&state, &session).await?;
                }
            }
        }
    }
}

/// Pure derivation of the aggregate statistics from current rows.
pub fn compute_stats(
    players: &[PlayerEntity],
    tasks: &[TaskEntity],
    progress: &[TaskProgressEntity],
) -> GameStats {
    GameStats {
        total_players: players
            .iter()
            .filter(|p| p.status == PlayerStatus::Active && p.role != Role::Administrator)
            .count() as u32,
        tasks_completed: progress.iter().filter(|row| row.verified).count() as u32,
        total_tasks: tasks.len() as u32,
        pending_verifications: progress
            .iter()
            .filter(|row| row.is_pending_verification())
            .count() as u32,
    }
}

async fn board_for(
    state: &SharedState,
    session: &SessionContext,
) -> Result<TaskBoard, ServiceError> {
    let store = state.require_game_store().await?;

    let players = state.gateway(store.players_by_game(session.game_id)).await?;
    let tasks = state.gateway(store.tasks_by_game(session.game_id)).await?;
    let progress = state.gateway(store.progress_by_game(session.game_id)).await?;

    let stats = compute_stats(&players, &tasks, &progress);
    let views = tasks
        .into_iter()
        .map(|task| {
            let mine = progress
                .iter()
                .find(|row| row.player_id == session.player_id && row.task_id == task.id);
            TaskView::build(task, mine)
        })
        .collect();

    Ok(TaskBoard {
        tasks: views,
        stats,
    })
}

async fn stats_for(state: &SharedState, game_id: Uuid) -> Result<GameStats, ServiceError> {
    let store = state.require_game_store().await?;
    let players = state.gateway(store.players_by_game(game_id)).await?;
    let tasks = state.gateway(store.tasks_by_game(game_id)).await?;
    let progress = state.gateway(store.progress_by_game(game_id)).await?;
    Ok(compute_stats(&players, &tasks, &progress))
}

async fn find_scoped_progress(
    state: &SharedState,
    session: &SessionContext,
    progress_id: Uuid,
) -> Result<TaskProgressEntity, ServiceError> {
    let store = state.require_game_store().await?;
    let progress = state
        .gateway(store.find_progress(progress_id))
        .await?
        .filter(|row| row.game_id == session.game_id);
    progress.ok_or_else(|| ServiceError::NotFound(format!("submission `{progress_id}` not found")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use crate::{
        config::AppConfig,
        dao::{game_store::GameStore, memory::MemoryStore},
        dto::{
            game::{CreateGameRequest, JoinGameRequest},
            tasks::TaskStatus,
        },
        services::game_service,
        state::AppState,
    };

    struct Scenario {
        store: Arc<dyn GameStore>,
        admin: SharedState,
        player: SharedState,
    }

    async fn scenario() -> Scenario {
        let store: Arc<dyn GameStore> = Arc::new(MemoryStore::new());
        let admin = AppState::with_store(AppConfig::default(), store.clone());
        let game = game_service::create_game(
            &admin,
            CreateGameRequest {
                innocents: 3,
                imposters: 1,
                tasks: 5,
            },
        )
        .await
        .unwrap();

        let player = AppState::with_store(AppConfig::default(), store.clone());
        game_service::join_game(
            &player,
            JoinGameRequest {
                code: game.code,
                name: "ada".into(),
            },
        )
        .await
        .unwrap();

        Scenario {
            store,
            admin,
            player,
        }
    }

    async fn task_id_by_description(state: &SharedState, description: &str) -> Uuid {
        task_board(state)
            .await
            .unwrap()
            .tasks
            .into_iter()
            .find(|task| task.description == description)
            .map(|task| task.id)
            .expect("task is seeded from the default catalog")
    }

    #[tokio::test]
    async fn hidden_key_submission_flows_through_the_queue() {
        let s = scenario().await;
        let task_id = task_id_by_description(&s.player, "Find the hidden key").await;

        let view = toggle_complete(&s.player, task_id).await.unwrap();
        assert_eq!(view.status, TaskStatus::Completed);

        let pending = pending_submissions(&s.admin).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].player_name, "ada");
        assert_eq!(pending[0].task_description, "Find the hidden key");

        approve(&s.admin, pending[0].progress_id).await.unwrap();

        assert!(pending_submissions(&s.admin).await.unwrap().is_empty());
        let stats = game_stats(&s.admin).await.unwrap();
        assert_eq!(stats.tasks_completed, 1);
        assert_eq!(stats.pending_verifications, 0);
        assert_eq!(stats.total_tasks, 5);
        assert_eq!(stats.total_players, 1);

        let session = s.player.session().await.unwrap();
        let players = s.store.players_by_game(session.game_id).await.unwrap();
        let ada = players.iter().find(|p| p.id == session.player_id).unwrap();
        assert_eq!(ada.tasks_completed, 1);

        let board = task_board(&s.player).await.unwrap();
        let view = board.tasks.iter().find(|t| t.id == task_id).unwrap();
        assert_eq!(view.status, TaskStatus::Verified);
    }

    #[tokio::test]
    async fn approve_is_idempotent() {
        let s = scenario().await;
        let task_id = task_id_by_description(&s.player, "Find the hidden key").await;
        toggle_complete(&s.player, task_id).await.unwrap();

        let pending = pending_submissions(&s.admin).await.unwrap();
        let progress_id = pending[0].progress_id;
        approve(&s.admin, progress_id).await.unwrap();
        approve(&s.admin, progress_id).await.unwrap();

        let stats = game_stats(&s.admin).await.unwrap();
        assert_eq!(stats.tasks_completed, 1);

        let session = s.player.session().await.unwrap();
        let players = s.store.players_by_game(session.game_id).await.unwrap();
        let ada = players.iter().find(|p| p.id == session.player_id).unwrap();
        assert_eq!(ada.tasks_completed, 1);
    }

    #[tokio::test]
    async fn reject_returns_the_claim_to_pending() {
        let s = scenario().await;
        let task_id = task_id_by_description(&s.player, "Count the sundial markings").await;
        toggle_complete(&s.player, task_id).await.unwrap();

        let pending = pending_submissions(&s.admin).await.unwrap();
        reject(&s.admin, pending[0].progress_id).await.unwrap();

        assert!(pending_submissions(&s.admin).await.unwrap().is_empty());
        let stats = game_stats(&s.admin).await.unwrap();
        assert_eq!(stats.tasks_completed, 0);

        let board = task_board(&s.player).await.unwrap();
        let view = board.tasks.iter().find(|t| t.id == task_id).unwrap();
        assert_eq!(view.status, TaskStatus::Pending);

        // Still one row for the pair: the player can claim again.
        let view = toggle_complete(&s.player, task_id).await.unwrap();
        assert_eq!(view.status, TaskStatus::Completed);
        let session = s.player.session().await.unwrap();
        let rows = s.store.progress_by_game(session.game_id).await.unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn verified_claims_are_terminal() {
        let s = scenario().await;
        let task_id = task_id_by_description(&s.player, "Find the hidden key").await;
        toggle_complete(&s.player, task_id).await.unwrap();
        let pending = pending_submissions(&s.admin).await.unwrap();
        approve(&s.admin, pending[0].progress_id).await.unwrap();

        let err = toggle_complete(&s.player, task_id).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
        let err = reject(&s.admin, pending[0].progress_id).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
    }

    #[tokio::test]
    async fn completions_are_frozen_once_the_game_ends() {
        let s = scenario().await;
        let task_id = task_id_by_description(&s.player, "Find the hidden key").await;
        let code = s.admin.session().await.unwrap().game_code;
        game_service::end_game(&s.admin, &code).await.unwrap();

        let err = toggle_complete(&s.player, task_id).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
    }

    #[tokio::test]
    async fn players_cannot_run_admin_verification() {
        let s = scenario().await;
        let task_id = task_id_by_description(&s.player, "Find the hidden key").await;
        toggle_complete(&s.player, task_id).await.unwrap();

        let err = pending_submissions(&s.player).await.unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(_)));
        let err = approve(&s.player, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn watch_stream_re_derives_on_progress_events() {
        let s = scenario().await;
        let task_id = task_id_by_description(&s.player, "Find the hidden key").await;

        let stream = watch_task_board(s.player.clone());
        tokio::pin!(stream);

        let initial = stream.next().await.unwrap().unwrap();
        let view = initial.tasks.iter().find(|t| t.id == task_id).unwrap();
        assert_eq!(view.status, TaskStatus::Pending);

        toggle_complete(&s.player, task_id).await.unwrap();

        let updated = tokio::time::timeout(Duration::from_secs(1), stream.next())
            .await
            .expect("snapshot within the timeout")
            .unwrap()
            .unwrap();
        let view = updated.tasks.iter().find(|t| t.id == task_id).unwrap();
        assert_eq!(view.status, TaskStatus::Completed);
    }

    #[test]
    fn stats_are_a_pure_function_of_rows() {
        let game_id = Uuid::new_v4();
        let mk_player = |role: Role, status: PlayerStatus| PlayerEntity {
            id: Uuid::new_v4(),
            game_id,
            name: "p".into(),
            role,
            tasks_completed: 0,
            status,
            created_at: SystemTime::now(),
        };
        let players = vec![
            mk_player(Role::Administrator, PlayerStatus::Active),
            mk_player(Role::Crewmate, PlayerStatus::Active),
            mk_player(Role::Imposter, PlayerStatus::Active),
            mk_player(Role::Crewmate, PlayerStatus::Inactive),
        ];
        let mk_task = || TaskEntity {
            id: Uuid::new_v4(),
            game_id,
            description: "t".into(),
            location: None,
            points: 10,
            verified: false,
        };
        let tasks = vec![mk_task(), mk_task(), mk_task()];
        let mk_progress = |completed: bool, verified: bool| TaskProgressEntity {
            id: Uuid::new_v4(),
            game_id,
            player_id: players[1].id,
            task_id: tasks[0].id,
            completed,
            verified,
            submitted_at: SystemTime::now(),
        };
        let progress = vec![
            mk_progress(true, true),
            mk_progress(true, false),
            mk_progress(false, false),
        ];

        let stats = compute_stats(&players, &tasks, &progress);
        assert_eq!(
            stats,
            GameStats {
                total_players: 2,
                tasks_completed: 1,
                total_tasks: 3,
                pending_verifications: 1,
            }
        );
    }
}
