//! Game session lifecycle: create with a collision-checked code, code-based
//! join with atomic capacity enforcement, idempotent end, and the public list.

use std::time::SystemTime;

use rand::Rng;
use tracing::{debug, info};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::{
        game_store::{GamePatch, JoinOutcome},
        models::{GameEntity, GameStatus, PlayerEntity, PlayerStatus, Role, TaskEntity},
    },
    dto::{
        game::{CreateGameRequest, EndGameResponse, GameListItem, GameSummary, JoinedPlayer,
               JoinGameRequest},
        validation::{CODE_ALPHABET, CODE_LENGTH},
    },
    error::ServiceError,
    services::roles,
    state::{SessionContext, SharedState},
};

/// Display name stored on the administrator's player row.
const ADMIN_NAME: &str = "Administrator";

/// Bootstrap a fresh game and install the caller as its administrator.
pub async fn create_game(
    state: &SharedState,
    request: CreateGameRequest,
) -> Result<GameSummary, ServiceError> {
    request.validate()?;
    let store = state.require_game_store().await?;

    let Some(max_players) = request.innocents.checked_add(request.imposters) else {
        return Err(ServiceError::InvalidInput(
            "innocents plus imposters exceeds the supported capacity".into(),
        ));
    };
    let admin_id = Uuid::new_v4();

    // Collision-checked code generation: the store rejects a code already
    // held by a live game, so two creators can never share one.
    let mut attempts = 0;
    let game = loop {
        attempts += 1;
        let code = generate_code();
        let now = SystemTime::now();
        let candidate = GameEntity {
            id: Uuid::new_v4(),
            code,
            max_players,
            current_players: 0,
            imposter_count: request.imposters,
            task_count: request.tasks,
            status: GameStatus::InProgress,
            created_at: now,
            updated_at: now,
            admin_id,
        };
        match state.gateway(store.insert_game(candidate.clone())).await {
            Ok(()) => break candidate,
            Err(ServiceError::Conflict(message)) if attempts < state.config().code_attempts => {
                debug!(attempts, %message, "game code collision; drawing a new code");
            }
            Err(err) => return Err(err),
        }
    };

    let tasks = seed_tasks(state, &game);
    state.gateway(store.insert_tasks(tasks)).await?;

    let admin = PlayerEntity {
        id: admin_id,
        game_id: game.id,
        name: ADMIN_NAME.to_string(),
        role: Role::Administrator,
        tasks_completed: 0,
        status: PlayerStatus::Active,
        created_at: game.created_at,
    };
    state.gateway(store.insert_player(admin)).await?;

    state
        .install_session(SessionContext {
            game_id: game.id,
            game_code: game.code.clone(),
            player_id: admin_id,
            name: ADMIN_NAME.to_string(),
            role: Role::Administrator,
        })
        .await;

    info!(code = %game.code, max_players, "created game");
    Ok(game.into())
}

/// Join a game by code; the capacity check, role draw, player insert, and
/// counter increment happen as one atomic store operation.
pub async fn join_game(
    state: &SharedState,
    request: JoinGameRequest,
) -> Result<JoinedPlayer, ServiceError> {
    request.validate()?;
    let store = state.require_game_store().await?;

    let outcome = state
        .gateway(store.join_game(
            request.code.clone(),
            request.name.trim().to_string(),
            roles::default_assigner(),
        ))
        .await?;

    match outcome {
        JoinOutcome::Joined { game, player } => {
            state
                .install_session(SessionContext {
                    game_id: game.id,
                    game_code: game.code.clone(),
                    player_id: player.id,
                    name: player.name.clone(),
                    role: player.role,
                })
                .await;
            info!(code = %game.code, player = %player.name, "player joined");
            Ok(JoinedPlayer {
                game_code: game.code,
                player_id: player.id,
                name: player.name,
                role: player.role,
            })
        }
        JoinOutcome::Full { code } => {
            Err(ServiceError::GameFull(format!("game `{code}` is full")))
        }
        // An ended game is as unjoinable as a missing one.
        JoinOutcome::Ended { code } | JoinOutcome::NotFound { code } => {
            Err(ServiceError::NotFound(format!("game `{code}` not found")))
        }
    }
}

/// End a game by code. Idempotent: a repeated call reports the game as
/// already ended instead of failing.
///
/// Crate-internal: external callers go through the admin console, which
/// verifies the session holds the administrator seat first.
pub(crate) async fn end_game(
    state: &SharedState,
    code: &str,
) -> Result<EndGameResponse, ServiceError> {
    let store = state.require_game_store().await?;

    let Some(game) = state.gateway(store.find_game_by_code(code.to_string())).await? else {
        return Err(ServiceError::NotFound(format!("game `{code}` not found")));
    };

    if game.status == GameStatus::Ended {
        info!(%code, "end requested for an already-ended game");
        return Ok(EndGameResponse {
            code: code.to_string(),
            already_ended: true,
        });
    }

    state
        .gateway(store.update_game(
            code.to_string(),
            GamePatch {
                status: Some(GameStatus::Ended),
            },
        ))
        .await?;

    info!(%code, "game ended");
    Ok(EndGameResponse {
        code: code.to_string(),
        already_ended: false,
    })
}

/// Games currently open for joining.
pub async fn list_open_games(state: &SharedState) -> Result<Vec<GameListItem>, ServiceError> {
    let store = state.require_game_store().await?;
    let games = state.gateway(store.list_games(GameStatus::InProgress)).await?;
    Ok(games.into_iter().map(Into::into).collect())
}

fn seed_tasks(state: &SharedState, game: &GameEntity) -> Vec<TaskEntity> {
    state
        .config()
        .seed_tasks(game.task_count)
        .into_iter()
        .map(|seed| TaskEntity {
            id: Uuid::new_v4(),
            game_id: game.id,
            description: seed.description,
            location: Some(seed.location),
            points: seed.points,
            verified: false,
        })
        .collect()
}

fn generate_code() -> String {
    let mut rng = rand::rng();
    (0..CODE_LENGTH)
        .map(|_| CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::{
        config::AppConfig,
        dao::{game_store::GameStore, memory::MemoryStore},
        dto::validation::validate_game_code,
        state::AppState,
    };

    fn shared_store() -> Arc<dyn GameStore> {
        Arc::new(MemoryStore::new())
    }

    fn state_on(store: &Arc<dyn GameStore>) -> SharedState {
        AppState::with_store(AppConfig::default(), store.clone())
    }

    fn request(innocents: u32, imposters: u32, tasks: u32) -> CreateGameRequest {
        CreateGameRequest {
            innocents,
            imposters,
            tasks,
        }
    }

    #[tokio::test]
    async fn create_game_seeds_a_fresh_session() {
        let store = shared_store();
        let state = state_on(&store);
        let game = create_game(&state, request(3, 1, 5)).await.unwrap();

        assert_eq!(game.current_players, 0);
        assert_eq!(game.max_players, 4);
        assert_eq!(game.imposter_count, 1);
        assert_eq!(game.task_count, 5);
        assert_eq!(game.status, GameStatus::InProgress);
        assert!(validate_game_code(&game.code).is_ok());

        let session = state.session().await.unwrap();
        assert_eq!(session.role, Role::Administrator);
        assert_eq!(session.game_code, game.code);

        let tasks = store
            .tasks_by_game(session.game_id)
            .await
            .unwrap();
        assert_eq!(tasks.len(), 5);
    }

    #[tokio::test]
    async fn create_game_rejects_non_positive_counts() {
        let state = state_on(&shared_store());
        let err = create_game(&state, request(0, 1, 5)).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
        let err = create_game(&state, request(3, 1, 0)).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn create_game_rejects_overflowing_counts() {
        let state = state_on(&shared_store());
        let err = create_game(&state, request(u32::MAX, 2, 5)).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn fifth_join_fails_with_capacity_error() {
        let store = shared_store();
        let admin = state_on(&store);
        let game = create_game(&admin, request(3, 1, 5)).await.unwrap();

        for i in 0..4 {
            let device = state_on(&store);
            let joined = join_game(
                &device,
                JoinGameRequest {
                    code: game.code.clone(),
                    name: format!("player-{i}"),
                },
            )
            .await
            .unwrap();
            assert_ne!(joined.role, Role::Administrator);
        }

        let device = state_on(&store);
        let err = join_game(
            &device,
            JoinGameRequest {
                code: game.code.clone(),
                name: "latecomer".into(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::GameFull(_)));
        // The failed join must not have touched the session slot.
        assert!(device.session().await.is_none());
    }

    #[tokio::test]
    async fn realized_imposters_match_the_configured_slots() {
        let store = shared_store();
        let admin = state_on(&store);
        let game = create_game(&admin, request(3, 1, 2)).await.unwrap();
        let game_id = admin.session().await.unwrap().game_id;

        for i in 0..4 {
            let device = state_on(&store);
            join_game(
                &device,
                JoinGameRequest {
                    code: game.code.clone(),
                    name: format!("player-{i}"),
                },
            )
            .await
            .unwrap();
        }

        let players = store.players_by_game(game_id).await.unwrap();
        let imposters = players.iter().filter(|p| p.role == Role::Imposter).count();
        assert_eq!(imposters, 1);
    }

    #[tokio::test]
    async fn concurrent_joins_admit_exactly_the_capacity() {
        let store = shared_store();
        let admin = state_on(&store);
        let game = create_game(&admin, request(3, 1, 1)).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..10 {
            let store = store.clone();
            let code = game.code.clone();
            handles.push(tokio::spawn(async move {
                let device = AppState::with_store(AppConfig::default(), store);
                join_game(
                    &device,
                    JoinGameRequest {
                        code,
                        name: format!("racer-{i}"),
                    },
                )
                .await
            }));
        }

        let mut joined = 0;
        let mut full = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => joined += 1,
                Err(ServiceError::GameFull(_)) => full += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert_eq!(joined, 4);
        assert_eq!(full, 6);

        let stored = store
            .find_game_by_code(game.code.clone())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.current_players, stored.max_players);
    }

    #[tokio::test]
    async fn join_is_refused_for_unknown_and_ended_codes() {
        let store = shared_store();
        let admin = state_on(&store);
        let game = create_game(&admin, request(2, 1, 1)).await.unwrap();

        let device = state_on(&store);
        let err = join_game(
            &device,
            JoinGameRequest {
                code: "ZZZZ99".into(),
                name: "ada".into(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));

        end_game(&admin, &game.code).await.unwrap();
        let err = join_game(
            &device,
            JoinGameRequest {
                code: game.code.clone(),
                name: "ada".into(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn end_game_is_idempotent() {
        let store = shared_store();
        let admin = state_on(&store);
        let game = create_game(&admin, request(2, 1, 1)).await.unwrap();

        let first = end_game(&admin, &game.code).await.unwrap();
        assert!(!first.already_ended);
        let second = end_game(&admin, &game.code).await.unwrap();
        assert!(second.already_ended);
    }

    #[tokio::test]
    async fn open_game_list_excludes_ended_games() {
        let store = shared_store();
        let admin = state_on(&store);
        let first = create_game(&admin, request(2, 1, 1)).await.unwrap();
        let other_admin = state_on(&store);
        let second = create_game(&other_admin, request(2, 1, 1)).await.unwrap();

        end_game(&admin, &first.code).await.unwrap();
        let open = list_open_games(&other_admin).await.unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].code, second.code);
    }
}
