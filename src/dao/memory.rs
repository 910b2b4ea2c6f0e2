//! Reference in-memory [`GameStore`] backend.
//!
//! All tables sit behind a single async mutex, so the capacity check, player
//! insert, and counter increment of a join are one atomic unit, as the store
//! contract requires. Used by the test suite and by embedders that want the
//! core without a hosted backend.

use std::sync::Arc;
use std::time::SystemTime;

use futures::future::BoxFuture;
use indexmap::IndexMap;
use tokio::sync::{Mutex, broadcast};
use uuid::Uuid;

use crate::dao::change::{ChangeEvent, ChangeHub, ChangeKind, ChangeTable};
use crate::dao::game_store::{
    GamePatch, GameStore, JoinOutcome, PlayerPatch, RoleAssigner, TaskPatch,
};
use crate::dao::models::{
    GameEntity, GameListItemEntity, GameStatus, PlayerEntity, PlayerStatus, Role, TaskEntity,
    TaskProgressEntity,
};
use crate::dao::storage::{StorageError, StorageResult};

#[derive(Default)]
struct Tables {
    games: IndexMap<Uuid, GameEntity>,
    players: IndexMap<Uuid, PlayerEntity>,
    tasks: IndexMap<Uuid, TaskEntity>,
    progress: IndexMap<Uuid, TaskProgressEntity>,
}

/// In-memory store holding every table behind one lock.
#[derive(Clone)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
    hub: Arc<ChangeHub>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            tables: Arc::new(Mutex::new(Tables::default())),
            hub: Arc::new(ChangeHub::default()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn event(table: ChangeTable, kind: ChangeKind, game_id: Uuid, row_id: Uuid) -> ChangeEvent {
    ChangeEvent {
        table,
        kind,
        game_id,
        row_id,
    }
}

impl GameStore for MemoryStore {
    fn insert_game(&self, game: GameEntity) -> BoxFuture<'static, StorageResult<()>> {
        let tables = self.tables.clone();
        let hub = self.hub.clone();
        Box::pin(async move {
            let mut t = tables.lock().await;
            let duplicate = t
                .games
                .values()
                .any(|g| g.code == game.code && g.status != GameStatus::Ended);
            if duplicate {
                return Err(StorageError::conflict(format!(
                    "game code `{}` already in use",
                    game.code
                )));
            }
            let (game_id, row_id) = (game.id, game.id);
            t.games.insert(game.id, game);
            drop(t);
            hub.publish(event(ChangeTable::Games, ChangeKind::Insert, game_id, row_id));
            Ok(())
        })
    }

    fn find_game_by_code(
        &self,
        code: String,
    ) -> BoxFuture<'static, StorageResult<Option<GameEntity>>> {
        let tables = self.tables.clone();
        Box::pin(async move {
            let t = tables.lock().await;
            // Ended games free their code for reuse; prefer the live holder.
            let live = t
                .games
                .values()
                .find(|g| g.code == code && g.status != GameStatus::Ended);
            Ok(live
                .or_else(|| t.games.values().find(|g| g.code == code))
                .cloned())
        })
    }

    fn list_games(
        &self,
        status: GameStatus,
    ) -> BoxFuture<'static, StorageResult<Vec<GameListItemEntity>>> {
        let tables = self.tables.clone();
        Box::pin(async move {
            let t = tables.lock().await;
            Ok(t.games
                .values()
                .filter(|g| g.status == status)
                .cloned()
                .map(Into::into)
                .collect())
        })
    }

    fn update_game(
        &self,
        code: String,
        patch: GamePatch,
    ) -> BoxFuture<'static, StorageResult<Option<GameEntity>>> {
        let tables = self.tables.clone();
        let hub = self.hub.clone();
        Box::pin(async move {
            let mut t = tables.lock().await;
            let Some(game) = t
                .games
                .values_mut()
                .find(|g| g.code == code && g.status != GameStatus::Ended)
            else {
                return Ok(None);
            };
            if let Some(status) = patch.status {
                game.status = status;
            }
            game.updated_at = SystemTime::now();
            let snapshot = game.clone();
            drop(t);
            hub.publish(event(
                ChangeTable::Games,
                ChangeKind::Update,
                snapshot.id,
                snapshot.id,
            ));
            Ok(Some(snapshot))
        })
    }

    fn join_game(
        &self,
        code: String,
        name: String,
        roles: Arc<dyn RoleAssigner>,
    ) -> BoxFuture<'static, StorageResult<JoinOutcome>> {
        let tables = self.tables.clone();
        let hub = self.hub.clone();
        Box::pin(async move {
            let mut t = tables.lock().await;
            let Some(game) = t
                .games
                .values()
                .find(|g| g.code == code && g.status != GameStatus::Ended)
                .cloned()
            else {
                return Ok(if t.games.values().any(|g| g.code == code) {
                    JoinOutcome::Ended { code }
                } else {
                    JoinOutcome::NotFound { code }
                });
            };
            if game.current_players >= game.max_players {
                return Ok(JoinOutcome::Full { code });
            }

            let joined: Vec<PlayerEntity> = t
                .players
                .values()
                .filter(|p| p.game_id == game.id)
                .cloned()
                .collect();
            let role = roles.assign(&game, &joined);
            debug_assert!(role != Role::Administrator);

            let player = PlayerEntity {
                id: Uuid::new_v4(),
                game_id: game.id,
                name,
                role,
                tasks_completed: 0,
                status: PlayerStatus::Active,
                created_at: SystemTime::now(),
            };
            t.players.insert(player.id, player.clone());

            let game = {
                let slot = t
                    .games
                    .get_mut(&game.id)
                    .ok_or_else(|| StorageError::conflict("game vanished during join"))?;
                slot.current_players += 1;
                slot.updated_at = SystemTime::now();
                slot.clone()
            };
            drop(t);

            hub.publish(event(
                ChangeTable::Players,
                ChangeKind::Insert,
                game.id,
                player.id,
            ));
            hub.publish(event(ChangeTable::Games, ChangeKind::Update, game.id, game.id));
            Ok(JoinOutcome::Joined { game, player })
        })
    }

    fn insert_player(&self, player: PlayerEntity) -> BoxFuture<'static, StorageResult<()>> {
        let tables = self.tables.clone();
        let hub = self.hub.clone();
        Box::pin(async move {
            let mut t = tables.lock().await;
            let (game_id, row_id) = (player.game_id, player.id);
            t.players.insert(player.id, player);
            drop(t);
            hub.publish(event(
                ChangeTable::Players,
                ChangeKind::Insert,
                game_id,
                row_id,
            ));
            Ok(())
        })
    }

    fn players_by_game(
        &self,
        game_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<PlayerEntity>>> {
        let tables = self.tables.clone();
        Box::pin(async move {
            let t = tables.lock().await;
            Ok(t.players
                .values()
                .filter(|p| p.game_id == game_id)
                .cloned()
                .collect())
        })
    }

    fn update_player(
        &self,
        id: Uuid,
        patch: PlayerPatch,
    ) -> BoxFuture<'static, StorageResult<Option<PlayerEntity>>> {
        let tables = self.tables.clone();
        let hub = self.hub.clone();
        Box::pin(async move {
            let mut t = tables.lock().await;
            let Some(player) = t.players.get_mut(&id) else {
                return Ok(None);
            };
            if let Some(tasks_completed) = patch.tasks_completed {
                player.tasks_completed = tasks_completed;
            }
            if let Some(status) = patch.status {
                player.status = status;
            }
            let snapshot = player.clone();
            drop(t);
            hub.publish(event(
                ChangeTable::Players,
                ChangeKind::Update,
                snapshot.game_id,
                snapshot.id,
            ));
            Ok(Some(snapshot))
        })
    }

    fn delete_player(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let tables = self.tables.clone();
        let hub = self.hub.clone();
        Box::pin(async move {
            let mut t = tables.lock().await;
            let Some(player) = t.players.shift_remove(&id) else {
                return Ok(false);
            };
            // The administrator seat never counted against capacity.
            if player.role != Role::Administrator {
                if let Some(game) = t.games.get_mut(&player.game_id) {
                    game.current_players = game.current_players.saturating_sub(1);
                    game.updated_at = SystemTime::now();
                }
            }
            // Progress rows live and die with their player.
            let orphaned: Vec<Uuid> = t
                .progress
                .values()
                .filter(|row| row.player_id == id)
                .map(|row| row.id)
                .collect();
            for row_id in &orphaned {
                t.progress.shift_remove(row_id);
            }
            drop(t);
            hub.publish(event(
                ChangeTable::Players,
                ChangeKind::Delete,
                player.game_id,
                player.id,
            ));
            for row_id in orphaned {
                hub.publish(event(
                    ChangeTable::UserTaskProgress,
                    ChangeKind::Delete,
                    player.game_id,
                    row_id,
                ));
            }
            hub.publish(event(
                ChangeTable::Games,
                ChangeKind::Update,
                player.game_id,
                player.game_id,
            ));
            Ok(true)
        })
    }

    fn insert_tasks(&self, tasks: Vec<TaskEntity>) -> BoxFuture<'static, StorageResult<()>> {
        let tables = self.tables.clone();
        let hub = self.hub.clone();
        Box::pin(async move {
            let mut t = tables.lock().await;
            let inserted: Vec<(Uuid, Uuid)> =
                tasks.iter().map(|task| (task.game_id, task.id)).collect();
            for task in tasks {
                t.tasks.insert(task.id, task);
            }
            drop(t);
            for (game_id, row_id) in inserted {
                hub.publish(event(
                    ChangeTable::GameTasks,
                    ChangeKind::Insert,
                    game_id,
                    row_id,
                ));
            }
            Ok(())
        })
    }

    fn tasks_by_game(&self, game_id: Uuid) -> BoxFuture<'static, StorageResult<Vec<TaskEntity>>> {
        let tables = self.tables.clone();
        Box::pin(async move {
            let t = tables.lock().await;
            Ok(t.tasks
                .values()
                .filter(|task| task.game_id == game_id)
                .cloned()
                .collect())
        })
    }

    fn update_task(
        &self,
        id: Uuid,
        patch: TaskPatch,
    ) -> BoxFuture<'static, StorageResult<Option<TaskEntity>>> {
        let tables = self.tables.clone();
        let hub = self.hub.clone();
        Box::pin(async move {
            let mut t = tables.lock().await;
            let Some(task) = t.tasks.get_mut(&id) else {
                return Ok(None);
            };
            if let Some(verified) = patch.verified {
                task.verified = verified;
            }
            let snapshot = task.clone();
            drop(t);
            hub.publish(event(
                ChangeTable::GameTasks,
                ChangeKind::Update,
                snapshot.game_id,
                snapshot.id,
            ));
            Ok(Some(snapshot))
        })
    }

    fn progress_by_game(
        &self,
        game_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<TaskProgressEntity>>> {
        let tables = self.tables.clone();
        Box::pin(async move {
            let t = tables.lock().await;
            Ok(t.progress
                .values()
                .filter(|row| row.game_id == game_id)
                .cloned()
                .collect())
        })
    }

    fn progress_by_game_and_player(
        &self,
        game_id: Uuid,
        player_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<TaskProgressEntity>>> {
        let tables = self.tables.clone();
        Box::pin(async move {
            let t = tables.lock().await;
            Ok(t.progress
                .values()
                .filter(|row| row.game_id == game_id && row.player_id == player_id)
                .cloned()
                .collect())
        })
    }

    fn find_progress(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<TaskProgressEntity>>> {
        let tables = self.tables.clone();
        Box::pin(async move {
            let t = tables.lock().await;
            Ok(t.progress.get(&id).cloned())
        })
    }

    fn upsert_progress(
        &self,
        row: TaskProgressEntity,
    ) -> BoxFuture<'static, StorageResult<TaskProgressEntity>> {
        let tables = self.tables.clone();
        let hub = self.hub.clone();
        Box::pin(async move {
            let mut t = tables.lock().await;
            let existing = t
                .progress
                .values()
                .find(|p| p.player_id == row.player_id && p.task_id == row.task_id)
                .map(|p| p.id);

            let (stored, kind) = match existing {
                Some(id) => {
                    let slot = t
                        .progress
                        .get_mut(&id)
                        .ok_or_else(|| StorageError::conflict("progress row vanished"))?;
                    slot.completed = row.completed;
                    slot.verified = row.verified;
                    slot.submitted_at = row.submitted_at;
                    (slot.clone(), ChangeKind::Update)
                }
                None => {
                    t.progress.insert(row.id, row.clone());
                    (row, ChangeKind::Insert)
                }
            };
            drop(t);
            hub.publish(event(
                ChangeTable::UserTaskProgress,
                kind,
                stored.game_id,
                stored.id,
            ));
            Ok(stored)
        })
    }

    fn subscribe(&self, table: ChangeTable) -> broadcast::Receiver<ChangeEvent> {
        self.hub.subscribe(table)
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}
