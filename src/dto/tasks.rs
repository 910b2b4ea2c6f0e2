use serde::Serialize;
use serde_with::skip_serializing_none;
use uuid::Uuid;

use crate::{
    dao::models::{TaskEntity, TaskProgressEntity},
    dto::format_system_time,
};

/// Per-(player, task) verification state surfaced to the presentation layer.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// No completion claim yet, or the claim was rejected.
    Pending,
    /// Player claims completion; awaiting administrator verification.
    Completed,
    /// Administrator verified the claim. Terminal.
    Verified,
}

impl TaskStatus {
    /// Derive the status from the player's progress row, if any.
    pub fn derive(progress: Option<&TaskProgressEntity>) -> Self {
        match progress {
            Some(row) if row.verified => TaskStatus::Verified,
            Some(row) if row.completed => TaskStatus::Completed,
            _ => TaskStatus::Pending,
        }
    }
}

/// One task as seen by a specific player.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize)]
pub struct TaskView {
    /// Primary key of the task.
    pub id: Uuid,
    /// What the player has to do.
    pub description: String,
    /// Campus location label, when one is specified.
    pub location: Option<String>,
    /// Points awarded on verification.
    pub points: u32,
    /// The viewing player's status for this task.
    pub status: TaskStatus,
}

impl TaskView {
    /// Build the view for one player from the task row and their progress.
    pub fn build(task: TaskEntity, progress: Option<&TaskProgressEntity>) -> Self {
        Self {
            id: task.id,
            description: task.description,
            location: task.location,
            points: task.points,
            status: TaskStatus::derive(progress),
        }
    }
}

/// Aggregate statistics recomputed from current rows after every mutation.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct GameStats {
    /// Active non-administrator players.
    pub total_players: u32,
    /// Verified submissions across all players.
    pub tasks_completed: u32,
    /// Seeded tasks in the game.
    pub total_tasks: u32,
    /// Submissions with `completed = true` and `verified = false`.
    pub pending_verifications: u32,
}

/// A player's task list plus the game's aggregate statistics.
#[derive(Debug, Serialize)]
pub struct TaskBoard {
    /// Tasks in seeded order with per-task status.
    pub tasks: Vec<TaskView>,
    /// Derived statistics for the whole game.
    pub stats: GameStats,
}

/// Entry in the administrator's pending-verification queue.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize)]
pub struct PendingSubmission {
    /// Primary key of the progress row; target of approve/reject.
    pub progress_id: Uuid,
    /// Submitting player.
    pub player_id: Uuid,
    /// Display name of the submitting player.
    pub player_name: String,
    /// Claimed task.
    pub task_id: Uuid,
    /// Description of the claimed task.
    pub task_description: String,
    /// Campus location label of the claimed task.
    pub location: Option<String>,
    /// RFC 3339 timestamp of the claim.
    pub submitted_at: String,
}

impl PendingSubmission {
    /// Assemble a queue entry from its source rows.
    pub fn build(progress: &TaskProgressEntity, player_name: &str, task: &TaskEntity) -> Self {
        Self {
            progress_id: progress.id,
            player_id: progress.player_id,
            player_name: player_name.to_string(),
            task_id: task.id,
            task_description: task.description.clone(),
            location: task.location.clone(),
            submitted_at: format_system_time(progress.submitted_at),
        }
    }
}
