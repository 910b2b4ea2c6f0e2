//! Business logic for the game lifecycle, task tracking, and admin console.

/// Admin console operations: roster management, verification, end-game.
pub mod admin_service;
/// Game session lifecycle: create, join, end, list.
pub mod game_service;
/// Role assignment policies.
pub mod roles;
/// Task and verification tracking, derived statistics, change-driven board.
pub mod task_service;
