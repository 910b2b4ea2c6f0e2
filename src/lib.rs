//! Headless core for Husky Seeker, a campus social-deduction party game.
//!
//! The crate owns the game/session lifecycle (create, code-based join, end),
//! role assignment, per-player task tracking with administrator verification,
//! and the admin console operations. Presentation layers consume the [`dto`]
//! projections and drive the [`services`] operations; persistence is reached
//! through the [`dao::game_store::GameStore`] trait.

pub mod config;
pub mod dao;
pub mod dto;
pub mod error;
pub mod services;
pub mod state;
