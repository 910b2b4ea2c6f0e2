//! Projections exchanged with the external presentation layer.

use std::time::SystemTime;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

/// Admin console requests and responses.
pub mod admin;
/// Game lifecycle requests and summaries.
pub mod game;
/// Task board, statuses, and aggregate statistics.
pub mod tasks;
/// Validation helpers for request DTOs.
pub mod validation;

fn format_system_time(time: SystemTime) -> String {
    OffsetDateTime::from(time)
        .format(&Rfc3339)
        .unwrap_or_else(|_| "invalid-timestamp".into())
}
