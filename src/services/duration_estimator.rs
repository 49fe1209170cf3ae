use serde_json::json;
use tracing::trace;

use crate::error::{AppError, AppResult};
use crate::models::task::{Task, TaskPriority};
use crate::services::schedule_utils;

pub const MIN_ESTIMATE_MINUTES: u32 = 15;
pub const MAX_ESTIMATE_MINUTES: u32 = 120;
const ROUNDING_STEP_MINUTES: u32 = 5;

/// Known study categories: (name, base minutes, duration multiplier).
const CATEGORY_TABLE: [(&str, u32, f64); 5] = [
    ("exam", 90, 1.3),
    ("assignment", 60, 1.1),
    ("reading", 45, 0.9),
    ("practice", 30, 1.0),
    ("review", 25, 0.8),
];

fn category_entry(task: &Task) -> Option<(u32, f64)> {
    let category = task.normalized_category()?;
    CATEGORY_TABLE
        .iter()
        .find(|(name, _, _)| *name == category)
        .map(|(_, base, multiplier)| (*base, *multiplier))
}

fn priority_multiplier(priority: TaskPriority) -> f64 {
    match priority {
        TaskPriority::High => 1.2,
        TaskPriority::Medium => 1.0,
        TaskPriority::Low => 0.8,
    }
}

/// Estimated minutes for `task`, clamped to 15..=120 and rounded to a
/// multiple of five.
pub fn estimate(task: &Task, default_minutes: u32) -> AppResult<u32> {
    if default_minutes == 0 {
        return Err(AppError::validation("default duration must be positive"));
    }

    let category = category_entry(task);
    let base = match task.estimated_duration {
        Some(minutes) if minutes <= 0 => {
            return Err(AppError::validation_with_details(
                "estimated duration must be positive",
                json!({"taskId": task.id, "estimatedDuration": minutes}),
            ));
        }
        Some(minutes) => minutes as f64,
        None => category
            .map(|(base, _)| base as f64)
            .unwrap_or(default_minutes as f64),
    };

    let category_multiplier = category.map(|(_, multiplier)| multiplier).unwrap_or(1.0);
    let scaled = base * priority_multiplier(task.priority) * category_multiplier;
    let clamped = scaled.clamp(MIN_ESTIMATE_MINUTES as f64, MAX_ESTIMATE_MINUTES as f64);
    let minutes = schedule_utils::round_to_step(clamped, ROUNDING_STEP_MINUTES);

    trace!(
        target: "app::schedule::estimator",
        task_id = %task.id,
        base,
        minutes,
        "duration estimated"
    );
    Ok(minutes)
}
