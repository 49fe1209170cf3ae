pub mod error;
pub mod models;
pub mod services;
pub mod utils;

use chrono::NaiveDate;

use crate::error::AppResult;
use crate::models::schedule::Schedule;
use crate::models::settings::SchedulerConfig;
use crate::models::task::Task;
use crate::services::orchestrator::GenerationOrchestrator;

/// Plan a single day. Falls back through the rule-based tiers when the
/// external generator is absent or fails; only configuration errors surface.
pub async fn generate(
    date: NaiveDate,
    tasks: &[Task],
    config: &SchedulerConfig,
) -> AppResult<Schedule> {
    let orchestrator = GenerationOrchestrator::new(config.clone())?;
    Ok(orchestrator.generate(date, tasks).await.into_schedule())
}

/// Plan `days` consecutive days starting at `start_date`, one schedule per day.
pub async fn generate_multi_day(
    start_date: NaiveDate,
    days: u32,
    tasks: &[Task],
    config: &SchedulerConfig,
) -> AppResult<Vec<Schedule>> {
    let orchestrator = GenerationOrchestrator::new(config.clone())?;
    orchestrator.generate_multi_day(start_date, days, tasks).await
}
