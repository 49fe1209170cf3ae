use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use serde_json::{json, Value as JsonValue};
use study_planner_lib::error::{AppError, AppResult, GeneratorErrorCode};
use study_planner_lib::models::settings::SchedulerConfig;
use study_planner_lib::models::task::Task;
use study_planner_lib::services::generator::ScheduleGenerator;
use study_planner_lib::services::orchestrator::GenerationOrchestrator;

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 4, 14).expect("valid date")
}

fn ten_tasks() -> Vec<Task> {
    (0..10)
        .map(|idx| Task::new(format!("task-{idx:02}"), format!("Task {idx}")).with_estimate(25))
        .collect()
}

fn ids_per_day(schedules: &[study_planner_lib::models::schedule::Schedule]) -> Vec<Vec<String>> {
    schedules
        .iter()
        .map(|schedule| {
            let mut ids: Vec<String> = schedule
                .items()
                .map(|item| item.task_id.clone())
                .chain(schedule.unplaced.iter().map(|task| task.task_id.clone()))
                .collect();
            ids.sort();
            ids
        })
        .collect()
}

/// Distributes with a fixed partition and refuses to plan days.
struct PartitionOnly {
    partition: JsonValue,
}

#[async_trait]
impl ScheduleGenerator for PartitionOnly {
    async fn plan_day(&self, _payload: &JsonValue) -> AppResult<JsonValue> {
        Err(AppError::generator(
            GeneratorErrorCode::Unavailable,
            "day planning disabled",
        ))
    }

    async fn distribute(&self, _payload: &JsonValue) -> AppResult<JsonValue> {
        Ok(self.partition.clone())
    }
}

#[tokio::test]
async fn ten_tasks_over_three_days_round_robin() -> AppResult<()> {
    let schedules =
        study_planner_lib::generate_multi_day(start(), 3, &ten_tasks(), &SchedulerConfig::default())
            .await?;

    assert_eq!(schedules.len(), 3);
    for (offset, schedule) in schedules.iter().enumerate() {
        assert_eq!(schedule.date, start() + Duration::days(offset as i64));
    }

    let days = ids_per_day(&schedules);
    assert_eq!(
        days[0],
        vec!["task-00", "task-03", "task-06", "task-09"]
    );
    assert_eq!(days[1], vec!["task-01", "task-04", "task-07"]);
    assert_eq!(days[2], vec!["task-02", "task-05", "task-08"]);

    let all: HashSet<String> = days.into_iter().flatten().collect();
    assert_eq!(all.len(), 10);
    Ok(())
}

#[tokio::test]
async fn more_days_than_tasks_yields_empty_days() -> AppResult<()> {
    let tasks: Vec<Task> = ten_tasks().into_iter().take(2).collect();
    let orchestrator = GenerationOrchestrator::new(SchedulerConfig::default())?;
    let schedules = orchestrator.generate_multi_day(start(), 4, &tasks).await?;

    assert_eq!(schedules.len(), 4);
    assert_eq!(schedules[0].item_count(), 1);
    assert_eq!(schedules[1].item_count(), 1);
    assert!(schedules[2].is_empty());
    assert!(schedules[3].is_empty());
    assert_eq!(schedules[3].total_study_time, 0);
    Ok(())
}

#[tokio::test]
async fn generator_partition_is_used_when_valid() -> AppResult<()> {
    let generator = Arc::new(PartitionOnly {
        partition: json!({"days": [[9, 8, 7], [0, 1, 2, 3], [4, 5]]}),
    });
    let orchestrator =
        GenerationOrchestrator::new(SchedulerConfig::default())?.with_generator(generator);
    let schedules = orchestrator.generate_multi_day(start(), 3, &ten_tasks()).await?;

    let days = ids_per_day(&schedules);
    // task-06 is missing from the partition and is appended to day 6 % 3.
    assert_eq!(days[0], vec!["task-06", "task-07", "task-08", "task-09"]);
    assert_eq!(days[1], vec!["task-00", "task-01", "task-02", "task-03"]);
    assert_eq!(days[2], vec!["task-04", "task-05"]);
    Ok(())
}

#[tokio::test]
async fn invalid_partition_falls_back_to_round_robin() -> AppResult<()> {
    for partition in [
        json!([[0, 1], [1]]),
        json!([[42]]),
        json!([[0], [1], [2], [3]]),
        json!({"plan": "none"}),
    ] {
        let generator = Arc::new(PartitionOnly {
            partition: partition.clone(),
        });
        let orchestrator =
            GenerationOrchestrator::new(SchedulerConfig::default())?.with_generator(generator);
        let schedules = orchestrator.generate_multi_day(start(), 3, &ten_tasks()).await?;

        let days = ids_per_day(&schedules);
        assert_eq!(
            days[1],
            vec!["task-01", "task-04", "task-07"],
            "partition should be rejected: {partition}"
        );
    }
    Ok(())
}

#[tokio::test]
async fn zero_days_is_invalid_input() {
    let error = study_planner_lib::generate_multi_day(
        start(),
        0,
        &ten_tasks(),
        &SchedulerConfig::default(),
    )
    .await
    .expect_err("zero days must fail");
    assert!(error.is_validation());
}
