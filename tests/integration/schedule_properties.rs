use chrono::{Duration, NaiveDate};
use study_planner_lib::error::AppResult;
use study_planner_lib::models::schedule::{BreakKind, Schedule, ScheduleEntry};
use study_planner_lib::models::settings::SchedulerConfig;
use study_planner_lib::models::task::{Task, TaskPriority};
use study_planner_lib::services::day_structure::DailyStructureBuilder;
use study_planner_lib::services::duration_estimator::{estimate, MAX_ESTIMATE_MINUTES, MIN_ESTIMATE_MINUTES};
use study_planner_lib::services::orchestrator::GenerationOrchestrator;
use study_planner_lib::services::schedule_utils;
use study_planner_lib::services::task_prioritizer::{NeutralHistory, TaskPrioritizer};

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 8, 25).expect("valid date")
}

/// A mixed bag of tasks that overflows one day.
fn workload() -> Vec<Task> {
    let categories = ["exam", "assignment", "reading", "practice", "review", "lab"];
    let priorities = [TaskPriority::High, TaskPriority::Medium, TaskPriority::Low];
    (0..18)
        .map(|idx| {
            let mut task = Task::new(format!("w{idx:02}"), format!("Workload {idx}"))
                .with_category(categories[idx % categories.len()])
                .with_priority(priorities[idx % priorities.len()]);
            if idx % 4 == 0 {
                task = task.with_estimate(20 + (idx as i64) * 7);
            }
            if idx % 5 == 0 {
                task = task.with_due_date(date() + Duration::days(idx as i64 % 9));
            }
            task
        })
        .collect()
}

fn assert_no_overlap(schedule: &Schedule) {
    for pair in schedule.entries.windows(2) {
        assert!(
            !schedule_utils::overlaps(pair[0].start(), pair[0].end(), pair[1].start(), pair[1].end()),
            "entries overlap: {:?} / {:?}",
            pair[0],
            pair[1]
        );
    }
}

async fn advanced_schedule(tasks: &[Task]) -> AppResult<Schedule> {
    let orchestrator = GenerationOrchestrator::new(SchedulerConfig::default())?;
    Ok(orchestrator.generate(date(), tasks).await.into_schedule())
}

#[tokio::test]
async fn advanced_schedule_has_no_overlap_and_stays_in_study_blocks() -> AppResult<()> {
    let schedule = advanced_schedule(&workload()).await?;
    assert_no_overlap(&schedule);

    let blocks = DailyStructureBuilder::from_config(&SchedulerConfig::default())?.build(date());
    for item in schedule.items() {
        assert!(
            blocks
                .iter()
                .any(|block| block.is_study() && block.contains(item.start, item.duration_minutes)),
            "item {} escapes its study block",
            item.task_id
        );
    }
    for rest in schedule.breaks() {
        assert!(blocks
            .iter()
            .any(|block| block.is_study() && block.contains(rest.start, rest.duration_minutes)));
    }

    let placed = schedule.item_count() + schedule.unplaced.len();
    assert_eq!(placed, workload().len());
    assert!(!schedule.unplaced.is_empty());
    Ok(())
}

#[tokio::test]
async fn total_study_time_matches_items() -> AppResult<()> {
    let schedule = advanced_schedule(&workload()).await?;
    let sum: u32 = schedule.items().map(|item| item.duration_minutes).sum();
    assert_eq!(schedule.total_study_time, sum);
    Ok(())
}

#[tokio::test]
async fn items_follow_priority_order() -> AppResult<()> {
    let tasks = workload();
    let schedule = advanced_schedule(&tasks).await?;
    let history = NeutralHistory;
    let ranked: Vec<String> = TaskPrioritizer::new(date(), &[], &history)
        .prioritize(&tasks)
        .into_iter()
        .map(|entry| entry.task.id)
        .collect();

    let placed: Vec<String> = schedule.items().map(|item| item.task_id.clone()).collect();
    let unplaced: Vec<String> = schedule.unplaced.iter().map(|task| task.task_id.clone()).collect();
    let mut combined = placed;
    combined.extend(unplaced);
    assert_eq!(combined, ranked);
    Ok(())
}

#[tokio::test]
async fn break_cadence_is_strict_modulo() -> AppResult<()> {
    let tasks: Vec<Task> = (0..12)
        .map(|idx| Task::new(format!("p{idx:02}"), "Pomodoro").with_estimate(25))
        .collect();
    let schedule = advanced_schedule(&tasks).await?;

    let config = SchedulerConfig::default();
    let mut sessions = 0u32;
    for entry in &schedule.entries {
        match entry {
            ScheduleEntry::Task(_) => sessions += 1,
            ScheduleEntry::Break(rest) => {
                let expected = if sessions % config.sessions_until_long_break == 0 {
                    BreakKind::Long
                } else {
                    BreakKind::Short
                };
                assert_eq!(rest.kind, expected, "break after session {sessions}");
                let minutes = match rest.kind {
                    BreakKind::Long => config.long_break_minutes,
                    BreakKind::Short => config.short_break_minutes,
                };
                assert_eq!(rest.duration_minutes, minutes);
            }
        }
    }
    assert!(schedule.breaks().any(|rest| rest.kind == BreakKind::Long));
    Ok(())
}

#[tokio::test]
async fn same_input_gives_same_plan() -> AppResult<()> {
    let first = advanced_schedule(&workload()).await?;
    let second = advanced_schedule(&workload()).await?;
    assert_eq!(first.entries, second.entries);
    assert_eq!(first.unplaced, second.unplaced);
    assert_ne!(first.id, second.id);
    Ok(())
}

#[test]
fn estimator_output_is_bounded_and_stepped() -> AppResult<()> {
    for task in workload() {
        let minutes = estimate(&task, 25)?;
        assert!((MIN_ESTIMATE_MINUTES..=MAX_ESTIMATE_MINUTES).contains(&minutes));
        assert_eq!(minutes % 5, 0);
    }
    Ok(())
}

#[tokio::test]
async fn oversized_task_is_capped_not_dropped() -> AppResult<()> {
    let schedule = advanced_schedule(&[Task::new("big", "Capstone").with_estimate(120)]).await?;
    let item = schedule.items().next().expect("task is placed");
    assert_eq!(item.duration_minutes, 90);
    assert!(schedule.unplaced.is_empty());
    Ok(())
}

#[tokio::test]
async fn empty_input_gives_empty_schedule() -> AppResult<()> {
    let schedule = study_planner_lib::generate(date(), &[], &SchedulerConfig::default()).await?;
    assert_eq!(schedule.total_study_time, 0);
    assert!(schedule.is_empty());
    assert_eq!(schedule.date, date());
    Ok(())
}
