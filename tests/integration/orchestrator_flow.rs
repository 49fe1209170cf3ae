use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use serde_json::{json, Value as JsonValue};
use study_planner_lib::error::{AppError, AppResult, GeneratorErrorCode};
use study_planner_lib::models::goal::Goal;
use study_planner_lib::models::insights::{EnergySample, ProductivitySnapshot};
use study_planner_lib::models::schedule::{BreakKind, GenerationTier, ScheduleEntry};
use study_planner_lib::models::settings::SchedulerConfig;
use study_planner_lib::models::task::{Task, TaskPriority};
use study_planner_lib::services::generator::ScheduleGenerator;
use study_planner_lib::services::orchestrator::{GenerationContext, GenerationOrchestrator};
use study_planner_lib::services::schedule_assembler::EnergyProfile;

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 17).expect("valid date")
}

fn hm(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).expect("valid time")
}

/// Generator double that replays a fixed response and counts calls.
struct ScriptedGenerator {
    response: AppResult<JsonValue>,
    calls: AtomicUsize,
}

impl ScriptedGenerator {
    fn ok(value: JsonValue) -> Arc<Self> {
        Arc::new(Self {
            response: Ok(value),
            calls: AtomicUsize::new(0),
        })
    }

    fn failing(code: GeneratorErrorCode) -> Arc<Self> {
        Arc::new(Self {
            response: Err(AppError::generator(code, "scripted failure")),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn replay(&self) -> AppResult<JsonValue> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.response {
            Ok(value) => Ok(value.clone()),
            Err(error) => Err(AppError::generator(
                error.generator_code().unwrap_or(GeneratorErrorCode::Unknown),
                error.to_string(),
            )),
        }
    }
}

#[async_trait]
impl ScheduleGenerator for ScriptedGenerator {
    async fn plan_day(&self, _payload: &JsonValue) -> AppResult<JsonValue> {
        self.replay()
    }

    async fn distribute(&self, _payload: &JsonValue) -> AppResult<JsonValue> {
        self.replay()
    }
}

struct HangingGenerator;

#[async_trait]
impl ScheduleGenerator for HangingGenerator {
    async fn plan_day(&self, _payload: &JsonValue) -> AppResult<JsonValue> {
        tokio::time::sleep(StdDuration::from_secs(3600)).await;
        Ok(json!({"schedule": []}))
    }

    async fn distribute(&self, _payload: &JsonValue) -> AppResult<JsonValue> {
        tokio::time::sleep(StdDuration::from_secs(3600)).await;
        Ok(json!([]))
    }
}

fn study_tasks() -> Vec<Task> {
    vec![
        Task::new("calc", "Calculus problem set")
            .with_priority(TaskPriority::High)
            .with_category("assignment")
            .with_due_date(date()),
        Task::new("read", "Read chapter 5").with_category("reading"),
        Task::new("vocab", "Vocabulary review")
            .with_priority(TaskPriority::Low)
            .with_category("review"),
    ]
}

#[tokio::test]
async fn no_generator_uses_advanced_tier() -> AppResult<()> {
    let orchestrator = GenerationOrchestrator::new(SchedulerConfig::default())?;
    assert!(!orchestrator.has_generator());

    let outcome = orchestrator.generate(date(), &study_tasks()).await;
    assert_eq!(outcome.tier(), GenerationTier::Advanced);

    let schedule = outcome.schedule();
    assert!(!schedule.generated_by_ai);
    let order: Vec<_> = schedule.items().map(|item| item.task_id.as_str()).collect();
    assert_eq!(order[0], "calc");
    assert_eq!(schedule.items().next().map(|item| item.start.time()), Some(hm(9, 0)));
    Ok(())
}

#[tokio::test]
async fn failing_generator_falls_back_without_error() -> AppResult<()> {
    for code in [
        GeneratorErrorCode::Unavailable,
        GeneratorErrorCode::RateLimited,
        GeneratorErrorCode::InvalidResponse,
    ] {
        let generator = ScriptedGenerator::failing(code);
        let orchestrator = GenerationOrchestrator::new(SchedulerConfig::default())?
            .with_generator(generator.clone());

        let outcome = orchestrator.generate(date(), &study_tasks()).await;
        assert_eq!(outcome.tier(), GenerationTier::Advanced);
        assert_eq!(outcome.schedule().item_count(), 3);
        assert_eq!(generator.calls(), 1);
    }
    Ok(())
}

#[tokio::test]
async fn malformed_responses_fall_back() -> AppResult<()> {
    let malformed = [
        json!({"plan": []}),
        json!({"schedule": [{"task_id": "ghost", "scheduled_time": "09:00", "duration": 30}]}),
        json!({"schedule": [{"task_id": "calc", "scheduled_time": "nine", "duration": 30}]}),
        json!({"schedule": [
            {"task_id": "calc", "scheduled_time": "09:00", "duration": 60},
            {"task_id": "read", "scheduled_time": "09:45", "duration": 30}
        ]}),
    ];

    for response in malformed {
        let orchestrator = GenerationOrchestrator::new(SchedulerConfig::default())?
            .with_generator(ScriptedGenerator::ok(response.clone()));
        let outcome = orchestrator.generate(date(), &study_tasks()).await;
        assert_eq!(
            outcome.tier(),
            GenerationTier::Advanced,
            "response should be rejected: {response}"
        );
    }
    Ok(())
}

#[tokio::test]
async fn valid_response_is_accepted_and_clamped() -> AppResult<()> {
    let generator = ScriptedGenerator::ok(json!({
        "schedule": [
            {"task_id": "read", "scheduled_time": "14:00", "duration": 150, "reason": "Afternoon reading"},
            {"task_id": "calc", "scheduled_time": "09:00", "duration": 10, "reason": "Urgent first"}
        ],
        "total_study_time": 160,
        "insights": ["Tackle the urgent set first", "Read after lunch"]
    }));
    let orchestrator =
        GenerationOrchestrator::new(SchedulerConfig::default())?.with_generator(generator);

    let outcome = orchestrator.generate(date(), &study_tasks()).await;
    assert_eq!(outcome.tier(), GenerationTier::External);

    let schedule = outcome.schedule();
    assert!(schedule.generated_by_ai);
    let items: Vec<_> = schedule.items().collect();
    assert_eq!(items[0].task_id, "calc");
    assert_eq!(items[0].duration_minutes, 15);
    assert_eq!(items[1].duration_minutes, 90);
    assert_eq!(schedule.total_study_time, 105);
    assert_eq!(schedule.unplaced.len(), 1);
    assert_eq!(schedule.unplaced[0].task_id, "vocab");
    assert_eq!(schedule.insights.len(), 2);
    Ok(())
}

#[tokio::test]
async fn hanging_generator_times_out_into_fallback() -> AppResult<()> {
    let mut config = SchedulerConfig::default();
    config.generator.timeout_secs = 1;
    let orchestrator =
        GenerationOrchestrator::new(config)?.with_generator(Arc::new(HangingGenerator));

    let outcome = orchestrator.generate(date(), &study_tasks()).await;
    assert_eq!(outcome.tier(), GenerationTier::Advanced);
    Ok(())
}

#[tokio::test]
async fn invalid_estimate_drops_to_basic_tier() -> AppResult<()> {
    let orchestrator = GenerationOrchestrator::new(SchedulerConfig::default())?
        .with_generator(ScriptedGenerator::failing(GeneratorErrorCode::Unavailable));
    let tasks = vec![
        Task::new("broken", "Bad estimate").with_estimate(0),
        Task::new("ok", "Fine").with_estimate(40),
    ];

    let outcome = orchestrator.generate(date(), &tasks).await;
    assert_eq!(outcome.tier(), GenerationTier::Basic);

    let schedule = outcome.schedule();
    let items: Vec<_> = schedule.items().collect();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].start.time(), hm(9, 0));
    assert_eq!(items[0].duration_minutes, 25);
    assert_eq!(items[1].start.time(), hm(14, 0));
    assert_eq!(items[1].duration_minutes, 40);
    assert_eq!(schedule.breaks().count(), 0);
    Ok(())
}

#[tokio::test]
async fn empty_task_list_skips_generator() -> AppResult<()> {
    let generator = ScriptedGenerator::failing(GeneratorErrorCode::Unavailable);
    let orchestrator =
        GenerationOrchestrator::new(SchedulerConfig::default())?.with_generator(generator.clone());

    let schedule = orchestrator.generate(date(), &[]).await.into_schedule();
    assert_eq!(schedule.total_study_time, 0);
    assert!(schedule.entries.is_empty());
    assert_eq!(generator.calls(), 0);
    Ok(())
}

#[tokio::test]
async fn priority_scenario_places_short_break_between_tasks() -> AppResult<()> {
    // Larger study blocks so both tasks and the break fit in the first one.
    let mut config = SchedulerConfig::default();
    config.day_window.start = hm(7, 0);
    config.day_window.end = hm(22, 0);
    config.day_structure.study_block_minutes = 120;

    let tasks = vec![
        Task::new("2", "Low priority reading")
            .with_priority(TaskPriority::Low)
            .with_estimate(30)
            .with_due_date(date() + chrono::Duration::days(10)),
        Task::new("1", "High priority essay")
            .with_priority(TaskPriority::High)
            .with_estimate(60)
            .with_due_date(date()),
    ];

    let schedule = study_planner_lib::generate(date(), &tasks, &config).await?;
    assert_eq!(schedule.tier, GenerationTier::Advanced);

    match schedule.entries.as_slice() {
        [ScheduleEntry::Task(first), ScheduleEntry::Break(rest), ScheduleEntry::Task(second)] => {
            assert_eq!(first.task_id, "1");
            assert_eq!(first.start.time(), hm(8, 0));
            assert_eq!(first.duration_minutes, 70);
            assert_eq!(rest.kind, BreakKind::Short);
            assert_eq!(rest.start, first.end());
            assert_eq!(second.task_id, "2");
            assert_eq!(second.start, rest.end());
            assert_eq!(second.duration_minutes, 25);
        }
        other => panic!("unexpected entries: {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn context_feeds_insights() -> AppResult<()> {
    let context = GenerationContext {
        goals: vec![Goal::new("g-1", "Pass calculus").with_category("assignment work")],
        energy_profile: EnergyProfile::from_samples(&[EnergySample {
            hour: 9,
            energy_level: 2.0,
            focus_score: 0.2,
            tasks_completed: 0,
        }]),
        productivity: vec![ProductivitySnapshot {
            date: date() - chrono::Duration::days(1),
            hours_studied: 1.0,
            productivity_score: 40.0,
            burnout_risk: 10.0,
        }],
        ..GenerationContext::default()
    };
    let orchestrator = GenerationOrchestrator::new(SchedulerConfig::default())?.with_context(context);

    let tasks = study_tasks();
    let schedule = orchestrator.generate(date(), &tasks).await.into_schedule();
    let insights = orchestrator.insights(&schedule, &tasks);

    assert_eq!(insights.goal_alignment.goals_count, 1);
    assert!(insights.goal_alignment.aligned_minutes > 0);
    assert!(insights
        .conflicts
        .iter()
        .any(|conflict| conflict.related_task_id.as_deref() == Some("calc")));

    let productivity = orchestrator.productivity_insights();
    assert_eq!(productivity.average_daily_study_hours, Some(1.0));
    assert_eq!(productivity.recommendations.len(), 2);
    Ok(())
}
