use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{Days, NaiveDate, NaiveDateTime};
use futures::future::join_all;
use serde_json::{json, Value as JsonValue};
use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult, GeneratorErrorCode};
use crate::models::goal::Goal;
use crate::models::insights::{ProductivityInsights, ProductivitySnapshot, ScheduleInsights};
use crate::models::schedule::{
    GenerationTier, Schedule, ScheduleEntry, ScheduledItem, UnplacedTask,
};
use crate::models::settings::SchedulerConfig;
use crate::models::task::Task;
use crate::services::day_structure::DailyStructureBuilder;
use crate::services::duration_estimator;
use crate::services::generator::{ChatCompletionGenerator, ScheduleGenerator};
use crate::services::productivity_insights;
use crate::services::prompt_templates::{
    build_day_plan_payload, build_distribution_payload, day_plan_response_schema,
    distribution_response_schema, validate_response,
};
use crate::services::schedule_assembler::{self, EnergyProfile};
use crate::services::schedule_utils;
use crate::services::slot_allocator::{Allocation, SlotAllocator};
use crate::services::task_prioritizer::{HistoricalScoreProvider, NeutralHistory, TaskPrioritizer};

const MIN_GENERATED_MINUTES: f64 = 15.0;
const MAX_GENERATED_MINUTES: f64 = 90.0;
const PEAK_HOURS_IN_PROMPT: usize = 3;

/// Caller-supplied signals that shape prioritization and analytics.
#[derive(Clone)]
pub struct GenerationContext {
    pub goals: Vec<Goal>,
    pub energy_profile: EnergyProfile,
    pub productivity: Vec<ProductivitySnapshot>,
    pub history: Arc<dyn HistoricalScoreProvider>,
}

impl Default for GenerationContext {
    fn default() -> Self {
        Self {
            goals: Vec::new(),
            energy_profile: EnergyProfile::default(),
            productivity: Vec::new(),
            history: Arc::new(NeutralHistory),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GenerationOutcome {
    External(Schedule),
    Advanced(Schedule),
    Basic(Schedule),
}

impl GenerationOutcome {
    pub fn tier(&self) -> GenerationTier {
        match self {
            GenerationOutcome::External(_) => GenerationTier::External,
            GenerationOutcome::Advanced(_) => GenerationTier::Advanced,
            GenerationOutcome::Basic(_) => GenerationTier::Basic,
        }
    }

    pub fn schedule(&self) -> &Schedule {
        match self {
            GenerationOutcome::External(schedule)
            | GenerationOutcome::Advanced(schedule)
            | GenerationOutcome::Basic(schedule) => schedule,
        }
    }

    pub fn into_schedule(self) -> Schedule {
        match self {
            GenerationOutcome::External(schedule)
            | GenerationOutcome::Advanced(schedule)
            | GenerationOutcome::Basic(schedule) => schedule,
        }
    }
}

#[derive(Debug)]
pub enum GenerationState {
    AttemptExternalGeneration,
    AttemptAdvancedFallback,
    AttemptBasicFallback,
    Assembled(GenerationOutcome),
}

impl GenerationState {
    fn as_str(&self) -> &'static str {
        match self {
            GenerationState::AttemptExternalGeneration => "attempt_external_generation",
            GenerationState::AttemptAdvancedFallback => "attempt_advanced_fallback",
            GenerationState::AttemptBasicFallback => "attempt_basic_fallback",
            GenerationState::Assembled(_) => "assembled",
        }
    }
}

pub struct GenerationOrchestrator {
    config: SchedulerConfig,
    context: GenerationContext,
    generator: Option<Arc<dyn ScheduleGenerator>>,
}

impl GenerationOrchestrator {
    /// Validates the configuration and wires the HTTP generator when an API
    /// key is present. A generator that cannot be built is logged and skipped.
    pub fn new(config: SchedulerConfig) -> AppResult<Self> {
        config.validate()?;

        let generator: Option<Arc<dyn ScheduleGenerator>> = if config.generator.is_enabled() {
            match ChatCompletionGenerator::try_new(&config.generator) {
                Ok(generator) => Some(Arc::new(generator)),
                Err(err) => {
                    warn!(
                        target: "app::schedule::orchestrator",
                        error = %err,
                        "external generator unavailable, rule-based tiers only"
                    );
                    None
                }
            }
        } else {
            None
        };

        Ok(Self {
            config,
            context: GenerationContext::default(),
            generator,
        })
    }

    pub fn with_generator(mut self, generator: Arc<dyn ScheduleGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn without_generator(mut self) -> Self {
        self.generator = None;
        self
    }

    pub fn with_context(mut self, context: GenerationContext) -> Self {
        self.context = context;
        self
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn has_generator(&self) -> bool {
        self.generator.is_some()
    }

    /// Runs the fallback cascade for one day. Always produces a schedule.
    pub async fn generate(&self, date: NaiveDate, tasks: &[Task]) -> GenerationOutcome {
        let pending: Vec<Task> = tasks.iter().filter(|task| !task.completed).cloned().collect();

        let mut state = if self.generator.is_some() && !pending.is_empty() {
            GenerationState::AttemptExternalGeneration
        } else {
            GenerationState::AttemptAdvancedFallback
        };

        loop {
            debug!(
                target: "app::schedule::orchestrator",
                %date,
                state = state.as_str(),
                "generation state"
            );
            state = match state {
                GenerationState::AttemptExternalGeneration => {
                    match self.attempt_external(date, &pending).await {
                        Ok(schedule) => {
                            GenerationState::Assembled(GenerationOutcome::External(schedule))
                        }
                        Err(err) => {
                            warn!(
                                target: "app::schedule::orchestrator",
                                %date,
                                code = ?err.generator_code(),
                                error = %err,
                                "external generation failed, using advanced fallback"
                            );
                            GenerationState::AttemptAdvancedFallback
                        }
                    }
                }
                GenerationState::AttemptAdvancedFallback => {
                    match self.attempt_advanced(date, &pending) {
                        Ok(schedule) => {
                            GenerationState::Assembled(GenerationOutcome::Advanced(schedule))
                        }
                        Err(err) => {
                            warn!(
                                target: "app::schedule::orchestrator",
                                %date,
                                error = %err,
                                "advanced fallback failed, using basic fallback"
                            );
                            GenerationState::AttemptBasicFallback
                        }
                    }
                }
                GenerationState::AttemptBasicFallback => {
                    GenerationState::Assembled(GenerationOutcome::Basic(self.basic(date, &pending)))
                }
                GenerationState::Assembled(outcome) => {
                    let schedule = outcome.schedule();
                    info!(
                        target: "app::schedule::orchestrator",
                        %date,
                        tier = outcome.tier().as_str(),
                        items = schedule.item_count(),
                        unplaced = schedule.unplaced.len(),
                        total_study_time = schedule.total_study_time,
                        "schedule generated"
                    );
                    return outcome;
                }
            };
        }
    }

    /// Spreads tasks over `days` consecutive dates and plans each day
    /// concurrently. Returns one schedule per day, empty days included.
    pub async fn generate_multi_day(
        &self,
        start_date: NaiveDate,
        days: u32,
        tasks: &[Task],
    ) -> AppResult<Vec<Schedule>> {
        if days == 0 {
            return Err(AppError::validation("days must be at least 1"));
        }

        let dates = (0..days)
            .map(|offset| {
                start_date
                    .checked_add_days(Days::new(offset as u64))
                    .ok_or_else(|| AppError::validation("date range out of bounds"))
            })
            .collect::<AppResult<Vec<_>>>()?;

        let pending: Vec<Task> = tasks.iter().filter(|task| !task.completed).cloned().collect();
        let buckets = self.distribute(start_date, days, &pending).await;

        let plans = dates
            .iter()
            .zip(buckets.iter())
            .map(|(date, bucket)| self.generate(*date, bucket));
        let outcomes = join_all(plans).await;

        info!(
            target: "app::schedule::orchestrator",
            %start_date,
            days,
            tasks = pending.len(),
            "multi-day schedule generated"
        );
        Ok(outcomes
            .into_iter()
            .map(GenerationOutcome::into_schedule)
            .collect())
    }

    pub fn insights(&self, schedule: &Schedule, tasks: &[Task]) -> ScheduleInsights {
        schedule_assembler::insights(
            schedule,
            &self.context.energy_profile,
            tasks,
            &self.context.goals,
        )
    }

    pub fn productivity_insights(&self) -> ProductivityInsights {
        productivity_insights::summarize(&self.context.productivity)
    }

    async fn attempt_external(&self, date: NaiveDate, tasks: &[Task]) -> AppResult<Schedule> {
        let generator = self.generator.as_ref().ok_or_else(|| {
            AppError::generator(
                GeneratorErrorCode::NotConfigured,
                "no external generator configured",
            )
        })?;

        let payload = build_day_plan_payload(
            date,
            tasks,
            &self.config,
            &productivity_insights::prompt_context(&self.context.productivity),
            &self.context.energy_profile.peak_hours(PEAK_HOURS_IN_PROMPT),
        );
        let response = self.with_timeout(generator.plan_day(&payload)).await?;

        let (allocation, insights) =
            validate_day_plan(date, &response, tasks, self.config.work_duration_minutes)?;
        let mut schedule = schedule_assembler::assemble(date, allocation, GenerationTier::External);
        schedule.insights = insights;
        Ok(schedule)
    }

    fn attempt_advanced(&self, date: NaiveDate, tasks: &[Task]) -> AppResult<Schedule> {
        let blocks = DailyStructureBuilder::from_config(&self.config)?.build(date);
        let ranked = TaskPrioritizer::new(date, &self.context.goals, self.context.history.as_ref())
            .prioritize(tasks);
        let allocation =
            SlotAllocator::new(self.config.pomodoro(), self.config.seed)?.allocate(&blocks, &ranked)?;
        Ok(schedule_assembler::assemble(
            date,
            allocation,
            GenerationTier::Advanced,
        ))
    }

    /// One task per preferred time in the given order, no breaks.
    fn basic(&self, date: NaiveDate, tasks: &[Task]) -> Schedule {
        let work = self.config.work_duration_minutes;
        let mut times = self.config.preferred_times.clone();
        times.sort();

        let mut entries = Vec::new();
        let mut unplaced = Vec::new();
        let mut previous_end: Option<NaiveDateTime> = None;

        for (index, task) in tasks.iter().enumerate() {
            let minutes = task
                .estimated_duration
                .filter(|minutes| *minutes > 0)
                .and_then(|minutes| u32::try_from(minutes).ok())
                .unwrap_or(work);

            let Some(time) = times.get(index) else {
                unplaced.push(UnplacedTask {
                    task_id: task.id.clone(),
                    title: task.title.clone(),
                    required_minutes: minutes,
                });
                continue;
            };

            let preferred = schedule_utils::at(date, *time);
            let start = match previous_end {
                Some(end) if end > preferred => end,
                _ => preferred,
            };
            let Ok(end) = schedule_utils::add_minutes(start, minutes as i64) else {
                unplaced.push(UnplacedTask {
                    task_id: task.id.clone(),
                    title: task.title.clone(),
                    required_minutes: minutes,
                });
                continue;
            };
            previous_end = Some(end);
            entries.push(ScheduleEntry::Task(ScheduledItem {
                task_id: task.id.clone(),
                title: task.title.clone(),
                start,
                duration_minutes: minutes,
                rationale: Some(format!(
                    "Preferred study time {}",
                    schedule_utils::format_hhmm(*time)
                )),
            }));
        }

        schedule_assembler::assemble(date, Allocation { entries, unplaced }, GenerationTier::Basic)
    }

    async fn distribute(&self, start_date: NaiveDate, days: u32, tasks: &[Task]) -> Vec<Vec<Task>> {
        let Some(generator) = self.generator.as_ref().filter(|_| !tasks.is_empty()) else {
            return round_robin(tasks, days);
        };

        let payload = build_distribution_payload(start_date, days, tasks);
        let partition = match self.with_timeout(generator.distribute(&payload)).await {
            Ok(response) => validate_partition(&response, days, tasks.len()),
            Err(err) => Err(err),
        };

        match partition {
            Ok(indices) => indices
                .into_iter()
                .map(|day| day.into_iter().map(|index| tasks[index].clone()).collect())
                .collect(),
            Err(err) => {
                warn!(
                    target: "app::schedule::orchestrator",
                    error = %err,
                    "generator distribution rejected, using round-robin"
                );
                round_robin(tasks, days)
            }
        }
    }

    async fn with_timeout<F>(&self, call: F) -> AppResult<JsonValue>
    where
        F: std::future::Future<Output = AppResult<JsonValue>>,
    {
        let limit = StdDuration::from_secs(self.config.generator.timeout_secs);
        match tokio::time::timeout(limit, call).await {
            Ok(result) => result,
            Err(_) => Err(AppError::generator_with_details(
                GeneratorErrorCode::Timeout,
                "generator call timed out",
                None,
                Some(json!({ "timeoutSecs": self.config.generator.timeout_secs })),
            )),
        }
    }
}

/// Task at position `i` goes to day `i % days`.
pub fn round_robin(tasks: &[Task], days: u32) -> Vec<Vec<Task>> {
    let days = days.max(1) as usize;
    let mut buckets: Vec<Vec<Task>> = vec![Vec::new(); days];
    for (index, task) in tasks.iter().enumerate() {
        buckets[index % days].push(task.clone());
    }
    buckets
}

fn malformed(message: impl Into<String>, details: JsonValue) -> AppError {
    AppError::generator_with_details(
        GeneratorErrorCode::InvalidResponse,
        message,
        None,
        Some(details),
    )
}

/// Checks a day-plan response against the submitted tasks and converts it
/// into an allocation plus the generator's free-text insights.
pub fn validate_day_plan(
    date: NaiveDate,
    response: &JsonValue,
    tasks: &[Task],
    default_minutes: u32,
) -> AppResult<(Allocation, Vec<String>)> {
    validate_response(&day_plan_response_schema(), response, "day plan")?;

    let raw_items = response
        .get("schedule")
        .and_then(JsonValue::as_array)
        .ok_or_else(|| malformed("day plan is missing schedule", json!({})))?;

    let mut seen: HashSet<String> = HashSet::new();
    let mut items = Vec::with_capacity(raw_items.len());
    for raw in raw_items {
        let task_id = match raw.get("task_id") {
            Some(JsonValue::String(value)) => value.trim().to_string(),
            Some(JsonValue::Number(value)) => value.to_string(),
            _ => return Err(malformed("schedule item has no task_id", raw.clone())),
        };
        let task = tasks
            .iter()
            .find(|task| task.id == task_id)
            .ok_or_else(|| malformed("schedule item references an unknown task", json!({ "taskId": task_id })))?;
        if !seen.insert(task_id.clone()) {
            return Err(malformed(
                "schedule item repeats a task",
                json!({ "taskId": task_id }),
            ));
        }

        let time_text = raw
            .get("scheduled_time")
            .and_then(JsonValue::as_str)
            .unwrap_or_default();
        let time = schedule_utils::parse_hhmm(time_text).map_err(|_| {
            malformed(
                "schedule item has an invalid scheduled_time",
                json!({ "taskId": task_id, "scheduledTime": time_text }),
            )
        })?;

        let duration = raw
            .get("duration")
            .and_then(JsonValue::as_f64)
            .unwrap_or(MIN_GENERATED_MINUTES)
            .round()
            .clamp(MIN_GENERATED_MINUTES, MAX_GENERATED_MINUTES) as u32;

        items.push(ScheduledItem {
            task_id,
            title: task.title.clone(),
            start: schedule_utils::at(date, time),
            duration_minutes: duration,
            rationale: raw
                .get("reason")
                .and_then(JsonValue::as_str)
                .map(str::to_string),
        });
    }

    items.sort_by_key(|item| item.start);
    for pair in items.windows(2) {
        if schedule_utils::overlaps(pair[0].start, pair[0].end(), pair[1].start, pair[1].end()) {
            return Err(malformed(
                "generated schedule items overlap",
                json!({ "first": pair[0].task_id, "second": pair[1].task_id }),
            ));
        }
    }

    let unplaced = tasks
        .iter()
        .filter(|task| !seen.contains(&task.id))
        .map(|task| UnplacedTask {
            task_id: task.id.clone(),
            title: task.title.clone(),
            required_minutes: duration_estimator::estimate(task, default_minutes)
                .unwrap_or(default_minutes),
        })
        .collect();

    let insights = response
        .get("insights")
        .and_then(JsonValue::as_array)
        .map(|values| {
            values
                .iter()
                .filter_map(JsonValue::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    Ok((
        Allocation {
            entries: items.into_iter().map(ScheduleEntry::Task).collect(),
            unplaced,
        },
        insights,
    ))
}

/// Accepts `{"days": [[..]]}` or a bare array of arrays. Every index must be
/// in range and used at most once; missing indices are appended to day
/// `index % days`. The result always has exactly `days` entries.
pub fn validate_partition(
    response: &JsonValue,
    days: u32,
    task_count: usize,
) -> AppResult<Vec<Vec<usize>>> {
    if days == 0 {
        return Err(AppError::validation("days must be at least 1"));
    }
    let raw = match response {
        JsonValue::Object(map) => map
            .get("days")
            .cloned()
            .ok_or_else(|| malformed("distribution is missing days", response.clone()))?,
        other => other.clone(),
    };
    validate_response(&distribution_response_schema(), &raw, "distribution")?;

    let outer = raw.as_array().cloned().unwrap_or_default();
    let days = days as usize;
    if outer.len() > days {
        return Err(malformed(
            "distribution has more days than requested",
            json!({ "requested": days, "returned": outer.len() }),
        ));
    }

    let mut partition: Vec<Vec<usize>> = vec![Vec::new(); days];
    let mut assigned = vec![false; task_count];
    for (day, indices) in outer.iter().enumerate() {
        for value in indices.as_array().into_iter().flatten() {
            let index = value
                .as_u64()
                .map(|index| index as usize)
                .filter(|index| *index < task_count)
                .ok_or_else(|| {
                    malformed("distribution index out of range", json!({ "index": value }))
                })?;
            if assigned[index] {
                return Err(malformed(
                    "distribution assigns a task twice",
                    json!({ "index": index }),
                ));
            }
            assigned[index] = true;
            partition[day].push(index);
        }
    }

    for (index, _) in assigned.iter().enumerate().filter(|(_, done)| !**done) {
        partition[index % days].push(index);
    }

    Ok(partition)
}
