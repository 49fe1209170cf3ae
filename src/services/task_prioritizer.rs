use std::cmp::Ordering;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::goal::Goal;
use crate::models::task::Task;

const WEIGHT_BASE_PRIORITY: f64 = 0.3;
const WEIGHT_URGENCY: f64 = 0.25;
const WEIGHT_ENERGY: f64 = 0.2;
const WEIGHT_GOAL: f64 = 0.15;
const WEIGHT_HISTORY: f64 = 0.1;

const NEUTRAL_ENERGY: f64 = 5.0;
const NEUTRAL_PERFORMANCE: f64 = 0.5;
const NEUTRAL_GOAL_ALIGNMENT: f64 = 0.5;

/// Source of per-task history signals. The default methods return neutral
/// values so callers without any tracking data can use [`NeutralHistory`].
pub trait HistoricalScoreProvider: Send + Sync {
    /// Expected energy demand of the task on a 0-10 scale.
    fn energy_requirement(&self, _task: &Task) -> f64 {
        NEUTRAL_ENERGY
    }

    /// Past completion performance for similar tasks on a 0-1 scale.
    fn performance_score(&self, _task: &Task) -> f64 {
        NEUTRAL_PERFORMANCE
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NeutralHistory;

impl HistoricalScoreProvider for NeutralHistory {}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PriorityFactors {
    pub base_priority: f64,
    pub urgency: f64,
    pub energy_requirement: f64,
    pub goal_alignment: f64,
    pub historical_performance: f64,
}

impl PriorityFactors {
    pub fn weighted_score(&self) -> f64 {
        self.base_priority * WEIGHT_BASE_PRIORITY
            + self.urgency * WEIGHT_URGENCY
            + self.energy_requirement * WEIGHT_ENERGY
            + self.goal_alignment * WEIGHT_GOAL
            + self.historical_performance * WEIGHT_HISTORY
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PrioritizedTask {
    pub task: Task,
    pub score: f64,
    pub factors: PriorityFactors,
}

pub struct TaskPrioritizer<'a> {
    today: NaiveDate,
    goals: Vec<&'a Goal>,
    history: &'a dyn HistoricalScoreProvider,
}

impl<'a> TaskPrioritizer<'a> {
    pub fn new(
        today: NaiveDate,
        goals: &'a [Goal],
        history: &'a dyn HistoricalScoreProvider,
    ) -> Self {
        Self {
            today,
            goals: goals.iter().filter(|goal| goal.is_active()).collect(),
            history,
        }
    }

    pub fn prioritize(&self, tasks: &[Task]) -> Vec<PrioritizedTask> {
        let mut ranked: Vec<PrioritizedTask> = tasks
            .iter()
            .map(|task| {
                let factors = self.factors(task);
                PrioritizedTask {
                    task: task.clone(),
                    score: factors.weighted_score(),
                    factors,
                }
            })
            .collect();

        ranked.sort_by(compare_ranked);

        debug!(
            target: "app::schedule::prioritizer",
            tasks = ranked.len(),
            top = ranked.first().map(|entry| entry.task.id.as_str()).unwrap_or(""),
            "tasks prioritized"
        );
        ranked
    }

    pub fn factors(&self, task: &Task) -> PriorityFactors {
        PriorityFactors {
            base_priority: task.priority.weight(),
            urgency: urgency(task.due_date, self.today),
            energy_requirement: self.history.energy_requirement(task).clamp(0.0, 10.0),
            goal_alignment: self.goal_alignment(task),
            historical_performance: self.history.performance_score(task).clamp(0.0, 1.0),
        }
    }

    fn goal_alignment(&self, task: &Task) -> f64 {
        if let Some(goal_id) = task.goal_id.as_deref() {
            if self.goals.iter().any(|goal| goal.id == goal_id) {
                return 1.0;
            }
        }

        if let Some(category) = task.normalized_category() {
            let matches_goal = self.goals.iter().any(|goal| {
                goal.category
                    .as_deref()
                    .map(|goal_category| goal_category.to_lowercase().contains(&category))
                    .unwrap_or(false)
            });
            if matches_goal {
                return 0.7;
            }
        }

        NEUTRAL_GOAL_ALIGNMENT
    }
}

pub fn urgency(due_date: Option<NaiveDate>, today: NaiveDate) -> f64 {
    let Some(due) = due_date else {
        return 0.3;
    };
    let days_left = (due - today).num_days();
    match days_left {
        d if d < 0 => 1.0,
        0 => 0.9,
        1..=3 => 0.7,
        4..=7 => 0.5,
        _ => 0.2,
    }
}

fn compare_ranked(a: &PrioritizedTask, b: &PrioritizedTask) -> Ordering {
    b.score
        .partial_cmp(&a.score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| none_last(&a.task.due_date, &b.task.due_date))
        .then_with(|| none_last(&a.task.category, &b.task.category))
        .then_with(|| a.task.id.cmp(&b.task.id))
}

fn none_last<T: Ord>(a: &Option<T>, b: &Option<T>) -> Ordering {
    match (a, b) {
        (Some(left), Some(right)) => left.cmp(right),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
