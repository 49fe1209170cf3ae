use std::collections::{BTreeMap, HashSet};

use chrono::{NaiveDate, Timelike};
use tracing::debug;
use uuid::Uuid;

use crate::models::goal::Goal;
use crate::models::insights::{
    BalanceLevel, ConflictKind, ConflictSeverity, EnergyOptimization, EnergySample, GoalAlignment,
    OptimizationLevel, ScheduleConflict, ScheduleInsights, WorkloadBalance,
};
use crate::models::schedule::{GenerationTier, Schedule, ScheduleEntry};
use crate::models::task::Task;
use crate::services::slot_allocator::Allocation;

const NEUTRAL_ENERGY: f64 = 5.0;
const LOW_ENERGY_THRESHOLD: f64 = 3.0;
const OVERLOAD_MINUTES: u32 = 300;
const LIGHT_MINUTES: u32 = 180;

/// Expected energy (0-10) for each hour of the day.
#[derive(Debug, Clone, PartialEq)]
pub struct EnergyProfile {
    levels: BTreeMap<u32, f64>,
}

impl Default for EnergyProfile {
    fn default() -> Self {
        let levels = (6..=21)
            .map(|hour: u32| {
                let distance = (hour as f64 - 10.0).abs();
                (hour, (8.0 - distance).max(3.0))
            })
            .collect();
        Self { levels }
    }
}

impl EnergyProfile {
    /// Average recorded samples per hour; hours without samples keep the
    /// default curve.
    pub fn from_samples(samples: &[EnergySample]) -> Self {
        let mut profile = Self::default();
        let mut sums: BTreeMap<u32, (f64, u32)> = BTreeMap::new();
        for sample in samples.iter().filter(|sample| sample.hour < 24) {
            let slot = sums.entry(sample.hour).or_insert((0.0, 0));
            slot.0 += sample.energy_level.clamp(0.0, 10.0);
            slot.1 += 1;
        }
        for (hour, (sum, count)) in sums {
            profile.levels.insert(hour, sum / count as f64);
        }
        profile
    }

    pub fn energy_at(&self, hour: u32) -> f64 {
        self.levels.get(&hour).copied().unwrap_or(NEUTRAL_ENERGY)
    }

    /// Highest-energy hours, best first, earlier hour on ties.
    pub fn peak_hours(&self, count: usize) -> Vec<u32> {
        let mut hours: Vec<(u32, f64)> = self.levels.iter().map(|(h, e)| (*h, *e)).collect();
        hours.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        hours.into_iter().take(count).map(|(hour, _)| hour).collect()
    }
}

pub fn assemble(date: NaiveDate, allocation: Allocation, tier: GenerationTier) -> Schedule {
    let Allocation {
        mut entries,
        unplaced,
    } = allocation;
    entries.sort_by_key(|entry| entry.start());

    let total_study_time = entries
        .iter()
        .map(|entry| match entry {
            ScheduleEntry::Task(item) => item.duration_minutes,
            ScheduleEntry::Break(_) => 0,
        })
        .sum();

    let schedule = Schedule {
        id: Uuid::new_v4().to_string(),
        date,
        generated_by_ai: tier == GenerationTier::External,
        tier,
        total_study_time,
        entries,
        unplaced,
        insights: Vec::new(),
    };

    debug!(
        target: "app::schedule::assembler",
        schedule_id = %schedule.id,
        tier = tier.as_str(),
        items = schedule.item_count(),
        total_study_time,
        "schedule assembled"
    );
    schedule
}

pub fn energy_optimization(schedule: &Schedule, profile: &EnergyProfile) -> EnergyOptimization {
    let scores: Vec<f64> = schedule
        .items()
        .map(|item| profile.energy_at(item.start.hour()))
        .collect();
    let average = if scores.is_empty() {
        NEUTRAL_ENERGY
    } else {
        scores.iter().sum::<f64>() / scores.len() as f64
    };
    let optimization_level = if average >= 7.0 {
        OptimizationLevel::Excellent
    } else if average >= 5.0 {
        OptimizationLevel::Good
    } else {
        OptimizationLevel::NeedsImprovement
    };

    EnergyOptimization {
        average_energy_score: (average * 10.0).round() / 10.0,
        optimization_level,
        recommendation: (optimization_level == OptimizationLevel::NeedsImprovement)
            .then(|| "Consider shifting tasks to higher energy hours".to_string()),
    }
}

pub fn workload_balance(schedule: &Schedule) -> WorkloadBalance {
    let total = schedule.total_study_time;
    let (balance_level, recommendation) = if total > OVERLOAD_MINUTES {
        (
            BalanceLevel::Overloaded,
            Some("Consider breaking into multiple days"),
        )
    } else if total >= LIGHT_MINUTES {
        (BalanceLevel::Balanced, None)
    } else {
        (
            BalanceLevel::Light,
            Some("Could add more study time if available"),
        )
    };

    WorkloadBalance {
        total_study_time: total,
        balance_level,
        recommendation: recommendation.map(str::to_string),
    }
}

pub fn detect_conflicts(schedule: &Schedule, profile: &EnergyProfile) -> Vec<ScheduleConflict> {
    let mut conflicts: Vec<ScheduleConflict> = schedule
        .items()
        .filter_map(|item| {
            let hour = item.start.hour();
            (profile.energy_at(hour) < LOW_ENERGY_THRESHOLD).then(|| ScheduleConflict {
                kind: ConflictKind::Energy,
                severity: ConflictSeverity::High,
                message: format!("Low energy period at {hour}:00"),
                suggestion: "Consider rescheduling to higher energy time".to_string(),
                related_task_id: Some(item.task_id.clone()),
            })
        })
        .collect();

    if schedule.total_study_time > OVERLOAD_MINUTES {
        conflicts.push(ScheduleConflict {
            kind: ConflictKind::Workload,
            severity: ConflictSeverity::Medium,
            message: format!("Heavy study load: {} minutes", schedule.total_study_time),
            suggestion: "Consider spreading over multiple days".to_string(),
            related_task_id: None,
        });
    }

    conflicts.sort_by_key(|conflict| conflict.severity);
    conflicts
}

/// Share of scheduled minutes spent on tasks linked to an active goal, either
/// by id or by category.
pub fn goal_alignment(schedule: &Schedule, tasks: &[Task], goals: &[Goal]) -> GoalAlignment {
    let active: Vec<&Goal> = goals.iter().filter(|goal| goal.is_active()).collect();
    let goal_ids: HashSet<&str> = active.iter().map(|goal| goal.id.as_str()).collect();
    let goal_categories: Vec<String> = active
        .iter()
        .filter_map(|goal| goal.category.as_deref())
        .map(str::to_lowercase)
        .collect();

    let aligned_ids: HashSet<&str> = tasks
        .iter()
        .filter(|task| {
            let linked = task
                .goal_id
                .as_deref()
                .map(|id| goal_ids.contains(id))
                .unwrap_or(false);
            let by_category = task
                .normalized_category()
                .map(|category| goal_categories.iter().any(|goal| goal.contains(&category)))
                .unwrap_or(false);
            linked || by_category
        })
        .map(|task| task.id.as_str())
        .collect();

    let aligned_minutes: u32 = schedule
        .items()
        .filter(|item| aligned_ids.contains(item.task_id.as_str()))
        .map(|item| item.duration_minutes)
        .sum();
    let alignment_ratio = if schedule.total_study_time == 0 {
        0.0
    } else {
        aligned_minutes as f64 / schedule.total_study_time as f64
    };

    let recommendation = if active.is_empty() {
        "Set a study goal to track how your time supports it"
    } else if alignment_ratio >= 0.6 {
        "Schedule aligns well with your goals"
    } else {
        "Consider goal priorities"
    };

    GoalAlignment {
        goals_count: active.len(),
        aligned_minutes,
        alignment_ratio,
        recommendation: recommendation.to_string(),
    }
}

pub fn insights(
    schedule: &Schedule,
    profile: &EnergyProfile,
    tasks: &[Task],
    goals: &[Goal],
) -> ScheduleInsights {
    let energy = energy_optimization(schedule, profile);
    let workload = workload_balance(schedule);

    let mut recommendations = Vec::new();
    if energy.optimization_level == OptimizationLevel::NeedsImprovement {
        recommendations.push(
            "Try scheduling high-priority tasks during your peak energy hours (typically morning for most people)"
                .to_string(),
        );
    }
    if workload.balance_level == BalanceLevel::Overloaded {
        recommendations.push(
            "Your schedule is quite intensive. Consider the '80/20 rule' - focus on high-impact tasks"
                .to_string(),
        );
    }
    if schedule.item_count() >= 3 {
        recommendations.push(
            "Great job planning multiple tasks! Remember to take micro-breaks between subjects"
                .to_string(),
        );
    }
    if recommendations.is_empty() {
        recommendations
            .push("Your schedule looks well-balanced! Keep up the good planning habits".to_string());
    }

    ScheduleInsights {
        energy_optimization: energy,
        workload_balance: workload,
        goal_alignment: goal_alignment(schedule, tasks, goals),
        conflicts: detect_conflicts(schedule, profile),
        recommendations,
    }
}
