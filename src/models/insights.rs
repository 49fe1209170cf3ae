use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OptimizationLevel {
    Excellent,
    Good,
    NeedsImprovement,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EnergyOptimization {
    pub average_energy_score: f64,
    pub optimization_level: OptimizationLevel,
    #[serde(default)]
    pub recommendation: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BalanceLevel {
    Overloaded,
    Balanced,
    Light,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkloadBalance {
    pub total_study_time: u32,
    pub balance_level: BalanceLevel,
    #[serde(default)]
    pub recommendation: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GoalAlignment {
    pub goals_count: usize,
    pub aligned_minutes: u32,
    pub alignment_ratio: f64,
    pub recommendation: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ConflictKind {
    Energy,
    Workload,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub enum ConflictSeverity {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleConflict {
    pub kind: ConflictKind,
    pub severity: ConflictSeverity,
    pub message: String,
    pub suggestion: String,
    #[serde(default)]
    pub related_task_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleInsights {
    pub energy_optimization: EnergyOptimization,
    pub workload_balance: WorkloadBalance,
    pub goal_alignment: GoalAlignment,
    pub conflicts: Vec<ScheduleConflict>,
    pub recommendations: Vec<String>,
}

/// One recorded energy/focus observation for an hour of the day.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EnergySample {
    pub hour: u32,
    pub energy_level: f64,
    #[serde(default)]
    pub focus_score: f64,
    #[serde(default)]
    pub tasks_completed: u32,
}

/// Daily productivity rollup produced by the tracking side of the app.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProductivitySnapshot {
    pub date: NaiveDate,
    pub hours_studied: f64,
    pub productivity_score: f64,
    pub burnout_risk: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProductivityInsights {
    #[serde(default)]
    pub average_daily_study_hours: Option<f64>,
    #[serde(default)]
    pub average_productivity_score: Option<f64>,
    pub recommendations: Vec<String>,
}
