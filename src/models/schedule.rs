use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    MorningRoutine,
    Study,
    Break,
    Meal,
    WindDown,
}

impl BlockKind {
    pub fn as_str(&self) -> &str {
        match self {
            BlockKind::MorningRoutine => "morning_routine",
            BlockKind::Study => "study",
            BlockKind::Break => "break",
            BlockKind::Meal => "meal",
            BlockKind::WindDown => "wind_down",
        }
    }
}

/// Half-open interval `[start, end)` of one day skeleton.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimeBlock {
    pub label: String,
    pub kind: BlockKind,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl TimeBlock {
    pub fn minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }

    pub fn is_study(&self) -> bool {
        self.kind == BlockKind::Study
    }

    pub fn contains(&self, start: NaiveDateTime, minutes: u32) -> bool {
        start >= self.start && start + Duration::minutes(minutes as i64) <= self.end
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledItem {
    pub task_id: String,
    pub title: String,
    pub start: NaiveDateTime,
    pub duration_minutes: u32,
    #[serde(default)]
    pub rationale: Option<String>,
}

impl ScheduledItem {
    pub fn end(&self) -> NaiveDateTime {
        self.start + Duration::minutes(self.duration_minutes as i64)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BreakKind {
    Short,
    Long,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BreakInsertion {
    /// Index of the scheduled item this break follows.
    pub after_item: usize,
    pub start: NaiveDateTime,
    pub duration_minutes: u32,
    pub kind: BreakKind,
    pub activity: String,
}

impl BreakInsertion {
    pub fn end(&self) -> NaiveDateTime {
        self.start + Duration::minutes(self.duration_minutes as i64)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum ScheduleEntry {
    Task(ScheduledItem),
    Break(BreakInsertion),
}

impl ScheduleEntry {
    pub fn start(&self) -> NaiveDateTime {
        match self {
            ScheduleEntry::Task(item) => item.start,
            ScheduleEntry::Break(insertion) => insertion.start,
        }
    }

    pub fn end(&self) -> NaiveDateTime {
        match self {
            ScheduleEntry::Task(item) => item.end(),
            ScheduleEntry::Break(insertion) => insertion.end(),
        }
    }
}

/// A task left out because the day ran out of study capacity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UnplacedTask {
    pub task_id: String,
    pub title: String,
    pub required_minutes: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum GenerationTier {
    External,
    Advanced,
    Basic,
}

impl GenerationTier {
    pub fn as_str(&self) -> &str {
        match self {
            GenerationTier::External => "external",
            GenerationTier::Advanced => "advanced",
            GenerationTier::Basic => "basic",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    pub id: String,
    pub date: NaiveDate,
    pub generated_by_ai: bool,
    pub tier: GenerationTier,
    pub total_study_time: u32,
    pub entries: Vec<ScheduleEntry>,
    #[serde(default)]
    pub unplaced: Vec<UnplacedTask>,
    #[serde(default)]
    pub insights: Vec<String>,
}

impl Schedule {
    pub fn items(&self) -> impl Iterator<Item = &ScheduledItem> {
        self.entries.iter().filter_map(|entry| match entry {
            ScheduleEntry::Task(item) => Some(item),
            ScheduleEntry::Break(_) => None,
        })
    }

    pub fn breaks(&self) -> impl Iterator<Item = &BreakInsertion> {
        self.entries.iter().filter_map(|entry| match entry {
            ScheduleEntry::Break(insertion) => Some(insertion),
            ScheduleEntry::Task(_) => None,
        })
    }

    pub fn item_count(&self) -> usize {
        self.items().count()
    }

    pub fn is_empty(&self) -> bool {
        self.item_count() == 0
    }
}
