use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde_json::json;
use tracing::{debug, info};

use crate::error::{AppError, AppResult};
use crate::models::schedule::{
    BreakInsertion, BreakKind, ScheduleEntry, ScheduledItem, TimeBlock, UnplacedTask,
};
use crate::models::settings::PomodoroSettings;
use crate::services::{duration_estimator, schedule_utils};
use crate::services::task_prioritizer::PrioritizedTask;

pub const SHORT_BREAK_ACTIVITIES: [&str; 5] = [
    "Deep breathing",
    "Stand and stretch",
    "Drink water",
    "Quick walk",
    "Eye exercises",
];

pub const LONG_BREAK_ACTIVITIES: [&str; 6] = [
    "Light exercise",
    "Healthy snack",
    "Meditation",
    "Short walk outside",
    "Listen to music",
    "Call a friend",
];

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Allocation {
    pub entries: Vec<ScheduleEntry>,
    pub unplaced: Vec<UnplacedTask>,
}

impl Allocation {
    pub fn items(&self) -> impl Iterator<Item = &ScheduledItem> {
        self.entries.iter().filter_map(|entry| match entry {
            ScheduleEntry::Task(item) => Some(item),
            ScheduleEntry::Break(_) => None,
        })
    }
}

/// Greedy single-pass packer: tasks keep their priority order and are never
/// split across blocks.
pub struct SlotAllocator {
    settings: PomodoroSettings,
    seed: u64,
}

impl SlotAllocator {
    pub fn new(settings: PomodoroSettings, seed: u64) -> AppResult<Self> {
        if settings.work_duration_minutes == 0 {
            return Err(AppError::validation("work duration must be positive"));
        }
        if settings.sessions_until_long_break == 0 {
            return Err(AppError::validation(
                "sessions until long break must be at least 1",
            ));
        }
        Ok(Self { settings, seed })
    }

    pub fn allocate(
        &self,
        blocks: &[TimeBlock],
        prioritized: &[PrioritizedTask],
    ) -> AppResult<Allocation> {
        let mut study_blocks: Vec<&TimeBlock> =
            blocks.iter().filter(|block| block.is_study()).collect();
        study_blocks.sort_by_key(|block| block.start);

        let longest_block = study_blocks
            .iter()
            .map(|block| block.minutes().max(0) as u32)
            .max()
            .unwrap_or(0);

        let work = self.settings.work_duration_minutes;
        let mut durations = Vec::with_capacity(prioritized.len());
        for entry in prioritized {
            let estimated = duration_estimator::estimate(&entry.task, work)?;
            durations.push((estimated, estimated.min(longest_block)));
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut entries = Vec::new();
        let mut placed_items = 0usize;
        let mut sessions = 0u32;
        let mut next = 0usize;
        let total = prioritized.len();

        for (position, block) in study_blocks.iter().enumerate() {
            let mut cursor = block.start;
            let mut capacity = block.minutes().max(0) as u32;

            while next < total && capacity >= work {
                let (estimated, mut minutes) = durations[next];
                if minutes > capacity
                    && estimated > longest_block
                    && !study_blocks[position + 1..]
                        .iter()
                        .any(|later| later.minutes() >= minutes as i64)
                {
                    minutes = capacity;
                }
                if minutes > capacity {
                    debug!(
                        target: "app::schedule::allocator",
                        task_id = %prioritized[next].task.id,
                        minutes,
                        capacity,
                        block = %block.label,
                        "task carried to next study block"
                    );
                    break;
                }

                let entry = &prioritized[next];
                entries.push(ScheduleEntry::Task(ScheduledItem {
                    task_id: entry.task.id.clone(),
                    title: entry.task.title.clone(),
                    start: cursor,
                    duration_minutes: minutes,
                    rationale: Some(rationale(entry, estimated, minutes)),
                }));
                cursor = schedule_utils::add_minutes(cursor, minutes as i64)?;
                capacity -= minutes;
                sessions += 1;
                placed_items += 1;
                next += 1;

                if next == total {
                    break;
                }

                let long_due = sessions >= self.settings.sessions_until_long_break;
                if long_due {
                    sessions = 0;
                }
                let (kind, length, activities): (BreakKind, u32, &[&str]) = if long_due {
                    (
                        BreakKind::Long,
                        self.settings.long_break_minutes,
                        &LONG_BREAK_ACTIVITIES[..],
                    )
                } else {
                    (
                        BreakKind::Short,
                        self.settings.short_break_minutes,
                        &SHORT_BREAK_ACTIVITIES[..],
                    )
                };

                if length > capacity {
                    break;
                }

                let activity = activities
                    .choose(&mut rng)
                    .map(|value| value.to_string())
                    .unwrap_or_else(|| "Rest".to_string());
                entries.push(ScheduleEntry::Break(BreakInsertion {
                    after_item: placed_items - 1,
                    start: cursor,
                    duration_minutes: length,
                    kind,
                    activity,
                }));
                cursor = schedule_utils::add_minutes(cursor, length as i64)?;
                capacity -= length;
            }

            if next == total {
                break;
            }
        }

        let unplaced: Vec<UnplacedTask> = prioritized[next..]
            .iter()
            .zip(durations[next..].iter())
            .map(|(entry, (_, minutes))| UnplacedTask {
                task_id: entry.task.id.clone(),
                title: entry.task.title.clone(),
                required_minutes: *minutes,
            })
            .collect();

        if !unplaced.is_empty() {
            info!(
                target: "app::schedule::allocator",
                unplaced = unplaced.len(),
                details = %json!(unplaced.iter().map(|task| &task.task_id).collect::<Vec<_>>()),
                "study capacity exhausted"
            );
        }
        debug!(
            target: "app::schedule::allocator",
            placed = placed_items,
            entries = entries.len(),
            "allocation finished"
        );

        Ok(Allocation { entries, unplaced })
    }
}

fn rationale(entry: &PrioritizedTask, estimated: u32, minutes: u32) -> String {
    let mut text = format!(
        "Priority score {:.2} ({} priority)",
        entry.score,
        entry.task.priority.as_str()
    );
    if minutes < estimated {
        text.push_str(&format!(
            "; capped from {estimated} to {minutes} minutes to fit a study block"
        ));
    }
    text
}
