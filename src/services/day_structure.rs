//! Fixed-shape day skeleton that the slot allocator packs tasks into.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use tracing::debug;

use crate::error::AppResult;
use crate::models::schedule::{BlockKind, TimeBlock};
use crate::models::settings::{DayStructureConfig, DayWindow, SchedulerConfig};
use crate::services::schedule_utils;

#[derive(Debug, Clone)]
pub struct DailyStructureBuilder {
    window: DayWindow,
    table: DayStructureConfig,
}

impl DailyStructureBuilder {
    pub fn new(window: DayWindow, table: DayStructureConfig) -> AppResult<Self> {
        table.validate(&window)?;
        Ok(Self { window, table })
    }

    pub fn from_config(config: &SchedulerConfig) -> AppResult<Self> {
        Self::new(config.day_window, config.day_structure.clone())
    }

    /// Blocks are contiguous from the window start; wind-down absorbs the
    /// remainder up to the window end.
    pub fn build(&self, date: NaiveDate) -> Vec<TimeBlock> {
        let t = &self.table;
        let layout: [(&str, BlockKind, u32); 10] = [
            ("Morning routine", BlockKind::MorningRoutine, t.morning_routine_minutes),
            ("Morning study 1", BlockKind::Study, t.study_block_minutes),
            ("Morning break", BlockKind::Break, t.transition_break_minutes),
            ("Morning study 2", BlockKind::Study, t.study_block_minutes),
            ("Lunch", BlockKind::Meal, t.lunch_minutes),
            ("Afternoon study 1", BlockKind::Study, t.study_block_minutes),
            ("Afternoon break", BlockKind::Break, t.transition_break_minutes),
            ("Afternoon study 2", BlockKind::Study, t.study_block_minutes),
            ("Dinner", BlockKind::Meal, t.dinner_minutes),
            ("Evening study", BlockKind::Study, t.study_block_minutes),
        ];

        let mut blocks = Vec::with_capacity(layout.len() + 1);
        let mut cursor: NaiveDateTime = schedule_utils::at(date, self.window.start);
        for (label, kind, minutes) in layout {
            let end = cursor + Duration::minutes(minutes as i64);
            blocks.push(TimeBlock {
                label: label.to_string(),
                kind,
                start: cursor,
                end,
            });
            cursor = end;
        }

        blocks.push(TimeBlock {
            label: "Wind down".to_string(),
            kind: BlockKind::WindDown,
            start: cursor,
            end: schedule_utils::at(date, self.window.end),
        });

        debug!(target: "app::schedule::structure", %date, blocks = blocks.len(), "day skeleton built");
        blocks
    }
}
