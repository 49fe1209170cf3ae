use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::json;

use crate::error::{AppError, AppResult};

pub fn parse_hhmm(value: &str) -> AppResult<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M").map_err(|err| {
        AppError::validation_with_details(
            "invalid HH:MM time",
            json!({"value": value, "error": err.to_string()}),
        )
    })
}

pub fn format_hhmm(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

pub fn at(date: NaiveDate, time: NaiveTime) -> NaiveDateTime {
    date.and_time(time)
}

pub fn add_minutes(dt: NaiveDateTime, minutes: i64) -> AppResult<NaiveDateTime> {
    dt.checked_add_signed(Duration::minutes(minutes))
        .ok_or_else(|| AppError::validation("time arithmetic out of range"))
}

pub fn overlaps(
    a_start: NaiveDateTime,
    a_end: NaiveDateTime,
    b_start: NaiveDateTime,
    b_end: NaiveDateTime,
) -> bool {
    a_start < b_end && b_start < a_end
}

/// Round to the nearest multiple of `step`, halves rounding up.
pub fn round_to_step(minutes: f64, step: u32) -> u32 {
    if step == 0 {
        return minutes.round().max(0.0) as u32;
    }
    let step = step as f64;
    ((minutes / step).round() * step).max(0.0) as u32
}
