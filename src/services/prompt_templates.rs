use chrono::NaiveDate;
use serde_json::{json, Value as JsonValue};
use tracing::warn;

use crate::error::{AppError, AppResult, GeneratorErrorCode};
use crate::models::settings::SchedulerConfig;
use crate::models::task::Task;
use crate::services::schedule_utils;

const DEFAULT_PROMPT_ESTIMATE_MINUTES: i64 = 30;

/// System prompt for single-day schedule generation.
pub fn day_planning_system_prompt() -> &'static str {
    r#"You are an AI study schedule optimizer for a productivity app. Create an optimal daily
study schedule from the tasks and user context in the request. Always respond with valid UTF-8
JSON and do not wrap the response in markdown code blocks. The schema is:
{
  "schedule": [{
     "task_id": string,
     "scheduled_time": "HH:MM",
     "duration": number,
     "reason": string
  }],
  "total_study_time": number,
  "insights": string[]
}
Rules:
1. Schedule tasks during preferred study times when possible.
2. Consider task priorities (high > medium > low) and urgency from due dates.
3. Respect estimated durations; each item lasts between 15 and 90 minutes.
4. Items must not overlap; leave short breaks between tasks.
5. Do not exceed 6-8 hours of total study time.
6. Group similar tasks together for better focus.
Only use task ids from the request. Return 2-3 insights."#
}

/// System prompt for spreading tasks over several days.
pub fn distribution_system_prompt() -> &'static str {
    r#"You are an expert study planner. Distribute the numbered tasks in the request across the
given number of days. Respond with JSON of the form {"days": [[0, 2], [1, 3], [], [4]]} where each
inner array lists the 0-based task indices for that day, in day order. Every index appears at most
once. Rules:
1. High priority tasks get the earliest days.
2. Respect due dates; never place a task after its due date.
3. Balance workload so each day has similar study time.
4. Group related tasks together when possible.
5. Leave buffer time for unexpected events.
Do not wrap the response in markdown code blocks."#
}

/// Build the user payload for a single-day plan request.
pub fn build_day_plan_payload(
    date: NaiveDate,
    tasks: &[Task],
    config: &SchedulerConfig,
    productivity_context: &str,
    peak_hours: &[u32],
) -> JsonValue {
    let task_entries: Vec<JsonValue> = tasks
        .iter()
        .map(|task| {
            json!({
                "id": task.id,
                "title": task.title,
                "description": task.description,
                "priority": task.priority.as_str(),
                "category": task.category.as_deref().unwrap_or("General"),
                "dueDate": task.due_date.map(|due| due.format("%Y-%m-%d").to_string()),
                "estimatedDuration": task.estimated_duration.unwrap_or(DEFAULT_PROMPT_ESTIMATE_MINUTES),
            })
        })
        .collect();

    let preferred: Vec<String> = config
        .preferred_times
        .iter()
        .map(|time| schedule_utils::format_hhmm(*time))
        .collect();

    json!({
        "operation": "planDay",
        "date": date.format("%Y-%m-%d").to_string(),
        "weekday": date.format("%A").to_string(),
        "tasks": task_entries,
        "context": {
            "preferredStudyTimes": preferred,
            "workSessionMinutes": config.work_duration_minutes,
            "breakMinutes": config.short_break_minutes,
            "dayWindow": {
                "start": schedule_utils::format_hhmm(config.day_window.start),
                "end": schedule_utils::format_hhmm(config.day_window.end),
            },
            "productivity": productivity_context,
            "peakEnergyHours": peak_hours,
        },
        "expectations": {
            "minDurationMinutes": 15,
            "maxDurationMinutes": 90,
            "timeFormat": "HH:MM",
            "maxInsights": 3
        }
    })
}

/// Build the user payload for a multi-day distribution request.
pub fn build_distribution_payload(start_date: NaiveDate, days: u32, tasks: &[Task]) -> JsonValue {
    let task_entries: Vec<JsonValue> = tasks
        .iter()
        .enumerate()
        .map(|(index, task)| {
            json!({
                "index": index,
                "title": task.title,
                "priority": task.priority.as_str(),
                "dueDate": task.due_date.map(|due| due.format("%Y-%m-%d").to_string()),
                "estimatedDuration": task.estimated_duration.unwrap_or(DEFAULT_PROMPT_ESTIMATE_MINUTES),
            })
        })
        .collect();

    json!({
        "operation": "distributeTasks",
        "startDate": start_date.format("%Y-%m-%d").to_string(),
        "days": days,
        "tasks": task_entries,
        "expectations": {
            "indexBase": 0,
            "maxDays": days,
            "uniqueIndices": true
        }
    })
}

/// JSON schema every day-plan response must satisfy.
pub fn day_plan_response_schema() -> JsonValue {
    json!({
        "type": "object",
        "required": ["schedule"],
        "properties": {
            "schedule": {
                "type": "array",
                "items": {
                    "type": "object",
                    "required": ["task_id", "scheduled_time", "duration"],
                    "properties": {
                        "task_id": {"type": ["string", "integer"]},
                        "scheduled_time": {"type": "string", "pattern": "^[0-9]{1,2}:[0-9]{2}$"},
                        "duration": {"type": "number"},
                        "reason": {"type": ["string", "null"]}
                    }
                }
            },
            "total_study_time": {"type": ["number", "null"]},
            "insights": {"type": "array", "items": {"type": "string"}}
        }
    })
}

/// JSON schema for a distribution response once unwrapped to its array form.
pub fn distribution_response_schema() -> JsonValue {
    json!({
        "type": "array",
        "items": {
            "type": "array",
            "items": {"type": "integer", "minimum": 0}
        }
    })
}

/// Validate a generator response, reporting failures as malformed responses.
pub fn validate_response(schema: &JsonValue, instance: &JsonValue, label: &str) -> AppResult<()> {
    let compiled = jsonschema::JSONSchema::compile(schema).map_err(|err| {
        AppError::other(format!("invalid {label} response schema: {err}"))
    })?;

    if let Err(validation_errors) = compiled.validate(instance) {
        let error_messages: Vec<String> = validation_errors
            .map(|e| {
                let path = e.instance_path.to_string();
                let path_display = if path.is_empty() {
                    "root".to_string()
                } else {
                    path
                };
                format!("{path_display}: {e}")
            })
            .collect();

        warn!(
            target: "app::generator",
            label,
            errors = error_messages.len(),
            "generator response failed schema validation"
        );

        return Err(AppError::generator_with_details(
            GeneratorErrorCode::InvalidResponse,
            format!("{label} response does not match the expected schema"),
            None,
            Some(json!({ "errors": error_messages })),
        ));
    }

    Ok(())
}
