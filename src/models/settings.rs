use std::path::Path;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{AppError, AppResult};

const ENV_GENERATOR_API_KEY: &str = "STUDY_PLANNER_GENERATOR_API_KEY";
const ENV_GENERATOR_BASE_URL: &str = "STUDY_PLANNER_GENERATOR_BASE_URL";
const ENV_GENERATOR_MODEL: &str = "STUDY_PLANNER_GENERATOR_MODEL";

const DEFAULT_GENERATOR_BASE_URL: &str = "https://api.deepseek.com";
const DEFAULT_GENERATOR_MODEL: &str = "deepseek-chat";
const DEFAULT_GENERATOR_TIMEOUT_SECS: u64 = 25;
const DEFAULT_SEED: u64 = 42;

/// Scheduling configuration handed to the orchestrator for each call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SchedulerConfig {
    pub work_duration_minutes: u32,
    pub short_break_minutes: u32,
    pub long_break_minutes: u32,
    pub sessions_until_long_break: u32,
    #[serde(with = "hhmm_list")]
    pub preferred_times: Vec<NaiveTime>,
    pub day_window: DayWindow,
    pub day_structure: DayStructureConfig,
    pub seed: u64,
    pub generator: GeneratorConfig,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct DayWindow {
    #[serde(with = "hhmm")]
    pub start: NaiveTime,
    #[serde(with = "hhmm")]
    pub end: NaiveTime,
}

/// Block durations (minutes) of the daily skeleton.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DayStructureConfig {
    pub morning_routine_minutes: u32,
    pub study_block_minutes: u32,
    pub transition_break_minutes: u32,
    pub lunch_minutes: u32,
    pub dinner_minutes: u32,
    pub min_wind_down_minutes: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GeneratorConfig {
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

/// Pomodoro cadence consumed by the slot allocator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PomodoroSettings {
    pub work_duration_minutes: u32,
    pub short_break_minutes: u32,
    pub long_break_minutes: u32,
    pub sessions_until_long_break: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            work_duration_minutes: 25,
            short_break_minutes: 5,
            long_break_minutes: 15,
            sessions_until_long_break: 4,
            preferred_times: vec![hm(9, 0), hm(14, 0), hm(19, 0)],
            day_window: DayWindow::default(),
            day_structure: DayStructureConfig::default(),
            seed: DEFAULT_SEED,
            generator: GeneratorConfig::default(),
        }
    }
}

impl Default for DayWindow {
    fn default() -> Self {
        Self {
            start: hm(8, 0),
            end: hm(20, 0),
        }
    }
}

impl Default for DayStructureConfig {
    fn default() -> Self {
        Self {
            morning_routine_minutes: 60,
            study_block_minutes: 90,
            transition_break_minutes: 30,
            lunch_minutes: 60,
            dinner_minutes: 60,
            min_wind_down_minutes: 30,
        }
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_GENERATOR_BASE_URL.to_string(),
            model: DEFAULT_GENERATOR_MODEL.to_string(),
            timeout_secs: DEFAULT_GENERATOR_TIMEOUT_SECS,
        }
    }
}

impl SchedulerConfig {
    pub fn from_yaml_str(raw: &str) -> AppResult<Self> {
        let config: SchedulerConfig = serde_yaml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a YAML file, then apply environment overrides.
    pub fn load(path: &Path) -> AppResult<Self> {
        info!(target: "app::config", path = %path.display(), "loading scheduler configuration");
        let raw = std::fs::read_to_string(path)?;
        let mut config: SchedulerConfig = serde_yaml::from_str(&raw)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn from_env() -> AppResult<Self> {
        let mut config = Self::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_GENERATOR_API_KEY) {
            let trimmed = value.trim();
            self.generator.api_key = if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            };
        }
        if let Some(value) = lookup(ENV_GENERATOR_BASE_URL) {
            self.generator.base_url = value.trim().to_string();
        }
        if let Some(value) = lookup(ENV_GENERATOR_MODEL) {
            self.generator.model = value.trim().to_string();
        }
        debug!(
            target: "app::config",
            generator_enabled = self.generator.is_enabled(),
            model = %self.generator.model,
            "configuration overrides applied"
        );
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.work_duration_minutes == 0 {
            return Err(AppError::config("work_duration_minutes must be positive"));
        }
        if self.short_break_minutes == 0 || self.long_break_minutes == 0 {
            return Err(AppError::config("break durations must be positive"));
        }
        if self.sessions_until_long_break == 0 {
            return Err(AppError::config("sessions_until_long_break must be at least 1"));
        }
        if self.generator.timeout_secs == 0 {
            return Err(AppError::config("generator.timeout_secs must be positive"));
        }
        self.day_structure.validate(&self.day_window)
    }

    pub fn pomodoro(&self) -> PomodoroSettings {
        PomodoroSettings {
            work_duration_minutes: self.work_duration_minutes,
            short_break_minutes: self.short_break_minutes,
            long_break_minutes: self.long_break_minutes,
            sessions_until_long_break: self.sessions_until_long_break,
        }
    }
}

impl DayWindow {
    pub fn minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }
}

impl DayStructureConfig {
    /// Minutes taken by every block except the open-ended wind-down.
    pub fn fixed_minutes(&self) -> u64 {
        u64::from(self.morning_routine_minutes)
            + u64::from(self.study_block_minutes) * 5
            + u64::from(self.transition_break_minutes) * 2
            + u64::from(self.lunch_minutes)
            + u64::from(self.dinner_minutes)
    }

    pub fn validate(&self, window: &DayWindow) -> AppResult<()> {
        if window.end <= window.start {
            return Err(AppError::validation(format!(
                "day window {}-{} is empty",
                window.start.format("%H:%M"),
                window.end.format("%H:%M")
            )));
        }

        let durations = [
            ("morning_routine_minutes", self.morning_routine_minutes),
            ("study_block_minutes", self.study_block_minutes),
            ("transition_break_minutes", self.transition_break_minutes),
            ("lunch_minutes", self.lunch_minutes),
            ("dinner_minutes", self.dinner_minutes),
            ("min_wind_down_minutes", self.min_wind_down_minutes),
        ];
        if let Some((name, _)) = durations.iter().find(|(_, minutes)| *minutes == 0) {
            return Err(AppError::validation(format!("{name} must be positive")));
        }

        let required = self.fixed_minutes() + u64::from(self.min_wind_down_minutes);
        if required > window.minutes().max(0) as u64 {
            return Err(AppError::validation(format!(
                "day structure needs {required} minutes but the window only has {}",
                window.minutes()
            )));
        }

        Ok(())
    }
}

impl GeneratorConfig {
    pub fn is_enabled(&self) -> bool {
        self.api_key
            .as_deref()
            .map(|key| !key.trim().is_empty())
            .unwrap_or(false)
    }
}

fn hm(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN)
}

mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(raw.trim(), "%H:%M").map_err(serde::de::Error::custom)
    }
}

mod hhmm_list {
    use chrono::NaiveTime;
    use serde::ser::SerializeSeq;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        times: &[NaiveTime],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(times.len()))?;
        for time in times {
            seq.serialize_element(&time.format("%H:%M").to_string())?;
        }
        seq.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<NaiveTime>, D::Error> {
        let raw = Vec::<String>::deserialize(deserializer)?;
        raw.iter()
            .map(|value| {
                NaiveTime::parse_from_str(value.trim(), "%H:%M").map_err(serde::de::Error::custom)
            })
            .collect()
    }
}
