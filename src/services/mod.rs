pub mod day_structure;
pub mod duration_estimator;
pub mod generator;
pub mod orchestrator;
pub mod productivity_insights;
pub mod prompt_templates;
pub mod schedule_assembler;
pub mod schedule_utils;
pub mod slot_allocator;
pub mod task_prioritizer;
