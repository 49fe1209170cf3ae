pub mod goal;
pub mod insights;
pub mod schedule;
pub mod settings;
pub mod task;
