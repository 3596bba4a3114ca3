pub mod logger;
pub mod task_tracker;
