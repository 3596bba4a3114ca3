pub mod level;
pub mod message;
pub mod process;
pub mod record;
pub mod task;
