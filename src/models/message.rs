use crossbeam_channel::Sender;

use super::{level::Level, record::LogRecord};
use crate::config::Visibility;

/// Everything that travels through the intake queue to the consumer.
#[derive(Debug)]
pub enum DispatchMessage {
    Record(LogRecord),
    SetConsoleLevel(Level),
    SetVisibility(Visibility),
    /// Acknowledged once every earlier message has been written out.
    Flush(Sender<()>),
}
