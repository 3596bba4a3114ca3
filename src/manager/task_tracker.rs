use std::{
    collections::HashMap,
    sync::atomic::{AtomicU64, Ordering},
};

use log::debug;
use parking_lot::Mutex;

use crate::models::{
    record::Location,
    task::{FinishedTask, Task, TaskId, TaskStatus},
};

#[derive(Default)]
struct TaskSets {
    active: HashMap<TaskId, Task>,
    finished: Vec<FinishedTask>,
}

/// Registry of named in-flight operations.
///
/// Both sets live behind one lock, so a task leaves `active` and enters
/// `finished` in the same critical section.
#[derive(Default)]
pub struct TaskTracker {
    sets: Mutex<TaskSets>,
    next_seq: AtomicU64,
}

impl TaskTracker {
    pub fn new() -> Self {
        Self::default()
    }

    #[track_caller]
    pub fn start(&self, label: impl Into<String>) -> TaskId {
        self.start_at(label, Location::caller())
    }

    pub fn start_at(&self, label: impl Into<String>, location: Location) -> TaskId {
        let label = label.into();
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let id = TaskId::derive(&label, seq);
        let task = Task::new(id.clone(), label, location, seq);

        debug!("Task '{}' started: {}", id, task.label);
        self.sets.lock().active.insert(id.clone(), task);
        id
    }

    /// Move `id` to the finished set. Returns `false` when the task is not
    /// active, which makes a repeated `finish` a no-op.
    #[track_caller]
    pub fn finish(&self, id: &TaskId, message: Option<&str>, success: bool) -> bool {
        self.finish_at(id, message, success, Location::caller())
    }

    pub fn finish_at(
        &self,
        id: &TaskId,
        message: Option<&str>,
        success: bool,
        location: Location,
    ) -> bool {
        let mut sets = self.sets.lock();
        let Some(task) = sets.active.remove(id) else {
            return false;
        };

        let status = if success {
            TaskStatus::Completed
        } else {
            TaskStatus::Failed
        };
        sets.finished.push(FinishedTask {
            id: task.id,
            label: task.label,
            status,
            elapsed: task.started.elapsed(),
            message: message.map(str::to_string),
            location,
        });
        true
    }

    pub fn status(&self, id: &TaskId) -> Option<TaskStatus> {
        let sets = self.sets.lock();
        if sets.active.contains_key(id) {
            return Some(TaskStatus::Running);
        }
        sets.finished
            .iter()
            .find(|task| &task.id == id)
            .map(|task| task.status)
    }

    pub fn active_count(&self) -> usize {
        self.sets.lock().active.len()
    }

    /// Active tasks, oldest first.
    pub fn active(&self) -> Vec<Task> {
        let mut tasks: Vec<Task> = self.sets.lock().active.values().cloned().collect();
        tasks.sort_by_key(|task| task.seq);
        tasks
    }

    /// The oldest active task together with the number of active tasks.
    pub fn oldest_active(&self) -> Option<(Task, usize)> {
        let sets = self.sets.lock();
        let count = sets.active.len();
        sets.active
            .values()
            .min_by_key(|task| task.seq)
            .map(|task| (task.clone(), count))
    }

    /// Take every task finished since the last drain, in finish order.
    pub fn drain_finished(&self) -> Vec<FinishedTask> {
        std::mem::take(&mut self.sets.lock().finished)
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashSet, sync::Arc, thread};

    use super::*;

    #[test]
    fn concurrent_start_and_finish_lose_nothing() {
        let tracker = Arc::new(TaskTracker::new());
        let handles: Vec<_> = (0..16)
            .map(|i| {
                let tracker = Arc::clone(&tracker);
                thread::spawn(move || {
                    let id = tracker.start(format!("task-{}", i));
                    assert!(tracker.finish(&id, None, i % 2 == 0));
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let finished = tracker.drain_finished();
        let labels: HashSet<_> = finished.iter().map(|task| task.label.clone()).collect();
        let expected: HashSet<_> = (0..16).map(|i| format!("task-{}", i)).collect();
        assert_eq!(finished.len(), 16);
        assert_eq!(labels, expected);
        assert_eq!(tracker.active_count(), 0);
    }

    #[test]
    fn second_finish_is_a_noop() {
        let tracker = TaskTracker::new();
        let id = tracker.start("init");
        assert!(tracker.finish(&id, Some("ok"), true));
        assert!(!tracker.finish(&id, Some("again"), false));

        let finished = tracker.drain_finished();
        assert_eq!(finished.len(), 1);
        assert_eq!(finished[0].status, TaskStatus::Completed);
        assert_eq!(finished[0].message.as_deref(), Some("ok"));
    }

    #[test]
    fn unknown_id_is_ignored() {
        let tracker = TaskTracker::new();
        assert!(!tracker.finish(&TaskId::from("nope"), None, true));
        assert!(tracker.drain_finished().is_empty());
    }

    #[test]
    fn ids_are_unique_for_equal_labels() {
        let tracker = TaskTracker::new();
        let a = tracker.start("same");
        let b = tracker.start("same");
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 16);
    }

    #[test]
    fn oldest_active_follows_start_order() {
        let tracker = TaskTracker::new();
        let first = tracker.start("first");
        let _second = tracker.start("second");

        let (task, count) = tracker.oldest_active().unwrap();
        assert_eq!((task.label.as_str(), count), ("first", 2));

        tracker.finish(&first, None, false);
        let (task, count) = tracker.oldest_active().unwrap();
        assert_eq!((task.label.as_str(), count), ("second", 1));
        assert_eq!(tracker.status(&first), Some(TaskStatus::Failed));
    }

    #[test]
    fn start_records_call_site() {
        let tracker = TaskTracker::new();
        tracker.start("here");
        let task = &tracker.active()[0];
        assert!(task.location.file.ends_with("task_tracker.rs"));
    }
}
