use crate::model::{Status, Task};
use serde::Serialize;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub total: usize,
    pub todo: usize,
    pub doing: usize,
    pub done: usize,
    /// `done / total` rounded to the nearest percent, 0 for an empty store.
    pub completion_percent: u8,
}

impl Stats {
    pub fn from_tasks(tasks: &[Task]) -> Self {
        let count = |status: Status| tasks.iter().filter(|task| task.status == status).count();
        let total = tasks.len();
        let done = tasks.iter().filter(|task| task.is_done()).count();

        Self {
            total,
            todo: count(Status::Todo),
            doing: count(Status::Doing),
            done,
            completion_percent: completion_percent(done, total),
        }
    }
}

fn completion_percent(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let rounded = (done * 100 + total / 2) / total;
    u8::try_from(rounded).unwrap_or(100)
}
