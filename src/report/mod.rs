pub mod personal;
pub mod team;
pub mod types;

pub use personal::PersonalReportBuilder;
pub use team::aggregate;
pub use types::*;

use std::collections::BTreeMap;

use crate::date_util::{mean, percentage};
use crate::model::TaskStatus;

/// Counts over a list of task details.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Tally {
    pub total: u64,
    pub completed: u64,
    pub overdue: u64,
    pub late: u64,
    pub durations: Vec<f64>,
}

impl Tally {
    pub fn of(tasks: &[TaskDetail]) -> Self {
        let mut tally = Tally::default();
        for task in tasks {
            tally.total += 1;
            if task.status.is_completed() {
                tally.completed += 1;
            }
            if task.is_overdue {
                tally.overdue += 1;
            }
            if task.is_late {
                tally.late += 1;
            }
            if let Some(days) = task.duration_days {
                tally.durations.push(days as f64);
            }
        }
        tally
    }

    pub fn completion_percentage(&self) -> f64 {
        percentage(self.completed, self.total)
    }

    pub fn overdue_percentage(&self) -> f64 {
        percentage(self.overdue, self.total)
    }

    pub fn average_duration(&self) -> Option<f64> {
        mean(&self.durations)
    }
}

/// Status -> count with every status present, so merged maps line up.
pub(crate) fn empty_status_counts() -> BTreeMap<String, u64> {
    TaskStatus::ALL
        .iter()
        .map(|s| (s.as_str().to_string(), 0))
        .collect()
}
