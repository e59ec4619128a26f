use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;

use crate::models::{Task, TaskStatus};

/// Catch-up sweep run on every load of the task list.
///
/// Selects every pending task whose reminder time is strictly in the past and
/// that has not been reminded yet. There is no lateness bound.
pub fn overdue_sweep(tasks: &[Task], now: DateTime<Utc>) -> Vec<&Task> {
    tasks
        .iter()
        .filter(|task| task.is_pending() && !task.reminder_sent && task.reminder_time < now)
        .collect()
}

/// Due-now sweep run on every poll tick.
///
/// Selects pending, not yet reminded tasks with `0 <= now - reminder_time <= grace`.
/// A task that is later than `grace` is left to the next catch-up sweep.
pub fn due_now_sweep(tasks: &[Task], now: DateTime<Utc>, grace: Duration) -> Vec<&Task> {
    let grace = TimeDelta::from_std(grace).unwrap_or(TimeDelta::MAX);
    tasks
        .iter()
        .filter(|task| {
            if !task.is_pending() || task.reminder_sent {
                return false;
            }
            let elapsed = now - task.reminder_time;
            elapsed >= TimeDelta::zero() && elapsed <= grace
        })
        .collect()
}

pub fn is_overdue(task: &Task, now: DateTime<Utc>) -> bool {
    task.is_pending() && now > task.reminder_time
}

/// Short human countdown: `"2d 3h"`, `"4h 10m"`, `"7m"` or `"Overdue"`.
pub fn time_until_reminder(reminder_time: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let diff = (reminder_time - now).num_milliseconds();
    if diff < 0 {
        return "Overdue".to_string();
    }

    const MINUTE: i64 = 60 * 1000;
    const HOUR: i64 = 60 * MINUTE;
    const DAY: i64 = 24 * HOUR;

    let days = diff / DAY;
    let hours = (diff % DAY) / HOUR;
    let minutes = (diff % HOUR) / MINUTE;

    if days > 0 {
        format!("{days}d {hours}h")
    } else if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TaskSummary {
    pub total: usize,
    pub pending: usize,
    pub completed: usize,
    pub overdue: usize,
}

impl TaskSummary {
    pub fn of(tasks: &[Task], now: DateTime<Utc>) -> Self {
        let mut summary = TaskSummary {
            total: tasks.len(),
            ..Default::default()
        };
        for task in tasks {
            match task.status {
                TaskStatus::Pending => {
                    summary.pending += 1;
                    if is_overdue(task, now) {
                        summary.overdue += 1;
                    }
                }
                TaskStatus::Completed => summary.completed += 1,
            }
        }
        summary
    }
}
