//! Reminder detection and notification delivery.
//!
//! Tasks are evaluated by two policies: a catch-up sweep whenever the task
//! list is (re)loaded, and a windowed due-now sweep on a fixed cadence. Each
//! selected task is flagged locally before it is handed to the
//! [`NotificationDispatcher`], so it fires at most once per session.

pub mod audio;
pub mod channels;
pub mod dispatcher;
pub mod evaluator;
pub mod scheduler;

use chrono::{DateTime, Utc};

pub use audio::{AlertSound, AudioChannel, SoundFactory};
pub use channels::{AlertDialog, Banner, BannerBoard, DesktopNotification, DesktopNotifier, Permission};
pub use dispatcher::NotificationDispatcher;
pub use evaluator::{TaskSummary, due_now_sweep, is_overdue, overdue_sweep, time_until_reminder};
pub use scheduler::{Diagnostics, ReminderEngine, UpcomingReminder};

/// Wall-clock source for evaluation.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
