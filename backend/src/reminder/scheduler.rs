use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::dispatcher::NotificationDispatcher;
use super::evaluator::{TaskSummary, due_now_sweep, overdue_sweep};
use super::Clock;
use crate::config::ReminderConfig;
use crate::error::StoreError;
use crate::models::{NewTaskRequest, Priority, Task, TaskStatus, UpdateTaskRequest};
use crate::store::TaskStore;

/// Snapshot of the reminder pipeline for status displays.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostics {
    pub summary: TaskSummary,
    pub audio_enabled: bool,
    /// Whether the due-now timer is armed.
    pub polling: bool,
    pub reminders_sent: usize,
    pub upcoming: Vec<UpcomingReminder>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpcomingReminder {
    pub id: String,
    pub title: String,
    /// Negative once due.
    pub seconds_until_due: i64,
    pub reminder_sent: bool,
}

enum Command {
    Diagnostics(oneshot::Sender<Diagnostics>),
    Shutdown,
}

/// Handle to the background reminder loop.
///
/// The loop owns the in-memory task list. Whole-list replacements arrive
/// through [`ReminderEngine::load`] (and [`ReminderEngine::refresh`]); each
/// one re-arms the poll timer and runs the catch-up sweep once.
pub struct ReminderEngine {
    list_tx: watch::Sender<Arc<Vec<Task>>>,
    cmd_tx: mpsc::Sender<Command>,
    dispatcher: Arc<NotificationDispatcher>,
    store: Arc<dyn TaskStore>,
    clock: Arc<dyn Clock>,
    handle: JoinHandle<()>,
}

impl ReminderEngine {
    /// Spawns the reminder loop. Must be called from within a tokio runtime.
    pub fn start(
        config: ReminderConfig,
        dispatcher: Arc<NotificationDispatcher>,
        store: Arc<dyn TaskStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (list_tx, list_rx) = watch::channel(Arc::new(Vec::new()));
        let (cmd_tx, cmd_rx) = mpsc::channel(16);

        let reminder_loop = ReminderLoop {
            tasks: Vec::new(),
            sent: HashSet::new(),
            dispatcher: dispatcher.clone(),
            clock: clock.clone(),
            config,
        };
        let handle = tokio::spawn(reminder_loop.run(list_rx, cmd_rx));

        Self {
            list_tx,
            cmd_tx,
            dispatcher,
            store,
            clock,
            handle,
        }
    }

    /// Replaces the in-memory task list.
    pub fn load(&self, tasks: Vec<Task>) {
        self.list_tx.send_replace(Arc::new(tasks));
    }

    /// Fetches the task list from the store and loads it.
    ///
    /// A rejected credential empties the list so nothing is evaluated. Any
    /// other failure keeps the last loaded list.
    pub async fn refresh(&self) -> Result<usize, StoreError> {
        match self.store.list_tasks().await {
            Ok(tasks) => {
                let count = tasks.len();
                debug!("loaded {} tasks", count);
                self.load(tasks);
                Ok(count)
            }
            Err(e) if e.is_unauthorized() => {
                warn!("task store rejected credentials; reminders paused");
                self.load(Vec::new());
                Err(e)
            }
            Err(e) => {
                warn!("Error fetching tasks: {}", e);
                Err(e)
            }
        }
    }

    /// User-initiated create. Counts as an audio unlock gesture.
    pub async fn create_task(&self, req: NewTaskRequest) -> Result<Task, StoreError> {
        self.enable_audio().await;
        let task = self.store.create_task(&req).await?;
        self.reload_after_change().await;
        Ok(task)
    }

    pub async fn update_task(&self, id: &str, req: UpdateTaskRequest) -> Result<Task, StoreError> {
        let task = self.store.update_task(id, &req).await?;
        self.reload_after_change().await;
        Ok(task)
    }

    pub async fn complete_task(&self, id: &str) -> Result<Task, StoreError> {
        self.update_task(
            id,
            UpdateTaskRequest {
                status: Some(TaskStatus::Completed),
                ..Default::default()
            },
        )
        .await
    }

    pub async fn delete_task(&self, id: &str) -> Result<(), StoreError> {
        self.store.delete_task(id).await?;
        self.reload_after_change().await;
        Ok(())
    }

    async fn reload_after_change(&self) {
        // refresh already logs
        let _ = self.refresh().await;
    }

    /// Unlocks the audio channel from a user interaction.
    pub async fn enable_audio(&self) -> bool {
        self.dispatcher.audio().unlock().await
    }

    /// Fires every channel for a synthetic task. Nothing is persisted.
    pub async fn test_notification(&self) {
        self.enable_audio().await;
        let now = self.clock.now();
        let task = Task {
            id: "test-notification".to_string(),
            owner_id: String::new(),
            title: "Test Notification".to_string(),
            description: "This is a test notification".to_string(),
            priority: Priority::Medium,
            status: TaskStatus::Pending,
            reminder_time: now,
            created_at: now,
            reminder_sent: false,
        };
        self.dispatcher.alert_channels(&task);
    }

    pub async fn diagnostics(&self) -> Option<Diagnostics> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx.send(Command::Diagnostics(tx)).await.ok()?;
        rx.await.ok()
    }

    pub fn dispatcher(&self) -> &Arc<NotificationDispatcher> {
        &self.dispatcher
    }

    pub async fn shutdown(self) {
        let _ = self.cmd_tx.send(Command::Shutdown).await;
        if let Err(e) = self.handle.await {
            warn!("reminder loop ended abnormally: {}", e);
        }
    }
}

struct ReminderLoop {
    tasks: Vec<Task>,
    /// Ids reminded this session; re-applied onto every loaded list.
    sent: HashSet<String>,
    dispatcher: Arc<NotificationDispatcher>,
    clock: Arc<dyn Clock>,
    config: ReminderConfig,
}

impl ReminderLoop {
    async fn run(
        mut self,
        mut list_rx: watch::Receiver<Arc<Vec<Task>>>,
        mut cmd_rx: mpsc::Receiver<Command>,
    ) {
        info!(
            "Starting reminder loop (poll: {:?}, grace: {:?})",
            self.config.poll_interval, self.config.grace_window
        );
        let mut ticker: Option<Interval> = None;

        loop {
            tokio::select! {
                biased;

                changed = list_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let list = list_rx.borrow_and_update().clone();
                    self.replace(&list);

                    ticker = if self.tasks.is_empty() {
                        debug!("no tasks loaded; poll timer stopped");
                        None
                    } else {
                        debug!("poll timer armed for {} tasks", self.tasks.len());
                        Some(poll_timer(self.config.poll_interval))
                    };

                    self.catch_up();
                }
                _ = next_tick(&mut ticker) => {
                    self.poll();
                }
                cmd = cmd_rx.recv() => match cmd {
                    Some(Command::Diagnostics(reply)) => {
                        let _ = reply.send(self.diagnostics(ticker.is_some()));
                    }
                    Some(Command::Shutdown) | None => break,
                },
            }
        }

        info!("reminder loop stopped");
    }

    fn replace(&mut self, list: &[Task]) {
        self.tasks = list.to_vec();
        for task in &mut self.tasks {
            if self.sent.contains(&task.id) {
                task.reminder_sent = true;
            }
        }
    }

    fn catch_up(&mut self) {
        let now = self.clock.now();
        let due: Vec<String> = overdue_sweep(&self.tasks, now)
            .into_iter()
            .map(|t| t.id.clone())
            .collect();
        if !due.is_empty() {
            info!("Found {} overdue tasks", due.len());
        }
        self.fire(&due);
    }

    fn poll(&mut self) {
        let now = self.clock.now();
        let due: Vec<String> = due_now_sweep(&self.tasks, now, self.config.grace_window)
            .into_iter()
            .map(|t| t.id.clone())
            .collect();
        debug!("reminder check: {} due of {} tasks", due.len(), self.tasks.len());
        self.fire(&due);
    }

    fn fire(&mut self, ids: &[String]) {
        for id in ids {
            let Some(task) = self.tasks.iter_mut().find(|t| &t.id == id) else {
                continue;
            };
            task.reminder_sent = true;
            self.sent.insert(id.clone());
            let task = task.clone();
            self.dispatcher.dispatch(&task);
        }
    }

    fn diagnostics(&self, polling: bool) -> Diagnostics {
        let now = self.clock.now();
        let upcoming = self
            .tasks
            .iter()
            .filter(|t| t.is_pending())
            .map(|t| UpcomingReminder {
                id: t.id.clone(),
                title: t.title.clone(),
                seconds_until_due: (t.reminder_time - now).num_seconds(),
                reminder_sent: t.reminder_sent,
            })
            .collect();

        Diagnostics {
            summary: TaskSummary::of(&self.tasks, now),
            audio_enabled: self.dispatcher.audio().is_enabled(),
            polling,
            reminders_sent: self.sent.len(),
            upcoming,
        }
    }
}

fn poll_timer(period: Duration) -> Interval {
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}
