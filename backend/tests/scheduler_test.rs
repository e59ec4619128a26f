use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use sqlx::sqlite::SqlitePoolOptions;
use taskmaster::config::ReminderConfig;
use taskmaster::error::{AudioError, NotifyError, StoreError};
use taskmaster::models::{NewTaskRequest, Priority, Task, TaskStatus, UpdateTaskRequest};
use taskmaster::reminder::{
    AlertDialog, AlertSound, AudioChannel, BannerBoard, Clock, DesktopNotification,
    DesktopNotifier, NotificationDispatcher, Permission, ReminderEngine, SoundFactory,
    SystemClock,
};
use taskmaster::store::{SqliteTaskStore, TaskStore};

struct ManualClock(Mutex<DateTime<Utc>>);

impl ManualClock {
    fn advance(&self, secs: i64) {
        let mut now = self.0.lock().unwrap();
        *now += TimeDelta::seconds(secs);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}

struct SilentSound;

#[async_trait]
impl AlertSound for SilentSound {
    async fn play(&self) -> Result<(), AudioError> {
        Ok(())
    }
    fn pause(&self) {}
    fn rewind(&self) {}
}

struct SilentFactory;

impl SoundFactory for SilentFactory {
    fn create(&self) -> Result<Arc<dyn AlertSound>, AudioError> {
        Ok(Arc::new(SilentSound))
    }
}

struct DeniedDesktop;

#[async_trait]
impl DesktopNotifier for DeniedDesktop {
    fn permission(&self) -> Permission {
        Permission::Denied
    }
    async fn request_permission(&self) -> Permission {
        Permission::Denied
    }
    fn notify(&self, _notification: &DesktopNotification) -> Result<(), NotifyError> {
        Ok(())
    }
}

#[derive(Default)]
struct RecordingAlert {
    messages: Mutex<Vec<String>>,
}

impl RecordingAlert {
    fn count(&self) -> usize {
        self.messages.lock().unwrap().len()
    }
}

impl AlertDialog for RecordingAlert {
    fn alert(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_string());
    }
}

#[derive(Default)]
struct MemoryStore {
    tasks: Mutex<Vec<Task>>,
    marked: Mutex<Vec<String>>,
    fail_marks: AtomicBool,
    fail_list: AtomicBool,
    reject_auth: AtomicBool,
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn list_tasks(&self) -> Result<Vec<Task>, StoreError> {
        if self.reject_auth.load(Ordering::SeqCst) {
            return Err(StoreError::Unauthorized);
        }
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(StoreError::Status {
                status: 503,
                body: "unavailable".to_string(),
            });
        }
        Ok(self.tasks.lock().unwrap().clone())
    }

    async fn create_task(&self, req: &NewTaskRequest) -> Result<Task, StoreError> {
        let task = Task {
            id: format!("t-{}", self.tasks.lock().unwrap().len() + 1),
            owner_id: "alice".to_string(),
            title: req.title.clone(),
            description: req.description.clone().unwrap_or_default(),
            priority: req.priority.unwrap_or_default(),
            status: TaskStatus::Pending,
            reminder_time: req.reminder_time,
            created_at: Utc::now(),
            reminder_sent: false,
        };
        self.tasks.lock().unwrap().push(task.clone());
        Ok(task)
    }

    async fn update_task(&self, id: &str, req: &UpdateTaskRequest) -> Result<Task, StoreError> {
        let mut tasks = self.tasks.lock().unwrap();
        let task = tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        if let Some(title) = &req.title {
            task.title = title.clone();
        }
        if let Some(status) = req.status {
            task.status = status;
        }
        if let Some(reminder_time) = req.reminder_time {
            task.reminder_time = reminder_time;
        }
        Ok(task.clone())
    }

    async fn delete_task(&self, id: &str) -> Result<(), StoreError> {
        self.tasks.lock().unwrap().retain(|t| t.id != id);
        Ok(())
    }

    async fn mark_reminder_sent(&self, id: &str) -> Result<(), StoreError> {
        self.marked.lock().unwrap().push(id.to_string());
        if self.fail_marks.load(Ordering::SeqCst) {
            return Err(StoreError::Status {
                status: 500,
                body: "Internal server error".to_string(),
            });
        }
        if let Some(task) = self.tasks.lock().unwrap().iter_mut().find(|t| t.id == id) {
            task.reminder_sent = true;
        }
        Ok(())
    }
}

struct Harness {
    engine: ReminderEngine,
    clock: Arc<ManualClock>,
    alert: Arc<RecordingAlert>,
    store: Arc<MemoryStore>,
}

impl Harness {
    fn start() -> Self {
        let clock = Arc::new(ManualClock(Mutex::new(
            DateTime::parse_from_rfc3339("2026-05-01T12:00:00Z")
                .expect("valid timestamp")
                .with_timezone(&Utc),
        )));
        let alert = Arc::new(RecordingAlert::default());
        let store = Arc::new(MemoryStore::default());

        let config = ReminderConfig::default();
        let dispatcher = Arc::new(NotificationDispatcher::new(
            Arc::new(AudioChannel::new(Arc::new(SilentFactory))),
            BannerBoard::new(config.banner_ttl),
            Arc::new(DeniedDesktop),
            alert.clone(),
            store.clone(),
        ));
        let engine = ReminderEngine::start(config, dispatcher, store.clone(), clock.clone());

        Self {
            engine,
            clock,
            alert,
            store,
        }
    }

    fn task(&self, id: &str, offset_secs: i64) -> Task {
        let now = self.clock.now();
        Task {
            id: id.to_string(),
            owner_id: "alice".to_string(),
            title: format!("Task {id}"),
            description: String::new(),
            priority: Priority::Medium,
            status: TaskStatus::Pending,
            reminder_time: now + TimeDelta::seconds(offset_secs),
            created_at: now - TimeDelta::hours(1),
            reminder_sent: false,
        }
    }

    async fn load(&self, tasks: Vec<Task>) {
        self.engine.load(tasks);
        self.sync().await;
    }

    /// Moves wall clock and tokio time forward together.
    async fn step(&self, secs: u64) {
        self.clock.advance(secs as i64);
        tokio::time::advance(Duration::from_secs(secs)).await;
        self.sync().await;
    }

    async fn sync(&self) {
        tokio::time::sleep(Duration::from_millis(1)).await;
        self.engine.diagnostics().await.expect("loop running");
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    fn sent_flag(&self, id: &str) -> bool {
        self.store
            .tasks
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.id == id)
            .map(|t| t.reminder_sent)
            .unwrap_or(false)
    }
}

#[tokio::test(start_paused = true)]
async fn test_task_due_between_ticks_fires_once() {
    let h = Harness::start();
    let task = h.task("a", 3);
    h.store.tasks.lock().unwrap().push(task.clone());
    h.load(vec![task]).await;
    assert_eq!(h.alert.count(), 0);

    // reminder time is now 2s in the past
    h.step(5).await;
    assert_eq!(h.alert.count(), 1);
    assert_eq!(*h.store.marked.lock().unwrap(), vec!["a".to_string()]);
    assert!(h.sent_flag("a"));

    let diag = h.engine.diagnostics().await.expect("loop running");
    assert!(diag.upcoming[0].reminder_sent);
    assert_eq!(diag.reminders_sent, 1);

    for _ in 0..20 {
        h.step(5).await;
    }
    assert_eq!(h.alert.count(), 1);
    assert_eq!(h.store.marked.lock().unwrap().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_stale_task_fires_from_catch_up_only() {
    let h = Harness::start();
    let task = h.task("stale", -400);

    h.load(vec![task]).await;
    assert_eq!(h.alert.count(), 1);
    assert!(h.alert.messages.lock().unwrap()[0].contains("Task stale"));

    for _ in 0..4 {
        h.step(5).await;
    }
    assert_eq!(h.alert.count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_future_task_waits_for_its_time() {
    let h = Harness::start();
    h.load(vec![h.task("soon", 60)]).await;

    for _ in 0..11 {
        h.step(5).await;
    }
    assert_eq!(h.alert.count(), 0);

    h.step(5).await;
    assert_eq!(h.alert.count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_already_sent_task_never_fires() {
    let h = Harness::start();
    let mut task = h.task("done", -30);
    task.reminder_sent = true;
    h.store.tasks.lock().unwrap().push(task.clone());

    h.load(vec![task]).await;
    for _ in 0..10 {
        h.step(5).await;
    }
    h.engine.refresh().await.expect("refresh");
    h.sync().await;

    assert_eq!(h.alert.count(), 0);
    assert!(h.store.marked.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_completed_task_never_fires() {
    let h = Harness::start();
    let mut task = h.task("finished", -2);
    task.status = TaskStatus::Completed;

    h.load(vec![task]).await;
    h.step(5).await;

    assert_eq!(h.alert.count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_local_flag_survives_failed_persistence_and_reload() {
    let h = Harness::start();
    h.store.fail_marks.store(true, Ordering::SeqCst);
    h.store.tasks.lock().unwrap().push(h.task("flaky", -10));

    h.engine.refresh().await.expect("refresh");
    h.sync().await;
    assert_eq!(h.alert.count(), 1);
    assert!(!h.sent_flag("flaky"));

    // the store still says reminder_sent = false
    h.engine.refresh().await.expect("refresh");
    h.sync().await;
    h.step(5).await;

    assert_eq!(h.alert.count(), 1);
    assert_eq!(h.store.marked.lock().unwrap().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_failed_refresh_keeps_last_list() {
    let h = Harness::start();
    h.store.tasks.lock().unwrap().push(h.task("later", 20));
    h.engine.refresh().await.expect("refresh");
    h.sync().await;

    h.store.fail_list.store(true, Ordering::SeqCst);
    assert!(h.engine.refresh().await.is_err());

    let diag = h.engine.diagnostics().await.expect("loop running");
    assert_eq!(diag.summary.total, 1);
    assert!(diag.polling);

    for _ in 0..4 {
        h.step(5).await;
    }
    assert_eq!(h.alert.count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_rejected_credentials_stop_evaluation() {
    let h = Harness::start();
    h.store.tasks.lock().unwrap().push(h.task("later", 20));
    h.engine.refresh().await.expect("refresh");
    h.sync().await;

    h.store.reject_auth.store(true, Ordering::SeqCst);
    let err = h.engine.refresh().await.expect_err("credentials rejected");
    assert!(err.is_unauthorized());
    h.sync().await;

    let diag = h.engine.diagnostics().await.expect("loop running");
    assert_eq!(diag.summary.total, 0);
    assert!(!diag.polling);

    for _ in 0..6 {
        h.step(5).await;
    }
    assert_eq!(h.alert.count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_create_and_complete_reload_the_list() {
    let h = Harness::start();

    let created = h
        .engine
        .create_task(NewTaskRequest {
            title: "Stretch".to_string(),
            description: None,
            priority: Some(Priority::Low),
            reminder_time: h.clock.now() + TimeDelta::seconds(30),
        })
        .await
        .expect("create");
    h.sync().await;

    let diag = h.engine.diagnostics().await.expect("loop running");
    assert_eq!(diag.summary.pending, 1);
    assert!(diag.audio_enabled);

    h.engine.complete_task(&created.id).await.expect("complete");
    h.sync().await;

    for _ in 0..8 {
        h.step(5).await;
    }
    assert_eq!(h.alert.count(), 0);

    let diag = h.engine.diagnostics().await.expect("loop running");
    assert_eq!(diag.summary.completed, 1);
}

#[tokio::test(start_paused = true)]
async fn test_notification_self_test_does_not_persist() {
    let h = Harness::start();

    h.engine.test_notification().await;
    h.sync().await;

    assert_eq!(h.alert.count(), 1);
    assert!(h.alert.messages.lock().unwrap()[0].contains("Test Notification"));
    assert!(h.store.marked.lock().unwrap().is_empty());
    assert_eq!(
        h.engine.dispatcher().banners().current().map(|b| b.task_id),
        Some("test-notification".to_string())
    );
}

#[tokio::test(start_paused = true)]
async fn test_banner_dismissed_after_ten_seconds() {
    let h = Harness::start();
    h.load(vec![h.task("ring", -1)]).await;
    assert!(h.engine.dispatcher().banners().current().is_some());

    h.step(5).await;
    assert!(h.engine.dispatcher().banners().current().is_some());

    h.step(5).await;
    assert!(h.engine.dispatcher().banners().current().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_empty_list_disarms_timer() {
    let h = Harness::start();
    h.load(vec![h.task("x", 100)]).await;
    assert!(h.engine.diagnostics().await.expect("loop").polling);

    h.load(Vec::new()).await;
    assert!(!h.engine.diagnostics().await.expect("loop").polling);

    h.engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_rescheduled_task_fires_once_in_new_window() {
    let h = Harness::start();
    h.store.tasks.lock().unwrap().push(h.task("dentist", 3_600));
    h.engine.refresh().await.expect("refresh");
    h.sync().await;

    h.step(5).await;
    assert_eq!(h.alert.count(), 0);

    let moved = h
        .engine
        .update_task(
            "dentist",
            UpdateTaskRequest {
                reminder_time: Some(h.clock.now() + TimeDelta::seconds(2)),
                ..Default::default()
            },
        )
        .await
        .expect("update");
    assert_eq!(moved.reminder_time, h.clock.now() + TimeDelta::seconds(2));
    h.sync().await;

    h.step(5).await;
    assert_eq!(h.alert.count(), 1);

    for _ in 0..10 {
        h.step(5).await;
    }
    assert_eq!(h.alert.count(), 1);
    assert_eq!(*h.store.marked.lock().unwrap(), vec!["dentist".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_deleted_task_drops_out_and_never_fires() {
    let h = Harness::start();
    h.store.tasks.lock().unwrap().push(h.task("gone", 10));
    h.store.tasks.lock().unwrap().push(h.task("kept", 3_600));
    h.engine.refresh().await.expect("refresh");
    h.sync().await;

    h.engine.delete_task("gone").await.expect("delete");
    h.sync().await;

    let diag = h.engine.diagnostics().await.expect("loop running");
    assert_eq!(diag.summary.total, 1);
    assert!(diag.upcoming.iter().all(|u| u.id != "gone"));

    for _ in 0..6 {
        h.step(5).await;
    }
    assert_eq!(h.alert.count(), 0);
    assert!(h.store.marked.lock().unwrap().is_empty());
}

// SQLite-backed engine runs on real time; sqlx's worker thread does not
// cooperate with a paused clock.
async fn sqlite_engine() -> (ReminderEngine, Arc<RecordingAlert>, sqlx::SqlitePool) {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create database");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    let store: Arc<dyn TaskStore> = Arc::new(SqliteTaskStore::new(pool.clone(), "alice"));
    let alert = Arc::new(RecordingAlert::default());
    let config = ReminderConfig {
        poll_interval: Duration::from_millis(20),
        ..ReminderConfig::default()
    };
    let dispatcher = Arc::new(NotificationDispatcher::new(
        Arc::new(AudioChannel::new(Arc::new(SilentFactory))),
        BannerBoard::new(config.banner_ttl),
        Arc::new(DeniedDesktop),
        alert.clone(),
        store.clone(),
    ));
    let engine = ReminderEngine::start(config, dispatcher, store, Arc::new(SystemClock));
    (engine, alert, pool)
}

async fn stored_flag(pool: &sqlx::SqlitePool, id: &str) -> bool {
    sqlx::query_scalar::<_, bool>("SELECT reminder_sent FROM tasks WHERE id = ?")
        .bind(id)
        .fetch_one(pool)
        .await
        .expect("task row")
}

async fn wait_for_flag(pool: &sqlx::SqlitePool, id: &str) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while !stored_flag(pool, id).await {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("reminder_sent was never persisted");
}

#[tokio::test]
async fn test_sqlite_overdue_task_is_reminded_and_persisted() {
    let (engine, alert, pool) = sqlite_engine().await;

    let task = engine
        .create_task(NewTaskRequest {
            title: "Water plants".to_string(),
            description: Some("Balcony too".to_string()),
            priority: None,
            reminder_time: Utc::now() - TimeDelta::minutes(30),
        })
        .await
        .expect("create");

    wait_for_flag(&pool, &task.id).await;
    assert_eq!(alert.count(), 1);
    assert!(alert.messages.lock().unwrap()[0].contains("Balcony too"));

    engine.refresh().await.expect("refresh");
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(alert.count(), 1);

    engine.shutdown().await;
}

#[tokio::test]
async fn test_sqlite_update_delete_and_reopen() {
    let (engine, alert, pool) = sqlite_engine().await;

    let later = engine
        .create_task(NewTaskRequest {
            title: "Call bank".to_string(),
            description: None,
            priority: None,
            reminder_time: Utc::now() + TimeDelta::hours(1),
        })
        .await
        .expect("create");
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(alert.count(), 0);

    engine
        .update_task(
            &later.id,
            UpdateTaskRequest {
                reminder_time: Some(Utc::now()),
                ..Default::default()
            },
        )
        .await
        .expect("reschedule");
    wait_for_flag(&pool, &later.id).await;
    assert_eq!(alert.count(), 1);

    engine.complete_task(&later.id).await.expect("complete");
    let err = engine
        .update_task(
            &later.id,
            UpdateTaskRequest {
                status: Some(TaskStatus::Pending),
                ..Default::default()
            },
        )
        .await
        .expect_err("completed is terminal");
    assert_eq!(err.to_string(), "rejected: Completed tasks cannot be reopened");

    engine.delete_task(&later.id).await.expect("delete");
    let diag = engine.diagnostics().await.expect("loop running");
    assert_eq!(diag.summary.total, 0);
    assert!(!diag.polling);

    engine.shutdown().await;
}
