//! Terminal reminder agent.
//!
//! Keeps the owner's task list in memory, refreshes it from the TaskMaster
//! API and raises reminders in the terminal: a bell for the sound channel,
//! an OSC 9 escape for native notifications, a stderr banner and a stdout
//! alert block.

use std::future::Future;
use std::io::{IsTerminal, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

use taskmaster::config::AgentConfig;
use taskmaster::error::{AudioError, NotifyError};
use taskmaster::reminder::{
    AlertDialog, AlertSound, AudioChannel, BannerBoard, DesktopNotification, DesktopNotifier,
    NotificationDispatcher, Permission, ReminderEngine, SoundFactory, SystemClock,
    time_until_reminder,
};
use taskmaster::store::{HttpTaskStore, TaskStore};

struct TerminalBell;

#[async_trait]
impl AlertSound for TerminalBell {
    async fn play(&self) -> Result<(), AudioError> {
        let mut stdout = std::io::stdout();
        if !stdout.is_terminal() {
            return Err(AudioError::NotAllowed("stdout is not a terminal".to_string()));
        }
        stdout.write_all(b"\x07")?;
        stdout.flush()?;
        Ok(())
    }

    fn pause(&self) {}

    fn rewind(&self) {}

    async fn prime(&self) -> Result<(), AudioError> {
        if !std::io::stdout().is_terminal() {
            return Err(AudioError::NotAllowed("stdout is not a terminal".to_string()));
        }
        Ok(())
    }
}

struct BellFactory;

impl SoundFactory for BellFactory {
    fn create(&self) -> Result<Arc<dyn AlertSound>, AudioError> {
        Ok(Arc::new(TerminalBell))
    }
}

struct TerminalNotifier {
    permission: Mutex<Permission>,
}

#[async_trait]
impl DesktopNotifier for TerminalNotifier {
    fn permission(&self) -> Permission {
        self.permission.lock().map(|p| *p).unwrap_or(Permission::Denied)
    }

    async fn request_permission(&self) -> Permission {
        // no interactive prompt; set TASKMASTER_NOTIFICATIONS=granted instead
        self.permission()
    }

    fn notify(&self, notification: &DesktopNotification) -> Result<(), NotifyError> {
        let mut stderr = std::io::stderr();
        if !stderr.is_terminal() {
            return Err(NotifyError::Unavailable("stderr is not a terminal".to_string()));
        }
        write!(stderr, "\x1b]9;{}: {}\x07", notification.title, notification.body)?;
        stderr.flush()?;
        Ok(())
    }
}

struct StdoutAlert;

impl AlertDialog for StdoutAlert {
    fn alert(&self, message: &str) {
        println!("========================================");
        println!("{message}");
        println!("========================================");
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    taskmaster::init_tracing("taskmaster=info");

    let config = AgentConfig::new_from_env()?;
    let store: Arc<dyn TaskStore> = Arc::new(HttpTaskStore::new(&config.api_url, &config.token)?);

    let banners = BannerBoard::new(config.reminder.banner_ttl);
    let dispatcher = Arc::new(NotificationDispatcher::new(
        Arc::new(AudioChannel::new(Arc::new(BellFactory))),
        banners.clone(),
        Arc::new(TerminalNotifier {
            permission: Mutex::new(config.notifications),
        }),
        Arc::new(StdoutAlert),
        store.clone(),
    ));
    dispatcher.request_permission_if_default().await;

    let mut banner_rx = banners.subscribe();
    tokio::spawn(async move {
        while banner_rx.changed().await.is_ok() {
            match banner_rx.borrow_and_update().clone() {
                Some(banner) => eprintln!("[banner] {} - {}", banner.title, banner.body),
                None => eprintln!("[banner] dismissed"),
            }
        }
    });

    let engine = ReminderEngine::start(
        config.reminder.clone(),
        dispatcher,
        store,
        Arc::new(SystemClock),
    );

    info!(
        "watching {} (refresh every {:?}); commands: audio, test, status, dismiss, refresh, quit",
        config.api_url, config.refresh_interval
    );

    let interrupted = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("could not listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };
    run(
        &engine,
        BufReader::new(tokio::io::stdin()),
        config.refresh_interval,
        interrupted,
    )
    .await;

    engine.shutdown().await;
    Ok(())
}

/// Refreshes on every interval tick and serves commands from `input` until
/// `quit` or `shutdown` resolves. A closed input leaves the refresh running.
async fn run<R>(
    engine: &ReminderEngine,
    input: R,
    refresh_interval: Duration,
    shutdown: impl Future<Output = ()>,
) where
    R: AsyncBufRead + Unpin,
{
    let mut refresh = tokio::time::interval(refresh_interval);
    let mut lines = input.lines();
    let mut input_open = true;
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = refresh.tick() => {
                // refresh() logs failures
                let _ = engine.refresh().await;
            }
            line = lines.next_line(), if input_open => match line {
                Ok(Some(line)) => {
                    if !handle_command(engine, line.trim()).await {
                        break;
                    }
                }
                Ok(None) => {
                    debug!("stdin closed; running until interrupted");
                    input_open = false;
                }
                Err(e) => {
                    warn!("stdin error: {}; commands disabled", e);
                    input_open = false;
                }
            },
            _ = &mut shutdown => break,
        }
    }
}

/// Returns `false` when the agent should exit.
async fn handle_command(engine: &ReminderEngine, command: &str) -> bool {
    match command {
        "" => {}
        "audio" => {
            if engine.enable_audio().await {
                println!("Audio enabled");
            } else {
                println!("Audio could not be enabled");
            }
        }
        "test" => engine.test_notification().await,
        "dismiss" => engine.dispatcher().banners().dismiss(),
        "refresh" => match engine.refresh().await {
            Ok(count) => println!("Loaded {count} tasks"),
            Err(e) => println!("Refresh failed: {e}"),
        },
        "status" => print_status(engine).await,
        "quit" | "exit" => return false,
        other => println!("Unknown command: {other}"),
    }
    true
}

async fn print_status(engine: &ReminderEngine) {
    let Some(diag) = engine.diagnostics().await else {
        println!("Reminder loop is not running");
        return;
    };

    let now = chrono::Utc::now();
    println!(
        "Tasks: {} ({} pending, {} completed, {} overdue)",
        diag.summary.total, diag.summary.pending, diag.summary.completed, diag.summary.overdue
    );
    println!(
        "Audio: {} | polling: {} | reminders sent: {}",
        if diag.audio_enabled { "on" } else { "off" },
        diag.polling,
        diag.reminders_sent
    );
    for item in diag.upcoming {
        let due = now + chrono::TimeDelta::seconds(item.seconds_until_due);
        println!(
            "  {:<40} {:>8}  sent: {}",
            item.title,
            time_until_reminder(due, now),
            item.reminder_sent
        );
    }
}
