use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::error::NotifyError;
use crate::models::Task;

/// Native notification permission as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Granted,
    Denied,
    Default,
}

impl FromStr for Permission {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "granted" => Ok(Permission::Granted),
            "denied" => Ok(Permission::Denied),
            "default" => Ok(Permission::Default),
            other => Err(format!("unknown permission state: {other}")),
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Permission::Granted => "granted",
            Permission::Denied => "denied",
            Permission::Default => "default",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesktopNotification {
    pub title: String,
    pub body: String,
    /// Replaces an earlier notification with the same tag.
    pub tag: String,
}

/// OS-level notifications plus the permission that gates them.
#[async_trait]
pub trait DesktopNotifier: Send + Sync {
    fn permission(&self) -> Permission;
    async fn request_permission(&self) -> Permission;
    fn notify(&self, notification: &DesktopNotification) -> Result<(), NotifyError>;
}

/// Synchronous last-resort alert.
pub trait AlertDialog: Send + Sync {
    fn alert(&self, message: &str);
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Banner {
    pub task_id: String,
    pub title: String,
    pub body: String,
}

impl Banner {
    pub fn for_task(task: &Task) -> Self {
        Self {
            task_id: task.id.clone(),
            title: format!("🔔 Task Reminder: {}", task.title),
            body: task.reminder_body().to_string(),
        }
    }
}

/// The in-app reminder banner slot.
///
/// One banner is visible at a time; each is cleared `ttl` after it was shown
/// unless a newer banner replaced it first.
#[derive(Clone)]
pub struct BannerBoard {
    tx: Arc<watch::Sender<Option<Banner>>>,
    generation: Arc<AtomicU64>,
    ttl: Duration,
}

impl BannerBoard {
    pub fn new(ttl: Duration) -> Self {
        let (tx, _rx) = watch::channel(None);
        Self {
            tx: Arc::new(tx),
            generation: Arc::new(AtomicU64::new(0)),
            ttl,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Banner>> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> Option<Banner> {
        self.tx.borrow().clone()
    }

    /// Must be called from within a tokio runtime.
    pub fn show(&self, banner: Banner) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.tx.send_replace(Some(banner));

        let tx = self.tx.clone();
        let current = self.generation.clone();
        let deadline = tokio::time::Instant::now() + self.ttl;
        tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            if current.load(Ordering::SeqCst) == generation {
                tx.send_replace(None);
            }
        });
    }

    pub fn dismiss(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.tx.send_replace(None);
    }
}
