use std::sync::Arc;

use chrono::Local;
use tracing::{debug, info, warn};

use super::audio::AudioChannel;
use super::channels::{AlertDialog, Banner, BannerBoard, DesktopNotification, DesktopNotifier, Permission};
use crate::models::Task;
use crate::store::TaskStore;

/// Fans a due task out to every notification channel.
///
/// Channels are independent: a failing sound or native notification never
/// keeps the banner or the fallback alert from being shown.
pub struct NotificationDispatcher {
    audio: Arc<AudioChannel>,
    banners: BannerBoard,
    desktop: Arc<dyn DesktopNotifier>,
    alert: Arc<dyn AlertDialog>,
    store: Arc<dyn TaskStore>,
}

impl NotificationDispatcher {
    pub fn new(
        audio: Arc<AudioChannel>,
        banners: BannerBoard,
        desktop: Arc<dyn DesktopNotifier>,
        alert: Arc<dyn AlertDialog>,
        store: Arc<dyn TaskStore>,
    ) -> Self {
        Self {
            audio,
            banners,
            desktop,
            alert,
            store,
        }
    }

    pub fn audio(&self) -> &Arc<AudioChannel> {
        &self.audio
    }

    pub fn banners(&self) -> &BannerBoard {
        &self.banners
    }

    /// Asks for native notification permission if the host has not decided yet.
    pub async fn request_permission_if_default(&self) -> Permission {
        match self.desktop.permission() {
            Permission::Default => {
                let permission = self.desktop.request_permission().await;
                info!("native notification permission: {}", permission);
                permission
            }
            other => other,
        }
    }

    /// Alerts on every channel and records the reminder with the Task Store.
    pub fn dispatch(&self, task: &Task) {
        self.alert_channels(task);

        let store = self.store.clone();
        let id = task.id.clone();
        tokio::spawn(async move {
            if let Err(e) = store.mark_reminder_sent(&id).await {
                warn!("Error updating reminder sent status for {}: {}", id, e);
            }
        });
    }

    /// Alerts on every channel without touching the Task Store.
    pub fn alert_channels(&self, task: &Task) {
        info!(task_id = %task.id, "triggering reminder for task: {}", task.title);

        let audio = self.audio.clone();
        tokio::spawn(async move {
            if let Err(e) = audio.play_alert().await {
                warn!("alert sound unavailable: {}", e);
            }
        });

        let banner = Banner::for_task(task);
        self.banners.show(banner.clone());

        if self.desktop.permission() == Permission::Granted {
            let notification = DesktopNotification {
                title: banner.title,
                body: banner.body,
                tag: task.id.clone(),
            };
            if let Err(e) = self.desktop.notify(&notification) {
                warn!("native notification failed: {}", e);
            }
        } else {
            debug!("native notifications not granted; skipping");
        }

        self.alert.alert(&fallback_message(task));
    }
}

pub fn fallback_message(task: &Task) -> String {
    format!(
        "🔔 TASK REMINDER!\n\n{}\n{}\n\nDue: {}",
        task.title,
        task.description,
        task.reminder_time
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S")
    )
}
