// --- File: crates/callback_notify/src/lib.rs ---
//! Desktop notification sink.
//!
//! Bookings are announced through the platform notifier command:
//! `notify-send` on Linux, `osascript` on macOS. There is no registry
//! crate involved, the notifier is an external command exactly like the
//! calendar agent's predecessors used. Delivery is fire-and-forget; the
//! caller logs failures and moves on.

use callback_common::services::{BoxFuture, FollowUpNotice, NotificationSink};
use callback_config::NotifyConfig;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("notifier command failed to start: {0}")]
    Io(#[from] std::io::Error),
    #[error("notifier command exited with status {0}")]
    Command(std::process::ExitStatus),
}

/// Which notifier command to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyBackend {
    NotifySend,
    Osascript,
    Disabled,
}

impl NotifyBackend {
    /// Resolve the configured backend name, picking the platform default
    /// for "auto". Unknown names disable notifications rather than
    /// failing a booking run over a typo.
    pub fn from_config(config: &NotifyConfig) -> Self {
        match config.backend.as_str() {
            "notify-send" => NotifyBackend::NotifySend,
            "osascript" => NotifyBackend::Osascript,
            "none" => NotifyBackend::Disabled,
            "auto" => {
                if cfg!(target_os = "macos") {
                    NotifyBackend::Osascript
                } else {
                    NotifyBackend::NotifySend
                }
            }
            other => {
                tracing::warn!(backend = other, "unknown notify backend, disabling");
                NotifyBackend::Disabled
            }
        }
    }
}

/// Title line for a follow-up notice.
pub fn render_title(notice: &FollowUpNotice) -> String {
    if notice.missed_count > 1 {
        format!("{}x Missed calls!", notice.missed_count)
    } else {
        "Missed call".to_string()
    }
}

/// Body text for a follow-up notice.
pub fn render_body(notice: &FollowUpNotice) -> String {
    let mut body = if notice.missed_count > 1 {
        format!(
            "{} - URGENT\nLast call: {}\n⚠️ {} missed calls!\n✅ Callback scheduled: {}",
            notice.caller, notice.missed_at, notice.missed_count, notice.scheduled_at
        )
    } else {
        format!(
            "{}\nMissed: {}\n✅ Callback scheduled: {}",
            notice.caller, notice.missed_at, notice.scheduled_at
        )
    };
    if notice.recovered {
        body.push_str("\n(recovered from backlog)");
    }
    body
}

/// The desktop notifier.
pub struct DesktopNotifier {
    backend: NotifyBackend,
}

impl DesktopNotifier {
    pub fn new(backend: NotifyBackend) -> Self {
        DesktopNotifier { backend }
    }

    pub fn from_config(config: &NotifyConfig) -> Self {
        DesktopNotifier::new(NotifyBackend::from_config(config))
    }
}

impl NotificationSink for DesktopNotifier {
    type Error = NotifyError;

    fn notify(&self, notice: FollowUpNotice) -> BoxFuture<'_, (), Self::Error> {
        let backend = self.backend;
        Box::pin(async move {
            let title = render_title(&notice);
            let body = render_body(&notice);

            let status = match backend {
                NotifyBackend::Disabled => {
                    debug!(caller = %notice.caller, "notifications disabled, skipping");
                    return Ok(());
                }
                NotifyBackend::NotifySend => {
                    Command::new("notify-send")
                        .arg(&title)
                        .arg(&body)
                        .status()
                        .await?
                }
                NotifyBackend::Osascript => {
                    // osascript takes the script inline; quotes in caller
                    // names must not break out of the string literal.
                    let script = format!(
                        "display notification \"{}\" with title \"{}\"",
                        escape_applescript(&body),
                        escape_applescript(&title)
                    );
                    Command::new("osascript").arg("-e").arg(script).status().await?
                }
            };

            if status.success() {
                Ok(())
            } else {
                Err(NotifyError::Command(status))
            }
        })
    }
}

fn escape_applescript(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}
