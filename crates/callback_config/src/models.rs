// --- File: crates/callback_config/src/models.rs ---

use serde::{Deserialize, Serialize};

// --- Scheduler Config ---
// Times are kept as "HH:MM" strings here and parsed where they are used,
// so a hand-edited config file stays forgiving.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SchedulerConfig {
    /// IANA timezone name all scheduling arithmetic happens in.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// Earliest time of day eligible for a follow-up slot.
    #[serde(default = "default_base_time")]
    pub base_time: String,
    /// Latest time of day eligible for a follow-up slot.
    #[serde(default = "default_cutoff_time")]
    pub cutoff_time: String,
    /// Length of one follow-up slot in minutes.
    #[serde(default = "default_slot_minutes")]
    pub slot_minutes: i64,
    /// What to do when every slot before the cutoff is taken:
    /// "fail" leaves the record unprocessed, "clamp-and-warn" books the
    /// cutoff time itself and logs a warning.
    #[serde(default = "default_overflow")]
    pub overflow: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        SchedulerConfig {
            timezone: default_timezone(),
            base_time: default_base_time(),
            cutoff_time: default_cutoff_time(),
            slot_minutes: default_slot_minutes(),
            overflow: default_overflow(),
        }
    }
}

fn default_timezone() -> String {
    "Europe/Budapest".to_string()
}
fn default_base_time() -> String {
    "18:00".to_string()
}
fn default_cutoff_time() -> String {
    "22:00".to_string()
}
fn default_slot_minutes() -> i64 {
    15
}
fn default_overflow() -> String {
    "fail".to_string()
}

// --- Google Calendar Config ---
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GcalConfig {
    pub key_path: Option<String>, // Mandatory
    pub calendar_id: Option<String>, // Mandatory
    /// Per-call timeout for calendar API requests.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Bounded retry count for transient calendar failures.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    // Secrets loaded from the service-account key file at key_path.
}

fn default_request_timeout_secs() -> u64 {
    30
}
fn default_max_retries() -> u32 {
    3
}

// --- Record Watcher Config ---
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WatcherConfig {
    /// Human-edited record file, one missed call per line.
    #[serde(default = "default_records_file")]
    pub records_file: String,
    /// Poll cadence of the main loop.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Records older than this are flagged as recovered from backlog.
    #[serde(default = "default_retention_hours")]
    pub retention_hours: i64,
    /// A store untouched for longer than this marks the next batch as a
    /// wake-up backlog.
    #[serde(default = "default_offline_gap_hours")]
    pub offline_gap_hours: i64,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        WatcherConfig {
            records_file: default_records_file(),
            poll_interval_secs: default_poll_interval_secs(),
            retention_hours: default_retention_hours(),
            offline_gap_hours: default_offline_gap_hours(),
        }
    }
}

fn default_records_file() -> String {
    "missed_calls.txt".to_string()
}
fn default_poll_interval_secs() -> u64 {
    30
}
fn default_retention_hours() -> i64 {
    48
}
fn default_offline_gap_hours() -> i64 {
    2
}

// --- Processed Store Config ---
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StoreConfig {
    #[serde(default = "default_store_path")]
    pub path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            path: default_store_path(),
        }
    }
}

fn default_store_path() -> String {
    "processed_calls.json".to_string()
}

// --- Notification Config ---
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct NotifyConfig {
    /// "auto", "notify-send", "osascript" or "none".
    #[serde(default = "default_notify_backend")]
    pub backend: String,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        NotifyConfig {
            backend: default_notify_backend(),
        }
    }
}

fn default_notify_backend() -> String {
    "auto".to_string()
}

// --- Supervisor Config ---
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SupervisorConfig {
    /// Delay before restarting a dead main loop.
    #[serde(default = "default_restart_delay_secs")]
    pub restart_delay_secs: u64,
    /// Liveness check cadence while the loop is running.
    #[serde(default = "default_check_interval_secs")]
    pub check_interval_secs: u64,
    /// Pidfile used for the single-instance guarantee.
    #[serde(default = "default_pidfile")]
    pub pidfile: String,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        SupervisorConfig {
            restart_delay_secs: default_restart_delay_secs(),
            check_interval_secs: default_check_interval_secs(),
            pidfile: default_pidfile(),
        }
    }
}

fn default_restart_delay_secs() -> u64 {
    5
}
fn default_check_interval_secs() -> u64 {
    300
}
fn default_pidfile() -> String {
    "callback_agent.pid".to_string()
}

// --- Unified App Configuration ---
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub watcher: WatcherConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
    #[serde(default)]
    pub supervisor: SupervisorConfig,

    // --- Runtime Flags ---
    #[serde(default = "default_use_notifications")]
    pub use_notifications: bool,

    // --- Calendar backend (mandatory for run/once) ---
    #[serde(default)]
    pub gcal: Option<GcalConfig>,
}

fn default_use_notifications() -> bool {
    true
}
