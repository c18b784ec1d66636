// --- File: crates/callback_config/src/lib.rs ---
use chrono::NaiveTime;
use config::{Config, ConfigError, Environment, File};
use once_cell::sync::OnceCell;
use std::str::FromStr;

pub mod models;
pub use models::*;

static DOTENV_LOADED: OnceCell<()> = OnceCell::new();

/// Loads `.env` exactly once, no matter how many crates ask for config.
pub fn ensure_dotenv_loaded() {
    DOTENV_LOADED.get_or_init(|| {
        dotenv::dotenv().ok();
    });
}

/// Loads the unified configuration.
///
/// Sources, later ones overriding earlier ones:
/// 1. Built-in defaults (everything has one except the gcal section).
/// 2. An optional config file, `config/callback` by default or whatever
///    `CALLBACK_CONFIG` points at (toml/yaml/json all accepted).
/// 3. Environment variables prefixed `CALLBACK__`, e.g.
///    `CALLBACK__SCHEDULER__BASE_TIME=17:30`.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    ensure_dotenv_loaded();

    let config_path =
        std::env::var("CALLBACK_CONFIG").unwrap_or_else(|_| "config/callback".to_string());

    let config: AppConfig = Config::builder()
        .add_source(File::with_name(&config_path).required(false))
        .add_source(Environment::with_prefix("CALLBACK").separator("__"))
        .build()?
        .try_deserialize()?;

    validate(&config)?;
    Ok(config)
}

/// Parse an "HH:MM" (or "HH:MM:SS") time-of-day config value.
pub fn parse_time_of_day(value: &str) -> Result<NaiveTime, ConfigError> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .map_err(|_| ConfigError::Message(format!("invalid time of day: {value:?} (want HH:MM)")))
}

/// Semantic validation of the loaded configuration. Fatal at startup: a
/// misconfigured scheduling window must never silently produce bookings.
pub fn validate(config: &AppConfig) -> Result<(), ConfigError> {
    let base = parse_time_of_day(&config.scheduler.base_time)?;
    let cutoff = parse_time_of_day(&config.scheduler.cutoff_time)?;
    if cutoff <= base {
        return Err(ConfigError::Message(format!(
            "cutoff_time ({}) must be after base_time ({})",
            config.scheduler.cutoff_time, config.scheduler.base_time
        )));
    }
    if config.scheduler.slot_minutes <= 0 {
        return Err(ConfigError::Message(format!(
            "slot_minutes must be positive, got {}",
            config.scheduler.slot_minutes
        )));
    }
    chrono_tz::Tz::from_str(&config.scheduler.timezone).map_err(|_| {
        ConfigError::Message(format!(
            "unknown timezone: {:?}",
            config.scheduler.timezone
        ))
    })?;
    match config.scheduler.overflow.as_str() {
        "fail" | "clamp-and-warn" => {}
        other => {
            return Err(ConfigError::Message(format!(
                "overflow must be \"fail\" or \"clamp-and-warn\", got {other:?}"
            )))
        }
    }
    if config.watcher.poll_interval_secs == 0 {
        return Err(ConfigError::Message(
            "poll_interval_secs must be nonzero".to_string(),
        ));
    }
    Ok(())
}
