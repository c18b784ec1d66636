// File: crates/services/callback_agent/src/main.rs
use callback_agent::lock::InstanceLock;
use callback_agent::runner::{Runner, RunnerOptions};
use callback_agent::summary::print_summary;
use callback_agent::supervisor::Supervisor;
use callback_common::logging;
use callback_config::{load_config, AppConfig};
use callback_gcal::auth::create_calendar_hub;
use callback_gcal::service::GoogleCalendarService;
use callback_notify::{DesktopNotifier, NotifyBackend};
use callback_scheduler::logic::SchedulingConfig;
use callback_store::ProcessedStore;
use callback_watch::RecordFile;
use clap::{Parser, Subcommand};
use std::sync::Arc;

#[derive(Parser)]
#[command(
    name = "callback-agent",
    version,
    about = "Books a 15-minute follow-up for every missed call"
)]
struct Cli {
    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Run the polling main loop
    Run,
    /// Process pending records once, then exit
    Once,
    /// Print a summary of processed records
    Summary,
    /// Watchdog: keep the main loop alive
    Supervise,
}

#[tokio::main]
async fn main() {
    logging::init();
    let cli = Cli::parse();
    let config = load_config().expect("Failed to load config");

    let outcome = match cli.command {
        Cmd::Run => run(&config, true).await,
        Cmd::Once => run(&config, false).await,
        Cmd::Summary => summarize(&config),
        Cmd::Supervise => supervise(&config).await,
    };

    if let Err(message) = outcome {
        eprintln!("callback-agent: {message}");
        std::process::exit(1);
    }
}

async fn run(config: &AppConfig, forever: bool) -> Result<(), String> {
    let gcal_config = config
        .gcal
        .as_ref()
        .ok_or("gcal config section missing; set gcal.key_path and gcal.calendar_id")?;
    let calendar_id = gcal_config
        .calendar_id
        .clone()
        .ok_or("gcal.calendar_id missing")?;

    let scheduling =
        SchedulingConfig::try_from(&config.scheduler).map_err(|err| err.to_string())?;

    // Held for the whole run; a second instance would double-book.
    let _lock =
        InstanceLock::acquire(&config.supervisor.pidfile).map_err(|err| err.to_string())?;

    let hub = create_calendar_hub(gcal_config)
        .await
        .map_err(|err| err.to_string())?;
    let calendar = GoogleCalendarService::new(Arc::new(hub));
    let sink = if config.use_notifications {
        DesktopNotifier::from_config(&config.notify)
    } else {
        DesktopNotifier::new(NotifyBackend::Disabled)
    };
    let store = ProcessedStore::load(&config.store.path).map_err(|err| err.to_string())?;
    let records = RecordFile::new(&config.watcher.records_file);
    let options = RunnerOptions {
        calendar_id,
        retention: chrono::Duration::hours(config.watcher.retention_hours),
        offline_gap: chrono::Duration::hours(config.watcher.offline_gap_hours),
        request_timeout: std::time::Duration::from_secs(gcal_config.request_timeout_secs),
        max_retries: gcal_config.max_retries,
    };

    let mut runner = Runner::new(calendar, sink, records, store, scheduling, options);

    if forever {
        runner
            .run_loop(std::time::Duration::from_secs(
                config.watcher.poll_interval_secs,
            ))
            .await
            .map_err(|err| err.to_string())
    } else {
        let report = runner
            .process_pending()
            .await
            .map_err(|err| err.to_string())?;
        println!(
            "booked {}, failed {}, already processed {}",
            report.booked, report.failed, report.already_processed
        );
        if report.aborted {
            Err("batch aborted on calendar failure".to_string())
        } else {
            Ok(())
        }
    }
}

fn summarize(config: &AppConfig) -> Result<(), String> {
    let store = ProcessedStore::load(&config.store.path).map_err(|err| err.to_string())?;
    print_summary(&store);
    Ok(())
}

async fn supervise(config: &AppConfig) -> Result<(), String> {
    Supervisor::new(config.supervisor.clone())
        .supervise()
        .await
        .map_err(|err| err.to_string())
}
