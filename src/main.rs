mod config;
mod database;
mod engine;
mod error;
mod export;
mod history;
mod models;
mod normalizer;
mod presentation;
mod thresholds;
mod transport;
mod utils;

use log::{debug, error, info, warn};
use time::OffsetDateTime;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval, Duration, MissedTickBehavior};

use config::DashboardConfig;
use database::{ensure_schema, fetch_readings, store_reading};
use engine::DashboardState;
use export::{
    export_file_name, export_full_csv, export_recent_csv, FULL_EXPORT_PREFIX, RECENT_EXPORT_PREFIX,
};
use models::Reading;
use normalizer::{normalize, RawPayload};
use presentation::{LogSink, PresentationSink};
use transport::{run_listener, ConnectionStatus, TransportEvent};
use utils::{calculate_averages, format_datetime};

const EVENT_CHANNEL_CAPACITY: usize = 256;
const FULL_EXPORT_DAYS: i64 = 30;

/// Build the dashboard state and apply start-up administrative settings.
fn initial_state(config: &DashboardConfig) -> Result<DashboardState, error::DashboardError> {
    let mut state = DashboardState::new(config.engine_settings());
    if config.exam_mode {
        state.set_exam_mode(true)?;
    }
    for (metric, value) in &config.thresholds {
        state.set_threshold(metric, *value)?;
    }
    Ok(state)
}

fn handle_event(state: &mut DashboardState, event: TransportEvent) {
    match event {
        TransportEvent::Payload(bytes) => {
            let reading = normalize(&RawPayload::from_bytes(&bytes), OffsetDateTime::now_utc());
            state.ingest(reading);
        }
        TransportEvent::Status(status) => {
            if state.set_connection(status) {
                match status {
                    ConnectionStatus::Offline => warn!("Sensor feed {}", status),
                    _ => info!("Sensor feed {}", status),
                }
            }
        }
    }
}

fn persist_latest(state: &mut DashboardState, database_url: Option<&str>) {
    if state.history().is_empty() {
        debug!("No readings yet, skipping persistence tick");
        return;
    }

    let averages = calculate_averages(state.history().iter());
    info!("Summary over {} readings:", averages.samples);
    info!("  Average PM2.5: {:?} µg/m³", averages.pm25);
    info!("  Average CO2: {:?} ppm", averages.co2);
    info!("  Average CO: {:?} ppm", averages.co);
    info!("  Average temperature: {:?}°C", averages.temperature);
    info!("  Average humidity: {:?}%", averages.humidity);

    let Some(database_url) = database_url else {
        return;
    };
    let Some(reading) = state.take_unpersisted() else {
        debug!("No new reading since last persistence tick");
        return;
    };

    let database_url = database_url.to_string();
    tokio::spawn(async move {
        match store_reading(&reading, &database_url).await {
            Ok(()) => info!(
                "Stored reading from {}",
                format_datetime(&reading.timestamp)
            ),
            Err(e) => error!("Failed to store reading: {}", e),
        }
    });
}

/// Create the readings table on a background task.
fn spawn_schema_setup(database_url: Option<&str>) -> Option<tokio::task::JoinHandle<()>> {
    let database_url = database_url?.to_string();
    Some(tokio::spawn(async move {
        match ensure_schema(&database_url).await {
            Ok(()) => info!("Readings table ready"),
            Err(e) => error!("Failed to prepare readings table: {}", e),
        }
    }))
}

/// Stored readings of the last 30 days, or the in-memory history when no
/// database is configured or it cannot be read.
async fn full_history(database_url: Option<&str>, state: &DashboardState) -> Vec<Reading> {
    if let Some(database_url) = database_url {
        let since = OffsetDateTime::now_utc() - time::Duration::days(FULL_EXPORT_DAYS);
        match fetch_readings(database_url, since).await {
            Ok(readings) => return readings,
            Err(e) => warn!("Exporting in-memory history instead: {}", e),
        }
    }
    state.history().snapshot()
}

async fn export_history(config: &DashboardConfig, state: &DashboardState, now: OffsetDateTime) {
    let Some(dir) = &config.export_dir else {
        return;
    };

    let full = full_history(config.database_url.as_deref(), state).await;
    let exports = [
        (RECENT_EXPORT_PREFIX, export_recent_csv(state.history().replay())),
        (FULL_EXPORT_PREFIX, export_full_csv(&full)),
    ];

    for (prefix, csv) in exports {
        let csv = match csv {
            Ok(csv) => csv,
            Err(e) => {
                error!("{}", e);
                continue;
            }
        };
        let path = dir.join(export_file_name(prefix, &now));
        match tokio::fs::write(&path, csv).await {
            Ok(()) => info!("Exported history to {}", path.display()),
            Err(e) => error!("Failed to write {}: {}", path.display(), e),
        }
    }
}

async fn main_loop(
    config: DashboardConfig,
    mut shutdown: oneshot::Receiver<()>,
) -> Result<(), Box<dyn std::error::Error>> {
    info!("Starting air quality dashboard service");

    let mut state = initial_state(&config)?;

    let (tx, mut events) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    tokio::spawn(run_listener(config.mqtt.clone(), tx));
    spawn_schema_setup(config.database_url.as_deref());

    let sink = LogSink;
    let mut display_tick = interval(Duration::from_secs(config.display_interval_secs));
    display_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut persist_tick = interval(Duration::from_secs(config.persist_interval_secs));
    persist_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // The first tick fires immediately; nothing to persist yet.
    persist_tick.tick().await;

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(event) => handle_event(&mut state, event),
                None => {
                    warn!("Sensor feed closed");
                    break;
                }
            },
            _ = display_tick.tick() => {
                if let Some(frame) = state.frame(OffsetDateTime::now_utc()) {
                    sink.present(&frame);
                }
            }
            _ = persist_tick.tick() => {
                persist_latest(&mut state, config.database_url.as_deref());
            }
            _ = &mut shutdown => {
                info!("Program terminated by user. Exiting gracefully.");
                break;
            }
        }
    }

    export_history(&config, &state, OffsetDateTime::now_utc()).await;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .format_timestamp_secs()
        .init();

    // Load configuration
    let config = match DashboardConfig::new() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    // Handle Ctrl+C gracefully
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            return;
        }
        let _ = tx.send(());
    });

    match main_loop(config, rx).await {
        Ok(_) => info!("Program completed successfully"),
        Err(e) => error!("Fatal error: {}", e),
    }

    Ok(())
}
