use crate::cli::Cli;
use crate::components::ics::{IcsWriter, DEFAULT_CALENDAR_NAME};
use crate::components::normalizer::normalize_all;
use crate::components::outlook_export::load_records;
use crate::components::{Event, GoogleCalendarHandle};
use crate::config::Config;
use crate::error::{input_error, other_error, Error};
use crate::sync::sync_events;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

const DEFAULT_LOG_FILTER: &str = "info,reqwest=warn,hyper=warn";
const VERBOSE_LOG_FILTER: &str = "debug,reqwest=warn,hyper=warn";

/// Events shown in the startup sample
const SAMPLE_SIZE: usize = 5;

/// Initialize logging with environment-based configuration
pub fn init_logging(verbose: bool) -> miette::Result<()> {
    let filter = if verbose {
        EnvFilter::new(VERBOSE_LOG_FILTER)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
    };
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| Error::Other(format!("Failed to set up logging: {}", e)))?;

    Ok(())
}

/// Load the configuration and apply command-line overrides
pub fn load_config(cli: &Cli) -> miette::Result<Config> {
    match Config::load() {
        Ok(mut config) => {
            cli.apply(&mut config);
            Ok(config)
        }
        Err(e) => {
            error!("Failed to load configuration: {:?}", e);
            Err(e.into())
        }
    }
}

/// Read the export, then write ICS or sync to Google Calendar
pub async fn run(cli: &Cli, config: &Config, cancel: CancellationToken) -> miette::Result<()> {
    let normalizer = config.normalizer_config()?;
    let records = load_records(&config.input_file).await?;

    let (events, warnings) = normalize_all(&records, &normalizer);
    if events.is_empty() {
        return Err(input_error(&format!(
            "No events found in {}",
            config.input_file.display()
        ))
        .into());
    }
    info!(
        "Prepared {} events ({} records skipped)",
        events.len(),
        warnings.len()
    );
    log_sample(&events);

    if cli.google {
        sync_to_google(config, &events, cli.dry_run, cancel).await
    } else {
        IcsWriter::new(DEFAULT_CALENDAR_NAME, config.timezone.clone())
            .write_to(&config.output_file, &events)
            .await?;
        info!("Import {} into your calendar application", config.output_file.display());
        Ok(())
    }
}

fn log_sample(events: &[Event]) {
    info!("Sample events:");
    for (i, event) in events.iter().take(SAMPLE_SIZE).enumerate() {
        let organizer = event
            .organizer
            .as_ref()
            .map(|o| format!(" by {} <{}>", o.name, o.email))
            .unwrap_or_default();
        info!(
            "  {}. {} | {} - {}{}",
            i + 1,
            event.title,
            event.start.format("%Y-%m-%d %H:%M"),
            event.end.format("%H:%M %Z"),
            organizer
        );
    }
}

async fn sync_to_google(
    config: &Config,
    events: &[Event],
    dry_run: bool,
    cancel: CancellationToken,
) -> miette::Result<()> {
    let handle = GoogleCalendarHandle::new(config)?;
    handle.authenticate().await?;

    let handle = match &config.google_calendar_name {
        Some(name) if dry_run => match handle.find_calendar(name).await? {
            Some(id) => handle.with_calendar(id),
            None => {
                info!(
                    "Dry run: calendar '{}' does not exist yet; all {} events would be created in it",
                    name,
                    events.len()
                );
                handle.shutdown().await?;
                return Ok(());
            }
        },
        Some(name) => {
            let id = handle.ensure_calendar(name, &config.timezone).await?;
            handle.with_calendar(id)
        }
        None => handle,
    };
    info!("Syncing {} events to calendar {}", events.len(), handle.calendar_id());

    let result = sync_events(&handle, events, config.executor_config(), dry_run, &cancel).await;
    if let Err(e) = handle.shutdown().await {
        warn!("Error shutting down Google Calendar actor: {:?}", e);
    }

    let report = result?;
    report.log_summary();
    if report.stats.failed > 0 {
        return Err(other_error(&format!("{} events failed to sync", report.stats.failed)).into());
    }
    if cancel.is_cancelled() {
        return Err(other_error("Sync was interrupted before all events were processed").into());
    }
    Ok(())
}
