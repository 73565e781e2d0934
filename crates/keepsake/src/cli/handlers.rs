//! Command handlers.

use super::commands::{Commands, OutputFormat};
use super::render;
use keepsake_core::{LedgerStats, MediaRecord, PassRun};
use keepsake_database::SqliteLedger;
use keepsake_error::{DatabaseError, DatabaseErrorKind, KeepsakeResult};
use keepsake_interface::LedgerStore;
use keepsake_pipeline::PipelineConfig;
use serde::Serialize;
use std::path::Path;
use tracing::{info, instrument};

#[derive(Serialize)]
struct InitView<'a> {
    ledger: &'a Path,
    stats: LedgerStats,
}

#[derive(Serialize)]
struct StatusView {
    stats: LedgerStats,
    recent_passes: Vec<PassRun>,
}

#[derive(Serialize)]
struct ReleaseView<'a> {
    id: &'a str,
    released: bool,
}

#[derive(Serialize)]
struct BackupView<'a> {
    ledger: &'a Path,
    destination: &'a Path,
}

/// Open the ledger named by `config`, creating and migrating it as needed.
///
/// # Errors
///
/// Returns `Connection` or `Migration` database errors.
pub fn open_ledger(config: &PipelineConfig) -> KeepsakeResult<SqliteLedger> {
    let ledger = SqliteLedger::open(
        config.ledger().path(),
        *config.ledger().pool_size(),
        config.replica_policy(),
    )?;
    Ok(ledger)
}

/// Run `command` against the configured ledger and render its output.
///
/// # Errors
///
/// Propagates ledger errors. An unknown record is `NotFound`.
#[instrument(skip_all, fields(command = ?command))]
pub async fn execute(
    command: &Commands,
    config: &PipelineConfig,
    format: OutputFormat,
) -> KeepsakeResult<String> {
    let ledger = open_ledger(config)?;
    match command {
        Commands::Init => init(&ledger, format).await,
        Commands::Status { passes } => status(&ledger, *passes, format).await,
        Commands::Show { record } => show(&ledger, record, format).await,
        Commands::Quarantined { limit } => quarantined(&ledger, *limit, format).await,
        Commands::Release { id } => release(&ledger, id, format).await,
        Commands::Backup { destination } => backup(&ledger, destination, format).await,
    }
}

fn to_json<T: Serialize>(value: &T) -> KeepsakeResult<String> {
    let json = serde_json::to_string_pretty(value).map_err(DatabaseError::from)?;
    Ok(json)
}

async fn init(ledger: &SqliteLedger, format: OutputFormat) -> KeepsakeResult<String> {
    let stats = ledger.stats().await?;
    match format {
        OutputFormat::Json => to_json(&InitView {
            ledger: ledger.path(),
            stats,
        }),
        OutputFormat::Human => Ok(format!(
            "Ledger ready at {} ({} records)",
            ledger.path().display(),
            stats.total
        )),
    }
}

async fn status(
    ledger: &SqliteLedger,
    passes: usize,
    format: OutputFormat,
) -> KeepsakeResult<String> {
    let stats = ledger.stats().await?;
    let recent_passes = ledger.recent_passes(passes).await?;
    match format {
        OutputFormat::Json => to_json(&StatusView {
            stats,
            recent_passes,
        }),
        OutputFormat::Human => Ok(render::status(&stats, &recent_passes)),
    }
}

/// Look a record up by id, then by source reference.
async fn find_record(ledger: &SqliteLedger, key: &str) -> KeepsakeResult<MediaRecord> {
    if let Some(record) = ledger.get(key).await? {
        return Ok(record);
    }
    ledger
        .find_by_source_reference(key)
        .await?
        .ok_or_else(|| {
            DatabaseError::new(DatabaseErrorKind::NotFound(format!("media record {}", key))).into()
        })
}

async fn show(ledger: &SqliteLedger, key: &str, format: OutputFormat) -> KeepsakeResult<String> {
    let record = find_record(ledger, key).await?;
    match format {
        OutputFormat::Json => to_json(&record),
        OutputFormat::Human => Ok(render::record(&record)),
    }
}

async fn quarantined(
    ledger: &SqliteLedger,
    limit: usize,
    format: OutputFormat,
) -> KeepsakeResult<String> {
    let records = ledger.list_quarantined(limit).await?;
    match format {
        OutputFormat::Json => to_json(&records),
        OutputFormat::Human => Ok(render::quarantined(&records)),
    }
}

async fn release(ledger: &SqliteLedger, id: &str, format: OutputFormat) -> KeepsakeResult<String> {
    let released = ledger.clear_quarantine(id).await?;
    if released {
        info!(record_id = %id, "Released from quarantine");
    }
    match format {
        OutputFormat::Json => to_json(&ReleaseView { id, released }),
        OutputFormat::Human if released => Ok(format!("Released {}", id)),
        OutputFormat::Human => Ok(format!("{} was not quarantined", id)),
    }
}

async fn backup(
    ledger: &SqliteLedger,
    destination: &Path,
    format: OutputFormat,
) -> KeepsakeResult<String> {
    ledger.backup_to(destination).await?;
    match format {
        OutputFormat::Json => to_json(&BackupView {
            ledger: ledger.path(),
            destination,
        }),
        OutputFormat::Human => Ok(format!(
            "Backed up {} to {}",
            ledger.path().display(),
            destination.display()
        )),
    }
}
