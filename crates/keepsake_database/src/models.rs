//! Diesel row types and their conversions to the core model.
//!
//! Stages, tiers and timestamps are stored as text and parsed here, so a
//! damaged value surfaces as a per-row conversion failure instead of failing
//! the whole query.

use crate::schema::{media_records, pass_runs};
use chrono::{DateTime, SecondsFormat, Utc};
use diesel::prelude::*;
use keepsake_core::{CompressionTier, MediaRecord, PassReport, PassRun, ReplicaFlags, Stage};
use std::path::PathBuf;

/// Render a timestamp for storage.
///
/// Fixed-width UTC so lexical order equals chronological order.
pub fn timestamp_column(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(field: &str, value: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| format!("{} '{}' is not a timestamp: {}", field, value, e))
}

fn size_column(bytes: u64) -> i64 {
    i64::try_from(bytes).unwrap_or(i64::MAX)
}

fn parse_size(field: &str, value: i64) -> Result<u64, String> {
    u64::try_from(value).map_err(|_| format!("{} is negative ({})", field, value))
}

/// A stored media record.
#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Identifiable)]
#[diesel(table_name = media_records)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct MediaRecordRow {
    pub id: String,
    pub source_reference: String,
    pub local_path: Option<String>,
    pub created_at: String,
    pub byte_size_original: i64,
    pub byte_size_current: i64,
    pub stage: String,
    pub replica_flags: String,
    pub compression_tier: Option<String>,
    pub deletion_token: Option<String>,
    pub error_count: i32,
    pub last_error: Option<String>,
    pub last_attempt_at: Option<String>,
    pub quarantined: bool,
    pub acquired_at: String,
    pub updated_at: String,
    pub version: i64,
}

impl MediaRecordRow {
    /// Decode into a record, describing the first damaged field on failure.
    pub fn to_record(&self) -> Result<MediaRecord, String> {
        let stage: Stage = self.stage.parse()?;
        let compression_tier: Option<CompressionTier> = self
            .compression_tier
            .as_deref()
            .map(str::parse)
            .transpose()?;
        let last_attempt_at = self
            .last_attempt_at
            .as_deref()
            .map(|v| parse_timestamp("last_attempt_at", v))
            .transpose()?;

        MediaRecord::builder()
            .id(self.id.clone())
            .source_reference(self.source_reference.clone())
            .local_path(self.local_path.as_ref().map(PathBuf::from))
            .created_at(parse_timestamp("created_at", &self.created_at)?)
            .byte_size_original(parse_size("byte_size_original", self.byte_size_original)?)
            .byte_size_current(parse_size("byte_size_current", self.byte_size_current)?)
            .stage(stage)
            .replica_flags(ReplicaFlags::from_column(&self.replica_flags))
            .compression_tier(compression_tier)
            .deletion_token(self.deletion_token.clone())
            .error_count(u32::try_from(self.error_count).map_err(|_| {
                format!("error_count is negative ({})", self.error_count)
            })?)
            .last_error(self.last_error.clone())
            .last_attempt_at(last_attempt_at)
            .quarantined(self.quarantined)
            .acquired_at(parse_timestamp("acquired_at", &self.acquired_at)?)
            .updated_at(parse_timestamp("updated_at", &self.updated_at)?)
            .build()
            .map_err(|e| e.to_string())
    }
}

/// A record to insert.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = media_records)]
pub struct NewMediaRecordRow {
    pub id: String,
    pub source_reference: String,
    pub local_path: Option<String>,
    pub created_at: String,
    pub byte_size_original: i64,
    pub byte_size_current: i64,
    pub stage: String,
    pub replica_flags: String,
    pub error_count: i32,
    pub quarantined: bool,
    pub acquired_at: String,
    pub updated_at: String,
    pub version: i64,
}

impl From<&MediaRecord> for NewMediaRecordRow {
    fn from(record: &MediaRecord) -> Self {
        Self {
            id: record.id().clone(),
            source_reference: record.source_reference().clone(),
            local_path: local_path_column(record),
            created_at: timestamp_column(*record.created_at()),
            byte_size_original: size_column(*record.byte_size_original()),
            byte_size_current: size_column(*record.byte_size_current()),
            stage: record.stage().as_str().to_string(),
            replica_flags: record.replica_flags().to_column(),
            error_count: 0,
            quarantined: false,
            acquired_at: timestamp_column(*record.acquired_at()),
            updated_at: timestamp_column(*record.updated_at()),
            version: 0,
        }
    }
}

/// Every column a stage transition may rewrite.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = media_records)]
#[diesel(treat_none_as_null = true)]
pub struct TransitionChangeset {
    pub local_path: Option<String>,
    pub byte_size_current: i64,
    pub stage: String,
    pub replica_flags: String,
    pub compression_tier: Option<String>,
    pub deletion_token: Option<String>,
    pub error_count: i32,
    pub last_attempt_at: Option<String>,
    pub updated_at: String,
    pub version: i64,
}

impl TransitionChangeset {
    /// Columns for `record` written at `version`.
    pub fn new(record: &MediaRecord, version: i64) -> Self {
        Self {
            local_path: local_path_column(record),
            byte_size_current: size_column(*record.byte_size_current()),
            stage: record.stage().as_str().to_string(),
            replica_flags: record.replica_flags().to_column(),
            compression_tier: record.compression_tier().map(|t| t.as_str().to_string()),
            deletion_token: record.deletion_token().clone(),
            error_count: i32::try_from(*record.error_count()).unwrap_or(i32::MAX),
            last_attempt_at: record.last_attempt_at().map(timestamp_column),
            updated_at: timestamp_column(*record.updated_at()),
            version,
        }
    }
}

fn local_path_column(record: &MediaRecord) -> Option<String> {
    record
        .local_path()
        .as_ref()
        .map(|p| p.to_string_lossy().into_owned())
}

/// A journaled pass.
#[derive(Debug, Clone, PartialEq, Queryable, Selectable)]
#[diesel(table_name = pass_runs)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct PassRunRow {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub dry_run: bool,
    pub total_advanced: i64,
    pub total_failed: i64,
    pub aborted: Option<String>,
    pub report: String,
}

impl PassRunRow {
    /// Decode the stored report.
    pub fn to_pass_run(&self) -> Result<PassRun, serde_json::Error> {
        let report: PassReport = serde_json::from_str(&self.report)?;
        Ok(PassRun::new(self.id, report))
    }
}

/// A pass to journal.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = pass_runs)]
pub struct NewPassRunRow {
    pub started_at: String,
    pub finished_at: Option<String>,
    pub dry_run: bool,
    pub total_advanced: i64,
    pub total_failed: i64,
    pub aborted: Option<String>,
    pub report: String,
}

impl NewPassRunRow {
    /// Summary columns plus the full report as JSON.
    pub fn new(report: &PassReport) -> Result<Self, serde_json::Error> {
        Ok(Self {
            started_at: timestamp_column(report.started_at),
            finished_at: report.finished_at.map(timestamp_column),
            dry_run: report.dry_run,
            total_advanced: i64::try_from(report.total_advanced()).unwrap_or(i64::MAX),
            total_failed: i64::try_from(report.total_failed()).unwrap_or(i64::MAX),
            aborted: report.aborted.clone(),
            report: serde_json::to_string(report)?,
        })
    }
}
