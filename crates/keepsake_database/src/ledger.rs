//! `LedgerStore` implementation on SQLite.

use crate::models::{
    MediaRecordRow, NewMediaRecordRow, NewPassRunRow, PassRunRow, TransitionChangeset,
    timestamp_column,
};
use crate::schema::{media_records, pass_runs};
use crate::{DatabaseResult, LedgerPool, create_pool, run_migrations};
use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel::dsl::sql;
use diesel::sql_types::{BigInt, Bool, Text};
use diesel::sqlite::SqliteConnection;
use keepsake_core::{
    AcquiredAttrs, EligibilityQuery, Failure, LedgerStats, MediaRecord, Mutation, PassReport,
    PassRun, ReplicaFlags, ReplicaPolicy, Stage, TransitionResult, UpsertResult,
};
use keepsake_error::{DatabaseError, DatabaseErrorKind, KeepsakeResult};
use keepsake_interface::LedgerStore;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

/// Durable ledger backed by a SQLite file.
#[derive(Clone)]
pub struct SqliteLedger {
    pool: LedgerPool,
    policy: ReplicaPolicy,
    path: PathBuf,
}

impl std::fmt::Debug for SqliteLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteLedger")
            .field("path", &self.path)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

#[derive(QueryableByName)]
struct StageCount {
    #[diesel(sql_type = Text)]
    stage: String,
    #[diesel(sql_type = BigInt)]
    n: i64,
}

#[derive(QueryableByName)]
struct SizeTotals {
    #[diesel(sql_type = BigInt)]
    bytes_original: i64,
    #[diesel(sql_type = BigInt)]
    bytes_current: i64,
}

impl SqliteLedger {
    /// Open (creating and migrating if needed) the ledger at `path`.
    ///
    /// Blocks while the first connection opens and migrations run.
    ///
    /// # Errors
    ///
    /// Returns `Connection` or `Migration` errors.
    #[instrument(skip_all, fields(path = %path.as_ref().display(), pool_size = pool_size))]
    pub fn open(
        path: impl AsRef<Path>,
        pool_size: u32,
        policy: ReplicaPolicy,
    ) -> DatabaseResult<Self> {
        let path = path.as_ref().to_path_buf();
        let pool = create_pool(&path, pool_size)?;
        let mut conn = pool.get()?;
        run_migrations(&mut conn)?;
        info!("Ledger ready");
        Ok(Self { pool, policy, path })
    }

    /// Location of the ledger file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replication policy used to validate transitions.
    pub fn policy(&self) -> &ReplicaPolicy {
        &self.policy
    }

    /// Write a consistent snapshot of the ledger to `destination`.
    ///
    /// # Errors
    ///
    /// Fails if `destination` already exists or SQLite cannot write it.
    #[instrument(skip_all, fields(destination = %destination.display()))]
    pub async fn backup_to(&self, destination: &Path) -> KeepsakeResult<()> {
        if destination.exists() {
            return Err(DatabaseError::new(DatabaseErrorKind::Query(format!(
                "backup target {} already exists",
                destination.display()
            )))
            .into());
        }
        let target = destination.to_string_lossy().replace('\'', "''");
        self.with_conn(move |conn| {
            diesel::sql_query(format!("VACUUM INTO '{}'", target)).execute(conn)?;
            Ok(())
        })
        .await?;
        info!("Ledger backed up");
        Ok(())
    }

    async fn with_conn<T, F>(&self, f: F) -> DatabaseResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut SqliteConnection) -> DatabaseResult<T> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;
            f(&mut conn)
        })
        .await
        .map_err(|e| DatabaseError::new(DatabaseErrorKind::Query(e.to_string())))?
    }
}

fn load_row(conn: &mut SqliteConnection, record_id: &str) -> DatabaseResult<Option<MediaRecordRow>> {
    Ok(media_records::table
        .find(record_id)
        .select(MediaRecordRow::as_select())
        .first(conn)
        .optional()?)
}

fn decode(row: &MediaRecordRow) -> DatabaseResult<MediaRecord> {
    row.to_record().map_err(|reason| {
        DatabaseError::new(DatabaseErrorKind::CorruptRow(format!("{}: {}", row.id, reason)))
    })
}

fn not_found(record_id: &str) -> DatabaseError {
    DatabaseError::new(DatabaseErrorKind::NotFound(format!("media record {}", record_id)))
}

fn quarantine_corrupt(
    conn: &mut SqliteConnection,
    row: &MediaRecordRow,
    reason: &str,
) -> DatabaseResult<()> {
    warn!(record_id = %row.id, %reason, "Quarantining corrupted ledger row");
    diesel::update(media_records::table.find(&row.id))
        .set((
            media_records::quarantined.eq(true),
            media_records::error_count.eq(media_records::error_count + 1),
            media_records::last_error.eq(format!("corrupted ledger row: {}", reason)),
            media_records::last_attempt_at.eq(timestamp_column(Utc::now())),
        ))
        .execute(conn)?;
    Ok(())
}

#[async_trait]
impl LedgerStore for SqliteLedger {
    #[instrument(skip(self, attrs))]
    async fn record_acquisition(
        &self,
        source_reference: &str,
        attrs: &AcquiredAttrs,
    ) -> KeepsakeResult<UpsertResult> {
        let source_reference = source_reference.to_string();
        let attrs = attrs.clone();
        let record = self
            .with_conn(move |conn| {
                conn.immediate_transaction::<_, DatabaseError, _>(|conn| {
                    let existing = media_records::table
                        .filter(media_records::source_reference.eq(&source_reference))
                        .select(MediaRecordRow::as_select())
                        .first(conn)
                        .optional()?;
                    if let Some(row) = existing {
                        debug!(record_id = %row.id, "Source reference already acquired");
                        return Ok(UpsertResult::Existing(decode(&row)?));
                    }

                    let record = MediaRecord::acquired(
                        uuid::Uuid::new_v4().to_string(),
                        source_reference.as_str(),
                        &attrs,
                        Utc::now(),
                    );
                    diesel::insert_into(media_records::table)
                        .values(NewMediaRecordRow::from(&record))
                        .execute(conn)?;
                    info!(record_id = %record.id(), "Recorded acquisition");
                    Ok(UpsertResult::Created(record))
                })
            })
            .await?;
        Ok(record)
    }

    #[instrument(skip(self))]
    async fn get(&self, id: &str) -> KeepsakeResult<Option<MediaRecord>> {
        let id = id.to_string();
        let record = self
            .with_conn(move |conn| load_row(conn, &id)?.as_ref().map(decode).transpose())
            .await?;
        Ok(record)
    }

    #[instrument(skip(self))]
    async fn find_by_source_reference(
        &self,
        source_reference: &str,
    ) -> KeepsakeResult<Option<MediaRecord>> {
        let source_reference = source_reference.to_string();
        let record = self
            .with_conn(move |conn| {
                media_records::table
                    .filter(media_records::source_reference.eq(&source_reference))
                    .select(MediaRecordRow::as_select())
                    .first(conn)
                    .optional()?
                    .as_ref()
                    .map(decode)
                    .transpose()
            })
            .await?;
        Ok(record)
    }

    #[instrument(skip(self))]
    async fn find_eligible(&self, query: &EligibilityQuery) -> KeepsakeResult<Vec<MediaRecord>> {
        let stages: Vec<String> = query.stages().iter().map(|s| s.as_str().to_string()).collect();
        let missing = query.missing_replica().clone();
        let limit = i64::try_from(*query.limit()).unwrap_or(i64::MAX);
        let read_only = *query.read_only();

        let records = self
            .with_conn(move |conn| {
                let mut select = media_records::table
                    .select(MediaRecordRow::as_select())
                    .filter(media_records::quarantined.eq(false))
                    .filter(media_records::stage.eq_any(&stages))
                    .into_boxed();
                if let Some(destination) = &missing {
                    select = select.filter(
                        sql::<Bool>("instr(replica_flags, ")
                            .bind::<Text, _>(ReplicaFlags::column_token(destination))
                            .sql(") = 0"),
                    );
                }
                let rows: Vec<MediaRecordRow> = select
                    .order((media_records::updated_at.asc(), media_records::id.asc()))
                    .limit(limit)
                    .load(conn)?;

                let mut records = Vec::with_capacity(rows.len());
                for row in rows {
                    match row.to_record() {
                        Ok(record) => records.push(record),
                        Err(reason) if read_only => {
                            warn!(record_id = %row.id, %reason, "Skipping corrupted ledger row");
                        }
                        Err(reason) => quarantine_corrupt(conn, &row, &reason)?,
                    }
                }
                Ok(records)
            })
            .await?;
        debug!(count = records.len(), "Found eligible records");
        Ok(records)
    }

    #[instrument(skip(self, mutation), fields(target = %mutation.target()))]
    async fn apply_transition(
        &self,
        id: &str,
        expected_stage: Stage,
        mutation: &Mutation,
    ) -> KeepsakeResult<TransitionResult> {
        let id = id.to_string();
        let mutation = mutation.clone();
        let policy = self.policy.clone();

        let result = self
            .with_conn(move |conn| {
                conn.immediate_transaction::<_, DatabaseError, _>(|conn| {
                    let row = load_row(conn, &id)?.ok_or_else(|| not_found(&id))?;
                    let current = decode(&row)?;
                    if *current.stage() != expected_stage {
                        return Ok(TransitionResult::Conflict {
                            current_stage: *current.stage(),
                        });
                    }

                    let next = current
                        .transition(&mutation, &policy, Utc::now())
                        .map_err(|e| {
                            DatabaseError::new(DatabaseErrorKind::InvalidTransition(e.to_string()))
                        })?;

                    let updated = diesel::update(
                        media_records::table
                            .find(&id)
                            .filter(media_records::stage.eq(expected_stage.as_str()))
                            .filter(media_records::version.eq(row.version)),
                    )
                    .set(TransitionChangeset::new(&next, row.version + 1))
                    .execute(conn)?;

                    if updated == 0 {
                        let current_stage = load_row(conn, &id)?
                            .ok_or_else(|| not_found(&id))
                            .and_then(|row| decode(&row))?;
                        return Ok(TransitionResult::Conflict {
                            current_stage: *current_stage.stage(),
                        });
                    }
                    Ok(TransitionResult::Applied(next))
                })
            })
            .await?;

        match &result {
            TransitionResult::Applied(record) => {
                debug!(record_id = %record.id(), stage = %record.stage(), "Transition applied")
            }
            TransitionResult::Conflict { current_stage } => {
                debug!(%current_stage, "Transition conflict")
            }
        }
        Ok(result)
    }

    #[instrument(skip(self, failure), fields(class = %failure.class()))]
    async fn record_failure(
        &self,
        id: &str,
        failure: &Failure,
        max_failures: u32,
    ) -> KeepsakeResult<MediaRecord> {
        let id = id.to_string();
        let failure = failure.clone();

        let record = self
            .with_conn(move |conn| {
                conn.immediate_transaction::<_, DatabaseError, _>(|conn| {
                    let (error_count, quarantined): (i32, bool) = media_records::table
                        .find(&id)
                        .select((media_records::error_count, media_records::quarantined))
                        .first(conn)
                        .optional()?
                        .ok_or_else(|| not_found(&id))?;

                    let error_count = u32::try_from(error_count).unwrap_or(0).saturating_add(1);
                    let quarantine = quarantined || failure.quarantines(error_count, max_failures);
                    let now = timestamp_column(Utc::now());

                    diesel::update(media_records::table.find(&id))
                        .set((
                            media_records::error_count
                                .eq(i32::try_from(error_count).unwrap_or(i32::MAX)),
                            media_records::last_error.eq(failure.message()),
                            media_records::last_attempt_at.eq(&now),
                            media_records::updated_at.eq(&now),
                            media_records::quarantined.eq(quarantine),
                        ))
                        .execute(conn)?;

                    let row = load_row(conn, &id)?.ok_or_else(|| not_found(&id))?;
                    decode(&row)
                })
            })
            .await?;

        if *record.quarantined() {
            warn!(record_id = %record.id(), error_count = record.error_count(), "Record quarantined");
        }
        Ok(record)
    }

    #[instrument(skip(self))]
    async fn clear_quarantine(&self, id: &str) -> KeepsakeResult<bool> {
        let id = id.to_string();
        let released = self
            .with_conn(move |conn| {
                conn.immediate_transaction::<_, DatabaseError, _>(|conn| {
                    let updated = diesel::update(
                        media_records::table
                            .find(&id)
                            .filter(media_records::quarantined.eq(true)),
                    )
                    .set((
                        media_records::quarantined.eq(false),
                        media_records::error_count.eq(0),
                        media_records::updated_at.eq(timestamp_column(Utc::now())),
                    ))
                    .execute(conn)?;
                    if updated == 0 && load_row(conn, &id)?.is_none() {
                        return Err(not_found(&id));
                    }
                    Ok(updated > 0)
                })
            })
            .await?;
        if released {
            info!("Record released from quarantine");
        }
        Ok(released)
    }

    #[instrument(skip(self))]
    async fn list_quarantined(&self, limit: usize) -> KeepsakeResult<Vec<MediaRecord>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let records = self
            .with_conn(move |conn| {
                let rows: Vec<MediaRecordRow> = media_records::table
                    .filter(media_records::quarantined.eq(true))
                    .order((media_records::updated_at.desc(), media_records::id.asc()))
                    .limit(limit)
                    .select(MediaRecordRow::as_select())
                    .load(conn)?;
                Ok(rows
                    .iter()
                    .filter_map(|row| match row.to_record() {
                        Ok(record) => Some(record),
                        Err(reason) => {
                            warn!(record_id = %row.id, %reason, "Skipping corrupted ledger row");
                            None
                        }
                    })
                    .collect::<Vec<_>>())
            })
            .await?;
        Ok(records)
    }

    #[instrument(skip(self))]
    async fn stats(&self) -> KeepsakeResult<LedgerStats> {
        let stats = self
            .with_conn(|conn| {
                let mut stats = LedgerStats::empty();
                let counts: Vec<StageCount> = diesel::sql_query(
                    "SELECT stage, COUNT(*) AS n FROM media_records GROUP BY stage",
                )
                .load(conn)?;
                for count in counts {
                    let n = u64::try_from(count.n).unwrap_or(0);
                    stats.total += n;
                    match count.stage.parse::<Stage>() {
                        Ok(stage) => {
                            stats.by_stage.insert(stage, n);
                        }
                        Err(reason) => warn!(%reason, n, "Records with unknown stage"),
                    }
                }

                let quarantined: i64 = media_records::table
                    .filter(media_records::quarantined.eq(true))
                    .count()
                    .get_result(conn)?;
                stats.quarantined = u64::try_from(quarantined).unwrap_or(0);

                let sizes: SizeTotals = diesel::sql_query(
                    "SELECT COALESCE(SUM(byte_size_original), 0) AS bytes_original, \
                     COALESCE(SUM(byte_size_current), 0) AS bytes_current FROM media_records",
                )
                .get_result(conn)?;
                stats.bytes_original = u64::try_from(sizes.bytes_original).unwrap_or(0);
                stats.bytes_current = u64::try_from(sizes.bytes_current).unwrap_or(0);
                Ok(stats)
            })
            .await?;
        Ok(stats)
    }

    #[instrument(skip(self, report), fields(dry_run = report.dry_run))]
    async fn record_pass(&self, report: &PassReport) -> KeepsakeResult<i64> {
        let row = NewPassRunRow::new(report).map_err(DatabaseError::from)?;
        let id = self
            .with_conn(move |conn| {
                conn.immediate_transaction::<_, DatabaseError, _>(|conn| {
                    diesel::insert_into(pass_runs::table)
                        .values(&row)
                        .execute(conn)?;
                    let id = diesel::select(diesel::dsl::sql::<BigInt>("last_insert_rowid()"))
                        .get_result::<i64>(conn)?;
                    Ok(id)
                })
            })
            .await?;
        debug!(pass_id = id, "Pass journaled");
        Ok(id)
    }

    #[instrument(skip(self))]
    async fn recent_passes(&self, limit: usize) -> KeepsakeResult<Vec<PassRun>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let runs = self
            .with_conn(move |conn| {
                let rows: Vec<PassRunRow> = pass_runs::table
                    .order(pass_runs::id.desc())
                    .limit(limit)
                    .select(PassRunRow::as_select())
                    .load(conn)?;
                Ok(rows
                    .iter()
                    .filter_map(|row| match row.to_pass_run() {
                        Ok(run) => Some(run),
                        Err(e) => {
                            warn!(pass_id = row.id, error = %e, "Skipping unreadable pass journal entry");
                            None
                        }
                    })
                    .collect::<Vec<_>>())
            })
            .await?;
        Ok(runs)
    }
}
