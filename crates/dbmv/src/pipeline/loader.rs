//! Concurrent batch loader.
//!
//! Copy jobs go through a bounded queue consumed by one task per worker
//! slot. Every slot owns its own source (and, when loading, destination)
//! connection; the only state shared between tasks is the
//! [`GlobalInsertCounter`] and a cancellation token.

use super::{CopyJob, GlobalInsertCounter, UnloadFile};
use crate::config::{EndpointConfig, MigrationConfig};
use crate::connector::{Connector, ConnectorFactory};
use crate::core::Row;
use crate::error::{MigrateError, Result};
use futures::TryStreamExt;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Where copied rows end up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CopyMode {
    /// Multi-row INSERTs against the destination.
    Load,
    /// One delimited text file per table.
    Unload { directory: PathBuf, delimiter: String },
}

#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub threads: usize,
    pub batch_size: usize,
    pub max_rows: u64,
    pub truncate: bool,
    pub trial: bool,
    pub continue_on_error: bool,
    /// Rendered precondition script; statements separated by `;`.
    pub pre_script: String,
    pub mode: CopyMode,
}

impl LoadOptions {
    pub fn from_config(config: &MigrationConfig) -> Self {
        Self {
            threads: config.effective_threads(),
            batch_size: config.batch_size.max(1),
            max_rows: config.max_rows,
            truncate: config.truncate,
            trial: config.trial,
            continue_on_error: config.continue_on_error,
            pre_script: String::new(),
            mode: CopyMode::Load,
        }
    }

    pub fn with_pre_script(mut self, script: impl Into<String>) -> Self {
        self.pre_script = script.into();
        self
    }

    pub fn unload_to(mut self, directory: impl Into<PathBuf>, delimiter: impl Into<String>) -> Self {
        self.mode = CopyMode::Unload {
            directory: directory.into(),
            delimiter: delimiter.into(),
        };
        self
    }

    fn is_load(&self) -> bool {
        self.mode == CopyMode::Load
    }
}

/// A source and destination connection owned by one worker.
///
/// Unload runs need no destination, so `target` is optional.
pub struct WorkerSlot {
    pub index: usize,
    pub source: Box<dyn Connector>,
    pub target: Option<Box<dyn Connector>>,
    busy: bool,
}

impl WorkerSlot {
    pub fn new(source: Box<dyn Connector>, target: Option<Box<dyn Connector>>) -> Self {
        Self {
            index: 0,
            source,
            target,
            busy: false,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub async fn close(&mut self) {
        if let Err(e) = self.source.close().await {
            warn!("Worker {}: closing source failed: {}", self.index, e);
        }
        if let Some(target) = self.target.as_mut() {
            if let Err(e) = target.close().await {
                warn!("Worker {}: closing target failed: {}", self.index, e);
            }
        }
    }
}

/// Totals for one loader run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadReport {
    pub tables_attempted: usize,
    pub tables_loaded: usize,
    pub tables_failed: usize,
    pub tables_skipped: usize,
    pub rows: u64,
    pub batches: u64,
    pub workers: usize,
    pub duration_seconds: f64,
    pub failed_tables: Vec<String>,
    /// Files written by an unload run.
    pub files: Vec<PathBuf>,
}

impl LoadReport {
    fn record(&mut self, name: String, outcome: TableOutcome) {
        self.tables_attempted += 1;
        match outcome {
            TableOutcome::Copied { batches, file } => {
                self.tables_loaded += 1;
                self.batches += batches;
                self.files.extend(file);
            }
            TableOutcome::Failed { batches, file } => {
                self.tables_failed += 1;
                self.batches += batches;
                self.files.extend(file);
                self.failed_tables.push(name);
            }
            TableOutcome::Skipped => self.tables_skipped += 1,
        }
    }

    fn merge(&mut self, other: LoadReport) {
        self.tables_attempted += other.tables_attempted;
        self.tables_loaded += other.tables_loaded;
        self.tables_failed += other.tables_failed;
        self.tables_skipped += other.tables_skipped;
        self.batches += other.batches;
        self.failed_tables.extend(other.failed_tables);
        self.files.extend(other.files);
    }
}

/// Result of a run. The caller's slot comes back whether or not the run
/// succeeded.
pub struct LoadRun {
    pub primary: Option<WorkerSlot>,
    pub report: Result<LoadReport>,
}

enum TableOutcome {
    Copied { batches: u64, file: Option<PathBuf> },
    Failed { batches: u64, file: Option<PathBuf> },
    Skipped,
}

struct Shared {
    options: LoadOptions,
    counter: GlobalInsertCounter,
    cancel: CancellationToken,
}

pub struct Loader<'a> {
    options: LoadOptions,
    factory: &'a dyn ConnectorFactory,
    source: &'a EndpointConfig,
    target: &'a EndpointConfig,
    cancel: CancellationToken,
}

impl<'a> Loader<'a> {
    pub fn new(
        options: LoadOptions,
        factory: &'a dyn ConnectorFactory,
        source: &'a EndpointConfig,
        target: &'a EndpointConfig,
    ) -> Self {
        Self {
            options,
            factory,
            source,
            target,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Copy every job, using `primary` as slot 0 and opening up to
    /// `threads - 1` more slots.
    pub async fn run(&self, jobs: Vec<CopyJob>, mut primary: WorkerSlot) -> LoadRun {
        let started = Instant::now();
        primary.index = 0;

        if self.options.is_load() && primary.target.is_none() {
            return LoadRun {
                primary: Some(primary),
                report: Err(MigrateError::Config(
                    "loading data requires a destination connection".into(),
                )),
            };
        }
        if let Err(e) = self.prepare(&mut primary).await {
            return LoadRun {
                primary: Some(primary),
                report: Err(e),
            };
        }

        let wanted = self.options.threads.max(1).min(jobs.len().max(1));
        let mut slots = vec![primary];
        for index in 1..wanted {
            if self.cancel.is_cancelled() {
                break;
            }
            match self.open_slot(index).await {
                Ok(slot) => slots.push(slot),
                Err(e) => error!("Worker {} unavailable, continuing without it: {}", index, e),
            }
        }
        info!(
            "Copying {} tables with {} workers (batch size {}, row ceiling {})",
            jobs.len(),
            slots.len(),
            self.options.batch_size,
            self.options.max_rows
        );

        // Aborting this run must not cancel the caller's token.
        let abort = self.cancel.child_token();
        let shared = Arc::new(Shared {
            options: self.options.clone(),
            counter: GlobalInsertCounter::new(self.options.max_rows),
            cancel: abort.clone(),
        });
        let workers = slots.len();
        let (job_tx, job_rx) = async_channel::bounded::<CopyJob>(workers * 2);

        let mut handles = Vec::with_capacity(workers);
        for slot in slots {
            let job_rx = job_rx.clone();
            let shared = Arc::clone(&shared);
            handles.push(tokio::spawn(worker(slot, job_rx, shared)));
        }
        drop(job_rx);

        for job in jobs {
            if abort.is_cancelled() {
                break;
            }
            if job_tx.send(job).await.is_err() {
                break;
            }
        }
        drop(job_tx);

        let mut report = LoadReport {
            workers,
            ..Default::default()
        };
        let mut primary = None;
        let mut failure: Option<MigrateError> = None;
        for handle in handles {
            match handle.await {
                Ok((mut slot, result)) => {
                    if slot.index == 0 {
                        primary = Some(slot);
                    } else {
                        slot.close().await;
                    }
                    match result {
                        Ok(stats) => report.merge(stats),
                        Err(e) => keep_first(&mut failure, e),
                    }
                }
                Err(e) => keep_first(
                    &mut failure,
                    MigrateError::transfer("<worker>", format!("worker task failed: {}", e)),
                ),
            }
        }

        report.rows = shared.counter.get().await;
        report.duration_seconds = started.elapsed().as_secs_f64();

        if failure.is_none() && self.cancel.is_cancelled() {
            failure = Some(MigrateError::Cancelled);
        }
        if let Some(e) = failure {
            return LoadRun {
                primary,
                report: Err(e),
            };
        }

        if report.tables_loaded > 0 {
            info!("Data from all tables ({}) was loaded", report.tables_loaded);
        } else {
            warn!("No tables loaded");
        }
        LoadRun {
            primary,
            report: Ok(report),
        }
    }

    async fn open_slot(&self, index: usize) -> Result<WorkerSlot> {
        let mut source = self.factory.connect(self.source).await?;
        let target = if self.options.is_load() {
            match self.factory.connect(self.target).await {
                Ok(target) => Some(target),
                Err(e) => {
                    let _ = source.close().await;
                    return Err(e);
                }
            }
        } else {
            None
        };

        let mut slot = WorkerSlot::new(source, target);
        slot.index = index;
        if let Err(e) = self.prepare(&mut slot).await {
            slot.close().await;
            return Err(e);
        }
        debug!("Worker {} connected", index);
        Ok(slot)
    }

    /// Run the precondition script on the slot's destination.
    async fn prepare(&self, slot: &mut WorkerSlot) -> Result<()> {
        let Some(target) = slot.target.as_mut() else {
            return Ok(());
        };
        if !self.options.is_load() {
            return Ok(());
        }
        for stmt in self.options.pre_script.split(';').map(str::trim) {
            if stmt.is_empty() {
                continue;
            }
            if self.options.trial {
                debug!("Trial: skipping precondition '{}'", stmt);
                continue;
            }
            target.execute(stmt).await?;
        }
        Ok(())
    }
}

fn keep_first(slot: &mut Option<MigrateError>, err: MigrateError) {
    match slot {
        None => *slot = Some(err),
        Some(MigrateError::Cancelled) if !matches!(err, MigrateError::Cancelled) => *slot = Some(err),
        Some(_) => {}
    }
}

async fn worker(
    mut slot: WorkerSlot,
    jobs: async_channel::Receiver<CopyJob>,
    shared: Arc<Shared>,
) -> (WorkerSlot, Result<LoadReport>) {
    let mut stats = LoadReport::default();
    while let Ok(job) = jobs.recv().await {
        if shared.cancel.is_cancelled() {
            return (slot, Err(MigrateError::Cancelled));
        }
        slot.busy = true;
        let result = copy_table(&mut slot, &job, &shared).await;
        slot.busy = false;
        match result {
            Ok(outcome) => stats.record(job.qualified_name(), outcome),
            Err(e) => {
                shared.cancel.cancel();
                return (slot, Err(e));
            }
        }
    }
    debug!("Worker {} finished", slot.index);
    (slot, Ok(stats))
}

/// Destination of one table's batches.
enum Sink<'a> {
    Database(&'a mut Box<dyn Connector>),
    File(UnloadFile),
}

impl Sink<'_> {
    async fn write(&mut self, job: &CopyJob, rows: &[Row], trial: bool) -> Result<()> {
        match self {
            Sink::Database(target) => {
                let sql = job.insert.render_batch(rows);
                if trial {
                    return Ok(());
                }
                target.execute(&sql).await?;
                target.commit().await
            }
            Sink::File(file) => file.write_rows(rows).await,
        }
    }

    async fn finish(self) -> Result<Option<PathBuf>> {
        match self {
            Sink::Database(_) => Ok(None),
            Sink::File(file) => Ok(Some(file.finish().await?)),
        }
    }
}

/// Per-table progress, flushed batch by batch.
struct TableCopy<'s> {
    name: String,
    shared: &'s Shared,
    rows: u64,
    batches: u64,
    /// Global total as of this worker's last reservation.
    seen: u64,
    batch_failed: bool,
    read_failed: bool,
}

impl TableCopy<'_> {
    fn ceiling_seen(&self) -> bool {
        self.seen >= self.shared.options.max_rows
    }

    /// Reserve room under the ceiling, then write and count one batch.
    /// `Ok(false)` means the ceiling was already reached and the batch was
    /// discarded; `Err` means the run must stop.
    async fn flush(&mut self, sink: &mut Sink<'_>, job: &CopyJob, batch: &mut Vec<Row>) -> Result<bool> {
        let options = &self.shared.options;
        let size = batch.len() as u64;
        let Some(total) = self.shared.counter.try_reserve(size).await else {
            debug!("{}: row ceiling reached, discarding {} pending rows", self.name, size);
            batch.clear();
            self.seen = options.max_rows;
            return Ok(false);
        };
        self.seen = total;

        let result = sink.write(job, batch, options.trial).await;
        batch.clear();
        match result {
            Ok(()) => {
                self.rows += size;
                self.batches += 1;
                Ok(true)
            }
            Err(e) => {
                self.shared.counter.release(size).await;
                error!("{}: batch of {} rows failed: {}", self.name, size, e);
                self.batch_failed = true;
                if options.continue_on_error {
                    Ok(true)
                } else {
                    Err(MigrateError::transfer(&self.name, e.to_string()))
                }
            }
        }
    }
}

async fn copy_table(slot: &mut WorkerSlot, job: &CopyJob, shared: &Shared) -> Result<TableOutcome> {
    let options = &shared.options;
    if job.table_name.trim().is_empty() {
        warn!("Skipping copy job with an empty table name");
        return Ok(TableOutcome::Skipped);
    }
    let name = job.qualified_name();
    let seen = shared.counter.get().await;
    if seen >= options.max_rows {
        debug!("{}: row ceiling already reached, not copied", name);
        return Ok(TableOutcome::Skipped);
    }

    let started = Instant::now();
    let mut sink = match &options.mode {
        CopyMode::Load => {
            let target = slot.target.as_mut().ok_or_else(|| {
                MigrateError::transfer(&name, "worker has no destination connection")
            })?;
            if options.truncate && !job.truncate_sql.is_empty() {
                if options.trial {
                    debug!("Trial: skipping '{}'", job.truncate_sql);
                } else if let Err(e) = truncate(target, &job.truncate_sql).await {
                    error!("{}: truncate failed: {}", name, e);
                    if !options.continue_on_error {
                        return Err(e);
                    }
                    return Ok(TableOutcome::Failed {
                        batches: 0,
                        file: None,
                    });
                }
            }
            Sink::Database(target)
        }
        CopyMode::Unload {
            directory,
            delimiter,
        } => Sink::File(UnloadFile::create(directory, job, delimiter).await?),
    };

    let mut stream = match slot.source.query(&job.select_sql).await {
        Ok(stream) => stream,
        Err(e) => {
            error!("{}: cannot open source cursor: {}", name, e);
            return Ok(TableOutcome::Failed {
                batches: 0,
                file: sink.finish().await?,
            });
        }
    };

    let mut table = TableCopy {
        name,
        shared,
        rows: 0,
        batches: 0,
        seen,
        batch_failed: false,
        read_failed: false,
    };
    let mut batch: Vec<Row> = Vec::with_capacity(options.batch_size);
    loop {
        if shared.cancel.is_cancelled() {
            return Err(MigrateError::Cancelled);
        }
        let row = match stream.try_next().await {
            Ok(Some(row)) => row,
            Ok(None) => break,
            Err(e) => {
                error!("{}: reading source rows failed: {}", table.name, e);
                table.read_failed = true;
                break;
            }
        };
        batch.push(row);

        let pending = batch.len() as u64;
        if batch.len() >= options.batch_size || pending + table.seen >= options.max_rows {
            let written = table.flush(&mut sink, job, &mut batch).await?;
            if !written || table.ceiling_seen() {
                break;
            }
        }
    }
    drop(stream);

    if !batch.is_empty() {
        if table.read_failed {
            error!(
                "{}: {} rows read before the failure were not written",
                table.name,
                batch.len()
            );
        } else {
            table.flush(&mut sink, job, &mut batch).await?;
        }
    }
    if table.ceiling_seen() {
        info!("{}: row ceiling of {} reached", table.name, options.max_rows);
    }
    let file = sink.finish().await?;

    let elapsed = started.elapsed().as_secs_f64();
    let rows_per_sec = if elapsed > 0.0 {
        (table.rows as f64 / elapsed) as u64
    } else {
        0
    };
    info!(
        "{}: copied {} rows in {} batches ({:.2}s, {} rows/sec)",
        table.name, table.rows, table.batches, elapsed, rows_per_sec
    );

    Ok(if table.batch_failed || table.read_failed {
        TableOutcome::Failed {
            batches: table.batches,
            file,
        }
    } else {
        TableOutcome::Copied {
            batches: table.batches,
            file,
        }
    })
}

async fn truncate(target: &mut Box<dyn Connector>, sql: &str) -> Result<()> {
    target.execute(sql).await?;
    target.commit().await
}
