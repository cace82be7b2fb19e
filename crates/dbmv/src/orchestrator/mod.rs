//! Migration orchestrator - runs the requested phases in order.

mod output;

pub use output::{write_ddl, DdlFile};

use crate::config::Config;
use crate::connector::{Connector, ConnectorFactory, DriverFactory};
use crate::core::MetadataRow;
use crate::ddl::{self, split_statements, ConversionContext};
use crate::dialect::PairProfile;
use crate::error::{MigrateError, Result};
use crate::pipeline::{plan_copy_jobs, CopyJob, LoadOptions, LoadReport, Loader, WorkerSlot};
use crate::template::{CatalogQueries, DdlTemplates, PreSlot, TemplateSource};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Phases requested for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Actions {
    pub create_tables: bool,
    pub create_views: bool,
    pub create_indexes: bool,
    pub apply_ddl: bool,
    pub load_data: bool,
    pub unload: bool,
}

impl Actions {
    /// Generate every kind of DDL.
    pub fn create_all() -> Self {
        Self {
            create_tables: true,
            create_views: true,
            create_indexes: true,
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    fn creates_all(&self) -> bool {
        self.create_tables && self.create_views && self.create_indexes
    }

    fn needs_target(&self) -> bool {
        self.apply_ddl || self.load_data
    }

    fn needs_tables(&self) -> bool {
        self.create_tables || self.load_data || self.unload
    }
}

/// Statements generated per DDL kind.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StatementCounts {
    pub tables: usize,
    pub views: usize,
    pub uniques: usize,
    pub indexes: usize,
    pub foreign_keys: usize,
}

/// Result of a migration run.
#[derive(Debug, Clone, Serialize)]
pub struct MigrationResult {
    /// Unique run identifier.
    pub run_id: String,

    /// `completed`, or `completed_with_errors` when some unit of work failed
    /// under continue-on-error.
    pub status: String,

    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_seconds: f64,

    pub actions: Actions,
    pub statements: StatementCounts,

    /// DDL statements executed against the destination.
    pub applied: usize,

    /// DDL statements that failed and were passed over.
    pub failed_statements: Vec<String>,

    /// Views the destination rejected.
    pub view_failures: Vec<String>,

    pub load: Option<LoadReport>,
    pub unload: Option<LoadReport>,

    /// Every file written, DDL and unload.
    pub files: Vec<PathBuf>,
}

impl MigrationResult {
    fn new(actions: Actions) -> Self {
        let now = Utc::now();
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            status: "running".to_string(),
            started_at: now,
            completed_at: now,
            duration_seconds: 0.0,
            actions,
            statements: StatementCounts::default(),
            applied: 0,
            failed_statements: Vec::new(),
            view_failures: Vec::new(),
            load: None,
            unload: None,
            files: Vec::new(),
        }
    }

    fn has_errors(&self) -> bool {
        let failed = |report: &Option<LoadReport>| report.as_ref().is_some_and(|r| r.tables_failed > 0);
        !self.failed_statements.is_empty()
            || !self.view_failures.is_empty()
            || failed(&self.load)
            || failed(&self.unload)
    }

    /// Result as pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Migration orchestrator.
pub struct Orchestrator {
    config: Config,
    factory: Arc<dyn ConnectorFactory>,
    cancel: CancellationToken,
}

impl Orchestrator {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            factory: Arc::new(DriverFactory),
            cancel: CancellationToken::new(),
        }
    }

    /// Replace the driver factory used for every connection.
    pub fn with_factory(mut self, factory: Arc<dyn ConnectorFactory>) -> Self {
        self.factory = factory;
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Conversion inputs for the configured dialect pair.
    pub fn context(&self, templates: &dyn TemplateSource) -> Result<ConversionContext> {
        Ok(ConversionContext {
            profile: PairProfile::select(self.config.source.dialect, self.config.target.dialect)?,
            templates: DdlTemplates::load(templates, self.config.target.dialect)?,
            filter: self.config.table_filter()?,
            schemas: self.config.schema_mapper()?,
            options: self.config.ddl_options(),
        })
    }

    /// Run the requested phases.
    pub async fn run(&self, actions: Actions) -> Result<MigrationResult> {
        if actions.is_empty() {
            return Err(MigrateError::Config(
                "nothing to do: select at least one action".into(),
            ));
        }
        let mut result = MigrationResult::new(actions);
        info!(
            "Starting run {}: {} -> {}",
            result.run_id, self.config.source, self.config.target
        );

        let templates = self.config.template_source()?;
        let ctx = self.context(templates.as_ref())?;
        let catalog = CatalogQueries::load(templates.as_ref(), self.config.source.dialect)?;

        let mut session = Some(self.connect(&actions).await?);
        let outcome = self
            .phases(&actions, &ctx, &catalog, &mut session, &mut result)
            .await;
        if let Some(mut slot) = session {
            slot.close().await;
        }
        outcome?;

        result.completed_at = Utc::now();
        result.duration_seconds =
            (result.completed_at - result.started_at).num_milliseconds() as f64 / 1000.0;
        result.status = if result.has_errors() {
            "completed_with_errors"
        } else {
            "completed"
        }
        .to_string();
        info!(
            "Run {} {} in {:.2}s",
            result.run_id, result.status, result.duration_seconds
        );
        Ok(result)
    }

    async fn connect(&self, actions: &Actions) -> Result<WorkerSlot> {
        let mut source = self.factory.connect(&self.config.source).await?;
        info!("Connected to source {}", self.config.source);
        if !actions.needs_target() {
            return Ok(WorkerSlot::new(source, None));
        }
        match self.factory.connect(&self.config.target).await {
            Ok(target) => {
                info!("Connected to target {}", self.config.target);
                Ok(WorkerSlot::new(source, Some(target)))
            }
            Err(e) => {
                let _ = source.close().await;
                Err(e)
            }
        }
    }

    async fn phases(
        &self,
        actions: &Actions,
        ctx: &ConversionContext,
        catalog: &CatalogQueries,
        session: &mut Option<WorkerSlot>,
        result: &mut MigrationResult,
    ) -> Result<()> {
        let output = &self.config.output;
        let schema_filter = self.config.source.schema_filter();

        let table_rows = if actions.needs_tables() {
            let sql = catalog.tables(schema_filter, &ctx.profile.unsupported_csv());
            let rows = source(session)?.fetch_metadata(&sql).await?;
            if rows.is_empty() {
                warn!("No tables found in source schema '{}'", schema_filter);
            }
            rows
        } else {
            Vec::new()
        };

        let mut table_ddl = Vec::new();
        if actions.create_tables {
            info!("Generating tables");
            table_ddl = ddl::tables(table_rows.iter().cloned(), ctx).collect::<Result<Vec<_>>>()?;
            result.statements.tables = count(&table_ddl, ctx);
            result
                .files
                .push(write_ddl(&output.directory, &output.prefix, DdlFile::Tables, &table_ddl)?);
        }

        let mut view_ddl = Vec::new();
        if actions.create_views {
            info!("Generating views");
            let rows = self.fetch(session, &catalog.views(schema_filter)).await?;
            view_ddl = ddl::views(rows, ctx).collect::<Result<Vec<_>>>()?;
            result.statements.views = count(&view_ddl, ctx);
            result
                .files
                .push(write_ddl(&output.directory, &output.prefix, DdlFile::Views, &view_ddl)?);
        }

        if actions.apply_ddl {
            let applied = self.apply(target(session)?, "table", &table_ddl, ctx, false).await?;
            result.applied += applied.executed;
            result.failed_statements.extend(applied.failures);

            let applied = self.apply(target(session)?, "view", &view_ddl, ctx, true).await?;
            result.applied += applied.executed;
            if !applied.failures.is_empty() {
                warn!(
                    "{} views could not be created: {}",
                    applied.failures.len(),
                    applied.failures.join(", ")
                );
            }
            result.view_failures = applied.failures;
        }

        if actions.load_data {
            info!("Loading data");
            let jobs = plan_copy_jobs(table_rows.iter().cloned(), ctx)?;
            let options = LoadOptions::from_config(&self.config.migration)
                .with_pre_script(self.pre_script(ctx));
            result.load = Some(self.copy(jobs, options, session).await?);
        }

        if actions.unload {
            info!("Unloading data to {:?}", output.directory);
            let jobs = plan_copy_jobs(table_rows.iter().cloned(), ctx)?;
            let options = LoadOptions::from_config(&self.config.migration)
                .unload_to(&output.directory, &self.config.migration.field_delimiter);
            let report = self.copy(jobs, options, session).await?;
            result.files.extend(report.files.iter().cloned());
            result.unload = Some(report);
        }

        if actions.create_indexes {
            info!("Generating constraints and indexes");
            let mut constraint_ddl = Vec::new();

            let rows = self.fetch(session, &catalog.uniques(schema_filter)).await?;
            let uniques = ddl::uniques(rows, ctx).collect::<Result<Vec<_>>>()?;
            result.statements.uniques = count(&uniques, ctx);
            constraint_ddl.extend(uniques);

            let rows = self.fetch(session, &catalog.indexes(schema_filter)).await?;
            let indexes = ddl::indexes(rows, ctx).collect::<Result<Vec<_>>>()?;
            result.statements.indexes = count(&indexes, ctx);
            constraint_ddl.extend(indexes);

            let rows = self.fetch(session, &catalog.foreign_keys(schema_filter)).await?;
            let foreign_keys = ddl::foreign_keys(rows, ctx).collect::<Result<Vec<_>>>()?;
            result.statements.foreign_keys = count(&foreign_keys, ctx);
            constraint_ddl.extend(foreign_keys);

            result.files.push(write_ddl(
                &output.directory,
                &output.prefix,
                DdlFile::Indexes,
                &constraint_ddl,
            )?);

            if actions.apply_ddl {
                let applied = self
                    .apply(target(session)?, "constraint", &constraint_ddl, ctx, false)
                    .await?;
                result.applied += applied.executed;
                result.failed_statements.extend(applied.failures);
            }

            if actions.creates_all() {
                let all: Vec<String> = table_ddl
                    .into_iter()
                    .chain(view_ddl)
                    .chain(constraint_ddl)
                    .collect();
                result
                    .files
                    .push(write_ddl(&output.directory, &output.prefix, DdlFile::All, &all)?);
            }
        }

        Ok(())
    }

    async fn fetch(&self, session: &mut Option<WorkerSlot>, sql: &str) -> Result<Vec<MetadataRow>> {
        debug!("Catalog query: {}", sql.trim());
        source(session)?.fetch_metadata(sql).await
    }

    /// Execute generated DDL one statement at a time.
    ///
    /// Failures abort unless `lenient` or continue-on-error is set, in which
    /// case the failing statements are returned.
    async fn apply(
        &self,
        target: &mut Box<dyn Connector>,
        kind: &str,
        ddl: &[String],
        ctx: &ConversionContext,
        lenient: bool,
    ) -> Result<Applied> {
        let migration = &self.config.migration;
        let text = ddl.concat();
        let mut applied = Applied::default();
        for stmt in split_statements(&text, &ctx.options.separator) {
            if self.cancel.is_cancelled() {
                return Err(MigrateError::Cancelled);
            }
            if migration.trial {
                debug!("Trial: skipping {} statement: {}", kind, stmt);
                continue;
            }
            match target.execute(stmt).await {
                Ok(()) => applied.executed += 1,
                Err(e) => {
                    let e = match e {
                        e @ MigrateError::Statement { .. } => e,
                        other => MigrateError::statement(stmt, other),
                    };
                    error!("{} statement failed: {}", kind, e);
                    if !(lenient || migration.continue_on_error) {
                        return Err(e);
                    }
                    applied.failures.push(stmt.to_string());
                }
            }
        }
        if applied.executed > 0 {
            target.commit().await?;
            info!("Applied {} {} statements", applied.executed, kind);
        }
        Ok(applied)
    }

    async fn copy(
        &self,
        jobs: Vec<CopyJob>,
        options: LoadOptions,
        session: &mut Option<WorkerSlot>,
    ) -> Result<LoadReport> {
        let slot = session.take().ok_or_else(lost_session)?;
        let loader = Loader::new(
            options,
            self.factory.as_ref(),
            &self.config.source,
            &self.config.target,
        )
        .with_cancel(self.cancel.clone());
        let run = loader.run(jobs, slot).await;
        *session = run.primary;
        run.report
    }

    /// Precondition script for destination connections. Empty when it needs
    /// a schema and none is known.
    fn pre_script(&self, ctx: &ConversionContext) -> String {
        let pre = &ctx.templates.pre;
        let schema = ctx.schemas.target_schema(self.config.source.schema_filter());
        if pre.uses(PreSlot::Scname) && schema.trim().is_empty() {
            return String::new();
        }
        let scname = ctx.quote(&schema);
        pre.render(|slot| match slot {
            PreSlot::Scname => scname.clone(),
            PreSlot::InsertMode => self.config.migration.insert_mode.to_uppercase(),
        })
    }
}

#[derive(Debug, Default)]
struct Applied {
    executed: usize,
    failures: Vec<String>,
}

fn count(ddl: &[String], ctx: &ConversionContext) -> usize {
    ddl.iter()
        .map(|group| split_statements(group, &ctx.options.separator).len())
        .sum()
}

fn lost_session() -> MigrateError {
    MigrateError::transfer("<session>", "connections were lost by an earlier phase")
}

fn source(session: &mut Option<WorkerSlot>) -> Result<&mut Box<dyn Connector>> {
    session
        .as_mut()
        .map(|slot| &mut slot.source)
        .ok_or_else(lost_session)
}

fn target(session: &mut Option<WorkerSlot>) -> Result<&mut Box<dyn Connector>> {
    let slot = session.as_mut().ok_or_else(lost_session)?;
    slot.target
        .as_mut()
        .ok_or_else(|| MigrateError::Config("this run has no destination connection".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connector::MemoryConnector;
    use crate::core::{Row, SqlValue};
    use crate::dialect::Dialect;

    const CONFIG: &str = r#"
source:
  dialect: mssql
  host: sql1
  user: sa
  password: secret
  schema: dbo
target:
  dialect: postgres
  host: pg1
  database: warehouse
migration:
  batch_size: 2
"#;

    fn catalog_row(values: &[&str]) -> Row {
        values
            .iter()
            .map(|v| if *v == "NULL" { SqlValue::Null } else { SqlValue::from(*v) })
            .collect()
    }

    fn script() -> MemoryConnector {
        MemoryConnector::new(Dialect::Mssql)
            .with_result(
                "FROM sys.tables",
                vec![
                    catalog_row(&["dbo", "A", "id", "INT", "4", "0", "NOT NULL", "NULL"]),
                    catalog_row(&["dbo", "A", "name", "VARCHAR", "10", "0", "", "NULL"]),
                    catalog_row(&["dbo", "B", "id", "INT", "4", "0", "NOT NULL", "NULL"]),
                ],
            )
            .with_result(
                "FROM sys.views",
                vec![catalog_row(&["dbo", "V", "CREATE VIEW dbo.V AS SELECT id FROM dbo.A"])],
            )
            .with_result(
                "FROM sys.key_constraints",
                vec![catalog_row(&["dbo", "A", "PK_A", "PRIMARY KEY", "id", "NULL"])],
            )
            .with_result(
                "FROM sys.indexes",
                vec![catalog_row(&["dbo", "A", "dbo", "ix_name", "BTREE", "", "name"])],
            )
            .with_result(
                "FROM \"dbo\".\"A\"",
                vec![
                    vec![SqlValue::I32(1), SqlValue::from("a")],
                    vec![SqlValue::I32(2), SqlValue::Null],
                    vec![SqlValue::I32(3), SqlValue::from("o'c")],
                ],
            )
            .with_result("FROM \"dbo\".\"B\"", vec![vec![SqlValue::I32(7)]])
    }

    fn orchestrator(script: &MemoryConnector, dir: &std::path::Path, edit: impl FnOnce(&mut Config)) -> Orchestrator {
        let mut config = Config::from_yaml(CONFIG).unwrap();
        config.output.directory = dir.to_path_buf();
        edit(&mut config);
        Orchestrator::new(config).with_factory(Arc::new(script.clone()))
    }

    #[tokio::test]
    async fn test_create_all_writes_files_without_target() {
        let script = script();
        let dir = tempfile::tempdir().unwrap();
        let result = orchestrator(&script, dir.path(), |_| {})
            .run(Actions::create_all())
            .await
            .unwrap();

        assert_eq!(result.status, "completed");
        assert_eq!(result.files.len(), 4);
        assert_eq!(script.log().connects(), 1);

        let tables = std::fs::read_to_string(dir.path().join("dbmv_tab.txt")).unwrap();
        assert!(tables.contains("CREATE TABLE dbo.A ("));
        assert!(tables.contains("CREATE TABLE dbo.B ("));
        let views = std::fs::read_to_string(dir.path().join("dbmv_viw.txt")).unwrap();
        assert!(views.starts_with("DROP VIEW IF EXISTS dbo.V;\n"));
        let index = std::fs::read_to_string(dir.path().join("dbmv_index.txt")).unwrap();
        assert!(index.contains("ADD CONSTRAINT PK_A PRIMARY KEY (id)"));
        assert!(index.contains("CREATE INDEX ix_name_ax11_A ON dbo.A (name)"));
        let all = std::fs::read_to_string(dir.path().join("dbmv_all.txt")).unwrap();
        assert_eq!(all, format!("{}{}{}", tables, views, index));
        assert_eq!(result.statements.indexes, 1);
    }

    #[tokio::test]
    async fn test_apply_and_load() {
        let script = script();
        let dir = tempfile::tempdir().unwrap();
        let actions = Actions {
            create_tables: true,
            apply_ddl: true,
            load_data: true,
            ..Default::default()
        };
        let result = orchestrator(&script, dir.path(), |_| {}).run(actions).await.unwrap();

        let load = result.load.unwrap();
        assert_eq!(load.rows, 4);
        assert_eq!(load.tables_loaded, 2);

        let log = script.log();
        let statements = log.statements();
        assert_eq!(statements[0], "CREATE SCHEMA IF NOT EXISTS dbo");
        assert!(statements[1].starts_with("CREATE TABLE dbo.A ("));
        assert!(statements.contains(&"SET search_path TO dbo, public".to_string()));
        assert_eq!(
            log.statements_starting_with("INSERT INTO dbo.A"),
            vec![
                "INSERT INTO dbo.A VALUES (1,'a'),(2,NULL)",
                "INSERT INTO dbo.A VALUES (3,'o''c')",
            ]
        );
        // source and target of the primary slot
        assert_eq!(log.closes(), 2);
    }

    #[tokio::test]
    async fn test_trial_reaches_nothing() {
        let script = script();
        let dir = tempfile::tempdir().unwrap();
        let actions = Actions {
            create_tables: true,
            apply_ddl: true,
            load_data: true,
            ..Default::default()
        };
        let result = orchestrator(&script, dir.path(), |c| c.migration.trial = true)
            .run(actions)
            .await
            .unwrap();

        assert_eq!(result.applied, 0);
        assert_eq!(result.load.unwrap().rows, 4);
        assert!(script.log().statements().is_empty());
    }

    #[tokio::test]
    async fn test_view_failures_are_collected() {
        let script = script().failing_on("CREATE VIEW");
        let dir = tempfile::tempdir().unwrap();
        let actions = Actions {
            create_views: true,
            apply_ddl: true,
            ..Default::default()
        };
        let result = orchestrator(&script, dir.path(), |_| {}).run(actions).await.unwrap();

        assert_eq!(result.view_failures.len(), 1);
        assert_eq!(result.status, "completed_with_errors");
        assert_eq!(
            script.log().statements(),
            vec!["DROP VIEW IF EXISTS dbo.V"]
        );
    }

    #[tokio::test]
    async fn test_table_failure_aborts() {
        let script = script().failing_on("CREATE TABLE dbo.B");
        let dir = tempfile::tempdir().unwrap();
        let actions = Actions {
            create_tables: true,
            apply_ddl: true,
            load_data: true,
            ..Default::default()
        };
        let err = orchestrator(&script, dir.path(), |_| {})
            .run(actions)
            .await
            .unwrap_err();
        assert_eq!(err.exit_code(), 4);
        assert!(script.log().statements_starting_with("INSERT").is_empty());
    }

    #[tokio::test]
    async fn test_unload_writes_data_files() {
        let script = script();
        let dir = tempfile::tempdir().unwrap();
        let actions = Actions {
            unload: true,
            ..Default::default()
        };
        let result = orchestrator(&script, dir.path(), |c| c.migration.field_delimiter = "|".into())
            .run(actions)
            .await
            .unwrap();

        assert_eq!(result.unload.unwrap().rows, 4);
        let a = std::fs::read_to_string(dir.path().join("dbo_A.txt")).unwrap();
        assert_eq!(a, "1|'a'\n2|\n3|'o''c'\n");
        assert_eq!(script.log().connects(), 1);
    }

    #[tokio::test]
    async fn test_empty_actions_rejected() {
        let script = script();
        let dir = tempfile::tempdir().unwrap();
        let err = orchestrator(&script, dir.path(), |_| {})
            .run(Actions::default())
            .await
            .unwrap_err();
        assert_eq!(err.exit_code(), 1);
    }
}
