//! dbmv CLI - heterogeneous database migration.

use clap::{Args, Parser, Subcommand};
use dbmv::{Actions, Config, EndpointConfig, LoadMethod, MigrateError, MigrationResult, Orchestrator, PairProfile};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::{info, Level};
use tracing_subscriber::fmt::format::FmtSpan;

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

#[derive(Parser)]
#[command(name = "dbmv")]
#[command(about = "Convert schemas and copy data between heterogeneous databases")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Output JSON result to stdout
    #[arg(long)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate DDL, apply it and copy data
    Run(RunArgs),

    /// Print the type mapping for the configured dialect pair
    Mapping,

    /// Validate the configuration and print the effective settings
    CheckConfig,
}

#[derive(Args, Debug, Default)]
struct RunArgs {
    /// Generate CREATE TABLE statements
    #[arg(long)]
    create_tables: bool,

    /// Generate view definitions
    #[arg(long)]
    create_views: bool,

    /// Generate unique constraints, indexes and foreign keys
    #[arg(long)]
    create_indexes: bool,

    /// Generate tables, views, constraints and indexes
    #[arg(long)]
    create_all: bool,

    /// Execute the generated DDL against the destination
    #[arg(long)]
    apply_ddl: bool,

    /// Copy table data into the destination
    #[arg(long)]
    load_data: bool,

    /// Write table data to delimited files instead of the destination
    #[arg(long)]
    unload: bool,

    /// Walk every step without sending statements to the destination
    #[arg(long)]
    trial: bool,

    /// Truncate each table before loading it
    #[arg(long)]
    truncate: bool,

    /// Number of worker slots (1-32)
    #[arg(long)]
    threads: Option<usize>,

    /// Worker preset: serial, parallel or multitable
    #[arg(long)]
    load_method: Option<LoadMethod>,

    /// Rows per INSERT statement
    #[arg(long)]
    batch_size: Option<usize>,

    /// Stop after this many rows across all tables
    #[arg(long)]
    max_rows: Option<u64>,

    /// Log failed statements and batches, then keep going
    #[arg(long)]
    continue_on_error: bool,

    /// Drop columns of unmapped types instead of failing
    #[arg(long)]
    skip_unsupported: bool,

    /// Source as dialect://host[:port][/database[?user[&password]]]
    #[arg(long)]
    src: Option<String>,

    /// Destination as dialect://host[:port][/database[?user[&password]]]
    #[arg(long)]
    dest: Option<String>,

    /// Put every table in this destination schema
    #[arg(long)]
    target_schema: Option<String>,

    /// Schema translation, e.g. "scname:dbo,public"
    #[arg(long)]
    translation: Option<String>,
}

impl RunArgs {
    fn actions(&self) -> Actions {
        Actions {
            create_tables: self.create_tables || self.create_all,
            create_views: self.create_views || self.create_all,
            create_indexes: self.create_indexes || self.create_all,
            apply_ddl: self.apply_ddl,
            load_data: self.load_data,
            unload: self.unload,
        }
    }

    /// Layer the flags over the file configuration.
    fn apply(&self, config: &mut Config) -> Result<(), MigrateError> {
        if let Some(url) = &self.src {
            let mut endpoint = EndpointConfig::from_url(url)?;
            endpoint.schema = config.source.schema.clone();
            config.source = endpoint;
        }
        if let Some(url) = &self.dest {
            let mut endpoint = EndpointConfig::from_url(url)?;
            endpoint.schema = config.target.schema.clone();
            config.target = endpoint;
        }

        let migration = &mut config.migration;
        migration.trial |= self.trial;
        migration.truncate |= self.truncate;
        migration.continue_on_error |= self.continue_on_error;
        migration.skip_unsupported |= self.skip_unsupported;
        if let Some(threads) = self.threads {
            migration.threads = threads;
        }
        if self.load_method.is_some() {
            migration.load_method = self.load_method;
        }
        if let Some(batch_size) = self.batch_size {
            migration.batch_size = batch_size;
        }
        if let Some(max_rows) = self.max_rows {
            migration.max_rows = max_rows;
        }
        if let Some(schema) = &self.target_schema {
            migration.target_schema = Some(schema.clone());
        }
        if let Some(translation) = &self.translation {
            migration.translation = Some(translation.clone());
        }
        config.validate()
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<(), MigrateError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format);

    let mut config = Config::load(&cli.config)?;
    info!("Loaded configuration from {:?}", cli.config);

    match cli.command {
        Commands::Run(args) => {
            args.apply(&mut config)?;
            let actions = args.actions();
            let cancel = setup_signal_handler();
            let result = Orchestrator::new(config)
                .with_cancel(cancel)
                .run(actions)
                .await?;

            if cli.output_json {
                println!("{}", result.to_json()?);
            } else {
                print_summary(&result);
            }
        }

        Commands::Mapping => {
            let profile = PairProfile::select(config.source.dialect, config.target.dialect)?;
            println!(
                "Type mapping {} -> {} ({} types)",
                profile.source(),
                profile.target(),
                profile.types().len()
            );
            println!("{:<20} {:<32} {:<32} INSERT", "SOURCE", "TARGET", "SELECT");
            for (name, rule) in profile.types().iter() {
                println!(
                    "{:<20} {:<32} {:<32} {}",
                    name, rule.declaration, rule.select_cast, rule.insert_cast
                );
            }
            let skipped = profile.unsupported_csv();
            if !skipped.is_empty() {
                println!("\nNot migrated: '{}'", skipped);
            }
        }

        Commands::CheckConfig => {
            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&config.redacted())?);
            } else {
                println!("Configuration is valid.\n");
                print!("{}", config.to_redacted_yaml()?);
                println!(
                    "\n# effective worker slots: {}",
                    config.migration.effective_threads()
                );
            }
        }
    }

    Ok(())
}

fn print_summary(result: &MigrationResult) {
    println!("\nRun {}: {}", result.run_id, result.status);
    println!("  Duration: {:.2}s", result.duration_seconds);
    let counts = &result.statements;
    println!(
        "  Statements: {} table, {} view, {} unique, {} index, {} foreign key",
        counts.tables, counts.views, counts.uniques, counts.indexes, counts.foreign_keys
    );
    if result.applied > 0 {
        println!("  Applied: {}", result.applied);
    }
    if let Some(load) = &result.load {
        println!(
            "  Loaded: {} rows into {}/{} tables ({} batches, {} workers)",
            load.rows, load.tables_loaded, load.tables_attempted, load.batches, load.workers
        );
        if !load.failed_tables.is_empty() {
            println!("  Failed tables: {:?}", load.failed_tables);
        }
    }
    if let Some(unload) = &result.unload {
        println!("  Unloaded: {} rows from {} tables", unload.rows, unload.tables_loaded);
    }
    if !result.view_failures.is_empty() {
        println!("  Views not created: {}", result.view_failures.len());
    }
    for file in &result.files {
        println!("  Wrote {}", file.display());
    }
}

fn setup_logging(verbosity: &str, format: &str) {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false);

    if format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

/// Cancel the run on SIGINT or SIGTERM.
#[cfg(unix)]
fn setup_signal_handler() -> CancellationToken {
    let cancel = CancellationToken::new();

    for (kind, name) in [
        (SignalKind::interrupt(), "SIGINT"),
        (SignalKind::terminate(), "SIGTERM"),
    ] {
        let token = cancel.clone();
        tokio::spawn(async move {
            match signal(kind) {
                Ok(mut stream) => {
                    stream.recv().await;
                    eprintln!("\nReceived {}. Stopping after in-flight batches...", name);
                    token.cancel();
                }
                Err(e) => eprintln!("Cannot listen for {}: {}", name, e),
            }
        });
    }

    cancel
}

#[cfg(not(unix))]
fn setup_signal_handler() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nReceived Ctrl-C. Stopping after in-flight batches...");
            token.cancel();
        }
    });

    cancel
}
