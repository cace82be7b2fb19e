//! # dbmv
//!
//! Heterogeneous database migration library.
//!
//! dbmv reads a source database's catalog, converts it to destination DDL
//! through per-dialect-pair type mappings and templates, and copies table
//! data with a pool of concurrent batch loaders:
//!
//! - **DDL generation** for tables, views, unique constraints, indexes and
//!   foreign keys, grouped from sorted catalog rows
//! - **Type-directed marshalling** of values into multi-row INSERTs or
//!   delimited unload files
//! - **Concurrent loading** with a global row ceiling shared by all workers
//! - **Include/exclude filters** and source-to-target schema translation
//!
//! ## Example
//!
//! ```rust,no_run
//! use dbmv::{Actions, Config, Orchestrator};
//!
//! #[tokio::main]
//! async fn main() -> dbmv::Result<()> {
//!     let config = Config::load("config.yaml")?;
//!     let actions = Actions { load_data: true, ..Actions::create_all() };
//!     let result = Orchestrator::new(config).run(actions).await?;
//!     println!("{}", result.to_json()?);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod connector;
pub mod core;
pub mod ddl;
pub mod dialect;
pub mod error;
pub mod filter;
pub mod marshal;
pub mod orchestrator;
pub mod pipeline;
pub mod template;

pub use config::{Config, EndpointConfig, LoadMethod, MigrationConfig};
pub use connector::{Connector, ConnectorFactory, DriverFactory, MemoryConnector};
pub use crate::core::{MetadataRow, Row, SqlValue};
pub use dialect::{Dialect, PairProfile};
pub use error::{MigrateError, Result};
pub use orchestrator::{Actions, MigrationResult, Orchestrator};
pub use pipeline::{CopyJob, GlobalInsertCounter, LoadReport, Loader};
