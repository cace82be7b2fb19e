//! Data copy: planning copy jobs and running them through the worker pool.

mod counter;
mod job;
mod loader;
mod unload;

pub use counter::GlobalInsertCounter;
pub use job::{plan_copy_jobs, CopyJob, CopyPlanner, InsertTemplate};
pub use loader::{CopyMode, LoadOptions, LoadReport, LoadRun, Loader, WorkerSlot};
pub use unload::UnloadFile;
