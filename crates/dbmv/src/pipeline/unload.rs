use super::CopyJob;
use crate::core::Row;
use crate::error::Result;
use crate::marshal::{NullMode, RowTemplate};
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::debug;

/// Delimited text file receiving one table's rows.
///
/// Lines use the table's insert casts joined by the field delimiter, with
/// NULL written as nothing.
pub struct UnloadFile {
    path: PathBuf,
    writer: BufWriter<File>,
    template: RowTemplate,
    lines: u64,
}

impl UnloadFile {
    /// `<directory>/<target_schema>_<table>.txt`
    pub fn path_for(directory: &Path, job: &CopyJob) -> PathBuf {
        directory.join(format!("{}_{}.txt", job.target_schema, job.table_name))
    }

    pub async fn create(directory: &Path, job: &CopyJob, delimiter: &str) -> Result<Self> {
        tokio::fs::create_dir_all(directory).await?;
        let path = Self::path_for(directory, job);
        let file = File::create(&path).await?;
        debug!("Unloading {} to {:?}", job.qualified_name(), path);
        Ok(Self {
            path,
            writer: BufWriter::new(file),
            template: RowTemplate::for_unload(&job.casts, delimiter),
            lines: 0,
        })
    }

    pub async fn write_rows(&mut self, rows: &[Row]) -> Result<()> {
        for row in rows {
            let mut line = self.template.render(row, NullMode::Unload);
            line.push('\n');
            self.writer.write_all(line.as_bytes()).await?;
            self.lines += 1;
        }
        Ok(())
    }

    pub fn lines(&self) -> u64 {
        self.lines
    }

    /// Flush and close; returns the file path.
    pub async fn finish(mut self) -> Result<PathBuf> {
        self.writer.flush().await?;
        self.writer.get_mut().sync_all().await?;
        Ok(self.path)
    }
}
