use crate::error::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Kinds of generated DDL file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DdlFile {
    Tables,
    Views,
    Indexes,
    All,
}

impl DdlFile {
    fn suffix(self) -> &'static str {
        match self {
            DdlFile::Tables => "tab",
            DdlFile::Views => "viw",
            DdlFile::Indexes => "index",
            DdlFile::All => "all",
        }
    }

    /// `<directory>/<prefix>_<suffix>.txt`
    pub fn path(self, directory: &Path, prefix: &str) -> PathBuf {
        directory.join(format!("{}_{}.txt", prefix, self.suffix()))
    }
}

/// Write terminated statements, in order, to one UTF-8 file.
pub fn write_ddl(directory: &Path, prefix: &str, kind: DdlFile, statements: &[String]) -> Result<PathBuf> {
    fs::create_dir_all(directory)?;
    let path = kind.path(directory, prefix);
    fs::write(&path, statements.concat())?;
    info!("Wrote {} statements to {:?}", statements.len(), path);
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_names() {
        let dir = Path::new("/tmp/out");
        assert_eq!(DdlFile::Tables.path(dir, "dbmv"), dir.join("dbmv_tab.txt"));
        assert_eq!(DdlFile::Views.path(dir, "x"), dir.join("x_viw.txt"));
        assert_eq!(DdlFile::Indexes.path(dir, "x"), dir.join("x_index.txt"));
        assert_eq!(DdlFile::All.path(dir, "x"), dir.join("x_all.txt"));
    }

    #[test]
    fn test_write_ddl_concatenates() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("ddl");
        let path = write_ddl(
            &nested,
            "run",
            DdlFile::Tables,
            &["CREATE TABLE a (x INT);\n".to_string(), "CREATE TABLE b (y INT);\n".to_string()],
        )
        .unwrap();
        let text = std::fs::read_to_string(path).unwrap();
        assert_eq!(text, "CREATE TABLE a (x INT);\nCREATE TABLE b (y INT);\n");
    }
}
