use super::builtin;
use crate::dialect::Dialect;
use crate::error::Result;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

/// Category of target-side DDL skeletons.
pub const CREATE: &str = "create";

/// Category of source-side catalog queries.
pub const SELECT: &str = "select";

/// Supplies raw template text by (dialect, category, id).
pub trait TemplateSource: Send + Sync {
    fn template(&self, dialect: Dialect, category: &str, id: &str) -> Option<String>;
}

/// Templates compiled into the binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinTemplates;

impl TemplateSource for BuiltinTemplates {
    fn template(&self, dialect: Dialect, category: &str, id: &str) -> Option<String> {
        builtin::lookup(dialect, category, id).map(str::to_string)
    }
}

/// Templates read from a YAML file, falling back to the built-ins.
///
/// ```yaml
/// vector:
///   create:
///     table_tail: ") WITH STRUCTURE=VECTORWISE"
/// mssql:
///   select:
///     views: "SELECT ..."
/// ```
#[derive(Debug, Clone, Default)]
pub struct FileTemplates {
    entries: BTreeMap<String, BTreeMap<String, BTreeMap<String, String>>>,
}

impl FileTemplates {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let templates = Self::from_yaml(&content)?;
        info!(
            "Loaded template overrides from {:?} ({} dialects)",
            path.as_ref(),
            templates.entries.len()
        );
        Ok(templates)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let entries = serde_yaml::from_str(yaml)?;
        Ok(Self { entries })
    }
}

impl TemplateSource for FileTemplates {
    fn template(&self, dialect: Dialect, category: &str, id: &str) -> Option<String> {
        self.entries
            .get(dialect.name())
            .and_then(|categories| categories.get(category))
            .and_then(|ids| ids.get(id))
            .cloned()
            .or_else(|| BuiltinTemplates.template(dialect, category, id))
    }
}
