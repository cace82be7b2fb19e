use crate::error::{MigrateError, Result};
use std::collections::BTreeMap;

/// Translation header for table schemas.
pub const SCHEMA_HEADER: &str = "scname";

/// Translation header for index schemas.
pub const INDEX_SCHEMA_HEADER: &str = "iscname";

/// Maps source schema names to target schema names.
///
/// Precedence: a global override wins, then the translation table entry for
/// the header, then the source name unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaMapper {
    target_override: Option<String>,
    translations: BTreeMap<String, BTreeMap<String, String>>,
}

impl SchemaMapper {
    pub fn new(
        target_override: Option<String>,
        translations: BTreeMap<String, BTreeMap<String, String>>,
    ) -> Self {
        Self {
            target_override: target_override.filter(|s| !s.trim().is_empty()),
            translations,
        }
    }

    /// Target schema for a table schema.
    pub fn target_schema(&self, source_schema: &str) -> String {
        self.target_schema_for(SCHEMA_HEADER, source_schema)
    }

    /// Target schema for a value under a given catalog header. Index
    /// schemas fall back to the table-schema translations.
    pub fn target_schema_for(&self, header: &str, source_schema: &str) -> String {
        if let Some(target) = &self.target_override {
            return target.clone();
        }
        self.translate(header, source_schema)
            .or_else(|| {
                (header != SCHEMA_HEADER)
                    .then(|| self.translate(SCHEMA_HEADER, source_schema))
                    .flatten()
            })
            .unwrap_or_else(|| source_schema.to_string())
    }

    /// Raw lookup in the translation table.
    pub fn translate(&self, header: &str, value: &str) -> Option<String> {
        self.translations.get(header)?.get(value).cloned()
    }
}

/// Parse `header:from,to,from,to;header2:from,to` into a translation table.
pub fn parse_translation(spec: &str) -> Result<BTreeMap<String, BTreeMap<String, String>>> {
    let mut table: BTreeMap<String, BTreeMap<String, String>> = BTreeMap::new();

    for section in spec.split(';').map(str::trim).filter(|s| !s.is_empty()) {
        let (header, pairs) = section.split_once(':').ok_or_else(|| {
            MigrateError::Config(format!(
                "translation section '{}' is missing 'header:'",
                section
            ))
        })?;

        let values: Vec<&str> = pairs.split(',').map(str::trim).collect();
        if values.len() % 2 != 0 || values.iter().any(|v| v.is_empty()) {
            return Err(MigrateError::Config(format!(
                "translation section '{}' must list from,to pairs",
                section
            )));
        }

        let entry = table.entry(header.trim().to_string()).or_default();
        for pair in values.chunks(2) {
            entry.insert(pair[0].to_string(), pair[1].to_string());
        }
    }

    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_translation() {
        let table = parse_translation("scname:dbo,demo,test,toto;iscname:dbo,demo2").unwrap();
        assert_eq!(table["scname"]["dbo"], "demo");
        assert_eq!(table["scname"]["test"], "toto");
        assert_eq!(table["iscname"]["dbo"], "demo2");
    }

    #[test]
    fn test_parse_translation_rejects_odd_pairs() {
        assert!(parse_translation("scname:dbo").is_err());
        assert!(parse_translation("dbo,demo").is_err());
        assert!(parse_translation("").unwrap().is_empty());
    }

    #[test]
    fn test_override_wins() {
        let table = parse_translation("scname:dbo,demo").unwrap();
        let mapper = SchemaMapper::new(Some("target".into()), table);
        assert_eq!(mapper.target_schema("dbo"), "target");
    }

    #[test]
    fn test_translation_then_passthrough() {
        let table = parse_translation("scname:dbo,demo;iscname:dbo,demo2").unwrap();
        let mapper = SchemaMapper::new(Some("  ".into()), table);
        assert_eq!(mapper.target_schema("dbo"), "demo");
        assert_eq!(mapper.target_schema("sales"), "sales");
        assert_eq!(mapper.target_schema_for(INDEX_SCHEMA_HEADER, "dbo"), "demo2");
    }

    #[test]
    fn test_index_header_falls_back_to_schema_translation() {
        let table = parse_translation("scname:dbo,demo").unwrap();
        let mapper = SchemaMapper::new(None, table);
        assert_eq!(mapper.target_schema_for(INDEX_SCHEMA_HEADER, "dbo"), "demo");
    }
}
