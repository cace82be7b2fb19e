//! Type mappings and the per-pair translation profile.

use super::{tables, Dialect};
use crate::error::{MigrateError, Result};
use std::collections::HashMap;

/// Translation rule for one source type.
///
/// Each template may reference `<PRECISION>` and `<SCALE>`; the select cast
/// also takes `<COLNAME>` and the insert cast `<VALUE>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeRule {
    pub declaration: &'static str,
    pub select_cast: &'static str,
    pub insert_cast: &'static str,
}

impl TypeRule {
    pub const fn new(
        declaration: &'static str,
        select_cast: &'static str,
        insert_cast: &'static str,
    ) -> Self {
        Self {
            declaration,
            select_cast,
            insert_cast,
        }
    }

    /// Target column type with precision and scale filled in.
    pub fn declaration(&self, precision: i64, scale: i64) -> String {
        fill_size(self.declaration, precision, scale)
    }

    /// SELECT-side expression for an already-quoted column reference.
    pub fn select_expr(&self, column: &str, precision: i64, scale: i64) -> String {
        fill_size(self.select_cast, precision, scale).replace("<COLNAME>", column)
    }

    /// INSERT-side cast around a value slot; see [`crate::marshal::RowTemplate`].
    pub fn insert_cast(&self) -> &'static str {
        self.insert_cast
    }

    /// Insert cast with size filled in; `<VALUE>` is left for the row template.
    pub fn insert_expr(&self, precision: i64, scale: i64) -> String {
        fill_size(self.insert_cast, precision, scale)
    }
}

fn fill_size(template: &str, precision: i64, scale: i64) -> String {
    template
        .replace("<PRECISION>", &precision.to_string())
        .replace("<SCALE>", &scale.to_string())
}

/// Uppercased source type name → translation rule.
#[derive(Debug, Clone)]
pub struct TypeMapping {
    context: String,
    rules: HashMap<&'static str, TypeRule>,
    order: Vec<&'static str>,
}

impl TypeMapping {
    pub fn new(context: impl Into<String>, entries: &[(&'static str, TypeRule)]) -> Self {
        Self {
            context: context.into(),
            rules: entries.iter().copied().collect(),
            order: entries.iter().map(|(name, _)| *name).collect(),
        }
    }

    /// Look up a source type; a missing entry is an unsupported-type error,
    /// never a default.
    pub fn lookup(&self, type_name: &str) -> Result<&TypeRule> {
        let key = type_name.trim().to_uppercase();
        self.rules
            .get(key.as_str())
            .ok_or_else(|| MigrateError::unsupported_type(key.clone(), self.context.clone()))
    }

    /// Entries in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &TypeRule)> + '_ {
        self.order
            .iter()
            .filter_map(move |name| self.rules.get(name).map(|rule| (*name, rule)))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Rewrite for a default expression, matched case-insensitively by prefix
/// after outer parentheses are stripped. An empty replacement drops the
/// default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefaultRule {
    pub prefix: &'static str,
    pub replacement: &'static str,
}

/// Everything that depends on the (source, target) pair.
#[derive(Debug, Clone)]
pub struct PairProfile {
    source: Dialect,
    target: Dialect,
    types: TypeMapping,
    unsupported: &'static [&'static str],
    defaults: &'static [DefaultRule],
    identity_clause: &'static str,
    view_rewrites: &'static [(&'static str, &'static str)],
}

impl PairProfile {
    /// Select the built-in profile for a dialect pair.
    pub fn select(source: Dialect, target: Dialect) -> Result<Self> {
        let data = tables::pair(source, target).ok_or_else(|| {
            MigrateError::Config(format!(
                "no type mapping available for {} -> {}",
                source, target
            ))
        })?;

        Ok(Self {
            source,
            target,
            types: TypeMapping::new(format!("{} -> {}", source, target), data.types),
            unsupported: data.unsupported,
            defaults: data.defaults,
            identity_clause: data.identity_clause,
            view_rewrites: data.view_rewrites,
        })
    }

    /// Pairs with a built-in profile.
    pub fn supported_pairs() -> Vec<(Dialect, Dialect)> {
        tables::PAIRS.iter().map(|p| (p.source, p.target)).collect()
    }

    pub fn source(&self) -> Dialect {
        self.source
    }

    pub fn target(&self) -> Dialect {
        self.target
    }

    pub fn types(&self) -> &TypeMapping {
        &self.types
    }

    /// Types with no usable target representation; their columns are
    /// skipped before any lookup happens.
    pub fn is_unsupported(&self, type_name: &str) -> bool {
        let name = type_name.trim();
        self.unsupported.iter().any(|t| t.eq_ignore_ascii_case(name))
    }

    /// Unsupported type names joined for a catalog `NOT IN ('...')` list.
    pub fn unsupported_csv(&self) -> String {
        self.unsupported.join("','")
    }

    /// Render a column default for the target.
    pub fn render_default(&self, raw: Option<&str>) -> String {
        let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
            return String::new();
        };
        let upper = raw.to_uppercase();
        if upper.contains("NEXT VALUE FOR") {
            return String::new();
        }
        if upper.starts_with("IDENTITY") {
            return self.identity_clause.to_string();
        }

        let expr = strip_outer_parens(raw);
        let lower = expr.to_lowercase();
        match self
            .defaults
            .iter()
            .find(|rule| lower.starts_with(&rule.prefix.to_lowercase()))
        {
            Some(rule) => rule.replacement.to_string(),
            None => format!("DEFAULT {}", expr),
        }
    }

    /// Apply the ordered literal replacements to a view body.
    pub fn rewrite_view(&self, body: &str) -> String {
        self.view_rewrites
            .iter()
            .fold(body.to_string(), |acc, (from, to)| acc.replace(from, to))
    }
}

/// `((0))` → `0`, `(getdate())` → `getdate()`; unbalanced input is left alone.
fn strip_outer_parens(expr: &str) -> &str {
    let mut current = expr.trim();
    while current.starts_with('(') && current.ends_with(')') && encloses(current) {
        current = current[1..current.len() - 1].trim();
    }
    current
}

/// Whether the first '(' closes at the very last character.
fn encloses(expr: &str) -> bool {
    let mut depth = 0i32;
    for (i, c) in expr.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return i == expr.len() - 1;
                }
            }
            _ => {}
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms2pg() -> PairProfile {
        PairProfile::select(Dialect::Mssql, Dialect::Postgres).unwrap()
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let profile = ms2pg();
        let rule = profile.types().lookup("nvarchar").unwrap();
        assert_eq!(rule.declaration(50, 0), "VARCHAR(50)");
        assert_eq!(
            rule.select_expr("\"Name\"", 50, 0),
            "CAST(\"Name\" AS TEXT)"
        );
        assert_eq!(rule.insert_cast(), "'<VALUE>'");
    }

    #[test]
    fn test_lookup_unmapped_type_is_an_error() {
        let err = ms2pg().types().lookup("sql_variant").unwrap_err();
        match err {
            MigrateError::UnsupportedType { type_name, context } => {
                assert_eq!(type_name, "SQL_VARIANT");
                assert_eq!(context, "mssql -> postgres");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_decimal_declaration_fills_size() {
        let rule = ms2pg().types().lookup("DECIMAL").unwrap().to_owned();
        assert_eq!(rule.declaration(18, 2), "DECIMAL(18,2)");
    }

    #[test]
    fn test_unknown_pair() {
        assert!(PairProfile::select(Dialect::Vector, Dialect::Mssql).is_err());
    }

    #[test]
    fn test_unsupported_types() {
        let profile = PairProfile::select(Dialect::Mssql, Dialect::Vector).unwrap();
        assert!(profile.is_unsupported("IMAGE"));
        assert!(profile.is_unsupported("xml"));
        assert!(!profile.is_unsupported("int"));
        assert!(profile.unsupported_csv().starts_with("image','"));
        assert_eq!(ms2pg().unsupported_csv(), "");
    }

    #[test]
    fn test_render_default() {
        let profile = PairProfile::select(Dialect::Mssql, Dialect::Vector).unwrap();
        assert_eq!(profile.render_default(None), "");
        assert_eq!(profile.render_default(Some("((0))")), "DEFAULT 0");
        assert_eq!(
            profile.render_default(Some("(getdate())")),
            "DEFAULT CURRENT_TIMESTAMP"
        );
        assert_eq!(profile.render_default(Some("(newid())")), "");
        assert_eq!(
            profile.render_default(Some("IDENTITY(1,1)")),
            "GENERATED BY DEFAULT AS IDENTITY"
        );
        assert_eq!(
            profile.render_default(Some("(NEXT VALUE FOR dbo.seq)")),
            ""
        );
        assert_eq!(profile.render_default(Some("('N/A')")), "DEFAULT 'N/A'");
    }

    #[test]
    fn test_strip_outer_parens_keeps_unbalanced() {
        assert_eq!(strip_outer_parens("(a) + (b)"), "(a) + (b)");
        assert_eq!(strip_outer_parens("((1))"), "1");
    }

    #[test]
    fn test_view_rewrites_in_order() {
        let profile = PairProfile::select(Dialect::Mssql, Dialect::Vector).unwrap();
        let body = "CREATE VIEW [dbo].[v] WITH SCHEMABINDING AS SELECT CONVERT(money, x) FROM [dbo].[t]";
        assert_eq!(
            profile.rewrite_view(body),
            "CREATE VIEW \"dbo\".\"v\"  AS SELECT money, x) FROM \"dbo\".\"t\""
        );
    }

    #[test]
    fn test_every_pair_has_types() {
        for (source, target) in PairProfile::supported_pairs() {
            let profile = PairProfile::select(source, target).unwrap();
            assert!(!profile.types().is_empty(), "{source} -> {target}");
        }
    }
}
