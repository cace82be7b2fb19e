//! Catalog rows and the keys used to group them.

use super::value::{Row, SqlValue};
use std::fmt;

/// One row returned by a catalog query.
///
/// The first two fields are always `(schema, object_name)`; the rest depend
/// on the query kind. Text is trimmed on access, mirroring the padded CHAR
/// columns several catalogs return.
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataRow {
    values: Row,
}

impl MetadataRow {
    pub fn new(values: Row) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Trimmed text of field `idx`, `None` for NULL or a missing field.
    pub fn text(&self, idx: usize) -> Option<String> {
        self.raw_text(idx).map(|s| s.trim().to_string())
    }

    /// Untrimmed text of field `idx`; invalid UTF-8 is decoded lossily.
    pub fn raw_text(&self, idx: usize) -> Option<String> {
        match self.values.get(idx)? {
            SqlValue::Null => None,
            SqlValue::Text(s) => Some(s.clone()),
            SqlValue::Bytes(b) => Some(String::from_utf8_lossy(b).into_owned()),
            other => Some(other.to_string()),
        }
    }

    /// Text of field `idx`, empty when NULL.
    pub fn text_or_empty(&self, idx: usize) -> String {
        self.text(idx).unwrap_or_default()
    }

    /// Integer view of field `idx`, truncated toward zero.
    ///
    /// Catalogs report precision as int, decimal, float or text depending on
    /// the vendor; `10.0` and `10.9` both become `10`.
    pub fn integer(&self, idx: usize) -> Option<i64> {
        self.values.get(idx)?.as_f64().map(|v| v.trunc() as i64)
    }

    pub fn schema(&self) -> String {
        self.text_or_empty(0)
    }

    pub fn object(&self) -> String {
        self.text_or_empty(1)
    }
}

impl From<Row> for MetadataRow {
    fn from(values: Row) -> Self {
        Self::new(values)
    }
}

/// Compound key identifying one structural unit in a sorted catalog stream.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupKey {
    pub schema: String,
    pub object: String,
    pub member: Option<String>,
}

impl GroupKey {
    pub fn object(schema: impl Into<String>, object: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            object: object.into(),
            member: None,
        }
    }

    pub fn member(
        schema: impl Into<String>,
        object: impl Into<String>,
        member: impl Into<String>,
    ) -> Self {
        Self {
            schema: schema.into(),
            object: object.into(),
            member: Some(member.into()),
        }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.member {
            Some(m) => write!(f, "{}.{}.{}", self.schema, self.object, m),
            None => write!(f, "{}.{}", self.schema, self.object),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_trims_and_handles_null() {
        let row = MetadataRow::new(vec![" dbo ".into(), SqlValue::Null]);
        assert_eq!(row.text(0).as_deref(), Some("dbo"));
        assert_eq!(row.text(1), None);
        assert_eq!(row.text(5), None);
        assert_eq!(row.text_or_empty(1), "");
    }

    #[test]
    fn test_integer_truncates() {
        let row = MetadataRow::new(vec![
            "10.0".into(),
            SqlValue::F64(7.9),
            SqlValue::I32(-1),
            SqlValue::Null,
        ]);
        assert_eq!(row.integer(0), Some(10));
        assert_eq!(row.integer(1), Some(7));
        assert_eq!(row.integer(2), Some(-1));
        assert_eq!(row.integer(3), None);
    }

    #[test]
    fn test_lossy_bytes() {
        let row = MetadataRow::new(vec![SqlValue::Bytes(vec![b'a', 0xff, b'b'])]);
        assert_eq!(row.text(0).as_deref(), Some("a\u{fffd}b"));
    }

    #[test]
    fn test_group_key_display() {
        assert_eq!(GroupKey::object("dbo", "t").to_string(), "dbo.t");
        assert_eq!(GroupKey::member("dbo", "t", "pk").to_string(), "dbo.t.pk");
    }
}
