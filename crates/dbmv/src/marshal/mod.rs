//! Rendering source rows into destination SQL text.
//!
//! A [`RowTemplate`] is parsed once per table from the insert casts of its
//! columns. Rendering walks the parsed segments, so data that happens to
//! contain `<VALUE>` or quote characters is never re-scanned.

use crate::core::SqlValue;
use std::borrow::Cow;
use tracing::error;

const VALUE: &str = "<VALUE>";

/// How NULL is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullMode {
    /// SQL `NULL`, with any surrounding quotes dropped.
    Load,
    /// Nothing at all, for delimited unload files.
    Unload,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Value { index: usize, quoted: bool },
}

/// Parsed per-row rendering template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowTemplate {
    segments: Vec<Segment>,
    columns: usize,
}

impl RowTemplate {
    /// `(cast1,cast2,...)` for a VALUES list.
    pub fn for_insert<S: AsRef<str>>(casts: &[S]) -> Self {
        Self::build(casts, "(", ",", ")")
    }

    /// `cast1<delim>cast2...` for an unload file line.
    pub fn for_unload<S: AsRef<str>>(casts: &[S], delimiter: &str) -> Self {
        Self::build(casts, "", delimiter, "")
    }

    fn build<S: AsRef<str>>(casts: &[S], open: &str, delimiter: &str, close: &str) -> Self {
        let mut builder = SegmentBuilder::default();
        builder.literal(open);
        for (index, cast) in casts.iter().enumerate() {
            if index > 0 {
                builder.literal(delimiter);
            }
            builder.cast(index, cast.as_ref());
        }
        builder.literal(close);
        Self {
            segments: builder.segments,
            columns: casts.len(),
        }
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    /// Render one row. Missing trailing values render as NULL.
    pub fn render(&self, row: &[SqlValue], nulls: NullMode) -> String {
        let mut out = String::with_capacity(self.segments.len() * 8);
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Value { index, quoted } => {
                    let value = row.get(*index).unwrap_or(&SqlValue::Null);
                    if value.is_null() {
                        if nulls == NullMode::Load {
                            out.push_str("NULL");
                        }
                        continue;
                    }
                    let text = render_value(value, *index);
                    if *quoted {
                        out.push('\'');
                        out.push_str(&text);
                        out.push('\'');
                    } else {
                        out.push_str(&text);
                    }
                }
            }
        }
        out
    }
}

#[derive(Default)]
struct SegmentBuilder {
    segments: Vec<Segment>,
}

impl SegmentBuilder {
    fn literal(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Some(Segment::Literal(prev)) = self.segments.last_mut() {
            prev.push_str(text);
        } else {
            self.segments.push(Segment::Literal(text.to_string()));
        }
    }

    /// Split a cast around each `<VALUE>`; a slot wrapped in single quotes
    /// becomes a quoted value so NULL can drop the quotes.
    fn cast(&mut self, index: usize, cast: &str) {
        let mut rest = cast;
        while let Some(pos) = rest.find(VALUE) {
            let before = &rest[..pos];
            let after = &rest[pos + VALUE.len()..];
            let quoted = before.ends_with('\'') && after.starts_with('\'');
            if quoted {
                self.literal(&before[..before.len() - 1]);
                rest = &after[1..];
            } else {
                self.literal(before);
                rest = after;
            }
            self.segments.push(Segment::Value { index, quoted });
        }
        self.literal(rest);
    }
}

/// Text form of a non-NULL value. Character data has single quotes doubled.
fn render_value(value: &SqlValue, index: usize) -> Cow<'_, str> {
    match value {
        SqlValue::Text(s) => escape(s),
        SqlValue::Bytes(bytes) => {
            let text = match std::str::from_utf8(bytes) {
                Ok(s) => Cow::Borrowed(s),
                Err(e) => {
                    error!(
                        "Column {} holds invalid UTF-8 ({}), value decoded lossily",
                        index + 1,
                        e
                    );
                    String::from_utf8_lossy(bytes)
                }
            };
            if text.contains('\'') {
                Cow::Owned(text.replace('\'', "''"))
            } else {
                text
            }
        }
        other => Cow::Owned(other.to_string()),
    }
}

fn escape(text: &str) -> Cow<'_, str> {
    if text.contains('\'') {
        Cow::Owned(text.replace('\'', "''"))
    } else {
        Cow::Borrowed(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn insert() -> RowTemplate {
        RowTemplate::for_insert(&["<VALUE>", "'<VALUE>'", "'<VALUE>'"])
    }

    #[test]
    fn test_renders_values_with_casts() {
        let row = vec![SqlValue::I32(1), "abc".into(), SqlValue::F64(2.5)];
        assert_eq!(insert().render(&row, NullMode::Load), "(1,'abc','2.5')");
        assert_eq!(insert().columns(), 3);
    }

    #[test]
    fn test_null_never_renders_quoted() {
        let row = vec![SqlValue::Null, SqlValue::Null, "x".into()];
        assert_eq!(insert().render(&row, NullMode::Load), "(NULL,NULL,'x')");

        let unload = RowTemplate::for_unload(&["<VALUE>", "'<VALUE>'", "'<VALUE>'"], "\t");
        assert_eq!(unload.render(&row, NullMode::Unload), "\t\t'x'");
    }

    #[test]
    fn test_quotes_are_doubled() {
        let row = vec![SqlValue::I32(7), "O'Brien".into(), SqlValue::Null];
        assert_eq!(insert().render(&row, NullMode::Load), "(7,'O''Brien',NULL)");
    }

    #[test]
    fn test_value_marker_in_data_is_not_substituted() {
        let row = vec![SqlValue::I32(1), "<VALUE>".into(), "'<VALUE>'".into()];
        assert_eq!(
            insert().render(&row, NullMode::Load),
            "(1,'<VALUE>','''<VALUE>''')"
        );
    }

    #[test]
    fn test_invalid_utf8_is_decoded_lossily() {
        let row = vec![
            SqlValue::I32(1),
            SqlValue::Bytes(vec![b'a', 0xff, b'b']),
            SqlValue::Null,
        ];
        assert_eq!(
            insert().render(&row, NullMode::Load),
            "(1,'a\u{fffd}b',NULL)"
        );
    }

    #[test]
    fn test_typed_values() {
        let template = RowTemplate::for_insert(&["<VALUE>", "'<VALUE>'"]);
        let date = NaiveDate::from_ymd_opt(2024, 2, 29)
            .unwrap()
            .and_hms_opt(13, 5, 0)
            .unwrap();
        let row = vec![SqlValue::Bool(true), SqlValue::DateTime(date)];
        assert_eq!(
            template.render(&row, NullMode::Load),
            "(TRUE,'2024-02-29 13:05:00')"
        );
    }

    #[test]
    fn test_wrapped_cast() {
        let template = RowTemplate::for_insert(&["CAST('<VALUE>' AS DATE)"]);
        assert_eq!(
            template.render(&[SqlValue::from("2024-01-01")], NullMode::Load),
            "(CAST('2024-01-01' AS DATE))"
        );
        assert_eq!(
            template.render(&[SqlValue::Null], NullMode::Load),
            "(CAST(NULL AS DATE))"
        );
    }

    #[test]
    fn test_short_row_renders_null() {
        assert_eq!(
            insert().render(&[SqlValue::I32(1)], NullMode::Load),
            "(1,NULL,NULL)"
        );
    }
}
