//! Statement templates with typed placeholders.
//!
//! Templates use `${name}` placeholders. Each template category has its own
//! placeholder enum, and [`Template::parse`] rejects any name outside that
//! set, so a typo in a template file fails at load time instead of leaving a
//! literal `${...}` in generated SQL. Rendering goes through a closure over
//! the enum; callers write an exhaustive `match`, so adding a placeholder to
//! a category is a compile error until every renderer handles it.
//!
//! ```rust,ignore
//! let tpl: Template<TableSlot> = Template::parse("DROP TABLE ${scname}.${tbname}")?;
//! let sql = tpl.render(|slot| match slot {
//!     TableSlot::Scname => "dbo".into(),
//!     TableSlot::Tbname => "orders".into(),
//! });
//! ```

use crate::error::{MigrateError, Result};
use std::fmt;

/// A closed set of placeholder names for one template category.
pub trait Placeholder: Copy + Eq + fmt::Debug + 'static {
    const ALL: &'static [Self];

    fn name(self) -> &'static str;
}

/// Declare a placeholder enum and its [`Placeholder`] impl.
macro_rules! placeholders {
    ($(#[$meta:meta])* $vis:vis enum $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $name {
            $($variant),+
        }

        impl $crate::template::Placeholder for $name {
            const ALL: &'static [Self] = &[$($name::$variant),+];

            fn name(self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }
    };
}

pub(crate) use placeholders;

mod builtin;
mod catalog;
mod ddl;
mod source;

pub use catalog::{CatalogQueries, CatalogSlot};
pub use ddl::{
    ColumnSlot, DdlTemplates, ForeignKeySlot, IndexSlot, PreSlot, SchemaSlot, TableSlot,
    TailSlot, UniqueSlot,
};
pub use source::{BuiltinTemplates, FileTemplates, TemplateSource, CREATE, SELECT};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment<P> {
    Text(String),
    Slot(P),
}

/// A parsed template for placeholder category `P`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template<P> {
    source: String,
    segments: Vec<Segment<P>>,
}

impl<P: Placeholder> Template<P> {
    pub fn parse(text: &str) -> Result<Self> {
        let mut segments = Vec::new();
        let mut rest = text;

        while let Some(start) = rest.find("${") {
            if start > 0 {
                segments.push(Segment::Text(rest[..start].to_string()));
            }
            let after = &rest[start + 2..];
            let end = after.find('}').ok_or_else(|| {
                MigrateError::Template(format!("unterminated placeholder in {:?}", text))
            })?;
            let name = after[..end].trim();
            let slot = P::ALL
                .iter()
                .copied()
                .find(|p| p.name() == name)
                .ok_or_else(|| {
                    let allowed: Vec<_> = P::ALL.iter().map(|p| p.name()).collect();
                    MigrateError::Template(format!(
                        "unknown placeholder '{}' in {:?} (allowed: {})",
                        name,
                        text,
                        allowed.join(", ")
                    ))
                })?;
            segments.push(Segment::Slot(slot));
            rest = &after[end + 1..];
        }
        if !rest.is_empty() {
            segments.push(Segment::Text(rest.to_string()));
        }

        Ok(Self {
            source: text.to_string(),
            segments,
        })
    }

    /// An empty template; renders to the empty string.
    pub fn empty() -> Self {
        Self {
            source: String::new(),
            segments: Vec::new(),
        }
    }

    /// Render with a value for every slot.
    pub fn render(&self, mut value: impl FnMut(P) -> String) -> String {
        let mut out = String::with_capacity(self.source.len() + 32);
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Slot(slot) => out.push_str(&value(*slot)),
            }
        }
        out
    }

    pub fn uses(&self, slot: P) -> bool {
        self.segments.iter().any(|s| *s == Segment::Slot(slot))
    }

    /// Whether the template produces nothing worth executing.
    pub fn is_blank(&self) -> bool {
        self.source.trim().is_empty()
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    placeholders! {
        enum Slot {
            A => "a",
            B => "b",
        }
    }

    fn render(tpl: &Template<Slot>) -> String {
        tpl.render(|slot| match slot {
            Slot::A => "1".to_string(),
            Slot::B => "2".to_string(),
        })
    }

    #[test]
    fn test_render_all_slots() {
        let tpl = Template::<Slot>::parse("x${a}y${ b }z${a}").unwrap();
        assert_eq!(render(&tpl), "x1y2z1");
        assert!(tpl.uses(Slot::B));
    }

    #[test]
    fn test_unknown_placeholder_rejected() {
        let err = Template::<Slot>::parse("DROP ${c}").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("unknown placeholder 'c'"));
        assert!(msg.contains("allowed: a, b"));
    }

    #[test]
    fn test_unterminated_placeholder_rejected() {
        assert!(Template::<Slot>::parse("DROP ${a").is_err());
    }

    #[test]
    fn test_plain_text_and_blank() {
        let tpl = Template::<Slot>::parse("no slots").unwrap();
        assert_eq!(render(&tpl), "no slots");
        assert!(!tpl.uses(Slot::A));
        assert!(Template::<Slot>::parse("  ").unwrap().is_blank());
        assert!(Template::<Slot>::empty().is_blank());
    }

    #[test]
    fn test_substituted_values_are_not_rescanned() {
        let tpl = Template::<Slot>::parse("${a}").unwrap();
        let out = tpl.render(|_| "${b}".to_string());
        assert_eq!(out, "${b}");
    }
}
