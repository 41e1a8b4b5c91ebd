//! Record-type descriptors.
//!
//! A [`RecordSchema`] names a record type, its storage table and its fields.
//! Required-ness, length limits, choices and foreign-key targets are carried
//! as metadata on each [`FieldDescriptor`] and enforced by
//! [`RecordSchema::new_row`](crate::validation) before anything is written.

use std::fmt;

/// The storage type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Integer,
    Boolean,
    Float,
    DateTime,
    /// Holds the primary key of a row in the named table.
    ForeignKey(&'static str),
}

impl FieldKind {
    pub(crate) fn describe(self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Integer => "an integer",
            FieldKind::Boolean => "a boolean",
            FieldKind::Float => "a number",
            FieldKind::DateTime => "a date",
            FieldKind::ForeignKey(_) => "a record reference",
        }
    }
}

/// One field of a record type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub kind: FieldKind,
    /// Non-null, and for text also non-blank.
    pub required: bool,
    /// Maximum length in characters, text only.
    pub max_length: Option<usize>,
    /// Allowed text values. Empty means unrestricted.
    pub choices: &'static [&'static str],
    /// Text used when the field is omitted on create.
    pub default: Option<&'static str>,
}

impl FieldDescriptor {
    const fn new(name: &'static str, kind: FieldKind, required: bool) -> Self {
        Self {
            name,
            kind,
            required,
            max_length: None,
            choices: &[],
            default: None,
        }
    }

    pub const fn required_text(name: &'static str, max_length: usize) -> Self {
        Self::new(name, FieldKind::Text, true).max_length(max_length)
    }

    /// Optional text; omitted values are stored as `""`.
    pub const fn text(name: &'static str, max_length: Option<usize>) -> Self {
        Self {
            max_length,
            ..Self::new(name, FieldKind::Text, false)
        }
    }

    pub const fn required_integer(name: &'static str) -> Self {
        Self::new(name, FieldKind::Integer, true)
    }

    pub const fn required_foreign_key(name: &'static str, target: &'static str) -> Self {
        Self::new(name, FieldKind::ForeignKey(target), true)
    }

    pub const fn max_length(self, max_length: usize) -> Self {
        Self {
            max_length: Some(max_length),
            ..self
        }
    }

    pub const fn choices(self, choices: &'static [&'static str], default: &'static str) -> Self {
        Self {
            choices,
            default: Some(default),
            ..self
        }
    }

    pub fn is_foreign_key(&self) -> bool {
        matches!(self.kind, FieldKind::ForeignKey(_))
    }
}

/// A record type: display name, table and fields.
#[derive(Debug, PartialEq, Eq)]
pub struct RecordSchema {
    pub name: &'static str,
    pub table: &'static str,
    pub fields: &'static [FieldDescriptor],
}

impl RecordSchema {
    pub fn field(&self, name: &str) -> Option<&'static FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Fields of this type that point at `table`.
    pub fn references_to<'a>(
        &'a self,
        table: &'a str,
    ) -> impl Iterator<Item = &'static FieldDescriptor> + 'a {
        self.fields
            .iter()
            .filter(move |f| matches!(f.kind, FieldKind::ForeignKey(t) if t == table))
    }
}

impl fmt::Display for RecordSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}
