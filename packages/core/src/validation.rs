use thiserror::Error;

use crate::param::{ParamType, ParamValue, Predicates, PK_SUFFIX};
use crate::schema::{FieldDescriptor, FieldKind, RecordSchema};
use crate::types::{FieldValue, Row, PRIMARY_KEY};

/// Errors returned when decoded parameters do not fit a record type.
#[derive(Debug, Error, PartialEq)]
pub enum SchemaError {
    #[error("{record} has no field {field:?}")]
    UnknownField { record: &'static str, field: String },

    #[error("field {field:?} expects {expected}, got a '{found}' parameter")]
    TypeMismatch {
        field: String,
        expected: &'static str,
        found: String,
    },

    #[error("field {0:?} is required")]
    MissingField(&'static str),

    #[error("field {0:?} must not be blank")]
    BlankField(&'static str),

    #[error("field {field:?} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },

    #[error("field {field:?} must be one of {choices:?}, got {value:?}")]
    InvalidChoice {
        field: &'static str,
        choices: &'static [&'static str],
        value: String,
    },

    #[error("the primary key is assigned on create and cannot be supplied")]
    PrimaryKeyOnCreate,

    #[error("field {0:?} is supplied both as {0:?} and as \"{0}__pk\"")]
    AmbiguousField(&'static str),
}

/// A storage filter: `column = value`.
///
/// `column` is either [`PRIMARY_KEY`] or a schema field name.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub column: &'static str,
    pub value: FieldValue,
}

/// What a parameter name refers to.
enum Target {
    PrimaryKey,
    Field(&'static FieldDescriptor),
}

impl RecordSchema {
    /// Resolve a parameter name to a column.
    ///
    /// `pk` and `id` name the primary key; `<fk>__pk` names foreign key `<fk>`.
    fn resolve(&self, name: &str) -> Result<Target, SchemaError> {
        if name == PRIMARY_KEY || name == "id" {
            return Ok(Target::PrimaryKey);
        }
        let field = match name.strip_suffix(PK_SUFFIX) {
            Some(base) => self.field(base).filter(|f| f.is_foreign_key()),
            None => self.field(name),
        };
        field.map(Target::Field).ok_or_else(|| SchemaError::UnknownField {
            record: self.name,
            field: name.to_string(),
        })
    }

    /// Turn decoded parameters into storage filters for this record type.
    pub fn predicates(&self, params: &Predicates) -> Result<Vec<Predicate>, SchemaError> {
        params
            .iter()
            .map(|(name, value)| match self.resolve(name)? {
                Target::PrimaryKey => Ok(Predicate {
                    column: PRIMARY_KEY,
                    value: coerce_pk(name, value)?,
                }),
                Target::Field(field) => Ok(Predicate {
                    column: field.name,
                    value: coerce(name, field.kind, value)?,
                }),
            })
            .collect()
    }

    /// Build the row for a new record from decoded parameters.
    ///
    /// Every schema field gets a value: the supplied one, the field default,
    /// `""` for optional text, or `Null`. Required fields must be supplied
    /// (or defaulted) and text ones must not be blank. A foreign key may be
    /// named `x` or `x__pk`, but not both.
    pub fn new_row(&self, params: &Predicates) -> Result<Row, SchemaError> {
        for name in params.keys() {
            if let Target::PrimaryKey = self.resolve(name)? {
                return Err(SchemaError::PrimaryKeyOnCreate);
            }
        }

        let mut row = Row::new();
        for field in self.fields {
            let suffixed = if field.is_foreign_key() {
                params.get(&format!("{}{PK_SUFFIX}", field.name))
            } else {
                None
            };
            let supplied = match (params.get(field.name), suffixed) {
                (Some(_), Some(_)) => return Err(SchemaError::AmbiguousField(field.name)),
                (plain, suffixed) => plain.or(suffixed),
            };

            let value = match supplied {
                Some(v) => coerce(field.name, field.kind, v)?,
                None => default_value(field),
            };
            check_field(field, &value)?;
            row.insert(field.name.to_string(), value);
        }
        Ok(row)
    }
}

fn default_value(field: &FieldDescriptor) -> FieldValue {
    match (field.default, field.kind) {
        (Some(d), _) => FieldValue::Text(d.to_string()),
        (None, FieldKind::Text) if !field.required => FieldValue::Text(String::new()),
        _ => FieldValue::Null,
    }
}

fn check_field(field: &'static FieldDescriptor, value: &FieldValue) -> Result<(), SchemaError> {
    if value.is_null() {
        return if field.required {
            Err(SchemaError::MissingField(field.name))
        } else {
            Ok(())
        };
    }

    if let FieldValue::Text(s) = value {
        if field.required && s.trim().is_empty() {
            return Err(SchemaError::BlankField(field.name));
        }
        if let Some(max) = field.max_length {
            if s.chars().count() > max {
                return Err(SchemaError::TooLong {
                    field: field.name,
                    max,
                });
            }
        }
        if !field.choices.is_empty() && !field.choices.contains(&s.as_str()) {
            return Err(SchemaError::InvalidChoice {
                field: field.name,
                choices: field.choices,
                value: s.clone(),
            });
        }
    }
    Ok(())
}

fn mismatch(name: &str, expected: &'static str, found: ParamType) -> SchemaError {
    SchemaError::TypeMismatch {
        field: name.to_string(),
        expected,
        found: found.token().to_string(),
    }
}

fn coerce_pk(name: &str, value: &ParamValue) -> Result<FieldValue, SchemaError> {
    match value {
        ParamValue::Int(i) => Ok(FieldValue::Integer(*i)),
        ParamValue::RecordRef(r) => Ok(FieldValue::Integer(r.pk)),
        other => Err(mismatch(name, "an integer primary key", other.param_type())),
    }
}

fn coerce(name: &str, kind: FieldKind, value: &ParamValue) -> Result<FieldValue, SchemaError> {
    let coerced = match (kind, value) {
        (FieldKind::Text, ParamValue::Str(s)) => FieldValue::Text(s.clone()),
        (FieldKind::Integer, ParamValue::Int(i)) => FieldValue::Integer(*i),
        (FieldKind::Boolean, ParamValue::Bool(b)) => FieldValue::Boolean(*b),
        (FieldKind::Float, ParamValue::Float(f)) => FieldValue::Float(*f),
        (FieldKind::Float, ParamValue::Int(i)) => FieldValue::Float(*i as f64),
        (FieldKind::DateTime, ParamValue::Date(d)) => FieldValue::DateTime(*d),
        (FieldKind::ForeignKey(_), ParamValue::RecordRef(r)) => FieldValue::Integer(r.pk),
        (FieldKind::ForeignKey(_), ParamValue::Int(i)) => FieldValue::Integer(*i),
        (kind, other) => return Err(mismatch(name, kind.describe(), other.param_type())),
    };
    Ok(coerced)
}
