//! Stored field values and the record serialization contract.
//!
//! A [`Record`] is one row of a record type: its primary key plus a value per
//! schema field. [`Record::json`] is what every response body is built from.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde_json::{Map, Value};

/// Name of the primary-key column, both in storage and in `json()` output.
pub const PRIMARY_KEY: &str = "pk";

/// ISO 8601 layout used when datetimes are serialised to JSON or stored.
pub const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Field name → value, as written to or read from storage.
pub type Row = BTreeMap<String, FieldValue>;

/// A value held in a record field.
///
/// Foreign keys are stored as [`FieldValue::Integer`] primary keys.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Text(String),
    Integer(i64),
    Boolean(bool),
    Float(f64),
    DateTime(NaiveDateTime),
}

impl FieldValue {
    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Null => Value::Null,
            FieldValue::Text(s) => Value::String(s.clone()),
            FieldValue::Integer(i) => Value::from(*i),
            FieldValue::Boolean(b) => Value::Bool(*b),
            FieldValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            FieldValue::DateTime(d) => Value::String(d.format(DATETIME_FORMAT).to_string()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }
}

/// One stored row of a record type.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub pk: i64,
    pub values: Row,
}

impl Record {
    pub fn new(pk: i64, values: Row) -> Self {
        Self { pk, values }
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.values.get(field)
    }

    /// The record as a plain JSON object: `{"pk": 1, "<field>": <value>, ...}`.
    ///
    /// Foreign keys appear as the referenced record's primary key.
    pub fn json(&self) -> Value {
        let mut map = Map::new();
        map.insert(PRIMARY_KEY.to_string(), Value::from(self.pk));
        for (name, value) in &self.values {
            map.insert(name.clone(), value.to_json());
        }
        Value::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    #[test]
    fn json_includes_pk_and_every_field() {
        let mut values = Row::new();
        values.insert("name".into(), FieldValue::Text("Acme".into()));
        values.insert("hq_address".into(), FieldValue::Integer(3));
        values.insert("website_homepage".into(), FieldValue::Text(String::new()));

        let record = Record::new(9, values);
        assert_eq!(
            record.json(),
            json!({ "pk": 9, "name": "Acme", "hq_address": 3, "website_homepage": "" })
        );
    }

    #[test]
    fn scalar_values_serialise_naturally() {
        let when = NaiveDate::from_ymd_opt(2017, 3, 4)
            .unwrap()
            .and_hms_opt(5, 6, 0)
            .unwrap();
        assert_eq!(FieldValue::DateTime(when).to_json(), json!("2017-03-04T05:06:00"));
        assert_eq!(FieldValue::Boolean(true).to_json(), json!(true));
        assert_eq!(FieldValue::Float(0.5).to_json(), json!(0.5));
        assert_eq!(FieldValue::Float(f64::NAN).to_json(), json!(null));
        assert_eq!(FieldValue::Null.to_json(), json!(null));
    }
}
