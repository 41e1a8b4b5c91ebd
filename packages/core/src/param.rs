//! Typed query-parameter codec.
//!
//! Query strings and form bodies carry filter predicates and field values as
//! `name::type=value` pairs, for example `age::int=21` or `hq_address::fk=3`.
//! [`GetParameter::decode`] turns one pair into a field name plus a typed
//! [`ParamValue`]; [`GetParameter::encode`] produces the pair again.
//!
//! | Token | Variant | Wire value |
//! |-------|---------|------------|
//! | `int` | [`ParamValue::Int`] | decimal integer |
//! | `str` | [`ParamValue::Str`] | taken verbatim |
//! | `bool` | [`ParamValue::Bool`] | integer, `> 0` is true; encodes as `1` / `0` |
//! | `date` | [`ParamValue::Date`] | `DD/MM/YYYY HH:MM` |
//! | `fk` | [`ParamValue::RecordRef`] | integer primary key of the related record |
//! | `fl` | [`ParamValue::Float`] | decimal number |

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use thiserror::Error;

/// Separates the field name from the type token in a parameter key.
pub const NAME_TYPE_DELIMITER: &str = "::";

/// `chrono` format string for `date` parameters.
pub const DATE_FORMAT: &str = "%d/%m/%Y %H:%M";

/// Appended to a field name when a record reference is encoded, so the
/// predicate targets the related record's primary key.
pub const PK_SUFFIX: &str = "__pk";

/// Field name → typed value, one entry per decoded parameter.
///
/// Ordered so that anything built from it (SQL, log lines) is deterministic.
pub type Predicates = BTreeMap<String, ParamValue>;

// ---------------------------------------------------------------------------
// ParamError
// ---------------------------------------------------------------------------

/// Errors produced while decoding or encoding parameters.
#[derive(Debug, Error, PartialEq)]
pub enum ParamError {
    #[error(
        "invalid parameter key {0:?}; the key must be in the format 'name::type' \
         where type is one of: int, str, bool, date, fk, fl"
    )]
    InvalidKey(String),

    #[error("invalid value {value:?} for parameter {key:?}; expected {expected}")]
    InvalidValue {
        key: String,
        expected: &'static str,
        value: String,
    },

    #[error(
        "unsupported value type {0}; expected one of: integer, string, boolean, \
         date, record reference, float"
    )]
    UnsupportedValue(&'static str),
}

// ---------------------------------------------------------------------------
// ParamType
// ---------------------------------------------------------------------------

/// The type token of a parameter key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamType {
    Int,
    Str,
    Bool,
    Date,
    ForeignKey,
    Float,
}

impl ParamType {
    /// Every type token, in wire order.
    pub const ALL: [ParamType; 6] = [
        ParamType::Int,
        ParamType::Str,
        ParamType::Bool,
        ParamType::Date,
        ParamType::ForeignKey,
        ParamType::Float,
    ];

    /// The wire token, e.g. `"fk"`.
    pub fn token(self) -> &'static str {
        match self {
            ParamType::Int => "int",
            ParamType::Str => "str",
            ParamType::Bool => "bool",
            ParamType::Date => "date",
            ParamType::ForeignKey => "fk",
            ParamType::Float => "fl",
        }
    }

    fn expected(self) -> &'static str {
        match self {
            ParamType::Int => "an integer",
            ParamType::Str => "a string",
            ParamType::Bool => "an integer (0 = false, greater than 0 = true)",
            ParamType::Date => "a date formatted DD/MM/YYYY HH:MM",
            ParamType::ForeignKey => "an integer primary key",
            ParamType::Float => "a number",
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Parses a [`ParamType`] from its wire token.
impl FromStr for ParamType {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ParamType::ALL
            .into_iter()
            .find(|t| t.token() == s)
            .ok_or_else(|| {
                format!("unknown parameter type {s:?}; expected one of: int, str, bool, date, fk, fl")
            })
    }
}

// ---------------------------------------------------------------------------
// ParamValue
// ---------------------------------------------------------------------------

/// A reference to another record by primary key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordRef {
    pub pk: i64,
}

/// A decoded parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Int(i64),
    Str(String),
    Bool(bool),
    Date(NaiveDateTime),
    RecordRef(RecordRef),
    Float(f64),
}

impl ParamValue {
    pub fn param_type(&self) -> ParamType {
        match self {
            ParamValue::Int(_) => ParamType::Int,
            ParamValue::Str(_) => ParamType::Str,
            ParamValue::Bool(_) => ParamType::Bool,
            ParamValue::Date(_) => ParamType::Date,
            ParamValue::RecordRef(_) => ParamType::ForeignKey,
            ParamValue::Float(_) => ParamType::Float,
        }
    }

    /// Parse `raw` as a value of `param_type`. `key` is only used for the
    /// error message.
    fn parse(key: &str, param_type: ParamType, raw: &str) -> Result<Self, ParamError> {
        let invalid = || ParamError::InvalidValue {
            key: key.to_string(),
            expected: param_type.expected(),
            value: raw.to_string(),
        };

        let value = match param_type {
            ParamType::Int => ParamValue::Int(raw.trim().parse().map_err(|_| invalid())?),
            ParamType::Str => ParamValue::Str(raw.to_string()),
            ParamType::Bool => {
                let n: i64 = raw.trim().parse().map_err(|_| invalid())?;
                ParamValue::Bool(n > 0)
            }
            ParamType::Date => ParamValue::Date(
                NaiveDateTime::parse_from_str(raw.trim(), DATE_FORMAT).map_err(|_| invalid())?,
            ),
            ParamType::ForeignKey => ParamValue::RecordRef(RecordRef {
                pk: raw.trim().parse().map_err(|_| invalid())?,
            }),
            ParamType::Float => ParamValue::Float(raw.trim().parse().map_err(|_| invalid())?),
        };
        Ok(value)
    }

    /// The wire string for this value.
    pub fn to_wire(&self) -> String {
        match self {
            ParamValue::Int(i) => i.to_string(),
            ParamValue::Str(s) => s.clone(),
            ParamValue::Bool(b) => u8::from(*b).to_string(),
            ParamValue::Date(d) => d.format(DATE_FORMAT).to_string(),
            ParamValue::RecordRef(r) => r.pk.to_string(),
            // Debug keeps the decimal point on whole numbers ("2.0", not "2").
            ParamValue::Float(f) => format!("{f:?}"),
        }
    }

    /// JSON rendering used by diagnostics and the CLI.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            ParamValue::Int(i) => (*i).into(),
            ParamValue::Str(s) => s.clone().into(),
            ParamValue::Bool(b) => (*b).into(),
            ParamValue::Date(d) => d.format("%Y-%m-%dT%H:%M:%S").to_string().into(),
            ParamValue::RecordRef(r) => r.pk.into(),
            ParamValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
        }
    }
}

/// Infers a [`ParamValue`] from a JSON scalar.
///
/// Integers become `Int`, other numbers `Float`. Dates and record references
/// have no JSON form of their own and must be built explicitly.
impl TryFrom<&serde_json::Value> for ParamValue {
    type Error = ParamError;

    fn try_from(value: &serde_json::Value) -> Result<Self, Self::Error> {
        use serde_json::Value;

        match value {
            Value::Bool(b) => Ok(ParamValue::Bool(*b)),
            Value::String(s) => Ok(ParamValue::Str(s.clone())),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Ok(ParamValue::Int(i)),
                None => n
                    .as_f64()
                    .map(ParamValue::Float)
                    .ok_or(ParamError::UnsupportedValue("number")),
            },
            Value::Null => Err(ParamError::UnsupportedValue("null")),
            Value::Array(_) => Err(ParamError::UnsupportedValue("array")),
            Value::Object(_) => Err(ParamError::UnsupportedValue("object")),
        }
    }
}

// ---------------------------------------------------------------------------
// GetParameter
// ---------------------------------------------------------------------------

/// One `name::type=value` parameter, parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct GetParameter {
    name: String,
    value: ParamValue,
}

impl GetParameter {
    /// Build a parameter from a field name and a typed value.
    ///
    /// A [`ParamValue::RecordRef`] targets the related record's key, so the
    /// name gets [`PK_SUFFIX`] appended (`hq_address` → `hq_address__pk`).
    pub fn new(name: impl Into<String>, value: ParamValue) -> Self {
        let mut name = name.into();
        if matches!(value, ParamValue::RecordRef(_)) && !name.ends_with(PK_SUFFIX) {
            name.push_str(PK_SUFFIX);
        }
        Self { name, value }
    }

    /// Decode a raw key/value pair.
    ///
    /// Fails with [`ParamError::InvalidKey`] unless `key` splits on `::` into
    /// exactly two non-empty parts whose second part is a known type token,
    /// and with [`ParamError::InvalidValue`] when `raw` does not parse as
    /// that type.
    pub fn decode(key: &str, raw: &str) -> Result<Self, ParamError> {
        let parts: Vec<&str> = key.split(NAME_TYPE_DELIMITER).collect();
        let [name, token] = parts.as_slice() else {
            return Err(ParamError::InvalidKey(key.to_string()));
        };
        if name.is_empty() || token.is_empty() {
            return Err(ParamError::InvalidKey(key.to_string()));
        }
        let param_type: ParamType = token
            .parse()
            .map_err(|_| ParamError::InvalidKey(key.to_string()))?;

        Ok(Self {
            name: (*name).to_string(),
            value: ParamValue::parse(key, param_type, raw)?,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &ParamValue {
        &self.value
    }

    /// `("name::type", "value")`, ready to be sent as a query parameter and
    /// decoded again.
    pub fn encode(&self) -> (String, String) {
        (
            format!("{}{NAME_TYPE_DELIMITER}{}", self.name, self.value.param_type()),
            self.value.to_wire(),
        )
    }

    /// The parameter as a filter predicate.
    pub fn key_value(self) -> (String, ParamValue) {
        (self.name, self.value)
    }
}

/// Decode every pair, producing one predicate per parameter.
///
/// A field named twice keeps the last value.
pub fn decode_all<I, K, V>(pairs: I) -> Result<Predicates, ParamError>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut predicates = Predicates::new();
    for (key, value) in pairs {
        let (name, value) = GetParameter::decode(key.as_ref(), value.as_ref())?.key_value();
        predicates.insert(name, value);
    }
    Ok(predicates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn decodes_each_type() {
        let cases = [
            ("age::int", "21", "age", ParamValue::Int(21)),
            ("name::str", "Canada", "name", ParamValue::Str("Canada".into())),
            ("active::bool", "1", "active", ParamValue::Bool(true)),
            ("active::bool", "0", "active", ParamValue::Bool(false)),
            ("when::date", "21/11/2006 16:30", "when", ParamValue::Date(at(2006, 11, 21, 16, 30))),
            ("hq_address::fk", "3", "hq_address", ParamValue::RecordRef(RecordRef { pk: 3 })),
            ("ratio::fl", "0.25", "ratio", ParamValue::Float(0.25)),
        ];
        for (key, raw, name, value) in cases {
            let p = GetParameter::decode(key, raw).unwrap();
            assert_eq!(p.key_value(), (name.to_string(), value), "decoding {key}={raw}");
        }
    }

    #[test]
    fn bool_is_numeric_truthiness() {
        for (raw, expected) in [("5", true), ("-1", false), ("0", false)] {
            let p = GetParameter::decode("flag::bool", raw).unwrap();
            assert_eq!(p.value(), &ParamValue::Bool(expected));
        }
        let err = GetParameter::decode("flag::bool", "yes").unwrap_err();
        assert!(matches!(err, ParamError::InvalidValue { .. }));
    }

    #[test]
    fn str_values_are_taken_verbatim() {
        let p = GetParameter::decode("name::str", " a::b=c ").unwrap();
        assert_eq!(p.value(), &ParamValue::Str(" a::b=c ".into()));
    }

    #[test]
    fn malformed_keys_are_rejected() {
        for key in ["age", "age::", "::int", "age::int::x", "age::integer", "", "::"] {
            let err = GetParameter::decode(key, "1").unwrap_err();
            assert_eq!(err, ParamError::InvalidKey(key.to_string()), "key {key:?}");
        }
    }

    #[test]
    fn unparseable_values_are_rejected() {
        for (key, raw) in [
            ("age::int", "twenty"),
            ("age::int", "2.5"),
            ("when::date", "2006-11-21"),
            ("org::fk", "abc"),
            ("ratio::fl", "half"),
        ] {
            let err = GetParameter::decode(key, raw).unwrap_err();
            match err {
                ParamError::InvalidValue { key: k, value, .. } => {
                    assert_eq!(k, key);
                    assert_eq!(value, raw);
                }
                other => panic!("unexpected error for {key}={raw}: {other:?}"),
            }
        }
    }

    #[test]
    fn encoding_a_record_ref_targets_the_primary_key() {
        let p = GetParameter::new("hq_address", ParamValue::RecordRef(RecordRef { pk: 7 }));
        assert_eq!(p.name(), "hq_address__pk");
        assert_eq!(p.encode(), ("hq_address__pk::fk".to_string(), "7".to_string()));

        // Already suffixed names are left alone.
        let p = GetParameter::new("street__pk", ParamValue::RecordRef(RecordRef { pk: 1 }));
        assert_eq!(p.name(), "street__pk");
    }

    #[test]
    fn encoding_infers_the_type_token() {
        let cases = [
            (ParamValue::Int(-4), "n::int", "-4"),
            (ParamValue::Str("x y".into()), "n::str", "x y"),
            (ParamValue::Bool(true), "n::bool", "1"),
            (ParamValue::Bool(false), "n::bool", "0"),
            (ParamValue::Date(at(2017, 1, 2, 3, 4)), "n::date", "02/01/2017 03:04"),
            (ParamValue::Float(2.0), "n::fl", "2.0"),
        ];
        for (value, key, raw) in cases {
            let (k, v) = GetParameter::new("n", value.clone()).encode();
            assert_eq!((k.as_str(), v.as_str()), (key, raw));
            assert_eq!(GetParameter::decode(&k, &v).unwrap().value(), &value);
        }
    }

    #[test]
    fn decode_all_builds_one_predicate_per_parameter() {
        let predicates = decode_all([
            ("name::str", "Canada"),
            ("region::fk", "2"),
            ("name::str", "Mexico"),
        ])
        .unwrap();
        assert_eq!(predicates.len(), 2);
        assert_eq!(predicates["name"], ParamValue::Str("Mexico".into()));
        assert_eq!(predicates["region"], ParamValue::RecordRef(RecordRef { pk: 2 }));
    }

    #[test]
    fn decode_all_stops_at_the_first_bad_parameter() {
        let err = decode_all([("name::str", "ok"), ("bad", "1")]).unwrap_err();
        assert_eq!(err, ParamError::InvalidKey("bad".into()));
    }

    #[test]
    fn json_scalars_convert_and_containers_do_not() {
        use serde_json::json;

        assert_eq!(ParamValue::try_from(&json!(3)).unwrap(), ParamValue::Int(3));
        assert_eq!(ParamValue::try_from(&json!(1.5)).unwrap(), ParamValue::Float(1.5));
        assert_eq!(ParamValue::try_from(&json!("s")).unwrap(), ParamValue::Str("s".into()));
        assert_eq!(ParamValue::try_from(&json!(false)).unwrap(), ParamValue::Bool(false));
        assert_eq!(
            ParamValue::try_from(&json!(null)).unwrap_err(),
            ParamError::UnsupportedValue("null")
        );
        assert_eq!(
            ParamValue::try_from(&json!([1])).unwrap_err(),
            ParamError::UnsupportedValue("array")
        );
        assert_eq!(
            ParamValue::try_from(&json!({"pk": 1})).unwrap_err(),
            ParamError::UnsupportedValue("object")
        );
    }
}
