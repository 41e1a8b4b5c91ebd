//! Record schema and parameter codec for the portfolio CRUD API.
//!
//! This crate is pure logic with no I/O. The HTTP service (`portfolio-server`)
//! and the `pfolio` CLI both build on it.
//!
//! # Crate layout
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`param`] | `name::type=value` codec: [`GetParameter`], [`ParamValue`], [`decode_all`] |
//! | [`schema`] | Record-type descriptors: [`RecordSchema`], [`FieldDescriptor`], [`FieldKind`] |
//! | [`models`] | The portfolio's record types and the [`models::CATALOG`] |
//! | [`types`] | Stored values and the record serialization contract: [`Record`], [`FieldValue`] |
//! | [`validation`] | Fitting decoded parameters to a schema: [`Predicate`], [`SchemaError`] |
//!
//! # Quick start
//!
//! ```rust,ignore
//! use portfolio::{decode_all, models::ORGANIZATION};
//!
//! let params = decode_all([("name::str", "Acme"), ("hq_address::fk", "3")])?;
//! let row = ORGANIZATION.new_row(&params)?;
//! ```

pub mod models;
pub mod param;
pub mod schema;
pub mod types;
pub mod validation;

pub use param::{
    decode_all, GetParameter, ParamError, ParamType, ParamValue, Predicates, RecordRef,
};
pub use schema::{FieldDescriptor, FieldKind, RecordSchema};
pub use types::{FieldValue, Record, Row, PRIMARY_KEY};
pub use validation::{Predicate, SchemaError};
