//! Response types for the portfolio CRUD API.
//!
//! Every body the server writes is an [`Envelope`]. Clients (the `pfolio`
//! CLI, the conformance suite) deserialise through the same types.
//!
//! | Situation | Payload inside `response` |
//! |-----------|---------------------------|
//! | `GET` list | array of record objects |
//! | `GET` / `PUT` single | record object |
//! | `DELETE` by pk | [`Deleted`] |
//! | `DELETE` by filter | [`ListDeleted`] |
//! | any failure | [`ErrorResponse`] |

pub mod envelope;
pub mod error;

pub use envelope::{Deleted, Envelope, ListDeleted};
pub use error::ErrorResponse;
