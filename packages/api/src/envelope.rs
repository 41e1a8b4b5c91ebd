//! The `{"response": ...}` wrapper applied to every response body.

use serde::{Deserialize, Serialize};
use serde_json::ser::PrettyFormatter;

/// Indentation of rendered bodies.
pub const INDENT: &[u8] = b"    ";

/// Wraps any payload as `{"response": payload}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Envelope<T> {
    pub response: T,
}

impl<T> Envelope<T> {
    pub fn new(response: T) -> Self {
        Self { response }
    }

    pub fn into_inner(self) -> T {
        self.response
    }
}

impl<T: Serialize> Envelope<T> {
    /// Serialise the envelope as JSON indented by four spaces.
    pub fn render(&self) -> serde_json::Result<Vec<u8>> {
        let mut out = Vec::with_capacity(128);
        let formatter = PrettyFormatter::with_indent(INDENT);
        let mut ser = serde_json::Serializer::with_formatter(&mut out, formatter);
        self.serialize(&mut ser)?;
        Ok(out)
    }
}

/// Body of a successful single-record delete: `{"deleted": true}`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Deleted {
    pub deleted: bool,
}

impl Deleted {
    pub fn new() -> Self {
        Self { deleted: true }
    }
}

impl Default for Deleted {
    fn default() -> Self {
        Self::new()
    }
}

/// Body of a filtered delete.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ListDeleted {
    pub deleted: bool,
    pub number_entries_affected: u64,
}

impl ListDeleted {
    pub fn new(count: u64) -> Self {
        Self {
            deleted: true,
            number_entries_affected: count,
        }
    }
}
