//! Error type shared by construction and mutation paths.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TableError {
    /// A required callback was not supplied to `TableBuilder`.
    #[error("invalid configuration: no `{missing}` callback supplied")]
    InvalidConfiguration { missing: &'static str },
    /// The bucket array could not be grown; the table is left unchanged.
    #[error("failed to grow bucket array to {requested} buckets")]
    AllocationFailed { requested: usize },
}
