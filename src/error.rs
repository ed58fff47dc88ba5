//! Crate-wide error taxonomy (spec §7).
//!
//! Only I/O and programming errors raise; expected control flow (missing
//! share text, an empty owner list, depth exhaustion) is represented as
//! data — a `ResolveWarning` or a `None` — never as an `Err`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum UboError {
    #[error("registry unreachable for {ico} after retries exhausted: {reason}")]
    RegistryUnreachable { ico: String, reason: String },

    #[error("cache I/O error: {0}")]
    CacheIoError(#[from] sqlx::Error),

    #[error("http transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("share expression could not be parsed: {0:?}")]
    ShareUnparseable(String),
}

pub type UboResult<T> = Result<T, UboError>;
