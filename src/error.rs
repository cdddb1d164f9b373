// Error taxonomy for planning and parallel parsing.
//
// Planning errors abort the call before any parsing starts. Grammar errors
// are collected per chunk and surfaced together after every worker has
// finished, so one call reports every malformed region of the input.

use std::fmt;

use thiserror::Error;

/// Fatal planning failure. No ranges are produced and no parsing happens.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum PlanError {
    /// The buffer ends inside an open quoted field: the total quote count
    /// across the whole input is odd.
    #[error("input ends inside an open quoted field ({quotes} quote characters seen)")]
    UnterminatedQuote { quotes: u64 },
}

/// A malformed record found by the sequential grammar within one chunk.
/// Line numbers are relative to the start of the chunk's byte range.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("line {line}: expected {expected} fields, got {got}")]
    FieldCount {
        line: usize,
        expected: usize,
        got: usize,
    },
    #[error("line {line}: bare quote in unquoted field")]
    BareQuote { line: usize },
    #[error("line {line}: unexpected character after closing quote")]
    Quote { line: usize },
    #[error("line {line}: unterminated quoted field")]
    UnterminatedField { line: usize },
}

/// A grammar failure tagged with the chunk it came from.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("chunk {chunk}: {source}")]
pub struct ChunkError {
    pub chunk: usize,
    #[source]
    pub source: RecordError,
}

/// All grammar failures from one parse call. Every failed chunk is listed;
/// sibling workers are never short-circuited by the first failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseErrors {
    pub errors: Vec<ChunkError>,
}

impl fmt::Display for ParseErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} chunk(s) failed to parse: ", self.errors.len())?;
        for (i, err) in self.errors.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{err}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ParseErrors {}

/// Top-level error for the convenience reader API.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Error {
    #[error(transparent)]
    Plan(#[from] PlanError),
    #[error(transparent)]
    Parse(#[from] ParseErrors),
}
