use crate::dataset::SourceTag;
use crate::sources::FetchError;
use std::fmt;
use thiserror::Error;

/// Why one source did not produce the dataset.
#[derive(Debug)]
pub struct SourceFailure {
    pub source: SourceTag,
    pub reason: FetchError,
}

impl fmt::Display for SourceFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.source, self.reason)
    }
}

#[derive(Debug, Error)]
pub enum ResolveError {
    /// Every configured source failed, the sample included if it was enabled.
    #[error("all {} sources failed{}", .failures.len(), summarize(.failures))]
    Exhausted { failures: Vec<SourceFailure> },
}

impl ResolveError {
    pub fn failures(&self) -> &[SourceFailure] {
        match self {
            ResolveError::Exhausted { failures } => failures,
        }
    }
}

#[derive(Debug, Error)]
pub enum RetryError {
    #[error("giving up after {attempts} attempts: {last}")]
    Terminal {
        attempts: u32,
        #[source]
        last: ResolveError,
    },
}

fn summarize(failures: &[SourceFailure]) -> String {
    if failures.is_empty() {
        return String::new();
    }
    let parts: Vec<String> = failures.iter().map(ToString::to_string).collect();
    format!(" ({})", parts.join("; "))
}
