use std::io;

/// Everything that can go wrong before or around the search itself.
/// The search proper cannot fail: an empty solution stream is a valid result.
#[derive(Debug, thiserror::Error)]
pub enum SummaError {
    #[error("negative constituent value {value} at index {index}")]
    NegativeConstituent { index: usize, value: f64 },

    #[error("negative total {target} at index {index}")]
    NegativeTotal { index: usize, target: f64 },

    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("{path}:{line}: invalid number {token:?}")]
    Parse {
        path: String,
        line: usize,
        token: String,
    },

    #[error("{0}")]
    Thread(String),
}
