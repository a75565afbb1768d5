use std::fs::File;
use std::io::{BufRead, BufReader};

use crate::error::SummaError;

/// Reads a list of floats from a file, one per line. Blank lines are
/// skipped; anything else that does not parse as a number is an error
/// carrying the offending line.
pub fn read_values_file(path: &str) -> Result<Vec<f64>, SummaError> {
    let file = File::open(path).map_err(|e| SummaError::Io {
        path: path.to_string(),
        source: e,
    })?;
    let reader = BufReader::new(file);

    let mut values = Vec::new();
    for (line_index, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| SummaError::Io {
            path: path.to_string(),
            source: e,
        })?;

        let token = line.trim();
        if token.is_empty() {
            continue;
        }

        let value: f64 = token.parse().map_err(|_| SummaError::Parse {
            path: path.to_string(),
            line: line_index + 1,
            token: token.to_string(),
        })?;
        values.push(value);
    }

    Ok(values)
}
