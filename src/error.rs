//! Provides [`StinetError`] and wraps other errors.
//!
//! Only environmental failures (config files, report sinks) surface as
//! errors; contract violations inside the simulation kernel panic with the
//! violated invariant named.
use std::fmt::{self, Debug, Display};
use std::io;

#[derive(Debug)]
pub enum StinetError {
    IoError(io::Error),
    JsonError(serde_json::Error),
    CsvError(csv::Error),
    ParseIntError(std::num::ParseIntError),
    StinetError(String),
}

impl From<io::Error> for StinetError {
    fn from(error: io::Error) -> Self {
        StinetError::IoError(error)
    }
}

impl From<serde_json::Error> for StinetError {
    fn from(error: serde_json::Error) -> Self {
        StinetError::JsonError(error)
    }
}

impl From<csv::Error> for StinetError {
    fn from(error: csv::Error) -> Self {
        StinetError::CsvError(error)
    }
}

impl From<std::num::ParseIntError> for StinetError {
    fn from(error: std::num::ParseIntError) -> Self {
        StinetError::ParseIntError(error)
    }
}

impl From<String> for StinetError {
    fn from(error: String) -> Self {
        StinetError::StinetError(error)
    }
}

impl From<&str> for StinetError {
    fn from(error: &str) -> Self {
        StinetError::StinetError(error.to_string())
    }
}

impl std::error::Error for StinetError {}

impl Display for StinetError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Error: {self:?}")?;
        Ok(())
    }
}
