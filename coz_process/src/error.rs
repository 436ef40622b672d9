use std::io;

/// Structural errors raised while reading a causal profile log.
///
/// Any of these aborts the scan of the current file. Runs that were already
/// committed from that file are kept by the caller.
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("Malformed line {line}: {reason}")]
    MalformedLine { line: usize, reason: String },

    #[error("Line {line}: '{command}' record is missing required field '{key}'")]
    MissingField {
        line: usize,
        command: String,
        key: String,
    },

    #[error("Line {line}: field '{key}' has non-numeric value '{value}'")]
    FieldType {
        line: usize,
        key: String,
        value: String,
    },

    #[error("Failed to read profile log")]
    Io(#[from] io::Error),
}

impl LogError {
    /// Annotate the error with the 1-based line number it was raised at.
    ///
    /// Errors are constructed with line 0 by code that only sees a single
    /// decoded line; the file-level reader fills the number in.
    #[must_use]
    pub fn at_line(mut self, line_number: usize) -> Self {
        match &mut self {
            LogError::MalformedLine { line, .. }
            | LogError::MissingField { line, .. }
            | LogError::FieldType { line, .. } => *line = line_number,
            LogError::Io(_) => {}
        }
        self
    }

    /// The line the error was raised at, if it refers to a specific line.
    pub fn line(&self) -> Option<usize> {
        match self {
            LogError::MalformedLine { line, .. }
            | LogError::MissingField { line, .. }
            | LogError::FieldType { line, .. } => Some(*line),
            LogError::Io(_) => None,
        }
    }
}
