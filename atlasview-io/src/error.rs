//! Error types for I/O operations

use thiserror::Error;

/// Errors that can occur while reading volumes and surfaces
#[derive(Error, Debug)]
pub enum IoError {
    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("Invalid file format: {format}")]
    InvalidFormat { format: String },

    #[error("Parse error at line {line}: {message}")]
    ParseError { line: usize, message: String },

    #[error("NIfTI error: {0}")]
    Nifti(#[from] nifti::NiftiError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl IoError {
    pub(crate) fn parse(line: usize, message: impl Into<String>) -> Self {
        IoError::ParseError {
            line,
            message: message.into(),
        }
    }
}

impl From<IoError> for atlasview_core::Error {
    fn from(err: IoError) -> Self {
        match err {
            IoError::Io(io) => atlasview_core::Error::Io(io),
            IoError::InvalidFormat { format } => atlasview_core::Error::UnsupportedFormat(format),
            other => atlasview_core::Error::InvalidData(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_converts_to_invalid_data() {
        let err: atlasview_core::Error = IoError::parse(7, "bad POINTS header").into();
        assert_eq!(
            err.to_string(),
            "Invalid data: Parse error at line 7: bad POINTS header"
        );
    }

    #[test]
    fn test_format_error_converts_to_unsupported_format() {
        let err: atlasview_core::Error = IoError::InvalidFormat {
            format: "BINARY".to_string(),
        }
        .into();
        assert!(matches!(err, atlasview_core::Error::UnsupportedFormat(_)));
    }
}
