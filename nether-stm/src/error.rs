//! Error types for STM module parsing

use thiserror::Error;

/// Errors that can occur when parsing STM modules
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StmError {
    /// File too small to contain the header
    #[error("File too small to contain STM header")]
    TooSmall,
    /// Type byte is neither 1 (song) nor 2 (module)
    #[error("Unknown STM song type: {0}")]
    UnknownType(u8),
    /// Version outside 2.00/2.10/2.20/2.21
    #[error("Unsupported STM version: {major}.{minor:02}")]
    UnsupportedVersion { major: u8, minor: u8 },
    /// Pattern count exceeds what the order list can address
    #[error("Too many patterns: {0} (max {max})", max = crate::MAX_PATTERNS)]
    TooManyPatterns(u8),
    /// Pattern data ended early
    #[error("Invalid pattern data at index {0}")]
    InvalidPattern(u8),
    /// Sample body lies outside the file
    #[error("Sample {slot} data at offset {offset} is out of bounds")]
    InvalidSampleOffset { slot: u8, offset: usize },
    /// Unexpected end of file
    #[error("Unexpected end of file")]
    UnexpectedEof,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            StmError::TooSmall.to_string(),
            "File too small to contain STM header"
        );
        assert_eq!(
            StmError::UnsupportedVersion { major: 2, minor: 1 }.to_string(),
            "Unsupported STM version: 2.01"
        );
        assert_eq!(
            StmError::TooManyPatterns(70).to_string(),
            "Too many patterns: 70 (max 64)"
        );
        assert_eq!(
            StmError::InvalidSampleOffset {
                slot: 3,
                offset: 4096
            }
            .to_string(),
            "Sample 3 data at offset 4096 is out of bounds"
        );
    }
}
