//! Exit codes for the CLI tool.

use arcwalk::Error;

/// Exit code constants
pub const SUCCESS: i32 = 0;
/// Fatal error occurred
pub const FATAL_ERROR: i32 = 2;
/// Archive format error
pub const BAD_ARCHIVE: i32 = 3;
/// Missing or wrong password
pub const PASSWORD: i32 = 4;
/// I/O error
pub const IO_ERROR: i32 = 5;
/// Inner path does not exist
pub const NOT_FOUND: i32 = 6;
/// Archive entry would escape the output directory
pub const ILLEGAL_PATH: i32 = 7;
/// Unknown format or unsupported operation
pub const UNSUPPORTED: i32 = 8;
/// Ctrl+C (128 + SIGINT)
pub const USER_INTERRUPT: i32 = 130;

/// Exit code enum for structured handling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success,
    FatalError,
    BadArchive,
    Password,
    IoError,
    NotFound,
    IllegalPath,
    Unsupported,
}

impl ExitCode {
    /// Returns the numeric exit code
    pub fn code(self) -> i32 {
        match self {
            Self::Success => SUCCESS,
            Self::FatalError => FATAL_ERROR,
            Self::BadArchive => BAD_ARCHIVE,
            Self::Password => PASSWORD,
            Self::IoError => IO_ERROR,
            Self::NotFound => NOT_FOUND,
            Self::IllegalPath => ILLEGAL_PATH,
            Self::Unsupported => UNSUPPORTED,
        }
    }
}

/// Converts an arcwalk error to an exit code
pub fn error_to_exit_code(error: &Error) -> ExitCode {
    match error {
        Error::Io(_) => ExitCode::IoError,
        Error::IllegalPath { .. } => ExitCode::IllegalPath,
        Error::PasswordRequired | Error::WrongPassword { .. } => ExitCode::Password,
        Error::NotFound { .. } => ExitCode::NotFound,
        Error::NotSupported { .. } | Error::UnsupportedFormat { .. } => ExitCode::Unsupported,
        Error::InvalidFormat(_) | Error::CorruptHeader { .. } => ExitCode::BadArchive,
        // Future error variants - required by #[non_exhaustive]
        _ => ExitCode::FatalError,
    }
}
