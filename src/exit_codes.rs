/// Exit codes for the mdocx CLI.
///
/// These exit codes allow users and CI/CD systems to distinguish between
/// different types of failures.
/// Success - conversion completed (possibly with warnings on stderr)
pub const SUCCESS: i32 = 0;

/// Conversion failed - the input could not be converted
pub const CONVERSION_FAILED: i32 = 1;

/// Tool error - bad arguments, file access error, or internal error
pub const TOOL_ERROR: i32 = 2;

/// Helper functions for consistent exit behavior
pub mod exit {
    use super::{CONVERSION_FAILED, SUCCESS, TOOL_ERROR};

    /// Exit with success code (0)
    pub fn success() -> ! {
        std::process::exit(SUCCESS);
    }

    /// Exit with conversion failure code (1)
    pub fn conversion_failed() -> ! {
        std::process::exit(CONVERSION_FAILED);
    }

    /// Exit with tool error code (2)
    pub fn tool_error() -> ! {
        std::process::exit(TOOL_ERROR);
    }
}
