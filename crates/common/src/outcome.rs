//! Install outcome codes shared by the recovery environment

use std::fmt;

/// Result of a package installation attempt
///
/// The integer codes are stable and shared with the rest of the recovery
/// environment; they are also used as the process exit code of the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstallOutcome {
    Success,
    Error,
    Corrupt,
    /// Nothing was installed (no package, or the session was cancelled)
    None,
    Skipped,
    Retry,
}

impl InstallOutcome {
    /// Integer code of this outcome
    pub fn code(self) -> i32 {
        match self {
            InstallOutcome::Success => 0,
            InstallOutcome::Error => 1,
            InstallOutcome::Corrupt => 2,
            InstallOutcome::None => 3,
            InstallOutcome::Skipped => 4,
            InstallOutcome::Retry => 5,
        }
    }

    /// Map an integer code back to an outcome
    ///
    /// Unknown codes collapse to [`InstallOutcome::Error`].
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => InstallOutcome::Success,
            2 => InstallOutcome::Corrupt,
            3 => InstallOutcome::None,
            4 => InstallOutcome::Skipped,
            5 => InstallOutcome::Retry,
            _ => InstallOutcome::Error,
        }
    }

    pub fn is_success(self) -> bool {
        self == InstallOutcome::Success
    }
}

impl fmt::Display for InstallOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            InstallOutcome::Success => "success",
            InstallOutcome::Error => "error",
            InstallOutcome::Corrupt => "corrupt",
            InstallOutcome::None => "none",
            InstallOutcome::Skipped => "skipped",
            InstallOutcome::Retry => "retry",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_codes() {
        assert_eq!(InstallOutcome::Success.code(), 0);
        assert_eq!(InstallOutcome::Error.code(), 1);
        assert_eq!(InstallOutcome::from_code(2), InstallOutcome::Corrupt);
        assert_eq!(InstallOutcome::from_code(5), InstallOutcome::Retry);
    }

    #[test]
    fn test_unknown_code_is_error() {
        assert_eq!(InstallOutcome::from_code(-1), InstallOutcome::Error);
        assert_eq!(InstallOutcome::from_code(42), InstallOutcome::Error);
        assert_eq!(InstallOutcome::from_code(1), InstallOutcome::Error);
    }

    #[test]
    fn test_display() {
        assert_eq!(InstallOutcome::Success.to_string(), "success");
        assert_eq!(InstallOutcome::None.to_string(), "none");
        assert!(InstallOutcome::Success.is_success());
        assert!(!InstallOutcome::Retry.is_success());
    }
}
