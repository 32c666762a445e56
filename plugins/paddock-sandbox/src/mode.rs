//! The three-state write/execution policy.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Governs both filesystem-write permission and whether shell execution is
/// confined. Changed only by explicit user action (command or shortcut).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SandboxMode {
    /// No path is ever writable; shell commands see a read-only filesystem.
    ReadOnly,

    /// Writes permitted inside the session root, the extra writable
    /// directories, and the system temp dir; shell commands are confined to
    /// the same boundary.
    ReadWrite,

    /// Everything is writable and shell execution is never confined.
    Yolo,
}

impl SandboxMode {
    /// All modes, in cycle order.
    pub const ALL: [SandboxMode; 3] =
        [SandboxMode::ReadOnly, SandboxMode::ReadWrite, SandboxMode::Yolo];

    /// The next mode in the cycle `read-only -> read-write -> yolo -> read-only`.
    pub fn advance(self) -> Self {
        match self {
            SandboxMode::ReadOnly => SandboxMode::ReadWrite,
            SandboxMode::ReadWrite => SandboxMode::Yolo,
            SandboxMode::Yolo => SandboxMode::ReadOnly,
        }
    }

    /// The user-facing name of this mode.
    pub fn as_str(self) -> &'static str {
        match self {
            SandboxMode::ReadOnly => "read-only",
            SandboxMode::ReadWrite => "read-write",
            SandboxMode::Yolo => "yolo",
        }
    }
}

impl fmt::Display for SandboxMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rejection of an unknown mode string, listing the valid values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown sandbox mode '{input}' (valid values: read-only, read-write, yolo)")]
pub struct ParseModeError {
    input: String,
}

impl FromStr for SandboxMode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "read-only" => Ok(SandboxMode::ReadOnly),
            "read-write" => Ok(SandboxMode::ReadWrite),
            "yolo" => Ok(SandboxMode::Yolo),
            _ => Err(ParseModeError { input: s.into() }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::read_only("read-only", SandboxMode::ReadOnly)]
    #[case::read_write("read-write", SandboxMode::ReadWrite)]
    #[case::yolo("yolo", SandboxMode::Yolo)]
    fn parses_valid_modes(#[case] input: &str, #[case] expected: SandboxMode) {
        assert_eq!(input.parse::<SandboxMode>().unwrap(), expected);
        assert_eq!(expected.to_string(), input);
    }

    #[rstest]
    #[case::empty("")]
    #[case::case_mismatch("Read-Only")]
    #[case::underscore("read_write")]
    #[case::garbage("noclue")]
    fn rejects_unknown_modes(#[case] input: &str) {
        let err = input.parse::<SandboxMode>().unwrap_err();
        let message = err.to_string();
        assert!(message.contains("read-only"));
        assert!(message.contains("read-write"));
        assert!(message.contains("yolo"));
    }

    #[test]
    fn advance_cycles_in_three_steps() {
        for mode in SandboxMode::ALL {
            assert_eq!(mode.advance().advance().advance(), mode);
        }
        assert_eq!(SandboxMode::ReadOnly.advance(), SandboxMode::ReadWrite);
        assert_eq!(SandboxMode::ReadWrite.advance(), SandboxMode::Yolo);
        assert_eq!(SandboxMode::Yolo.advance(), SandboxMode::ReadOnly);
    }
}
