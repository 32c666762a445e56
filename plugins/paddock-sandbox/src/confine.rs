//! Confined command construction.
//!
//! Arbitrary shell commands are wrapped in a bubblewrap invocation that
//! mounts the whole filesystem read-only at its own path (absolute-path
//! references keep working), overlays a minimal `/dev` with the standard
//! I/O and randomness device nodes, and - in read-write mode - bind-mounts
//! the writable boundary back in read-write. This restricts filesystem
//! writes only; process and network namespaces are left unconfined.
//!
//! The launcher is trusted only at a fixed set of absolute locations. It is
//! never resolved through `PATH`: executing whatever binary happens to be
//! named `bwrap` on the search path would hand the boundary to an attacker.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Absolute locations where the bubblewrap launcher is trusted.
pub const TRUSTED_LAUNCHER_LOCATIONS: [&str; 2] = ["/usr/bin/bwrap", "/usr/local/bin/bwrap"];

/// Whether a trusted sandbox launcher was found at session start.
///
/// Modeled as a tagged value rather than an `Option` so call sites must
/// handle the unavailable case explicitly - the execution path refuses to
/// run anything when no launcher exists, never silently falling back to
/// unconfined execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SandboxLauncher {
    /// A launcher exists at this trusted location.
    Available(PathBuf),

    /// No trusted location held a launcher; confined execution is impossible.
    Unavailable,
}

impl SandboxLauncher {
    /// Probe the candidate locations in order, keeping the first regular
    /// file found. Candidates are fixed absolute paths; `PATH` is never
    /// consulted.
    pub async fn probe(candidates: &[PathBuf]) -> Self {
        for candidate in candidates {
            match tokio::fs::metadata(candidate).await {
                Ok(meta) if meta.is_file() => {
                    log::debug!("sandbox launcher found at {}", candidate.display());
                    return SandboxLauncher::Available(candidate.clone());
                }
                _ => {}
            }
        }
        log::debug!("no sandbox launcher at any trusted location");
        SandboxLauncher::Unavailable
    }

    /// True if a launcher was found.
    pub fn is_available(&self) -> bool {
        matches!(self, SandboxLauncher::Available(_))
    }
}

/// Why a confined command could not be built.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ConfineError {
    /// No trusted launcher exists; the caller must refuse to execute.
    #[error(
        "cannot sandbox this command: no trusted sandbox launcher was found \
         (checked {locations}); refusing to run it unconfined"
    )]
    LauncherUnavailable {
        /// The trusted locations that were probed.
        locations: String,
    },

    /// Confinement was requested while in yolo mode, where commands run
    /// unconfined by definition.
    #[error("commands run unconfined in yolo mode")]
    UnconfinedMode,
}

impl ConfineError {
    pub(crate) fn launcher_unavailable(candidates: &[PathBuf]) -> Self {
        let locations = candidates
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        ConfineError::LauncherUnavailable { locations }
    }
}

/// A fully constructed sandboxed invocation.
///
/// Held as a structured argument vector; quoting happens only at the final
/// boundary where the whole invocation must become one string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfinedCommand {
    argv: Vec<String>,
}

impl ConfinedCommand {
    /// The raw argument vector, launcher first.
    pub fn argv(&self) -> &[String] {
        &self.argv
    }

    /// Render the invocation as a single shell-safe line: every token
    /// single-quoted, joined with spaces. Suitable as the `command`
    /// parameter of the host's unconfined shell runner.
    pub fn shell_line(&self) -> String {
        self.argv
            .iter()
            .map(|token| shell_quote(token))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Build the confined argv for a user command.
///
/// `writable` is empty in read-only mode; in read-write mode it carries the
/// session root, the extra writable directories, and the system temp dir
/// (bound to its real host location so files written there stay visible to
/// the host process).
pub(crate) fn confined_argv(
    launcher: &Path,
    writable: &[PathBuf],
    cwd: &Path,
    user_command: &str,
) -> ConfinedCommand {
    let mut argv = Vec::with_capacity(11 + 3 * writable.len());
    argv.push(launcher.to_string_lossy().into_owned());

    // Whole filesystem, read-only, at its own path.
    argv.push("--ro-bind".into());
    argv.push("/".into());
    argv.push("/".into());

    // Fresh /dev with null/zero/random/urandom/tty and the fd symlinks.
    argv.push("--dev".into());
    argv.push("/dev".into());

    for dir in writable {
        let location = dir.to_string_lossy().into_owned();
        argv.push("--bind".into());
        argv.push(location.clone());
        argv.push(location);
    }

    argv.push("--chdir".into());
    argv.push(cwd.to_string_lossy().into_owned());

    argv.push("bash".into());
    argv.push("-c".into());
    argv.push(user_command.to_string());

    ConfinedCommand { argv }
}

/// Quote one token for POSIX shells: wrap in single quotes, with embedded
/// single quotes escaped by the `'\''` technique.
pub(crate) fn shell_quote(token: &str) -> String {
    let mut quoted = String::with_capacity(token.len() + 2);
    quoted.push('\'');
    for ch in token.chars() {
        if ch == '\'' {
            quoted.push_str("'\\''");
        } else {
            quoted.push(ch);
        }
    }
    quoted.push('\'');
    quoted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_plain_tokens() {
        assert_eq!(shell_quote("ls"), "'ls'");
        assert_eq!(shell_quote("a b"), "'a b'");
        assert_eq!(shell_quote("$HOME; rm -rf /"), "'$HOME; rm -rf /'");
    }

    #[test]
    fn quotes_embedded_single_quotes() {
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
        assert_eq!(shell_quote("''"), r"''\'''\'''");
    }

    #[test]
    fn read_only_argv_has_no_binds() {
        let confined = confined_argv(
            Path::new("/usr/bin/bwrap"),
            &[],
            Path::new("/work"),
            "make test",
        );
        let argv = confined.argv();

        assert_eq!(argv[0], "/usr/bin/bwrap");
        assert!(argv.iter().all(|t| t != "--bind"));
        assert!(argv.windows(3).any(|w| w == ["--ro-bind", "/", "/"]));
        assert!(argv.windows(2).any(|w| w == ["--dev", "/dev"]));
        assert!(argv.windows(2).any(|w| w == ["--chdir", "/work"]));
        assert_eq!(&argv[argv.len() - 3..], ["bash", "-c", "make test"]);
    }

    #[test]
    fn read_write_argv_binds_each_dir_at_itself() {
        let writable = vec![
            PathBuf::from("/home/u/project"),
            PathBuf::from("/home/u/.git-worktrees/main"),
            PathBuf::from("/tmp"),
        ];
        let confined = confined_argv(
            Path::new("/usr/local/bin/bwrap"),
            &writable,
            Path::new("/home/u/project"),
            "cargo build",
        );
        let argv = confined.argv();

        for dir in &writable {
            let d = dir.to_string_lossy();
            assert!(
                argv.windows(3)
                    .any(|w| w[0] == "--bind" && w[1] == d && w[2] == d),
                "missing --bind for {}",
                d
            );
        }
        // Read-only base comes before the writable binds.
        let ro = argv.iter().position(|t| t == "--ro-bind").unwrap();
        let bind = argv.iter().position(|t| t == "--bind").unwrap();
        assert!(ro < bind);
    }

    #[test]
    fn shell_line_keeps_user_command_as_one_token() {
        let confined = confined_argv(
            Path::new("/usr/bin/bwrap"),
            &[],
            Path::new("/work dir"),
            "echo 'hi there' && touch /etc/x",
        );
        let line = confined.shell_line();

        assert!(line.starts_with("'/usr/bin/bwrap'"));
        assert!(line.contains("'--chdir' '/work dir'"));
        // The user command survives as a single quoted token.
        assert!(line.ends_with(r"'bash' '-c' 'echo '\''hi there'\'' && touch /etc/x'"));
    }

    #[tokio::test]
    async fn probe_ignores_missing_candidates() {
        let launcher = SandboxLauncher::probe(&[
            PathBuf::from("/nonexistent/bwrap"),
            PathBuf::from("/also/not/here"),
        ])
        .await;
        assert_eq!(launcher, SandboxLauncher::Unavailable);
        assert!(!launcher.is_available());
    }

    #[tokio::test]
    async fn probe_requires_a_regular_file() {
        let dir = tempfile::tempdir().unwrap();
        // A directory at the candidate location does not count.
        let launcher = SandboxLauncher::probe(&[dir.path().to_path_buf()]).await;
        assert_eq!(launcher, SandboxLauncher::Unavailable);

        let file = dir.path().join("bwrap");
        tokio::fs::write(&file, "#!/bin/sh\n").await.unwrap();
        let launcher = SandboxLauncher::probe(&[file.clone()]).await;
        assert_eq!(launcher, SandboxLauncher::Available(file));
    }

    #[test]
    fn unavailable_error_names_the_locations() {
        let err = ConfineError::launcher_unavailable(&[
            PathBuf::from("/usr/bin/bwrap"),
            PathBuf::from("/usr/local/bin/bwrap"),
        ]);
        let message = err.to_string();
        assert!(message.contains("/usr/bin/bwrap"));
        assert!(message.contains("/usr/local/bin/bwrap"));
        assert!(message.contains("refusing"));
    }
}
