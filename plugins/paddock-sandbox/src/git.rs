//! One-shot discovery of version-control metadata outside the root.
//!
//! Linked working trees keep their repository metadata in a directory that
//! lives outside the checkout. If that directory is not writable, every
//! `git` invocation under read-write confinement fails, so session start
//! probes for it once and adds it to the writable set. This is a
//! best-effort convenience: any probe failure - git missing, non-zero
//! exit, timeout, malformed output - yields an empty set and is never
//! surfaced as an error.

use crate::paths::{canonicalize_lenient, is_inside};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

/// Upper bound on each probe; a slow probe counts as "not detected".
const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Discover repository metadata directories that must stay writable even
/// though they lie outside `root`. Returns canonical paths, outermost-only.
pub(crate) async fn discover_extra_writable_dirs(root: &Path) -> Vec<PathBuf> {
    // Cheap marker check before spawning anything. Linked worktrees use a
    // `.git` file, primary checkouts a directory; either counts.
    match tokio::fs::try_exists(root.join(".git")).await {
        Ok(true) => {}
        _ => return Vec::new(),
    }

    let mut candidates = Vec::new();
    for probe in ["--absolute-git-dir", "--git-common-dir"] {
        if let Some(raw) = git_probe(root, probe).await {
            // --git-common-dir may answer with a root-relative path.
            let absolute = if raw.is_absolute() { raw } else { root.join(raw) };
            candidates.push(canonicalize_lenient(&absolute).await);
        }
    }

    dedupe_outermost(candidates, root)
}

/// Run `git rev-parse <probe>` under the root, returning its trimmed
/// stdout. Any failure is logged at debug and swallowed.
async fn git_probe(root: &Path, probe: &str) -> Option<PathBuf> {
    let mut cmd = Command::new("git");
    cmd.arg("rev-parse")
        .arg(probe)
        .current_dir(root)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null());

    let output = match timeout(PROBE_TIMEOUT, cmd.output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            log::debug!("git probe {} failed to run: {}", probe, e);
            return None;
        }
        Err(_) => {
            log::debug!("git probe {} timed out", probe);
            return None;
        }
    };

    if !output.status.success() {
        log::debug!("git probe {} exited with {}", probe, output.status);
        return None;
    }

    let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if text.is_empty() {
        None
    } else {
        Some(PathBuf::from(text))
    }
}

/// Drop candidates inside `root` and candidates that are descendants of
/// another candidate, keeping only the outermost of each overlapping group.
pub(crate) fn dedupe_outermost(mut candidates: Vec<PathBuf>, root: &Path) -> Vec<PathBuf> {
    candidates.sort();
    candidates.dedup();
    candidates.retain(|dir| !is_inside(dir, root));

    let mut keep: Vec<PathBuf> = Vec::new();
    for dir in candidates {
        if keep.iter().any(|outer| is_inside(&dir, outer)) {
            continue;
        }
        keep.retain(|existing| !is_inside(existing, &dir));
        keep.push(dir);
    }
    keep
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_only_the_outermost_entry() {
        let root = Path::new("/home/u/project");
        let kept = dedupe_outermost(
            vec![
                PathBuf::from("/home/u/repo/.git/worktrees/x"),
                PathBuf::from("/home/u/repo/.git"),
            ],
            root,
        );
        assert_eq!(kept, vec![PathBuf::from("/home/u/repo/.git")]);
    }

    #[test]
    fn drops_entries_inside_root() {
        let root = Path::new("/home/u/project");
        let kept = dedupe_outermost(
            vec![
                PathBuf::from("/home/u/project/.git"),
                PathBuf::from("/home/u/elsewhere/.git"),
            ],
            root,
        );
        assert_eq!(kept, vec![PathBuf::from("/home/u/elsewhere/.git")]);
    }

    #[test]
    fn deduplicates_identical_entries() {
        let root = Path::new("/home/u/project");
        let kept = dedupe_outermost(
            vec![
                PathBuf::from("/srv/meta"),
                PathBuf::from("/srv/meta"),
                PathBuf::from("/srv/other"),
            ],
            root,
        );
        assert_eq!(
            kept,
            vec![PathBuf::from("/srv/meta"), PathBuf::from("/srv/other")]
        );
    }

    #[test]
    fn unrelated_siblings_all_survive() {
        let root = Path::new("/r");
        let kept = dedupe_outermost(
            vec![PathBuf::from("/a/x"), PathBuf::from("/a/y"), PathBuf::from("/b")],
            root,
        );
        assert_eq!(kept.len(), 3);
    }

    #[tokio::test]
    async fn no_marker_means_no_probes() {
        let dir = tempfile::tempdir().unwrap();
        let dirs = discover_extra_writable_dirs(dir.path()).await;
        assert!(dirs.is_empty());
    }

    #[tokio::test]
    async fn marker_without_repository_yields_empty_set() {
        // A bare `.git` file that git cannot parse: every probe fails and
        // the failure is swallowed.
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join(".git"), "not a gitdir pointer\n")
            .await
            .unwrap();

        let dirs = discover_extra_writable_dirs(dir.path()).await;
        assert!(dirs.is_empty());
    }
}
