//! Path expansion, resolution, and boundary membership.
//!
//! Requested paths arrive in whatever shape an upstream producer emitted:
//! relative, `~`-prefixed, or carrying the `@` sentinel some producers use
//! to mark file paths. Everything funnels through the same pipeline before
//! a boundary decision is made: expand, resolve against the working
//! directory, then canonicalize. For targets that do not exist yet the
//! canonicalizer walks up to the nearest existing ancestor, resolves that,
//! and folds the remaining suffix back on lexically - the existing prefix
//! is symlink-resolved while the decision stays deterministic for files
//! still to be created.

use std::path::{Component, Path, PathBuf};

/// Strip a leading `@` sentinel and expand a leading `~` or `~/` to the
/// user's home directory. Anything else passes through unchanged.
pub fn expand_user_path(raw: &str) -> String {
    let raw = raw.strip_prefix('@').unwrap_or(raw);

    if raw == "~" {
        if let Some(home) = dirs::home_dir() {
            return home.to_string_lossy().into_owned();
        }
    } else if let Some(rest) = raw.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest).to_string_lossy().into_owned();
        }
    }

    raw.to_string()
}

/// Resolve a raw request to an absolute (not yet canonical) path.
///
/// An empty request resolves to `cwd` itself.
pub fn resolve_request(raw: &str, cwd: &Path) -> PathBuf {
    let expanded = expand_user_path(raw);
    let path = PathBuf::from(expanded);

    if path.as_os_str().is_empty() {
        cwd.to_path_buf()
    } else if path.is_absolute() {
        path
    } else {
        cwd.join(path)
    }
}

/// Fold `.` and `..` components of `suffix` onto `base` lexically.
///
/// Only ever applied to a suffix whose components do not exist on disk, so
/// there are no symlinks for `..` to interact with.
fn fold_suffix(mut base: PathBuf, suffix: &Path) -> PathBuf {
    for component in suffix.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                base.pop();
            }
            Component::Normal(part) => base.push(part),
            Component::RootDir | Component::Prefix(_) => {}
        }
    }
    base
}

/// Lexical normalization of a whole path, for when nothing along the
/// ancestor chain could be resolved (permission errors and the like).
fn lexical_normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(prefix) => out.push(prefix.as_os_str()),
            Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            Component::Normal(part) => out.push(part),
        }
    }
    out
}

/// Canonicalize `path`, tolerating targets that do not exist yet.
///
/// If the full path resolves, symlinks are resolved throughout. Otherwise
/// the nearest existing ancestor is canonicalized and the non-existent
/// suffix is folded back on. Never fails: an unresolvable chain falls back
/// to the lexically normalized absolute form.
pub async fn canonicalize_lenient(path: &Path) -> PathBuf {
    if let Ok(resolved) = tokio::fs::canonicalize(path).await {
        return resolved;
    }

    for ancestor in path.ancestors().skip(1) {
        if ancestor.as_os_str().is_empty() {
            break;
        }
        if let Ok(base) = tokio::fs::canonicalize(ancestor).await {
            // strip_prefix cannot fail: `ancestor` came from `path.ancestors()`
            let suffix = path.strip_prefix(ancestor).unwrap_or(path);
            return fold_suffix(base, suffix);
        }
    }

    lexical_normalize(path)
}

/// Component-wise boundary membership: `path` equals `boundary` or lies
/// beneath it. Both sides must already be canonical absolute paths.
///
/// `Path::starts_with` compares whole components, so `/home/u/project2`
/// is not inside `/home/u/project`, and paths rooted elsewhere (other
/// volumes included) never share a component prefix and are rejected.
pub fn is_inside(path: &Path, boundary: &Path) -> bool {
    path.starts_with(boundary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_sentinel_and_expands_tilde() {
        let home = dirs::home_dir().expect("test environment has a home dir");

        assert_eq!(expand_user_path("~"), home.to_string_lossy());
        assert_eq!(
            expand_user_path("~/notes.txt"),
            home.join("notes.txt").to_string_lossy()
        );
        assert_eq!(expand_user_path("@src/lib.rs"), "src/lib.rs");
        // Sentinel and tilde compose: both forms resolve identically.
        assert_eq!(
            expand_user_path("@~/../../etc/passwd"),
            expand_user_path("~/../../etc/passwd")
        );
    }

    #[test]
    fn tilde_only_expands_as_prefix() {
        assert_eq!(expand_user_path("a~b"), "a~b");
        assert_eq!(expand_user_path("~user/x"), "~user/x");
    }

    #[test]
    fn resolves_relative_against_cwd() {
        let cwd = Path::new("/work/project");
        assert_eq!(
            resolve_request("src/lib.rs", cwd),
            PathBuf::from("/work/project/src/lib.rs")
        );
        assert_eq!(resolve_request("/abs/x", cwd), PathBuf::from("/abs/x"));
        assert_eq!(resolve_request("", cwd), PathBuf::from("/work/project"));
    }

    #[tokio::test]
    async fn canonicalize_resolves_existing_paths() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("present.txt");
        tokio::fs::write(&file, "x").await.unwrap();

        let resolved = canonicalize_lenient(&file).await;
        assert_eq!(resolved, file.canonicalize().unwrap());
    }

    #[tokio::test]
    async fn canonicalize_walks_up_for_missing_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("newdir/sub/newfile.txt");

        let resolved = canonicalize_lenient(&target).await;
        assert_eq!(
            resolved,
            dir.path().canonicalize().unwrap().join("newdir/sub/newfile.txt")
        );
    }

    #[tokio::test]
    async fn canonicalize_folds_parent_traversal_in_missing_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let canonical = dir.path().canonicalize().unwrap();

        // `missing` does not exist, so `..` segments past it are lexical.
        let sneaky = dir.path().join("missing/../../etc/passwd");
        let resolved = canonicalize_lenient(&sneaky).await;

        assert!(!resolved.starts_with(&canonical));
        assert_eq!(resolved, canonical.parent().unwrap().join("etc/passwd"));
    }

    #[tokio::test]
    async fn canonicalize_resolves_traversal_through_existing_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let inner = dir.path().join("inner");
        tokio::fs::create_dir(&inner).await.unwrap();

        let back_out = inner.join("../inner/file.txt");
        let resolved = canonicalize_lenient(&back_out).await;
        assert_eq!(
            resolved,
            dir.path().canonicalize().unwrap().join("inner/file.txt")
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn canonicalize_follows_symlinks_out() {
        use std::os::unix::fs::symlink;

        let outside = tempfile::tempdir().unwrap();
        let inside = tempfile::tempdir().unwrap();
        let secret = outside.path().join("secret.txt");
        tokio::fs::write(&secret, "s").await.unwrap();

        let link = inside.path().join("link");
        symlink(&secret, &link).unwrap();

        let resolved = canonicalize_lenient(&link).await;
        assert_eq!(resolved, secret.canonicalize().unwrap());
        assert!(!resolved.starts_with(inside.path().canonicalize().unwrap()));
    }

    #[test]
    fn membership_is_component_wise() {
        let root = Path::new("/home/u/project");
        assert!(is_inside(root, root));
        assert!(is_inside(Path::new("/home/u/project/src/lib.rs"), root));
        assert!(!is_inside(Path::new("/home/u/project2"), root));
        assert!(!is_inside(Path::new("/home/u"), root));
        assert!(!is_inside(Path::new("/etc/passwd"), root));
    }

    #[test]
    fn lexical_normalize_is_root_bounded() {
        assert_eq!(
            lexical_normalize(Path::new("/a/b/../c/./d")),
            PathBuf::from("/a/c/d")
        );
        assert_eq!(
            lexical_normalize(Path::new("/../../etc")),
            PathBuf::from("/etc")
        );
    }
}
