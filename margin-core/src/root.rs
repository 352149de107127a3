//! Workspace root discovery and boundary path resolution.

use std::path::{Component, Path, PathBuf};

use crate::types::FileUri;

/// Picks the workspace root.
///
/// Order: explicit override, then the work tree of the git repository that
/// contains `cwd`, then `cwd` itself.
pub fn discover_root(explicit: Option<&Path>, cwd: &Path) -> PathBuf {
    if let Some(root) = explicit {
        return absolutize(cwd, root);
    }
    match git2::Repository::discover(cwd) {
        Ok(repo) => match repo.workdir() {
            Some(dir) => normalize(dir),
            None => cwd.to_path_buf(),
        },
        Err(e) => {
            tracing::debug!(error = %e, "not inside a git work tree; using cwd as root");
            cwd.to_path_buf()
        }
    }
}

/// Turns file paths given by callers into [`FileUri`]s.
#[derive(Debug, Clone)]
pub struct PathResolver {
    root: PathBuf,
}

impl PathResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves `raw` (absolute, or relative to the root) to a file identifier.
    pub fn resolve(&self, raw: &str) -> Option<FileUri> {
        FileUri::from_path(&absolutize(&self.root, Path::new(raw)))
    }

    /// Shortest readable form of `file`: root-relative when possible.
    pub fn display(&self, file: &FileUri) -> String {
        match file.to_file_path() {
            Some(path) => match path.strip_prefix(&self.root) {
                Ok(rel) => rel.display().to_string(),
                Err(_) => path.display().to_string(),
            },
            None => file.to_string(),
        }
    }
}

fn absolutize(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        normalize(path)
    } else {
        normalize(&base.join(path))
    }
}

/// Lexically removes `.` and `..` so `a/../b.rs` and `b.rs` name one file.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn relative_and_absolute_paths_meet() {
        let resolver = PathResolver::new("/work");
        let rel = resolver.resolve("src/../a.ts").unwrap();
        let abs = resolver.resolve("/work/a.ts").unwrap();
        assert_eq!(rel, abs);
        assert_eq!(rel.as_str(), "file:///work/a.ts");
        assert_eq!(resolver.display(&rel), "a.ts");
    }

    #[test]
    fn display_outside_root_is_absolute() {
        let resolver = PathResolver::new("/work");
        let other = resolver.resolve("/elsewhere/b.rs").unwrap();
        assert_eq!(resolver.display(&other), "/elsewhere/b.rs");
    }

    #[test]
    fn explicit_root_wins() {
        let root = discover_root(Some(Path::new("proj")), Path::new("/home/u"));
        assert_eq!(root, PathBuf::from("/home/u/proj"));
    }
}
