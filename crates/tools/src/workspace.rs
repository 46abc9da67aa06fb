//! Workspace sandbox: every file tool resolves its paths through here.
//!
//! Relative paths are joined to the workspace root. Absolute paths are
//! accepted only when they already point inside the root. `..` components
//! are resolved lexically and may not climb out of the root. The deepest
//! existing ancestor of the result is canonicalized and checked again, so a
//! symlink cannot lead outside the root even when the target does not exist
//! yet.
//!
//! Walking goes through `ignore`, honouring `.gitignore` files and never
//! following symlinks.

use codewright_core::error::ToolError;
use globset::{Glob, GlobBuilder, GlobMatcher, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};

/// Directories never descended into, ignored or not.
pub const SKIP_DIRS: &[&str] = &[".git", "node_modules", "target", "__pycache__", ".venv"];

/// Files larger than this are skipped by content search.
const MAX_SCAN_BYTES: u64 = 1024 * 1024;

#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Open a workspace rooted at `root`. The directory must exist.
    pub fn new(root: impl AsRef<Path>) -> std::io::Result<Self> {
        let root = root.as_ref().canonicalize()?;
        if !root.is_dir() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotADirectory,
                format!("workspace root {} is not a directory", root.display()),
            ));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a model-supplied path to an absolute path inside the root.
    pub fn resolve(&self, input: &str, tool_name: &str) -> Result<PathBuf, ToolError> {
        let denied = |reason: String| ToolError::PermissionDenied {
            tool_name: tool_name.to_string(),
            reason,
        };

        let raw = Path::new(input.trim());
        let joined = if raw.is_absolute() {
            raw.to_path_buf()
        } else {
            self.root.join(raw)
        };

        let mut normalized = PathBuf::new();
        for component in joined.components() {
            match component {
                Component::CurDir => {}
                Component::ParentDir => {
                    if !normalized.pop() {
                        return Err(denied(format!("'{input}' escapes the workspace")));
                    }
                }
                other => normalized.push(other.as_os_str()),
            }
        }

        if !normalized.starts_with(&self.root) {
            return Err(denied(format!("'{input}' is outside the workspace")));
        }

        // Split off the components that do not exist yet. A dangling
        // symlink counts as existing so it is canonicalized (and refused).
        let mut existing = normalized.as_path();
        let mut missing: Vec<OsString> = Vec::new();
        while std::fs::symlink_metadata(existing).is_err() {
            match (existing.parent(), existing.file_name()) {
                (Some(parent), Some(name)) => {
                    missing.push(name.to_os_string());
                    existing = parent;
                }
                _ => break,
            }
        }

        let canonical = existing
            .canonicalize()
            .map_err(|e| denied(format!("cannot resolve '{input}': {e}")))?;
        if !canonical.starts_with(&self.root) {
            return Err(denied(format!("'{input}' links outside the workspace")));
        }

        Ok(missing.iter().rev().fold(canonical, |path, name| path.join(name)))
    }

    /// Workspace-relative display form of an absolute path, with `/` separators.
    pub fn relative(&self, path: &Path) -> String {
        let rel = path.strip_prefix(&self.root).unwrap_or(path);
        let text = rel.to_string_lossy().replace('\\', "/");
        if text.is_empty() { ".".into() } else { text }
    }

    /// A walker over `dir` that honours ignore files and skips [`SKIP_DIRS`].
    fn walker(&self, dir: &Path) -> WalkBuilder {
        let mut builder = WalkBuilder::new(dir);
        builder
            .hidden(false)
            .follow_links(false)
            .parents(true)
            .git_ignore(true)
            .git_global(false)
            .git_exclude(true)
            .require_git(false)
            .filter_entry(|entry| {
                entry.depth() == 0
                    || !entry.file_type().is_some_and(|t| t.is_dir())
                    || !SKIP_DIRS.iter().any(|s| entry.file_name() == *s)
            });
        builder
    }

    /// All regular files below `dir`, sorted.
    pub fn walk_files(&self, dir: &Path) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = self
            .walker(dir)
            .build()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::debug!(error = %e, "Skipping unreadable entry");
                    None
                }
            })
            .filter(|entry| entry.file_type().is_some_and(|t| t.is_file()))
            .map(ignore::DirEntry::into_path)
            .collect();
        files.sort();
        files
    }

    /// The immediate children of `dir` that are not ignored, sorted.
    pub fn list_children(&self, dir: &Path) -> Vec<ignore::DirEntry> {
        let mut entries: Vec<ignore::DirEntry> = self
            .walker(dir)
            .max_depth(Some(1))
            .build()
            .filter_map(Result::ok)
            .filter(|entry| entry.depth() == 1)
            .collect();
        entries.sort_by(|a, b| a.file_name().cmp(b.file_name()));
        entries
    }
}

/// Read a file for content search. Large and binary files yield `None`.
pub(crate) fn read_searchable(path: &Path) -> Option<String> {
    let meta = std::fs::metadata(path).ok()?;
    if meta.len() > MAX_SCAN_BYTES {
        return None;
    }
    let bytes = std::fs::read(path).ok()?;
    if bytes.iter().take(512).any(|b| *b == 0) {
        return None;
    }
    Some(String::from_utf8_lossy(&bytes).into_owned())
}

/// Compile a glob over `/`-separated paths. `*` and `?` stop at `/`, `**` does not.
pub(crate) fn compile_glob(pattern: &str) -> Result<GlobMatcher, globset::Error> {
    Ok(path_glob(pattern)?.compile_matcher())
}

/// Compile several globs into one set.
pub(crate) fn compile_glob_set<'a>(
    patterns: impl IntoIterator<Item = &'a str>,
) -> Result<GlobSet, globset::Error> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(path_glob(pattern)?);
    }
    builder.build()
}

fn path_glob(pattern: &str) -> Result<Glob, globset::Error> {
    GlobBuilder::new(&pattern.replace('\\', "/"))
        .literal_separator(true)
        .build()
}
