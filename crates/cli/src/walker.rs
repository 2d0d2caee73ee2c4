// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Source file discovery.
//!
//! Walks the target tree collecting TypeScript/TSX files, pruning excluded
//! directories at the walker level so no I/O happens on skipped subtrees.
//! Output is sorted so the work set is stable across runs over an
//! unchanged tree.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use aho_corasick::AhoCorasick;
use ignore::WalkBuilder;

use crate::config::AnalysisConfig;
use crate::error::{Error, Result};

/// File suffixes the analyzer accepts.
pub const SOURCE_SUFFIXES: &[&str] = &[".ts", ".tsx"];

/// Directories to skip entirely during walking.
/// These are pruned during traversal, not filtered after discovery.
pub const SKIP_DIRECTORIES: &[&str] =
    &["node_modules", "bower_components", "dist", "build", "coverage"];

/// Helper to check if an ignore::Error is a permission error.
fn is_permission_error(err: &ignore::Error) -> bool {
    match err {
        ignore::Error::Io(io) => io.kind() == std::io::ErrorKind::PermissionDenied,
        ignore::Error::WithPath { err, .. } => is_permission_error(err),
        ignore::Error::WithDepth { err, .. } => is_permission_error(err),
        ignore::Error::WithLineNumber { err, .. } => is_permission_error(err),
        _ => false,
    }
}

/// Whether a basename names an analyzable source file.
fn is_source_file(name: &str) -> bool {
    if name.ends_with(".d.ts") {
        return false;
    }
    SOURCE_SUFFIXES.iter().any(|suffix| name.ends_with(suffix))
}

/// Compiled exclusion predicates shared with the walker's filter.
struct ExcludeMatcher {
    /// Substring matcher over path segments (None when no patterns).
    patterns: Option<AhoCorasick>,
    suffixes: Vec<String>,
}

impl ExcludeMatcher {
    fn new(patterns: &[String], suffixes: &[String]) -> Result<Self> {
        let matcher = if patterns.is_empty() {
            None
        } else {
            Some(
                AhoCorasick::new(patterns)
                    .map_err(|e| Error::Argument(format!("bad exclude pattern: {e}")))?,
            )
        };
        Ok(Self {
            patterns: matcher,
            suffixes: suffixes.to_vec(),
        })
    }

    /// A single path segment contains one of the exclude substrings.
    fn segment_matches(&self, segment: &str) -> bool {
        self.patterns
            .as_ref()
            .is_some_and(|m| m.is_match(segment))
    }

    /// Any segment of the absolute path matches an exclude substring.
    fn path_excluded(&self, path: &Path) -> bool {
        if self.patterns.is_none() {
            return false;
        }
        path.iter()
            .filter_map(|segment| segment.to_str())
            .any(|segment| self.segment_matches(segment))
    }

    /// The basename ends with one of the excluded suffixes.
    fn suffix_excluded(&self, name: &str) -> bool {
        self.suffixes.iter().any(|suffix| name.ends_with(suffix))
    }
}

/// Source tree walker with config-driven exclusion.
pub struct SourceWalker {
    follow_symlinks: bool,
    matcher: Arc<ExcludeMatcher>,
}

impl SourceWalker {
    /// Create a walker from explicit exclusion lists.
    pub fn new(
        follow_symlinks: bool,
        exclude_patterns: &[String],
        exclude_suffixes: &[String],
    ) -> Result<Self> {
        Ok(Self {
            follow_symlinks,
            matcher: Arc::new(ExcludeMatcher::new(exclude_patterns, exclude_suffixes)?),
        })
    }

    /// Create a walker from the analysis config section.
    pub fn from_config(analysis: &AnalysisConfig) -> Result<Self> {
        Self::new(
            analysis.follow_symlinks,
            &analysis.exclude_patterns,
            &analysis.exclude_suffixes,
        )
    }

    /// Walk `root` and return the sorted set of analyzable files.
    ///
    /// Paths are absolute and canonical; symlinked files are recorded under
    /// their resolved path and must resolve inside `root`. Permission
    /// failures on subtrees are logged and skipped; a missing root is a
    /// hard failure.
    pub fn find_source_files(&self, root: &Path) -> Result<Vec<PathBuf>> {
        let root = root.canonicalize().map_err(|_| Error::Config {
            message: format!("target directory does not exist: {}", root.display()),
            path: None,
        })?;
        if !root.is_dir() {
            return Err(Error::Config {
                message: format!("target is not a directory: {}", root.display()),
                path: None,
            });
        }

        let mut builder = WalkBuilder::new(&root);
        builder
            .standard_filters(false)
            .follow_links(self.follow_symlinks);

        // Prune excluded directories (and hidden entries) at the walker
        // level so their subtrees never get read.
        let matcher = Arc::clone(&self.matcher);
        builder.filter_entry(move |entry| {
            if entry.depth() == 0 {
                return true;
            }
            let Some(name) = entry.file_name().to_str() else {
                return false;
            };
            if name.starts_with('.') {
                return false;
            }
            let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
            if is_dir && SKIP_DIRECTORIES.contains(&name) {
                return false;
            }
            !matcher.segment_matches(name)
        });

        let mut files = Vec::new();
        let mut seen: HashSet<PathBuf> = HashSet::new();

        for result in builder.build() {
            let entry = match result {
                Ok(entry) => entry,
                Err(err) => {
                    if is_permission_error(&err) {
                        tracing::warn!("permission denied, skipping: {err}");
                    } else {
                        tracing::warn!("walk error: {err}");
                    }
                    continue;
                }
            };

            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }
            let Some(name) = entry.file_name().to_str() else {
                continue;
            };
            if !is_source_file(name) || self.matcher.suffix_excluded(name) {
                continue;
            }
            let path = entry.path();
            if self.matcher.path_excluded(path) {
                continue;
            }

            let resolved = if self.follow_symlinks {
                // Resolve every path: a file reached directly or through a
                // symlinked directory must still land inside the root.
                // The resolved-identity set below also breaks link cycles.
                let Ok(resolved) = path.canonicalize() else {
                    tracing::warn!("dangling symlink, skipping: {}", path.display());
                    continue;
                };
                if !resolved.starts_with(&root) {
                    tracing::debug!(
                        "path resolves outside root, skipping: {}",
                        path.display()
                    );
                    continue;
                }
                resolved
            } else {
                // Symlinked files surface as symlink entries here and were
                // already dropped by the is_file check above.
                path.to_path_buf()
            };

            if seen.insert(resolved.clone()) {
                files.push(resolved);
            }
        }

        files.sort();
        tracing::debug!("found {} source files under {}", files.len(), root.display());
        Ok(files)
    }
}

#[cfg(test)]
#[path = "walker_tests.rs"]
mod tests;
