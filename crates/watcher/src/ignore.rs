//! Ignore pattern management for watched trees
//!
//! Supports multiple sources of ignore patterns:
//! 1. Built-in patterns (VCS metadata, editor temp files - always active)
//! 2. .settleignore patterns (optional, enabled by default)
//! 3. .gitignore patterns (optional, enabled by default)
//! 4. Config-based patterns (additional custom patterns)

use anyhow::{Context, Result};
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the watcher-specific ignore file
pub const SETTLEIGNORE_FILE: &str = ".settleignore";

/// Directories that are never interesting to watch
const BUILTIN_DIRS: &[&str] = &[".git", ".jj", ".hg", ".svn"];

/// Directories skipped anywhere in the tree
const BUILD_DIRS: &[&str] = &[
    "node_modules",
    "target",
    "__pycache__",
    ".venv",
    ".idea",
    ".vscode",
];

/// Ignore rule set for one watch root
///
/// Precedence, highest first: built-in, .settleignore, .gitignore, config patterns.
pub struct IgnoreRules {
    root: PathBuf,
    gitignore: Option<Gitignore>,
    settleignore: Option<Gitignore>,
    config: IgnoreConfig,
}

impl IgnoreRules {
    /// Load ignore rules for a watch root
    pub fn load(root: &Path, config: IgnoreConfig) -> Result<Self> {
        let mut rules = Self {
            root: root.to_path_buf(),
            gitignore: None,
            settleignore: None,
            config,
        };

        rules.reload_ignore_files()?;
        Ok(rules)
    }

    /// Re-read .gitignore/.settleignore from disk
    pub fn reload_ignore_files(&mut self) -> Result<()> {
        self.gitignore = if self.config.use_gitignore {
            self.build_matcher(".gitignore")?
        } else {
            None
        };

        self.settleignore = if self.config.use_settleignore {
            self.build_matcher(SETTLEIGNORE_FILE)?
        } else {
            None
        };

        Ok(())
    }

    fn build_matcher(&self, file_name: &str) -> Result<Option<Gitignore>> {
        let path = self.root.join(file_name);
        if !path.exists() {
            return Ok(None);
        }

        let mut builder = GitignoreBuilder::new(&self.root);
        if let Some(err) = builder.add(&path) {
            return Err(err).with_context(|| format!("Failed to read {}", path.display()));
        }
        let matcher = builder
            .build()
            .with_context(|| format!("Invalid patterns in {}", path.display()))?;
        Ok(Some(matcher))
    }

    /// Check if a path (relative to the root, or absolute under it) is ignored
    pub fn should_ignore(&self, path: &Path) -> bool {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        // Outside the root: not ours to judge
        if relative.as_os_str().is_empty() || relative.has_root() {
            return false;
        }

        if is_builtin_ignored(relative) {
            return true;
        }

        let is_dir = self.root.join(relative).is_dir();

        // .settleignore may whitelist what .gitignore ignores
        if let Some(ref settleignore) = self.settleignore {
            let matched = settleignore.matched_path_or_any_parents(relative, is_dir);
            if matched.is_ignore() {
                return true;
            }
            if matched.is_whitelist() {
                return false;
            }
        }

        if let Some(ref gitignore) = self.gitignore {
            if gitignore
                .matched_path_or_any_parents(relative, is_dir)
                .is_ignore()
            {
                return true;
            }
        }

        self.config
            .additional_patterns
            .iter()
            .any(|pattern| matches_simple_pattern(relative, pattern))
    }

    /// Get number of active ignore sources
    pub fn active_sources(&self) -> usize {
        let mut count = 1; // Built-in always active
        if self.gitignore.is_some() {
            count += 1;
        }
        if self.settleignore.is_some() {
            count += 1;
        }
        if !self.config.additional_patterns.is_empty() {
            count += 1;
        }
        count
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Built-in patterns, enforced regardless of configuration
fn is_builtin_ignored(path: &Path) -> bool {
    let in_dir = |names: &[&str]| {
        path.components()
            .any(|c| names.iter().any(|name| c.as_os_str() == *name))
    };

    if in_dir(BUILTIN_DIRS) || in_dir(BUILD_DIRS) {
        return true;
    }

    let filename = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    is_editor_temp(filename)
}

/// Editor swap/backup files and OS droppings
fn is_editor_temp(filename: &str) -> bool {
    // Vim swap files
    if [".swp", ".swo", ".swn", ".swx"]
        .iter()
        .any(|ext| filename.ends_with(ext))
    {
        return true;
    }

    // Vim/Emacs backups, Emacs auto-save and lock files
    if filename.ends_with('~')
        || (filename.starts_with('#') && filename.ends_with('#'))
        || filename.starts_with(".#")
    {
        return true;
    }

    // JetBrains safe-write temp files
    if filename.ends_with("___jb_tmp___") || filename.ends_with("___jb_old___") {
        return true;
    }

    matches!(filename, ".DS_Store" | "Thumbs.db" | "desktop.ini") || filename.starts_with("._")
}

/// `*` wildcard (one star) or plain substring match, for config patterns
fn matches_simple_pattern(path: &Path, pattern: &str) -> bool {
    let path_str = path.to_string_lossy();

    match pattern.split_once('*') {
        Some((prefix, suffix)) if !suffix.contains('*') => {
            let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
            let matches = |s: &str| s.len() >= prefix.len() + suffix.len()
                && s.starts_with(prefix)
                && s.ends_with(suffix);
            matches(&path_str) || matches(&name)
        }
        Some(_) => false,
        None => path_str.contains(pattern),
    }
}

/// Ignore configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IgnoreConfig {
    /// Use .gitignore patterns (default: true)
    #[serde(default = "default_true")]
    pub use_gitignore: bool,

    /// Use .settleignore patterns (default: true)
    #[serde(default = "default_true")]
    pub use_settleignore: bool,

    /// Additional patterns from config
    #[serde(default)]
    pub additional_patterns: Vec<String>,
}

impl Default for IgnoreConfig {
    fn default() -> Self {
        Self {
            use_gitignore: true,
            use_settleignore: true,
            additional_patterns: vec![],
        }
    }
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn no_files() -> IgnoreConfig {
        IgnoreConfig {
            use_gitignore: false,
            use_settleignore: false,
            additional_patterns: vec![],
        }
    }

    #[test]
    fn test_builtin_patterns_always_enforced() {
        let temp_dir = TempDir::new().unwrap();
        let rules = IgnoreRules::load(temp_dir.path(), IgnoreConfig::default()).unwrap();

        assert!(rules.should_ignore(Path::new(".git/objects/ab/cd")));
        assert!(rules.should_ignore(Path::new("src/.git/config")));
        assert!(rules.should_ignore(Path::new(".jj/op_store/data")));
        assert!(rules.should_ignore(Path::new("target/debug/app")));
        assert!(rules.should_ignore(Path::new("web/node_modules/pkg/index.js")));
        assert!(rules.should_ignore(Path::new("src/.main.rs.swp")));
        assert!(rules.should_ignore(Path::new("notes.txt~")));
        assert!(rules.should_ignore(Path::new("#draft.org#")));
        assert!(rules.should_ignore(Path::new(".DS_Store")));

        assert!(!rules.should_ignore(Path::new("src/main.rs")));
        assert!(!rules.should_ignore(Path::new("README.md")));
        assert!(!rules.should_ignore(Path::new("src/targeting.rs")));
    }

    #[test]
    fn test_absolute_paths_under_root() {
        let temp_dir = TempDir::new().unwrap();
        let rules = IgnoreRules::load(temp_dir.path(), no_files()).unwrap();

        assert!(rules.should_ignore(&temp_dir.path().join(".git/HEAD")));
        assert!(!rules.should_ignore(&temp_dir.path().join("src/lib.rs")));
    }

    #[test]
    fn test_gitignore_parsing() -> Result<()> {
        let temp_dir = TempDir::new()?;
        fs::write(temp_dir.path().join(".gitignore"), "*.log\ndist/\n*.tmp\n")?;
        fs::create_dir_all(temp_dir.path().join("dist"))?;

        let config = IgnoreConfig {
            use_settleignore: false,
            ..IgnoreConfig::default()
        };
        let rules = IgnoreRules::load(temp_dir.path(), config)?;

        assert!(rules.should_ignore(Path::new("test.log")));
        assert!(rules.should_ignore(Path::new("dist")));
        assert!(rules.should_ignore(Path::new("dist/bundle.js")));
        assert!(rules.should_ignore(Path::new("file.tmp")));
        assert!(!rules.should_ignore(Path::new("src/main.rs")));

        Ok(())
    }

    #[test]
    fn test_settleignore_overrides_gitignore() -> Result<()> {
        let temp_dir = TempDir::new()?;
        fs::write(temp_dir.path().join(".gitignore"), "*.log\n")?;
        fs::write(temp_dir.path().join(SETTLEIGNORE_FILE), "!important.log\n")?;

        let rules = IgnoreRules::load(temp_dir.path(), IgnoreConfig::default())?;

        assert!(rules.should_ignore(Path::new("debug.log")));
        assert!(!rules.should_ignore(Path::new("important.log")));
        assert_eq!(rules.active_sources(), 3);

        Ok(())
    }

    #[test]
    fn test_additional_patterns() {
        let temp_dir = TempDir::new().unwrap();
        let config = IgnoreConfig {
            additional_patterns: vec!["*.bak".to_string(), "build/".to_string()],
            ..no_files()
        };

        let rules = IgnoreRules::load(temp_dir.path(), config).unwrap();

        assert!(rules.should_ignore(Path::new("file.bak")));
        assert!(rules.should_ignore(Path::new("src/old.bak")));
        assert!(rules.should_ignore(Path::new("build/output.txt")));
        assert!(!rules.should_ignore(Path::new("src/main.rs")));
        assert_eq!(rules.active_sources(), 2);
    }

    #[test]
    fn test_gitignore_disabled() -> Result<()> {
        let temp_dir = TempDir::new()?;
        fs::write(temp_dir.path().join(".gitignore"), "*.log\n")?;

        let rules = IgnoreRules::load(temp_dir.path(), no_files())?;

        assert!(!rules.should_ignore(Path::new("test.log")));
        assert!(rules.should_ignore(Path::new(".git/index")));
        assert_eq!(rules.active_sources(), 1);

        Ok(())
    }

    #[test]
    fn test_reload_ignore_files() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config = IgnoreConfig {
            use_settleignore: false,
            ..IgnoreConfig::default()
        };

        let mut rules = IgnoreRules::load(temp_dir.path(), config)?;
        assert!(!rules.should_ignore(Path::new("test.log")));

        fs::write(temp_dir.path().join(".gitignore"), "*.log\n")?;
        rules.reload_ignore_files()?;

        assert!(rules.should_ignore(Path::new("test.log")));
        Ok(())
    }
}
