//! User configuration shared by the terminal UI and the MCP server.
//!
//! Read from `$XDG_CONFIG_HOME/margin/config.toml`, falling back to
//! `~/.config/margin/config.toml`. Every key is optional.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::Result;

/// Author name used when a caller does not supply one.
pub const DEFAULT_AUTHOR: &str = "User";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Terminal UI theme name (`dark` or `catppuccin-mocha`).
    pub theme: String,
    /// Author recorded on comments written from the terminal UI, and the
    /// fallback for tool calls without a `username`.
    pub author: String,
    /// Database file. Relative paths are taken from the workspace root.
    pub database: Option<PathBuf>,
    /// Workspace root override.
    pub root: Option<PathBuf>,
    /// `tracing` filter directive used when `MARGIN_LOG` is unset.
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            theme: "catppuccin-mocha".to_owned(),
            author: DEFAULT_AUTHOR.to_owned(),
            database: None,
            root: None,
            log_filter: "info".to_owned(),
        }
    }
}

impl Config {
    pub fn parse(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Loads the config file.
    ///
    /// A missing file yields defaults. An unreadable or invalid file also
    /// yields defaults, and the problem is returned alongside so the caller
    /// can report it once logging is up.
    pub fn load() -> (Self, Option<String>) {
        let path = config_path();
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> (Self, Option<String>) {
        let raw = match std::fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return (Self::default(), None),
            Err(e) => {
                return (Self::default(), Some(format!("cannot read {}: {e}", path.display())));
            }
        };
        match Self::parse(&raw) {
            Ok(config) => (config, None),
            Err(e) => (Self::default(), Some(format!("config parse error in {}: {e}", path.display()))),
        }
    }

    /// Database location for a workspace rooted at `root`.
    pub fn database_path(&self, root: &Path) -> PathBuf {
        match &self.database {
            Some(p) if p.is_absolute() => p.clone(),
            Some(p) => root.join(p),
            None => root.join(".margin").join("comments.db"),
        }
    }
}

/// Returns the path to the config file.
///
/// Prefers `$XDG_CONFIG_HOME/margin/config.toml`; falls back to
/// `~/.config/margin/config.toml` when the env var is absent.
pub fn config_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .ok()
        .map(PathBuf::from)
        .or_else(|| {
            std::env::var("HOME")
                .ok()
                .map(|h| PathBuf::from(h).join(".config"))
        })
        .unwrap_or_else(|| PathBuf::from(".config"));
    base.join("margin").join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        assert_eq!(Config::parse("").unwrap(), Config::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config = Config::parse("author = \"alice\"\ndatabase = \"notes.db\"\n").unwrap();
        assert_eq!(config.author, "alice");
        assert_eq!(config.theme, "catppuccin-mocha");
        assert_eq!(config.database_path(Path::new("/work")), PathBuf::from("/work/notes.db"));
    }

    #[test]
    fn default_database_lives_under_root() {
        let config = Config::default();
        assert_eq!(
            config.database_path(Path::new("/work")),
            PathBuf::from("/work/.margin/comments.db")
        );
    }

    #[test]
    fn invalid_file_falls_back_with_message() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "theme = [").unwrap();

        let (config, problem) = Config::load_from(&path);
        assert_eq!(config, Config::default());
        assert!(problem.unwrap().contains("config parse error"));
    }

    #[test]
    fn missing_file_is_silent() {
        let dir = tempfile::TempDir::new().unwrap();
        let (config, problem) = Config::load_from(&dir.path().join("absent.toml"));
        assert_eq!(config, Config::default());
        assert!(problem.is_none());
    }
}
