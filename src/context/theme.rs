//! Theme preference
//!
//! Light/dark choice persisted to a small TOML file.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::model::ParseError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Theme::Light => f.write_str("light"),
            Theme::Dark => f.write_str("dark"),
        }
    }
}

impl FromStr for Theme {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            other => Err(ParseError::UnknownTheme(other.to_string())),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ThemeError {
    #[error("Failed to access preferences {path:?}: {error}")]
    Io { path: PathBuf, error: std::io::Error },

    #[error("Invalid preferences file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },

    #[error("Failed to encode preferences: {0}")]
    Encode(#[from] toml::ser::Error),
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Preferences {
    #[serde(default)]
    theme: Theme,
}

/// File-backed theme store
#[derive(Debug, Clone)]
pub struct ThemeStore {
    path: PathBuf,
}

impl ThemeStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stored theme; light when nothing was saved yet
    pub fn load(&self) -> Result<Theme, ThemeError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Theme::default()),
            Err(error) => {
                return Err(ThemeError::Io {
                    path: self.path.clone(),
                    error,
                })
            }
        };

        let prefs: Preferences = toml::from_str(&content).map_err(|e| ThemeError::Parse {
            path: self.path.clone(),
            error: e.to_string(),
        })?;
        Ok(prefs.theme)
    }

    pub fn save(&self, theme: Theme) -> Result<(), ThemeError> {
        let io_err = |error| ThemeError::Io {
            path: self.path.clone(),
            error,
        };

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let content = toml::to_string(&Preferences { theme })?;
        std::fs::write(&self.path, content).map_err(io_err)?;

        tracing::debug!(%theme, path = %self.path.display(), "Saved theme");
        Ok(())
    }

    /// Flip and persist; returns the new theme
    pub fn toggle(&self) -> Result<Theme, ThemeError> {
        let theme = self.load()?.toggled();
        self.save(theme)?;
        Ok(theme)
    }
}
