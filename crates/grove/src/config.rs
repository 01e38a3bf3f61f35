//! Configuration for the grove CLI.
//!
//! Settings are resolved with the following priority (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (`GROVE_GIT`, `GROVE_REMOTE`, `NO_COLOR`)
//! 3. Config file (`GROVE_CONFIG`, or `~/.config/grove/config.toml`)
//! 4. Default values

use std::{
    env, fs,
    io::{self, IsTerminal},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::args::Cli;

/// Environment variable naming an explicit config file.
const CONFIG_ENV: &str = "GROVE_CONFIG";

/// When to emit colored output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    /// Color when stdout is a terminal.
    #[default]
    Auto,
    /// Always color.
    Always,
    /// Never color.
    Never,
}

/// Resolved CLI settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Git executable to run.
    pub git: PathBuf,
    /// Remote name used for clones.
    pub remote: String,
    /// Color preference.
    pub color: ColorMode,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            git: PathBuf::from("git"),
            remote: "origin".to_string(),
            color: ColorMode::Auto,
        }
    }
}

impl Config {
    /// Load the config file, falling back to defaults when none exists.
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) if path.exists() => Self::load_from_file(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Parse the config file at `path`.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Config file location: `GROVE_CONFIG` if set, else the platform config dir.
    pub fn config_path() -> Option<PathBuf> {
        env::var_os(CONFIG_ENV)
            .filter(|p| !p.is_empty())
            .map(PathBuf::from)
            .or_else(|| dirs::config_dir().map(|p| p.join("grove").join("config.toml")))
    }

    /// Apply environment overrides read through `var`.
    pub fn with_env_overrides(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(git) = var("GROVE_GIT").filter(|v| !v.is_empty()) {
            self.git = PathBuf::from(git);
        }
        if let Some(remote) = var("GROVE_REMOTE").filter(|v| !v.is_empty()) {
            self.remote = remote;
        }
        if var("NO_COLOR").is_some_and(|v| !v.is_empty()) {
            self.color = ColorMode::Never;
        }
        self
    }

    /// Apply CLI flag overrides.
    pub fn with_cli_overrides(mut self, cli: &Cli) -> Self {
        if let Some(git) = &cli.git {
            self.git = git.clone();
        }
        if cli.color {
            self.color = ColorMode::Always;
        } else if cli.no_color {
            self.color = ColorMode::Never;
        }
        self
    }

    /// Load configuration with all overrides applied.
    pub fn load_with_overrides(cli: &Cli) -> Result<Self> {
        Ok(Self::load()?
            .with_env_overrides(|name| env::var(name).ok())
            .with_cli_overrides(cli))
    }

    /// Whether output should be colored.
    pub fn use_color(&self) -> bool {
        match self.color {
            ColorMode::Always => true,
            ColorMode::Never => false,
            ColorMode::Auto => io::stdout().is_terminal(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use clap::Parser;
    use tempfile::TempDir;

    use super::*;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.git, PathBuf::from("git"));
        assert_eq!(config.remote, "origin");
        assert_eq!(config.color, ColorMode::Auto);
    }

    #[test]
    fn parses_partial_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "remote = \"upstream\"\ncolor = \"never\"\n").unwrap();

        let config = Config::load_from_file(&path).unwrap();
        assert_eq!(config.remote, "upstream");
        assert_eq!(config.color, ColorMode::Never);
        assert_eq!(config.git, PathBuf::from("git"));
    }

    #[test]
    fn malformed_file_names_the_path() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "remote = [").unwrap();

        let err = Config::load_from_file(&path).unwrap_err();
        assert!(format!("{err:#}").contains("config.toml"));

        fs::write(&path, "colour = \"never\"\n").unwrap();
        assert!(Config::load_from_file(&path).is_err());
    }

    #[test]
    fn env_overrides_file_and_cli_overrides_env() {
        let file = Config {
            git: PathBuf::from("/usr/bin/git"),
            remote: "upstream".to_string(),
            color: ColorMode::Always,
        };

        let config = file.with_env_overrides(env_from(&[
            ("GROVE_GIT", "/opt/git"),
            ("GROVE_REMOTE", "mirror"),
            ("NO_COLOR", "1"),
        ]));
        assert_eq!(config.git, PathBuf::from("/opt/git"));
        assert_eq!(config.remote, "mirror");
        assert_eq!(config.color, ColorMode::Never);
        assert!(!config.use_color());

        let cli = Cli::parse_from(["grove", "--color", "--git", "/cli/git", "init"]);
        let config = config.with_cli_overrides(&cli);
        assert_eq!(config.git, PathBuf::from("/cli/git"));
        assert_eq!(config.color, ColorMode::Always);
        assert!(config.use_color());
    }

    #[test]
    fn empty_env_values_are_ignored() {
        let config =
            Config::default().with_env_overrides(env_from(&[("GROVE_REMOTE", ""), ("NO_COLOR", "")]));
        assert_eq!(config, Config::default());
    }
}
