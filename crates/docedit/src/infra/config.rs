//! Configuration management utilities.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use dirs_next::config_dir;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::infra::command::split_command_line;

static DEFAULT_CONFIG: Lazy<&'static str> =
    Lazy::new(|| include_str!("../../assets/default-config.toml"));
static DEFAULT_WORKSPACE_CONFIG_PATH: &str = ".docedit/config.toml";
const AUTO_TEMPLATE: &str = "auto";

/// Layered configuration loaded from defaults, user, workspace, and env.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub editor: Editor,
    #[serde(default)]
    pub edit: Edit,
    #[serde(default)]
    pub diff: Diff,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Editor {
    #[serde(default = "Editor::default_history_limit")]
    pub history_limit: usize,
    #[serde(default = "Editor::default_anchor_window")]
    pub anchor_window: usize,
    #[serde(default = "Editor::default_min_anchor_word_len")]
    pub min_anchor_word_len: usize,
}

impl Editor {
    fn default_history_limit() -> usize {
        50
    }

    fn default_anchor_window() -> usize {
        100
    }

    fn default_min_anchor_word_len() -> usize {
        3
    }
}

impl Default for Editor {
    fn default() -> Self {
        Self {
            history_limit: Self::default_history_limit(),
            anchor_window: Self::default_anchor_window(),
            min_anchor_word_len: Self::default_min_anchor_word_len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Edit {
    #[serde(default)]
    command: Option<Vec<String>>,
    #[serde(default)]
    template: Option<String>,
}

impl Edit {
    /// Program and arguments of the external edit command, if configured.
    pub fn command(&self) -> Option<&[String]> {
        self.command
            .as_deref()
            .filter(|command| !command.is_empty())
    }

    /// Explicit prompt template; `None` selects the built-in one for the request scope.
    pub fn template(&self) -> Option<&str> {
        self.template
            .as_deref()
            .filter(|name| !name.is_empty() && *name != AUTO_TEMPLATE)
    }

    pub fn set_command(&mut self, command: Vec<String>) {
        self.command = Some(command);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diff {
    #[serde(default = "Diff::default_context_lines")]
    pub context_lines: usize,
}

impl Diff {
    fn default_context_lines() -> usize {
        3
    }
}

impl Default for Diff {
    fn default() -> Self {
        Self {
            context_lines: Self::default_context_lines(),
        }
    }
}

/// Environment overrides for critical settings.
#[derive(Debug, Default, Clone)]
pub struct EnvOverrides {
    edit_command: Option<String>,
    history_limit: Option<String>,
}

impl EnvOverrides {
    fn from_env() -> Self {
        Self {
            edit_command: env::var("DOCEDIT_EDIT_COMMAND").ok(),
            history_limit: env::var("DOCEDIT_HISTORY_LIMIT").ok(),
        }
    }

    #[cfg(test)]
    fn for_tests(edit_command: &str, history_limit: &str) -> Self {
        Self {
            edit_command: Some(edit_command.to_owned()),
            history_limit: Some(history_limit.to_owned()),
        }
    }
}

impl Config {
    /// Load configuration from defaults, user/global config, the config of the workspace at
    /// `root`, and env overrides.
    pub fn load(root: &Path) -> Result<Self> {
        let env = EnvOverrides::from_env();
        let global = global_config_path();
        let workspace = workspace_config_path(root);
        Self::load_with_layers(global, workspace, env)
    }

    /// Later layers override earlier ones key by key, so any layer may set a value,
    /// including back to its built-in default.
    fn load_with_layers(
        global: Option<PathBuf>,
        workspace: Option<PathBuf>,
        env_overrides: EnvOverrides,
    ) -> Result<Self> {
        let mut merged = parse_layer(&DEFAULT_CONFIG)?;

        for path in [global, workspace].into_iter().flatten() {
            if path.exists() {
                merge_tables(&mut merged, read_layer(&path)?);
            }
        }

        let config: Config = toml::Value::Table(merged)
            .try_into()
            .context("invalid configuration values")?;
        apply_env_overrides(config, env_overrides)
    }
}

fn read_layer(path: &Path) -> Result<toml::Table> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;
    parse_layer(&data).with_context(|| format!("invalid config file: {}", path.display()))
}

fn parse_layer(contents: &str) -> Result<toml::Table> {
    toml::from_str(contents).with_context(|| "failed to parse TOML config".to_string())
}

fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(nested)) => {
                merge_tables(existing, nested)
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

fn global_config_path() -> Option<PathBuf> {
    config_dir().map(|base| base.join("docedit/config.toml"))
}

/// The workspace's own `.docedit/config.toml`, falling back to the enclosing repository's.
fn workspace_config_path(root: &Path) -> Option<PathBuf> {
    let local = root.join(DEFAULT_WORKSPACE_CONFIG_PATH);
    if local.exists() {
        return Some(local);
    }
    find_repo_root(root).map(|repo| repo.join(DEFAULT_WORKSPACE_CONFIG_PATH))
}

fn find_repo_root(start: &Path) -> Option<PathBuf> {
    let mut current = start;
    loop {
        if current.join(".git").exists() {
            return Some(current.to_path_buf());
        }
        match current.parent() {
            Some(parent) => current = parent,
            None => return None,
        }
    }
}

fn apply_env_overrides(mut config: Config, env: EnvOverrides) -> Result<Config> {
    if let Some(command) = env.edit_command.filter(|value| !value.trim().is_empty()) {
        let parts = split_command_line(&command)
            .with_context(|| "invalid DOCEDIT_EDIT_COMMAND".to_string())?;
        config.edit.set_command(parts);
    }
    if let Some(limit) = env.history_limit {
        match limit.trim().parse::<usize>() {
            Ok(value) if value > 0 => config.editor.history_limit = value,
            _ => tracing::warn!(value = %limit, "ignoring invalid DOCEDIT_HISTORY_LIMIT"),
        }
    }
    Ok(config)
}
