//! Persistent configuration.
//!
//! Layering (later wins): config file -> VSX_* environment -> command flags.
//! The file is JSON unless its path ends in `.yaml` / `.yml`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::argv::Command;
use crate::cmd::flag;

pub const APP_DIR: &str = "vsx";
pub const CONFIG_FILE_NAME: &str = "vsx.json";
pub const HISTORY_FILE_NAME: &str = ".history";
pub const DEFAULT_GALLERY_SCHEME: &str = "https";

pub const ENV_GALLERY_HOST: &str = "VSX_GALLERY_HOST";
pub const ENV_GALLERY_SCHEME: &str = "VSX_GALLERY_SCHEME";
pub const ENV_EXTENSION_DIR: &str = "VSX_EXTENSION_DIR";
pub const ENV_OS: &str = "VSX_OS";
pub const ENV_ARCH: &str = "VSX_ARCH";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// `.vscode/extensions` (or `.vscode-oss/extensions`) used by `install`
    #[serde(rename = "extensions_dir", skip_serializing_if = "Option::is_none")]
    pub extension_dir: Option<PathBuf>,

    /// URI scheme for gallery requests (`http` or `https`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gallery_scheme: Option<String>,

    /// Gallery hostname, optionally with a path prefix
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gallery_host: Option<String>,

    /// Target platform OS (`linux`, `darwin`, `win32`, ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub os: Option<String>,

    /// Target platform architecture (`x64`, `arm64`, ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arch: Option<String>,

    /// REPL history file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hist_file_path: Option<PathBuf>,
}

/// `<user config dir>/vsx`
pub fn config_root() -> Result<PathBuf> {
    let dir = dirs::config_dir().context("failed to identify the user config dir")?;
    Ok(dir.join(APP_DIR))
}

pub fn default_config_path() -> Result<PathBuf> {
    Ok(config_root()?.join(CONFIG_FILE_NAME))
}

fn is_yaml(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"))
        .unwrap_or(false)
}

/// Non-empty, trimmed value.
fn non_empty(v: &str) -> Option<String> {
    let v = v.trim();
    (!v.is_empty()).then(|| v.to_string())
}

impl Config {
    /// Read `path`. A missing file yields an empty config.
    pub fn load_file(path: &Path) -> Result<Self> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no config file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(e).with_context(|| format!("failed to open config file [{}]", path.display()));
            }
        };
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }

        let cfg = if is_yaml(path) {
            serde_yaml::from_str(&raw).context("failed to decode YAML config file")?
        } else {
            serde_json::from_str(&raw).context("failed to decode JSON config file")?
        };
        debug!(path = %path.display(), "loaded config file");
        Ok(cfg)
    }

    /// Write to `path`, creating parent directories as needed.
    pub fn save_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create the configuration dir [{}]", parent.display())
            })?;
        }

        let encoded = if is_yaml(path) {
            serde_yaml::to_string(self).context("failed to encode YAML config")?
        } else {
            serde_json::to_string_pretty(self).context("failed to encode JSON config")?
        };
        std::fs::write(path, encoded)
            .with_context(|| format!("failed to write config file [{}]", path.display()))?;
        debug!(path = %path.display(), "saved config file");
        Ok(())
    }

    /// Overlay `VSX_*` environment variables.
    pub fn apply_env(self) -> Self {
        self.apply_env_from(|k| std::env::var(k).ok())
    }

    fn apply_env_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |k: &str| lookup(k).as_deref().and_then(non_empty);
        if let Some(v) = get(ENV_GALLERY_HOST) {
            self.gallery_host = Some(v);
        }
        if let Some(v) = get(ENV_GALLERY_SCHEME) {
            self.gallery_scheme = Some(v);
        }
        if let Some(v) = get(ENV_EXTENSION_DIR) {
            self.extension_dir = Some(PathBuf::from(v));
        }
        if let Some(v) = get(ENV_OS) {
            self.os = Some(v);
        }
        if let Some(v) = get(ENV_ARCH) {
            self.arch = Some(v);
        }
        self
    }

    /// Copy of `self` with persistent-setting flags from `cmd` applied.
    pub fn merge_flags(&self, cmd: &Command) -> Self {
        let mut cfg = self.clone();
        let get = |names: &[&str]| cmd.flag_value(names).and_then(non_empty);
        if let Some(v) = get(&[flag::EXTENSION_DIR, flag::EXTENSION_DIR_SHORT]) {
            cfg.extension_dir = Some(PathBuf::from(v));
        }
        if let Some(v) = get(&[flag::GALLERY_SCHEME]) {
            cfg.gallery_scheme = Some(v);
        }
        if let Some(v) = get(&[flag::GALLERY_HOST]) {
            cfg.gallery_host = Some(v);
        }
        if let Some(v) = get(&[flag::OS]) {
            cfg.os = Some(v);
        }
        if let Some(v) = get(&[flag::ARCH, flag::ARCH_SHORT]) {
            cfg.arch = Some(v);
        }
        cfg
    }

    /// Fill blanks: `https` scheme, history file next to the config file.
    pub fn apply_defaults(mut self, config_path: &Path) -> Self {
        if self.gallery_scheme.is_none() {
            self.gallery_scheme = Some(DEFAULT_GALLERY_SCHEME.to_string());
        }
        if self.hist_file_path.is_none() {
            let dir = config_path.parent().unwrap_or_else(|| Path::new("."));
            self.hist_file_path = Some(dir.join(HISTORY_FILE_NAME));
        }
        self
    }

    pub fn gallery_scheme(&self) -> &str {
        self.gallery_scheme
            .as_deref()
            .unwrap_or(DEFAULT_GALLERY_SCHEME)
    }

    pub fn gallery_host(&self) -> &str {
        self.gallery_host.as_deref().unwrap_or("")
    }
}

/// Resolve the config path, then load file + environment + defaults.
///
/// Returns the effective config and the path it belongs to (for `config save`).
pub fn load(path_override: Option<&Path>) -> Result<(Config, PathBuf)> {
    let path = match path_override {
        Some(p) => p.to_path_buf(),
        None => default_config_path()?,
    };
    let cfg = Config::load_file(&path)?.apply_env().apply_defaults(&path);
    Ok((cfg, path))
}
