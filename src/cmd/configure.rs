/*!
`configure.rs`

Implements the `config` command.

  config            same as `config show`
  config show       effective configuration (file + env + flags) as JSON
  config save       persist the effective configuration to the config file
  config path       print the config file location

`config save --gallery-host my.gallery` is the way to make a flag sticky.
*/

use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

use super::usage_error;
use crate::argv::Command;
use crate::config::Config;

const SHOW: &str = "show";
const SAVE: &str = "save";
const PATH: &str = "path";

pub fn execute_config(cfg: &Config, config_path: &Path, cmd: &Command) -> Result<()> {
    let action = cmd.args().first().map(String::as_str).unwrap_or(SHOW);
    if cmd.args().len() > 1 {
        return Err(usage_error(&format!(
            "config [{action}] takes no further arguments"
        )));
    }

    match action {
        SHOW => println!("{}", render(cfg)?),
        SAVE => {
            cfg.save_file(config_path)?;
            info!("Saved configuration to [{}].", config_path.display());
        }
        PATH => println!("{}", config_path.display()),
        other => {
            return Err(usage_error(&format!(
                "Received unknown config action [{other}]."
            )));
        }
    }
    Ok(())
}

fn render(cfg: &Config) -> Result<String> {
    serde_json::to_string_pretty(cfg).context("failed to encode configuration")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::argv;

    #[test]
    fn save_persists_merged_flags() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vsx.json");
        let cmd = argv::parse(&["config", "save", "--gallery-host", "g.example"]).unwrap();
        let cfg = Config::default().merge_flags(&cmd);

        execute_config(&cfg, &path, &cmd).unwrap();
        let saved = Config::load_file(&path).unwrap();
        assert_eq!(saved.gallery_host(), "g.example");
    }

    #[test]
    fn show_and_path_do_not_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vsx.json");
        for line in ["config", "config show", "config path"] {
            let cmd = argv::parse_line(line).unwrap();
            execute_config(&Config::default(), &path, &cmd).unwrap();
        }
        assert!(!path.exists());
    }

    #[test]
    fn rejects_unknown_actions() {
        let path = Path::new("/nonexistent/vsx.json");
        let cmd = argv::parse(&["config", "delete"]).unwrap();
        let err = execute_config(&Config::default(), path, &cmd).unwrap_err();
        assert!(err.to_string().contains("unknown config action [delete]"));

        let cmd = argv::parse(&["config", "show", "extra"]).unwrap();
        assert!(execute_config(&Config::default(), path, &cmd).is_err());
    }

    #[test]
    fn render_uses_file_key_names() {
        let cfg = Config {
            extension_dir: Some("/ext".into()),
            ..Default::default()
        };
        let out = render(&cfg).unwrap();
        assert!(out.contains("\"extensions_dir\": \"/ext\""));
    }
}
