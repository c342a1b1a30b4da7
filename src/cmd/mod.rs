/*!
Command dispatch.

A parsed `argv::Command` is routed by name:

    install  <publisher.id[@version]...>   fetch + unpack into the extensions dir
    download <publisher.id[@version]...>   fetch + save `.vsix` files
    query    <terms...>                    search the gallery
    config   [show|save|path]              inspect / persist configuration
    help                                   usage
    exit | quit                            leave the REPL

Every command accepts the persistent-setting flags (`--gallery-host`,
`--gallery-scheme`, `--extension-dir/-xd`, `--os`, `--arch`), which override
the loaded configuration for that one command.

Conventions:
  - Each command module exposes one `execute_*` function returning
    `anyhow::Result<()>`.
  - Batch commands report every per-identifier failure and fail at the end.
*/

use anyhow::{Result, anyhow, bail};
use std::path::Path;
use tracing::{debug, warn};

use crate::argv::Command;
use crate::config::Config;
use crate::gallery::Gallery;

pub mod configure;
pub mod download;
pub mod format;
pub mod install;
pub mod query;
pub mod repl;
pub mod shared;

/// Command names.
pub mod name {
    pub const QUERY: &str = "query";
    pub const INSTALL: &str = "install";
    pub const DOWNLOAD: &str = "download";
    pub const CONFIG: &str = "config";
    pub const HELP: &str = "help";
    pub const EXIT: &str = "exit";
    pub const QUIT: &str = "quit";
}

/// Flag names (without the leading dashes).
pub mod flag {
    pub const GALLERY_HOST: &str = "gallery-host";
    pub const GALLERY_SCHEME: &str = "gallery-scheme";
    pub const EXTENSION_DIR: &str = "extension-dir";
    pub const EXTENSION_DIR_SHORT: &str = "xd";
    pub const OS: &str = "os";
    pub const ARCH: &str = "arch";
    pub const ARCH_SHORT: &str = "a";
    pub const OUTPUT: &str = "output";
    pub const OUTPUT_SHORT: &str = "o";
    pub const LIMIT: &str = "limit";
    pub const LIMIT_SHORT: &str = "n";
    pub const JSON: &str = "json";
    pub const HELP: &str = "help";
    pub const HELP_SHORT: &str = "h";

    pub const KNOWN: &[&str] = &[
        GALLERY_HOST,
        GALLERY_SCHEME,
        EXTENSION_DIR,
        EXTENSION_DIR_SHORT,
        OS,
        ARCH,
        ARCH_SHORT,
        OUTPUT,
        OUTPUT_SHORT,
        LIMIT,
        LIMIT_SHORT,
        JSON,
        HELP,
        HELP_SHORT,
    ];

    /// Spelled with a single dash.
    pub const SHORT: &[&str] = &[
        EXTENSION_DIR_SHORT,
        ARCH_SHORT,
        OUTPUT_SHORT,
        LIMIT_SHORT,
        HELP_SHORT,
    ];
}

/// What the caller (REPL or one-shot CLI) should do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Continue,
    Exit,
}

/// Execute one parsed command against `cfg` (flags from `cmd` layered on top).
pub fn run(cfg: &Config, config_path: &Path, cmd: &Command) -> Result<Outcome> {
    for unknown in cmd.flags().keys().filter(|k| !flag::KNOWN.contains(&k.as_str())) {
        warn!("Ignoring unknown flag [{unknown}].");
    }

    let cfg = cfg.merge_flags(cmd);
    let command = cmd.name().to_ascii_lowercase();
    debug!(command = %command, args = ?cmd.args(), "dispatching");

    match command.as_str() {
        "" if cmd.has_flag(&[flag::HELP, flag::HELP_SHORT]) => println!("{}", usage()),
        "" => bail!(usage_error("Received no command.")),
        name::QUERY => query::execute_query(&cfg, cmd)?,
        name::INSTALL => install::execute_install(&cfg, cmd)?,
        name::DOWNLOAD => download::execute_download(&cfg, cmd)?,
        name::CONFIG => configure::execute_config(&cfg, config_path, cmd)?,
        name::HELP => println!("{}", usage()),
        name::EXIT | name::QUIT => return Ok(Outcome::Exit),
        other => bail!(usage_error(&format!("Received unknown command [{other}]."))),
    }

    Ok(Outcome::Continue)
}

/// Gallery described by the effective configuration.
pub fn gallery_for(cfg: &Config) -> Result<Gallery> {
    let gallery = Gallery::new(cfg.gallery_scheme(), cfg.gallery_host())?
        .with_target_platform(cfg.os.as_deref(), cfg.arch.as_deref());
    debug!(
        base = %gallery.base_url(),
        platform = gallery.target_platform().unwrap_or("universal"),
        "using gallery"
    );
    Ok(gallery)
}

pub fn usage_error(msg: &str) -> anyhow::Error {
    anyhow!("{msg} (run `vsx help` for usage)")
}

pub fn usage() -> &'static str {
    r#"
>> Overview

  VSX is a simple command-line VSCode extension manager.
  Run it with no command to start an interactive shell.

>> Usage

  vsx [-v|-vv] [-q] [--config PATH] [COMMAND [ARGS...] [FLAGS]]

  Extensions are written as  publisher.extension[@version]
    usernamehw.errorlens@3.26.0
    usernamehw -> Extension Publisher
     errorlens -> Extension ID
       @3.26.0 -> Optional; 'latest' is used when omitted

>> Commands

  install  EXT...   Download extensions and unpack them into the
                    extensions directory.
  download EXT...   Download extensions and save the .vsix packages.
  query    TERMS    Search the extension gallery.
  config   [show|save|path]
                    Show, persist or locate the configuration.
  help              Show this message.
  exit, quit        Leave the interactive shell.

>> Flags

  --extension-dir, -xd  The local '.vscode/extensions' directory.
                        Default: ~/.vscode-oss/extensions, then
                        ~/.vscode/extensions
  --gallery-scheme      'http' or 'https'. Default: https
  --gallery-host        Hostname of the extension gallery.
  --os, --arch, -a      Target platform for platform-specific packages.
  --output,        -o   Directory for 'download'. Default: current dir
  --limit,         -n   Maximum number of 'query' results.
  --json                Machine-readable 'query' output.

>> Environment Variables

  Flags supersede the environment, which supersedes the config file.

  VSX_GALLERY_HOST    --gallery-host
  VSX_GALLERY_SCHEME  --gallery-scheme
  VSX_EXTENSION_DIR   --extension-dir, -xd
  VSX_OS              --os
  VSX_ARCH            --arch
"#
}
