use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

mod argv;
mod cmd;
mod config;
mod gallery;
mod ident;
mod utils;

/// VSX - command-line VSCode extension manager
///
/// Usage:
///   vsx                                  interactive shell
///   vsx install <publisher.id[@ver]...>  unpack into the extensions dir
///   vsx download <publisher.id[@ver]...> [-o DIR]
///   vsx query <terms...> [-n N] [--json]
///   vsx config [show|save|path]
///
/// Global flags (before the command):
///   -v / -vv        Increase verbosity
///   -q / --quiet    Errors only
///   --config PATH   Config file (default: <user config dir>/vsx/vsx.json)
///
/// Command flags (after the command) follow the shell grammar, e.g.
///   vsx install usernamehw.errorlens --gallery-host my.gallery -xd ~/.vscode/extensions
#[derive(Parser, Debug)]
#[command(
    name = "vsx",
    version,
    author,
    about = "VSX - command-line VSCode extension manager",
    disable_help_subcommand = true
)]
pub struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Silence all non-error output
    #[arg(short, long)]
    quiet: bool,

    /// Config file (JSON, or YAML by extension)
    #[arg(long = "config", value_name = "PATH")]
    config: Option<PathBuf>,

    /// Command, arguments and command flags. Empty starts the shell.
    #[arg(
        value_name = "COMMAND",
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    command: Vec<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let level = utils::derive_level(cli.verbose, cli.quiet);
    utils::init_logging(level);

    let (cfg, config_path) = config::load(cli.config.as_deref())?;

    if cli.command.is_empty() {
        return cmd::repl::enter_repl(&cfg, &config_path);
    }

    // One-shot: `exit`/`quit` have nothing to leave, so the outcome is moot.
    let command = argv::parse(&cli.command)?;
    cmd::run(&cfg, &config_path, &command)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_flags_precede_the_command() {
        let cli = Cli::try_parse_from([
            "vsx", "-vv", "--config", "/tmp/c.yaml", "install", "a.b", "-xd", "/ext", "--os",
            "linux",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(!cli.quiet);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.yaml")));
        assert_eq!(
            cli.command,
            vec!["install", "a.b", "-xd", "/ext", "--os", "linux"]
        );

        let parsed = argv::parse(&cli.command).unwrap();
        assert_eq!(parsed.name(), "install");
        assert_eq!(parsed.flag_value(&["xd"]), Some("/ext"));
    }

    #[test]
    fn command_tokens_keep_their_flags() {
        let cli = Cli::try_parse_from(["vsx", "query", "error", "lens", "-v", "--json"]).unwrap();
        assert_eq!(cli.verbose, 0, "flags after the command belong to the command");
        assert_eq!(cli.command, vec!["query", "error", "lens", "-v", "--json"]);
    }

    #[test]
    fn no_command_means_shell() {
        let cli = Cli::try_parse_from(["vsx", "-q"]).unwrap();
        assert!(cli.quiet);
        assert!(cli.command.is_empty());
    }
}
