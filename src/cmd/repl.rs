/*!
`repl.rs`

Interactive shell, entered when `vsx` is run without a command.

Each line goes through the same tokenizer + parser as the one-shot CLI and is
dispatched with `cmd::run`. A failed line is reported and the shell keeps
reading. `exit`, `quit`, Ctrl-C or Ctrl-D leave the shell.

Line editing is `rustyline`:
  - history is loaded from `hist_file_path` on start and appended per line
  - Tab completes command names in first position, flag names after that
*/

use anyhow::{Context as _, Result, bail};
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::format::{Role, StyleOptions, banner, color, emoji};
use super::{Outcome, flag, name, run};
use crate::argv;
use crate::config::Config;

const PROMPT: &str = "»";

/// Offered in first position.
const COMMANDS: &[&str] = &[
    name::QUERY,
    name::INSTALL,
    name::DOWNLOAD,
    name::CONFIG,
    name::HELP,
    name::EXIT,
    name::QUIT,
];

pub fn enter_repl(cfg: &Config, config_path: &Path) -> Result<()> {
    let style = StyleOptions::detect();
    println!(
        "{}",
        banner(
            "vsx",
            Some(concat!("v", env!("CARGO_PKG_VERSION"), " | `help` for usage, `exit` to leave")),
            &style
        )
    );

    let mut editor = LineEditor::new(cfg.hist_file_path.clone())?;
    session(cfg, config_path, &mut editor, &style)
}

/* ---- Line source ---- */

/// Where the shell reads its lines from.
trait LineSource {
    /// Next line without its terminator; `None` ends the session.
    fn next_line(&mut self, prompt: &str) -> Result<Option<String>>;

    /// Record a submitted line in the history.
    fn remember(&mut self, line: &str);
}

struct LineEditor {
    rl: Editor<CommandCompleter, DefaultHistory>,
    history: Option<PathBuf>,
}

impl LineEditor {
    fn new(history: Option<PathBuf>) -> Result<Self> {
        let mut rl = Editor::<CommandCompleter, DefaultHistory>::new()
            .context("failed to init the line editor")?;
        rl.set_helper(Some(CommandCompleter));

        let history = history.and_then(|path| match prepare_history(&mut rl, &path) {
            Ok(()) => Some(path),
            Err(e) => {
                warn!("History disabled: {e:#}");
                None
            }
        });
        Ok(Self { rl, history })
    }
}

/// Create the history file's directory and load earlier entries, if any.
fn prepare_history(rl: &mut Editor<CommandCompleter, DefaultHistory>, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create [{}]", parent.display()))?;
    }
    if path.exists() {
        rl.load_history(path)
            .with_context(|| format!("failed to load history file [{}]", path.display()))?;
        debug!(path = %path.display(), "loaded history");
    }
    Ok(())
}

impl LineSource for LineEditor {
    fn next_line(&mut self, prompt: &str) -> Result<Option<String>> {
        match self.rl.readline(prompt) {
            Ok(line) => Ok(Some(line)),
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => Ok(None),
            Err(e) => bail!("failed to read REPL input: {e}"),
        }
    }

    fn remember(&mut self, line: &str) {
        if let Err(e) = self.rl.add_history_entry(line) {
            warn!("Failed to record history: {e}");
            return;
        }
        if let Some(path) = &self.history
            && let Err(e) = self.rl.append_history(path)
        {
            warn!("Failed to write history file [{}]: {e}", path.display());
        }
    }
}

/* ---- Completion ---- */

struct CommandCompleter;

/// Start of the word under the cursor and the candidates for it.
fn complete_word(line: &str, pos: usize) -> (usize, Vec<String>) {
    let head = &line[..pos];
    let start = head.rfind(' ').map(|i| i + 1).unwrap_or(0);
    let word = &head[start..];
    let first_word = head[..start].trim().is_empty();

    let candidates = if first_word && !word.starts_with('-') {
        let lower = word.to_ascii_lowercase();
        COMMANDS
            .iter()
            .filter(|c| c.starts_with(&lower))
            .map(|c| c.to_string())
            .collect()
    } else if word.starts_with('-') {
        let stem = word.trim_start_matches('-');
        let long = word.starts_with("--");
        flag::KNOWN
            .iter()
            .copied()
            .filter(|f| f.starts_with(stem))
            .filter(|f| !long || !flag::SHORT.contains(f))
            .map(|f| {
                let dashes = if flag::SHORT.contains(&f) { "-" } else { "--" };
                format!("{dashes}{f}")
            })
            .collect()
    } else {
        Vec::new()
    };
    (start, candidates)
}

impl Completer for CommandCompleter {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let (start, words) = complete_word(line, pos);
        let pairs = words
            .into_iter()
            .map(|w| Pair {
                display: w.clone(),
                replacement: format!("{w} "),
            })
            .collect();
        Ok((start, pairs))
    }
}

impl Hinter for CommandCompleter {
    type Hint = String;
}

impl Highlighter for CommandCompleter {}

impl Validator for CommandCompleter {}

impl Helper for CommandCompleter {}

/* ---- Loop ---- */

/// Read-eval loop. Returns when the input ends or a command asks to exit.
fn session(
    cfg: &Config,
    config_path: &Path,
    input: &mut impl LineSource,
    style: &StyleOptions,
) -> Result<()> {
    let prompt = format!("{} ", color(Role::Prompt, PROMPT, style));
    loop {
        let Some(line) = input.next_line(&prompt)? else {
            debug!("Input closed, leaving the shell.");
            return Ok(());
        };
        let entry = line.trim_end_matches(['\r', '\n']);
        if entry.trim().is_empty() {
            continue;
        }
        input.remember(entry);

        let outcome = argv::parse_line(entry).and_then(|cmd| run(cfg, config_path, &cmd));
        match outcome {
            Ok(Outcome::Exit) => return Ok(()),
            Ok(Outcome::Continue) => {}
            Err(e) => {
                debug!(line = entry, "command failed");
                eprintln!(
                    "{} {}",
                    emoji("error", style),
                    color(Role::Error, format!("{e:#}"), style)
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustyline::history::History;
    use std::collections::VecDeque;

    /// Feeds fixed lines and keeps what the shell asked it to remember.
    struct Script {
        lines: VecDeque<&'static str>,
        prompts: usize,
        remembered: Vec<String>,
    }

    impl Script {
        fn new(lines: &[&'static str]) -> Self {
            Self {
                lines: lines.iter().copied().collect(),
                prompts: 0,
                remembered: Vec::new(),
            }
        }
    }

    impl LineSource for Script {
        fn next_line(&mut self, _prompt: &str) -> Result<Option<String>> {
            self.prompts += 1;
            Ok(self.lines.pop_front().map(str::to_string))
        }

        fn remember(&mut self, line: &str) {
            self.remembered.push(line.to_string());
        }
    }

    fn drive(script: &mut Script) {
        session(
            &Config::default(),
            Path::new("/nonexistent/vsx.json"),
            script,
            &StyleOptions::plain(),
        )
        .unwrap();
    }

    #[test]
    fn stops_at_exit_and_records_history() {
        let mut script = Script::new(&[
            "help\r\n",
            "",
            "   ",
            "bogus 'unterminated",
            "exit",
            "help",
        ]);
        drive(&mut script);

        assert_eq!(script.remembered, vec!["help", "bogus 'unterminated", "exit"]);
        assert_eq!(script.prompts, 5, "nothing is read after `exit`");
        assert_eq!(script.lines, vec!["help"]);
    }

    #[test]
    fn end_of_input_leaves_the_shell() {
        let mut script = Script::new(&[]);
        drive(&mut script);
        assert_eq!(script.prompts, 1);
        assert!(script.remembered.is_empty());
    }

    #[test]
    fn completes_command_names_first() {
        assert_eq!(complete_word("in", 2), (0, vec!["install".to_string()]));
        assert_eq!(
            complete_word("", 0).1,
            vec!["query", "install", "download", "config", "help", "exit", "quit"]
        );
        assert_eq!(complete_word("Q", 1).1, vec!["query", "quit"]);
        assert!(complete_word("install us", 10).1.is_empty());
    }

    #[test]
    fn completes_flags_after_the_command() {
        assert_eq!(
            complete_word("download a.b --ou", 17),
            (13, vec!["--output".to_string()])
        );
        assert_eq!(complete_word("install -x", 10).1, vec!["-xd"]);
        assert_eq!(complete_word("install --o", 11).1, vec!["--os", "--output"]);
        assert_eq!(
            complete_word("query x --g", 11).1,
            vec!["--gallery-host", "--gallery-scheme"]
        );
    }

    #[test]
    fn history_survives_a_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join(".history");

        let mut first = LineEditor::new(Some(path.clone())).unwrap();
        first.remember("query error lens");
        first.remember("install usernamehw.errorlens");
        assert!(path.is_file());

        let second = LineEditor::new(Some(path)).unwrap();
        assert_eq!(second.rl.history().len(), 2);
    }
}
