//! Command line splitting and classification.
//!
//! tokenize -> Vec<String>  (space separated, '...' / "..." literals, no escapes)
//! parse    -> Command { name, flags, args }
//!
//! The same grammar serves both the one-shot CLI (tokens come pre-split from
//! the OS) and the REPL (tokens come from `tokenize`).

use std::collections::BTreeMap;

/// Failure while splitting a raw line into tokens.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenizeError {
    #[error("reached end of input looking for matching [{quote}] opened at offset {offset}")]
    UnterminatedQuote { quote: char, offset: usize },
}

/// Failure while classifying tokens.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("found unexpected token [{token}][{}]", lookahead.as_deref().unwrap_or(""))]
    UnexpectedToken {
        token: String,
        lookahead: Option<String>,
    },
}

/// A parsed command line: `name`, repeatable `flags`, positional `args`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Command {
    name: String,
    flags: BTreeMap<String, Vec<String>>,
    args: Vec<String>,
}

impl Command {
    /// The first non-flag token (empty if there was none).
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn flags(&self) -> &BTreeMap<String, Vec<String>> {
        &self.flags
    }

    /// Values of the first alias in `names` that was supplied.
    ///
    /// Aliases are checked in order, so `flag(&["output", "o"])` prefers the
    /// long form when both appear.
    pub fn flag(&self, names: &[&str]) -> Option<&[String]> {
        names
            .iter()
            .find_map(|n| self.flags.get(*n))
            .map(Vec::as_slice)
    }

    /// Last value of the first alias supplied (later repeats win).
    pub fn flag_value(&self, names: &[&str]) -> Option<&str> {
        self.flag(names)
            .and_then(|v| v.last())
            .map(String::as_str)
    }

    pub fn has_flag(&self, names: &[&str]) -> bool {
        self.flag(names).is_some()
    }
}

/// Split `input` into tokens.
///
/// A plain space ends the current token. A `'` or `"` starts a literal that
/// runs verbatim to the next quote of the same kind; the quotes are dropped.
/// Tabs and newlines are ordinary characters.
pub fn tokenize(input: &str) -> Result<Vec<String>, TokenizeError> {
    let bytes = input.as_bytes();
    let mut tokens = Vec::with_capacity(8);
    let mut from = 0;
    let mut i = 0;

    // Every delimiter is ASCII, so each slice boundary is a char boundary.
    while i < bytes.len() {
        match bytes[i] {
            b' ' => {
                capture(input, from, i, &mut tokens);
                from = i + 1;
            }
            quote @ (b'\'' | b'"') => {
                capture(input, from, i, &mut tokens);
                let open = i;
                from = i + 1;
                let Some(len) = bytes[from..].iter().position(|&b| b == quote) else {
                    return Err(TokenizeError::UnterminatedQuote {
                        quote: quote as char,
                        offset: open,
                    });
                };
                i = from + len;
                capture(input, from, i, &mut tokens);
                // hop the closing quote
                from = i + 1;
            }
            _ => {}
        }
        i += 1;
    }

    capture(input, from, bytes.len(), &mut tokens);
    Ok(tokens)
}

fn capture(input: &str, from: usize, to: usize, tokens: &mut Vec<String>) {
    if to > from {
        tokens.push(input[from..to].to_string());
    }
}

fn is_flag(token: &str) -> bool {
    token.starts_with('-')
}

/// Classify `tokens` into a [`Command`] in one pass with one token of
/// lookahead.
///
/// - non-flag: first becomes the name, the rest are positional args
/// - flag followed by non-flag: the pair is a valued flag
/// - flag followed by a flag or end of input: boolean flag (`"true"`)
/// - empty token: `UnexpectedToken`
pub fn parse<S: AsRef<str>>(tokens: &[S]) -> Result<Command, ParseError> {
    let mut cmd = Command::default();
    let mut named = false;
    let mut i = 0;

    while i < tokens.len() {
        let token = tokens[i].as_ref();
        let lookahead = tokens.get(i + 1).map(AsRef::as_ref);

        // `tokenize` never yields an empty token; only a pre-split argv can.
        if token.is_empty() {
            return Err(ParseError::UnexpectedToken {
                token: token.to_string(),
                lookahead: lookahead.map(str::to_string),
            });
        }

        if !is_flag(token) {
            if named {
                cmd.args.push(token.to_string());
            } else {
                cmd.name = token.to_string();
                named = true;
            }
            i += 1;
            continue;
        }

        // `-` and `--` strip to the empty name.
        let name = token.trim_start_matches('-');
        let values = cmd.flags.entry(name.to_string()).or_default();
        match lookahead {
            Some(value) if !value.is_empty() && !is_flag(value) => {
                values.push(value.to_string());
                i += 2;
            }
            _ => {
                values.push("true".to_string());
                i += 1;
            }
        }
    }

    Ok(cmd)
}

/// Convenience: tokenize then parse one raw line.
pub fn parse_line(line: &str) -> anyhow::Result<Command> {
    let tokens = tokenize(line)?;
    Ok(parse(&tokens)?)
}
