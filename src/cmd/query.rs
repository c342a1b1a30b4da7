/*!
`query.rs`

Implements the `query` command: search the gallery and stream matching
extensions as they arrive, page by page.

  query error lens            table output
  query python -n 5           stop after five results (no further pages requested)
  query python --json         one JSON object per line

Table columns: Name | Publisher | Install With | Installs
*/

use anyhow::{Context, Result};
use std::io::Write;
use tracing::debug;

use super::format::{Role, StyleOptions, color, emoji, render_row, table_header};
use super::{flag, gallery_for, usage_error};
use crate::argv::Command;
use crate::config::Config;
use crate::gallery::ExtensionMeta;

const HEADERS: [&str; 4] = ["Name", "Publisher", "Install With", "Installs"];
const WIDTHS: [usize; 4] = [25, 20, 50, 8];

pub fn execute_query(cfg: &Config, cmd: &Command) -> Result<()> {
    if cmd.args().is_empty() {
        return Err(usage_error("No query terms received."));
    }
    let term = cmd.args().join(" ");
    let limit = parse_limit(cmd)?;
    let json = cmd.has_flag(&[flag::JSON]);

    let gallery = gallery_for(cfg)?;
    let mut results = gallery.query(&term)?;
    let style = StyleOptions::detect();
    let mut out = std::io::stdout().lock();

    if !json {
        writeln!(out, "{}", table_header(&HEADERS, &WIDTHS, &style))?;
    }

    let mut shown = 0;
    for item in results.by_ref().take(limit.unwrap_or(usize::MAX)) {
        let meta = item.context("failed extension query")?;
        if json {
            writeln!(out, "{}", serde_json::to_string(&meta)?)?;
        } else {
            writeln!(out, "{}", render_row(&row(&meta), &WIDTHS))?;
        }
        shown += 1;
    }

    debug!(shown, pages = results.requests(), term = %term, "query finished");
    if shown == 0 && !json {
        writeln!(
            out,
            "{}",
            color(
                Role::Dim,
                format!("{} no extensions matched [{term}]", emoji("search", &style)),
                &style
            )
        )?;
    }
    Ok(())
}

fn parse_limit(cmd: &Command) -> Result<Option<usize>> {
    cmd.flag_value(&[flag::LIMIT, flag::LIMIT_SHORT])
        .map(|v| {
            v.parse::<usize>()
                .with_context(|| format!("invalid --limit [{v}] (expected a whole number)"))
        })
        .transpose()
}

/// Table cells for one result.
fn row(meta: &ExtensionMeta) -> Vec<String> {
    let name = if meta.display_name.is_empty() {
        meta.name.clone()
    } else {
        meta.display_name.clone()
    };
    let publisher = if meta.publisher.display_name.is_empty() {
        meta.publisher.publisher_name.clone()
    } else {
        meta.publisher.display_name.clone()
    };
    let installs = meta
        .installs()
        .map(|n| format!("{n:.0}"))
        .unwrap_or_else(|| "-".to_string());
    vec![name, publisher, meta.install_with(), installs]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::argv;
    use crate::gallery::extension::{Publisher, Statistic, Version};

    #[test]
    fn row_prefers_display_names() {
        let meta = ExtensionMeta {
            publisher: Publisher {
                publisher_name: "usernamehw".into(),
                display_name: "Alexander".into(),
                ..Default::default()
            },
            name: "errorlens".into(),
            display_name: "Error Lens".into(),
            versions: vec![Version {
                version: "3.26.0".into(),
                ..Default::default()
            }],
            statistics: vec![Statistic {
                statistic_name: "install".into(),
                value: 42.0,
            }],
            ..Default::default()
        };
        assert_eq!(
            row(&meta),
            vec!["Error Lens", "Alexander", "usernamehw.errorlens@3.26.0", "42"]
        );
    }

    #[test]
    fn row_falls_back_to_raw_names() {
        let mut meta = ExtensionMeta::default();
        meta.publisher.publisher_name = "p".into();
        meta.name = "e".into();
        assert_eq!(row(&meta), vec!["e", "p", "p.e", "-"]);
    }

    #[test]
    fn limit_flag_parsing() {
        let cmd = argv::parse(&["query", "x", "-n", "5"]).unwrap();
        assert_eq!(parse_limit(&cmd).unwrap(), Some(5));
        let cmd = argv::parse(&["query", "x", "--limit", "many"]).unwrap();
        assert!(parse_limit(&cmd).is_err());
        let cmd = argv::parse(&["query", "x"]).unwrap();
        assert_eq!(parse_limit(&cmd).unwrap(), None);
    }

    #[test]
    fn requires_terms() {
        let cmd = argv::parse(&["query", "--json"]).unwrap();
        let err = execute_query(&Config::default(), &cmd).unwrap_err();
        assert!(err.to_string().contains("No query terms"));
    }
}
