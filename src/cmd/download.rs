/*!
`download.rs`

Implements the `download` command: fetch every requested extension and write
its `.vsix` package to `<output>/<publisher>.<id>-<version>.vsix`.

  download usernamehw.errorlens@3.26.0 ms-python.python -o ./packages

Output directory: `--output/-o`, else the current working directory. It is
created when missing.
*/

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

use super::format::{Role, StyleOptions, color, emoji};
use super::shared::{decode_identifiers, fetch_all, finish_batch};
use super::{flag, gallery_for, usage_error};
use crate::argv::Command;
use crate::config::Config;
use crate::ident::Identifier;

pub fn execute_download(cfg: &Config, cmd: &Command) -> Result<()> {
    if cmd.args().is_empty() {
        return Err(usage_error("No extensions received."));
    }

    let out_dir = match cmd.flag_value(&[flag::OUTPUT, flag::OUTPUT_SHORT]) {
        Some(dir) => PathBuf::from(dir),
        None => std::env::current_dir().context(
            "no download directory was specified and working directory retrieval failed",
        )?,
    };
    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("failed to create output directory [{}]", out_dir.display()))?;

    let gallery = gallery_for(cfg)?;
    let (idents, mut failures) = decode_identifiers(cmd.args());

    let dir = out_dir.clone();
    let (saved, fetch_failures) = fetch_all(gallery, idents, move |ident, bytes| {
        let path = package_path(&dir, &ident);
        async move {
            let written = bytes.len();
            let target = path.clone();
            tokio::task::spawn_blocking(move || std::fs::write(&target, bytes))
                .await
                .context("package writer panicked")?
                .with_context(|| {
                    format!("failed to write extension content to [{}]", path.display())
                })?;
            debug!("Wrote [{written}] bytes to [{}].", path.display());
            Ok::<_, anyhow::Error>(path)
        }
    })?;
    failures.extend(fetch_failures);

    let style = StyleOptions::detect();
    for (ident, path) in &saved {
        println!(
            "{} {} -> {}",
            emoji("success", &style),
            color(Role::Success, ident.to_string(), &style),
            path.display()
        );
    }

    finish_batch("download", cmd.args().len(), failures)
}

/// `<dir>/<publisher>.<id>-<version>.vsix`
pub fn package_path(dir: &Path, ident: &Identifier) -> PathBuf {
    dir.join(format!("{}.vsix", ident.artifact_stem()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::argv;

    #[test]
    fn package_path_uses_stem() {
        let ident = Identifier::parse("usernamehw.errorlens@3.26.0").unwrap();
        assert_eq!(
            package_path(Path::new("/tmp/out"), &ident),
            PathBuf::from("/tmp/out/usernamehw.errorlens-3.26.0.vsix")
        );
        let ident = Identifier::parse("a.b").unwrap();
        assert_eq!(
            package_path(Path::new("o"), &ident),
            PathBuf::from("o/a.b-latest.vsix")
        );
    }

    #[test]
    fn requires_arguments() {
        let cmd = argv::parse(&["download", "-o", "x"]).unwrap();
        let err = execute_download(&Config::default(), &cmd).unwrap_err();
        assert!(err.to_string().contains("No extensions received"));
    }

    #[test]
    fn bad_identifiers_fail_without_network() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("pkgs");
        let out_str = out.to_str().unwrap();
        let cmd = argv::parse(&["download", "not-an-identifier", "-o", out_str]).unwrap();
        let cfg = Config {
            gallery_host: Some("gallery.invalid".into()),
            ..Default::default()
        };
        let err = execute_download(&cfg, &cmd).unwrap_err();
        assert!(err.to_string().contains("1 of 1 download(s) failed"));
        assert!(out.is_dir(), "output directory is created up front");
    }
}
