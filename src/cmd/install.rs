/*!
`install.rs`

Implements the `install` command: fetch every requested extension and unpack
its package into `<extensions dir>/<publisher>.<id>-<version>/`.

Extensions directory: `--extension-dir/-xd`, `VSX_EXTENSION_DIR`, the config
file, else the first existing of `~/.vscode-oss` and `~/.vscode` (with
`/extensions` appended).

Only entries under the package's top-level `extension/` directory are written,
with that prefix removed. Entries whose paths would escape the target
directory are skipped.
*/

use anyhow::{Context, Result, bail};
use std::io::Cursor;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info};

use super::format::{Role, StyleOptions, color, emoji};
use super::shared::{decode_identifiers, fetch_all, finish_batch};
use super::{gallery_for, usage_error};
use crate::argv::Command;
use crate::config::Config;

/// Package subtree that holds the extension payload.
const PAYLOAD_DIR: &str = "extension";

/// Editor config directories searched (in order) under the home directory.
const EDITOR_DIRS: [&str; 2] = [".vscode-oss", ".vscode"];

pub fn execute_install(cfg: &Config, cmd: &Command) -> Result<()> {
    if cmd.args().is_empty() {
        return Err(usage_error("No extensions received."));
    }

    let ext_root = match &cfg.extension_dir {
        Some(dir) => dir.clone(),
        None => locate_extension_dir().context(
            "received no VSCode extension directory and failed to locate one",
        )?,
    };
    debug!("Using extension directory [{}].", ext_root.display());

    let gallery = gallery_for(cfg)?;
    let (idents, mut failures) = decode_identifiers(cmd.args());

    let root = ext_root.clone();
    let (installed, fetch_failures) = fetch_all(gallery, idents, move |ident, bytes| {
        let target = root.join(ident.artifact_stem());
        async move {
            let dest = target.clone();
            let files = tokio::task::spawn_blocking(move || extract_package(&bytes, &dest))
                .await
                .context("package extraction panicked")??;
            info!(
                "[{}] install complete to [{}] ({files} files).",
                ident,
                target.display()
            );
            Ok::<_, anyhow::Error>(target)
        }
    })?;
    failures.extend(fetch_failures);

    let style = StyleOptions::detect();
    for (ident, dir) in &installed {
        println!(
            "{} {} -> {}",
            emoji("package", &style),
            color(Role::Success, ident.to_string(), &style),
            dir.display()
        );
    }

    finish_batch("install", cmd.args().len(), failures)
}

/// First existing `<home>/<editor dir>/extensions`, created if needed.
pub fn locate_extension_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("failed to get user home directory")?;
    locate_extension_dir_in(&home)
}

fn locate_extension_dir_in(home: &Path) -> Result<PathBuf> {
    for name in EDITOR_DIRS {
        let editor_dir = home.join(name);
        if editor_dir.is_dir() {
            let ext_dir = editor_dir.join("extensions");
            std::fs::create_dir_all(&ext_dir).with_context(|| {
                format!("failed to create extension directory [{}]", ext_dir.display())
            })?;
            return Ok(ext_dir);
        }
        debug!("Attempted: {}.", editor_dir.display());
    }
    bail!(
        "none of {} exist under [{}]",
        EDITOR_DIRS.join(", "),
        home.display()
    )
}

/// Unpack the `extension/` subtree of a `.vsix` package into `dest`.
/// Returns the number of files written.
pub fn extract_package(package: &[u8], dest: &Path) -> Result<usize> {
    let mut archive =
        zip::ZipArchive::new(Cursor::new(package)).context("failed to init zip reader")?;
    std::fs::create_dir_all(dest)
        .with_context(|| format!("failed to create [{}]", dest.display()))?;

    let mut written = 0;
    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .with_context(|| format!("failed to read zip entry #{i}"))?;
        if entry.is_dir() {
            continue;
        }
        let Some(relative) = payload_path(entry.enclosed_name().as_deref()) else {
            debug!("Skipping file [{}].", entry.name());
            continue;
        };

        let output = dest.join(&relative);
        if let Some(parent) = output.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create output directory [{}]", parent.display())
            })?;
        }
        let mut file = std::fs::File::create(&output)
            .with_context(|| format!("failed to open output file [{}]", output.display()))?;
        std::io::copy(&mut entry, &mut file).with_context(|| {
            format!("failed to write zipped file [{}] to disk", output.display())
        })?;
        debug!("Outputting file [{}] to [{}].", relative.display(), output.display());
        written += 1;
    }

    Ok(written)
}

/// `extension/a/b` -> `a/b`; anything outside `extension/` (or unsafe) -> None.
fn payload_path(path: Option<&Path>) -> Option<PathBuf> {
    let mut components = path?.components();
    match components.next()? {
        Component::Normal(first) if first == PAYLOAD_DIR => {}
        _ => return None,
    }
    let rest = components.as_path();
    if rest.as_os_str().is_empty() {
        return None;
    }
    Some(rest.to_path_buf())
}
