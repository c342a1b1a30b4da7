/*!
shared.rs - helpers for the batch commands (install / download).

  - decode_identifiers: positional args -> Identifiers, collecting bad inputs
  - fetch_all:          bounded concurrent fetch + per-item post-processing
  - finish_batch:       report per-identifier failures, fail if any
*/

use anyhow::{Error, Result, anyhow};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::gallery::Gallery;
use crate::ident::{DEFAULT_VERSION, Identifier};
use crate::utils::{MAX_JOBS, run_bounded};

/// One failed batch item: the raw input and why it failed.
pub type Failure = (String, Error);

/// Decode every positional argument. Bad inputs are collected, not fatal.
pub fn decode_identifiers(args: &[String]) -> (Vec<Identifier>, Vec<Failure>) {
    let mut idents = Vec::with_capacity(args.len());
    let mut failures = Vec::new();
    for input in args {
        match Identifier::parse(input) {
            Ok(id) => {
                if !id.version_set() {
                    debug!("No version given for [{id}], requesting [{DEFAULT_VERSION}].");
                }
                idents.push(id);
            }
            Err(e) => failures.push((
                input.clone(),
                anyhow!(e).context(format!("failed to parse extension input [{input}]")),
            )),
        }
    }
    (idents, failures)
}

/// Fetch the package of every identifier (at most `MAX_JOBS` at once) and hand
/// the bytes to `then`. Returns the successful outputs and the failures.
pub fn fetch_all<F, Fut, T>(
    gallery: Gallery,
    idents: Vec<Identifier>,
    then: F,
) -> Result<(Vec<(Identifier, T)>, Vec<Failure>)>
where
    F: Fn(Identifier, Vec<u8>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T>> + Send + 'static,
    T: Send + 'static,
{
    let client = gallery.async_client()?;
    let gallery = Arc::new(gallery);
    let then = Arc::new(then);

    let results = run_bounded(idents, MAX_JOBS, move |ident: Identifier| {
        let gallery = gallery.clone();
        let client = client.clone();
        let then = then.clone();
        async move {
            info!(
                "Fetching extension [{}] by [{}] @ [{}].",
                ident.extension_id(),
                ident.publisher(),
                ident.version_or_default()
            );
            let outcome = match gallery.fetch_package(&client, &ident).await {
                Ok(bytes) => then(ident.clone(), bytes).await,
                Err(e) => Err(e.context("failed to fetch gallery extension")),
            };
            (ident, outcome)
        }
    })?;

    let mut ok = Vec::new();
    let mut failures = Vec::new();
    for (ident, outcome) in results {
        match outcome {
            Ok(v) => ok.push((ident, v)),
            Err(e) => failures.push((ident.to_string(), e)),
        }
    }
    Ok((ok, failures))
}

/// Log each failure; fail with a summary when there was at least one.
pub fn finish_batch(verb: &str, total: usize, failures: Vec<Failure>) -> Result<()> {
    if failures.is_empty() {
        return Ok(());
    }
    let mut summary = format!("{} of {total} {verb}(s) failed", failures.len());
    for (input, e) in &failures {
        error!("[{input}] {verb} failed: {e:#}");
        summary.push_str(&format!("\n  - {input}: {e:#}"));
    }
    Err(anyhow!(summary))
}
