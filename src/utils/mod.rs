//! Utilities: logging setup (level from -v/-q, RUST_LOG override) and the
//! bounded job runner shared by batch commands.
//!
//! Key items:
//!   init_logging / derive_level
//!   run_bounded

use std::future::Future;
use std::sync::Arc;

/// Logging helpers.
pub mod logging {
    use tracing::Level;
    use tracing_subscriber::EnvFilter;

    pub fn derive_level(verbose: u8, quiet: bool) -> Level {
        if quiet {
            return Level::ERROR;
        }
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    }

    /// Install the global subscriber. Logs go to stderr; stdout is reserved for
    /// command output. `RUST_LOG`, when set, replaces the derived level.
    pub fn init_logging(level: Level) {
        let directive = format!("vsx={},warn", level.as_str().to_ascii_lowercase());
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(level >= Level::DEBUG)
            .without_time()
            .try_init();
    }
}

pub use logging::{derive_level, init_logging};

/// Maximum concurrently running jobs in batch commands.
pub const MAX_JOBS: usize = 5;

/// Run `job` for every input with at most `limit` in flight, returning the
/// outputs in input order.
///
/// Creates (and tears down) its own multi-thread runtime, so callers stay
/// synchronous.
pub fn run_bounded<I, F, Fut, T>(inputs: Vec<I>, limit: usize, job: F) -> anyhow::Result<Vec<T>>
where
    I: Send + 'static,
    F: Fn(I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    use anyhow::Context;
    use tokio::sync::Semaphore;
    use tokio::task::JoinSet;

    let rt = tokio::runtime::Runtime::new().context("Failed to create Tokio runtime")?;
    rt.block_on(async move {
        let permits = Arc::new(Semaphore::new(limit.max(1)));
        let job = Arc::new(job);
        let mut set = JoinSet::new();

        for (idx, input) in inputs.into_iter().enumerate() {
            let permit = permits
                .clone()
                .acquire_owned()
                .await
                .context("job semaphore closed")?;
            let job = job.clone();
            set.spawn(async move {
                let out = job(input).await;
                drop(permit);
                (idx, out)
            });
        }

        let mut outputs = Vec::with_capacity(set.len());
        while let Some(joined) = set.join_next().await {
            outputs.push(joined.context("batch job panicked")?);
        }
        outputs.sort_by_key(|(idx, _)| *idx);
        Ok::<_, anyhow::Error>(outputs.into_iter().map(|(_, out)| out).collect())
    })
}
