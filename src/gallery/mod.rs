//! Extension gallery client.
//!
//! Gallery::new(scheme, host) -> base URL for every request
//!   query(term)          -> Paginator over `extensionquery` pages (blocking)
//!   fetch_package(ident) -> `.vsix` bytes (async)
//!
use anyhow::{Context, Result, bail};
use std::time::Duration;
use url::Url;

pub mod extension;
mod get;
pub mod query;

pub use extension::ExtensionMeta;
pub use query::{HttpTransport, Paginator};

/// Sent as `user-agent` on every gallery request.
pub const USER_AGENT: &str = concat!("vsx/", env!("CARGO_PKG_VERSION"));

/// Default per-request timeout for gallery traffic.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct Gallery {
    base_url: Url,
    timeout: Duration,
    target_platform: Option<String>,
}

impl Gallery {
    /// Build a gallery rooted at `{scheme}://{host}/`.
    ///
    /// `host` may carry a path prefix (`my.gallery.com/vs`).
    pub fn new(scheme: &str, host: &str) -> Result<Self> {
        let scheme = scheme.trim().to_ascii_lowercase();
        if scheme != "http" && scheme != "https" {
            bail!("unsupported gallery scheme [{scheme}] (expected http or https)");
        }
        let host = host.trim().trim_end_matches('/');
        if host.is_empty() {
            bail!("no gallery host configured (use --gallery-host or VSX_GALLERY_HOST)");
        }
        let raw = format!("{scheme}://{host}/");
        let base_url = Url::parse(&raw).with_context(|| format!("invalid gallery URL [{raw}]"))?;
        Ok(Self {
            base_url,
            timeout: DEFAULT_TIMEOUT,
            target_platform: None,
        })
    }

    /// Restrict package downloads to one platform build (`linux-x64`, ...).
    /// Both parts are required; otherwise the gallery's universal build is used.
    pub fn with_target_platform(mut self, os: Option<&str>, arch: Option<&str>) -> Self {
        self.target_platform = match (os, arch) {
            (Some(os), Some(arch)) if !os.is_empty() && !arch.is_empty() => {
                Some(format!("{os}-{arch}"))
            }
            _ => None,
        };
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn target_platform(&self) -> Option<&str> {
        self.target_platform.as_deref()
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .with_context(|| format!("failed to join [{path}] onto [{}]", self.base_url))
    }

    /// Lazily page through search results for `term`.
    ///
    /// Must not be called from inside an async runtime (the transport blocks).
    pub fn query(&self, term: &str) -> Result<Paginator<HttpTransport>> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(self.timeout)
            .build()
            .context("failed to build HTTP client")?;
        let url = self.endpoint(query::QUERY_PATH)?;
        Ok(Paginator::new(HttpTransport::new(client, url), term))
    }

    /// Async client for package downloads.
    pub fn async_client(&self) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(self.timeout)
            .build()
            .context("failed to build HTTP client")
    }
}
