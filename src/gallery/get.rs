use anyhow::{Context, Result, bail};
use tracing::debug;
use url::Url;

use super::Gallery;
use crate::ident::Identifier;

const ASSET_VSIX_PACKAGE: &str = "Microsoft.VisualStudio.Services.VSIXPackage";

impl Gallery {
    /// URL of the `.vsix` package asset for `ident`.
    pub fn package_url(&self, ident: &Identifier) -> Result<Url> {
        let path = format!(
            "_apis/public/gallery/publisher/{}/extension/{}/{}/assetbyname/{}",
            ident.publisher(),
            ident.extension_id(),
            ident.version_or_default(),
            ASSET_VSIX_PACKAGE
        );
        let mut url = self.endpoint(&path)?;
        if let Some(platform) = self.target_platform() {
            url.query_pairs_mut().append_pair("targetPlatform", platform);
        }
        Ok(url)
    }

    /// Download the full `.vsix` package for `ident` into memory.
    pub async fn fetch_package(
        &self,
        client: &reqwest::Client,
        ident: &Identifier,
    ) -> Result<Vec<u8>> {
        let url = self.package_url(ident)?;
        debug!(%url, "fetching package");

        let response = client
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("failed to execute GET request to [{url}]"))?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .context("failed to read extension response body")?;

        if status.is_client_error() || status.is_server_error() {
            bail!(
                "received HTTP status code [{}] in GET request to [{url}]: {}",
                status.as_u16(),
                String::from_utf8_lossy(&body)
            );
        }

        debug!(bytes = body.len(), %url, "package fetched");
        Ok(body.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn package_url_defaults_to_latest() {
        let g = Gallery::new("https", "gallery.example").unwrap();
        let ident = Identifier::parse("usernamehw.errorlens").unwrap();
        assert_eq!(
            g.package_url(&ident).unwrap().as_str(),
            "https://gallery.example/_apis/public/gallery/publisher/usernamehw/extension/errorlens/latest/assetbyname/Microsoft.VisualStudio.Services.VSIXPackage"
        );
    }

    #[tokio::test]
    async fn package_fetch_returns_body() {
        let host = crate::gallery::canned::serve_once("200 OK", "PK-bytes");
        let g = Gallery::new("http", &host).unwrap();
        let ident = Identifier::parse("a.b@1.0.0").unwrap();
        let bytes = g
            .fetch_package(&g.async_client().unwrap(), &ident)
            .await
            .unwrap();
        assert_eq!(bytes, b"PK-bytes");
    }

    #[tokio::test]
    async fn package_fetch_error_carries_status_and_body() {
        let host = crate::gallery::canned::serve_once("404 Not Found", "no such extension");
        let g = Gallery::new("http", &host).unwrap();
        let ident = Identifier::parse("a.b").unwrap();
        let err = g
            .fetch_package(&g.async_client().unwrap(), &ident)
            .await
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("[404]"), "{msg}");
        assert!(msg.ends_with("no such extension"), "{msg}");
    }

    #[test]
    fn package_url_carries_target_platform() {
        let g = Gallery::new("https", "gallery.example")
            .unwrap()
            .with_target_platform(Some("linux"), Some("x64"));
        let ident = Identifier::parse("a.b@1.0.0").unwrap();
        let url = g.package_url(&ident).unwrap();
        assert!(url.path().contains("/a/extension/b/1.0.0/"));
        assert_eq!(url.query(), Some("targetPlatform=linux-x64"));
    }
}
