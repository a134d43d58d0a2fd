//! Static HTTP probe driver
//!
//! Fetches each page once with `reqwest` and answers marker queries against
//! the returned markup. There is no script execution, so hover and click are
//! accepted but reveal nothing; pages whose categories only appear after
//! interaction will classify as leaves under this driver.

use crate::config::SiteConfig;
use crate::probe::{ElementHandle, HtmlPage, Marker, PageProbe, ProbeFactory};
use crate::{ProbeError, ProbeResult};
use async_trait::async_trait;
use reqwest::{redirect::Policy, Client};
use std::time::Duration;
use url::Url;

/// Builds the HTTP client shared by every probe session
///
/// # Arguments
///
/// * `site` - Site settings providing the user agent
/// * `navigation_timeout` - Upper bound for a single page load
pub fn build_http_client(
    site: &SiteConfig,
    navigation_timeout: Duration,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(site.user_agent.clone())
        .timeout(navigation_timeout)
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Opens [`HttpProbe`] sessions that share one connection pool
#[derive(Debug, Clone)]
pub struct HttpProbeFactory {
    client: Client,
    base: Url,
}

impl HttpProbeFactory {
    pub fn new(client: Client, base: Url) -> Self {
        Self { client, base }
    }

    /// Builds a factory from site settings
    pub fn from_site(site: &SiteConfig, navigation_timeout: Duration) -> crate::Result<Self> {
        let base = Url::parse(&site.base_url)
            .map_err(|e| crate::ConfigError::InvalidUrl(format!("{}: {}", site.base_url, e)))?;
        let client = build_http_client(site, navigation_timeout)?;
        Ok(Self::new(client, base))
    }
}

#[async_trait]
impl ProbeFactory for HttpProbeFactory {
    async fn open(&self) -> ProbeResult<Box<dyn PageProbe>> {
        Ok(Box::new(HttpProbe {
            client: self.client.clone(),
            base: self.base.clone(),
            page: None,
        }))
    }
}

/// One static page session
#[derive(Debug)]
pub struct HttpProbe {
    client: Client,
    base: Url,
    page: Option<HtmlPage>,
}

impl HttpProbe {
    fn page(&self) -> ProbeResult<&HtmlPage> {
        self.page.as_ref().ok_or(ProbeError::NotNavigated)
    }

    fn page_mut(&mut self) -> ProbeResult<&mut HtmlPage> {
        self.page.as_mut().ok_or(ProbeError::NotNavigated)
    }

    async fn fetch(&self, target: &Url, timeout: Duration) -> ProbeResult<String> {
        let url = target.to_string();

        let response = self
            .client
            .get(target.clone())
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify_error(&url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProbeError::Navigation {
                url,
                message: format!("HTTP {}", status.as_u16()),
            });
        }

        response.text().await.map_err(|e| classify_error(&url, e))
    }
}

fn classify_error(url: &str, error: reqwest::Error) -> ProbeError {
    if error.is_timeout() {
        ProbeError::NavigationTimeout {
            url: url.to_string(),
        }
    } else {
        ProbeError::Navigation {
            url: url.to_string(),
            message: error.to_string(),
        }
    }
}

#[async_trait]
impl PageProbe for HttpProbe {
    async fn navigate(&mut self, url: &str, timeout: Duration) -> ProbeResult<()> {
        let target = self.base.join(url).map_err(|e| ProbeError::Navigation {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        // Handles from the previous page must not resolve against the new one
        self.page = None;
        let body = self.fetch(&target, timeout).await?;
        tracing::trace!("Loaded {} ({} bytes)", target, body.len());
        self.page = Some(HtmlPage::new(body));
        Ok(())
    }

    async fn find_all(
        &mut self,
        marker: &Marker,
        _timeout: Duration,
    ) -> ProbeResult<Vec<ElementHandle>> {
        self.page_mut()?.select(marker)
    }

    async fn find_in(
        &mut self,
        scope: ElementHandle,
        marker: &Marker,
    ) -> ProbeResult<Vec<ElementHandle>> {
        self.page_mut()?.select_in(scope, marker)
    }

    async fn attribute(
        &mut self,
        element: ElementHandle,
        name: &str,
    ) -> ProbeResult<Option<String>> {
        self.page()?.attribute(element, name)
    }

    async fn text(&mut self, element: ElementHandle) -> ProbeResult<String> {
        self.page()?.text(element)
    }

    async fn hover(&mut self, element: ElementHandle) -> ProbeResult<()> {
        self.page()?.check(element)
    }

    async fn click(&mut self, element: ElementHandle) -> ProbeResult<()> {
        self.page()?.check(element)
    }

    async fn wait_visible(&mut self, marker: &Marker, _timeout: Duration) -> ProbeResult<bool> {
        // Static markup never changes after load
        self.page()?.has_visible(marker)
    }

    async fn close(&mut self) -> ProbeResult<()> {
        self.page = None;
        Ok(())
    }
}
