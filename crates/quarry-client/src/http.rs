use std::sync::Arc;
use std::time::Duration;

use quarry_core::config::RendererOptions;
use quarry_core::error::AppError;
use quarry_core::traits::{Probe, Renderer, Session};
use reqwest::{Client, Proxy};
use url::Url;

use crate::extractor;
use crate::identity::IdentityPool;

const DEFAULT_USER_AGENT: &str = "quarry/0.1 (batch extractor)";

/// Static-page renderer using reqwest.
///
/// The "rendered document" is the raw response body: no JavaScript runs, so
/// this only suits pages whose target content is server-rendered. Because the
/// document never changes after navigation, readiness probes answer
/// [`Probe::Absent`] instead of waiting for the timeout.
#[derive(Clone)]
pub struct HttpRenderer {
    options: RendererOptions,
    identities: Arc<IdentityPool>,
}

impl HttpRenderer {
    pub fn new(options: &RendererOptions) -> Self {
        let identities = IdentityPool::new(options.user_agents.clone());
        Self::with_identities(options, identities)
    }

    pub fn with_identities(options: &RendererOptions, identities: IdentityPool) -> Self {
        Self {
            options: options.clone(),
            identities: Arc::new(identities),
        }
    }
}

impl Renderer for HttpRenderer {
    type Session = HttpSession;

    async fn open(&self) -> Result<HttpSession, AppError> {
        let user_agent = self
            .identities
            .pick_user_agent()
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());
        tracing::debug!(%user_agent, "Opening HTTP session");

        let mut builder = Client::builder()
            .user_agent(user_agent)
            .timeout(self.options.navigation_timeout);

        if let Some(proxy) = &self.options.proxy {
            let proxy = Proxy::all(proxy)
                .map_err(|e| AppError::RendererInit(format!("Invalid proxy '{proxy}': {e}")))?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| AppError::RendererInit(format!("Failed to build HTTP client: {e}")))?;

        Ok(HttpSession {
            client,
            timeout: self.options.navigation_timeout,
            document: None,
        })
    }
}

/// One HTTP client plus the most recently fetched document.
pub struct HttpSession {
    client: Client,
    timeout: Duration,
    document: Option<String>,
}

impl Session for HttpSession {
    async fn navigate(&mut self, url: &str) -> Result<(), AppError> {
        self.document = None;
        let target = parse_target(url)?;

        let response = self.client.get(target).send().await.map_err(|e| {
            if e.is_timeout() {
                AppError::Navigation(format!(
                    "{url} did not respond within {} seconds",
                    self.timeout.as_secs()
                ))
            } else if e.is_connect() {
                AppError::Navigation(format!("Connection failed: {e}"))
            } else {
                AppError::Navigation(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Navigation(format!(
                "HTTP {} for {}",
                status.as_u16(),
                url
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| AppError::Navigation(format!("Failed to read response body: {e}")))?;
        self.document = Some(body);
        Ok(())
    }

    async fn probe(&mut self, locator: &str) -> Result<Probe, AppError> {
        let document = self.loaded()?;
        if extractor::matches(document, locator)? {
            Ok(Probe::Present)
        } else {
            Ok(Probe::Absent)
        }
    }

    async fn document(&mut self) -> Result<String, AppError> {
        self.loaded().map(str::to_string)
    }

    async fn close(self) {
        tracing::debug!("HTTP session closed");
    }
}

impl HttpSession {
    fn loaded(&self) -> Result<&str, AppError> {
        self.document
            .as_deref()
            .ok_or_else(|| AppError::Navigation("No page loaded".into()))
    }
}

/// Parse a navigation target, allowing only `http` and `https`.
pub(crate) fn parse_target(url: &str) -> Result<Url, AppError> {
    let parsed =
        Url::parse(url).map_err(|e| AppError::Navigation(format!("Invalid URL '{url}': {e}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        scheme => Err(AppError::Navigation(format!(
            "URL scheme '{scheme}' is not allowed (only http/https)"
        ))),
    }
}
