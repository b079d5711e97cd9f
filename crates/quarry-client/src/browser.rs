use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use quarry_core::config::RendererOptions;
use quarry_core::error::AppError;
use quarry_core::traits::{Probe, Renderer, Session};
use tokio::task::JoinHandle;

use crate::http::parse_target;
use crate::identity::IdentityPool;

/// Headless-browser renderer using Chromium via the Chrome DevTools Protocol.
///
/// Every [`Renderer::open`] launches its own Chromium process with a single
/// tab; the session navigates that tab from URL to URL and is torn down in
/// [`Session::close`].
///
/// # Example
///
/// ```rust,no_run
/// use quarry_client::ChromiumRenderer;
/// use quarry_core::config::RendererOptions;
/// use quarry_core::traits::{Renderer, Session};
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let renderer = ChromiumRenderer::new(&RendererOptions::default());
/// let mut session = renderer.open().await?;
/// session.navigate("https://example.com").await?;
/// let html = session.document().await?;
/// println!("{}", &html[..200]);
/// session.close().await;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ChromiumRenderer {
    options: RendererOptions,
    identities: Arc<IdentityPool>,
}

impl ChromiumRenderer {
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

    /// Command-line switches for one browser launch.
    ///
    /// Sandboxing and GPU acceleration are always off: neither is needed
    /// for scraping and both crash in containers.
    fn launch_args(&self, user_agent: Option<&str>) -> Vec<String> {
        let mut args = Vec::new();
        if self.options.headless {
            args.push("--headless=new".to_string());
        }
        args.extend(
            [
                "--disable-gpu",
                "--disable-dev-shm-usage",
                "--disable-extensions",
                "--disable-popup-blocking",
                "--no-first-run",
            ]
            .map(String::from),
        );
        if let Some(proxy) = &self.options.proxy {
            args.push(format!("--proxy-server={proxy}"));
        }
        if let Some(ua) = user_agent {
            args.push(format!("--user-agent={ua}"));
        }
        args
    }

    /// Tries to locate the real Chrome/Chromium binary.
    ///
    /// Order: configured `browser_path`, `$CHROME_BIN`, then well-known
    /// install locations. The snap wrapper at `/snap/bin/chromium` drops
    /// unknown flags, so the binary inside the snap is preferred. `None`
    /// lets `chromiumoxide` do its own lookup.
    fn find_chrome_binary(configured: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = configured {
            return Some(path.to_path_buf());
        }

        if let Ok(p) = std::env::var("CHROME_BIN") {
            let path = PathBuf::from(&p);
            if path.exists() {
                return Some(path);
            }
        }

        [
            "/snap/chromium/current/usr/lib/chromium-browser/chrome",
            "/var/lib/flatpak/exports/bin/org.chromium.Chromium",
            "/usr/bin/google-chrome-stable",
            "/usr/bin/google-chrome",
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
        ]
        .iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
    }
}

impl Renderer for ChromiumRenderer {
    type Session = ChromiumSession;

    async fn open(&self) -> Result<ChromiumSession, AppError> {
        let user_agent = self.identities.pick_user_agent();

        let mut builder = BrowserConfig::builder().no_sandbox().disable_default_args();
        if let Some(bin) = Self::find_chrome_binary(self.options.browser_path.as_deref()) {
            tracing::info!("Using Chrome binary: {}", bin.display());
            builder = builder.chrome_executable(bin);
        }
        if !self.options.headless {
            builder = builder.with_head();
        }
        for arg in self.launch_args(user_agent.as_deref()) {
            tracing::debug!(%arg, "Chrome option");
            builder = builder.arg(arg);
        }
        let config = builder
            .build()
            .map_err(|e| AppError::RendererInit(format!("Browser config error: {e}")))?;

        let (mut browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| AppError::RendererInit(format!("Failed to launch browser: {e}")))?;

        // The CDP handler must be polled continuously for the connection to work.
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    tracing::warn!("Browser CDP handler error: {event:?}");
                    break;
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                let _ = browser.close().await;
                handler.abort();
                return Err(AppError::RendererInit(format!("Failed to open tab: {e}")));
            }
        };

        Ok(ChromiumSession {
            browser,
            page,
            handler,
            navigation_timeout: self.options.navigation_timeout,
        })
    }
}

/// One Chromium process and the tab all navigations go through.
pub struct ChromiumSession {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
    navigation_timeout: Duration,
}

impl Session for ChromiumSession {
    async fn navigate(&mut self, url: &str) -> Result<(), AppError> {
        let target = parse_target(url)?;

        match tokio::time::timeout(self.navigation_timeout, self.page.goto(target.as_str())).await
        {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(AppError::Navigation(format!(
                "Failed to navigate to {url}: {e}"
            ))),
            Err(_) => Err(AppError::Navigation(format!(
                "Navigation to {url} did not finish within {} seconds",
                self.navigation_timeout.as_secs()
            ))),
        }
    }

    async fn probe(&mut self, locator: &str) -> Result<Probe, AppError> {
        // `find_element` errors when nothing matches yet.
        match self.page.find_element(locator).await {
            Ok(_) => Ok(Probe::Present),
            Err(_) => Ok(Probe::Pending),
        }
    }

    async fn document(&mut self) -> Result<String, AppError> {
        self.page
            .content()
            .await
            .map_err(|e| AppError::Navigation(format!("Failed to read page content: {e}")))
    }

    async fn close(mut self) {
        let _ = self.page.close().await;
        if let Err(e) = self.browser.close().await {
            tracing::warn!(error = %e, "Browser did not close cleanly");
        }
        let _ = self.browser.wait().await;
        self.handler.abort();
        tracing::debug!("Browser session closed");
    }
}
