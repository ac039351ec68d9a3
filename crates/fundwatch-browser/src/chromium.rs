use crate::actions::{NavigationResponse, PageActions};
use crate::blocking::RequestBlocker;
use crate::error::{BrowserError, Result};
use crate::launch::LaunchOptions;
use crate::manager::{BrowserHandle, BrowserLauncher};
use async_trait::async_trait;
use chromiumoxide::browser::Browser;
use chromiumoxide::cdp::browser_protocol::fetch::{
    ContinueRequestParams, EnableParams, EventRequestPaused, FailRequestParams, RequestPattern,
};
use chromiumoxide::cdp::browser_protocol::network::ErrorReason;
use chromiumoxide::Page;
use fundwatch_core::BrowserConfig;
use futures_util::stream::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Interval between selector probes while waiting.
const SELECTOR_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Launches headless Chromium through chromiumoxide.
pub struct ChromiumLauncher {
    options: LaunchOptions,
    blocker: Arc<RequestBlocker>,
}

impl ChromiumLauncher {
    pub fn new(config: &BrowserConfig) -> Self {
        Self {
            options: LaunchOptions::from_config(config),
            blocker: Arc::new(RequestBlocker::from_config(config)),
        }
    }
}

#[async_trait]
impl BrowserLauncher for ChromiumLauncher {
    type Browser = ChromiumBrowser;

    async fn launch(&self) -> Result<ChromiumBrowser> {
        let config = self.options.to_chromium_config()?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| BrowserError::Launch(e.to_string()))?;

        // Spawn browser handler
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::trace!("browser handler event error: {}", e);
                }
            }
        });

        Ok(ChromiumBrowser {
            browser,
            handler_task,
            blocker: self.blocker.clone(),
            navigation_timeout: self.options.request_timeout,
        })
    }
}

/// A running Chromium process.
pub struct ChromiumBrowser {
    browser: Browser,
    handler_task: JoinHandle<()>,
    blocker: Arc<RequestBlocker>,
    navigation_timeout: Duration,
}

#[async_trait]
impl BrowserHandle for ChromiumBrowser {
    type Page = ChromiumPage;

    async fn new_page(&self) -> Result<ChromiumPage> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| BrowserError::ChromiumError(e.to_string()))?;

        let interceptor = if self.blocker.is_empty() {
            None
        } else {
            Some(Arc::new(
                start_interception(page.clone(), self.blocker.clone()).await?,
            ))
        };

        Ok(ChromiumPage {
            page,
            interceptor,
            navigation_timeout: self.navigation_timeout,
        })
    }

    async fn close(&mut self) -> Result<()> {
        let closed = self
            .browser
            .close()
            .await
            .map(|_| ())
            .map_err(|e| BrowserError::ChromiumError(e.to_string()));
        if let Err(e) = self.browser.wait().await {
            tracing::debug!("waiting for browser exit failed: {}", e);
        }
        self.handler_task.abort();
        closed
    }
}

/// Route every request of `page` through the blocker.
async fn start_interception(page: Page, blocker: Arc<RequestBlocker>) -> Result<JoinHandle<()>> {
    let mut events = page
        .event_listener::<EventRequestPaused>()
        .await
        .map_err(|e| BrowserError::ChromiumError(e.to_string()))?;

    page.execute(
        EnableParams::builder()
            .pattern(RequestPattern::builder().url_pattern("*").build())
            .build(),
    )
    .await
    .map_err(|e| BrowserError::ChromiumError(e.to_string()))?;

    Ok(tokio::spawn(async move {
        while let Some(event) = events.next().await {
            let outcome = if blocker.should_block(event.resource_type.as_ref(), &event.request.url)
            {
                page.execute(FailRequestParams::new(
                    event.request_id.clone(),
                    ErrorReason::BlockedByClient,
                ))
                .await
                .map(|_| ())
            } else {
                page.execute(ContinueRequestParams::new(event.request_id.clone()))
                    .await
                    .map(|_| ())
            };

            if let Err(e) = outcome {
                tracing::trace!("interception reply for {} failed: {}", event.request.url, e);
            }
        }
    }))
}

/// A Chromium tab.
#[derive(Clone)]
pub struct ChromiumPage {
    page: Page,
    interceptor: Option<Arc<JoinHandle<()>>>,
    navigation_timeout: Duration,
}

#[async_trait]
impl PageActions for ChromiumPage {
    async fn navigate(&self, url: &str) -> Result<NavigationResponse> {
        let navigation = async {
            self.page.goto(url).await?;
            self.page.wait_for_navigation_response().await
        };

        let request = match tokio::time::timeout(self.navigation_timeout, navigation).await {
            Err(_) => {
                return Err(BrowserError::Timeout(format!(
                    "navigation to {url} exceeded {:?}",
                    self.navigation_timeout
                )))
            }
            Ok(Err(e)) => return Err(BrowserError::NavigationError(e.to_string())),
            Ok(Ok(request)) => request,
        };

        let status = request
            .as_ref()
            .and_then(|r| r.response.as_ref())
            .and_then(|r| u16::try_from(r.status).ok());
        let final_url = self.page.url().await.ok().flatten();

        Ok(NavigationResponse { status, final_url })
    }

    async fn wait_for_selector(&self, selector: &str, timeout_ms: u64) -> Result<()> {
        let deadline = Instant::now() + Duration::from_millis(timeout_ms);
        loop {
            if self.page.find_element(selector).await.is_ok() {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(BrowserError::SelectorNotFound(selector.to_string()));
            }
            tokio::time::sleep(SELECTOR_POLL_INTERVAL).await;
        }
    }

    async fn content(&self) -> Result<String> {
        self.page
            .content()
            .await
            .map_err(|e| BrowserError::ChromiumError(e.to_string()))
    }

    async fn close(&self) -> Result<()> {
        if let Some(interceptor) = &self.interceptor {
            interceptor.abort();
        }
        self.page
            .clone()
            .close()
            .await
            .map_err(|e| BrowserError::ChromiumError(e.to_string()))
    }
}
