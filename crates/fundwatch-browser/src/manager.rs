//! Browser process pool.
//!
//! `BrowserManager` owns a fixed number of session slots. A slot lazily
//! launches its browser on first use, hands out one page at a time, and is
//! torn down and relaunched once it has served more pages than the configured
//! ceiling. Headless Chromium leaks memory over long runs; recycling bounds it.

use crate::actions::PageActions;
use crate::error::{BrowserError, Result};
use async_trait::async_trait;
use fundwatch_core::BrowserConfig;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

/// Starts browser processes.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    /// Handle to a running browser
    type Browser: BrowserHandle;

    /// Start one browser process
    async fn launch(&self) -> Result<Self::Browser>;
}

/// A running browser process.
#[async_trait]
pub trait BrowserHandle: Send + Sync + 'static {
    /// Page type handed out to adapters
    type Page: PageActions + Clone + 'static;

    /// Open a fresh page
    async fn new_page(&self) -> Result<Self::Page>;

    /// Terminate the browser process
    async fn close(&mut self) -> Result<()>;
}

/// Pool sizing and recycling limits.
#[derive(Debug, Clone)]
pub struct ManagerSettings {
    /// Number of slots
    pub pool_size: usize,
    /// Pages a browser may serve before it is recycled
    pub max_pages_per_browser: u32,
    /// Launch attempts before giving up
    pub launch_attempts: u32,
    /// Pause between launch attempts
    pub launch_retry_delay: Duration,
}

impl ManagerSettings {
    /// Settings from the application's browser configuration.
    #[must_use]
    pub fn from_config(config: &BrowserConfig) -> Self {
        Self {
            pool_size: config.pool_size.max(1),
            max_pages_per_browser: config.max_pages_per_browser,
            launch_attempts: config.launch_attempts.max(1),
            launch_retry_delay: Duration::from_millis(config.launch_retry_delay_ms),
        }
    }
}

/// One slot of the pool.
struct BrowserSession<B: BrowserHandle> {
    browser: Option<B>,
    pages_served: u32,
    in_use: bool,
    open_pages: Vec<(u64, B::Page)>,
}

impl<B: BrowserHandle> BrowserSession<B> {
    fn empty() -> Self {
        Self {
            browser: None,
            pages_served: 0,
            in_use: false,
            open_pages: Vec::new(),
        }
    }

    /// Close pages first, then the process. An exited browser can no longer
    /// close its pages.
    async fn teardown(&mut self) {
        for (page_id, page) in self.open_pages.drain(..) {
            if let Err(e) = page.close().await {
                tracing::debug!("Failed to close page {} during teardown: {}", page_id, e);
            }
        }

        if let Some(mut browser) = self.browser.take() {
            if let Err(e) = browser.close().await {
                tracing::warn!("Failed to close browser cleanly: {}", e);
            }
        }

        self.pages_served = 0;
    }
}

/// A page checked out of the pool. Must be handed back through
/// [`BrowserManager::release`].
#[derive(Debug)]
pub struct PageLease<P> {
    slot: usize,
    page_id: u64,
    page: P,
}

impl<P> PageLease<P> {
    /// The leased page.
    pub fn page(&self) -> &P {
        &self.page
    }

    /// Slot the page belongs to.
    #[must_use]
    pub fn slot(&self) -> usize {
        self.slot
    }
}

/// Arena-style pool of browser sessions indexed by slot.
pub struct BrowserManager<L: BrowserLauncher> {
    launcher: L,
    settings: ManagerSettings,
    slots: Mutex<Vec<BrowserSession<L::Browser>>>,
    launches: AtomicU64,
    next_page_id: AtomicU64,
    closed: AtomicBool,
}

impl<L: BrowserLauncher> BrowserManager<L> {
    /// Create a manager. No browser is launched until the first page is requested.
    pub fn new(launcher: L, settings: ManagerSettings) -> Self {
        let slots = (0..settings.pool_size.max(1))
            .map(|_| BrowserSession::empty())
            .collect();
        Self {
            launcher,
            settings,
            slots: Mutex::new(slots),
            launches: AtomicU64::new(0),
            next_page_id: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        }
    }

    /// Launch every slot up front so launch failures surface before the run starts.
    pub async fn warm_up(&self) -> Result<()> {
        let mut slots = self.slots.lock().await;
        for session in slots.iter_mut() {
            if session.browser.is_none() {
                session.browser = Some(self.launch_with_retry().await?);
                session.pages_served = 0;
            }
        }
        Ok(())
    }

    /// Check out a page from the first free slot.
    ///
    /// Launches the slot's browser if needed and recycles it once it has
    /// served more than `max_pages_per_browser` pages.
    pub async fn get_page(&self) -> Result<PageLease<<L::Browser as BrowserHandle>::Page>> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(BrowserError::ShutDown);
        }

        let mut slots = self.slots.lock().await;
        let slot = slots
            .iter()
            .position(|s| !s.in_use)
            .ok_or(BrowserError::PoolExhausted(slots.len()))?;
        let session = &mut slots[slot];

        if session.browser.is_some() && session.pages_served > self.settings.max_pages_per_browser
        {
            tracing::info!(
                "Recycling browser in slot {} after {} pages",
                slot,
                session.pages_served
            );
            session.teardown().await;
        }

        if session.browser.is_none() {
            session.browser = Some(self.launch_with_retry().await?);
            session.pages_served = 0;
        }

        let page = match Self::open_page(session).await {
            Ok(page) => page,
            Err(e) => {
                // A browser that cannot open pages is treated as dead
                tracing::warn!("Slot {} failed to open a page ({}), relaunching", slot, e);
                session.teardown().await;
                session.browser = Some(self.launch_with_retry().await?);
                Self::open_page(session).await?
            }
        };

        let page_id = self.next_page_id.fetch_add(1, Ordering::SeqCst);
        session.pages_served += 1;
        session.in_use = true;
        session.open_pages.push((page_id, page.clone()));

        tracing::debug!(
            "Checked out page {} from slot {} ({} served)",
            page_id,
            slot,
            session.pages_served
        );

        Ok(PageLease {
            slot,
            page_id,
            page,
        })
    }

    /// Close a leased page and free its slot.
    pub async fn release(&self, lease: PageLease<<L::Browser as BrowserHandle>::Page>) {
        let mut slots = self.slots.lock().await;
        if let Some(session) = slots.get_mut(lease.slot) {
            session.open_pages.retain(|(id, _)| *id != lease.page_id);
            session.in_use = false;
        }
        drop(slots);

        if let Err(e) = lease.page.close().await {
            tracing::debug!("Failed to close page {}: {}", lease.page_id, e);
        }
    }

    /// Close all pages, then all browsers. Further `get_page` calls fail.
    pub async fn shutdown(&self) {
        self.closed.store(true, Ordering::SeqCst);
        let mut slots = self.slots.lock().await;
        for session in slots.iter_mut() {
            session.teardown().await;
            session.in_use = false;
        }
        tracing::info!("Browser pool shut down");
    }

    /// Total browser launches so far, including relaunches.
    pub fn launch_count(&self) -> u64 {
        self.launches.load(Ordering::SeqCst)
    }

    /// Pages served by the browser currently running in `slot`.
    pub async fn pages_served(&self, slot: usize) -> Option<u32> {
        self.slots.lock().await.get(slot).map(|s| s.pages_served)
    }

    async fn open_page(
        session: &BrowserSession<L::Browser>,
    ) -> Result<<L::Browser as BrowserHandle>::Page> {
        match &session.browser {
            Some(browser) => browser.new_page().await,
            None => Err(BrowserError::ChromiumError(
                "slot has no running browser".to_string(),
            )),
        }
    }

    async fn launch_with_retry(&self) -> Result<L::Browser> {
        let attempts = self.settings.launch_attempts.max(1);
        let mut last_error = None;

        for attempt in 1..=attempts {
            match self.launcher.launch().await {
                Ok(browser) => {
                    self.launches.fetch_add(1, Ordering::SeqCst);
                    tracing::info!("Browser launched (attempt {}/{})", attempt, attempts);
                    return Ok(browser);
                }
                Err(e) => {
                    tracing::warn!("Browser launch attempt {}/{} failed: {}", attempt, attempts, e);
                    last_error = Some(e);
                    if attempt < attempts {
                        tokio::time::sleep(self.settings.launch_retry_delay).await;
                    }
                }
            }
        }

        Err(BrowserError::Launch(format!(
            "gave up after {attempts} attempts: {}",
            last_error.map_or_else(|| "unknown error".to_string(), |e| e.to_string())
        )))
    }
}
