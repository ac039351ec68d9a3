use super::{CampaignData, ScanOutcome, SiteAdapter};
use crate::amount::{parse_count, parse_raised, parse_target};
use crate::error::{Result, ScanError};
use async_trait::async_trait;
use fundwatch_browser::{BrowserError, BrowserLauncher, BrowserManager, PageActions};
use fundwatch_core::{DomSelectors, Platform};
use scraper::{ElementRef, Html, Selector};
use std::sync::Arc;

/// Reads DOM-rendered campaign pages through a managed headless browser.
pub struct BrowserAdapter<L: BrowserLauncher> {
    manager: Arc<BrowserManager<L>>,
    selectors: DomSelectors,
    selector_timeout_ms: u64,
}

impl<L: BrowserLauncher> BrowserAdapter<L> {
    #[must_use]
    pub fn new(
        manager: Arc<BrowserManager<L>>,
        selectors: DomSelectors,
        selector_timeout_ms: u64,
    ) -> Self {
        Self {
            manager,
            selectors,
            selector_timeout_ms,
        }
    }

    async fn scan_page<P: PageActions>(&self, page: &P, url: &str) -> Result<ScanOutcome> {
        let response = page.navigate(url).await?;
        match response.status {
            Some(404) => {
                tracing::info!("Campaign page gone: {}", url);
                return Ok(ScanOutcome::NotFound);
            }
            Some(status) if status >= 400 => {
                return Err(ScanError::Http {
                    status,
                    url: url.to_string(),
                });
            }
            _ => {}
        }

        let html = page.content().await?;
        if let Some(outcome) = self.detect_terminal_state(&html) {
            return Ok(outcome);
        }

        self.wait_for_fields(page, url).await?;
        let html = page.content().await?;
        // banners may be rendered by scripts after the first snapshot
        if let Some(outcome) = self.detect_terminal_state(&html) {
            return Ok(outcome);
        }
        Ok(ScanOutcome::Extracted(extract(&html, &self.selectors)))
    }

    /// Banner checks that end the scan before field extraction.
    fn detect_terminal_state(&self, html: &str) -> Option<ScanOutcome> {
        let text = page_text(html);
        let mentions = |phrases: &[String]| {
            phrases
                .iter()
                .any(|phrase| text.contains(&phrase.to_lowercase()))
        };

        if mentions(&self.selectors.paused_phrases) {
            return Some(ScanOutcome::Paused);
        }
        if mentions(&self.selectors.zero_donation_phrases) {
            let mut data = extract(html, &self.selectors);
            data.raised_amount = Some("0".to_string());
            data.donation_count = Some(0);
            return Some(ScanOutcome::ZeroDonations(data));
        }
        None
    }

    /// Wait for the field selectors together; fails only if none appear.
    async fn wait_for_fields<P: PageActions>(&self, page: &P, url: &str) -> Result<()> {
        let selectors = [
            &self.selectors.title,
            &self.selectors.raised,
            &self.selectors.goal,
            &self.selectors.donation_count,
        ];
        let waits = selectors
            .iter()
            .map(|selector| page.wait_for_selector(selector, self.selector_timeout_ms));
        let results = futures::future::join_all(waits).await;

        let found = results.iter().filter(|r| r.is_ok()).count();
        if found > 0 {
            tracing::debug!("{}/{} field selectors present on {}", found, selectors.len(), url);
            return Ok(());
        }

        let unexpected = results
            .into_iter()
            .filter_map(std::result::Result::err)
            .find(|e| !matches!(e, BrowserError::SelectorNotFound(_)));
        match unexpected {
            Some(error) => Err(error.into()),
            None => Err(ScanError::ElementsNotFound(url.to_string())),
        }
    }
}

#[async_trait]
impl<L> SiteAdapter for BrowserAdapter<L>
where
    L: BrowserLauncher + 'static,
{
    fn platform(&self) -> Platform {
        Platform::GoFundMe
    }

    async fn scan(&self, url: &str) -> Result<ScanOutcome> {
        let lease = self.manager.get_page().await?;
        let outcome = self.scan_page(lease.page(), url).await;
        self.manager.release(lease).await;
        outcome
    }
}

/// Elements whose text never reaches the reader.
const HIDDEN_TEXT_PARENTS: [&str; 4] = ["script", "style", "noscript", "template"];

/// Lowercased visible text of a document.
fn page_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let visible: Vec<&str> = document
        .root_element()
        .descendants()
        .filter_map(|node| {
            let text = node.value().as_text()?;
            let hidden = node.ancestors().any(|ancestor| {
                ancestor
                    .value()
                    .as_element()
                    .is_some_and(|el| HIDDEN_TEXT_PARENTS.contains(&el.name()))
            });
            (!hidden).then_some(&**text)
        })
        .collect();
    visible.join(" ").to_lowercase()
}

fn select_first<'a>(document: &'a Html, css: &str) -> Option<ElementRef<'a>> {
    match Selector::parse(css) {
        Ok(selector) => document.select(&selector).next(),
        Err(e) => {
            tracing::warn!("Invalid selector '{}': {}", css, e);
            None
        }
    }
}

fn element_text(element: ElementRef<'_>) -> Option<String> {
    let text = element.text().collect::<Vec<_>>().join(" ");
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    (!text.is_empty()).then_some(text)
}

/// Read whichever fields are present; missing ones stay `None`.
fn extract(html: &str, selectors: &DomSelectors) -> CampaignData {
    let document = Html::parse_document(html);

    let title = select_first(&document, &selectors.title).and_then(element_text);
    let raised = parse_raised(
        &select_first(&document, &selectors.raised)
            .map(|el| el.inner_html())
            .unwrap_or_default(),
    );
    let target = parse_target(
        &select_first(&document, &selectors.goal)
            .map(|el| el.inner_html())
            .unwrap_or_default(),
    );
    let donation_count = select_first(&document, &selectors.donation_count)
        .and_then(element_text)
        .and_then(|text| parse_count(&text));

    CampaignData::from_amounts(title, raised, target, donation_count)
}
