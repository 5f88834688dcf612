// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::stream::{self, BoxStream};
use futures::StreamExt;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::settings::ExtractorSettings;
use crate::domain::models::job::ExtractionDepth;
use crate::domain::models::record::{Record, RecordStatus};
use crate::engines::card_parser;
use crate::engines::traits::{CollectRequest, ExtractError, ExtractEvent, Extractor};

// Returns the number of result links currently loaded, or -1 without a feed.
const SCROLL_FEED_JS: &str = r#"(() => {
    const feed = document.querySelector("div[role='feed']");
    if (!feed) { return -1; }
    feed.scrollBy(0, feed.scrollHeight);
    return feed.querySelectorAll("a.hfpxzc").length;
})()"#;

const SCROLL_SETTLE: Duration = Duration::from_millis(1500);
const PANEL_SETTLE: Duration = Duration::from_millis(800);

/// 地图搜索提取器
///
/// 基于 chromiumoxide 驱动浏览器，使用 scraper 解析页面。
/// 浏览器在第一次提取时启动（或连接到远程实例），之后由所有任务共用，
/// 每次提取打开独立的标签页。
pub struct MapsEngine {
    settings: ExtractorSettings,
    browser: OnceCell<Browser>,
}

impl MapsEngine {
    pub fn new(settings: ExtractorSettings) -> Self {
        Self {
            settings,
            browser: OnceCell::new(),
        }
    }

    async fn browser(&self) -> Result<&Browser, ExtractError> {
        self.browser
            .get_or_try_init(|| async {
                let (browser, mut handler) = match &self.settings.remote_debugging_url {
                    Some(url) => {
                        info!("Connecting to remote Chrome instance at: {}", url);
                        Browser::connect(url).await.map_err(|e| {
                            ExtractError::Browser(format!("Failed to connect to remote Chrome: {}", e))
                        })?
                    }
                    None => {
                        let mut builder = BrowserConfig::builder()
                            .no_sandbox()
                            .request_timeout(Duration::from_secs(
                                self.settings.navigation_timeout_secs,
                            ))
                            .arg("--disable-gpu")
                            .arg("--disable-dev-shm-usage")
                            .arg("--lang=en-US");
                        if !self.settings.headless {
                            builder = builder.with_head();
                        }
                        let config = builder.build().map_err(ExtractError::Browser)?;
                        Browser::launch(config)
                            .await
                            .map_err(|e| ExtractError::Browser(e.to_string()))?
                    }
                };

                tokio::spawn(async move {
                    while let Some(event) = handler.next().await {
                        if event.is_err() {
                            break;
                        }
                    }
                });

                Ok(browser)
            })
            .await
    }

    async fn open(&self, request: &CollectRequest) -> Result<PageGuard, ExtractError> {
        if request.cancel.is_cancelled() {
            return Err(ExtractError::Cancelled);
        }
        let browser = self.browser().await?;
        let timeout = Duration::from_secs(self.settings.navigation_timeout_secs);
        let url = request.target.url.as_str();

        let page = tokio::select! {
            _ = request.cancel.cancelled() => return Err(ExtractError::Cancelled),
            opened = tokio::time::timeout(timeout, browser.new_page(url)) => match opened {
                Ok(Ok(page)) => page,
                Ok(Err(e)) => return Err(ExtractError::Navigation(format!("{}: {}", url, e))),
                Err(_) => {
                    return Err(ExtractError::Timeout(format!(
                        "opening {} took longer than {}s",
                        url,
                        timeout.as_secs()
                    )))
                }
            },
        };
        debug!("Opened {}", url);
        Ok(PageGuard::new(page))
    }

    /// 滚动结果列表，直到链接数达到上限、不再增长或达到滚动次数上限
    async fn scroll_feed(&self, page: &Page, cap: usize, cancel: &CancellationToken) -> usize {
        let mut loaded = 0usize;
        let mut stalled = 0u32;

        for round in 0..self.settings.max_scroll_rounds {
            if cancel.is_cancelled() {
                break;
            }
            let count = match page.evaluate(SCROLL_FEED_JS).await {
                Ok(result) => result.into_value::<i64>().unwrap_or(-1),
                Err(e) => {
                    warn!("Scrolling the result feed failed: {}", e);
                    break;
                }
            };
            if count < 0 {
                break;
            }

            let count = count as usize;
            if count >= cap {
                loaded = count;
                break;
            }
            if count <= loaded {
                stalled += 1;
                if stalled >= 2 {
                    break;
                }
            } else {
                stalled = 0;
                loaded = count;
            }
            debug!("Scroll round {}: {} results loaded", round + 1, count);

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(SCROLL_SETTLE) => {}
            }
        }
        loaded
    }

    async fn page_html(page: &Page) -> Result<String, ExtractError> {
        page.content()
            .await
            .map_err(|e| ExtractError::Browser(e.to_string()))
    }
}

#[async_trait]
impl Extractor for MapsEngine {
    async fn collect(
        &self,
        request: &CollectRequest,
    ) -> Result<BoxStream<'static, ExtractEvent>, ExtractError> {
        let guard = self.open(request).await?;
        let page = guard.page()?;
        let base = request.target.url.clone();

        self.scroll_feed(page, request.result_cap, &request.cancel).await;
        let html = Self::page_html(page).await?;

        match request.depth {
            ExtractionDepth::Cards => {
                let mut records = card_parser::parse_cards(&html, &base);
                if records.is_empty() {
                    // A query with a single match lands directly on the place panel.
                    let link = page.url().await.ok().flatten().unwrap_or_else(|| base.to_string());
                    let place = card_parser::parse_place(&html, &link);
                    if !place.name.is_empty() {
                        records.push(place);
                    }
                }
                records.truncate(request.result_cap);
                drop(guard);
                Ok(stream::iter(records.into_iter().map(ExtractEvent::Record)).boxed())
            }
            ExtractionDepth::Detailed => {
                let mut links: VecDeque<String> =
                    card_parser::collect_links(&html, &base).into_iter().collect();
                links.truncate(request.result_cap);

                let cursor = DetailCursor {
                    guard,
                    links,
                    visited: 0,
                    item_timeout: Duration::from_secs(self.settings.item_timeout_secs),
                    pacing: request.pacing,
                    cancel: request.cancel.clone(),
                };
                let announced = stream::iter([ExtractEvent::LinksCollected(cursor.links.len())]);
                Ok(announced.chain(detail_stream(cursor)).boxed())
            }
        }
    }

    fn name(&self) -> &'static str {
        "maps"
    }
}

/// 详情阶段的游标，随事件流一起移动
struct DetailCursor {
    guard: PageGuard,
    links: VecDeque<String>,
    visited: usize,
    item_timeout: Duration,
    pacing: Duration,
    cancel: CancellationToken,
}

fn detail_stream(cursor: DetailCursor) -> impl futures::Stream<Item = ExtractEvent> + Send {
    stream::unfold(cursor, |mut cursor| async move {
        if cursor.cancel.is_cancelled() {
            return None;
        }
        let link = cursor.links.pop_front()?;

        if cursor.visited > 0 && !cursor.pacing.is_zero() {
            tokio::select! {
                _ = cursor.cancel.cancelled() => return None,
                _ = tokio::time::sleep(cursor.pacing) => {}
            }
        }
        cursor.visited += 1;

        let record = match cursor.guard.page() {
            Ok(page) => visit_place(page, &link, cursor.visited, cursor.item_timeout).await,
            Err(e) => degraded(&link, RecordStatus::Error, format!("item {}: {}", cursor.visited, e)),
        };
        Some((ExtractEvent::Record(record), cursor))
    })
}

async fn visit_place(page: &Page, link: &str, index: usize, timeout: Duration) -> Record {
    let visit = async {
        page.goto(link)
            .await
            .map_err(|e| ExtractError::Navigation(e.to_string()))?;
        tokio::time::sleep(PANEL_SETTLE).await;
        MapsEngine::page_html(page).await
    };

    match tokio::time::timeout(timeout, visit).await {
        Ok(Ok(html)) => card_parser::parse_place(&html, link),
        Ok(Err(e)) => degraded(link, RecordStatus::Error, format!("item {}: {}", index, e)),
        Err(_) => degraded(
            link,
            RecordStatus::Timeout,
            format!("item {}: timed out after {}s", index, timeout.as_secs()),
        ),
    }
}

fn degraded(link: &str, status: RecordStatus, detail: String) -> Record {
    Record {
        source_link: link.to_string(),
        status,
        status_detail: Some(detail),
        ..Default::default()
    }
}

/// 标签页守卫，释放时关闭标签页
struct PageGuard {
    page: Option<Page>,
}

impl PageGuard {
    fn new(page: Page) -> Self {
        Self { page: Some(page) }
    }

    fn page(&self) -> Result<&Page, ExtractError> {
        self.page
            .as_ref()
            .ok_or_else(|| ExtractError::Browser("page already closed".to_string()))
    }
}

impl Drop for PageGuard {
    fn drop(&mut self) {
        if let Some(page) = self.page.take() {
            if let Ok(handle) = tokio::runtime::Handle::try_current() {
                handle.spawn(async move {
                    if let Err(e) = page.close().await {
                        debug!("Failed to close page: {}", e);
                    }
                });
            }
        }
    }
}
