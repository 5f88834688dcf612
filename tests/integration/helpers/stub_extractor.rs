// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::time::Duration;

use mapscout::domain::models::job::ExtractionDepth;
use mapscout::domain::models::record::{Record, RecordStatus};
use mapscout::engines::traits::{CollectRequest, ExtractError, ExtractEvent, Extractor};

/// 按脚本产出记录的提取器替身
///
/// 每个目标产出 `per_target` 条记录，链接由目标名称和序号生成，
/// 末尾 `duplicates` 条复用前面记录的链接
pub struct StubExtractor {
    per_target: usize,
    duplicates: usize,
    fail_probe: Option<(String, ExtractError)>,
    failures_left: AtomicU32,
    item_delay: Duration,
    panic_on_collect: bool,
    calls: AtomicUsize,
}

impl StubExtractor {
    pub fn new(per_target: usize) -> Self {
        Self {
            per_target,
            duplicates: 0,
            fail_probe: None,
            failures_left: AtomicU32::new(0),
            item_delay: Duration::ZERO,
            panic_on_collect: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_duplicates(mut self, duplicates: usize) -> Self {
        self.duplicates = duplicates.min(self.per_target);
        self
    }

    /// 某个探测词的每次导航都失败
    pub fn failing_probe(mut self, probe: &str, error: ExtractError) -> Self {
        self.fail_probe = Some((probe.to_string(), error));
        self
    }

    /// 前 `n` 次导航失败
    pub fn failing_first(self, n: u32) -> Self {
        self.failures_left.store(n, Ordering::SeqCst);
        self
    }

    pub fn with_item_delay(mut self, delay: Duration) -> Self {
        self.item_delay = delay;
        self
    }

    pub fn panicking(mut self) -> Self {
        self.panic_on_collect = true;
        self
    }

    /// `collect` 被调用的次数
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn records_for(&self, label: &str) -> Vec<Record> {
        let slug: String = label
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
            .collect();
        let unique = self.per_target - self.duplicates;

        (0..self.per_target)
            .map(|i| {
                let link_index = if i < unique || unique == 0 { i } else { i - unique };
                Record {
                    name: format!("{} #{}", label, i),
                    rating: Some(4.5),
                    review_count: Some(10 + i as u32),
                    phone: format!("(512) 555-01{:02}", i),
                    category: "Coffee shop".to_string(),
                    address: format!("{} Congress Ave, Austin, TX", 100 + i),
                    website: None,
                    source_link: format!("https://www.google.com/maps/place/{}/{}", slug, link_index),
                    probe: String::new(),
                    status: RecordStatus::Ok,
                    status_detail: None,
                }
            })
            .collect()
    }
}

#[async_trait]
impl Extractor for StubExtractor {
    async fn collect(
        &self,
        request: &CollectRequest,
    ) -> Result<BoxStream<'static, ExtractEvent>, ExtractError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.panic_on_collect {
            panic!("stub extractor exploded");
        }
        if let Some((probe, error)) = &self.fail_probe {
            if request.target.probe.as_deref() == Some(probe.as_str()) {
                return Err(error.clone());
            }
        }
        if self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(ExtractError::Navigation("connection reset".to_string()));
        }

        let records = self.records_for(&request.target.label);
        let mut events = Vec::with_capacity(records.len() + 1);
        if request.depth == ExtractionDepth::Detailed {
            events.push(ExtractEvent::LinksCollected(records.len()));
        }
        events.extend(records.into_iter().map(ExtractEvent::Record));

        let delay = self.item_delay;
        Ok(stream::iter(events)
            .then(move |event| async move {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                event
            })
            .boxed())
    }

    fn name(&self) -> &'static str {
        "stub"
    }
}
