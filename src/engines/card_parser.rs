// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

//! 结果列表和详情面板的 HTML 解析
//!
//! 每个字段独立读取，读不到即为空，不视为错误。

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use url::Url;

use crate::domain::models::record::{Record, RecordStatus};
use crate::utils::text::{clean_text, parse_count, parse_rating};
use crate::utils::url_utils::resolve_url;

fn selector(css: &str) -> Selector {
    Selector::parse(css).unwrap()
}

static CARD: Lazy<Selector> = Lazy::new(|| selector("div[role='feed'] div.Nv2PK"));
static CARD_LINK: Lazy<Selector> = Lazy::new(|| selector("a.hfpxzc"));
static CARD_NAME: Lazy<Selector> = Lazy::new(|| selector("div.fontHeadlineSmall"));
static CARD_RATING: Lazy<Selector> = Lazy::new(|| selector("span.MW4etd"));
static CARD_REVIEWS: Lazy<Selector> = Lazy::new(|| selector("span.UY7F9"));
static CARD_INFO: Lazy<Selector> = Lazy::new(|| selector("div.W4Efsd div.W4Efsd"));
static CARD_PHONE: Lazy<Selector> = Lazy::new(|| selector("span.UsdlK"));
static CARD_WEBSITE: Lazy<Selector> = Lazy::new(|| selector("a[data-value='Website']"));

static PLACE_NAME: Lazy<Selector> = Lazy::new(|| selector("h1.DUwDvf"));
static PLACE_RATING: Lazy<Selector> = Lazy::new(|| selector("div.F7nice span[aria-hidden='true']"));
static PLACE_REVIEWS: Lazy<Selector> = Lazy::new(|| selector("div.F7nice span[aria-label]"));
static PLACE_CATEGORY: Lazy<Selector> = Lazy::new(|| selector("button.DkEaL"));
static PLACE_ADDRESS: Lazy<Selector> =
    Lazy::new(|| selector("button[data-item-id='address'] div.Io6YTe"));
static PLACE_PHONE: Lazy<Selector> =
    Lazy::new(|| selector("button[data-item-id^='phone:tel:'] div.Io6YTe"));
static PLACE_WEBSITE: Lazy<Selector> = Lazy::new(|| selector("a[data-item-id='authority']"));

fn first_text(scope: ElementRef<'_>, selector: &Selector) -> Option<String> {
    scope
        .select(selector)
        .map(|el| clean_text(&el.text().collect::<String>()))
        .find(|text| !text.is_empty())
}

fn first_attr(scope: ElementRef<'_>, selector: &Selector, attr: &str) -> Option<String> {
    scope
        .select(selector)
        .filter_map(|el| el.value().attr(attr))
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
}

fn absolute(base: &Url, href: &str) -> String {
    resolve_url(base, href)
        .map(|url| url.to_string())
        .unwrap_or_else(|_| href.to_string())
}

/// 结果列表中所有商家链接，按出现顺序去重
pub fn collect_links(html: &str, base: &Url) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut seen = HashSet::new();
    document
        .root_element()
        .select(&CARD_LINK)
        .filter_map(|el| el.value().attr("href"))
        .map(|href| absolute(base, href))
        .filter(|link| seen.insert(link.clone()))
        .collect()
}

/// 解析结果列表中的卡片
///
/// 没有商家链接的卡片被跳过
pub fn parse_cards(html: &str, base: &Url) -> Vec<Record> {
    let document = Html::parse_document(html);
    document
        .root_element()
        .select(&CARD)
        .filter_map(|card| parse_card(card, base))
        .collect()
}

fn parse_card(card: ElementRef<'_>, base: &Url) -> Option<Record> {
    let source_link = first_attr(card, &CARD_LINK, "href").map(|href| absolute(base, &href))?;

    let name = first_text(card, &CARD_NAME)
        .or_else(|| first_attr(card, &CARD_LINK, "aria-label"))
        .unwrap_or_default();

    // "Cafe · $$ · 1 Main St"
    let info_parts: Vec<String> = card
        .select(&CARD_INFO)
        .next()
        .map(|info| {
            info.text()
                .collect::<String>()
                .split('·')
                .map(clean_text)
                .filter(|part| !part.is_empty())
                .collect()
        })
        .unwrap_or_default();
    let category = info_parts.first().cloned().unwrap_or_default();
    let address = if info_parts.len() > 1 {
        info_parts.last().cloned().unwrap_or_default()
    } else {
        String::new()
    };

    let record = Record {
        rating: first_text(card, &CARD_RATING).and_then(|t| parse_rating(&t)),
        review_count: first_text(card, &CARD_REVIEWS).and_then(|t| parse_count(&t)),
        phone: first_text(card, &CARD_PHONE).unwrap_or_default(),
        website: first_attr(card, &CARD_WEBSITE, "href"),
        status: if name.is_empty() {
            RecordStatus::Partial
        } else {
            RecordStatus::Ok
        },
        name,
        category,
        address,
        source_link,
        ..Default::default()
    };
    Some(record)
}

/// 解析商家详情面板
pub fn parse_place(html: &str, source_link: &str) -> Record {
    let document = Html::parse_document(html);
    let root = document.root_element();

    let name = first_text(root, &PLACE_NAME).unwrap_or_default();
    let address = first_text(root, &PLACE_ADDRESS).unwrap_or_default();
    let review_count = first_attr(root, &PLACE_REVIEWS, "aria-label")
        .or_else(|| first_text(root, &PLACE_REVIEWS))
        .and_then(|t| parse_count(&t));

    let status = if name.is_empty() || address.is_empty() {
        RecordStatus::Partial
    } else {
        RecordStatus::Ok
    };

    Record {
        name,
        rating: first_text(root, &PLACE_RATING).and_then(|t| parse_rating(&t)),
        review_count,
        phone: first_text(root, &PLACE_PHONE).unwrap_or_default(),
        category: first_text(root, &PLACE_CATEGORY).unwrap_or_default(),
        address,
        website: first_attr(root, &PLACE_WEBSITE, "href"),
        source_link: source_link.to_string(),
        status,
        ..Default::default()
    }
}
