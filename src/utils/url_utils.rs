// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use url::form_urlencoded::byte_serialize;
use url::{ParseError, Url};

const MAPS_SEARCH_BASE: &str = "https://www.google.com/maps/search/";

/// 地理坐标
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
    /// 地图缩放级别
    pub zoom: u8,
}

/// 构造地图搜索URL
///
/// 查询词以表单编码（空格 → `+`）拼接在搜索路径后，
/// 给定坐标时追加 `/@lat,lng,zoomz` 定位段
pub fn build_search_url(query: &str, coordinate: Option<Coordinate>) -> Result<Url, ParseError> {
    let encoded: String = byte_serialize(query.trim().as_bytes()).collect();
    let mut raw = format!("{}{}", MAPS_SEARCH_BASE, encoded);
    if let Some(c) = coordinate {
        raw.push_str(&format!("/@{},{},{}z", c.latitude, c.longitude, c.zoom));
    }
    Url::parse(&raw)
}

/// 将可能为相对路径的URL转换为绝对路径URL
pub fn resolve_url(base_url: &Url, path: &str) -> Result<Url, ParseError> {
    base_url.join(path)
}
