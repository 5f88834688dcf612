// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use regex::Regex;
use once_cell::sync::Lazy;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static DECIMAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+(?:[.,]\d+)?").unwrap());
static NON_DIGIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\d]").unwrap());

/// 规范化文本
///
/// 将连续空白折叠为单个空格并去除首尾空白
pub fn clean_text(text: &str) -> String {
    WHITESPACE.replace_all(text, " ").trim().to_string()
}

/// 宽松解析小数
///
/// 取文本中第一个数字片段，逗号视作小数点（"4,5" → 4.5）
pub fn parse_decimal(text: &str) -> Option<f64> {
    let found = DECIMAL.find(text)?;
    found.as_str().replace(',', ".").parse().ok()
}

/// 宽松解析整数
///
/// 丢弃所有非数字字符后解析，例如 "(1,234)" → 1234
pub fn parse_count(text: &str) -> Option<u32> {
    let digits = NON_DIGIT.replace_all(text, "");
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

/// 评分必须落在 0.0–5.0 区间内
pub fn parse_rating(text: &str) -> Option<f64> {
    parse_decimal(text).filter(|r| (0.0..=5.0).contains(r))
}

/// 按字符截断文本，超长时追加省略号
pub fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    out.push_str("...");
    out
}
