//! 从总结文本中提取论文评分

use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

use crate::models::DEFAULT_RATING;

pub const MIN_RATING: u32 = 1;
pub const MAX_RATING: u32 = 100;

// 兼容 "6. 论文评分: 85"、"6. **论文评分**：85分" 等写法
static RATING_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"6\.\s*(?:\*\*)?\s*论文评分\s*(?:\*\*)?\s*[:：]\s*(?:\*\*)?\s*([0-9]+)")
        .expect("评分正则无效")
});

/// 提取评分，超出范围时截断到 [1, 100]，找不到时返回 50
pub fn extract_rating(summary_text: &str) -> u32 {
    let normalized = normalize_digits(summary_text);
    let Some(caps) = RATING_LINE.captures(&normalized) else {
        debug!("未找到评分行，使用默认评分 {}", DEFAULT_RATING);
        return DEFAULT_RATING;
    };

    let digits = &caps[1];
    match digits.parse::<u64>() {
        Ok(value) => value.clamp(MIN_RATING as u64, MAX_RATING as u64) as u32,
        // 捕获组只含 ASCII 数字，解析失败只可能是溢出
        Err(_) => MAX_RATING,
    }
}

/// 全角数字 `０`-`９` 转为 ASCII，其他字符不变
fn normalize_digits(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '０'..='９' => char::from(b'0' + (c as u32 - '０' as u32) as u8),
            _ => c,
        })
        .collect()
}
