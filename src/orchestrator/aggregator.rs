//! 结果汇总
//!
//! 把 (论文, 总结结果) 合并成日报条目，并按评分从高到低排列。

use crate::models::{Paper, ReportEntry, SummaryResult};

/// 合并并排序
///
/// 使用稳定排序：评分相同的论文保持输入顺序。
pub fn merge_and_sort(results: Vec<(Paper, SummaryResult)>) -> Vec<ReportEntry> {
    let mut entries: Vec<ReportEntry> = results
        .into_iter()
        .map(|(paper, result)| ReportEntry::from_parts(paper, result))
        .collect();
    entries.sort_by(|a, b| b.rating.cmp(&a.rating));
    entries
}

/// 任务异常终止时的占位结果
pub fn join_failure_placeholder(error: &tokio::task::JoinError) -> SummaryResult {
    SummaryResult::placeholder(format!("总结失败: {}", error))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DEFAULT_RATING;
    use crate::test_support::sample_paper;

    fn pair(id: &str, rating: u32) -> (Paper, SummaryResult) {
        (sample_paper(id), SummaryResult::new(format!("summary {}", id), rating))
    }

    #[test]
    fn test_sorted_descending() {
        let entries = merge_and_sort(vec![pair("a", 30), pair("b", 90), pair("c", 60)]);
        let ratings: Vec<u32> = entries.iter().map(|e| e.rating).collect();
        assert_eq!(ratings, vec![90, 60, 30]);
    }

    #[test]
    fn test_ties_keep_input_order() {
        let entries = merge_and_sort(vec![
            pair("first", 70),
            pair("low", 10),
            pair("second", 70),
            pair("third", 70),
        ]);
        let ids: Vec<&str> = entries.iter().map(|e| e.arxiv_id.as_str()).collect();
        assert_eq!(ids, vec!["first", "second", "third", "low"]);
    }

    #[test]
    fn test_empty_input() {
        assert!(merge_and_sort(Vec::new()).is_empty());
    }

    #[tokio::test]
    async fn test_join_failure_becomes_placeholder() {
        let handle = tokio::spawn(async { panic!("boom") });
        let error = handle.await.unwrap_err();

        let result = join_failure_placeholder(&error);
        assert_eq!(result.rating, DEFAULT_RATING);
        assert!(result.degraded);
        assert!(result.summary_text.starts_with("总结失败: "));
    }
}
