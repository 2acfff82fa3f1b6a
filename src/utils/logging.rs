/// 日志工具模块
///
/// 提供批次进度输出和文本截断的辅助函数
use tracing::info;

/// 记录程序启动信息
///
/// # 参数
/// - `workers`: 最大并发数
/// - `mode`: 总结模式的描述
pub fn log_startup(workers: usize, mode: &str) {
    info!("{}", "=".repeat(60));
    info!("🚀 arXiv论文监控系统启动 - {}", mode);
    info!("📊 最大并发数: {}", workers);
    info!("{}", "=".repeat(60));
}

/// 记录批次开始信息
///
/// # 参数
/// - `batch_num`: 批次编号（从 1 开始）
/// - `total_batches`: 批次总数
/// - `start`: 起始论文编号
/// - `end`: 结束论文编号
/// - `total`: 论文总数
pub fn log_batch_start(
    batch_num: usize,
    total_batches: usize,
    start: usize,
    end: usize,
    total: usize,
) {
    info!("{}", "=".repeat(60));
    info!("📦 开始处理第 {}/{} 批", batch_num, total_batches);
    info!("📄 本批论文: {}-{} / 共 {} 篇", start, end, total);
    info!("{}", "=".repeat(60));
}

/// 记录批次完成信息
///
/// # 参数
/// - `batch_num`: 批次编号
/// - `success`: 成功数量
/// - `total`: 本批论文数
pub fn log_batch_complete(batch_num: usize, success: usize, total: usize) {
    info!("{}", "─".repeat(60));
    info!("✓ 第 {} 批完成: 成功 {}/{}", batch_num, success, total);
    info!("{}", "─".repeat(60));
}

/// 打印一个主题的最终统计
pub fn print_topic_stats(topic: &str, total: usize, elapsed: std::time::Duration) {
    info!("{}", "=".repeat(60));
    info!("📊 主题 {} 处理完成", topic);
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("📄 论文数: {}，耗时 {:.1} 秒", total, elapsed.as_secs_f64());
    info!("{}", "=".repeat(60));
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大字符数
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("短标题", 10), "短标题");
        assert_eq!(truncate_text("一二三四五六", 3), "一二三...");
    }
}
