//! 分批调度器 - 编排层
//!
//! ## 职责
//!
//! 把全部论文切成连续的批次，逐批交给 [`ParallelRunner`]：
//!
//! 1. **硬屏障**：一批内的所有任务完成后才开始下一批
//! 2. **批间冷却**：两批之间等待冷却时间，最后一批之后不等待
//! 3. **凭证轮换**：论文在全部列表中的位置决定凭证，跨批次连续
//! 4. **统一排序**：全部批次完成后合并结果并排序一次

use std::ops::Range;
use std::time::Duration;
use tracing::info;

use crate::error::AppResult;
use crate::models::{Paper, ReportEntry};
use crate::orchestrator::aggregator::merge_and_sort;
use crate::orchestrator::parallel_runner::ParallelRunner;
use crate::utils::logging::{log_batch_complete, log_batch_start};

pub struct BatchScheduler {
    runner: ParallelRunner,
    /// None 表示不分批
    batch_size: Option<usize>,
    cooldown: Duration,
}

impl BatchScheduler {
    pub fn new(runner: ParallelRunner, batch_size: Option<usize>, cooldown: Duration) -> Self {
        Self {
            runner,
            batch_size: batch_size.filter(|&size| size > 0),
            cooldown,
        }
    }

    pub async fn run(&self, papers: Vec<Paper>) -> AppResult<Vec<ReportEntry>> {
        let total = papers.len();
        let batches = partition(total, self.batch_size);
        let total_batches = batches.len();

        if let Some(size) = self.batch_size {
            info!(
                "📋 共 {} 篇论文，每批 {} 篇，分 {} 批处理 (最大并发 {})",
                total, size, total_batches, self.runner.max_workers()
            );
        }

        let mut results = Vec::with_capacity(total);
        for (i, range) in batches.into_iter().enumerate() {
            let batch_num = i + 1;
            log_batch_start(batch_num, total_batches, range.start + 1, range.end, total);

            let batch = papers[range.clone()].to_vec();
            let batch_len = batch.len();
            let batch_results = self.runner.run(batch, range.start, batch_num).await?;

            let success = batch_results.iter().filter(|(_, r)| !r.degraded).count();
            log_batch_complete(batch_num, success, batch_len);
            results.extend(batch_results);

            if batch_num < total_batches && !self.cooldown.is_zero() {
                info!("⏳ 等待 {} 秒后处理下一批...", self.cooldown.as_secs());
                tokio::time::sleep(self.cooldown).await;
            }
        }

        Ok(merge_and_sort(results))
    }
}

/// 把 `len` 篇论文切成连续的批次
///
/// 不分批时只有一批；没有论文时没有批次。
pub fn partition(len: usize, batch_size: Option<usize>) -> Vec<Range<usize>> {
    if len == 0 {
        return Vec::new();
    }
    match batch_size {
        Some(size) if size > 0 => (0..len)
            .step_by(size)
            .map(|start| start..(start + size).min(len))
            .collect(),
        _ => vec![0..len],
    }
}
