//! 并行总结一批论文 - 编排层
//!
//! 用 Semaphore 限制同时运行的任务数，每篇论文一个 tokio 任务，
//! 按输入顺序等待结果。任务异常终止时转换为占位结果，不影响其他论文。

use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, error};

use crate::error::AppResult;
use crate::infrastructure::CredentialPool;
use crate::models::{Paper, SummaryResult};
use crate::orchestrator::aggregator::join_failure_placeholder;
use crate::services::SummaryService;
use crate::workflow::PaperCtx;

pub struct ParallelRunner {
    pool: Arc<CredentialPool>,
    service: Arc<SummaryService>,
    max_workers: usize,
}

impl ParallelRunner {
    /// `max_workers` 为 0 或超过凭证数量时取凭证数量
    pub fn new(pool: Arc<CredentialPool>, service: Arc<SummaryService>, max_workers: usize) -> Self {
        let size = pool.size();
        let max_workers = if max_workers == 0 { size } else { max_workers.min(size) };
        Self {
            pool,
            service,
            max_workers,
        }
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// 并行总结一批论文，返回顺序与输入一致
    ///
    /// `offset` 是这批论文中第一篇在全部列表中的位置，
    /// 第 i 篇使用 `pool.client_at(offset + i)`。
    /// 同一凭证上的论文依次执行，同时执行的论文不超过 `max_workers` 篇。
    pub async fn run(
        &self,
        papers: Vec<Paper>,
        offset: usize,
        batch_num: usize,
    ) -> AppResult<Vec<(Paper, SummaryResult)>> {
        let semaphore = Arc::new(Semaphore::new(self.max_workers));
        let mut handles = Vec::with_capacity(papers.len());

        // 先排队等凭证通道，再占并发名额：
        // 等待忙碌凭证的论文不占名额，空闲凭证上的论文可以先开始
        for (i, paper) in papers.into_iter().enumerate() {
            let position = offset + i;
            let client = self.pool.client_at(position).clone();
            let ctx = PaperCtx::new(position, batch_num, client.index());

            let semaphore = semaphore.clone();
            let service = self.service.clone();
            let task_paper = paper.clone();
            let handle = tokio::spawn(async move {
                let _lane = client.acquire().await;
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(e) => return SummaryResult::placeholder(format!("并发控制失败: {}", e)),
                };
                debug!("{} 开始总结", ctx);
                service.summarize_in_lane(&task_paper, &client).await
            });
            handles.push((ctx, paper, handle));
        }

        let mut results = Vec::with_capacity(handles.len());
        for (ctx, paper, handle) in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => {
                    error!("{} 任务执行失败: {}", ctx, e);
                    join_failure_placeholder(&e)
                }
            };
            results.push((paper, result));
        }

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::GenerationService;
    use crate::config::Config;
    use crate::test_support::{echo_pool, rated_paper, Reply, ScriptedService};
    use std::time::Duration;

    fn service() -> Arc<SummaryService> {
        Arc::new(SummaryService::new(&Config::default()).with_retry_cooldown(Duration::ZERO))
    }

    #[test]
    fn test_max_workers_clamped_to_pool() {
        let (services, _, _) = echo_pool(3, Duration::ZERO);
        let pool = Arc::new(CredentialPool::from_services(services).unwrap());

        assert_eq!(ParallelRunner::new(pool.clone(), service(), 0).max_workers(), 3);
        assert_eq!(ParallelRunner::new(pool.clone(), service(), 10).max_workers(), 3);
        assert_eq!(ParallelRunner::new(pool, service(), 2).max_workers(), 2);
    }

    #[tokio::test]
    async fn test_results_keep_input_order() {
        let (services, stats, _) = echo_pool(2, Duration::from_millis(20));
        let pool = Arc::new(CredentialPool::from_services(services).unwrap());
        let runner = ParallelRunner::new(pool, service(), 0);

        let papers = vec![rated_paper("a", 10), rated_paper("b", 90), rated_paper("c", 40)];
        let results = runner.run(papers, 0, 1).await.unwrap();

        let ids: Vec<&str> = results.iter().map(|(p, _)| p.arxiv_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        let ratings: Vec<u32> = results.iter().map(|(_, r)| r.rating).collect();
        assert_eq!(ratings, vec![10, 90, 40]);
        assert!(stats.max_in_flight() <= 2);
        assert_eq!(stats.total(), 3);
    }

    #[tokio::test]
    async fn test_offset_selects_credential() {
        let (services, _, seen) = echo_pool(3, Duration::ZERO);
        let pool = Arc::new(CredentialPool::from_services(services).unwrap());
        let runner = ParallelRunner::new(pool, service(), 1);

        runner
            .run(vec![rated_paper("x", 1), rated_paper("y", 2)], 4, 2)
            .await
            .unwrap();

        let seen = seen.lock().unwrap().clone();
        assert_eq!(seen, vec![(1, "paper-1".to_string()), (2, "paper-2".to_string())]);
    }

    #[tokio::test]
    async fn test_failed_paper_does_not_affect_others() {
        let failing: Arc<dyn GenerationService> = Arc::new(ScriptedService::new(vec![
            Reply::Error("a".into()),
            Reply::Error("b".into()),
            Reply::Error("c".into()),
        ]));
        let working: Arc<dyn GenerationService> =
            Arc::new(ScriptedService::new(vec![Reply::text("6. 论文评分: 77")]));
        let pool = Arc::new(CredentialPool::from_services(vec![failing, working]).unwrap());
        let runner = ParallelRunner::new(pool, service(), 0);

        let results = runner
            .run(vec![rated_paper("bad", 1), rated_paper("good", 2)], 0, 1)
            .await
            .unwrap();

        assert!(results[0].1.degraded);
        assert_eq!(results[0].1.rating, 50);
        assert!(results[0].1.summary_text.starts_with("总结失败: "));
        assert_eq!(results[1].1.rating, 77);
        assert!(!results[1].1.degraded);
    }

    #[tokio::test]
    async fn test_single_worker_runs_one_at_a_time() {
        let (services, stats, _) = echo_pool(3, Duration::from_millis(10));
        let pool = Arc::new(CredentialPool::from_services(services).unwrap());
        let runner = ParallelRunner::new(pool, service(), 1);

        let papers = (0..6).map(|i| rated_paper(&i.to_string(), 10 + i)).collect();
        let results = runner.run(papers, 0, 1).await.unwrap();

        assert_eq!(results.len(), 6);
        assert_eq!(stats.max_in_flight(), 1);
        assert_eq!(stats.total(), 6);
    }

    #[tokio::test]
    async fn test_busy_credential_does_not_hold_a_worker() {
        // 凭证 0 很慢，凭证 1 很快；第 3 篇排在凭证 0 后面时不应占住名额
        let slow = Arc::new(ScriptedService::new(vec![
            Reply::Delayed(Duration::from_millis(400), "6. 论文评分: 10".into()),
            Reply::Delayed(Duration::from_millis(400), "6. 论文评分: 20".into()),
        ]));
        let fast = Arc::new(ScriptedService::new(vec![
            Reply::Delayed(Duration::from_millis(10), "6. 论文评分: 30".into()),
            Reply::Delayed(Duration::from_millis(10), "6. 论文评分: 40".into()),
        ]));
        let services: Vec<Arc<dyn GenerationService>> = vec![
            slow.clone() as Arc<dyn GenerationService>,
            fast.clone() as Arc<dyn GenerationService>,
        ];
        let pool = Arc::new(CredentialPool::from_services(services).unwrap());
        let runner = ParallelRunner::new(pool, service(), 2);

        let papers = vec![rated_paper("a", 1), rated_paper("b", 2), rated_paper("c", 3), rated_paper("d", 4)];
        let task = tokio::spawn(async move { runner.run(papers, 0, 1).await });

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(slow.calls(), 1);
        assert_eq!(fast.calls(), 2);

        let results = task.await.unwrap().unwrap();
        let ratings: Vec<u32> = results.iter().map(|(_, r)| r.rating).collect();
        assert_eq!(ratings, vec![10, 30, 20, 40]);
    }
}
