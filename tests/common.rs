// 集成测试共用的辅助函数，假服务统一来自 arxiv_digest::test_support

pub use arxiv_digest::test_support::{
    echo_pool, rated_paper, FakeSource, NoExtractor, RecordingSink, Reply, ScriptedService,
};

use arxiv_digest::config::Config;
use arxiv_digest::infrastructure::CredentialPool;
use arxiv_digest::orchestrator::{BatchScheduler, ParallelRunner};
use arxiv_digest::services::SummaryService;
use arxiv_digest::GenerationService;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub fn test_config() -> Config {
    Config {
        retry_cooldown: Duration::ZERO,
        batch_cooldown: Duration::ZERO,
        download_pdfs: false,
        debug_mode: true,
        ..Config::default()
    }
}

pub fn scheduler(
    services: Vec<Arc<dyn GenerationService>>,
    batch_size: Option<usize>,
    max_workers: usize,
) -> BatchScheduler {
    let config = test_config();
    let pool = Arc::new(CredentialPool::from_services(services).unwrap());
    let service = Arc::new(SummaryService::new(&config));
    let runner = ParallelRunner::new(pool, service, max_workers);
    BatchScheduler::new(runner, batch_size, config.batch_cooldown)
}

pub async fn write_topics(dir: &Path, content: &str) -> String {
    let path = dir.join("topics.toml");
    tokio::fs::write(&path, content).await.unwrap();
    path.display().to_string()
}
