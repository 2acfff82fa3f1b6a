pub mod arxiv_client;
pub mod llm_client;

pub use arxiv_client::{fetch_window, ArxivClient, PaperSource};
pub use llm_client::{ChunkStream, GenerationService, LlmClient};
