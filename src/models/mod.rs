pub mod loaders;
pub mod paper;
pub mod topic;

pub use loaders::load_topics;
pub use paper::{Paper, ReportEntry, SummaryResult, DEFAULT_RATING};
pub use topic::Topic;
