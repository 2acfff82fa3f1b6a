pub mod digest_writer;
pub mod pdf_cache;
pub mod prompt;
pub mod rating;
pub mod smtp_sink;
pub mod summary_service;
pub mod text_extractor;

pub use digest_writer::{DigestSink, DigestWriter};
pub use pdf_cache::PdfCache;
pub use prompt::{build_prompt, build_summary_prompt, PromptKind};
pub use rating::extract_rating;
pub use smtp_sink::{LettreTransport, MailTransport, SmtpSecurity, SmtpSink};
pub use summary_service::SummaryService;
pub use text_extractor::{PdfTextExtractor, TextExtractor};
