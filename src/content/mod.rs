//! Content module - raw documents, post models and content processing

pub mod loader;
mod post;
mod raw;
pub mod reading_time;
mod richtext;

pub use loader::ContentLoader;
pub use post::{PostDetail, PostSummary, Section, TextBlock};
pub use raw::{Field, RawDocument, ResultPage};
pub use richtext::RichTextRenderer;
