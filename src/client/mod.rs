//! Content API clients
//!
//! [`ContentClient`] is the seam between the blog and the hosted document
//! store. [`PrismicClient`] talks to the real API; [`MemoryClient`] serves
//! documents from memory for offline builds and tests.

mod memory;
mod prismic;

use async_trait::async_trait;

pub use memory::MemoryClient;
pub use prismic::PrismicClient;

use crate::config::CmsConfig;
use crate::content::{RawDocument, ResultPage};
use crate::error::Result;

/// Typed queries against a remote document store
#[async_trait]
pub trait ContentClient: Send + Sync {
    /// First page of all documents of `doc_type`
    async fn query_by_type(&self, doc_type: &str, page_size: usize) -> Result<ResultPage>;

    /// Page addressed by a cursor returned in `ResultPage::next_page`
    async fn fetch_page(&self, cursor: &str) -> Result<ResultPage>;

    /// A single document by its uid, `None` when it does not exist
    async fn get_by_uid(&self, doc_type: &str, uid: &str) -> Result<Option<RawDocument>>;
}

/// Build the HTTP client described by the configuration
pub fn from_config(config: &CmsConfig) -> Result<PrismicClient> {
    PrismicClient::new(config)
}
