//! In-memory content client

use async_trait::async_trait;
use reqwest::Url;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::ContentClient;
use crate::content::{RawDocument, ResultPage};
use crate::error::{BlogError, Result};

/// Serves documents held in memory, paged like the real API
///
/// Cursors have the form `memory://<type>?page=<n>&pageSize=<k>`.
pub struct MemoryClient {
    documents: Vec<RawDocument>,
    latency: Option<Duration>,
    requests: AtomicUsize,
}

impl MemoryClient {
    /// Create a client over `documents`, in the order given
    pub fn new(documents: Vec<RawDocument>) -> Self {
        Self {
            documents,
            latency: None,
            requests: AtomicUsize::new(0),
        }
    }

    /// Load documents from a JSON fixture
    ///
    /// The file holds either an array of documents or a search response
    /// with a `results` array.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let value: serde_json::Value = serde_json::from_str(&content)?;
        let documents: Vec<RawDocument> = match value {
            serde_json::Value::Object(mut map) => match map.remove("results") {
                Some(results) => serde_json::from_value(results)?,
                None => {
                    return Err(BlogError::Decode(format!(
                        "fixture {:?} has no `results` array",
                        path.as_ref()
                    )))
                }
            },
            other => serde_json::from_value(other)?,
        };
        tracing::debug!("Loaded {} documents from {:?}", documents.len(), path.as_ref());
        Ok(Self::new(documents))
    }

    /// Delay every response, to simulate a slow network
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Number of requests served so far
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    async fn begin_request(&self) {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    /// One page of a type; `None` when the offset does not fit in `usize`
    fn page(&self, doc_type: &str, page: usize, page_size: usize) -> Option<ResultPage> {
        let page_size = page_size.max(1);
        let offset = page.checked_sub(1)?.checked_mul(page_size)?;
        let matching: Vec<&RawDocument> = self
            .documents
            .iter()
            .filter(|d| d.doc_type == doc_type)
            .collect();
        let total_pages = matching.len().div_ceil(page_size);

        let results = matching
            .iter()
            .skip(offset)
            .take(page_size)
            .map(|d| (*d).clone())
            .collect();

        let next_page = (page < total_pages).then(|| {
            format!(
                "memory://{}?page={}&pageSize={}",
                doc_type,
                page + 1,
                page_size
            )
        });

        Some(ResultPage {
            page: page as u32,
            total_pages: total_pages as u32,
            total_results_size: matching.len() as u32,
            results,
            next_page,
        })
    }
}

#[async_trait]
impl ContentClient for MemoryClient {
    async fn query_by_type(&self, doc_type: &str, page_size: usize) -> Result<ResultPage> {
        self.begin_request().await;
        Ok(self
            .page(doc_type, 1, page_size)
            .unwrap_or_default())
    }

    async fn fetch_page(&self, cursor: &str) -> Result<ResultPage> {
        self.begin_request().await;
        let invalid = || BlogError::Config(format!("invalid page cursor {:?}", cursor));

        let url = Url::parse(cursor).map_err(|_| invalid())?;
        if url.scheme() != "memory" {
            return Err(invalid());
        }
        let doc_type = url.host_str().ok_or_else(invalid)?.to_string();

        let mut page = None;
        let mut page_size = None;
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "page" => page = value.parse::<usize>().ok(),
                "pageSize" => page_size = value.parse::<usize>().ok(),
                _ => {}
            }
        }

        match (page, page_size) {
            (Some(page), Some(page_size)) => {
                self.page(&doc_type, page, page_size).ok_or_else(invalid)
            }
            _ => Err(invalid()),
        }
    }

    async fn get_by_uid(&self, doc_type: &str, uid: &str) -> Result<Option<RawDocument>> {
        self.begin_request().await;
        Ok(self
            .documents
            .iter()
            .find(|d| d.doc_type == doc_type && d.uid.as_deref() == Some(uid))
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    fn doc(uid: &str, doc_type: &str) -> RawDocument {
        serde_json::from_value(json!({
            "id": uid,
            "uid": uid,
            "type": doc_type,
            "data": { "title": uid, "author": "A" }
        }))
        .unwrap()
    }

    fn uids(page: &ResultPage) -> Vec<&str> {
        page.results.iter().filter_map(|d| d.uid.as_deref()).collect()
    }

    #[tokio::test]
    async fn test_pages_by_type() {
        let client = MemoryClient::new(vec![
            doc("a", "post"),
            doc("about", "page"),
            doc("b", "post"),
            doc("c", "post"),
        ]);

        let first = client.query_by_type("post", 2).await.unwrap();
        assert_eq!(uids(&first), vec!["a", "b"]);
        assert_eq!(first.total_pages, 2);
        let cursor = first.next_page.unwrap();
        assert_eq!(cursor, "memory://post?page=2&pageSize=2");

        let second = client.fetch_page(&cursor).await.unwrap();
        assert_eq!(uids(&second), vec!["c"]);
        assert_eq!(second.next_page, None);
        assert_eq!(client.request_count(), 2);
    }

    #[tokio::test]
    async fn test_get_by_uid() {
        let client = MemoryClient::new(vec![doc("a", "post"), doc("about", "page")]);
        assert!(client.get_by_uid("post", "a").await.unwrap().is_some());
        assert!(client.get_by_uid("post", "about").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rejects_foreign_cursor() {
        let client = MemoryClient::new(Vec::new());
        assert!(client.fetch_page("https://example.com/?page=2").await.is_err());
        assert!(client.fetch_page("memory://post?page=0&pageSize=1").await.is_err());

        let huge = format!("memory://post?page={}&pageSize=2", usize::MAX);
        assert!(client.fetch_page(&huge).await.is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "{}",
            json!({ "results": [{ "uid": "x", "type": "post", "data": {} }] })
        )
        .unwrap();

        let client = MemoryClient::from_file(file.path()).unwrap();
        assert_eq!(client.documents.len(), 1);
    }
}
