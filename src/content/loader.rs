//! Content loader - fetches and normalizes posts through a content client

use std::collections::HashSet;
use std::sync::Arc;

use super::{PostDetail, PostSummary, ResultPage};
use crate::client::ContentClient;
use crate::config::CmsConfig;
use crate::error::{BlogError, Result, ValidationError};
use crate::listing::{InvalidRecords, ListingState};

/// Upper bound on the pages a full walk visits
pub const MAX_WALK_PAGES: usize = 1000;

/// Loads posts of the configured document type
#[derive(Clone)]
pub struct ContentLoader {
    client: Arc<dyn ContentClient>,
    doc_type: String,
    page_size: usize,
}

impl ContentLoader {
    /// Create a new content loader
    pub fn new(client: Arc<dyn ContentClient>, config: &CmsConfig) -> Self {
        Self {
            client,
            doc_type: config.document_type.clone(),
            page_size: config.page_size.max(1),
        }
    }

    pub fn client(&self) -> &Arc<dyn ContentClient> {
        &self.client
    }

    /// First listing page, ready to be extended with `load_more`
    pub async fn first_page(&self) -> Result<ListingState> {
        let (state, _) = self.first_page_with(InvalidRecords::Reject).await?;
        Ok(state)
    }

    /// First listing page; with [`InvalidRecords::Skip`] the records that
    /// fail validation are returned next to the state instead of failing it
    pub async fn first_page_with(
        &self,
        invalid: InvalidRecords,
    ) -> Result<(ListingState, Vec<ValidationError>)> {
        let page = self
            .client
            .query_by_type(&self.doc_type, self.page_size)
            .await?;
        let (posts, skipped) = normalize_page_with(&page, invalid)?;
        let state = ListingState::new(posts, page.next_page);
        tracing::debug!(
            "Loaded first page: {} posts, more: {}",
            state.posts().len(),
            state.has_more()
        );
        Ok((state, skipped))
    }

    /// A single post by uid
    pub async fn post(&self, uid: &str) -> Result<PostDetail> {
        let raw = self
            .client
            .get_by_uid(&self.doc_type, uid)
            .await?
            .ok_or_else(|| BlogError::NotFound {
                doc_type: self.doc_type.clone(),
                uid: uid.to_string(),
            })?;
        Ok(PostDetail::from_raw(&raw)?)
    }

    /// Uids of every post, in listing order
    pub async fn all_uids(&self) -> Result<Vec<String>> {
        let mut uids = Vec::new();
        self.walk(|page| {
            uids.extend(page.results.iter().filter_map(|d| d.uid.clone()));
            Ok(())
        })
        .await?;
        Ok(uids)
    }

    /// Every valid post summary, in listing order; invalid records are
    /// logged and left out
    pub async fn all_summaries(&self) -> Result<Vec<PostSummary>> {
        let mut posts = Vec::new();
        self.walk(|page| {
            let (valid, skipped) = normalize_page_with(page, InvalidRecords::Skip)?;
            for e in skipped {
                tracing::warn!("Skipping post: {}", e);
            }
            posts.extend(valid);
            Ok(())
        })
        .await?;
        Ok(posts)
    }

    /// Visit every page of the document type
    ///
    /// Stops early, keeping what was visited, when a cursor repeats or after
    /// [`MAX_WALK_PAGES`] pages.
    async fn walk<F>(&self, mut visit: F) -> Result<()>
    where
        F: FnMut(&ResultPage) -> Result<()>,
    {
        let mut seen = HashSet::new();
        let mut page = self
            .client
            .query_by_type(&self.doc_type, self.page_size)
            .await?;
        for visited in 1.. {
            visit(&page)?;
            let cursor = match page.next_page.as_deref() {
                Some(cursor) if !cursor.is_empty() => cursor.to_string(),
                _ => return Ok(()),
            };
            if visited >= MAX_WALK_PAGES {
                tracing::warn!("Stopped after {} pages; the rest is not visited", visited);
                return Ok(());
            }
            if !seen.insert(cursor.clone()) {
                tracing::warn!("Page cursor {:?} seen before, stopping", cursor);
                return Ok(());
            }
            page = self.client.fetch_page(&cursor).await?;
        }
        Ok(())
    }
}

/// Normalize every record of a page; any invalid record rejects the page
pub fn normalize_page(page: &ResultPage) -> Result<Vec<PostSummary>> {
    let (posts, _) = normalize_page_with(page, InvalidRecords::Reject)?;
    Ok(posts)
}

/// Normalize the records of a page under an [`InvalidRecords`] policy
///
/// With `Skip`, the valid posts keep their order and the errors of the
/// others are returned; with `Reject`, the first error fails the page.
pub fn normalize_page_with(
    page: &ResultPage,
    invalid: InvalidRecords,
) -> Result<(Vec<PostSummary>, Vec<ValidationError>)> {
    let mut posts = Vec::with_capacity(page.results.len());
    let mut skipped = Vec::new();
    for raw in &page.results {
        match PostSummary::from_raw(raw) {
            Ok(post) => posts.push(post),
            Err(e) if invalid == InvalidRecords::Skip => skipped.push(e),
            Err(e) => return Err(e.into()),
        }
    }
    Ok((posts, skipped))
}
