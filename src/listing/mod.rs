//! Listing aggregation
//!
//! A listing starts with the first page of posts and grows one page at a
//! time. [`ListingState`] is an immutable value: `load_more` returns the next
//! state instead of changing the current one. [`ListingSession`] owns the
//! state of one reader session and lets a single fetch run at a time.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use crate::client::ContentClient;
use crate::content::loader::normalize_page_with;
use crate::content::PostSummary;
use crate::error::{BlogError, Result, ValidationError};

/// What to do with a fetched record that fails validation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InvalidRecords {
    /// The whole page is rejected and the listing stays as it was
    #[default]
    Reject,
    /// The record is left out and the rest of the page is appended
    Skip,
}

/// Accumulated posts and the locator of the next page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingState {
    posts: Vec<PostSummary>,
    cursor: Option<String>,
}

impl ListingState {
    /// An empty cursor is treated as "no more pages"
    pub fn new(posts: Vec<PostSummary>, cursor: Option<String>) -> Self {
        Self {
            posts,
            cursor: cursor.filter(|c| !c.is_empty()),
        }
    }

    pub fn posts(&self) -> &[PostSummary] {
        &self.posts
    }

    pub fn cursor(&self) -> Option<&str> {
        self.cursor.as_deref()
    }

    /// Whether a "load more" action should be offered
    pub fn has_more(&self) -> bool {
        self.cursor.is_some()
    }

    pub fn into_posts(self) -> Vec<PostSummary> {
        self.posts
    }

    /// Fetch the next page and return the extended state
    ///
    /// The page is appended only when every record in it normalizes; on any
    /// error `self` is left as it was.
    pub async fn load_more(&self, client: &dyn ContentClient) -> Result<ListingState> {
        let (next, _) = self.load_more_with(client, InvalidRecords::Reject).await?;
        Ok(next)
    }

    /// Like [`ListingState::load_more`], with a policy for invalid records
    ///
    /// Records left out under [`InvalidRecords::Skip`] are returned with
    /// the new state.
    pub async fn load_more_with(
        &self,
        client: &dyn ContentClient,
        invalid: InvalidRecords,
    ) -> Result<(ListingState, Vec<ValidationError>)> {
        let cursor = self.cursor.as_deref().ok_or(BlogError::Exhausted)?;
        let page = client.fetch_page(cursor).await?;
        let (fetched, skipped) = normalize_page_with(&page, invalid)?;

        let mut posts = Vec::with_capacity(self.posts.len() + fetched.len());
        posts.extend(self.posts.iter().cloned());
        posts.extend(fetched);

        Ok((ListingState::new(posts, page.next_page), skipped))
    }
}

/// Result of a `load_more` trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// A page was fetched and `appended` posts were added
    Loaded { appended: usize },
    /// Another fetch is still pending; this trigger was ignored
    Busy,
    /// There is no next page
    Exhausted,
}

/// The listing of one reader session
pub struct ListingSession {
    client: Arc<dyn ContentClient>,
    state: RwLock<ListingState>,
    in_flight: AtomicBool,
    invalid: InvalidRecords,
    skipped: AtomicUsize,
}

/// Clears the in-flight flag when the fetch ends, however it ends
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl ListingSession {
    pub fn new(client: Arc<dyn ContentClient>, initial: ListingState) -> Self {
        Self {
            client,
            state: RwLock::new(initial),
            in_flight: AtomicBool::new(false),
            invalid: InvalidRecords::Reject,
            skipped: AtomicUsize::new(0),
        }
    }

    /// Leave out invalid records instead of rejecting their page
    pub fn skip_invalid(mut self) -> Self {
        self.invalid = InvalidRecords::Skip;
        self
    }

    /// Records left out so far
    pub fn skipped(&self) -> usize {
        self.skipped.load(Ordering::Relaxed)
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> ListingState {
        self.state
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn has_more(&self) -> bool {
        self.snapshot().has_more()
    }

    /// Whether a fetch is pending
    pub fn is_loading(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Fetch and append the next page, unless a fetch is already pending
    pub async fn load_more(&self) -> Result<LoadOutcome> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("Load more ignored: a page is already being fetched");
            return Ok(LoadOutcome::Busy);
        }
        let _guard = InFlight(&self.in_flight);

        let current = self.snapshot();
        if !current.has_more() {
            return Ok(LoadOutcome::Exhausted);
        }

        let (next, skipped) = current
            .load_more_with(self.client.as_ref(), self.invalid)
            .await?;
        let appended = next.posts.len() - current.posts.len();
        for e in &skipped {
            tracing::warn!("Skipping post: {}", e);
        }
        self.skipped.fetch_add(skipped.len(), Ordering::Relaxed);

        *self
            .state
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = next;

        tracing::debug!("Loaded {} more posts", appended);
        Ok(LoadOutcome::Loaded { appended })
    }

    pub fn into_state(self) -> ListingState {
        self.state
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
