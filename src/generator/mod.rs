//! Generator module - writes the static site from CMS content

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::content::{ContentLoader, PostSummary};
use crate::error::BlogError;
use crate::helpers::{page_path, post_path, url_for};
use crate::listing::{InvalidRecords, ListingSession, ListingState, LoadOutcome};
use crate::templates::{PageRenderer, ASSETS};
use crate::Blog;

/// What a generation run produced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerateReport {
    /// Listing steps written (home page included)
    pub index_pages: usize,
    pub posts: usize,
    /// Records that failed validation and were left out, counted once for
    /// the listing and once for the post page
    pub skipped: usize,
}

/// Static site generator using the embedded templates
pub struct Generator {
    blog: Blog,
    pages: PageRenderer,
    loader: ContentLoader,
}

impl Generator {
    /// Create a new generator
    pub fn new(blog: &Blog, loader: ContentLoader) -> Result<Self> {
        let pages = PageRenderer::new(&blog.config, blog.i18n()?)?;
        Ok(Self {
            blog: blog.clone(),
            pages,
            loader,
        })
    }

    /// Generate the entire site
    pub async fn generate(&self) -> Result<GenerateReport> {
        fs::create_dir_all(&self.blog.public_dir)?;

        // Copy source assets first so they take precedence over the theme's
        self.copy_source_assets()?;
        self.write_theme_assets()?;

        let mut report = GenerateReport::default();

        let (listing, complete) = self.generate_index_pages(&mut report).await?;

        // The listing already walked every page unless it was capped
        let uids: Vec<String> = if complete {
            listing.iter().map(|p| p.uid.clone()).collect()
        } else {
            self.loader.all_uids().await?
        };

        self.generate_post_pages(&uids, &mut report).await?;
        self.generate_not_found_page()?;
        self.generate_search_index(&listing)?;

        Ok(report)
    }

    /// Write the home page and one page per "load more" step
    ///
    /// Returns the accumulated listing and whether it reached the last page.
    async fn generate_index_pages(
        &self,
        report: &mut GenerateReport,
    ) -> Result<(Vec<PostSummary>, bool)> {
        let max_pages = self.blog.config.max_index_pages.max(1);
        let (first, skipped) = self.loader.first_page_with(InvalidRecords::Skip).await?;
        for e in &skipped {
            tracing::warn!("Skipping post: {}", e);
        }
        report.skipped += skipped.len();
        let session = ListingSession::new(self.loader.client().clone(), first).skip_invalid();
        let mut page = 1;

        loop {
            let state = session.snapshot();
            let capped = page >= max_pages && state.has_more();

            if capped {
                tracing::warn!(
                    "Listing stopped after {} pages (max_index_pages); \
                     older posts get pages but are not listed",
                    page
                );
                let last = ListingState::new(state.into_posts(), None);
                self.write_index_page(&last, page)?;
                report.index_pages = page;
                report.skipped += session.skipped();
                return Ok((last.into_posts(), false));
            }

            self.write_index_page(&state, page)?;
            if !state.has_more() {
                break;
            }

            match session.load_more().await? {
                LoadOutcome::Loaded { appended } => {
                    tracing::debug!("Listing step {}: {} new posts", page + 1, appended);
                    page += 1;
                }
                LoadOutcome::Exhausted | LoadOutcome::Busy => break,
            }
        }

        report.index_pages = page;
        report.skipped += session.skipped();
        tracing::info!("Generated {} index pages", page);
        Ok((session.into_state().into_posts(), true))
    }

    fn write_index_page(&self, state: &ListingState, page: usize) -> Result<()> {
        let html = self.pages.index(state, page)?;
        let output_path = self
            .blog
            .public_dir
            .join(page_path(&self.blog.config, page))
            .join("index.html");
        write_file(&output_path, &html)?;
        tracing::debug!("Generated: {:?}", output_path);
        Ok(())
    }

    /// Generate individual post pages
    async fn generate_post_pages(
        &self,
        uids: &[String],
        report: &mut GenerateReport,
    ) -> Result<()> {
        for uid in uids {
            if !is_safe_segment(uid) {
                tracing::warn!("Skipping post with unusable uid {:?}", uid);
                report.skipped += 1;
                continue;
            }

            let post = match self.loader.post(uid).await {
                Ok(post) => post,
                Err(BlogError::Validation(e)) => {
                    tracing::warn!("Skipping post: {}", e);
                    report.skipped += 1;
                    continue;
                }
                Err(e @ BlogError::NotFound { .. }) => {
                    tracing::warn!("Skipping post: {}", e);
                    report.skipped += 1;
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let html = self.pages.post(&post)?;
            let output_path = self.blog.public_dir.join("post").join(uid).join("index.html");
            write_file(&output_path, &html)?;
            report.posts += 1;
            tracing::debug!(
                "Generated post: {:?} ({} words, {} min)",
                output_path,
                post.word_count(),
                post.reading_time()
            );
        }

        tracing::info!("Generated {} post pages", report.posts);
        Ok(())
    }

    fn generate_not_found_page(&self) -> Result<()> {
        let html = self.pages.not_found()?;
        write_file(&self.blog.public_dir.join("404.html"), &html)?;
        Ok(())
    }

    /// Generate search index (JSON)
    fn generate_search_index(&self, posts: &[PostSummary]) -> Result<()> {
        let search_data: Vec<serde_json::Value> = posts
            .iter()
            .map(|p| {
                serde_json::json!({
                    "uid": p.uid,
                    "title": p.title,
                    "subtitle": p.subtitle,
                    "author": p.author,
                    "date": p.first_publication_date,
                    "path": url_for(&self.blog.config, &post_path(&p.uid)),
                })
            })
            .collect();

        let output_path = self.blog.public_dir.join("search.json");
        let json = serde_json::to_string_pretty(&search_data)?;
        fs::write(&output_path, json)?;
        tracing::info!("Generated search.json");

        Ok(())
    }

    /// Write the embedded stylesheet and logo unless the source provides them
    fn write_theme_assets(&self) -> Result<()> {
        for (relative, content) in ASSETS {
            let dest = self.blog.public_dir.join(relative);
            if !dest.exists() {
                write_file(&dest, content)?;
            }
        }
        Ok(())
    }

    /// Copy source assets (images, etc.) to public directory
    fn copy_source_assets(&self) -> Result<()> {
        let source_dir = &self.blog.source_dir;
        if !source_dir.exists() {
            return Ok(());
        }

        for entry in WalkDir::new(source_dir)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }

            let relative = path.strip_prefix(source_dir)?;
            let dest = self.blog.public_dir.join(relative);
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(path, &dest)?;
        }

        Ok(())
    }
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| anyhow::anyhow!("Failed to create dir {:?}: {}", parent, e))?;
    }
    fs::write(path, content).map_err(|e| anyhow::anyhow!("Failed to write {:?}: {}", path, e))?;
    Ok(())
}

/// Whether a uid can be used as a single directory name
pub fn is_safe_segment(uid: &str) -> bool {
    !uid.is_empty()
        && uid != "."
        && uid != ".."
        && !uid.contains(['/', '\\'])
        && !uid.chars().any(char::is_control)
}

/// Output file of a post page, if its uid is usable
pub fn post_output_path(public_dir: &Path, uid: &str) -> Option<PathBuf> {
    is_safe_segment(uid).then(|| public_dir.join("post").join(uid).join("index.html"))
}
