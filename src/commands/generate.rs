//! Generate static files

use anyhow::Result;
use std::path::Path;

use crate::generator::Generator;
use crate::Blog;

/// Fetch every post and write the site to the public directory
pub async fn run(blog: &Blog, fixture: Option<&Path>) -> Result<()> {
    let start = std::time::Instant::now();

    let loader = blog.loader(fixture)?;
    let generator = Generator::new(blog, loader)?;
    let report = generator.generate().await?;

    if report.skipped > 0 {
        tracing::warn!("{} posts were skipped, see the warnings above", report.skipped);
    }

    let duration = start.elapsed();
    tracing::info!(
        "Generated {} posts and {} index pages in {:.2}s",
        report.posts,
        report.index_pages,
        duration.as_secs_f64()
    );

    Ok(())
}
