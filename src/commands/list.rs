//! List posts

use anyhow::Result;
use std::path::Path;

use crate::helpers::format_date;
use crate::Blog;

/// Print every post in listing order
pub async fn run(blog: &Blog, fixture: Option<&Path>) -> Result<()> {
    let loader = blog.loader(fixture)?;
    let posts = loader.all_summaries().await?;
    let config = &blog.config;

    println!("Posts ({}):", posts.len());
    for post in posts {
        let date = post
            .first_publication_date
            .map(|d| format_date(&d, "YYYY-MM-DD", &config.language, &config.timezone))
            .unwrap_or_else(|| "----------".to_string());
        println!("  {} - {} by {} [{}]", date, post.title, post.author, post.uid);
    }

    Ok(())
}
