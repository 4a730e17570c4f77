//! Show a single post

use anyhow::Result;
use std::path::Path;

use crate::content::PostDetail;
use crate::helpers::format_date;
use crate::Blog;

/// Print a post's metadata and reading time
pub async fn run(blog: &Blog, uid: &str, fixture: Option<&Path>) -> Result<()> {
    let loader = blog.loader(fixture)?;
    let post = loader.post(uid).await?;
    println!("{}", describe(blog, &post));
    Ok(())
}

fn describe(blog: &Blog, post: &PostDetail) -> String {
    let config = &blog.config;
    let date = post
        .first_publication_date
        .map(|d| format_date(&d, &config.date_format, &config.language, &config.timezone))
        .unwrap_or_default();

    let mut lines = vec![
        format!("Title:    {}", post.title),
        format!("Author:   {}", post.author),
        format!("Date:     {}", date),
    ];
    if !post.subtitle.is_empty() {
        lines.insert(1, format!("Subtitle: {}", post.subtitle));
    }
    lines.push(format!("Sections: {}", post.sections.len()));
    lines.push(format!("Words:    {}", post.word_count()));
    lines.push(format!("Reading:  {} min", post.reading_time()));
    lines.join("\n")
}
