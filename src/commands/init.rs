//! Initialize a new blog

use anyhow::Result;
use std::fs;
use std::path::Path;

const CONFIG_TEMPLATE: &str = r#"# spacetraveling configuration

# Site
title: spacetraveling
description: ''
author: ''
language: pt-BR
timezone: ''

# URL
url: http://example.com
root: /

# Directory
source_dir: source
public_dir: public
i18n_dir: languages
pagination_dir: page

# Date format
date_format: DD MMM YYYY

# Listing: stop writing "load more" steps after this many pages
max_index_pages: 100

# Content API
## The access token can also be set with PRISMIC_ACCESS_TOKEN
cms:
  endpoint: https://your-repository.cdn.prismic.io/api/v2
  access_token:
  document_type: post
  page_size: 1
  timeout_secs: 10
  ref_ttl_secs: 5
"#;

/// A single post, usable with `generate --fixture posts.json`
const SAMPLE_FIXTURE: &str = r#"[
  {
    "id": "YF4s0xIAACQAk0ct",
    "uid": "hello-world",
    "type": "post",
    "first_publication_date": "2021-03-25T19:25:28+0000",
    "last_publication_date": "2021-03-25T19:25:28+0000",
    "data": {
      "title": "Hello World",
      "subtitle": "Your first post, served from a local fixture",
      "author": "spacetraveling",
      "banner": { "url": "https://images.unsplash.com/photo-1446776811953-b23d57bd21aa" },
      "content": [
        {
          "heading": "Getting started",
          "body": [
            {
              "type": "paragraph",
              "text": "Point cms.endpoint at your repository and run generate.",
              "spans": [{ "start": 6, "end": 18, "type": "strong" }]
            }
          ]
        }
      ]
    }
  }
]
"#;

/// Initialize a new site in the given directory
pub fn init_site(target_dir: &Path) -> Result<()> {
    let config_path = target_dir.join("_config.yml");
    if config_path.exists() {
        anyhow::bail!("{:?} already exists", config_path);
    }

    fs::create_dir_all(target_dir.join("source"))?;
    fs::create_dir_all(target_dir.join("languages"))?;

    fs::write(&config_path, CONFIG_TEMPLATE)?;
    fs::write(target_dir.join("posts.json"), SAMPLE_FIXTURE)?;

    Ok(())
}
