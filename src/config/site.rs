//! Site configuration (_config.yml)

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Environment variable that overrides `cms.access_token`
pub const ACCESS_TOKEN_ENV: &str = "PRISMIC_ACCESS_TOKEN";

/// Main site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    // Site
    pub title: String,
    pub description: String,
    pub author: String,
    pub language: String,
    pub timezone: String,

    // URL
    pub url: String,
    pub root: String,

    // Directory
    pub source_dir: String,
    pub public_dir: String,
    pub i18n_dir: String,
    pub pagination_dir: String,

    // Date format (Moment.js tokens)
    pub date_format: String,

    // Upper bound on "load more" steps written during generation
    pub max_index_pages: usize,

    // Content API
    #[serde(default)]
    pub cms: CmsConfig,

    // Store any additional fields
    #[serde(flatten)]
    pub extra: HashMap<String, serde_yaml::Value>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "spacetraveling".to_string(),
            description: String::new(),
            author: String::new(),
            language: "pt-BR".to_string(),
            timezone: String::new(),

            url: "http://example.com".to_string(),
            root: "/".to_string(),

            source_dir: "source".to_string(),
            public_dir: "public".to_string(),
            i18n_dir: "languages".to_string(),
            pagination_dir: "page".to_string(),

            date_format: "DD MMM YYYY".to_string(),

            max_index_pages: 100,

            cms: CmsConfig::default(),
            extra: HashMap::new(),
        }
    }
}

impl SiteConfig {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let mut config: SiteConfig = serde_yaml::from_str(&content)?;
        config.cms.apply_env();
        Ok(config)
    }
}

/// Headless CMS connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CmsConfig {
    /// API root, e.g. `https://my-repo.cdn.prismic.io/api/v2`
    pub endpoint: String,
    pub access_token: Option<String>,
    /// Custom type of the blog posts
    pub document_type: String,
    /// Results per listing page
    pub page_size: usize,
    pub timeout_secs: u64,
    /// How long a resolved master ref is reused before asking the API again
    pub ref_ttl_secs: u64,
}

impl Default for CmsConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            access_token: None,
            document_type: "post".to_string(),
            page_size: 1,
            timeout_secs: 10,
            ref_ttl_secs: 5,
        }
    }
}

impl CmsConfig {
    /// Take the access token from the environment when it is set there
    pub fn apply_env(&mut self) {
        if let Ok(token) = std::env::var(ACCESS_TOKEN_ENV) {
            if !token.trim().is_empty() {
                self.access_token = Some(token);
            }
        }
    }
}
