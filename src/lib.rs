//! spacetraveling: a static blog generator backed by a headless CMS
//!
//! Posts are fetched from a Prismic-style content API, validated into
//! typed models and rendered with embedded Tera templates. A preview server
//! serves the generated site and resolves posts that were published after
//! the last build.

pub mod client;
pub mod commands;
pub mod config;
pub mod content;
pub mod error;
pub mod generator;
pub mod helpers;
pub mod i18n;
pub mod listing;
pub mod server;
pub mod templates;

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::client::{ContentClient, MemoryClient};
use crate::content::ContentLoader;

/// The blog application
#[derive(Debug, Clone)]
pub struct Blog {
    /// Site configuration
    pub config: config::SiteConfig,
    /// Base directory
    pub base_dir: PathBuf,
    /// Static assets copied as-is
    pub source_dir: PathBuf,
    /// Public (output) directory
    pub public_dir: PathBuf,
    /// Language overrides
    pub i18n_dir: PathBuf,
}

impl Blog {
    /// Create a blog from a directory, reading `_config.yml` if present
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        let config_path = base_dir.join("_config.yml");

        let config = if config_path.exists() {
            config::SiteConfig::load(&config_path)?
        } else {
            let mut config = config::SiteConfig::default();
            config.cms.apply_env();
            config
        };

        let source_dir = base_dir.join(&config.source_dir);
        let public_dir = base_dir.join(&config.public_dir);
        let i18n_dir = base_dir.join(&config.i18n_dir);

        Ok(Self {
            config,
            base_dir,
            source_dir,
            public_dir,
            i18n_dir,
        })
    }

    /// Content client: a fixture file when given, the configured API otherwise
    pub fn client(&self, fixture: Option<&Path>) -> Result<Arc<dyn ContentClient>> {
        match fixture {
            Some(path) => {
                let path = if path.is_absolute() {
                    path.to_path_buf()
                } else {
                    self.base_dir.join(path)
                };
                tracing::info!("Reading content from fixture {:?}", path);
                Ok(Arc::new(MemoryClient::from_file(&path)?))
            }
            None => Ok(Arc::new(client::from_config(&self.config.cms)?)),
        }
    }

    /// Content loader over [`Blog::client`]
    pub fn loader(&self, fixture: Option<&Path>) -> Result<ContentLoader> {
        Ok(ContentLoader::new(self.client(fixture)?, &self.config.cms))
    }

    /// Interface strings for the configured language
    pub fn i18n(&self) -> Result<i18n::I18n> {
        let mut i18n = i18n::I18n::new(&self.config.language);
        i18n.load_languages(&self.i18n_dir)?;
        Ok(i18n)
    }

    /// Generate the static site
    pub async fn generate(&self, fixture: Option<&Path>) -> Result<()> {
        commands::generate::run(self, fixture).await
    }

    /// Clean the public directory
    pub fn clean(&self) -> Result<()> {
        commands::clean::run(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_new_reads_config() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("_config.yml"),
            "title: Blog\npublic_dir: out\ncms:\n  endpoint: https://blog.cdn.prismic.io/api/v2\n",
        )
        .unwrap();

        let blog = Blog::new(dir.path()).unwrap();
        assert_eq!(blog.config.title, "Blog");
        assert_eq!(blog.public_dir, dir.path().join("out"));
        assert_eq!(blog.source_dir, dir.path().join("source"));
        assert!(blog.client(None).is_ok());
    }

    #[test]
    fn test_client_requires_endpoint() {
        let dir = tempfile::tempdir().unwrap();
        let blog = Blog::new(dir.path()).unwrap();
        assert!(blog.client(None).is_err());
    }

    #[test]
    fn test_fixture_client() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("posts.json"), "[]").unwrap();

        let blog = Blog::new(dir.path()).unwrap();
        assert!(blog.client(Some(Path::new("posts.json"))).is_ok());
        assert!(blog.client(Some(Path::new("missing.json"))).is_err());
    }
}
