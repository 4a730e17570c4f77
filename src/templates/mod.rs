//! Built-in blog templates using the Tera template engine
//!
//! All templates and theme assets are embedded directly in the binary.

use serde::Serialize;
use std::collections::HashMap;
use tera::{Context, Tera};

use crate::config::SiteConfig;
use crate::content::{PostDetail, PostSummary, RichTextRenderer};
use crate::error::Result;
use crate::helpers::{
    format_date, full_url_for, html_escape, page_path, post_path, time_tag, truncate, url_for,
};
use crate::i18n::I18n;
use crate::listing::ListingState;

/// Static files written next to the generated pages
pub const ASSETS: [(&str, &str); 2] = [
    ("css/common.css", include_str!("theme/assets/common.css")),
    ("logo.svg", include_str!("theme/assets/logo.svg")),
];

/// Template renderer with the embedded theme
pub struct TemplateRenderer {
    tera: Tera,
}

impl TemplateRenderer {
    /// Create a new renderer with all templates loaded
    pub fn new() -> Result<Self> {
        let mut tera = Tera::default();

        // Rich text arrives as HTML; plain fields are escaped in the templates
        tera.autoescape_on(vec![]);

        tera.add_raw_templates(vec![
            ("layout.html", include_str!("theme/layout.html")),
            ("index.html", include_str!("theme/index.html")),
            ("post.html", include_str!("theme/post.html")),
            ("message.html", include_str!("theme/message.html")),
            (
                "partials/header.html",
                include_str!("theme/partials/header.html"),
            ),
            (
                "partials/post_info.html",
                include_str!("theme/partials/post_info.html"),
            ),
        ])?;

        tera.register_filter("html", html_filter);

        Ok(Self { tera })
    }

    /// Render a template with given context
    pub fn render(&self, template_name: &str, context: &Context) -> Result<String> {
        Ok(self.tera.render(template_name, context)?)
    }
}

/// Tera filter: escape HTML special characters
fn html_filter(
    value: &tera::Value,
    _args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let s = tera::try_get_value!("html", "value", String, value);
    Ok(tera::Value::String(html_escape(&s)))
}

/// Renders the blog's pages from content
pub struct PageRenderer {
    renderer: TemplateRenderer,
    config: SiteConfig,
    site: SiteData,
    text: UiText,
    i18n: I18n,
    rich_text: RichTextRenderer,
}

impl PageRenderer {
    pub fn new(config: &SiteConfig, i18n: I18n) -> Result<Self> {
        Ok(Self {
            renderer: TemplateRenderer::new()?,
            config: config.clone(),
            site: SiteData {
                title: config.title.clone(),
                description: config.description.clone(),
                language: config.language.clone(),
                root: url_for(config, ""),
                url: config.url.clone(),
            },
            text: UiText::from_i18n(&i18n),
            i18n,
            rich_text: RichTextRenderer::new(&config.root),
        })
    }

    fn base_context(&self, description: &str, path: Option<&str>) -> Context {
        let mut context = Context::new();
        context.insert(
            "canonical",
            &path.map(|p| full_url_for(&self.config, p)).unwrap_or_default(),
        );
        context.insert("site", &self.site);
        context.insert("text", &self.text);
        context.insert("version", env!("CARGO_PKG_VERSION"));
        context.insert("description", &truncate(description, 160, None));
        context
    }

    /// One step of the listing: every post accumulated so far
    pub fn index(&self, state: &ListingState, page: usize) -> Result<String> {
        let posts: Vec<PostCardData> = state
            .posts()
            .iter()
            .map(|p| self.card(p, None))
            .collect();

        let pagination = PaginationData {
            current: page,
            has_more: state.has_more(),
            next_link: if state.has_more() {
                url_for(&self.config, &page_path(&self.config, page + 1))
            } else {
                String::new()
            },
        };

        let mut context = self.base_context(
            &self.config.description,
            Some(page_path(&self.config, page).as_str()),
        );
        context.insert("posts", &posts);
        context.insert("pagination", &pagination);
        self.renderer.render("index.html", &context)
    }

    /// The page of a single post
    pub fn post(&self, post: &PostDetail) -> Result<String> {
        let item = self.card(&post.summary(), Some(post.reading_time()));
        let sections = post
            .sections
            .iter()
            .map(|s| SectionData {
                heading: s.heading.clone().filter(|h| !h.is_empty()),
                anchor: s.heading.as_deref().map(slug::slugify).unwrap_or_default(),
                html: self.rich_text.render(&s.body),
            })
            .collect();
        let view = PostPageData {
            banner_url: post.banner_url.clone(),
            sections,
        };

        let mut context = self.base_context(&post.subtitle, Some(post_path(&post.uid).as_str()));
        context.insert("item", &item);
        context.insert("post", &view);
        self.renderer.render("post.html", &context)
    }

    /// Page shown for a post that does not exist
    pub fn not_found(&self) -> Result<String> {
        self.message(&self.text.not_found_title, &self.text.not_found_message)
    }

    /// Page shown when the content API cannot be reached
    pub fn unavailable(&self) -> Result<String> {
        self.message(&self.text.unavailable_title, &self.text.unavailable_message)
    }

    fn message(&self, heading: &str, message: &str) -> Result<String> {
        let mut context = self.base_context(message, None);
        context.insert("heading", heading);
        context.insert("message", message);
        self.renderer.render("message.html", &context)
    }

    fn card(&self, post: &PostSummary, reading_time: Option<usize>) -> PostCardData {
        let date = post.first_publication_date.as_ref();
        PostCardData {
            uid: post.uid.clone(),
            title: post.title.clone(),
            subtitle: post.subtitle.clone(),
            author: post.author.clone(),
            path: url_for(&self.config, &post_path(&post.uid)),
            date: date.map(|d| {
                format_date(
                    d,
                    &self.config.date_format,
                    &self.config.language,
                    &self.config.timezone,
                )
            }),
            date_html: date
                .map(|d| {
                    time_tag(
                        d,
                        &self.config.date_format,
                        &self.config.language,
                        &self.config.timezone,
                    )
                })
                .unwrap_or_default(),
            reading_time: reading_time.map(|m| self.i18n.get_count("reading_time", m)),
        }
    }
}

/// Data structures for template context

#[derive(Debug, Clone, Serialize)]
pub struct SiteData {
    pub title: String,
    pub description: String,
    pub language: String,
    pub root: String,
    pub url: String,
}

/// Translated interface strings
#[derive(Debug, Clone, Serialize)]
pub struct UiText {
    pub load_more: String,
    /// Shown on the load-more link while the next step is fetched
    pub loading: String,
    pub back_home: String,
    pub not_found_title: String,
    pub not_found_message: String,
    pub unavailable_title: String,
    pub unavailable_message: String,
}

impl UiText {
    pub fn from_i18n(i18n: &I18n) -> Self {
        Self {
            load_more: i18n.get("load_more"),
            loading: i18n.get("loading"),
            back_home: i18n.get("not_found.back"),
            not_found_title: i18n.get("not_found.title"),
            not_found_message: i18n.get("not_found.message"),
            unavailable_title: i18n.get("unavailable.title"),
            unavailable_message: i18n.get("unavailable.message"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PostCardData {
    pub uid: String,
    pub title: String,
    pub subtitle: String,
    pub author: String,
    pub path: String,
    pub date: Option<String>,
    pub date_html: String,
    pub reading_time: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostPageData {
    pub banner_url: String,
    pub sections: Vec<SectionData>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SectionData {
    pub heading: Option<String>,
    pub anchor: String,
    pub html: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaginationData {
    pub current: usize,
    pub has_more: bool,
    pub next_link: String,
}
