//! Post models and their normalization from raw documents

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::raw::{Field, RawDocument};
use super::reading_time;
use crate::error::ValidationError;
use crate::helpers::parse_publication_date;

/// A post as shown in the listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostSummary {
    pub uid: String,
    pub first_publication_date: Option<DateTime<Utc>>,
    pub title: String,
    pub subtitle: String,
    pub author: String,
}

/// A full post with its content sections
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostDetail {
    pub uid: String,
    pub first_publication_date: Option<DateTime<Utc>>,
    pub title: String,
    /// Not rendered on the post page
    pub subtitle: String,
    pub banner_url: String,
    pub author: String,
    pub sections: Vec<Section>,
}

/// A titled or untitled group of rich-text blocks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub heading: Option<String>,
    pub body: Vec<TextBlock>,
}

/// One rich-text block
///
/// Only `text` is interpreted here; the remaining fields (block type,
/// spans, image data, ...) are carried untouched for the rich-text renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    #[serde(default)]
    pub text: String,
    #[serde(flatten)]
    pub markup: Map<String, Value>,
}

impl TextBlock {
    /// A plain paragraph block
    pub fn paragraph(text: impl Into<String>) -> Self {
        let mut markup = Map::new();
        markup.insert("type".to_string(), Value::String("paragraph".to_string()));
        markup.insert("spans".to_string(), Value::Array(Vec::new()));
        Self {
            text: text.into(),
            markup,
        }
    }

    /// Block type such as `paragraph` or `heading2`
    pub fn kind(&self) -> &str {
        self.markup
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or("paragraph")
    }
}

impl PostSummary {
    /// Project a raw document onto the listing fields
    pub fn from_raw(raw: &RawDocument) -> Result<Self, ValidationError> {
        let label = raw.label().to_string();
        summary_fields(raw).map_err(|e| e.in_document(label))
    }
}

impl PostDetail {
    /// Project a raw document onto the post page fields
    pub fn from_raw(raw: &RawDocument) -> Result<Self, ValidationError> {
        let label = raw.label().to_string();
        detail_fields(raw).map_err(|e| e.in_document(label))
    }

    /// Estimated reading time in whole minutes
    pub fn reading_time(&self) -> usize {
        reading_time::reading_time(&self.sections)
    }

    pub fn word_count(&self) -> usize {
        reading_time::total_words(&self.sections)
    }

    /// Listing view of this post
    pub fn summary(&self) -> PostSummary {
        PostSummary {
            uid: self.uid.clone(),
            first_publication_date: self.first_publication_date,
            title: self.title.clone(),
            subtitle: self.subtitle.clone(),
            author: self.author.clone(),
        }
    }
}

fn summary_fields(raw: &RawDocument) -> Result<PostSummary, ValidationError> {
    let data = raw.data();
    Ok(PostSummary {
        uid: uid(raw)?,
        first_publication_date: publication_date(raw)?,
        title: data.get("title").string()?,
        subtitle: data.get("subtitle").optional_string()?.unwrap_or_default(),
        author: data.get("author").string()?,
    })
}

fn detail_fields(raw: &RawDocument) -> Result<PostDetail, ValidationError> {
    let data = raw.data();
    let sections = data
        .get("content")
        .array()?
        .iter()
        .map(section)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(PostDetail {
        uid: uid(raw)?,
        first_publication_date: publication_date(raw)?,
        title: data.get("title").string()?,
        subtitle: data.get("subtitle").optional_string()?.unwrap_or_default(),
        banner_url: data.get("banner").get("url").string()?,
        author: data.get("author").string()?,
        sections,
    })
}

fn section(field: &Field<'_>) -> Result<Section, ValidationError> {
    field.object()?;
    let body = field
        .get("body")
        .array()?
        .iter()
        .map(text_block)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Section {
        heading: field.get("heading").optional_string()?,
        body,
    })
}

fn text_block(field: &Field<'_>) -> Result<TextBlock, ValidationError> {
    let mut markup = field.object()?.clone();
    let text = match markup.remove("text") {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s,
        Some(_) => {
            return Err(ValidationError::new(
                format!("{}.text", field.path()),
                "a string",
            ))
        }
    };
    Ok(TextBlock { text, markup })
}

fn uid(raw: &RawDocument) -> Result<String, ValidationError> {
    match &raw.uid {
        Some(uid) if !uid.is_empty() => Ok(uid.clone()),
        _ => Err(ValidationError::new("uid", "a non-empty string")),
    }
}

fn publication_date(raw: &RawDocument) -> Result<Option<DateTime<Utc>>, ValidationError> {
    match &raw.first_publication_date {
        None => Ok(None),
        Some(s) => parse_publication_date(s)
            .map(Some)
            .ok_or_else(|| ValidationError::new("first_publication_date", "a timestamp")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn raw(value: Value) -> RawDocument {
        serde_json::from_value(value).unwrap()
    }

    fn sample_post() -> RawDocument {
        raw(json!({
            "id": "YF0yZxIAACIAx0Cm",
            "uid": "como-utilizar-hooks",
            "type": "post",
            "first_publication_date": "2021-03-15T19:25:28+0000",
            "last_publication_date": "2021-03-16T10:00:00+0000",
            "tags": ["react"],
            "data": {
                "title": "Como utilizar Hooks",
                "subtitle": "Pensando em sincronização em vez de ciclos de vida",
                "author": "Joseph Oliveira",
                "banner": { "url": "https://images.prismic.io/banner.png", "alt": null },
                "slices": [],
                "content": [
                    {
                        "heading": "Proin et varius",
                        "body": [
                            { "type": "paragraph", "text": "Lorem ipsum dolor", "spans": [] },
                            { "type": "list-item", "text": "Nullam dolor", "spans": [
                                { "start": 0, "end": 6, "type": "strong" }
                            ] }
                        ]
                    },
                    {
                        "heading": null,
                        "body": [{ "type": "paragraph", "text": "sit amet", "spans": [] }]
                    }
                ]
            }
        }))
    }

    #[test]
    fn test_summary_is_projection() {
        let summary = PostSummary::from_raw(&sample_post()).unwrap();
        assert_eq!(
            summary,
            PostSummary {
                uid: "como-utilizar-hooks".to_string(),
                first_publication_date: Some(
                    Utc.with_ymd_and_hms(2021, 3, 15, 19, 25, 28).unwrap(),
                ),
                title: "Como utilizar Hooks".to_string(),
                subtitle: "Pensando em sincronização em vez de ciclos de vida".to_string(),
                author: "Joseph Oliveira".to_string(),
            }
        );

        let value = serde_json::to_value(&summary).unwrap();
        let keys: Vec<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec!["uid", "first_publication_date", "title", "subtitle", "author"]
        );
    }

    #[test]
    fn test_normalization_is_idempotent() {
        let doc = sample_post();
        assert_eq!(
            PostSummary::from_raw(&doc).unwrap(),
            PostSummary::from_raw(&doc).unwrap()
        );
        assert_eq!(
            PostDetail::from_raw(&doc).unwrap(),
            PostDetail::from_raw(&doc).unwrap()
        );
    }

    #[test]
    fn test_detail_preserves_sections() {
        let detail = PostDetail::from_raw(&sample_post()).unwrap();
        assert_eq!(detail.banner_url, "https://images.prismic.io/banner.png");
        assert_eq!(detail.sections.len(), 2);
        assert_eq!(detail.sections[0].heading.as_deref(), Some("Proin et varius"));
        assert_eq!(detail.sections[1].heading, None);

        let body = &detail.sections[0].body;
        assert_eq!(body.len(), 2);
        assert_eq!(body[0].text, "Lorem ipsum dolor");
        assert_eq!(body[1].kind(), "list-item");
        assert_eq!(body[1].markup["spans"][0]["type"], "strong");

        // body blocks are carried by value
        let stored = &sample_post().data["content"][0]["body"][1];
        assert_eq!(&serde_json::to_value(&body[1]).unwrap(), stored);
    }

    #[test]
    fn test_reading_time_of_detail() {
        let detail = PostDetail::from_raw(&sample_post()).unwrap();
        // 3 heading + 3 + 2 + 2 body words
        assert_eq!(detail.word_count(), 10);
        assert_eq!(detail.reading_time(), 1);
        assert_eq!(detail.summary().uid, detail.uid);
    }

    #[test]
    fn test_null_subtitle_and_date() {
        let doc = raw(json!({
            "uid": "draft",
            "first_publication_date": null,
            "data": { "title": "T", "subtitle": null, "author": "A" }
        }));
        let summary = PostSummary::from_raw(&doc).unwrap();
        assert_eq!(summary.subtitle, "");
        assert_eq!(summary.first_publication_date, None);
    }

    #[test]
    fn test_missing_banner_reports_path() {
        let mut doc = sample_post();
        doc.data.as_object_mut().unwrap().remove("banner");
        let err = PostDetail::from_raw(&doc).unwrap_err();
        assert_eq!(err.path, "data.banner.url");
        assert_eq!(err.document.as_deref(), Some("como-utilizar-hooks"));

        // the listing does not need the banner
        assert!(PostSummary::from_raw(&doc).is_ok());
    }

    #[test]
    fn test_mistyped_fields_report_path() {
        let mut doc = sample_post();
        doc.data["content"][1]["body"][0]["text"] = json!(7);
        let err = PostDetail::from_raw(&doc).unwrap_err();
        assert_eq!(err.path, "data.content[1].body[0].text");

        let mut doc = sample_post();
        doc.data["title"] = json!(["not", "a", "string"]);
        assert_eq!(PostSummary::from_raw(&doc).unwrap_err().path, "data.title");
    }

    #[test]
    fn test_missing_uid_and_bad_date() {
        let mut doc = sample_post();
        doc.uid = None;
        assert_eq!(PostSummary::from_raw(&doc).unwrap_err().path, "uid");

        let mut doc = sample_post();
        doc.first_publication_date = Some("someday".to_string());
        assert_eq!(
            PostSummary::from_raw(&doc).unwrap_err().path,
            "first_publication_date"
        );
    }
}
