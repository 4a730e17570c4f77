//! Client for the hosted Prismic REST API (v2)

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use super::ContentClient;
use crate::config::CmsConfig;
use crate::content::{RawDocument, ResultPage};
use crate::error::{BlogError, Result};

/// Content client backed by the Prismic document API
pub struct PrismicClient {
    http: Client,
    endpoint: String,
    access_token: Option<String>,
    ref_ttl: Duration,
    master_ref: Mutex<Option<CachedRef>>,
}

/// The master ref and when it was resolved
#[derive(Debug, Clone)]
struct CachedRef {
    reference: String,
    resolved_at: Instant,
}

/// API root document; only the refs are needed
#[derive(Debug, Deserialize)]
struct ApiRoot {
    refs: Vec<ApiRef>,
}

#[derive(Debug, Deserialize)]
struct ApiRef {
    #[serde(rename = "ref")]
    reference: String,
    #[serde(rename = "isMasterRef", default)]
    is_master_ref: bool,
}

impl PrismicClient {
    /// Create a client for the endpoint in the configuration
    pub fn new(config: &CmsConfig) -> Result<Self> {
        if config.endpoint.trim().is_empty() {
            return Err(BlogError::Config("cms.endpoint is not set".to_string()));
        }
        Url::parse(&config.endpoint)
            .map_err(|e| BlogError::Config(format!("invalid cms.endpoint: {}", e)))?;

        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("spacetraveling/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| BlogError::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            access_token: config
                .access_token
                .clone()
                .filter(|t| !t.trim().is_empty()),
            ref_ttl: Duration::from_secs(config.ref_ttl_secs),
            master_ref: Mutex::new(None),
        })
    }

    /// The ref (content version) queries are made against
    ///
    /// Publishing moves the master ref, so a resolved ref is only reused for
    /// `ref_ttl`.
    async fn master_ref(&self) -> Result<String> {
        if let Some(reference) = self.cached_ref() {
            return Ok(reference);
        }
        self.resolve_ref().await
    }

    fn cached_ref(&self) -> Option<String> {
        let cache = self.master_ref.lock().unwrap_or_else(|p| p.into_inner());
        cache
            .as_ref()
            .filter(|cached| cached.resolved_at.elapsed() < self.ref_ttl)
            .map(|cached| cached.reference.clone())
    }

    /// Ask the API root for the current master ref and cache it
    async fn resolve_ref(&self) -> Result<String> {
        let request = self.authorized(self.http.get(&self.endpoint));
        let root: ApiRoot = self.get_json(request).await?;
        let master = root
            .refs
            .into_iter()
            .find(|r| r.is_master_ref)
            .ok_or_else(|| BlogError::Decode("API root has no master ref".to_string()))?;
        tracing::debug!(reference = %master.reference, "Resolved master ref");

        *self.master_ref.lock().unwrap_or_else(|p| p.into_inner()) = Some(CachedRef {
            reference: master.reference.clone(),
            resolved_at: Instant::now(),
        });
        Ok(master.reference)
    }

    /// Search at the master ref, resolving it again if the API rejects it
    async fn search(&self, predicate: String, page_size: Option<usize>) -> Result<ResultPage> {
        let reference = self.master_ref().await?;
        match self.search_at(&reference, &predicate, page_size).await {
            Err(err @ BlogError::Status { status, .. }) if is_stale_ref_status(status) => {
                let fresh = self.resolve_ref().await?;
                if fresh == reference {
                    return Err(err);
                }
                tracing::debug!(old = %reference, new = %fresh, "Master ref moved, retrying");
                self.search_at(&fresh, &predicate, page_size).await
            }
            other => other,
        }
    }

    async fn search_at(
        &self,
        reference: &str,
        predicate: &str,
        page_size: Option<usize>,
    ) -> Result<ResultPage> {
        let url = format!("{}/documents/search", self.endpoint);

        let mut query = vec![("ref", reference.to_string()), ("q", predicate.to_string())];
        if let Some(size) = page_size {
            query.push(("pageSize", size.to_string()));
        }

        self.get_json(self.authorized(self.http.get(&url).query(&query)))
            .await
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.access_token {
            Some(token) => request.query(&[("access_token", token)]),
            None => request,
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request.send().await?;
        let status = response.status();
        let url = response.url().to_string();

        if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
            return Err(BlogError::Transport {
                message: format!("{} from {}", status, redact(&url)),
                retryable: true,
            });
        }
        if !status.is_success() {
            return Err(BlogError::Status {
                status: status.as_u16(),
                url: redact(&url),
            });
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl ContentClient for PrismicClient {
    async fn query_by_type(&self, doc_type: &str, page_size: usize) -> Result<ResultPage> {
        tracing::debug!(doc_type, page_size, "Querying documents by type");
        self.search(at("document.type", doc_type), Some(page_size))
            .await
    }

    async fn fetch_page(&self, cursor: &str) -> Result<ResultPage> {
        let mut url = Url::parse(cursor)
            .map_err(|e| BlogError::Config(format!("invalid page cursor {:?}: {}", cursor, e)))?;

        if let Some(token) = &self.access_token {
            if !url.query_pairs().any(|(k, _)| k == "access_token") {
                url.query_pairs_mut().append_pair("access_token", token);
            }
        }

        tracing::debug!(cursor = %redact(cursor), "Fetching next page");
        self.get_json(self.http.get(url)).await
    }

    async fn get_by_uid(&self, doc_type: &str, uid: &str) -> Result<Option<RawDocument>> {
        tracing::debug!(doc_type, uid, "Fetching document by uid");
        let field = format!("my.{}.uid", doc_type);
        let page = self.search(at(&field, uid), Some(1)).await?;
        Ok(page.results.into_iter().next())
    }
}

/// Statuses the API answers with when a ref has expired
fn is_stale_ref_status(status: u16) -> bool {
    matches!(status, 400 | 404 | 410)
}

/// `[[at(<field>, "<value>")]]` predicate
fn at(field: &str, value: &str) -> String {
    let value = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("[[at({}, \"{}\")]]", field, value)
}

/// Drop the access token from a URL before it is logged
fn redact(url: &str) -> String {
    match Url::parse(url) {
        Ok(mut parsed) => {
            let pairs: Vec<(String, String)> = parsed
                .query_pairs()
                .filter(|(k, _)| k != "access_token")
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect();
            if pairs.is_empty() {
                parsed.set_query(None);
            } else {
                parsed.query_pairs_mut().clear().extend_pairs(pairs);
            }
            parsed.to_string()
        }
        Err(_) => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::{Query, State};
    use axum::http::StatusCode as HttpStatus;
    use axum::response::IntoResponse;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    type Params = Query<HashMap<String, String>>;

    /// Serve a stub API on an ephemeral port; `build` receives the base URL
    async fn serve(build: impl FnOnce(String) -> Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let app = build(base.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        base
    }

    fn config(base: &str, token: Option<&str>) -> CmsConfig {
        CmsConfig {
            endpoint: format!("{}/api/v2", base),
            access_token: token.map(str::to_string),
            ..CmsConfig::default()
        }
    }

    async fn api_root() -> Json<serde_json::Value> {
        Json(json!({
            "refs": [
                { "id": "preview", "ref": "PREVIEW", "isMasterRef": false },
                { "id": "master", "ref": "MASTER", "isMasterRef": true }
            ]
        }))
    }

    fn post(uid: &str) -> serde_json::Value {
        json!({
            "id": format!("id-{}", uid),
            "uid": uid,
            "type": "post",
            "first_publication_date": "2021-03-15T19:25:28+0000",
            "data": { "title": uid, "subtitle": "", "author": "Ana" }
        })
    }

    fn has(params: &HashMap<String, String>, key: &str, value: &str) -> bool {
        params.get(key).map(String::as_str) == Some(value)
    }

    #[test]
    fn test_predicate() {
        assert_eq!(at("document.type", "post"), r#"[[at(document.type, "post")]]"#);
        assert_eq!(at("my.post.uid", r#"a"b"#), r#"[[at(my.post.uid, "a\"b")]]"#);
    }

    #[test]
    fn test_redact() {
        assert_eq!(
            redact("https://x.io/api/v2/documents/search?ref=R&access_token=secret&page=2"),
            "https://x.io/api/v2/documents/search?ref=R&page=2"
        );
        assert_eq!(redact("https://x.io/api?access_token=s"), "https://x.io/api");
    }

    #[test]
    fn test_requires_endpoint() {
        let err = PrismicClient::new(&CmsConfig::default()).err().unwrap();
        assert!(matches!(err, BlogError::Config(_)));
    }

    #[tokio::test]
    async fn test_query_by_type_uses_master_ref() {
        let base = serve(|base| {
            let next = format!("{}/api/v2/documents/search?ref=MASTER&page=2", base);
            Router::new().route("/api/v2", get(api_root)).route(
                "/api/v2/documents/search",
                get(move |Query(params): Params| async move {
                    let expected = has(&params, "ref", "MASTER")
                        && has(&params, "q", r#"[[at(document.type, "post")]]"#)
                        && has(&params, "pageSize", "1")
                        && has(&params, "access_token", "tok");
                    if !expected {
                        return HttpStatus::BAD_REQUEST.into_response();
                    }
                    Json(json!({
                        "page": 1,
                        "total_pages": 2,
                        "results": [post("first")],
                        "next_page": next
                    }))
                    .into_response()
                }),
            )
        })
        .await;

        let client = PrismicClient::new(&config(&base, Some("tok"))).unwrap();
        let page = client.query_by_type("post", 1).await.unwrap();
        assert_eq!(page.results.len(), 1);
        assert_eq!(page.results[0].uid.as_deref(), Some("first"));
        assert_eq!(
            page.next_page,
            Some(format!("{}/api/v2/documents/search?ref=MASTER&page=2", base))
        );
    }

    #[tokio::test]
    async fn test_fetch_page_follows_cursor() {
        let base = serve(|_| {
            Router::new().route(
                "/api/v2/documents/search",
                get(|Query(params): Params| async move {
                    if !(has(&params, "page", "2") && has(&params, "access_token", "tok")) {
                        return HttpStatus::BAD_REQUEST.into_response();
                    }
                    Json(json!({
                        "page": 2,
                        "results": [post("second")],
                        "next_page": null
                    }))
                    .into_response()
                }),
            )
        })
        .await;

        let client = PrismicClient::new(&config(&base, Some("tok"))).unwrap();
        let cursor = format!("{}/api/v2/documents/search?ref=MASTER&page=2", base);
        let page = client.fetch_page(&cursor).await.unwrap();
        assert_eq!(page.results[0].uid.as_deref(), Some("second"));
        assert_eq!(page.next_page, None);
    }

    #[tokio::test]
    async fn test_get_by_uid() {
        let base = serve(|_| {
            Router::new().route("/api/v2", get(api_root)).route(
                "/api/v2/documents/search",
                get(|Query(params): Params| async move {
                    let results = if has(&params, "q", r#"[[at(my.post.uid, "hooks")]]"#) {
                        vec![post("hooks")]
                    } else {
                        Vec::new()
                    };
                    Json(json!({ "results": results, "next_page": null }))
                }),
            )
        })
        .await;

        let client = PrismicClient::new(&config(&base, None)).unwrap();
        let found = client.get_by_uid("post", "hooks").await.unwrap();
        assert_eq!(found.unwrap().uid.as_deref(), Some("hooks"));
        assert!(client.get_by_uid("post", "missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_server_error_is_retryable() {
        let base = serve(|_| {
            Router::new().route("/api/v2", get(|| async { HttpStatus::SERVICE_UNAVAILABLE }))
        })
        .await;

        let client = PrismicClient::new(&config(&base, None)).unwrap();
        let err = client.query_by_type("post", 1).await.unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_client_error_and_bad_json() {
        let base = serve(|_| {
            Router::new()
                .route("/api/v2", get(|| async { HttpStatus::UNAUTHORIZED }))
                .route("/broken", get(|| async { "not json" }))
        })
        .await;

        let client = PrismicClient::new(&config(&base, None)).unwrap();
        let err = client.query_by_type("post", 1).await.unwrap_err();
        assert!(matches!(err, BlogError::Status { status: 401, .. }));
        assert!(!err.is_retryable());

        let err = client
            .fetch_page(&format!("{}/broken", base))
            .await
            .unwrap_err();
        assert!(matches!(err, BlogError::Decode(_)));
    }

    #[tokio::test]
    async fn test_connection_refused_is_retryable() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let client = PrismicClient::new(&config(&base, None)).unwrap();
        let err = client.query_by_type("post", 1).await.unwrap_err();
        assert!(err.is_retryable());
    }

    /// A repository whose master ref moves from `OLD` to `NEW` after the
    /// first root request; `fresh` is only published under `NEW`
    #[derive(Default)]
    struct Publishing {
        root_calls: AtomicUsize,
        searches: AtomicUsize,
        expire_old_ref: bool,
    }

    fn publishing_api(stub: Arc<Publishing>) -> Router {
        Router::new()
            .route(
                "/api/v2",
                get(|State(stub): State<Arc<Publishing>>| async move {
                    let reference = match stub.root_calls.fetch_add(1, Ordering::SeqCst) {
                        0 => "OLD",
                        _ => "NEW",
                    };
                    Json(json!({ "refs": [{ "ref": reference, "isMasterRef": true }] }))
                }),
            )
            .route(
                "/api/v2/documents/search",
                get(
                    |State(stub): State<Arc<Publishing>>, Query(params): Params| async move {
                        let first_search = stub.searches.fetch_add(1, Ordering::SeqCst) == 0;
                        let on_old = has(&params, "ref", "OLD");
                        if on_old && stub.expire_old_ref && !first_search {
                            return HttpStatus::NOT_FOUND.into_response();
                        }
                        let wants = |uid: &str| has(&params, "q", &at("my.post.uid", uid));
                        let results = if wants("hooks") || (wants("fresh") && !on_old) {
                            vec![post(if wants("hooks") { "hooks" } else { "fresh" })]
                        } else {
                            Vec::new()
                        };
                        Json(json!({ "results": results, "next_page": null })).into_response()
                    },
                ),
            )
            .with_state(stub)
    }

    #[tokio::test]
    async fn test_master_ref_is_resolved_again_after_ttl() {
        let stub = Arc::new(Publishing::default());
        let base = serve(|_| publishing_api(stub.clone())).await;

        let client = PrismicClient::new(&CmsConfig {
            ref_ttl_secs: 0,
            ..config(&base, None)
        })
        .unwrap();

        assert!(client.get_by_uid("post", "fresh").await.unwrap().is_none());
        let found = client.get_by_uid("post", "fresh").await.unwrap();
        assert_eq!(found.unwrap().uid.as_deref(), Some("fresh"));
        assert_eq!(stub.root_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_expired_ref_is_replaced() {
        let stub = Arc::new(Publishing {
            expire_old_ref: true,
            ..Publishing::default()
        });
        let base = serve(|_| publishing_api(stub.clone())).await;

        let client = PrismicClient::new(&CmsConfig {
            ref_ttl_secs: 3600,
            ..config(&base, None)
        })
        .unwrap();

        assert!(client.get_by_uid("post", "hooks").await.unwrap().is_some());
        assert_eq!(stub.root_calls.load(Ordering::SeqCst), 1);

        // the cached OLD ref is rejected, so the client asks for the new one
        let found = client.get_by_uid("post", "fresh").await.unwrap();
        assert_eq!(found.unwrap().uid.as_deref(), Some("fresh"));
        assert_eq!(stub.root_calls.load(Ordering::SeqCst), 2);
    }
}
