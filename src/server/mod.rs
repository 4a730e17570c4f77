//! Preview server
//!
//! Serves the generated site. Posts that have no generated page yet (for
//! example, published after the last build) are fetched and rendered on
//! request.

use anyhow::Result;
use axum::{
    body::Body,
    extract::{Path, State},
    http::{Request, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::content::ContentLoader;
use crate::error::BlogError;
use crate::generator::post_output_path;
use crate::templates::PageRenderer;
use crate::Blog;

/// Server state
pub struct ServerState {
    public_dir: PathBuf,
    pages: PageRenderer,
    loader: ContentLoader,
}

impl ServerState {
    pub fn new(blog: &Blog, loader: ContentLoader) -> Result<Self> {
        Ok(Self {
            public_dir: blog.public_dir.clone(),
            pages: PageRenderer::new(&blog.config, blog.i18n()?)?,
            loader,
        })
    }
}

/// Routes of the preview server
pub fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/post/:slug", get(post_handler))
        .route("/post/:slug/", get(post_handler))
        .fallback(fallback_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the preview server
pub async fn start(blog: &Blog, loader: ContentLoader, ip: &str, port: u16) -> Result<()> {
    let state = Arc::new(ServerState::new(blog, loader)?);
    let app = router(state);

    // Parse address - handle "localhost" specially
    let bind_ip = if ip == "localhost" { "127.0.0.1" } else { ip };
    let addr: SocketAddr = format!("{}:{}", bind_ip, port).parse()?;

    println!("Server running at http://{}:{}", ip, port);
    println!("Press Ctrl+C to stop.");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// A post page: the generated file when present, otherwise rendered on demand
async fn post_handler(
    State(state): State<Arc<ServerState>>,
    Path(slug): Path<String>,
) -> Response {
    let Some(file_path) = post_output_path(&state.public_dir, &slug) else {
        return state.not_found();
    };

    if let Ok(content) = tokio::fs::read_to_string(&file_path).await {
        return Html(content).into_response();
    }

    tracing::debug!("No generated page for {:?}, fetching it", slug);
    let post = match state.loader.post(&slug).await {
        Ok(post) => post,
        Err(e) => return state.error_page(e),
    };

    match state.pages.post(&post) {
        Ok(html) => Html(html).into_response(),
        Err(e) => state.error_page(e),
    }
}

/// Serve files from the public directory
async fn fallback_handler(
    State(state): State<Arc<ServerState>>,
    request: Request<Body>,
) -> Response {
    let mut service = ServeDir::new(&state.public_dir).append_index_html_on_directories(true);
    match service.try_call(request).await {
        Ok(response) if response.status() == StatusCode::NOT_FOUND => state.not_found(),
        Ok(response) => response.into_response(),
        Err(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Server error").into_response(),
    }
}

impl ServerState {
    fn not_found(&self) -> Response {
        self.page(StatusCode::NOT_FOUND, self.pages.not_found())
    }

    /// Map a content error to a status and page
    fn error_page(&self, error: BlogError) -> Response {
        if error.is_not_found() {
            tracing::debug!("{}", error);
            return self.not_found();
        }

        if error.is_retryable() {
            tracing::warn!("Content API unavailable: {}", error);
            self.page(StatusCode::SERVICE_UNAVAILABLE, self.pages.unavailable())
        } else {
            tracing::error!("Failed to render post: {}", error);
            self.page(StatusCode::BAD_GATEWAY, self.pages.unavailable())
        }
    }

    fn page(&self, status: StatusCode, html: crate::error::Result<String>) -> Response {
        match html {
            Ok(html) => (status, Html(html)).into_response(),
            Err(e) => {
                tracing::error!("Template error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Server error").into_response()
            }
        }
    }
}
