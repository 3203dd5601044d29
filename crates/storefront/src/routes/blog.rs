//! Blog route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use tracing::{instrument, warn};

use shopfront_core::BlogId;
use shopfront_core::content::BlogPost;

use crate::error::Result;
use crate::middleware::{CspNonce, StoreScope};
use crate::routes::layout::{Layout, Shop};
use crate::sections::asset_path;
use crate::state::AppState;

/// Characters of plain text shown on a blog card.
pub const EXCERPT_LEN: usize = 160;

/// Post display data for templates.
#[derive(Debug, Clone)]
pub struct PostView {
    pub id: String,
    pub title: String,
    pub image: Option<String>,
    pub excerpt: String,
    /// Merchant-authored HTML body.
    pub body_html: String,
}

impl PostView {
    #[must_use]
    pub fn new(post: &BlogPost, asset_url: &str) -> Self {
        Self {
            id: post.blog_id.to_string(),
            title: post.blog_name.clone(),
            image: post.cover_image().map(|path| asset_path(asset_url, path)),
            excerpt: excerpt(&post.blog_description, EXCERPT_LEN),
            body_html: post.blog_description.clone(),
        }
    }
}

/// Plain-text preview of an HTML body, cut at a word boundary.
fn excerpt(html: &str, max_chars: usize) -> String {
    let mut text = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => {
                in_tag = false;
                text.push(' ');
            }
            _ if !in_tag => text.push(c),
            _ => {}
        }
    }
    let words: Vec<&str> = text.split_whitespace().collect();
    let mut out = String::new();
    for word in words {
        if out.chars().count() + word.chars().count() + 1 > max_chars {
            out.push('…');
            return out;
        }
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    out
}

/// Blog index page template.
#[derive(Template, WebTemplate)]
#[template(path = "pages/blog.html")]
pub struct BlogIndexTemplate {
    pub layout: Layout,
    pub posts: Vec<PostView>,
}

/// Blog post page template.
#[derive(Template, WebTemplate)]
#[template(path = "pages/blog_post.html")]
pub struct BlogPostTemplate {
    pub layout: Layout,
    pub post: PostView,
}

/// Display the blog index.
#[instrument(skip_all, fields(store_id = %scope.store_id))]
pub async fn index(
    State(state): State<AppState>,
    nonce: CspNonce,
    mut scope: StoreScope,
) -> Result<Response> {
    let shop = Shop::load(&state, &mut scope).await;
    let posts = match state.backend().blogs(&scope.store_id).await {
        Ok(posts) => posts,
        Err(e) => {
            warn!(error = %e, "blog list unavailable");
            Vec::new()
        }
    };
    let asset_url = &state.config().backend.asset_url;
    let posts = posts.iter().map(|p| PostView::new(p, asset_url)).collect();

    let layout = Layout::load(&state, &scope, &shop, nonce, Some("Blog")).await?;
    scope.save().await?;

    Ok(BlogIndexTemplate { layout, posts }.into_response())
}

/// Display a single post.
#[instrument(skip_all, fields(store_id = %scope.store_id, blog_id = %id))]
pub async fn show(
    State(state): State<AppState>,
    nonce: CspNonce,
    mut scope: StoreScope,
    Path(id): Path<String>,
) -> Result<Response> {
    let shop = Shop::load(&state, &mut scope).await;
    let post = state.backend().blog(&BlogId::new(id.as_str())).await?;
    let post = PostView::new(&post, &state.config().backend.asset_url);

    let layout = Layout::load(&state, &scope, &shop, nonce, Some(post.title.as_str())).await?;
    scope.save().await?;

    Ok(BlogPostTemplate { layout, post }.into_response())
}
