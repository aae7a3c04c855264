use std::sync::Arc;

use axum::{
    Router,
    extract::{Form, Path, Query, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    application::{
        comments::CommentService,
        error::{ErrorReport, HttpError, repo_error_to_http},
        feed::{self, FeedError, FeedService},
        repos::HealthRepo,
        share::{ShareError, ShareService},
        sitemap::SitemapService,
    },
    domain::posts::PublishedPath,
    presentation::views::{
        CommentFormView, IndexTemplate, LayoutChrome, LayoutContext, PageMetaView,
        PostDetailContext, PostTemplate, ShareFormView, SharePageContext, ShareTemplate,
        render_not_found_response, render_template_response,
    },
};

use super::{
    db_health_response,
    forms::{CommentForm, ShareForm},
    middleware::{log_responses, set_request_context},
};

#[derive(Clone)]
pub struct HttpState {
    pub feed: Arc<FeedService>,
    pub comments: Arc<CommentService>,
    pub share: Arc<ShareService>,
    pub sitemap: Arc<SitemapService>,
    pub health: Arc<dyn HealthRepo>,
    pub chrome: LayoutChrome,
    pub public_site_url: String,
}

pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/tag/{tag}", get(tag_index))
        .route("/share/{id}", get(share_form).post(share_submit))
        .route("/sitemap.xml", get(sitemap))
        .route("/robots.txt", get(robots_txt))
        .route("/_health/db", get(health))
        .route(
            "/{year}/{month}/{day}/{slug}",
            get(post_detail).post(post_comment),
        )
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PageQuery {
    page: Option<String>,
}

async fn index(State(state): State<HttpState>, Query(query): Query<PageQuery>) -> Response {
    let chrome = state.chrome.clone();

    match state
        .feed
        .page_context(&feed::FeedFilter::All, query.page.as_deref())
        .await
    {
        Ok(mut content) => {
            content.posts_ld_json = feed::build_posts_ld_json(
                &content.posts,
                "/",
                &state.public_site_url,
                &chrome.site_title,
            );
            let canonical = canonical_url(&state.public_site_url, "/");
            let view = LayoutContext::new(chrome.with_canonical(canonical), content);
            render_template_response(IndexTemplate { view }, StatusCode::OK)
        }
        Err(err) => feed_error_to_response(err, chrome),
    }
}

async fn tag_index(
    State(state): State<HttpState>,
    Path(tag): Path<String>,
    Query(query): Query<PageQuery>,
) -> Response {
    let chrome = state.chrome.clone();

    let filter = match state.feed.resolve_filter(Some(&tag)).await {
        Ok(filter) => filter,
        Err(err) => return feed_error_to_response(err, chrome),
    };

    match state.feed.page_context(&filter, query.page.as_deref()).await {
        Ok(mut content) => {
            content.posts_ld_json = feed::build_posts_ld_json(
                &content.posts,
                &filter.base_path(),
                &state.public_site_url,
                &chrome.site_title,
            );
            let canonical = canonical_url(&state.public_site_url, &format!("/tag/{tag}"));
            let view = LayoutContext::new(chrome.with_canonical(canonical), content);
            render_template_response(IndexTemplate { view }, StatusCode::OK)
        }
        Err(err) => feed_error_to_response(err, chrome),
    }
}

async fn post_detail(
    State(state): State<HttpState>,
    Path(segments): Path<(String, String, String, String)>,
) -> Response {
    let chrome = state.chrome.clone();

    let Some(path) = parse_published_path(&segments) else {
        return render_not_found_response(chrome);
    };

    match state.feed.post_detail(&path).await {
        Ok(Some(content)) => render_post_page(&state, chrome, content),
        Ok(None) => render_not_found_response(chrome),
        Err(err) => feed_error_to_response(err, chrome),
    }
}

async fn post_comment(
    State(state): State<HttpState>,
    Path(segments): Path<(String, String, String, String)>,
    Form(form): Form<CommentForm>,
) -> Response {
    let chrome = state.chrome.clone();

    let Some(path) = parse_published_path(&segments) else {
        return render_not_found_response(chrome);
    };

    let post = match state.feed.find_post(&path).await {
        Ok(Some(post)) => post,
        Ok(None) => return render_not_found_response(chrome),
        Err(err) => return feed_error_to_response(err, chrome),
    };

    match form.validate() {
        Ok(draft) => {
            let record = match state.comments.submit(&post, draft).await {
                Ok(record) => record,
                Err(err) => {
                    return repo_error_to_http("infra::http::post_comment", err).into_response();
                }
            };

            // Re-read the detail context so the stored comment shows up in
            // the thread alongside the submission notice.
            match state.feed.post_detail(&path).await {
                Ok(Some(mut content)) => {
                    content.new_comment = Some(feed::comment_view(&record));
                    content.form = CommentFormView::default();
                    render_post_page(&state, chrome, content)
                }
                Ok(None) => render_not_found_response(chrome),
                Err(err) => feed_error_to_response(err, chrome),
            }
        }
        Err(form_view) => match state.feed.post_detail(&path).await {
            Ok(Some(mut content)) => {
                content.form = form_view;
                render_post_page(&state, chrome, content)
            }
            Ok(None) => render_not_found_response(chrome),
            Err(err) => feed_error_to_response(err, chrome),
        },
    }
}

async fn share_form(State(state): State<HttpState>, Path(id): Path<Uuid>) -> Response {
    let chrome = state.chrome.clone();

    match state.share.load_post(id).await {
        Ok(Some(post)) => render_share_page(
            &state,
            chrome,
            &post,
            ShareFormView::default(),
            None,
        ),
        Ok(None) => render_not_found_response(chrome),
        Err(err) => repo_error_to_http("infra::http::share_form", err).into_response(),
    }
}

async fn share_submit(
    State(state): State<HttpState>,
    Path(id): Path<Uuid>,
    Form(form): Form<ShareForm>,
) -> Response {
    let chrome = state.chrome.clone();

    let post = match state.share.load_post(id).await {
        Ok(Some(post)) => post,
        Ok(None) => return render_not_found_response(chrome),
        Err(err) => return repo_error_to_http("infra::http::share_submit", err).into_response(),
    };

    match form.validate() {
        Ok(draft) => match state.share.share(&post, &draft).await {
            Ok(()) => render_share_page(
                &state,
                chrome,
                &post,
                ShareFormView::default(),
                Some(draft.to),
            ),
            Err(ShareError::Repo(err)) => {
                repo_error_to_http("infra::http::share_submit", err).into_response()
            }
            Err(ShareError::Mail(err)) => HttpError::from(err).into_response(),
        },
        Err(form_view) => render_share_page(&state, chrome, &post, form_view, None),
    }
}

async fn sitemap(State(state): State<HttpState>) -> Response {
    match state.sitemap.sitemap_xml().await {
        Ok(body) => xml_response(body, "application/xml"),
        Err(err) => HttpError::new(
            "infra::http::public::sitemap",
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to generate sitemap",
            err.to_string(),
        )
        .into_response(),
    }
}

async fn robots_txt(State(state): State<HttpState>) -> Response {
    match state.sitemap.robots_txt().await {
        Ok(body) => plain_response(body),
        Err(err) => HttpError::new(
            "infra::http::public::robots",
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to generate robots.txt",
            err.to_string(),
        )
        .into_response(),
    }
}

async fn health(State(state): State<HttpState>) -> Response {
    db_health_response(state.health.ping().await)
}

fn parse_published_path(segments: &(String, String, String, String)) -> Option<PublishedPath> {
    let (year, month, day, slug) = segments;
    let year = year.parse::<i32>().ok()?;
    let month = month.parse::<u8>().ok()?;
    let day = day.parse::<u8>().ok()?;
    if slug.is_empty() {
        return None;
    }
    Some(PublishedPath::new(year, month, day, slug.clone()))
}

fn render_post_page(
    state: &HttpState,
    chrome: LayoutChrome,
    content: PostDetailContext,
) -> Response {
    let canonical = canonical_url(&state.public_site_url, &content.path);
    let meta = post_meta(&chrome, &content, canonical);
    let view = LayoutContext::new(chrome.with_meta(meta), content);
    render_template_response(PostTemplate { view }, StatusCode::OK)
}

fn render_share_page(
    state: &HttpState,
    chrome: LayoutChrome,
    post: &crate::domain::entities::PostRecord,
    form: ShareFormView,
    sent_to: Option<String>,
) -> Response {
    let published_at = post.published_at.unwrap_or(post.created_at);
    let post_path = crate::domain::posts::canonical_path(&post.slug, published_at);
    let canonical = canonical_url(&state.public_site_url, &format!("/share/{}", post.id));

    let content = SharePageContext {
        post_title: post.title.clone(),
        post_path,
        form,
        sent: sent_to.is_some(),
        sent_to: sent_to.unwrap_or_default(),
    };

    let title = format!("Share: {}", post.title);
    let meta = chrome
        .meta
        .clone()
        .with_canonical(canonical)
        .with_content(title, chrome.meta.description.clone());
    let view = LayoutContext::new(chrome.with_meta(meta), content);
    render_template_response(ShareTemplate { view }, StatusCode::OK)
}

fn feed_error_to_response(err: FeedError, chrome: LayoutChrome) -> Response {
    match err {
        FeedError::UnknownTag => {
            let mut response = render_not_found_response(chrome);
            ErrorReport::from_message(
                "infra::http::feed_error_to_response",
                StatusCode::NOT_FOUND,
                "Unknown tag",
            )
            .attach(&mut response);
            response
        }
        err => HttpError::from(err).into_response(),
    }
}

pub(crate) fn post_meta(
    chrome: &LayoutChrome,
    content: &PostDetailContext,
    canonical: String,
) -> PageMetaView {
    let description = content
        .paragraphs
        .first()
        .map(|paragraph| crate::domain::posts::excerpt(paragraph, 180))
        .filter(|text| !text.is_empty())
        .unwrap_or_else(|| chrome.meta.description.clone());

    chrome
        .meta
        .clone()
        .with_canonical(canonical)
        .with_content(content.title.clone(), description)
}

pub(crate) fn canonical_url(base: &str, path: &str) -> String {
    let root = format!("{}/", base.trim_end_matches('/'));
    let trimmed = path.trim_start_matches('/');
    if trimmed.is_empty() {
        root
    } else {
        format!("{root}{trimmed}")
    }
}

fn xml_response(body: String, content_type: &str) -> Response {
    Response::builder()
        .status(StatusCode::OK)
        .header(axum::http::header::CONTENT_TYPE, content_type)
        .body(axum::body::Body::from(body))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

fn plain_response(body: String) -> Response {
    Response::builder()
        .status(StatusCode::OK)
        .header(
            axum::http::header::CONTENT_TYPE,
            "text/plain; charset=utf-8",
        )
        .body(axum::body::Body::from(body))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}
