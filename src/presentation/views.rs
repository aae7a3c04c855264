use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;

use crate::application::error::{ErrorReport, HttpError};

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl TemplateRenderError {
    pub fn new(source: &'static str, public_message: &'static str, error: AskamaError) -> Self {
        Self {
            source,
            public_message,
            error,
        }
    }
}

impl From<TemplateRenderError> for HttpError {
    fn from(err: TemplateRenderError) -> Self {
        let TemplateRenderError {
            source,
            public_message,
            error,
        } = err;

        HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            public_message,
            &error,
        )
    }
}

pub fn render_template<T: Template>(template: T) -> Result<Html<String>, HttpError> {
    template.render().map(Html).map_err(|err| {
        TemplateRenderError::new(
            "presentation::views::render_template",
            "Template rendering failed",
            err,
        )
        .into()
    })
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(template) {
        Ok(html) => (status, html).into_response(),
        Err(err) => err.into_response(),
    }
}

pub fn render_not_found_response(chrome: LayoutChrome) -> Response {
    let content = ErrorPageView::not_found();
    let view = LayoutContext::new(chrome, content);
    let mut response = render_template_response(ErrorTemplate { view }, StatusCode::NOT_FOUND);
    ErrorReport::from_message(
        "presentation::views::render_not_found_response",
        StatusCode::NOT_FOUND,
        "Resource not found",
    )
    .attach(&mut response);
    response
}

/// Site-wide layout data shared by every rendered page.
#[derive(Clone)]
pub struct LayoutChrome {
    pub site_title: String,
    pub tagline: String,
    pub meta: PageMetaView,
}

impl LayoutChrome {
    pub fn with_canonical(self, canonical: String) -> Self {
        Self {
            meta: self.meta.with_canonical(canonical),
            ..self
        }
    }

    pub fn with_meta(self, meta: PageMetaView) -> Self {
        Self { meta, ..self }
    }
}

#[derive(Clone)]
pub struct PageMetaView {
    pub title: String,
    pub description: String,
    pub canonical: String,
}

impl PageMetaView {
    pub fn with_canonical(self, canonical: String) -> Self {
        Self { canonical, ..self }
    }

    pub fn with_content(self, title: String, description: String) -> Self {
        Self {
            title,
            description,
            ..self
        }
    }
}

#[derive(Clone)]
pub struct LayoutContext<T> {
    pub site_title: String,
    pub tagline: String,
    pub meta: PageMetaView,
    pub content: T,
}

impl<T> LayoutContext<T> {
    pub fn new(chrome: LayoutChrome, content: T) -> Self {
        Self {
            site_title: chrome.site_title,
            tagline: chrome.tagline,
            meta: chrome.meta,
            content,
        }
    }
}

#[derive(Clone)]
pub struct TagBadge {
    pub slug: String,
    pub label: String,
    pub path: String,
}

#[derive(Clone)]
pub struct PostCard {
    pub title: String,
    pub author: String,
    pub path: String,
    pub excerpt: String,
    pub published: String,
    pub iso_date: String,
    pub badges: Vec<TagBadge>,
}

#[derive(Clone)]
pub struct PaginationView {
    pub number: u32,
    pub num_pages: u32,
    pub has_previous: bool,
    pub has_next: bool,
    pub previous_path: String,
    pub next_path: String,
}

pub struct PageContext {
    pub posts: Vec<PostCard>,
    pub total_count: u64,
    pub has_results: bool,
    pub active_tag: Option<TagBadge>,
    pub pagination: PaginationView,
    pub posts_ld_json: Option<String>,
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub view: LayoutContext<PageContext>,
}

#[derive(Clone)]
pub struct CommentView {
    pub author_name: String,
    pub body: String,
    pub created: String,
    pub iso_date: String,
}

/// A single form input with its submitted value and inline error, if any.
#[derive(Clone, Default, Debug)]
pub struct FormField {
    pub value: String,
    pub error: String,
}

impl FormField {
    pub fn with_value(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            error: String::new(),
        }
    }

    pub fn has_error(&self) -> bool {
        !self.error.is_empty()
    }
}

#[derive(Clone, Default, Debug)]
pub struct CommentFormView {
    pub name: FormField,
    pub email: FormField,
    pub body: FormField,
}

impl CommentFormView {
    pub fn has_errors(&self) -> bool {
        self.name.has_error() || self.email.has_error() || self.body.has_error()
    }
}

pub struct PostDetailContext {
    pub title: String,
    pub author: String,
    pub published: String,
    pub iso_date: String,
    pub path: String,
    pub share_path: String,
    pub badges: Vec<TagBadge>,
    pub paragraphs: Vec<String>,
    pub comments: Vec<CommentView>,
    pub comment_count: usize,
    pub new_comment: Option<CommentView>,
    pub form: CommentFormView,
    pub related: Vec<PostCard>,
}

#[derive(Template)]
#[template(path = "post.html")]
pub struct PostTemplate {
    pub view: LayoutContext<PostDetailContext>,
}

#[derive(Clone, Default, Debug)]
pub struct ShareFormView {
    pub name: FormField,
    pub email: FormField,
    pub to: FormField,
    pub comments: FormField,
}

impl ShareFormView {
    pub fn has_errors(&self) -> bool {
        self.name.has_error()
            || self.email.has_error()
            || self.to.has_error()
            || self.comments.has_error()
    }
}

pub struct SharePageContext {
    pub post_title: String,
    pub post_path: String,
    pub form: ShareFormView,
    pub sent: bool,
    pub sent_to: String,
}

#[derive(Template)]
#[template(path = "share.html")]
pub struct ShareTemplate {
    pub view: LayoutContext<SharePageContext>,
}

pub struct ErrorPageView {
    pub title: String,
    pub message: String,
}

impl ErrorPageView {
    pub fn not_found() -> Self {
        Self {
            title: "Page Not Found".to_string(),
            message: "The page you requested does not exist. Try returning to the homepage to continue exploring.".to_string(),
        }
    }
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub view: LayoutContext<ErrorPageView>,
}
