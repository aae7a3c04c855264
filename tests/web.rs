use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use time::OffsetDateTime;
use time::macros::datetime;
use tokio::sync::Mutex;
use tower::ServiceExt;
use uuid::Uuid;

use brezza::application::comments::CommentService;
use brezza::application::feed::FeedService;
use brezza::application::mailer::{MailError, Mailer, OutgoingEmail};
use brezza::application::repos::{
    CommentsRepo, HealthRepo, NewCommentParams, PostQueryFilter, PostsRepo, RepoError,
    SitemapEntryRecord, TagsRepo,
};
use brezza::application::share::ShareService;
use brezza::application::sitemap::SitemapService;
use brezza::domain::entities::{CommentRecord, PostRecord, TagRecord};
use brezza::domain::posts::PublishedPath;
use brezza::domain::types::PostStatus;
use brezza::infra::http::{HttpState, build_router};
use brezza::presentation::views::{LayoutChrome, PageMetaView};

const PUBLIC_URL: &str = "https://blog.example/";

#[derive(Default)]
struct InMemoryStore {
    posts: Vec<PostRecord>,
    tags: Vec<TagRecord>,
    post_tags: HashMap<Uuid, Vec<Uuid>>,
    comments: Mutex<Vec<CommentRecord>>,
}

impl InMemoryStore {
    fn tag_ids_for(&self, post_id: Uuid) -> &[Uuid] {
        self.post_tags
            .get(&post_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn published(&self) -> Vec<PostRecord> {
        let mut posts: Vec<PostRecord> = self
            .posts
            .iter()
            .filter(|post| post.is_public())
            .cloned()
            .collect();
        posts.sort_by(|a, b| b.published_at.cmp(&a.published_at).then(a.slug.cmp(&b.slug)));
        posts
    }

    fn published_filtered(&self, filter: &PostQueryFilter) -> Vec<PostRecord> {
        let tag_id = filter.tag.as_ref().and_then(|slug| {
            self.tags
                .iter()
                .find(|tag| &tag.slug == slug)
                .map(|tag| tag.id)
        });

        self.published()
            .into_iter()
            .filter(|post| match (filter.tag.as_ref(), tag_id) {
                (None, _) => true,
                (Some(_), Some(id)) => self.tag_ids_for(post.id).contains(&id),
                (Some(_), None) => false,
            })
            .collect()
    }
}

#[async_trait]
impl PostsRepo for InMemoryStore {
    async fn list_published(
        &self,
        filter: &PostQueryFilter,
        limit: u32,
        offset: u64,
    ) -> Result<Vec<PostRecord>, RepoError> {
        Ok(self
            .published_filtered(filter)
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn count_published(&self, filter: &PostQueryFilter) -> Result<u64, RepoError> {
        Ok(self.published_filtered(filter).len() as u64)
    }

    async fn find_published_by_path(
        &self,
        path: &PublishedPath,
    ) -> Result<Option<PostRecord>, RepoError> {
        let Some((start, end)) = path.day_bounds() else {
            return Ok(None);
        };

        Ok(self.published().into_iter().find(|post| {
            post.slug == path.slug
                && post
                    .published_at
                    .map(|at| at >= start && at < end)
                    .unwrap_or(false)
        }))
    }

    async fn find_published_by_id(&self, id: Uuid) -> Result<Option<PostRecord>, RepoError> {
        Ok(self.published().into_iter().find(|post| post.id == id))
    }

    async fn list_related(&self, post_id: Uuid, limit: u32) -> Result<Vec<PostRecord>, RepoError> {
        let own_tags = self.tag_ids_for(post_id);

        let mut scored: Vec<(usize, PostRecord)> = self
            .published()
            .into_iter()
            .filter(|post| post.id != post_id)
            .filter_map(|post| {
                let shared = self
                    .tag_ids_for(post.id)
                    .iter()
                    .filter(|tag| own_tags.contains(tag))
                    .count();
                (shared > 0).then_some((shared, post))
            })
            .collect();

        scored.sort_by(|(shared_a, a), (shared_b, b)| {
            shared_b
                .cmp(shared_a)
                .then(b.published_at.cmp(&a.published_at))
        });

        Ok(scored
            .into_iter()
            .take(limit as usize)
            .map(|(_, post)| post)
            .collect())
    }

    async fn list_sitemap_entries(&self) -> Result<Vec<SitemapEntryRecord>, RepoError> {
        Ok(self
            .published()
            .into_iter()
            .filter_map(|post| {
                post.published_at.map(|published_at| SitemapEntryRecord {
                    slug: post.slug,
                    published_at,
                })
            })
            .collect())
    }
}

#[async_trait]
impl CommentsRepo for InMemoryStore {
    async fn list_active_for_post(&self, post_id: Uuid) -> Result<Vec<CommentRecord>, RepoError> {
        let comments = self.comments.lock().await;
        let mut matching: Vec<CommentRecord> = comments
            .iter()
            .filter(|comment| comment.post_id == post_id && comment.active)
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(matching)
    }

    async fn insert_comment(&self, params: NewCommentParams) -> Result<CommentRecord, RepoError> {
        let record = CommentRecord {
            id: Uuid::new_v4(),
            post_id: params.post_id,
            author_name: params.author_name,
            email: params.email,
            body: params.body,
            active: true,
            created_at: OffsetDateTime::now_utc(),
        };
        self.comments.lock().await.push(record.clone());
        Ok(record)
    }
}

#[async_trait]
impl TagsRepo for InMemoryStore {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<TagRecord>, RepoError> {
        Ok(self.tags.iter().find(|tag| tag.slug == slug).cloned())
    }

    async fn list_for_post(&self, post_id: Uuid) -> Result<Vec<TagRecord>, RepoError> {
        let ids = self.tag_ids_for(post_id);
        Ok(self
            .tags
            .iter()
            .filter(|tag| ids.contains(&tag.id))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl HealthRepo for InMemoryStore {
    async fn ping(&self) -> Result<(), RepoError> {
        Ok(())
    }
}

#[derive(Default)]
struct RecordingMailer {
    sent: Mutex<Vec<OutgoingEmail>>,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError> {
        self.sent.lock().await.push(email);
        Ok(())
    }
}

fn make_post(slug: &str, title: &str, published_at: Option<OffsetDateTime>) -> PostRecord {
    let created_at = datetime!(2024-01-01 08:00 UTC);
    PostRecord {
        id: Uuid::new_v4(),
        slug: slug.to_string(),
        title: title.to_string(),
        author: "Mira".to_string(),
        body: format!("{title} body text.\n\nSecond paragraph."),
        status: if published_at.is_some() {
            PostStatus::Published
        } else {
            PostStatus::Draft
        },
        published_at,
        created_at,
        updated_at: published_at.unwrap_or(created_at),
    }
}

struct Fixture {
    store: Arc<InMemoryStore>,
    mailer: Arc<RecordingMailer>,
    router: Router,
}

/// Five posts: four published (newest first: ownership, lifetimes, borrowing,
/// gardening) and one draft. Tag layout drives the related-post scenarios.
fn fixture() -> Fixture {
    let tag_rust = TagRecord {
        id: Uuid::new_v4(),
        slug: "rust".to_string(),
        name: "rust".to_string(),
    };
    let tag_web = TagRecord {
        id: Uuid::new_v4(),
        slug: "web".to_string(),
        name: "web".to_string(),
    };
    let tag_life = TagRecord {
        id: Uuid::new_v4(),
        slug: "life".to_string(),
        name: "life".to_string(),
    };

    let ownership = make_post(
        "rust-ownership",
        "Understanding Ownership",
        Some(datetime!(2024-05-02 09:30 UTC)),
    );
    let lifetimes = make_post(
        "rust-lifetimes",
        "Living With Lifetimes",
        Some(datetime!(2024-04-20 10:00 UTC)),
    );
    let borrowing = make_post(
        "rust-borrowing",
        "Borrow Checker Field Notes",
        Some(datetime!(2024-03-15 12:00 UTC)),
    );
    let gardening = make_post(
        "balcony-gardening",
        "Balcony Gardening",
        Some(datetime!(2024-02-01 09:00 UTC)),
    );
    let draft = make_post("rust-unsafe", "Unsafe Drafts", None);

    let mut post_tags = HashMap::new();
    post_tags.insert(ownership.id, vec![tag_rust.id, tag_web.id]);
    post_tags.insert(lifetimes.id, vec![tag_rust.id, tag_web.id]);
    post_tags.insert(borrowing.id, vec![tag_rust.id]);
    post_tags.insert(gardening.id, vec![tag_life.id]);
    post_tags.insert(draft.id, vec![tag_rust.id, tag_web.id]);

    let store = Arc::new(InMemoryStore {
        posts: vec![
            ownership.clone(),
            lifetimes.clone(),
            borrowing.clone(),
            gardening.clone(),
            draft.clone(),
        ],
        tags: vec![tag_rust, tag_web, tag_life],
        post_tags,
        comments: Mutex::new(vec![
            CommentRecord {
                id: Uuid::new_v4(),
                post_id: ownership.id,
                author_name: "Ana".to_string(),
                email: "ana@example.com".to_string(),
                body: "Great introduction.".to_string(),
                active: true,
                created_at: datetime!(2024-05-03 10:00 UTC),
            },
            CommentRecord {
                id: Uuid::new_v4(),
                post_id: ownership.id,
                author_name: "Troll".to_string(),
                email: "troll@example.com".to_string(),
                body: "Hidden remark.".to_string(),
                active: false,
                created_at: datetime!(2024-05-03 11:00 UTC),
            },
        ]),
    });

    let mailer = Arc::new(RecordingMailer::default());
    let router = build_state_router(store.clone(), mailer.clone());

    Fixture {
        store,
        mailer,
        router,
    }
}

fn build_state_router(store: Arc<InMemoryStore>, mailer: Arc<RecordingMailer>) -> Router {
    let posts: Arc<dyn PostsRepo> = store.clone();
    let comments_repo: Arc<dyn CommentsRepo> = store.clone();
    let tags: Arc<dyn TagsRepo> = store.clone();
    let health: Arc<dyn HealthRepo> = store;
    let mailer: Arc<dyn Mailer> = mailer;

    let feed = Arc::new(FeedService::new(
        posts.clone(),
        comments_repo.clone(),
        tags,
        3,
        4,
    ));
    let comments = Arc::new(CommentService::new(comments_repo));
    let share = Arc::new(ShareService::new(
        posts.clone(),
        mailer,
        PUBLIC_URL.to_string(),
    ));
    let sitemap = Arc::new(SitemapService::new(posts, PUBLIC_URL.to_string()));

    let chrome = LayoutChrome {
        site_title: "Test Blog".to_string(),
        tagline: "Testing notes".to_string(),
        meta: PageMetaView {
            title: "Test Blog".to_string(),
            description: "Testing notes".to_string(),
            canonical: String::new(),
        },
    };

    build_router(HttpState {
        feed,
        comments,
        share,
        sitemap,
        health,
        chrome,
        public_site_url: PUBLIC_URL.to_string(),
    })
}

async fn get(router: &Router, uri: &str) -> (StatusCode, String) {
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .uri(uri)
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    (status, String::from_utf8_lossy(&bytes).into_owned())
}

async fn post_form(router: &Router, uri: &str, form: &str) -> (StatusCode, String) {
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(form.to_string()))
                .expect("request"),
        )
        .await
        .expect("response");

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    (status, String::from_utf8_lossy(&bytes).into_owned())
}

#[tokio::test]
async fn listing_shows_newest_posts_first_and_paginates() {
    let fx = fixture();

    let (status, body) = get(&fx.router, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Understanding Ownership"));
    assert!(body.contains("Living With Lifetimes"));
    assert!(body.contains("Borrow Checker Field Notes"));
    assert!(!body.contains("Balcony Gardening"));
    assert!(body.contains("Page 1 of 2"));

    let (status, body) = get(&fx.router, "/?page=2").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Balcony Gardening"));
    assert!(!body.contains("Understanding Ownership"));
    assert!(body.contains("Page 2 of 2"));
}

#[tokio::test]
async fn bad_page_values_degrade_gracefully() {
    let fx = fixture();

    // Non-numeric falls back to the first page.
    let (status, body) = get(&fx.router, "/?page=abc").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Page 1 of 2"));

    // Numeric but out of range falls back to the last page.
    let (status, body) = get(&fx.router, "/?page=99").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Page 2 of 2"));
    assert!(body.contains("Balcony Gardening"));

    let (status, body) = get(&fx.router, "/?page=0").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Page 2 of 2"));
}

#[tokio::test]
async fn tag_filter_restricts_listing_and_unknown_tag_is_not_found() {
    let fx = fixture();

    let (status, body) = get(&fx.router, "/tag/life").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Balcony Gardening"));
    assert!(!body.contains("Understanding Ownership"));

    let (status, body) = get(&fx.router, "/tag/cooking").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.contains("Page Not Found"));
}

#[tokio::test]
async fn drafts_are_unreachable_everywhere() {
    let fx = fixture();
    let draft = fx
        .store
        .posts
        .iter()
        .find(|post| post.status == PostStatus::Draft)
        .cloned()
        .expect("draft fixture");

    let (status, body) = get(&fx.router, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(!body.contains("Unsafe Drafts"));

    // Drafts have no publish date, so no canonical path can match; any date
    // guess is a 404.
    let (status, _) = get(&fx.router, "/2024/05/02/rust-unsafe").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = get(&fx.router, &format!("/share/{}", draft.id)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, sitemap) = get(&fx.router, "/sitemap.xml").await;
    assert!(!sitemap.contains("rust-unsafe"));
}

#[tokio::test]
async fn detail_shows_active_comments_and_ranked_related_posts() {
    let fx = fixture();

    let (status, body) = get(&fx.router, "/2024/05/02/rust-ownership").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Understanding Ownership"));
    assert!(body.contains("1 comment"));
    assert!(body.contains("Great introduction."));
    assert!(!body.contains("Hidden remark."));

    // Two shared tags outrank one; zero overlap and the post itself are
    // excluded.
    let lifetimes_pos = body.find("Living With Lifetimes").expect("two-tag match");
    let borrowing_pos = body.find("Borrow Checker Field Notes").expect("one-tag match");
    assert!(lifetimes_pos < borrowing_pos);
    assert!(!body.contains("Balcony Gardening"));
    assert!(!body.contains("Unsafe Drafts"));
}

#[tokio::test]
async fn detail_with_wrong_date_or_slug_is_not_found() {
    let fx = fixture();

    let (status, _) = get(&fx.router, "/2024/05/03/rust-ownership").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = get(&fx.router, "/2024/05/02/rust-nothing").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = get(&fx.router, "/2024/02/30/rust-ownership").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn valid_comment_is_persisted_and_echoed() {
    let fx = fixture();
    let before = fx.store.comments.lock().await.len();

    let (status, body) = post_form(
        &fx.router,
        "/2024/05/02/rust-ownership",
        "name=Ana&email=ana%40example.com&body=Nice+post",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Your comment has been added, Ana."));
    assert!(body.contains("Nice post"));
    assert!(body.contains("2 comments"));

    let comments = fx.store.comments.lock().await;
    assert_eq!(comments.len(), before + 1);
    let stored = comments.last().expect("stored comment");
    assert!(stored.active);
    assert_eq!(stored.body, "Nice post");

    let ownership = fx
        .store
        .posts
        .iter()
        .find(|post| post.slug == "rust-ownership")
        .expect("fixture post");
    assert_eq!(stored.post_id, ownership.id);
}

#[tokio::test]
async fn invalid_comment_is_rejected_with_field_errors() {
    let fx = fixture();
    let before = fx.store.comments.lock().await.len();

    let (status, body) = post_form(
        &fx.router,
        "/2024/05/02/rust-ownership",
        "name=Ana&email=not-an-address&body=",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Enter a valid email address."));
    assert!(body.contains("This field is required."));
    assert!(!body.contains("Your comment has been added"));
    assert_eq!(fx.store.comments.lock().await.len(), before);
}

#[tokio::test]
async fn valid_share_sends_one_templated_email() {
    let fx = fixture();
    let ownership = fx
        .store
        .posts
        .iter()
        .find(|post| post.slug == "rust-ownership")
        .cloned()
        .expect("fixture post");

    let (status, body) = post_form(
        &fx.router,
        &format!("/share/{}", ownership.id),
        "name=Ana&email=ana%40example.com&to=friend%40example.com&comments=worth+reading",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("successfully recommended to friend@example.com"));

    let sent = fx.mailer.sent.lock().await;
    assert_eq!(sent.len(), 1);
    let email = &sent[0];
    assert_eq!(email.to, "friend@example.com");
    assert_eq!(
        email.subject,
        "Ana (ana@example.com) recommends you reading \"Understanding Ownership\""
    );
    assert_eq!(
        email.body,
        "Read \"Understanding Ownership\" at https://blog.example/2024/05/02/rust-ownership\n\nAna's comments: worth reading"
    );
}

#[tokio::test]
async fn invalid_share_sends_nothing() {
    let fx = fixture();
    let ownership = fx
        .store
        .posts
        .iter()
        .find(|post| post.slug == "rust-ownership")
        .cloned()
        .expect("fixture post");

    let (status, body) = post_form(
        &fx.router,
        &format!("/share/{}", ownership.id),
        "name=Ana&email=ana%40example.com&to=friend%40nowhere&comments=",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Enter a valid email address."));
    assert!(!body.contains("successfully recommended"));
    assert!(fx.mailer.sent.lock().await.is_empty());
}

#[tokio::test]
async fn sitemap_lists_every_published_post_once() {
    let fx = fixture();

    let (status, body) = get(&fx.router, "/sitemap.xml").await;
    assert_eq!(status, StatusCode::OK);

    for (slug, lastmod) in [
        ("2024/05/02/rust-ownership", "2024-05-02T09:30:00Z"),
        ("2024/04/20/rust-lifetimes", "2024-04-20T10:00:00Z"),
        ("2024/03/15/rust-borrowing", "2024-03-15T12:00:00Z"),
        ("2024/02/01/balcony-gardening", "2024-02-01T09:00:00Z"),
    ] {
        let loc = format!("<loc>https://blog.example/{slug}</loc>");
        assert_eq!(body.matches(&loc).count(), 1, "missing or duplicated {slug}");
        assert!(body.contains(lastmod));
    }

    assert_eq!(body.matches("<changefreq>weekly</changefreq>").count(), 4);
    assert_eq!(body.matches("<priority>0.9</priority>").count(), 4);
}

#[tokio::test]
async fn robots_txt_points_at_sitemap() {
    let fx = fixture();

    let (status, body) = get(&fx.router, "/robots.txt").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Sitemap: https://blog.example/sitemap.xml"));
}

#[tokio::test]
async fn health_endpoint_reports_no_content() {
    let fx = fixture();

    let (status, _) = get(&fx.router, "/_health/db").await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}
