use std::{process, sync::Arc};

use brezza::{
    application::{
        comments::CommentService,
        error::AppError,
        feed::FeedService,
        mailer::Mailer,
        repos::{CommentsRepo, HealthRepo, PostsRepo, TagsRepo},
        share::ShareService,
        sitemap::SitemapService,
    },
    config,
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        http::{self, HttpState},
        mail::SmtpMailer,
        telemetry,
    },
    presentation::views::{LayoutChrome, PageMetaView},
};
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (_cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    let repositories = init_repositories(&settings).await?;
    let state = build_http_state(repositories, &settings)?;
    serve_http(&settings, state).await
}

async fn init_repositories(
    settings: &config::Settings,
) -> Result<Arc<PostgresRepositories>, AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))
        .map_err(AppError::from)?;

    let pool =
        PostgresRepositories::connect(database_url, settings.database.max_connections.get())
            .await
            .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    Ok(Arc::new(PostgresRepositories::new(pool)))
}

fn build_http_state(
    repositories: Arc<PostgresRepositories>,
    settings: &config::Settings,
) -> Result<HttpState, AppError> {
    let posts_repo: Arc<dyn PostsRepo> = repositories.clone();
    let comments_repo: Arc<dyn CommentsRepo> = repositories.clone();
    let tags_repo: Arc<dyn TagsRepo> = repositories.clone();
    let health_repo: Arc<dyn HealthRepo> = repositories;

    let mailer: Arc<dyn Mailer> =
        Arc::new(SmtpMailer::from_settings(&settings.mail).map_err(AppError::from)?);

    let public_site_url = settings.site.public_url.to_string();

    let feed = Arc::new(FeedService::new(
        posts_repo.clone(),
        comments_repo.clone(),
        tags_repo,
        settings.site.page_size.get(),
        settings.site.related_limit.get(),
    ));
    let comments = Arc::new(CommentService::new(comments_repo));
    let share = Arc::new(ShareService::new(
        posts_repo.clone(),
        mailer,
        public_site_url.clone(),
    ));
    let sitemap = Arc::new(SitemapService::new(posts_repo, public_site_url.clone()));

    let chrome = LayoutChrome {
        site_title: settings.site.title.clone(),
        tagline: settings.site.tagline.clone(),
        meta: PageMetaView {
            title: settings.site.title.clone(),
            description: settings.site.tagline.clone(),
            canonical: String::new(),
        },
    };

    Ok(HttpState {
        feed,
        comments,
        share,
        sitemap,
        health: health_repo,
        chrome,
        public_site_url,
    })
}

async fn serve_http(settings: &config::Settings, state: HttpState) -> Result<(), AppError> {
    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.public_addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        target = "brezza::server",
        addr = %settings.server.public_addr,
        "listening"
    );

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "failed to install ctrl-c handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to install terminate handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
