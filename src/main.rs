use std::{process, sync::Arc};

use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

use yatube::{
    application::{
        auth::AuthService, error::AppError, feed::FeedService, follows::FollowService,
        posts::PostService, profiles::ProfileService,
    },
    cache::{CacheState, PageCache},
    config,
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        http::{HttpState, build_router},
        telemetry,
        uploads::UploadStorage,
    },
};

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
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let database_url = settings.database.url.clone().ok_or_else(|| {
        InfraError::configuration(
            "no database URL configured; set database.url or YATUBE__DATABASE__URL",
        )
    })?;

    let pool = PostgresRepositories::connect(&database_url, settings.database.max_connections.get())
        .await
        .map_err(|err| InfraError::database(format!("failed to connect: {err}")))?;
    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| InfraError::database(format!("failed to run migrations: {err}")))?;
    let db = Arc::new(PostgresRepositories::new(pool));

    let uploads = Arc::new(UploadStorage::new(settings.uploads.directory.clone()));
    uploads.ensure_root().await.map_err(AppError::from)?;

    let page_size = settings.feed.page_size.get();
    let feed = Arc::new(FeedService::new(
        db.clone(),
        db.clone(),
        db.clone(),
        page_size,
    ));
    let profiles = Arc::new(ProfileService::new(
        db.clone(),
        db.clone(),
        db.clone(),
        db.clone(),
    ));
    let posts = Arc::new(PostService::new(
        db.clone(),
        db.clone(),
        db.clone(),
        db.clone(),
        uploads.clone(),
    ));
    let follows = Arc::new(FollowService::new(db.clone(), db.clone()));
    let auth = Arc::new(AuthService::new(db.clone(), db.clone()));

    let cache = settings.cache.enabled.then(|| CacheState {
        pages: Arc::new(PageCache::new(settings.cache.ttl, settings.cache.capacity)),
    });

    let state = HttpState {
        feed,
        profiles,
        posts,
        follows,
        auth,
        db: Some(db),
        uploads,
        cache,
    };

    let router = build_router(state);
    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(InfraError::Io)?;

    info!(
        addr = %settings.server.addr,
        cache_enabled = settings.cache.enabled,
        page_size = page_size,
        "yatube listening"
    );

    axum::serve(listener, router)
        .await
        .map_err(|err| AppError::from(InfraError::Io(err)))
}
