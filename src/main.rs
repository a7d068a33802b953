use std::{process, sync::Arc, time::Duration};

use tokio::signal;
use topzonal::{
    application::{
        error::AppError,
        listings::ListingService,
        mirror::{IndexMirror, SearchIndex},
        payments::PaymentService,
        ranking::PopularListingsService,
        repos::{ListingsRepo, ListingsWriteRepo, ReviewsRepo, SeedRepo, UsersRepo},
        reviews::ReviewService,
        seed::SeedService,
    },
    cache::{CacheConfig, MemoryRankingStore, RankingStore},
    config,
    infra::{
        cache::RedisRankingStore,
        db::PostgresRepositories,
        error::InfraError,
        http::{self, ApiRateLimiter, ApiState},
        search::AlgoliaIndex,
        telemetry,
    },
};
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
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
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Seed(_) => run_seed(settings).await,
        config::Command::Reindex(args) => run_reindex(settings, args).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let services = build_services(repositories.clone(), &settings)?;

    let store = ranking_store(&settings.cache)?;
    let ranking = Arc::new(PopularListingsService::new(
        repositories.clone(),
        store,
        CacheConfig::from(&settings.cache),
        settings.database.query_timeout,
    ));

    let rate_limiter = Arc::new(ApiRateLimiter::new(
        Duration::from_secs(u64::from(settings.api_rate_limit.window_seconds.get())),
        settings.api_rate_limit.max_requests.get(),
    ));

    let state = ApiState {
        listings: services.listings,
        popular: ranking,
        reviews: services.reviews,
        payments: Arc::new(PaymentService::new(
            repositories.clone(),
            settings.payments.webhook_secret.clone(),
            settings.payments.tolerance,
            settings.payments.entitlement_days.get(),
        )),
        db: Some(repositories),
        rate_limiter,
        user_header: settings.auth.user_header.clone(),
    };

    if settings.payments.webhook_secret.is_none() {
        warn!(
            target: "topzonal::payments",
            "payments.webhook_secret is not set; webhook calls will be refused"
        );
    }

    serve_http(&settings, state).await
}

async fn run_seed(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let services = build_services(repositories.clone(), &settings)?;

    let store: Arc<dyn SeedRepo> = repositories.clone();
    let users: Arc<dyn UsersRepo> = repositories;
    let seeder = SeedService::new(
        store,
        users,
        (*services.listings).clone(),
        (*services.reviews).clone(),
    );

    info!(target: "topzonal::seed", "Seeding database");
    let report = seeder.run().await.map_err(AppError::from)?;
    info!(
        target: "topzonal::seed",
        users = report.users,
        listings = report.listings,
        images = report.images,
        reviews = report.reviews,
        "Seed completed"
    );
    Ok(())
}

async fn run_reindex(
    settings: config::Settings,
    args: config::ReindexArgs,
) -> Result<(), AppError> {
    let mirror = build_mirror(&settings.search)?
        .ok_or_else(|| AppError::validation("reindex requires search.app_id and search.api_key"))?;
    let repositories = init_repositories(&settings).await?;

    let concurrency = args.concurrency.clamp(1, 32);
    info!(
        target: "topzonal::mirror",
        concurrency,
        index = %settings.search.index_name,
        "Starting reindex"
    );

    let report = mirror
        .reindex_all(repositories.as_ref(), concurrency)
        .await
        .map_err(AppError::from)?;

    info!(
        target: "topzonal::mirror",
        indexed = report.indexed,
        failed = report.failed,
        "Reindex completed"
    );

    if report.failed > 0 {
        return Err(AppError::unexpected(format!(
            "{} listing(s) could not be indexed",
            report.failed
        )));
    }
    Ok(())
}

struct Services {
    listings: Arc<ListingService>,
    reviews: Arc<ReviewService>,
}

fn build_services(
    repositories: Arc<PostgresRepositories>,
    settings: &config::Settings,
) -> Result<Services, AppError> {
    let listings_repo: Arc<dyn ListingsRepo> = repositories.clone();
    let listings_write_repo: Arc<dyn ListingsWriteRepo> = repositories.clone();
    let reviews_repo: Arc<dyn ReviewsRepo> = repositories.clone();
    let users_repo: Arc<dyn UsersRepo> = repositories;

    let mirror = build_mirror(&settings.search)?;
    if mirror.is_none() {
        info!(
            target: "topzonal::mirror",
            "Search credentials not configured; listing writes will not be mirrored"
        );
    }

    let listings = Arc::new(
        ListingService::new(listings_repo.clone(), listings_write_repo, users_repo.clone())
            .with_mirror_opt(mirror),
    );
    let reviews = Arc::new(ReviewService::new(listings_repo, reviews_repo, users_repo));

    Ok(Services { listings, reviews })
}

fn build_mirror(search: &config::SearchSettings) -> Result<Option<Arc<IndexMirror>>, AppError> {
    let index = AlgoliaIndex::from_settings(search).map_err(AppError::from)?;
    Ok(index.map(|index| {
        let index: Arc<dyn SearchIndex> = Arc::new(index);
        Arc::new(IndexMirror::new(index, search.timeout))
    }))
}

fn ranking_store(cache: &config::CacheSettings) -> Result<Arc<dyn RankingStore>, AppError> {
    match cache.redis_url.as_deref() {
        Some(url) => {
            info!(target: "topzonal::ranking", "Using redis ranking store");
            Ok(Arc::new(RedisRankingStore::open(url).map_err(AppError::from)?))
        }
        None => {
            warn!(
                target: "topzonal::ranking",
                "cache.redis_url is not set; ranking cache is process-local"
            );
            Ok(Arc::new(MemoryRankingStore::new()))
        }
    }
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

    let pool = PostgresRepositories::connect(
        database_url,
        settings.database.max_connections.get(),
        settings.database.query_timeout,
    )
    .await
    .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    Ok(Arc::new(PostgresRepositories::new(pool)))
}

async fn serve_http(settings: &config::Settings, state: ApiState) -> Result<(), AppError> {
    let router = http::build_router(state);

    let addr = settings.server.addr;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| AppError::from(InfraError::Bind { addr, source }))?;
    info!(addr = %addr, "Listening");

    let (shutdown_tx, mut shutdown_rx) = tokio::sync::watch::channel(false);
    let mut server = tokio::spawn(async move {
        axum::serve(listener, router.into_make_service())
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.changed().await;
            })
            .await
    });

    tokio::select! {
        joined = &mut server => return server_result(joined),
        _ = signal::ctrl_c() => {}
    }

    let grace = settings.server.graceful_shutdown;
    info!(grace_seconds = grace.as_secs(), "Shutdown requested, draining connections");
    let _ = shutdown_tx.send(true);

    match tokio::time::timeout(grace, &mut server).await {
        Ok(joined) => server_result(joined),
        Err(_) => {
            warn!(grace_seconds = grace.as_secs(), "Graceful shutdown timed out");
            server.abort();
            Ok(())
        }
    }
}

fn server_result(
    joined: Result<std::io::Result<()>, tokio::task::JoinError>,
) -> Result<(), AppError> {
    joined
        .map_err(|err| AppError::unexpected(format!("server task failed: {err}")))?
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))
}
