//! Orbit server entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use orbit_api::AppState;
use orbit_common::{Config, LocalStorage};
use orbit_core::{
    AdminService, ChangeFeed, CommentService, FollowService, GoTrueIdentity, LikeService,
    NotificationDispatcher, NotificationService, PostService, ProfileService, SessionService,
    UploadService,
};
use orbit_db::repositories::{
    CommentRepository, FollowRepository, LikeRepository, NotificationRepository, PostRepository,
    ProfileRepository,
};
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Multipart framing allowance on top of the largest accepted file.
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "orbit=debug,tower_http=debug".into());

    // ORBIT_LOG_FORMAT=json switches to one JSON object per line.
    let json = std::env::var("ORBIT_LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    info!("Starting orbit server...");

    let config = Config::load()?;

    let db = orbit_db::init(&config).await?;
    info!("Connected to database");

    info!("Running database migrations...");
    orbit_db::migrate(&db).await?;
    info!("Migrations completed");

    let db = Arc::new(db);

    // Repositories
    let profile_repo = ProfileRepository::new(Arc::clone(&db));
    let post_repo = PostRepository::new(Arc::clone(&db));
    let follow_repo = FollowRepository::new(Arc::clone(&db));
    let like_repo = LikeRepository::new(Arc::clone(&db));
    let comment_repo = CommentRepository::new(Arc::clone(&db));
    let notification_repo = NotificationRepository::new(Arc::clone(&db));

    // External services
    let identity = Arc::new(GoTrueIdentity::new(&config.identity)?);
    let storage = Arc::new(LocalStorage::new(
        config.storage.base_path.clone(),
        config.storage.bucket_url(&config.server.url),
    ));
    let change_feed = ChangeFeed::default();

    // Services
    let profile_service =
        ProfileService::new(profile_repo.clone(), follow_repo.clone(), post_repo.clone());
    let post_service = PostService::new(
        post_repo.clone(),
        profile_repo.clone(),
        follow_repo.clone(),
        like_repo.clone(),
        comment_repo.clone(),
    );
    let notification_service =
        NotificationService::new(notification_repo, profile_repo.clone(), change_feed);
    let session_service = SessionService::new(identity, profile_service.clone());
    let admin_service = AdminService::new(profile_service.clone(), post_service.clone());
    let upload_service = UploadService::new(storage, config.storage.max_upload_bytes);

    // Side effects (notifications) run on a bounded background queue
    let (dispatcher, _worker) = NotificationDispatcher::spawn(
        config.feed.dispatch_capacity,
        notification_service.clone(),
    );

    let mut follow_service = FollowService::new(follow_repo, profile_repo.clone());
    follow_service.set_dispatcher(dispatcher.clone());

    let mut like_service = LikeService::new(like_repo, post_repo.clone());
    like_service.set_dispatcher(dispatcher.clone());

    let mut comment_service = CommentService::new(comment_repo, post_repo, profile_repo);
    comment_service.set_dispatcher(dispatcher);

    let state = AppState {
        session_service,
        profile_service,
        follow_service,
        post_service,
        like_service,
        comment_service,
        notification_service,
        admin_service,
        upload_service,
        limits: config.feed.clone(),
    };

    let mount_path = config.storage.mount_path();
    info!(path = %mount_path, dir = %config.storage.base_path.display(), "Serving public bucket");

    let app = orbit_api::app(state)
        .nest_service(&mount_path, ServeDir::new(&config.storage.base_path))
        .layer(DefaultBodyLimit::max(
            config.storage.max_upload_bytes + MULTIPART_OVERHEAD,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}
