use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use configuration::Config;
use database::{DbRepository, EntityStore};
use enrollment::EnrollmentManager;
use std::sync::Arc;
use tower_http::{
    cors::{AllowHeaders, AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
// Note: Tracing is handled by the main application configuration

pub mod error;
pub mod handlers;

/// The shared application state that all handlers can access.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn EntityStore>,
    pub enrollment: EnrollmentManager<dyn EntityStore>,
}

impl AppState {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        let enrollment = EnrollmentManager::new(Arc::clone(&store));
        Self { store, enrollment }
    }
}

/// Builds the `/api` router over the given state.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::any())
        .allow_methods(Any)
        .allow_headers(AllowHeaders::any());

    Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .route(
            "/api/course",
            get(handlers::get_courses).post(handlers::create_course),
        )
        .route(
            "/api/course/:id",
            get(handlers::get_course)
                .put(handlers::update_course)
                .delete(handlers::delete_course),
        )
        .route(
            "/api/person",
            get(handlers::get_people).post(handlers::create_person),
        )
        .route(
            "/api/person/:name",
            get(handlers::get_person)
                .put(handlers::update_person)
                .delete(handlers::delete_person),
        )
        .route("/api/enrollments", post(handlers::enroll))
        .with_state(Arc::new(state))
        .layer(cors)
        // This middleware will automatically log information about every incoming request.
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(1024 * 1024)) // Set a 1MB body limit
}

/// The main function to configure and run the web server.
///
/// Connects to PostgreSQL, applies migrations, and serves until Ctrl-C.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    // Note: Tracing is already initialized by the caller.
    let db_pool = database::connect(&config.database).await?;
    database::run_migrations(&db_pool).await?;
    let store: Arc<dyn EntityStore> = Arc::new(DbRepository::new(db_pool));

    let app = build_router(AppState::new(store));

    let addr = config.server.address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Web server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Web server stopped.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal.");
    }
}
