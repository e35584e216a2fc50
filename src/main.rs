use axum::{
    routing::{get, post, put},
    Router,
};
use practice_backend::{
    config::{get_config, init_config},
    database::pool::create_pool,
    middleware::{auth, rate_limit},
    routes, AppState,
};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    init_config()?;
    let config = get_config();

    let pool = create_pool().await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let app_state = AppState::new(pool);

    // Sessions that were never submitted or abandoned are swept once their
    // deadline is older than the retention window.
    {
        let state = app_state.clone();
        let retention = chrono::Duration::hours(config.session_retention_hours);
        tokio::spawn(async move {
            loop {
                match state.test_service.sweep_expired_sessions(retention).await {
                    Ok(0) => {}
                    Ok(swept) => info!(swept, "removed stale test sessions"),
                    Err(e) => tracing::error!(error = ?e, "session sweeper error"),
                }
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
        });
    }

    let base_routes = Router::new().route("/health", get(routes::health::health));

    let api = Router::new()
        .route("/api/tests/configure", post(routes::tests::configure_test))
        .route("/api/tests/start", post(routes::tests::start_test))
        .route("/api/tests/session", get(routes::tests::get_session))
        .route("/api/tests/session/answer", put(routes::tests::save_answer))
        .route(
            "/api/tests/session/mark-review",
            put(routes::tests::toggle_mark_for_review),
        )
        .route(
            "/api/tests/session/extend-time",
            post(routes::tests::extend_time),
        )
        .route(
            "/api/tests/session/abandon",
            post(routes::tests::abandon_session).delete(routes::tests::abandon_session),
        )
        .route("/api/tests/submit", post(routes::tests::submit_test))
        .route("/api/tests/history", get(routes::tests::get_test_history))
        .route("/api/tests/topics", get(routes::tests::get_topics))
        .route("/api/tests/:id", get(routes::tests::get_test))
        .layer(axum::middleware::from_fn(auth::require_bearer_auth))
        .layer(axum::middleware::from_fn_with_state(
            rate_limit::new_rps_state(config.api_rps),
            rate_limit::rps_middleware,
        ));

    let admin_api = Router::new()
        .route(
            "/api/admin/questions",
            get(routes::questions::list_questions).post(routes::questions::create_question),
        )
        .route(
            "/api/admin/questions/bulk-import",
            post(routes::questions::bulk_import),
        )
        .route(
            "/api/admin/questions/:id",
            get(routes::questions::get_question)
                .put(routes::questions::update_question)
                .delete(routes::questions::delete_question),
        )
        .layer(axum::middleware::from_fn(auth::require_admin))
        .layer(axum::middleware::from_fn_with_state(
            rate_limit::new_rps_state(config.admin_rps),
            rate_limit::rps_middleware,
        ));

    let app = base_routes
        .merge(api)
        .merge(admin_api)
        .with_state(app_state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
