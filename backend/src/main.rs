use axum::{
    http::Method,
    middleware as axum_middleware,
    routing::{delete, get, post, put},
    Router,
};
use std::net::SocketAddr;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rollcall_backend::{
    config::Config,
    db::connection::{create_pool, DbPool},
    handlers,
    middleware::auth as auth_middleware,
    models::user::{AccountStatus, User, UserRole},
    repositories::user as user_repo,
    utils::password,
};

fn mask_secret(s: &str) -> String {
    if s.is_empty() {
        return "<empty>".into();
    }
    let prefix = s.chars().take(4).collect::<String>();
    format!("{}*** (len={})", prefix, s.len())
}

/// Creates the bootstrap admin account on first start so the deployment is
/// never locked out. Existing accounts are left untouched.
async fn ensure_admin_account(pool: &DbPool) -> anyhow::Result<()> {
    if user_repo::find_by_sid(pool, "admin").await?.is_some() {
        return Ok(());
    }

    let admin_password =
        std::env::var("ADMIN_PASSWORD").unwrap_or_else(|_| "admin123".to_string());
    let now = chrono::Utc::now();
    let admin = User {
        sid: "admin".to_string(),
        name: "Administrator".to_string(),
        password_hash: password::hash_password(&admin_password)?,
        role: UserRole::Admin,
        status: AccountStatus::Approved,
        department: None,
        semester: None,
        section: None,
        created_at: now,
        updated_at: now,
    };
    user_repo::create_user(pool, &admin).await?;
    tracing::info!("bootstrap admin account created");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rollcall_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::load()?;
    tracing::info!(
        database_url = %config.database_url,
        jwt_secret = %mask_secret(&config.jwt_secret),
        jwt_expiration_hours = config.jwt_expiration_hours,
        time_zone = %config.time_zone,
        base_url = %config.base_url,
        token_valid_seconds = config.token_valid_seconds,
        qr_refresh_seconds = config.qr_refresh_seconds,
        "Loaded configuration from environment/.env"
    );

    // Initialize database
    let pool: DbPool = create_pool(&config.database_url).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    ensure_admin_account(&pool).await?;

    // Build public routes (no auth)
    let public_routes = Router::new()
        .route("/api/auth/register", post(handlers::auth::register))
        .route("/api/auth/login", post(handlers::auth::login));

    // Build student-facing routes (any authenticated user)
    let user_routes = Router::new()
        .route("/api/student/dashboard", get(handlers::reports::dashboard))
        .route("/api/attendance/scan", post(handlers::attendance::scan))
        .route("/api/student/report", get(handlers::reports::my_report))
        .route(
            "/api/student/report/export",
            get(handlers::reports::export_my_report),
        )
        .route(
            "/api/attendance",
            get(handlers::attendance::list_records),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            (pool.clone(), config.clone()),
            auth_middleware::auth,
        ));

    // Build teacher routes (auth + teacher or admin role)
    let teacher_routes = Router::new()
        .route("/api/sessions", post(handlers::sessions::start_session))
        .route(
            "/api/sessions/current",
            get(handlers::sessions::current_session).delete(handlers::sessions::stop_session),
        )
        .route(
            "/api/sessions/current/marks",
            put(handlers::sessions::manual_mark),
        )
        .route(
            "/api/attendance/export",
            get(handlers::attendance::export_records),
        )
        .route(
            "/api/attendance/summary",
            get(handlers::attendance::summary),
        )
        .route(
            "/api/students/pending",
            get(handlers::admin::pending_students),
        )
        .route(
            "/api/students/{sid}/approve",
            put(handlers::admin::approve_student),
        )
        .route(
            "/api/students/{sid}/reject",
            put(handlers::admin::reject_student),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            (pool.clone(), config.clone()),
            auth_middleware::auth_teacher,
        ));

    // Build admin-protected routes (auth + admin role)
    let admin_routes = Router::new()
        .route("/api/admin/stats", get(handlers::admin::stats))
        .route(
            "/api/admin/teachers",
            post(handlers::admin::create_teacher),
        )
        .route("/api/admin/users", get(handlers::admin::list_users))
        .route(
            "/api/admin/users/{sid}",
            delete(handlers::admin::delete_user),
        )
        .route(
            "/api/admin/subjects",
            get(handlers::admin::list_subjects).post(handlers::admin::create_subject),
        )
        .route(
            "/api/admin/subjects/{id}",
            put(handlers::admin::update_subject).delete(handlers::admin::delete_subject),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            (pool.clone(), config.clone()),
            auth_middleware::auth_admin,
        ));

    // Compose app with shared layers (CORS/Trace) and shared state
    let app = Router::new()
        .merge(public_routes)
        .merge(user_routes)
        .merge(teacher_routes)
        .merge(admin_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods([
                            Method::GET,
                            Method::POST,
                            Method::PUT,
                            Method::DELETE,
                            Method::OPTIONS,
                        ])
                        .allow_headers(Any)
                        .max_age(std::time::Duration::from_secs(24 * 60 * 60)),
                ),
        )
        .with_state((pool, config));

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], 3000));
    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
