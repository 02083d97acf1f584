/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use tasklane_api::{app::AppState, config::Config};
/// use tasklane_shared::auth::admin::AdminDirectory;
/// use tasklane_shared::store::{backend::FileBackend, Store};
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let store = Store::open(Arc::new(FileBackend::new(&config.storage.data_file))).await;
/// let state = AppState::new(store, AdminDirectory::new(), config);
/// let app = tasklane_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{
    config::Config,
    middleware::{
        auth::{jwt_auth_layer, require_admin_layer},
        security::{security_headers, SecurityHeaders},
    },
};
use axum::{
    http::{header, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, post, put},
    Router,
};
use chrono::Duration;
use std::sync::Arc;
use tasklane_shared::{
    auth::{accounts::AccountPolicy, admin::AdminDirectory, jwt::DEFAULT_TOKEN_TTL_HOURS},
    store::Store,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// This is cloned for each request handler via Axum's `State` extractor.
/// Every field is a cheap handle.
#[derive(Clone)]
pub struct AppState {
    /// Record store
    pub store: Store,

    /// Administrator credentials
    pub admins: Arc<AdminDirectory>,

    /// Token and password rules
    pub accounts: Arc<AccountPolicy>,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Creates new application state
    pub fn new(store: Store, admins: AdminDirectory, config: Config) -> Self {
        let accounts = AccountPolicy::new(config.jwt.secret.clone())
            .with_token_ttl(
                Duration::try_hours(config.jwt.expiration_hours)
                    .unwrap_or_else(|| Duration::hours(DEFAULT_TOKEN_TTL_HOURS)),
            )
            .with_password_min_length(config.auth.password_min_length);

        Self {
            store,
            admins: Arc::new(admins),
            accounts: Arc::new(accounts),
            config: Arc::new(config),
        }
    }

    /// Gets JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        self.accounts.jwt_secret()
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /api
/// ├── GET    /health
/// ├── /auth/                    # public
/// │   ├── POST /register
/// │   ├── POST /login
/// │   └── POST /admin-login
/// ├── /tasks/                   # user token
/// │   ├── GET    /
/// │   ├── POST   /
/// │   ├── PUT    /:id
/// │   └── DELETE /:id
/// └── /admin/                   # admin token
///     ├── GET    /stats
///     ├── GET    /users
///     ├── GET    /users/:user_id
///     ├── DELETE /users/:user_id
///     ├── GET    /tasks
///     └── DELETE /tasks/:task_id
/// ```
///
/// # Middleware Stack
///
/// Outermost first:
/// 1. Security headers
/// 2. CORS (tower-http CorsLayer)
/// 3. Logging (tower-http TraceLayer)
/// 4. Authentication, then the admin gate (per route group)
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .route("/admin-login", post(routes::auth::admin_login));

    // route_layer keeps unmatched paths a plain 404 instead of a 401
    let task_routes = Router::new()
        .route(
            "/",
            get(routes::tasks::list_tasks).post(routes::tasks::create_task),
        )
        .route(
            "/:id",
            put(routes::tasks::update_task).delete(routes::tasks::delete_task),
        )
        .route_layer(from_fn_with_state(state.clone(), jwt_auth_layer));

    // Layers wrap outward, so the JWT check runs before the admin gate
    let admin_routes = Router::new()
        .route("/stats", get(routes::admin::stats))
        .route("/users", get(routes::admin::list_users))
        .route(
            "/users/:user_id",
            get(routes::admin::get_user).delete(routes::admin::delete_user),
        )
        .route("/tasks", get(routes::admin::list_tasks))
        .route("/tasks/:task_id", delete(routes::admin::delete_task))
        .route_layer(from_fn(require_admin_layer))
        .route_layer(from_fn_with_state(state.clone(), jwt_auth_layer));

    let api_routes = Router::new()
        .route("/health", get(routes::health::health_check))
        .nest("/auth", auth_routes)
        .nest("/tasks", task_routes)
        .nest("/admin", admin_routes);

    Router::new()
        .nest("/api", api_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_layer(&state.config))
        .layer(from_fn_with_state(
            SecurityHeaders {
                hsts: state.config.api.production,
            },
            security_headers,
        ))
        .with_state(state)
}

fn cors_layer(config: &Config) -> CorsLayer {
    if config.cors_permissive() {
        // Development mode: permissive CORS
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .api
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600))
}
