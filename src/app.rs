use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware,
    response::{IntoResponse, Json},
    routing::{delete, get, post},
    Router,
};
use serde_json::{json, Value};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::{error, info, warn};

use crate::auth::{SessionError, SessionManager};
use crate::config::AppConfig;
use crate::database::{DocumentStore, Repository, StoreError};
use crate::handlers;
use crate::middleware::session_auth_middleware;
use crate::services::{AuthGate, ImageStore, ProductService, UserService};

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("document store: {0}")]
    Store(#[from] StoreError),
    #[error("sessions: {0}")]
    Session(#[from] SessionError),
}

/// Everything a request handler can reach. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<DocumentStore>,
    pub gate: AuthGate,
    pub users: UserService,
    pub products: ProductService,
    pub images: ImageStore,
}

impl AppState {
    /// Open the store and wire the services for one process
    pub async fn build(config: AppConfig) -> Result<Self, StartupError> {
        let store = DocumentStore::open(&config.storage).await?;
        Self::with_store(config, store).await
    }

    pub async fn with_store(config: AppConfig, store: Arc<DocumentStore>) -> Result<Self, StartupError> {
        let sessions = Arc::new(SessionManager::new(&config.session)?);
        let images = ImageStore::new(&config.storage.uploads_dir, config.storage.max_image_bytes).await?;

        let users = Repository::new(Arc::clone(&store));
        let products = Repository::new(Arc::clone(&store));

        Ok(Self {
            gate: AuthGate::new(sessions, users.clone()),
            users: UserService::new(users),
            products: ProductService::new(products, config.query.clone()),
            images,
            store,
            config: Arc::new(config),
        })
    }
}

pub fn app(state: AppState) -> Router {
    let mut router = Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        .merge(public_routes())
        .merge(protected_routes(state.clone()))
        .nest_service("/uploads", ServeDir::new(&state.config.storage.uploads_dir))
        .layer(DefaultBodyLimit::max(state.config.api.max_request_size_bytes));

    if let Some(cors) = cors_layer(&state.config) {
        router = router.layer(cors);
    }
    if state.config.api.enable_request_logging {
        router = router.layer(TraceLayer::new_for_http());
    }

    router.with_state(state)
}

fn public_routes() -> Router<AppState> {
    use handlers::public::{auth, products, users};

    Router::new()
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/products", get(products::list))
        .route("/api/products/:id", get(products::get))
        .route("/api/users/:id", get(users::get))
}

fn protected_routes(state: AppState) -> Router<AppState> {
    use handlers::protected::{auth, products};

    Router::new()
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/profile", get(auth::profile_get).put(auth::profile_put))
        .route("/api/products", post(products::create))
        .route("/api/products/:id", delete(products::delete))
        .route_layer(middleware::from_fn_with_state(state, session_auth_middleware))
}

fn cors_layer(config: &AppConfig) -> Option<CorsLayer> {
    if !config.security.enable_cors {
        return None;
    }
    if config.security.cors_origins.iter().any(|o| o == "*") {
        return Some(CorsLayer::permissive());
    }

    let origins: Vec<HeaderValue> = config
        .security
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
            .allow_credentials(true),
    )
}

async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "success": true,
        "data": {
            "name": "Bazaar API",
            "version": version,
            "description": "Classifieds marketplace backend built with Rust (Axum)",
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "auth": "/api/auth/register, /api/auth/login (public), /api/auth/logout (protected)",
                "profile": "/api/profile (protected)",
                "products": "/api/products[/:id] (public read, protected create/delete)",
                "users": "/api/users/:id (public)",
                "uploads": "/uploads/* (public)",
            }
        }
    }))
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.store.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "storage": "ok"
                }
            })),
        ),
        Err(e) => {
            error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "error": true,
                    "message": "storage unavailable",
                    "code": "SERVICE_UNAVAILABLE",
                    "data": {
                        "status": "degraded",
                        "timestamp": now
                    }
                })),
            )
        }
    }
}

/// Serve until `shutdown` resolves, then close the store
pub async fn serve(
    listener: tokio::net::TcpListener,
    state: AppState,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let store = Arc::clone(&state.store);
    if let Ok(addr) = listener.local_addr() {
        info!("Bazaar API listening on http://{}", addr);
    }

    let result = axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown)
        .await;

    store.close().await;
    result
}
