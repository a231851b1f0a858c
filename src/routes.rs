use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    response::Json,
    routing::{get, post, put},
    Router,
};
use serde_json::{json, Value};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::config::AppConfig;
use crate::handlers::{elevated, protected, public};
use crate::state::AppState;

pub fn app(state: AppState) -> Router {
    let cors = cors_layer(&state.config);
    let body_limit = state.config.server.max_request_size_bytes;

    Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(public::health::health_get))
        .merge(public_routes())
        // Admin panel
        .merge(session_routes())
        .merge(admin_routes())
        // Dev only
        .merge(elevated_routes())
        // Global middleware
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn public_routes() -> Router<AppState> {
    use public::{auth, content, translations};

    Router::new()
        .route("/api/auth/login", post(auth::login_post))
        .route("/api/translations/:locale", get(translations::translations_get))
        .route("/api/translations/:locale/:namespace", get(translations::namespace_get))
        .route("/api/news", get(content::news_list))
        .route("/api/news/:slug", get(content::news_get))
        .route("/api/categories", get(content::categories_list))
        .route("/api/partners", get(content::partners_list))
        .route("/api/testimonials", get(content::testimonials_list))
        .route("/api/segments", get(content::segments_list))
        .route("/api/landing/:locale/:slug", get(content::landing_get))
}

fn session_routes() -> Router<AppState> {
    use protected::session;

    Router::new()
        .route("/api/auth/logout", post(session::logout_post))
        .route("/api/auth/me", get(session::me_get))
}

fn admin_routes() -> Router<AppState> {
    use protected::{catalog, landing, news, testimonials, translations};

    Router::new()
        .route(
            "/api/admin/translations/:locale/:namespace",
            put(translations::namespace_put),
        )
        .route("/api/admin/news", get(news::news_list).post(news::news_post))
        .route(
            "/api/admin/news/:id",
            get(news::news_get).put(news::news_put).delete(news::news_delete),
        )
        .route(
            "/api/admin/categories",
            get(catalog::categories_list).post(catalog::category_post),
        )
        .route(
            "/api/admin/categories/:id",
            put(catalog::category_put).delete(catalog::category_delete),
        )
        .route(
            "/api/admin/partners",
            get(catalog::partners_list).post(catalog::partner_post),
        )
        .route(
            "/api/admin/partners/:id",
            put(catalog::partner_put).delete(catalog::partner_delete),
        )
        .route(
            "/api/admin/segments",
            get(catalog::segments_list).post(catalog::segment_post),
        )
        .route(
            "/api/admin/segments/:id",
            put(catalog::segment_put).delete(catalog::segment_delete),
        )
        .route(
            "/api/admin/testimonials",
            get(testimonials::testimonials_list).post(testimonials::testimonial_post),
        )
        .route(
            "/api/admin/testimonials/:id",
            put(testimonials::testimonial_put).delete(testimonials::testimonial_delete),
        )
        .route("/api/admin/landing", get(landing::landing_list))
        .route("/api/admin/landing/:locale/:slug", put(landing::landing_put))
}

fn elevated_routes() -> Router<AppState> {
    use elevated::{audit_logs, users};

    Router::new()
        .route("/api/admin/users", get(users::users_list).post(users::user_post))
        .route(
            "/api/admin/users/:id",
            get(users::user_get).put(users::user_put).delete(users::user_delete),
        )
        .route("/api/admin/audit-logs", get(audit_logs::audit_logs_list))
        .route("/api/admin/audit-logs/:id", get(audit_logs::audit_log_get))
}

/// Configured origins only; an empty list falls back to permissive.
fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .security
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    if origins.is_empty() {
        return CorsLayer::permissive();
    }

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}

async fn root() -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "name": "Firm Site API",
            "version": env!("CARGO_PKG_VERSION"),
            "endpoints": {
                "health": "/health (public)",
                "content": "/api/translations, /api/news, /api/categories, /api/partners, /api/testimonials, /api/segments, /api/landing (public)",
                "auth": "/api/auth/login (public), /api/auth/logout, /api/auth/me",
                "admin": "/api/admin/* (authenticated)",
                "elevated": "/api/admin/users, /api/admin/audit-logs (dev role)"
            }
        }
    }))
}
