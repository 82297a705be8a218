/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use docket_api::app::{build_router, AppState, Collaborators};
/// use docket_api::config::Config;
/// use docket_shared::artifacts::MemoryArtifactStore;
/// use docket_shared::messaging::LogMailer;
/// use docket_shared::render::PdfRenderer;
/// use docket_shared::store::Stores;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let collaborators = Collaborators {
///     mailer: Arc::new(LogMailer),
///     artifacts: Arc::new(MemoryArtifactStore::new()),
///     renderer: Arc::new(PdfRenderer::new()),
/// };
/// let state = AppState::new(config, Stores::memory(), None, collaborators);
///
/// let app = build_router(state);
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, middleware::security::SecurityHeadersLayer, routes};
use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{get, patch, post, put},
    Router,
};
use chrono::Duration;
use docket_shared::{
    artifacts::ArtifactStore,
    auth::{
        jwt::TokenIssuer,
        middleware::{require_access, require_access_or_reset, TokenResolver},
        password::Hasher,
    },
    messaging::Mailer,
    render::DocumentRenderer,
    services::{ServiceContext, Services},
    store::Stores,
};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Upper bound for multipart uploads (logos, signatures)
const UPLOAD_LIMIT_BYTES: usize = 10 * 1024 * 1024;

/// External collaborators the services talk to
pub struct Collaborators {
    pub mailer: Arc<dyn Mailer>,
    pub artifacts: Arc<dyn ArtifactStore>,
    pub renderer: Arc<dyn DocumentRenderer>,
}

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor; every
/// field is cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub services: Services,

    /// Resolves bearer tokens for the auth middleware
    pub resolver: TokenResolver,

    /// Database pool, absent when running on in-memory stores
    pub db: Option<PgPool>,

    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(
        config: Config,
        stores: Stores,
        db: Option<PgPool>,
        collaborators: Collaborators,
    ) -> Self {
        let tokens = TokenIssuer::new(config.jwt.secret.clone()).with_ttls(
            Duration::seconds(config.jwt.access_ttl_secs),
            Duration::seconds(config.jwt.reset_ttl_secs),
        );

        let resolver = TokenResolver::new(tokens.clone(), stores.users.clone());

        let services = Services::new(ServiceContext {
            stores,
            hasher: Hasher::new(config.hashing.into()),
            tokens,
            mailer: collaborators.mailer,
            artifacts: collaborators.artifacts,
            renderer: collaborators.renderer,
            frontend_url: config.frontend_url.clone(),
        });

        Self {
            services,
            resolver,
            db,
            config: Arc::new(config),
        }
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// ```text
/// /
/// ├── GET /health
/// └── /v1/
///     ├── /auth/                       register, login, verify-email, password
///     ├── /users/me, /users/invite     profile and invitations
///     ├── /clients/                    CRUD + archive/recover
///     ├── /projects/                   CRUD + archive/recover
///     └── /delivery-notes/             create, list, get, pdf, sign, delete
/// ```
///
/// Everything below `/v1` except registration, login and the reset-code
/// endpoints requires a bearer access token. `PATCH /v1/auth/password` also
/// accepts a password-reset token.
pub fn build_router(state: AppState) -> Router {
    let access = from_fn_with_state(state.resolver.clone(), require_access);

    let public_auth = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .route("/password/forgot", post(routes::auth::forgot_password))
        .route("/password/verify", post(routes::auth::verify_reset_code));

    let verified_auth = Router::new()
        .route("/verify-email", put(routes::auth::verify_email))
        .route("/verify-email/resend", post(routes::auth::resend_code))
        .layer(access.clone());

    let reset_auth = Router::new()
        .route("/password", patch(routes::auth::reset_password))
        .layer(from_fn_with_state(
            state.resolver.clone(),
            require_access_or_reset,
        ));

    let auth_routes = public_auth.merge(verified_auth).merge(reset_auth);

    let user_routes = Router::new()
        .route(
            "/me",
            get(routes::users::get_me)
                .put(routes::users::update_me)
                .delete(routes::users::delete_me),
        )
        .route("/me/company", patch(routes::users::update_company))
        .route("/me/address", patch(routes::users::update_address))
        .route("/me/logo", patch(routes::users::update_logo))
        .route("/invite", post(routes::users::invite));

    let client_routes = Router::new()
        .route(
            "/",
            post(routes::clients::create_client).get(routes::clients::list_clients),
        )
        .route("/archived", get(routes::clients::list_archived_clients))
        .route(
            "/:id",
            get(routes::clients::get_client)
                .put(routes::clients::update_client)
                .delete(routes::clients::delete_client),
        )
        .route("/:id/archive", patch(routes::clients::archive_client))
        .route("/:id/recover", patch(routes::clients::recover_client));

    let project_routes = Router::new()
        .route(
            "/",
            post(routes::projects::create_project).get(routes::projects::list_projects),
        )
        .route("/archived", get(routes::projects::list_archived_projects))
        .route(
            "/:id",
            get(routes::projects::get_project)
                .put(routes::projects::update_project)
                .delete(routes::projects::delete_project),
        )
        .route("/:id/archive", patch(routes::projects::archive_project))
        .route("/:id/recover", patch(routes::projects::recover_project));

    let note_routes = Router::new()
        .route(
            "/",
            post(routes::delivery_notes::create_note).get(routes::delivery_notes::list_notes),
        )
        .route(
            "/:id",
            get(routes::delivery_notes::get_note).delete(routes::delivery_notes::delete_note),
        )
        .route(
            "/:id/pdf",
            post(routes::delivery_notes::render_pdf).get(routes::delivery_notes::download_pdf),
        )
        .route("/:id/sign", patch(routes::delivery_notes::sign_note));

    let protected = Router::new()
        .nest("/users", user_routes)
        .nest("/clients", client_routes)
        .nest("/projects", project_routes)
        .nest("/delivery-notes", note_routes)
        .layer(DefaultBodyLimit::max(UPLOAD_LIMIT_BYTES))
        .layer(access);

    let v1_routes = Router::new().nest("/auth", auth_routes).merge(protected);

    // Configure CORS based on environment
    let cors = if state.config.api.cors_origins.iter().any(|o| o == "*") {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    Router::new()
        .route("/health", get(routes::health::health_check))
        .nest("/v1", v1_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}
