use anyhow::{Context, Result};
use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use tracing::{debug, info};

use axum::{
    extract::State,
    http::{header, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, SameSite};
use serde::{Deserialize, Serialize};
use tower_http::services::ServeDir;

#[cfg(feature = "slowdown")]
use super::slowdown_request;
use super::{
    admin_routes::make_admin_routes,
    content_routes::{make_content_routes, make_offline_routes},
    error::ApiError,
    log_requests, metrics,
    playback_routes::make_playback_routes,
    session::{Session, COOKIE_SESSION_TOKEN_KEY},
    social_routes::make_social_routes,
    state::*,
    user_routes::make_user_routes,
    websocket::ws_handler,
    ServerConfig,
};
use crate::offline::OfflineLibrary;
use crate::playback::PlaybackSessionManager;
use crate::social::{FeedService, SocialStore};
use crate::user::{AuthTokenValue, Permission, UserRecord, UserRole};

#[derive(Serialize)]
struct ServerStats {
    pub uptime: String,
    pub hash: String,
    pub logged_in_as: Option<String>,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

#[derive(Deserialize)]
struct CredentialsBody {
    pub handle: String,
    pub password: String,
}

// Keeps passwords out of the request logs.
impl std::fmt::Debug for CredentialsBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialsBody")
            .field("handle", &self.handle)
            .finish_non_exhaustive()
    }
}

#[derive(Serialize)]
struct LoginSuccessResponse {
    token: String,
    user: UserRecord,
}

#[derive(Serialize)]
struct SessionResponse {
    user_id: usize,
    handle: String,
    role: UserRole,
    approved: bool,
    permissions: Vec<Permission>,
}

async fn home(session: Option<Session>, State(state): State<ServerState>) -> impl IntoResponse {
    let stats = ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
        hash: state.hash.clone(),
        logged_in_as: session.map(|s| s.handle),
    };
    Json(stats)
}

async fn register(
    State(user_manager): State<GuardedUserManager>,
    Json(body): Json<CredentialsBody>,
) -> Result<impl IntoResponse, ApiError> {
    debug!("register() called with {:?}", body);
    let user = user_manager
        .lock()
        .unwrap()
        .register(body.handle.trim(), &body.password)?;
    Ok((StatusCode::CREATED, Json(user)))
}

async fn login(
    State(user_manager): State<GuardedUserManager>,
    Json(body): Json<CredentialsBody>,
) -> Result<Response, ApiError> {
    debug!("login() called with {:?}", body);
    let started = Instant::now();
    let result = user_manager
        .lock()
        .unwrap()
        .login(body.handle.trim(), &body.password);
    let status = if result.is_ok() { "success" } else { "failure" };
    metrics::record_login_attempt(status, started.elapsed());

    let (user, auth_token) = result?;
    let cookie = Cookie::build(Cookie::new(
        COOKIE_SESSION_TOKEN_KEY,
        auth_token.value.0.clone(),
    ))
    .path("/")
    .http_only(true)
    .same_site(SameSite::Lax)
    .build();
    let body = LoginSuccessResponse {
        token: auth_token.value.0,
        user,
    };
    Ok((
        StatusCode::CREATED,
        [(header::SET_COOKIE, cookie.to_string())],
        Json(body),
    )
        .into_response())
}

async fn logout(
    State(user_manager): State<GuardedUserManager>,
    session: Session,
) -> Result<Response, ApiError> {
    user_manager
        .lock()
        .unwrap()
        .logout(session.user_id, &AuthTokenValue(session.token))?;
    let cookie = Cookie::build(Cookie::new(COOKIE_SESSION_TOKEN_KEY, ""))
        .path("/")
        .expires(time::OffsetDateTime::now_utc() - time::Duration::days(1))
        .same_site(SameSite::Lax)
        .build();
    Ok((StatusCode::OK, [(header::SET_COOKIE, cookie.to_string())]).into_response())
}

async fn get_session(session: Session) -> impl IntoResponse {
    let permissions = session.actor().permissions().to_vec();
    Json(SessionResponse {
        user_id: session.user_id,
        handle: session.handle,
        role: session.role,
        approved: session.approved,
        permissions,
    })
}

impl ServerState {
    fn new(
        config: ServerConfig,
        user_manager: GuardedUserManager,
        social_store: Box<dyn SocialStore>,
        video_source: OptionalVideoSource,
        converter: OptionalConverter,
    ) -> ServerState {
        ServerState {
            config,
            start_time: Instant::now(),
            feed: Arc::new(FeedService::new(social_store, user_manager.clone())),
            playback: Arc::new(PlaybackSessionManager::new(user_manager.clone())),
            user_manager,
            video_source,
            converter,
            offline: Arc::new(OfflineLibrary::new()),
            hash: env!("GIT_HASH").to_owned(),
        }
    }
}

pub fn make_app(
    config: ServerConfig,
    user_manager: GuardedUserManager,
    social_store: Box<dyn SocialStore>,
    video_source: OptionalVideoSource,
    converter: OptionalConverter,
) -> Result<Router> {
    let state = ServerState::new(
        config.clone(),
        user_manager,
        social_store,
        video_source,
        converter,
    );

    let auth_routes: Router = Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", get(logout))
        .route("/session", get(get_session))
        .with_state(state.clone());

    let ws_routes: Router = Router::new()
        .route("/v1/ws", get(ws_handler))
        .with_state(state.clone());

    let home_router: Router = match config.frontend_dir_path {
        Some(frontend_path) => {
            let static_files_service =
                ServeDir::new(frontend_path).append_index_html_on_directories(true);
            Router::new().fallback_service(static_files_service)
        }
        None => Router::new()
            .route("/", get(home))
            .with_state(state.clone()),
    };

    let mut app: Router = home_router
        .nest("/v1/auth", auth_routes)
        .nest("/v1/user", make_user_routes(state.clone()))
        .nest("/v1/feed", make_social_routes(state.clone()))
        .nest("/v1/admin", make_admin_routes(state.clone()))
        .nest("/v1/playback", make_playback_routes(state.clone()))
        .nest("/v1/content", make_content_routes(state.clone()))
        .nest("/v1/offline", make_offline_routes(state.clone()))
        .merge(ws_routes);

    #[cfg(feature = "slowdown")]
    {
        app = app.layer(middleware::from_fn(slowdown_request));
    }
    app = app.layer(middleware::from_fn_with_state(state.clone(), log_requests));

    Ok(app)
}

fn make_metrics_app() -> Router {
    Router::new().route("/metrics", get(metrics::metrics_handler))
}

pub async fn run_server(
    config: ServerConfig,
    user_manager: GuardedUserManager,
    social_store: Box<dyn SocialStore>,
    video_source: OptionalVideoSource,
    converter: OptionalConverter,
) -> Result<()> {
    let port = config.port;
    let metrics_port = config.metrics_port;
    let app = make_app(config, user_manager, social_store, video_source, converter)?;

    let metrics_listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", metrics_port))
        .await
        .with_context(|| format!("Failed to bind metrics port {}", metrics_port))?;
    tokio::spawn(async move {
        if let Err(e) = axum::serve(metrics_listener, make_metrics_app()).await {
            tracing::error!("Metrics server stopped: {}", e);
        }
    });
    info!("Metrics available at port {}!", metrics_port);

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port))
        .await
        .with_context(|| format!("Failed to bind port {}", port))?;
    info!("Ready to serve at port {}!", port);

    Ok(axum::serve(listener, app).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::social::SqliteSocialStore;
    use crate::user::{SqliteUserStore, UserManager};
    use axum::{body::Body, http::Request};
    use std::sync::Mutex;
    use tower::ServiceExt;

    fn test_app(dir: &tempfile::TempDir) -> Router {
        let user_store = SqliteUserStore::new(dir.path().join("user.db")).unwrap();
        let social_store = SqliteSocialStore::new(dir.path().join("social.db")).unwrap();
        let user_manager = Arc::new(Mutex::new(UserManager::new(Box::new(user_store), true)));
        make_app(
            ServerConfig::default(),
            user_manager,
            Box::new(social_store),
            None,
            None,
        )
        .unwrap()
    }

    #[test]
    fn formats_uptime() {
        assert_eq!(format_uptime(Duration::from_secs(0)), "0d 00:00:00");
        assert_eq!(
            format_uptime(Duration::from_secs(2 * 86_400 + 3 * 3600 + 4 * 60 + 5)),
            "2d 03:04:05"
        );
    }

    #[tokio::test]
    async fn responds_unauthorized_on_protected_routes() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(&dir);

        let protected_routes = vec![
            "/v1/auth/logout",
            "/v1/auth/session",
            "/v1/user/profile",
            "/v1/user/playlists",
            "/v1/user/history",
            "/v1/feed",
            "/v1/admin/users",
            "/v1/playback/state",
            "/v1/content/search?q=test",
            "/v1/content/video/dQw4w9WgXcQ",
            "/v1/content/download/dQw4w9WgXcQ",
            "/v1/offline/tracks",
            "/v1/ws",
        ];

        for route in protected_routes.into_iter() {
            let request = Request::builder().uri(route).body(Body::empty()).unwrap();
            let response = app.clone().oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{}", route);
        }
    }

    #[tokio::test]
    async fn home_reports_stats_without_session() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(&dir);

        let request = Request::builder().uri("/").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
