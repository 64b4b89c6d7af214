//! Test server lifecycle management
//!
//! Each test gets an isolated server with its own databases, listening on a random port.

use super::constants::*;
use super::fixtures::create_test_db_with_users;
use minstrelmuse_server::conversion::AudioConversionClient;
use minstrelmuse_server::server::state::{OptionalConverter, OptionalVideoSource};
use minstrelmuse_server::server::{server::make_app, RequestsLoggingLevel, ServerConfig};
use minstrelmuse_server::social::SqliteSocialStore;
use minstrelmuse_server::user::{SqliteUserStore, UserManager};
use minstrelmuse_server::video::VideoSource;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;

/// Knobs for the external integrations of a test server.
pub struct TestServerOptions {
    pub video_source: Option<Arc<dyn VideoSource>>,
    pub conversion_url: Option<String>,
    pub require_approval: bool,
}

impl Default for TestServerOptions {
    fn default() -> Self {
        Self {
            video_source: None,
            conversion_url: None,
            require_approval: true,
        }
    }
}

/// Test server instance with isolated databases
///
/// When dropped, the server gracefully shuts down and temp resources are cleaned up.
pub struct TestServer {
    /// Base URL for making requests (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    /// The port the server is listening on
    pub port: u16,

    /// Direct access to accounts, for assertions that bypass HTTP
    pub user_manager: Arc<Mutex<UserManager>>,

    // Private fields - keep resources alive until drop
    _temp_db_dir: TempDir,
    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestServer {
    /// Spawns a server with no video API and no conversion service.
    pub async fn spawn() -> Self {
        Self::spawn_with(TestServerOptions::default()).await
    }

    /// Spawns a new test server on a random port
    ///
    /// # Panics
    ///
    /// Panics if the databases cannot be created, the port cannot be bound or the
    /// server doesn't become ready within the timeout.
    pub async fn spawn_with(options: TestServerOptions) -> Self {
        let (temp_db_dir, db_path) =
            create_test_db_with_users().expect("Failed to create test database");

        let user_store = SqliteUserStore::new(&db_path).expect("Failed to open user store");
        let user_manager = Arc::new(Mutex::new(UserManager::new(
            Box::new(user_store),
            options.require_approval,
        )));
        let social_store = SqliteSocialStore::new(temp_db_dir.path().join("social.db"))
            .expect("Failed to open social store");

        let converter: OptionalConverter = options.conversion_url.map(|url| {
            Arc::new(AudioConversionClient::new(&url, 5).expect("Failed to build converter"))
        });
        let video_source: OptionalVideoSource = options.video_source;

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();
        let base_url = format!("http://127.0.0.1:{}", port);

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        let config = ServerConfig {
            port,
            metrics_port: 0,
            requests_logging_level: RequestsLoggingLevel::None,
            content_cache_age_sec: 0, // Disable caching in tests
            frontend_dir_path: None,
        };

        let app = make_app(
            config,
            user_manager.clone(),
            Box::new(social_store),
            video_source,
            converter,
        )
        .expect("Failed to build app");

        // Spawn server in background task with graceful shutdown
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Server failed");
        });

        let server = Self {
            base_url,
            port,
            user_manager,
            _temp_db_dir: temp_db_dir,
            _shutdown_tx: Some(shutdown_tx),
        };

        server.wait_for_ready().await;

        server
    }

    /// Looks up the id of a seeded account.
    #[allow(dead_code)]
    pub fn user_id(&self, handle: &str) -> usize {
        self.user_manager
            .lock()
            .unwrap()
            .get_user_by_handle(handle)
            .expect("User lookup failed")
            .unwrap_or_else(|| panic!("No user {}", handle))
            .id
    }

    /// Waits for the server to become ready by polling the home endpoint
    async fn wait_for_ready(&self) {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .expect("Failed to build reqwest client");

        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(SERVER_READY_TIMEOUT_MS);

        loop {
            if start.elapsed() > timeout {
                panic!(
                    "Server did not become ready within {}ms",
                    SERVER_READY_TIMEOUT_MS
                );
            }

            match client.get(format!("{}/", self.base_url)).send().await {
                Ok(response) if response.status().is_success() => return,
                _ => {
                    tokio::time::sleep(Duration::from_millis(SERVER_READY_POLL_INTERVAL_MS)).await;
                }
            }
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self._shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
