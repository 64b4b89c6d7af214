use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{error, info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use minstrelmuse_server::config::{self, AppConfig};
use minstrelmuse_server::conversion::AudioConversionClient;
use minstrelmuse_server::server::state::{OptionalConverter, OptionalVideoSource};
use minstrelmuse_server::server::{metrics, run_server, RequestsLoggingLevel, ServerConfig};
use minstrelmuse_server::social::SqliteSocialStore;
use minstrelmuse_server::user::{SqliteUserStore, UserManager};
use minstrelmuse_server::video::{VideoSearchClient, VideoSource, DEFAULT_VIDEO_API_BASE_URL};

fn parse_path(s: &str) -> Result<PathBuf, String> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(format!("Error resolving path '{}': {}", s, msg));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir().map_err(|e| format!("Failed to get current dir: {}", e))?;
    Ok(cwd.join(original_path))
}

fn parse_dir(s: &str) -> Result<PathBuf, String> {
    let path = parse_path(s)?;
    if !path.exists() {
        return Err(format!("Directory does not exist: {}", s));
    }
    if !path.is_dir() {
        return Err(format!("Path is not a directory: {}", s));
    }
    Ok(path)
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to TOML configuration file. Values in the file override CLI arguments.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Directory containing database files (user.db, social.db).
    /// Can also be specified in config file.
    #[clap(long, value_parser = parse_dir)]
    pub db_dir: Option<PathBuf>,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 3001)]
    pub port: u16,

    /// The port for the metrics server (Prometheus scraping).
    #[clap(long, default_value_t = 9091)]
    pub metrics_port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// The maximum age of cacheable content in seconds.
    #[clap(long, default_value_t = 3600)]
    pub content_cache_age_sec: usize,

    /// Path to the frontend directory to be statically served.
    #[clap(long)]
    pub frontend_dir_path: Option<String>,

    /// Video search API key. Repeat the flag to configure rotation keys.
    #[clap(long = "video-api-key", env = "MINSTREL_VIDEO_API_KEYS", value_delimiter = ',')]
    pub video_api_keys: Vec<String>,

    /// Base URL of the video search API.
    #[clap(long, default_value = DEFAULT_VIDEO_API_BASE_URL)]
    pub video_api_base_url: String,

    /// Timeout in seconds for video search requests.
    #[clap(long, default_value_t = 10)]
    pub video_api_timeout_sec: u64,

    /// URL of the audio conversion service. Downloads are disabled when missing.
    #[clap(long)]
    pub conversion_url: Option<String>,

    /// Timeout in seconds for audio conversion requests.
    #[clap(long, default_value_t = 120)]
    pub conversion_timeout_sec: u64,

    /// Whether self-registered accounts wait for admin approval.
    #[clap(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub require_approval: bool,

    /// Number of days to retain play history. Set to 0 to disable pruning.
    #[clap(long, default_value_t = 90)]
    pub history_retention_days: u64,

    /// Interval in hours between pruning runs. Only used if history_retention_days > 0.
    #[clap(long, default_value_t = 24)]
    pub prune_interval_hours: u64,
}

impl From<&CliArgs> for config::CliConfig {
    fn from(args: &CliArgs) -> Self {
        config::CliConfig {
            db_dir: args.db_dir.clone(),
            port: args.port,
            metrics_port: args.metrics_port,
            logging_level: args.logging_level.clone(),
            content_cache_age_sec: args.content_cache_age_sec,
            frontend_dir_path: args.frontend_dir_path.clone(),
            video_api_keys: args.video_api_keys.clone(),
            video_api_base_url: args.video_api_base_url.clone(),
            video_api_timeout_sec: args.video_api_timeout_sec,
            conversion_url: args.conversion_url.clone(),
            conversion_timeout_sec: args.conversion_timeout_sec,
            require_approval: args.require_approval,
            history_retention_days: args.history_retention_days,
            prune_interval_hours: args.prune_interval_hours,
        }
    }
}

fn spawn_history_pruning(user_manager: Arc<Mutex<UserManager>>, app_config: &AppConfig) {
    if app_config.history_retention_days == 0 {
        info!("History pruning disabled");
        return;
    }
    let retention_days = app_config.history_retention_days;
    let interval_hours = app_config.prune_interval_hours;
    info!(
        "History pruning enabled: retaining {} days, pruning every {} hours",
        retention_days, interval_hours
    );

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_hours * 60 * 60));
        loop {
            ticker.tick().await;
            let result = user_manager.lock().unwrap().prune(retention_days);
            match result {
                Ok(count) => {
                    metrics::record_pruned_history(count);
                    if count > 0 {
                        info!("Pruned {} old history entries", count);
                    }
                }
                Err(e) => error!("Failed to prune history: {}", e),
            }
        }
    });
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()?;

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            Some(config::FileConfig::load(path)?)
        }
        None => None,
    };

    // TOML overrides CLI
    let cli_config: config::CliConfig = (&cli_args).into();
    let app_config = AppConfig::resolve(&cli_config, file_config)?;

    info!("Configuration loaded:");
    info!("  db_dir: {:?}", app_config.db_dir);
    info!("  port: {}", app_config.port);
    info!("  require_approval: {}", app_config.require_approval);

    info!("Initializing metrics...");
    metrics::init_metrics();

    if !app_config.user_db_path().exists() {
        info!(
            "Creating new user database at {:?}",
            app_config.user_db_path()
        );
    }
    let user_store = SqliteUserStore::new(app_config.user_db_path())?;
    let user_manager = Arc::new(Mutex::new(UserManager::new(
        Box::new(user_store),
        app_config.require_approval,
    )));

    info!(
        "Opening social database at {:?}",
        app_config.social_db_path()
    );
    let social_store = SqliteSocialStore::new(app_config.social_db_path())?;

    let video_source: OptionalVideoSource = if app_config.video.api_keys.is_empty() {
        info!("No video API keys configured, search will use the offline library");
        None
    } else {
        let client = VideoSearchClient::new(
            app_config.video.api_keys.clone(),
            &app_config.video.base_url,
            app_config.video.timeout_sec,
        )?;
        info!(
            "Video search configured with {} API key(s)",
            client.key_count()
        );
        Some(Arc::new(client) as Arc<dyn VideoSource>)
    };

    let converter: OptionalConverter = match &app_config.conversion {
        Some(settings) => {
            info!("Audio conversion service configured at {}", settings.url);
            Some(Arc::new(AudioConversionClient::new(
                &settings.url,
                settings.timeout_sec,
            )?))
        }
        None => {
            info!("No audio conversion service configured, downloads disabled");
            None
        }
    };

    spawn_history_pruning(user_manager.clone(), &app_config);

    let server_config = ServerConfig {
        requests_logging_level: app_config.logging_level.clone(),
        port: app_config.port,
        metrics_port: app_config.metrics_port,
        content_cache_age_sec: app_config.content_cache_age_sec,
        frontend_dir_path: app_config.frontend_dir_path.clone(),
    };

    tokio::select! {
        result = run_server(
            server_config,
            user_manager,
            Box::new(social_store),
            video_source,
            converter,
        ) => {
            info!("HTTP server stopped: {:?}", result);
            result
        },
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
            Ok(())
        }
    }
}
