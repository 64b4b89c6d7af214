use super::RequestsLoggingLevel;

/// Settings the HTTP layer needs once the databases and upstream clients are open.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub port: u16,
    /// Prometheus scrape endpoint, served on its own listener.
    pub metrics_port: u16,
    pub requests_logging_level: RequestsLoggingLevel,
    /// `Cache-Control` max-age for video details.
    pub content_cache_age_sec: usize,
    /// When set, the web player is served from here instead of the stats page.
    pub frontend_dir_path: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            port: 3001,
            metrics_port: 9091,
            requests_logging_level: RequestsLoggingLevel::Path,
            content_cache_age_sec: 3600,
            frontend_dir_path: None,
        }
    }
}
