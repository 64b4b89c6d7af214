mod admin_routes;
pub mod config;
mod content_routes;
pub mod error;
mod http_layers;
pub mod metrics;
mod playback_routes;
pub mod server;
pub mod session;
mod social_routes;
pub mod state;
mod user_routes;
pub mod websocket;

pub use config::ServerConfig;
pub use http_layers::*;
pub use server::run_server;
