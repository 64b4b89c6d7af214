mod file_config;

pub use file_config::{ConversionConfig, FileConfig, VideoApiConfig};

use crate::server::RequestsLoggingLevel;
use crate::video::DEFAULT_VIDEO_API_BASE_URL;
use anyhow::{bail, Result};
use clap::ValueEnum;
use std::path::PathBuf;

/// CLI arguments that can be overridden by the TOML config.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub db_dir: Option<PathBuf>,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub content_cache_age_sec: usize,
    pub frontend_dir_path: Option<String>,
    pub video_api_keys: Vec<String>,
    pub video_api_base_url: String,
    pub video_api_timeout_sec: u64,
    pub conversion_url: Option<String>,
    pub conversion_timeout_sec: u64,
    pub require_approval: bool,
    pub history_retention_days: u64,
    pub prune_interval_hours: u64,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            db_dir: None,
            port: 3001,
            metrics_port: 9091,
            logging_level: RequestsLoggingLevel::Path,
            content_cache_age_sec: 3600,
            frontend_dir_path: None,
            video_api_keys: vec![],
            video_api_base_url: DEFAULT_VIDEO_API_BASE_URL.to_string(),
            video_api_timeout_sec: 10,
            conversion_url: None,
            conversion_timeout_sec: 120,
            require_approval: true,
            history_retention_days: 90,
            prune_interval_hours: 24,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_dir: PathBuf,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub content_cache_age_sec: usize,
    pub frontend_dir_path: Option<String>,
    pub require_approval: bool,
    /// 0 keeps history forever.
    pub history_retention_days: u64,
    pub prune_interval_hours: u64,

    pub video: VideoApiSettings,
    pub conversion: Option<ConversionSettings>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VideoApiSettings {
    pub api_keys: Vec<String>,
    pub base_url: String,
    pub timeout_sec: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConversionSettings {
    pub url: String,
    pub timeout_sec: u64,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_dir = file
            .db_dir
            .map(PathBuf::from)
            .or_else(|| cli.db_dir.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("db_dir must be specified via --db-dir or in config file")
            })?;

        if !db_dir.exists() {
            bail!("Database directory does not exist: {:?}", db_dir);
        }
        if !db_dir.is_dir() {
            bail!("db_dir is not a directory: {:?}", db_dir);
        }

        let port = file.port.unwrap_or(cli.port);
        let metrics_port = file.metrics_port.unwrap_or(cli.metrics_port);
        let logging_level = file
            .logging_level
            .and_then(|s| parse_logging_level(&s))
            .unwrap_or_else(|| cli.logging_level.clone());
        let content_cache_age_sec = file
            .content_cache_age_sec
            .unwrap_or(cli.content_cache_age_sec);
        let frontend_dir_path = file
            .frontend_dir_path
            .or_else(|| cli.frontend_dir_path.clone());
        let require_approval = file.require_approval.unwrap_or(cli.require_approval);
        let history_retention_days = file
            .history_retention_days
            .unwrap_or(cli.history_retention_days);
        let prune_interval_hours = file
            .prune_interval_hours
            .unwrap_or(cli.prune_interval_hours);
        if prune_interval_hours == 0 {
            bail!("prune_interval_hours must be greater than 0");
        }

        let video_file = file.video.unwrap_or_default();
        let video = VideoApiSettings {
            api_keys: video_file
                .api_keys
                .unwrap_or_else(|| cli.video_api_keys.clone())
                .into_iter()
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty())
                .collect(),
            base_url: video_file
                .base_url
                .unwrap_or_else(|| cli.video_api_base_url.clone()),
            timeout_sec: video_file.timeout_sec.unwrap_or(cli.video_api_timeout_sec),
        };

        let conversion_file = file.conversion.unwrap_or_default();
        let conversion = conversion_file
            .url
            .or_else(|| cli.conversion_url.clone())
            .filter(|url| !url.trim().is_empty())
            .map(|url| ConversionSettings {
                url,
                timeout_sec: conversion_file
                    .timeout_sec
                    .unwrap_or(cli.conversion_timeout_sec),
            });

        Ok(Self {
            db_dir,
            port,
            metrics_port,
            logging_level,
            content_cache_age_sec,
            frontend_dir_path,
            require_approval,
            history_retention_days,
            prune_interval_hours,
            video,
            conversion,
        })
    }

    pub fn user_db_path(&self) -> PathBuf {
        self.db_dir.join("user.db")
    }

    pub fn social_db_path(&self) -> PathBuf {
        self.db_dir.join("social.db")
    }
}

/// Parses a logging level string using clap's ValueEnum.
fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}
