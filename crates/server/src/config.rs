//! Server configuration from the environment

use signing::{CompositorConfig, ScanConfig};
use std::path::PathBuf;

pub const DEFAULT_WELCOME_MESSAGE: &str =
    "Lütfen imzalamak veya görüntülemek istediğiniz belgeyi seçiniz.";

pub const DEFAULT_VIEWER_WORKER_URL: &str =
    "https://unpkg.com/pdfjs-dist@3.11.174/build/pdf.worker.min.js";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    /// Where uploaded and signed PDFs are written
    pub upload_dir: PathBuf,
    /// PDF viewer worker script handed to browser clients
    pub viewer_worker_url: String,
    pub welcome_message: String,
    pub scan: ScanConfig,
    pub compositor: CompositorConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            database_url: "sqlite:sealdesk.db?mode=rwc".to_string(),
            upload_dir: PathBuf::from("uploads"),
            viewer_worker_url: DEFAULT_VIEWER_WORKER_URL.to_string(),
            welcome_message: DEFAULT_WELCOME_MESSAGE.to_string(),
            scan: ScanConfig::default(),
            compositor: CompositorConfig::default(),
        }
    }
}

impl AppConfig {
    /// Read `PORT`, `DATABASE_URL`, `UPLOAD_DIR`, `VIEWER_WORKER_URL`,
    /// `WELCOME_MESSAGE` and `SIGN_SENTINEL`
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset or empty keys keep their defaults
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(port) = get("PORT").and_then(|p| p.parse().ok()) {
            config.port = port;
        }
        if let Some(url) = get("DATABASE_URL") {
            config.database_url = url;
        }
        if let Some(dir) = get("UPLOAD_DIR") {
            config.upload_dir = PathBuf::from(dir);
        }
        if let Some(url) = get("VIEWER_WORKER_URL") {
            config.viewer_worker_url = url;
        }
        if let Some(message) = get("WELCOME_MESSAGE") {
            config.welcome_message = message;
        }
        if let Some(sentinel) = get("SIGN_SENTINEL") {
            config.scan.sentinel = sentinel;
        }

        config
    }
}
