use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::capture::CaptureConfig;
use crate::frame::{FRAME_HEIGHT, FRAME_WIDTH};

const DEFAULT_STREAM_URL: &str = "http://192.168.1.22:8080/video";
const DEFAULT_API_ADDR: &str = "0.0.0.0:8500";
const DEFAULT_THROTTLE_MS: u64 = 100;
const DEFAULT_RETRY_MS: u64 = 100;

/// Largest accepted frame width or height.
pub const MAX_FRAME_DIMENSION: u32 = 8192;

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct DaemonConfigFile {
    stream: Option<StreamConfigFile>,
    api: Option<ApiConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct StreamConfigFile {
    url: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    throttle_ms: Option<u64>,
    retry_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct ApiConfigFile {
    addr: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub api_addr: String,
    pub stream: StreamSettings,
}

#[derive(Debug, Clone)]
pub struct StreamSettings {
    pub url: String,
    pub width: u32,
    pub height: u32,
    pub throttle: Duration,
    pub retry_delay: Duration,
}

impl StreamSettings {
    pub fn capture_config(&self) -> CaptureConfig {
        CaptureConfig {
            frame_width: self.width,
            frame_height: self.height,
            throttle: self.throttle,
            retry_delay: self.retry_delay,
            ..CaptureConfig::default()
        }
    }
}

impl DaemonConfig {
    /// Defaults, then the optional config file, then `CUBE_VISION_*` env overrides.
    ///
    /// Files ending in `.toml` are parsed as TOML, anything else as JSON.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file_cfg = match path {
            Some(path) => read_config_file(path)?,
            None => DaemonConfigFile::default(),
        };
        let mut cfg = Self::from_file(file_cfg);
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: DaemonConfigFile) -> Self {
        let stream = file.stream.unwrap_or_default();
        let api_addr = file
            .api
            .and_then(|api| api.addr)
            .unwrap_or_else(|| DEFAULT_API_ADDR.to_string());
        Self {
            api_addr,
            stream: StreamSettings {
                url: stream
                    .url
                    .unwrap_or_else(|| DEFAULT_STREAM_URL.to_string()),
                width: stream.width.unwrap_or(FRAME_WIDTH),
                height: stream.height.unwrap_or(FRAME_HEIGHT),
                throttle: Duration::from_millis(stream.throttle_ms.unwrap_or(DEFAULT_THROTTLE_MS)),
                retry_delay: Duration::from_millis(stream.retry_ms.unwrap_or(DEFAULT_RETRY_MS)),
            },
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(url) = std::env::var("CUBE_VISION_STREAM_URL") {
            if !url.trim().is_empty() {
                self.stream.url = url.trim().to_string();
            }
        }
        if let Ok(addr) = std::env::var("CUBE_VISION_API_ADDR") {
            if !addr.trim().is_empty() {
                self.api_addr = addr.trim().to_string();
            }
        }
        if let Some(width) = env_number("CUBE_VISION_FRAME_WIDTH")? {
            self.stream.width = width as u32;
        }
        if let Some(height) = env_number("CUBE_VISION_FRAME_HEIGHT")? {
            self.stream.height = height as u32;
        }
        if let Some(ms) = env_number("CUBE_VISION_THROTTLE_MS")? {
            self.stream.throttle = Duration::from_millis(ms);
        }
        if let Some(ms) = env_number("CUBE_VISION_RETRY_MS")? {
            self.stream.retry_delay = Duration::from_millis(ms);
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.stream.width == 0 || self.stream.height == 0 {
            return Err(anyhow!(
                "frame size must be non-zero (got {}x{})",
                self.stream.width,
                self.stream.height
            ));
        }
        if self.stream.width > MAX_FRAME_DIMENSION || self.stream.height > MAX_FRAME_DIMENSION {
            return Err(anyhow!(
                "frame size {}x{} exceeds {} px per side",
                self.stream.width,
                self.stream.height,
                MAX_FRAME_DIMENSION
            ));
        }
        self.api_addr
            .parse::<std::net::SocketAddr>()
            .map_err(|e| anyhow!("invalid api addr '{}': {}", self.api_addr, e))?;
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<DaemonConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path.extension().is_some_and(|ext| ext == "toml");
    let cfg = if is_toml {
        toml::from_str(&raw).map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}

fn env_number(key: &str) -> Result<Option<u64>> {
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => {
            let number = value
                .trim()
                .parse::<u64>()
                .map_err(|_| anyhow!("{} must be a non-negative integer", key))?;
            if number > u32::MAX as u64 {
                return Err(anyhow!("{} is out of range", key));
            }
            Ok(Some(number))
        }
        _ => Ok(None),
    }
}
