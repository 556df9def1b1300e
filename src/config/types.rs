use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::defaults::*;

// ============================================================================
// Telegram Configuration
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelegramConfig {
    /// Bot API token issued by @BotFather.
    pub bot_token: Option<String>,
    /// Upper bound on a single conversion, enforced by the transport.
    pub processing_timeout_secs: Option<u64>,
    /// Files above this size are rejected before download.
    #[serde(default = "default_max_input_bytes")]
    pub max_input_bytes: u64,
}

impl TelegramConfig {
    pub fn apply_token(&mut self, token: &str) {
        self.bot_token = Some(token.to_string());
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            processing_timeout_secs: None,
            max_input_bytes: DEFAULT_MAX_INPUT_BYTES,
        }
    }
}

fn default_max_input_bytes() -> u64 {
    DEFAULT_MAX_INPUT_BYTES
}

// ============================================================================
// Fitting Configuration
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FittingConfig {
    /// Quality of the single re-encode applied to in-range originals.
    #[serde(default = "default_reencode_quality")]
    pub reencode_quality: u8,
    /// Quality growth candidates are verified at.
    #[serde(default = "default_verify_quality")]
    pub verify_quality: u8,
    /// Largest canvas, in pixels, growth may produce.
    #[serde(default = "default_max_canvas_pixels")]
    pub max_canvas_pixels: u64,
}

impl Default for FittingConfig {
    fn default() -> Self {
        Self {
            reencode_quality: DEFAULT_REENCODE_QUALITY,
            verify_quality: DEFAULT_VERIFY_QUALITY,
            max_canvas_pixels: DEFAULT_MAX_CANVAS_PIXELS,
        }
    }
}

fn default_reencode_quality() -> u8 {
    DEFAULT_REENCODE_QUALITY
}

fn default_verify_quality() -> u8 {
    DEFAULT_VERIFY_QUALITY
}

fn default_max_canvas_pixels() -> u64 {
    DEFAULT_MAX_CANVAS_PIXELS
}

// ============================================================================
// Logging Configuration
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    /// Level for this crate's targets when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Emit JSON lines instead of the human-readable format.
    #[serde(default)]
    pub json: bool,
    /// Additional log file, appended to.
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            json: false,
            file: None,
        }
    }
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}
