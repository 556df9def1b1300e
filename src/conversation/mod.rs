//! Transport-agnostic handling of the two-step exchange: an image arrives,
//! then a `<size_range> <format>` command selects the conversion.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Local};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::errors::{ConvertError, ConvertResult};
use crate::media::{display_size, ConversionRequest, FitEngine, FitOutcome, FitSettings};
use crate::sessions::{PendingRequest, SessionStore, UserId};

// ============================================================================
// User-facing texts
// ============================================================================

pub const WELCOME_TEXT: &str = "👋 Welcome to the Image Converter Bot!\n\n\
    I can help you convert and resize images to specific formats and sizes.\n\n\
    📝 Instructions:\n\
    1. Send me an image\n\
    2. Specify the desired size range (e.g., '2MB-3MB' or '500KB-1MB')\n\
    3. Choose the output format (JPG, PNG, WEBP)\n\n\
    Supported formats: JPG, PNG, WEBP\n\
    Supported size units: KB, MB";

pub const INVALID_INPUT_TEXT: &str =
    "❌ Invalid input. Please send an image or use /help for instructions.";

pub const PROCESSING_TEXT: &str = "⚙️ Processing your image...";

pub const PHOTO_ERROR_TEXT: &str = "❌ Error processing your photo. Please try again.";

/// Prompt sent after an image is received.
pub fn size_prompt(size_bytes: u64) -> String {
    format!(
        "📏 Current image size: {:.2}KB\n\
         Please specify the target size range and format\n\
         Format: <size_range> <format>\n\
         Examples:\n\
         2MB-3MB JPG\n\
         500KB-1MB PNG",
        size_bytes as f64 / 1024.0
    )
}

/// Output filename, `converted_<YYYYMMDD_HHMMSS>.<ext>`.
pub fn output_filename(at: DateTime<Local>, extension: &str) -> String {
    format!("converted_{}.{}", at.format("%Y%m%d_%H%M%S"), extension)
}

// ============================================================================
// Transport seam
// ============================================================================

/// Downloads the bytes behind a transport file handle.
#[async_trait]
pub trait FileFetcher: Send + Sync {
    async fn fetch(&self, file_id: &str) -> Result<Vec<u8>>;
}

// ============================================================================
// Conversation
// ============================================================================

/// A command that passed validation, with its tracker entry already consumed.
#[derive(Debug, Clone)]
pub struct PreparedConversion {
    pub user: UserId,
    pub pending: PendingRequest,
    pub request: ConversionRequest,
}

/// A finished conversion, ready to be sent as a document.
#[derive(Debug, Clone)]
pub struct Converted {
    pub filename: String,
    pub caption: String,
    pub bytes: Vec<u8>,
    pub outcome_summary: String,
}

/// Shared state injected into every transport handler.
pub struct Conversation {
    sessions: Arc<SessionStore>,
    engine: FitEngine,
    max_input_bytes: u64,
    timeout: Option<Duration>,
}

impl Conversation {
    pub fn new(config: &Config, sessions: Arc<SessionStore>) -> Self {
        Self {
            sessions,
            engine: FitEngine::new(FitSettings::from(&config.fitting)),
            max_input_bytes: config.telegram.max_input_bytes,
            timeout: config.telegram.processing_timeout_secs.map(Duration::from_secs),
        }
    }

    /// Records an incoming image and returns the prompt for the size range.
    pub fn on_photo(&self, user: UserId, file_id: &str, size_bytes: u64) -> String {
        info!(user, size = %display_size(size_bytes), "Image received");
        self.sessions.record(user, PendingRequest::new(file_id, size_bytes));
        size_prompt(size_bytes)
    }

    pub fn is_awaiting_spec(&self, user: UserId) -> bool {
        self.sessions.is_awaiting_spec(user)
    }

    /// Consumes the user's tracker entry and validates the command text.
    ///
    /// The entry is removed before parsing, so it is cleared on every path.
    pub fn prepare(&self, user: UserId, text: &str) -> ConvertResult<PreparedConversion> {
        let pending = self.sessions.consume(user).ok_or(ConvertError::UnknownSession)?;
        let request = ConversionRequest::parse(text).inspect_err(|err| {
            info!(user, %err, "Rejected conversion command");
        })?;

        if pending.original_size > self.max_input_bytes {
            return Err(ConvertError::InputTooLarge {
                size: pending.original_size,
                limit: self.max_input_bytes,
            });
        }

        Ok(PreparedConversion {
            user,
            pending,
            request,
        })
    }

    /// Downloads the image and runs the fitting engine on a blocking worker.
    pub async fn convert(
        &self,
        prepared: PreparedConversion,
        fetcher: &dyn FileFetcher,
    ) -> ConvertResult<Converted> {
        let PreparedConversion {
            user,
            pending,
            request,
        } = prepared;

        let original = fetcher
            .fetch(&pending.file_id)
            .await
            .map_err(ConvertError::Fetch)?;
        let original_len = original.len() as u64;
        if original_len > self.max_input_bytes {
            return Err(ConvertError::InputTooLarge {
                size: original_len,
                limit: self.max_input_bytes,
            });
        }

        let engine = self.engine;
        let target = request.target;
        let format = request.format;
        let work = tokio::task::spawn_blocking(move || engine.fit(&original, target, format));

        let joined = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, work).await.map_err(|_| {
                warn!(user, secs = limit.as_secs(), "Conversion timed out");
                ConvertError::Timeout {
                    secs: limit.as_secs(),
                }
            })?,
            None => work.await,
        };
        let outcome: FitOutcome = joined.map_err(|e| ConvertError::Internal(e.into()))??;

        let filename = output_filename(Local::now(), &request.extension);
        let caption = format!(
            "✅ Conversion successful!\n\
             📊 Original size: {}\n\
             📊 Final size: {}\n\
             📎 Format: {}",
            display_size(original_len),
            display_size(outcome.bytes.len() as u64),
            request.extension.to_ascii_uppercase(),
        );
        let outcome_summary = format!(
            "{} via {} ({}x{}, {} trials)",
            display_size(outcome.bytes.len() as u64),
            outcome.strategy,
            outcome.width,
            outcome.height,
            outcome.trials
        );
        info!(user, %filename, summary = %outcome_summary, "Conversion finished");

        Ok(Converted {
            filename,
            caption,
            bytes: outcome.bytes,
            outcome_summary,
        })
    }

    /// Reply for a conversion whose result could not be sent back.
    pub fn delivery_failed(&self, user: UserId, err: anyhow::Error) -> String {
        let err = ConvertError::Internal(err.context("sending the converted image failed"));
        self.report(user, &err)
    }

    /// Logs an error according to its kind and returns the user-facing text.
    pub fn report(&self, user: UserId, err: &ConvertError) -> String {
        match err.kind() {
            crate::errors::ErrorKind::Internal => error!(user, error = ?err, "Conversion failed"),
            crate::errors::ErrorKind::Processing => warn!(user, %err, "Conversion failed"),
            crate::errors::ErrorKind::InputValidation => {}
        }
        err.user_message()
    }
}
