use thiserror::Error;

use crate::media::OutputFormat;

/// Broad classification used at the transport boundary to decide how an
/// error is reported back to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The user's input was rejected; reply immediately, nothing was fetched.
    InputValidation,
    /// The image could not be produced within the requested constraints.
    Processing,
    /// Something unexpected; logged and answered with a generic apology.
    Internal,
}

/// Errors raised while handling a conversion request.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("Invalid format. Please use: <size_range> <format>")]
    MalformedCommand,

    #[error("Invalid size range format. Examples: 2MB-3MB, 500KB-1MB")]
    InvalidSizeRange { input: String },

    #[error("Minimum size must be less than maximum size.")]
    EmptyRange { min_bytes: u64, max_bytes: u64 },

    #[error("Unsupported format. Please use: JPG, JPEG, PNG, WEBP")]
    UnsupportedFormat { name: String },

    #[error("No image is waiting for a size range. Please send an image first.")]
    UnknownSession,

    #[error("Could not process the image within the given constraints.")]
    NoFit,

    #[error("Failed to decode image: {0}")]
    Decode(#[source] image::ImageError),

    #[error("Failed to encode {format}: {reason}")]
    Encode { format: OutputFormat, reason: String },

    #[error("Failed to download image: {0}")]
    Fetch(#[source] anyhow::Error),

    #[error("Image is too large to process ({size} bytes, limit {limit} bytes)")]
    InputTooLarge { size: u64, limit: u64 },

    #[error("Processing took longer than {secs}s")]
    Timeout { secs: u64 },

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ConvertError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConvertError::MalformedCommand
            | ConvertError::InvalidSizeRange { .. }
            | ConvertError::EmptyRange { .. }
            | ConvertError::UnsupportedFormat { .. }
            | ConvertError::UnknownSession => ErrorKind::InputValidation,
            ConvertError::NoFit
            | ConvertError::Decode(_)
            | ConvertError::Encode { .. }
            | ConvertError::Fetch(_)
            | ConvertError::InputTooLarge { .. }
            | ConvertError::Timeout { .. } => ErrorKind::Processing,
            ConvertError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Returns the text shown to the user, without leaking internal details.
    pub fn user_message(&self) -> String {
        match self.kind() {
            ErrorKind::InputValidation => format!("❌ {self}"),
            ErrorKind::Processing => match self {
                ConvertError::NoFit => "❌ Could not process the image within the given constraints.\n\
                     Try a different size range or format."
                    .to_string(),
                other => format!("❌ Error processing image: {other}"),
            },
            ErrorKind::Internal => "❌ An error occurred. Please try again.".to_string(),
        }
    }
}

pub type ConvertResult<T> = Result<T, ConvertError>;
