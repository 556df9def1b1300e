use crate::errors::{ConvertError, ConvertResult};

use super::format::OutputFormat;
use super::size::{parse_size_range, SizeTarget};

/// A validated `<size_range> <format>` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionRequest {
    pub target: SizeTarget,
    pub format: OutputFormat,
    /// File extension derived from the name the user typed (`jpg` vs `jpeg`).
    pub extension: String,
}

impl ConversionRequest {
    /// Parses the follow-up text sent after an image.
    ///
    /// Checks run in a fixed order: token count, format name, range syntax,
    /// then `min < max`, so each failure maps to its own message.
    pub fn parse(text: &str) -> ConvertResult<Self> {
        let parts: Vec<&str> = text.split_whitespace().collect();
        let [size_range, format_name] = parts.as_slice() else {
            return Err(ConvertError::MalformedCommand);
        };

        let format: OutputFormat = format_name.parse()?;
        let target = parse_size_range(size_range)?;

        Ok(Self {
            target,
            format,
            extension: format_name.to_ascii_lowercase(),
        })
    }
}
