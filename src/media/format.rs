use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::ConvertError;

/// Names accepted from users, in the order they are listed in help texts.
pub const SUPPORTED_FORMAT_NAMES: [&str; 4] = ["JPG", "JPEG", "PNG", "WEBP"];

/// Output encodings the bot can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Jpeg,
    Png,
    #[serde(rename = "webp")]
    WebP,
}

impl OutputFormat {
    /// Canonical upper-case name, as shown in captions.
    pub fn name(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "JPEG",
            OutputFormat::Png => "PNG",
            OutputFormat::WebP => "WEBP",
        }
    }

    pub fn default_extension(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Png => "png",
            OutputFormat::WebP => "webp",
        }
    }

    pub fn mime(&self) -> mime::Mime {
        match self {
            OutputFormat::Jpeg => mime::IMAGE_JPEG,
            OutputFormat::Png => mime::IMAGE_PNG,
            // `mime` has no WebP constant.
            OutputFormat::WebP => "image/webp".parse().unwrap_or(mime::APPLICATION_OCTET_STREAM),
        }
    }

    /// Whether the encoder output depends on the quality setting.
    ///
    /// PNG is lossless here, so every quality ladder collapses to one trial.
    pub fn honours_quality(&self) -> bool {
        !matches!(self, OutputFormat::Png)
    }

    /// Largest width or height the encoder accepts.
    pub fn max_dimension(&self) -> u32 {
        match self {
            OutputFormat::Jpeg | OutputFormat::Png => 65_535,
            OutputFormat::WebP => 16_383,
        }
    }

    /// Whether the container can carry filler comment data.
    pub fn supports_bloat(&self) -> bool {
        matches!(self, OutputFormat::Jpeg | OutputFormat::Png)
    }

    /// Checks the leading magic bytes of an encoded buffer.
    pub fn matches_signature(&self, bytes: &[u8]) -> bool {
        match self {
            OutputFormat::Jpeg => bytes.starts_with(&[0xFF, 0xD8, 0xFF]),
            OutputFormat::Png => bytes.starts_with(b"\x89PNG\r\n\x1a\n"),
            OutputFormat::WebP => bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for OutputFormat {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "JPG" | "JPEG" => Ok(OutputFormat::Jpeg),
            "PNG" => Ok(OutputFormat::Png),
            "WEBP" => Ok(OutputFormat::WebP),
            _ => Err(ConvertError::UnsupportedFormat { name: s.to_string() }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepts_jpg_alias() {
        assert_eq!("JPG".parse::<OutputFormat>().unwrap(), OutputFormat::Jpeg);
        assert_eq!("jpeg".parse::<OutputFormat>().unwrap(), OutputFormat::Jpeg);
        assert_eq!("Png".parse::<OutputFormat>().unwrap(), OutputFormat::Png);
        assert_eq!("webp".parse::<OutputFormat>().unwrap(), OutputFormat::WebP);
    }

    #[test]
    fn test_parse_rejects_unknown() {
        let err = "GIF".parse::<OutputFormat>().unwrap_err();
        assert!(matches!(err, ConvertError::UnsupportedFormat { ref name } if name == "GIF"));
    }

    #[test]
    fn test_signatures() {
        assert!(OutputFormat::Jpeg.matches_signature(&[0xFF, 0xD8, 0xFF, 0xE0]));
        assert!(OutputFormat::Png.matches_signature(b"\x89PNG\r\n\x1a\n...."));
        assert!(OutputFormat::WebP.matches_signature(b"RIFF\0\0\0\0WEBPVP8 "));
        assert!(!OutputFormat::WebP.matches_signature(b"RIFF"));
    }

    #[test]
    fn test_png_ignores_quality() {
        assert!(!OutputFormat::Png.honours_quality());
        assert!(OutputFormat::Jpeg.honours_quality());
        assert!(!OutputFormat::WebP.supports_bloat());
    }

    #[test]
    fn test_listed_names_all_parse() {
        for name in SUPPORTED_FORMAT_NAMES {
            assert!(name.parse::<OutputFormat>().is_ok(), "{name}");
            assert!(crate::errors::ConvertError::UnsupportedFormat { name: String::new() }
                .to_string()
                .contains(name));
        }
    }
}
