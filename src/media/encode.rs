use std::borrow::Cow;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::DynamicImage;

use crate::errors::{ConvertError, ConvertResult};

use super::format::OutputFormat;

/// Largest payload of a single JPEG COM segment (length field minus itself).
const JPEG_COM_MAX_PAYLOAD: usize = 65_533;

/// Keyword of the PNG `tEXt` chunk used for filler data.
const PNG_TEXT_KEYWORD: &[u8] = b"Comment";

/// Re-encodes decoded rasters into one output format.
#[derive(Debug, Clone, Copy)]
pub struct Encoder {
    format: OutputFormat,
}

impl Encoder {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Converts a decoded image into a pixel layout the encoder accepts.
    ///
    /// JPEG has no alpha channel, WebP only takes 8-bit RGB or RGBA.
    pub fn prepare(&self, img: DynamicImage) -> DynamicImage {
        let converted = match self.layout(&img) {
            Cow::Owned(converted) => Some(converted),
            Cow::Borrowed(_) => None,
        };
        converted.unwrap_or(img)
    }

    fn layout<'a>(&self, img: &'a DynamicImage) -> Cow<'a, DynamicImage> {
        match (self.format, img) {
            (OutputFormat::Jpeg, DynamicImage::ImageRgb8(_)) => Cow::Borrowed(img),
            (OutputFormat::Jpeg, other) => Cow::Owned(DynamicImage::ImageRgb8(other.to_rgb8())),
            (OutputFormat::WebP, DynamicImage::ImageRgb8(_) | DynamicImage::ImageRgba8(_)) => {
                Cow::Borrowed(img)
            }
            (OutputFormat::WebP, other) if other.color().has_alpha() => {
                Cow::Owned(DynamicImage::ImageRgba8(other.to_rgba8()))
            }
            (OutputFormat::WebP, other) => Cow::Owned(DynamicImage::ImageRgb8(other.to_rgb8())),
            (OutputFormat::Png, _) => Cow::Borrowed(img),
        }
    }

    /// Encodes `img` at `quality` (1-100) and appends `bloat` filler bytes
    /// of comment metadata when `bloat > 0`.
    pub fn encode(&self, img: &DynamicImage, quality: u8, bloat: usize) -> ConvertResult<Vec<u8>> {
        let quality = quality.clamp(1, 100);
        let img = self.layout(img);

        let mut buf = match self.format {
            OutputFormat::Jpeg => {
                let mut buf = Vec::new();
                img.write_with_encoder(JpegEncoder::new_with_quality(&mut buf, quality))
                    .map_err(|e| self.encode_error(e))?;
                buf
            }
            OutputFormat::Png => {
                let mut buf = Vec::new();
                img.write_with_encoder(PngEncoder::new(&mut buf))
                    .map_err(|e| self.encode_error(e))?;
                buf
            }
            OutputFormat::WebP => {
                let encoder = webp::Encoder::from_image(&*img).map_err(|e| self.encode_error(e))?;
                let encoded = encoder
                    .encode_simple(false, quality as f32)
                    .map_err(|e| self.encode_error(format!("{e:?}")))?;
                encoded.to_vec()
            }
        };

        if bloat > 0 {
            buf = append_bloat(self.format, buf, bloat)?;
        }

        Ok(buf)
    }

    fn encode_error(&self, reason: impl ToString) -> ConvertError {
        ConvertError::Encode {
            format: self.format,
            reason: reason.to_string(),
        }
    }
}

/// Inserts `bloat` bytes of filler comment data into an encoded buffer.
pub fn append_bloat(format: OutputFormat, encoded: Vec<u8>, bloat: usize) -> ConvertResult<Vec<u8>> {
    match format {
        OutputFormat::Jpeg => Ok(insert_jpeg_comments(encoded, bloat)),
        OutputFormat::Png => insert_png_text(encoded, bloat),
        OutputFormat::WebP => Err(ConvertError::Encode {
            format,
            reason: "WebP output cannot carry filler metadata".to_string(),
        }),
    }
}

/// Places COM segments right after SOI, splitting at the segment limit.
fn insert_jpeg_comments(encoded: Vec<u8>, bloat: usize) -> Vec<u8> {
    let segments = bloat.div_ceil(JPEG_COM_MAX_PAYLOAD);
    let mut out = Vec::with_capacity(encoded.len() + bloat + segments * 4);
    out.extend_from_slice(&encoded[..2.min(encoded.len())]);

    let mut remaining = bloat;
    while remaining > 0 {
        let payload = remaining.min(JPEG_COM_MAX_PAYLOAD);
        out.extend_from_slice(&[0xFF, 0xFE]);
        out.extend_from_slice(&((payload + 2) as u16).to_be_bytes());
        out.resize(out.len() + payload, b'x');
        remaining -= payload;
    }

    if encoded.len() > 2 {
        out.extend_from_slice(&encoded[2..]);
    }
    out
}

/// Places a `tEXt` chunk just before IEND.
fn insert_png_text(encoded: Vec<u8>, bloat: usize) -> ConvertResult<Vec<u8>> {
    const IEND_LEN: usize = 12;

    let iend_at = encoded.len().checked_sub(IEND_LEN).ok_or_else(|| ConvertError::Encode {
        format: OutputFormat::Png,
        reason: "encoded PNG is truncated".to_string(),
    })?;
    if &encoded[iend_at + 4..iend_at + 8] != b"IEND" {
        return Err(ConvertError::Encode {
            format: OutputFormat::Png,
            reason: "encoded PNG does not end with IEND".to_string(),
        });
    }

    let mut data = Vec::with_capacity(PNG_TEXT_KEYWORD.len() + 1 + bloat);
    data.extend_from_slice(PNG_TEXT_KEYWORD);
    data.push(0);
    data.resize(data.len() + bloat, b'x');

    let mut hasher = crc32fast::Hasher::new();
    hasher.update(b"tEXt");
    hasher.update(&data);
    let crc = hasher.finalize();

    let mut out = Vec::with_capacity(encoded.len() + data.len() + 12);
    out.extend_from_slice(&encoded[..iend_at]);
    out.extend_from_slice(&(data.len() as u32).to_be_bytes());
    out.extend_from_slice(b"tEXt");
    out.extend_from_slice(&data);
    out.extend_from_slice(&crc.to_be_bytes());
    out.extend_from_slice(&encoded[iend_at..]);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage, Rgba, RgbaImage};

    fn gradient(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x * 7) as u8, (y * 5) as u8, ((x + y) * 3) as u8])
        }))
    }

    #[test]
    fn test_encodes_each_format_with_signature() {
        let img = gradient(64, 48);
        for format in [OutputFormat::Jpeg, OutputFormat::Png, OutputFormat::WebP] {
            let bytes = Encoder::new(format).encode(&img, 90, 0).unwrap();
            assert!(format.matches_signature(&bytes), "{format} signature");
        }
    }

    #[test]
    fn test_jpeg_quality_changes_size() {
        let img = gradient(128, 128);
        let encoder = Encoder::new(OutputFormat::Jpeg);
        let low = encoder.encode(&img, 10, 0).unwrap();
        let high = encoder.encode(&img, 100, 0).unwrap();
        assert!(high.len() > low.len());
    }

    #[test]
    fn test_jpeg_drops_alpha() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(16, 16, Rgba([10, 20, 30, 128])));
        let bytes = Encoder::new(OutputFormat::Jpeg).encode(&img, 80, 0).unwrap();
        assert!(OutputFormat::Jpeg.matches_signature(&bytes));
    }

    #[test]
    fn test_jpeg_bloat_spans_segments_and_still_decodes() {
        let img = gradient(32, 32);
        let encoder = Encoder::new(OutputFormat::Jpeg);
        let plain = encoder.encode(&img, 90, 0).unwrap();
        let bloat = 150_000;
        let bloated = encoder.encode(&img, 90, bloat).unwrap();

        let segments = bloat.div_ceil(JPEG_COM_MAX_PAYLOAD);
        assert_eq!(bloated.len(), plain.len() + bloat + segments * 4);
        let decoded = image::load_from_memory(&bloated).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (32, 32));
    }

    #[test]
    fn test_png_bloat_adds_text_chunk_and_still_decodes() {
        let img = gradient(32, 32);
        let encoder = Encoder::new(OutputFormat::Png);
        let plain = encoder.encode(&img, 100, 0).unwrap();
        let bloated = encoder.encode(&img, 100, 4096).unwrap();

        assert_eq!(bloated.len(), plain.len() + 12 + PNG_TEXT_KEYWORD.len() + 1 + 4096);
        assert!(bloated.ends_with(&plain[plain.len() - 12..]));
        let decoded = image::load_from_memory(&bloated).unwrap();
        assert_eq!(decoded.width(), 32);
    }

    #[test]
    fn test_webp_bloat_is_rejected() {
        let img = gradient(16, 16);
        let err = Encoder::new(OutputFormat::WebP).encode(&img, 80, 1024).unwrap_err();
        assert!(matches!(err, ConvertError::Encode { format: OutputFormat::WebP, .. }));
    }
}
