//! Size-fitting engine.
//!
//! Searches a small, bounded parameter space (metadata, scale, padding,
//! quality, tiling, shrink) for an encoding whose byte length lands inside a
//! [`SizeTarget`]. The search is synchronous and CPU bound; async callers
//! should run it on a blocking worker.

use std::borrow::Cow;
use std::fmt;

use image::imageops::{self, FilterType};
use image::{DynamicImage, GenericImageView, Rgb, RgbImage, Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{self, FittingConfig};
use crate::errors::{ConvertError, ConvertResult};

use super::encode::{append_bloat, Encoder};
use super::format::OutputFormat;
use super::size::{display_size, SizeTarget};

const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

// ============================================================================
// Outcome types
// ============================================================================

/// Growth techniques, in the order they are attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GrowthTechnique {
    Metadata,
    Scaling,
    Padding,
    Quality,
    Tiling,
}

impl GrowthTechnique {
    pub const ORDER: [GrowthTechnique; 5] = [
        GrowthTechnique::Metadata,
        GrowthTechnique::Scaling,
        GrowthTechnique::Padding,
        GrowthTechnique::Quality,
        GrowthTechnique::Tiling,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            GrowthTechnique::Metadata => "metadata",
            GrowthTechnique::Scaling => "scaling",
            GrowthTechnique::Padding => "padding",
            GrowthTechnique::Quality => "quality",
            GrowthTechnique::Tiling => "tiling",
        }
    }

    fn apply(self, search: &mut Search<'_>, img: &DynamicImage) -> ConvertResult<Option<Candidate>> {
        match self {
            GrowthTechnique::Metadata => grow_by_metadata(search, img),
            GrowthTechnique::Scaling => grow_by_scaling(search, img),
            GrowthTechnique::Padding => grow_by_padding(search, img),
            GrowthTechnique::Quality => grow_by_quality(search, img),
            GrowthTechnique::Tiling => grow_by_tiling(search, img),
        }
    }
}

impl fmt::Display for GrowthTechnique {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which stage of the search produced the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "stage", content = "technique")]
pub enum Strategy {
    Growth(GrowthTechnique),
    Shrink,
    Reencode,
}

impl Strategy {
    pub fn is_growth(&self) -> bool {
        matches!(self, Strategy::Growth(_))
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Growth(technique) => write!(f, "growth/{technique}"),
            Strategy::Shrink => f.write_str("shrink"),
            Strategy::Reencode => f.write_str("reencode"),
        }
    }
}

/// A successful fit.
#[derive(Debug, Clone)]
pub struct FitOutcome {
    /// Encoded output, guaranteed to lie inside the requested target.
    pub bytes: Vec<u8>,
    pub format: OutputFormat,
    pub strategy: Strategy,
    /// Output geometry.
    pub width: u32,
    pub height: u32,
    /// Number of encodings performed during the search.
    pub trials: u32,
}

// ============================================================================
// Engine
// ============================================================================

/// Tunables of the engine that are exposed through configuration.
#[derive(Debug, Clone, Copy)]
pub struct FitSettings {
    pub reencode_quality: u8,
    pub verify_quality: u8,
    pub max_canvas_pixels: u64,
}

impl Default for FitSettings {
    fn default() -> Self {
        Self {
            reencode_quality: config::DEFAULT_REENCODE_QUALITY,
            verify_quality: config::DEFAULT_VERIFY_QUALITY,
            max_canvas_pixels: config::DEFAULT_MAX_CANVAS_PIXELS,
        }
    }
}

impl From<&FittingConfig> for FitSettings {
    fn from(cfg: &FittingConfig) -> Self {
        Self {
            reencode_quality: cfg.reencode_quality,
            verify_quality: cfg.verify_quality,
            max_canvas_pixels: cfg.max_canvas_pixels,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FitEngine {
    settings: FitSettings,
}

impl FitEngine {
    pub fn new(settings: FitSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &FitSettings {
        &self.settings
    }

    /// Re-encodes `input` as `format` so that its length lies inside `target`.
    ///
    /// Growth is attempted only when the input is smaller than the target,
    /// shrinking when it is larger or growth failed, and an in-range input is
    /// re-encoded once. Returns [`ConvertError::NoFit`] when every ladder is
    /// exhausted.
    pub fn fit(&self, input: &[u8], target: SizeTarget, format: OutputFormat) -> ConvertResult<FitOutcome> {
        let encoder = Encoder::new(format);
        let decoded = image::load_from_memory(input).map_err(ConvertError::Decode)?;
        let img = encoder.prepare(decoded);
        let current = input.len() as u64;

        info!(
            original = %display_size(current),
            target = %target,
            format = %format,
            width = img.width(),
            height = img.height(),
            "Fitting image"
        );

        let mut search = Search {
            encoder,
            target,
            settings: &self.settings,
            trials: 0,
        };

        if target.is_below(current) {
            info!("Attempting to increase image size");
            if let Some(outcome) = grow(&mut search, &img)? {
                return Ok(search.finish(outcome));
            }
        }

        if target.is_above(current) || target.is_below(current) {
            if let Some(outcome) = shrink(&mut search, &img) {
                return Ok(search.finish(outcome));
            }
        }

        if target.contains(current) {
            let quality = self.settings.reencode_quality;
            if let Some(bytes) = search.encode(&img, quality, 0) {
                if target.contains(bytes.len() as u64) {
                    let (width, height) = img.dimensions();
                    return Ok(search.finish(Placed {
                        bytes,
                        strategy: Strategy::Reencode,
                        width,
                        height,
                    }));
                }
            }
            // The fixed-quality re-encode drifted out of the window or was
            // rejected by the encoder.
            if let Some(outcome) = shrink(&mut search, &img) {
                return Ok(search.finish(outcome));
            }
        }

        info!(trials = search.trials, "Failed to meet size constraints");
        Err(ConvertError::NoFit)
    }
}

// ============================================================================
// Search state
// ============================================================================

struct Search<'a> {
    encoder: Encoder,
    target: SizeTarget,
    settings: &'a FitSettings,
    trials: u32,
}

/// An encoding that reached `target.min` during a growth technique.
struct Candidate {
    image: DynamicImage,
    quality: u8,
    bloat: usize,
    bytes: Vec<u8>,
}

/// An encoding that landed inside the target.
struct Placed {
    bytes: Vec<u8>,
    strategy: Strategy,
    width: u32,
    height: u32,
}

impl Search<'_> {
    fn format(&self) -> OutputFormat {
        self.encoder.format()
    }

    /// Runs one trial. An encoder rejection (dimension limits, unsupported
    /// layout) only rules out this trial, so it yields `None`.
    fn encode(&mut self, img: &DynamicImage, quality: u8, bloat: usize) -> Option<Vec<u8>> {
        self.trials += 1;
        let bytes = match self.encoder.encode(img, quality, bloat) {
            Ok(bytes) => bytes,
            Err(err) => {
                debug!(width = img.width(), height = img.height(), quality, %err, "Trial rejected");
                return None;
            }
        };
        debug!(
            width = img.width(),
            height = img.height(),
            quality,
            bloat,
            size = %display_size(bytes.len() as u64),
            "Trial encoding"
        );
        Some(bytes)
    }

    fn reaches_min(&self, bytes: &[u8]) -> bool {
        !self.target.is_below(bytes.len() as u64)
    }

    /// Qualities to try while growing; a single step when quality is ignored.
    fn growth_qualities(&self) -> Vec<u8> {
        if self.format().honours_quality() {
            config::GROWTH_QUALITIES.collect()
        } else {
            vec![*config::GROWTH_QUALITIES.end()]
        }
    }

    /// Descending shrink ladder; a single step when quality is ignored.
    fn shrink_qualities(&self) -> Vec<u8> {
        if !self.format().honours_quality() {
            return vec![config::SHRINK_QUALITY_START];
        }
        (config::SHRINK_QUALITY_END..=config::SHRINK_QUALITY_START)
            .rev()
            .step_by(config::SHRINK_QUALITY_STEP as usize)
            .collect()
    }

    fn fits_canvas(&self, width: u32, height: u32) -> bool {
        let max_dim = self.format().max_dimension();
        width > 0
            && height > 0
            && width <= max_dim
            && height <= max_dim
            && (width as u64) * (height as u64) <= self.settings.max_canvas_pixels
    }

    fn finish(&self, placed: Placed) -> FitOutcome {
        info!(
            strategy = %placed.strategy,
            size = %display_size(placed.bytes.len() as u64),
            width = placed.width,
            height = placed.height,
            trials = self.trials,
            "Image fitted"
        );
        FitOutcome {
            bytes: placed.bytes,
            format: self.format(),
            strategy: placed.strategy,
            width: placed.width,
            height: placed.height,
            trials: self.trials,
        }
    }
}

// ============================================================================
// Growth
// ============================================================================

fn grow(search: &mut Search<'_>, img: &DynamicImage) -> ConvertResult<Option<Placed>> {
    for technique in GrowthTechnique::ORDER {
        info!(%technique, "Trying to increase size");
        let Some(candidate) = technique.apply(search, img)? else {
            continue;
        };
        if let Some(placed) = accept(search, technique, candidate) {
            return Ok(Some(placed));
        }
    }

    Ok(None)
}

/// Checks a growth candidate: it must still reach `min` when encoded at the
/// verification quality, and its own bytes must not exceed `max`.
fn accept(search: &mut Search<'_>, technique: GrowthTechnique, candidate: Candidate) -> Option<Placed> {
    let verify_quality = search.settings.verify_quality;
    let ignores_quality = !search.format().honours_quality();
    let verified = if candidate.quality == verify_quality || ignores_quality {
        search.reaches_min(&candidate.bytes)
    } else {
        search
            .encode(&candidate.image, verify_quality, candidate.bloat)
            .is_some_and(|check| search.reaches_min(&check))
    };
    if !verified {
        debug!(%technique, "Candidate failed verification");
        return None;
    }

    if !search.target.contains(candidate.bytes.len() as u64) {
        debug!(
            %technique,
            size = %display_size(candidate.bytes.len() as u64),
            "Candidate overshoots target"
        );
        return None;
    }

    let (width, height) = candidate.image.dimensions();
    Some(Placed {
        bytes: candidate.bytes,
        strategy: Strategy::Growth(technique),
        width,
        height,
    })
}

fn grow_by_metadata(search: &mut Search<'_>, img: &DynamicImage) -> ConvertResult<Option<Candidate>> {
    let format = search.format();
    if !format.supports_bloat() {
        return Ok(None);
    }

    let quality = search.settings.verify_quality;
    let Some(base) = search.encode(img, quality, 0) else {
        return Ok(None);
    };
    let mut bloat = config::METADATA_START_BYTES;

    for _ in 0..config::METADATA_ROUNDS {
        let bytes = append_bloat(format, base.clone(), bloat)?;
        search.trials += 1;
        if search.reaches_min(&bytes) {
            return Ok(Some(Candidate {
                image: img.clone(),
                quality,
                bloat,
                bytes,
            }));
        }
        bloat *= 2;
    }

    Ok(None)
}

fn grow_by_scaling(search: &mut Search<'_>, img: &DynamicImage) -> ConvertResult<Option<Candidate>> {
    let (width, height) = img.dimensions();
    let qualities = search.growth_qualities();
    let mut factor = config::SCALE_STEP;

    while factor <= config::SCALE_MAX {
        let new_width = (width as f64 * factor) as u32;
        let new_height = (height as f64 * factor) as u32;
        if !search.fits_canvas(new_width, new_height) {
            break;
        }

        let enlarged = img.resize_exact(new_width, new_height, FilterType::Lanczos3);
        for &quality in &qualities {
            let Some(bytes) = search.encode(&enlarged, quality, 0) else {
                continue;
            };
            if search.reaches_min(&bytes) {
                return Ok(Some(Candidate {
                    image: enlarged,
                    quality,
                    bloat: 0,
                    bytes,
                }));
            }
        }

        factor *= config::SCALE_STEP;
    }

    Ok(None)
}

fn grow_by_padding(search: &mut Search<'_>, img: &DynamicImage) -> ConvertResult<Option<Candidate>> {
    let (width, height) = img.dimensions();
    let quality = search.settings.verify_quality;
    let mut padding = config::PADDING_START_PX;

    while padding <= config::PADDING_MAX_PX {
        let (new_width, new_height) = (width + 2 * padding, height + 2 * padding);
        if !search.fits_canvas(new_width, new_height) {
            break;
        }

        let offset = padding as i64;
        let padded = compose(img, new_width, new_height, WHITE, &[(offset, offset)]);
        if let Some(bytes) = search.encode(&padded, quality, 0) {
            if search.reaches_min(&bytes) {
                return Ok(Some(Candidate {
                    image: padded,
                    quality,
                    bloat: 0,
                    bytes,
                }));
            }
        }

        padding *= 2;
    }

    Ok(None)
}

fn grow_by_quality(search: &mut Search<'_>, img: &DynamicImage) -> ConvertResult<Option<Candidate>> {
    for quality in search.growth_qualities() {
        let Some(bytes) = search.encode(img, quality, 0) else {
            continue;
        };
        if search.reaches_min(&bytes) {
            return Ok(Some(Candidate {
                image: img.clone(),
                quality,
                bloat: 0,
                bytes,
            }));
        }
    }

    Ok(None)
}

fn grow_by_tiling(search: &mut Search<'_>, img: &DynamicImage) -> ConvertResult<Option<Candidate>> {
    let (width, height) = img.dimensions();
    let quality = search.settings.verify_quality;

    for copies in config::TILE_COUNTS {
        let new_height = height * copies;
        if !search.fits_canvas(width, new_height) {
            break;
        }

        let placements: Vec<(i64, i64)> = (0..copies).map(|i| (0, (i * height) as i64)).collect();
        let tiled = compose(img, width, new_height, BLACK, &placements);
        if let Some(bytes) = search.encode(&tiled, quality, 0) {
            if search.reaches_min(&bytes) {
                return Ok(Some(Candidate {
                    image: tiled,
                    quality,
                    bloat: 0,
                    bytes,
                }));
            }
        }
    }

    Ok(None)
}

/// Draws `img` onto a `fill`-coloured canvas at each of `placements`.
///
/// The canvas keeps an alpha channel only when the source has one.
fn compose(
    img: &DynamicImage,
    width: u32,
    height: u32,
    fill: Rgba<u8>,
    placements: &[(i64, i64)],
) -> DynamicImage {
    if img.color().has_alpha() {
        let top = img.to_rgba8();
        let mut canvas = RgbaImage::from_pixel(width, height, fill);
        for &(x, y) in placements {
            imageops::replace(&mut canvas, &top, x, y);
        }
        DynamicImage::ImageRgba8(canvas)
    } else {
        let top = img.to_rgb8();
        let [r, g, b, _] = fill.0;
        let mut canvas = RgbImage::from_pixel(width, height, Rgb([r, g, b]));
        for &(x, y) in placements {
            imageops::replace(&mut canvas, &top, x, y);
        }
        DynamicImage::ImageRgb8(canvas)
    }
}

// ============================================================================
// Shrink
// ============================================================================

fn shrink(search: &mut Search<'_>, img: &DynamicImage) -> Option<Placed> {
    let qualities = search.shrink_qualities();
    let (mut width, mut height) = img.dimensions();

    while width > config::SHRINK_MIN_DIMENSION && height > config::SHRINK_MIN_DIMENSION {
        if !search.fits_canvas(width, height) {
            debug!(width, height, "Step exceeds format limits, shrinking further");
            width = (width as f64 * config::SHRINK_RATIO) as u32;
            height = (height as f64 * config::SHRINK_RATIO) as u32;
            continue;
        }

        let resized = if (width, height) == img.dimensions() {
            Cow::Borrowed(img)
        } else {
            Cow::Owned(img.resize_exact(width, height, FilterType::Lanczos3))
        };

        for &quality in &qualities {
            let Some(bytes) = search.encode(&resized, quality, 0) else {
                continue;
            };
            if search.target.contains(bytes.len() as u64) {
                return Some(Placed {
                    bytes,
                    strategy: Strategy::Shrink,
                    width,
                    height,
                });
            }
        }

        width = (width as f64 * config::SHRINK_RATIO) as u32;
        height = (height as f64 * config::SHRINK_RATIO) as u32;
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::size::{KIB, MIB};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    /// Random RGB noise; incompressible, so PNG size ≈ 3 × width × height.
    fn noise(width: u32, height: u32, seed: u64) -> DynamicImage {
        let mut rng = StdRng::seed_from_u64(seed);
        DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |_, _| {
            Rgb([rng.gen(), rng.gen(), rng.gen()])
        }))
    }

    fn png_bytes(img: &DynamicImage) -> Vec<u8> {
        Encoder::new(OutputFormat::Png).encode(img, 100, 0).unwrap()
    }

    #[test]
    fn test_small_png_grows_with_metadata_first() {
        // ~48 KiB input, target 500KB-1MB.
        let input = png_bytes(&noise(128, 128, 1));
        assert!(input.len() < 60 * 1024);
        let target = SizeTarget::new(500 * KIB, MIB).unwrap();

        let outcome = FitEngine::default().fit(&input, target, OutputFormat::Png).unwrap();

        assert_eq!(outcome.strategy, Strategy::Growth(GrowthTechnique::Metadata));
        assert!(target.contains(outcome.bytes.len() as u64));
        assert!(OutputFormat::Png.matches_signature(&outcome.bytes));
        assert_eq!((outcome.width, outcome.height), (128, 128));
    }

    #[test]
    fn test_large_png_shrinks_into_window() {
        // ~768 KiB input, target 100KB-300KB.
        let input = png_bytes(&noise(512, 512, 2));
        let target = SizeTarget::new(100 * KIB, 300 * KIB).unwrap();

        let outcome = FitEngine::default().fit(&input, target, OutputFormat::Png).unwrap();

        assert_eq!(outcome.strategy, Strategy::Shrink);
        assert!(target.contains(outcome.bytes.len() as u64));
        assert!(outcome.width < 512 && outcome.width > 100);
        let decoded = image::load_from_memory(&outcome.bytes).unwrap();
        assert_eq!(decoded.dimensions(), (outcome.width, outcome.height));
    }

    #[test]
    fn test_in_range_input_is_reencoded_once() {
        let input = png_bytes(&noise(128, 128, 3));
        let target = SizeTarget::new(10 * KIB, 200 * KIB).unwrap();

        let outcome = FitEngine::default().fit(&input, target, OutputFormat::Png).unwrap();

        assert_eq!(outcome.strategy, Strategy::Reencode);
        assert_eq!(outcome.trials, 1);
        assert!(target.contains(outcome.bytes.len() as u64));
    }

    #[test]
    fn test_unreachable_target_reports_no_fit() {
        // Too large for any ladder: a 24x24 image cannot be grown to 50 MB.
        let input = png_bytes(&noise(24, 24, 4));
        let target = SizeTarget::new(50 * MIB, 60 * MIB).unwrap();

        let err = FitEngine::default().fit(&input, target, OutputFormat::Png).unwrap_err();
        assert!(matches!(err, ConvertError::NoFit));
    }

    #[test]
    fn test_jpeg_result_is_in_range_or_no_fit() {
        let input = png_bytes(&noise(160, 120, 5));
        let target = SizeTarget::new(2 * MIB, 3 * MIB).unwrap();

        match FitEngine::default().fit(&input, target, OutputFormat::Jpeg) {
            Ok(outcome) => {
                assert!(target.contains(outcome.bytes.len() as u64));
                assert!(OutputFormat::Jpeg.matches_signature(&outcome.bytes));
            }
            Err(err) => assert!(matches!(err, ConvertError::NoFit)),
        }
    }

    #[test]
    fn test_webp_shrink_uses_quality_ladder() {
        let input = png_bytes(&noise(256, 256, 6));
        let target = SizeTarget::new(KIB, 40 * KIB).unwrap();

        match FitEngine::default().fit(&input, target, OutputFormat::WebP) {
            Ok(outcome) => {
                assert_eq!(outcome.strategy, Strategy::Shrink);
                assert!(target.contains(outcome.bytes.len() as u64));
                assert!(OutputFormat::WebP.matches_signature(&outcome.bytes));
            }
            Err(err) => assert!(matches!(err, ConvertError::NoFit)),
        }
    }

    #[test]
    fn test_metadata_overshoot_falls_through_to_tiling() {
        // ~48 KiB input. Bloat jumps from ~80 KiB straight to ~112 KiB, while
        // two stacked copies land near 96 KiB. The canvas cap leaves room for
        // one scaling step (153x153, still under min) and no padding.
        let input = png_bytes(&noise(128, 128, 9));
        let target = SizeTarget::new(92 * KIB, 101 * KIB).unwrap();
        let engine = FitEngine::new(FitSettings {
            max_canvas_pixels: 128 * 256,
            ..FitSettings::default()
        });

        let outcome = engine.fit(&input, target, OutputFormat::Png).unwrap();

        assert_eq!(outcome.strategy, Strategy::Growth(GrowthTechnique::Tiling));
        assert_eq!((outcome.width, outcome.height), (128, 256));
        assert!(target.contains(outcome.bytes.len() as u64));
        let decoded = image::load_from_memory(&outcome.bytes).unwrap();
        assert_eq!(decoded.dimensions(), (128, 256));
    }

    #[test]
    fn test_scaling_grows_past_metadata_ceiling() {
        // ~470 KiB input; the largest bloat (512 KiB) stays under 1 MiB, so
        // only an enlarged canvas can reach the window.
        let input = png_bytes(&noise(400, 400, 10));
        let target = SizeTarget::new(MIB, 8 * MIB).unwrap();

        let outcome = FitEngine::default().fit(&input, target, OutputFormat::Png).unwrap();

        assert_eq!(outcome.strategy, Strategy::Growth(GrowthTechnique::Scaling));
        assert!(outcome.width > 400 && outcome.width == outcome.height);
        assert!(target.contains(outcome.bytes.len() as u64));
        let decoded = image::load_from_memory(&outcome.bytes).unwrap();
        assert_eq!(decoded.dimensions(), (outcome.width, outcome.height));
    }

    #[test]
    fn test_webp_growth_skips_metadata() {
        let input = png_bytes(&noise(64, 64, 11));
        let target = SizeTarget::new(13 * KIB, 50 * MIB).unwrap();
        assert!(target.is_below(input.len() as u64));

        let outcome = FitEngine::default().fit(&input, target, OutputFormat::WebP).unwrap();

        assert!(outcome.strategy.is_growth(), "got {}", outcome.strategy);
        assert_ne!(outcome.strategy, Strategy::Growth(GrowthTechnique::Metadata));
        assert!(target.contains(outcome.bytes.len() as u64));
        assert!(OutputFormat::WebP.matches_signature(&outcome.bytes));
    }

    #[test]
    fn test_oversized_webp_input_shrinks_to_encodable_step() {
        // 17000 px is beyond WebP's 16383 limit; 15300 px is the first step
        // the encoder accepts.
        let mut rng = StdRng::seed_from_u64(12);
        let img = DynamicImage::ImageRgb8(RgbImage::from_fn(17_000, 200, |x, y| {
            let jitter: u8 = rng.gen_range(0..8);
            Rgb([(x % 256) as u8 ^ jitter, (y % 200) as u8, 128 + jitter])
        }));
        let input = png_bytes(&img);
        let target = SizeTarget::new(KIB, 4 * MIB).unwrap();

        let outcome = FitEngine::default().fit(&input, target, OutputFormat::WebP).unwrap();

        assert_eq!(outcome.strategy, Strategy::Shrink);
        assert_eq!((outcome.width, outcome.height), (15_300, 180));
        assert!(target.contains(outcome.bytes.len() as u64));
        assert!(OutputFormat::WebP.matches_signature(&outcome.bytes));
    }

    fn search_for(format: OutputFormat, settings: &FitSettings, min: u64, max: u64) -> Search<'_> {
        Search {
            encoder: Encoder::new(format),
            target: SizeTarget::new(min, max).unwrap(),
            settings,
            trials: 0,
        }
    }

    #[test]
    fn test_candidate_failing_verification_is_rejected() {
        // The candidate claims 5000 bytes at quality 95, but the 8x8 image
        // re-encoded at quality 100 is far below min.
        let settings = FitSettings::default();
        let mut search = search_for(OutputFormat::Jpeg, &settings, 4000, 6000);
        let candidate = Candidate {
            image: noise(8, 8, 13),
            quality: 95,
            bloat: 0,
            bytes: vec![0; 5000],
        };

        assert!(accept(&mut search, GrowthTechnique::Scaling, candidate).is_none());
        assert_eq!(search.trials, 1);
    }

    #[test]
    fn test_candidate_at_verify_quality_is_accepted_without_reencoding() {
        let settings = FitSettings::default();
        let mut search = search_for(OutputFormat::Jpeg, &settings, 4000, 6000);
        let candidate = Candidate {
            image: noise(8, 8, 14),
            quality: settings.verify_quality,
            bloat: 0,
            bytes: vec![0; 5000],
        };

        let placed = accept(&mut search, GrowthTechnique::Padding, candidate).unwrap();
        assert_eq!(placed.strategy, Strategy::Growth(GrowthTechnique::Padding));
        assert_eq!((placed.width, placed.height), (8, 8));
        assert_eq!(search.trials, 0);
    }

    #[test]
    fn test_overshooting_candidate_is_rejected() {
        let settings = FitSettings::default();
        let mut search = search_for(OutputFormat::Png, &settings, 4000, 6000);
        let candidate = Candidate {
            image: noise(8, 8, 15),
            quality: settings.verify_quality,
            bloat: 0,
            bytes: vec![0; 7000],
        };

        assert!(accept(&mut search, GrowthTechnique::Metadata, candidate).is_none());
    }

    #[test]
    fn test_garbage_input_is_a_decode_error() {
        let target = SizeTarget::new(KIB, MIB).unwrap();
        let err = FitEngine::default()
            .fit(b"definitely not an image", target, OutputFormat::Png)
            .unwrap_err();
        assert!(matches!(err, ConvertError::Decode(_)));
    }

    #[test]
    fn test_compose_places_tiles() {
        let img = noise(10, 5, 7);
        let tiled = compose(&img, 10, 15, BLACK, &[(0, 0), (0, 5), (0, 10)]);
        assert_eq!(tiled.dimensions(), (10, 15));
        assert_eq!(tiled.get_pixel(3, 2), tiled.get_pixel(3, 7));
        assert_eq!(tiled.get_pixel(3, 2), tiled.get_pixel(3, 12));
    }

    #[test]
    fn test_compose_pads_with_white() {
        let img = noise(4, 4, 8);
        let padded = compose(&img, 8, 8, WHITE, &[(2, 2)]);
        assert_eq!(padded.get_pixel(0, 0), WHITE);
        assert_eq!(padded.get_pixel(2, 2), img.get_pixel(0, 0));
    }

    #[test]
    fn test_shrink_ladder_descends_by_five() {
        let settings = FitSettings::default();
        let search = Search {
            encoder: Encoder::new(OutputFormat::Jpeg),
            target: SizeTarget::new(1, 2).unwrap(),
            settings: &settings,
            trials: 0,
        };
        let ladder = search.shrink_qualities();
        assert_eq!(ladder.first(), Some(&95));
        assert_eq!(ladder.last(), Some(&5));
        assert_eq!(ladder.len(), 19);
        assert_eq!(search.growth_qualities(), vec![95, 96, 97, 98, 99, 100]);
    }

    #[test]
    fn test_png_ladders_collapse() {
        let settings = FitSettings::default();
        let search = Search {
            encoder: Encoder::new(OutputFormat::Png),
            target: SizeTarget::new(1, 2).unwrap(),
            settings: &settings,
            trials: 0,
        };
        assert_eq!(search.shrink_qualities().len(), 1);
        assert_eq!(search.growth_qualities().len(), 1);
    }
}
