/// Default configuration constants used across the system.

/// Quality used when an in-range original is re-encoded once.
pub const DEFAULT_REENCODE_QUALITY: u8 = 95;

/// Quality a growth candidate is re-verified at before acceptance.
pub const DEFAULT_VERIFY_QUALITY: u8 = 100;

/// Largest canvas (width × height) the growth techniques may produce (40 MP).
pub const DEFAULT_MAX_CANVAS_PIXELS: u64 = 40_000_000;

/// Largest file the Telegram Bot API lets bots download (20 MB).
pub const DEFAULT_MAX_INPUT_BYTES: u64 = 20 * 1024 * 1024;

/// Default log level directive for this crate.
pub const DEFAULT_LOG_LEVEL: &str = "info";

// ============================================================================
// Growth ladders
// ============================================================================

/// First amount of filler metadata, doubled every round.
pub const METADATA_START_BYTES: usize = 1024;

/// Number of metadata doubling rounds (1 KiB up to 512 KiB).
pub const METADATA_ROUNDS: u32 = 10;

/// Scale-up step, applied cumulatively.
pub const SCALE_STEP: f64 = 1.2;

/// Largest scale-up factor tried.
pub const SCALE_MAX: f64 = 4.0;

/// Inclusive quality range tried while growing.
pub const GROWTH_QUALITIES: std::ops::RangeInclusive<u8> = 95..=100;

/// First border width in pixels, doubled every round.
pub const PADDING_START_PX: u32 = 100;

/// Largest border width tried.
pub const PADDING_MAX_PX: u32 = 1000;

/// Vertical tiling multipliers tried.
pub const TILE_COUNTS: std::ops::RangeInclusive<u32> = 2..=4;

// ============================================================================
// Shrink ladder
// ============================================================================

/// Geometry multiplier between shrink steps.
pub const SHRINK_RATIO: f64 = 0.9;

/// Shrinking continues only while both dimensions exceed this.
pub const SHRINK_MIN_DIMENSION: u32 = 100;

/// Highest quality of the descending shrink ladder.
pub const SHRINK_QUALITY_START: u8 = 95;

/// Lowest quality of the descending shrink ladder.
pub const SHRINK_QUALITY_END: u8 = 5;

/// Step between shrink ladder qualities.
pub const SHRINK_QUALITY_STEP: u8 = 5;
