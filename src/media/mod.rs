//! Image re-encoding: size arithmetic, command parsing, encoders, and the
//! size-fitting engine.

pub mod encode;
pub mod fit;
pub mod format;
pub mod request;
pub mod size;

pub use encode::Encoder;
pub use fit::{FitEngine, FitOutcome, FitSettings, GrowthTechnique, Strategy};
pub use format::{OutputFormat, SUPPORTED_FORMAT_NAMES};
pub use request::ConversionRequest;
pub use size::{convert_to_bytes, display_size, parse_size_range, SizeTarget};
