//! PII/PHI detection for PHI Shield.
//!
//! Pattern-based entity detection with per-pattern validators, a configurable
//! confidence threshold, and explicit overlap resolution. Detection is
//! stateless and side-effect-free, so it can run concurrently across
//! independent text blobs.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod detector;
pub mod error;
pub mod patterns;

pub use detector::{DetectionPolicy, Detector};
pub use error::{DetectError, DetectResult};
pub use patterns::{Pattern, PatternMatch, PatternMatcher, PatternSet};
