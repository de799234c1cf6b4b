//! Character masking for PHI Shield.
//!
//! One-way display masking for role-filtered output: `show_first`,
//! `show_last`, `show_first_last`, `full_mask`, and a custom split pattern
//! for emails. Unlike the FPE layer, masking destroys information and is
//! never inverted.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod masker;
pub mod policy;

pub use error::{MaskError, MaskResult};
pub use masker::mask;
pub use policy::{MaskPattern, MaskType, CUSTOM_MASK_RUN};
