//! Call-out box placement.

pub mod callout_layout;
pub mod text_height;

pub use callout_layout::{layout_callouts, rows_for_height, LayoutOptions};
pub use text_height::{EstimatedTextHeight, TextHeight};

/// Safely convert f64 to u32 with clamping.
/// The clamp ensures the value is in [0, u32::MAX] before casting.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub(crate) fn f64_to_u32_clamped(v: f64) -> u32 {
    v.clamp(0.0, f64::from(u32::MAX)).floor() as u32
}

pub(crate) fn usize_to_f64(n: usize) -> f64 {
    f64::from(u32::try_from(n).unwrap_or(u32::MAX))
}
