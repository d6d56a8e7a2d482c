//! Fill color tokens and palette resolution
//!
//! Cells are compared by fill color, so every color that leaves the reader is
//! reduced to a [`FillColor`] token: upper-case `RRGGBB` hex without `#` and
//! without the ARGB alpha byte. Theme and indexed colors are resolved through
//! the workbook palette first.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::ColorSpec;

/// Excel's 64 indexed colors (legacy palette)
pub const INDEXED_COLORS: [&str; 64] = [
    "#000000", "#FFFFFF", "#FF0000", "#00FF00", "#0000FF", "#FFFF00", "#FF00FF", "#00FFFF",
    "#000000", "#FFFFFF", "#FF0000", "#00FF00", "#0000FF", "#FFFF00", "#FF00FF", "#00FFFF",
    "#800000", "#008000", "#000080", "#808000", "#800080", "#008080", "#C0C0C0", "#808080",
    "#9999FF", "#993366", "#FFFFCC", "#CCFFFF", "#660066", "#FF8080", "#0066CC", "#CCCCFF",
    "#000080", "#FF00FF", "#FFFF00", "#00FFFF", "#800080", "#800000", "#008080", "#0000FF",
    "#00CCFF", "#CCFFFF", "#CCFFCC", "#FFFF99", "#99CCFF", "#FF99CC", "#CC99FF", "#FFCC99",
    "#3366FF", "#33CCCC", "#99CC00", "#FFCC00", "#FF9900", "#FF6600", "#666699", "#969696",
    "#003366", "#339966", "#003300", "#333300", "#993300", "#993366", "#333399", "#333333",
];

/// Office theme palette used when the package carries no theme part.
/// Index order: lt1, dk1, lt2, dk2, accent1-accent6, hlink, folHlink.
pub const DEFAULT_THEME_COLORS: [&str; 12] = [
    "#FFFFFF", "#000000", "#E7E6E6", "#44546A", "#4472C4", "#ED7D31", "#A5A5A5", "#FFC000",
    "#5B9BD5", "#70AD47", "#0563C1", "#954F72",
];

/// Normalized fill color token. The empty token means "no fill".
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct FillColor(String);

impl FillColor {
    /// Normalize a raw color string (`#RRGGBB`, `RRGGBB` or `AARRGGBB`, any case).
    pub fn new(raw: &str) -> Self {
        let hex = raw.trim().trim_start_matches('#').to_ascii_uppercase();
        let is_hex = hex.bytes().all(|b| b.is_ascii_hexdigit());
        if is_hex && hex.len() == 8 {
            return Self(hex.get(2..).unwrap_or_default().to_string());
        }
        Self(hex)
    }

    /// The "no fill" token.
    pub fn none() -> Self {
        Self(String::new())
    }

    pub fn is_none(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for FillColor {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for FillColor {
    fn from(raw: String) -> Self {
        Self::new(&raw)
    }
}

impl From<FillColor> for String {
    fn from(color: FillColor) -> Self {
        color.0
    }
}

impl fmt::Display for FillColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Resolve a `ColorSpec` to an `#RRGGBB` string.
///
/// Priority is rgb, then theme (with tint), then indexed, then auto.
pub fn resolve_color(
    color: &ColorSpec,
    theme_colors: &[String],
    indexed_colors: Option<&Vec<String>>,
) -> Option<String> {
    if let Some(rgb) = &color.rgb {
        let rgb = rgb.trim_start_matches('#');
        let rgb = if rgb.len() == 8 {
            rgb.get(2..).unwrap_or(rgb)
        } else {
            rgb
        };
        return Some(format!("#{rgb}"));
    }

    if let Some(theme_idx) = color.theme {
        let idx = theme_idx as usize;
        let base_color = theme_colors
            .get(idx)
            .map(String::as_str)
            .or_else(|| DEFAULT_THEME_COLORS.get(idx).copied())?;

        if let Some(tint) = color.tint {
            return Some(apply_tint(base_color, tint));
        }
        return Some(base_color.to_string());
    }

    if let Some(indexed) = color.indexed {
        // 64 is the system foreground
        if indexed == 64 {
            return Some("#000000".to_string());
        }

        let idx = indexed as usize;
        if let Some(color) = indexed_colors.and_then(|palette| palette.get(idx)) {
            return Some(color.clone());
        }
        if let Some(color) = INDEXED_COLORS.get(idx) {
            return Some((*color).to_string());
        }
    }

    if color.auto {
        return Some("#000000".to_string());
    }

    None
}

/// Resolve a `ColorSpec` straight to a fill token; unresolvable specs give no fill.
pub fn resolve_fill(
    color: &ColorSpec,
    theme_colors: &[String],
    indexed_colors: Option<&Vec<String>>,
) -> FillColor {
    resolve_color(color, theme_colors, indexed_colors)
        .map(|hex| FillColor::new(&hex))
        .unwrap_or_default()
}

/// Apply a tint value to a color.
/// Negative tints shade (darken), positive tints lighten.
#[allow(clippy::many_single_char_names)]
pub fn apply_tint(hex_color: &str, tint: f64) -> String {
    let hex = hex_color.trim_start_matches('#');
    let channel = |range: std::ops::Range<usize>| {
        hex.get(range)
            .and_then(|s| u8::from_str_radix(s, 16).ok())
            .unwrap_or(0)
    };

    let (h, s, l) = rgb_to_hsl(channel(0..2), channel(2..4), channel(4..6));

    let new_l = if tint < 0.0 {
        l * (1.0 + tint)
    } else {
        (1.0 - l).mul_add(tint, l)
    };

    let (r, g, b) = hsl_to_rgb(h, s, new_l.clamp(0.0, 1.0));

    format!("#{r:02X}{g:02X}{b:02X}")
}

#[allow(clippy::many_single_char_names)]
fn rgb_to_hsl(r: u8, g: u8, b: u8) -> (f64, f64, f64) {
    let r = f64::from(r) / 255.0;
    let g = f64::from(g) / 255.0;
    let b = f64::from(b) / 255.0;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let l = f64::midpoint(max, min);

    if (max - min).abs() < f64::EPSILON {
        return (0.0, 0.0, l);
    }

    let d = max - min;
    let s = if l > 0.5 {
        d / (2.0 - max - min)
    } else {
        d / (max + min)
    };

    let h = if (max - r).abs() < f64::EPSILON {
        (g - b) / d + if g < b { 6.0 } else { 0.0 }
    } else if (max - g).abs() < f64::EPSILON {
        (b - r) / d + 2.0
    } else {
        (r - g) / d + 4.0
    };

    (h / 6.0, s, l)
}

#[allow(clippy::many_single_char_names)]
#[allow(clippy::cast_possible_truncation)]
#[allow(clippy::cast_sign_loss)]
fn hsl_to_rgb(h: f64, s: f64, l: f64) -> (u8, u8, u8) {
    if s.abs() < f64::EPSILON {
        let v = (l * 255.0).round() as u8;
        return (v, v, v);
    }

    let q = if l < 0.5 {
        l * (1.0 + s)
    } else {
        l.mul_add(-s, l + s)
    };
    let p = 2.0f64.mul_add(l, -q);

    let r = hue_to_rgb(p, q, h + 1.0 / 3.0);
    let g = hue_to_rgb(p, q, h);
    let b = hue_to_rgb(p, q, h - 1.0 / 3.0);

    (
        (r * 255.0).round() as u8,
        (g * 255.0).round() as u8,
        (b * 255.0).round() as u8,
    )
}

fn hue_to_rgb(p: f64, q: f64, mut t: f64) -> f64 {
    if t < 0.0 {
        t += 1.0;
    }
    if t > 1.0 {
        t -= 1.0;
    }

    if t < 1.0 / 6.0 {
        return ((q - p) * 6.0).mul_add(t, p);
    }
    if t < 1.0 / 2.0 {
        return q;
    }
    if t < 2.0 / 3.0 {
        return ((q - p) * (2.0 / 3.0 - t)).mul_add(6.0, p);
    }
    p
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::panic
)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_token_ignores_case_hash_and_alpha() {
        let expected = FillColor::new("FFFF00");
        assert_eq!(FillColor::new("FFFFFF00"), expected);
        assert_eq!(FillColor::new("ffffff00"), expected);
        assert_eq!(FillColor::new("#ffff00"), expected);
        assert_eq!(expected.as_str(), "FFFF00");
    }

    #[test]
    fn test_fill_token_none() {
        assert!(FillColor::none().is_none());
        assert!(FillColor::new("").is_none());
        assert!(!FillColor::new("00FF00").is_none());
    }

    #[test]
    fn test_fill_token_serde_normalizes() {
        let color: FillColor = serde_json::from_str("\"ff00ff00\"").unwrap();
        assert_eq!(color.as_str(), "00FF00");
        assert_eq!(serde_json::to_string(&color).unwrap(), "\"00FF00\"");
    }

    #[test]
    fn test_tint_lighten() {
        assert_eq!(apply_tint("#000000", 0.5), "#808080");
    }

    #[test]
    fn test_tint_darken() {
        assert_eq!(apply_tint("#FFFFFF", -0.5), "#808080");
    }

    #[test]
    fn test_resolve_fill_rgb() {
        let spec = ColorSpec {
            rgb: Some("FFFFFF00".to_string()),
            ..ColorSpec::default()
        };
        assert_eq!(resolve_fill(&spec, &[], None).as_str(), "FFFF00");
    }

    #[test]
    fn test_resolve_fill_theme_accent() {
        let spec = ColorSpec {
            theme: Some(4),
            ..ColorSpec::default()
        };
        assert_eq!(resolve_fill(&spec, &[], None).as_str(), "4472C4");
    }

    #[test]
    fn test_resolve_fill_indexed_prefers_custom_palette() {
        let spec = ColorSpec {
            indexed: Some(2),
            ..ColorSpec::default()
        };
        assert_eq!(resolve_fill(&spec, &[], None).as_str(), "FF0000");

        let palette = vec!["#111111".to_string(), "#222222".to_string(), "#333333".to_string()];
        assert_eq!(resolve_fill(&spec, &[], Some(&palette)).as_str(), "333333");
    }

    #[test]
    fn test_resolve_fill_empty_spec_is_none() {
        assert!(resolve_fill(&ColorSpec::default(), &[], None).is_none());
    }
}
