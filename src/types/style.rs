//! Raw style records from styles.xml, kept only as far as fills need them.

use serde::{Deserialize, Serialize};

/// Theme palette
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Theme {
    /// 12 theme colors: lt1, dk1, lt2, dk2, accent1-6, hlink, folHlink
    pub colors: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ColorSpec {
    pub rgb: Option<String>,
    pub theme: Option<u32>,
    pub tint: Option<f64>,
    pub indexed: Option<u32>,
    pub auto: bool,
}

#[derive(Debug, Default, Clone)]
pub struct RawFill {
    pub fg_color: Option<ColorSpec>,
    pub bg_color: Option<ColorSpec>,
    pub pattern_type: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CellXf {
    pub fill_id: Option<u32>,
    pub apply_fill: bool,
    /// Reference to cellStyleXfs entry (for cellXfs only)
    pub xf_id: Option<u32>,
}

impl Default for CellXf {
    fn default() -> Self {
        Self {
            fill_id: None,
            // apply* attributes default to true when absent
            apply_fill: true,
            xf_id: None,
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct StyleSheet {
    pub fills: Vec<RawFill>,
    pub cell_xfs: Vec<CellXf>,
    pub cell_style_xfs: Vec<CellXf>,
    /// Custom `<indexedColors>` palette, if the workbook overrides it
    pub indexed_colors: Option<Vec<String>>,
}
