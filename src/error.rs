//! Structured error types for xlblocks.

/// All errors that can occur while reading, scanning and annotating workbooks.
#[derive(Debug, thiserror::Error)]
pub enum XlblocksError {
    /// XML parsing error from quick-xml.
    #[error("XML parsing: {0}")]
    Xml(#[from] quick_xml::Error),

    /// ZIP archive error.
    #[error("ZIP archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// A cell reference that cannot be decoded into coordinates.
    #[error("Invalid cell reference: {0}")]
    CellRef(String),

    /// Structural problem in the package (missing part, unknown sheet).
    #[error("Parse error: {0}")]
    Parse(String),

    /// Configuration or remark JSON that cannot be decoded.
    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failure reported by a persistence backend.
    #[error("Store error: {0}")]
    Store(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, XlblocksError>;

#[cfg(target_arch = "wasm32")]
impl From<XlblocksError> for wasm_bindgen::JsValue {
    fn from(e: XlblocksError) -> Self {
        wasm_bindgen::JsValue::from_str(&e.to_string())
    }
}
