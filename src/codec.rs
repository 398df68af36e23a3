//! External I/O boundary. File codecs (CSV/JSON/Parquet) are out of
//! scope for this crate; it only specifies the trait a host application
//! implements and hands to the engine.

use crate::frame::Frame;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Csv,
    Json,
    Parquet,
    /// The engine's own spill format.
    Ersnap,
}

impl TableFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "csv" => Some(TableFormat::Csv),
            "json" => Some(TableFormat::Json),
            "parquet" => Some(TableFormat::Parquet),
            "ersnap" => Some(TableFormat::Ersnap),
            _ => None,
        }
    }
}

/// Opaque table codec consumed by a host application; never implemented by
/// this crate.
pub trait TableCodec {
    type Error;

    fn read(&self, path: &std::path::Path, format: TableFormat) -> Result<Frame, Self::Error>;
    fn write(&self, path: &std::path::Path, frame: &Frame, format: TableFormat) -> Result<(), Self::Error>;
}
