//! fc-overlay: turns a run's zipped shapefile bundle into map geometry.
//!
//! Contains:
//! - archive (locating the `.shp`/`.shx`/`.dbf` members in a zip)
//! - shp (main file + index decoding)
//! - dbf (attribute table decoding)
//! - geometry (feature geometry, ring assembly, hit testing)
//! - overlay (features with attributes, bounds, popups)

pub mod archive;
pub mod dbf;
pub mod geometry;
pub mod overlay;
pub mod shp;

#[cfg(any(test, feature = "fixtures"))]
pub mod fixture;

pub use archive::{ShapefileBundle, extract_bundle};
pub use dbf::{AttributeTable, AttributeValue, FieldDescriptor, FieldType};
pub use geometry::{Geometry, Polygon};
pub use overlay::{Feature, Overlay};
pub use shp::ShapeType;

pub type OverlayResult<T> = Result<T, OverlayError>;

#[derive(Debug, thiserror::Error)]
pub enum OverlayError {
    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Archive has no '{suffix}' member")]
    MissingMember { suffix: &'static str },

    #[error("Malformed {file} at byte {offset}: {reason}")]
    Malformed {
        file: &'static str,
        offset: usize,
        reason: String,
    },

    #[error("Unsupported shape type code {code}")]
    UnsupportedShapeType { code: i32 },

    #[error("Shape count {shapes} does not match attribute row count {rows}")]
    CountMismatch { shapes: usize, rows: usize },
}
