//! fc-core: shared foundation for floodcat.
//!
//! Contains:
//! - ids (run addressing by owner + run id)
//! - geo (lon/lat coordinates and bounding boxes)
//! - error (shared error types)

pub mod error;
pub mod geo;
pub mod ids;

pub use error::{CoreError, CoreResult};
pub use geo::{BoundingBox, Coord};
pub use ids::RunKey;
