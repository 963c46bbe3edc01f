//! Features joined with their attributes, ready to draw.

use fc_core::{BoundingBox, Coord};
use tracing::info;

use crate::archive::{ShapefileBundle, extract_bundle};
use crate::dbf::{AttributeValue, read_table};
use crate::geometry::Geometry;
use crate::shp::read_shapes;
use crate::{OverlayError, OverlayResult};

/// Margin (map units) used when fitting the view to a single point.
const DEGENERATE_MARGIN: f64 = 0.01;

#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub geometry: Geometry,
    pub attributes: Vec<(String, AttributeValue)>,
}

impl Feature {
    pub fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    }

    /// One `key: value` line per attribute.
    pub fn popup_text(&self) -> String {
        self.attributes
            .iter()
            .map(|(k, v)| format!("{k}: {v}"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Overlay {
    name: String,
    features: Vec<Feature>,
    bbox: Option<BoundingBox>,
}

impl Overlay {
    pub fn from_archive(bytes: &[u8]) -> OverlayResult<Self> {
        let bundle = extract_bundle(bytes)?;
        Self::from_bundle(&bundle)
    }

    pub fn from_bundle(bundle: &ShapefileBundle) -> OverlayResult<Self> {
        let (_, shapes) = read_shapes(&bundle.shp, bundle.shx.as_deref())?;
        let table = read_table(&bundle.dbf)?;
        if shapes.len() != table.len() {
            return Err(OverlayError::CountMismatch {
                shapes: shapes.len(),
                rows: table.len(),
            });
        }
        let features = shapes
            .into_iter()
            .enumerate()
            .filter(|(i, _)| table.rows[*i].is_some())
            .map(|(i, geometry)| Feature {
                geometry,
                attributes: table.named_row(i),
            })
            .collect();
        let overlay = Self::from_parts(bundle.stem.clone(), features);
        info!(
            name = %overlay.name,
            features = overlay.len(),
            "loaded result overlay"
        );
        Ok(overlay)
    }

    pub fn from_parts(name: impl Into<String>, features: Vec<Feature>) -> Self {
        let bbox = features
            .iter()
            .filter_map(|f| f.geometry.bbox())
            .reduce(|a, b| a.union(&b));
        Self {
            name: name.into(),
            features,
            bbox,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn bbox(&self) -> Option<BoundingBox> {
        self.bbox
    }

    /// Bounds to fit the map to; a zero-size extent gets a small margin.
    pub fn fit_bounds(&self) -> Option<BoundingBox> {
        let bbox = self.bbox?;
        if bbox.width() == 0.0 || bbox.height() == 0.0 {
            Some(bbox.padded(DEGENERATE_MARGIN))
        } else {
            Some(bbox)
        }
    }

    /// Topmost (last drawn) feature under `at`.
    pub fn feature_at(&self, at: Coord, tolerance: f64) -> Option<&Feature> {
        self.features
            .iter()
            .rev()
            .find(|f| f.geometry.hit(at, tolerance))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::ShapefileFixture;

    #[test]
    fn loads_sample_archive() {
        let zip = ShapefileFixture::sample_districts().to_zip("districts");
        let overlay = Overlay::from_archive(&zip).unwrap();
        assert_eq!(overlay.name(), "districts");
        assert_eq!(overlay.len(), 3);
        let bbox = overlay.bbox().unwrap();
        assert!(bbox.contains(Coord::new(114.17, 22.28)));
    }

    #[test]
    fn popup_lists_attributes() {
        let zip = ShapefileFixture::sample_districts().to_zip("districts");
        let overlay = Overlay::from_archive(&zip).unwrap();
        let feature = &overlay.features()[0];
        assert_eq!(feature.popup_text(), "NAME: Central\nDEPTH: 0.5");
        assert_eq!(
            feature.attribute("depth").and_then(AttributeValue::as_f64),
            Some(0.5)
        );
    }

    #[test]
    fn point_overlay_fits_with_margin() {
        let overlay = Overlay::from_parts(
            "p",
            vec![Feature {
                geometry: Geometry::Point(Coord::new(1.0, 2.0)),
                attributes: Vec::new(),
            }],
        );
        let fit = overlay.fit_bounds().unwrap();
        assert!(fit.width() > 0.0 && fit.height() > 0.0);
        assert!(fit.contains(Coord::new(1.0, 2.0)));
    }

    #[test]
    fn empty_overlay_has_no_bounds() {
        let overlay = Overlay::from_parts("none", Vec::new());
        assert!(overlay.is_empty());
        assert!(overlay.fit_bounds().is_none());
        assert!(overlay.feature_at(Coord::new(0.0, 0.0), 1.0).is_none());
    }
}
