use egui::{Color32, Stroke};
use egui_plot::{Line, Plot, PlotBounds, PlotPoints, Points, Polygon};
use fc_config::{CenterDef, LegendBandDef};
use fc_core::{BoundingBox, Coord};
use fc_overlay::{Feature, Geometry, Overlay};

use crate::views::layer_view::legend_color;

const DEFAULT_FILL: Color32 = Color32::from_rgb(0x33, 0x88, 0xff);

/// Overlay map in lon/lat degrees. Raster layers are not drawn here; the
/// layer panel lists their GetMap requests instead.
#[derive(Default)]
pub struct MapView {
    fit_pending: bool,
    view_set: bool,
    last_view: Option<BoundingBox>,
    inspected: Option<String>,
}

fn ring_points(ring: &[Coord]) -> PlotPoints {
    ring.iter().map(|c| [c.x, c.y]).collect::<Vec<_>>().into()
}

fn feature_fill(feature: &Feature, legend: &[LegendBandDef]) -> Color32 {
    feature
        .attributes
        .iter()
        .find_map(|(_, v)| v.as_f64())
        .and_then(|depth| legend_color(legend, depth))
        .unwrap_or(DEFAULT_FILL)
}

impl MapView {
    /// Fit the view to the overlay on the next frame.
    pub fn request_fit(&mut self) {
        self.fit_pending = true;
        self.inspected = None;
    }

    pub fn clear_inspection(&mut self) {
        self.inspected = None;
    }

    /// Extent shown in the last frame.
    pub fn view(&self) -> Option<BoundingBox> {
        self.last_view
    }

    pub fn show(
        &mut self,
        ui: &mut egui::Ui,
        overlay: Option<&Overlay>,
        legend: &[LegendBandDef],
        center: CenterDef,
        zoom: u8,
    ) {
        let fit = if self.fit_pending {
            self.fit_pending = false;
            overlay.and_then(Overlay::fit_bounds)
        } else {
            None
        };
        let initial = if self.view_set {
            None
        } else {
            self.view_set = true;
            let half = 180.0 / f64::from(1u32 << zoom.min(20));
            Some(([center.lon - half, center.lat - half], [center.lon + half, center.lat + half]))
        };

        let response = Plot::new("overlay_map")
            .data_aspect(1.0)
            .x_axis_label("Longitude")
            .y_axis_label("Latitude")
            .show(ui, |plot_ui| {
                if let Some((min, max)) = initial {
                    plot_ui.set_plot_bounds(PlotBounds::from_min_max(min, max));
                }
                if let Some(b) = fit {
                    plot_ui.set_plot_bounds(PlotBounds::from_min_max(
                        [b.min_x, b.min_y],
                        [b.max_x, b.max_y],
                    ));
                }
                if let Some(overlay) = overlay {
                    for feature in overlay.features() {
                        draw_feature(plot_ui, feature, feature_fill(feature, legend));
                    }
                }
                (plot_ui.pointer_coordinate(), plot_ui.plot_bounds())
            });

        let (pointer, bounds) = response.inner;
        let [min_x, min_y] = bounds.min();
        let [max_x, max_y] = bounds.max();
        self.last_view = BoundingBox::new(min_x, min_y, max_x, max_y).ok();

        if response.response.clicked() {
            if let (Some(p), Some(overlay)) = (pointer, overlay) {
                let tolerance = bounds.width() * 0.01;
                self.inspected = overlay
                    .feature_at(Coord::new(p.x, p.y), tolerance)
                    .map(Feature::popup_text);
            }
        }

        let mut open = self.inspected.is_some();
        if let Some(text) = &self.inspected {
            egui::Window::new("Feature")
                .open(&mut open)
                .resizable(false)
                .collapsible(false)
                .show(ui.ctx(), |ui| {
                    ui.label(text);
                });
        }
        if !open {
            self.inspected = None;
        }
    }
}

fn draw_feature(plot_ui: &mut egui_plot::PlotUi, feature: &Feature, fill: Color32) {
    let stroke = Stroke::new(1.0, Color32::from_rgb(0x1e, 0x3a, 0x8a));
    match &feature.geometry {
        Geometry::Null => {}
        Geometry::Point(c) => {
            plot_ui.points(Points::new(vec![[c.x, c.y]]).radius(4.0).color(fill));
        }
        Geometry::MultiPoint(cs) => {
            plot_ui.points(Points::new(ring_points(cs)).radius(4.0).color(fill));
        }
        Geometry::LineString(line) => {
            plot_ui.line(Line::new(ring_points(line)).stroke(Stroke::new(2.0, fill)));
        }
        Geometry::MultiLineString(lines) => {
            for line in lines {
                plot_ui.line(Line::new(ring_points(line)).stroke(Stroke::new(2.0, fill)));
            }
        }
        Geometry::Polygon(polygon) => draw_polygon(plot_ui, polygon, fill, stroke),
        Geometry::MultiPolygon(polygons) => {
            for polygon in polygons {
                draw_polygon(plot_ui, polygon, fill, stroke);
            }
        }
    }
}

fn draw_polygon(
    plot_ui: &mut egui_plot::PlotUi,
    polygon: &fc_overlay::Polygon,
    fill: Color32,
    stroke: Stroke,
) {
    plot_ui.polygon(
        Polygon::new(ring_points(&polygon.exterior))
            .fill_color(fill.gamma_multiply(0.6))
            .stroke(stroke),
    );
    for hole in &polygon.holes {
        plot_ui.line(Line::new(ring_points(hole)).stroke(stroke));
    }
}
