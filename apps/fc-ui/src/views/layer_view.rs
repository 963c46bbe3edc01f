use egui::Color32;
use fc_app::LayerState;
use fc_config::LegendBandDef;
use fc_core::BoundingBox;

/// Layer checkboxes, the depth legend and the GetMap requests for the
/// visible layers.
#[derive(Default)]
pub struct LayerView {
    show_requests: bool,
}

impl LayerView {
    pub fn show(
        &mut self,
        ui: &mut egui::Ui,
        layers: &mut LayerState,
        legend: &[LegendBandDef],
        view: Option<BoundingBox>,
    ) {
        ui.heading("Layers");
        let mut toggled = Vec::new();
        for (def, visible) in layers.layers() {
            let mut checked = visible;
            if ui
                .checkbox(&mut checked, &def.name)
                .on_hover_text(def.layer.trim())
                .changed()
            {
                toggled.push(def.key.clone());
            }
        }
        for key in toggled {
            if let Err(e) = layers.toggle(&key) {
                tracing::warn!(error = %e, "layer toggle failed");
            }
        }

        if !legend.is_empty() {
            ui.separator();
            ui.strong("Flood depth (m)");
            for band in legend {
                ui.horizontal(|ui| {
                    let [r, g, b] = band.rgb().unwrap_or([0x80, 0x80, 0x80]);
                    let (rect, _) =
                        ui.allocate_exact_size(egui::vec2(18.0, 12.0), egui::Sense::hover());
                    ui.painter().rect_filled(rect, 2.0, Color32::from_rgb(r, g, b));
                    ui.label(&band.label);
                });
            }
        }

        ui.separator();
        ui.checkbox(&mut self.show_requests, "Show WMS requests");
        if self.show_requests {
            let Some(bbox) = view else {
                ui.weak("Map view not ready");
                return;
            };
            let keys: Vec<String> = layers.visible_layers().iter().map(|l| l.key.clone()).collect();
            if keys.is_empty() {
                ui.weak("No layers visible");
            }
            for key in keys {
                match layers.get_map_url(&key, &bbox, 768, 768) {
                    Ok(url) => {
                        ui.horizontal(|ui| {
                            if ui.small_button("Copy").clicked() {
                                ui.ctx().copy_text(url.clone());
                            }
                            ui.label(egui::RichText::new(&key).monospace());
                        })
                        .response
                        .on_hover_text(&url);
                    }
                    Err(e) => {
                        ui.colored_label(Color32::RED, e.to_string());
                    }
                }
            }
        }
    }
}

/// Fill colour for a depth value from the legend's `"a - b"` / `"> a"` labels.
pub fn legend_color(legend: &[LegendBandDef], value: f64) -> Option<Color32> {
    let lower_bound = |label: &str| -> Option<f64> {
        let label = label.trim();
        let text = match label.strip_prefix('>') {
            Some(rest) => rest,
            None => label.split('-').next()?,
        };
        text.trim().parse().ok()
    };
    legend
        .iter()
        .filter_map(|band| Some((lower_bound(&band.label)?, band.rgb()?)))
        .filter(|(lower, _)| *lower <= value)
        .last()
        .map(|(_, [r, g, b])| Color32::from_rgb(r, g, b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use fc_config::defaults::default_config;

    #[test]
    fn depth_maps_to_band() {
        let legend = default_config().legend;
        assert_eq!(legend_color(&legend, 0.1), Some(Color32::from_rgb(0xf0, 0xf8, 0xff)));
        assert_eq!(legend_color(&legend, 2.5), Some(Color32::from_rgb(0x34, 0x84, 0xE5)));
        assert_eq!(legend_color(&legend, 9.0), Some(Color32::from_rgb(0x08, 0x51, 0x9c)));
        assert_eq!(legend_color(&legend, -1.0), None);
    }
}
