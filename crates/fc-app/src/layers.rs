//! WMS layer visibility and GetMap requests.

use std::fmt::Write as _;

use fc_config::{DashboardConfig, LayerDef, PresetDef, WmsDef};
use fc_core::BoundingBox;
use tracing::debug;

use crate::{AppError, AppResult};

/// WMS parameters for one layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WmsRequest {
    pub url: String,
    pub layers: String,
    pub format: String,
    pub transparent: bool,
    pub version: String,
}

impl WmsRequest {
    /// A WMS 1.1.x GetMap URL for `bbox` (EPSG:4326) at `width`x`height` pixels.
    pub fn get_map_url(&self, bbox: &BoundingBox, width: u32, height: u32) -> String {
        let separator = if self.url.contains('?') { '&' } else { '?' };
        let mut url = format!("{}{}service=WMS&request=GetMap", self.url, separator);
        let params = [
            ("version", self.version.clone()),
            ("layers", self.layers.clone()),
            ("styles", String::new()),
            ("format", self.format.clone()),
            ("transparent", self.transparent.to_string()),
            ("srs", "EPSG:4326".to_string()),
            ("bbox", bbox.to_wms_param()),
            ("width", width.to_string()),
            ("height", height.to_string()),
        ];
        for (name, value) in params {
            let _ = write!(url, "&{name}={}", encode_query_value(&value));
        }
        url
    }
}

/// Percent-encode everything outside the RFC 3986 unreserved set, keeping
/// commas so `bbox` stays readable.
fn encode_query_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b',' => {
                out.push(byte as char)
            }
            _ => {
                let _ = write!(out, "%{byte:02X}");
            }
        }
    }
    out
}

#[derive(Debug, Clone)]
struct LayerEntry {
    def: LayerDef,
    visible: bool,
}

/// Per-layer visibility, in catalog order.
#[derive(Debug, Clone)]
pub struct LayerState {
    wms: WmsDef,
    entries: Vec<LayerEntry>,
}

impl LayerState {
    /// Visibility seeded from each layer's `visible` flag.
    pub fn from_config(config: &DashboardConfig) -> Self {
        Self {
            wms: config.wms.clone(),
            entries: config
                .layers
                .iter()
                .map(|def| LayerEntry {
                    def: def.clone(),
                    visible: def.visible,
                })
                .collect(),
        }
    }

    /// Visibility chosen by the page preset named `page`.
    pub fn for_page(config: &DashboardConfig, page: &str) -> AppResult<Self> {
        let preset = config
            .preset(page)
            .ok_or_else(|| AppError::UnknownPreset(page.to_string()))?;
        let mut state = Self::from_config(config);
        state.apply_preset(preset);
        Ok(state)
    }

    /// Show exactly the preset's layers.
    pub fn apply_preset(&mut self, preset: &PresetDef) {
        for entry in &mut self.entries {
            entry.visible = preset.visible.iter().any(|k| *k == entry.def.key);
        }
        debug!(page = %preset.page, visible = preset.visible.len(), "applied layer preset");
    }

    fn entry(&self, key: &str) -> AppResult<&LayerEntry> {
        self.entries
            .iter()
            .find(|e| e.def.key == key)
            .ok_or_else(|| AppError::UnknownLayer(key.to_string()))
    }

    fn entry_mut(&mut self, key: &str) -> AppResult<&mut LayerEntry> {
        self.entries
            .iter_mut()
            .find(|e| e.def.key == key)
            .ok_or_else(|| AppError::UnknownLayer(key.to_string()))
    }

    pub fn is_visible(&self, key: &str) -> AppResult<bool> {
        Ok(self.entry(key)?.visible)
    }

    /// Flip one layer; returns the new visibility.
    pub fn toggle(&mut self, key: &str) -> AppResult<bool> {
        let entry = self.entry_mut(key)?;
        entry.visible = !entry.visible;
        Ok(entry.visible)
    }

    pub fn set(&mut self, key: &str, visible: bool) -> AppResult<()> {
        self.entry_mut(key)?.visible = visible;
        Ok(())
    }

    /// Every layer with its current visibility.
    pub fn layers(&self) -> impl Iterator<Item = (&LayerDef, bool)> {
        self.entries.iter().map(|e| (&e.def, e.visible))
    }

    pub fn visible_layers(&self) -> Vec<&LayerDef> {
        self.entries
            .iter()
            .filter(|e| e.visible)
            .map(|e| &e.def)
            .collect()
    }

    pub fn wms_request(&self, key: &str) -> AppResult<WmsRequest> {
        let def = &self.entry(key)?.def;
        Ok(WmsRequest {
            url: def.url.clone().unwrap_or_else(|| self.wms.url.clone()),
            layers: def.layer.trim().to_string(),
            format: self.wms.format.clone(),
            transparent: self.wms.transparent,
            version: self.wms.version.clone(),
        })
    }

    pub fn get_map_url(
        &self,
        key: &str,
        bbox: &BoundingBox,
        width: u32,
        height: u32,
    ) -> AppResult<String> {
        Ok(self.wms_request(key)?.get_map_url(bbox, width, height))
    }
}
