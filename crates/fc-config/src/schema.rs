//! Dashboard configuration schema.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardConfig {
    #[serde(default)]
    pub version: u32,
    pub name: String,
    pub backend: BackendDef,
    #[serde(default)]
    pub poll: PollDef,
    pub map: MapDef,
    pub wms: WmsDef,
    #[serde(default)]
    pub layers: Vec<LayerDef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub legend: Vec<LegendBandDef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub presets: Vec<PresetDef>,
    /// Where downloaded result archives are cached. `None` disables the cache.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,
}

impl DashboardConfig {
    pub fn layer(&self, key: &str) -> Option<&LayerDef> {
        self.layers.iter().find(|l| l.key == key)
    }

    pub fn preset(&self, page: &str) -> Option<&PresetDef> {
        self.presets.iter().find(|p| p.page == page)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendDef {
    pub base_url: String,
    #[serde(default = "default_timeout_s")]
    pub timeout_s: u64,
}

fn default_timeout_s() -> u64 {
    30
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollDef {
    pub interval_ms: u64,
    /// Unset means poll until cancelled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u32>,
}

impl Default for PollDef {
    fn default() -> Self {
        Self {
            interval_ms: 2_000,
            max_attempts: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapDef {
    pub center: CenterDef,
    pub zoom: u8,
    pub basemap: BasemapDef,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CenterDef {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasemapDef {
    /// Slippy-map template with `{s}`, `{z}`, `{x}`, `{y}` placeholders.
    pub url_template: String,
    #[serde(default)]
    pub attribution: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WmsDef {
    pub url: String,
    #[serde(default = "default_wms_format")]
    pub format: String,
    #[serde(default = "default_wms_version")]
    pub version: String,
    #[serde(default = "default_true")]
    pub transparent: bool,
    #[serde(default)]
    pub attribution: String,
}

fn default_wms_format() -> String {
    "image/png".to_string()
}

fn default_wms_version() -> String {
    "1.1.0".to_string()
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerDef {
    pub key: String,
    pub name: String,
    /// Layer name as published by the WMS server, e.g. `COP:Building`.
    pub layer: String,
    #[serde(default)]
    pub visible: bool,
    /// Overrides `wms.url` for layers hosted on another server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegendBandDef {
    /// `#rrggbb`
    pub color: String,
    pub label: String,
}

impl LegendBandDef {
    /// Parsed `#rrggbb`, or `None` if malformed.
    pub fn rgb(&self) -> Option<[u8; 3]> {
        let hex = self.color.strip_prefix('#')?;
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        Some([channel(0)?, channel(2)?, channel(4)?])
    }
}

/// Which layers start visible on a dashboard page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresetDef {
    pub page: String,
    #[serde(default)]
    pub visible: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legend_rgb_parses_hex() {
        let band = LegendBandDef {
            color: "#3484E5".to_string(),
            label: "2.0 - 3.0".to_string(),
        };
        assert_eq!(band.rgb(), Some([0x34, 0x84, 0xE5]));
    }

    #[test]
    fn legend_rgb_rejects_short_or_unprefixed() {
        for color in ["3484E5", "#348", "#zzzzzz", "#3484E5FF"] {
            let band = LegendBandDef {
                color: color.to_string(),
                label: String::new(),
            };
            assert_eq!(band.rgb(), None, "{color}");
        }
    }

    #[test]
    fn poll_defaults_to_two_seconds_unbounded() {
        let poll = PollDef::default();
        assert_eq!(poll.interval_ms, 2_000);
        assert!(poll.max_attempts.is_none());
    }
}
