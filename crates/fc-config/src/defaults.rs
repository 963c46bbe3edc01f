//! Built-in configuration used when no dashboard file is given.

use crate::migrate::LATEST_VERSION;
use crate::schema::*;

pub const PAGE_URBAN_ELEMENTS: &str = "urban-elements";
pub const PAGE_DISASTER_EVENTS: &str = "disaster-events";
pub const PAGE_RISK_MAP: &str = "risk-map";
pub const PAGE_ASSET_MANAGEMENT: &str = "asset-management";
pub const PAGE_CATASTROPHE_MODEL: &str = "catastrophe-model";

const COP_LAYERS: &[(&str, &str, &str)] = &[
    (
        "flood500yr",
        "Flood depth (500-year return)",
        "COP:Flood_Depth _Return_Period_500yr",
    ),
    (
        "flood200yr",
        "Flood depth (200-year return)",
        "COP:Flood_Depth _Return_Period_200yr",
    ),
    (
        "flood100yr",
        "Flood depth (100-year return)",
        "COP:Flood_Depth _Return_Period_100yr",
    ),
    (
        "flood50yr",
        "Flood depth (50-year return)",
        "COP:Flood_Depth _Return_Period_50yr",
    ),
    (
        "flood20yr",
        "Flood depth (20-year return)",
        "COP:Flood_Depth _Return_Period_20yr",
    ),
    ("buildingRisk", "Building", "COP:Building"),
    ("boundary", "Administrative boundary", "COP:taiping_boundary"),
    ("annualrainfall", "Annual rainfall", "COP:taiping_Annual_rainfall"),
];

const ITF_LAYERS: &[(&str, &str, &str)] = &[
    ("drainageConduits", "Drainage conduits", "ITF:Conduits"),
    ("drainageJunctions", "Drainage junctions", "ITF:Junctions"),
    ("drainageOutfalls", "Drainage outfalls", "ITF:Outfalls"),
    (
        "populationDensity",
        "Population density",
        "ITF:PopulationDensity_per_30_arcseconds",
    ),
];

const DEPTH_LEGEND: &[(&str, &str)] = &[
    ("#f0f8ff", "0.0 - 0.2"),
    ("#d6eaff", "0.2 - 0.4"),
    ("#bce0ff", "0.4 - 0.6"),
    ("#a2d5ff", "0.6 - 0.8"),
    ("#87cefa", "0.8 - 1.0"),
    ("#6FB9F4", "1.0 - 2.0"),
    ("#3484E5", "2.0 - 3.0"),
    ("#0D55B6", "3.0 - 4.0"),
    ("#07396A", "4.0 - 5.0"),
    ("#08519c", "> 5.0"),
];

const ITF_WMS_URL: &str = "http://localhost:8080/geoserver/wms";

impl Default for DashboardConfig {
    fn default() -> Self {
        default_config()
    }
}

pub fn default_config() -> DashboardConfig {
    let mut layers: Vec<LayerDef> = COP_LAYERS
        .iter()
        .map(|(key, name, layer)| LayerDef {
            key: key.to_string(),
            name: name.to_string(),
            layer: layer.to_string(),
            visible: *key == "flood500yr",
            url: None,
        })
        .collect();
    layers.extend(ITF_LAYERS.iter().map(|(key, name, layer)| LayerDef {
        key: key.to_string(),
        name: name.to_string(),
        layer: layer.to_string(),
        visible: false,
        url: Some(ITF_WMS_URL.to_string()),
    }));

    DashboardConfig {
        version: LATEST_VERSION,
        name: "Flood Catastrophe Insurance System".to_string(),
        backend: BackendDef {
            base_url: "http://localhost:3001".to_string(),
            timeout_s: 30,
        },
        poll: PollDef::default(),
        map: MapDef {
            center: CenterDef {
                lat: 22.3193,
                lon: 114.1694,
            },
            zoom: 11,
            basemap: BasemapDef {
                url_template: "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png".to_string(),
                attribution: "© OpenStreetMap contributors".to_string(),
            },
        },
        wms: WmsDef {
            url: "http://localhost:8090/geoserver/wms".to_string(),
            format: "image/png".to_string(),
            version: "1.1.0".to_string(),
            transparent: true,
            attribution: "GeoServer Data".to_string(),
        },
        layers,
        legend: DEPTH_LEGEND
            .iter()
            .map(|(color, label)| LegendBandDef {
                color: color.to_string(),
                label: label.to_string(),
            })
            .collect(),
        presets: vec![
            PresetDef {
                page: PAGE_URBAN_ELEMENTS.to_string(),
                visible: vec!["drainageConduits".to_string()],
            },
            PresetDef {
                page: PAGE_DISASTER_EVENTS.to_string(),
                visible: vec![],
            },
            PresetDef {
                page: PAGE_RISK_MAP.to_string(),
                visible: vec![],
            },
            PresetDef {
                page: PAGE_ASSET_MANAGEMENT.to_string(),
                visible: vec![],
            },
            PresetDef {
                page: PAGE_CATASTROPHE_MODEL.to_string(),
                visible: vec!["flood500yr".to_string()],
            },
        ],
        cache_dir: None,
    }
}
