//! Config validation logic.

use crate::schema::{DashboardConfig, LayerDef};
use std::collections::HashSet;

#[derive(thiserror::Error, Debug)]
pub enum ValidationError {
    #[error("Duplicate ID: {id} in {context}")]
    DuplicateId { id: String, context: String },

    #[error("Missing reference: {id} in {context}")]
    MissingReference { id: String, context: String },

    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Unsupported version: {version}")]
    UnsupportedVersion { version: u32 },
}

pub fn validate_config(config: &DashboardConfig) -> Result<(), ValidationError> {
    if config.version > crate::migrate::LATEST_VERSION {
        return Err(ValidationError::UnsupportedVersion {
            version: config.version,
        });
    }

    validate_http_url("backend.base_url", &config.backend.base_url)?;
    if config.backend.timeout_s == 0 {
        return Err(invalid("backend.timeout_s", "0", "must be positive"));
    }

    if config.poll.interval_ms == 0 {
        return Err(invalid("poll.interval_ms", "0", "must be positive"));
    }
    if config.poll.max_attempts == Some(0) {
        return Err(invalid(
            "poll.max_attempts",
            "0",
            "omit the field to poll until cancelled",
        ));
    }

    let center = config.map.center;
    if !(-90.0..=90.0).contains(&center.lat) {
        return Err(invalid(
            "map.center.lat",
            &center.lat.to_string(),
            "latitude out of range",
        ));
    }
    if !(-180.0..=180.0).contains(&center.lon) {
        return Err(invalid(
            "map.center.lon",
            &center.lon.to_string(),
            "longitude out of range",
        ));
    }
    if config.map.zoom > 22 {
        return Err(invalid(
            "map.zoom",
            &config.map.zoom.to_string(),
            "zoom above 22",
        ));
    }
    let template = &config.map.basemap.url_template;
    for placeholder in ["{z}", "{x}", "{y}"] {
        if !template.contains(placeholder) {
            return Err(invalid(
                "map.basemap.url_template",
                template,
                &format!("missing {placeholder} placeholder"),
            ));
        }
    }

    validate_http_url("wms.url", &config.wms.url)?;

    let mut layer_keys = HashSet::new();
    for layer in &config.layers {
        if !layer_keys.insert(layer.key.as_str()) {
            return Err(ValidationError::DuplicateId {
                id: layer.key.clone(),
                context: "layers".to_string(),
            });
        }
        validate_layer(layer)?;
    }

    for (i, band) in config.legend.iter().enumerate() {
        if band.rgb().is_none() {
            return Err(invalid(
                &format!("legend[{i}].color"),
                &band.color,
                "expected #rrggbb",
            ));
        }
    }

    let mut pages = HashSet::new();
    for preset in &config.presets {
        if !pages.insert(preset.page.as_str()) {
            return Err(ValidationError::DuplicateId {
                id: preset.page.clone(),
                context: "presets".to_string(),
            });
        }
        for key in &preset.visible {
            if !layer_keys.contains(key.as_str()) {
                return Err(ValidationError::MissingReference {
                    id: key.clone(),
                    context: format!("preset '{}'", preset.page),
                });
            }
        }
    }

    Ok(())
}

fn validate_layer(layer: &LayerDef) -> Result<(), ValidationError> {
    if layer.key.trim().is_empty() {
        return Err(invalid("layer.key", &layer.key, "must not be blank"));
    }
    if layer.key.trim() != layer.key {
        return Err(invalid(
            &format!("layer '{}' key", layer.key),
            &layer.key,
            "surrounding whitespace",
        ));
    }
    if layer.layer.trim().is_empty() {
        return Err(invalid(
            &format!("layer '{}' layer", layer.key),
            &layer.layer,
            "must not be blank",
        ));
    }
    if let Some(url) = &layer.url {
        validate_http_url(&format!("layer '{}' url", layer.key), url)?;
    }
    Ok(())
}

fn validate_http_url(field: &str, url: &str) -> Result<(), ValidationError> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(invalid(field, url, "expected an http:// or https:// URL"))
    }
}

fn invalid(field: &str, value: &str, reason: &str) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
