use fc_config::defaults::default_config;
use fc_config::*;

#[test]
fn duplicate_layer_key_is_rejected() {
    let mut config = default_config();
    let dup = config.layers[0].clone();
    config.layers.push(dup);

    let err = validate_config(&config).unwrap_err();
    assert!(matches!(err, ValidationError::DuplicateId { ref context, .. } if context == "layers"));
}

#[test]
fn zero_poll_interval_is_rejected() {
    let mut config = default_config();
    config.poll.interval_ms = 0;

    let err = validate_config(&config).unwrap_err();
    assert!(matches!(err, ValidationError::InvalidValue { ref field, .. } if field == "poll.interval_ms"));
}

#[test]
fn zero_attempt_budget_is_rejected() {
    let mut config = default_config();
    config.poll.max_attempts = Some(0);
    assert!(validate_config(&config).is_err());

    config.poll.max_attempts = Some(30);
    assert!(validate_config(&config).is_ok());
}

#[test]
fn malformed_legend_colour_is_rejected() {
    let mut config = default_config();
    config.legend[3].color = "lightblue".to_string();

    let err = validate_config(&config).unwrap_err();
    assert!(matches!(err, ValidationError::InvalidValue { ref field, .. } if field == "legend[3].color"));
}

#[test]
fn preset_must_reference_known_layer() {
    let mut config = default_config();
    config.presets[0].visible.push("typhoonTrack".to_string());

    let err = validate_config(&config).unwrap_err();
    assert!(matches!(err, ValidationError::MissingReference { ref id, .. } if id == "typhoonTrack"));
}

#[test]
fn backend_url_needs_scheme() {
    let mut config = default_config();
    config.backend.base_url = "143.89.22.7:3001".to_string();
    assert!(validate_config(&config).is_err());
}

#[test]
fn basemap_template_needs_tile_placeholders() {
    let mut config = default_config();
    config.map.basemap.url_template = "https://tiles.local/{z}/{x}.png".to_string();
    assert!(validate_config(&config).is_err());
}

#[test]
fn newer_version_is_rejected() {
    let mut config = default_config();
    config.version = LATEST_VERSION + 1;

    let err = validate_config(&config).unwrap_err();
    assert!(matches!(err, ValidationError::UnsupportedVersion { .. }));
}

#[test]
fn save_refuses_invalid_config() {
    let mut config = default_config();
    config.poll.interval_ms = 0;
    let path = std::env::temp_dir().join("fc_config_invalid_save.yaml");
    assert!(save_yaml(&path, &config).is_err());
}
