//! Config schema migration.

use crate::ConfigError;
use crate::schema::DashboardConfig;

pub const LATEST_VERSION: u32 = 2;

pub fn migrate_to_latest(mut config: DashboardConfig) -> Result<DashboardConfig, ConfigError> {
    while config.version < LATEST_VERSION {
        config = migrate_one_version(config)?;
    }
    Ok(config)
}

fn migrate_one_version(config: DashboardConfig) -> Result<DashboardConfig, ConfigError> {
    match config.version {
        0 => migrate_v0_to_v1(config),
        1 => migrate_v1_to_v2(config),
        v => Err(ConfigError::Migration {
            what: format!("No migration path from version {}", v),
        }),
    }
}

fn migrate_v0_to_v1(mut config: DashboardConfig) -> Result<DashboardConfig, ConfigError> {
    config.version = 1;
    Ok(config)
}

/// v1 catalogs were copied from the web client and carry stray whitespace
/// around keys and WMS layer names (`" COP:taiping_boundary"`).
fn migrate_v1_to_v2(mut config: DashboardConfig) -> Result<DashboardConfig, ConfigError> {
    for layer in &mut config.layers {
        layer.key = layer.key.trim().to_string();
        layer.layer = layer.layer.trim().to_string();
    }
    for preset in &mut config.presets {
        for key in &mut preset.visible {
            *key = key.trim().to_string();
        }
    }
    config.version = 2;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::default_config;

    #[test]
    fn v1_layer_names_are_trimmed() {
        let mut config = default_config();
        config.version = 1;
        config.layers[0].layer = " COP:Flood_Depth _Return_Period_500yr".to_string();
        config.layers[0].key = "flood500yr ".to_string();

        let migrated = migrate_to_latest(config).unwrap();
        assert_eq!(migrated.version, LATEST_VERSION);
        assert_eq!(
            migrated.layers[0].layer,
            "COP:Flood_Depth _Return_Period_500yr"
        );
        assert_eq!(migrated.layers[0].key, "flood500yr");
    }

    #[test]
    fn latest_is_untouched() {
        let config = default_config();
        let migrated = migrate_to_latest(config.clone()).unwrap();
        assert_eq!(config, migrated);
    }
}
