//! Dashboard configuration loading for the front ends.

use std::path::Path;

use fc_config::DashboardConfig;
use fc_config::defaults::default_config;
use tracing::info;

use crate::error::AppResult;

/// Load the configuration file, or the built-in one when `path` is `None`,
/// then apply a backend URL override and re-validate.
pub fn load_config(path: Option<&Path>, backend_url: Option<&str>) -> AppResult<DashboardConfig> {
    let mut config = match path {
        Some(path) => {
            let config = fc_config::load(path)?;
            info!(path = %path.display(), "loaded dashboard configuration");
            config
        }
        None => default_config(),
    };
    if let Some(url) = backend_url {
        config.backend.base_url = url.trim_end_matches('/').to_string();
    }
    fc_config::validate_config(&config).map_err(fc_config::ConfigError::from)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AppError;

    #[test]
    fn builtin_config_with_override() {
        let config = load_config(None, Some("https://cat.example.org/")).unwrap();
        assert_eq!(config.backend.base_url, "https://cat.example.org");
    }

    #[test]
    fn bad_override_is_rejected() {
        let err = load_config(None, Some("ftp://nowhere")).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let path = std::env::temp_dir().join("fc_missing_dashboard.yaml");
        assert!(matches!(load_config(Some(&path), None), Err(AppError::Config(_))));
    }
}
