//! Engine configuration loading for CLI commands.

use std::path::Path;

use pricer_aad::AadConfig;
use tracing::debug;

use crate::Result;

/// Loads the engine configuration.
///
/// Starts from `path` when given, otherwise from the defaults, then applies
/// the `AAD_*` environment overrides.
pub fn load(path: Option<&Path>) -> Result<AadConfig> {
    let config = match path {
        Some(path) => {
            debug!(path = %path.display(), "loading configuration file");
            AadConfig::load(path)?
        }
        None => AadConfig::default(),
    };
    let config = config.with_env_override()?;
    debug!(?config, "configuration resolved");
    Ok(config)
}
