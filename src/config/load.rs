use super::{ConfigError, Settings};
use std::path::Path;

/// Missing files fall back to defaults; present files must parse and validate.
pub fn load_settings_from(path: &Path) -> Result<Settings, ConfigError> {
    let settings = if path.exists() {
        Settings::from_path(path)?
    } else {
        Settings::default()
    };
    settings.validate()?;
    Ok(settings)
}
