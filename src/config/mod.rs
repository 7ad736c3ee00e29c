pub mod error;
pub mod load;
pub mod paths;
pub mod settings;

pub use error::ConfigError;
pub use load::load_settings_from;
pub use paths::{
    default_global_config_path, default_state_dir, GLOBAL_SETTINGS_FILE_NAME, GLOBAL_STATE_DIR,
};
pub use settings::{
    ChatSettings, CompanionSettings, PortRange, ReadinessSettings, Settings, DEFAULT_LISTEN_ADDR,
};
