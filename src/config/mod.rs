//! Configuration management for shop-notify.
//!
//! This module handles loading and saving configuration from `~/.shop-notify/`.

mod paths;
mod settings;

pub use paths::Paths;
pub use settings::{
    ColorSetting, Config, EmailConfig, EngineConfig, EngineSettings, GeneralConfig, LoggingConfig,
};
