//! Runtime configuration

mod settings;

pub use settings::{Settings, SettingsError, SettingsResult};
