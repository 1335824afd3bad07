pub mod settings_models;
pub mod settings_repository;
pub mod settings_service;

pub use settings_models::{AppSetting, SettingResponse, SettingType};
pub use settings_repository::SettingsRepository;
pub use settings_service::SettingsService;
