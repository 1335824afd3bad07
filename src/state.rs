use std::sync::Arc;

use crate::{
    admin::{AdminRepository, AdminService, FileBrowser},
    auth::{AuthService, PasswordResetRepository, PasswordResetService, RefreshTokenRepository},
    config::Config,
    db::DbPool,
    email::EmailSender,
    middleware::RateLimiter,
    settings::{SettingsRepository, SettingsService},
    storage::Storage,
    upload::{UploadPolicy, UploadService},
    user::UserRepository,
};

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub config: Arc<Config>,
    pub user_repository: UserRepository,
    pub refresh_token_repository: RefreshTokenRepository,
    pub auth_service: AuthService,
    pub password_reset_service: PasswordResetService,
    pub admin_service: AdminService,
    pub settings_service: SettingsService,
    pub upload_service: UploadService,
    pub file_browser: FileBrowser,
    pub rate_limiter: RateLimiter,
}

impl AppState {
    pub fn new(
        db: DbPool,
        config: Arc<Config>,
        storage: Arc<dyn Storage>,
        email_sender: Arc<dyn EmailSender>,
    ) -> Self {
        let user_repository = UserRepository::new(db.clone());
        let refresh_token_repository = RefreshTokenRepository::new(db.clone());
        let password_reset_repository = PasswordResetRepository::new(db.clone());
        let admin_repository = AdminRepository::new(db.clone());
        let settings_repository = SettingsRepository::new(db.clone());

        let auth_service = AuthService::new(
            db.clone(),
            user_repository.clone(),
            refresh_token_repository.clone(),
            config.clone(),
        );
        let password_reset_service = PasswordResetService::new(
            db.clone(),
            user_repository.clone(),
            password_reset_repository,
            refresh_token_repository.clone(),
            email_sender,
            config.frontend_url.clone(),
        );
        let admin_service = AdminService::new(
            admin_repository,
            user_repository.clone(),
            refresh_token_repository.clone(),
        );
        let settings_service = SettingsService::new(settings_repository);
        let upload_service = UploadService::new(storage, UploadPolicy::default());
        let file_browser = FileBrowser::new(&config.upload_dir);

        Self {
            db,
            config,
            user_repository,
            refresh_token_repository,
            auth_service,
            password_reset_service,
            admin_service,
            settings_service,
            upload_service,
            file_browser,
            rate_limiter: RateLimiter::new(),
        }
    }
}
