pub mod auth_dto;
pub mod auth_handlers;
pub mod auth_models;
pub mod auth_repository;
pub mod auth_service;
pub mod cookie;
pub mod jwt;
pub mod password;
pub mod password_reset_handlers;
pub mod password_reset_service;

pub use auth_repository::{PasswordResetRepository, RefreshTokenRepository};
pub use auth_service::AuthService;
pub use jwt::{create_jwt, verify_jwt, Claims};
pub use password::{hash_password, verify_password};
pub use password_reset_service::PasswordResetService;
